//! Restart services

use super::BrewManager;

pub async fn restart(manager: &BrewManager, names: &[String]) -> Result<(), Box<dyn std::error::Error>> {
    let outcomes = manager.restart_all(names).await?;
    super::report(&outcomes, "restarted")
}
