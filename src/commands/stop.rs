//! Stop services

use super::BrewManager;

pub async fn stop(manager: &BrewManager, names: &[String]) -> Result<(), Box<dyn std::error::Error>> {
    let outcomes = manager.stop_all(names).await?;
    super::report(&outcomes, "stopped")
}
