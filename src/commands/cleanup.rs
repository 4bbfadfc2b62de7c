//! Remove stale registrations and orphaned descriptors

use super::BrewManager;

pub async fn cleanup(manager: &BrewManager) -> Result<(), Box<dyn std::error::Error>> {
    let report = manager.cleanup().await;

    for label in &report.killed {
        println!("Removing unused service `{}`", label);
    }
    for path in &report.removed {
        println!("Removing unused plist {}", path.display());
    }
    for (label, e) in &report.failed {
        eprintln!("Error: {}: {}", label, e);
    }

    if report.is_empty() {
        println!("All services OK, nothing cleaned...");
    }
    if !report.failed.is_empty() {
        return Err(format!("{} stale services could not be removed", report.failed.len()).into());
    }
    Ok(())
}
