//! List managed services

use super::BrewManager;

pub async fn list(manager: &BrewManager, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let entries = manager.list().await;

    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    if entries.is_empty() {
        println!("No services available to control.");
        return Ok(());
    }

    let width = entries.iter().map(|e| e.name.len()).max().unwrap_or(4).max(4);
    println!("{:<width$} {:<8} {:<8} {}", "Name", "Status", "Pid", "File", width = width);

    for entry in &entries {
        let pid = entry.pid.map_or_else(|| "-".to_string(), |p| p.to_string());
        let path = entry
            .path
            .as_ref()
            .map_or_else(String::new, |p| p.display().to_string());
        println!(
            "{:<width$} {:<8} {:<8} {}",
            entry.name,
            entry.status.as_str(),
            pid,
            path,
            width = width
        );
    }

    Ok(())
}
