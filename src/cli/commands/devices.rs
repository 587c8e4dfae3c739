//! CLI command implementation for `sdflash devices`

use anyhow::{Context, Result};

use crate::cli::output::{is_json, print_info, print_warning};
use crate::infra::disk::list_disks;

/// Execute the devices command
pub fn execute() -> Result<()> {
    let disks = list_disks().context("Failed to list disks")?;

    if is_json() {
        let json = serde_json::json!({
            "status": "success",
            "devices": disks.iter().map(|d| serde_json::json!({
                "path": d.path.display().to_string(),
                "size": d.size,
                "model": d.model,
                "transport": d.transport,
                "removable": d.removable,
            })).collect::<Vec<_>>(),
        });
        println!("{}", serde_json::to_string_pretty(&json).unwrap_or_default());
        return Ok(());
    }

    if disks.is_empty() {
        print_warning("No disks found");
        return Ok(());
    }

    print_info("Available disks:");
    for disk in &disks {
        println!("  {disk}");
    }
    Ok(())
}
