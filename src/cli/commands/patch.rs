//! CLI command implementation for `sdflash patch`
//!
//! Applies provisioning to a boot partition that is already mounted or
//! extracted to a directory. Nothing is imaged or mounted.

use anyhow::{Context, Result};
use std::path::Path;

use crate::cli::output::{is_json, print_detail, print_success, print_warning};
use crate::core::patcher::ConfigPatcher;
use crate::core::request::ProvisioningInputs;
use crate::core::settings::Settings;
use crate::infra::dirs::SdflashDirs;

/// Execute the patch command
pub fn execute(dir: &Path, inputs: ProvisioningInputs) -> Result<()> {
    let settings = Settings::load(&SdflashDirs::new())?;
    let request = inputs.with_defaults(&settings.provision).resolve()?;
    if request.is_empty() {
        print_warning("No fields or files given, only meta-data will be checked");
    }

    let report = ConfigPatcher::new(dir)
        .apply(&request)
        .with_context(|| format!("Failed to provision {}", dir.display()))?;

    if is_json() {
        let json = serde_json::json!({
            "status": "success",
            "boot_dir": dir.display().to_string(),
            "copied": report.copied.iter().map(|c| serde_json::json!({
                "role": c.role.as_str(),
                "dest": c.dest.display().to_string(),
                "bytes": c.bytes,
            })).collect::<Vec<_>>(),
            "created_meta_data": report.created_meta_data,
            "substitutions": report.substitutions.iter().map(|s| serde_json::json!({
                "file": s.file,
                "field": s.field.to_string(),
                "lines": s.lines,
            })).collect::<Vec<_>>(),
            "unmatched": report.unmatched.iter().map(ToString::to_string).collect::<Vec<_>>(),
        });
        println!("{}", serde_json::to_string_pretty(&json).unwrap_or_default());
        return Ok(());
    }

    for copied in &report.copied {
        print_detail(&format!("Copied {} to {}", copied.role, copied.dest.display()));
    }
    if report.created_meta_data {
        print_detail("Created empty meta-data");
    }
    for substitution in &report.substitutions {
        print_detail(&format!("Set {} in {}", substitution.field, substitution.file));
    }
    for unmatched in &report.unmatched {
        print_warning(&unmatched.to_string());
    }

    print_success("Finished");
    Ok(())
}
