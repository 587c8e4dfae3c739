//! CLI command for `sdflash doctor`
//!
//! Checks system dependencies and reports issues with suggestions.

use anyhow::Result;

use crate::cli::output::{is_json, is_quiet, print_detail, print_info, print_success, print_warning, status};
use crate::core::doctor::run_doctor;

/// Execute the doctor command
pub fn execute() -> Result<()> {
    let report = run_doctor();

    // JSON output mode
    if is_json() {
        let json_result = serde_json::json!({
            "status": if report.all_passed() { "success" } else if report.all_required_passed() { "warning" } else { "error" },
            "checks": report.checks.iter().map(|c| serde_json::json!({
                "name": c.name,
                "passed": c.passed(),
                "required": c.required,
                "location": c.location.as_ref().map(|p| p.display().to_string()),
                "suggestion": c.suggestion(),
            })).collect::<Vec<_>>(),
            "passed_count": report.passed_count(),
            "total_count": report.checks.len()
        });
        println!("{}", serde_json::to_string_pretty(&json_result).unwrap_or_default());

        if !report.all_required_passed() {
            return Err(anyhow::anyhow!("Missing required tools"));
        }
        return Ok(());
    }

    // Quiet mode - only show errors
    if is_quiet() {
        let failed_required = report.failed_required();
        if !failed_required.is_empty() {
            for check in failed_required {
                eprintln!("{} Missing required: {}", status::ERROR, check.name);
            }
            return Err(anyhow::anyhow!("Missing required tools"));
        }
        return Ok(());
    }

    print_info("Checking system tools...");
    println!();

    for check in &report.checks {
        let required_str = if check.required { "" } else { " [optional]" };

        match &check.location {
            Some(location) => println!(
                "  {} {}{required_str} ({})",
                status::SUCCESS,
                check.name,
                location.display()
            ),
            None => {
                println!("  {} {}{required_str}, {}", status::ERROR, check.name, check.purpose);
                if let Some(suggestion) = check.suggestion() {
                    print_detail(&format!("  Suggestion: {suggestion}"));
                }
            }
        }
    }

    println!();
    let passed = report.passed_count();
    let total = report.checks.len();

    if report.all_passed() {
        print_success(&format!("All checks passed ({passed}/{total})"));
    } else if report.all_required_passed() {
        print_warning(&format!(
            "{passed}/{total} checks passed (optional tools missing)"
        ));
    } else {
        println!("{} {passed}/{total} checks passed", status::ERROR);
        return Err(anyhow::anyhow!(
            "Missing required tools. Install them and run 'sdflash doctor' again."
        ));
    }

    Ok(())
}
