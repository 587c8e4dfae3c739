//! External tool invocation

use std::process::{Command, Output};

use crate::error::DeviceError;

/// Run `cmd` to completion, failing on a non-zero exit status
pub fn run(cmd: &mut Command) -> Result<Output, DeviceError> {
    let tool = cmd.get_program().to_string_lossy().to_string();
    tracing::debug!("Running {:?}", cmd);

    let output = cmd.output().map_err(|e| DeviceError::ToolFailed {
        tool: tool.clone(),
        error: e.to_string(),
    })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(DeviceError::ToolFailed {
            tool,
            error: format!("{} {}", output.status, stderr.trim()),
        });
    }

    Ok(output)
}

/// Whether `tool` is on `PATH`
pub fn is_installed(tool: &str) -> bool {
    which::which(tool).is_ok()
}
