//! Capturing command execution with consistent error handling.
//!
//! Used where a tool's stdout is the result (`psql` queries, the offline
//! compiler). Streaming execution for long-running tools lives in
//! [`crate::core::shell`].

use std::process::{Command, Output};

use crate::core::error::{Error, Result};

/// Run a command and return trimmed stdout on success.
///
/// Returns an error with stderr (or stdout fallback) if the command cannot
/// be started or exits non-zero. `context` names the operation in messages.
pub fn run(program: &str, args: &[&str], context: &str) -> Result<String> {
    let output = Command::new(program)
        .args(args)
        .output()
        .map_err(|e| Error::Command(format!("Failed to run {context}: {e}")))?;

    if !output.status.success() {
        return Err(Error::Command(format!(
            "{context} failed: {}",
            error_text(&output)
        )));
    }

    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

/// Extract error text from command output.
///
/// Prefers stderr, falls back to stdout if stderr is empty.
pub fn error_text(output: &Output) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr);
    if !stderr.trim().is_empty() {
        stderr.trim().to_string()
    } else {
        String::from_utf8_lossy(&output.stdout).trim().to_string()
    }
}
