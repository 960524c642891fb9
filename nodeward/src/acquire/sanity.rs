//! Post-install sanity command.
//!
//! The result is advisory. A binary that fails its sanity check is still
//! used; the checksum is the only hard gate.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;

use crate::catalog::SanityCommand;

/// Default time allowed for the sanity command.
pub const DEFAULT_SANITY_TIMEOUT: Duration = Duration::from_secs(10);

/// Result of running a sanity command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SanityOutcome {
    /// Output matched the expectation.
    Matched,
    /// No expected output is configured.
    Skipped,
    /// The command ran but printed something else.
    Mismatch {
        expected: Vec<String>,
        actual: Vec<String>,
    },
    /// The command could not be run or timed out.
    Failed(String),
}

impl SanityOutcome {
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Matched | Self::Skipped)
    }
}

/// Run `binary` with the sanity arguments and compare its stdout.
///
/// Lines are trimmed and blank lines dropped before comparing.
pub async fn run_sanity(binary: &Path, command: &SanityCommand, timeout: Duration) -> SanityOutcome {
    let expected: Vec<String> = command
        .expected_output_lines()
        .iter()
        .map(|l| l.trim().to_string())
        .filter(|l| !l.is_empty())
        .collect();
    if expected.is_empty() {
        return SanityOutcome::Skipped;
    }

    let child = Command::new(binary)
        .args(&command.args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .kill_on_drop(true)
        .output();

    let output = match tokio::time::timeout(timeout, child).await {
        Ok(Ok(output)) => output,
        Ok(Err(e)) => return SanityOutcome::Failed(e.to_string()),
        Err(_) => return SanityOutcome::Failed(format!("timed out after {:?}", timeout)),
    };

    let actual: Vec<String> = String::from_utf8_lossy(&output.stdout)
        .lines()
        .map(|l| l.trim().to_string())
        .filter(|l| !l.is_empty())
        .collect();

    if actual == expected {
        SanityOutcome::Matched
    } else {
        SanityOutcome::Mismatch { expected, actual }
    }
}
