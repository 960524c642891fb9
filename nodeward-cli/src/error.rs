//! CLI error handling with user-friendly messages.
//!
//! Centralizes error handling for the CLI, providing consistent formatting
//! and appropriate exit codes.

use std::fmt;
use std::path::PathBuf;
use std::process;

use nodeward::acquire::AcquireError;
use nodeward::catalog::CatalogError;
use nodeward::config::ConfigFileError;
use nodeward::orchestration::OrchestrationError;
use nodeward::updater::UpdateError;

/// CLI-specific errors with user-friendly messages.
#[derive(Debug)]
pub enum CliError {
    /// Failed to initialize logging
    LoggingInit(String),
    /// Configuration error
    Config(String),
    /// The binary catalog could not be loaded
    Catalog { path: PathBuf, error: CatalogError },
    /// Binary installation failed
    Install(AcquireError),
    /// Release check failed
    Update(UpdateError),
    /// A facade request failed
    Orchestration(OrchestrationError),
    /// Console I/O failed
    Console(std::io::Error),
}

impl CliError {
    /// Exit the process with an appropriate error message and code.
    pub fn exit(&self) -> ! {
        eprintln!("Error: {}", self);

        // Print additional help for specific errors
        match self {
            CliError::Catalog {
                path,
                error: CatalogError::Read { .. },
            } => {
                eprintln!();
                eprintln!("No client binary catalog found at {}.", path.display());
                eprintln!("Place a clientBinaries.json there, or set [binaries] manifest");
                eprintln!("in the configuration file (see 'nodeward config path').");
            }
            CliError::Install(AcquireError::ChecksumMismatch { .. }) => {
                eprintln!();
                eprintln!("The downloaded artifact was discarded. If a new release was");
                eprintln!("published recently, run 'nodeward check-update <client>' first.");
            }
            CliError::Update(UpdateError::Network { .. }) => {
                eprintln!();
                eprintln!("Check the [updates] endpoints in the configuration file.");
            }
            _ => {}
        }

        process::exit(1)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::LoggingInit(msg) => write!(f, "Failed to initialize logging: {}", msg),
            CliError::Config(msg) => write!(f, "Configuration error: {}", msg),
            CliError::Catalog { path, error } => {
                write!(f, "Failed to load catalog '{}': {}", path.display(), error)
            }
            CliError::Install(e) => write!(f, "Failed to install binary: {}", e),
            CliError::Update(e) => write!(f, "Update check failed: {}", e),
            CliError::Orchestration(e) => write!(f, "{}", e),
            CliError::Console(e) => write!(f, "Console error: {}", e),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Catalog { error, .. } => Some(error),
            CliError::Install(e) => Some(e),
            CliError::Update(e) => Some(e),
            CliError::Orchestration(e) => Some(e),
            CliError::Console(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ConfigFileError> for CliError {
    fn from(e: ConfigFileError) -> Self {
        CliError::Config(e.to_string())
    }
}

impl From<AcquireError> for CliError {
    fn from(e: AcquireError) -> Self {
        CliError::Install(e)
    }
}

impl From<UpdateError> for CliError {
    fn from(e: UpdateError) -> Self {
        CliError::Update(e)
    }
}

impl From<OrchestrationError> for CliError {
    fn from(e: OrchestrationError) -> Self {
        CliError::Orchestration(e)
    }
}
