//! `nodeward install <client>`

use std::path::Path;

use crate::commands::common::{load_config, start_logging, Components};
use crate::error::CliError;

/// Install (or confirm) the verified binary for `client`.
pub async fn run(config_path: Option<&Path>, client: &str) -> Result<(), CliError> {
    let config = load_config(config_path)?;
    let _logging = start_logging(&config)?;
    let components = Components::build(&config)?;

    let entry = components
        .catalog
        .get(client)
        .map_err(|error| CliError::Catalog {
            path: components.catalog.path().to_path_buf(),
            error,
        })?;

    println!("Installing {} {}", client, entry.version);
    let path = components.acquirer.ensure_installed(client).await?;
    println!("Verified binary: {}", path.display());

    Ok(())
}
