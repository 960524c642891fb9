//! `nodeward check-update <client>`

use std::path::Path;

use nodeward::updater::UpdateCheckResult;

use crate::commands::common::{load_config, start_logging, Components};
use crate::error::CliError;

/// Check the release feed for `client` and advance the catalog if newer.
pub async fn run(config_path: Option<&Path>, client: &str) -> Result<(), CliError> {
    let config = load_config(config_path)?;
    let _logging = start_logging(&config)?;
    let components = Components::build(&config)?;

    let result = components.updater.check_for_update(client).await?;
    print_result(&result);

    Ok(())
}

/// Print an update check result for the console.
pub fn print_result(result: &UpdateCheckResult) {
    if !result.has_update {
        println!(
            "{} is up to date ({}; latest release {})",
            result.client_id, result.current_version, result.latest_version
        );
        return;
    }

    println!(
        "{} updated: {} -> {}",
        result.client_id, result.current_version, result.latest_version
    );
    if let Some(commit) = &result.commit_hash {
        println!("  commit:   {}", commit);
    }
    for (asset, checksum) in &result.checksums_by_asset {
        println!("  checksum: {}  {}", checksum, asset);
    }
    for warning in &result.warnings {
        println!("  warning:  {}", warning);
    }
}
