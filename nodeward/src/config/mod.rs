//! User configuration.
//!
//! Settings live in `~/.nodeward/config.ini`, or under `$NODEWARD_HOME` when
//! set. Each `[section]` maps to one settings struct; [`ConfigFile`] converts
//! them into the per-component configs the library constructors take.

mod defaults;
mod file;
mod parser;
mod settings;
mod writer;

pub use defaults::*;
pub use file::{config_directory, config_file_path, ConfigFileError, HOME_ENV};
pub use settings::{
    BinariesSettings, ConfigFile, LoggingSettings, NodeSettings, RpcSettings, UpdatesSettings,
};
