//! Catalog of supported client binaries.
//!
//! The catalog is loaded once at startup and replaced wholesale by the
//! [`updater`](crate::updater). It is the only input the
//! [`acquire`](crate::acquire) module uses to decide what to download and
//! which checksum to demand.

mod error;
mod store;
mod types;

pub use error::{CatalogError, CatalogResult};
pub use store::BinaryCatalog;
pub use types::{
    ArchiveKind, BinaryCommands, ClientEntry, ClientManifest, DownloadSpec, PlatformBinary,
    PlatformMap, SanityCommand,
};

#[cfg(test)]
pub(crate) use types::fixtures;
