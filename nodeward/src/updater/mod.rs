//! Release tracking for client binaries.
//!
//! # Flow
//!
//! ```text
//! ReleaseFeed::latest_tag ──► extract version ──► newer than catalog?
//!                                                    │ no ──► done (no more calls)
//!                                                    ▼ yes
//!                      ReleaseFeed::commit_for_tag ──► short hash
//!                      ChecksumListingSource       ──► asset checksums
//!                                                    │
//!                                                    ▼
//!                    rewrite every platform entry ──► BinaryCatalog::replace
//! ```
//!
//! Each stage returns a `Result`, so a failure anywhere short-circuits the
//! cycle before the catalog is touched.

mod checker;
mod error;
mod feed;
mod listing;
pub mod tokens;

pub use checker::{ReleaseUpdater, UpdateCheckResult, UpdateWarning};
pub use error::{UpdateError, UpdateResult};
pub use feed::{FeedConfig, GithubReleaseFeed, ReleaseFeed, DEFAULT_FEED_TIMEOUT};
pub use listing::{ChecksumListing, ChecksumListingSource, HttpListingSource};
