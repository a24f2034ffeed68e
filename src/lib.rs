//! oy-bestseller - Daily Olive Young Global bestseller ranking report
//!
//! Fetches the bestseller ranking with TLS fingerprint emulation (and an
//! optional headless-Chrome fallback), stores one CSV snapshot per KST day,
//! and reports day-over-day rank movement to Slack, with snapshots kept in
//! Google Drive when configured.

pub mod commands;
pub mod config;
pub mod diff;
pub mod drive;
pub mod error;
pub mod format;
pub mod notify;
pub mod oliveyoung;
pub mod snapshot;

pub use config::Config;
pub use diff::{DiffOptions, RankDiff};
pub use error::{DriveError, ScrapeError};
pub use oliveyoung::models::{Price, Product};
pub use snapshot::Snapshot;
