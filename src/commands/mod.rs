//! CLI command implementations.

pub mod diff;
pub mod dump;
pub mod notify;
pub mod run;
pub mod scrape;
pub mod upload;

pub use diff::DiffCommand;
pub use dump::DumpCommand;
pub use notify::NotifyCommand;
pub use run::{DailyRun, RunSummary};
pub use scrape::ScrapeCommand;
pub use upload::UploadCommand;
