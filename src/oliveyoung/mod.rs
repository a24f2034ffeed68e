//! Olive Young Global modules for fetching, parsing, and data models.

#[cfg(feature = "browser")]
pub mod browser;
pub mod client;
pub mod models;
pub mod parser;
pub mod price;
pub mod selectors;

#[cfg(feature = "browser")]
pub use browser::BrowserRenderer;
pub use client::{BestsellerSource, OliveYoungClient};
pub use models::{Price, Product};
pub use parser::Parser;
