//! Data models for bestseller products and prices.

use crate::oliveyoung::parser::remove_brand_from_title;
use serde::{Deserialize, Serialize};

/// One product card from the bestseller ranking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    /// 1-based position in the ranking
    pub rank: u32,
    /// Brand name (may be empty when the card has none)
    pub brand: String,
    /// Product title as shown on the card
    pub title: String,
    /// Absolute product URL, also the day-over-day diff key
    pub url: String,
    /// Product image URL
    pub image_url: Option<String>,
    /// Price information if the card showed any
    pub price: Option<Price>,
    /// Discount percent, either printed on the card or derived from prices
    pub discount_percent: Option<u8>,
}

impl Product {
    /// Returns the current (sale) price if known.
    pub fn current_price(&self) -> Option<f64> {
        self.price.as_ref().map(|p| p.current)
    }

    /// Returns the original (list) price if known.
    pub fn original_price(&self) -> Option<f64> {
        self.price.as_ref().and_then(|p| p.original)
    }

    /// Title with a leading brand prefix removed.
    pub fn display_name(&self) -> String {
        remove_brand_from_title(&self.title, &self.brand)
    }
}

/// Price information in a single currency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Price {
    /// Current/sale price
    pub current: f64,
    /// Original price before discount (if on sale)
    pub original: Option<f64>,
    /// Currency code
    pub currency: String,
}

impl Price {
    /// Creates a USD price with just the current value.
    pub fn usd(current: f64) -> Self {
        Self { current, original: None, currency: "USD".to_string() }
    }

    /// Creates a USD price with an original/list price.
    pub fn usd_with_original(current: f64, original: f64) -> Self {
        Self { current, original: Some(original), currency: "USD".to_string() }
    }
}
