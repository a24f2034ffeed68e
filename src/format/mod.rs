//! Output formatting for scraped products (table, JSON, markdown, CSV) and
//! Slack messages.

pub mod slack;

use crate::config::OutputFormat;
use crate::oliveyoung::Product;

/// Formats products for terminal output.
pub struct Formatter {
    format: OutputFormat,
}

impl Formatter {
    /// Creates a new formatter.
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Formats the ranking.
    pub fn format_products(&self, products: &[Product]) -> String {
        if products.is_empty() {
            return match self.format {
                OutputFormat::Json => "[]".to_string(),
                OutputFormat::Csv => self.csv_header(),
                _ => "No products found.".to_string(),
            };
        }

        match self.format {
            OutputFormat::Json => self.json_products(products),
            OutputFormat::Table => self.table_products(products),
            OutputFormat::Markdown => self.markdown_products(products),
            OutputFormat::Csv => self.csv_products(products),
        }
    }

    fn json_products(&self, products: &[Product]) -> String {
        serde_json::to_string_pretty(products).unwrap_or_else(|_| "[]".to_string())
    }

    fn price_cell(product: &Product) -> String {
        match product.current_price() {
            Some(p) => format!("{:.2}", p),
            None => "N/A".to_string(),
        }
    }

    fn discount_cell(product: &Product) -> String {
        product.discount_percent.map(|d| format!("{}%", d)).unwrap_or_default()
    }

    fn truncate(text: &str, width: usize) -> String {
        if text.chars().count() > width {
            let head: String = text.chars().take(width.saturating_sub(3)).collect();
            format!("{}...", head)
        } else {
            text.to_string()
        }
    }

    fn table_products(&self, products: &[Product]) -> String {
        let rank_width = 4;
        let brand_width = 16;
        let price_width = 9;
        let dc_width = 5;
        let title_width = 50;

        let mut lines = Vec::new();

        lines.push(format!(
            "{:<rank_width$}  {:<brand_width$}  {:<price_width$}  {:<dc_width$}  {}",
            "Rank", "Brand", "Price", "DC", "Product"
        ));
        lines.push(format!(
            "{:-<rank_width$}  {:-<brand_width$}  {:-<price_width$}  {:-<dc_width$}  {:-<title_width$}",
            "", "", "", "", ""
        ));

        for product in products {
            lines.push(format!(
                "{:<rank_width$}  {:<brand_width$}  {:>price_width$}  {:>dc_width$}  {}",
                product.rank,
                Self::truncate(&product.brand, brand_width),
                Self::price_cell(product),
                Self::discount_cell(product),
                Self::truncate(&product.display_name(), title_width)
            ));
        }

        lines.push(String::new());
        lines.push(format!("Total: {} products", products.len()));

        lines.join("\n")
    }

    fn markdown_products(&self, products: &[Product]) -> String {
        let mut lines = Vec::new();

        lines.push("| Rank | Brand | Price | Original | DC | Product |".to_string());
        lines.push("|------|-------|-------|----------|----|---------|".to_string());

        for product in products {
            let original = product.original_price().map(|o| format!("~~{:.2}~~", o)).unwrap_or_default();

            lines.push(format!(
                "| {} | {} | {} | {} | {} | [{}]({}) |",
                product.rank,
                product.brand,
                Self::price_cell(product),
                original,
                Self::discount_cell(product),
                Self::truncate(&product.display_name(), 40),
                product.url
            ));
        }

        lines.push(String::new());
        lines.push(format!("*{} products found*", products.len()));

        lines.join("\n")
    }

    fn csv_header(&self) -> String {
        "rank,brand,product_name,price,orig_price,discount_percent,url,image_url".to_string()
    }

    fn csv_products(&self, products: &[Product]) -> String {
        let mut lines = Vec::new();
        lines.push(self.csv_header());

        for product in products {
            let price = product.current_price().map(|p| p.to_string()).unwrap_or_default();
            let original = product.original_price().map(|o| o.to_string()).unwrap_or_default();
            let discount = product.discount_percent.map(|d| d.to_string()).unwrap_or_default();

            lines.push(format!(
                "{},{},{},{},{},{},{},{}",
                product.rank,
                Self::csv_escape(&product.brand),
                Self::csv_escape(&product.display_name()),
                price,
                original,
                discount,
                Self::csv_escape(&product.url),
                product.image_url.as_deref().map(Self::csv_escape).unwrap_or_default()
            ));
        }

        lines.join("\n")
    }

    fn csv_escape(s: &str) -> String {
        if s.contains(',') || s.contains('"') || s.contains('\n') {
            format!("\"{}\"", s.replace('"', "\"\""))
        } else {
            s.to_string()
        }
    }
}
