//! HTML parser for the bestseller ranking page.

use crate::error::ScrapeError;
use crate::oliveyoung::models::{Price, Product};
use crate::oliveyoung::price::{
    clean_text, discount_percent_floor, parse_usd, parse_value_price, to_float,
};
use crate::oliveyoung::selectors::{bestseller, errors};
use anyhow::Result;
use regex_lite::Regex;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use tracing::{debug, trace};

/// Minimum number of cards for an item selector tier to be trusted.
pub const DEFAULT_MIN_CARDS: usize = 10;

/// Parser for bestseller HTML (plain HTTP or browser-rendered).
pub struct Parser {
    base_url: String,
    min_cards: usize,
}

impl Parser {
    /// Creates a parser that resolves relative links against `base_url`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            min_cards: DEFAULT_MIN_CARDS,
        }
    }

    /// Overrides how many cards an item tier must yield before it is used.
    pub fn with_min_cards(mut self, min_cards: usize) -> Self {
        self.min_cards = min_cards;
        self
    }

    /// Parses the ranking into products ranked 1..n in page order.
    pub fn parse_bestseller(&self, html: &str) -> Result<Vec<Product>> {
        let document = Html::parse_document(html);

        self.check_for_errors(&document)?;

        let cards = self.select_cards(&document);
        let mut seen = HashSet::new();
        let mut products = Vec::new();

        for card in cards {
            let rank = products.len() as u32 + 1;
            let Some(product) = self.parse_card(card, rank) else {
                trace!("Skipping card without title or link");
                continue;
            };

            if !seen.insert(product.url.clone()) {
                trace!("Skipping duplicate card: {}", product.url);
                continue;
            }

            trace!("Parsed #{} {} - {}", product.rank, product.brand, product.title);
            products.push(product);
        }

        debug!("Parsed {} products", products.len());
        Ok(products)
    }

    /// Detects bot-protection interstitials.
    fn check_for_errors(&self, document: &Html) -> Result<()> {
        if document.select(&errors::CHALLENGE).next().is_some() {
            return Err(ScrapeError::Blocked.into());
        }

        let title = document
            .select(&errors::TITLE)
            .next()
            .map(|e| e.text().collect::<String>().to_lowercase())
            .unwrap_or_default();

        if title.contains("just a moment")
            || title.contains("attention required")
            || title.contains("access denied")
        {
            return Err(ScrapeError::Blocked.into());
        }

        Ok(())
    }

    /// Picks the first item tier with enough cards, else the first non-empty one.
    fn select_cards<'a>(&self, document: &'a Html) -> Vec<ElementRef<'a>> {
        let mut fallback: Option<Vec<ElementRef<'a>>> = None;

        for (tier, selector) in bestseller::ITEMS.iter().enumerate() {
            let found: Vec<_> = document.select(selector).collect();
            if found.len() >= self.min_cards {
                debug!("Item tier {} matched {} cards", tier, found.len());
                return found;
            }
            if fallback.is_none() && !found.is_empty() {
                fallback = Some(found);
            }
        }

        let cards = fallback.unwrap_or_default();
        debug!("No item tier reached {} cards, using {} cards", self.min_cards, cards.len());
        cards
    }

    /// Parses one card. Returns `None` when it lacks a title or a link.
    fn parse_card(&self, card: ElementRef, rank: u32) -> Option<Product> {
        let (href, anchor) = pick_link(card)?;
        let url = self.absolutize(&href);

        let anchor_text = anchor.text().collect::<Vec<_>>().join("\n");
        let (anchor_brand, anchor_product) = split_brand_and_product(&anchor_text);

        // The anchor's first line only counts as a brand when a product line follows it.
        let anchor_has_brand = !anchor_product.is_empty() && anchor_product != anchor_brand;
        let card_brand = pick_text(card, &bestseller::BRAND);

        let (title, brand) = match pick_text(card, &bestseller::NAME) {
            Some(title) => {
                let brand = card_brand
                    .or_else(|| anchor_has_brand.then(|| clean_text(&anchor_brand)))
                    .unwrap_or_default();
                (title, brand)
            }
            None if !anchor_product.is_empty() => {
                (clean_text(&anchor_product), card_brand.unwrap_or(anchor_brand))
            }
            None => return None,
        };

        let card_text = clean_text(&card.text().collect::<Vec<_>>().join(" "));

        let sale = pick_text(card, &bestseller::PRICE)
            .and_then(|t| to_float(&t))
            .or_else(|| parse_usd(&card_text));
        let original = pick_text(card, &bestseller::ORIGINAL_PRICE)
            .and_then(|t| to_float(&t))
            .or_else(|| parse_value_price(&card_text));
        let percent_text = pick_text(card, &bestseller::PERCENT);
        let discount_percent = discount_percent_floor(original, sale, percent_text.as_deref());

        let price = sale.map(|current| match original {
            Some(original) => Price::usd_with_original(current, original),
            None => Price::usd(current),
        });

        let image_url = card.select(&bestseller::IMAGE).next().and_then(|img| {
            let value = img.value();
            value
                .attr("src")
                .or_else(|| value.attr("data-src"))
                .or_else(|| value.attr("data-original"))
                .map(|src| self.absolutize(src))
        });

        Some(Product { rank, brand, title, url, image_url, price, discount_percent })
    }

    /// Makes a link absolute against the base URL.
    fn absolutize(&self, href: &str) -> String {
        if href.starts_with("http://") || href.starts_with("https://") {
            href.to_string()
        } else if let Some(rest) = href.strip_prefix("//") {
            format!("https://{}", rest)
        } else {
            format!("{}/{}", self.base_url, href.trim_start_matches('/'))
        }
    }
}

/// First non-empty text among the candidate selectors.
fn pick_text(element: ElementRef, candidates: &[Selector]) -> Option<String> {
    candidates.iter().find_map(|selector| {
        let node = element.select(selector).next()?;
        let text = clean_text(&node.text().collect::<Vec<_>>().join(" "));
        (!text.is_empty()).then_some(text)
    })
}

/// First usable `href` among the link candidates, with its anchor element.
fn pick_link(element: ElementRef) -> Option<(String, ElementRef)> {
    bestseller::LINK.iter().find_map(|selector| {
        let anchor = element.select(selector).next()?;
        let href = anchor.value().attr("href")?.trim();
        if href.is_empty() || href.starts_with("javascript") {
            return None;
        }
        Some((href.to_string(), anchor))
    })
}

/// Splits rendered anchor text into `(brand, product)`.
///
/// The first non-empty line is the brand; the remaining lines form the
/// product name with any repeated brand prefix removed.
pub fn split_brand_and_product(anchor_text: &str) -> (String, String) {
    let lines: Vec<&str> =
        anchor_text.lines().map(str::trim).filter(|line| !line.is_empty()).collect();

    let Some(brand) = lines.first().map(|b| b.to_string()) else {
        return (String::new(), String::new());
    };

    let mut rest = lines[1..].join(" ").trim().to_string();
    if rest.is_empty() {
        let text = lines.join(" ");
        let prefix = format!("{} ", brand).to_lowercase();
        rest = if text.to_lowercase().starts_with(&prefix) {
            text.get(brand.len()..).unwrap_or(&text).trim().to_string()
        } else {
            text
        };
    }

    let product = match Regex::new(&format!(r"(?i)^{}\s+", regex_lite::escape(&brand))) {
        Ok(re) => re.replace(&rest, "").trim().to_string(),
        Err(_) => rest,
    };

    (brand, product)
}

/// Strips a leading brand from a title.
///
/// Handles `Brand Title`, `[Brand] Title`, `(Brand) Title`, and separators
/// such as `Brand - Title` or `Brand | Title`.
pub fn remove_brand_from_title(title: &str, brand: &str) -> String {
    let title = clean_text(title);
    let brand = clean_text(brand);
    if brand.is_empty() {
        return title;
    }

    let escaped = regex_lite::escape(&brand);
    let patterns = [
        format!(r"(?i)^\[?\s*{}\s*\]?\s*[-–—:|]*\s*", escaped),
        format!(r"(?i)^\(?\s*{}\s*\)?\s*[-–—:|]*\s*", escaped),
    ];

    for pattern in &patterns {
        let Ok(re) = Regex::new(pattern) else { continue };
        let stripped = re.replace(&title, "");
        if stripped != title {
            let stripped = stripped.trim();
            return if stripped.is_empty() { title } else { stripped.to_string() };
        }
    }

    title
}

/// Orders products by rank and renumbers them 1..n without gaps.
pub fn rerank(mut products: Vec<Product>) -> Vec<Product> {
    products.sort_by_key(|p| p.rank);
    for (idx, product) in products.iter_mut().enumerate() {
        product.rank = idx as u32 + 1;
    }
    products
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "https://global.oliveyoung.com";

    fn card(n: u32, brand: &str, name: &str, price: &str, orig: &str) -> String {
        format!(
            r#"<li>
                <a href="/product/detail?prdtNo=GA{n}">
                    <span class="brand">{brand}</span>
                    <span class="name">{name}</span>
                </a>
                <div class="price"><span class="num">{price}</span></div>
                <span class="orig_price">{orig}</span>
            </li>"#
        )
    }

    fn make_page(count: u32) -> String {
        let mut html = String::from(r#"<html><body><ul class="tab_cont_list">"#);
        for n in 1..=count {
            html.push_str(&card(n, "Brand", &format!("Product {n}"), "US$10.00", "US$20.00"));
        }
        html.push_str("</ul></body></html>");
        html
    }

    // Brand / title helpers

    #[test]
    fn test_remove_brand_from_title() {
        assert_eq!(remove_brand_from_title("COSRX Snail Essence", "COSRX"), "Snail Essence");
        assert_eq!(remove_brand_from_title("[COSRX] Snail Essence", "cosrx"), "Snail Essence");
        assert_eq!(remove_brand_from_title("(COSRX) - Snail Essence", "COSRX"), "Snail Essence");
        assert_eq!(remove_brand_from_title("COSRX | Snail Essence", "COSRX"), "Snail Essence");
        assert_eq!(remove_brand_from_title("Snail Essence", "COSRX"), "Snail Essence");
        assert_eq!(remove_brand_from_title("Snail  Essence ", ""), "Snail Essence");
    }

    #[test]
    fn test_remove_brand_special_characters() {
        assert_eq!(
            remove_brand_from_title("d'Alba (Italy) White Truffle Spray", "d'Alba (Italy)"),
            "White Truffle Spray"
        );
        assert_eq!(remove_brand_from_title("I'm from+ Rice Toner", "I'm from+"), "Rice Toner");
    }

    #[test]
    fn test_remove_brand_title_is_only_brand() {
        assert_eq!(remove_brand_from_title("COSRX", "COSRX"), "COSRX");
    }

    #[test]
    fn test_split_brand_and_product() {
        let (brand, product) = split_brand_and_product("\n  ANUA \n Heartleaf 77% Toner \n");
        assert_eq!(brand, "ANUA");
        assert_eq!(product, "Heartleaf 77% Toner");

        let (brand, product) = split_brand_and_product("ANUA\nANUA Heartleaf Toner");
        assert_eq!(brand, "ANUA");
        assert_eq!(product, "Heartleaf Toner");
    }

    #[test]
    fn test_split_brand_and_product_single_line() {
        let (brand, product) = split_brand_and_product("ANUA");
        assert_eq!(brand, "ANUA");
        assert_eq!(product, "ANUA");

        let (brand, product) = split_brand_and_product("   \n ");
        assert!(brand.is_empty());
        assert!(product.is_empty());
    }

    #[test]
    fn test_rerank() {
        let mut products = Parser::new(BASE).parse_bestseller(&make_page(3)).unwrap();
        products[0].rank = 7;
        products[1].rank = 2;
        products[2].rank = 40;

        let ranked = rerank(products);
        assert_eq!(ranked.iter().map(|p| p.rank).collect::<Vec<_>>(), vec![1, 2, 3]);
        assert_eq!(ranked[0].title, "Product 2");
        assert_eq!(ranked[1].title, "Product 1");
        assert_eq!(ranked[2].title, "Product 3");
    }

    // Page parsing

    #[test]
    fn test_parse_ranking_order_and_fields() {
        let products = Parser::new(BASE).parse_bestseller(&make_page(12)).unwrap();
        assert_eq!(products.len(), 12);

        let first = &products[0];
        assert_eq!(first.rank, 1);
        assert_eq!(first.brand, "Brand");
        assert_eq!(first.title, "Product 1");
        assert_eq!(first.url, "https://global.oliveyoung.com/product/detail?prdtNo=GA1");
        assert_eq!(first.current_price(), Some(10.0));
        assert_eq!(first.original_price(), Some(20.0));
        assert_eq!(first.discount_percent, Some(50));

        assert_eq!(products[11].rank, 12);
    }

    #[test]
    fn test_parse_printed_percent_wins() {
        let html = r#"<ul class="tab_cont_list"><li>
            <a href="/product/detail?prdtNo=GA1"><span class="name">Toner</span></a>
            <span class="sale_price">US$25.99</span>
            <span class="orig_price">US$30.00</span>
            <span class="percent">15%</span>
        </li></ul>"#;
        let products = Parser::new(BASE).parse_bestseller(html).unwrap();
        assert_eq!(products[0].discount_percent, Some(15));
    }

    #[test]
    fn test_parse_price_falls_back_to_card_text() {
        let html = r#"<ul class="tab_cont_list"><li>
            <a href="/product/detail?prdtNo=GA1"><span class="name">Toner</span></a>
            <p>Sale US$ 15.00</p><p>Value US$20.00</p>
        </li></ul>"#;
        let products = Parser::new(BASE).parse_bestseller(html).unwrap();
        assert_eq!(products[0].current_price(), Some(15.0));
        assert_eq!(products[0].original_price(), Some(20.0));
        assert_eq!(products[0].discount_percent, Some(25));
    }

    #[test]
    fn test_parse_prices_with_non_breaking_spaces() {
        let html = r#"<ul class="tab_cont_list"><li>
            <a href="/product/detail?prdtNo=GA1"><span class="name">Toner&nbsp;&nbsp;200ml</span></a>
            <p>Sale US$&nbsp;15.00</p><p>Value&nbsp;US$&nbsp;20.00</p>
        </li></ul>"#;
        let products = Parser::new(BASE).parse_bestseller(html).unwrap();
        assert_eq!(products[0].title, "Toner 200ml");
        assert_eq!(products[0].current_price(), Some(15.0));
        assert_eq!(products[0].original_price(), Some(20.0));
        assert_eq!(products[0].discount_percent, Some(25));
    }

    #[test]
    fn test_parse_without_price() {
        let html = r#"<ul class="tab_cont_list"><li>
            <a href="/product/detail?prdtNo=GA1"><span class="name">Toner</span></a>
        </li></ul>"#;
        let products = Parser::new(BASE).parse_bestseller(html).unwrap();
        assert!(products[0].price.is_none());
        assert!(products[0].discount_percent.is_none());
    }

    #[test]
    fn test_parse_title_from_anchor_text() {
        let html = r#"<ul class="tab_cont_list"><li>
            <a href="https://global.oliveyoung.com/product/detail?prdtNo=GA9">
                <p>ANUA</p>
                <p>Heartleaf 77% Soothing Toner</p>
            </a>
        </li></ul>"#;
        let products = Parser::new(BASE).parse_bestseller(html).unwrap();
        assert_eq!(products[0].brand, "ANUA");
        assert_eq!(products[0].title, "Heartleaf 77% Soothing Toner");
    }

    #[test]
    fn test_parse_brand_from_anchor_when_card_has_name_only() {
        let html = r#"<ul class="tab_cont_list"><li>
            <a href="/product/detail?prdtNo=GA9">
                <p>ANUA</p>
                <p class="name">ANUA Heartleaf Toner</p>
            </a>
        </li></ul>"#;
        let products = Parser::new(BASE).parse_bestseller(html).unwrap();
        assert_eq!(products[0].brand, "ANUA");
        assert_eq!(products[0].title, "ANUA Heartleaf Toner");
        assert_eq!(products[0].display_name(), "Heartleaf Toner");
    }

    #[test]
    fn test_parse_single_line_anchor_is_not_a_brand() {
        let html = r#"<ul class="tab_cont_list"><li>
            <a href="/product/detail?prdtNo=GA9"><span class="name">Heartleaf Toner</span></a>
        </li></ul>"#;
        let products = Parser::new(BASE).parse_bestseller(html).unwrap();
        assert_eq!(products[0].brand, "");
        assert_eq!(products[0].title, "Heartleaf Toner");
    }

    #[test]
    fn test_parse_skips_cards_without_link() {
        let html = r#"<ul class="tab_cont_list">
            <li><a href="javascript:void(0)"><span class="name">Wishlist</span></a></li>
            <li><span class="name">No link</span></li>
            <li><a href="/product/detail?prdtNo=GA1"><span class="name">Real</span></a></li>
        </ul>"#;
        let products = Parser::new(BASE).parse_bestseller(html).unwrap();
        assert_eq!(products.len(), 1);
        assert_eq!(products[0].title, "Real");
        assert_eq!(products[0].rank, 1);
    }

    #[test]
    fn test_parse_dedupes_urls() {
        let html = format!(
            r#"<ul class="tab_cont_list">{}{}{}</ul>"#,
            card(1, "A", "First", "US$1.00", ""),
            card(1, "A", "First again", "US$1.00", ""),
            card(2, "B", "Second", "US$2.00", "")
        );
        let products = Parser::new(BASE).parse_bestseller(&html).unwrap();
        assert_eq!(products.len(), 2);
        assert_eq!(products[0].title, "First");
        assert_eq!(products[1].title, "Second");
        assert_eq!(products[1].rank, 2);
    }

    #[test]
    fn test_tier_fallback_prefers_tier_with_enough_cards() {
        // Two cards in the specific list, twelve in a generic list.
        let mut html = String::from(r#"<html><body><ul class="best_list">"#);
        for n in 1..=2 {
            html.push_str(&card(n, "Top", &format!("Top {n}"), "US$1.00", ""));
        }
        html.push_str(r#"</ul><div>"#);
        for n in 10..22 {
            html.push_str(&format!(
                r#"<div class="prod_area"><a href="/product/detail?prdtNo=GB{n}"><span class="tit">Area {n}</span></a></div>"#
            ));
        }
        html.push_str("</div></body></html>");

        let products = Parser::new(BASE).parse_bestseller(&html).unwrap();
        assert_eq!(products.len(), 12);
        assert_eq!(products[0].title, "Area 10");
    }

    #[test]
    fn test_tier_fallback_uses_first_non_empty_tier() {
        let html = format!(r#"<ul class="best_list">{}</ul>"#, card(1, "A", "Only", "US$1.00", ""));
        let products = Parser::new(BASE).parse_bestseller(&html).unwrap();
        assert_eq!(products.len(), 1);
        assert_eq!(products[0].title, "Only");
    }

    #[test]
    fn test_with_min_cards() {
        let html = format!(
            r#"<ul class="tab_cont_list">{}</ul><ul class="best_list">{}{}</ul>"#,
            card(1, "A", "Tab", "US$1.00", ""),
            card(2, "B", "Best one", "US$1.00", ""),
            card(3, "C", "Best two", "US$1.00", "")
        );
        let products = Parser::new(BASE).with_min_cards(2).parse_bestseller(&html).unwrap();
        // "ul li" (tier 4) would also match, but "ul.best_list li" (tier 2) comes first
        assert_eq!(products.len(), 2);
        assert_eq!(products[0].title, "Best one");
    }

    #[test]
    fn test_image_url() {
        let html = r#"<ul class="tab_cont_list"><li>
            <a href="/product/detail?prdtNo=GA1"><img data-src="//cdn.example.com/a.jpg"><span class="name">X</span></a>
        </li></ul>"#;
        let products = Parser::new(BASE).parse_bestseller(html).unwrap();
        assert_eq!(products[0].image_url.as_deref(), Some("https://cdn.example.com/a.jpg"));
    }

    #[test]
    fn test_blocked_page() {
        let html = "<html><head><title>Just a moment...</title></head><body></body></html>";
        let err = Parser::new(BASE).parse_bestseller(html).unwrap_err();
        assert!(matches!(err.downcast_ref::<ScrapeError>(), Some(ScrapeError::Blocked)));

        let html = r#"<html><body><form id="challenge-form"></form></body></html>"#;
        assert!(Parser::new(BASE).parse_bestseller(html).is_err());
    }

    #[test]
    fn test_empty_page() {
        let products = Parser::new(BASE).parse_bestseller("<html></html>").unwrap();
        assert!(products.is_empty());
    }

    #[test]
    fn test_absolutize() {
        let parser = Parser::new("https://global.oliveyoung.com/");
        assert_eq!(parser.absolutize("/a"), "https://global.oliveyoung.com/a");
        assert_eq!(parser.absolutize("a"), "https://global.oliveyoung.com/a");
        assert_eq!(parser.absolutize("https://x.com/a"), "https://x.com/a");
        assert_eq!(parser.absolutize("//cdn.x.com/a.png"), "https://cdn.x.com/a.png");
    }
}
