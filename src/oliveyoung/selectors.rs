//! CSS selectors for the Olive Young Global bestseller page.
//!
//! The markup shifts often, so every field is an ordered list of candidate
//! selectors. The parser walks each list and keeps the first one that
//! yields something. When the page changes, add the new selector at the
//! front of the relevant list and refresh the fixture in `tests/fixtures/`.

use scraper::Selector;
use std::sync::LazyLock;

fn compile(candidates: &[&str]) -> Vec<Selector> {
    candidates
        .iter()
        .map(|s| Selector::parse(s).unwrap_or_else(|e| panic!("invalid selector {s:?}: {e:?}")))
        .collect()
}

/// Selectors for the ranking list.
pub mod bestseller {
    use super::*;

    /// Product card containers, most specific first.
    pub static ITEMS: LazyLock<Vec<Selector>> = LazyLock::new(|| {
        compile(&[
            "ul.tab_cont_list li",
            "ul#bestSellerContent li",
            "ul.best_list li",
            "ul li.prod_item",
            "ul li",
            "div.prod_area",
        ])
    });

    /// Product name inside a card.
    pub static NAME: LazyLock<Vec<Selector>> = LazyLock::new(|| {
        compile(&[
            ".product_name",
            ".prod_name",
            ".name",
            ".tit",
            ".tx_name",
            ".item_name",
            "a[title]",
        ])
    });

    /// Brand inside a card.
    pub static BRAND: LazyLock<Vec<Selector>> =
        LazyLock::new(|| compile(&[".brand", ".brand_name", ".tx_brand", ".brandName"]));

    /// Detail link inside a card.
    pub static LINK: LazyLock<Vec<Selector>> =
        LazyLock::new(|| compile(&["a", "a.prod_link", "a.link", "a.detail_link"]));

    /// Current (sale) price text.
    pub static PRICE: LazyLock<Vec<Selector>> = LazyLock::new(|| {
        compile(&[
            ".price .num",
            ".sale_price",
            ".discount_price",
            ".final_price",
            ".price",
            ".value",
        ])
    });

    /// Original (list) price text.
    pub static ORIGINAL_PRICE: LazyLock<Vec<Selector>> = LazyLock::new(|| {
        compile(&[".orig_price", ".normal_price", ".consumer", ".strike", ".was"])
    });

    /// Printed discount rate.
    pub static PERCENT: LazyLock<Vec<Selector>> =
        LazyLock::new(|| compile(&[".percent", ".dc", ".discount_rate", ".rate"]));

    /// Product image.
    pub static IMAGE: LazyLock<Selector> = LazyLock::new(|| Selector::parse("img").unwrap());
}

/// Selectors for detecting bot-protection pages.
pub mod errors {
    use super::*;

    /// Challenge forms and captcha widgets.
    pub static CHALLENGE: LazyLock<Selector> = LazyLock::new(|| {
        Selector::parse(
            "form#challenge-form, \
             #cf-challenge-running, \
             .cf-browser-verification, \
             iframe[src*='captcha'], \
             div.g-recaptcha",
        )
        .unwrap()
    });

    /// Page title, checked for challenge wording.
    pub static TITLE: LazyLock<Selector> = LazyLock::new(|| Selector::parse("title").unwrap());
}

/// Consent and banner close buttons tried by the browser renderer.
pub const CONSENT_BUTTONS: &[&str] = &[
    "button#onetrust-accept-btn-handler",
    "button.btn_accept",
    "button[aria-label='Close']",
    "button.btn_close",
];

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::Html;

    #[test]
    fn test_selectors_compile() {
        assert_eq!(bestseller::ITEMS.len(), 6);
        assert_eq!(bestseller::NAME.len(), 7);
        assert_eq!(bestseller::BRAND.len(), 4);
        assert_eq!(bestseller::LINK.len(), 4);
        assert_eq!(bestseller::PRICE.len(), 6);
        assert_eq!(bestseller::ORIGINAL_PRICE.len(), 5);
        assert_eq!(bestseller::PERCENT.len(), 4);
        let _ = &*bestseller::IMAGE;
        let _ = &*errors::CHALLENGE;
        let _ = &*errors::TITLE;
    }

    #[test]
    fn test_item_tier_matching() {
        let html = Html::parse_document(
            r#"<ul class="tab_cont_list">
                <li><a href="/product/detail?prdtNo=1"><span class="name">One</span></a></li>
                <li><a href="/product/detail?prdtNo=2"><span class="name">Two</span></a></li>
            </ul>"#,
        );

        let first_tier = &bestseller::ITEMS[0];
        assert_eq!(html.select(first_tier).count(), 2);
    }

    #[test]
    fn test_challenge_matching() {
        let html = Html::parse_document(r#"<form id="challenge-form" action="/cdn-cgi"></form>"#);
        assert!(html.select(&errors::CHALLENGE).next().is_some());
    }
}
