//! Result-page parser
//!
//! Turns one HTML result page into raw listings plus the total page count.
//! Parsing is synchronous and the document never outlives the call, so it is
//! safe to use from async code between awaits.

use crate::config::SelectorConfig;
use crate::extract::selectors::SelectorSet;
use crate::model::RawListing;
use crate::ConfigResult;
use scraper::{ElementRef, Html, Selector};
use thiserror::Error;
use url::Url;

/// Everything extracted from one result page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedPage {
    /// Listings in page order
    pub listings: Vec<RawListing>,

    /// Total number of result pages announced by the pagination (at least 1)
    pub total_pages: u32,
}

/// Why a single result card was skipped
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ExtractionItemError {
    #[error("result card has neither a title nor a detail link")]
    MissingIdentity,

    #[error("result card has no title and an unusable link '{0}'")]
    UnresolvableLink(String),
}

/// Extracts listings from result pages using a compiled selector set
#[derive(Debug, Clone)]
pub struct Extractor {
    selectors: SelectorSet,
}

impl Extractor {
    /// Builds an extractor from configured selectors
    pub fn new(config: &SelectorConfig) -> ConfigResult<Self> {
        Ok(Self {
            selectors: SelectorSet::compile(config)?,
        })
    }

    /// Parses one result page
    ///
    /// Cards that cannot be identified are logged at debug level and
    /// skipped; they never fail the page.
    ///
    /// # Example
    ///
    /// ```
    /// use auto_alert::Extractor;
    /// use url::Url;
    ///
    /// let html = r#"<article class="result-item">
    ///     <a class="result-link" href="/d/1"><h2 class="result-title">BMW 320d</h2></a>
    ///     <span class="result-price">24.990 €</span>
    /// </article>"#;
    /// let base = Url::parse("https://cars.example.com/search").unwrap();
    /// let page = Extractor::default().extract(html, &base);
    ///
    /// assert_eq!(page.listings.len(), 1);
    /// assert_eq!(page.listings[0].detail_link.as_deref(), Some("https://cars.example.com/d/1"));
    /// ```
    pub fn extract(&self, html: &str, base_url: &Url) -> ExtractedPage {
        let document = Html::parse_document(html);

        let mut listings = Vec::new();
        for (position, item) in document.select(&self.selectors.item).enumerate() {
            match self.extract_item(item, base_url) {
                Ok(listing) => listings.push(listing),
                Err(e) => {
                    tracing::debug!("Skipping result card {} on {}: {}", position, base_url, e);
                }
            }
        }

        let total_pages = self.total_pages(&document);

        ExtractedPage {
            listings,
            total_pages,
        }
    }

    fn extract_item(
        &self,
        item: ElementRef<'_>,
        base_url: &Url,
    ) -> Result<RawListing, ExtractionItemError> {
        let selectors = &self.selectors;

        let title = first_text(item, &selectors.title);
        let href = item
            .select(&selectors.link)
            .find_map(|link| link.value().attr("href"))
            .map(str::to_string);
        let detail_link = href.as_deref().and_then(|href| resolve_link(href, base_url));

        if title.is_none() && detail_link.is_none() {
            return Err(match href {
                Some(href) => ExtractionItemError::UnresolvableLink(href),
                None => ExtractionItemError::MissingIdentity,
            });
        }

        let mut images: Vec<String> = Vec::new();
        for image in item.select(&selectors.image) {
            let src = image
                .value()
                .attr("src")
                .or_else(|| image.value().attr("data-src"));
            if let Some(url) = src.and_then(|src| resolve_link(src, base_url)) {
                if !images.contains(&url) {
                    images.push(url);
                }
            }
        }

        let features = item
            .select(&selectors.feature)
            .filter_map(|feature| element_text(feature))
            .collect();

        let source_id = item
            .value()
            .attr(&selectors.source_id_attribute)
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(str::to_string);

        Ok(RawListing {
            title,
            price_text: first_text(item, &selectors.price),
            detail_link,
            specs_text: joined_text(item, &selectors.specs),
            seller_text: joined_text(item, &selectors.seller),
            images,
            features,
            source_id,
        })
    }

    /// Largest page number shown in the pagination, or 1
    fn total_pages(&self, document: &Html) -> u32 {
        document
            .select(&self.selectors.pagination)
            .filter_map(|element| element_text(element)?.parse::<u32>().ok())
            .max()
            .unwrap_or(1)
            .max(1)
    }
}

impl Default for Extractor {
    fn default() -> Self {
        Self {
            selectors: SelectorSet::compile(&SelectorConfig::default())
                .expect("built-in selectors are valid"),
        }
    }
}

/// Visible text of an element with whitespace collapsed
fn element_text(element: ElementRef<'_>) -> Option<String> {
    let text = element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ");
    (!text.is_empty()).then_some(text)
}

fn first_text(item: ElementRef<'_>, selector: &Selector) -> Option<String> {
    item.select(selector).find_map(element_text)
}

/// Text of every matching element, joined with " • "
fn joined_text(item: ElementRef<'_>, selector: &Selector) -> Option<String> {
    let parts: Vec<String> = item.select(selector).filter_map(element_text).collect();
    (!parts.is_empty()).then(|| parts.join(" • "))
}

/// Resolves an href against the page URL
///
/// Returns None for empty, fragment-only, `javascript:`, `mailto:`, `tel:`
/// and `data:` links, and for anything that does not resolve to http(s).
fn resolve_link(href: &str, base_url: &Url) -> Option<String> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    if href.starts_with("javascript:")
        || href.starts_with("mailto:")
        || href.starts_with("tel:")
        || href.starts_with("data:")
    {
        return None;
    }

    let absolute_url = base_url.join(href).ok()?;
    match absolute_url.scheme() {
        "http" | "https" => Some(absolute_url.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_url() -> Url {
        Url::parse("https://cars.example.com/search?ms=3500").unwrap()
    }

    const RESULT_PAGE: &str = r#"
        <html><body>
        <main>
            <article class="result-item" data-listing-id="381234567">
                <a class="result-link" href="/details/381234567">
                    <h2 class="result-title">BMW   320d Touring</h2>
                </a>
                <span class="result-price">24.990&nbsp;€</span>
                <div class="result-specs">EZ 03/2019</div>
                <div class="result-specs">45.000 km, 140 kW (190 PS)</div>
                <div class="result-seller">Autohaus Schmidt <span>Händler</span></div>
                <img src="https://img.example.com/1.jpg">
                <img data-src="/img/2.jpg">
                <img src="https://img.example.com/1.jpg">
                <span class="result-feature">Navigation</span>
                <span class="result-feature">Sitzheizung</span>
            </article>
            <article class="result-item">
                <span class="result-price">9.500 €</span>
            </article>
            <article class="result-item">
                <a class="result-link" href="javascript:void(0)">Details</a>
            </article>
            <article class="result-item">
                <h2 class="result-title">Audi A4 Avant</h2>
            </article>
        </main>
        <nav class="pagination">
            <a href="?page=1">1</a>
            <a href="?page=2">2</a>
            <a href="?page=7">7</a>
            <a href="?page=2">Weiter</a>
        </nav>
        </body></html>
    "#;

    #[test]
    fn test_extracts_full_card() {
        let page = Extractor::default().extract(RESULT_PAGE, &base_url());
        let first = &page.listings[0];

        assert_eq!(first.title.as_deref(), Some("BMW 320d Touring"));
        assert_eq!(first.price_text.as_deref(), Some("24.990 €"));
        assert_eq!(
            first.detail_link.as_deref(),
            Some("https://cars.example.com/details/381234567")
        );
        assert_eq!(
            first.specs_text.as_deref(),
            Some("EZ 03/2019 • 45.000 km, 140 kW (190 PS)")
        );
        assert_eq!(first.seller_text.as_deref(), Some("Autohaus Schmidt Händler"));
        assert_eq!(
            first.images,
            vec![
                "https://img.example.com/1.jpg".to_string(),
                "https://cars.example.com/img/2.jpg".to_string()
            ]
        );
        assert_eq!(first.features, vec!["Navigation", "Sitzheizung"]);
        assert_eq!(first.source_id.as_deref(), Some("381234567"));
    }

    #[test]
    fn test_skips_cards_without_identity() {
        let page = Extractor::default().extract(RESULT_PAGE, &base_url());

        assert_eq!(page.listings.len(), 2);
        assert_eq!(page.listings[1].title.as_deref(), Some("Audi A4 Avant"));
        assert_eq!(page.listings[1].detail_link, None);
    }

    #[test]
    fn test_total_pages_from_pagination() {
        let page = Extractor::default().extract(RESULT_PAGE, &base_url());
        assert_eq!(page.total_pages, 7);
    }

    #[test]
    fn test_empty_page() {
        let page = Extractor::default().extract("<html><body></body></html>", &base_url());
        assert!(page.listings.is_empty());
        assert_eq!(page.total_pages, 1);
    }

    #[test]
    fn test_custom_selectors() {
        let config = SelectorConfig {
            item: "li.car".to_string(),
            title: "b".to_string(),
            ..SelectorConfig::default()
        };
        let extractor = Extractor::new(&config).unwrap();
        let html = r#"<ul><li class="car"><b>Opel Astra</b></li><li class="car"><b>VW Golf</b></li></ul>"#;

        let page = extractor.extract(html, &base_url());
        let titles: Vec<_> = page.listings.iter().filter_map(|l| l.title.as_deref()).collect();
        assert_eq!(titles, vec!["Opel Astra", "VW Golf"]);
    }

    #[test]
    fn test_resolve_link() {
        let base = base_url();
        assert_eq!(
            resolve_link("/d/1", &base),
            Some("https://cars.example.com/d/1".to_string())
        );
        assert_eq!(resolve_link("#top", &base), None);
        assert_eq!(resolve_link("mailto:a@b.de", &base), None);
        assert_eq!(resolve_link("ftp://files.example.com/x", &base), None);
    }
}
