//! HTML extraction for catalog and detail pages
//!
//! Both operations are pure: the same document and page URL always produce
//! the same value, and nothing here touches the network or storage.
//!
//! - Catalog pages yield the canonical detail-page URLs they link to
//! - Detail pages yield a [`ProjectRecord`]

use crate::config::SelectorConfig;
use crate::model::{AssetKind, ProjectRecord};
use crate::url::detail_url;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use url::Url;

/// Site-specific extraction rules
#[derive(Debug, Clone)]
pub struct Extractor {
    selectors: SelectorConfig,
    detail_suffix: String,
}

impl Extractor {
    /// Creates an extractor from validated selectors
    pub fn new(selectors: SelectorConfig, detail_suffix: impl Into<String>) -> Self {
        Self {
            selectors,
            detail_suffix: detail_suffix.into(),
        }
    }

    /// Extracts project links from a catalog page
    ///
    /// Anchors matching the catalog-link selector are kept when their href
    /// contains the catalog segment and carries no query string. Each is
    /// resolved against `page_url`, turned into its detail-page URL, and
    /// deduplicated on that final URL in document order.
    ///
    /// # Example
    ///
    /// ```
    /// use repro_harvest::config::SelectorConfig;
    /// use repro_harvest::crawler::Extractor;
    /// use url::Url;
    ///
    /// let extractor = Extractor::new(SelectorConfig::default(), "/related-materials");
    /// let html = r#"<div class="catalog-item"><a class="d-flex" href="/index.php/catalog/7">Study</a></div>"#;
    /// let page = Url::parse("https://example.com/index.php/catalog/?&page=1").unwrap();
    ///
    /// let links = extractor.extract_links(html, &page);
    /// assert_eq!(links[0].as_str(), "https://example.com/index.php/catalog/7/related-materials");
    /// ```
    pub fn extract_links(&self, html: &str, page_url: &Url) -> Vec<Url> {
        let document = Html::parse_document(html);
        let Ok(selector) = Selector::parse(&self.selectors.catalog_link) else {
            return Vec::new();
        };

        let mut seen = HashSet::new();
        let mut links = Vec::new();

        for element in document.select(&selector) {
            let Some(href) = element.value().attr("href").map(str::trim) else {
                continue;
            };

            if !href.contains(self.selectors.catalog_segment.as_str()) || href.contains('?') {
                continue;
            }

            let Some(absolute) = resolve_link(href, page_url) else {
                continue;
            };

            let detail = detail_url(&absolute, &self.detail_suffix);
            if seen.insert(detail.clone()) {
                links.push(detail);
            }
        }

        links
    }

    /// Extracts the project record from a detail page
    ///
    /// A missing title becomes the empty string; a missing download anchor
    /// leaves the corresponding link empty.
    pub fn extract_record(&self, html: &str, page_url: &Url) -> ProjectRecord {
        let document = Html::parse_document(html);

        ProjectRecord {
            project_name: self.extract_title(&document),
            project_page: page_url.clone(),
            pdf_link: self.extract_asset_link(&document, page_url, AssetKind::Pdf),
            zip_link: self.extract_asset_link(&document, page_url, AssetKind::Zip),
        }
    }

    fn extract_title(&self, document: &Html) -> String {
        Selector::parse(&self.selectors.title)
            .ok()
            .and_then(|selector| {
                document
                    .select(&selector)
                    .next()
                    .and_then(|element| element.text().next())
                    .map(|text| text.trim().to_string())
            })
            .unwrap_or_default()
    }

    fn extract_asset_link(&self, document: &Html, page_url: &Url, kind: AssetKind) -> Option<Url> {
        let selector = Selector::parse(&self.selectors.download_link).ok()?;

        document
            .select(&selector)
            .find(|element| self.has_extension(element, kind))
            .and_then(|element| element.value().attr("href"))
            .and_then(|href| resolve_link(href, page_url))
    }

    fn has_extension(&self, element: &ElementRef<'_>, kind: AssetKind) -> bool {
        element
            .value()
            .attr(&self.selectors.extension_attribute)
            .is_some_and(|ext| ext.trim().eq_ignore_ascii_case(kind.extension()))
    }
}

/// Resolves an href against the page URL
///
/// Returns None for empty, fragment-only, and non-HTTP(S) links.
fn resolve_link(href: &str, base_url: &Url) -> Option<Url> {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    base_url
        .join(href)
        .ok()
        .filter(|url| url.scheme() == "http" || url.scheme() == "https")
}
