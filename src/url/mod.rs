//! URL handling module for Repro-Harvest
//!
//! This module provides catalog/detail URL construction, domain extraction,
//! wildcard matching for the allowed-domain filter, and path-safe naming for
//! downloaded assets.

mod domain;
mod matcher;
mod normalize;

pub use domain::extract_domain;
pub use matcher::matches_wildcard;
pub use normalize::{catalog_page_url, detail_url, file_name_from_url, sanitize_path_segment};

use ::url::Url;

/// Checks whether a request to `url` stays on the allowed domains
///
/// An empty allow list permits every host.
///
/// # Examples
///
/// ```
/// use repro_harvest::url::is_allowed_domain;
/// use url::Url;
///
/// let allowed = vec!["*.worldbank.org".to_string()];
/// let url = Url::parse("https://reproducibility.worldbank.org/catalog/1").unwrap();
/// assert!(is_allowed_domain(&url, &allowed));
/// assert!(!is_allowed_domain(&Url::parse("https://example.com/").unwrap(), &allowed));
/// ```
pub fn is_allowed_domain(url: &Url, allowed: &[String]) -> bool {
    if allowed.is_empty() {
        return true;
    }

    match extract_domain(url) {
        Some(domain) => allowed
            .iter()
            .any(|pattern| matches_wildcard(&pattern.to_lowercase(), &domain)),
        None => false,
    }
}
