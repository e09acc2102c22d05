use url::Url;

/// Extracts the lowercase host of a URL
///
/// Returns `None` for URLs without a host.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use repro_harvest::url::extract_domain;
///
/// let url = Url::parse("https://Reproducibility.WorldBank.org/catalog").unwrap();
/// assert_eq!(extract_domain(&url), Some("reproducibility.worldbank.org".to_string()));
/// ```
pub fn extract_domain(url: &Url) -> Option<String> {
    url.host_str().map(|h| h.to_lowercase())
}
