use crate::UrlError;
use url::Url;

/// Characters that may not appear in a stored file or folder name
const UNSAFE_PATH_CHARS: &[char] = &['/', '\\', ':', '*', '?', '"', '<', '>', '|'];

/// Builds the URL of a catalog page from its template
///
/// # Arguments
///
/// * `template` - Catalog URL with a `{page}` placeholder
/// * `page` - The page index
///
/// # Examples
///
/// ```
/// use repro_harvest::url::catalog_page_url;
///
/// let url = catalog_page_url("https://example.com/catalog/?&page={page}", 3).unwrap();
/// assert_eq!(url.as_str(), "https://example.com/catalog/?&page=3");
/// ```
pub fn catalog_page_url(template: &str, page: u32) -> Result<Url, UrlError> {
    let url_str = template.replace("{page}", &page.to_string());
    let url = Url::parse(&url_str).map_err(|e| UrlError::Parse(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(url.scheme().to_string()));
    }
    if url.host_str().is_none() {
        return Err(UrlError::MissingDomain);
    }

    Ok(url)
}

/// Turns a project URL into its detail (related-materials) page URL
///
/// The suffix is appended unless the path already ends with it; a trailing
/// slash is dropped first and the fragment is removed.
///
/// # Examples
///
/// ```
/// use repro_harvest::url::detail_url;
/// use url::Url;
///
/// let project = Url::parse("https://example.com/catalog/42/").unwrap();
/// let detail = detail_url(&project, "/related-materials");
/// assert_eq!(detail.as_str(), "https://example.com/catalog/42/related-materials");
/// assert_eq!(detail_url(&detail, "/related-materials"), detail);
/// ```
pub fn detail_url(project: &Url, suffix: &str) -> Url {
    let mut url = project.clone();
    url.set_fragment(None);

    if !url.path().ends_with(suffix) {
        let path = format!("{}{}", url.path().trim_end_matches('/'), suffix);
        url.set_path(&path);
    }

    url
}

/// Returns the last path segment of a URL, sanitized for use as a file name
pub fn file_name_from_url(url: &Url) -> Option<String> {
    url.path_segments()
        .and_then(|mut segments| segments.next_back())
        .and_then(sanitize_path_segment)
}

/// Sanitizes a string for use as one path component
///
/// Whitespace runs become `_`, path separators and other reserved characters
/// are dropped, and names consisting only of dots are rejected.
///
/// # Examples
///
/// ```
/// use repro_harvest::url::sanitize_path_segment;
///
/// assert_eq!(sanitize_path_segment("Growth and Jobs"), Some("Growth_and_Jobs".to_string()));
/// assert_eq!(sanitize_path_segment("../etc"), Some("etc".to_string()));
/// assert_eq!(sanitize_path_segment("   "), None);
/// ```
pub fn sanitize_path_segment(raw: &str) -> Option<String> {
    let mut out = String::with_capacity(raw.len());
    let mut pending_space = false;

    for c in raw.trim().chars() {
        if c.is_whitespace() {
            pending_space = true;
            continue;
        }
        if c.is_control() || UNSAFE_PATH_CHARS.contains(&c) {
            continue;
        }
        if pending_space && !out.is_empty() {
            out.push('_');
        }
        pending_space = false;
        out.push(c);
    }

    let trimmed = out.trim_start_matches('.');
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
