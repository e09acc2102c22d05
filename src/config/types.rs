use serde::Deserialize;

/// Main configuration structure for Repro-Harvest
///
/// Every section has a default, so an empty TOML document describes the
/// reproducibility catalog crawl.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub crawler: CrawlerConfig,
    pub pacing: PacingConfig,
    pub fetch: FetchConfig,
    pub output: OutputConfig,
    pub selectors: SelectorConfig,
}

/// Crawl shape and concurrency configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct CrawlerConfig {
    /// Maximum number of catalog pages to visit
    pub max_pages: u32,

    /// Catalog page URL template; `{page}` is replaced by the page index
    pub catalog_url: String,

    /// Index of the first catalog page
    pub start_page: u32,

    /// Path suffix that turns a project URL into its related-materials page
    pub detail_suffix: String,

    /// Hosts detail requests may target (exact or `*.` wildcard, empty allows all)
    pub allowed_domains: Vec<String>,

    /// Maximum number of detail pages fetched concurrently
    pub detail_concurrency: u32,

    /// Maximum number of asset downloads running concurrently
    pub download_concurrency: u32,

    /// Retries after a failed catalog or detail fetch
    pub max_retries: u32,

    /// Ask the fetch client for script-rendered content on HTML pages
    pub render_javascript: bool,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            max_pages: 5,
            catalog_url: "https://reproducibility.worldbank.org/index.php/catalog/?&page={page}"
                .to_string(),
            start_page: 1,
            detail_suffix: "/related-materials".to_string(),
            allowed_domains: vec!["reproducibility.worldbank.org".to_string()],
            detail_concurrency: 4,
            download_concurrency: 4,
            max_retries: 0,
            render_javascript: true,
        }
    }
}

/// Request pacing configuration (milliseconds)
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct PacingConfig {
    /// Lower bound of the randomized delay before each fetch
    pub min_delay_ms: u64,

    /// Upper bound of the randomized delay before each fetch
    pub max_delay_ms: u64,

    /// Base of the exponential backoff between retries
    pub backoff_base_ms: u64,

    /// Cap of the exponential backoff between retries
    pub backoff_max_ms: u64,
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            min_delay_ms: 2000,
            max_delay_ms: 5000,
            backoff_base_ms: 1000,
            backoff_max_ms: 30_000,
        }
    }
}

/// HTTP transport configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct FetchConfig {
    /// Whole-request timeout in seconds
    pub timeout_secs: u64,

    /// Connection timeout in seconds
    pub connect_timeout_secs: u64,

    /// User-Agent values rotated across requests
    pub user_agents: Vec<String>,

    /// Referer values rotated across requests
    pub referers: Vec<String>,

    /// Accept-Language header value
    pub accept_language: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            connect_timeout_secs: 10,
            user_agents: vec![
                "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36".to_string(),
                "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.4 Safari/605.1.15".to_string(),
                "Mozilla/5.0 (X11; Linux x86_64; rv:125.0) Gecko/20100101 Firefox/125.0".to_string(),
            ],
            referers: vec![
                "https://www.google.com/".to_string(),
                "https://www.bing.com/".to_string(),
                "https://duckduckgo.com/".to_string(),
            ],
            accept_language: "en-US,en;q=0.9".to_string(),
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct OutputConfig {
    /// Path to the SQLite database file
    pub database_path: String,

    /// Directory downloaded assets are stored under
    pub storage_root: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            database_path: "data/projects.db".to_string(),
            storage_root: "downloads".to_string(),
        }
    }
}

/// CSS selectors describing the catalog markup
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct SelectorConfig {
    /// Anchors on a catalog page that point at project pages
    pub catalog_link: String,

    /// Path segment a project link must contain
    pub catalog_segment: String,

    /// Element holding the project title on a detail page
    pub title: String,

    /// Anchors on a detail page that are download links
    pub download_link: String,

    /// Attribute carrying the file extension of a download link
    pub extension_attribute: String,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            catalog_link: "a.d-flex".to_string(),
            catalog_segment: "/catalog/".to_string(),
            title: "h1#dataset-title span".to_string(),
            download_link: "a[class*=\"download\"]".to_string(),
            extension_attribute: "data-extension".to_string(),
        }
    }
}
