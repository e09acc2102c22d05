use crate::model::AssetKind;
use url::Url;

/// What a request is fetching
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestKind {
    /// A catalog listing page with its page index
    Catalog { page: u32 },

    /// A project's related-materials page
    Detail,

    /// A downloadable asset
    Asset(AssetKind),
}

/// A request handed to the fetch client
///
/// Requests are never mutated once issued; a retry is a new value produced
/// by [`CrawlRequest::retry`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlRequest {
    pub url: Url,
    pub kind: RequestKind,
    pub retry_count: u32,

    /// Whether the page needs script execution before its content is usable.
    /// Opaque to the coordinator; only fetch clients interpret it.
    pub render: bool,
}

impl CrawlRequest {
    pub fn catalog(url: Url, page: u32, render: bool) -> Self {
        Self {
            url,
            kind: RequestKind::Catalog { page },
            retry_count: 0,
            render,
        }
    }

    pub fn detail(url: Url, render: bool) -> Self {
        Self {
            url,
            kind: RequestKind::Detail,
            retry_count: 0,
            render,
        }
    }

    pub fn asset(url: Url, kind: AssetKind) -> Self {
        Self {
            url,
            kind: RequestKind::Asset(kind),
            retry_count: 0,
            render: false,
        }
    }

    /// Returns the follow-up request for a retry
    pub fn retry(&self) -> Self {
        Self {
            retry_count: self.retry_count + 1,
            ..self.clone()
        }
    }
}
