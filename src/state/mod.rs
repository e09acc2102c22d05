//! State module for tracking crawl progress
//!
//! `CrawlState` owns the catalog pagination state machine; `PageState` is the
//! state of a single catalog page within it.

mod page_state;

pub use page_state::{CrawlState, PageState, StopReason};
