use async_trait::async_trait;
use anyhow::Result;
use reqwest::Client;
use thiserror::Error;

use crate::config::{ScrapeTarget, SiteConfig};
use crate::models::{CandidateRecord, Marketplace};

mod magento;
mod prestashop;

pub use magento::MagentoScraper;
pub use prestashop::PrestashopScraper;

/// Structured failure for one candidate or one fetch. The merge engine
/// consumes these per-record and never lets them abort a pass.
#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("http status {status} for {url}")]
    Http { status: u16, url: String },
    #[error("request failed: {0}")]
    Request(String),
    #[error("bad selector: {0}")]
    Selector(String),
    #[error("missing {field} at {url}")]
    MissingField { field: &'static str, url: String },
}

/// One scraped item: either a candidate record or a structured failure the
/// engine will count and skip.
pub type ScrapeItem = Result<CandidateRecord, ScrapeError>;

#[async_trait]
pub trait CatalogScraper: Send + Sync {
    /// Walks the paginated listing of one scrape target and returns its
    /// items. Pagination stops at the first empty page or page-level fetch
    /// failure; whatever was collected so far is still returned.
    async fn scrape_target(&self, client: &Client, target: &ScrapeTarget) -> Result<Vec<ScrapeItem>>;

    fn marketplace(&self) -> Marketplace;
    fn site_config(&self) -> &SiteConfig;
}
