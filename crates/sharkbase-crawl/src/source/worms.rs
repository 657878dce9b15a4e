//! WoRMS REST client
//!
//! Lists children through `AphiaChildrenByAphiaID/{id}`. The endpoint answers
//! 200 with a JSON array, 204 when the taxon has no children, and returns at
//! most [`PAGE_SIZE`] records per call; later pages are requested with a
//! 1-based `offset`.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

use super::{ChildListing, ChildSource, Pacer, SourceError};
use crate::config::CrawlConfig;
use crate::taxon::{TaxonId, TaxonNode, WormsRecord};

// ============================================================================
// WoRMS API Constants
// ============================================================================

pub const DEFAULT_BASE_URL: &str = "https://www.marinespecies.org/rest";

/// Records per page returned by AphiaChildrenByAphiaID
pub const PAGE_SIZE: usize = 50;

/// A listing of more than 10 000 children means the server keeps repeating a page.
pub const MAX_PAGES: usize = 200;

/// Child source backed by the WoRMS REST API
#[derive(Debug)]
pub struct WormsClient {
    client: Client,
    base_url: String,
    paginate: bool,
    marine_only: bool,
    pacer: Pacer,
}

impl WormsClient {
    /// Build a client from crawl configuration
    pub fn new(config: &CrawlConfig) -> Result<Self, SourceError> {
        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(SourceError::Client)?;

        Ok(Self {
            client,
            base_url: config.base_url().to_string(),
            paginate: config.paginate,
            marine_only: config.marine_only,
            pacer: Pacer::new(
                Duration::from_millis(config.request_interval_ms),
                config.burst_size,
            ),
        })
    }

    /// Replace the rate limiter
    pub fn with_pacer(mut self, pacer: Pacer) -> Self {
        self.pacer = pacer;
        self
    }

    pub fn children_url(&self, taxon: TaxonId) -> String {
        format!("{}/AphiaChildrenByAphiaID/{}", self.base_url, taxon)
    }

    async fn fetch_page(
        &self,
        taxon: TaxonId,
        offset: usize,
    ) -> Result<Vec<Value>, SourceError> {
        self.pacer.wait().await;

        let response = self
            .client
            .get(self.children_url(taxon))
            .query(&[
                ("marine_only", self.marine_only.to_string()),
                ("offset", offset.to_string()),
            ])
            .send()
            .await
            .map_err(|source| SourceError::Transport { taxon, source })?;

        match response.status() {
            StatusCode::NO_CONTENT => return Ok(Vec::new()),
            status if !status.is_success() => {
                return Err(SourceError::Status {
                    taxon,
                    status: status.as_u16(),
                });
            },
            _ => {},
        }

        let body = response
            .text()
            .await
            .map_err(|source| SourceError::Transport { taxon, source })?;

        if body.trim().is_empty() {
            return Ok(Vec::new());
        }

        serde_json::from_str(&body).map_err(|source| SourceError::Decode { taxon, source })
    }
}

#[async_trait]
impl ChildSource for WormsClient {
    async fn children(&self, taxon: TaxonId) -> Result<ChildListing, SourceError> {
        let mut listing = ChildListing::default();
        let mut offset = 1;

        for page_number in 0..MAX_PAGES {
            let page = self.fetch_page(taxon, offset).await?;
            let page_len = page.len();

            // Records are decoded one by one so a single odd record only costs itself
            for raw in page {
                let converted = serde_json::from_value::<WormsRecord>(raw)
                    .map_err(|err| SourceError::MalformedRecord(err.to_string()))
                    .and_then(TaxonNode::try_from);
                match converted {
                    Ok(node) => listing.nodes.push(node),
                    Err(err) => {
                        warn!(taxon_id = %taxon, error = %err, "Skipping malformed child record");
                        listing.skipped += 1;
                    },
                }
            }

            if !self.paginate || page_len < PAGE_SIZE {
                return Ok(listing);
            }

            offset += PAGE_SIZE;
            debug!(taxon_id = %taxon, page = page_number + 2, offset, "Requesting next page of children");
        }

        warn!(
            taxon_id = %taxon,
            pages = MAX_PAGES,
            "Stopped paging children; listing truncated"
        );
        listing.truncated = true;
        Ok(listing)
    }
}
