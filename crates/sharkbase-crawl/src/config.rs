//! Crawler configuration
//!
//! Defaults crawl the whole of Chondrichthyes (AphiaID 1517375). Every field can be
//! overridden from the environment (`SHARKBASE_*`) and then from the CLI.

use serde::{Deserialize, Serialize};
use sharkbase_common::{Result, SharkbaseError};
use std::path::PathBuf;

use crate::source::pacing::DEFAULT_REQUEST_INTERVAL_MS;
use crate::source::worms::DEFAULT_BASE_URL;
use crate::taxon::TaxonId;

// ============================================================================
// Crawler Configuration Constants
// ============================================================================

/// Chondrichthyes (cartilaginous fishes)
pub const DEFAULT_ROOT_ID: TaxonId = TaxonId(1517375);

/// File the downstream scripts read the classification from
pub const DEFAULT_OUTPUT_FILE: &str = "chondrichthyens_complet.json";

pub const DEFAULT_USER_AGENT: &str = "BioDataCollector_Peer_Project";

pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 20;

/// Real classifications are a few dozen levels deep at most.
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Configuration for one crawl
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CrawlConfig {
    /// Taxon the walk starts from
    pub root_id: TaxonId,
    /// WoRMS REST base URL; see [`CrawlConfig::base_url`]
    pub base_url: String,
    pub user_agent: String,
    /// Per-request timeout in seconds
    pub request_timeout_secs: u64,
    /// Minimum spacing between registry requests (0 disables pacing)
    pub request_interval_ms: u64,
    /// Requests allowed back to back before pacing applies
    pub burst_size: u32,
    /// Follow `offset` pages when a listing is full
    pub paginate: bool,
    /// Ask WoRMS for marine taxa only (the registry's own default)
    pub marine_only: bool,
    /// Nodes deeper than this are not expanded
    pub max_depth: usize,
    pub output_path: PathBuf,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            root_id: DEFAULT_ROOT_ID,
            base_url: DEFAULT_BASE_URL.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            request_interval_ms: DEFAULT_REQUEST_INTERVAL_MS,
            burst_size: 1,
            paginate: true,
            marine_only: true,
            max_depth: DEFAULT_MAX_DEPTH,
            output_path: PathBuf::from(DEFAULT_OUTPUT_FILE),
        }
    }
}

impl CrawlConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from environment variables
    ///
    /// - `SHARKBASE_ROOT_ID`: root AphiaID
    /// - `SHARKBASE_BASE_URL`: registry base URL
    /// - `SHARKBASE_USER_AGENT`: User-Agent header
    /// - `SHARKBASE_TIMEOUT_SECS`: per-request timeout
    /// - `SHARKBASE_REQUEST_INTERVAL_MS`: spacing between requests
    /// - `SHARKBASE_MAX_DEPTH`: deepest level expanded
    /// - `SHARKBASE_PAGINATE`: follow listing pages (true/false)
    /// - `SHARKBASE_MARINE_ONLY`: restrict to marine taxa (true/false)
    /// - `SHARKBASE_OUTPUT`: output file path
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(root) = std::env::var("SHARKBASE_ROOT_ID") {
            config.root_id = root.parse().map_err(|_| {
                SharkbaseError::config(format!("SHARKBASE_ROOT_ID is not a taxon id: '{}'", root))
            })?;
        }

        if let Ok(url) = std::env::var("SHARKBASE_BASE_URL") {
            config.base_url = url;
        }

        if let Ok(agent) = std::env::var("SHARKBASE_USER_AGENT") {
            config.user_agent = agent;
        }

        if let Some(secs) = parse_env("SHARKBASE_TIMEOUT_SECS")? {
            config.request_timeout_secs = secs;
        }

        if let Some(ms) = parse_env("SHARKBASE_REQUEST_INTERVAL_MS")? {
            config.request_interval_ms = ms;
        }

        if let Some(depth) = parse_env("SHARKBASE_MAX_DEPTH")? {
            config.max_depth = depth;
        }

        if let Some(paginate) = parse_env("SHARKBASE_PAGINATE")? {
            config.paginate = paginate;
        }

        if let Some(marine_only) = parse_env("SHARKBASE_MARINE_ONLY")? {
            config.marine_only = marine_only;
        }

        if let Ok(path) = std::env::var("SHARKBASE_OUTPUT") {
            config.output_path = PathBuf::from(path);
        }

        Ok(config)
    }

    pub fn with_root_id(mut self, root_id: impl Into<TaxonId>) -> Self {
        self.root_id = root_id.into();
        self
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn with_request_interval_ms(mut self, ms: u64) -> Self {
        self.request_interval_ms = ms;
        self
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    pub fn with_paginate(mut self, paginate: bool) -> Self {
        self.paginate = paginate;
        self
    }

    pub fn with_marine_only(mut self, marine_only: bool) -> Self {
        self.marine_only = marine_only;
        self
    }

    pub fn with_output_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_path = path.into();
        self
    }

    /// Base URL with any trailing slash removed
    pub fn base_url(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(SharkbaseError::config(format!(
                "base URL must be http(s), got '{}'",
                self.base_url
            )));
        }
        if self.root_id.0 == 0 {
            return Err(SharkbaseError::config("root taxon id must be positive"));
        }
        if self.request_timeout_secs == 0 {
            return Err(SharkbaseError::config("request timeout must be at least one second"));
        }
        if self.max_depth == 0 {
            return Err(SharkbaseError::config("max depth must be at least 1"));
        }
        if self.output_path.as_os_str().is_empty() {
            return Err(SharkbaseError::config("output path is empty"));
        }
        Ok(())
    }
}

fn parse_env<T: std::str::FromStr>(key: &str) -> Result<Option<T>> {
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| SharkbaseError::config(format!("{} has an invalid value: '{}'", key, raw))),
        Err(_) => Ok(None),
    }
}
