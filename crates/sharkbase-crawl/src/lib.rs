//! Sharkbase Crawl Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Rebuilds a family → genus → species classification by walking a taxonomic
//! registry that only answers "list the children of taxon X".
//!
//! - [`source`]: child sources (WoRMS REST client, in-memory fixture) and request pacing
//! - [`crawl`]: the depth-first walk and its rank rules
//! - [`tree`]: the ordered classification being built
//! - [`output`]: the JSON file read by downstream scripts
//!
//! # Example
//!
//! ```no_run
//! use sharkbase_crawl::{config::CrawlConfig, crawl::Crawler, output, source::WormsClient};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = CrawlConfig::from_env()?;
//!     let crawler = Crawler::new(WormsClient::new(&config)?, &config);
//!
//!     let report = crawler.crawl().await;
//!     output::write_tree(&report.tree, &config.output_path)?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod crawl;
pub mod output;
pub mod source;
pub mod taxon;
pub mod tree;

pub use config::CrawlConfig;
pub use crawl::{CrawlReport, CrawlStats, Crawler, TraversalContext};
pub use tree::{ClassificationTree, SpeciesRecord};
