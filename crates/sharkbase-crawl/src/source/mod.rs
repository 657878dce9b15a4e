//! Child sources: where the crawler learns the children of a taxon
//!
//! The registry only answers "list the immediate children of taxon X". A
//! [`ChildSource`] wraps that one operation and reports failures explicitly,
//! leaving the crawler to decide what a failed listing means for the walk.

pub mod fixture;
pub mod pacing;
pub mod worms;

use async_trait::async_trait;
use thiserror::Error;

use crate::taxon::{TaxonId, TaxonNode};

pub use fixture::FixtureSource;
pub use pacing::Pacer;
pub use worms::WormsClient;

/// Failure to list the children of a taxon
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("request for children of taxon {taxon} failed: {source}")]
    Transport {
        taxon: TaxonId,
        #[source]
        source: reqwest::Error,
    },

    #[error("registry answered HTTP {status} for children of taxon {taxon}")]
    Status { taxon: TaxonId, status: u16 },

    #[error("could not decode children of taxon {taxon}: {source}")]
    Decode {
        taxon: TaxonId,
        #[source]
        source: serde_json::Error,
    },

    #[error("malformed taxon record: {0}")]
    MalformedRecord(String),

    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
}

/// Children of one taxon, in registry order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChildListing {
    pub nodes: Vec<TaxonNode>,
    /// Records dropped because they could not be turned into a [`TaxonNode`]
    pub skipped: usize,
    /// The source stopped before the end of the listing
    pub truncated: bool,
}

impl ChildListing {
    pub fn new(nodes: Vec<TaxonNode>) -> Self {
        Self {
            nodes,
            ..Default::default()
        }
    }

    /// Mark the listing as incomplete
    pub fn mark_truncated(mut self) -> Self {
        self.truncated = true;
        self
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// Lists the immediate children of a taxon.
///
/// An empty listing means the registry confirmed there are no children; a
/// failed request is an `Err`, never an empty listing.
#[async_trait]
pub trait ChildSource: Send + Sync {
    async fn children(&self, taxon: TaxonId) -> Result<ChildListing, SourceError>;
}

#[async_trait]
impl<T: ChildSource + ?Sized> ChildSource for std::sync::Arc<T> {
    async fn children(&self, taxon: TaxonId) -> Result<ChildListing, SourceError> {
        (**self).children(taxon).await
    }
}
