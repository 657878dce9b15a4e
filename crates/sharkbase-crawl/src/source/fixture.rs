//! In-memory child source for tests

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::{ChildListing, ChildSource, SourceError};
use crate::taxon::{TaxonId, TaxonNode};

#[derive(Debug, Clone)]
enum FixtureEntry {
    Children(Vec<TaxonNode>),
    Unavailable(u16),
}

/// Static parent → children map.
///
/// Taxa that were never registered have no children.
#[derive(Debug, Default)]
pub struct FixtureSource {
    entries: HashMap<TaxonId, FixtureEntry>,
    calls: AtomicUsize,
}

impl FixtureSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the children of `parent`, replacing any earlier registration
    pub fn with_children(
        mut self,
        parent: impl Into<TaxonId>,
        children: impl IntoIterator<Item = TaxonNode>,
    ) -> Self {
        self.entries
            .insert(parent.into(), FixtureEntry::Children(children.into_iter().collect()));
        self
    }

    /// Make listing `parent` fail with the given HTTP status
    pub fn with_failure(mut self, parent: impl Into<TaxonId>, status: u16) -> Self {
        self.entries
            .insert(parent.into(), FixtureEntry::Unavailable(status));
        self
    }

    /// Number of listings served so far, failures included
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl ChildSource for FixtureSource {
    async fn children(&self, taxon: TaxonId) -> Result<ChildListing, SourceError> {
        self.calls.fetch_add(1, Ordering::Relaxed);

        match self.entries.get(&taxon) {
            Some(FixtureEntry::Children(nodes)) => Ok(ChildListing::new(nodes.clone())),
            Some(FixtureEntry::Unavailable(status)) => Err(SourceError::Status {
                taxon,
                status: *status,
            }),
            None => Ok(ChildListing::default()),
        }
    }
}
