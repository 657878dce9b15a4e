//! Depth-first reconstruction of the family → genus → species tree
//!
//! The registry hierarchy is arbitrarily deep (orders, superfamilies,
//! subfamilies, subgenera, ...). The walk keeps only three ranks:
//!
//! | child rank | context            | action                                        |
//! |------------|--------------------|-----------------------------------------------|
//! | Family     | any                | record family, descend with `genus` cleared   |
//! | Genus      | family known       | record genus, descend                         |
//! | Genus      | no family          | drop node and subtree                         |
//! | Species    | genus known        | record if accepted, never descend             |
//! | Species    | no genus           | drop                                          |
//! | other      | any                | descend with context unchanged                |
//!
//! The walk runs on an explicit stack of pending children. Children are pushed
//! in reverse so they pop in registry order, giving the same pre-order as a
//! recursive walk.

use serde::Serialize;
use std::collections::HashSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, trace, warn};

use crate::config::CrawlConfig;
use crate::source::ChildSource;
use crate::taxon::{Rank, TaxonId, TaxonNode};
use crate::tree::{ClassificationTree, SpeciesRecord, TreeError};

/// Family and genus inherited from the ancestors of a node
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TraversalContext {
    pub family: Option<String>,
    pub genus: Option<String>,
}

impl TraversalContext {
    pub fn root() -> Self {
        Self::default()
    }

    /// Context below a family. Genus never carries across a family boundary.
    pub fn enter_family(&self, family: &str) -> Self {
        Self {
            family: Some(family.to_string()),
            genus: None,
        }
    }

    pub fn enter_genus(&self, genus: &str) -> Self {
        Self {
            family: self.family.clone(),
            genus: Some(genus.to_string()),
        }
    }
}

/// Counters collected during a crawl
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CrawlStats {
    /// Taxa whose children were requested
    pub expanded: usize,
    pub families_recorded: usize,
    pub genera_recorded: usize,
    pub species_recorded: usize,
    /// Species dropped because their status is not "accepted"
    pub species_not_accepted: usize,
    pub orphan_genera: usize,
    pub orphan_species: usize,
    pub fetch_failures: usize,
    pub malformed_records: usize,
    /// Listings the source could not deliver in full
    pub truncated_listings: usize,
    /// Expansions refused because the taxon was already expanded
    pub revisits_refused: usize,
    /// Expansions refused because of the depth limit
    pub depth_limited: usize,
    /// Nodes skipped after an unexpected processing error
    pub skipped_nodes: usize,
}

/// Result of a crawl
#[derive(Debug, Clone)]
pub struct CrawlReport {
    pub tree: ClassificationTree,
    pub stats: CrawlStats,
    /// `false` when the crawl was cancelled before the walk finished
    pub completed: bool,
}

/// What to do with a child once it has been classified
enum Step {
    Descend(TraversalContext),
    Stop,
}

struct Pending {
    node: TaxonNode,
    context: TraversalContext,
    depth: usize,
}

/// Walks the registry from a root taxon
pub struct Crawler<S> {
    source: S,
    root: TaxonId,
    max_depth: usize,
    cancel: CancellationToken,
}

impl<S: ChildSource> Crawler<S> {
    pub fn new(source: S, config: &CrawlConfig) -> Self {
        Self {
            source,
            root: config.root_id,
            max_depth: config.max_depth,
            cancel: CancellationToken::new(),
        }
    }

    /// Stop the walk when `token` is cancelled
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Run the walk to completion (or cancellation) and return the tree
    #[instrument(name = "crawl", skip(self), fields(root = %self.root, max_depth = self.max_depth))]
    pub async fn crawl(&self) -> CrawlReport {
        let mut tree = ClassificationTree::new();
        let mut stats = CrawlStats::default();
        let mut visited = HashSet::new();
        let mut stack = Vec::new();

        info!("Starting crawl");

        let mut completed = !self.cancel.is_cancelled()
            && self
                .expand(
                    self.root,
                    &TraversalContext::root(),
                    0,
                    &mut visited,
                    &mut stack,
                    &mut stats,
                )
                .await;

        while completed {
            let Some(Pending {
                node,
                context,
                depth,
            }) = stack.pop()
            else {
                break;
            };

            if self.cancel.is_cancelled() {
                completed = false;
                break;
            }

            match self.classify(&node, &context, &mut tree, &mut stats) {
                Ok(Step::Descend(next)) => {
                    completed = self
                        .expand(node.id, &next, depth, &mut visited, &mut stack, &mut stats)
                        .await;
                },
                Ok(Step::Stop) => {},
                Err(err) => {
                    warn!(taxon_id = %node.id, name = %node.name, error = %err, "Skipping taxon");
                    stats.skipped_nodes += 1;
                },
            }
        }

        if completed {
            info!(
                families = tree.family_count(),
                genera = tree.genus_count(),
                species = tree.species_count(),
                expanded = stats.expanded,
                fetch_failures = stats.fetch_failures,
                truncated_listings = stats.truncated_listings,
                "Crawl finished"
            );
        } else {
            warn!(
                species = tree.species_count(),
                expanded = stats.expanded,
                "Crawl cancelled"
            );
        }

        CrawlReport {
            tree,
            stats,
            completed,
        }
    }

    /// Apply the rank rules to one child
    fn classify(
        &self,
        node: &TaxonNode,
        context: &TraversalContext,
        tree: &mut ClassificationTree,
        stats: &mut CrawlStats,
    ) -> Result<Step, TreeError> {
        match (&node.rank, &context.family, &context.genus) {
            (Rank::Family, _, _) => {
                if tree.ensure_family(&node.name) {
                    stats.families_recorded += 1;
                    info!(family = %node.name, taxon_id = %node.id, "Found family");
                }
                Ok(Step::Descend(context.enter_family(&node.name)))
            },
            (Rank::Genus, Some(family), _) => {
                if tree.ensure_genus(family, &node.name)? {
                    stats.genera_recorded += 1;
                    debug!(family = %family, genus = %node.name, "Found genus");
                }
                Ok(Step::Descend(context.enter_genus(&node.name)))
            },
            (Rank::Genus, None, _) => {
                debug!(genus = %node.name, taxon_id = %node.id, "Dropping genus outside any family");
                stats.orphan_genera += 1;
                Ok(Step::Stop)
            },
            (Rank::Species, Some(family), Some(genus)) => {
                if node.status.is_accepted() {
                    tree.push_species(family, genus, SpeciesRecord::accepted(node))?;
                    stats.species_recorded += 1;
                    trace!(species = %node.name, genus = %genus, "Recorded species");
                } else {
                    trace!(species = %node.name, status = ?node.status, "Ignoring species that is not accepted");
                    stats.species_not_accepted += 1;
                }
                Ok(Step::Stop)
            },
            (Rank::Species, _, _) => {
                debug!(species = %node.name, taxon_id = %node.id, "Dropping species outside any genus");
                stats.orphan_species += 1;
                Ok(Step::Stop)
            },
            (Rank::Other(_), _, _) => Ok(Step::Descend(context.clone())),
        }
    }

    /// List the children of `taxon` and queue them under `context`.
    ///
    /// Returns `false` if cancellation interrupted the listing.
    async fn expand(
        &self,
        taxon: TaxonId,
        context: &TraversalContext,
        depth: usize,
        visited: &mut HashSet<TaxonId>,
        stack: &mut Vec<Pending>,
        stats: &mut CrawlStats,
    ) -> bool {
        if depth >= self.max_depth {
            warn!(taxon_id = %taxon, depth, "Depth limit reached, not expanding");
            stats.depth_limited += 1;
            return true;
        }
        if !visited.insert(taxon) {
            warn!(taxon_id = %taxon, "Taxon already expanded, refusing to revisit");
            stats.revisits_refused += 1;
            return true;
        }

        stats.expanded += 1;
        let fetched = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return false,
            fetched = self.source.children(taxon) => fetched,
        };

        let listing = match fetched {
            Ok(listing) => listing,
            Err(err) => {
                warn!(taxon_id = %taxon, error = %err, "Child listing failed, treating taxon as childless");
                stats.fetch_failures += 1;
                return true;
            },
        };

        stats.malformed_records += listing.skipped;
        if listing.truncated {
            warn!(taxon_id = %taxon, children = listing.nodes.len(), "Child listing is incomplete");
            stats.truncated_listings += 1;
        }
        debug!(taxon_id = %taxon, depth, children = listing.nodes.len(), "Expanded taxon");

        stack.extend(listing.nodes.into_iter().rev().map(|node| Pending {
            node,
            context: context.clone(),
            depth: depth + 1,
        }));
        true
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::source::{ChildListing, FixtureSource, SourceError};
    use crate::taxon::TaxonStatus;
    use async_trait::async_trait;

    const ROOT: u64 = 1;

    fn config() -> CrawlConfig {
        CrawlConfig::new().with_root_id(ROOT)
    }

    #[test]
    fn test_entering_family_clears_genus() {
        let ctx = TraversalContext::root()
            .enter_family("Lamnidae")
            .enter_genus("Lamna");
        let nested = ctx.enter_family("Otodontidae");
        assert_eq!(nested.family.as_deref(), Some("Otodontidae"));
        assert_eq!(nested.genus, None);
    }

    #[test]
    fn test_entering_genus_keeps_family() {
        let ctx = TraversalContext::root().enter_family("Lamnidae").enter_genus("Isurus");
        assert_eq!(ctx.family.as_deref(), Some("Lamnidae"));
        assert_eq!(ctx.genus.as_deref(), Some("Isurus"));
    }

    #[tokio::test]
    async fn test_empty_root_gives_empty_tree() {
        let crawler = Crawler::new(FixtureSource::new(), &config());
        let report = crawler.crawl().await;

        assert!(report.completed);
        assert!(report.tree.is_empty());
        assert_eq!(report.stats.expanded, 1);
    }

    #[tokio::test]
    async fn test_species_are_never_expanded() {
        let source = FixtureSource::new()
            .with_children(ROOT, [TaxonNode::family(2, "F")])
            .with_children(2u64, [TaxonNode::genus(3, "G")])
            .with_children(3u64, [TaxonNode::species(4, "G s", TaxonStatus::Accepted)])
            .with_children(4u64, [TaxonNode::other(5, "G s sub", "Subspecies")]);

        let crawler = Crawler::new(source, &config());
        let report = crawler.crawl().await;

        // root, F, G
        assert_eq!(crawler.source().calls(), 3);
        assert_eq!(report.stats.species_recorded, 1);
    }

    #[tokio::test]
    async fn test_depth_limit_stops_descent() {
        let source = FixtureSource::new()
            .with_children(ROOT, [TaxonNode::other(2, "Order", "Order")])
            .with_children(2u64, [TaxonNode::family(3, "F")])
            .with_children(3u64, [TaxonNode::genus(4, "G")]);

        let crawler = Crawler::new(source, &config().with_max_depth(2));
        let report = crawler.crawl().await;

        assert!(report.tree.genera("F").unwrap().next().is_none());
        assert_eq!(report.stats.depth_limited, 1);
    }

    #[tokio::test]
    async fn test_pre_cancelled_crawl_does_nothing() {
        let token = CancellationToken::new();
        token.cancel();

        let source = FixtureSource::new().with_children(ROOT, [TaxonNode::family(2, "F")]);
        let crawler = Crawler::new(source, &config()).with_cancellation(token);
        let report = crawler.crawl().await;

        assert!(!report.completed);
        assert!(report.tree.is_empty());
        assert_eq!(crawler.source().calls(), 0);
    }

    /// Returns the same incomplete listing for every taxon
    struct CappedSource;

    #[async_trait]
    impl ChildSource for CappedSource {
        async fn children(&self, _taxon: TaxonId) -> Result<ChildListing, SourceError> {
            Ok(ChildListing::new(vec![TaxonNode::species(9, "Loose", TaxonStatus::Accepted)])
                .mark_truncated())
        }
    }

    #[tokio::test]
    async fn test_truncated_listing_is_counted() {
        let report = Crawler::new(CappedSource, &config()).crawl().await;

        assert!(report.completed);
        assert_eq!(report.stats.truncated_listings, 1);
        assert_eq!(report.stats.orphan_species, 1);
    }
}
