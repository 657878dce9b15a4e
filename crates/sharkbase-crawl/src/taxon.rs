//! Taxon records as listed by the registry

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::source::SourceError;

/// Detail page of a taxon on the WoRMS website, keyed by AphiaID
pub const TAXON_DETAIL_URL: &str = "https://www.marinespecies.org/aphia.php?p=taxdetails&id=";

/// WoRMS AphiaID
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaxonId(pub u64);

impl TaxonId {
    /// Canonical detail-page URL for this taxon
    pub fn detail_link(self) -> String {
        format!("{}{}", TAXON_DETAIL_URL, self.0)
    }
}

impl fmt::Display for TaxonId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for TaxonId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl std::str::FromStr for TaxonId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(TaxonId)
    }
}

/// Taxonomic rank, reduced to the levels the classification tree keys on
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Rank {
    Family,
    Genus,
    Species,
    /// Any other level (order, subfamily, subgenus, unranked, ...), kept for logging
    Other(String),
}

impl Rank {
    /// Registry labels are compared exactly: "Subfamily" is not a family.
    pub fn from_label(label: Option<&str>) -> Self {
        match label.map(str::trim) {
            Some("Family") => Rank::Family,
            Some("Genus") => Rank::Genus,
            Some("Species") => Rank::Species,
            Some(other) => Rank::Other(other.to_string()),
            None => Rank::Other(String::new()),
        }
    }
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rank::Family => write!(f, "Family"),
            Rank::Genus => write!(f, "Genus"),
            Rank::Species => write!(f, "Species"),
            Rank::Other(label) if label.is_empty() => write!(f, "unranked"),
            Rank::Other(label) => write!(f, "{}", label),
        }
    }
}

/// Nomenclatural status of a name in the registry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaxonStatus {
    Accepted,
    /// unaccepted, alternate representation, nomen dubium, ...
    NotAccepted(String),
    Unspecified,
}

impl TaxonStatus {
    pub fn from_label(label: Option<&str>) -> Self {
        match label.map(str::trim) {
            Some("accepted") => TaxonStatus::Accepted,
            Some("") | None => TaxonStatus::Unspecified,
            Some(other) => TaxonStatus::NotAccepted(other.to_string()),
        }
    }

    pub fn is_accepted(&self) -> bool {
        matches!(self, TaxonStatus::Accepted)
    }
}

/// A child taxon as returned by a [`ChildSource`](crate::source::ChildSource)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaxonNode {
    pub id: TaxonId,
    pub name: String,
    pub rank: Rank,
    pub status: TaxonStatus,
    pub authority: Option<String>,
}

impl TaxonNode {
    pub fn new(id: impl Into<TaxonId>, name: impl Into<String>, rank: Rank) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            rank,
            status: TaxonStatus::Unspecified,
            authority: None,
        }
    }

    pub fn with_status(mut self, status: TaxonStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_authority(mut self, authority: impl Into<String>) -> Self {
        self.authority = Some(authority.into());
        self
    }

    pub fn family(id: u64, name: &str) -> Self {
        Self::new(id, name, Rank::Family)
    }

    pub fn genus(id: u64, name: &str) -> Self {
        Self::new(id, name, Rank::Genus)
    }

    pub fn species(id: u64, name: &str, status: TaxonStatus) -> Self {
        Self::new(id, name, Rank::Species).with_status(status)
    }

    pub fn other(id: u64, name: &str, rank_label: &str) -> Self {
        Self::new(id, name, Rank::Other(rank_label.to_string()))
    }
}

/// An AphiaRecord as serialized by the WoRMS REST API.
///
/// Every field is optional; [`TaxonNode::try_from`] decides what is usable.
/// Fields the crawl does not read are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WormsRecord {
    #[serde(rename = "AphiaID")]
    pub aphia_id: Option<i64>,
    #[serde(rename = "scientificname")]
    pub scientific_name: Option<String>,
    pub authority: Option<String>,
    pub status: Option<String>,
    pub rank: Option<String>,
}

impl TryFrom<WormsRecord> for TaxonNode {
    type Error = SourceError;

    fn try_from(record: WormsRecord) -> Result<Self, Self::Error> {
        let id = match record.aphia_id {
            Some(id) if id > 0 => TaxonId(id as u64),
            Some(id) => {
                return Err(SourceError::MalformedRecord(format!("non-positive AphiaID {}", id)))
            },
            None => return Err(SourceError::MalformedRecord("missing AphiaID".to_string())),
        };

        let name = record
            .scientific_name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .ok_or_else(|| {
                SourceError::MalformedRecord(format!("record {} has no scientific name", id))
            })?;

        Ok(TaxonNode {
            id,
            name,
            rank: Rank::from_label(record.rank.as_deref()),
            status: TaxonStatus::from_label(record.status.as_deref()),
            authority: record.authority,
        })
    }
}
