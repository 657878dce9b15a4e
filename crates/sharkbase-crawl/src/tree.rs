//! Family → genus → species classification built during a crawl
//!
//! Keys keep first-discovery order. The tree only grows: families and genera
//! are created on first sight and reused afterwards, species are appended.

use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

use crate::taxon::TaxonNode;

/// `statut` written for every recorded species
pub const ACCEPTED_LABEL: &str = "accepté";

#[derive(Error, Debug, PartialEq, Eq)]
pub enum TreeError {
    #[error("family '{0}' is not in the tree")]
    UnknownFamily(String),

    #[error("genus '{genus}' is not in family '{family}'")]
    UnknownGenus { family: String, genus: String },
}

/// One accepted species, in the shape downstream scripts read
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpeciesRecord {
    #[serde(rename = "nom_scientifique")]
    pub scientific_name: String,
    #[serde(rename = "auteur")]
    pub authority: Option<String>,
    #[serde(rename = "statut")]
    pub status: String,
    #[serde(rename = "lien")]
    pub link: String,
}

impl SpeciesRecord {
    /// Record for an accepted species node
    pub fn accepted(node: &TaxonNode) -> Self {
        Self {
            scientific_name: node.name.clone(),
            authority: node.authority.clone(),
            status: ACCEPTED_LABEL.to_string(),
            link: node.id.detail_link(),
        }
    }
}

#[derive(Debug, Clone, Default)]
struct GenusEntry {
    name: String,
    species: Vec<SpeciesRecord>,
}

#[derive(Debug, Clone, Default)]
struct FamilyEntry {
    name: String,
    genera: Vec<GenusEntry>,
    by_name: HashMap<String, usize>,
}

impl FamilyEntry {
    fn genus(&self, name: &str) -> Option<&GenusEntry> {
        self.by_name.get(name).map(|&i| &self.genera[i])
    }
}

/// Ordered family → genus → species mapping
#[derive(Debug, Clone, Default)]
pub struct ClassificationTree {
    families: Vec<FamilyEntry>,
    by_name: HashMap<String, usize>,
}

impl ClassificationTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add the family if it is new. Returns `true` when it was created.
    pub fn ensure_family(&mut self, family: &str) -> bool {
        if self.by_name.contains_key(family) {
            return false;
        }
        self.by_name.insert(family.to_string(), self.families.len());
        self.families.push(FamilyEntry {
            name: family.to_string(),
            ..Default::default()
        });
        true
    }

    /// Add the genus under an existing family if it is new.
    /// Returns `true` when it was created.
    pub fn ensure_genus(&mut self, family: &str, genus: &str) -> Result<bool, TreeError> {
        let entry = self.family_mut(family)?;
        if entry.by_name.contains_key(genus) {
            return Ok(false);
        }
        entry.by_name.insert(genus.to_string(), entry.genera.len());
        entry.genera.push(GenusEntry {
            name: genus.to_string(),
            species: Vec::new(),
        });
        Ok(true)
    }

    /// Append a species under an existing family and genus
    pub fn push_species(
        &mut self,
        family: &str,
        genus: &str,
        record: SpeciesRecord,
    ) -> Result<(), TreeError> {
        let entry = self.family_mut(family)?;
        let index = *entry
            .by_name
            .get(genus)
            .ok_or_else(|| TreeError::UnknownGenus {
                family: family.to_string(),
                genus: genus.to_string(),
            })?;
        entry.genera[index].species.push(record);
        Ok(())
    }

    fn family_mut(&mut self, family: &str) -> Result<&mut FamilyEntry, TreeError> {
        let index = *self
            .by_name
            .get(family)
            .ok_or_else(|| TreeError::UnknownFamily(family.to_string()))?;
        Ok(&mut self.families[index])
    }

    fn family(&self, family: &str) -> Option<&FamilyEntry> {
        self.by_name.get(family).map(|&i| &self.families[i])
    }

    /// Family names in discovery order
    pub fn families(&self) -> impl Iterator<Item = &str> {
        self.families.iter().map(|f| f.name.as_str())
    }

    /// Genus names of a family in discovery order
    pub fn genera(&self, family: &str) -> Option<impl Iterator<Item = &str>> {
        self.family(family)
            .map(|f| f.genera.iter().map(|g| g.name.as_str()))
    }

    pub fn species(&self, family: &str, genus: &str) -> Option<&[SpeciesRecord]> {
        self.family(family)
            .and_then(|f| f.genus(genus))
            .map(|g| g.species.as_slice())
    }

    pub fn family_count(&self) -> usize {
        self.families.len()
    }

    pub fn genus_count(&self) -> usize {
        self.families.iter().map(|f| f.genera.len()).sum()
    }

    pub fn species_count(&self) -> usize {
        self.families
            .iter()
            .flat_map(|f| f.genera.iter())
            .map(|g| g.species.len())
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.families.is_empty()
    }
}

impl Serialize for ClassificationTree {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.families.len()))?;
        for family in &self.families {
            map.serialize_entry(&family.name, &GeneraView(&family.genera))?;
        }
        map.end()
    }
}

struct GeneraView<'a>(&'a [GenusEntry]);

impl Serialize for GeneraView<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for genus in self.0 {
            map.serialize_entry(&genus.name, &genus.species)?;
        }
        map.end()
    }
}
