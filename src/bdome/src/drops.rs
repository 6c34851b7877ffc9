//! Drop collections: raw multisets and their normalised (one entry per name) form.

use serde::Serialize;
use std::collections::BTreeMap;
use thiserror::Error;

use crate::arena::{Arena, DropMetadata};
use crate::constants::NOTHING;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DropsError {
    #[error("Cannot combine drops from {left} with drops from {right}")]
    ArenaMismatch { left: Arena, right: Arena },

    #[error("Cannot union item \"{left}\" with item \"{right}\"")]
    NameMismatch { left: String, right: String },
}

/// A quantity of one named item received in an arena
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BattledomeItem {
    pub metadata: DropMetadata,
    pub name: String,
    pub quantity: u64,
}

impl BattledomeItem {
    pub fn new(metadata: DropMetadata, name: impl Into<String>, quantity: u64) -> Self {
        Self {
            metadata,
            name: name.into(),
            quantity,
        }
    }

    /// True for the empty-slot sentinel
    pub fn is_nothing(&self) -> bool {
        self.name == NOTHING
    }

    /// Add quantities of two entries for the same item
    pub fn union(&self, other: &BattledomeItem) -> Result<BattledomeItem, DropsError> {
        if self.name != other.name {
            return Err(DropsError::NameMismatch {
                left: self.name.clone(),
                right: other.name.clone(),
            });
        }

        Ok(BattledomeItem {
            metadata: self.metadata.combine(&other.metadata)?,
            name: self.name.clone(),
            quantity: self.quantity + other.quantity,
        })
    }
}

/// Items as recorded, possibly repeating a name
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Drops {
    pub metadata: DropMetadata,
    pub items: Vec<BattledomeItem>,
}

impl Drops {
    pub fn new(metadata: DropMetadata) -> Self {
        Self {
            metadata,
            items: Vec::new(),
        }
    }

    /// Record `quantity` of `name` under this collection's metadata
    pub fn push(&mut self, name: impl Into<String>, quantity: u64) {
        self.items
            .push(BattledomeItem::new(self.metadata.clone(), name, quantity));
    }

    /// Total quantity including empty slots
    pub fn total_quantity(&self) -> u64 {
        self.items.iter().map(|item| item.quantity).sum()
    }

    pub fn normalise(&self) -> Result<NormalisedDrops, DropsError> {
        let mut normalised = NormalisedDrops::with_metadata(self.metadata.clone());
        for item in &self.items {
            normalised.insert(item.clone())?;
        }
        Ok(normalised)
    }
}

/// One entry per item name, quantities summed
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalisedDrops {
    metadata: DropMetadata,
    items: BTreeMap<String, BattledomeItem>,
}

impl NormalisedDrops {
    /// No items, only an arena
    pub fn empty(arena: Arena) -> Self {
        Self::with_metadata(DropMetadata::arena_only(arena))
    }

    pub fn with_metadata(metadata: DropMetadata) -> Self {
        Self {
            metadata,
            items: BTreeMap::new(),
        }
    }

    /// Build from `(name, quantity)` pairs sharing one metadata value
    pub fn from_counts<I, S>(metadata: DropMetadata, counts: I) -> Result<Self, DropsError>
    where
        I: IntoIterator<Item = (S, u64)>,
        S: Into<String>,
    {
        let mut normalised = Self::with_metadata(metadata.clone());
        for (name, quantity) in counts {
            normalised.insert(BattledomeItem::new(metadata.clone(), name, quantity))?;
        }
        Ok(normalised)
    }

    pub fn metadata(&self) -> &DropMetadata {
        &self.metadata
    }

    pub fn arena(&self) -> Arena {
        self.metadata.arena
    }

    /// Add an item, unioning with any existing entry of the same name
    pub fn insert(&mut self, item: BattledomeItem) -> Result<(), DropsError> {
        if item.metadata.arena != self.metadata.arena {
            return Err(DropsError::ArenaMismatch {
                left: self.metadata.arena,
                right: item.metadata.arena,
            });
        }

        let merged = match self.items.get(&item.name) {
            Some(existing) => existing.union(&item)?,
            None => item,
        };
        self.items.insert(merged.name.clone(), merged);
        Ok(())
    }

    pub fn union(&self, other: &NormalisedDrops) -> Result<NormalisedDrops, DropsError> {
        let metadata = if self.items.is_empty() {
            self.metadata.combine(&other.metadata).map(|_| other.metadata.clone())?
        } else if other.items.is_empty() {
            other.metadata.combine(&self.metadata).map(|_| self.metadata.clone())?
        } else {
            self.metadata.combine(&other.metadata)?
        };

        let mut combined = NormalisedDrops::with_metadata(metadata);
        for item in self.items.values().chain(other.items.values()) {
            combined.insert(item.clone())?;
        }
        Ok(combined)
    }

    pub fn get(&self, name: &str) -> Option<&BattledomeItem> {
        self.items.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.items.contains_key(name)
    }

    /// Items in name order
    pub fn items(&self) -> impl Iterator<Item = &BattledomeItem> {
        self.items.values()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.items.keys().map(String::as_str)
    }

    /// Number of distinct names, `nothing` included
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn quantity(&self, name: &str) -> u64 {
        self.items.get(name).map_or(0, |item| item.quantity)
    }

    /// Total quantity of real items (empty slots excluded)
    pub fn total_quantity(&self) -> u64 {
        self.items
            .values()
            .filter(|item| !item.is_nothing())
            .map(|item| item.quantity)
            .sum()
    }

    /// Share of real drops taken by `name`, 0 when nothing was dropped
    pub fn drop_rate(&self, name: &str) -> f64 {
        if name == NOTHING {
            return 0.0;
        }
        let total = self.total_quantity();
        if total == 0 {
            return 0.0;
        }
        self.quantity(name) as f64 / total as f64
    }

    /// Copy keeping only items accepted by `keep`
    pub fn filtered<F>(&self, mut keep: F) -> NormalisedDrops
    where
        F: FnMut(&BattledomeItem) -> bool,
    {
        NormalisedDrops {
            metadata: self.metadata.clone(),
            items: self
                .items
                .iter()
                .filter(|(_, item)| keep(item))
                .map(|(name, item)| (name.clone(), item.clone()))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{MULTIPLE_CHALLENGERS, MULTIPLE_SOURCES};

    fn meta(source: &str, challenger: &str) -> DropMetadata {
        DropMetadata::new(source, Arena::CentralArena, challenger, "Mighty")
    }

    #[test]
    fn test_item_union_adds_quantities() {
        let a = BattledomeItem::new(meta("a.txt", "Flaming Meerca"), "Har Codestone", 2);
        let b = BattledomeItem::new(meta("b.txt", "Flaming Meerca"), "Har Codestone", 3);
        let merged = a.union(&b).unwrap();

        assert_eq!(merged.quantity, 5);
        assert_eq!(merged.metadata.source, MULTIPLE_SOURCES);
        assert_eq!(merged.metadata.challenger, "Flaming Meerca");
    }

    #[test]
    fn test_item_union_rejects_other_name() {
        let a = BattledomeItem::new(meta("a.txt", "X"), "Har Codestone", 2);
        let b = BattledomeItem::new(meta("a.txt", "X"), "Orn Codestone", 1);
        assert_eq!(
            a.union(&b),
            Err(DropsError::NameMismatch {
                left: "Har Codestone".into(),
                right: "Orn Codestone".into(),
            })
        );
    }

    #[test]
    fn test_normalise_sums_repeats() {
        let mut drops = Drops::new(meta("a.txt", "X"));
        drops.push("Har Codestone", 1);
        drops.push("nothing", 2);
        drops.push("Har Codestone", 1);
        drops.push("Robot Muffin", 1);

        let normalised = drops.normalise().unwrap();
        assert_eq!(normalised.len(), 3);
        assert_eq!(normalised.quantity("Har Codestone"), 2);
        assert_eq!(normalised.quantity("nothing"), 2);
        assert_eq!(normalised.total_quantity(), 3);
        assert_eq!(drops.total_quantity(), 5);
    }

    #[test]
    fn test_drop_rate_excludes_nothing() {
        let normalised = NormalisedDrops::from_counts(
            meta("a.txt", "X"),
            [("A", 1), ("B", 3), ("nothing", 10)],
        )
        .unwrap();

        assert_eq!(normalised.drop_rate("A"), 0.25);
        assert_eq!(normalised.drop_rate("B"), 0.75);
        assert_eq!(normalised.drop_rate("nothing"), 0.0);
        assert_eq!(normalised.drop_rate("missing"), 0.0);
    }

    #[test]
    fn test_drop_rate_empty() {
        let normalised = NormalisedDrops::empty(Arena::UggaDome);
        assert_eq!(normalised.drop_rate("A"), 0.0);
        assert_eq!(normalised.total_quantity(), 0);
        assert_eq!(normalised.arena(), Arena::UggaDome);
    }

    #[test]
    fn test_union_is_commutative() {
        let a = NormalisedDrops::from_counts(meta("a.txt", "X"), [("A", 1), ("B", 2)]).unwrap();
        let b = NormalisedDrops::from_counts(meta("b.txt", "Y"), [("B", 3), ("C", 4)]).unwrap();

        let ab = a.union(&b).unwrap();
        let ba = b.union(&a).unwrap();

        for name in ["A", "B", "C"] {
            assert_eq!(ab.quantity(name), ba.quantity(name));
        }
        assert_eq!(ab.quantity("B"), 5);
        assert_eq!(ab.metadata().challenger, MULTIPLE_CHALLENGERS);
        assert_eq!(ab.metadata(), ba.metadata());
    }

    #[test]
    fn test_union_is_associative() {
        let a = NormalisedDrops::from_counts(meta("a.txt", "X"), [("A", 1)]).unwrap();
        let b = NormalisedDrops::from_counts(meta("b.txt", "X"), [("A", 2), ("B", 1)]).unwrap();
        let c = NormalisedDrops::from_counts(meta("c.txt", "X"), [("B", 5)]).unwrap();

        let left = a.union(&b).unwrap().union(&c).unwrap();
        let right = a.union(&b.union(&c).unwrap()).unwrap();
        assert_eq!(left, right);
    }

    #[test]
    fn test_union_with_empty_keeps_metadata() {
        let a = NormalisedDrops::from_counts(meta("a.txt", "X"), [("A", 1)]).unwrap();
        let empty = NormalisedDrops::empty(Arena::CentralArena);

        assert_eq!(empty.union(&a).unwrap().metadata(), a.metadata());
        assert_eq!(a.union(&empty).unwrap().metadata(), a.metadata());
    }

    #[test]
    fn test_union_rejects_other_arena() {
        let a = NormalisedDrops::from_counts(meta("a.txt", "X"), [("A", 1)]).unwrap();
        let b = NormalisedDrops::empty(Arena::FrostArena);
        assert!(a.union(&b).is_err());
    }

    #[test]
    fn test_filtered() {
        let a = NormalisedDrops::from_counts(meta("a.txt", "X"), [("A", 1), ("B", 2)]).unwrap();
        let only_b = a.filtered(|item| item.name == "B");
        assert_eq!(only_b.len(), 1);
        assert_eq!(only_b.drop_rate("B"), 1.0);
    }
}
