//! Terrain tiles.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::factions::Alignment;

/// Trait marking terrain that costs two movement to enter.
pub const TRAIT_DIFFICULT: &str = "difficult";

/// Trait marking terrain no unit may enter.
pub const TRAIT_IMPASSABLE: &str = "impassable";

/// A terrain tile instance.
///
/// Tiles are copied out of the template registry, one per cell. The two
/// alignment sets are transient: they are rebuilt from live occupancy by
/// [`HexGrid::refresh_alignments`](crate::grid::HexGrid::refresh_alignments)
/// every tick and never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tile {
    /// Template name.
    pub name: String,
    /// Flavour text.
    pub description: String,
    /// Terrain traits such as [`TRAIT_DIFFICULT`].
    pub traits: BTreeSet<String>,
    /// Alignments of visible units adjacent to this tile.
    #[serde(skip)]
    pub alignments: BTreeSet<Alignment>,
    /// Alignments of invisible units adjacent to this tile.
    #[serde(skip)]
    pub hidden_alignments: BTreeSet<Alignment>,
}

impl Tile {
    /// Create a tile with no influence.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        traits: impl IntoIterator<Item = String>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            traits: traits.into_iter().collect(),
            alignments: BTreeSet::new(),
            hidden_alignments: BTreeSet::new(),
        }
    }

    /// Check if this tile has the specified trait.
    #[must_use]
    pub fn has_trait(&self, name: &str) -> bool {
        self.traits.contains(name)
    }

    /// Whether entering this tile costs extra movement.
    #[must_use]
    pub fn is_difficult(&self) -> bool {
        self.has_trait(TRAIT_DIFFICULT)
    }

    /// Whether no unit may enter this tile.
    #[must_use]
    pub fn is_impassable(&self) -> bool {
        self.has_trait(TRAIT_IMPASSABLE)
    }

    /// Whether a unit of `alignment` next to this tile would be in
    /// contact with a hostile faction.
    ///
    /// Hidden influence only counts when `count_hidden` is set.
    #[must_use]
    pub fn is_contested_for(&self, alignment: &Alignment, count_hidden: bool) -> bool {
        let hostile = |set: &BTreeSet<Alignment>| set.iter().any(|a| a.is_hostile_to(alignment));
        hostile(&self.alignments) || (count_hidden && hostile(&self.hidden_alignments))
    }

    /// Drop all influence.
    pub fn clear_influence(&mut self) {
        self.alignments.clear();
        self.hidden_alignments.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain() -> Tile {
        Tile::new("blank", "", Vec::new())
    }

    #[test]
    fn test_difficult_trait() {
        assert!(!plain().is_difficult());
        let rough = Tile::new("difficult", "", vec![TRAIT_DIFFICULT.to_string()]);
        assert!(rough.is_difficult());
        assert!(!rough.is_impassable());
        assert!(Tile::new("rock", "", vec![TRAIT_IMPASSABLE.to_string()]).is_impassable());
    }

    #[test]
    fn test_contested_ignores_own_alignment() {
        let white = Alignment::new("white");
        let mut tile = plain();
        tile.alignments.insert(white.clone());
        assert!(!tile.is_contested_for(&white, true));
        assert!(tile.is_contested_for(&Alignment::new("blue"), false));
    }

    #[test]
    fn test_hidden_influence_only_counted_on_request() {
        let white = Alignment::new("white");
        let mut tile = plain();
        tile.hidden_alignments.insert(Alignment::new("blue"));
        assert!(!tile.is_contested_for(&white, false));
        assert!(tile.is_contested_for(&white, true));

        tile.clear_influence();
        assert!(!tile.is_contested_for(&white, true));
    }
}
