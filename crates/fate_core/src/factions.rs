//! Faction identity.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A faction's alignment, e.g. `"white"` or `"blue"`.
///
/// Alignments are data: the faction list comes from configuration and
/// units are tagged with one at spawn.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Alignment(String);

impl Alignment {
    /// Create an alignment from its name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The alignment name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether `other` belongs to a different faction.
    #[must_use]
    pub fn is_hostile_to(&self, other: &Self) -> bool {
        self != other
    }
}

impl fmt::Display for Alignment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Alignment {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// Fixed cyclic sequence of factions taking turns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnOrder {
    factions: Vec<Alignment>,
    index: usize,
    round: u32,
}

impl TurnOrder {
    /// Create a turn order starting with the first faction in round 1.
    ///
    /// Returns `None` if `factions` is empty.
    #[must_use]
    pub fn new(factions: Vec<Alignment>) -> Option<Self> {
        if factions.is_empty() {
            return None;
        }
        Some(Self {
            factions,
            index: 0,
            round: 1,
        })
    }

    /// The faction whose turn it is.
    #[must_use]
    pub fn active(&self) -> &Alignment {
        &self.factions[self.index]
    }

    /// Position of the active faction in the order.
    #[must_use]
    pub const fn index(&self) -> usize {
        self.index
    }

    /// Current round, starting at 1.
    #[must_use]
    pub const fn round(&self) -> u32 {
        self.round
    }

    /// All factions in turn order.
    #[must_use]
    pub fn factions(&self) -> &[Alignment] {
        &self.factions
    }

    /// Whether `alignment` is the active faction.
    #[must_use]
    pub fn is_active(&self, alignment: &Alignment) -> bool {
        self.active() == alignment
    }

    /// Pass control to the next faction, returning it.
    ///
    /// Wrapping back to the first faction starts a new round.
    pub fn advance(&mut self) -> &Alignment {
        self.index = (self.index + 1) % self.factions.len();
        if self.index == 0 {
            self.round += 1;
        }
        self.active()
    }
}
