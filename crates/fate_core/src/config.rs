//! Game configuration and scenario setup.
//!
//! Scenarios describe the opening position: grid configuration, terrain
//! patches laid over the default tile, and starting units. They are plain
//! RON documents referencing templates by name.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::data::{DataLoadError, DataLoadResult};
use crate::factions::Alignment;
use crate::hex::{Direction, Position};

/// Session-wide tunables. Every field has a default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Grid rows.
    pub rows: u16,
    /// Grid columns.
    pub cols: u16,
    /// Tile size in pixels; drives the pixel layout.
    pub tile_size: u32,
    /// Ticks taken by one animated step.
    pub step_duration_ticks: u32,
    /// Factions in turn order.
    pub factions: Vec<Alignment>,
    /// Damage dealt to poisoned units at every turn rotation.
    pub poison_damage: u32,
    /// Tile template filling every cell before terrain patches.
    pub default_tile: String,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            rows: 26,
            cols: 10,
            tile_size: 80,
            step_duration_ticks: 12,
            factions: vec![Alignment::new("white"), Alignment::new("blue")],
            poison_damage: 2,
            default_tile: "blank".to_string(),
        }
    }
}

/// Replace the tile at each listed position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerrainPatch {
    /// Tile template name.
    pub tile: String,
    /// Cells to overwrite.
    pub positions: Vec<Position>,
}

/// A unit to spawn at setup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitPlacement {
    /// Unit template name.
    pub unit: String,
    /// Row of the cell.
    pub row: i32,
    /// Column of the cell.
    pub col: i32,
    /// Faction the unit fights for.
    pub alignment: Alignment,
}

impl UnitPlacement {
    /// Create a new unit placement.
    #[must_use]
    pub fn new(unit: impl Into<String>, row: i32, col: i32, alignment: impl Into<String>) -> Self {
        Self {
            unit: unit.into(),
            row,
            col,
            alignment: Alignment::new(alignment),
        }
    }

    /// Cell the unit spawns on.
    #[must_use]
    pub const fn position(&self) -> Position {
        Position::new(self.row, self.col)
    }
}

/// A complete opening position.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Scenario {
    /// Scenario name.
    #[serde(default)]
    pub name: String,
    /// Grid and rules configuration.
    #[serde(default)]
    pub config: GameConfig,
    /// Terrain patches, applied in order.
    #[serde(default)]
    pub terrain: Vec<TerrainPatch>,
    /// Starting units, spawned in order.
    #[serde(default)]
    pub units: Vec<UnitPlacement>,
}

impl Scenario {
    /// Load a scenario from a RON file.
    pub fn load<P: AsRef<Path>>(path: P) -> DataLoadResult<Self> {
        let path = path.as_ref();
        let path_str = path.display().to_string();
        let contents = std::fs::read_to_string(path).map_err(|e| DataLoadError::Io {
            path: path_str.clone(),
            source: e,
        })?;
        ron::from_str(&contents).map_err(|e| DataLoadError::Ron {
            path: path_str,
            source: e,
        })
    }

    /// Load from a RON string (useful for embedded scenarios).
    pub fn from_ron_str(source: &str) -> DataLoadResult<Self> {
        ron::from_str(source).map_err(|e| DataLoadError::Ron {
            path: "<inline>".to_string(),
            source: e,
        })
    }

    /// The stock opening: one white slime facing two blue slimes, with a
    /// ring of difficult terrain around (5, 5).
    #[must_use]
    pub fn skirmish() -> Self {
        let centre = Position::new(5, 5);
        Self {
            name: "Skirmish".to_string(),
            config: GameConfig::default(),
            terrain: vec![TerrainPatch {
                tile: "difficult".to_string(),
                positions: Direction::ALL.iter().map(|&d| centre.step(d)).collect(),
            }],
            units: vec![
                UnitPlacement::new("slime", 1, 1, "white"),
                UnitPlacement::new("slime", 4, 4, "blue"),
                UnitPlacement::new("slime", 5, 4, "blue"),
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = GameConfig::default();
        assert_eq!((config.rows, config.cols), (26, 10));
        assert_eq!(config.factions.len(), 2);
        assert_eq!(config.poison_damage, 2);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: GameConfig = ron::from_str("(rows: 8, factions: [\"red\"])").unwrap();
        assert_eq!(config.rows, 8);
        assert_eq!(config.cols, 10);
        assert_eq!(config.factions, vec![Alignment::new("red")]);
        assert_eq!(config.default_tile, "blank");
    }

    #[test]
    fn test_skirmish_ring() {
        let scenario = Scenario::skirmish();
        let ring = &scenario.terrain[0].positions;
        assert_eq!(ring.len(), 6);
        assert!(ring.contains(&Position::new(3, 5)));
        assert!(ring.contains(&Position::new(7, 5)));
        assert!(!ring.contains(&Position::new(5, 5)));
        assert_eq!(scenario.units[0].position(), Position::new(1, 1));
    }

    #[test]
    fn test_parse_from_ron() {
        let ron_src = r#"(
            name: "Duel",
            config: (rows: 6, cols: 6),
            terrain: [(tile: "difficult", positions: [(row: 2, col: 2)])],
            units: [
                (unit: "slime", row: 0, col: 0, alignment: "white"),
                (unit: "slime", row: 4, col: 4, alignment: "blue"),
            ],
        )"#;
        let scenario = Scenario::from_ron_str(ron_src).unwrap();
        assert_eq!(scenario.name, "Duel");
        assert_eq!(scenario.config.rows, 6);
        assert_eq!(scenario.config.step_duration_ticks, 12);
        assert_eq!(scenario.units[1].alignment.as_str(), "blue");
    }

    #[test]
    fn test_roundtrip_skirmish() {
        let scenario = Scenario::skirmish();
        let text = ron::ser::to_string_pretty(&scenario, ron::ser::PrettyConfig::default()).unwrap();
        assert_eq!(Scenario::from_ron_str(&text).unwrap(), scenario);
    }

    #[test]
    fn test_bad_ron_is_error() {
        assert!(matches!(
            Scenario::from_ron_str("(units: 3)"),
            Err(DataLoadError::Ron { .. })
        ));
    }
}
