//! Template registry and data file loading.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::tile_data::TileData;
use super::unit_data::UnitData;
use crate::tile::Tile;

/// Errors that can occur while loading static data.
#[derive(Debug, Error)]
pub enum DataLoadError {
    /// Failed to read file.
    #[error("Failed to read file '{path}': {source}")]
    Io {
        /// Path to the file.
        path: String,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse a RON document.
    #[error("Failed to parse RON file '{path}': {source}")]
    Ron {
        /// Path to the file.
        path: String,
        /// Underlying parse error.
        #[source]
        source: ron::error::SpannedError,
    },

    /// Failed to parse a JSON document.
    #[error("Failed to parse JSON file '{path}': {source}")]
    Json {
        /// Path to the file.
        path: String,
        /// Underlying parse error.
        #[source]
        source: serde_json::Error,
    },

    /// File extension is neither `.ron` nor `.json`.
    #[error("Unsupported data file format: '{0}'")]
    UnsupportedFormat(String),

    /// Two tile templates share a name.
    #[error("Duplicate tile template: '{0}'")]
    DuplicateTile(String),

    /// Two unit templates share a name.
    #[error("Duplicate unit template: '{0}'")]
    DuplicateUnit(String),

    /// A requested template does not exist.
    #[error("Unknown {kind} template: '{name}'")]
    UnknownTemplate {
        /// `"tile"` or `"unit"`.
        kind: &'static str,
        /// Requested name.
        name: String,
    },

    /// A template failed validation.
    #[error("Validation failed for '{name}': {errors:?}")]
    Invalid {
        /// Template name.
        name: String,
        /// List of validation errors.
        errors: Vec<String>,
    },
}

/// Result type for data loading operations.
pub type DataLoadResult<T> = Result<T, DataLoadError>;

const INLINE_SOURCE: &str = "<inline>";

/// Templates shipped with the crate: `blank`, `difficult` and `rock`
/// tiles, `slime` and `wisp` units.
pub const STOCK_TEMPLATES: &str = include_str!("../../assets/templates.ron");

/// Contents of a data file.
///
/// # Example RON
///
/// ```ron
/// GameData(
///     tiles: [TileData(name: "blank")],
///     units: [...],
/// )
/// ```
///
/// JSON files use the same field names; `tile_info` / `unit_info` are
/// accepted as aliases.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GameData {
    /// Tile templates.
    #[serde(default, alias = "tile_info")]
    pub tiles: Vec<TileData>,
    /// Unit templates.
    #[serde(default, alias = "unit_info")]
    pub units: Vec<UnitData>,
}

/// Immutable tile and unit templates keyed by name.
#[derive(Debug, Clone, Default)]
pub struct TemplateRegistry {
    tiles: BTreeMap<String, TileData>,
    units: BTreeMap<String, UnitData>,
}

impl TemplateRegistry {
    /// Create a new empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from parsed data, validating every template first.
    ///
    /// # Errors
    ///
    /// Returns the first validation or duplicate-name failure. Nothing is
    /// registered unless everything is valid.
    pub fn from_data(data: GameData) -> DataLoadResult<Self> {
        let mut registry = Self::new();
        for tile in data.tiles {
            registry.register_tile(tile)?;
        }
        for unit in data.units {
            registry.register_unit(unit)?;
        }

        tracing::info!(
            tiles = registry.tiles.len(),
            units = registry.units.len(),
            "Loaded templates"
        );

        Ok(registry)
    }

    /// The templates shipped with the crate.
    pub fn stock() -> DataLoadResult<Self> {
        Self::parse_ron(STOCK_TEMPLATES, "templates.ron")
    }

    /// Parse a RON document.
    pub fn from_ron_str(source: &str) -> DataLoadResult<Self> {
        Self::parse_ron(source, INLINE_SOURCE)
    }

    /// Parse a JSON document.
    pub fn from_json_str(source: &str) -> DataLoadResult<Self> {
        Self::parse_json(source, INLINE_SOURCE)
    }

    /// Load templates from a `.ron` or `.json` file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn load_from_file(path: &Path) -> DataLoadResult<Self> {
        let path_str = path.display().to_string();

        let contents = std::fs::read_to_string(path).map_err(|e| DataLoadError::Io {
            path: path_str.clone(),
            source: e,
        })?;

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("ron") => Self::parse_ron(&contents, &path_str),
            Some("json") => Self::parse_json(&contents, &path_str),
            _ => Err(DataLoadError::UnsupportedFormat(path_str)),
        }
    }

    fn parse_ron(source: &str, path: &str) -> DataLoadResult<Self> {
        let data: GameData = ron::from_str(source).map_err(|e| DataLoadError::Ron {
            path: path.to_string(),
            source: e,
        })?;
        Self::from_data(data)
    }

    fn parse_json(source: &str, path: &str) -> DataLoadResult<Self> {
        let data: GameData = serde_json::from_str(source).map_err(|e| DataLoadError::Json {
            path: path.to_string(),
            source: e,
        })?;
        Self::from_data(data)
    }

    /// Register a tile template.
    ///
    /// # Errors
    ///
    /// Returns an error if the template is invalid or the name is taken.
    pub fn register_tile(&mut self, data: TileData) -> DataLoadResult<()> {
        let errors = data.validate();
        if !errors.is_empty() {
            return Err(DataLoadError::Invalid {
                name: data.name,
                errors,
            });
        }
        if self.tiles.contains_key(&data.name) {
            return Err(DataLoadError::DuplicateTile(data.name));
        }
        self.tiles.insert(data.name.clone(), data);
        Ok(())
    }

    /// Register a unit template.
    ///
    /// # Errors
    ///
    /// Returns an error if the template is invalid or the name is taken.
    pub fn register_unit(&mut self, data: UnitData) -> DataLoadResult<()> {
        let errors = data.validate();
        if !errors.is_empty() {
            return Err(DataLoadError::Invalid {
                name: data.name,
                errors,
            });
        }
        if self.units.contains_key(&data.name) {
            return Err(DataLoadError::DuplicateUnit(data.name));
        }
        self.units.insert(data.name.clone(), data);
        Ok(())
    }

    /// A fresh copy of the named tile.
    pub fn get_tile(&self, name: &str) -> DataLoadResult<Tile> {
        self.tiles
            .get(name)
            .map(TileData::instantiate)
            .ok_or_else(|| DataLoadError::UnknownTemplate {
                kind: "tile",
                name: name.to_string(),
            })
    }

    /// A copy of the named unit template.
    pub fn get_unit(&self, name: &str) -> DataLoadResult<UnitData> {
        self.units
            .get(name)
            .cloned()
            .ok_or_else(|| DataLoadError::UnknownTemplate {
                kind: "unit",
                name: name.to_string(),
            })
    }

    /// Check if a tile template is registered.
    #[must_use]
    pub fn contains_tile(&self, name: &str) -> bool {
        self.tiles.contains_key(name)
    }

    /// Check if a unit template is registered.
    #[must_use]
    pub fn contains_unit(&self, name: &str) -> bool {
        self.units.contains_key(name)
    }

    /// Registered tile names, sorted.
    pub fn tile_names(&self) -> impl Iterator<Item = &str> {
        self.tiles.keys().map(String::as_str)
    }

    /// Registered unit names, sorted.
    pub fn unit_names(&self) -> impl Iterator<Item = &str> {
        self.units.keys().map(String::as_str)
    }
}
