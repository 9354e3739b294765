//! Tile template definitions.

use serde::{Deserialize, Serialize};

use crate::tile::Tile;

/// Data-driven tile definition.
///
/// # Example RON
///
/// ```ron
/// TileData(
///     name: "difficult",
///     description: "Rough ground, slow going.",
///     traits: ["difficult"],
/// )
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileData {
    /// Unique template name.
    pub name: String,

    /// Flavour text.
    #[serde(default, alias = "desc")]
    pub description: String,

    /// Terrain traits.
    #[serde(default, deserialize_with = "super::traits_from_list_or_csv")]
    pub traits: Vec<String>,
}

impl TileData {
    /// Build a fresh tile with no influence.
    #[must_use]
    pub fn instantiate(&self) -> Tile {
        Tile::new(
            self.name.clone(),
            self.description.clone(),
            self.traits.iter().cloned(),
        )
    }

    /// Check internal consistency, returning a list of problems.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if self.name.trim().is_empty() {
            errors.push("tile name is empty".to_string());
        }
        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_traits_accept_csv_string() {
        let json = r#"{"name": "swamp", "desc": "wet", "traits": "difficult, muddy"}"#;
        let data: TileData = serde_json::from_str(json).unwrap();
        assert_eq!(data.description, "wet");
        assert_eq!(data.traits, vec!["difficult", "muddy"]);
        assert!(data.instantiate().is_difficult());
    }

    #[test]
    fn test_traits_default_to_empty() {
        let data: TileData = ron::from_str(r#"TileData(name: "blank")"#).unwrap();
        assert!(data.traits.is_empty());
        assert!(data.validate().is_empty());
    }

    #[test]
    fn test_empty_name_is_invalid() {
        let data = TileData {
            name: " ".to_string(),
            description: String::new(),
            traits: Vec::new(),
        };
        assert_eq!(data.validate().len(), 1);
    }
}
