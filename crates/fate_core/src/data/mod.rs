//! Static tile and unit templates.
//!
//! Templates are loaded once at startup from a RON or JSON data file and
//! never mutated afterwards. The registry hands out independent copies so
//! per-instance state (health, alignment, influence) never aliases a
//! template.
//!
//! Loading is all-or-nothing: any malformed entry fails the whole load
//! with a [`DataLoadError`].

mod registry;
mod tile_data;
mod unit_data;

pub use registry::{DataLoadError, DataLoadResult, GameData, TemplateRegistry, STOCK_TEMPLATES};
pub use tile_data::TileData;
pub use unit_data::UnitData;

use serde::{Deserialize, Deserializer};

/// Deserialize a trait list given either as a sequence or as a
/// comma-separated string (`"slimy,small"`).
fn traits_from_list_or_csv<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum TraitList {
        List(Vec<String>),
        Joined(String),
    }

    let traits = match TraitList::deserialize(deserializer)? {
        TraitList::List(list) => list,
        TraitList::Joined(joined) => joined.split(',').map(str::to_string).collect(),
    };

    Ok(traits
        .into_iter()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect())
}
