//! Unit template definitions.

use serde::{Deserialize, Serialize};

use crate::factions::Alignment;
use crate::unit::{AttackTable, RenderHints, Unit, UnitId};

/// Data-driven unit definition.
///
/// # Example RON
///
/// ```ron
/// UnitData(
///     name: "slime",
///     description: "A wobbling blob.",
///     traits: ["small"],
///     health: 10,
///     attacks: {
///         "bite": (damage: 3, count: 2),
///         "spit": (damage: 1, count: 1, effects: ["poison"]),
///     },
///     speed: 3,
/// )
/// ```
///
/// Render hints may be given as a nested `render` record or as flat
/// top-level fields (`scale_size`, `offset_x`, `offset_y`,
/// `ring_offset_x`, `ring_offset_y`, `alpha`). Flat fields win.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawUnitData")]
pub struct UnitData {
    /// Unique template name.
    pub name: String,

    /// Flavour text.
    #[serde(default, alias = "desc")]
    pub description: String,

    /// Unit traits.
    #[serde(default, deserialize_with = "super::traits_from_list_or_csv")]
    pub traits: Vec<String>,

    /// Maximum health; units spawn at full health.
    pub health: u32,

    /// Attacks in declaration order. The first one is the default in combat.
    pub attacks: AttackTable,

    /// Movement budget restored every turn.
    pub speed: u32,

    /// Sprite placement for the presentation layer.
    #[serde(default)]
    pub render: RenderHints,
}

/// On-disk shape of [`UnitData`], accepting flat render fields.
#[derive(Deserialize)]
#[serde(rename = "UnitData")]
struct RawUnitData {
    name: String,
    #[serde(default, alias = "desc")]
    description: String,
    #[serde(default, deserialize_with = "super::traits_from_list_or_csv")]
    traits: Vec<String>,
    health: u32,
    attacks: AttackTable,
    speed: u32,
    #[serde(default)]
    render: RenderHints,
    scale_size: Option<f32>,
    offset_x: Option<f32>,
    offset_y: Option<f32>,
    ring_offset_x: Option<f32>,
    ring_offset_y: Option<f32>,
    alpha: Option<u8>,
}

impl From<RawUnitData> for UnitData {
    fn from(raw: RawUnitData) -> Self {
        let mut render = raw.render;
        if let Some(v) = raw.scale_size {
            render.scale_size = v;
        }
        if let Some(v) = raw.offset_x {
            render.offset_x = v;
        }
        if let Some(v) = raw.offset_y {
            render.offset_y = v;
        }
        if let Some(v) = raw.ring_offset_x {
            render.ring_offset_x = v;
        }
        if let Some(v) = raw.ring_offset_y {
            render.ring_offset_y = v;
        }
        if let Some(v) = raw.alpha {
            render.alpha = v;
        }
        Self {
            name: raw.name,
            description: raw.description,
            traits: raw.traits,
            health: raw.health,
            attacks: raw.attacks,
            speed: raw.speed,
            render,
        }
    }
}

impl UnitData {
    /// Build a fresh unit instance from this template.
    #[must_use]
    pub fn instantiate(&self, id: UnitId, alignment: Alignment) -> Unit {
        let health = i32::try_from(self.health).unwrap_or(i32::MAX);
        let mut unit = Unit::new(
            id,
            self.name.clone(),
            health,
            self.speed,
            self.attacks.clone(),
            alignment,
        );
        unit.description = self.description.clone();
        unit.traits = self.traits.iter().cloned().collect();
        unit.render = self.render;
        unit
    }

    /// Check if this unit has the specified trait.
    #[must_use]
    pub fn has_trait(&self, name: &str) -> bool {
        self.traits.iter().any(|t| t == name)
    }

    /// Check internal consistency, returning a list of problems.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.name.trim().is_empty() {
            errors.push("unit name is empty".to_string());
        }
        if self.health == 0 {
            errors.push(format!("unit '{}' has zero health", self.name));
        }
        if self.attacks.is_empty() {
            errors.push(format!("unit '{}' has no attacks", self.name));
        }
        for (attack, info) in self.attacks.iter() {
            if info.count == 0 {
                errors.push(format!(
                    "attack '{attack}' of unit '{}' has zero hit count",
                    self.name
                ));
            }
        }

        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::unit::AttackInfo;

    fn create_test_unit() -> UnitData {
        UnitData {
            name: "slime".to_string(),
            description: "blob".to_string(),
            traits: vec!["small".to_string()],
            health: 10,
            attacks: AttackTable::new().with("bite", AttackInfo::new(3, 2)),
            speed: 3,
            render: RenderHints::default(),
        }
    }

    #[test]
    fn test_instantiate_is_independent_copy() {
        let data = create_test_unit();
        let mut a = data.instantiate(UnitId(1), Alignment::new("white"));
        let b = data.instantiate(UnitId(2), Alignment::new("blue"));

        a.take_damage(4);
        assert_eq!(a.health, 6);
        assert_eq!(b.health, 10);
        assert_eq!(data.health, 10);
        assert!(a.has_trait("small"));
        assert_eq!(a.movement(), 3);
    }

    #[test]
    fn test_validate_catches_problems() {
        let mut data = create_test_unit();
        assert!(data.validate().is_empty());

        data.health = 0;
        data.attacks = AttackTable::new().with("nothing", AttackInfo::new(1, 0));
        assert_eq!(data.validate().len(), 2);

        data.attacks = AttackTable::new();
        assert!(data
            .validate()
            .iter()
            .any(|e| e.contains("has no attacks")));
    }

    #[test]
    fn test_parse_ron_with_attack_map() {
        let ron_src = r#"UnitData(
            name: "slime",
            health: 10,
            attacks: {
                "bite": (damage: 3, count: 2),
                "spit": (damage: 1, count: 1, effects: ["poison"]),
            },
            speed: 3,
        )"#;
        let data: UnitData = ron::from_str(ron_src).unwrap();
        assert_eq!(data.attacks.first_name(), Some("bite"));
        assert_eq!(data.render, RenderHints::default());
    }

    #[test]
    fn test_flat_render_fields_from_json() {
        let json = r#"{
            "name": "ghost",
            "desc": "Hard to see.",
            "traits": "invisible, small",
            "health": 6,
            "attacks": {"chill": {"damage": 1, "count": 2}},
            "speed": 4,
            "scale_size": 0.8,
            "offset_y": -0.25,
            "ring_offset_x": 3.0,
            "alpha": 128
        }"#;
        let data: UnitData = serde_json::from_str(json).unwrap();
        assert_eq!(data.description, "Hard to see.");
        assert_eq!(data.traits, vec!["invisible", "small"]);
        assert_eq!(
            data.render,
            RenderHints {
                scale_size: 0.8,
                offset_y: -0.25,
                ring_offset_x: 3.0,
                alpha: 128,
                ..RenderHints::default()
            }
        );
    }

    #[test]
    fn test_flat_render_fields_override_nested() {
        let ron_src = r#"UnitData(
            name: "statue",
            health: 20,
            attacks: {"slam": (damage: 2, count: 1)},
            speed: 0,
            render: (scale_size: 1.5, offset_x: 0.5, alpha: 200),
            alpha: 64,
        )"#;
        let data: UnitData = ron::from_str(ron_src).unwrap();
        assert_eq!(data.render.scale_size, 1.5);
        assert_eq!(data.render.offset_x, 0.5);
        assert_eq!(data.render.alpha, 64);
    }
}
