//! Units, attacks and status effects.

use std::collections::BTreeSet;
use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::factions::Alignment;

/// Handle to a spawned unit.
///
/// Ids are allocated monotonically and never reused, so a stale handle
/// simply fails to resolve instead of aliasing a newer unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UnitId(pub u64);

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One attack option.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttackInfo {
    /// Damage per hit.
    pub damage: u32,
    /// Number of hits.
    pub count: u32,
    /// Effect tags applied to the struck unit, e.g. `"poison"`.
    #[serde(default)]
    pub effects: Vec<String>,
}

impl AttackInfo {
    /// Create an attack with no effects.
    #[must_use]
    pub const fn new(damage: u32, count: u32) -> Self {
        Self {
            damage,
            count,
            effects: Vec::new(),
        }
    }

    /// Builder method to add an effect tag.
    #[must_use]
    pub fn with_effect(mut self, tag: impl Into<String>) -> Self {
        self.effects.push(tag.into());
        self
    }

    /// Total damage dealt: `damage × count`.
    #[must_use]
    pub const fn total(&self) -> u32 {
        self.damage.saturating_mul(self.count)
    }

    /// Status effects this attack inflicts.
    pub fn inflicted_statuses(&self) -> impl Iterator<Item = StatusEffect> + '_ {
        self.effects.iter().filter_map(|tag| StatusEffect::from_tag(tag))
    }
}

/// Attack name to [`AttackInfo`] mapping that remembers insertion order.
///
/// The first inserted attack is the default selection when a combat
/// opens. Serialized as a map; deserializing rejects duplicate names.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttackTable {
    entries: Vec<(String, AttackInfo)>,
}

impl AttackTable {
    /// Create an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an attack.
    ///
    /// Returns `false` and leaves the table unchanged if the name is taken.
    pub fn insert(&mut self, name: impl Into<String>, info: AttackInfo) -> bool {
        let name = name.into();
        if self.contains(&name) {
            return false;
        }
        self.entries.push((name, info));
        true
    }

    /// Builder form of [`insert`](Self::insert); later duplicates are ignored.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, info: AttackInfo) -> Self {
        self.insert(name, info);
        self
    }

    /// Look up an attack by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&AttackInfo> {
        self.entries.iter().find(|(n, _)| n == name).map(|(_, info)| info)
    }

    /// Check if an attack with this name exists.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Name of the first attack in insertion order.
    #[must_use]
    pub fn first_name(&self) -> Option<&str> {
        self.entries.first().map(|(n, _)| n.as_str())
    }

    /// Attack names in insertion order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(n, _)| n.as_str())
    }

    /// Iterate `(name, info)` in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &AttackInfo)> {
        self.entries.iter().map(|(n, info)| (n.as_str(), info))
    }

    /// Number of attacks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the table is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Serialize for AttackTable {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, info) in &self.entries {
            map.serialize_entry(name, info)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for AttackTable {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct TableVisitor;

        impl<'de> Visitor<'de> for TableVisitor {
            type Value = AttackTable;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of attack name to attack info")
            }

            fn visit_map<A>(self, mut access: A) -> Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut table = AttackTable::new();
                while let Some((name, info)) = access.next_entry::<String, AttackInfo>()? {
                    if table.contains(&name) {
                        return Err(serde::de::Error::custom(format!(
                            "duplicate attack '{name}'"
                        )));
                    }
                    table.entries.push((name, info));
                }
                Ok(table)
            }
        }

        deserializer.deserialize_map(TableVisitor)
    }
}

/// Status effects a unit can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum StatusEffect {
    /// Takes damage at every turn rotation; blocks healing unless cured.
    Poisoned,
    /// Projects hidden rather than visible influence onto nearby tiles.
    Invisible,
}

impl StatusEffect {
    /// Map an attack effect tag to a status. Unknown tags yield `None`.
    #[must_use]
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag.trim().to_ascii_lowercase().as_str() {
            "poison" | "poisoned" => Some(Self::Poisoned),
            "invisible" | "hidden" => Some(Self::Invisible),
            _ => None,
        }
    }
}

/// Presentation hints carried through from the unit data file.
///
/// Never read by the core.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RenderHints {
    /// Sprite scale relative to the tile size.
    #[serde(default = "default_scale")]
    pub scale_size: f32,
    /// Sprite offset in tiles.
    #[serde(default)]
    pub offset_x: f32,
    /// Sprite offset in tiles.
    #[serde(default)]
    pub offset_y: f32,
    /// Alignment ring offset in pixels.
    #[serde(default)]
    pub ring_offset_x: f32,
    /// Alignment ring offset in pixels.
    #[serde(default)]
    pub ring_offset_y: f32,
    /// Sprite opacity, 0-255.
    #[serde(default = "default_alpha")]
    pub alpha: u8,
}

const fn default_scale() -> f32 {
    1.0
}

const fn default_alpha() -> u8 {
    255
}

impl Default for RenderHints {
    fn default() -> Self {
        Self {
            scale_size: default_scale(),
            offset_x: 0.0,
            offset_y: 0.0,
            ring_offset_x: 0.0,
            ring_offset_y: 0.0,
            alpha: default_alpha(),
        }
    }
}

/// A unit instance on the board.
///
/// Units are owned by the cell they stand on, or by their movement
/// session while moving. Everything else refers to them by [`UnitId`].
#[derive(Debug, Clone, PartialEq)]
pub struct Unit {
    id: UnitId,
    /// Template name.
    pub name: String,
    /// Flavour text.
    pub description: String,
    /// Unit traits, e.g. `"invisible"`.
    pub traits: BTreeSet<String>,
    /// Current health. May go negative until the next refresh removes it.
    pub health: i32,
    /// Maximum health.
    pub max_health: i32,
    /// Available attacks.
    pub attacks: AttackTable,
    alignment: Alignment,
    original_alignment: Alignment,
    /// Base speed, the budget restored every turn.
    pub speed: u32,
    movement: u32,
    /// Whether the unit may still attack this turn.
    pub can_attack: bool,
    /// Active status effects.
    pub statuses: BTreeSet<StatusEffect>,
    /// Presentation hints.
    pub render: RenderHints,
}

impl Unit {
    /// Create a unit at full health and full movement.
    #[must_use]
    pub fn new(
        id: UnitId,
        name: impl Into<String>,
        health: i32,
        speed: u32,
        attacks: AttackTable,
        alignment: Alignment,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            description: String::new(),
            traits: BTreeSet::new(),
            health,
            max_health: health,
            attacks,
            original_alignment: alignment.clone(),
            alignment,
            speed,
            movement: speed,
            can_attack: true,
            statuses: BTreeSet::new(),
            render: RenderHints::default(),
        }
    }

    /// The unit's handle.
    #[must_use]
    pub const fn id(&self) -> UnitId {
        self.id
    }

    /// Current alignment.
    #[must_use]
    pub const fn alignment(&self) -> &Alignment {
        &self.alignment
    }

    /// Alignment the unit was spawned with.
    #[must_use]
    pub const fn original_alignment(&self) -> &Alignment {
        &self.original_alignment
    }

    /// Change the current alignment. The original alignment is kept.
    pub fn set_alignment(&mut self, alignment: Alignment) {
        self.alignment = alignment;
    }

    /// Whether `other` is an enemy of this unit.
    #[must_use]
    pub fn is_hostile_to(&self, other: &Self) -> bool {
        self.alignment.is_hostile_to(&other.alignment)
    }

    /// Remaining movement this turn.
    #[must_use]
    pub const fn movement(&self) -> u32 {
        self.movement
    }

    /// Spend movement, flooring at zero.
    pub fn spend_movement(&mut self, cost: u32) {
        self.movement = self.movement.saturating_sub(cost);
    }

    /// Give up all remaining movement for this turn.
    pub fn exhaust_movement(&mut self) {
        self.movement = 0;
    }

    /// Restore per-turn resources.
    pub fn reset_for_turn(&mut self) {
        self.can_attack = true;
        self.movement = self.speed;
    }

    /// Whether the unit is still standing.
    #[must_use]
    pub const fn is_alive(&self) -> bool {
        self.health > 0
    }

    /// Subtract health. No clamping; death is handled by the next refresh.
    pub fn take_damage(&mut self, amount: u32) {
        let amount = i32::try_from(amount).unwrap_or(i32::MAX);
        self.health = self.health.saturating_sub(amount);
    }

    /// Recover health, never above max health.
    ///
    /// A poisoned unit recovers nothing. With `cure` set the poison is
    /// removed instead, and the healing still does not apply this time.
    pub fn recover_health(&mut self, amount: u32, cure: bool) {
        if self.is_poisoned() {
            if cure {
                self.statuses.remove(&StatusEffect::Poisoned);
            }
            return;
        }
        let amount = i32::try_from(amount).unwrap_or(i32::MAX);
        self.health = self.health.saturating_add(amount).min(self.max_health);
    }

    /// Check if the unit has the specified trait.
    #[must_use]
    pub fn has_trait(&self, name: &str) -> bool {
        self.traits.contains(name)
    }

    /// Check if the unit carries a status effect.
    #[must_use]
    pub fn has_status(&self, status: StatusEffect) -> bool {
        self.statuses.contains(&status)
    }

    /// Whether the unit is poisoned.
    #[must_use]
    pub fn is_poisoned(&self) -> bool {
        self.has_status(StatusEffect::Poisoned)
    }

    /// Whether the unit's influence on nearby tiles is hidden.
    #[must_use]
    pub fn is_hidden(&self) -> bool {
        self.has_status(StatusEffect::Invisible) || self.has_trait("invisible")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slime() -> Unit {
        let attacks = AttackTable::new()
            .with("bite", AttackInfo::new(3, 2))
            .with("spit", AttackInfo::new(1, 1).with_effect("poison"));
        Unit::new(UnitId(1), "slime", 10, 3, attacks, Alignment::new("white"))
    }

    #[test]
    fn test_attack_table_keeps_insertion_order() {
        let unit = slime();
        assert_eq!(unit.attacks.first_name(), Some("bite"));
        assert_eq!(unit.attacks.names().collect::<Vec<_>>(), vec!["bite", "spit"]);
    }

    #[test]
    fn test_attack_table_rejects_duplicates() {
        let mut table = AttackTable::new();
        assert!(table.insert("bite", AttackInfo::new(1, 1)));
        assert!(!table.insert("bite", AttackInfo::new(9, 9)));
        assert_eq!(table.get("bite"), Some(&AttackInfo::new(1, 1)));
    }

    #[test]
    fn test_attack_table_deserializes_in_file_order() {
        let json = r#"{"zap": {"damage": 1, "count": 1}, "bite": {"damage": 2, "count": 3, "effects": ["poison"]}}"#;
        let table: AttackTable = serde_json::from_str(json).unwrap();
        assert_eq!(table.names().collect::<Vec<_>>(), vec!["zap", "bite"]);
        assert_eq!(table.get("bite").unwrap().total(), 6);

        let dup = r#"{"zap": {"damage": 1, "count": 1}, "zap": {"damage": 2, "count": 1}}"#;
        assert!(serde_json::from_str::<AttackTable>(dup).is_err());
    }

    #[test]
    fn test_attack_total_and_statuses() {
        let attack = AttackInfo::new(3, 2).with_effect("poison").with_effect("sparkle");
        assert_eq!(attack.total(), 6);
        assert_eq!(
            attack.inflicted_statuses().collect::<Vec<_>>(),
            vec![StatusEffect::Poisoned]
        );
    }

    #[test]
    fn test_movement_floors_at_zero_and_resets() {
        let mut unit = slime();
        unit.spend_movement(2);
        assert_eq!(unit.movement(), 1);
        unit.spend_movement(5);
        assert_eq!(unit.movement(), 0);
        unit.can_attack = false;
        unit.reset_for_turn();
        assert_eq!(unit.movement(), 3);
        assert!(unit.can_attack);
    }

    #[test]
    fn test_recover_health_clamps_to_max() {
        let mut unit = slime();
        unit.take_damage(4);
        assert_eq!(unit.health, 6);
        unit.recover_health(10, false);
        assert_eq!(unit.health, 10);
    }

    #[test]
    fn test_poison_blocks_recovery_until_cured() {
        let mut unit = slime();
        unit.take_damage(5);
        unit.statuses.insert(StatusEffect::Poisoned);

        unit.recover_health(3, false);
        assert_eq!(unit.health, 5);

        unit.recover_health(3, true);
        assert_eq!(unit.health, 5);
        assert!(!unit.is_poisoned());

        unit.recover_health(3, false);
        assert_eq!(unit.health, 8);
    }

    #[test]
    fn test_health_may_go_negative() {
        let mut unit = slime();
        unit.take_damage(25);
        assert_eq!(unit.health, -15);
        assert!(!unit.is_alive());
    }

    #[test]
    fn test_alignment_change_keeps_original() {
        let mut unit = slime();
        unit.set_alignment(Alignment::new("blue"));
        assert_eq!(unit.alignment().as_str(), "blue");
        assert_eq!(unit.original_alignment().as_str(), "white");
    }
}
