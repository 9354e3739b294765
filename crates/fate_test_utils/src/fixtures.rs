//! Test fixtures and helpers.
//!
//! Small templates, bare grids and pre-built sessions for consistent
//! testing.

use fate_core::config::GameConfig;
use fate_core::data::TemplateRegistry;
use fate_core::factions::Alignment;
use fate_core::grid::HexGrid;
use fate_core::hex::Position;
use fate_core::session::GameSession;
use fate_core::tile::Tile;
use fate_core::unit::{AttackInfo, AttackTable, Unit, UnitId};

/// Shorthand for a grid position.
#[must_use]
pub const fn pos(row: i32, col: i32) -> Position {
    Position::new(row, col)
}

/// Templates used across the test suites.
///
/// - `grunt`: 10 health, speed 3, `bite` 3x2.
/// - `spitter`: 8 health, speed 2, `spit` 1x1 poisoning.
/// - `statue`: 20 health, speed 0, `slam` 2x1.
/// - `ghost`: invisible, 6 health, speed 4, `chill` 1x2.
pub const TEST_TEMPLATES: &str = r#"
GameData(
    tiles: [
        (name: "blank"),
        (name: "difficult", traits: ["difficult"]),
        (name: "rock", traits: ["impassable"]),
    ],
    units: [
        (name: "grunt", health: 10, speed: 3, attacks: {"bite": (damage: 3, count: 2)}),
        (name: "spitter", health: 8, speed: 2, attacks: {"spit": (damage: 1, count: 1, effects: ["poison"])}),
        (name: "statue", health: 20, speed: 0, attacks: {"slam": (damage: 2, count: 1)}),
        (name: "ghost", traits: "invisible", health: 6, speed: 4, attacks: {"chill": (damage: 1, count: 2)}),
    ],
)
"#;

/// Registry loaded from [`TEST_TEMPLATES`].
///
/// # Panics
///
/// Panics if the fixture data fails to load.
#[must_use]
pub fn test_registry() -> TemplateRegistry {
    TemplateRegistry::from_ron_str(TEST_TEMPLATES).expect("test templates must load")
}

/// Plain tile with no traits.
#[must_use]
pub fn blank_tile() -> Tile {
    Tile::new("blank", "", Vec::new())
}

/// Grid of blank tiles at the default tile size.
#[must_use]
pub fn blank_grid(rows: u16, cols: u16) -> HexGrid {
    HexGrid::new(rows, cols, 80, &blank_tile())
}

/// A grunt-like unit built without a registry.
#[must_use]
pub fn grunt(id: u64, alignment: &str) -> Unit {
    let attacks = AttackTable::new().with("bite", AttackInfo::new(3, 2));
    Unit::new(UnitId(id), "grunt", 10, 3, attacks, Alignment::new(alignment))
}

/// Empty session over a blank `rows` x `cols` grid with the test
/// templates, white to act first.
///
/// # Panics
///
/// Panics if the configuration is rejected.
#[must_use]
pub fn empty_session(rows: u16, cols: u16) -> GameSession {
    let config = GameConfig {
        rows,
        cols,
        ..GameConfig::default()
    };
    GameSession::new(config, test_registry()).expect("test session must build")
}

/// Session with units placed from `(template, position, alignment)`
/// triples.
///
/// # Panics
///
/// Panics if any placement fails.
#[must_use]
pub fn session_with_units(
    rows: u16,
    cols: u16,
    units: &[(&str, Position, &str)],
) -> GameSession {
    let mut session = empty_session(rows, cols);
    for &(template, at, alignment) in units {
        session
            .spawn_unit(template, at, Alignment::new(alignment))
            .expect("fixture placement must succeed");
    }
    session
}

/// Run ticks until no unit is moving, returning how many were needed.
///
/// # Panics
///
/// Panics if movement does not settle within
/// `max_ticks`.
pub fn run_until_idle(session: &mut GameSession, max_ticks: u64) -> u64 {
    for n in 0..max_ticks {
        if session.movement().is_idle() {
            return n;
        }
        session.tick();
    }
    assert!(
        session.movement().is_idle(),
        "movement did not settle within {max_ticks} ticks"
    );
    max_ticks
}

/// Install a `tracing` subscriber that writes through the test harness.
///
/// Honours `RUST_LOG`. Safe to call from every test.
pub fn init_test_tracing() {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_test_writer())
        .with(EnvFilter::from_default_env())
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_has_fixture_templates() {
        let registry = test_registry();
        for name in ["grunt", "spitter", "statue", "ghost"] {
            assert!(registry.contains_unit(name), "missing {name}");
        }
        assert!(registry.get_unit("ghost").unwrap().has_trait("invisible"));
        assert!(registry.get_tile("rock").unwrap().is_impassable());
    }

    #[test]
    fn test_session_with_units() {
        init_test_tracing();
        let session = session_with_units(
            8,
            8,
            &[("grunt", pos(1, 1), "white"), ("statue", pos(3, 1), "blue")],
        );
        assert_eq!(session.grid().units().count(), 2);
        assert_eq!(run_until_idle(&mut session.clone(), 5), 0);
    }
}
