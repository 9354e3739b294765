//! Determinism testing utilities.
//!
//! Provides a harness for verifying that a game session produces
//! identical results given identical inputs.
//!
//! # Testing Strategy
//!
//! Replays, shared-screen hot seat and tests all assume that the same
//! input sequence yields the same board. Sources of non-determinism
//! include:
//!
//! - **Floating-point math**: animation positions and path priorities use
//!   fixed-point arithmetic via [`fate_core::math::Fixed`].
//!
//! - **HashMap iteration order**: Rust's default hasher is randomized.
//!   Search maps are only ever looked up by key, and anything iterated
//!   (units, movement sessions, attacks) lives in ordered containers.
//!
//! - **System randomness**: combat has no dice.
//!
//! # Test Levels
//!
//! 1. **Unit tests**: individual module determinism (pathfinding, movement)
//! 2. **Property tests**: random input sequences replay identically
//! 3. **Integration tests**: full scenarios are reproducible

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use fate_core::hex::Position;
use fate_core::session::GameSession;

/// Result of a determinism test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeterminismResult {
    /// Whether all runs produced identical results.
    pub is_deterministic: bool,
    /// Hashes from each run.
    pub hashes: Vec<u64>,
    /// Number of ticks simulated.
    pub ticks: u64,
}

impl DeterminismResult {
    /// Get all unique hashes (should be 1 for a deterministic session).
    #[must_use]
    pub fn unique_hashes(&self) -> Vec<u64> {
        let mut unique: Vec<u64> = self.hashes.clone();
        unique.sort_unstable();
        unique.dedup();
        unique
    }

    /// Assert that the runs were deterministic, with a detailed error message.
    ///
    /// # Panics
    ///
    /// Panics if the runs produced different hashes.
    pub fn assert_deterministic(&self) {
        if !self.is_deterministic {
            let unique = self.unique_hashes();
            panic!(
                "Session is non-deterministic!\n\
                 Runs: {}\n\
                 Ticks: {}\n\
                 Unique hashes: {} (expected 1)\n\
                 All hashes: {:?}",
                self.hashes.len(),
                self.ticks,
                unique.len(),
                self.hashes
            );
        }
    }
}

/// Run a state machine multiple times and verify determinism.
///
/// # Arguments
///
/// * `runs` - Number of times to run
/// * `ticks` - Number of steps per run
/// * `setup` - Function to create the initial state
/// * `step` - Function to advance the state by one step
/// * `hash` - Function to compute the state hash
///
/// # Example
///
/// ```ignore
/// use fate_test_utils::determinism::verify_determinism;
/// use fate_core::session::GameSession;
///
/// let result = verify_determinism(
///     5,   // Run 5 times
///     100, // 100 ticks each
///     || GameSession::skirmish().unwrap(),
///     |session| { session.tick(); },
///     GameSession::state_hash,
/// );
/// result.assert_deterministic();
/// ```
pub fn verify_determinism<S, Setup, Step, HashFn>(
    runs: usize,
    ticks: u64,
    setup: Setup,
    step: Step,
    hash: HashFn,
) -> DeterminismResult
where
    Setup: Fn() -> S,
    Step: Fn(&mut S),
    HashFn: Fn(&S) -> u64,
{
    let mut hashes = Vec::with_capacity(runs);

    for _ in 0..runs {
        let mut state = setup();

        for _ in 0..ticks {
            step(&mut state);
        }

        hashes.push(hash(&state));
    }

    let is_deterministic = hashes.windows(2).all(|w| w[0] == w[1]);

    DeterminismResult {
        is_deterministic,
        hashes,
        ticks,
    }
}

/// Player input replayed against a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    /// Move the `unit`-th unit of the active faction (row-major, wrapping)
    /// towards `to`.
    Move {
        /// Index into the active faction's units.
        unit: usize,
        /// Requested destination.
        to: Position,
    },
    /// Advance this many ticks.
    Tick(u8),
    /// Resolve the pending combat.
    ConfirmAttack,
    /// Dismiss the pending combat.
    CancelAttack,
    /// Hand over to the next faction.
    EndTurn,
}

/// Apply one input. Rejected inputs are logged at debug level and
/// otherwise ignored, as a UI would ignore an invalid click.
pub fn apply_input(session: &mut GameSession, input: &Input) {
    match *input {
        Input::Move { unit, to } => {
            let active = session.turns().active().clone();
            let candidates: Vec<_> = session
                .grid()
                .units()
                .filter(|(_, u)| *u.alignment() == active)
                .map(|(_, u)| u.id())
                .collect();
            if candidates.is_empty() {
                return;
            }
            let id = candidates[unit % candidates.len()];
            match session.preview_path(id, to) {
                Ok(path) if path.is_empty() => {
                    tracing::debug!(?input, unit = %id, "No path for input");
                }
                Ok(path) => log_rejection(input, session.confirm_move(id, to, path)),
                Err(e) => log_rejection::<()>(input, Err(e)),
            }
        }
        Input::Tick(n) => {
            for _ in 0..n {
                session.tick();
            }
        }
        Input::ConfirmAttack => log_rejection(input, session.confirm_attack()),
        Input::CancelAttack => log_rejection(input, session.cancel_attack()),
        Input::EndTurn => log_rejection(input, session.end_turn()),
    }
}

fn log_rejection<T>(input: &Input, result: fate_core::error::Result<T>) {
    if let Err(e) = result {
        tracing::debug!(?input, error = %e, "Input rejected");
    }
}

/// Replay `inputs` on a fresh session and return the final state hash.
pub fn replay<F>(setup_fn: F, inputs: &[Input]) -> u64
where
    F: Fn() -> GameSession,
{
    let mut session = setup_fn();
    for input in inputs {
        apply_input(&mut session, input);
    }
    session.state_hash()
}

/// Replay the same inputs twice and verify the final hashes match.
pub fn verify_replay_determinism<F>(setup_fn: F, inputs: &[Input]) -> bool
where
    F: Fn() -> GameSession,
{
    replay(&setup_fn, inputs) == replay(&setup_fn, inputs)
}

/// Compare two sessions input-by-input, finding the first divergence.
///
/// # Returns
///
/// `None` if the sessions stay identical, `Some(n)` if they differ after
/// the `n`-th input (0 means the initial states already differ).
pub fn find_first_divergence<F>(setup_fn: F, inputs: &[Input]) -> Option<usize>
where
    F: Fn() -> GameSession,
{
    let mut a = setup_fn();
    let mut b = setup_fn();

    if a.state_hash() != b.state_hash() {
        return Some(0);
    }

    for (n, input) in inputs.iter().enumerate() {
        apply_input(&mut a, input);
        apply_input(&mut b, input);

        if a.state_hash() != b.state_hash() {
            tracing::warn!(input = n + 1, ?input, "Sessions diverged");
            return Some(n + 1);
        }
    }

    None
}

/// Compute a simple hash for any hashable value.
pub fn compute_hash<T: Hash>(value: &T) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

/// Proptest strategies for grid, path and input testing.
///
/// These strategies generate random but reproducible inputs for
/// property-based testing.
pub mod strategies {
    use fate_core::hex::{Direction, Position};
    use proptest::prelude::*;

    use super::Input;

    /// Generate any position inside a `rows` x `cols` grid.
    pub fn arb_position(rows: u16, cols: u16) -> impl Strategy<Value = Position> {
        (0..i32::from(rows), 0..i32::from(cols)).prop_map(|(r, c)| Position::new(r, c))
    }

    /// Generate a position that may lie up to `margin` cells off the grid.
    pub fn arb_position_near(rows: u16, cols: u16, margin: i32) -> impl Strategy<Value = Position> {
        (
            -margin..i32::from(rows) + margin,
            -margin..i32::from(cols) + margin,
        )
            .prop_map(|(r, c)| Position::new(r, c))
    }

    /// Generate one of the six directions.
    pub fn arb_direction() -> impl Strategy<Value = Direction> {
        proptest::sample::select(Direction::ALL.to_vec())
    }

    /// Generate one player input for a `rows` x `cols` board.
    pub fn arb_input(rows: u16, cols: u16) -> impl Strategy<Value = Input> {
        prop_oneof![
            4 => (0usize..4, arb_position(rows, cols))
                .prop_map(|(unit, to)| Input::Move { unit, to }),
            4 => (1u8..30).prop_map(Input::Tick),
            1 => Just(Input::ConfirmAttack),
            1 => Just(Input::CancelAttack),
            2 => Just(Input::EndTurn),
        ]
    }

    /// Generate a sequence of inputs.
    pub fn arb_input_sequence(
        rows: u16,
        cols: u16,
        max_len: usize,
    ) -> impl Strategy<Value = Vec<Input>> {
        proptest::collection::vec(arb_input(rows, cols), 0..max_len)
    }
}

#[cfg(test)]
mod tests {
    use super::strategies::*;
    use super::*;
    use crate::fixtures::{init_test_tracing, pos, session_with_units};
    use proptest::prelude::*;

    fn duel() -> GameSession {
        session_with_units(
            10,
            8,
            &[
                ("grunt", pos(1, 1), "white"),
                ("spitter", pos(2, 5), "white"),
                ("grunt", pos(6, 3), "blue"),
                ("ghost", pos(8, 6), "blue"),
            ],
        )
    }

    #[test]
    fn test_rejected_inputs_leave_state_alone() {
        init_test_tracing();
        let mut session = duel();
        let before = session.state_hash();
        for input in [
            Input::ConfirmAttack,
            Input::CancelAttack,
            Input::Move {
                unit: 0,
                to: pos(40, 40),
            },
        ] {
            apply_input(&mut session, &input);
        }
        assert_eq!(session.state_hash(), before);
    }

    #[test]
    fn test_verify_determinism_simple() {
        let result = verify_determinism(3, 100, || 0u64, |n| *n += 1, |n| *n);

        assert!(result.is_deterministic);
        assert_eq!(result.hashes, vec![100, 100, 100]);
    }

    #[test]
    fn test_idle_session_determinism() {
        let result = verify_determinism(
            3,
            50,
            duel,
            |s| {
                s.tick();
            },
            GameSession::state_hash,
        );
        result.assert_deterministic();
        assert_eq!(result.unique_hashes().len(), 1);
    }

    #[test]
    fn test_scripted_replay_has_no_divergence() {
        let inputs = vec![
            Input::Move { unit: 0, to: pos(5, 3) },
            Input::Tick(40),
            Input::ConfirmAttack,
            Input::EndTurn,
            Input::Move { unit: 1, to: pos(2, 5) },
            Input::Tick(60),
            Input::EndTurn,
        ];
        assert_eq!(find_first_divergence(duel, &inputs), None);
        assert!(verify_replay_determinism(duel, &inputs));
    }

    #[test]
    fn test_replay_detects_different_inputs() {
        let moved = replay(duel, &[Input::Move { unit: 0, to: pos(3, 1) }, Input::Tick(40)]);
        let idle = replay(duel, &[Input::Tick(40)]);
        assert_ne!(moved, idle);
    }

    #[test]
    fn test_compute_hash_stable() {
        assert_eq!(compute_hash(&pos(2, 3)), compute_hash(&pos(2, 3)));
        assert_ne!(compute_hash(&pos(2, 3)), compute_hash(&pos(3, 2)));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn prop_replay_is_deterministic(inputs in arb_input_sequence(10, 8, 24)) {
            prop_assert!(verify_replay_determinism(duel, &inputs));
        }

        #[test]
        fn prop_position_strategy_in_bounds(p in arb_position(10, 8)) {
            prop_assert!((0..10).contains(&p.row));
            prop_assert!((0..8).contains(&p.col));
        }
    }
}
