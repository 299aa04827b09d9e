// gomoku_engine — authoritative game state for the gomoku relay.
//
// One module, one type: `board::Board` holds the 15×15 grid, the move
// history/undo stack, the opening color assignment, and incremental
// exact-five win detection. The relay coordinator owns a single `Board` and
// is its only caller; peers never see this crate.
//
// Rule failures are `board::RuleViolation` values, never panics — the
// coordinator logs and ignores them.

pub mod board;

pub use board::{Board, RuleViolation};
