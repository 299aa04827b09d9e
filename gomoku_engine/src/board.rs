// The authoritative board and game-state machine.
//
// `Board` owns everything the relay needs to adjudicate a game: the stone
// grid, the move history (which doubles as the undo stack), the opening
// color assignment, and incremental five-in-a-row detection. All mutation
// happens through methods called from the coordinator's single-threaded
// event loop — no internal locking.
//
// Key invariants:
// - A cell holds the color of the most recent stone placed there, `None`
//   before any placement or after retraction.
// - `history.len()` equals the number of occupied cells.
// - Colors alternate strictly by history parity: even length means the next
//   stone is black.
// - Turn ownership is always derived (from parity and the assigned color),
//   never tracked as separate mutable state.
//
// The grid is stored with a one-cell empty ring on each side ((N+2)² cells)
// so the win scan never needs a bounds branch in its inner loop.

use std::fmt;

use tracing::{debug, trace};

use gomoku_protocol::types::{BOARD_SIZE, Position, Stone, StoneColor};

/// Grid storage side length: the playable board plus the empty ring.
const GRID: usize = BOARD_SIZE as usize + 2;

/// Scan directions: horizontal, diagonal ↘, vertical, diagonal ↗.
const DIRECTIONS: [(i32, i32); 4] = [(1, 0), (1, 1), (0, 1), (-1, 1)];

/// A move or retraction request that breaks the game rules. Recovered
/// locally by the coordinator: the request is ignored, nothing is broadcast.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RuleViolation {
    /// No game is in progress.
    NotStarted,
    /// The coordinates are outside [1, 15].
    OutOfRange,
    /// The cell already holds a stone.
    Occupied,
    /// The history is at or below the retraction floor.
    NothingToRetract,
}

impl fmt::Display for RuleViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            RuleViolation::NotStarted => "game not started",
            RuleViolation::OutOfRange => "position off the board",
            RuleViolation::Occupied => "cell already occupied",
            RuleViolation::NothingToRetract => "nothing to retract",
        };
        f.write_str(text)
    }
}

impl std::error::Error for RuleViolation {}

/// The board, move history, and session state for one game at a time.
pub struct Board {
    cells: [[Option<StoneColor>; GRID]; GRID],
    history: Vec<Stone>,
    player1_color: Option<StoneColor>,
    preset_count: usize,
    started: bool,
    // Memoized result of the last win scan, invalidated on every history
    // change. `row_stones` holds history indices: the five winning stones
    // after a win, or the single most recent move index otherwise.
    row_stale: bool,
    row_stones: Vec<usize>,
}

impl Board {
    pub fn new() -> Board {
        Board {
            cells: [[None; GRID]; GRID],
            history: Vec::new(),
            player1_color: None,
            // 5 is the pre-assignment sentinel: retraction is impossible
            // until colors are chosen, because the opening ritual never
            // leaves more than 5 stones unassigned.
            preset_count: 5,
            started: false,
            row_stale: true,
            row_stones: Vec::new(),
        }
    }

    /// Clear the board and all session state. The game is no longer started.
    pub fn reset(&mut self) {
        self.cells = [[None; GRID]; GRID];
        self.history.clear();
        self.player1_color = None;
        self.preset_count = 5;
        self.started = false;
        self.row_stale = true;
        self.row_stones.clear();
    }

    /// Reset and begin a fresh game.
    pub fn new_game(&mut self) {
        self.reset();
        self.started = true;
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    pub fn is_game_over(&self) -> bool {
        !self.started
    }

    pub fn is_color_chosen(&self) -> bool {
        self.player1_color.is_some()
    }

    pub fn player1_color(&self) -> Option<StoneColor> {
        self.player1_color
    }

    /// The history length at the moment colors were assigned; retraction is
    /// forbidden at or below this.
    pub fn preset_count(&self) -> usize {
        self.preset_count
    }

    pub fn history(&self) -> &[Stone] {
        &self.history
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    pub fn last_stone(&self) -> Option<&Stone> {
        self.history.last()
    }

    pub fn stone_at(&self, index: usize) -> Option<&Stone> {
        self.history.get(index)
    }

    /// The color of the next stone, by history parity.
    pub fn next_color(&self) -> StoneColor {
        if self.history.len() % 2 == 0 {
            StoneColor::Black
        } else {
            StoneColor::White
        }
    }

    /// The player number (1 or 2) whose turn it is. Before colors are
    /// assigned, player 1 owns the first three plies and player 2 the next
    /// two; afterwards ownership is derived purely from color parity.
    pub fn next_player_number(&self) -> u8 {
        match self.player1_color {
            Some(color) => {
                if color == self.next_color() {
                    1
                } else {
                    2
                }
            }
            None => {
                if self.history.len() < 3 {
                    1
                } else {
                    2
                }
            }
        }
    }

    /// Assign player 1's color and freeze the retraction floor at the
    /// current history length. The coordinator only calls this once per
    /// game, at an opening checkpoint.
    pub fn choose_player1_color(&mut self, color: StoneColor) {
        debug_assert!(self.player1_color.is_none());
        self.player1_color = Some(color);
        self.preset_count = self.history.len();
        debug!(?color, preset_count = self.preset_count, "player 1 color assigned");
    }

    /// Place the next stone at (i, j). Returns the placed stone.
    pub fn put_stone(&mut self, i: u8, j: u8) -> Result<Stone, RuleViolation> {
        if !self.started {
            return Err(RuleViolation::NotStarted);
        }
        let position = Position::new(i, j).ok_or(RuleViolation::OutOfRange)?;
        if self.cell_at(position).is_some() {
            return Err(RuleViolation::Occupied);
        }
        let stone = Stone::new(position, self.next_color());
        self.set_cell(position, Some(stone.color));
        self.history.push(stone);
        self.row_stale = true;
        trace!(%position, color = ?stone.color, ply = self.history.len(), "stone placed");
        if self.history.len() == usize::from(BOARD_SIZE) * usize::from(BOARD_SIZE) {
            self.started = false;
        }
        Ok(stone)
    }

    /// Pop and return the most recent stone. Only legal while the game is
    /// in progress and the history is above the retraction floor.
    pub fn retract_stone(&mut self) -> Result<Stone, RuleViolation> {
        if !self.started {
            return Err(RuleViolation::NotStarted);
        }
        if !self.can_retract() {
            return Err(RuleViolation::NothingToRetract);
        }
        // can_retract guarantees the history is non-empty.
        let Some(stone) = self.history.pop() else {
            return Err(RuleViolation::NothingToRetract);
        };
        self.set_cell(stone.position, None);
        self.row_stale = true;
        trace!(position = %stone.position, ply = self.history.len() + 1, "stone retracted");
        Ok(stone)
    }

    pub fn can_retract(&self) -> bool {
        self.started && self.history.len() > self.preset_count
    }

    /// History indices of the stones that decide the game, memoized until
    /// the history changes. After a win this holds the winning stones (in
    /// line order); otherwise the single most recent move index, which the
    /// coordinator uses as the draw signal when the board fills. Empty for
    /// an empty history.
    ///
    /// Recomputing scans outward from the last stone only. A run of exactly
    /// five wins and ends the game; overlines (six or more) do not count.
    pub fn row_stone_indices(&mut self) -> &[usize] {
        if self.row_stale {
            self.recompute_row();
            self.row_stale = false;
        }
        &self.row_stones
    }

    fn recompute_row(&mut self) {
        self.row_stones.clear();
        let Some(&last) = self.history.last() else {
            return;
        };
        let i = i32::from(last.position.i());
        let j = i32::from(last.position.j());
        let color = last.color;
        let mut line: Vec<(i32, i32)> = Vec::new();
        for (di, dj) in DIRECTIONS {
            let mut forward = 0;
            while self.cell(i + (forward + 1) * di, j + (forward + 1) * dj) == Some(color) {
                forward += 1;
            }
            let mut backward = 0;
            while self.cell(i - (backward + 1) * di, j - (backward + 1) * dj) == Some(color) {
                backward += 1;
            }
            if forward + backward + 1 == 5 {
                self.started = false;
                for k in -backward..=forward {
                    line.push((i + k * di, j + k * dj));
                }
            }
        }
        if line.is_empty() {
            self.row_stones.push(self.history.len() - 1);
        } else {
            debug!(color = ?color, stones = line.len(), "winning row found");
            // Map each line cell back to its move index. Lookup is by
            // position only; the cell's color is already known equal.
            for (li, lj) in line {
                if let Some(index) = self.history.iter().position(|s| {
                    i32::from(s.position.i()) == li && i32::from(s.position.j()) == lj
                }) {
                    self.row_stones.push(index);
                }
            }
        }
    }

    fn cell(&self, i: i32, j: i32) -> Option<StoneColor> {
        let (Ok(i), Ok(j)) = (usize::try_from(i), usize::try_from(j)) else {
            return None;
        };
        *self.cells.get(i)?.get(j)?
    }

    fn cell_at(&self, position: Position) -> Option<StoneColor> {
        self.cells[usize::from(position.i())][usize::from(position.j())]
    }

    fn set_cell(&mut self, position: Position, color: Option<StoneColor>) {
        self.cells[usize::from(position.i())][usize::from(position.j())] = color;
    }
}

impl Default for Board {
    fn default() -> Board {
        Board::new()
    }
}
