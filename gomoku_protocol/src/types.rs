// Core value types for the gomoku wire protocol.
//
// These are shared by `message.rs` (payload encoding), the game engine, and
// the relay coordinator. They are wire-level values with fixed byte
// encodings, not engine internals — the engine builds its rules on top of
// them.
//
// Byte encodings (used throughout the protocol):
// - stone color: 0 = none/unassigned, 1 = black, 2 = white
// - board coordinates: 1-based, valid range [1, BOARD_SIZE]
// - peer id: 1 = peer A, 2 = peer B (0 is the relay itself, see `framing.rs`)

use std::fmt;

/// Board side length. Coordinates run 1..=BOARD_SIZE on both axes.
pub const BOARD_SIZE: u8 = 15;

/// The color of a placed stone.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StoneColor {
    Black,
    White,
}

impl StoneColor {
    pub fn opposite(self) -> StoneColor {
        match self {
            StoneColor::Black => StoneColor::White,
            StoneColor::White => StoneColor::Black,
        }
    }

    /// Wire encoding of a possibly-unassigned color.
    pub fn encode(color: Option<StoneColor>) -> u8 {
        match color {
            None => 0,
            Some(StoneColor::Black) => 1,
            Some(StoneColor::White) => 2,
        }
    }

    /// Decode a color byte. `Err` carries the offending byte.
    pub fn decode(byte: u8) -> Result<Option<StoneColor>, u8> {
        match byte {
            0 => Ok(None),
            1 => Ok(Some(StoneColor::Black)),
            2 => Ok(Some(StoneColor::White)),
            other => Err(other),
        }
    }
}

/// A board intersection. Both coordinates are in [1, BOARD_SIZE]; the
/// constructor rejects anything else, so a `Position` is valid by
/// construction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Position {
    i: u8,
    j: u8,
}

impl Position {
    pub fn new(i: u8, j: u8) -> Option<Position> {
        if (1..=BOARD_SIZE).contains(&i) && (1..=BOARD_SIZE).contains(&j) {
            Some(Position { i, j })
        } else {
            None
        }
    }

    pub fn i(self) -> u8 {
        self.i
    }

    pub fn j(self) -> u8 {
        self.j
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.i, self.j)
    }
}

/// A placed stone: a position plus the color it was placed with.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Stone {
    pub position: Position,
    pub color: StoneColor,
}

impl Stone {
    pub fn new(position: Position, color: StoneColor) -> Stone {
        Stone { position, color }
    }
}

/// One of the two connected peers. The relay itself is not a `PeerId`; it
/// uses the reserved sender byte 0 (`framing::RELAY_SENDER`).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PeerId(pub u8);

impl PeerId {
    pub const A: PeerId = PeerId(1);
    pub const B: PeerId = PeerId(2);

    /// The opposite peer.
    pub fn other(self) -> PeerId {
        PeerId(3 - self.0)
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "peer{}", self.0)
    }
}
