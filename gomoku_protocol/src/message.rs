// Protocol messages for peer-relay communication.
//
// One enum defines the full protocol vocabulary: fifteen message kinds,
// numbered 0..=14 on the wire (`kind` module). Each variant carries named,
// strongly-typed fields; the byte-level payload layout lives entirely in
// `encode_payload` / `decode`, so the rest of the system never touches raw
// message bytes.
//
// Payload layouts (offsets relative to payload start, one byte each unless
// noted):
// - NEW_GAME:            [player_number]
// - GAME_OVER:           [winner][row_count][row_color][indices × n][i,j × n]
//                        (row_color/indices/positions omitted when n = 0)
// - PUT_STONE / RETRACT_STONE:
//                        [i][j][color][prev_i][prev_j][prev_color][history]
//                        (prev_* all zero when there is no previous stone)
// - INQUIRE_TO_PUT_STONE: [i][j]
// - CHOOSE_PLAYER_COLOR: [option]  (0 take black, 1 take white, 2 defer)
// - SET_PLAYER_COLOR:    [color][preset_count]
// - CHAT_TEXT:           raw UTF-8 bytes
// - everything else:     empty payload

use std::fmt;

use crate::framing::MAX_PAYLOAD;
use crate::types::{Position, Stone, StoneColor};

/// Wire codes for the fifteen message kinds.
pub mod kind {
    pub const NEW_GAME: u8 = 0;
    pub const INQUIRE_TO_NEW_GAME: u8 = 1;
    pub const ACCEPT_TO_NEW_GAME: u8 = 2;
    pub const REJECT_TO_NEW_GAME: u8 = 3;
    pub const GAME_OVER: u8 = 4;
    pub const ADMIT_DEFEAT: u8 = 5;
    pub const PUT_STONE: u8 = 6;
    pub const INQUIRE_TO_PUT_STONE: u8 = 7;
    pub const RETRACT_STONE: u8 = 8;
    pub const INQUIRE_TO_RETRACT_STONE: u8 = 9;
    pub const ACCEPT_TO_RETRACT_STONE: u8 = 10;
    pub const REJECT_TO_RETRACT_STONE: u8 = 11;
    pub const CHOOSE_PLAYER_COLOR: u8 = 12;
    pub const SET_PLAYER_COLOR: u8 = 13;
    pub const CHAT_TEXT: u8 = 14;
}

/// A color-choice response during the opening ritual, relative to the peer
/// making the choice.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ColorChoice {
    TakeBlack,
    TakeWhite,
    Defer,
}

impl ColorChoice {
    fn encode(self) -> u8 {
        match self {
            ColorChoice::TakeBlack => 0,
            ColorChoice::TakeWhite => 1,
            ColorChoice::Defer => 2,
        }
    }

    fn decode(byte: u8) -> Result<ColorChoice, DecodeError> {
        match byte {
            0 => Ok(ColorChoice::TakeBlack),
            1 => Ok(ColorChoice::TakeWhite),
            2 => Ok(ColorChoice::Defer),
            other => Err(DecodeError::BadChoice(other)),
        }
    }
}

/// One stone of a winning row, paired with its move index in the game
/// history.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RowStone {
    pub index: u8,
    pub position: Position,
}

/// The exactly-five stones that ended a game. Never empty; a game-over
/// without a row (draw, forfeit before any row formed) carries `None`
/// instead.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WinningRow {
    pub color: StoneColor,
    pub stones: Vec<RowStone>,
}

/// A protocol message. The frame header (sender byte, length, kind byte)
/// lives in `framing.rs`; this is everything after it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Message {
    /// Relay → both peers: a new game has begun; you are this player number.
    NewGame { player_number: u8 },
    /// Peer → relay: request a new game (relayed to the other peer).
    InquireToNewGame,
    /// Awaited peer → relay: consent to the new game.
    AcceptToNewGame,
    /// Awaited peer → relay: refuse the new game (relayed to the requester).
    RejectToNewGame,
    /// Relay → both peers: the game ended. `winner_number` 0 means a draw.
    GameOver {
        winner_number: u8,
        row: Option<WinningRow>,
    },
    /// Peer → relay: concede the game.
    AdmitDefeat,
    /// Relay → both peers: a stone was placed.
    PutStone {
        stone: Stone,
        previous: Option<Stone>,
        history_size: u8,
    },
    /// Peer → relay: request to place a stone. Coordinates are raw here;
    /// range checking is a game rule, not a framing concern.
    InquireToPutStone { i: u8, j: u8 },
    /// Relay → both peers: a stone was retracted.
    RetractStone {
        stone: Stone,
        previous: Option<Stone>,
        history_size: u8,
    },
    /// Peer → relay: request a retraction (relayed to the other peer).
    InquireToRetractStone,
    /// Awaited peer → relay: consent to the retraction.
    AcceptToRetractStone,
    /// Awaited peer → relay: refuse the retraction (relayed back).
    RejectToRetractStone,
    /// Awaited peer → relay: color choice at an opening checkpoint.
    ChoosePlayerColor { option: ColorChoice },
    /// Relay → one peer: your assigned color (or none, if deferred) and the
    /// retraction floor.
    SetPlayerColor {
        color: Option<StoneColor>,
        preset_count: u8,
    },
    /// Either direction: chat text, relayed verbatim.
    ChatText { text: String },
}

impl Message {
    /// The wire code for this message kind.
    pub fn kind(&self) -> u8 {
        match self {
            Message::NewGame { .. } => kind::NEW_GAME,
            Message::InquireToNewGame => kind::INQUIRE_TO_NEW_GAME,
            Message::AcceptToNewGame => kind::ACCEPT_TO_NEW_GAME,
            Message::RejectToNewGame => kind::REJECT_TO_NEW_GAME,
            Message::GameOver { .. } => kind::GAME_OVER,
            Message::AdmitDefeat => kind::ADMIT_DEFEAT,
            Message::PutStone { .. } => kind::PUT_STONE,
            Message::InquireToPutStone { .. } => kind::INQUIRE_TO_PUT_STONE,
            Message::RetractStone { .. } => kind::RETRACT_STONE,
            Message::InquireToRetractStone => kind::INQUIRE_TO_RETRACT_STONE,
            Message::AcceptToRetractStone => kind::ACCEPT_TO_RETRACT_STONE,
            Message::RejectToRetractStone => kind::REJECT_TO_RETRACT_STONE,
            Message::ChoosePlayerColor { .. } => kind::CHOOSE_PLAYER_COLOR,
            Message::SetPlayerColor { .. } => kind::SET_PLAYER_COLOR,
            Message::ChatText { .. } => kind::CHAT_TEXT,
        }
    }

    /// Encode the payload bytes for this message. Chat text is clipped to
    /// `MAX_PAYLOAD` UTF-8 bytes at a char boundary; every other kind is
    /// far below the cap by construction.
    pub fn encode_payload(&self) -> Vec<u8> {
        match self {
            Message::NewGame { player_number } => vec![*player_number],
            Message::GameOver { winner_number, row } => encode_game_over(*winner_number, row),
            Message::PutStone {
                stone,
                previous,
                history_size,
            }
            | Message::RetractStone {
                stone,
                previous,
                history_size,
            } => encode_stone_move(stone, previous.as_ref(), *history_size),
            Message::InquireToPutStone { i, j } => vec![*i, *j],
            Message::ChoosePlayerColor { option } => vec![option.encode()],
            Message::SetPlayerColor {
                color,
                preset_count,
            } => vec![StoneColor::encode(*color), *preset_count],
            Message::ChatText { text } => {
                let mut end = text.len().min(MAX_PAYLOAD);
                while !text.is_char_boundary(end) {
                    end -= 1;
                }
                text.as_bytes()[..end].to_vec()
            }
            Message::InquireToNewGame
            | Message::AcceptToNewGame
            | Message::RejectToNewGame
            | Message::AdmitDefeat
            | Message::InquireToRetractStone
            | Message::AcceptToRetractStone
            | Message::RejectToRetractStone => Vec::new(),
        }
    }

    /// Decode a message from its kind byte and payload bytes.
    pub fn decode(kind_byte: u8, payload: &[u8]) -> Result<Message, DecodeError> {
        let short = || DecodeError::ShortPayload {
            kind: kind_byte,
            len: payload.len(),
        };
        match kind_byte {
            kind::NEW_GAME => {
                let player_number = *payload.first().ok_or_else(short)?;
                Ok(Message::NewGame { player_number })
            }
            kind::INQUIRE_TO_NEW_GAME => Ok(Message::InquireToNewGame),
            kind::ACCEPT_TO_NEW_GAME => Ok(Message::AcceptToNewGame),
            kind::REJECT_TO_NEW_GAME => Ok(Message::RejectToNewGame),
            kind::GAME_OVER => decode_game_over(payload, short),
            kind::ADMIT_DEFEAT => Ok(Message::AdmitDefeat),
            kind::PUT_STONE => {
                let (stone, previous, history_size) = decode_stone_move(payload, short)?;
                Ok(Message::PutStone {
                    stone,
                    previous,
                    history_size,
                })
            }
            kind::INQUIRE_TO_PUT_STONE => match payload {
                [i, j, ..] => Ok(Message::InquireToPutStone { i: *i, j: *j }),
                _ => Err(short()),
            },
            kind::RETRACT_STONE => {
                let (stone, previous, history_size) = decode_stone_move(payload, short)?;
                Ok(Message::RetractStone {
                    stone,
                    previous,
                    history_size,
                })
            }
            kind::INQUIRE_TO_RETRACT_STONE => Ok(Message::InquireToRetractStone),
            kind::ACCEPT_TO_RETRACT_STONE => Ok(Message::AcceptToRetractStone),
            kind::REJECT_TO_RETRACT_STONE => Ok(Message::RejectToRetractStone),
            kind::CHOOSE_PLAYER_COLOR => {
                let option = ColorChoice::decode(*payload.first().ok_or_else(short)?)?;
                Ok(Message::ChoosePlayerColor { option })
            }
            kind::SET_PLAYER_COLOR => match payload {
                [color, preset_count, ..] => Ok(Message::SetPlayerColor {
                    color: StoneColor::decode(*color).map_err(DecodeError::BadColor)?,
                    preset_count: *preset_count,
                }),
                _ => Err(short()),
            },
            kind::CHAT_TEXT => Ok(Message::ChatText {
                text: String::from_utf8_lossy(payload).into_owned(),
            }),
            other => Err(DecodeError::UnknownKind(other)),
        }
    }
}

fn encode_stone_move(stone: &Stone, previous: Option<&Stone>, history_size: u8) -> Vec<u8> {
    let mut payload = vec![
        stone.position.i(),
        stone.position.j(),
        StoneColor::encode(Some(stone.color)),
        0,
        0,
        0,
        history_size,
    ];
    if let Some(prev) = previous {
        payload[3] = prev.position.i();
        payload[4] = prev.position.j();
        payload[5] = StoneColor::encode(Some(prev.color));
    }
    payload
}

fn decode_stone_move(
    payload: &[u8],
    short: impl Fn() -> DecodeError,
) -> Result<(Stone, Option<Stone>, u8), DecodeError> {
    let [i, j, color, prev_i, prev_j, prev_color, history_size, ..] = *payload else {
        return Err(short());
    };
    let stone = decode_stone(i, j, color)?;
    // All-zero previous-stone fields mean there was no previous stone.
    let previous = if prev_i == 0 && prev_j == 0 && prev_color == 0 {
        None
    } else {
        Some(decode_stone(prev_i, prev_j, prev_color)?)
    };
    Ok((stone, previous, history_size))
}

fn decode_stone(i: u8, j: u8, color: u8) -> Result<Stone, DecodeError> {
    let position = Position::new(i, j).ok_or(DecodeError::BadPosition { i, j })?;
    let color = StoneColor::decode(color)
        .map_err(DecodeError::BadColor)?
        .ok_or(DecodeError::BadColor(0))?;
    Ok(Stone::new(position, color))
}

fn encode_game_over(winner_number: u8, row: &Option<WinningRow>) -> Vec<u8> {
    let Some(row) = row else {
        return vec![winner_number, 0];
    };
    #[expect(clippy::cast_possible_truncation)]
    let count = row.stones.len() as u8;
    let mut payload = vec![winner_number, count, StoneColor::encode(Some(row.color))];
    for stone in &row.stones {
        payload.push(stone.index);
    }
    for stone in &row.stones {
        payload.push(stone.position.i());
        payload.push(stone.position.j());
    }
    payload
}

fn decode_game_over(
    payload: &[u8],
    short: impl Fn() -> DecodeError,
) -> Result<Message, DecodeError> {
    let [winner_number, count, ..] = *payload else {
        return Err(short());
    };
    if count == 0 {
        return Ok(Message::GameOver {
            winner_number,
            row: None,
        });
    }
    let n = count as usize;
    let body = payload.get(2..3 + 3 * n).ok_or_else(short)?;
    let color = StoneColor::decode(body[0])
        .map_err(DecodeError::BadColor)?
        .ok_or(DecodeError::BadColor(0))?;
    let mut stones = Vec::with_capacity(n);
    for k in 0..n {
        let index = body[1 + k];
        let i = body[1 + n + 2 * k];
        let j = body[1 + n + 2 * k + 1];
        let position = Position::new(i, j).ok_or(DecodeError::BadPosition { i, j })?;
        stones.push(RowStone { index, position });
    }
    Ok(Message::GameOver {
        winner_number,
        row: Some(WinningRow { color, stones }),
    })
}

/// A payload that could not be decoded into a `Message`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DecodeError {
    UnknownKind(u8),
    ShortPayload { kind: u8, len: usize },
    BadColor(u8),
    BadPosition { i: u8, j: u8 },
    BadChoice(u8),
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeError::UnknownKind(k) => write!(f, "unknown message kind {k}"),
            DecodeError::ShortPayload { kind, len } => {
                write!(f, "payload too short for kind {kind}: {len} bytes")
            }
            DecodeError::BadColor(b) => write!(f, "invalid color byte {b}"),
            DecodeError::BadPosition { i, j } => write!(f, "position ({i}, {j}) off the board"),
            DecodeError::BadChoice(b) => write!(f, "invalid color-choice byte {b}"),
        }
    }
}

impl std::error::Error for DecodeError {}

#[cfg(test)]
mod tests {
    use super::*;

    fn pos(i: u8, j: u8) -> Position {
        Position::new(i, j).unwrap()
    }

    #[test]
    fn put_stone_layout() {
        let msg = Message::PutStone {
            stone: Stone::new(pos(8, 9), StoneColor::White),
            previous: Some(Stone::new(pos(8, 8), StoneColor::Black)),
            history_size: 2,
        };
        assert_eq!(msg.kind(), kind::PUT_STONE);
        assert_eq!(msg.encode_payload(), vec![8, 9, 2, 8, 8, 1, 2]);
    }

    #[test]
    fn put_stone_without_previous() {
        let msg = Message::PutStone {
            stone: Stone::new(pos(8, 8), StoneColor::Black),
            previous: None,
            history_size: 1,
        };
        let payload = msg.encode_payload();
        assert_eq!(payload, vec![8, 8, 1, 0, 0, 0, 1]);
        let decoded = Message::decode(kind::PUT_STONE, &payload).unwrap();
        assert_eq!(decoded, msg);
    }

    #[test]
    fn retract_stone_reuses_move_layout() {
        let msg = Message::RetractStone {
            stone: Stone::new(pos(3, 4), StoneColor::White),
            previous: Some(Stone::new(pos(2, 2), StoneColor::Black)),
            history_size: 4,
        };
        let payload = msg.encode_payload();
        assert_eq!(payload, vec![3, 4, 2, 2, 2, 1, 4]);
        assert_eq!(Message::decode(kind::RETRACT_STONE, &payload).unwrap(), msg);
    }

    #[test]
    fn game_over_with_row_layout() {
        let stones: Vec<RowStone> = (0..5)
            .map(|k| RowStone {
                index: 2 * k,
                position: pos(8, 8 + k),
            })
            .collect();
        let msg = Message::GameOver {
            winner_number: 1,
            row: Some(WinningRow {
                color: StoneColor::Black,
                stones,
            }),
        };
        let payload = msg.encode_payload();
        assert_eq!(&payload[..3], &[1, 5, 1]);
        assert_eq!(&payload[3..8], &[0, 2, 4, 6, 8]);
        assert_eq!(&payload[8..10], &[8, 8]);
        assert_eq!(&payload[16..18], &[8, 12]);
        assert_eq!(Message::decode(kind::GAME_OVER, &payload).unwrap(), msg);
    }

    #[test]
    fn game_over_draw_has_no_row() {
        let msg = Message::GameOver {
            winner_number: 0,
            row: None,
        };
        let payload = msg.encode_payload();
        assert_eq!(payload, vec![0, 0]);
        assert_eq!(Message::decode(kind::GAME_OVER, &payload).unwrap(), msg);
    }

    #[test]
    fn set_player_color_layout() {
        let msg = Message::SetPlayerColor {
            color: Some(StoneColor::White),
            preset_count: 3,
        };
        assert_eq!(msg.encode_payload(), vec![2, 3]);
        let unassigned = Message::SetPlayerColor {
            color: None,
            preset_count: 5,
        };
        assert_eq!(unassigned.encode_payload(), vec![0, 5]);
    }

    #[test]
    fn choose_color_bytes() {
        for (option, byte) in [
            (ColorChoice::TakeBlack, 0),
            (ColorChoice::TakeWhite, 1),
            (ColorChoice::Defer, 2),
        ] {
            let msg = Message::ChoosePlayerColor { option };
            assert_eq!(msg.encode_payload(), vec![byte]);
            assert_eq!(
                Message::decode(kind::CHOOSE_PLAYER_COLOR, &[byte]).unwrap(),
                msg
            );
        }
        assert_eq!(
            Message::decode(kind::CHOOSE_PLAYER_COLOR, &[7]),
            Err(DecodeError::BadChoice(7))
        );
    }

    #[test]
    fn chat_text_is_raw_utf8() {
        let msg = Message::ChatText {
            text: "你好, relay".into(),
        };
        let payload = msg.encode_payload();
        assert_eq!(payload, "你好, relay".as_bytes());
        assert_eq!(Message::decode(kind::CHAT_TEXT, &payload).unwrap(), msg);
    }

    #[test]
    fn chat_text_clipped_at_char_boundary() {
        // 86 three-byte chars = 258 bytes; clipping must not split a char.
        let text = "好".repeat(86);
        let msg = Message::ChatText { text };
        let payload = msg.encode_payload();
        assert_eq!(payload.len(), 255);
        assert!(std::str::from_utf8(&payload).is_ok());
    }

    #[test]
    fn empty_payload_kinds() {
        for k in [
            kind::INQUIRE_TO_NEW_GAME,
            kind::ACCEPT_TO_NEW_GAME,
            kind::REJECT_TO_NEW_GAME,
            kind::ADMIT_DEFEAT,
            kind::INQUIRE_TO_RETRACT_STONE,
            kind::ACCEPT_TO_RETRACT_STONE,
            kind::REJECT_TO_RETRACT_STONE,
        ] {
            let msg = Message::decode(k, &[]).unwrap();
            assert_eq!(msg.kind(), k);
            assert!(msg.encode_payload().is_empty());
        }
    }

    #[test]
    fn unknown_kind_rejected() {
        assert_eq!(Message::decode(15, &[]), Err(DecodeError::UnknownKind(15)));
    }

    #[test]
    fn short_payload_rejected() {
        assert!(matches!(
            Message::decode(kind::PUT_STONE, &[8, 8, 1]),
            Err(DecodeError::ShortPayload { .. })
        ));
        assert!(matches!(
            Message::decode(kind::NEW_GAME, &[]),
            Err(DecodeError::ShortPayload { .. })
        ));
    }

    #[test]
    fn zero_color_rejected_for_placed_stone() {
        assert_eq!(
            Message::decode(kind::PUT_STONE, &[8, 8, 0, 0, 0, 0, 1]),
            Err(DecodeError::BadColor(0))
        );
    }
}
