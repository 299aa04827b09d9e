// gomoku_protocol — wire protocol for the gomoku relay.
//
// This crate defines the message vocabulary, framing, and shared value types
// used by the relay coordinator (`gomoku_relay`) and peer clients to
// communicate over TCP. It is shared between both sides and has no
// dependency on the engine or relay crates.
//
// Module overview:
// - `types.rs`:   Shared value types — `StoneColor`, `Position`, `Stone`,
//                 `PeerId`.
// - `message.rs`: The fifteen-kind `Message` enum with typed fields and the
//                 per-kind binary payload codecs.
// - `framing.rs`: 6-byte-header framing over any `Read`/`Write` stream,
//                 including the wire-compatible length-field truncation.
//
// Design decisions:
// - **Hand-packed binary payloads.** The deployed peers speak a fixed byte
//   layout per message kind; each payload is at most a handful of bytes, so
//   the codecs are written out directly rather than generated.
// - **Decode once at the boundary.** `read_frame` yields a fully typed
//   `Message`; nothing downstream re-parses bytes.
// - **No async runtime.** Uses `std::io::Read`/`Write` for framing,
//   compatible with blocking TCP streams and buffered wrappers.

pub mod framing;
pub mod message;
pub mod types;

pub use framing::{Frame, HEADER_LEN, MAX_PAYLOAD, RELAY_SENDER, read_frame, write_frame};
pub use message::{ColorChoice, DecodeError, Message, RowStone, WinningRow};
pub use types::{BOARD_SIZE, PeerId, Position, Stone, StoneColor};
