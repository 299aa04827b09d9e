// gomoku_relay — the authoritative relay between two gomoku peers.
//
// The relay is more than a message broker: it owns the single game state
// (`gomoku_engine::Board`), validates every move, and broadcasts the
// authoritative results. Peers send intents; only the relay decides.
//
// Module overview:
// - `coordinator.rs`: Coordination state — the board, the two peer write
//                     halves, and the single-outstanding-request consent
//                     gate. The core data structure that `server.rs` drives.
// - `server.rs`:      TCP listener, reader threads (one per peer), and the
//                     main event loop. Uses `std::net` with a
//                     thread-per-reader architecture and an `mpsc` channel
//                     to funnel frames into the single-threaded
//                     `Coordinator`.
// - `client.rs`:      Peer-side TCP client with intent helpers and a
//                     non-blocking `poll()` inbox.
//
// Dependencies: `gomoku_protocol` (shared message types and framing) and
// `gomoku_engine` (board rules). No UI dependency.
//
// The relay can run as a standalone binary (`main.rs`) or be embedded via
// the library API (`start_relay`).

pub mod client;
pub mod coordinator;
pub mod server;

pub use server::start_relay;
