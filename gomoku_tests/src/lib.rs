// Test-only peer for relay integration tests.
//
// Wraps the real `NetClient` (from `gomoku_relay::client`) to provide a
// synchronous, test-friendly API for exercising the full pipeline:
// connect → request → relay validates → broadcast → verify.
//
// The only test-specific code here is the synchronous polling wrappers
// around `NetClient::poll()`. `poll()` drains the whole inbox at once, so
// the wrappers queue every drained message and hand them out one at a time;
// a broadcast pair like `PutStone` + `GameOver` arriving in one batch must
// survive until both are consumed. All networking uses the same code paths
// as a real peer.
//
// See also: `tests/full_game.rs` for the integration test scenarios.

use std::collections::VecDeque;
use std::thread;
use std::time::{Duration, Instant};

use gomoku_protocol::message::{ColorChoice, Message};
use gomoku_protocol::types::PeerId;
use gomoku_relay::client::NetClient;

/// Default timeout for blocking poll operations.
const POLL_TIMEOUT: Duration = Duration::from_secs(5);

/// Sleep duration between poll attempts.
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// A test peer wrapping a real NetClient.
pub struct TestPeer {
    client: NetClient,
    /// Messages drained from the client but not yet handed to the test.
    pending: VecDeque<Message>,
}

impl TestPeer {
    /// Connect to a relay server.
    pub fn connect(addr: std::net::SocketAddr, peer_id: PeerId) -> Self {
        let addr_str = addr.to_string();
        let client = NetClient::connect(&addr_str, peer_id).expect("TestPeer::connect failed");
        Self {
            client,
            pending: VecDeque::new(),
        }
    }

    pub fn request_new_game(&mut self) {
        self.client.request_new_game().expect("request_new_game failed");
    }

    pub fn respond_new_game(&mut self, accept: bool) {
        self.client
            .respond_new_game(accept)
            .expect("respond_new_game failed");
    }

    pub fn request_put_stone(&mut self, i: u8, j: u8) {
        self.client
            .request_put_stone(i, j)
            .expect("request_put_stone failed");
    }

    pub fn request_retract_stone(&mut self) {
        self.client
            .request_retract_stone()
            .expect("request_retract_stone failed");
    }

    pub fn respond_retract_stone(&mut self, accept: bool) {
        self.client
            .respond_retract_stone(accept)
            .expect("respond_retract_stone failed");
    }

    pub fn choose_color(&mut self, option: ColorChoice) {
        self.client.choose_color(option).expect("choose_color failed");
    }

    pub fn admit_defeat(&mut self) {
        self.client.admit_defeat().expect("admit_defeat failed");
    }

    pub fn send_chat(&mut self, text: &str) {
        self.client.send_chat(text).expect("send_chat failed");
    }

    /// Shut the connection down.
    pub fn disconnect(&mut self) {
        self.client.disconnect();
    }

    /// Blocking poll until the next relay message arrives. Messages are
    /// delivered one at a time in arrival order, even when several were
    /// drained in the same poll batch.
    pub fn recv(&mut self) -> Message {
        let start = Instant::now();
        loop {
            if let Some(msg) = self.pending.pop_front() {
                return msg;
            }
            assert!(
                start.elapsed() < POLL_TIMEOUT,
                "timed out waiting for a relay message"
            );
            self.pending.extend(self.client.poll());
            if self.pending.is_empty() {
                thread::sleep(POLL_INTERVAL);
            }
        }
    }

    /// Blocking poll until a message of the given kind arrives. Earlier
    /// messages of other kinds are discarded one at a time; anything after
    /// the match stays queued for later `recv` calls.
    pub fn recv_of_kind(&mut self, kind: u8) -> Message {
        let start = Instant::now();
        loop {
            if let Some(msg) = self.pending.pop_front() {
                if msg.kind() == kind {
                    return msg;
                }
                continue;
            }
            assert!(
                start.elapsed() < POLL_TIMEOUT,
                "timed out waiting for message kind {kind}"
            );
            self.pending.extend(self.client.poll());
            if self.pending.is_empty() {
                thread::sleep(POLL_INTERVAL);
            }
        }
    }

    /// Assert that no message arrives within the given window.
    pub fn expect_silence(&mut self, window: Duration) {
        let start = Instant::now();
        while start.elapsed() < window {
            self.pending.extend(self.client.poll());
            assert!(
                self.pending.is_empty(),
                "unexpected messages: {:?}",
                self.pending
            );
            thread::sleep(POLL_INTERVAL);
        }
    }

    /// Non-blocking: drain all pending relay messages.
    pub fn drain(&mut self) -> Vec<Message> {
        self.pending.extend(self.client.poll());
        self.pending.drain(..).collect()
    }
}
