// Coordination state machine for the relay.
//
// `Coordinator` is the central data structure that `server.rs` drives. It
// owns the single `Board` instance, the two peer write halves, and the
// single-outstanding-request gate used for consensus commands (new game,
// retraction, color choice). All mutation happens through methods called
// from the server's single-threaded event loop — no internal locking, and
// peer reader threads never touch this state.
//
// Key responsibilities:
// - Gate discipline: while one peer's response is awaited, frames from the
//   other peer are dropped (not queued). Chat is the one exception: it is
//   relayed in any state and neither checks nor clears the gate.
// - Move validation: turn ownership is checked against the board before a
//   move is applied; rule violations are logged and ignored, never
//   surfaced to the other peer.
// - Broadcasting: authoritative `PutStone`/`RetractStone`/`NewGame`/
//   `GameOver`/`SetPlayerColor` frames go out to one or both peers.
//
// Writing to peer streams: cloned `TcpStream` write halves wrapped in
// `BufWriter`. Sends are best-effort — a write error is logged and dropped;
// the reader thread for that peer will detect the broken pipe and deliver a
// disconnect event.

use std::collections::BTreeMap;
use std::io::BufWriter;
use std::net::TcpStream;

use tracing::{debug, info, trace, warn};

use gomoku_engine::Board;
use gomoku_protocol::framing::{RELAY_SENDER, write_frame};
use gomoku_protocol::message::{ColorChoice, Message, RowStone, WinningRow};
use gomoku_protocol::types::{PeerId, StoneColor};

/// Relay coordinator managing a single two-player game.
pub struct Coordinator {
    board: Board,
    peers: BTreeMap<PeerId, BufWriter<TcpStream>>,
    /// The peer whose response to a consensus command is awaited, if any.
    waiting_for: Option<PeerId>,
    /// Which peer holds player number 1 (the new-game requester).
    player1_peer: Option<PeerId>,
}

impl Coordinator {
    pub fn new() -> Coordinator {
        Coordinator {
            board: Board::new(),
            peers: BTreeMap::new(),
            waiting_for: None,
            player1_peer: None,
        }
    }

    /// Register a peer's write half.
    pub fn add_peer(&mut self, peer: PeerId, stream: TcpStream) {
        info!(%peer, "peer connected");
        self.peers.insert(peer, BufWriter::new(stream));
    }

    pub fn peer_count(&self) -> usize {
        self.peers.len()
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn waiting_for(&self) -> Option<PeerId> {
        self.waiting_for
    }

    /// A peer's connection is gone. Mid-game this is an implicit defeat:
    /// the surviving peer wins and the board is reset.
    pub fn handle_disconnect(&mut self, peer: PeerId) {
        self.peers.remove(&peer);
        self.waiting_for = None;
        if self.board.is_started() {
            info!(%peer, "peer disconnected mid-game, forfeiting");
            let winner_number = self.player_number_of(peer.other());
            let row = self.winning_row();
            self.broadcast(&Message::GameOver { winner_number, row });
            self.board.reset();
        } else {
            info!(%peer, "peer disconnected");
        }
    }

    /// Apply one inbound message. This is the single serialization point:
    /// the server's event loop calls it for every decoded frame, in arrival
    /// order.
    pub fn handle_message(&mut self, from: PeerId, message: Message) {
        trace!(%from, kind = message.kind(), ?message, "frame received");

        // Chat bypasses the response gate entirely: it is relayed in any
        // state and leaves a pending consensus request pending.
        if let Message::ChatText { text } = message {
            self.send_to(from.other(), &Message::ChatText { text });
            return;
        }

        if let Some(awaited) = self.waiting_for {
            if from != awaited {
                debug!(%from, %awaited, kind = message.kind(), "dropped while awaiting response");
                return;
            }
            self.waiting_for = None;
        }

        match message {
            Message::InquireToNewGame => {
                self.waiting_for = Some(from.other());
                self.send_to(from.other(), &Message::InquireToNewGame);
            }
            Message::AcceptToNewGame => self.handle_accept_new_game(from),
            Message::RejectToNewGame => {
                self.send_to(from.other(), &Message::RejectToNewGame);
            }
            Message::AdmitDefeat => self.handle_admit_defeat(from),
            Message::InquireToPutStone { i, j } => self.handle_inquire_put_stone(from, i, j),
            Message::InquireToRetractStone => {
                self.waiting_for = Some(from.other());
                self.send_to(from.other(), &Message::InquireToRetractStone);
            }
            Message::AcceptToRetractStone => self.handle_accept_retract(),
            Message::RejectToRetractStone => {
                self.send_to(from.other(), &Message::RejectToRetractStone);
            }
            Message::ChoosePlayerColor { option } => self.handle_choose_color(from, option),
            // Relay-originated kinds have no meaning inbound.
            other => debug!(%from, kind = other.kind(), "ignored relay-only message"),
        }
    }

    /// The awaited peer consented: start the game. The original requester
    /// becomes player 1, the consenting peer player 2.
    fn handle_accept_new_game(&mut self, from: PeerId) {
        self.board.new_game();
        self.player1_peer = Some(from.other());
        info!(player1 = %from.other(), player2 = %from, "new game started");
        self.send_to(from.other(), &Message::NewGame { player_number: 1 });
        self.send_to(from, &Message::NewGame { player_number: 2 });
    }

    fn handle_admit_defeat(&mut self, from: PeerId) {
        let winner_number = self.player_number_of(from.other());
        info!(%from, winner_number, "defeat admitted");
        let row = self.winning_row();
        self.broadcast(&Message::GameOver { winner_number, row });
        self.board.reset();
    }

    fn handle_inquire_put_stone(&mut self, from: PeerId, i: u8, j: u8) {
        if self.player_number_of(from) != self.board.next_player_number() {
            debug!(%from, "move request out of turn");
            return;
        }
        let previous = self.board.last_stone().copied();
        let stone = match self.board.put_stone(i, j) {
            Ok(stone) => stone,
            Err(violation) => {
                debug!(%from, i, j, %violation, "move rejected");
                return;
            }
        };
        let history_size = self.history_size();
        self.broadcast(&Message::PutStone {
            stone,
            previous,
            history_size,
        });

        let plies = self.board.history_len();
        if !self.board.is_color_chosen() && (plies == 3 || plies == 5) {
            // Opening checkpoint: the other peer must now choose a color
            // (or, at ply 3, defer). No extra prompt frame is sent; peers
            // recognize the checkpoint from the move broadcast.
            self.waiting_for = Some(from.other());
            debug!(awaited = %from.other(), plies, "awaiting color choice");
        } else {
            // A row cannot form before colors are chosen, so the scan only
            // runs on this branch.
            let row = self.winning_row();
            if self.board.is_game_over() {
                let winner_number = if row.is_some() {
                    // The winner is whoever just moved.
                    3 - self.board.next_player_number()
                } else {
                    0
                };
                info!(winner_number, "game over");
                self.broadcast(&Message::GameOver { winner_number, row });
            }
        }
    }

    fn handle_accept_retract(&mut self) {
        match self.board.retract_stone() {
            Ok(stone) => {
                let previous = self.board.last_stone().copied();
                let history_size = self.history_size();
                self.broadcast(&Message::RetractStone {
                    stone,
                    previous,
                    history_size,
                });
            }
            Err(violation) => debug!(%violation, "retraction rejected"),
        }
    }

    fn handle_choose_color(&mut self, from: PeerId, option: ColorChoice) {
        let plies = self.board.history_len();
        if !self.board.is_color_chosen() {
            if plies == 3 {
                match option {
                    ColorChoice::TakeBlack => self.assign_chooser_color(from, StoneColor::Black),
                    ColorChoice::TakeWhite => self.assign_chooser_color(from, StoneColor::White),
                    ColorChoice::Defer => {}
                }
            } else if plies == 5 {
                // Defer is not available at the final checkpoint; anything
                // but an explicit black pick resolves to white.
                let color = if option == ColorChoice::TakeBlack {
                    StoneColor::Black
                } else {
                    StoneColor::White
                };
                self.assign_chooser_color(from, color);
            }
        }

        if let Some(player1_color) = self.board.player1_color() {
            #[expect(clippy::cast_possible_truncation)]
            let preset_count = self.board.preset_count() as u8;
            self.send_to_player(
                1,
                &Message::SetPlayerColor {
                    color: Some(player1_color),
                    preset_count,
                },
            );
            self.send_to_player(
                2,
                &Message::SetPlayerColor {
                    color: Some(player1_color.opposite()),
                    preset_count,
                },
            );
        } else {
            // Deferred: both peers learn that colors remain open.
            self.broadcast(&Message::SetPlayerColor {
                color: None,
                preset_count: 5,
            });
        }
    }

    /// Assign colors given the choosing peer's pick for itself.
    fn assign_chooser_color(&mut self, chooser: PeerId, color: StoneColor) {
        let player1_color = if self.player_number_of(chooser) == 1 {
            color
        } else {
            color.opposite()
        };
        self.board.choose_player1_color(player1_color);
    }

    /// The winning row, if the board's latest scan found one. Also the
    /// point where the scan actually runs (it is memoized in the board).
    fn winning_row(&mut self) -> Option<WinningRow> {
        let indices = self.board.row_stone_indices().to_vec();
        if indices.len() < 5 {
            return None;
        }
        let mut color = None;
        let mut stones = Vec::with_capacity(indices.len());
        for index in indices {
            if let Some(stone) = self.board.stone_at(index) {
                color.get_or_insert(stone.color);
                #[expect(clippy::cast_possible_truncation)]
                stones.push(RowStone {
                    index: index as u8,
                    position: stone.position,
                });
            }
        }
        color.map(|color| WinningRow { color, stones })
    }

    fn player_number_of(&self, peer: PeerId) -> u8 {
        // Before any game is agreed, the first peer is treated as player 1.
        let player1 = self.player1_peer.unwrap_or(PeerId::A);
        if peer == player1 { 1 } else { 2 }
    }

    fn send_to_player(&mut self, player_number: u8, message: &Message) {
        let player1 = self.player1_peer.unwrap_or(PeerId::A);
        let peer = if player_number == 1 {
            player1
        } else {
            player1.other()
        };
        self.send_to(peer, message);
    }

    #[expect(clippy::cast_possible_truncation)]
    fn history_size(&self) -> u8 {
        self.board.history_len() as u8
    }

    /// Send a message to one peer. Write errors are logged and dropped;
    /// the reader thread will detect a broken pipe.
    fn send_to(&mut self, peer: PeerId, message: &Message) {
        if let Some(writer) = self.peers.get_mut(&peer) {
            if let Err(error) = write_frame(writer, RELAY_SENDER, message) {
                warn!(%peer, %error, "send failed");
            }
        }
    }

    /// Send a message to both peers.
    fn broadcast(&mut self, message: &Message) {
        for peer in [PeerId::A, PeerId::B] {
            self.send_to(peer, message);
        }
    }
}

impl Default for Coordinator {
    fn default() -> Coordinator {
        Coordinator::new()
    }
}

#[cfg(test)]
mod tests {
    use std::io::BufReader;
    use std::net::TcpListener;

    use gomoku_protocol::framing::read_frame;
    use gomoku_protocol::types::{Position, Stone};

    use super::*;

    /// Create a TCP pair: (client_stream, server_stream) on localhost.
    fn tcp_pair() -> (TcpStream, TcpStream) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let client = TcpStream::connect(addr).unwrap();
        let (server, _) = listener.accept().unwrap();
        (client, server)
    }

    /// A coordinator with both peers attached, plus the peer-side readers.
    fn rig() -> (Coordinator, BufReader<TcpStream>, BufReader<TcpStream>) {
        let (client_a, server_a) = tcp_pair();
        let (client_b, server_b) = tcp_pair();
        let mut coordinator = Coordinator::new();
        coordinator.add_peer(PeerId::A, server_a);
        coordinator.add_peer(PeerId::B, server_b);
        (
            coordinator,
            BufReader::new(client_a),
            BufReader::new(client_b),
        )
    }

    /// Read one relay frame from a peer-side reader.
    fn recv(reader: &mut BufReader<TcpStream>) -> Message {
        let frame = read_frame(reader).unwrap();
        assert_eq!(frame.sender, RELAY_SENDER);
        frame.message
    }

    /// Drive a fresh game: A inquires, B accepts, both drain their NewGame.
    fn start_game(
        coordinator: &mut Coordinator,
        reader_a: &mut BufReader<TcpStream>,
        reader_b: &mut BufReader<TcpStream>,
    ) {
        coordinator.handle_message(PeerId::A, Message::InquireToNewGame);
        assert_eq!(recv(reader_b), Message::InquireToNewGame);
        coordinator.handle_message(PeerId::B, Message::AcceptToNewGame);
        assert_eq!(recv(reader_a), Message::NewGame { player_number: 1 });
        assert_eq!(recv(reader_b), Message::NewGame { player_number: 2 });
    }

    /// Play the three-ply opening and have B take white (A becomes black).
    fn open_with_black_a(
        coordinator: &mut Coordinator,
        reader_a: &mut BufReader<TcpStream>,
        reader_b: &mut BufReader<TcpStream>,
    ) {
        for (i, j) in [(8, 8), (8, 9), (7, 8)] {
            coordinator.handle_message(PeerId::A, Message::InquireToPutStone { i, j });
            recv(reader_a);
            recv(reader_b);
        }
        coordinator.handle_message(
            PeerId::B,
            Message::ChoosePlayerColor {
                option: ColorChoice::TakeWhite,
            },
        );
        assert_eq!(
            recv(reader_a),
            Message::SetPlayerColor {
                color: Some(StoneColor::Black),
                preset_count: 3,
            }
        );
        assert_eq!(
            recv(reader_b),
            Message::SetPlayerColor {
                color: Some(StoneColor::White),
                preset_count: 3,
            }
        );
    }

    #[test]
    fn new_game_requires_consent() {
        let (mut coordinator, mut reader_a, mut reader_b) = rig();

        coordinator.handle_message(PeerId::A, Message::InquireToNewGame);
        assert_eq!(coordinator.waiting_for(), Some(PeerId::B));
        assert_eq!(recv(&mut reader_b), Message::InquireToNewGame);
        assert!(!coordinator.board().is_started());

        coordinator.handle_message(PeerId::B, Message::AcceptToNewGame);
        assert!(coordinator.board().is_started());
        assert_eq!(coordinator.waiting_for(), None);
        assert_eq!(recv(&mut reader_a), Message::NewGame { player_number: 1 });
        assert_eq!(recv(&mut reader_b), Message::NewGame { player_number: 2 });
    }

    #[test]
    fn rejected_new_game_relays_and_stays_idle() {
        let (mut coordinator, mut reader_a, mut reader_b) = rig();

        coordinator.handle_message(PeerId::A, Message::InquireToNewGame);
        assert_eq!(recv(&mut reader_b), Message::InquireToNewGame);
        coordinator.handle_message(PeerId::B, Message::RejectToNewGame);
        assert_eq!(recv(&mut reader_a), Message::RejectToNewGame);
        assert!(!coordinator.board().is_started());
        assert_eq!(coordinator.waiting_for(), None);
    }

    #[test]
    fn gate_drops_frames_from_other_peer() {
        let (mut coordinator, mut reader_a, mut reader_b) = rig();

        coordinator.handle_message(PeerId::A, Message::InquireToNewGame);
        assert_eq!(recv(&mut reader_b), Message::InquireToNewGame);

        // A's move attempt while B's answer is pending is discarded.
        coordinator.handle_message(PeerId::A, Message::InquireToPutStone { i: 8, j: 8 });
        assert_eq!(coordinator.waiting_for(), Some(PeerId::B));
        assert!(coordinator.board().history().is_empty());

        coordinator.handle_message(PeerId::B, Message::AcceptToNewGame);
        assert_eq!(recv(&mut reader_a), Message::NewGame { player_number: 1 });
    }

    #[test]
    fn chat_bypasses_gate_and_leaves_it_pending() {
        let (mut coordinator, _reader_a, mut reader_b) = rig();

        coordinator.handle_message(PeerId::A, Message::InquireToNewGame);
        assert_eq!(recv(&mut reader_b), Message::InquireToNewGame);

        coordinator.handle_message(
            PeerId::A,
            Message::ChatText {
                text: "ready?".into(),
            },
        );
        assert_eq!(
            recv(&mut reader_b),
            Message::ChatText {
                text: "ready?".into(),
            }
        );
        // Chat did not clear the gate.
        assert_eq!(coordinator.waiting_for(), Some(PeerId::B));
    }

    #[test]
    fn chat_from_awaited_peer_keeps_gate() {
        let (mut coordinator, mut reader_a, mut reader_b) = rig();

        coordinator.handle_message(PeerId::A, Message::InquireToNewGame);
        assert_eq!(recv(&mut reader_b), Message::InquireToNewGame);

        coordinator.handle_message(PeerId::B, Message::ChatText { text: "hm".into() });
        assert_eq!(recv(&mut reader_a), Message::ChatText { text: "hm".into() });
        assert_eq!(coordinator.waiting_for(), Some(PeerId::B));
    }

    #[test]
    fn moves_broadcast_with_previous_stone() {
        let (mut coordinator, mut reader_a, mut reader_b) = rig();
        start_game(&mut coordinator, &mut reader_a, &mut reader_b);

        coordinator.handle_message(PeerId::A, Message::InquireToPutStone { i: 8, j: 8 });
        let expected = Message::PutStone {
            stone: Stone::new(Position::new(8, 8).unwrap(), StoneColor::Black),
            previous: None,
            history_size: 1,
        };
        assert_eq!(recv(&mut reader_a), expected);
        assert_eq!(recv(&mut reader_b), expected);

        coordinator.handle_message(PeerId::A, Message::InquireToPutStone { i: 8, j: 9 });
        let expected = Message::PutStone {
            stone: Stone::new(Position::new(8, 9).unwrap(), StoneColor::White),
            previous: Some(Stone::new(Position::new(8, 8).unwrap(), StoneColor::Black)),
            history_size: 2,
        };
        assert_eq!(recv(&mut reader_a), expected);
        assert_eq!(recv(&mut reader_b), expected);
    }

    #[test]
    fn out_of_turn_moves_ignored() {
        let (mut coordinator, mut reader_a, mut reader_b) = rig();
        start_game(&mut coordinator, &mut reader_a, &mut reader_b);

        // Player 1 owns the opening; B's request must not move the board.
        coordinator.handle_message(PeerId::B, Message::InquireToPutStone { i: 8, j: 8 });
        assert!(coordinator.board().history().is_empty());
    }

    #[test]
    fn illegal_move_is_ignored_silently() {
        let (mut coordinator, mut reader_a, mut reader_b) = rig();
        start_game(&mut coordinator, &mut reader_a, &mut reader_b);

        coordinator.handle_message(PeerId::A, Message::InquireToPutStone { i: 8, j: 8 });
        recv(&mut reader_a);
        recv(&mut reader_b);

        // Same cell again: occupied, dropped without a broadcast.
        coordinator.handle_message(PeerId::A, Message::InquireToPutStone { i: 8, j: 8 });
        assert_eq!(coordinator.board().history_len(), 1);
        // Off the board: dropped too.
        coordinator.handle_message(PeerId::A, Message::InquireToPutStone { i: 0, j: 9 });
        assert_eq!(coordinator.board().history_len(), 1);
    }

    #[test]
    fn third_ply_opens_color_checkpoint() {
        let (mut coordinator, mut reader_a, mut reader_b) = rig();
        start_game(&mut coordinator, &mut reader_a, &mut reader_b);

        for (i, j) in [(8, 8), (8, 9), (7, 8)] {
            coordinator.handle_message(PeerId::A, Message::InquireToPutStone { i, j });
            recv(&mut reader_a);
            recv(&mut reader_b);
        }
        assert_eq!(coordinator.waiting_for(), Some(PeerId::B));
        assert!(!coordinator.board().is_color_chosen());

        // A's further traffic is gated until B chooses.
        coordinator.handle_message(PeerId::A, Message::InquireToPutStone { i: 9, j: 9 });
        assert_eq!(coordinator.board().history_len(), 3);
    }

    #[test]
    fn color_choice_assigns_both_sides() {
        let (mut coordinator, mut reader_a, mut reader_b) = rig();
        start_game(&mut coordinator, &mut reader_a, &mut reader_b);
        open_with_black_a(&mut coordinator, &mut reader_a, &mut reader_b);

        assert_eq!(
            coordinator.board().player1_color(),
            Some(StoneColor::Black)
        );
        assert_eq!(coordinator.board().preset_count(), 3);
        assert_eq!(coordinator.waiting_for(), None);
    }

    #[test]
    fn deferred_choice_reaches_second_checkpoint() {
        let (mut coordinator, mut reader_a, mut reader_b) = rig();
        start_game(&mut coordinator, &mut reader_a, &mut reader_b);

        for (i, j) in [(8, 8), (8, 9), (7, 8)] {
            coordinator.handle_message(PeerId::A, Message::InquireToPutStone { i, j });
            recv(&mut reader_a);
            recv(&mut reader_b);
        }
        coordinator.handle_message(
            PeerId::B,
            Message::ChoosePlayerColor {
                option: ColorChoice::Defer,
            },
        );
        let unassigned = Message::SetPlayerColor {
            color: None,
            preset_count: 5,
        };
        assert_eq!(recv(&mut reader_a), unassigned);
        assert_eq!(recv(&mut reader_b), unassigned);

        // Player 2 places plies 4 and 5; the fifth reopens the checkpoint,
        // this time awaiting player 1.
        for (i, j) in [(9, 9), (10, 10)] {
            coordinator.handle_message(PeerId::B, Message::InquireToPutStone { i, j });
            recv(&mut reader_a);
            recv(&mut reader_b);
        }
        assert_eq!(coordinator.waiting_for(), Some(PeerId::A));

        coordinator.handle_message(
            PeerId::A,
            Message::ChoosePlayerColor {
                option: ColorChoice::TakeBlack,
            },
        );
        assert_eq!(
            recv(&mut reader_a),
            Message::SetPlayerColor {
                color: Some(StoneColor::Black),
                preset_count: 5,
            }
        );
        assert_eq!(
            recv(&mut reader_b),
            Message::SetPlayerColor {
                color: Some(StoneColor::White),
                preset_count: 5,
            }
        );
    }

    #[test]
    fn five_in_a_row_broadcasts_game_over() {
        let (mut coordinator, mut reader_a, mut reader_b) = rig();
        start_game(&mut coordinator, &mut reader_a, &mut reader_b);
        open_with_black_a(&mut coordinator, &mut reader_a, &mut reader_b);

        // A is black with (8,8) and (7,8) standing; extend down column 8.
        // B (white) answers along row 1.
        let moves = [
            (PeerId::B, (1, 1)),
            (PeerId::A, (6, 8)),
            (PeerId::B, (1, 2)),
            (PeerId::A, (5, 8)),
            (PeerId::B, (1, 3)),
            (PeerId::A, (4, 8)),
        ];
        for (peer, (i, j)) in moves {
            coordinator.handle_message(peer, Message::InquireToPutStone { i, j });
            recv(&mut reader_a);
            recv(&mut reader_b);
        }

        let game_over = recv(&mut reader_a);
        assert_eq!(game_over, recv(&mut reader_b));
        match game_over {
            Message::GameOver {
                winner_number,
                row: Some(row),
            } => {
                assert_eq!(winner_number, 1);
                assert_eq!(row.color, StoneColor::Black);
                assert_eq!(row.stones.len(), 5);
                for stone in &row.stones {
                    assert_eq!(stone.position.j(), 8);
                }
            }
            other => panic!("expected GameOver with a row, got {other:?}"),
        }
        assert!(coordinator.board().is_game_over());
    }

    #[test]
    fn retraction_requires_consent() {
        let (mut coordinator, mut reader_a, mut reader_b) = rig();
        start_game(&mut coordinator, &mut reader_a, &mut reader_b);
        open_with_black_a(&mut coordinator, &mut reader_a, &mut reader_b);

        // One retractable move beyond the preset floor.
        coordinator.handle_message(PeerId::B, Message::InquireToPutStone { i: 9, j: 9 });
        recv(&mut reader_a);
        recv(&mut reader_b);

        coordinator.handle_message(PeerId::B, Message::InquireToRetractStone);
        assert_eq!(recv(&mut reader_a), Message::InquireToRetractStone);
        assert_eq!(coordinator.waiting_for(), Some(PeerId::A));

        coordinator.handle_message(PeerId::A, Message::AcceptToRetractStone);
        let expected = Message::RetractStone {
            stone: Stone::new(Position::new(9, 9).unwrap(), StoneColor::White),
            previous: Some(Stone::new(Position::new(7, 8).unwrap(), StoneColor::Black)),
            history_size: 3,
        };
        assert_eq!(recv(&mut reader_a), expected);
        assert_eq!(recv(&mut reader_b), expected);
        assert_eq!(coordinator.board().history_len(), 3);
    }

    #[test]
    fn rejected_retraction_only_relays() {
        let (mut coordinator, mut reader_a, mut reader_b) = rig();
        start_game(&mut coordinator, &mut reader_a, &mut reader_b);
        open_with_black_a(&mut coordinator, &mut reader_a, &mut reader_b);

        coordinator.handle_message(PeerId::B, Message::InquireToPutStone { i: 9, j: 9 });
        recv(&mut reader_a);
        recv(&mut reader_b);

        coordinator.handle_message(PeerId::B, Message::InquireToRetractStone);
        assert_eq!(recv(&mut reader_a), Message::InquireToRetractStone);
        coordinator.handle_message(PeerId::A, Message::RejectToRetractStone);
        assert_eq!(recv(&mut reader_b), Message::RejectToRetractStone);
        assert_eq!(coordinator.board().history_len(), 4);
    }

    #[test]
    fn retraction_below_floor_is_ignored() {
        let (mut coordinator, mut reader_a, mut reader_b) = rig();
        start_game(&mut coordinator, &mut reader_a, &mut reader_b);
        open_with_black_a(&mut coordinator, &mut reader_a, &mut reader_b);

        // History is exactly at the preset floor (3): accept must not pop.
        coordinator.handle_message(PeerId::B, Message::InquireToRetractStone);
        assert_eq!(recv(&mut reader_a), Message::InquireToRetractStone);
        coordinator.handle_message(PeerId::A, Message::AcceptToRetractStone);
        assert_eq!(coordinator.board().history_len(), 3);
    }

    #[test]
    fn admit_defeat_ends_and_resets() {
        let (mut coordinator, mut reader_a, mut reader_b) = rig();
        start_game(&mut coordinator, &mut reader_a, &mut reader_b);

        coordinator.handle_message(PeerId::A, Message::InquireToPutStone { i: 8, j: 8 });
        recv(&mut reader_a);
        recv(&mut reader_b);

        coordinator.handle_message(PeerId::A, Message::AdmitDefeat);
        let expected = Message::GameOver {
            winner_number: 2,
            row: None,
        };
        assert_eq!(recv(&mut reader_a), expected);
        assert_eq!(recv(&mut reader_b), expected);
        assert!(!coordinator.board().is_started());
        assert!(coordinator.board().history().is_empty());
    }

    #[test]
    fn disconnect_mid_game_forfeits() {
        let (mut coordinator, mut reader_a, mut reader_b) = rig();
        start_game(&mut coordinator, &mut reader_a, &mut reader_b);

        coordinator.handle_message(PeerId::A, Message::InquireToPutStone { i: 8, j: 8 });
        recv(&mut reader_a);
        recv(&mut reader_b);

        coordinator.handle_disconnect(PeerId::B);
        assert_eq!(
            recv(&mut reader_a),
            Message::GameOver {
                winner_number: 1,
                row: None,
            }
        );
        assert!(!coordinator.board().is_started());
        assert_eq!(coordinator.peer_count(), 1);
    }

    #[test]
    fn relay_only_kinds_from_peers_are_ignored() {
        let (mut coordinator, mut reader_a, mut reader_b) = rig();
        start_game(&mut coordinator, &mut reader_a, &mut reader_b);

        coordinator.handle_message(
            PeerId::A,
            Message::NewGame { player_number: 1 },
        );
        coordinator.handle_message(
            PeerId::B,
            Message::SetPlayerColor {
                color: Some(StoneColor::Black),
                preset_count: 0,
            },
        );
        assert!(coordinator.board().is_started());
        assert!(!coordinator.board().is_color_chosen());
        assert!(coordinator.board().history().is_empty());
    }
}
