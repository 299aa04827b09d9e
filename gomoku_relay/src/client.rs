// TCP client for connecting to the relay as one of the two peers.
//
// Provides a non-blocking interface for the caller's thread to communicate
// with the relay. Architecture:
// - `connect()` performs the TCP connect on the calling thread, then spawns
//   a background reader thread.
// - The reader thread calls `read_frame()` in a loop and pushes decoded
//   messages into an `mpsc` channel.
// - The caller holds a `BufWriter<TcpStream>` for sending intent frames.
// - `poll()` drains the inbox non-blocking, returning all queued messages.
//
// This separation ensures the caller never blocks on network I/O. The
// reader thread handles the blocking reads, and the writer flushes
// synchronously (acceptable for the small frames we send).
//
// There is no handshake: the relay assigns peer identity by accept order.
// The `peer_id` passed to `connect()` is only stamped into outbound frame
// headers; the relay ignores it and trusts accept order instead.
//
// This module lives in the relay crate so integration tests can drive both
// ends of a game with nothing but std TCP + protocol framing + mpsc.

use std::io::{BufReader, BufWriter};
use std::net::{Shutdown, TcpStream};
use std::sync::mpsc::{self, Receiver};
use std::thread::{self, JoinHandle};

use gomoku_protocol::framing::{read_frame, write_frame};
use gomoku_protocol::message::{ColorChoice, Message};
use gomoku_protocol::types::PeerId;

/// TCP client for relay communication.
pub struct NetClient {
    writer: BufWriter<TcpStream>,
    inbox: Receiver<Message>,
    _reader_thread: Option<JoinHandle<()>>,
    peer_id: PeerId,
}

impl NetClient {
    /// Connect to a relay server and spawn a reader thread.
    pub fn connect(addr: &str, peer_id: PeerId) -> Result<Self, String> {
        let stream = TcpStream::connect(addr).map_err(|e| format!("connect failed: {e}"))?;

        let reader_stream = stream
            .try_clone()
            .map_err(|e| format!("clone failed: {e}"))?;
        let writer = BufWriter::new(stream);

        let (tx, rx) = mpsc::channel();
        let reader = BufReader::new(reader_stream);
        let reader_thread = thread::spawn(move || {
            reader_loop(reader, tx);
        });

        Ok(Self {
            writer,
            inbox: rx,
            _reader_thread: Some(reader_thread),
            peer_id,
        })
    }

    pub fn peer_id(&self) -> PeerId {
        self.peer_id
    }

    /// Ask the other peer for a new game.
    pub fn request_new_game(&mut self) -> Result<(), String> {
        self.send(&Message::InquireToNewGame)
    }

    /// Answer the other peer's new-game request.
    pub fn respond_new_game(&mut self, accept: bool) -> Result<(), String> {
        if accept {
            self.send(&Message::AcceptToNewGame)
        } else {
            self.send(&Message::RejectToNewGame)
        }
    }

    /// Ask to place a stone at (i, j). The relay validates and broadcasts
    /// the authoritative `PutStone` if the move is legal.
    pub fn request_put_stone(&mut self, i: u8, j: u8) -> Result<(), String> {
        self.send(&Message::InquireToPutStone { i, j })
    }

    /// Ask the other peer to allow retracting the last stone.
    pub fn request_retract_stone(&mut self) -> Result<(), String> {
        self.send(&Message::InquireToRetractStone)
    }

    /// Answer the other peer's retraction request.
    pub fn respond_retract_stone(&mut self, accept: bool) -> Result<(), String> {
        if accept {
            self.send(&Message::AcceptToRetractStone)
        } else {
            self.send(&Message::RejectToRetractStone)
        }
    }

    /// Answer an opening color checkpoint.
    pub fn choose_color(&mut self, option: ColorChoice) -> Result<(), String> {
        self.send(&Message::ChoosePlayerColor { option })
    }

    /// Concede the game.
    pub fn admit_defeat(&mut self) -> Result<(), String> {
        self.send(&Message::AdmitDefeat)
    }

    /// Send a chat line. Oversized text is clipped at the payload cap
    /// during encoding.
    pub fn send_chat(&mut self, text: &str) -> Result<(), String> {
        self.send(&Message::ChatText { text: text.into() })
    }

    /// Shut the connection down. The relay sees EOF on its read half; a
    /// game in progress is forfeited.
    pub fn disconnect(&mut self) {
        let _ = self.writer.get_ref().shutdown(Shutdown::Both);
    }

    /// Drain all queued relay messages (non-blocking).
    pub fn poll(&self) -> Vec<Message> {
        let mut messages = Vec::new();
        while let Ok(msg) = self.inbox.try_recv() {
            messages.push(msg);
        }
        messages
    }

    fn send(&mut self, message: &Message) -> Result<(), String> {
        write_frame(&mut self.writer, self.peer_id.0, message)
            .map_err(|e| format!("send failed: {e}"))
    }
}

/// Reader thread: read frames in a loop, push their messages to the channel.
fn reader_loop(mut reader: BufReader<TcpStream>, tx: mpsc::Sender<Message>) {
    while let Ok(frame) = read_frame(&mut reader) {
        if tx.send(frame.message).is_err() {
            break; // Caller dropped the receiver
        }
    }
}
