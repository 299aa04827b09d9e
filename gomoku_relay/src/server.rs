// TCP server and main event loop for the relay.
//
// Architecture: thread-per-reader with a central `mpsc` channel.
//
// - **Listener thread** (`TcpListener::accept()` loop): accepts new TCP
//   connections and sends `InternalEvent::NewConnection` to the main thread.
// - **Reader threads** (one per peer): call `framing::read_frame()` in a
//   loop and send `InternalEvent::FrameFrom` to the main thread. On
//   error/EOF, send `InternalEvent::Disconnected`.
// - **Main thread**: owns the `Coordinator`, receives events from the
//   channel, and dispatches them in arrival order. This is the single
//   serialization point the protocol depends on: frames from both peers
//   funnel through one channel and are applied one at a time.
//
// The main thread is the only writer to peer TCP streams (via the
// coordinator's write halves). Reader threads only read. This avoids
// concurrent read/write on the same `TcpStream`, which is safe on most
// platforms but fragile.
//
// Peer identity is assigned at accept time: the lowest free slot (1, then
// 2). A third connection while both slots are occupied is closed
// immediately. The sender byte peers put in their own frame headers is
// ignored; the relay trusts only the reader thread's tag.
//
// Shutdown: the main thread checks a `keep_running` flag (set to false by
// `RelayHandle::stop`) and breaks out of the event loop.

use std::io::BufReader;
use std::net::{TcpListener, TcpStream};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::Duration;

use tracing::{debug, info, warn};

use gomoku_protocol::framing::read_frame;
use gomoku_protocol::message::Message;
use gomoku_protocol::types::PeerId;

use crate::coordinator::Coordinator;

/// Events sent from listener/reader threads to the main thread.
enum InternalEvent {
    NewConnection { stream: TcpStream },
    FrameFrom { peer: PeerId, message: Message },
    Disconnected { peer: PeerId },
}

/// Handle returned by `start_relay` to control the running server.
pub struct RelayHandle {
    keep_running: Arc<AtomicBool>,
    thread: Option<thread::JoinHandle<()>>,
}

impl RelayHandle {
    /// Signal the relay to stop and wait for it to shut down.
    pub fn stop(self) {
        self.keep_running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.thread {
            let _ = handle.join();
        }
    }
}

/// Configuration for starting a relay server.
pub struct RelayConfig {
    pub port: u16,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self { port: 10000 }
    }
}

/// Start the relay server on a background thread. Returns a handle for
/// stopping it and the actual bound address (useful when port 0 is used
/// to let the OS pick a free port).
pub fn start_relay(config: RelayConfig) -> std::io::Result<(RelayHandle, std::net::SocketAddr)> {
    let listener = TcpListener::bind(format!("127.0.0.1:{}", config.port))?;
    let addr = listener.local_addr()?;
    info!(%addr, "relay listening");
    let keep_running = Arc::new(AtomicBool::new(true));
    let keep_running_clone = keep_running.clone();

    let thread = thread::spawn(move || {
        run_relay(listener, keep_running_clone);
    });

    Ok((
        RelayHandle {
            keep_running,
            thread: Some(thread),
        },
        addr,
    ))
}

/// Main relay loop. Runs until `keep_running` is set to false.
fn run_relay(listener: TcpListener, keep_running: Arc<AtomicBool>) {
    let mut coordinator = Coordinator::new();
    // Which peer slots have a live reader thread.
    let mut connected = [false; 2];

    let (tx, rx): (Sender<InternalEvent>, Receiver<InternalEvent>) = mpsc::channel();

    // Set the listener to non-blocking so the accept thread can check
    // keep_running periodically.
    listener.set_nonblocking(true).ok();

    // Listener thread: accepts new connections.
    let keep_running_listener = keep_running.clone();
    let tx_listener = tx.clone();
    thread::spawn(move || {
        while keep_running_listener.load(Ordering::SeqCst) {
            match listener.accept() {
                Ok((stream, _addr)) => {
                    stream.set_nonblocking(false).ok();
                    let _ = tx_listener.send(InternalEvent::NewConnection { stream });
                }
                Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                    thread::sleep(Duration::from_millis(50));
                }
                Err(_) => break,
            }
        }
    });

    // Main event loop. The timeout only bounds how long a shutdown request
    // can go unnoticed.
    while keep_running.load(Ordering::SeqCst) {
        match rx.recv_timeout(Duration::from_millis(100)) {
            Ok(event) => {
                handle_event(&mut coordinator, &mut connected, event, &tx, &keep_running);
                // Drain any additional events that arrived during handling.
                while let Ok(event) = rx.try_recv() {
                    handle_event(&mut coordinator, &mut connected, event, &tx, &keep_running);
                }
            }
            Err(mpsc::RecvTimeoutError::Timeout) => {}
            Err(mpsc::RecvTimeoutError::Disconnected) => break,
        }
    }
}

/// Dispatch a single event to the coordinator.
fn handle_event(
    coordinator: &mut Coordinator,
    connected: &mut [bool; 2],
    event: InternalEvent,
    tx: &Sender<InternalEvent>,
    keep_running: &Arc<AtomicBool>,
) {
    match event {
        InternalEvent::NewConnection { stream } => {
            handle_new_connection(coordinator, connected, stream, tx, keep_running);
        }
        InternalEvent::FrameFrom { peer, message } => {
            coordinator.handle_message(peer, message);
        }
        InternalEvent::Disconnected { peer } => {
            connected[usize::from(peer.0) - 1] = false;
            coordinator.handle_disconnect(peer);
        }
    }
}

/// Handle a new TCP connection: assign the lowest free peer slot, register
/// the write half with the coordinator, and spawn a reader thread. A third
/// connection while both slots are taken is dropped.
fn handle_new_connection(
    coordinator: &mut Coordinator,
    connected: &mut [bool; 2],
    stream: TcpStream,
    tx: &Sender<InternalEvent>,
    keep_running: &Arc<AtomicBool>,
) {
    let Some(slot) = connected.iter().position(|&taken| !taken) else {
        warn!("connection refused, both peer slots taken");
        return;
    };
    #[expect(clippy::cast_possible_truncation)]
    let peer = PeerId(slot as u8 + 1);

    let write_stream = match stream.try_clone() {
        Ok(s) => s,
        Err(error) => {
            warn!(%error, "failed to clone stream for new peer");
            return;
        }
    };

    connected[slot] = true;
    coordinator.add_peer(peer, write_stream);

    let reader = BufReader::new(stream);
    let tx_reader = tx.clone();
    let keep_running_reader = keep_running.clone();
    thread::spawn(move || {
        reader_loop(reader, peer, tx_reader, keep_running_reader);
    });
}

/// Reader loop for a single peer. Runs in its own thread.
fn reader_loop(
    mut reader: BufReader<TcpStream>,
    peer: PeerId,
    tx: Sender<InternalEvent>,
    keep_running: Arc<AtomicBool>,
) {
    while keep_running.load(Ordering::SeqCst) {
        match read_frame(&mut reader) {
            Ok(frame) => {
                // The header's sender byte is untrusted; only the accept
                // order identifies a peer.
                if frame.sender != peer.0 {
                    debug!(%peer, claimed = frame.sender, "sender byte mismatch, using accept order");
                }
                let _ = tx.send(InternalEvent::FrameFrom {
                    peer,
                    message: frame.message,
                });
            }
            Err(_) => {
                // Read error or EOF.
                let _ = tx.send(InternalEvent::Disconnected { peer });
                break;
            }
        }
    }
}
