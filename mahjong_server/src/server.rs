// TCP server and main event loop for the table.
//
// Architecture: thread-per-connection readers and writers feeding one
// event-loop thread through an `mpsc` channel.
//
// - **Listener thread**: non-blocking `accept()` loop that forwards each new
//   stream as `InternalEvent::NewConnection`.
// - **Pump threads** (two per connection, see `pump.rs`): the reader turns
//   frames into `InternalEvent::Action`, the writer drains the seat's
//   bounded outbound queue.
// - **Event loop**: owns the `Table` (game state machine + oracle) and the
//   `SessionHub`. Every state change happens here, one event at a time, so
//   actions from different seats can never interleave. `recv_timeout` with
//   `poll_interval` lets the loop notice `stop()` while idle.
//
// Seating: a new connection takes the lowest free seat. When the fourth
// seat fills and no game is running, a game starts. A connection that fills
// a seat freed mid-game gets a full `start` view of the game in progress. A
// fifth connection is sent `rejected` and closed. A `start` action is only
// honored while all four seats are occupied.
//
// Scoring oracle calls happen on the event loop and block it for their
// duration. Only one seat can act at a time anyway.

use std::io::BufWriter;
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, error, info, warn};

use mahjong_game::{GameConfig, GameStateMachine, ScoringOracle};
use mahjong_prng::GameRng;
use mahjong_protocol::{ActionMessage, Operation, OutboundMessage, write_message};

use crate::dispatch::Table;
use crate::hub::{ConnectionId, SeatLink, SessionHub};
use crate::pump::{PumpLimits, spawn_pump};

/// Events sent from listener and pump threads to the event loop.
pub enum InternalEvent {
    NewConnection { stream: TcpStream },
    Action { conn: ConnectionId, action: ActionMessage },
    Disconnected { conn: ConnectionId },
}

#[derive(Debug, Error)]
pub enum ServerError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Config(#[from] mahjong_game::ConfigError),
    #[error("could not seed the shuffler: {0}")]
    Entropy(String),
}

/// Configuration for starting a table server.
#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    /// 0 lets the OS pick a port.
    pub port: u16,
    pub oracle_url: String,
    pub oracle_timeout: Duration,
    /// Outbound messages buffered per seat before the seat is dropped.
    pub queue_capacity: usize,
    pub max_inbound_message: u32,
    pub write_timeout: Duration,
    pub poll_interval: Duration,
    /// Fixed shuffle seed; `None` seeds from OS entropy.
    pub seed: Option<u64>,
    pub game: GameConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 8080,
            oracle_url: "http://127.0.0.1:8000".into(),
            oracle_timeout: Duration::from_secs(5),
            queue_capacity: 256,
            max_inbound_message: 512,
            write_timeout: Duration::from_secs(10),
            poll_interval: Duration::from_millis(50),
            seed: None,
            game: GameConfig::default(),
        }
    }
}

/// Handle returned by `start_server` to control the running server.
pub struct ServerHandle {
    keep_running: Arc<AtomicBool>,
    thread: Option<thread::JoinHandle<()>>,
}

impl ServerHandle {
    /// Signal the server to stop and wait for the event loop to exit.
    pub fn stop(mut self) {
        self.keep_running.store(false, Ordering::SeqCst);
        self.join();
    }

    /// Block until the event loop exits.
    pub fn wait(mut self) {
        self.join();
    }

    fn join(&mut self) {
        if let Some(handle) = self.thread.take() {
            if handle.join().is_err() {
                error!("event loop panicked");
            }
        }
    }
}

/// Bind the listener and start the event loop on a background thread.
/// Returns the handle and the bound address.
pub fn start_server(
    config: ServerConfig,
    oracle: Arc<dyn ScoringOracle>,
) -> Result<(ServerHandle, SocketAddr), ServerError> {
    config.game.validate()?;
    let rng = match config.seed {
        Some(seed) => GameRng::new(seed),
        None => GameRng::from_entropy().map_err(|e| ServerError::Entropy(e.to_string()))?,
    };

    let listener = TcpListener::bind((config.host.as_str(), config.port))?;
    let addr = listener.local_addr()?;
    listener.set_nonblocking(true)?;
    info!(%addr, "table server listening");

    let keep_running = Arc::new(AtomicBool::new(true));
    let keep_running_loop = Arc::clone(&keep_running);
    let table = Table::new(GameStateMachine::new(config.game.clone(), rng), oracle);
    let thread = thread::Builder::new()
        .name("event-loop".into())
        .spawn(move || run_server(listener, config, table, keep_running_loop))?;

    Ok((
        ServerHandle {
            keep_running,
            thread: Some(thread),
        },
        addr,
    ))
}

struct EventLoop {
    table: Table,
    hub: SessionHub,
    limits: PumpLimits,
    events: Sender<InternalEvent>,
    next_conn: u64,
}

fn run_server(
    listener: TcpListener,
    config: ServerConfig,
    table: Table,
    keep_running: Arc<AtomicBool>,
) {
    let (tx, rx): (Sender<InternalEvent>, Receiver<InternalEvent>) = mpsc::channel();

    let keep_running_listener = Arc::clone(&keep_running);
    let tx_listener = tx.clone();
    let spawned = thread::Builder::new()
        .name("listener".into())
        .spawn(move || accept_loop(listener, tx_listener, keep_running_listener));
    if let Err(e) = spawned {
        error!(error = %e, "could not start listener thread");
        return;
    }

    let mut state = EventLoop {
        table,
        hub: SessionHub::new(),
        limits: PumpLimits {
            queue_capacity: config.queue_capacity,
            max_inbound_message: config.max_inbound_message,
            write_timeout: config.write_timeout,
        },
        events: tx,
        next_conn: 0,
    };

    while keep_running.load(Ordering::SeqCst) {
        match rx.recv_timeout(config.poll_interval) {
            Ok(event) => {
                state.handle_event(event);
                while let Ok(event) = rx.try_recv() {
                    state.handle_event(event);
                }
            }
            Err(mpsc::RecvTimeoutError::Timeout) => {}
            Err(mpsc::RecvTimeoutError::Disconnected) => break,
        }
    }

    info!("table server stopping");
    for seat in mahjong_protocol::SeatIndex::ALL {
        state.hub.unregister(seat);
    }
}

fn accept_loop(listener: TcpListener, tx: Sender<InternalEvent>, keep_running: Arc<AtomicBool>) {
    while keep_running.load(Ordering::SeqCst) {
        match listener.accept() {
            Ok((stream, peer)) => {
                debug!(%peer, "accepted connection");
                if let Err(e) = stream.set_nonblocking(false) {
                    warn!(%peer, error = %e, "could not configure stream");
                    continue;
                }
                if tx.send(InternalEvent::NewConnection { stream }).is_err() {
                    break;
                }
            }
            Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                thread::sleep(Duration::from_millis(20));
            }
            Err(e) => {
                error!(error = %e, "accept failed");
                break;
            }
        }
    }
}

impl EventLoop {
    fn handle_event(&mut self, event: InternalEvent) {
        match event {
            InternalEvent::NewConnection { stream } => self.handle_new_connection(stream),
            InternalEvent::Action { conn, action } => {
                let Some(seat) = self.hub.seat_of(conn) else {
                    debug!(%conn, "action from unseated connection ignored");
                    return;
                };
                if action.operation == Operation::Start && !self.hub.is_full() {
                    warn!(%seat, seated = self.hub.len(), "start ignored; table is not full");
                    return;
                }
                match self.table.handle_action(seat, &action) {
                    Ok(deliveries) => {
                        self.hub.deliver_all(deliveries);
                    }
                    Err(e) => {
                        warn!(%seat, operation = action.operation.as_str(), error = %e, "action rejected");
                    }
                }
            }
            InternalEvent::Disconnected { conn } => {
                if let Some(seat) = self.hub.unregister_connection(conn) {
                    info!(%seat, %conn, "seat disconnected");
                }
            }
        }
    }

    fn handle_new_connection(&mut self, stream: TcpStream) {
        let Some(seat) = self.hub.free_seat() else {
            info!("table is full; rejecting connection");
            reject(stream, "table is full");
            return;
        };

        let conn = ConnectionId(self.next_conn);
        self.next_conn += 1;
        let outbox = match spawn_pump(&stream, conn, self.limits, &self.events) {
            Ok(outbox) => outbox,
            Err(e) => {
                warn!(%conn, error = %e, "could not start connection pump");
                return;
            }
        };
        self.hub.register(seat, SeatLink::new(conn, outbox, Some(stream)));

        let deliveries = if self.table.game().is_in_progress() {
            self.table.resync(seat).map(|d| d.into_iter().collect())
        } else if self.hub.is_full() {
            self.table.on_table_full()
        } else {
            Ok(Vec::new())
        };
        match deliveries {
            Ok(deliveries) => {
                self.hub.deliver_all(deliveries);
            }
            Err(e) => error!(%seat, error = %e, "could not seat connection"),
        }
    }
}

/// Send `rejected` on a connection that never gets a seat, then close it.
fn reject(stream: TcpStream, reason: &str) {
    let Ok(bytes) = OutboundMessage::rejected(reason).encode() else {
        return;
    };
    let mut writer = BufWriter::new(stream);
    if let Err(e) = write_message(&mut writer, &bytes) {
        debug!(error = %e, "could not send rejection");
    }
    let _ = writer.get_ref().shutdown(std::net::Shutdown::Both);
}
