// Test-only table harness for end-to-end tests.
//
// Wraps the real `TableClient` (from `mahjong_server::client`) in a
// synchronous, test-friendly API, and `TestTable` starts a real server on a
// free port and seats four clients. Everything goes over localhost TCP
// through the same code paths as a live table; the only test-specific code
// is the blocking wait helpers here and the scripted scoring oracle the
// tests hand to the server.
//
// See also: `tests/full_game.rs` for the scenarios.

use std::net::SocketAddr;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use mahjong_game::{ScoringOracle, ScriptedOracle};
use mahjong_protocol::{MessageType, OutboundMessage, SEAT_COUNT};
use mahjong_server::{ServerConfig, ServerHandle, TableClient, start_server};

/// Default timeout for blocking waits.
const WAIT_TIMEOUT: Duration = Duration::from_secs(5);

/// Pause between reconnect attempts.
const RETRY_INTERVAL: Duration = Duration::from_millis(20);

pub fn connect(addr: SocketAddr) -> TableClient {
    TableClient::connect(addr).expect("TableClient::connect failed")
}

/// One seat at the table.
pub struct TestSeat {
    client: TableClient,
    pub seat: usize,
}

impl TestSeat {
    pub fn client(&mut self) -> &mut TableClient {
        &mut self.client
    }

    /// Next message of any kind.
    pub fn recv(&self) -> OutboundMessage {
        self.client
            .recv_timeout(WAIT_TIMEOUT)
            .unwrap_or_else(|| panic!("seat {} timed out waiting for a message", self.seat))
    }

    /// Block until a message of `kind` arrives, discarding everything
    /// received before it.
    pub fn wait_for(&self, kind: MessageType) -> OutboundMessage {
        let start = Instant::now();
        loop {
            let remaining = WAIT_TIMEOUT.saturating_sub(start.elapsed());
            assert!(
                !remaining.is_zero(),
                "seat {} timed out waiting for {kind:?}",
                self.seat
            );
            if let Some(msg) = self.client.recv_timeout(remaining) {
                if msg.kind == kind {
                    return msg;
                }
            }
        }
    }

    /// True if nothing arrives within `window`.
    pub fn is_quiet(&self, window: Duration) -> bool {
        self.client.recv_timeout(window).is_none()
    }

    pub fn drain(&self) -> Vec<OutboundMessage> {
        self.client.poll()
    }

    pub fn discard(&mut self, position: i32) {
        self.client.discard(position).expect("send discard failed");
    }

    pub fn ron(&mut self) {
        self.client.ron().expect("send ron failed");
    }

    pub fn skip(&mut self) {
        self.client.skip().expect("send skip failed");
    }

    pub fn next(&mut self) {
        self.client.next().expect("send next failed");
    }

    pub fn result(&mut self) {
        self.client.result().expect("send result failed");
    }
}

/// A running server with four seated clients, indexed by seat.
pub struct TestTable {
    handle: Option<ServerHandle>,
    pub addr: SocketAddr,
    pub seats: Vec<TestSeat>,
    pub oracle: Arc<ScriptedOracle>,
}

impl TestTable {
    /// Start a server with a fixed seed and default rules, seat four clients,
    /// and consume each seat's `start` message.
    pub fn start() -> (Self, Vec<OutboundMessage>) {
        Self::start_with(ServerConfig::default())
    }

    pub fn start_with(config: ServerConfig) -> (Self, Vec<OutboundMessage>) {
        let oracle = Arc::new(ScriptedOracle::new());
        let config = ServerConfig {
            port: 0,
            seed: config.seed.or(Some(7)),
            ..config
        };
        let shared: Arc<dyn ScoringOracle> = oracle.clone();
        let (handle, addr) = start_server(config, shared).expect("start_server failed");

        let clients: Vec<TableClient> = (0..SEAT_COUNT).map(|_| connect(addr)).collect();
        let mut seated: Vec<Option<(TestSeat, OutboundMessage)>> =
            (0..SEAT_COUNT).map(|_| None).collect();
        for client in clients {
            let mut seat = TestSeat { client, seat: 0 };
            let start = seat.wait_for(MessageType::Start);
            let id = start.values["playerInfo"]["playerId"]
                .as_u64()
                .expect("start without playerId") as usize;
            assert!(seated[id].is_none(), "seat {id} assigned twice");
            seat.seat = id;
            seated[id] = Some((seat, start));
        }

        let (seats, starts) = seated
            .into_iter()
            .map(|s| s.expect("seat left empty"))
            .unzip();
        (
            Self {
                handle: Some(handle),
                addr,
                seats,
                oracle,
            },
            starts,
        )
    }

    /// The acting seat discards its drawn tile with nobody able to claim.
    /// Returns the next seat's `drawn` message, or `drawnRound` if the mount
    /// ran out.
    pub fn quiet_turn(&mut self, acting: usize) -> OutboundMessage {
        self.seats[acting].discard(-1);
        self.seats[acting].wait_for(MessageType::Discard);
        let next = (acting + 1) % SEAT_COUNT;
        loop {
            let msg = self.seats[next].recv();
            if matches!(msg.kind, MessageType::Drawn | MessageType::DrawnRound) {
                return msg;
            }
        }
    }

    /// Close `seat`'s connection and seat a fresh client in its place.
    /// Returns the resync `start` view the new client receives.
    pub fn reconnect(&mut self, seat: usize) -> OutboundMessage {
        let old = self.seats.remove(seat);
        old.client.disconnect();
        let start = Instant::now();
        loop {
            assert!(start.elapsed() < WAIT_TIMEOUT, "seat {seat} was never freed");
            let fresh = TestSeat {
                client: connect(self.addr),
                seat,
            };
            let msg = fresh.recv();
            if msg.kind == MessageType::Rejected {
                // The server has not noticed the disconnect yet.
                thread::sleep(RETRY_INTERVAL);
                continue;
            }
            self.seats.insert(seat, fresh);
            return msg;
        }
    }

    /// Drop every message queued on every seat.
    pub fn drain_all(&self) {
        for seat in &self.seats {
            seat.drain();
        }
    }
}

impl Drop for TestTable {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.stop();
        }
    }
}
