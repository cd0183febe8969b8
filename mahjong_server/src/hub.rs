// Registry of connected seats and outbound delivery.
//
// `SessionHub` maps each occupied seat to its `SeatLink`: the connection id,
// the sending half of the connection's bounded outbound queue (drained by the
// pump's writer thread), and a handle to the TCP stream so the hub can tear
// the connection down.
//
// Delivery never blocks. `deliver` does a `try_send` on the seat's queue; a
// full queue (a client that stopped reading) or a closed one (a writer
// thread that already died) drops the seat from the registry and shuts its
// stream down, so one slow client can never stall the other three.
//
// The hub is owned by the server's event loop and has no internal locking.

use std::collections::BTreeMap;
use std::net::{Shutdown, TcpStream};
use std::sync::mpsc::{SyncSender, TrySendError};

use thiserror::Error;
use tracing::{debug, info, warn};

use mahjong_game::Delivery;
use mahjong_protocol::{OutboundMessage, SEAT_COUNT, SeatIndex};

/// Server-assigned id of one TCP connection. Never reused, so events from
/// a connection that has since been replaced can be told apart.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(pub u64);

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "conn {}", self.0)
    }
}

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("{0} is not connected")]
    NotConnected(SeatIndex),
    #[error("outbound queue for {0} is full")]
    QueueFull(SeatIndex),
    #[error("outbound queue for {0} is closed")]
    Closed(SeatIndex),
    #[error("could not encode message: {0}")]
    Encode(#[from] serde_json::Error),
}

pub struct SeatLink {
    conn: ConnectionId,
    outbox: SyncSender<Vec<u8>>,
    stream: Option<TcpStream>,
}

impl SeatLink {
    /// `stream` is shut down when the seat is dropped; `None` for links
    /// without a socket.
    pub fn new(conn: ConnectionId, outbox: SyncSender<Vec<u8>>, stream: Option<TcpStream>) -> Self {
        Self {
            conn,
            outbox,
            stream,
        }
    }

    fn close(self) {
        if let Some(stream) = self.stream {
            let _ = stream.shutdown(Shutdown::Both);
        }
        // Dropping `outbox` ends the writer thread.
    }
}

#[derive(Default)]
pub struct SessionHub {
    seats: BTreeMap<SeatIndex, SeatLink>,
}

impl SessionHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lowest unoccupied seat, if any.
    pub fn free_seat(&self) -> Option<SeatIndex> {
        SeatIndex::ALL
            .into_iter()
            .find(|seat| !self.seats.contains_key(seat))
    }

    /// Attach `link` to `seat`. Registering the same connection twice is a
    /// no-op; a seat already held by another connection is refused.
    pub fn register(&mut self, seat: SeatIndex, link: SeatLink) -> bool {
        if let Some(existing) = self.seats.get(&seat) {
            return existing.conn == link.conn;
        }
        info!(%seat, conn = %link.conn, "seat registered");
        self.seats.insert(seat, link);
        true
    }

    /// Drop `seat` and close its connection. Returns false if the seat was
    /// not registered.
    pub fn unregister(&mut self, seat: SeatIndex) -> bool {
        match self.seats.remove(&seat) {
            Some(link) => {
                info!(%seat, conn = %link.conn, "seat unregistered");
                link.close();
                true
            }
            None => false,
        }
    }

    /// Drop whichever seat `conn` holds. Stale connection ids are ignored.
    pub fn unregister_connection(&mut self, conn: ConnectionId) -> Option<SeatIndex> {
        let seat = self.seat_of(conn)?;
        self.unregister(seat);
        Some(seat)
    }

    pub fn seat_of(&self, conn: ConnectionId) -> Option<SeatIndex> {
        self.seats
            .iter()
            .find(|(_, link)| link.conn == conn)
            .map(|(seat, _)| *seat)
    }

    pub fn is_registered(&self, seat: SeatIndex) -> bool {
        self.seats.contains_key(&seat)
    }

    pub fn len(&self) -> usize {
        self.seats.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seats.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.seats.len() == SEAT_COUNT
    }

    /// Queue `message` for `seat` without blocking. A seat whose queue is
    /// full or closed is dropped.
    pub fn deliver(&mut self, seat: SeatIndex, message: &OutboundMessage) -> Result<(), DeliveryError> {
        let link = self
            .seats
            .get(&seat)
            .ok_or(DeliveryError::NotConnected(seat))?;
        let bytes = message.encode()?;
        let err = match link.outbox.try_send(bytes) {
            Ok(()) => {
                debug!(%seat, kind = ?message.kind, "queued");
                return Ok(());
            }
            Err(TrySendError::Full(_)) => DeliveryError::QueueFull(seat),
            Err(TrySendError::Disconnected(_)) => DeliveryError::Closed(seat),
        };
        warn!(%seat, error = %err, "dropping unresponsive seat");
        self.unregister(seat);
        Err(err)
    }

    /// Deliver each message to its seat independently. Returns the seats
    /// that were dropped along the way. Messages for empty seats are skipped.
    pub fn deliver_all(&mut self, deliveries: Vec<Delivery>) -> Vec<SeatIndex> {
        let mut dropped = Vec::new();
        for Delivery { seat, message } in deliveries {
            match self.deliver(seat, &message) {
                Ok(()) => {}
                Err(DeliveryError::NotConnected(_)) => {
                    debug!(%seat, kind = ?message.kind, "no connection; message skipped");
                }
                Err(DeliveryError::Encode(e)) => {
                    warn!(%seat, error = %e, "message not delivered");
                }
                Err(_) => dropped.push(seat),
            }
        }
        dropped
    }
}

#[cfg(test)]
mod tests {
    use std::sync::mpsc::{Receiver, sync_channel};

    use super::*;
    use mahjong_protocol::MessageType;

    fn link(conn: u64, capacity: usize) -> (SeatLink, Receiver<Vec<u8>>) {
        let (tx, rx) = sync_channel(capacity);
        (SeatLink::new(ConnectionId(conn), tx, None), rx)
    }

    fn message() -> OutboundMessage {
        OutboundMessage::new(MessageType::Skip, &serde_json::json!({"playerPosition": 0})).unwrap()
    }

    #[test]
    fn seats_fill_lowest_first() {
        let mut hub = SessionHub::new();
        let (a, _ra) = link(1, 4);
        let (b, _rb) = link(2, 4);
        assert_eq!(hub.free_seat(), Some(SeatIndex(0)));
        assert!(hub.register(SeatIndex(0), a));
        assert!(hub.register(SeatIndex(1), b));
        assert_eq!(hub.free_seat(), Some(SeatIndex(2)));

        hub.unregister(SeatIndex(0));
        assert_eq!(hub.free_seat(), Some(SeatIndex(0)));
    }

    #[test]
    fn register_and_unregister_are_idempotent() {
        let mut hub = SessionHub::new();
        let (tx, _rx) = sync_channel(4);
        assert!(hub.register(SeatIndex(1), SeatLink::new(ConnectionId(7), tx.clone(), None)));
        assert!(hub.register(SeatIndex(1), SeatLink::new(ConnectionId(7), tx.clone(), None)));
        assert!(!hub.register(SeatIndex(1), SeatLink::new(ConnectionId(8), tx, None)));
        assert_eq!(hub.len(), 1);

        assert!(hub.unregister(SeatIndex(1)));
        assert!(!hub.unregister(SeatIndex(1)));
        assert!(hub.is_empty());
    }

    #[test]
    fn stale_connection_ids_are_ignored() {
        let mut hub = SessionHub::new();
        let (a, _ra) = link(1, 4);
        hub.register(SeatIndex(0), a);
        assert_eq!(hub.unregister_connection(ConnectionId(99)), None);
        assert_eq!(hub.unregister_connection(ConnectionId(1)), Some(SeatIndex(0)));
    }

    #[test]
    fn deliver_queues_encoded_message() {
        let mut hub = SessionHub::new();
        let (a, ra) = link(1, 4);
        hub.register(SeatIndex(0), a);
        hub.deliver(SeatIndex(0), &message()).unwrap();
        let bytes = ra.try_recv().unwrap();
        let decoded: OutboundMessage = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(decoded, message());
    }

    #[test]
    fn full_queue_drops_only_that_seat() {
        let mut hub = SessionHub::new();
        let (slow, _slow_rx) = link(1, 1);
        let (fast, fast_rx) = link(2, 8);
        hub.register(SeatIndex(0), slow);
        hub.register(SeatIndex(1), fast);

        let batch = |n: usize| -> Vec<Delivery> {
            (0..n)
                .flat_map(|_| {
                    [SeatIndex(0), SeatIndex(1)].map(|seat| Delivery {
                        seat,
                        message: message(),
                    })
                })
                .collect()
        };
        let dropped = hub.deliver_all(batch(3));
        assert_eq!(dropped, [SeatIndex(0)]);
        assert!(!hub.is_registered(SeatIndex(0)));
        assert!(hub.is_registered(SeatIndex(1)));
        assert_eq!(fast_rx.try_iter().count(), 3);
    }

    #[test]
    fn closed_queue_drops_the_seat() {
        let mut hub = SessionHub::new();
        let (a, ra) = link(1, 4);
        hub.register(SeatIndex(2), a);
        drop(ra);
        assert!(matches!(
            hub.deliver(SeatIndex(2), &message()),
            Err(DeliveryError::Closed(_))
        ));
        assert!(!hub.is_registered(SeatIndex(2)));
    }

    #[test]
    fn delivery_to_empty_seat_is_skipped() {
        let mut hub = SessionHub::new();
        let dropped = hub.deliver_all(vec![Delivery {
            seat: SeatIndex(3),
            message: message(),
        }]);
        assert!(dropped.is_empty());
    }
}
