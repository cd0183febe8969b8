// Per-connection message pump.
//
// Every accepted connection gets two threads:
//
// - **Reader**: reads length-delimited frames (capped at the configured
//   inbound size), decodes each into an `ActionMessage`, and forwards it to
//   the event loop as `InternalEvent::Action`. A payload that does not
//   decode is logged and forwarded as the sentinel action, which the
//   dispatcher ignores; the connection stays up. A read error or EOF sends
//   `InternalEvent::Disconnected` and ends the thread.
// - **Writer**: drains the bounded outbound queue and writes each frame
//   with a write timeout. A write error reports the disconnect. When the
//   hub drops the queue's sender, the writer exits and shuts the stream.
//
// Reader threads never touch game state. Only the event loop does.

use std::io::{BufReader, BufWriter};
use std::net::{Shutdown, TcpStream};
use std::sync::mpsc::{self, Receiver, Sender, SyncSender};
use std::thread;
use std::time::Duration;

use tracing::{debug, info, warn};

use mahjong_protocol::{ActionMessage, read_message_limited, write_message};

use crate::hub::ConnectionId;
use crate::server::InternalEvent;

/// Limits for one connection's pump.
#[derive(Clone, Copy, Debug)]
pub struct PumpLimits {
    pub queue_capacity: usize,
    pub max_inbound_message: u32,
    pub write_timeout: Duration,
}

/// Start the reader and writer threads for `stream`. Returns the sending
/// half of the outbound queue, which the hub holds.
pub fn spawn_pump(
    stream: &TcpStream,
    conn: ConnectionId,
    limits: PumpLimits,
    events: &Sender<InternalEvent>,
) -> std::io::Result<SyncSender<Vec<u8>>> {
    let read_half = stream.try_clone()?;
    let write_half = stream.try_clone()?;
    write_half.set_write_timeout(Some(limits.write_timeout))?;
    let (tx, rx) = mpsc::sync_channel(limits.queue_capacity);

    let reader_events = events.clone();
    thread::Builder::new()
        .name(format!("reader-{}", conn.0))
        .spawn(move || reader_loop(read_half, conn, limits.max_inbound_message, reader_events))?;

    let writer_events = events.clone();
    thread::Builder::new()
        .name(format!("writer-{}", conn.0))
        .spawn(move || writer_loop(write_half, conn, rx, writer_events))?;

    Ok(tx)
}

fn reader_loop(stream: TcpStream, conn: ConnectionId, limit: u32, events: Sender<InternalEvent>) {
    let mut reader = BufReader::new(stream);
    loop {
        let bytes = match read_message_limited(&mut reader, limit) {
            Ok(bytes) => bytes,
            Err(e) => {
                info!(%conn, error = %e, "connection closed");
                break;
            }
        };
        let action = ActionMessage::decode(&bytes).unwrap_or_else(|e| {
            warn!(%conn, error = %e, "malformed action message");
            ActionMessage::default()
        });
        if events.send(InternalEvent::Action { conn, action }).is_err() {
            // Event loop has shut down.
            return;
        }
    }
    let _ = events.send(InternalEvent::Disconnected { conn });
}

fn writer_loop(
    stream: TcpStream,
    conn: ConnectionId,
    outbox: Receiver<Vec<u8>>,
    events: Sender<InternalEvent>,
) {
    let mut writer = BufWriter::new(stream);
    for bytes in outbox.iter() {
        if let Err(e) = write_message(&mut writer, &bytes) {
            warn!(%conn, error = %e, "write failed");
            let _ = events.send(InternalEvent::Disconnected { conn });
            break;
        }
    }
    debug!(%conn, "writer finished");
    let _ = writer.get_ref().shutdown(Shutdown::Both);
}
