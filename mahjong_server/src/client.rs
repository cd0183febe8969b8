// TCP client for a table seat.
//
// `TableClient` is what bots and the integration tests use to sit at a
// table. `connect()` opens the stream and spawns a reader thread that
// decodes every frame into an `OutboundMessage` and pushes it into an
// `mpsc` inbox; `poll()` drains the inbox without blocking. Sends are
// written and flushed synchronously on the calling thread.
//
// There is no handshake: the server seats a connection as soon as it is
// accepted. A refused connection shows up as a `rejected` message in the
// inbox followed by the stream closing.

use std::io::{BufReader, BufWriter};
use std::net::{Shutdown, TcpStream, ToSocketAddrs};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};

use thiserror::Error;
use tracing::debug;

use mahjong_protocol::{ActionMessage, Operation, OutboundMessage, read_message, write_message};

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("connection error: {0}")]
    Io(#[from] std::io::Error),
    #[error("could not encode action: {0}")]
    Encode(#[from] serde_json::Error),
}

pub struct TableClient {
    writer: BufWriter<TcpStream>,
    inbox: Receiver<OutboundMessage>,
    _reader_thread: JoinHandle<()>,
}

impl TableClient {
    pub fn connect(addr: impl ToSocketAddrs) -> Result<Self, ClientError> {
        let stream = TcpStream::connect(addr)?;
        stream.set_nodelay(true)?;
        let reader = BufReader::new(stream.try_clone()?);
        let (tx, rx) = mpsc::channel();
        let reader_thread = thread::spawn(move || reader_loop(reader, tx));
        Ok(Self {
            writer: BufWriter::new(stream),
            inbox: rx,
            _reader_thread: reader_thread,
        })
    }

    pub fn send(&mut self, action: &ActionMessage) -> Result<(), ClientError> {
        let json = serde_json::to_vec(action)?;
        self.send_raw(&json)
    }

    /// Send an arbitrary payload as one frame, bypassing encoding.
    pub fn send_raw(&mut self, payload: &[u8]) -> Result<(), ClientError> {
        write_message(&mut self.writer, payload)?;
        Ok(())
    }

    pub fn start(&mut self) -> Result<(), ClientError> {
        self.send(&ActionMessage::new(Operation::Start, mahjong_protocol::NO_TARGET))
    }

    /// Discard the tile at `position`, or the drawn tile if out of range.
    pub fn discard(&mut self, position: i32) -> Result<(), ClientError> {
        self.send(&ActionMessage::new(Operation::Discard, position))
    }

    pub fn ron(&mut self) -> Result<(), ClientError> {
        self.send(&ActionMessage::new(Operation::Ron, mahjong_protocol::NO_TARGET))
    }

    pub fn skip(&mut self) -> Result<(), ClientError> {
        self.send(&ActionMessage::new(Operation::Skip, mahjong_protocol::NO_TARGET))
    }

    pub fn next(&mut self) -> Result<(), ClientError> {
        self.send(&ActionMessage::new(Operation::Next, mahjong_protocol::NO_TARGET))
    }

    pub fn result(&mut self) -> Result<(), ClientError> {
        self.send(&ActionMessage::new(Operation::Result, mahjong_protocol::NO_TARGET))
    }

    /// Drain all queued server messages (non-blocking).
    pub fn poll(&self) -> Vec<OutboundMessage> {
        self.inbox.try_iter().collect()
    }

    /// Receive one message, waiting at most `timeout`.
    pub fn recv_timeout(&self, timeout: std::time::Duration) -> Option<OutboundMessage> {
        self.inbox.recv_timeout(timeout).ok()
    }

    /// Close the connection. The server frees the seat.
    pub fn disconnect(self) {
        let _ = self.writer.get_ref().shutdown(Shutdown::Both);
    }
}

fn reader_loop(mut reader: BufReader<TcpStream>, tx: Sender<OutboundMessage>) {
    while let Ok(bytes) = read_message(&mut reader) {
        match serde_json::from_slice::<OutboundMessage>(&bytes) {
            Ok(msg) => {
                if tx.send(msg).is_err() {
                    break;
                }
            }
            Err(e) => {
                debug!(error = %e, "undecodable server message");
                break;
            }
        }
    }
}
