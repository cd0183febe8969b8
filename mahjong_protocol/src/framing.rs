// Length-delimited message framing over TCP.
//
// Each frame is a 4-byte big-endian length prefix followed by a JSON payload.
// `write_message` and `read_message` operate on raw bytes; the caller handles
// JSON encoding, keeping this module format-agnostic.
//
// `MAX_MESSAGE_SIZE` bounds what a client may receive. Inbound action frames
// are tiny, so the server reads them through `read_message_limited` with a
// much smaller cap (see `ServerConfig::max_inbound_message`).

use std::io::{self, Read, Write};

/// Largest frame either side will accept (64 KB). A full `start` view for
/// one seat is well under 2 KB.
pub const MAX_MESSAGE_SIZE: u32 = 64 * 1024;

/// Write a length-delimited message: 4-byte big-endian length, then payload.
pub fn write_message<W: Write>(writer: &mut W, msg: &[u8]) -> io::Result<()> {
    let len = msg.len();
    if len > MAX_MESSAGE_SIZE as usize {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("message too large: {len} bytes (max {MAX_MESSAGE_SIZE})"),
        ));
    }
    #[expect(clippy::cast_possible_truncation)]
    let len_bytes = (len as u32).to_be_bytes();
    writer.write_all(&len_bytes)?;
    writer.write_all(msg)?;
    writer.flush()?;
    Ok(())
}

/// Read a length-delimited message of at most `MAX_MESSAGE_SIZE` bytes.
pub fn read_message<R: Read>(reader: &mut R) -> io::Result<Vec<u8>> {
    read_message_limited(reader, MAX_MESSAGE_SIZE)
}

/// Read a length-delimited message, rejecting frames longer than `limit`.
///
/// Returns `UnexpectedEof` if the stream closes before or during a message,
/// and `InvalidData` if the length prefix exceeds `limit`.
pub fn read_message_limited<R: Read>(reader: &mut R, limit: u32) -> io::Result<Vec<u8>> {
    let mut len_buf = [0u8; 4];
    reader.read_exact(&mut len_buf)?;
    let len = u32::from_be_bytes(len_buf);
    if len > limit {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("message too large: {len} bytes (max {limit})"),
        ));
    }
    let mut buf = vec![0u8; len as usize];
    reader.read_exact(&mut buf)?;
    Ok(buf)
}
