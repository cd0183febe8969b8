// mahjong_protocol: wire protocol between table clients and the server.
//
// Shared by the session server (`mahjong_server`) and by clients, including
// the test client in `mahjong_server::client`. Has no dependency on the game
// crate.
//
// Module overview:
// - `types.rs`:    `SeatIndex` and the seat-relative position arithmetic,
//                  plus the `NO_TARGET` wire sentinel.
// - `message.rs`:  Inbound `ActionMessage` / `Operation`, outbound
//                  `OutboundMessage` / `MessageType`.
// - `framing.rs`:  Length-delimited framing over any `Read`/`Write` stream:
//                  4-byte big-endian length prefix, then JSON payload.
//
// Design decisions:
// - **JSON serialization** with `serde_json`, matching what browser clients
//   produce and consume.
// - **Opaque payloads.** `OutboundMessage::values` is a `serde_json::Value`;
//   payload structs live with the game logic that builds them.
// - **No async runtime.** Framing uses `std::io::Read`/`Write`, which works
//   with blocking TCP streams and buffered wrappers.

pub mod framing;
pub mod message;
pub mod types;

pub use framing::{MAX_MESSAGE_SIZE, read_message, read_message_limited, write_message};
pub use message::{ActionMessage, MessageType, Operation, OutboundMessage};
pub use types::{NO_TARGET, SEAT_COUNT, SeatIndex};
