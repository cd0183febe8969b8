// mahjong_server: session server for one four-seat mahjong table.
//
// Accepts TCP connections, seats up to four of them, and runs the game from
// `mahjong_game` on their behalf. Clients send `ActionMessage`s and receive
// seat-specific `OutboundMessage`s, framed as in `mahjong_protocol`.
//
// Module overview:
// - `hub.rs`:      `SessionHub`, the seat registry and non-blocking
//                  delivery that drops unresponsive seats.
// - `pump.rs`:     Per-connection reader and writer threads.
// - `dispatch.rs`: `Table`, which maps actions onto the state machine and
//                  collects the resulting messages.
// - `server.rs`:   Listener, event loop, seating, `start_server`.
// - `client.rs`:   `TableClient`, used by bots and integration tests.
//
// The server can run as a standalone binary (`main.rs`) or be embedded via
// `start_server`, which is how the tests run it.

pub mod client;
pub mod dispatch;
pub mod hub;
pub mod pump;
pub mod server;

pub use client::TableClient;
pub use server::{ServerConfig, ServerError, ServerHandle, start_server};
