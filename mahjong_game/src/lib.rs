// mahjong_game: server-authoritative rules for one four-seat mahjong table.
//
// Everything here is deterministic given a `GameRng` seed and a
// `ScoringOracle`, and nothing here touches the network except
// `HttpOracle`. The session server (`mahjong_server`) owns one
// `GameStateMachine` and feeds it decoded client actions; tests drive it
// directly.
//
// Module overview (leaves first):
// - `tile.rs`:       `TileId`, suits and ranks, the 136-tile universe.
// - `mount.rs`:      `TileMount`, the shuffled stock with a draw cursor.
// - `round.rs`:      `Wind` and `RoundState` (prevailing wind, round,
//                    repeat-dealer counter).
// - `player.rs`:     `PlayerState`, per-seat hand, drawn slot, river,
//                    points, and pending claim.
// - `config.rs`:     `GameConfig`, every tunable rule number.
// - `oracle.rs`:     `ScoringOracle` trait, `WinQuery` encoding, the HTTP
//                    client, and static/scripted oracles.
// - `gate.rs`:       `ConfirmationGate`, the mutex-guarded next-round gate
//                    storing a `NextTransition` command.
// - `settlement.rs`: final settlement with uma and tie-breaks.
// - `game.rs`:       `GameStateMachine`, the turn cycle and round
//                    progression.
// - `outbox.rs`:     `OutboxBuilder`, seat-rotated outbound payloads.

pub mod config;
pub mod game;
pub mod gate;
pub mod mount;
pub mod oracle;
pub mod outbox;
pub mod player;
pub mod round;
pub mod settlement;
pub mod tile;

pub use config::{ConfigError, GameConfig};
pub use game::{
    GameError, GameStateMachine, Phase, RonSettlement, RoundAdvance, RoundOutcome, TurnAdvance,
};
pub use gate::{ConfirmationGate, NextTransition};
pub use mount::{MountError, TileMount};
pub use oracle::{
    HttpOracle, MAX_CLAIM_COST, OracleError, ScoringOracle, ScriptedOracle, StaticOracle,
    WinEvaluation, WinQuery,
};
pub use outbox::{Delivery, OutboxBuilder};
pub use round::{RoundState, Wind};
pub use settlement::FinalResult;
pub use tile::TileId;
