// Protocol messages between table clients and the session server.
//
// Inbound, a client sends one `ActionMessage` per user action:
//   {"Operation": "discard", "Target": 4}
// Outbound, the server sends one `OutboundMessage` per seat per transition:
//   {"type": "discardOther", "values": {...}}
//
// `values` is an opaque `serde_json::Value`. The payload shapes belong to the
// game crate's outbox builder; this crate only knows the envelope, which
// keeps it independent of game rules.
//
// Decoding is deliberately forgiving because browser clients are loose about
// casing and types: both `Operation`/`operation` and `Target`/`target` are
// accepted, `Target` may be a number or a numeric string, and anything that
// does not parse becomes the `NO_TARGET` sentinel. An unrecognized operation
// decodes to `Operation::Unknown` so the server can log and drop it without
// tearing down the connection.

use serde::de::Deserializer;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::NO_TARGET;

/// The action a client asks the server to perform.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Operation {
    /// Redeal the current round (also sent by debug tooling).
    Start,
    /// Discard the tile at `Target` (or the drawn tile if out of range).
    Discard,
    /// Claim the tile just discarded.
    Ron,
    /// Decline a pending claim.
    Skip,
    /// Acknowledge a round outcome.
    Next,
    /// Request the final result for the current standings.
    Result,
    /// Anything else. Logged and ignored.
    Unknown(String),
}

impl Operation {
    pub fn as_str(&self) -> &str {
        match self {
            Operation::Start => "start",
            Operation::Discard => "discard",
            Operation::Ron => "ron",
            Operation::Skip => "skip",
            Operation::Next => "next",
            Operation::Result => "result",
            Operation::Unknown(other) => other,
        }
    }
}

impl From<String> for Operation {
    fn from(s: String) -> Self {
        match s.as_str() {
            "start" => Operation::Start,
            // Older clients call a discard a "release".
            "discard" | "release" => Operation::Discard,
            "ron" => Operation::Ron,
            "skip" => Operation::Skip,
            "next" => Operation::Next,
            "result" => Operation::Result,
            _ => Operation::Unknown(s),
        }
    }
}

impl From<Operation> for String {
    fn from(op: Operation) -> Self {
        op.as_str().to_owned()
    }
}

impl Default for Operation {
    fn default() -> Self {
        Operation::Unknown(String::new())
    }
}

/// Inbound action message.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionMessage {
    #[serde(rename = "Operation", alias = "operation", default)]
    pub operation: Operation,
    #[serde(
        rename = "Target",
        alias = "target",
        default = "no_target",
        deserialize_with = "lenient_target"
    )]
    pub target: i32,
}

impl ActionMessage {
    pub fn new(operation: Operation, target: i32) -> Self {
        Self { operation, target }
    }

    /// Decode a raw inbound payload.
    pub fn decode(bytes: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(bytes)
    }
}

impl Default for ActionMessage {
    /// The sentinel action that malformed payloads decode to.
    fn default() -> Self {
        Self {
            operation: Operation::default(),
            target: NO_TARGET,
        }
    }
}

fn no_target() -> i32 {
    NO_TARGET
}

fn lenient_target<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i32, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Number(n) => n
            .as_i64()
            .and_then(|v| i32::try_from(v).ok())
            .unwrap_or(NO_TARGET),
        Value::String(s) => s.trim().parse().unwrap_or(NO_TARGET),
        _ => NO_TARGET,
    })
}

/// Semantic tag of an outbound message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MessageType {
    /// Fresh deal at the start of a game.
    Start,
    /// The receiver's own hand after its discard.
    Discard,
    /// The receiver drew a tile and must discard.
    Drawn,
    /// Another seat discarded.
    DiscardOther,
    /// A claim was settled.
    Ron,
    /// The receiver's pending claim was declined.
    Skip,
    /// The mount ran out with no winner.
    DrawnRound,
    /// Fresh deal for the next round.
    Next,
    /// Final settlement.
    Result,
    /// Connection refused (table full).
    Rejected,
}

/// Outbound envelope.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OutboundMessage {
    #[serde(rename = "type")]
    pub kind: MessageType,
    pub values: Value,
}

impl OutboundMessage {
    /// Wrap a serializable payload.
    pub fn new<T: Serialize>(kind: MessageType, values: &T) -> serde_json::Result<Self> {
        Ok(Self {
            kind,
            values: serde_json::to_value(values)?,
        })
    }

    pub fn rejected(reason: &str) -> Self {
        Self {
            kind: MessageType::Rejected,
            values: serde_json::json!({ "reason": reason }),
        }
    }

    pub fn encode(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }
}
