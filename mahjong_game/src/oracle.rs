// Scoring oracle: the external service that decides whether a hand wins.
//
// Win-pattern evaluation is not done in this crate. For every seat that
// could claim a discard, the state machine builds a `WinQuery` and asks a
// `ScoringOracle`. The production implementation, `HttpOracle`, POSTs the
// query as JSON to a scoring service and reads back `{IsPinfu, Cost}`.
//
// Query encoding (must match the service):
// - Hand plus candidate tile become one digit string per suit, each digit a
//   rank (`man: "123789"`, `honors: "11"` ...).
// - Winds are `Wind::oracle_code()`: East = 27 through North = 30.
// - The candidate tile is also sent alone as `win_tile_type` / `win_tile_value`.
// - A hand made entirely of souzu, claiming a souzu tile, is relabelled as
//   manzu. The service's answer does not depend on which number suit is
//   used, and it mishandles the all-souzu case.
//
// Oracle calls block the caller. A failed call is an `OracleError`, which
// the state machine logs and treats as "cannot claim" for that seat only. A
// winning answer whose cost is negative or above `MAX_CLAIM_COST` counts as a
// failed call too.

use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::round::Wind;
use crate::tile::{Suit, TileId};

/// A full win-pattern question for one seat and one candidate tile.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WinQuery {
    pub man: String,
    pub pin: String,
    pub sou: String,
    pub honors: String,
    pub player_wind: i32,
    pub round_wind: i32,
    pub win_tile_type: String,
    pub win_tile_value: String,
}

impl WinQuery {
    pub fn new(hand: &[TileId], win_tile: TileId, player_wind: Wind, round_wind: Wind) -> Self {
        let mut query = WinQuery {
            player_wind: player_wind.oracle_code(),
            round_wind: round_wind.oracle_code(),
            win_tile_type: win_tile.suit().wire_name().to_owned(),
            win_tile_value: win_tile.rank().to_string(),
            ..WinQuery::default()
        };
        for tile in hand.iter().chain(std::iter::once(&win_tile)) {
            let digits = match tile.suit() {
                Suit::Man => &mut query.man,
                Suit::Pin => &mut query.pin,
                Suit::Sou => &mut query.sou,
                Suit::Honors => &mut query.honors,
            };
            digits.push(char::from(b'0' + tile.rank()));
        }
        if query.sou.len() == hand.len() + 1 && win_tile.suit() == Suit::Sou {
            query.man = std::mem::take(&mut query.sou);
            query.win_tile_type = Suit::Man.wire_name().to_owned();
        }
        query
    }
}

/// Largest cost one claim can be worth.
pub const MAX_CLAIM_COST: i32 = 1_000_000;

/// The oracle's verdict.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WinEvaluation {
    #[serde(rename = "IsPinfu", alias = "isPinfu", default)]
    pub is_winning: bool,
    #[serde(rename = "Cost", alias = "cost", default)]
    pub cost: i32,
}

impl WinEvaluation {
    /// Reject a winning answer with a cost no hand can have.
    pub fn validate(self) -> Result<Self, OracleError> {
        if self.is_winning && !(0..=MAX_CLAIM_COST).contains(&self.cost) {
            return Err(OracleError::InvalidCost(self.cost));
        }
        Ok(self)
    }
}

#[derive(Debug, Error)]
pub enum OracleError {
    #[error("scoring oracle unreachable: {0}")]
    Transport(String),
    #[error("scoring oracle answered HTTP {0}")]
    Status(u16),
    #[error("scoring oracle response unreadable: {0}")]
    Decode(#[from] std::io::Error),
    #[error("scoring oracle returned an out-of-range cost: {0}")]
    InvalidCost(i32),
}

/// Anything that can judge a hand.
pub trait ScoringOracle: Send + Sync {
    fn evaluate(&self, query: &WinQuery) -> Result<WinEvaluation, OracleError>;
}

/// Oracle backed by the HTTP scoring service.
pub struct HttpOracle {
    url: String,
    agent: ureq::Agent,
}

impl HttpOracle {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            url: url.into(),
            agent: ureq::AgentBuilder::new().timeout(timeout).build(),
        }
    }
}

impl ScoringOracle for HttpOracle {
    fn evaluate(&self, query: &WinQuery) -> Result<WinEvaluation, OracleError> {
        let response = match self
            .agent
            .post(&self.url)
            .set("Content-Type", "application/json")
            .send_json(query)
        {
            Ok(response) => response,
            Err(ureq::Error::Status(code, _)) => return Err(OracleError::Status(code)),
            Err(ureq::Error::Transport(transport)) => {
                return Err(OracleError::Transport(transport.to_string()));
            }
        };
        Ok(response.into_json::<WinEvaluation>()?)
    }
}

/// Oracle that gives the same answer to every query. `StaticOracle::never()`
/// runs a table with claims disabled when no scoring service is available.
#[derive(Clone, Copy, Debug, Default)]
pub struct StaticOracle {
    pub answer: WinEvaluation,
}

impl StaticOracle {
    pub fn never() -> Self {
        Self::default()
    }
}

impl ScoringOracle for StaticOracle {
    fn evaluate(&self, _query: &WinQuery) -> Result<WinEvaluation, OracleError> {
        Ok(self.answer)
    }
}

/// Oracle that replays a queue of answers, one per query, and answers
/// "no win" once the queue is empty. Used by tests to decide exactly which
/// seat can claim which discard.
#[derive(Debug, Default)]
pub struct ScriptedOracle {
    answers: Mutex<VecDeque<Option<WinEvaluation>>>,
    queries: Mutex<Vec<WinQuery>>,
}

impl ScriptedOracle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_win(&self, cost: i32) -> &Self {
        self.push(Some(WinEvaluation {
            is_winning: true,
            cost,
        }))
    }

    pub fn push_no_win(&self) -> &Self {
        self.push(Some(WinEvaluation::default()))
    }

    /// The next query fails as if the service were down.
    pub fn push_failure(&self) -> &Self {
        self.push(None)
    }

    fn push(&self, answer: Option<WinEvaluation>) -> &Self {
        self.answers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(answer);
        self
    }

    /// Every query received so far, oldest first.
    pub fn queries(&self) -> Vec<WinQuery> {
        self.queries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl ScoringOracle for ScriptedOracle {
    fn evaluate(&self, query: &WinQuery) -> Result<WinEvaluation, OracleError> {
        self.queries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(query.clone());
        let next = self
            .answers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front();
        match next {
            Some(Some(answer)) => Ok(answer),
            Some(None) => Err(OracleError::Transport("scripted failure".into())),
            None => Ok(WinEvaluation::default()),
        }
    }
}
