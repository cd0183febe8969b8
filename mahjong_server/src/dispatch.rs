// Action dispatch: one client action in, per-seat messages out.
//
// `Table` pairs the game state machine with the scoring oracle and maps each
// decoded `ActionMessage` onto state machine operations, then asks the
// `OutboxBuilder` for the resulting messages. It is called only from the
// server's event loop, so actions from all seats are applied one at a time
// in arrival order.
//
//   start   → new game if none is running, otherwise redeal the round;
//             `start` to every seat
//   discard → discard, check claims; `discard` / `discardOther`, then
//             `drawn` (or `drawnRound`) if nobody can claim
//   ron     → settle the claim; `ron` to every seat
//   skip    → decline the claim; `skip` to the skipper, then `drawn` once
//             no claims remain
//   next    → acknowledge the round outcome; `next` or `result` once the
//             gate opens
//   result  → `result` for the current standings
//
// Rejected actions (wrong phase, wrong seat) come back as `DispatchError`
// and produce no messages.

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info};

use mahjong_game::{Delivery, GameError, GameStateMachine, OutboxBuilder, ScoringOracle};
use mahjong_protocol::{ActionMessage, MessageType, Operation, SeatIndex};

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error(transparent)]
    Game(#[from] GameError),
    #[error("could not build outbound message: {0}")]
    Encode(#[from] serde_json::Error),
}

pub struct Table {
    game: GameStateMachine,
    oracle: Arc<dyn ScoringOracle>,
}

impl Table {
    pub fn new(game: GameStateMachine, oracle: Arc<dyn ScoringOracle>) -> Self {
        Self { game, oracle }
    }

    pub fn game(&self) -> &GameStateMachine {
        &self.game
    }

    /// Apply one action from `seat`.
    pub fn handle_action(
        &mut self,
        seat: SeatIndex,
        action: &ActionMessage,
    ) -> Result<Vec<Delivery>, DispatchError> {
        debug!(%seat, operation = action.operation.as_str(), target = action.target, "action");
        match &action.operation {
            Operation::Start => self.start(),
            Operation::Discard => self.discard(seat, action.target),
            Operation::Ron => {
                let settled = self.game.resolve_claim(seat)?;
                Ok(self.outbox().ron(&settled)?)
            }
            Operation::Skip => {
                self.game.skip(seat)?;
                let mut out = vec![self.outbox().skipped(seat)?];
                if !self.game.has_pending_claims() {
                    let advance = self.game.advance_turn()?;
                    out.extend(self.outbox().turn_advance(advance)?);
                }
                Ok(out)
            }
            Operation::Next => match self.game.confirm_next(seat)? {
                Some(advance) => Ok(self.outbox().round_advance(&advance)?),
                None => Ok(Vec::new()),
            },
            Operation::Result => {
                let results = self.game.compute_final_result();
                Ok(self.outbox().result(&results)?)
            }
            Operation::Unknown(op) => {
                info!(%seat, operation = %op, "unrecognized operation ignored");
                Ok(Vec::new())
            }
        }
    }

    /// The fourth seat just registered. Starts a game unless one is running.
    pub fn on_table_full(&mut self) -> Result<Vec<Delivery>, DispatchError> {
        if self.game.is_in_progress() {
            return Ok(Vec::new());
        }
        self.game.init_game()?;
        Ok(self.outbox().play(MessageType::Start)?)
    }

    /// Full view for a seat that (re)joined a game already in progress.
    pub fn resync(&self, seat: SeatIndex) -> Result<Option<Delivery>, DispatchError> {
        if !self.game.is_in_progress() {
            return Ok(None);
        }
        Ok(Some(self.outbox().play_for(seat, MessageType::Start)?))
    }

    fn start(&mut self) -> Result<Vec<Delivery>, DispatchError> {
        if self.game.is_in_progress() {
            self.game.init_round()?;
        } else {
            self.game.init_game()?;
        }
        Ok(self.outbox().play(MessageType::Start)?)
    }

    fn discard(&mut self, seat: SeatIndex, position: i32) -> Result<Vec<Delivery>, DispatchError> {
        let tile = self.game.discard(seat, position)?;
        let discarder = self.game.acting_seat();
        let claimable = self.game.check_claims(tile, self.oracle.as_ref());
        let mut out = self.outbox().discarded(discarder, tile)?;
        if !claimable {
            let advance = self.game.advance_turn()?;
            out.extend(self.outbox().turn_advance(advance)?);
        }
        Ok(out)
    }

    fn outbox(&self) -> OutboxBuilder<'_> {
        OutboxBuilder::new(&self.game)
    }
}
