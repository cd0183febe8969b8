// The table state machine.
//
// `GameStateMachine` owns everything that makes up one game in progress: the
// mount, the four `PlayerState`s, the `RoundState`, the acting seat, the
// current `Phase`, and the next-round `ConfirmationGate`. It is a plain value
// with `&mut self` operations; the server keeps exactly one and drives it from
// a single event-loop thread, so there is no locking here beyond the gate.
//
// Turn cycle:
//
//   init_round ─► AwaitingDiscard ─discard─► ClaimCheck ─check_claims─┐
//        ▲              ▲                                             │
//        │              └──────────── advance_turn ◄── no claims ◄────┤
//        │                                 │                          │
//        │                     mount empty │      AwaitingClaims ◄────┘
//        │                                 ▼        │ skip (last) ─► advance_turn
//        │                    AwaitingNextConfirm ◄─┘ resolve_claim (ron)
//        │                                 │
//        └──── confirm_next (AdvanceRound) ┤
//                                          └─ confirm_next (ComputeResult) ─► GameOver
//
// Every tile is always in exactly one place: the undrawn part of the mount,
// one seat's hand, one seat's drawn slot, or one seat's river. The claimed
// tile of a ron stays in the discarder's river.
//
// Dealer rules: the seat whose wind is East deals. A dealer win repeats the
// round (`sub_round` += 1, same dealer, same round number). Any other win
// and every drawn round rotate the dealer: all seat winds shift, the round
// number advances, and `sub_round` resets. Each claim pays
// `cost + repeat_bonus * sub_round` from the discarder to the winner.
//
// The game ends after the last round of `GameConfig::final_wind` unless the
// dealer just won, or all four seats hold equal points (in which case play
// continues into the next wind, never past North).

use tracing::{debug, info, warn};

use mahjong_prng::GameRng;
use mahjong_protocol::{SEAT_COUNT, SeatIndex};
use thiserror::Error;

use crate::config::GameConfig;
use crate::gate::{ConfirmationGate, NextTransition};
use crate::mount::{MountError, TileMount};
use crate::oracle::{ScoringOracle, WinEvaluation, WinQuery};
use crate::player::{PendingClaim, PlayerState};
use crate::round::{RoundState, Wind};
use crate::settlement::{self, FinalResult};
use crate::tile::{HAND_SIZE, TileId};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    /// No game dealt yet.
    Idle,
    /// The acting seat holds a drawn tile and must discard.
    AwaitingDiscard,
    /// A tile was discarded; claims have not been checked yet, or nobody
    /// can claim it.
    ClaimCheck { discarder: SeatIndex, tile: TileId },
    /// At least one seat may claim the discard and has not answered.
    AwaitingClaims { discarder: SeatIndex, tile: TileId },
    /// The round ended; waiting on the confirmation gate.
    AwaitingNextConfirm,
    /// Final results have been computed.
    GameOver,
}

#[derive(Debug, Error)]
pub enum GameError {
    #[error("cannot {operation} during {phase:?}")]
    WrongPhase {
        operation: &'static str,
        phase: Phase,
    },
    #[error("{seat} is not the acting seat ({acting} is)")]
    NotActingSeat { seat: SeatIndex, acting: SeatIndex },
    #[error("{0} has no pending claim")]
    NoClaim(SeatIndex),
    #[error("claims on the last discard are still pending")]
    ClaimsPending,
    #[error("{0} has no drawn tile to discard")]
    NoDrawnTile(SeatIndex),
    #[error(transparent)]
    Mount(#[from] MountError),
}

/// How the last round ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RoundOutcome {
    Won { winner: SeatIndex, dealer_won: bool },
    Drawn,
}

/// Result of `advance_turn`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TurnAdvance {
    /// `seat` is now acting and drew `tile`.
    Drew { seat: SeatIndex, tile: TileId },
    /// The mount ran out; the round is drawn.
    Exhausted,
}

/// Point transfer from a settled claim.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RonSettlement {
    pub winner: SeatIndex,
    pub discarder: SeatIndex,
    pub tile: TileId,
    pub amount: i32,
    /// Change per seat, indexed by seat.
    pub deltas: [i32; SEAT_COUNT],
    pub points_after: [i32; SEAT_COUNT],
    pub dealer_won: bool,
}

/// Result of moving past a finished round.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RoundAdvance {
    /// The next round has been dealt.
    NextRound,
    /// The game is over, with final results indexed by seat.
    GameOver([FinalResult; SEAT_COUNT]),
}

pub struct GameStateMachine {
    config: GameConfig,
    rng: GameRng,
    mount: TileMount,
    players: [PlayerState; SEAT_COUNT],
    round: RoundState,
    acting: SeatIndex,
    phase: Phase,
    last_outcome: Option<RoundOutcome>,
    gate: ConfirmationGate,
}

impl GameStateMachine {
    /// A fresh table in `Phase::Idle`. Nothing is dealt until `init_game`.
    pub fn new(config: GameConfig, rng: GameRng) -> Self {
        let players = SeatIndex::ALL.map(|seat| PlayerState::new(seat, config.starting_points));
        Self {
            mount: TileMount::new(config.dead_wall),
            gate: ConfirmationGate::new(config.confirmations_required),
            config,
            rng,
            players,
            round: RoundState::new(),
            acting: SeatIndex(0),
            phase: Phase::Idle,
            last_outcome: None,
        }
    }

    /// Reset points, winds, and round to the start of a game, then deal.
    pub fn init_game(&mut self) -> Result<(), GameError> {
        info!("starting a new game");
        self.round = RoundState::new();
        self.last_outcome = None;
        for player in &mut self.players {
            *player = PlayerState::new(player.seat, self.config.starting_points);
        }
        self.init_round()
    }

    /// Reshuffle, deal 13 tiles to each seat starting from the dealer, and
    /// give the dealer its first draw.
    pub fn init_round(&mut self) -> Result<(), GameError> {
        self.gate.cancel();
        self.mount.shuffle(&mut self.rng);
        for player in &mut self.players {
            player.reset_for_round();
        }

        let dealer = self.dealer();
        for _ in 0..HAND_SIZE {
            for offset in 0..SEAT_COUNT {
                let seat = SeatIndex::at_position(dealer, offset);
                let tile = self.mount.draw()?;
                self.players[seat.index()].hand.push(tile);
            }
        }
        for player in &mut self.players {
            player.hand.sort_unstable();
        }

        self.acting = dealer;
        self.players[dealer.index()].drawn = Some(self.mount.draw()?);
        self.phase = Phase::AwaitingDiscard;
        info!(
            wind = ?self.round.wind,
            round = self.round.round,
            sub_round = self.round.sub_round,
            %dealer,
            "round dealt"
        );
        Ok(())
    }

    /// Discard for the acting seat. `position` picks a hand tile to swap out
    /// for the drawn tile; anything out of range discards the drawn tile.
    ///
    /// With `enforce_turn_order` off, `seat` is not checked and the acting
    /// seat always discards.
    pub fn discard(&mut self, seat: SeatIndex, position: i32) -> Result<TileId, GameError> {
        self.expect_phase("discard", |p| matches!(p, Phase::AwaitingDiscard))?;
        if self.config.enforce_turn_order && seat != self.acting {
            return Err(GameError::NotActingSeat {
                seat,
                acting: self.acting,
            });
        }
        let discarder = self.acting;
        let tile = self.players[discarder.index()]
            .discard_at(position)
            .ok_or(GameError::NoDrawnTile(discarder))?;
        debug!(seat = %discarder, tile = tile.0, position, "discard");
        self.phase = Phase::ClaimCheck { discarder, tile };
        Ok(tile)
    }

    /// Ask the oracle, for every seat but the discarder, whether `tile`
    /// completes its hand. Records a `PendingClaim` for each seat that can
    /// claim and returns whether any can. A failed oracle call only costs
    /// that seat its chance to claim.
    pub fn check_claims(&mut self, tile: TileId, oracle: &dyn ScoringOracle) -> bool {
        let discarder = self.acting;
        let round_wind = self.round.wind;
        let mut any = false;
        for offset in 1..SEAT_COUNT {
            let seat = SeatIndex::at_position(discarder, offset);
            let player = &mut self.players[seat.index()];
            let query = WinQuery::new(&player.hand, tile, player.wind, round_wind);
            player.claim = match oracle.evaluate(&query).and_then(WinEvaluation::validate) {
                Ok(eval) if eval.is_winning => {
                    info!(%seat, tile = tile.0, cost = eval.cost, "seat can claim discard");
                    Some(PendingClaim { cost: eval.cost })
                }
                Ok(_) => None,
                Err(e) => {
                    warn!(%seat, tile = tile.0, error = %e, "scoring oracle failed; claim denied");
                    None
                }
            };
            any |= player.claim.is_some();
        }
        if any {
            self.phase = Phase::AwaitingClaims { discarder, tile };
        }
        any
    }

    /// Pass the turn to the next seat and draw for it. If the mount is
    /// exhausted the round ends as a drawn round instead.
    pub fn advance_turn(&mut self) -> Result<TurnAdvance, GameError> {
        match self.phase {
            Phase::ClaimCheck { .. } => {}
            Phase::AwaitingClaims { .. } if !self.has_pending_claims() => {}
            Phase::AwaitingClaims { .. } => return Err(GameError::ClaimsPending),
            phase => {
                return Err(GameError::WrongPhase {
                    operation: "advance the turn",
                    phase,
                });
            }
        }

        self.acting = self.acting.next();
        match self.mount.draw() {
            Ok(tile) => {
                self.players[self.acting.index()].drawn = Some(tile);
                self.phase = Phase::AwaitingDiscard;
                debug!(seat = %self.acting, tile = tile.0, remaining = self.mount.remaining(), "draw");
                Ok(TurnAdvance::Drew {
                    seat: self.acting,
                    tile,
                })
            }
            Err(MountError::Exhausted) => {
                info!("mount exhausted; drawn round");
                self.finish_round(RoundOutcome::Drawn);
                Ok(TurnAdvance::Exhausted)
            }
        }
    }

    /// Decline `seat`'s pending claim. When the last claim is declined the
    /// caller should `advance_turn`.
    pub fn skip(&mut self, seat: SeatIndex) -> Result<(), GameError> {
        self.expect_phase("skip", |p| matches!(p, Phase::AwaitingClaims { .. }))?;
        let player = &mut self.players[seat.index()];
        if player.claim.take().is_none() {
            return Err(GameError::NoClaim(seat));
        }
        debug!(%seat, "claim skipped");
        Ok(())
    }

    /// Settle `seat`'s claim on the last discard: the discarder pays the
    /// claim cost plus the repeat bonus. Every other pending claim is dropped
    /// and the round ends.
    pub fn resolve_claim(&mut self, seat: SeatIndex) -> Result<RonSettlement, GameError> {
        let Phase::AwaitingClaims { discarder, tile } = self.phase else {
            return Err(GameError::WrongPhase {
                operation: "claim",
                phase: self.phase,
            });
        };
        let claim = self.players[seat.index()]
            .claim
            .ok_or(GameError::NoClaim(seat))?;

        let sub_round = i32::try_from(self.round.sub_round).unwrap_or(i32::MAX);
        let amount = claim
            .cost
            .saturating_add(self.config.repeat_bonus.saturating_mul(sub_round));
        let mut deltas = [0; SEAT_COUNT];
        deltas[seat.index()] = amount;
        deltas[discarder.index()] = amount.saturating_neg();
        for (player, delta) in self.players.iter_mut().zip(deltas) {
            player.points = player.points.saturating_add(delta);
            player.claim = None;
        }

        let dealer_won = seat == self.dealer();
        self.settle_tiebreak(seat);
        info!(winner = %seat, %discarder, tile = tile.0, amount, dealer_won, "claim settled");
        self.finish_round(RoundOutcome::Won {
            winner: seat,
            dealer_won,
        });

        Ok(RonSettlement {
            winner: seat,
            discarder,
            tile,
            amount,
            deltas,
            points_after: self.points(),
            dealer_won,
        })
    }

    /// Give `seat` the next first-win order unless it already has one.
    pub fn settle_tiebreak(&mut self, seat: SeatIndex) {
        if self.players[seat.index()].has_won() {
            return;
        }
        let max = self
            .players
            .iter()
            .filter_map(|p| p.first_win_order)
            .max()
            .unwrap_or(0);
        self.players[seat.index()].first_win_order = Some(max + 1);
    }

    /// Whether the game goes on after the round that just ended.
    pub fn will_continue(&self) -> bool {
        if matches!(
            self.last_outcome,
            Some(RoundOutcome::Won {
                dealer_won: true,
                ..
            })
        ) {
            return true;
        }
        let final_reached =
            self.round.is_final_round() && self.round.wind >= self.config.final_wind;
        !final_reached || (settlement::is_even(&self.points()) && self.round.wind != Wind::North)
    }

    /// Move past a finished round: repeat the dealer or rotate it and deal
    /// the next round, or end the game.
    pub fn advance_round_or_game(&mut self) -> Result<RoundAdvance, GameError> {
        if !self.will_continue() {
            self.phase = Phase::GameOver;
            let results = self.compute_final_result();
            info!(?results, "game over");
            return Ok(RoundAdvance::GameOver(results));
        }

        let repeat = matches!(
            self.last_outcome,
            Some(RoundOutcome::Won {
                dealer_won: true,
                ..
            })
        );
        if repeat {
            self.round.sub_round += 1;
        } else {
            for player in &mut self.players {
                player.wind = player.wind.after_dealer_rotation();
            }
            self.round.advance();
        }
        self.last_outcome = None;
        self.init_round()?;
        Ok(RoundAdvance::NextRound)
    }

    /// Final settlement of the current standings. Does not change phase.
    pub fn compute_final_result(&self) -> [FinalResult; SEAT_COUNT] {
        settlement::final_results(
            self.points(),
            self.players.each_ref().map(|p| p.first_win_order),
            &self.config,
        )
    }

    /// `seat` acknowledged the round outcome. Runs the waiting transition if
    /// this completes the gate's quorum; `None` otherwise.
    pub fn confirm_next(&mut self, seat: SeatIndex) -> Result<Option<RoundAdvance>, GameError> {
        let Some(transition) = self.gate.trigger_if_awaited(seat) else {
            debug!(%seat, "next ignored; gate not ready");
            return Ok(None);
        };
        match transition {
            NextTransition::AdvanceRound => self.advance_round_or_game().map(Some),
            NextTransition::ComputeResult => {
                self.phase = Phase::GameOver;
                Ok(Some(RoundAdvance::GameOver(self.compute_final_result())))
            }
        }
    }

    fn finish_round(&mut self, outcome: RoundOutcome) {
        self.last_outcome = Some(outcome);
        self.phase = Phase::AwaitingNextConfirm;
        let transition = if self.will_continue() {
            NextTransition::AdvanceRound
        } else {
            NextTransition::ComputeResult
        };
        self.gate.await_confirm(transition);
    }

    fn expect_phase(
        &self,
        operation: &'static str,
        allowed: impl Fn(&Phase) -> bool,
    ) -> Result<(), GameError> {
        if allowed(&self.phase) {
            Ok(())
        } else {
            Err(GameError::WrongPhase {
                operation,
                phase: self.phase,
            })
        }
    }

    // --- Accessors ---

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn round(&self) -> RoundState {
        self.round
    }

    pub fn acting_seat(&self) -> SeatIndex {
        self.acting
    }

    /// The seat currently holding East.
    pub fn dealer(&self) -> SeatIndex {
        self.players
            .iter()
            .find(|p| p.wind == Wind::East)
            .map_or(SeatIndex(0), |p| p.seat)
    }

    pub fn player(&self, seat: SeatIndex) -> &PlayerState {
        &self.players[seat.index()]
    }

    pub fn players(&self) -> &[PlayerState; SEAT_COUNT] {
        &self.players
    }

    /// Points indexed by seat.
    pub fn points(&self) -> [i32; SEAT_COUNT] {
        self.players.each_ref().map(|p| p.points)
    }

    pub fn mount(&self) -> &TileMount {
        &self.mount
    }

    pub fn gate(&self) -> &ConfirmationGate {
        &self.gate
    }

    pub fn last_outcome(&self) -> Option<RoundOutcome> {
        self.last_outcome
    }

    pub fn has_pending_claims(&self) -> bool {
        self.players.iter().any(PlayerState::can_claim)
    }

    pub fn is_in_progress(&self) -> bool {
        !matches!(self.phase, Phase::Idle | Phase::GameOver)
    }
}
