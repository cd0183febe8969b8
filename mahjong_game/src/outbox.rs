// Per-seat outbound payloads.
//
// `OutboxBuilder` borrows the state machine and turns its current state into
// one `OutboundMessage` per receiving seat. It never mutates anything and
// never caches: callers build a fresh outbox after every transition.
//
// Every list in a payload is rotated to the receiver: index 0 is the
// receiver itself and indices 1..3 follow in turn order. Seat-relative
// fields (`playerPosition`) use the same rotation, so a client can render
// any payload without knowing its own seat number. Empty tile slots are
// sent as -1.

use serde::Serialize;

use mahjong_protocol::{MessageType, OutboundMessage, SEAT_COUNT, SeatIndex};

use crate::game::{GameStateMachine, RonSettlement, RoundAdvance, TurnAdvance};
use crate::round::{RoundState, Wind};
use crate::settlement::FinalResult;
use crate::tile::{TileId, wire_tile};

/// The receiver's own seat.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerView {
    pub player_id: u8,
    pub wind: Wind,
    pub hands: Vec<i32>,
    pub drawn_tile: i32,
    /// Last tile discarded by the seat just before the receiver.
    pub discarded_tile_up: i32,
    pub can_ron: bool,
}

/// Full table view sent with `start` and `next`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayInfo {
    pub round: RoundState,
    pub player_info: PlayerView,
    pub player_ids: Vec<u8>,
    pub winds: Vec<Wind>,
    pub points: Vec<i32>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscardOtherInfo {
    pub player_position: usize,
    pub discarded_tile: i32,
    pub can_ron: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PointChange {
    pub point: i32,
    pub point_diff: i32,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DrawnRoundInfo {
    pub ron_info: Vec<PointChange>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkipInfo {
    pub player_position: usize,
}

/// One message addressed to one seat.
#[derive(Clone, Debug, PartialEq)]
pub struct Delivery {
    pub seat: SeatIndex,
    pub message: OutboundMessage,
}

/// Rotate a seat-indexed array so the viewer comes first.
fn rotate<T: Clone>(viewer: SeatIndex, by_seat: &[T; SEAT_COUNT]) -> Vec<T> {
    (0..SEAT_COUNT)
        .map(|pos| by_seat[SeatIndex::at_position(viewer, pos).index()].clone())
        .collect()
}

pub struct OutboxBuilder<'a> {
    game: &'a GameStateMachine,
}

impl<'a> OutboxBuilder<'a> {
    pub fn new(game: &'a GameStateMachine) -> Self {
        Self { game }
    }

    pub fn player_view(&self, seat: SeatIndex) -> PlayerView {
        let player = self.game.player(seat);
        let upper = SeatIndex::at_position(seat, SEAT_COUNT - 1);
        PlayerView {
            player_id: seat.0,
            wind: player.wind,
            hands: player.hand.iter().map(|t| wire_tile(Some(*t))).collect(),
            drawn_tile: wire_tile(player.drawn),
            discarded_tile_up: wire_tile(self.game.player(upper).last_discard),
            can_ron: player.can_claim(),
        }
    }

    pub fn play_info(&self, seat: SeatIndex) -> PlayInfo {
        let players = self.game.players();
        PlayInfo {
            round: self.game.round(),
            player_info: self.player_view(seat),
            player_ids: rotate(seat, &SeatIndex::ALL).into_iter().map(|s| s.0).collect(),
            winds: rotate(seat, &players.each_ref().map(|p| p.wind)),
            points: rotate(seat, &self.game.points()),
        }
    }

    /// Full view for one seat: used for `start`, `next`, and to resync a
    /// seat that reconnected mid-game.
    pub fn play_for(&self, seat: SeatIndex, kind: MessageType) -> serde_json::Result<Delivery> {
        Ok(Delivery {
            seat,
            message: OutboundMessage::new(kind, &self.play_info(seat))?,
        })
    }

    /// Full view for every seat.
    pub fn play(&self, kind: MessageType) -> serde_json::Result<Vec<Delivery>> {
        SeatIndex::ALL
            .into_iter()
            .map(|seat| self.play_for(seat, kind))
            .collect()
    }

    /// After a discard: the discarder sees its new hand, every other seat
    /// sees the discarded tile and whether it may claim it.
    pub fn discarded(
        &self,
        discarder: SeatIndex,
        tile: TileId,
    ) -> serde_json::Result<Vec<Delivery>> {
        SeatIndex::ALL
            .into_iter()
            .map(|seat| {
                let message = if seat == discarder {
                    OutboundMessage::new(MessageType::Discard, &self.player_view(seat))?
                } else {
                    let info = DiscardOtherInfo {
                        player_position: discarder.relative_to(seat),
                        discarded_tile: wire_tile(Some(tile)),
                        can_ron: self.game.player(seat).can_claim(),
                    };
                    OutboundMessage::new(MessageType::DiscardOther, &info)?
                };
                Ok(Delivery { seat, message })
            })
            .collect()
    }

    /// The acting seat's view after it drew.
    pub fn drawn(&self, seat: SeatIndex) -> serde_json::Result<Delivery> {
        Ok(Delivery {
            seat,
            message: OutboundMessage::new(MessageType::Drawn, &self.player_view(seat))?,
        })
    }

    pub fn turn_advance(&self, advance: TurnAdvance) -> serde_json::Result<Vec<Delivery>> {
        match advance {
            TurnAdvance::Drew { seat, .. } => Ok(vec![self.drawn(seat)?]),
            TurnAdvance::Exhausted => self.drawn_round(),
        }
    }

    /// Confirmation to a seat that declined its claim.
    pub fn skipped(&self, seat: SeatIndex) -> serde_json::Result<Delivery> {
        Ok(Delivery {
            seat,
            message: OutboundMessage::new(MessageType::Skip, &SkipInfo { player_position: 0 })?,
        })
    }

    /// Point changes from a settled claim, to every seat.
    pub fn ron(&self, settled: &RonSettlement) -> serde_json::Result<Vec<Delivery>> {
        let changes: [PointChange; SEAT_COUNT] = SeatIndex::ALL.map(|seat| PointChange {
            point: settled.points_after[seat.index()],
            point_diff: settled.deltas[seat.index()],
        });
        self.to_every_seat(MessageType::Ron, &changes)
    }

    /// Drawn round: standings with no point changes.
    pub fn drawn_round(&self) -> serde_json::Result<Vec<Delivery>> {
        let points = self.game.points();
        let changes: [PointChange; SEAT_COUNT] = SeatIndex::ALL.map(|seat| PointChange {
            point: points[seat.index()],
            point_diff: 0,
        });
        SeatIndex::ALL
            .into_iter()
            .map(|seat| {
                let info = DrawnRoundInfo {
                    ron_info: rotate(seat, &changes),
                };
                Ok(Delivery {
                    seat,
                    message: OutboundMessage::new(MessageType::DrawnRound, &info)?,
                })
            })
            .collect()
    }

    pub fn result(&self, results: &[FinalResult; SEAT_COUNT]) -> serde_json::Result<Vec<Delivery>> {
        self.to_every_seat(MessageType::Result, results)
    }

    pub fn round_advance(&self, advance: &RoundAdvance) -> serde_json::Result<Vec<Delivery>> {
        match advance {
            RoundAdvance::NextRound => self.play(MessageType::Next),
            RoundAdvance::GameOver(results) => self.result(results),
        }
    }

    fn to_every_seat<T: Clone + Serialize>(
        &self,
        kind: MessageType,
        by_seat: &[T; SEAT_COUNT],
    ) -> serde_json::Result<Vec<Delivery>> {
        SeatIndex::ALL
            .into_iter()
            .map(|seat| {
                Ok(Delivery {
                    seat,
                    message: OutboundMessage::new(kind, &rotate(seat, by_seat))?,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::config::GameConfig;
    use crate::oracle::{ScriptedOracle, StaticOracle};
    use mahjong_prng::GameRng;

    fn dealt() -> GameStateMachine {
        let mut game = GameStateMachine::new(GameConfig::default(), GameRng::new(42));
        game.init_game().unwrap();
        game
    }

    fn for_seat(deliveries: &[Delivery], seat: u8) -> &OutboundMessage {
        &deliveries
            .iter()
            .find(|d| d.seat == SeatIndex(seat))
            .unwrap()
            .message
    }

    #[test]
    fn start_views_are_rotated_per_seat() {
        let game = dealt();
        let out = OutboxBuilder::new(&game).play(MessageType::Start).unwrap();
        assert_eq!(out.len(), SEAT_COUNT);

        let seat2 = &for_seat(&out, 2).values;
        assert_eq!(seat2["playerIds"], json!([2, 3, 0, 1]));
        assert_eq!(seat2["winds"], json!([3, 4, 1, 2]));
        assert_eq!(seat2["points"], json!([25000, 25000, 25000, 25000]));
        assert_eq!(seat2["round"], json!({"wind": 1, "round": 1, "subRound": 0}));
        assert_eq!(seat2["playerInfo"]["playerId"], 2);
        assert_eq!(seat2["playerInfo"]["drawnTile"], -1);
        assert_eq!(seat2["playerInfo"]["hands"].as_array().unwrap().len(), 13);

        let dealer = &for_seat(&out, 0).values;
        assert_ne!(dealer["playerInfo"]["drawnTile"], -1);
        assert_eq!(for_seat(&out, 0).kind, MessageType::Start);
    }

    #[test]
    fn discard_goes_to_discarder_and_others_differently() {
        let mut game = dealt();
        let tile = game.discard(SeatIndex(0), -1).unwrap();
        let oracle = ScriptedOracle::new();
        oracle.push_no_win().push_win(1000);
        game.check_claims(tile, &oracle);

        let out = OutboxBuilder::new(&game).discarded(SeatIndex(0), tile).unwrap();
        assert_eq!(for_seat(&out, 0).kind, MessageType::Discard);
        assert_eq!(for_seat(&out, 0).values["drawnTile"], -1);

        let seat1 = for_seat(&out, 1);
        assert_eq!(seat1.kind, MessageType::DiscardOther);
        assert_eq!(
            seat1.values,
            json!({"playerPosition": 3, "discardedTile": tile.0, "canRon": false})
        );
        assert_eq!(for_seat(&out, 2).values["canRon"], true);
        assert_eq!(for_seat(&out, 2).values["playerPosition"], 2);
        assert_eq!(for_seat(&out, 3).values["playerPosition"], 1);
    }

    #[test]
    fn drawn_shows_upper_seats_discard() {
        let mut game = dealt();
        let tile = game.discard(SeatIndex(0), 0).unwrap();
        game.check_claims(tile, &StaticOracle::never());
        let advance = game.advance_turn().unwrap();

        let out = OutboxBuilder::new(&game).turn_advance(advance).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].seat, SeatIndex(1));
        assert_eq!(out[0].message.kind, MessageType::Drawn);
        assert_eq!(out[0].message.values["discardedTileUp"], tile.0);
        assert_ne!(out[0].message.values["drawnTile"], -1);
    }

    #[test]
    fn ron_lists_are_rotated() {
        let mut game = dealt();
        let tile = game.discard(SeatIndex(0), -1).unwrap();
        let oracle = ScriptedOracle::new();
        oracle.push_no_win().push_win(1000);
        game.check_claims(tile, &oracle);
        let settled = game.resolve_claim(SeatIndex(2)).unwrap();

        let out = OutboxBuilder::new(&game).ron(&settled).unwrap();
        assert_eq!(
            for_seat(&out, 2).values,
            json!([
                {"point": 26000, "pointDiff": 1000},
                {"point": 25000, "pointDiff": 0},
                {"point": 24000, "pointDiff": -1000},
                {"point": 25000, "pointDiff": 0},
            ])
        );
        assert_eq!(for_seat(&out, 0).values[0]["pointDiff"], -1000);
    }

    #[test]
    fn drawn_round_reports_unchanged_points() {
        let game = dealt();
        let out = OutboxBuilder::new(&game).drawn_round().unwrap();
        for d in &out {
            assert_eq!(d.message.kind, MessageType::DrawnRound);
            let info = d.message.values["ronInfo"].as_array().unwrap();
            assert_eq!(info.len(), SEAT_COUNT);
            assert!(info.iter().all(|c| c["pointDiff"] == 0 && c["point"] == 25000));
        }
    }

    #[test]
    fn result_rotates_final_standings() {
        let game = dealt();
        let results = [
            FinalResult { point: 40, order: 1 },
            FinalResult { point: -15, order: 3 },
            FinalResult { point: 5, order: 2 },
            FinalResult { point: -30, order: 4 },
        ];
        let out = OutboxBuilder::new(&game).result(&results).unwrap();
        assert_eq!(for_seat(&out, 3).values[0], json!({"point": -30, "order": 4}));
        assert_eq!(for_seat(&out, 3).values[1], json!({"point": 40, "order": 1}));
    }

    #[test]
    fn skip_is_addressed_to_the_skipper() {
        let game = dealt();
        let d = OutboxBuilder::new(&game).skipped(SeatIndex(3)).unwrap();
        assert_eq!(d.seat, SeatIndex(3));
        assert_eq!(d.message.values, json!({"playerPosition": 0}));
    }
}
