// Per-seat state.
//
// A `PlayerState` lives for the whole session. Points, seat wind, and the
// first-win order survive between rounds; the hand, drawn tile, river,
// last discard, and pending claim are reset by `reset_for_round`.

use mahjong_protocol::SeatIndex;

use crate::round::Wind;
use crate::tile::TileId;

/// A seat's right to claim the tile just discarded, as reported by the
/// scoring oracle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PendingClaim {
    pub cost: i32,
}

#[derive(Clone, Debug)]
pub struct PlayerState {
    pub seat: SeatIndex,
    pub points: i32,
    pub wind: Wind,
    /// Order in which this seat first won a hand this game (1 = first).
    /// Only used to break ties in the final settlement.
    pub first_win_order: Option<u8>,
    /// Always sorted ascending.
    pub hand: Vec<TileId>,
    pub drawn: Option<TileId>,
    pub last_discard: Option<TileId>,
    /// Every tile this seat discarded this round, oldest first.
    pub river: Vec<TileId>,
    pub claim: Option<PendingClaim>,
}

impl PlayerState {
    pub fn new(seat: SeatIndex, points: i32) -> Self {
        Self {
            seat,
            points,
            wind: Wind::initial_for_seat(seat),
            first_win_order: None,
            hand: Vec::new(),
            drawn: None,
            last_discard: None,
            river: Vec::new(),
            claim: None,
        }
    }

    /// Clear everything that only lives for one round.
    pub fn reset_for_round(&mut self) {
        self.hand.clear();
        self.drawn = None;
        self.last_discard = None;
        self.river.clear();
        self.claim = None;
    }

    pub fn can_claim(&self) -> bool {
        self.claim.is_some()
    }

    pub fn has_won(&self) -> bool {
        self.first_win_order.is_some()
    }

    /// Swap the tile at `position` for the drawn tile, or give up the drawn
    /// tile itself when `position` is out of range. Returns the tile that
    /// left the hand, or `None` if nothing was drawn.
    pub fn discard_at(&mut self, position: i32) -> Option<TileId> {
        let drawn = self.drawn.take()?;
        let slot = usize::try_from(position)
            .ok()
            .filter(|p| *p < self.hand.len());
        let discarded = match slot {
            Some(p) => {
                let tile = self.hand[p];
                self.hand[p] = drawn;
                self.hand.sort_unstable();
                tile
            }
            None => drawn,
        };
        self.last_discard = Some(discarded);
        self.river.push(discarded);
        Some(discarded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn player_with_hand() -> PlayerState {
        let mut p = PlayerState::new(SeatIndex(1), 25_000);
        p.hand = vec![TileId(4), TileId(20), TileId(90)];
        p.drawn = Some(TileId(50));
        p
    }

    #[test]
    fn discard_in_range_swaps_and_sorts() {
        let mut p = player_with_hand();
        assert_eq!(p.discard_at(0), Some(TileId(4)));
        assert_eq!(p.hand, [TileId(20), TileId(50), TileId(90)]);
        assert_eq!(p.drawn, None);
        assert_eq!(p.last_discard, Some(TileId(4)));
        assert_eq!(p.river, [TileId(4)]);
    }

    #[test]
    fn discard_out_of_range_gives_up_drawn_tile() {
        for position in [-1, 3, 99] {
            let mut p = player_with_hand();
            assert_eq!(p.discard_at(position), Some(TileId(50)));
            assert_eq!(p.hand, [TileId(4), TileId(20), TileId(90)]);
            assert_eq!(p.drawn, None);
        }
    }

    #[test]
    fn discard_without_drawn_tile_does_nothing() {
        let mut p = player_with_hand();
        p.drawn = None;
        assert_eq!(p.discard_at(0), None);
        assert_eq!(p.hand.len(), 3);
        assert!(p.river.is_empty());
    }

    #[test]
    fn reset_keeps_points_and_wind() {
        let mut p = player_with_hand();
        p.points = 31_000;
        p.first_win_order = Some(1);
        p.claim = Some(PendingClaim { cost: 1000 });
        p.reset_for_round();
        assert!(p.hand.is_empty());
        assert!(!p.can_claim());
        assert_eq!(p.points, 31_000);
        assert_eq!(p.wind, Wind::South);
        assert!(p.has_won());
    }
}
