// End-of-game settlement.
//
// Converts final point totals into settlement scores:
//
// 1. Each seat gets a ranking score: its points, plus
//    `(tiebreak_order_base - first_win_order) * tiebreak_order_weight`
//    (seats that never won use order 5), minus its seat index. The extra
//    terms are smaller than one settlement unit and only decide ties.
// 2. Seats are ranked by ranking score, highest first.
// 3. Every seat except the top one is converted to units:
//    `(score + rounding_offset) / point_unit - return_points / point_unit`,
//    truncating.
// 4. The top seat takes the negated sum of the others, so the four
//    settlement scores always sum to zero.
// 5. The uma for each finishing rank is added. Uma also sums to zero.
//
// When all four seats hold exactly the same points the game is even and
// every seat settles at `{point: 0, order: 0}`.

use serde::Serialize;

use mahjong_protocol::{SEAT_COUNT, SeatIndex};

use crate::config::GameConfig;

/// First-win order assumed for a seat that never won.
const NEVER_WON_ORDER: i32 = SEAT_COUNT as i32 + 1;

/// One seat's settlement.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct FinalResult {
    pub point: i32,
    /// Finishing rank, 1..=4; 0 in an even game.
    pub order: u8,
}

/// True when every seat has the same points.
pub fn is_even(points: &[i32; SEAT_COUNT]) -> bool {
    points.iter().all(|p| *p == points[0])
}

/// Settle a finished game. Indexed by seat, both in and out.
pub fn final_results(
    points: [i32; SEAT_COUNT],
    win_orders: [Option<u8>; SEAT_COUNT],
    config: &GameConfig,
) -> [FinalResult; SEAT_COUNT] {
    if is_even(&points) {
        return [FinalResult::default(); SEAT_COUNT];
    }

    let mut ranking: Vec<(SeatIndex, i32)> = SeatIndex::ALL
        .into_iter()
        .map(|seat| {
            let order = win_orders[seat.index()].map_or(NEVER_WON_ORDER, i32::from);
            let tiebreak = (config.tiebreak_order_base - order)
                .saturating_mul(config.tiebreak_order_weight);
            let score = points[seat.index()]
                .saturating_add(tiebreak)
                .saturating_sub(i32::from(seat.0));
            (seat, score)
        })
        .collect();
    ranking.sort_by(|a, b| b.1.cmp(&a.1));

    let return_units = config.return_points / config.point_unit;
    let mut units: Vec<i32> = ranking
        .iter()
        .map(|(_, score)| {
            score.saturating_add(config.rounding_offset) / config.point_unit - return_units
        })
        .collect();
    units[0] = -units[1..].iter().sum::<i32>();

    let mut results = [FinalResult::default(); SEAT_COUNT];
    for (rank, ((seat, _), unit)) in ranking.iter().zip(units).enumerate() {
        #[expect(clippy::cast_possible_truncation)]
        let order = rank as u8 + 1;
        results[seat.index()] = FinalResult {
            point: unit + config.uma[rank],
            order,
        };
    }
    results
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settle(points: [i32; 4], orders: [Option<u8>; 4]) -> [FinalResult; 4] {
        final_results(points, orders, &GameConfig::default())
    }

    #[test]
    fn results_sum_to_zero() {
        let cases = [
            [26_000, 25_000, 24_000, 25_000],
            [48_300, 12_100, -3_000, 42_600],
            [25_000, 25_000, 25_000, 25_100],
            [100, 200, 300, 99_400],
        ];
        for points in cases {
            let results = settle(points, [None; 4]);
            let total: i32 = results.iter().map(|r| r.point).sum();
            assert_eq!(total, 0, "points {points:?} -> {results:?}");
        }
    }

    #[test]
    fn ranks_follow_points() {
        let results = settle([26_000, 25_000, 24_000, 25_000], [Some(1), None, None, None]);
        assert_eq!(results[0].order, 1);
        // Equal points: lower seat index ranks higher.
        assert_eq!(results[1].order, 2);
        assert_eq!(results[3].order, 3);
        assert_eq!(results[2].order, 4);
    }

    #[test]
    fn standard_game_settles_with_uma() {
        let results = settle([26_000, 25_000, 24_000, 25_000], [Some(1), None, None, None]);
        // Non-top seats: 25049 -> -5, 25047 -> -5, 24048 -> -6. Top takes 16.
        assert_eq!(results[0], FinalResult { point: 16 + 20, order: 1 });
        assert_eq!(results[1], FinalResult { point: -5 + 10, order: 2 });
        assert_eq!(results[3], FinalResult { point: -5 - 10, order: 3 });
        assert_eq!(results[2], FinalResult { point: -6 - 20, order: 4 });
    }

    #[test]
    fn earlier_winner_breaks_point_tie() {
        let results = settle(
            [30_000, 25_000, 25_000, 20_000],
            [None, None, Some(1), None],
        );
        assert_eq!(results[0], FinalResult { point: 40, order: 1 });
        assert_eq!(results[2], FinalResult { point: 5, order: 2 });
        assert_eq!(results[1], FinalResult { point: -15, order: 3 });
        assert_eq!(results[3], FinalResult { point: -30, order: 4 });
    }

    #[test]
    fn extreme_totals_saturate_instead_of_overflowing() {
        let results = settle([i32::MAX, i32::MIN + 10, 0, 0], [Some(1), None, None, None]);
        assert_eq!(results[0].order, 1);
        assert_eq!(results[1].order, 4);
        let total: i32 = results.iter().map(|r| r.point).sum();
        assert_eq!(total, 0);
    }

    #[test]
    fn even_game_settles_at_zero() {
        let results = settle([25_000; 4], [Some(1), Some(2), None, None]);
        assert_eq!(results, [FinalResult { point: 0, order: 0 }; 4]);
    }

    #[test]
    fn negative_totals_truncate_toward_zero() {
        let results = settle([60_000, 40_000, 1_000, -1_000], [None; 4]);
        // -1000 + 50 - 3 = -953; (-953 + 400) / 1000 truncates to 0.
        assert_eq!(results[3].point, -30 - 20);
        let total: i32 = results.iter().map(|r| r.point).sum();
        assert_eq!(total, 0);
    }
}
