// Winds and round progression.
//
// Two kinds of wind matter:
// - The **prevailing wind** of the round (`RoundState::wind`), which advances
//   East → South → West → North after the fourth round of each wind.
// - Each seat's **seat wind** (`PlayerState::wind`). The seat holding East
//   is the dealer. When the dealer rotates, every seat wind shifts so that
//   the seat after the old dealer becomes East.
//
// Winds serialize as integers 1..=4 (East = 1), which is what clients
// render and what `oracle_code` offsets for the scoring oracle.

use serde::{Deserialize, Serialize};

use mahjong_protocol::SeatIndex;

/// Rounds played under each prevailing wind.
pub const ROUNDS_PER_WIND: u8 = 4;

/// The oracle numbers winds from East = 27.
const ORACLE_EAST: i32 = 27;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum Wind {
    East = 1,
    South = 2,
    West = 3,
    North = 4,
}

impl Wind {
    pub const ALL: [Wind; 4] = [Wind::East, Wind::South, Wind::West, Wind::North];

    /// Seat wind at the start of a game: seat 0 is East, seat 1 South, ...
    pub fn initial_for_seat(seat: SeatIndex) -> Self {
        Self::ALL[seat.index()]
    }

    /// Next prevailing wind.
    pub fn next(self) -> Self {
        match self {
            Wind::East => Wind::South,
            Wind::South => Wind::West,
            Wind::West => Wind::North,
            Wind::North => Wind::East,
        }
    }

    /// A seat's wind after the dealer rotates. The seat that was South
    /// becomes East, so the old dealer drops to North.
    pub fn after_dealer_rotation(self) -> Self {
        match self {
            Wind::East => Wind::North,
            Wind::South => Wind::East,
            Wind::West => Wind::South,
            Wind::North => Wind::West,
        }
    }

    /// Encoding the scoring oracle expects.
    pub fn oracle_code(self) -> i32 {
        i32::from(u8::from(self)) + ORACLE_EAST - 1
    }
}

impl From<Wind> for u8 {
    fn from(wind: Wind) -> Self {
        wind as u8
    }
}

impl TryFrom<u8> for Wind {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Wind::East),
            2 => Ok(Wind::South),
            3 => Ok(Wind::West),
            4 => Ok(Wind::North),
            other => Err(format!("invalid wind {other}")),
        }
    }
}

/// Prevailing wind, round number, and repeat-dealer counter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundState {
    pub wind: Wind,
    /// 1..=4 within the prevailing wind.
    pub round: u8,
    /// Consecutive rounds the current dealer has kept the seat.
    pub sub_round: u32,
}

impl RoundState {
    /// East 1, no repeats.
    pub fn new() -> Self {
        Self {
            wind: Wind::East,
            round: 1,
            sub_round: 0,
        }
    }

    pub fn is_final_round(&self) -> bool {
        self.round >= ROUNDS_PER_WIND
    }

    /// Move to the next round after the dealer rotated: the round number
    /// increments, wrapping into the next prevailing wind after round 4.
    pub fn advance(&mut self) {
        if self.is_final_round() {
            self.wind = self.wind.next();
            self.round = 1;
        } else {
            self.round += 1;
        }
        self.sub_round = 0;
    }
}

impl Default for RoundState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seat_winds_rotate_so_next_seat_deals() {
        let winds: Vec<Wind> = SeatIndex::ALL
            .iter()
            .map(|s| Wind::initial_for_seat(*s).after_dealer_rotation())
            .collect();
        assert_eq!(winds, [Wind::North, Wind::East, Wind::South, Wind::West]);
    }

    #[test]
    fn four_rotations_restore_seat_winds() {
        for wind in Wind::ALL {
            let mut w = wind;
            for _ in 0..4 {
                w = w.after_dealer_rotation();
            }
            assert_eq!(w, wind);
        }
    }

    #[test]
    fn oracle_codes_start_at_27() {
        assert_eq!(Wind::East.oracle_code(), 27);
        assert_eq!(Wind::South.oracle_code(), 28);
        assert_eq!(Wind::North.oracle_code(), 30);
    }

    #[test]
    fn round_advances_into_next_wind() {
        let mut round = RoundState::new();
        round.sub_round = 2;
        for expected in 2..=4 {
            round.advance();
            assert_eq!(round.round, expected);
            assert_eq!(round.wind, Wind::East);
            assert_eq!(round.sub_round, 0);
        }
        round.advance();
        assert_eq!(round.wind, Wind::South);
        assert_eq!(round.round, 1);
    }

    #[test]
    fn round_state_serializes_for_clients() {
        let json = serde_json::to_value(RoundState {
            wind: Wind::South,
            round: 3,
            sub_round: 1,
        })
        .unwrap();
        assert_eq!(json, serde_json::json!({"wind": 2, "round": 3, "subRound": 1}));
    }

    #[test]
    fn wind_rejects_out_of_range_values() {
        assert!(serde_json::from_str::<Wind>("0").is_err());
        assert_eq!(serde_json::from_str::<Wind>("4").unwrap(), Wind::North);
    }
}
