// Data-driven rule configuration.
//
// Every tunable number the state machine and settlement use lives in
// `GameConfig`: starting points, the repeat-dealer bonus, the uma table, the
// return-points line, tie-break weights, and where the game ends. The server
// loads it from a JSON file (`--rules`) or uses the defaults, which are the
// standard four-player values. Missing fields fall back to their defaults,
// so a rules file only needs to list what it changes.
//
// `validate` rejects configurations the state machine cannot run with (a
// dead wall so large the deal itself would exhaust the mount, an uma table
// that does not sum to zero, an impossible confirmation quorum).

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use mahjong_protocol::SEAT_COUNT;

use crate::round::Wind;
use crate::tile::{HAND_SIZE, TILE_COUNT};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read rules file: {0}")]
    Io(#[from] std::io::Error),
    #[error("could not parse rules: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid rules: {0}")]
    Invalid(String),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Points every seat starts a game with.
    pub starting_points: i32,
    /// Settlement subtracts this from each seat's points before applying uma.
    pub return_points: i32,
    /// Settlement reports points in multiples of this.
    pub point_unit: i32,
    /// Added before dividing by `point_unit` so 400 and above rounds up.
    pub rounding_offset: i32,
    /// Bonus by finishing rank, first to fourth, in settlement units.
    pub uma: [i32; SEAT_COUNT],
    /// Extra points a claim pays per repeat-dealer round.
    pub repeat_bonus: i32,
    /// Tiles at the end of the mount that are never drawn.
    pub dead_wall: usize,
    /// The game ends after the last round of this prevailing wind.
    pub final_wind: Wind,
    /// Tie-break: seats gain `(base - first_win_order) * weight` points
    /// when ranking, so earlier winners rank higher on equal points.
    pub tiebreak_order_base: i32,
    pub tiebreak_order_weight: i32,
    /// Reject discards from seats other than the acting seat.
    pub enforce_turn_order: bool,
    /// Acknowledgments needed before a round outcome advances the game.
    pub confirmations_required: usize,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            starting_points: 25_000,
            return_points: 30_000,
            point_unit: 1_000,
            rounding_offset: 400,
            uma: [20, 10, -10, -20],
            repeat_bonus: 300,
            dead_wall: 0,
            final_wind: Wind::South,
            tiebreak_order_base: 10,
            tiebreak_order_weight: 10,
            enforce_turn_order: true,
            confirmations_required: 1,
        }
    }
}

impl GameConfig {
    /// Parse and validate a JSON rules document.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: GameConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse, and validate a rules file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let dealt = HAND_SIZE * SEAT_COUNT + 1;
        if self.dead_wall > TILE_COUNT - dealt {
            return Err(ConfigError::Invalid(format!(
                "dead_wall {} leaves fewer than {dealt} tiles to deal",
                self.dead_wall
            )));
        }
        if self.uma.iter().sum::<i32>() != 0 {
            return Err(ConfigError::Invalid(format!(
                "uma {:?} must sum to zero",
                self.uma
            )));
        }
        if self.point_unit <= 0 {
            return Err(ConfigError::Invalid("point_unit must be positive".into()));
        }
        if !(1..=SEAT_COUNT).contains(&self.confirmations_required) {
            return Err(ConfigError::Invalid(format!(
                "confirmations_required must be 1..={SEAT_COUNT}, got {}",
                self.confirmations_required
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        GameConfig::default().validate().unwrap();
    }

    #[test]
    fn partial_json_keeps_other_defaults() {
        let config = GameConfig::from_json(r#"{"repeat_bonus": 100, "final_wind": 1}"#).unwrap();
        assert_eq!(config.repeat_bonus, 100);
        assert_eq!(config.final_wind, Wind::East);
        assert_eq!(config.starting_points, 25_000);
        assert_eq!(config.uma, [20, 10, -10, -20]);
    }

    #[test]
    fn rejects_unbalanced_uma() {
        let err = GameConfig::from_json(r#"{"uma": [30, 10, -10, -20]}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)), "got {err:?}");
    }

    #[test]
    fn rejects_oversized_dead_wall() {
        let err = GameConfig::from_json(r#"{"dead_wall": 100}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)), "got {err:?}");
    }

    #[test]
    fn rejects_impossible_quorum() {
        for quorum in [0, 5] {
            let config = GameConfig {
                confirmations_required: quorum,
                ..GameConfig::default()
            };
            assert!(config.validate().is_err());
        }
    }

    #[test]
    fn rejects_malformed_json() {
        let err = GameConfig::from_json("{not json").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
