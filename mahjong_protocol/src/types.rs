// Seat identifiers shared by the protocol, game, and server crates.
//
// A table always has exactly four seats. Seat indices are fixed for the
// lifetime of a connection and never rotate; what rotates between rounds is
// the wind attached to each seat (see `mahjong_game::round`). Views sent to
// clients are expressed relative to the receiving seat, so `relative_to` is
// the one place that arithmetic lives.

use serde::{Deserialize, Serialize};

/// Number of seats at a table.
pub const SEAT_COUNT: usize = 4;

/// Sentinel used on the wire for "no target" / "no tile".
pub const NO_TARGET: i32 = -1;

/// A fixed table position, 0..4.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SeatIndex(pub u8);

impl SeatIndex {
    /// All four seats in turn order.
    pub const ALL: [SeatIndex; SEAT_COUNT] = [SeatIndex(0), SeatIndex(1), SeatIndex(2), SeatIndex(3)];

    /// Construct from a `usize`, wrapping modulo the seat count.
    pub fn wrapping(index: usize) -> Self {
        SeatIndex::ALL[index % SEAT_COUNT]
    }

    pub fn index(self) -> usize {
        usize::from(self.0)
    }

    /// The seat that acts after this one.
    pub fn next(self) -> Self {
        Self::wrapping(self.index() + 1)
    }

    /// Position of `self` as seen from `viewer`: 0 is the viewer itself,
    /// 1..3 follow in turn order.
    pub fn relative_to(self, viewer: SeatIndex) -> usize {
        (self.index() + SEAT_COUNT - viewer.index()) % SEAT_COUNT
    }

    /// Inverse of `relative_to`: the absolute seat at `position` for `viewer`.
    pub fn at_position(viewer: SeatIndex, position: usize) -> Self {
        Self::wrapping(viewer.index() + position)
    }
}

impl std::fmt::Display for SeatIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "seat {}", self.0)
    }
}
