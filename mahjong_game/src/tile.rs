// Tile identifiers.
//
// The full set is 136 distinct ids, 0..136. Four consecutive ids share one
// kind (suit + rank), so `id / 4` is the kind and the suit is read off the
// id range:
//
//   0..36    manzu 1-9
//   36..72   pinzu 1-9
//   72..108  souzu 1-9
//   108..136 honors 1-7 (E S W N, then the three dragons)
//
// Ids are only ever compared, sorted, and mapped to suit/rank for the
// scoring oracle; no game rule here depends on which copy of a kind a tile is.

use serde::{Deserialize, Serialize};

use mahjong_protocol::NO_TARGET;

/// Size of the tile universe.
pub const TILE_COUNT: usize = 136;

/// Tiles dealt to each seat.
pub const HAND_SIZE: usize = 13;

/// Identical copies of each kind.
pub const COPIES_PER_KIND: u8 = 4;

/// One physical tile.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TileId(pub u8);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Suit {
    Man,
    Pin,
    Sou,
    Honors,
}

impl Suit {
    /// First tile id of the suit.
    pub fn base(self) -> u8 {
        match self {
            Suit::Man => 0,
            Suit::Pin => 36,
            Suit::Sou => 72,
            Suit::Honors => 108,
        }
    }

    /// Name the scoring oracle uses for the suit.
    pub fn wire_name(self) -> &'static str {
        match self {
            Suit::Man => "man",
            Suit::Pin => "pin",
            Suit::Sou => "sou",
            Suit::Honors => "honors",
        }
    }
}

impl TileId {
    /// Returns `None` for ids outside the universe.
    pub fn new(id: u8) -> Option<Self> {
        (usize::from(id) < TILE_COUNT).then_some(TileId(id))
    }

    /// Every tile in id order.
    pub fn all() -> impl Iterator<Item = TileId> {
        (0..TILE_COUNT)
            .filter_map(|id| u8::try_from(id).ok())
            .map(TileId)
    }

    pub fn suit(self) -> Suit {
        match self.0 {
            0..36 => Suit::Man,
            36..72 => Suit::Pin,
            72..108 => Suit::Sou,
            _ => Suit::Honors,
        }
    }

    /// Rank within the suit, starting at 1.
    pub fn rank(self) -> u8 {
        (self.0 - self.suit().base()) / COPIES_PER_KIND + 1
    }
}

/// Wire form of an optional tile slot: the id, or `-1` when empty.
pub fn wire_tile(tile: Option<TileId>) -> i32 {
    tile.map_or(NO_TARGET, |t| i32::from(t.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suit_boundaries() {
        assert_eq!(TileId(0).suit(), Suit::Man);
        assert_eq!(TileId(35).suit(), Suit::Man);
        assert_eq!(TileId(36).suit(), Suit::Pin);
        assert_eq!(TileId(71).suit(), Suit::Pin);
        assert_eq!(TileId(72).suit(), Suit::Sou);
        assert_eq!(TileId(107).suit(), Suit::Sou);
        assert_eq!(TileId(108).suit(), Suit::Honors);
        assert_eq!(TileId(135).suit(), Suit::Honors);
    }

    #[test]
    fn ranks_group_four_copies() {
        assert_eq!(TileId(0).rank(), 1);
        assert_eq!(TileId(3).rank(), 1);
        assert_eq!(TileId(4).rank(), 2);
        assert_eq!(TileId(35).rank(), 9);
        assert_eq!(TileId(84).rank(), 4);
        assert_eq!(TileId(108).rank(), 1);
        assert_eq!(TileId(135).rank(), 7);
    }

    #[test]
    fn new_rejects_out_of_range() {
        assert_eq!(TileId::new(135), Some(TileId(135)));
        assert_eq!(TileId::new(136), None);
    }

    #[test]
    fn all_yields_the_whole_universe() {
        let all: Vec<TileId> = TileId::all().collect();
        assert_eq!(all.len(), TILE_COUNT);
        assert_eq!(all.first(), Some(&TileId(0)));
        assert_eq!(all.last(), Some(&TileId(135)));
    }

    #[test]
    fn wire_tile_uses_sentinel() {
        assert_eq!(wire_tile(None), -1);
        assert_eq!(wire_tile(Some(TileId(42))), 42);
    }
}
