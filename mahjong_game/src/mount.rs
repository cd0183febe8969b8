// The tile mount: the shuffled stock that hands and draws come from.
//
// `TileMount` always holds all 136 ids. A cursor marks how many have been
// handed out; everything from the cursor onward is still in the mount. An
// optional dead wall reserves the last `dead_wall` tiles so they are never
// drawn. Running into the limit is reported as `MountError::Exhausted`, which
// the state machine turns into a drawn round rather than treating as a fault.

use thiserror::Error;

use mahjong_prng::GameRng;

use crate::tile::{TILE_COUNT, TileId};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum MountError {
    #[error("the mount is exhausted")]
    Exhausted,
}

#[derive(Clone, Debug)]
pub struct TileMount {
    tiles: Vec<TileId>,
    cursor: usize,
    dead_wall: usize,
}

impl TileMount {
    /// A mount in id order with nothing drawn. Call `shuffle` before dealing.
    pub fn new(dead_wall: usize) -> Self {
        Self {
            tiles: TileId::all().collect(),
            cursor: 0,
            dead_wall: dead_wall.min(TILE_COUNT),
        }
    }

    /// Return every tile to the mount and shuffle.
    pub fn shuffle(&mut self, rng: &mut GameRng) {
        self.tiles.sort_unstable();
        rng.shuffle(&mut self.tiles);
        self.cursor = 0;
    }

    /// Take the next tile.
    pub fn draw(&mut self) -> Result<TileId, MountError> {
        if self.cursor >= self.draw_limit() {
            return Err(MountError::Exhausted);
        }
        let tile = self.tiles[self.cursor];
        self.cursor += 1;
        Ok(tile)
    }

    /// Number of tiles that can be drawn in a round.
    pub fn draw_limit(&self) -> usize {
        TILE_COUNT - self.dead_wall
    }

    pub fn drawn_count(&self) -> usize {
        self.cursor
    }

    /// Tiles that can still be drawn.
    pub fn remaining(&self) -> usize {
        self.draw_limit().saturating_sub(self.cursor)
    }

    /// Tiles not yet handed out, dead wall included.
    pub fn undrawn(&self) -> &[TileId] {
        &self.tiles[self.cursor..]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn draws_every_tile_once_then_exhausts() {
        let mut mount = TileMount::new(0);
        mount.shuffle(&mut GameRng::new(3));

        let mut seen = Vec::new();
        while let Ok(tile) = mount.draw() {
            seen.push(tile);
        }
        assert_eq!(seen.len(), TILE_COUNT);
        assert_eq!(mount.draw(), Err(MountError::Exhausted));

        seen.sort_unstable();
        assert_eq!(seen, TileId::all().collect::<Vec<_>>());
    }

    #[test]
    fn dead_wall_is_never_drawn() {
        let mut mount = TileMount::new(14);
        mount.shuffle(&mut GameRng::new(5));
        let mut count = 0;
        while mount.draw().is_ok() {
            count += 1;
        }
        assert_eq!(count, TILE_COUNT - 14);
        assert_eq!(mount.undrawn().len(), 14);
        assert_eq!(mount.remaining(), 0);
    }

    #[test]
    fn reshuffle_restores_the_full_pool() {
        let mut rng = GameRng::new(11);
        let mut mount = TileMount::new(0);
        mount.shuffle(&mut rng);
        for _ in 0..50 {
            mount.draw().unwrap();
        }
        mount.shuffle(&mut rng);
        assert_eq!(mount.drawn_count(), 0);
        assert_eq!(mount.remaining(), TILE_COUNT);

        let mut pool = mount.undrawn().to_vec();
        pool.sort_unstable();
        assert_eq!(pool, TileId::all().collect::<Vec<_>>());
    }

    #[test]
    fn different_seeds_deal_differently() {
        let mut a = TileMount::new(0);
        let mut b = TileMount::new(0);
        a.shuffle(&mut GameRng::new(1));
        b.shuffle(&mut GameRng::new(2));
        assert_ne!(a.undrawn(), b.undrawn());
    }
}
