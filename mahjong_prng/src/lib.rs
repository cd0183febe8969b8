// Seedable pseudo-random number generator for mount shuffling.
//
// Implements xoshiro256++ (Blackman & Vigna, 2019) with SplitMix64 seeding.
// The generator itself is hand-rolled so that a given seed produces the same
// deal on every platform, which the game tests rely on. Live tables never use
// a fixed seed: `GameRng::from_entropy()` pulls the 64-bit seed from the OS
// CSPRNG (`rand_core::OsRng`), so consecutive sessions cannot predict each
// other's deals.
//
// The only consumer is `mahjong_game::mount`, which calls `shuffle` once per
// round on the 136-tile pool.

use rand_core::{OsRng, RngCore};
use serde::{Deserialize, Serialize};

/// Xoshiro256++ PRNG.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GameRng {
    s: [u64; 4],
}

impl GameRng {
    /// Create a new PRNG seeded from a `u64`.
    ///
    /// Uses SplitMix64 to expand the seed into the 256-bit internal state.
    /// Two `GameRng` instances created with the same seed will produce
    /// identical output sequences.
    pub fn new(seed: u64) -> Self {
        let mut sm = seed;
        Self {
            s: [
                splitmix64(&mut sm),
                splitmix64(&mut sm),
                splitmix64(&mut sm),
                splitmix64(&mut sm),
            ],
        }
    }

    /// Create a PRNG seeded from the operating system's CSPRNG.
    pub fn from_entropy() -> Result<Self, rand_core::Error> {
        let mut seed = [0u8; 8];
        OsRng.try_fill_bytes(&mut seed)?;
        Ok(Self::new(u64::from_le_bytes(seed)))
    }

    /// Generate the next `u64` in the sequence.
    pub fn next_u64(&mut self) -> u64 {
        let result = (self.s[0].wrapping_add(self.s[3]))
            .rotate_left(23)
            .wrapping_add(self.s[0]);

        let t = self.s[1] << 17;

        self.s[2] ^= self.s[0];
        self.s[3] ^= self.s[1];
        self.s[1] ^= self.s[2];
        self.s[0] ^= self.s[3];

        self.s[2] ^= t;
        self.s[3] = self.s[3].rotate_left(45);

        result
    }

    /// Generate a uniform random integer in `[low, high)`.
    ///
    /// Uses rejection sampling to avoid modulo bias.
    /// Panics if `low >= high`.
    pub fn range_u64(&mut self, low: u64, high: u64) -> u64 {
        assert!(low < high, "range_u64: low must be less than high");
        let range = high - low;
        if range.is_power_of_two() {
            return low + (self.next_u64() & (range - 1));
        }
        let threshold = range.wrapping_neg() % range;
        loop {
            let r = self.next_u64();
            if r >= threshold {
                return low + (r % range);
            }
        }
    }

    /// Generate a uniform random `usize` in `[low, high)`.
    pub fn range_usize(&mut self, low: usize, high: usize) -> usize {
        self.range_u64(low as u64, high as u64) as usize
    }

    /// Shuffle a slice in place (Fisher-Yates, back to front).
    ///
    /// Every permutation is equally likely because each swap index is drawn
    /// with `range_usize`, which has no modulo bias.
    pub fn shuffle<T>(&mut self, items: &mut [T]) {
        for i in (1..items.len()).rev() {
            let j = self.range_usize(0, i + 1);
            items.swap(i, j);
        }
    }
}

/// SplitMix64, used only to expand a `u64` seed into xoshiro state.
fn splitmix64(state: &mut u64) -> u64 {
    *state = state.wrapping_add(0x9e37_79b9_7f4a_7c15);
    let mut z = *state;
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ (z >> 31)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn determinism_same_seed_same_output() {
        let mut a = GameRng::new(42);
        let mut b = GameRng::new(42);
        for _ in 0..1000 {
            assert_eq!(a.next_u64(), b.next_u64());
        }
    }

    #[test]
    fn different_seeds_different_output() {
        let mut a = GameRng::new(42);
        let mut b = GameRng::new(43);
        assert_ne!(a.next_u64(), b.next_u64());
    }

    #[test]
    fn range_usize_within_bounds() {
        let mut rng = GameRng::new(555);
        for _ in 0..10_000 {
            let v = rng.range_usize(5, 15);
            assert!((5..15).contains(&v), "range_usize out of range: {v}");
        }
    }

    #[test]
    fn range_u64_reaches_both_ends() {
        let mut rng = GameRng::new(7);
        let mut seen = [false; 3];
        for _ in 0..1000 {
            seen[rng.range_u64(0, 3) as usize] = true;
        }
        assert_eq!(seen, [true, true, true]);
    }

    #[test]
    fn shuffle_is_a_permutation() {
        let mut rng = GameRng::new(2024);
        let mut tiles: Vec<u8> = (0..136).collect();
        rng.shuffle(&mut tiles);

        let mut sorted = tiles.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, (0..136).collect::<Vec<u8>>());
        assert_ne!(tiles, sorted, "a 136-element shuffle left the order intact");
    }

    #[test]
    fn shuffle_same_seed_same_order() {
        let mut a: Vec<u32> = (0..136).collect();
        let mut b = a.clone();
        GameRng::new(9).shuffle(&mut a);
        GameRng::new(9).shuffle(&mut b);
        assert_eq!(a, b);
    }

    #[test]
    fn shuffle_handles_tiny_slices() {
        let mut rng = GameRng::new(1);
        let mut empty: [u8; 0] = [];
        rng.shuffle(&mut empty);
        let mut one = [5u8];
        rng.shuffle(&mut one);
        assert_eq!(one, [5]);
    }

    #[test]
    fn entropy_seeded_generators_diverge() {
        let mut a = GameRng::from_entropy().unwrap();
        let mut b = GameRng::from_entropy().unwrap();
        let first_a: Vec<u64> = (0..4).map(|_| a.next_u64()).collect();
        let first_b: Vec<u64> = (0..4).map(|_| b.next_u64()).collect();
        assert_ne!(first_a, first_b);
    }

    #[test]
    fn serialization_roundtrip() {
        let mut rng = GameRng::new(42);
        for _ in 0..100 {
            rng.next_u64();
        }
        let json = serde_json::to_string(&rng).unwrap();
        let mut restored: GameRng = serde_json::from_str(&json).unwrap();
        for _ in 0..100 {
            assert_eq!(rng.next_u64(), restored.next_u64());
        }
    }
}
