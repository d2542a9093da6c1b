//! Seeded hash PRNG used by procedural layout.
//!
//! Contract: `unit(seed)` maps any `u64` seed to an `f64` in `[0, 1)`, and is a
//! pure function of the seed. Only integer arithmetic is involved up to the
//! final exact conversion, so the same seed yields the same value on every
//! platform.

/// Multiplier applied to an item's index when deriving its seed.
const INDEX_MULTIPLIER: u64 = 0x9e37_79b9_7f4a_7c15;
/// Multiplier applied to the per-channel salt when deriving a seed.
const SALT_MULTIPLIER: u64 = 0xc2b2_ae3d_27d4_eb4f;

/// Splitmix64 finalizer: a fast bijective mix of a 64-bit state.
pub fn splitmix64(mut state: u64) -> u64 {
    state = state.wrapping_add(0x9e37_79b9_7f4a_7c15);
    let mut z = state;
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ (z >> 31)
}

/// Map a seed to `[0, 1)` using the top 53 bits of its hash.
pub fn unit(seed: u64) -> f64 {
    (splitmix64(seed) >> 11) as f64 * (1.0 / (1u64 << 53) as f64)
}

/// Derive a seed from an item's global index and a salt.
pub fn seed_for(index: usize, salt: u64) -> u64 {
    (index as u64)
        .wrapping_add(1)
        .wrapping_mul(INDEX_MULTIPLIER)
        ^ salt.wrapping_mul(SALT_MULTIPLIER)
}

/// A small deterministic generator built on [`unit`].
///
/// Each draw hashes `seed + n` for the n-th draw, so a stream is fully
/// determined by its starting seed.
#[derive(Debug, Clone)]
pub struct SeededRng {
    seed: u64,
    draws: u64,
}

impl SeededRng {
    pub fn new(seed: u64) -> Self {
        Self { seed, draws: 0 }
    }

    /// Generator for the item at `index`.
    pub fn for_index(index: usize, salt: u64) -> Self {
        Self::new(seed_for(index, salt))
    }

    /// Next value in `[0, 1)`.
    pub fn next_unit(&mut self) -> f64 {
        let value = unit(self.seed.wrapping_add(self.draws));
        self.draws += 1;
        value
    }

    /// Next value in `[lo, hi)`.
    pub fn next_range(&mut self, lo: f64, hi: f64) -> f64 {
        lo + (hi - lo) * self.next_unit()
    }

    /// Next value in `[-amplitude, amplitude)`.
    pub fn next_signed(&mut self, amplitude: f64) -> f64 {
        self.next_range(-amplitude, amplitude)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_stays_in_half_open_range() {
        for seed in (0..10_000u64).chain([u64::MAX, u64::MAX - 1]) {
            let v = unit(seed);
            assert!((0.0..1.0).contains(&v), "seed {seed} gave {v}");
        }
    }

    #[test]
    fn unit_is_pure() {
        for seed in [0, 1, 42, 0xdead_beef] {
            assert_eq!(unit(seed).to_bits(), unit(seed).to_bits());
        }
    }

    #[test]
    fn known_values_are_stable() {
        // Pinned so an accidental change to the mixing constants is caught.
        assert_eq!(splitmix64(0), 0xe220_a839_7b1d_cdaf);
        assert_eq!(splitmix64(1), 0x910a_2dec_8902_5cc1);
    }

    #[test]
    fn streams_replay_identically() {
        let mut a = SeededRng::for_index(7, 3);
        let mut b = SeededRng::for_index(7, 3);
        for _ in 0..64 {
            assert_eq!(a.next_unit().to_bits(), b.next_unit().to_bits());
        }
    }

    #[test]
    fn neighbouring_indices_diverge() {
        let a = SeededRng::for_index(0, 0).next_unit();
        let b = SeededRng::for_index(1, 0).next_unit();
        assert_ne!(a, b);
    }

    #[test]
    fn range_respects_bounds() {
        let mut rng = SeededRng::new(99);
        for _ in 0..1000 {
            let v = rng.next_range(2.0, 5.0);
            assert!((2.0..5.0).contains(&v));
            let s = rng.next_signed(0.5);
            assert!((-0.5..0.5).contains(&s));
        }
    }
}
