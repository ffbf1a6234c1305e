//! Explicit per-sample randomness for transforms.
//!
//! Every sample of every epoch gets its own seed, derived from the loader's
//! base seed, the epoch and the sample index (never the worker id). A
//! pipeline receives a [`SampleRng`] built from that seed, and a
//! [`Compose`](super::Compose) hands step `i` the child stream `fork(i)`.
//!
//! Two pipelines given the same seed therefore draw identical parameters for
//! the steps at the same position, which is what keeps an image and its label
//! aligned through random geometry.

use rand::rngs::StdRng;
use rand::{Rng as _, SeedableRng};

/// SplitMix64 finalizer; spreads nearby inputs across the whole `u64` range.
#[inline]
fn mix64(mut z: u64) -> u64 {
    z = z.wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Seed shared by everything random in one epoch (shuffling included).
pub(crate) fn epoch_seed(base_seed: u64, epoch: usize) -> u64 {
    mix64(base_seed.wrapping_add((epoch as u64) << 32))
}

/// Seed for one sample of one epoch.
///
/// Seed formula: mix(mix(base_seed + (epoch << 32)) ^ index)
pub fn sample_seed(base_seed: u64, epoch: usize, index: usize) -> u64 {
    mix64(epoch_seed(base_seed, epoch) ^ index as u64)
}

/// Random stream handed to transforms.
#[derive(Debug, Clone)]
pub struct SampleRng {
    seed: u64,
    rng: StdRng,
}

impl SampleRng {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Deterministic child stream, independent of how much `self` has drawn.
    pub fn fork(&self, stream: u64) -> SampleRng {
        SampleRng::new(mix64(self.seed ^ mix64(stream.wrapping_add(1))))
    }

    pub fn gen_bool(&mut self, p: f64) -> bool {
        match p {
            p if p <= 0.0 => false,
            p if p >= 1.0 => true,
            p => self.rng.random_bool(p),
        }
    }

    /// Uniform float in `[lo, hi)`; returns `lo` when the range is empty.
    pub fn gen_range_f64(&mut self, lo: f64, hi: f64) -> f64 {
        if hi <= lo {
            lo
        } else {
            self.rng.random_range(lo..hi)
        }
    }

    /// Uniform integer in `[lo, hi)`; returns `lo` when the range is empty.
    pub fn gen_range_usize(&mut self, lo: usize, hi: usize) -> usize {
        if hi <= lo {
            lo
        } else {
            self.rng.random_range(lo..hi)
        }
    }

    pub fn gen_unit(&mut self) -> f64 {
        self.rng.random::<f64>()
    }
}
