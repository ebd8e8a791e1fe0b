//! Reproducible random-number streams with substreams and antithetic
//! sampling.
//!
//! Each stream is a ChaCha8 generator keyed by the model's master seed
//! and selected by the stream id. A stream is divided into substreams of
//! `2^SUBSTREAM_BITS` words; replications move between substreams to get
//! independent, repeatable draws.

use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

use cadence_core::StreamId;

/// Words per substream, as a power of two.
const SUBSTREAM_BITS: u32 = 48;

/// A seeded uniform generator with substream positioning.
#[derive(Clone, Debug)]
pub struct RandomStream {
    id: StreamId,
    rng: ChaCha8Rng,
    substream: u64,
    antithetic: bool,
}

impl RandomStream {
    /// Create stream `id` keyed by `seed`, positioned at substream 0.
    pub fn new(seed: u64, id: StreamId) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        rng.set_stream(u64::from(id.0));
        Self {
            id,
            rng,
            substream: 0,
            antithetic: false,
        }
    }

    /// The stream's id.
    pub fn id(&self) -> StreamId {
        self.id
    }

    /// Index of the current substream.
    pub fn substream(&self) -> u64 {
        self.substream
    }

    /// Whether draws are currently reflected (`1 - u`).
    pub fn is_antithetic(&self) -> bool {
        self.antithetic
    }

    /// Turn antithetic sampling on or off.
    pub fn set_antithetic(&mut self, on: bool) {
        self.antithetic = on;
    }

    /// Rewind to the start of substream 0.
    pub fn reset_start_stream(&mut self) {
        self.substream = 0;
        self.seek();
    }

    /// Rewind to the start of the current substream.
    pub fn reset_start_substream(&mut self) {
        self.seek();
    }

    /// Move to the start of the next substream.
    pub fn advance_to_next_substream(&mut self) {
        self.substream += 1;
        self.seek();
    }

    fn seek(&mut self) {
        self.rng
            .set_word_pos(u128::from(self.substream) << SUBSTREAM_BITS);
    }

    fn raw(&mut self) -> f64 {
        self.rng.random()
    }

    /// A uniform draw on `[0, 1)`. Antithetic streams return the
    /// reflection `1 - u`, which lies on `(0, 1]`.
    pub fn uniform(&mut self) -> f64 {
        let u = self.raw();
        if self.antithetic {
            1.0 - u
        } else {
            u
        }
    }

    /// A uniform draw on `[low, high)`, or `(low, high]` when antithetic.
    pub fn uniform_range(&mut self, low: f64, high: f64) -> f64 {
        low + (high - low) * self.uniform()
    }

    /// An exponential draw with the given mean, by inversion of
    /// [`uniform`](Self::uniform).
    pub fn exponential(&mut self, mean: f64) -> f64 {
        let u = self.raw();
        // Inverting the reflected draw 1 - u takes the log of u itself.
        let tail = if self.antithetic {
            u.max(f64::MIN_POSITIVE)
        } else {
            1.0 - u
        };
        -mean * tail.ln()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draws(s: &mut RandomStream, n: usize) -> Vec<f64> {
        (0..n).map(|_| s.uniform()).collect()
    }

    #[test]
    fn same_seed_and_id_reproduce() {
        let mut a = RandomStream::new(42, StreamId(3));
        let mut b = RandomStream::new(42, StreamId(3));
        assert_eq!(draws(&mut a, 10), draws(&mut b, 10));
    }

    #[test]
    fn distinct_ids_diverge() {
        let mut a = RandomStream::new(42, StreamId(0));
        let mut b = RandomStream::new(42, StreamId(1));
        assert_ne!(draws(&mut a, 4), draws(&mut b, 4));
    }

    #[test]
    fn substream_reset_replays() {
        let mut s = RandomStream::new(7, StreamId(0));
        s.advance_to_next_substream();
        let first = draws(&mut s, 5);
        s.reset_start_substream();
        assert_eq!(draws(&mut s, 5), first);
        s.reset_start_stream();
        assert_eq!(s.substream(), 0);
        assert_ne!(draws(&mut s, 5), first);
    }

    #[test]
    fn antithetic_reflects_draws() {
        let mut s = RandomStream::new(9, StreamId(2));
        let plain = draws(&mut s, 5);
        s.reset_start_substream();
        s.set_antithetic(true);
        let reflected = draws(&mut s, 5);
        for (u, v) in plain.iter().zip(&reflected) {
            assert!((u + v - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn exponential_is_non_negative() {
        let mut s = RandomStream::new(1, StreamId(0));
        assert!((0..1000).all(|_| s.exponential(2.0) >= 0.0));
    }

    #[test]
    fn antithetic_exponentials_are_finite_and_paired() {
        let mut s = RandomStream::new(5, StreamId(1));
        let plain: Vec<f64> = (0..1000).map(|_| s.exponential(2.0)).collect();
        s.reset_start_substream();
        s.set_antithetic(true);
        let reflected: Vec<f64> = (0..1000).map(|_| s.exponential(2.0)).collect();
        for (x, y) in plain.iter().zip(&reflected) {
            assert!(y.is_finite() && *y >= 0.0);
            // Survival probabilities of a pair sum to one.
            let pair = (-x / 2.0).exp() + (-y / 2.0).exp();
            assert!((pair - 1.0).abs() < 1e-9);
        }
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn draws_stay_in_range(seed in any::<u64>(), id in 0u32..64, low in -100.0f64..100.0, width in 0.001f64..50.0) {
            let mut s = RandomStream::new(seed, StreamId(id));
            for _ in 0..32 {
                let u = s.uniform();
                prop_assert!((0.0..1.0).contains(&u));
                let x = s.uniform_range(low, low + width);
                prop_assert!(x >= low && x <= low + width);
                prop_assert!(s.exponential(width).is_finite());
            }
        }

        #[test]
        fn substreams_replay_after_advances(seed in any::<u64>(), advances in 0u64..8) {
            let mut a = RandomStream::new(seed, StreamId(0));
            for _ in 0..advances {
                a.advance_to_next_substream();
            }
            let first: Vec<f64> = (0..4).map(|_| a.uniform()).collect();
            a.reset_start_substream();
            let again: Vec<f64> = (0..4).map(|_| a.uniform()).collect();
            prop_assert_eq!(first, again);
            prop_assert_eq!(a.substream(), advances);
        }
    }
}
