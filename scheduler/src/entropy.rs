//! Randomness sources.
//!
//! The engine never reaches for a global generator. Every random decision
//! (batch sizes, trap values, blocked durations, privilege lottery) is drawn
//! from an [`Entropy`] passed in by the caller, so a run is fully determined
//! by its source.

use std::collections::VecDeque;

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64Mcg;

/// A source of bounded random draws.
pub trait Entropy {
    /// A value in `0..bound`. `bound` of zero yields zero.
    fn below(&mut self, bound: u32) -> u32;

    /// A value in `lo..=hi`.
    fn between(&mut self, lo: u32, hi: u32) -> u32 {
        if hi <= lo {
            return lo;
        }
        let span = hi - lo;
        match span.checked_add(1) {
            Some(bound) => lo + self.below(bound),
            None => lo + self.below(u32::MAX),
        }
    }

    /// True with probability `1 / n`.
    fn one_in(&mut self, n: u32) -> bool {
        n != 0 && self.below(n) == 0
    }

    /// True with probability `(percent + 1) / 100`, matching a
    /// `draw % 100 <= percent` lottery.
    fn percent(&mut self, percent: u32) -> bool {
        self.below(100) <= percent
    }
}

/// Pseudo-random source backed by a PCG generator.
pub struct SeededEntropy {
    seed: u64,
    rng: Pcg64Mcg,
}

impl SeededEntropy {
    pub fn seeded(seed: u64) -> SeededEntropy {
        SeededEntropy { seed, rng: Pcg64Mcg::seed_from_u64(seed) }
    }

    /// Seed from the thread-local generator. The seed is kept so the run can
    /// be replayed.
    pub fn from_random_seed() -> SeededEntropy {
        SeededEntropy::seeded(rand::random())
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }
}

impl Entropy for SeededEntropy {
    fn below(&mut self, bound: u32) -> u32 {
        if bound == 0 {
            return 0;
        }
        self.rng.gen_range(0..bound)
    }
}

/// Replays a fixed sequence of draws, each reduced modulo the requested
/// bound. Once the script runs out every draw is `fallback`.
#[derive(Debug, Clone, Default)]
pub struct ScriptedEntropy {
    draws: VecDeque<u32>,
    fallback: u32,
}

impl ScriptedEntropy {
    pub fn new<I: IntoIterator<Item = u32>>(draws: I) -> ScriptedEntropy {
        ScriptedEntropy { draws: draws.into_iter().collect(), fallback: 0 }
    }

    /// A source that always answers `value` (modulo the bound).
    pub fn constant(value: u32) -> ScriptedEntropy {
        ScriptedEntropy { draws: VecDeque::new(), fallback: value }
    }

    pub fn with_fallback(mut self, fallback: u32) -> ScriptedEntropy {
        self.fallback = fallback;
        self
    }

    pub fn remaining(&self) -> usize {
        self.draws.len()
    }
}

impl Entropy for ScriptedEntropy {
    fn below(&mut self, bound: u32) -> u32 {
        if bound == 0 {
            return 0;
        }
        self.draws.pop_front().unwrap_or(self.fallback) % bound
    }
}
