// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use crate::SortedMap;

/// Sorted map configuration builder
#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    /// Probability of lifting a skiplist node one more level
    ///
    /// The expected search cost is `O((1/p) * log_{1/p}(N))`, the memory cost
    /// `O(N / (1 - p))` links. The search cost is minimal at `p = 1/e`,
    /// which costs about `1.58 * N` links.
    pub level_probability: f64,

    /// Seed of the level generator
    pub seed: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            level_probability: Self::DEFAULT_LEVEL_PROBABILITY,
            seed: Self::DEFAULT_SEED,
        }
    }
}

impl Config {
    /// Default level-up probability (1/e ~ 0.368)
    pub const DEFAULT_LEVEL_PROBABILITY: f64 = 1.0 / std::f64::consts::E;

    /// Default seed of the level generator
    pub const DEFAULT_SEED: u32 = 1; // arbitrary

    /// Initializes a new config
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the level-up probability of skiplist nodes.
    ///
    /// Defaults to 1/e.
    ///
    /// # Panics
    ///
    /// Panics if the probability is not in `(0.0, 1.0)`.
    #[must_use]
    pub fn level_probability(mut self, p: f64) -> Self {
        assert!(p > 0.0 && p < 1.0, "level probability must be in (0, 1)");

        self.level_probability = p;
        self
    }

    /// Sets the seed of the level generator.
    ///
    /// Defaults to 1.
    #[must_use]
    pub fn seed(mut self, seed: u32) -> Self {
        self.seed = seed;
        self
    }

    /// Creates an empty sorted map using this configuration.
    #[must_use]
    pub fn build(self) -> SortedMap {
        SortedMap::with_config(self)
    }
}
