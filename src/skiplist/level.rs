// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

/// Seed used when the configured seed is zero (xorshift would get stuck there)
const FALLBACK_SEED: u32 = 0x9E37_79B9;

/// Draws node levels following a geometric process
///
/// Every node starts at level 1 and is lifted one more level for each
/// successful Bernoulli trial with the configured probability.
pub struct LevelGenerator {
    state: u32,
    threshold: u32,
}

impl LevelGenerator {
    /// Creates a new generator.
    ///
    /// # Panics
    ///
    /// Panics if the probability is not in `(0.0, 1.0)`.
    pub fn new(probability: f64, seed: u32) -> Self {
        assert!(
            probability > 0.0 && probability < 1.0,
            "level probability must be in (0, 1), got {probability}",
        );

        // NOTE: probability < 1.0, so the product always fits into u32
        #[allow(
            clippy::cast_possible_truncation,
            clippy::cast_sign_loss,
            clippy::cast_precision_loss
        )]
        let threshold = (f64::from(u32::MAX) * probability) as u32;

        Self {
            state: if seed == 0 { FALLBACK_SEED } else { seed },
            threshold,
        }
    }

    fn next_u32(&mut self) -> u32 {
        // Pseudorandom number generation from "Xorshift RNGs" by George Marsaglia.
        //
        // This particular set of operations generates 32-bit integers. See:
        // https://en.wikipedia.org/wiki/Xorshift#Example_implementation
        let mut num = self.state;
        num ^= num << 13;
        num ^= num >> 17;
        num ^= num << 5;
        self.state = num;
        num
    }

    /// Returns `true` if a node should be lifted one more level.
    pub fn level_up(&mut self) -> bool {
        self.next_u32() < self.threshold
    }

    /// Draws the level of a new node.
    ///
    /// The result is capped at `height + 1`, so the structure grows by at most
    /// one level per insertion.
    pub fn next_level(&mut self, height: usize) -> usize {
        let mut level = 1;
        while level <= height && self.level_up() {
            level += 1;
        }
        level
    }
}
