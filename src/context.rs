use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Explicit carrier of all generation randomness.
///
/// Every builder takes `&mut GenerationContext`, so two contexts built from the same
/// seed replay the exact same sequence of draws.
#[derive(Debug, Clone)]
pub struct GenerationContext {
    seed: u64,
    rng: StdRng,
}

impl GenerationContext {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn rng(&mut self) -> &mut StdRng {
        &mut self.rng
    }

    /// Picks one element uniformly. Returns `None` for an empty slice.
    pub fn pick<'a, T>(&mut self, items: &'a [T]) -> Option<&'a T> {
        if items.is_empty() {
            return None;
        }
        let idx = self.rng.gen_range(0..items.len());
        items.get(idx)
    }

    /// Picks one label from a non-empty constant list.
    pub fn label(&mut self, labels: &[&'static str]) -> &'static str {
        self.pick(labels).copied().unwrap_or_default()
    }

    /// Bernoulli draw with probability `p` (clamped to [0, 1]).
    pub fn chance(&mut self, p: f64) -> bool {
        self.rng.gen_bool(p.clamp(0.0, 1.0))
    }

    pub fn uniform(&mut self, low: f64, high: f64) -> f64 {
        if high <= low {
            return low;
        }
        self.rng.gen_range(low..high)
    }

    /// Inclusive integer draw.
    pub fn between(&mut self, low: u32, high: u32) -> u32 {
        if high <= low {
            return low;
        }
        self.rng.gen_range(low..=high)
    }
}
