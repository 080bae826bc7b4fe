//! Execution context bound to a particle ensemble.

use std::{fmt, sync::Arc};

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::ops::{ArrayOps, CpuOps};

/// Array backend plus seeded random generator used by every kick computation.
///
/// Cloning a context clones the generator state, so a cloned ensemble replays
/// exactly the same random draws as the original.
#[derive(Clone)]
pub struct ExecutionContext {
    ops: Arc<dyn ArrayOps>,
    rng: ChaCha8Rng,
    seed: u64,
}

impl ExecutionContext {
    /// Sequential CPU backend seeded with `seed`.
    #[must_use]
    pub fn cpu(seed: u64) -> Self {
        Self::with_ops(Arc::new(CpuOps), seed)
    }

    /// Data-parallel CPU backend seeded with `seed`.
    #[cfg(feature = "parallel")]
    #[must_use]
    pub fn parallel(seed: u64) -> Self {
        Self::with_ops(Arc::new(crate::ops::ParallelOps), seed)
    }

    /// Arbitrary backend seeded with `seed`.
    #[must_use]
    pub fn with_ops(ops: Arc<dyn ArrayOps>, seed: u64) -> Self {
        Self {
            ops,
            rng: ChaCha8Rng::seed_from_u64(seed),
            seed,
        }
    }

    /// Array backend resolved for this context.
    #[must_use]
    pub fn ops(&self) -> &dyn ArrayOps {
        self.ops.as_ref()
    }

    /// Restarts the generator from `seed`.
    pub fn reseed(&mut self, seed: u64) {
        self.rng = ChaCha8Rng::seed_from_u64(seed);
        self.seed = seed;
    }

    /// Draws `len` independent standard-normal values, advancing the generator.
    pub fn standard_normal(&mut self, len: usize) -> Vec<f64> {
        let mut values = vec![0.0; len];
        self.ops.fill_standard_normal(&mut self.rng, &mut values);
        values
    }
}

impl fmt::Debug for ExecutionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("backend", &self.ops.name())
            .field("seed", &self.seed)
            .finish_non_exhaustive()
    }
}
