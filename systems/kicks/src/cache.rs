//! Turn-based scheduling of coefficient recomputation.

use std::num::NonZeroU64;

/// Contents of a [`CoefficientCache`].
#[derive(Clone, Debug, PartialEq)]
pub enum CacheState<B> {
    /// Nothing computed yet.
    Unset,
    /// Bundle computed at `turn`.
    Cached {
        /// Turn at which the bundle was computed.
        turn: u64,
        /// Most recent coefficient bundle.
        bundle: B,
    },
}

/// Outcome of [`CoefficientCache::maybe_update`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Refresh {
    /// The cached bundle was still current.
    Reused,
    /// The bundle was recomputed during this call.
    Recomputed,
}

/// Most recent coefficient bundle plus the turn it was computed at.
///
/// The bundle is recomputed on first use and then whenever `update_every`
/// turns have elapsed since the last computation. A turn counter that moved
/// backwards also triggers a recomputation.
#[derive(Clone, Debug, PartialEq)]
pub struct CoefficientCache<B> {
    update_every: NonZeroU64,
    state: CacheState<B>,
}

impl<B: Clone> CoefficientCache<B> {
    /// Creates an empty cache.
    #[must_use]
    pub const fn new(update_every: NonZeroU64) -> Self {
        Self {
            update_every,
            state: CacheState::Unset,
        }
    }

    /// Recomputation period in turns.
    #[must_use]
    pub const fn update_every(&self) -> NonZeroU64 {
        self.update_every
    }

    /// Current contents.
    #[must_use]
    pub const fn state(&self) -> &CacheState<B> {
        &self.state
    }

    /// Turn at which the cached bundle was computed.
    #[must_use]
    pub const fn cached_turn(&self) -> Option<u64> {
        match &self.state {
            CacheState::Unset => None,
            CacheState::Cached { turn, .. } => Some(*turn),
        }
    }

    /// Cached bundle, if any.
    #[must_use]
    pub const fn bundle(&self) -> Option<&B> {
        match &self.state {
            CacheState::Unset => None,
            CacheState::Cached { bundle, .. } => Some(bundle),
        }
    }

    /// Reports whether a call at `turn` would recompute.
    #[must_use]
    pub fn is_due(&self, turn: u64) -> bool {
        match &self.state {
            CacheState::Unset => true,
            CacheState::Cached { turn: computed, .. } => turn
                .checked_sub(*computed)
                .map_or(true, |elapsed| elapsed >= self.update_every.get()),
        }
    }

    /// Drops the cached bundle.
    pub fn reset(&mut self) {
        self.state = CacheState::Unset;
    }

    /// Returns the bundle for `turn`, invoking `recompute` when an update is due.
    ///
    /// A failed recomputation leaves the cache unchanged.
    pub fn maybe_update<F, E>(&mut self, turn: u64, recompute: F) -> Result<(B, Refresh), E>
    where
        F: FnOnce() -> Result<B, E>,
    {
        if let (false, CacheState::Cached { bundle, .. }) = (self.is_due(turn), &self.state) {
            return Ok((bundle.clone(), Refresh::Reused));
        }
        let bundle = recompute()?;
        self.state = CacheState::Cached {
            turn,
            bundle: bundle.clone(),
        };
        Ok((bundle, Refresh::Recomputed))
    }
}

#[cfg(test)]
mod tests {
    use std::num::NonZeroU64;

    use super::{CacheState, CoefficientCache, Refresh};

    fn cache(update_every: u64) -> CoefficientCache<u64> {
        CoefficientCache::new(NonZeroU64::new(update_every).expect("non-zero"))
    }

    #[test]
    fn recomputes_on_schedule_only() {
        let mut cache = cache(5);
        let mut recomputed_at = Vec::new();
        for turn in 0..16 {
            let (bundle, refresh) = cache
                .maybe_update(turn, || Ok::<_, ()>(turn * 10))
                .expect("update");
            if refresh == Refresh::Recomputed {
                recomputed_at.push(turn);
            }
            assert_eq!(bundle, cache.cached_turn().expect("cached") * 10);
        }
        assert_eq!(recomputed_at, vec![0, 5, 10, 15]);
    }

    #[test]
    fn failed_recomputation_keeps_previous_bundle() {
        let mut cache = cache(2);
        let _ = cache.maybe_update(0, || Ok::<_, &str>(7)).expect("update");
        let failure = cache.maybe_update(2, || Err("diverged"));
        assert_eq!(failure, Err("diverged"));
        assert_eq!(cache.state(), &CacheState::Cached { turn: 0, bundle: 7 });
        assert!(cache.is_due(2));
    }

    #[test]
    fn backwards_turn_counter_triggers_recomputation() {
        let mut cache = cache(100);
        let _ = cache.maybe_update(50, || Ok::<_, ()>(1)).expect("update");
        assert!(!cache.is_due(60));
        assert!(cache.is_due(10));
        let (bundle, refresh) = cache.maybe_update(10, || Ok::<_, ()>(2)).expect("update");
        assert_eq!((bundle, refresh), (2, Refresh::Recomputed));
        assert_eq!(cache.cached_turn(), Some(10));
    }

    #[test]
    fn reset_forgets_the_bundle() {
        let mut cache = cache(3);
        let _ = cache.maybe_update(0, || Ok::<_, ()>(1)).expect("update");
        cache.reset();
        assert_eq!(cache.bundle(), None);
        assert!(cache.is_due(1));
    }
}
