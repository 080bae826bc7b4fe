#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Longitudinal line density estimation used to weight IBS kicks.
//!
//! Particles in denser parts of the bunch scatter more often, so the kick each
//! particle receives is scaled by the local line density evaluated at its
//! longitudinal position.

use std::num::NonZeroUsize;

use ibs_kick_beam::{ops::ArrayOps, Coordinate, ParticleEnsemble};
use ibs_kick_core::IbsError;

/// Relative padding applied to the outermost bin edges.
const EDGE_PADDING: f64 = 1.0e-7;

/// Histogram-based line density estimator with a fixed number of slices.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LineDensity {
    num_slices: NonZeroUsize,
}

impl LineDensity {
    /// Creates an estimator binning the bunch into `num_slices` slices.
    pub fn new(num_slices: usize) -> Result<Self, IbsError> {
        NonZeroUsize::new(num_slices)
            .map(|num_slices| Self { num_slices })
            .ok_or_else(|| {
                IbsError::invalid_configuration("num_slices", "slice count must be positive")
            })
    }

    /// Creates an estimator from a signed slice count, as read from configuration.
    pub fn from_signed(num_slices: i64) -> Result<Self, IbsError> {
        let count = usize::try_from(num_slices).map_err(|_| {
            IbsError::invalid_configuration(
                "num_slices",
                format!("slice count must be positive, got {num_slices}"),
            )
        })?;
        Self::new(count)
    }

    /// Number of slices.
    #[must_use]
    pub const fn num_slices(&self) -> usize {
        self.num_slices.get()
    }

    /// Histogram profile of the provided positions.
    ///
    /// Returns `None` for empty input and when the positions have no finite
    /// spread to bin.
    #[must_use]
    pub fn profile(&self, ops: &dyn ArrayOps, zeta: &[f64]) -> Option<LineDensityProfile> {
        let head = ops.max(zeta)?;
        let tail = ops.min(zeta)?;
        let width = (head - tail) / self.num_slices() as f64;
        if !(width.is_finite() && width > 0.0) {
            return None;
        }
        let edges = ops.linspace(
            tail - EDGE_PADDING * width,
            head + EDGE_PADDING * width,
            self.num_slices() + 1,
        );
        let centers = edges
            .windows(2)
            .map(|edge| 0.5 * (edge[0] + edge[1]))
            .collect();
        let density = ops.histogram_density(zeta, &edges);
        Some(LineDensityProfile {
            edges,
            centers,
            density,
        })
    }

    /// Line density at every position, in the order of the input.
    ///
    /// Weights are densities in 1/m that integrate to one over the bunch.
    /// Empty input yields an empty vector. Input without spread has no
    /// length scale, so it yields uniform weights of one per metre. The kick
    /// elements reject such a bunch whenever they recompute coefficients.
    #[must_use]
    pub fn estimate(&self, ops: &dyn ArrayOps, zeta: &[f64]) -> Vec<f64> {
        if zeta.is_empty() {
            return Vec::new();
        }
        match self.profile(ops, zeta) {
            Some(profile) => {
                log::debug!(
                    "line density over {} particles in {} slices",
                    zeta.len(),
                    self.num_slices()
                );
                ops.interp(zeta, profile.centers(), profile.density())
            }
            None => {
                log::debug!(
                    "degenerate longitudinal distribution of {} particles, using uniform weights",
                    zeta.len()
                );
                vec![1.0; zeta.len()]
            }
        }
    }

    /// Line density of the active particles, through the ensemble's backend.
    #[must_use]
    pub fn estimate_active(&self, particles: &ParticleEnsemble) -> Vec<f64> {
        let zeta = particles.active_values(Coordinate::Zeta);
        self.estimate(particles.context().ops(), &zeta)
    }
}

/// Binned longitudinal profile computed by [`LineDensity::profile`].
#[derive(Clone, Debug, PartialEq)]
pub struct LineDensityProfile {
    edges: Vec<f64>,
    centers: Vec<f64>,
    density: Vec<f64>,
}

impl LineDensityProfile {
    /// Bin edges, one more than the number of slices.
    #[must_use]
    pub fn edges(&self) -> &[f64] {
        &self.edges
    }

    /// Bin centers.
    #[must_use]
    pub fn centers(&self) -> &[f64] {
        &self.centers
    }

    /// Density-normalised bin contents.
    #[must_use]
    pub fn density(&self) -> &[f64] {
        &self.density
    }

    /// Integral of the density over the bins, one for a non-empty histogram.
    #[must_use]
    pub fn integral(&self) -> f64 {
        self.density
            .iter()
            .zip(self.edges.windows(2))
            .map(|(density, edge)| density * (edge[1] - edge[0]))
            .sum()
    }
}

/// Line density weights of the active particles of `particles`.
pub fn line_density(particles: &ParticleEnsemble, num_slices: usize) -> Result<Vec<f64>, IbsError> {
    Ok(LineDensity::new(num_slices)?.estimate_active(particles))
}

#[cfg(test)]
mod tests {
    use super::LineDensity;
    use ibs_kick_beam::ops::CpuOps;
    use ibs_kick_core::IbsError;

    #[test]
    fn slice_count_must_be_positive() {
        assert!(matches!(
            LineDensity::new(0),
            Err(IbsError::InvalidConfiguration {
                parameter: "num_slices",
                ..
            })
        ));
        assert!(LineDensity::from_signed(-3).is_err());
        assert_eq!(LineDensity::from_signed(12).expect("estimator").num_slices(), 12);
    }

    #[test]
    fn profile_spans_the_bunch_with_padding() {
        let estimator = LineDensity::new(4).expect("estimator");
        let profile = estimator
            .profile(&CpuOps, &[-1.0, -0.5, 0.0, 0.5, 1.0])
            .expect("profile");
        assert_eq!(profile.edges().len(), 5);
        assert_eq!(profile.centers().len(), 4);
        assert!(profile.edges()[0] < -1.0);
        assert!(profile.edges()[4] > 1.0);
        assert!((profile.integral() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn single_particle_gets_unit_weight() {
        let estimator = LineDensity::new(10).expect("estimator");
        assert_eq!(estimator.estimate(&CpuOps, &[0.3]), vec![1.0]);
        assert_eq!(estimator.estimate(&CpuOps, &[0.3, 0.3, 0.3]), vec![1.0; 3]);
        assert!(estimator.estimate(&CpuOps, &[]).is_empty());
    }
}
