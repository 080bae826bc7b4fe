//! Array-operation backends used by kick computations.
//!
//! Kick elements never iterate over particle arrays with a fixed
//! implementation. They ask the ensemble's execution context for its
//! [`ArrayOps`] backend and run every reduction, histogram, interpolation and
//! random draw through it. Backends must agree bit-for-bit: reductions whose
//! result depends on summation order keep the sequential default, and random
//! draws are always taken in particle order from the context generator.

use rand::RngCore;
use rand_distr::{Distribution, StandardNormal};

/// Vectorised numeric primitives resolved from an execution context.
pub trait ArrayOps: Send + Sync {
    /// Short identifier of the backend.
    fn name(&self) -> &'static str;

    /// Largest value, ignoring NaN. `None` for an empty slice.
    fn max(&self, values: &[f64]) -> Option<f64>;

    /// Smallest value, ignoring NaN. `None` for an empty slice.
    fn min(&self, values: &[f64]) -> Option<f64>;

    /// Per-bin counts of `values` against monotonically increasing `edges`.
    ///
    /// Bins are half-open `[e_i, e_{i+1})` except the last one, which also
    /// holds values equal to the final edge. Values outside the edges are
    /// dropped.
    fn histogram(&self, values: &[f64], edges: &[f64]) -> Vec<usize>;

    /// Piecewise-linear interpolation of `(xp, fp)` at every `x`, clamping to
    /// the end values outside `xp`.
    fn interp(&self, x: &[f64], xp: &[f64], fp: &[f64]) -> Vec<f64>;

    /// Arithmetic mean. `None` for an empty slice.
    fn mean(&self, values: &[f64]) -> Option<f64> {
        if values.is_empty() {
            return None;
        }
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }

    /// Population standard deviation. `None` for an empty slice.
    fn std(&self, values: &[f64]) -> Option<f64> {
        let mean = self.mean(values)?;
        let variance = values
            .iter()
            .map(|value| (value - mean) * (value - mean))
            .sum::<f64>()
            / values.len() as f64;
        Some(variance.sqrt())
    }

    /// `num` evenly spaced samples over `[start, stop]`, both ends included.
    fn linspace(&self, start: f64, stop: f64, num: usize) -> Vec<f64> {
        match num {
            0 => Vec::new(),
            1 => vec![start],
            _ => {
                let step = (stop - start) / (num - 1) as f64;
                let mut samples: Vec<f64> =
                    (0..num).map(|index| start + step * index as f64).collect();
                samples[num - 1] = stop;
                samples
            }
        }
    }

    /// Density-normalised histogram: the sum of `density · width` over bins is one.
    ///
    /// Every bin is zero when no value falls inside the edges.
    fn histogram_density(&self, values: &[f64], edges: &[f64]) -> Vec<f64> {
        let counts = self.histogram(values, edges);
        let total: usize = counts.iter().sum();
        if total == 0 {
            return vec![0.0; counts.len()];
        }
        counts
            .iter()
            .zip(edges.windows(2))
            .map(|(count, edge)| *count as f64 / (total as f64 * (edge[1] - edge[0])))
            .collect()
    }

    /// Fills `out` with independent standard-normal draws taken in order.
    fn fill_standard_normal(&self, rng: &mut dyn RngCore, out: &mut [f64]) {
        for value in out.iter_mut() {
            *value = StandardNormal.sample(rng);
        }
    }
}

/// Sequential CPU backend.
#[derive(Clone, Copy, Debug, Default)]
pub struct CpuOps;

impl ArrayOps for CpuOps {
    fn name(&self) -> &'static str {
        "cpu"
    }

    fn max(&self, values: &[f64]) -> Option<f64> {
        values.iter().copied().reduce(f64::max)
    }

    fn min(&self, values: &[f64]) -> Option<f64> {
        values.iter().copied().reduce(f64::min)
    }

    fn histogram(&self, values: &[f64], edges: &[f64]) -> Vec<usize> {
        let bins = edges.len().saturating_sub(1);
        let mut counts = vec![0usize; bins];
        for value in values {
            if let Some(bin) = bin_index(*value, edges) {
                counts[bin] += 1;
            }
        }
        counts
    }

    fn interp(&self, x: &[f64], xp: &[f64], fp: &[f64]) -> Vec<f64> {
        x.iter().map(|value| interp_one(*value, xp, fp)).collect()
    }
}

/// Data-parallel CPU backend built on rayon.
#[cfg(feature = "parallel")]
#[derive(Clone, Copy, Debug, Default)]
pub struct ParallelOps;

#[cfg(feature = "parallel")]
impl ArrayOps for ParallelOps {
    fn name(&self) -> &'static str {
        "parallel"
    }

    fn max(&self, values: &[f64]) -> Option<f64> {
        use rayon::prelude::*;
        values.par_iter().copied().reduce_with(f64::max)
    }

    fn min(&self, values: &[f64]) -> Option<f64> {
        use rayon::prelude::*;
        values.par_iter().copied().reduce_with(f64::min)
    }

    fn histogram(&self, values: &[f64], edges: &[f64]) -> Vec<usize> {
        use rayon::prelude::*;
        let bins = edges.len().saturating_sub(1);
        values
            .par_iter()
            .fold(
                || vec![0usize; bins],
                |mut counts, value| {
                    if let Some(bin) = bin_index(*value, edges) {
                        counts[bin] += 1;
                    }
                    counts
                },
            )
            .reduce(
                || vec![0usize; bins],
                |mut left, right| {
                    for (total, count) in left.iter_mut().zip(right) {
                        *total += count;
                    }
                    left
                },
            )
    }

    fn interp(&self, x: &[f64], xp: &[f64], fp: &[f64]) -> Vec<f64> {
        use rayon::prelude::*;
        x.par_iter().map(|value| interp_one(*value, xp, fp)).collect()
    }
}

fn bin_index(value: f64, edges: &[f64]) -> Option<usize> {
    let last = edges.len().checked_sub(1).filter(|last| *last > 0)?;
    if !(value >= edges[0] && value <= edges[last]) {
        return None;
    }
    if value == edges[last] {
        return Some(last - 1);
    }
    let upper = edges.partition_point(|edge| *edge <= value);
    Some(upper - 1)
}

fn interp_one(value: f64, xp: &[f64], fp: &[f64]) -> f64 {
    let len = xp.len().min(fp.len());
    if len == 0 || value.is_nan() {
        return f64::NAN;
    }
    if value <= xp[0] {
        return fp[0];
    }
    if value >= xp[len - 1] {
        return fp[len - 1];
    }
    let upper = xp[..len].partition_point(|grid| *grid <= value);
    let lower = upper - 1;
    let span = xp[upper] - xp[lower];
    if span == 0.0 {
        return fp[upper];
    }
    let fraction = (value - xp[lower]) / span;
    fp[lower] + fraction * (fp[upper] - fp[lower])
}

#[cfg(test)]
mod tests {
    use super::{bin_index, interp_one, ArrayOps, CpuOps};

    #[test]
    fn linspace_includes_both_ends() {
        let samples = CpuOps.linspace(-1.0, 1.0, 5);
        assert_eq!(samples, vec![-1.0, -0.5, 0.0, 0.5, 1.0]);
        assert!(CpuOps.linspace(0.0, 1.0, 0).is_empty());
        assert_eq!(CpuOps.linspace(3.0, 4.0, 1), vec![3.0]);
    }

    #[test]
    fn histogram_closes_the_last_bin() {
        let edges = [0.0, 1.0, 2.0];
        assert_eq!(bin_index(0.0, &edges), Some(0));
        assert_eq!(bin_index(1.0, &edges), Some(1));
        assert_eq!(bin_index(2.0, &edges), Some(1));
        assert_eq!(bin_index(2.5, &edges), None);
        assert_eq!(bin_index(f64::NAN, &edges), None);
        assert_eq!(
            CpuOps.histogram(&[0.1, 0.2, 1.5, 2.0, 7.0], &edges),
            vec![2, 2]
        );
    }

    #[test]
    fn density_histogram_integrates_to_one() {
        let edges = [0.0, 0.5, 2.0];
        let density = CpuOps.histogram_density(&[0.1, 0.2, 0.3, 1.0], &edges);
        let integral: f64 = density
            .iter()
            .zip(edges.windows(2))
            .map(|(value, edge)| value * (edge[1] - edge[0]))
            .sum();
        assert!((integral - 1.0).abs() < 1e-12);
    }

    #[test]
    fn interpolation_clamps_outside_the_grid() {
        let xp = [0.0, 1.0, 2.0];
        let fp = [10.0, 20.0, 40.0];
        assert_eq!(interp_one(-3.0, &xp, &fp), 10.0);
        assert_eq!(interp_one(5.0, &xp, &fp), 40.0);
        assert_eq!(interp_one(0.5, &xp, &fp), 15.0);
        assert_eq!(interp_one(1.5, &xp, &fp), 30.0);
        assert!(interp_one(f64::NAN, &xp, &fp).is_nan());
    }

    #[test]
    fn extrema_ignore_empty_input() {
        assert_eq!(CpuOps.max(&[]), None);
        assert_eq!(CpuOps.min(&[3.0, -1.0, 2.0]), Some(-1.0));
        assert_eq!(CpuOps.std(&[1.0, 1.0, 1.0]), Some(0.0));
    }

    #[cfg(feature = "parallel")]
    #[test]
    fn parallel_backend_matches_sequential_backend() {
        use super::ParallelOps;

        let values: Vec<f64> = (0..10_000)
            .map(|index| ((index * 7_919) % 10_007) as f64 / 10_007.0 - 0.5)
            .collect();
        let edges = CpuOps.linspace(-0.5, 0.5, 41);
        assert_eq!(
            CpuOps.histogram(&values, &edges),
            ParallelOps.histogram(&values, &edges)
        );
        assert_eq!(CpuOps.max(&values), ParallelOps.max(&values));
        assert_eq!(CpuOps.min(&values), ParallelOps.min(&values));

        let centers: Vec<f64> = edges.windows(2).map(|edge| 0.5 * (edge[0] + edge[1])).collect();
        let density = CpuOps.histogram_density(&values, &edges);
        assert_eq!(
            CpuOps.interp(&values, &centers, &density),
            ParallelOps.interp(&values, &centers, &density)
        );
    }
}
