//! Quadrature helpers shared by the formalisms.

/// Trapezoid average of per-point values around the ring.
///
/// The integral over `s` is divided by `circumference`, so optics covering
/// only part of the ring contribute in proportion to their length. A single
/// point, or points that all sit at the same `s`, stand for the whole ring and
/// fall back to the arithmetic mean.
pub(crate) fn ring_average<const N: usize>(
    s: &[f64],
    values: &[[f64; N]],
    circumference: f64,
) -> [f64; N] {
    let mut average = [0.0; N];
    let len = s.len().min(values.len());
    if len == 0 {
        return average;
    }
    let span = s[len - 1] - s[0];
    if len == 1 || span <= 0.0 {
        for value in &values[..len] {
            for (total, component) in average.iter_mut().zip(value) {
                *total += component;
            }
        }
        for total in &mut average {
            *total /= len as f64;
        }
        return average;
    }
    for index in 0..len - 1 {
        let step = s[index + 1] - s[index];
        for component in 0..N {
            average[component] +=
                0.5 * step * (values[index][component] + values[index + 1][component]);
        }
    }
    for total in &mut average {
        *total /= circumference;
    }
    average
}

/// Composite Simpson rule over `[lower, upper]` with `intervals` rounded up to even.
pub(crate) fn simpson<const N: usize, F>(
    lower: f64,
    upper: f64,
    intervals: usize,
    mut integrand: F,
) -> [f64; N]
where
    F: FnMut(f64) -> [f64; N],
{
    let intervals = (intervals.max(2) + 1) & !1;
    let step = (upper - lower) / intervals as f64;
    let mut total = [0.0; N];
    for index in 0..=intervals {
        let weight = if index == 0 || index == intervals {
            1.0
        } else if index % 2 == 1 {
            4.0
        } else {
            2.0
        };
        let sample = integrand(lower + step * index as f64);
        for (sum, value) in total.iter_mut().zip(sample) {
            *sum += weight * value;
        }
    }
    for sum in &mut total {
        *sum *= step / 3.0;
    }
    total
}

#[cfg(test)]
mod tests {
    use super::{ring_average, simpson};

    #[test]
    fn ring_average_of_linear_profile_is_midpoint() {
        let s = [0.0, 1.0, 3.0];
        let values = [[0.0, 2.0], [1.0, 2.0], [3.0, 2.0]];
        assert_eq!(ring_average(&s, &values, 3.0), [1.5, 2.0]);
    }

    #[test]
    fn ring_average_divides_by_circumference() {
        let s = [0.0, 1.0, 3.0];
        let values = [[0.0, 2.0], [1.0, 2.0], [3.0, 2.0]];
        assert_eq!(ring_average(&s, &values, 6.0), [0.75, 1.0]);
    }

    #[test]
    fn ring_average_without_span_uses_mean() {
        assert_eq!(ring_average(&[4.0], &[[7.0]], 100.0), [7.0]);
        assert_eq!(ring_average(&[2.0, 2.0], &[[1.0], [3.0]], 100.0), [2.0]);
    }

    #[test]
    fn simpson_is_exact_for_cubics() {
        let [value] = simpson(0.0, 2.0, 3, |x| [x * x * x - x]);
        assert!((value - 2.0).abs() < 1e-12);
    }
}
