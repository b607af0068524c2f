// numeric helpers shared by sampling, integration and derivative checks

/// `num_values` evenly spaced points from `start` to `end`, both included.
///
/// Each point is computed from its index, so the grid hits `start`, `end` and the
/// midpoint of a symmetric range exactly.
pub fn linspace(start: f64, end: f64, num_values: usize) -> Vec<f64> {
    match num_values {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let last = (num_values - 1) as f64;
            (0..num_values)
                .map(|i| {
                    if i == num_values - 1 {
                        end
                    } else {
                        start + (end - start) * (i as f64) / last
                    }
                })
                .collect()
        }
    }
}

/*
    let x_values = vec![0.0, 1.0, 2.0, 3.0, 4.0];
    let derivatives = numerical_derivative(|x| x * x, &x_values, 1e-3);
*/
/// Central difference derivative of `f` at each of `x_values`.
pub fn numerical_derivative<F>(f: F, x_values: &[f64], h: f64) -> Vec<f64>
where
    F: Fn(f64) -> f64,
{
    x_values
        .iter()
        .map(|&x| (f(x + h) - f(x - h)) / (2.0 * h))
        .collect()
}

/// Root mean square distance between two equally long vectors, scaled by their length.
pub fn norm(x: &[f64], y: &[f64]) -> f64 {
    assert_eq!(x.len(), y.len());
    (1.0 / x.len() as f64)
        * x.iter()
            .zip(y.iter())
            .map(|(a, b)| (a - b).powi(2))
            .sum::<f64>()
            .sqrt()
}

/// Greatest common divisor for small integers, used to reduce rational coefficients.
pub fn gcd(a: i64, b: i64) -> i64 {
    let (mut a, mut b) = (a.abs(), b.abs());
    while b != 0 {
        (a, b) = (b, a % b);
    }
    a
}

/// Finds `p/q` with `q <= max_denominator` equal to `value` up to round-off.
pub fn as_rational(value: f64, max_denominator: i64) -> Option<(i64, i64)> {
    if !value.is_finite() {
        return None;
    }
    for q in 1..=max_denominator {
        let p = (value * q as f64).round();
        if p.abs() > 1e12 {
            return None;
        }
        if (p / q as f64 - value).abs() <= 1e-12 * value.abs().max(1.0) {
            let p = p as i64;
            let g = gcd(p, q).max(1);
            return Some((p / g, q / g));
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_linspace_endpoints_and_midpoint() {
        let x = linspace(-1.0, 1.0, 5);
        assert_eq!(x, vec![-1.0, -0.5, 0.0, 0.5, 1.0]);
        let x = linspace(-3.0, 3.0, 101);
        assert_eq!(x[50], 0.0);
        assert_eq!(x[100], 3.0);
        assert!(linspace(0.0, 1.0, 0).is_empty());
        assert_eq!(linspace(2.0, 5.0, 1), vec![2.0]);
    }

    #[test]
    fn test_numerical_derivative() {
        let d = numerical_derivative(|x| x * x, &[0.0, 1.0, 2.0], 1e-4);
        assert_relative_eq!(d[1], 2.0, epsilon = 1e-6);
        assert_relative_eq!(d[2], 4.0, epsilon = 1e-6);
    }

    #[test]
    fn test_as_rational() {
        assert_eq!(as_rational(1.0 / 3.0, 100), Some((1, 3)));
        assert_eq!(as_rational(-2.5, 100), Some((-5, 2)));
        assert_eq!(as_rational(4.0, 100), Some((4, 1)));
        assert_eq!(as_rational(std::f64::consts::PI, 100), None);
        assert_eq!(gcd(12, -18), 6);
    }
}
