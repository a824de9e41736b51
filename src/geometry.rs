use nalgebra::Vector2;

use crate::Float;

/// Euclidean distance between two points of the image plane.
pub(crate) fn distance<F: Float>(a: &Vector2<F>, b: &Vector2<F>) -> F {
    let dx = a[0] - b[0];
    let dy = a[1] - b[1];
    (dx * dx + dy * dy).sqrt()
}

/// Round `value` to `decimals` decimal places, halves away from zero.
pub(crate) fn round_to<F: Float>(value: F, decimals: i32) -> F {
    let scale = F::from_f64(10f64.powi(decimals)).unwrap();
    (value * scale).round() / scale
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use nalgebra::vector;

    #[test]
    fn distance() {
        let a = vector![0., 0.];
        let b = vector![3., 4.];
        assert_eq!(super::distance(&a, &b), 5.);
        assert_eq!(super::distance(&b, &a), 5.);
        assert_eq!(super::distance(&a, &a), 0.);
    }

    #[test]
    fn round_to() {
        assert_abs_diff_eq!(super::round_to(26.4908656, 3), 26.491, epsilon = 1e-12);
        assert_abs_diff_eq!(super::round_to(-0.12349, 3), -0.123, epsilon = 1e-12);
        assert_abs_diff_eq!(super::round_to(9.9996f32, 3), 10.0, epsilon = 1e-6);
    }
}
