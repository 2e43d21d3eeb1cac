//! Cross-entropy cost for sigmoid output layers.
use crate::matrix::{Element, Matrix};

/// Cross-entropy of one sample: `-Σ [y ln a + (1 - y) ln(1 - a)]`.
///
/// Activations are clamped away from 0 and 1 before taking logarithms so a
/// saturated output reports a large finite cost instead of infinity.
pub fn cross_entropy_loss<T: Element>(output: &Matrix<T>, target: &Matrix<T>) -> f64 {
    assert_eq!(output.shape(), target.shape(), "output and target size mismatch");
    let eps = 1e-12;
    output
        .as_slice()
        .iter()
        .zip(target.as_slice())
        .map(|(&a, &y)| {
            let a = a.as_f64().clamp(eps, 1.0 - eps);
            let y = y.as_f64();
            -(y * a.ln() + (1.0 - y) * (1.0 - a).ln())
        })
        .sum()
}

/// Output-layer error for sigmoid + cross-entropy: `a - y`.
///
/// The sigmoid derivative of the output layer cancels against the derivative
/// of the cost, so no `a (1 - a)` factor appears here.
pub fn cross_entropy_delta<T: Element>(output: &Matrix<T>, target: &Matrix<T>) -> Matrix<T> {
    let mut delta = output.clone();
    delta -= target;
    delta
}
