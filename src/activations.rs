//! Sigmoid activation and its derivative.
use crate::matrix::{Element, Matrix};

/// Sigmoid: 1 / (1 + exp(-x))
pub fn sigmoid<T: Element>(x: T) -> T {
    T::one() / (T::one() + (-x).exp())
}

/// Derivative of the sigmoid expressed through its output: `a * (1 - a)`.
pub fn sigmoid_prime_from_activation<T: Element>(a: T) -> T {
    a * (T::one() - a)
}

/// Elementwise `a ⊙ (1 - a)` for an activation column.
pub fn sigmoid_prime<T: Element>(activation: &Matrix<T>) -> Matrix<T> {
    let mut sp = Matrix::filled(activation.rows(), activation.cols(), T::one());
    sp -= activation;
    sp.hadamard(activation);
    sp
}
