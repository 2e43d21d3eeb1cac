// Forward propagation: output shape and range, the trace, and a hand-computed case.

use approx::assert_relative_eq;
use digit_scanner::{Fnn, Matrix};

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

fn fixed_network() -> Fnn<f64> {
    let mut fnn = Fnn::<f64>::zeroed(&[3, 2]).unwrap();
    let layer = fnn.fully_connected_mut(0).unwrap();
    layer.set_weights(Matrix::from_vec(2, 3, vec![0.1, 0.2, 0.3, -0.4, 0.5, -0.6]));
    layer.set_biases(Matrix::column(vec![0.05, -0.05]));
    fnn
}

#[test]
fn hand_computed_two_layer_output() {
    let fnn = fixed_network();
    let out = fnn.feedforward(&Matrix::column(vec![1.0, 0.0, 1.0]));

    assert_eq!(out.shape(), (2, 1));
    // W·x + B = [0.1 + 0.3 + 0.05, -0.4 - 0.6 - 0.05]
    assert_relative_eq!(out[(0, 0)], sigmoid(0.45), epsilon = 1e-9);
    assert_relative_eq!(out[(1, 0)], sigmoid(-1.05), epsilon = 1e-9);
}

#[test]
fn output_has_output_width_and_sigmoid_range() {
    let fnn = Fnn::<f64>::with_seed(&[10, 7, 5, 4], 42).unwrap();
    for s in 0..5 {
        let x = Matrix::column((0..10).map(|i| ((i + s) % 10) as f64 * 3.0 - 12.0).collect());
        let out = fnn.feedforward(&x);
        assert_eq!(out.len(), fnn.output_size());
        assert!(out.as_slice().iter().all(|&v| v > 0.0 && v < 1.0));
    }
}

#[test]
fn trace_holds_input_and_every_layer() {
    let fnn = Fnn::<f32>::with_seed(&[8, 6, 4, 3, 2], 1).unwrap();
    let x = Matrix::column((0..8).map(|i| i as f32 / 8.0).collect());
    let trace = fnn.feedforward_with_trace(&x);

    assert_eq!(trace.len(), fnn.depth() + 1);
    assert_eq!(trace[0], x);
    for (activation, size) in trace.iter().zip(fnn.layer_sizes()) {
        assert_eq!(activation.shape(), (size, 1));
    }
    assert_eq!(trace.last().unwrap(), &fnn.feedforward(&x));
}

#[test]
fn feedforward_is_idempotent() {
    let fnn = Fnn::<f64>::with_seed(&[6, 4, 3], 8).unwrap();
    let x = Matrix::column(vec![0.2, 0.4, 0.1, 0.9, 0.0, 0.5]);
    let first = fnn.feedforward(&x);
    let second = fnn.feedforward(&x);
    assert_eq!(first, second);
}

#[test]
fn feedforward_reflects_parameter_changes_mid_training() {
    let mut fnn = fixed_network();
    let x = Matrix::column(vec![1.0, 0.0, 1.0]);
    let y = Matrix::column(vec![1.0, 0.0]);
    let before = fnn.feedforward(&x);
    fnn.sgd_batch(&[x.clone()], &[y], 100, 0.5, 0.0);
    let after = fnn.feedforward(&x);
    assert!(after[(0, 0)] > before[(0, 0)]);
    assert!(after[(1, 0)] < before[(1, 0)]);
}
