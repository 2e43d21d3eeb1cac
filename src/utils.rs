//! Utility functions for synthetic data, summaries and digit rendering.
use crate::datasets::Dataset;
use crate::matrix::{Element, Matrix};
use crate::network::Fnn;
use crate::training::TrainingReport;
use anyhow::Result;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::fmt::Write;

/// Generate a learnable synthetic dataset.
///
/// Each class gets a random byte prototype of `input_size` pixels; samples are
/// their class prototype with uniform noise of up to ±`noise` added, cycling
/// through the classes in order.
pub fn generate_synthetic_data<T: Element>(
    n_samples: usize,
    input_size: usize,
    classes: usize,
    noise: u8,
    seed: u64,
) -> Result<Dataset<T>> {
    let mut rng = StdRng::seed_from_u64(seed);
    let prototypes: Vec<Vec<u8>> = (0..classes)
        .map(|_| (0..input_size).map(|_| rng.gen()).collect())
        .collect();
    let mut dataset = Dataset::with_capacity(n_samples);
    for i in 0..n_samples {
        let label = i % classes;
        let pixels: Vec<u8> = prototypes[label]
            .iter()
            .map(|&p| {
                let jitter = rng.gen_range(-(noise as i16)..=noise as i16);
                (p as i16 + jitter).clamp(0, 255) as u8
            })
            .collect();
        dataset.push_record(&pixels, label as u8, classes)?;
    }
    Ok(dataset)
}

/// Model summary: one line per layer with its parameter count.
pub fn model_summary<T: Element>(fnn: &Fnn<T>) -> String {
    let mut out = format!("Model Summary:\n{}\n", fnn);
    let _ = writeln!(out, "  input           {:>6} nodes", fnn.input_size());
    let mut total = 0;
    for (i, layer) in fnn.fully_connected_layers().enumerate() {
        let params = layer.weights().len() + layer.biases().len();
        total += params;
        let _ = writeln!(
            out,
            "  dense {:<9} {:>6} nodes {:>9} params",
            i,
            layer.node_count(),
            params
        );
    }
    let _ = write!(out, "  total parameters {}", total);
    out
}

/// Simple table of per-epoch losses
pub fn summary_table(report: &TrainingReport, title: &str) -> String {
    let mut out = format!("{} Summary Table:\n", title);
    out.push_str("+-------+------------+----------+\n");
    out.push_str("| Epoch |       Loss |  Seconds |\n");
    out.push_str("+-------+------------+----------+\n");
    for e in &report.epochs {
        let loss = e.loss.map_or_else(|| "-".to_string(), |l| format!("{:.6}", l));
        let _ = writeln!(out, "| {:>5} | {:>10} | {:>8.2} |", e.epoch, loss, e.seconds);
    }
    out.push_str("+-------+------------+----------+");
    out
}

/// ASCII rendering of a square image column with intensities in `[0, 1)`.
pub fn render_digit<T: Element>(image: &Matrix<T>) -> String {
    let side = (image.len() as f64).sqrt() as usize;
    let mut out = format!("┌{}┐\n", "──".repeat(side));
    for row in image.as_slice().chunks(side.max(1)).take(side) {
        out.push('│');
        for &v in row {
            let v = v.as_f64();
            out.push_str(if v > 0.5 {
                "██"
            } else if v > 0.1 {
                "░░"
            } else {
                "  "
            });
        }
        out.push_str("│\n");
    }
    out.push_str(&format!("└{}┘", "──".repeat(side)));
    out
}
