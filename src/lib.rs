//! Feedforward neural networks for handwritten digit recognition.
//!
//! - `Matrix` with owned storage and borrowed, transposable views
//! - Fully-connected sigmoid networks trained by backpropagation under a
//!   cross-entropy cost and mini-batch SGD with L2 weight decay
//! - Optional parallel gradient computation on a fixed worker pool
//! - MNIST IDX loading with skip/count windows, plain or gzip-compressed
//! - Text model persistence and JSON training configuration

pub mod activations;
pub mod config;
pub mod datasets;
pub mod layers;
pub mod loss;
pub mod matrix;
pub mod metrics;
pub mod model_io;
pub mod network;
pub mod scanner;
pub mod training;
pub mod utils;

pub use config::{load_config, TrainingConfig};
pub use datasets::{encode_image, load_mnist, one_hot, Dataset, DatasetWindow, Split};
pub use layers::{FullyConnectedLayer, InputLayer, Layer};
pub use matrix::{Element, Matrix, MatrixView};
pub use metrics::{accuracy, confusion_matrix};
pub use network::{Fnn, Gradients};
pub use scanner::DigitScanner;
pub use training::{TestReport, TrainingOptions, TrainingReport};
pub use utils::{generate_synthetic_data, model_summary, render_digit, summary_table};
