//! Training and testing drivers over decoded datasets.
use crate::config::TrainingConfig;
use crate::datasets::Dataset;
use crate::matrix::{Element, Matrix};
use crate::metrics::{accuracy, confusion_matrix, count_correct};
use crate::network::Fnn;
use anyhow::{anyhow, Context, Result};
use log::{debug, info};
use rayon::prelude::*;
use rayon::ThreadPool;
use serde::Serialize;
use std::fmt;
use std::path::Path;
use std::time::Instant;

/// Hyperparameters of a training run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrainingOptions {
    pub epochs: usize,
    pub batch_size: usize,
    pub eta: f64,
    pub alpha: f64,
    /// Compute the mean training cost after each epoch.
    pub track_loss: bool,
}

impl From<&TrainingConfig> for TrainingOptions {
    fn from(cfg: &TrainingConfig) -> Self {
        Self {
            epochs: cfg.epochs,
            batch_size: cfg.batch_size,
            eta: cfg.eta,
            alpha: cfg.alpha,
            track_loss: cfg.track_loss,
        }
    }
}

/// Outcome of one epoch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EpochStats {
    pub epoch: usize,
    /// Mean cross-entropy over the training set, when tracked.
    pub loss: Option<f64>,
    /// Time spent on the parameter updates.
    pub seconds: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrainingReport {
    pub epochs: Vec<EpochStats>,
}

impl TrainingReport {
    pub fn final_loss(&self) -> Option<f64> {
        self.epochs.last().and_then(|e| e.loss)
    }

    pub fn total_seconds(&self) -> f64 {
        self.epochs.iter().map(|e| e.seconds).sum()
    }

    /// Writes one `epoch,loss,seconds` row per epoch.
    pub fn write_csv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let mut wtr = csv::Writer::from_path(path)
            .with_context(|| format!("failed to create {}", path.display()))?;
        for stats in &self.epochs {
            wtr.serialize(stats)?;
        }
        wtr.flush()?;
        Ok(())
    }
}

/// Runs mini-batch SGD over `data` for `options.epochs` epochs.
///
/// Batches are cut once, in record order, and visited in that same order every
/// epoch; samples are never reshuffled. The last batch is shorter when the
/// dataset length is not a multiple of the batch size. With a `pool`, each
/// batch's gradients are computed by its workers.
pub fn train<T: Element>(
    fnn: &mut Fnn<T>,
    data: &Dataset<T>,
    options: &TrainingOptions,
    pool: Option<&ThreadPool>,
) -> Result<TrainingReport> {
    if data.is_empty() {
        return Err(anyhow!("training set is empty"));
    }
    if options.epochs == 0 || options.batch_size == 0 {
        return Err(anyhow!("epochs and batch size must be positive"));
    }
    check_shapes(fnn, data)?;

    let training_set_size = data.len();
    let batches: Vec<(&[Matrix<T>], &[Matrix<T>])> = data
        .inputs
        .chunks(options.batch_size)
        .zip(data.targets.chunks(options.batch_size))
        .collect();
    debug!(
        "{} samples in {} batches of up to {}",
        training_set_size,
        batches.len(),
        options.batch_size
    );

    let mut report = TrainingReport::default();
    for epoch in 1..=options.epochs {
        let start = Instant::now();
        for &(inputs, targets) in &batches {
            match pool {
                Some(pool) => fnn.sgd_batch_parallel(
                    inputs,
                    targets,
                    training_set_size,
                    options.eta,
                    options.alpha,
                    pool,
                ),
                None => fnn.sgd_batch(inputs, targets, training_set_size, options.eta, options.alpha),
            }
        }
        let seconds = start.elapsed().as_secs_f64();
        let loss = options
            .track_loss
            .then(|| fnn.cost(&data.inputs, &data.targets));
        match loss {
            Some(loss) => info!(
                "epoch {}/{}: loss {:.6} ({:.2} s)",
                epoch, options.epochs, loss, seconds
            ),
            None => info!("epoch {}/{} ({:.2} s)", epoch, options.epochs, seconds),
        }
        report.epochs.push(EpochStats {
            epoch,
            loss,
            seconds,
        });
    }
    Ok(report)
}

fn check_shapes<T: Element>(fnn: &Fnn<T>, data: &Dataset<T>) -> Result<()> {
    if data.targets.len() != data.inputs.len() || data.labels.len() != data.inputs.len() {
        return Err(anyhow!(
            "dataset holds {} inputs, {} targets and {} labels",
            data.inputs.len(),
            data.targets.len(),
            data.labels.len()
        ));
    }
    check_inputs(fnn, data)?;
    if let Some(y) = data.targets.iter().find(|y| y.shape() != (fnn.output_size(), 1)) {
        return Err(anyhow!(
            "target of {} classes does not fit an output layer of {} nodes",
            y.len(),
            fnn.output_size()
        ));
    }
    Ok(())
}

fn check_inputs<T: Element>(fnn: &Fnn<T>, data: &Dataset<T>) -> Result<()> {
    if let Some(x) = data.inputs.iter().find(|x| x.shape() != (fnn.input_size(), 1)) {
        return Err(anyhow!(
            "sample of {} values does not fit an input layer of {} nodes",
            x.len(),
            fnn.input_size()
        ));
    }
    Ok(())
}

/// Predicted class: index of the strongest output activation.
pub fn predict<T: Element>(fnn: &Fnn<T>, input: &Matrix<T>) -> usize {
    fnn.feedforward(input).argmax()
}

/// Result of evaluating a network on labeled samples.
#[derive(Debug, Clone, PartialEq)]
pub struct TestReport {
    pub correct: usize,
    pub total: usize,
    /// `[true_class][predicted_class]` counts.
    pub confusion: Vec<Vec<usize>>,
}

impl TestReport {
    /// Fraction of correct predictions, in `[0, 1]`.
    pub fn accuracy(&self) -> f64 {
        accuracy(self.correct, self.total)
    }

    pub fn percent(&self) -> f64 {
        100.0 * self.accuracy()
    }
}

impl fmt::Display for TestReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} % ({}/{})", self.percent(), self.correct, self.total)
    }
}

/// Classifies every sample and compares the prediction with its label.
pub fn test<T: Element>(
    fnn: &Fnn<T>,
    data: &Dataset<T>,
    pool: Option<&ThreadPool>,
) -> Result<TestReport> {
    if data.labels.len() != data.inputs.len() {
        return Err(anyhow!(
            "{} samples but {} labels",
            data.inputs.len(),
            data.labels.len()
        ));
    }
    check_inputs(fnn, data)?;
    let classes = fnn.output_size();
    if let Some(&label) = data.labels.iter().find(|&&l| l as usize >= classes) {
        return Err(anyhow!(
            "label {} cannot be predicted by an output layer of {} nodes",
            label,
            classes
        ));
    }
    let predictions: Vec<usize> = match pool {
        Some(pool) => pool.install(|| data.inputs.par_iter().map(|x| predict(fnn, x)).collect()),
        None => data.inputs.iter().map(|x| predict(fnn, x)).collect(),
    };
    let report = TestReport {
        correct: count_correct(&predictions, &data.labels),
        total: data.len(),
        confusion: confusion_matrix(&predictions, &data.labels, classes),
    };
    info!("test accuracy {}", report);
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(correct: usize, total: usize) -> TestReport {
        TestReport {
            correct,
            total,
            confusion: Vec::new(),
        }
    }

    #[test]
    fn percent_of_perfect_and_half() {
        assert_eq!(report(2, 2).percent(), 100.0);
        assert_eq!(report(1, 2).percent(), 50.0);
        assert_eq!(report(0, 0).percent(), 0.0);
        assert_eq!(report(1, 2).to_string(), "50 % (1/2)");
    }

    #[test]
    fn empty_training_set_is_rejected() {
        let mut fnn = Fnn::<f64>::zeroed(&[4, 2]).unwrap();
        let options = TrainingOptions {
            epochs: 1,
            batch_size: 1,
            eta: 0.1,
            alpha: 0.0,
            track_loss: false,
        };
        assert!(train(&mut fnn, &Dataset::with_capacity(0), &options, None).is_err());
    }

    #[test]
    fn mismatched_sample_width_is_rejected() {
        let mut fnn = Fnn::<f64>::zeroed(&[3, 10]).unwrap();
        let mut data = Dataset::with_capacity(1);
        data.push_record(&[1, 2, 3, 4], 2, 10).unwrap();
        let options = TrainingOptions {
            epochs: 1,
            batch_size: 1,
            eta: 0.1,
            alpha: 0.0,
            track_loss: false,
        };
        let err = train(&mut fnn, &data, &options, None).unwrap_err();
        assert!(err.to_string().contains("input layer of 3 nodes"));
    }

    #[test]
    fn testing_with_wrong_sample_width_is_an_error() {
        let fnn = Fnn::<f64>::zeroed(&[9, 3]).unwrap();
        let mut data = Dataset::with_capacity(2);
        data.push_record(&[7; 16], 1, 3).unwrap();
        data.push_record(&[9; 16], 2, 3).unwrap();
        let err = test(&fnn, &data, None).unwrap_err();
        assert!(err.to_string().contains("input layer of 9 nodes"));
    }

    #[test]
    fn uneven_dataset_vectors_are_rejected() {
        let mut fnn = Fnn::<f64>::zeroed(&[4, 2]).unwrap();
        let mut data = Dataset::with_capacity(3);
        for label in 0..3 {
            data.push_record(&[1, 2, 3, 4], label % 2, 2).unwrap();
        }
        data.targets.pop();
        let options = TrainingOptions {
            epochs: 1,
            batch_size: 2,
            eta: 0.1,
            alpha: 0.0,
            track_loss: false,
        };
        let err = train(&mut fnn, &data, &options, None).unwrap_err();
        assert!(err.to_string().contains("3 inputs, 2 targets and 3 labels"));

        data.labels.pop();
        assert!(test(&fnn, &data, None).is_err());
    }
}
