//! `DigitScanner`: a network plus the actions the command line exposes on it.
use crate::config::TrainingConfig;
use crate::datasets::{self, Dataset, DatasetWindow, Split};
use crate::matrix::{Element, Matrix};
use crate::model_io;
use crate::network::Fnn;
use crate::training::{self, TestReport, TrainingOptions, TrainingReport};
use anyhow::{anyhow, Result};
use log::info;
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::path::Path;

/// Owns the network being trained or queried and the optional gradient worker pool.
#[derive(Debug)]
pub struct DigitScanner<T> {
    fnn: Fnn<T>,
    pool: Option<ThreadPool>,
}

impl<T: Element> DigitScanner<T> {
    /// Randomly initialized network with the given layer sizes.
    ///
    /// `threads > 1` enables parallel gradient computation on a pool of that size.
    pub fn new(layers: &[usize], threads: usize) -> Result<Self> {
        Self::with_network(Fnn::new(layers)?, threads)
    }

    pub fn with_network(fnn: Fnn<T>, threads: usize) -> Result<Self> {
        Ok(Self {
            fnn,
            pool: build_pool(threads)?,
        })
    }

    /// Network built from the layers, seed and thread count of `cfg`.
    pub fn from_config(cfg: &TrainingConfig) -> Result<Self> {
        let fnn = match cfg.seed {
            Some(seed) => Fnn::with_seed(&cfg.layers, seed)?,
            None => Fnn::new(&cfg.layers)?,
        };
        Self::with_network(fnn, cfg.threads)
    }

    /// Scanner around a network saved with [`DigitScanner::save`].
    pub fn open<P: AsRef<Path>>(path: P, threads: usize) -> Result<Self> {
        Self::with_network(model_io::load(path)?, threads)
    }

    /// Loads a saved network, keeping the current worker pool.
    pub fn load<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        self.fnn = model_io::load(path)?;
        Ok(())
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        model_io::save(&self.fnn, path)
    }

    /// Replaces the network by a freshly initialized one.
    pub fn set_layers(&mut self, layers: &[usize]) -> Result<()> {
        self.fnn = Fnn::new(layers)?;
        Ok(())
    }

    pub fn network(&self) -> &Fnn<T> {
        &self.fnn
    }

    /// Number of gradient workers; 1 when training runs on the calling thread.
    pub fn threads(&self) -> usize {
        self.pool.as_ref().map_or(1, ThreadPool::current_num_threads)
    }

    /// Trains on `window` of the MNIST training files found in `data_dir`.
    pub fn train(
        &mut self,
        data_dir: &Path,
        window: DatasetWindow,
        options: &TrainingOptions,
    ) -> Result<TrainingReport> {
        let data = datasets::load_mnist(data_dir, Split::Train, window)?;
        info!(
            "training {} on {} images ({} epochs, batch {}, eta {}, alpha {})",
            self.fnn,
            data.len(),
            options.epochs,
            options.batch_size,
            options.eta,
            options.alpha
        );
        self.train_on(&data, options)
    }

    pub fn train_on(&mut self, data: &Dataset<T>, options: &TrainingOptions) -> Result<TrainingReport> {
        training::train(&mut self.fnn, data, options, self.pool.as_ref())
    }

    /// Tests on `window` of the MNIST test files found in `data_dir`.
    pub fn test(&self, data_dir: &Path, window: DatasetWindow) -> Result<TestReport> {
        let data = datasets::load_mnist(data_dir, Split::Test, window)?;
        self.test_on(&data)
    }

    pub fn test_on(&self, data: &Dataset<T>) -> Result<TestReport> {
        training::test(&self.fnn, data, self.pool.as_ref())
    }

    /// Most likely digit for one input column.
    pub fn guess(&self, input: &Matrix<T>) -> Result<usize> {
        if input.shape() != (self.fnn.input_size(), 1) {
            return Err(anyhow!(
                "expected a {}x1 input, got {}x{}",
                self.fnn.input_size(),
                input.rows(),
                input.cols()
            ));
        }
        Ok(training::predict(&self.fnn, input))
    }
}

fn build_pool(threads: usize) -> Result<Option<ThreadPool>> {
    if threads == 0 {
        return Err(anyhow!("thread count must be positive"));
    }
    if threads == 1 {
        return Ok(None);
    }
    let pool = ThreadPoolBuilder::new()
        .num_threads(threads)
        .thread_name(|i| format!("fnn-worker-{}", i))
        .build()
        .map_err(|e| anyhow!("failed to start {} workers: {}", threads, e))?;
    Ok(Some(pool))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thread_count_selects_pool() {
        let serial = DigitScanner::<f32>::new(&[4, 2], 1).unwrap();
        assert_eq!(serial.threads(), 1);
        let parallel = DigitScanner::<f32>::new(&[4, 2], 3).unwrap();
        assert_eq!(parallel.threads(), 3);
        assert!(DigitScanner::<f32>::new(&[4, 2], 0).is_err());
    }

    #[test]
    fn guess_checks_input_shape() {
        let scanner = DigitScanner::<f64>::new(&[4, 3], 1).unwrap();
        assert!(scanner.guess(&Matrix::column(vec![0.0; 5])).is_err());
        assert!(scanner.guess(&Matrix::column(vec![0.0; 4])).unwrap() < 3);
    }

    #[test]
    fn open_restores_saved_network() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("net.txt");
        let scanner = DigitScanner::<f64>::new(&[5, 4, 3], 1).unwrap();
        scanner.save(&path).unwrap();
        let reopened = DigitScanner::<f64>::open(&path, 2).unwrap();
        assert_eq!(reopened.network(), scanner.network());
        assert_eq!(reopened.threads(), 2);
    }

    #[test]
    fn set_layers_rebuilds_network() {
        let mut scanner = DigitScanner::<f64>::new(&[4, 3], 1).unwrap();
        scanner.set_layers(&[6, 5, 2]).unwrap();
        assert_eq!(scanner.network().layer_sizes(), vec![6, 5, 2]);
        assert!(scanner.set_layers(&[6]).is_err());
    }
}
