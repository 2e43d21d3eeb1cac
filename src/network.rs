//! Feedforward neural network (FNN): forward passes, backpropagation and mini-batch SGD.
//!
//! The network owns its layers in a single list. Index 0 is the input layer and
//! every following entry is a fully-connected layer fed by the entry before it,
//! which it refers to by index.
//!
//! Training minimizes the cross-entropy cost of sigmoid outputs. For one sample
//! with activations `a_0 .. a_L` and target `y`:
//!
//! ```text
//! δ_L     = a_L - y
//! δ_k     = (W_{k+1}ᵀ · δ_{k+1}) ⊙ a_k ⊙ (1 - a_k)
//! ∇W_k    = δ_k · a_{k-1}ᵀ
//! ∇B_k    = δ_k
//! ```
//!
//! `sgd_batch` sums these over a batch and applies a single update per layer:
//!
//! ```text
//! W ← W · (1 - η·α / n) - (η / m) · Σ ∇W
//! B ← B - (η / m) · Σ ∇B
//! ```
//!
//! with learning rate `η`, weight decay `α`, training set size `n` and batch size `m`.
use crate::activations::sigmoid_prime;
use crate::layers::{FullyConnectedLayer, InputLayer, Layer};
use crate::loss::{cross_entropy_delta, cross_entropy_loss};
use crate::matrix::{Element, Matrix};
use anyhow::{anyhow, Result};
use log::{debug, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};
use rayon::prelude::*;
use rayon::ThreadPool;
use std::fmt;

/// Feedforward network with sigmoid activations on every fully-connected layer.
#[derive(Debug, Clone, PartialEq)]
pub struct Fnn<T> {
    layers: Vec<Layer<T>>,
}

/// Weight and bias gradients for every fully-connected layer, in layer order.
#[derive(Debug, Clone, PartialEq)]
pub struct Gradients<T> {
    pub weights: Vec<Matrix<T>>,
    pub biases: Vec<Matrix<T>>,
}

impl<T: Element> Gradients<T> {
    /// Zeroed accumulators shaped like the parameters of `fnn`.
    pub fn zeros(fnn: &Fnn<T>) -> Self {
        let (weights, biases) = fnn
            .fully_connected_layers()
            .map(|l| {
                (
                    Matrix::new(l.weights().rows(), l.weights().cols()),
                    Matrix::new(l.biases().rows(), 1),
                )
            })
            .unzip();
        Self { weights, biases }
    }

    /// Adds `other` into `self`, layer by layer.
    pub fn accumulate(&mut self, other: &Gradients<T>) {
        assert_eq!(self.weights.len(), other.weights.len(), "gradient depth mismatch");
        for (acc, g) in self.weights.iter_mut().zip(&other.weights) {
            *acc += g;
        }
        for (acc, g) in self.biases.iter_mut().zip(&other.biases) {
            *acc += g;
        }
    }

    pub fn scale(&mut self, factor: T) {
        self.weights
            .iter_mut()
            .chain(self.biases.iter_mut())
            .for_each(|m| m.scale(factor));
    }
}

impl<T: Element> Fnn<T> {
    /// Network with randomly initialized parameters drawn from the thread RNG.
    ///
    /// `sizes` lists the node count of every layer, input first.
    pub fn new(sizes: &[usize]) -> Result<Self> {
        Self::with_rng(sizes, &mut rand::thread_rng())
    }

    /// Reproducible random initialization.
    pub fn with_seed(sizes: &[usize], seed: u64) -> Result<Self> {
        Self::with_rng(sizes, &mut StdRng::seed_from_u64(seed))
    }

    pub fn with_rng<R: Rng + ?Sized>(sizes: &[usize], rng: &mut R) -> Result<Self> {
        let mut fnn = Self::zeroed(sizes)?;
        for index in 1..fnn.layers.len() {
            fnn.random_init(index, rng)?;
        }
        Ok(fnn)
    }

    /// Network with all parameters set to zero.
    pub fn zeroed(sizes: &[usize]) -> Result<Self> {
        if sizes.len() < 2 {
            return Err(anyhow!(
                "a network needs an input layer and at least one fully-connected layer, got {} layer(s)",
                sizes.len()
            ));
        }
        if let Some(index) = sizes.iter().position(|&n| n == 0) {
            return Err(anyhow!("layer {} has no nodes", index));
        }
        let mut layers = Vec::with_capacity(sizes.len());
        layers.push(Layer::Input(InputLayer::new(sizes[0])));
        for (index, &nodes) in sizes.iter().enumerate().skip(1) {
            let previous = index - 1;
            let previous_nodes = layers[previous].node_count();
            layers.push(Layer::FullyConnected(FullyConnectedLayer::new(
                nodes,
                previous,
                previous_nodes,
            )));
        }
        Ok(Self { layers })
    }

    /// Gaussian initialization of the layer at `index`.
    ///
    /// Weights are drawn from `N(0, 1/sqrt(fan_in))` where `fan_in` is the node
    /// count of the feeding layer, biases from `N(0, 1)`.
    pub fn random_init<R: Rng + ?Sized>(&mut self, index: usize, rng: &mut R) -> Result<()> {
        let previous = match self.layers.get(index) {
            Some(Layer::FullyConnected(l)) => l.previous(),
            Some(Layer::Input(_)) => {
                return Err(anyhow!("layer {} is the input layer and has no parameters", index))
            }
            None => return Err(anyhow!("no layer at index {}", index)),
        };
        let fan_in = self.layers[previous].node_count() as f64;
        let gauss_weights = Normal::new(0.0, 1.0 / fan_in.sqrt())
            .map_err(|e| anyhow!("weight distribution for layer {}: {}", index, e))?;
        let gauss_biases =
            Normal::new(0.0, 1.0).map_err(|e| anyhow!("bias distribution: {}", e))?;

        if let Some(layer) = self.layers[index].as_fully_connected_mut() {
            let (rows, cols) = layer.weights().shape();
            for i in 0..rows {
                for j in 0..cols {
                    layer.weights_mut()[(i, j)] = T::from_f64(gauss_weights.sample(rng));
                }
                layer.biases_mut()[(i, 0)] = T::from_f64(gauss_biases.sample(rng));
            }
        }
        Ok(())
    }

    pub fn layers(&self) -> &[Layer<T>] {
        &self.layers
    }

    /// Node count of every layer, input first.
    pub fn layer_sizes(&self) -> Vec<usize> {
        self.layers.iter().map(Layer::node_count).collect()
    }

    /// Number of fully-connected layers.
    pub fn depth(&self) -> usize {
        self.layers.len() - 1
    }

    pub fn input_size(&self) -> usize {
        self.layers[0].node_count()
    }

    pub fn output_size(&self) -> usize {
        self.layers[self.layers.len() - 1].node_count()
    }

    /// The `i`-th fully-connected layer (0 is the first hidden layer).
    pub fn fully_connected(&self, i: usize) -> Option<&FullyConnectedLayer<T>> {
        self.layers.get(i + 1).and_then(Layer::as_fully_connected)
    }

    pub fn fully_connected_mut(&mut self, i: usize) -> Option<&mut FullyConnectedLayer<T>> {
        self.layers.get_mut(i + 1).and_then(Layer::as_fully_connected_mut)
    }

    pub fn fully_connected_layers(&self) -> impl Iterator<Item = &FullyConnectedLayer<T>> {
        self.layers.iter().filter_map(Layer::as_fully_connected)
    }

    /// Output activation for `input`. Only the current activation is kept alive.
    pub fn feedforward(&self, input: &Matrix<T>) -> Matrix<T> {
        self.check_input(input);
        self.fully_connected_layers()
            .fold(input.clone(), |activation, layer| layer.activate(&activation))
    }

    /// Every activation from the input to the output, `depth() + 1` matrices.
    pub fn feedforward_with_trace(&self, input: &Matrix<T>) -> Vec<Matrix<T>> {
        self.check_input(input);
        let mut activations = Vec::with_capacity(self.layers.len());
        let mut current = input.clone();
        for layer in self.fully_connected_layers() {
            let next = layer.activate(&current);
            activations.push(std::mem::replace(&mut current, next));
        }
        activations.push(current);
        activations
    }

    /// Gradients of the cross-entropy cost for one `(input, target)` pair.
    pub fn backpropagation(&self, input: &Matrix<T>, target: &Matrix<T>) -> Gradients<T> {
        assert_eq!(
            target.shape(),
            (self.output_size(), 1),
            "target must be a {}x1 column",
            self.output_size()
        );
        let layers: Vec<&FullyConnectedLayer<T>> = self.fully_connected_layers().collect();
        let mut activations = self.feedforward_with_trace(input);
        let output = activations
            .pop()
            .expect("trace always ends with the output activation");
        let mut delta = cross_entropy_delta(&output, target);
        drop(output);

        let mut weights = Vec::with_capacity(layers.len());
        let mut biases = Vec::with_capacity(layers.len());
        // activations[k] feeds layers[k]; each one is dropped once consumed
        for (k, previous) in activations.into_iter().enumerate().rev() {
            weights.push(delta.view().dot(previous.view().t()));
            if k == 0 {
                biases.push(delta);
                break;
            }
            let mut propagated = layers[k].weights().view().t().dot(delta.view());
            propagated.hadamard(&sigmoid_prime(&previous));
            biases.push(std::mem::replace(&mut delta, propagated));
        }
        weights.reverse();
        biases.reverse();
        Gradients { weights, biases }
    }

    /// Summed per-sample gradients of a batch, computed sequentially.
    pub fn batch_gradients(&self, inputs: &[Matrix<T>], targets: &[Matrix<T>]) -> Gradients<T> {
        assert_eq!(inputs.len(), targets.len(), "batch inputs and targets differ in length");
        let mut nabla = Gradients::zeros(self);
        for (input, target) in inputs.iter().zip(targets) {
            let delta_nabla = self.backpropagation(input, target);
            nabla.accumulate(&delta_nabla);
        }
        nabla
    }

    /// Summed per-sample gradients of a batch, fanned out on `pool`.
    ///
    /// The batch is cut into one contiguous chunk per worker. Workers only read
    /// the network. Their partial sums are added together in chunk order after
    /// all of them finished, so for a given worker count the result does not
    /// depend on scheduling. It may differ from [`Fnn::batch_gradients`] by
    /// floating-point summation order.
    pub fn batch_gradients_parallel(
        &self,
        inputs: &[Matrix<T>],
        targets: &[Matrix<T>],
        pool: &ThreadPool,
    ) -> Gradients<T> {
        assert_eq!(inputs.len(), targets.len(), "batch inputs and targets differ in length");
        let workers = pool.current_num_threads().max(1);
        let chunk = inputs.len().div_ceil(workers).max(1);
        let partials: Vec<Gradients<T>> = pool.install(|| {
            inputs
                .par_chunks(chunk)
                .zip(targets.par_chunks(chunk))
                .map(|(xs, ys)| self.batch_gradients(xs, ys))
                .collect()
        });
        let mut nabla = Gradients::zeros(self);
        for partial in &partials {
            nabla.accumulate(partial);
        }
        nabla
    }

    /// Applies summed batch gradients with weight decay. Biases are not decayed.
    pub fn apply_gradients(
        &mut self,
        mut nabla: Gradients<T>,
        batch_len: usize,
        training_set_size: usize,
        eta: f64,
        alpha: f64,
    ) {
        assert!(batch_len > 0, "batch length must be positive");
        assert!(training_set_size > 0, "training set size must be positive");
        assert_eq!(nabla.weights.len(), self.depth(), "gradient depth mismatch");
        nabla.scale(T::from_f64(eta / batch_len as f64));
        let decay = T::from_f64(1.0 - eta * alpha / training_set_size as f64);
        let layers = self.layers.iter_mut().filter_map(Layer::as_fully_connected_mut);
        for (layer, (nabla_w, nabla_b)) in layers.zip(nabla.weights.iter().zip(&nabla.biases)) {
            let weights = layer.weights_mut();
            *weights *= decay;
            *weights -= nabla_w;
            *layer.biases_mut() -= nabla_b;
        }
    }

    /// One mini-batch SGD step: backpropagate every sample, then update once.
    ///
    /// The batch size `m` dividing the summed gradients is `inputs.len()`, so a
    /// short last batch is averaged over its own length. An empty batch leaves
    /// the network unchanged.
    pub fn sgd_batch(
        &mut self,
        inputs: &[Matrix<T>],
        targets: &[Matrix<T>],
        training_set_size: usize,
        eta: f64,
        alpha: f64,
    ) {
        if inputs.is_empty() {
            warn!("empty batch, parameters left unchanged");
            return;
        }
        let nabla = self.batch_gradients(inputs, targets);
        self.apply_gradients(nabla, inputs.len(), training_set_size, eta, alpha);
    }

    /// Same update as [`Fnn::sgd_batch`] with the gradient computation spread over `pool`.
    pub fn sgd_batch_parallel(
        &mut self,
        inputs: &[Matrix<T>],
        targets: &[Matrix<T>],
        training_set_size: usize,
        eta: f64,
        alpha: f64,
        pool: &ThreadPool,
    ) {
        if inputs.is_empty() {
            warn!("empty batch, parameters left unchanged");
            return;
        }
        let nabla = self.batch_gradients_parallel(inputs, targets, pool);
        debug!(
            "batch of {} samples reduced from {} workers",
            inputs.len(),
            pool.current_num_threads()
        );
        self.apply_gradients(nabla, inputs.len(), training_set_size, eta, alpha);
    }

    /// Mean cross-entropy cost over a set of samples.
    pub fn cost(&self, inputs: &[Matrix<T>], targets: &[Matrix<T>]) -> f64 {
        assert_eq!(inputs.len(), targets.len(), "inputs and targets differ in length");
        if inputs.is_empty() {
            return 0.0;
        }
        let total: f64 = inputs
            .iter()
            .zip(targets)
            .map(|(x, y)| cross_entropy_loss(&self.feedforward(x), y))
            .sum();
        total / inputs.len() as f64
    }

    fn check_input(&self, input: &Matrix<T>) {
        assert_eq!(
            input.shape(),
            (self.input_size(), 1),
            "input must be a {}x1 column",
            self.input_size()
        );
    }
}

impl<T: Element> fmt::Display for Fnn<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FNN: {:?}", self.layer_sizes())
    }
}
