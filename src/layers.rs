//! Input and fully-connected layers of a feedforward network.
use crate::matrix::{Element, Matrix};

/// First layer of a network; it only fixes the input width.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputLayer {
    nodes: usize,
}

impl InputLayer {
    pub fn new(nodes: usize) -> Self {
        Self { nodes }
    }

    pub fn node_count(&self) -> usize {
        self.nodes
    }
}

/// A fully-connected layer: `weights` is `nodes x previous_nodes`, `biases` is `nodes x 1`.
///
/// `previous` is the index of the feeding layer inside the owning network's
/// layer list. It is only read, never used to reach into that layer mutably.
#[derive(Debug, Clone, PartialEq)]
pub struct FullyConnectedLayer<T> {
    nodes: usize,
    previous: usize,
    weights: Matrix<T>,
    biases: Matrix<T>,
}

impl<T: Element> FullyConnectedLayer<T> {
    /// Zero-initialized layer fed by the layer at index `previous` of width `previous_nodes`.
    pub fn new(nodes: usize, previous: usize, previous_nodes: usize) -> Self {
        Self {
            nodes,
            previous,
            weights: Matrix::new(nodes, previous_nodes),
            biases: Matrix::new(nodes, 1),
        }
    }

    pub fn node_count(&self) -> usize {
        self.nodes
    }

    /// Index of the feeding layer in the network.
    pub fn previous(&self) -> usize {
        self.previous
    }

    pub fn weights(&self) -> &Matrix<T> {
        &self.weights
    }

    pub fn biases(&self) -> &Matrix<T> {
        &self.biases
    }

    pub fn weights_mut(&mut self) -> &mut Matrix<T> {
        &mut self.weights
    }

    pub fn biases_mut(&mut self) -> &mut Matrix<T> {
        &mut self.biases
    }

    /// Replaces the weights. Panics if the shape differs from the current one.
    pub fn set_weights(&mut self, weights: Matrix<T>) {
        assert_eq!(weights.shape(), self.weights.shape(), "weight shape mismatch");
        self.weights = weights;
    }

    /// Replaces the biases. Panics if the shape differs from the current one.
    pub fn set_biases(&mut self, biases: Matrix<T>) {
        assert_eq!(biases.shape(), self.biases.shape(), "bias shape mismatch");
        self.biases = biases;
    }

    /// `sigmoid(W · input + B)` for one column of activations.
    pub fn activate(&self, input: &Matrix<T>) -> Matrix<T> {
        let mut a = self.weights.dot(input);
        a += &self.biases;
        a.sigmoid();
        a
    }
}

/// A layer of the network. Only the node count is shared between variants.
#[derive(Debug, Clone, PartialEq)]
pub enum Layer<T> {
    Input(InputLayer),
    FullyConnected(FullyConnectedLayer<T>),
}

impl<T: Element> Layer<T> {
    pub fn node_count(&self) -> usize {
        match self {
            Layer::Input(l) => l.node_count(),
            Layer::FullyConnected(l) => l.node_count(),
        }
    }

    pub fn as_fully_connected(&self) -> Option<&FullyConnectedLayer<T>> {
        match self {
            Layer::FullyConnected(l) => Some(l),
            Layer::Input(_) => None,
        }
    }

    pub fn as_fully_connected_mut(&mut self) -> Option<&mut FullyConnectedLayer<T>> {
        match self {
            Layer::FullyConnected(l) => Some(l),
            Layer::Input(_) => None,
        }
    }
}
