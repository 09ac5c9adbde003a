//! Graph convolution and pooling primitives.
//!
//! Both operate on per-vertex feature tensors of shape `[batch, vertices,
//! channels]`. Propagation matrices are fixed inputs derived from the mesh
//! topology, not learned parameters, so they are stored as plain tensors.

use burn::module::Module;
use burn::nn::{Linear, LinearConfig};
use burn::prelude::*;

use crate::graph::{normalized_adjacency, DenseMatrix};

/// One graph-convolution layer: a per-vertex linear map followed by feature
/// propagation over the normalized adjacency.
#[derive(Module, Debug)]
pub struct GraphConv<B: Backend> {
    linear: Linear<B>,
    /// Normalized adjacency, `[vertices, vertices]`.
    propagation: Tensor<B, 2>,
}

impl<B: Backend> GraphConv<B> {
    /// Build a layer over `adjacency` mapping `input` to `output` channels.
    ///
    /// The adjacency is symmetrically normalized with self-loops once at
    /// construction.
    pub fn new(
        adjacency: &DenseMatrix,
        input: usize,
        output: usize,
        device: &B::Device,
    ) -> Self {
        Self {
            linear: LinearConfig::new(input, output).init(device),
            propagation: normalized_adjacency(adjacency).to_tensor(device),
        }
    }

    /// Forward pass, `[batch, vertices, input]` to `[batch, vertices, output]`.
    pub fn forward(&self, x: Tensor<B, 3>) -> Tensor<B, 3> {
        let [batch, _, _] = x.dims();
        let h = self.linear.forward(x);
        let [n, _] = self.propagation.dims();
        let propagation = self.propagation.clone().reshape([1, n, n]).repeat_dim(0, batch);
        propagation.matmul(h)
    }
}

/// Fixed linear resampling between two resolution levels.
#[derive(Module, Debug)]
pub struct GraphPool<B: Backend> {
    /// Resampling transform, `[vertices_out, vertices_in]`.
    transform: Tensor<B, 2>,
}

impl<B: Backend> GraphPool<B> {
    /// Wrap a downsampling or upsampling transform.
    pub fn new(transform: &DenseMatrix, device: &B::Device) -> Self {
        Self {
            transform: transform.to_tensor(device),
        }
    }

    /// Forward pass, `[batch, vertices_in, C]` to `[batch, vertices_out, C]`.
    pub fn forward(&self, x: Tensor<B, 3>) -> Tensor<B, 3> {
        let [batch, _, _] = x.dims();
        let [rows, cols] = self.transform.dims();
        let transform = self.transform.clone().reshape([1, rows, cols]).repeat_dim(0, batch);
        transform.matmul(x)
    }
}
