//! Graph-convolutional mesh encoder.

use burn::module::Module;
use burn::nn::{Linear, LinearConfig, Relu};
use burn::prelude::*;

use crate::graph::MeshTopology;
use crate::nn::conv::{GraphConv, GraphPool};

/// Encodes a mesh into a fixed-size feature vector.
///
/// Alternates graph convolutions and downsampling across the topology's
/// resolution levels, then flattens the coarsest level and projects it.
#[derive(Module, Debug)]
pub struct MeshEncoder<B: Backend> {
    convs: Vec<GraphConv<B>>,
    pools: Vec<GraphPool<B>>,
    proj: Linear<B>,
    activation: Relu,
}

impl<B: Backend> MeshEncoder<B> {
    /// Build an encoder over `topology` with one channel width per level.
    ///
    /// `channels.len()` must equal `topology.levels()`; the caller validates
    /// this before construction.
    pub fn new(
        topology: &MeshTopology,
        channels: &[usize],
        feature_dim: usize,
        device: &B::Device,
    ) -> Self {
        let mut convs = Vec::with_capacity(topology.levels());
        let mut in_dim = 3;
        for (adjacency, &out_dim) in topology.adjacency.iter().zip(channels) {
            convs.push(GraphConv::new(adjacency, in_dim, out_dim, device));
            in_dim = out_dim;
        }
        let pools = topology
            .downsample
            .iter()
            .map(|t| GraphPool::new(t, device))
            .collect();

        let coarse = topology.coarse_vertex_count();
        let proj = LinearConfig::new(coarse * in_dim, feature_dim).init(device);

        Self {
            convs,
            pools,
            proj,
            activation: Relu::new(),
        }
    }

    /// Forward pass, `[batch, vertices, 3]` to `[batch, feature_dim]`.
    pub fn forward(&self, vertices: Tensor<B, 3>) -> Tensor<B, 2> {
        let mut x = vertices;
        for (i, conv) in self.convs.iter().enumerate() {
            x = self.activation.forward(conv.forward(x));
            if let Some(pool) = self.pools.get(i) {
                x = pool.forward(x);
            }
        }

        let [batch, coarse, ch] = x.dims();
        let flat = x.reshape([batch, coarse * ch]);
        self.activation.forward(self.proj.forward(flat))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::DenseMatrix;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    fn ring_adjacency(n: usize) -> DenseMatrix {
        let mut values = vec![0.0f32; n * n];
        for i in 0..n {
            values[i * n + (i + 1) % n] = 1.0;
            values[((i + 1) % n) * n + i] = 1.0;
        }
        DenseMatrix::new(n, n, values).unwrap()
    }

    #[test]
    fn test_single_level_forward() {
        let device = Default::default();
        let topology = MeshTopology::single_level(ring_adjacency(6), Vec::new());
        let encoder = MeshEncoder::<TestBackend>::new(&topology, &[8], 16, &device);

        let vertices = Tensor::zeros([2, 6, 3], &device);
        assert_eq!(encoder.forward(vertices).dims(), [2, 16]);
    }

    #[test]
    fn test_two_level_forward() {
        let device = Default::default();
        let topology = MeshTopology {
            adjacency: vec![ring_adjacency(6), ring_adjacency(3)],
            downsample: vec![DenseMatrix::new(3, 6, vec![0.5; 18]).unwrap()],
            upsample: vec![DenseMatrix::new(6, 3, vec![0.5; 18]).unwrap()],
            faces: Vec::new(),
        };
        let encoder = MeshEncoder::<TestBackend>::new(&topology, &[8, 16], 4, &device);

        let vertices = Tensor::zeros([5, 6, 3], &device);
        assert_eq!(encoder.forward(vertices).dims(), [5, 4]);
    }
}
