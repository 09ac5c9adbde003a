//! Attribute-conditioned mesh decoder, mirror of the encoder.

use burn::module::Module;
use burn::nn::{Linear, LinearConfig, Relu};
use burn::prelude::*;

use crate::graph::MeshTopology;
use crate::nn::conv::{GraphConv, GraphPool};

/// Decodes a conditioned latent vector back into mesh vertices.
///
/// Projects the latent code onto the coarsest level, then alternates
/// upsampling and graph convolutions up to full resolution. The final
/// convolution produces raw coordinates with no activation.
#[derive(Module, Debug)]
pub struct MeshDecoder<B: Backend> {
    proj: Linear<B>,
    unpools: Vec<GraphPool<B>>,
    convs: Vec<GraphConv<B>>,
    out_conv: GraphConv<B>,
    activation: Relu,
    #[module(skip)]
    coarse_vertices: usize,
    #[module(skip)]
    coarse_channels: usize,
}

impl<B: Backend> MeshDecoder<B> {
    /// Build a decoder over `topology`.
    ///
    /// `input_dim` is the conditioned latent width (latent dimension plus the
    /// one-hot attribute). `channels` match the encoder, one width per level.
    pub fn new(
        topology: &MeshTopology,
        channels: &[usize],
        input_dim: usize,
        device: &B::Device,
    ) -> Self {
        let levels = topology.levels();
        let coarse_vertices = topology.coarse_vertex_count();
        let coarse_channels = channels[levels - 1];

        let proj = LinearConfig::new(input_dim, coarse_vertices * coarse_channels).init(device);

        // Transitions run coarse to fine: unpool with upsample[i], then
        // convolve on level i.
        let mut unpools = Vec::with_capacity(levels - 1);
        let mut convs = Vec::with_capacity(levels - 1);
        for i in (0..levels - 1).rev() {
            unpools.push(GraphPool::new(&topology.upsample[i], device));
            convs.push(GraphConv::new(
                &topology.adjacency[i],
                channels[i + 1],
                channels[i],
                device,
            ));
        }

        let out_conv = GraphConv::new(&topology.adjacency[0], channels[0], 3, device);

        Self {
            proj,
            unpools,
            convs,
            out_conv,
            activation: Relu::new(),
            coarse_vertices,
            coarse_channels,
        }
    }

    /// Forward pass, `[batch, input_dim]` to `[batch, vertices, 3]`.
    pub fn forward(&self, conditioned: Tensor<B, 2>) -> Tensor<B, 3> {
        let [batch, _] = conditioned.dims();
        let x = self.activation.forward(self.proj.forward(conditioned));
        let mut x = x.reshape([batch, self.coarse_vertices, self.coarse_channels]);

        for (unpool, conv) in self.unpools.iter().zip(&self.convs) {
            x = unpool.forward(x);
            x = self.activation.forward(conv.forward(x));
        }

        self.out_conv.forward(x)
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
        let decoder = MeshDecoder::<TestBackend>::new(&topology, &[8], 10, &device);

        let conditioned = Tensor::zeros([2, 10], &device);
        assert_eq!(decoder.forward(conditioned).dims(), [2, 6, 3]);
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
        let decoder = MeshDecoder::<TestBackend>::new(&topology, &[8, 16], 6, &device);

        let conditioned = Tensor::zeros([4, 6], &device);
        assert_eq!(decoder.forward(conditioned).dims(), [4, 6, 3]);
    }
}
