//! Mesh topology input for the graph-convolutional network.
//!
//! The network operates on a fixed multi-resolution mesh hierarchy: one
//! adjacency matrix per resolution level plus dense transform matrices that
//! move vertex features between neighbouring levels. Building the hierarchy
//! (decimation, adjacency extraction) is upstream of this crate; the
//! structures here only validate and carry it.

use burn::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{DimorphError, Result};

/// A dense row-major matrix of f32 values.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DenseMatrix {
    /// Number of rows.
    pub rows: usize,
    /// Number of columns.
    pub cols: usize,
    /// Row-major values, length `rows * cols`.
    pub values: Vec<f32>,
}

impl DenseMatrix {
    /// Create a matrix, checking that the value count matches the shape.
    pub fn new(rows: usize, cols: usize, values: Vec<f32>) -> Result<Self> {
        if values.len() != rows * cols {
            return Err(DimorphError::ShapeMismatch {
                expected: vec![rows, cols],
                got: vec![values.len()],
            });
        }
        Ok(Self { rows, cols, values })
    }

    /// The identity matrix of the given size.
    pub fn identity(size: usize) -> Self {
        let mut values = vec![0.0; size * size];
        for i in 0..size {
            values[i * size + i] = 1.0;
        }
        Self {
            rows: size,
            cols: size,
            values,
        }
    }

    /// Value at (row, col).
    pub fn get(&self, row: usize, col: usize) -> f32 {
        self.values[row * self.cols + col]
    }

    /// Upload to a rank-2 tensor on the given device.
    pub fn to_tensor<B: Backend>(&self, device: &B::Device) -> Tensor<B, 2> {
        Tensor::from_data(
            TensorData::new(self.values.clone(), [self.rows, self.cols]),
            device,
        )
    }
}

/// Multi-resolution mesh structure consumed by the encoder and decoder.
///
/// Level 0 is the full-resolution mesh. `downsample[i]` maps vertex features
/// from level `i` to level `i + 1`; `upsample[i]` maps them back.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeshTopology {
    /// Square adjacency matrix per level, full resolution first.
    pub adjacency: Vec<DenseMatrix>,
    /// Downsampling transforms, `levels - 1` entries of shape `[n_{i+1}, n_i]`.
    pub downsample: Vec<DenseMatrix>,
    /// Upsampling transforms, `levels - 1` entries of shape `[n_i, n_{i+1}]`.
    pub upsample: Vec<DenseMatrix>,
    /// Triangle faces of the full-resolution mesh (0-indexed).
    pub faces: Vec<[u32; 3]>,
}

impl MeshTopology {
    /// A single-level topology with no pooling.
    pub fn single_level(adjacency: DenseMatrix, faces: Vec<[u32; 3]>) -> Self {
        Self {
            adjacency: vec![adjacency],
            downsample: Vec::new(),
            upsample: Vec::new(),
            faces,
        }
    }

    /// Number of resolution levels.
    pub fn levels(&self) -> usize {
        self.adjacency.len()
    }

    /// Vertex count of the full-resolution mesh.
    pub fn vertex_count(&self) -> usize {
        self.adjacency.first().map(|a| a.rows).unwrap_or(0)
    }

    /// Vertex count of the coarsest level.
    pub fn coarse_vertex_count(&self) -> usize {
        self.adjacency.last().map(|a| a.rows).unwrap_or(0)
    }

    /// Check dimensional consistency across levels.
    pub fn validate(&self) -> Result<()> {
        if self.adjacency.is_empty() {
            return Err(DimorphError::InvalidConfig {
                message: "topology must have at least one level".into(),
            });
        }
        for (i, adj) in self.adjacency.iter().enumerate() {
            if adj.rows != adj.cols {
                return Err(DimorphError::ShapeMismatch {
                    expected: vec![adj.rows, adj.rows],
                    got: vec![adj.rows, adj.cols],
                });
            }
            if adj.rows == 0 {
                return Err(DimorphError::InvalidConfig {
                    message: format!("level {i} has zero vertices"),
                });
            }
        }
        let transitions = self.levels() - 1;
        if self.downsample.len() != transitions || self.upsample.len() != transitions {
            return Err(DimorphError::InvalidConfig {
                message: format!(
                    "expected {transitions} downsample/upsample transforms, got {}/{}",
                    self.downsample.len(),
                    self.upsample.len()
                ),
            });
        }
        for i in 0..transitions {
            let fine = self.adjacency[i].rows;
            let coarse = self.adjacency[i + 1].rows;
            let down = &self.downsample[i];
            if down.rows != coarse || down.cols != fine {
                return Err(DimorphError::ShapeMismatch {
                    expected: vec![coarse, fine],
                    got: vec![down.rows, down.cols],
                });
            }
            let up = &self.upsample[i];
            if up.rows != fine || up.cols != coarse {
                return Err(DimorphError::ShapeMismatch {
                    expected: vec![fine, coarse],
                    got: vec![up.rows, up.cols],
                });
            }
        }
        Ok(())
    }
}

/// Symmetrically normalize an adjacency matrix with self-loops.
///
/// Returns `D^{-1/2} (A + I) D^{-1/2}` where `D` is the degree matrix of
/// `A + I`. Isolated vertices keep a self-loop weight of 1.
pub fn normalized_adjacency(adjacency: &DenseMatrix) -> DenseMatrix {
    let n = adjacency.rows;
    let mut with_loops = adjacency.values.clone();
    for i in 0..n {
        with_loops[i * n + i] += 1.0;
    }

    let mut degree = vec![0.0f32; n];
    for i in 0..n {
        for j in 0..n {
            degree[i] += with_loops[i * n + j];
        }
    }
    let inv_sqrt: Vec<f32> = degree
        .iter()
        .map(|&d| if d > 0.0 { 1.0 / d.sqrt() } else { 0.0 })
        .collect();

    let mut values = vec![0.0f32; n * n];
    for i in 0..n {
        for j in 0..n {
            values[i * n + j] = with_loops[i * n + j] * inv_sqrt[i] * inv_sqrt[j];
        }
    }
    DenseMatrix {
        rows: n,
        cols: n,
        values,
    }
}
