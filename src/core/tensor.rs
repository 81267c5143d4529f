//! Host image tensors.
//!
//! The host runtime passes images around as dense `f32` arrays laid out
//! row-major as `[height, width, channels]`, optionally with a leading batch
//! dimension. Values are normally in `[0, 1]`, but upstream producers may
//! hand over data that is already in `[0, 255]`.

use crate::core::error::TensorError;
use serde::{Deserialize, Serialize};

/// A dense, row-major image tensor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageTensor {
    shape: Vec<usize>,
    data: Vec<f32>,
}

impl ImageTensor {
    /// Create a tensor, checking that `data` fills `shape` exactly.
    ///
    /// Accepted ranks are 2 (`H×W`), 3 (`H×W×C`) and 4 (`B×H×W×C`).
    pub fn new(shape: Vec<usize>, data: Vec<f32>) -> Result<Self, TensorError> {
        if !(2..=4).contains(&shape.len()) {
            return Err(TensorError::UnsupportedRank(shape.len()));
        }

        let expected: usize = shape.iter().product();
        if expected != data.len() {
            return Err(TensorError::ElementCount {
                shape,
                expected,
                actual: data.len(),
            });
        }

        Ok(Self { shape, data })
    }

    /// Create a zero-filled tensor.
    pub fn zeros(shape: Vec<usize>) -> Result<Self, TensorError> {
        let len = shape.iter().product();
        Self::new(shape, vec![0.0; len])
    }

    /// Tensor shape.
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Raw element data.
    pub fn data(&self) -> &[f32] {
        &self.data
    }

    /// Largest element, or `None` for an empty tensor.
    pub fn max_value(&self) -> Option<f32> {
        self.data.iter().copied().reduce(f32::max)
    }

    /// Batch size (1 for unbatched tensors).
    pub fn batch_size(&self) -> usize {
        if self.shape.len() == 4 {
            self.shape[0]
        } else {
            1
        }
    }

    /// `(height, width, channels)` of a single image, ignoring the batch
    /// dimension. Rank-2 tensors report one channel.
    pub fn dimensions(&self) -> (usize, usize, usize) {
        match self.shape.as_slice() {
            [h, w] => (*h, *w, 1),
            [h, w, c] => (*h, *w, *c),
            [_, h, w, c] => (*h, *w, *c),
            // Rank is checked in `new`
            _ => (0, 0, 0),
        }
    }
}
