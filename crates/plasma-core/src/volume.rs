//! Five-dimensional `(N, C, D, H, W)` volumes backing the bilateral grid.
//!
//! Volumes are the dominant memory cost of the crate, so allocation is
//! fallible and reported as [`PlasmaError::ResourceExhausted`] rather than
//! aborting the process.

use std::fmt;

use crate::error::{PlasmaError, Result};

/// Volume shape in `(batch, channels, depth, height, width)` order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VolumeShape {
    pub batch: usize,
    pub channels: usize,
    pub depth: usize,
    pub height: usize,
    pub width: usize,
}

impl VolumeShape {
    pub const fn new(
        batch: usize,
        channels: usize,
        depth: usize,
        height: usize,
        width: usize,
    ) -> Self {
        Self {
            batch,
            channels,
            depth,
            height,
            width,
        }
    }

    /// Elements in one `(D, H, W)` block.
    pub const fn block_len(&self) -> usize {
        self.depth * self.height * self.width
    }

    pub const fn len(&self) -> usize {
        self.batch * self.channels * self.block_len()
    }

    pub const fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Size in bytes of an `f32` volume of this shape, saturating on overflow.
    pub fn byte_size(&self) -> u64 {
        [self.batch, self.channels, self.depth, self.height, self.width]
            .iter()
            .fold(std::mem::size_of::<f32>() as u64, |acc, &d| {
                acc.saturating_mul(d as u64)
            })
    }
}

impl fmt::Display for VolumeShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({}, {}, {}, {}, {})",
            self.batch, self.channels, self.depth, self.height, self.width
        )
    }
}

/// Dense `f32` volume.
#[derive(Debug, Clone, PartialEq)]
pub struct Volume {
    shape: VolumeShape,
    data: Vec<f32>,
}

impl Volume {
    /// Allocate a zeroed volume, reporting allocation failure as an error.
    pub fn try_zeros(shape: VolumeShape) -> Result<Self> {
        let len = shape.len();
        let mut data = Vec::new();
        data.try_reserve_exact(len)
            .map_err(|_| PlasmaError::ResourceExhausted {
                requested: shape.byte_size(),
                budget: 0,
            })?;
        data.resize(len, 0.0);
        Ok(Self { shape, data })
    }

    pub fn shape(&self) -> VolumeShape {
        self.shape
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [f32] {
        &mut self.data
    }

    /// The `(D, H, W)` block for batch `n`, channel `c`.
    pub fn block(&self, n: usize, c: usize) -> &[f32] {
        let len = self.shape.block_len();
        let start = (n * self.shape.channels + c) * len;
        &self.data[start..start + len]
    }

    pub fn block_mut(&mut self, n: usize, c: usize) -> &mut [f32] {
        let len = self.shape.block_len();
        let start = (n * self.shape.channels + c) * len;
        &mut self.data[start..start + len]
    }

    #[inline]
    pub fn get(&self, n: usize, c: usize, d: usize, y: usize, x: usize) -> f32 {
        let s = &self.shape;
        self.data[(((n * s.channels + c) * s.depth + d) * s.height + y) * s.width + x]
    }
}
