//! Dense image tensors for the adjustment pipeline.
//!
//! Every image is a batch of channel-first planes laid out as `(N, C, H, W)`
//! in one contiguous `Vec<f32>`. RGB images live in `[-1, 1]`; luminance and
//! weight maps live in `[0, 1]` or `[-1, 1]` depending on the operator.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{PlasmaError, Result};

/// Slack allowed when validating documented value ranges, to absorb
/// rounding from color conversions upstream.
pub const RANGE_TOLERANCE: f32 = 1e-4;

/// Tensor shape in `(batch, channels, height, width)` order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Shape {
    pub batch: usize,
    pub channels: usize,
    pub height: usize,
    pub width: usize,
}

impl Shape {
    pub const fn new(batch: usize, channels: usize, height: usize, width: usize) -> Self {
        Self {
            batch,
            channels,
            height,
            width,
        }
    }

    /// Number of pixels in one `(H, W)` plane.
    pub const fn plane_len(&self) -> usize {
        self.height * self.width
    }

    /// Total number of elements.
    pub const fn len(&self) -> usize {
        self.batch * self.channels * self.height * self.width
    }

    pub const fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Same batch and spatial size, different channel count.
    pub const fn with_channels(&self, channels: usize) -> Self {
        Self::new(self.batch, channels, self.height, self.width)
    }

    /// Same batch and channels, different spatial size.
    pub const fn with_spatial(&self, height: usize, width: usize) -> Self {
        Self::new(self.batch, self.channels, height, width)
    }

    pub const fn spatial(&self) -> (usize, usize) {
        (self.height, self.width)
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({}, {}, {}, {})",
            self.batch, self.channels, self.height, self.width
        )
    }
}

/// A batch of channel-first `f32` images.
#[derive(Debug, Clone, PartialEq)]
pub struct Image {
    shape: Shape,
    data: Vec<f32>,
}

impl Image {
    /// All-zero image.
    pub fn zeros(shape: Shape) -> Self {
        Self::filled(shape, 0.0)
    }

    /// Image with every element set to `value`.
    pub fn filled(shape: Shape, value: f32) -> Self {
        Self {
            shape,
            data: vec![value; shape.len()],
        }
    }

    /// Wrap an existing buffer. Fails if the buffer length does not match the shape.
    pub fn from_vec(shape: Shape, data: Vec<f32>) -> Result<Self> {
        if data.len() != shape.len() {
            return Err(PlasmaError::shape(
                "Image::from_vec",
                format!("{} elements for {shape}", shape.len()),
                format!("{} elements", data.len()),
            ));
        }
        Ok(Self { shape, data })
    }

    /// Build an image by evaluating `f(n, c, y, x)` for every element.
    pub fn from_fn(shape: Shape, f: impl Fn(usize, usize, usize, usize) -> f32) -> Self {
        let mut data = Vec::with_capacity(shape.len());
        for n in 0..shape.batch {
            for c in 0..shape.channels {
                for y in 0..shape.height {
                    for x in 0..shape.width {
                        data.push(f(n, c, y, x));
                    }
                }
            }
        }
        Self { shape, data }
    }

    pub fn shape(&self) -> Shape {
        self.shape
    }

    pub fn batch(&self) -> usize {
        self.shape.batch
    }

    pub fn channels(&self) -> usize {
        self.shape.channels
    }

    pub fn height(&self) -> usize {
        self.shape.height
    }

    pub fn width(&self) -> usize {
        self.shape.width
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [f32] {
        &mut self.data
    }

    pub fn into_vec(self) -> Vec<f32> {
        self.data
    }

    #[inline]
    fn offset(&self, n: usize, c: usize, y: usize, x: usize) -> usize {
        ((n * self.shape.channels + c) * self.shape.height + y) * self.shape.width + x
    }

    /// Element at `(n, c, y, x)`. Panics when out of bounds, like slice indexing.
    #[inline]
    pub fn get(&self, n: usize, c: usize, y: usize, x: usize) -> f32 {
        self.data[self.offset(n, c, y, x)]
    }

    #[inline]
    pub fn set(&mut self, n: usize, c: usize, y: usize, x: usize, value: f32) {
        let idx = self.offset(n, c, y, x);
        self.data[idx] = value;
    }

    /// The `(H, W)` plane for batch `n`, channel `c`.
    pub fn plane(&self, n: usize, c: usize) -> &[f32] {
        let len = self.shape.plane_len();
        let start = (n * self.shape.channels + c) * len;
        &self.data[start..start + len]
    }

    pub fn plane_mut(&mut self, n: usize, c: usize) -> &mut [f32] {
        let len = self.shape.plane_len();
        let start = (n * self.shape.channels + c) * len;
        &mut self.data[start..start + len]
    }

    /// Copy a single channel out as an `(N, 1, H, W)` image.
    pub fn channel(&self, c: usize) -> Result<Image> {
        self.channel_range(c, 1)
    }

    /// Copy `count` consecutive channels starting at `start`.
    pub fn channel_range(&self, start: usize, count: usize) -> Result<Image> {
        if count == 0 || start + count > self.shape.channels {
            return Err(PlasmaError::shape(
                "Image::channel_range",
                format!("channels {start}..{} within {}", start + count, self.shape),
                self.shape,
            ));
        }
        let shape = self.shape.with_channels(count);
        let plane = self.shape.plane_len();
        let mut data = Vec::with_capacity(shape.len());
        for n in 0..self.shape.batch {
            let begin = (n * self.shape.channels + start) * plane;
            data.extend_from_slice(&self.data[begin..begin + count * plane]);
        }
        Ok(Image { shape, data })
    }

    /// Split the channel axis into consecutive groups of `group` channels.
    ///
    /// Used to unpack exposure stacks stored as `(N, 3M, H, W)`.
    pub fn split_channels(&self, group: usize) -> Result<Vec<Image>> {
        if group == 0 || self.shape.channels % group != 0 {
            return Err(PlasmaError::shape(
                "Image::split_channels",
                format!("a multiple of {group} channels"),
                self.shape,
            ));
        }
        (0..self.shape.channels / group)
            .map(|i| self.channel_range(i * group, group))
            .collect()
    }

    /// Concatenate images along the channel axis. All parts must share batch and spatial size.
    pub fn concat_channels(parts: &[Image]) -> Result<Image> {
        let first = parts
            .first()
            .ok_or_else(|| PlasmaError::invalid("cannot concatenate zero images"))?;
        let base = first.shape;
        let mut channels = 0;
        for part in parts {
            let s = part.shape;
            if s.batch != base.batch || s.spatial() != base.spatial() {
                return Err(PlasmaError::shape("Image::concat_channels", base, s));
            }
            channels += s.channels;
        }
        let shape = base.with_channels(channels);
        let mut data = Vec::with_capacity(shape.len());
        for n in 0..base.batch {
            for part in parts {
                let chunk = part.shape.channels * part.shape.plane_len();
                data.extend_from_slice(&part.data[n * chunk..(n + 1) * chunk]);
            }
        }
        Ok(Image { shape, data })
    }

    /// Apply `f` to every element.
    pub fn map(&self, f: impl Fn(f32) -> f32) -> Image {
        Image {
            shape: self.shape,
            data: self.data.iter().map(|&v| f(v)).collect(),
        }
    }

    /// Combine two images of identical shape elementwise.
    pub fn zip_map(
        &self,
        other: &Image,
        op: &'static str,
        f: impl Fn(f32, f32) -> f32,
    ) -> Result<Image> {
        self.ensure_shape(other.shape, op)?;
        Ok(Image {
            shape: self.shape,
            data: self
                .data
                .iter()
                .zip(&other.data)
                .map(|(&a, &b)| f(a, b))
                .collect(),
        })
    }

    /// Combine with `other`, broadcasting it across channels when it has exactly one.
    ///
    /// `other` must be `(N, 1, H, W)` or the same shape as `self`; anything else
    /// is a shape mismatch.
    pub fn zip_broadcast(
        &self,
        other: &Image,
        op: &'static str,
        f: impl Fn(f32, f32) -> f32,
    ) -> Result<Image> {
        if other.shape == self.shape {
            return self.zip_map(other, op, f);
        }
        self.ensure_single_channel_like(other, op)?;
        let plane = self.shape.plane_len();
        let mut data = Vec::with_capacity(self.data.len());
        for n in 0..self.shape.batch {
            let mask = other.plane(n, 0);
            for c in 0..self.shape.channels {
                data.extend(self.plane(n, c).iter().zip(mask).map(|(&a, &b)| f(a, b)));
            }
        }
        debug_assert_eq!(data.len(), self.shape.batch * self.shape.channels * plane);
        Ok(Image {
            shape: self.shape,
            data,
        })
    }

    /// Clamp every element into `[min, max]`.
    pub fn clamp(&self, min: f32, max: f32) -> Image {
        self.map(|v| v.clamp(min, max))
    }

    /// Mean absolute elementwise difference against `other`.
    pub fn mean_abs_diff(&self, other: &Image) -> Result<f32> {
        self.ensure_shape(other.shape, "Image::mean_abs_diff")?;
        if self.data.is_empty() {
            return Ok(0.0);
        }
        let total: f64 = self
            .data
            .iter()
            .zip(&other.data)
            .map(|(&a, &b)| (a - b).abs() as f64)
            .sum();
        Ok((total / self.data.len() as f64) as f32)
    }

    /// Smallest and largest element, or `None` for an empty image.
    pub fn min_max(&self) -> Option<(f32, f32)> {
        let mut iter = self.data.iter().copied();
        let first = iter.next()?;
        Some(iter.fold((first, first), |(lo, hi), v| (lo.min(v), hi.max(v))))
    }

    pub fn ensure_shape(&self, expected: Shape, op: &'static str) -> Result<()> {
        if self.shape != expected {
            return Err(PlasmaError::shape(op, expected, self.shape));
        }
        Ok(())
    }

    pub fn ensure_channels(&self, channels: usize, op: &'static str) -> Result<()> {
        if self.shape.channels != channels {
            return Err(PlasmaError::shape(
                op,
                self.shape.with_channels(channels),
                self.shape,
            ));
        }
        Ok(())
    }

    /// Check that `other` is `(N, 1, H, W)` with this image's batch and spatial size.
    pub fn ensure_single_channel_like(&self, other: &Image, op: &'static str) -> Result<()> {
        let expected = self.shape.with_channels(1);
        if other.shape != expected {
            return Err(PlasmaError::shape(op, expected, other.shape));
        }
        Ok(())
    }

    /// Fail with [`PlasmaError::OutOfRange`] if any element leaves `[min, max]`
    /// by more than [`RANGE_TOLERANCE`]. NaN counts as out of range.
    pub fn ensure_range(&self, what: &'static str, min: f32, max: f32) -> Result<()> {
        let bad = self
            .data
            .iter()
            .copied()
            .find(|v| !(*v >= min - RANGE_TOLERANCE && *v <= max + RANGE_TOLERANCE));
        match bad {
            Some(found) => Err(PlasmaError::OutOfRange {
                what,
                min,
                max,
                found,
            }),
            None => Ok(()),
        }
    }
}

/// Adjustment strength: one scalar for the whole batch, or a per-pixel map.
#[derive(Debug, Clone, Copy)]
pub enum Weight<'a> {
    Scalar(f32),
    /// An `(N, 1, H, W)` map matching the image being adjusted.
    Map(&'a Image),
}

impl From<f32> for Weight<'_> {
    fn from(value: f32) -> Self {
        Self::Scalar(value)
    }
}

impl<'a> From<&'a Image> for Weight<'a> {
    fn from(map: &'a Image) -> Self {
        Self::Map(map)
    }
}

impl Weight<'_> {
    /// Validate against the image it will modulate. Values must lie in `[-1, 1]`.
    pub fn check(&self, image: &Image, op: &'static str) -> Result<()> {
        match self {
            Self::Scalar(v) => {
                if !(*v >= -1.0 - RANGE_TOLERANCE && *v <= 1.0 + RANGE_TOLERANCE) {
                    return Err(PlasmaError::OutOfRange {
                        what: "adjustment weight",
                        min: -1.0,
                        max: 1.0,
                        found: *v,
                    });
                }
                Ok(())
            }
            Self::Map(map) => {
                image.ensure_single_channel_like(map, op)?;
                map.ensure_range("adjustment weight", -1.0, 1.0)
            }
        }
    }

    /// Weight at pixel `(y, x)` of batch `n`.
    #[inline]
    pub fn at(&self, n: usize, y: usize, x: usize) -> f32 {
        match self {
            Self::Scalar(v) => *v,
            Self::Map(map) => map.get(n, 0, y, x),
        }
    }

    /// The scalar value, if this weight is uniform.
    pub fn as_scalar(&self) -> Option<f32> {
        match self {
            Self::Scalar(v) => Some(*v),
            Self::Map(_) => None,
        }
    }
}
