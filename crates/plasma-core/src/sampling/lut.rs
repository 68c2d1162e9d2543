//! 1D and 3D lookup tables, their sampling, and `.cube` file I/O.

use std::cmp::Ordering;
use std::fmt::Write as _;
use std::path::Path;

use tracing::debug;

use crate::conversion::yuv::map_triplets;
use crate::error::{PlasmaError, Result};
use crate::image::Image;

/// A 1D curve sampled at evenly spaced positions over `[-1, 1]`.
///
/// Entries are pixel centres: entry `i` of `L` sits at
/// `(2i + 1) / L − 1`. Inputs beyond the first or last centre clamp to it.
#[derive(Debug, Clone, PartialEq)]
pub struct Lut1D {
    values: Vec<f32>,
}

impl Lut1D {
    pub fn new(values: Vec<f32>) -> Result<Self> {
        if values.is_empty() {
            return Err(PlasmaError::invalid("1D LUT needs at least one entry"));
        }
        Ok(Self { values })
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Linearly interpolated lookup of `x ∈ [-1, 1]`.
    pub fn sample(&self, x: f32) -> f32 {
        let last = self.values.len() - 1;
        let pos = (((x + 1.0) * self.values.len() as f32 - 1.0) * 0.5).clamp(0.0, last as f32);
        let i0 = pos.floor() as usize;
        let i1 = (i0 + 1).min(last);
        let t = pos - i0 as f32;
        self.values[i0] + (self.values[i1] - self.values[i0]) * t
    }
}

/// Map every element of `image` through `lut`.
pub fn color_sample_1d(image: &Image, lut: &Lut1D) -> Image {
    image.map(|v| lut.sample(v))
}

/// A 3D lookup table mapping RGB to RGB with trilinear interpolation.
///
/// Entries follow `.cube` ordering: red varies fastest, then green, then blue.
/// Largest `LUT_3D_SIZE` accepted from a `.cube` file.
pub const MAX_CUBE_SIZE: u32 = 256;

#[derive(Debug, Clone, PartialEq)]
pub struct Lut3D {
    /// Grid size per axis.
    pub size: u32,
    /// LUT entries. Length = size³.
    pub data: Vec<[f32; 3]>,
    /// Minimum domain values per channel.
    pub domain_min: [f32; 3],
    /// Maximum domain values per channel.
    pub domain_max: [f32; 3],
    pub title: Option<String>,
}

impl Lut3D {
    /// The identity table over `[0, 1]³`.
    pub fn identity(size: u32) -> Result<Self> {
        if size < 2 {
            return Err(PlasmaError::invalid(format!(
                "3D LUT size must be at least 2, got {size}"
            )));
        }
        let n = size as usize;
        let step = 1.0 / (n - 1) as f32;
        let mut data = Vec::with_capacity(n * n * n);
        for b in 0..n {
            for g in 0..n {
                for r in 0..n {
                    data.push([r as f32 * step, g as f32 * step, b as f32 * step]);
                }
            }
        }
        Ok(Self {
            size,
            data,
            domain_min: [0.0; 3],
            domain_max: [1.0; 3],
            title: None,
        })
    }

    /// Check a hand-built table: size at least 2, `size³` entries and a
    /// non-empty domain on every channel.
    pub fn validate(&self) -> Result<()> {
        if self.size < 2 {
            return Err(PlasmaError::invalid(format!(
                "3D LUT size must be at least 2, got {}",
                self.size
            )));
        }
        let expected = (self.size as usize)
            .checked_pow(3)
            .ok_or_else(|| PlasmaError::invalid(format!("3D LUT size {} overflows", self.size)))?;
        if self.data.len() != expected {
            return Err(PlasmaError::invalid(format!(
                "3D LUT of size {} needs {expected} entries, has {}",
                self.size,
                self.data.len()
            )));
        }
        if domain_is_empty(self.domain_min, self.domain_max) {
            return Err(PlasmaError::invalid(format!(
                "empty 3D LUT domain {:?}..{:?}",
                self.domain_min, self.domain_max
            )));
        }
        Ok(())
    }

    #[inline]
    fn entry(&self, r: usize, g: usize, b: usize) -> [f32; 3] {
        let n = self.size as usize;
        self.data.get((b * n + g) * n + r).copied().unwrap_or([0.0; 3])
    }

    /// Apply this LUT to an RGB pixel using trilinear interpolation.
    ///
    /// Inputs outside the domain clamp to its boundary. Tables that fail
    /// [`Lut3D::validate`] give meaningless output.
    pub fn apply(&self, rgb: [f32; 3]) -> [f32; 3] {
        let last = (self.size as usize).saturating_sub(1);
        let mut i0 = [0usize; 3];
        let mut i1 = [0usize; 3];
        let mut t = [0.0f32; 3];
        for c in 0..3 {
            let span = self.domain_max[c] - self.domain_min[c];
            let pos = ((rgb[c] - self.domain_min[c]) / span).clamp(0.0, 1.0) * last as f32;
            i0[c] = (pos.floor() as usize).min(last);
            i1[c] = (i0[c] + 1).min(last);
            t[c] = pos - i0[c] as f32;
        }
        let mut out = [0.0f32; 3];
        for corner in 0..8 {
            let pick = |axis: usize| (corner >> axis) & 1 == 1;
            let r = if pick(0) { i1[0] } else { i0[0] };
            let g = if pick(1) { i1[1] } else { i0[1] };
            let b = if pick(2) { i1[2] } else { i0[2] };
            let w = (0..3)
                .map(|axis| if pick(axis) { t[axis] } else { 1.0 - t[axis] })
                .product::<f32>();
            if w == 0.0 {
                continue;
            }
            let e = self.entry(r, g, b);
            for c in 0..3 {
                out[c] += w * e[c];
            }
        }
        out
    }

    /// Parse `.cube` text.
    pub fn parse_cube(text: &str) -> Result<Self> {
        let mut size: Option<u32> = None;
        let mut title = None;
        let mut domain_min = [0.0; 3];
        let mut domain_max = [1.0; 3];
        let mut data = Vec::new();
        let mut last_line = 0;

        for (idx, raw) in text.lines().enumerate() {
            let line_no = idx + 1;
            last_line = line_no;
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let mut tokens = line.split_whitespace();
            let Some(head) = tokens.next() else {
                continue;
            };
            if head.parse::<f32>().is_ok() {
                let Some(n) = size else {
                    return Err(parse_error(line_no, "data before LUT_3D_SIZE"));
                };
                let rgb = parse_triplet(line, line_no)?;
                if data.len() == (n as usize).pow(3) {
                    return Err(parse_error(line_no, "more entries than LUT_3D_SIZE allows"));
                }
                data.push(rgb);
                continue;
            }
            match head {
                "TITLE" => {
                    let rest = line["TITLE".len()..].trim();
                    title = Some(rest.trim_matches('"').to_string());
                }
                "LUT_3D_SIZE" => {
                    let n: u32 = tokens
                        .next()
                        .and_then(|t| t.parse().ok())
                        .ok_or_else(|| parse_error(line_no, "LUT_3D_SIZE needs an integer"))?;
                    if !(2..=MAX_CUBE_SIZE).contains(&n) {
                        return Err(parse_error(
                            line_no,
                            format!("LUT_3D_SIZE must be in 2..={MAX_CUBE_SIZE}, got {n}"),
                        ));
                    }
                    size = Some(n);
                }
                "DOMAIN_MIN" => domain_min = parse_triplet(&line[head.len()..], line_no)?,
                "DOMAIN_MAX" => domain_max = parse_triplet(&line[head.len()..], line_no)?,
                "LUT_3D_INPUT_RANGE" => {
                    let [lo, hi] = parse_pair(&line[head.len()..], line_no)?;
                    domain_min = [lo; 3];
                    domain_max = [hi; 3];
                }
                "LUT_1D_SIZE" => {
                    return Err(parse_error(line_no, "1D .cube tables are not supported"));
                }
                other => debug!(keyword = other, line = line_no, "skipping unknown .cube keyword"),
            }
        }

        let size = size.ok_or_else(|| parse_error(last_line, "missing LUT_3D_SIZE"))?;
        let expected = (size as usize).pow(3);
        if data.len() != expected {
            return Err(parse_error(
                last_line,
                format!("expected {expected} entries, found {}", data.len()),
            ));
        }
        if domain_is_empty(domain_min, domain_max) {
            return Err(parse_error(
                last_line,
                format!("empty domain {domain_min:?}..{domain_max:?}"),
            ));
        }
        Ok(Self {
            size,
            data,
            domain_min,
            domain_max,
            title,
        })
    }

    /// Load a 3D LUT from a `.cube` file.
    pub fn load_cube(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| PlasmaError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse_cube(&text)
    }

    /// Render as `.cube` text.
    pub fn to_cube_string(&self) -> String {
        let mut out = String::new();
        if let Some(title) = &self.title {
            let _ = writeln!(out, "TITLE \"{title}\"");
        }
        let _ = writeln!(out, "LUT_3D_SIZE {}", self.size);
        let [a, b, c] = self.domain_min;
        let _ = writeln!(out, "DOMAIN_MIN {a:.6} {b:.6} {c:.6}");
        let [a, b, c] = self.domain_max;
        let _ = writeln!(out, "DOMAIN_MAX {a:.6} {b:.6} {c:.6}");
        for [r, g, b] in &self.data {
            let _ = writeln!(out, "{r:.6} {g:.6} {b:.6}");
        }
        out
    }

    /// Save this 3D LUT to a `.cube` file.
    pub fn save_cube(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_cube_string()).map_err(|source| PlasmaError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Map an RGB image in `[-1, 1]` through `lut`.
///
/// Pixels are moved to `[0, 1]` before lookup and back afterwards.
pub fn color_sample_3d(image: &Image, lut: &Lut3D) -> Result<Image> {
    lut.validate()?;
    map_triplets(image, "color_sample_3d", |rgb| {
        let unit = rgb.map(|v| (v + 1.0) * 0.5);
        lut.apply(unit).map(|v| v * 2.0 - 1.0)
    })
}

/// True when any channel's span is not positive, NaN included.
fn domain_is_empty(min: [f32; 3], max: [f32; 3]) -> bool {
    (0..3).any(|c| (max[c] - min[c]).partial_cmp(&0.0) != Some(Ordering::Greater))
}

fn parse_error(line: usize, message: impl Into<String>) -> PlasmaError {
    PlasmaError::LutParse {
        line,
        message: message.into(),
    }
}

fn parse_floats<const N: usize>(text: &str, line: usize) -> Result<[f32; N]> {
    let mut out = [0.0; N];
    let mut tokens = text.split_whitespace();
    for slot in &mut out {
        *slot = tokens
            .next()
            .and_then(|t| t.parse().ok())
            .ok_or_else(|| parse_error(line, format!("expected {N} numbers")))?;
    }
    if tokens.next().is_some() {
        return Err(parse_error(line, format!("expected {N} numbers")));
    }
    Ok(out)
}

fn parse_triplet(text: &str, line: usize) -> Result<[f32; 3]> {
    parse_floats::<3>(text, line)
}

fn parse_pair(text: &str, line: usize) -> Result<[f32; 2]> {
    parse_floats::<2>(text, line)
}
