//! CPU reference image source.
//!
//! This is the external collaborator the resolve stage samples through in
//! tests and on the CPU host path. The stage itself knows nothing about
//! filtering or edge handling; all of that lives here.

use glam::{Vec2, Vec4};
use thiserror::Error;

use crate::ImageSource;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ImageError {
    #[error("image has zero width or height")]
    EmptyImage,

    #[error("expected {expected} texels, got {found}")]
    TexelCount { expected: usize, found: usize },
}

// ---------------------------------------------------------------------------
// Sampler configuration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FilterMode {
    Nearest,
    #[default]
    Linear,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AddressMode {
    #[default]
    ClampToEdge,
    Repeat,
    MirrorRepeat,
    ClampToBorder,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BorderColor {
    #[default]
    TransparentBlack,
    OpaqueBlack,
    OpaqueWhite,
}

impl BorderColor {
    pub fn value(self) -> Vec4 {
        match self {
            BorderColor::TransparentBlack => Vec4::ZERO,
            BorderColor::OpaqueBlack => Vec4::new(0.0, 0.0, 0.0, 1.0),
            BorderColor::OpaqueWhite => Vec4::ONE,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SamplerDesc {
    pub filter: FilterMode,
    pub address_u: AddressMode,
    pub address_v: AddressMode,
    /// Only read when an axis uses [`AddressMode::ClampToBorder`].
    pub border: BorderColor,
}

impl SamplerDesc {
    pub fn with_address(filter: FilterMode, address: AddressMode) -> Self {
        Self {
            filter,
            address_u: address,
            address_v: address,
            border: BorderColor::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Texture2d
// ---------------------------------------------------------------------------

/// Row-major RGBA texels, row 0 at `v = 0`.
#[derive(Debug, Clone, PartialEq)]
pub struct Texture2d {
    width: u32,
    height: u32,
    texels: Vec<Vec4>,
}

impl Texture2d {
    pub fn new(width: u32, height: u32, texels: Vec<Vec4>) -> Result<Self, ImageError> {
        if width == 0 || height == 0 {
            return Err(ImageError::EmptyImage);
        }
        let expected = width as usize * height as usize;
        if texels.len() != expected {
            return Err(ImageError::TexelCount {
                expected,
                found: texels.len(),
            });
        }
        Ok(Self {
            width,
            height,
            texels,
        })
    }

    /// Constant image. Zero dimensions are bumped to one.
    pub fn solid(width: u32, height: u32, color: Vec4) -> Self {
        let (width, height) = (width.max(1), height.max(1));
        Self {
            width,
            height,
            texels: vec![color; width as usize * height as usize],
        }
    }

    /// 8-bit RGBA, four bytes per texel, normalized to `[0, 1]`.
    pub fn from_rgba8(width: u32, height: u32, bytes: &[u8]) -> Result<Self, ImageError> {
        let expected = width as usize * height as usize;
        if bytes.len() != expected * 4 {
            return Err(ImageError::TexelCount {
                expected,
                found: bytes.len() / 4,
            });
        }
        let texels = bytes
            .chunks_exact(4)
            .map(|px| Vec4::new(px[0] as f32, px[1] as f32, px[2] as f32, px[3] as f32) / 255.0)
            .collect();
        Self::new(width, height, texels)
    }

    /// `cells × cells` board alternating between `a` (top-left) and `b`.
    /// `cells` is capped at the longer side, so a cell is never thinner than
    /// one texel along it.
    pub fn checkerboard(width: u32, height: u32, cells: u32, a: Vec4, b: Vec4) -> Self {
        let (width, height) = (width.max(1), height.max(1));
        let cells = cells.clamp(1, width.max(height)) as u64;
        let mut texels = Vec::with_capacity(width as usize * height as usize);
        for y in 0..height {
            for x in 0..width {
                let cx = x as u64 * cells / width as u64;
                let cy = y as u64 * cells / height as u64;
                texels.push(if (cx + cy) % 2 == 0 { a } else { b });
            }
        }
        Self {
            width,
            height,
            texels,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn texels(&self) -> &[Vec4] {
        &self.texels
    }

    /// Panics if `(x, y)` is outside the image.
    pub fn texel(&self, x: u32, y: u32) -> Vec4 {
        self.texels[y as usize * self.width as usize + x as usize]
    }
}

// ---------------------------------------------------------------------------
// SampledImage — texture + sampler state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct SampledImage {
    texture: Texture2d,
    sampler: SamplerDesc,
}

impl SampledImage {
    pub fn new(texture: Texture2d, sampler: SamplerDesc) -> Self {
        Self { texture, sampler }
    }

    pub fn texture(&self) -> &Texture2d {
        &self.texture
    }

    pub fn sampler(&self) -> SamplerDesc {
        self.sampler
    }

    /// Fetch one texel with edge handling applied per axis.
    fn fetch(&self, x: i32, y: i32) -> Vec4 {
        let s = &self.sampler;
        match (
            wrap(x, self.texture.width, s.address_u),
            wrap(y, self.texture.height, s.address_v),
        ) {
            (Some(x), Some(y)) => self.texture.texel(x, y),
            _ => s.border.value(),
        }
    }
}

impl ImageSource for SampledImage {
    fn sample(&self, uv: Vec2) -> Vec4 {
        let u = sanitize(uv.x) * self.texture.width as f32;
        let v = sanitize(uv.y) * self.texture.height as f32;
        match self.sampler.filter {
            FilterMode::Nearest => self.fetch(u.floor() as i32, v.floor() as i32),
            FilterMode::Linear => {
                // Texel centers sit at half-integers.
                let (fx, fy) = (u - 0.5, v - 0.5);
                let (x0, y0) = (fx.floor(), fy.floor());
                let (tx, ty) = (fx - x0, fy - y0);
                let (x0, y0) = (x0 as i32, y0 as i32);
                let (x1, y1) = (x0.saturating_add(1), y0.saturating_add(1));
                let top = mix(self.fetch(x0, y0), self.fetch(x1, y0), tx);
                let bottom = mix(self.fetch(x0, y1), self.fetch(x1, y1), tx);
                mix(top, bottom, ty)
            }
        }
    }
}

/// Exact when `a == b`, so constant regions stay constant under filtering.
fn mix(a: Vec4, b: Vec4, t: f32) -> Vec4 {
    a + (b - a) * t
}

/// Map an integer texel index into `[0, size)`, or `None` for a border tap.
fn wrap(i: i32, size: u32, mode: AddressMode) -> Option<u32> {
    let n = size as i64;
    let i = i as i64;
    let mapped = match mode {
        AddressMode::ClampToEdge => i.clamp(0, n - 1),
        AddressMode::Repeat => i.rem_euclid(n),
        AddressMode::MirrorRepeat => {
            let m = i.rem_euclid(2 * n);
            if m < n {
                m
            } else {
                2 * n - 1 - m
            }
        }
        AddressMode::ClampToBorder => {
            if i < 0 || i >= n {
                return None;
            }
            i
        }
    };
    Some(mapped as u32)
}

/// NaN reads as 0; infinities are pulled back to a finite range so the
/// filter weights stay finite and the index saturates onto the edge policy.
fn sanitize(x: f32) -> f32 {
    if x.is_nan() {
        0.0
    } else {
        x.clamp(-COORD_LIMIT, COORD_LIMIT)
    }
}

const COORD_LIMIT: f32 = 1.0e9;

// ---------------------------------------------------------------------------
// SolidColor
// ---------------------------------------------------------------------------

/// Constant image: every lookup returns the same value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolidColor(pub Vec4);

impl ImageSource for SolidColor {
    fn sample(&self, _uv: Vec2) -> Vec4 {
        self.0
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
