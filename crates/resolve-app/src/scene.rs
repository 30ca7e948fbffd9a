use std::fmt;

use glam::{Vec2, Vec3, Vec4};
use resolve_core::sampler::Texture2d;
use resolve_core::{FragmentInput, FragmentTargets};
use resolve_gpu::vertex::{fullscreen_quad, Vertex};

// ---------------------------------------------------------------------------
// Test scene — a textured plane facing the camera
// ---------------------------------------------------------------------------

const LIGHT: Vec4 = Vec4::new(0.95, 0.55, 0.15, 1.0);
const DARK: Vec4 = Vec4::new(0.08, 0.12, 0.30, 1.0);

/// Plane coordinates at top-left, top-right, bottom-left, bottom-right.
pub const CORNERS: [Vec3; 4] = [
    Vec3::new(-1.0, 1.0, 0.0),
    Vec3::new(1.0, 1.0, 0.0),
    Vec3::new(-1.0, -1.0, 0.0),
    Vec3::new(1.0, -1.0, 0.0),
];

pub fn checker_texture(size: u32, cells: u32) -> Texture2d {
    Texture2d::checkerboard(size, size, cells, LIGHT, DARK)
}

/// The plane as a GPU quad, with its image coordinate scaled like
/// [`fragments`].
pub fn plane_quad(uv_scale: f32) -> [Vertex; 6] {
    let mut quad = fullscreen_quad(CORNERS);
    for v in &mut quad {
        v.uv = v.uv.map(|c| c * uv_scale);
    }
    quad
}

/// What the rasterizer would hand the stage for a `width × height` target
/// covered by the plane: one fragment per pixel center, row-major from the
/// top-left, with the coordinate interpolated across [`CORNERS`].
pub fn fragments(width: u32, height: u32, uv_scale: f32) -> Vec<FragmentInput> {
    let [tl, tr, bl, br] = CORNERS;
    let mut out = Vec::with_capacity(width as usize * height as usize);
    for y in 0..height {
        for x in 0..width {
            let t = Vec2::new(
                (x as f32 + 0.5) / width as f32,
                (y as f32 + 0.5) / height as f32,
            );
            let coord = tl.lerp(tr, t.x).lerp(bl.lerp(br, t.x), t.y);
            out.push(FragmentInput::new(t * uv_scale, coord));
        }
    }
    out
}

/// Per-target statistics logged after a run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Summary {
    pub fragments: usize,
    pub mean_color: Vec3,
    pub coord_min: Vec3,
    pub coord_max: Vec3,
}

impl Summary {
    pub fn of(targets: &FragmentTargets) -> Self {
        let n = targets.len();
        let sum: Vec3 = targets.color.iter().copied().sum();
        let (coord_min, coord_max) = targets.coord.iter().fold(
            (Vec3::splat(f32::INFINITY), Vec3::splat(f32::NEG_INFINITY)),
            |(lo, hi), &c| (lo.min(c), hi.max(c)),
        );
        Self {
            fragments: n,
            mean_color: if n == 0 { Vec3::ZERO } else { sum / n as f32 },
            coord_min,
            coord_max,
        }
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let c = self.mean_color;
        write!(
            f,
            "{} fragment(s)  mean color ({:.3}, {:.3}, {:.3})  coord [{:.3}, {:.3}, {:.3}] .. [{:.3}, {:.3}, {:.3}]",
            self.fragments,
            c.x,
            c.y,
            c.z,
            self.coord_min.x,
            self.coord_min.y,
            self.coord_min.z,
            self.coord_max.x,
            self.coord_max.y,
            self.coord_max.z,
        )
    }
}
