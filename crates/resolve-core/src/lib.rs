pub mod binding;
pub mod dispatch;
pub mod sampler;

use std::sync::Arc;

use glam::{Vec2, Vec3, Vec4};

pub use binding::{BuildError, StageBuilder};
pub use dispatch::FragmentTargets;

// ---------------------------------------------------------------------------
// ImageSource — the injected lookup capability
// ---------------------------------------------------------------------------

/// Read-only image lookup at a normalized 2D coordinate.
///
/// Filtering and edge handling belong to the implementor. The resolve stage
/// calls `sample` exactly once per fragment and never writes through it, so
/// one source may be shared by any number of concurrent invocations.
pub trait ImageSource: Send + Sync {
    fn sample(&self, uv: Vec2) -> Vec4;
}

impl<T: ImageSource + ?Sized> ImageSource for &T {
    fn sample(&self, uv: Vec2) -> Vec4 {
        (**self).sample(uv)
    }
}

impl<T: ImageSource + ?Sized> ImageSource for Box<T> {
    fn sample(&self, uv: Vec2) -> Vec4 {
        (**self).sample(uv)
    }
}

impl<T: ImageSource + ?Sized> ImageSource for Arc<T> {
    fn sample(&self, uv: Vec2) -> Vec4 {
        (**self).sample(uv)
    }
}

// ---------------------------------------------------------------------------
// Per-invocation records
// ---------------------------------------------------------------------------

/// Interpolated attributes for one fragment.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FragmentInput {
    /// Image-space coordinate, normalized.
    pub uv: Vec2,
    /// Opaque coordinate carried through to slot 1. Its space is whatever the
    /// producer chose.
    pub coord: Vec3,
}

impl FragmentInput {
    pub fn new(uv: Vec2, coord: Vec3) -> Self {
        Self { uv, coord }
    }
}

/// Output slot numbering shared with the downstream compositing step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutputSlot {
    Color = 0,
    Coord = 1,
}

impl OutputSlot {
    pub const ALL: [OutputSlot; 2] = [OutputSlot::Color, OutputSlot::Coord];

    /// Numbered destination this slot is bound to.
    pub fn location(self) -> u32 {
        self as u32
    }
}

/// Both values written by one invocation.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ResolvedFragment {
    pub color: Vec3,
    pub coord: Vec3,
}

impl ResolvedFragment {
    /// Map the named fields onto numbered slots. This is the only place the
    /// numbering is applied.
    pub fn slot(&self, slot: OutputSlot) -> Vec3 {
        match slot {
            OutputSlot::Color => self.color,
            OutputSlot::Coord => self.coord,
        }
    }
}

// ---------------------------------------------------------------------------
// The stage
// ---------------------------------------------------------------------------

/// Resolve one fragment: one lookup, RGB to slot 0, `coord` untouched to slot 1.
#[inline]
pub fn resolve<I: ImageSource + ?Sized>(image: &I, input: FragmentInput) -> ResolvedFragment {
    let texel = image.sample(input.uv);
    ResolvedFragment {
        color: texel.truncate(),
        coord: input.coord,
    }
}

/// A stage with its image source bound. Only [`StageBuilder::build`] makes
/// one, so an invocation can never run against a missing binding.
#[derive(Debug, Clone)]
pub struct ResolveStage<I> {
    image: I,
}

impl<I: ImageSource> ResolveStage<I> {
    pub(crate) fn bound(image: I) -> Self {
        Self { image }
    }

    #[inline]
    pub fn invoke(&self, input: FragmentInput) -> ResolvedFragment {
        resolve(&self.image, input)
    }

    pub fn image(&self) -> &I {
        &self.image
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sampler::{FilterMode, SampledImage, SamplerDesc, SolidColor, Texture2d};
    use proptest::prelude::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Counts lookups so tests can check the stage samples exactly once.
    struct CountingSource {
        calls: AtomicUsize,
        value: Vec4,
    }

    impl ImageSource for CountingSource {
        fn sample(&self, _uv: Vec2) -> Vec4 {
            self.calls.fetch_add(1, Ordering::Relaxed);
            self.value
        }
    }

    /// Echoes the coordinate back as a color.
    struct UvSource;

    impl ImageSource for UvSource {
        fn sample(&self, uv: Vec2) -> Vec4 {
            Vec4::new(uv.x, uv.y, 0.25, 0.75)
        }
    }

    #[test]
    fn solid_red_texel_resolves_to_red_everywhere() {
        let tex = Texture2d::solid(1, 1, Vec4::new(1.0, 0.0, 0.0, 1.0));
        let image = SampledImage::new(tex, SamplerDesc::default());
        for uv in [
            Vec2::ZERO,
            Vec2::ONE,
            Vec2::new(0.5, 0.5),
            Vec2::new(0.13, 0.87),
        ] {
            let out = resolve(&image, FragmentInput::new(uv, Vec3::ZERO));
            assert_eq!(out.color, Vec3::new(1.0, 0.0, 0.0), "uv {uv:?}");
        }
    }

    #[test]
    fn coordinate_passes_through_exactly() {
        let p = Vec3::new(2.5, -1.0, 0.3);
        for uv in [Vec2::ZERO, Vec2::new(0.7, 0.2), Vec2::new(-3.0, 9.0)] {
            let out = resolve(&UvSource, FragmentInput::new(uv, p));
            assert_eq!(out.coord, p);
        }
    }

    #[test]
    fn bilinear_midpoint_of_black_and_white_is_grey() {
        let tex = Texture2d::new(2, 1, vec![Vec4::new(0.0, 0.0, 0.0, 1.0), Vec4::ONE])
            .expect("valid texture");
        let sampler = SamplerDesc {
            filter: FilterMode::Linear,
            ..SamplerDesc::default()
        };
        let image = SampledImage::new(tex, sampler);
        let out = resolve(&image, FragmentInput::new(Vec2::new(0.5, 0.5), Vec3::ZERO));
        for c in out.color.to_array() {
            assert!((c - 0.5).abs() < 1e-5, "got {c}");
        }
    }

    #[test]
    fn color_drops_the_fourth_channel() {
        let out = resolve(&UvSource, FragmentInput::new(Vec2::new(0.1, 0.2), Vec3::ONE));
        assert_eq!(out.color, Vec3::new(0.1, 0.2, 0.25));
    }

    #[test]
    fn exactly_one_lookup_per_invocation() {
        let src = CountingSource {
            calls: AtomicUsize::new(0),
            value: Vec4::ONE,
        };
        resolve(&src, FragmentInput::default());
        assert_eq!(src.calls.load(Ordering::Relaxed), 1);
        resolve(&src, FragmentInput::default());
        assert_eq!(src.calls.load(Ordering::Relaxed), 2);
    }

    #[test]
    fn invoking_twice_gives_identical_results() {
        let image = SolidColor(Vec4::new(0.2, 0.4, 0.6, 1.0));
        let input = FragmentInput::new(Vec2::new(0.3, 0.9), Vec3::new(-7.0, 0.0, 1e-9));
        assert_eq!(resolve(&image, input), resolve(&image, input));
    }

    #[test]
    fn slot_numbering_is_color_then_coord() {
        assert_eq!(OutputSlot::Color.location(), 0);
        assert_eq!(OutputSlot::Coord.location(), 1);
        let out = ResolvedFragment {
            color: Vec3::X,
            coord: Vec3::Y,
        };
        assert_eq!(out.slot(OutputSlot::Color), Vec3::X);
        assert_eq!(out.slot(OutputSlot::Coord), Vec3::Y);
    }

    #[test]
    fn boxed_and_shared_sources_sample_the_same() {
        let solid = SolidColor(Vec4::new(0.5, 0.25, 0.125, 1.0));
        let boxed: Box<dyn ImageSource> = Box::new(solid);
        let shared = Arc::new(solid);
        let input = FragmentInput::new(Vec2::splat(0.5), Vec3::ONE);
        assert_eq!(resolve(&boxed, input), resolve(&solid, input));
        assert_eq!(resolve(&shared, input), resolve(&solid, input));
    }

    proptest! {
        #[test]
        fn slot_one_is_identity(
            x in any::<f32>(),
            y in any::<f32>(),
            z in any::<f32>(),
            u in -4.0f32..4.0,
            v in -4.0f32..4.0,
        ) {
            let p = Vec3::new(x, y, z);
            let out = resolve(&UvSource, FragmentInput::new(Vec2::new(u, v), p));
            // Bitwise so NaN payloads and signed zeros count too.
            prop_assert_eq!(out.coord.x.to_bits(), x.to_bits());
            prop_assert_eq!(out.coord.y.to_bits(), y.to_bits());
            prop_assert_eq!(out.coord.z.to_bits(), z.to_bits());
        }

        #[test]
        fn slot_zero_is_lookup_rgb(u in -2.0f32..2.0, v in -2.0f32..2.0) {
            let tex = Texture2d::checkerboard(8, 8, 4, Vec4::ZERO, Vec4::ONE);
            let image = SampledImage::new(tex, SamplerDesc::default());
            let uv = Vec2::new(u, v);
            let out = resolve(&image, FragmentInput::new(uv, Vec3::ZERO));
            prop_assert_eq!(out.color, image.sample(uv).truncate());
        }
    }
}
