use half::f16;
use resolve_core::sampler::{AddressMode, BorderColor, FilterMode, SamplerDesc, Texture2d};

use crate::capability::check_texture_size;
use crate::context::GpuContext;
use crate::GpuError;

/// The image source as the GPU sees it: an `Rgba16Float` texture plus the
/// sampler state it is read through. Half floats are filterable everywhere
/// and keep texel values outside `[0, 1]`.
pub struct GpuImage {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub sampler: wgpu::Sampler,
}

impl GpuImage {
    pub const FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba16Float;

    pub fn upload(
        ctx: &GpuContext,
        image: &Texture2d,
        sampler: &SamplerDesc,
    ) -> Result<Self, GpuError> {
        let uses_border = sampler.address_u == AddressMode::ClampToBorder
            || sampler.address_v == AddressMode::ClampToBorder;
        if uses_border
            && !ctx
                .device
                .features()
                .contains(wgpu::Features::ADDRESS_MODE_CLAMP_TO_BORDER)
        {
            return Err(GpuError::MissingFeature("ADDRESS_MODE_CLAMP_TO_BORDER"));
        }

        let (width, height) = (image.width(), image.height());
        check_texture_size(&ctx.device.limits(), width, height)?;
        let size = wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        };
        let texture = ctx.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("resolve_image"),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: Self::FORMAT,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        ctx.queue.write_texture(
            wgpu::ImageCopyTexture {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            bytemuck::cast_slice(&to_rgba16f(image)),
            wgpu::ImageDataLayout {
                offset: 0,
                bytes_per_row: Some(8 * width),
                rows_per_image: Some(height),
            },
            size,
        );
        let view = texture.create_view(&Default::default());

        let filter = filter_mode(sampler.filter);
        let sampler = ctx.device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("resolve_sampler"),
            address_mode_u: address_mode(sampler.address_u),
            address_mode_v: address_mode(sampler.address_v),
            mag_filter: filter,
            min_filter: filter,
            border_color: uses_border.then(|| border_color(sampler.border)),
            ..Default::default()
        });

        log::debug!("uploaded {width}×{height} image");
        Ok(Self {
            texture,
            view,
            sampler,
        })
    }
}

/// Texels as half floats, four per texel, row-major.
pub fn to_rgba16f(image: &Texture2d) -> Vec<f16> {
    image
        .texels()
        .iter()
        .flat_map(|t| t.to_array().map(f16::from_f32))
        .collect()
}

pub fn filter_mode(mode: FilterMode) -> wgpu::FilterMode {
    match mode {
        FilterMode::Nearest => wgpu::FilterMode::Nearest,
        FilterMode::Linear => wgpu::FilterMode::Linear,
    }
}

pub fn address_mode(mode: AddressMode) -> wgpu::AddressMode {
    match mode {
        AddressMode::ClampToEdge => wgpu::AddressMode::ClampToEdge,
        AddressMode::Repeat => wgpu::AddressMode::Repeat,
        AddressMode::MirrorRepeat => wgpu::AddressMode::MirrorRepeat,
        AddressMode::ClampToBorder => wgpu::AddressMode::ClampToBorder,
    }
}

pub fn border_color(color: BorderColor) -> wgpu::SamplerBorderColor {
    match color {
        BorderColor::TransparentBlack => wgpu::SamplerBorderColor::TransparentBlack,
        BorderColor::OpaqueBlack => wgpu::SamplerBorderColor::OpaqueBlack,
        BorderColor::OpaqueWhite => wgpu::SamplerBorderColor::OpaqueWhite,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec4;

    #[test]
    fn upload_keeps_values_outside_unit_range() {
        let tex = Texture2d::new(2, 1, vec![Vec4::new(2.0, -0.5, 0.25, 1.0), Vec4::ZERO])
            .expect("valid");
        let half = to_rgba16f(&tex);
        assert_eq!(half.len(), 8);
        assert_eq!(
            half[..4].iter().map(|h| h.to_f32()).collect::<Vec<_>>(),
            vec![2.0, -0.5, 0.25, 1.0]
        );
        // 0.3 is not a multiple of 1/255; half precision keeps it to ~1e-4.
        let tex = Texture2d::solid(1, 1, Vec4::splat(0.3));
        assert!((to_rgba16f(&tex)[0].to_f32() - 0.3).abs() < 2e-4);
    }

    #[test]
    fn row_pitch_matches_format() {
        assert_eq!(GpuImage::FORMAT.block_copy_size(None), Some(8));
    }

    #[test]
    fn sampler_modes_map_one_to_one() {
        assert_eq!(filter_mode(FilterMode::Nearest), wgpu::FilterMode::Nearest);
        assert_eq!(filter_mode(FilterMode::Linear), wgpu::FilterMode::Linear);
        assert_eq!(
            address_mode(AddressMode::MirrorRepeat),
            wgpu::AddressMode::MirrorRepeat
        );
        assert_eq!(
            address_mode(AddressMode::ClampToBorder),
            wgpu::AddressMode::ClampToBorder
        );
        assert_eq!(
            border_color(BorderColor::OpaqueWhite),
            wgpu::SamplerBorderColor::OpaqueWhite
        );
    }
}
