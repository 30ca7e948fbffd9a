use std::sync::mpsc;

use glam::Vec3;
use half::f16;
use resolve_core::{FragmentTargets, OutputSlot};

use crate::capability::check_texture_size;
use crate::context::GpuContext;
use crate::GpuError;

/// The two render targets the resolve pass writes: slot 0 color, slot 1 coord.
///
/// Color is `Rgba16Float`. The coordinate is stored as the raw bits of its
/// `f32` components in `Rgba32Uint`, so it reads back bit-for-bit. Both
/// formats are renderable on every backend, including GLES 3.
pub struct ResolveTargets {
    pub color: wgpu::Texture,
    pub coord: wgpu::Texture,
    pub color_view: wgpu::TextureView,
    pub coord_view: wgpu::TextureView,
    pub width: u32,
    pub height: u32,
}

impl ResolveTargets {
    pub const COLOR_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba16Float;
    pub const COORD_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba32Uint;
    /// Target formats in slot order.
    pub const FORMATS: [wgpu::TextureFormat; 2] = [Self::COLOR_FORMAT, Self::COORD_FORMAT];

    pub fn format(slot: OutputSlot) -> wgpu::TextureFormat {
        Self::FORMATS[slot.location() as usize]
    }

    pub fn new(device: &wgpu::Device, width: u32, height: u32) -> Result<Self, GpuError> {
        check_texture_size(&device.limits(), width, height)?;

        let desc = |label: &'static str, format: wgpu::TextureFormat| wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT
                | wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        };
        let color = device.create_texture(&desc("resolve_color", Self::COLOR_FORMAT));
        let coord = device.create_texture(&desc("resolve_coord", Self::COORD_FORMAT));
        let color_view = color.create_view(&Default::default());
        let coord_view = coord.create_view(&Default::default());
        log::debug!("resolve targets {width}×{height}");
        Ok(Self {
            color,
            coord,
            color_view,
            coord_view,
            width,
            height,
        })
    }

    pub fn view(&self, slot: OutputSlot) -> &wgpu::TextureView {
        match slot {
            OutputSlot::Color => &self.color_view,
            OutputSlot::Coord => &self.coord_view,
        }
    }

    pub fn texture(&self, slot: OutputSlot) -> &wgpu::Texture {
        match slot {
            OutputSlot::Color => &self.color,
            OutputSlot::Coord => &self.coord,
        }
    }

    /// Copy both targets back to the host, row-major from the top-left pixel.
    /// Alpha padding is dropped.
    pub fn read_back(&self, ctx: &GpuContext) -> Result<FragmentTargets, GpuError> {
        Ok(FragmentTargets {
            color: self.read_slot(ctx, OutputSlot::Color)?,
            coord: self.read_slot(ctx, OutputSlot::Coord)?,
        })
    }

    fn read_slot(&self, ctx: &GpuContext, slot: OutputSlot) -> Result<Vec<Vec3>, GpuError> {
        let texel_bytes = texel_bytes(slot);
        let unpadded = texel_bytes * self.width;
        let padded = unpadded.next_multiple_of(wgpu::COPY_BYTES_PER_ROW_ALIGNMENT);
        let size = padded as u64 * self.height as u64;

        let staging = ctx.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("resolve_readback"),
            size,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let mut encoder = ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("readback-encoder"),
            });
        encoder.copy_texture_to_buffer(
            wgpu::ImageCopyTexture {
                texture: self.texture(slot),
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::ImageCopyBuffer {
                buffer: &staging,
                layout: wgpu::ImageDataLayout {
                    offset: 0,
                    bytes_per_row: Some(padded),
                    rows_per_image: Some(self.height),
                },
            },
            wgpu::Extent3d {
                width: self.width,
                height: self.height,
                depth_or_array_layers: 1,
            },
        );
        ctx.queue.submit(std::iter::once(encoder.finish()));

        let slice = staging.slice(..);
        let (sender, receiver) = mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |res| {
            sender.send(res).ok();
        });
        ctx.device.poll(wgpu::Maintain::Wait);
        receiver
            .recv()
            .map_err(|_| GpuError::Readback(format!("{slot:?}: map_async sender dropped")))?
            .map_err(|err| GpuError::Readback(format!("{slot:?}: map_async failed: {err:?}")))?;

        let mapped = slice.get_mapped_range();
        let mut out = Vec::with_capacity(self.width as usize * self.height as usize);
        for row in mapped.chunks_exact(padded as usize) {
            out.extend(
                row[..unpadded as usize]
                    .chunks_exact(texel_bytes as usize)
                    .map(|texel| decode_texel(slot, texel)),
            );
        }
        drop(mapped);
        staging.unmap();

        log::debug!("read back {slot:?}: {} texel(s)", out.len());
        Ok(out)
    }
}

fn texel_bytes(slot: OutputSlot) -> u32 {
    match slot {
        OutputSlot::Color => 8,
        OutputSlot::Coord => 16,
    }
}

/// One texel of a read-back row to its three payload channels. Alpha is
/// padding and is dropped.
fn decode_texel(slot: OutputSlot, texel: &[u8]) -> Vec3 {
    match slot {
        OutputSlot::Color => {
            let [r, g, b, _a] = bytemuck::pod_read_unaligned::<[f16; 4]>(texel);
            Vec3::new(r.to_f32(), g.to_f32(), b.to_f32())
        }
        OutputSlot::Coord => {
            let [x, y, z, _w] = bytemuck::pod_read_unaligned::<[u32; 4]>(texel);
            Vec3::new(f32::from_bits(x), f32::from_bits(y), f32::from_bits(z))
        }
    }
}
