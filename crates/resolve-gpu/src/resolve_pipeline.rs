use resolve_core::binding::{
    validate_interface, AttributeDesc, InterfaceDesc, COORD_COMPONENTS, COORD_LOCATION,
    IMAGE_BINDING, REQUIRED_TARGETS, SAMPLER_BINDING, UV_COMPONENTS, UV_LOCATION,
};
use resolve_core::OutputSlot;
use wgpu::util::DeviceExt;
use wgpu::{BindGroupLayout, Device, RenderPipeline, TextureFormat};

use crate::capability::check_capabilities;
use crate::context::GpuContext;
use crate::image::GpuImage;
use crate::targets::ResolveTargets;
use crate::vertex::Vertex;
use crate::{GpuError, RESOLVE_WGSL};

/// Interpolated values `vs_main` hands to `fs_main`.
const VARYINGS: [AttributeDesc; 2] = [
    AttributeDesc {
        location: UV_LOCATION,
        components: UV_COMPONENTS,
    },
    AttributeDesc {
        location: COORD_LOCATION,
        components: COORD_COMPONENTS,
    },
];

/// The resolve stage as a render pipeline: one texture + sampler bind group,
/// one vertex buffer, two color targets.
pub struct ResolvePass {
    pub pipeline: RenderPipeline,
    bind_group_layout: BindGroupLayout,
}

impl ResolvePass {
    /// Build against the formats of [`ResolveTargets`].
    pub async fn for_targets(ctx: &GpuContext) -> Result<Self, GpuError> {
        Self::new(ctx, &ResolveTargets::FORMATS).await
    }

    /// Validate the binding contract and the adapter, then create the
    /// pipeline. Every failure surfaces here; nothing is deferred to `draw`.
    /// `targets` lists one format per output slot, in slot order.
    pub async fn new(ctx: &GpuContext, targets: &[TextureFormat]) -> Result<Self, GpuError> {
        validate_interface(&InterfaceDesc {
            inputs: VARYINGS.to_vec(),
            targets: targets.len(),
        })?;
        // `encode` attaches exactly one view per slot.
        if targets.len() != REQUIRED_TARGETS {
            return Err(GpuError::TargetCount {
                found: targets.len(),
                expected: REQUIRED_TARGETS,
            });
        }
        check_capabilities(&ctx.adapter, targets)?;

        let device = &ctx.device;
        device.push_error_scope(wgpu::ErrorFilter::Validation);

        // --- bind group layout -------------------------------------------------
        // binding 0 : image texture
        // binding 1 : image sampler
        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("resolve_bgl"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: IMAGE_BINDING,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: SAMPLER_BINDING,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("resolve_pl"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("resolve"),
            source: wgpu::ShaderSource::Wgsl(RESOLVE_WGSL.into()),
        });

        let color_targets: Vec<Option<wgpu::ColorTargetState>> = targets
            .iter()
            .map(|&format| {
                Some(wgpu::ColorTargetState {
                    format,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })
            })
            .collect();

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("resolve_pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: "vs_main",
                buffers: &[Vertex::layout()],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: "fs_main",
                targets: &color_targets,
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                ..Default::default()
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        if let Some(err) = device.pop_error_scope().await {
            return Err(GpuError::Pipeline(err.to_string()));
        }
        log::debug!("resolve pipeline built for {} target(s)", targets.len());

        Ok(Self {
            pipeline,
            bind_group_layout,
        })
    }

    pub fn bind_image(&self, device: &Device, image: &GpuImage) -> wgpu::BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("resolve_bg"),
            layout: &self.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: IMAGE_BINDING,
                    resource: wgpu::BindingResource::TextureView(&image.view),
                },
                wgpu::BindGroupEntry {
                    binding: SAMPLER_BINDING,
                    resource: wgpu::BindingResource::Sampler(&image.sampler),
                },
            ],
        })
    }

    /// Record one resolve pass into `encoder`. Both targets are cleared to
    /// zero first, so texels no fragment covers read back as zero.
    pub fn encode(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        bind_group: &wgpu::BindGroup,
        targets: &ResolveTargets,
        vertices: &wgpu::Buffer,
        vertex_count: u32,
    ) {
        let attachments: Vec<Option<wgpu::RenderPassColorAttachment>> = OutputSlot::ALL
            .iter()
            .map(|&slot| {
                Some(wgpu::RenderPassColorAttachment {
                    view: targets.view(slot),
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                        store: wgpu::StoreOp::Store,
                    },
                })
            })
            .collect();

        let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("resolve-pass"),
            color_attachments: &attachments,
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });
        rpass.set_pipeline(&self.pipeline);
        rpass.set_bind_group(0, bind_group, &[]);
        rpass.set_vertex_buffer(0, vertices.slice(..));
        rpass.draw(0..vertex_count, 0..1);
    }

    /// Upload `vertices`, run the pass and submit.
    pub fn draw(
        &self,
        ctx: &GpuContext,
        image: &GpuImage,
        targets: &ResolveTargets,
        vertices: &[Vertex],
    ) {
        let buffer = ctx
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("resolve_vertices"),
                contents: bytemuck::cast_slice(vertices),
                usage: wgpu::BufferUsages::VERTEX,
            });
        let bind_group = self.bind_image(&ctx.device, image);

        let mut encoder = ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("resolve-encoder"),
            });
        self.encode(
            &mut encoder,
            &bind_group,
            targets,
            &buffer,
            vertices.len() as u32,
        );
        ctx.queue.submit(std::iter::once(encoder.finish()));
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
