use resolve_core::OutputSlot;
use wgpu::{BindGroupLayout, Device, RenderPipeline, TextureFormat, TextureView};

/// Full-screen preview of one resolve target.
///
/// The vertex shader generates a clip-space quad from vertex indices (no
/// vertex buffer needed). The fragment shaders `textureLoad` the texel under
/// the pixel. The color target is read as floats; the coordinate target holds
/// raw `f32` bits and is remapped from `[-1, 1]` into displayable `[0, 1]`.
pub const FULLSCREEN_WGSL: &str = r#"
@vertex
fn vs_main(@builtin(vertex_index) vi: u32) -> @builtin(position) vec4<f32> {
    // Two triangles covering clip space
    var positions = array<vec2<f32>, 6>(
        vec2(-1.0, -1.0), vec2( 1.0, -1.0), vec2(-1.0,  1.0),
        vec2(-1.0,  1.0), vec2( 1.0, -1.0), vec2( 1.0,  1.0),
    );
    return vec4(positions[vi], 0.0, 1.0);
}

@group(0) @binding(0) var t_color: texture_2d<f32>;
@group(0) @binding(1) var t_coord: texture_2d<u32>;

fn texel_at(pos: vec4<f32>, size: vec2<u32>) -> vec2<i32> {
    return clamp(vec2<i32>(pos.xy), vec2<i32>(0), vec2<i32>(size) - vec2<i32>(1));
}

@fragment
fn fs_color(@builtin(position) pos: vec4<f32>) -> @location(0) vec4<f32> {
    let texel = texel_at(pos, textureDimensions(t_color));
    return vec4(textureLoad(t_color, texel, 0).rgb, 1.0);
}

@fragment
fn fs_coord(@builtin(position) pos: vec4<f32>) -> @location(0) vec4<f32> {
    let texel = texel_at(pos, textureDimensions(t_coord));
    let coord = bitcast<vec4<f32>>(textureLoad(t_coord, texel, 0)).xyz;
    return vec4(clamp(coord * 0.5 + 0.5, vec3(0.0), vec3(1.0)), 1.0);
}
"#;

/// Presents one resolve target to a surface.
pub struct PreviewPass {
    color: (BindGroupLayout, RenderPipeline),
    coord: (BindGroupLayout, RenderPipeline),
}

impl PreviewPass {
    pub fn new(device: &Device, surface_format: TextureFormat) -> Self {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("fullscreen"),
            source: wgpu::ShaderSource::Wgsl(FULLSCREEN_WGSL.into()),
        });

        // Each pipeline reads one texture at its own binding.
        let make = |slot: OutputSlot, entry_point: &str| {
            let bind_group_layout =
                device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                    label: Some("preview_bgl"),
                    entries: &[wgpu::BindGroupLayoutEntry {
                        binding: slot.location(),
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Texture {
                            sample_type: match slot {
                                OutputSlot::Color => {
                                    wgpu::TextureSampleType::Float { filterable: false }
                                }
                                OutputSlot::Coord => wgpu::TextureSampleType::Uint,
                            },
                            view_dimension: wgpu::TextureViewDimension::D2,
                            multisampled: false,
                        },
                        count: None,
                    }],
                });
            let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("preview_pl"),
                bind_group_layouts: &[&bind_group_layout],
                push_constant_ranges: &[],
            });
            let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some(entry_point),
                layout: Some(&pipeline_layout),
                vertex: wgpu::VertexState {
                    module: &shader,
                    entry_point: "vs_main",
                    buffers: &[],
                    compilation_options: Default::default(),
                },
                fragment: Some(wgpu::FragmentState {
                    module: &shader,
                    entry_point,
                    targets: &[Some(wgpu::ColorTargetState {
                        format: surface_format,
                        blend: None,
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
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
            (bind_group_layout, pipeline)
        };

        Self {
            color: make(OutputSlot::Color, "fs_color"),
            coord: make(OutputSlot::Coord, "fs_coord"),
        }
    }

    /// Record a pass drawing `source` (a view of the target for `slot`) into
    /// `surface_view`.
    pub fn encode(
        &self,
        device: &Device,
        encoder: &mut wgpu::CommandEncoder,
        surface_view: &TextureView,
        source: &TextureView,
        slot: OutputSlot,
    ) {
        let (layout, pipeline) = match slot {
            OutputSlot::Color => &self.color,
            OutputSlot::Coord => &self.coord,
        };
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("preview_bg"),
            layout,
            entries: &[wgpu::BindGroupEntry {
                binding: slot.location(),
                resource: wgpu::BindingResource::TextureView(source),
            }],
        });

        let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("preview-pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: surface_view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });
        rpass.set_pipeline(pipeline);
        rpass.set_bind_group(0, &bind_group, &[]);
        rpass.draw(0..6, 0..1); // two triangles, no vertex buffer
    }
}
