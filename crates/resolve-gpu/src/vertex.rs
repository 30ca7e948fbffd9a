use glam::Vec3;

/// Per-vertex data fed to `vs_main`. Must match `VertexIn` in `resolve.wgsl`.
/// `repr(C)` + `bytemuck` ensures safe casting to `&[u8]`.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex {
    /// Clip-space xy.
    pub position: [f32; 2],
    pub uv: [f32; 2],
    pub coord: [f32; 3],
}

impl Vertex {
    const ATTRIBUTES: [wgpu::VertexAttribute; 3] = wgpu::vertex_attr_array![
        0 => Float32x2,
        1 => Float32x2,
        2 => Float32x3
    ];

    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Vertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBUTES,
        }
    }
}

/// Two triangles covering clip space. `uv` runs from (0, 0) at the top-left
/// to (1, 1) at the bottom-right; `corners` gives the coordinate carried at
/// each corner in the order top-left, top-right, bottom-left, bottom-right.
pub fn fullscreen_quad(corners: [Vec3; 4]) -> [Vertex; 6] {
    let [tl, tr, bl, br] = corners;
    let v = |x: f32, y: f32, u: f32, w: f32, c: Vec3| Vertex {
        position: [x, y],
        uv: [u, w],
        coord: c.to_array(),
    };
    [
        v(-1.0, 1.0, 0.0, 0.0, tl),
        v(-1.0, -1.0, 0.0, 1.0, bl),
        v(1.0, 1.0, 1.0, 0.0, tr),
        v(1.0, 1.0, 1.0, 0.0, tr),
        v(-1.0, -1.0, 0.0, 1.0, bl),
        v(1.0, -1.0, 1.0, 1.0, br),
    ]
}
