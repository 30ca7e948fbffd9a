use anyhow::{ensure, Result};
use clap::{Parser, ValueEnum};
use resolve_core::sampler::{AddressMode, BorderColor, FilterMode, SamplerDesc};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Backend {
    /// Scoped worker threads over the CPU reference sampler.
    Cpu,
    /// Offscreen wgpu render pass, read back to the host.
    Gpu,
    /// Live preview window.
    Window,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Filter {
    Nearest,
    Linear,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Address {
    Clamp,
    Repeat,
    Mirror,
    Border,
}

/// Run the fragment resolve stage over a checkerboard-textured plane.
#[derive(Debug, Clone, Parser)]
#[command(name = "resolve", version)]
pub struct Config {
    #[arg(long, value_enum, default_value_t = Backend::Cpu)]
    pub backend: Backend,

    /// Output width in fragments.
    #[arg(long, default_value_t = 256)]
    pub width: u32,

    /// Output height in fragments.
    #[arg(long, default_value_t = 256)]
    pub height: u32,

    #[arg(long, value_enum, default_value_t = Filter::Linear)]
    pub filter: Filter,

    #[arg(long, value_enum, default_value_t = Address::Clamp)]
    pub address: Address,

    /// CPU worker threads; 0 picks the available parallelism.
    #[arg(long, default_value_t = 0)]
    pub workers: usize,

    /// Side length of the source image in texels.
    #[arg(long, default_value_t = 64)]
    pub texture_size: u32,

    /// Checkerboard cells per side.
    #[arg(long, default_value_t = 8)]
    pub checker_cells: u32,

    /// Scale applied to the image coordinate; values above 1 exercise the
    /// address mode.
    #[arg(long, default_value_t = 1.0)]
    pub uv_scale: f32,
}

/// Largest output or texture side accepted on the command line. The GPU
/// path additionally checks the device's own limit.
pub const MAX_EXTENT: u32 = 16_384;

impl Config {
    pub fn validate(&self) -> Result<()> {
        ensure!(self.width > 0 && self.height > 0, "output size must be non-zero");
        ensure!(
            self.width <= MAX_EXTENT && self.height <= MAX_EXTENT,
            "output size {}×{} exceeds {MAX_EXTENT} per side",
            self.width,
            self.height
        );
        ensure!(self.texture_size > 0, "texture size must be non-zero");
        ensure!(
            self.texture_size <= MAX_EXTENT,
            "texture size {} exceeds {MAX_EXTENT}",
            self.texture_size
        );
        ensure!(
            (1..=self.texture_size).contains(&self.checker_cells),
            "checker cells must be between 1 and the texture size ({})",
            self.texture_size
        );
        ensure!(
            self.uv_scale.is_finite() && self.uv_scale > 0.0,
            "uv scale must be positive and finite"
        );
        Ok(())
    }

    pub fn sampler(&self) -> SamplerDesc {
        let filter = match self.filter {
            Filter::Nearest => FilterMode::Nearest,
            Filter::Linear => FilterMode::Linear,
        };
        let address = match self.address {
            Address::Clamp => AddressMode::ClampToEdge,
            Address::Repeat => AddressMode::Repeat,
            Address::Mirror => AddressMode::MirrorRepeat,
            Address::Border => AddressMode::ClampToBorder,
        };
        SamplerDesc {
            border: BorderColor::OpaqueBlack,
            ..SamplerDesc::with_address(filter, address)
        }
    }
}
