//! Minimum capability check, run once when the resolve pipeline is built.

use resolve_core::binding::REQUIRED_TARGETS;
use wgpu::{Adapter, ShaderModel, TextureFormat, TextureUsages};

use crate::GpuError;

/// Oldest shader model the resolve shader is written for.
pub const MIN_SHADER_MODEL: ShaderModel = ShaderModel::Sm4;

fn rank(model: ShaderModel) -> u8 {
    match model {
        ShaderModel::Sm2 => 2,
        ShaderModel::Sm4 => 4,
        ShaderModel::Sm5 => 5,
    }
}

/// Reject adapters that cannot run the stage: too old a shader model, fewer
/// color attachments than output slots, or a target format that cannot be
/// rendered to.
pub fn check_capabilities(adapter: &Adapter, targets: &[TextureFormat]) -> Result<(), GpuError> {
    let downlevel = adapter.get_downlevel_capabilities();
    if rank(downlevel.shader_model) < rank(MIN_SHADER_MODEL) {
        return Err(GpuError::Capability(format!(
            "shader model {:?}, need {:?}",
            downlevel.shader_model, MIN_SHADER_MODEL
        )));
    }

    let attachments = adapter.limits().max_color_attachments as usize;
    if attachments < REQUIRED_TARGETS {
        return Err(GpuError::Capability(format!(
            "{attachments} color attachment(s), need {REQUIRED_TARGETS}"
        )));
    }

    for &format in targets {
        let features = adapter.get_texture_format_features(format);
        if !features
            .allowed_usages
            .contains(TextureUsages::RENDER_ATTACHMENT)
        {
            return Err(GpuError::Capability(format!(
                "{format:?} is not renderable"
            )));
        }
    }

    log::debug!(
        "capabilities ok: {:?}, {} attachment(s)",
        downlevel.shader_model,
        attachments
    );
    Ok(())
}

/// Texture extents the device will accept: non-zero and within
/// `max_texture_dimension_2d` on both sides.
pub fn check_texture_size(limits: &wgpu::Limits, width: u32, height: u32) -> Result<(), GpuError> {
    let max = limits.max_texture_dimension_2d;
    if width == 0 || height == 0 || width > max || height > max {
        return Err(GpuError::TextureSize { width, height, max });
    }
    Ok(())
}
