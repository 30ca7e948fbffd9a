pub mod capability;
pub mod context;
pub mod image;
pub mod renderer;
pub mod resolve_pipeline;
pub mod targets;
pub mod vertex;

use resolve_core::BuildError;
use thiserror::Error;

/// The resolve shader, shared by the pipeline and the shader tests.
pub const RESOLVE_WGSL: &str = include_str!("../shaders/resolve.wgsl");

#[derive(Debug, Error)]
pub enum GpuError {
    #[error("no suitable GPU adapter found")]
    NoAdapter,

    #[error("failed to create GPU device: {0}")]
    RequestDevice(#[from] wgpu::RequestDeviceError),

    #[error("adapter below minimum capability: {0}")]
    Capability(String),

    #[error("device lacks required feature {0}")]
    MissingFeature(&'static str),

    #[error("pipeline rejected by the device: {0}")]
    Pipeline(String),

    #[error("invalid stage binding: {0}")]
    Binding(#[from] BuildError),

    #[error("resolve pass writes exactly {expected} targets, got {found}")]
    TargetCount { found: usize, expected: usize },

    #[error("{width}×{height} texture exceeds the device limit of {max} per side")]
    TextureSize { width: u32, height: u32, max: u32 },

    #[error("target readback failed: {0}")]
    Readback(String),
}

// ---------------------------------------------------------------------------
// Shader interface tests (no GPU needed)
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use naga::{Binding, ShaderStage, TypeInner, VectorSize};
    use resolve_core::binding::{
        validate_interface, AttributeDesc, InterfaceDesc, IMAGE_BINDING, IMAGE_GROUP,
        IMAGE_SLOT_NAME, SAMPLER_BINDING,
    };
    use resolve_core::OutputSlot;

    fn parse_and_validate(src: &str) -> naga::Module {
        let module = naga::front::wgsl::parse_str(src).expect("WGSL parses");
        naga::valid::Validator::new(
            naga::valid::ValidationFlags::all(),
            naga::valid::Capabilities::empty(),
        )
        .validate(&module)
        .expect("WGSL validates");
        module
    }

    /// `(location, component count)` for every located member of a struct type.
    fn struct_locations(module: &naga::Module, ty: naga::Handle<naga::Type>) -> Vec<(u32, u32)> {
        let TypeInner::Struct { members, .. } = &module.types[ty].inner else {
            panic!("expected a struct");
        };
        members
            .iter()
            .filter_map(|m| match m.binding {
                Some(Binding::Location { location, .. }) => {
                    let components = match module.types[m.ty].inner {
                        TypeInner::Vector { size, .. } => match size {
                            VectorSize::Bi => 2,
                            VectorSize::Tri => 3,
                            VectorSize::Quad => 4,
                        },
                        TypeInner::Scalar(_) => 1,
                        ref other => panic!("unexpected member type {other:?}"),
                    };
                    Some((location, components))
                }
                _ => None,
            })
            .collect()
    }

    fn fragment_entry<'a>(module: &'a naga::Module, name: &str) -> &'a naga::EntryPoint {
        module
            .entry_points
            .iter()
            .find(|ep| ep.name == name && ep.stage == ShaderStage::Fragment)
            .expect("fragment entry point present")
    }

    #[test]
    fn resolve_shader_validates() {
        let module = parse_and_validate(RESOLVE_WGSL);
        assert!(module.entry_points.iter().any(|ep| ep.name == "vs_main"));
        fragment_entry(&module, "fs_main");
    }

    #[test]
    fn image_bindings_match_contract() {
        let module = parse_and_validate(RESOLVE_WGSL);
        let binding_of = |name: &str| {
            module
                .global_variables
                .iter()
                .find(|(_, var)| var.name.as_deref() == Some(name))
                .and_then(|(_, var)| var.binding.clone())
                .expect("global bound")
        };
        let image = binding_of(IMAGE_SLOT_NAME);
        assert_eq!((image.group, image.binding), (IMAGE_GROUP, IMAGE_BINDING));
        let sampler = binding_of("image_sampler");
        assert_eq!(
            (sampler.group, sampler.binding),
            (IMAGE_GROUP, SAMPLER_BINDING)
        );
    }

    #[test]
    fn fragment_inputs_satisfy_contract() {
        let module = parse_and_validate(RESOLVE_WGSL);
        let ep = fragment_entry(&module, "fs_main");
        let inputs: Vec<AttributeDesc> = ep
            .function
            .arguments
            .iter()
            .flat_map(|arg| struct_locations(&module, arg.ty))
            .map(|(location, components)| AttributeDesc {
                location,
                components,
            })
            .collect();
        let result = ep.function.result.as_ref().expect("fs_main returns");
        let targets = struct_locations(&module, result.ty).len();
        assert_eq!(
            validate_interface(&InterfaceDesc { inputs, targets }),
            Ok(())
        );
    }

    #[test]
    fn fragment_outputs_are_color_then_coord() {
        let module = parse_and_validate(RESOLVE_WGSL);
        let ep = fragment_entry(&module, "fs_main");
        let result = ep.function.result.as_ref().expect("fs_main returns");
        let TypeInner::Struct { members, .. } = &module.types[result.ty].inner else {
            panic!("expected a struct result");
        };
        let by_name: Vec<_> = members
            .iter()
            .map(|m| {
                let Some(Binding::Location { location, .. }) = m.binding else {
                    panic!("unlocated output {:?}", m.name);
                };
                (m.name.clone().unwrap_or_default(), location)
            })
            .collect();
        assert_eq!(
            by_name,
            vec![
                ("color".to_string(), OutputSlot::Color.location()),
                ("coord".to_string(), OutputSlot::Coord.location()),
            ]
        );
    }

    #[test]
    fn coord_output_is_raw_bits() {
        let module = parse_and_validate(RESOLVE_WGSL);
        let ep = fragment_entry(&module, "fs_main");
        let result = ep.function.result.as_ref().expect("fs_main returns");
        let TypeInner::Struct { members, .. } = &module.types[result.ty].inner else {
            panic!("expected a struct result");
        };
        let kinds: Vec<_> = members
            .iter()
            .map(|m| match module.types[m.ty].inner {
                TypeInner::Vector { scalar, .. } => scalar.kind,
                ref other => panic!("unexpected output type {other:?}"),
            })
            .collect();
        assert_eq!(kinds, vec![naga::ScalarKind::Float, naga::ScalarKind::Uint]);
    }

    #[test]
    fn preview_shader_validates() {
        let module = parse_and_validate(renderer::FULLSCREEN_WGSL);
        fragment_entry(&module, "fs_color");
        fragment_entry(&module, "fs_coord");
    }
}
