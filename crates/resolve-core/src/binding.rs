use thiserror::Error;

use crate::{ImageSource, OutputSlot, ResolveStage};

// ---------------------------------------------------------------------------
// Binding contract
// ---------------------------------------------------------------------------
//
// These numbers are mirrored by `resolve-gpu/shaders/resolve.wgsl`; the GPU
// crate's tests parse the shader and compare against them.

/// Bind group holding the image and its sampler.
pub const IMAGE_GROUP: u32 = 0;
pub const IMAGE_BINDING: u32 = 0;
pub const SAMPLER_BINDING: u32 = 1;
/// Name of the image slot in the shader interface.
pub const IMAGE_SLOT_NAME: &str = "image";

/// Interpolated image coordinate (`vec2`).
pub const UV_LOCATION: u32 = 0;
pub const UV_COMPONENTS: u32 = 2;
/// Interpolated pass-through coordinate (`vec3`).
pub const COORD_LOCATION: u32 = 1;
pub const COORD_COMPONENTS: u32 = 3;

/// Output targets the stage writes to.
pub const REQUIRED_TARGETS: usize = OutputSlot::ALL.len();

/// Pipeline-construction failures. Anything here must stop the pipeline from
/// being built; none of it can happen during an invocation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BuildError {
    #[error("no image source bound to slot `image`")]
    UnboundImage,

    #[error("no interpolated input bound at location {location}")]
    MissingInput { location: u32 },

    #[error("input at location {location} has {found} components, expected {expected}")]
    InputComponents {
        location: u32,
        expected: u32,
        found: u32,
    },

    #[error("location {location} is bound more than once")]
    DuplicateInput { location: u32 },

    #[error("{found} output target(s) bound, stage writes {required}")]
    TooFewTargets { found: usize, required: usize },
}

/// One interpolated attribute offered by the upstream stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttributeDesc {
    pub location: u32,
    pub components: u32,
}

/// What the host pipeline offers the stage: upstream attributes and the
/// number of bound output targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterfaceDesc {
    pub inputs: Vec<AttributeDesc>,
    pub targets: usize,
}

impl Default for InterfaceDesc {
    fn default() -> Self {
        Self {
            inputs: vec![
                AttributeDesc {
                    location: UV_LOCATION,
                    components: UV_COMPONENTS,
                },
                AttributeDesc {
                    location: COORD_LOCATION,
                    components: COORD_COMPONENTS,
                },
            ],
            targets: REQUIRED_TARGETS,
        }
    }
}

/// Check an interface against the binding contract. Extra upstream
/// attributes are allowed; the stage just never reads them.
pub fn validate_interface(desc: &InterfaceDesc) -> Result<(), BuildError> {
    for (i, a) in desc.inputs.iter().enumerate() {
        if desc.inputs[..i].iter().any(|b| b.location == a.location) {
            return Err(BuildError::DuplicateInput {
                location: a.location,
            });
        }
    }

    for (location, expected) in [
        (UV_LOCATION, UV_COMPONENTS),
        (COORD_LOCATION, COORD_COMPONENTS),
    ] {
        let attr = desc
            .inputs
            .iter()
            .find(|a| a.location == location)
            .ok_or(BuildError::MissingInput { location })?;
        if attr.components != expected {
            return Err(BuildError::InputComponents {
                location,
                expected,
                found: attr.components,
            });
        }
    }

    if desc.targets < REQUIRED_TARGETS {
        return Err(BuildError::TooFewTargets {
            found: desc.targets,
            required: REQUIRED_TARGETS,
        });
    }

    log::debug!(
        "interface ok: {} input(s), {} target(s)",
        desc.inputs.len(),
        desc.targets
    );
    Ok(())
}

// ---------------------------------------------------------------------------
// StageBuilder
// ---------------------------------------------------------------------------

/// Binds an image source and checks the interface once, before any
/// invocation can be scheduled.
pub struct StageBuilder<I> {
    image: Option<I>,
    interface: InterfaceDesc,
}

impl<I: ImageSource> StageBuilder<I> {
    pub fn new() -> Self {
        Self {
            image: None,
            interface: InterfaceDesc::default(),
        }
    }

    pub fn image(mut self, image: I) -> Self {
        self.image = Some(image);
        self
    }

    pub fn interface(mut self, interface: InterfaceDesc) -> Self {
        self.interface = interface;
        self
    }

    pub fn build(self) -> Result<ResolveStage<I>, BuildError> {
        let image = self.image.ok_or(BuildError::UnboundImage)?;
        validate_interface(&self.interface)?;
        Ok(ResolveStage::bound(image))
    }
}

impl<I: ImageSource> Default for StageBuilder<I> {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sampler::SolidColor;
    use crate::FragmentInput;
    use glam::{Vec2, Vec3, Vec4};

    fn attr(location: u32, components: u32) -> AttributeDesc {
        AttributeDesc {
            location,
            components,
        }
    }

    #[test]
    fn default_interface_is_valid() {
        assert_eq!(validate_interface(&InterfaceDesc::default()), Ok(()));
    }

    #[test]
    fn build_without_image_fails() {
        let err = StageBuilder::<SolidColor>::new().build().unwrap_err();
        assert_eq!(err, BuildError::UnboundImage);
    }

    #[test]
    fn build_with_image_invokes() {
        let stage = StageBuilder::new()
            .image(SolidColor(Vec4::new(0.0, 1.0, 0.0, 1.0)))
            .build()
            .expect("stage builds");
        let out = stage.invoke(FragmentInput::new(Vec2::ZERO, Vec3::Z));
        assert_eq!(out.color, Vec3::Y);
        assert_eq!(out.coord, Vec3::Z);
    }

    #[test]
    fn missing_coord_input_is_rejected() {
        let desc = InterfaceDesc {
            inputs: vec![attr(UV_LOCATION, 2)],
            targets: 2,
        };
        assert_eq!(
            validate_interface(&desc),
            Err(BuildError::MissingInput {
                location: COORD_LOCATION
            })
        );
    }

    #[test]
    fn missing_uv_input_is_rejected() {
        let desc = InterfaceDesc {
            inputs: vec![attr(COORD_LOCATION, 3)],
            targets: 2,
        };
        assert_eq!(
            validate_interface(&desc),
            Err(BuildError::MissingInput {
                location: UV_LOCATION
            })
        );
    }

    #[test]
    fn wrong_component_count_is_rejected() {
        let desc = InterfaceDesc {
            inputs: vec![attr(UV_LOCATION, 2), attr(COORD_LOCATION, 4)],
            targets: 2,
        };
        assert_eq!(
            validate_interface(&desc),
            Err(BuildError::InputComponents {
                location: COORD_LOCATION,
                expected: 3,
                found: 4,
            })
        );
    }

    #[test]
    fn duplicate_location_is_rejected() {
        let desc = InterfaceDesc {
            inputs: vec![attr(0, 2), attr(1, 3), attr(0, 2)],
            targets: 2,
        };
        assert_eq!(
            validate_interface(&desc),
            Err(BuildError::DuplicateInput { location: 0 })
        );
    }

    #[test]
    fn single_target_is_rejected() {
        let desc = InterfaceDesc {
            targets: 1,
            ..InterfaceDesc::default()
        };
        assert_eq!(
            validate_interface(&desc),
            Err(BuildError::TooFewTargets {
                found: 1,
                required: 2
            })
        );
    }

    #[test]
    fn extra_inputs_and_targets_are_fine() {
        let desc = InterfaceDesc {
            inputs: vec![attr(0, 2), attr(1, 3), attr(2, 4)],
            targets: 4,
        };
        assert_eq!(validate_interface(&desc), Ok(()));
    }

    #[test]
    fn builder_surfaces_interface_errors() {
        let err = StageBuilder::new()
            .image(SolidColor(Vec4::ONE))
            .interface(InterfaceDesc {
                inputs: vec![],
                targets: 2,
            })
            .build()
            .unwrap_err();
        assert!(matches!(err, BuildError::MissingInput { .. }), "{err}");
    }

    #[test]
    fn error_messages_name_the_problem() {
        assert_eq!(
            BuildError::UnboundImage.to_string(),
            "no image source bound to slot `image`"
        );
        assert_eq!(
            BuildError::TooFewTargets {
                found: 1,
                required: 2
            }
            .to_string(),
            "1 output target(s) bound, stage writes 2"
        );
    }
}
