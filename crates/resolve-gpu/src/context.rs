use wgpu::{Adapter, Device, Instance, Queue};

use crate::GpuError;

pub struct GpuContext {
    pub instance: Instance,
    pub adapter: Adapter,
    pub device: Device,
    pub queue: Queue,
}

impl GpuContext {
    /// Create a headless GPU context (no surface). Used for offscreen resolve
    /// runs and testing. The windowed preview builds its own around a surface.
    pub async fn new_headless() -> Result<Self, GpuError> {
        let instance = Instance::default();

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .ok_or(GpuError::NoAdapter)?;

        Self::from_adapter(instance, adapter).await
    }

    /// Open a device on an already chosen adapter.
    pub async fn from_adapter(instance: Instance, adapter: Adapter) -> Result<Self, GpuError> {
        log::info!("GPU adapter: {}", adapter.get_info().name);

        // Border addressing is optional; take it when offered so the image
        // upload can honour a clamp-to-border sampler.
        let required_features =
            adapter.features() & wgpu::Features::ADDRESS_MODE_CLAMP_TO_BORDER;

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("resolve-gpu device"),
                    required_features,
                    required_limits: wgpu::Limits::downlevel_defaults()
                        .using_resolution(adapter.limits()),
                    memory_hints: Default::default(),
                },
                None,
            )
            .await?;

        Ok(Self {
            instance,
            adapter,
            device,
            queue,
        })
    }
}
