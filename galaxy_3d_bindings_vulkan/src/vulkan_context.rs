/// GpuContext - Device and allocator shared by the Vulkan binding backend
///
/// The instance and logical device are created by the application (or its
/// renderer); this crate only borrows them to create pools, layouts and
/// resources. Destroying the device stays the caller's job.

use gpu_allocator::vulkan::Allocator;
use std::sync::{Arc, Mutex, MutexGuard};
use galaxy_3d_bindings::galaxy3d::Result;
use galaxy_3d_bindings::bind_err;

/// Shared GPU context for the binding backend.
pub struct GpuContext {
    /// Vulkan logical device
    pub device: ash::Device,

    /// GPU memory allocator (shared with the renderer, requires mutex).
    /// Every clone must be dropped before the device is destroyed.
    pub allocator: Arc<Mutex<Allocator>>,
}

impl GpuContext {
    /// Create a new GPU context
    ///
    /// # Arguments
    ///
    /// * `device` - Vulkan logical device
    /// * `allocator` - GPU memory allocator created for `device`
    pub fn new(device: ash::Device, allocator: Arc<Mutex<Allocator>>) -> Self {
        Self { device, allocator }
    }

    /// Lock the allocator, mapping a poisoned mutex to a backend error
    pub fn lock_allocator(&self) -> Result<MutexGuard<'_, Allocator>> {
        self.allocator
            .lock()
            .map_err(|_| bind_err!(BackendError, "galaxy3d::vulkan", "GPU allocator mutex poisoned"))
    }

    /// Wait until the device has finished all submitted work
    pub fn wait_idle(&self) -> Result<()> {
        unsafe {
            self.device
                .device_wait_idle()
                .map_err(|e| bind_err!(BackendError, "galaxy3d::vulkan", "device_wait_idle failed: {:?}", e))
        }
    }
}
