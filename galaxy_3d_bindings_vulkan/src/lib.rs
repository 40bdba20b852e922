/*!
# Galaxy 3D Bindings - Vulkan Backend

Vulkan implementation of the galaxy_3d_bindings backend contract.

Binding sets map to descriptor sets, pools to descriptor pools, and
buffers/images are allocated with gpu-allocator. The application keeps
ownership of the Vulkan instance and device and hands them over in a
[`GpuContext`].

```no_run
use std::sync::Arc;
use galaxy_3d_bindings::galaxy3d::{BindingStateConfig, GlobalBindingState};
use galaxy_3d_bindings_vulkan::{GpuContext, VulkanBackend};

# fn run(context: GpuContext) -> galaxy_3d_bindings::galaxy3d::Result<()> {
let backend = VulkanBackend::new(Arc::new(context));
let mut state = GlobalBindingState::new(backend, BindingStateConfig::default())?;
state.teardown();
# Ok(())
# }
```
*/

mod vulkan_context;
mod vulkan_format;
mod vulkan_backend;

pub use vulkan_context::GpuContext;
pub use vulkan_backend::{VulkanBackend, VulkanBuffer, VulkanImage};
