/*!
# Galaxy 3D Bindings

GPU resource-binding layer for the Galaxy 3D engine.

This crate hands out binding sets (descriptor sets) from growable pools,
owns the buffers and images bound into them behind typed handles, and lets
the frame loop refresh per-frame data by key and slot. It is
backend-agnostic: a graphics backend implements [`backend::BindingBackend`]
(the Vulkan one lives in `galaxy_3d_bindings_vulkan`), and a CPU-only
[`backend::MockBackend`] is provided for tests.

## Architecture

- **RangeFreeList**: free ids as minimal disjoint ranges
- **PoolAllocator**: pools that grow on exhaustion and recycle on reset
- **ResourceRegistry**: buffer/image handle table
- **BindingSetBuilder**: accumulates slot bindings into a `Blueprint`
- **GlobalBindingState**: composition root, named sets by key
*/

// Internal modules
mod error;
pub mod log;
pub mod utils;
pub mod backend;
pub mod binding;
pub mod resource;

// Main galaxy3d namespace module
pub mod galaxy3d {
    // Error types
    pub use crate::error::{Error, Result};

    // Composition root
    pub use crate::binding::{BindingStateConfig, GlobalBindingState, NamedBindingSet};

    // Logging sub-module (types only, NOT macros)
    pub mod log {
        pub use crate::log::{Logger, LogEntry, LogSeverity, DefaultLogger};
        pub use crate::log::{set_logger, reset_logger};
    }

    // Backend sub-module: the backend contract and shared descriptions
    pub mod backend {
        pub use crate::backend::*;
    }

    // Binding sub-module
    pub mod binding {
        pub use crate::binding::*;
    }

    // Resource sub-module
    pub mod resource {
        pub use crate::resource::*;
    }

    // Utility sub-module
    pub mod utils {
        pub use crate::utils::*;
    }
}
