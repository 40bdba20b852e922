//! Resource module
//!
//! Handle-addressed storage for the buffers and images bound into binding sets.

mod resource_registry;

pub use resource_registry::{
    BufferHandle, ImageHandle,
    BufferResource, ImageResource,
    MappedBuffer,
    RegistryConfig, ResourceRegistry,
};
