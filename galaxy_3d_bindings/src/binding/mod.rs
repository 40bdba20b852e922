/// Binding module - pool allocation, layouts, builders and the global binding state

mod binding_set_builder;
mod binding_state;
mod layout_cache;
mod pool_allocator;

pub use binding_set_builder::{validate_binding, BindingDesc, BindingSetBuilder, BindingTarget, Blueprint};
pub use binding_state::{BindingStateConfig, GlobalBindingState, NamedBindingSet};
pub use layout_cache::LayoutCache;
pub use pool_allocator::{AllocatorConfig, PoolAllocator};
