//! Small allocation utilities shared by the binding layer

mod handle_allocator;
mod range_free_list;

pub use handle_allocator::HandleAllocator;
pub use range_free_list::{IdRange, RangeFreeList};
