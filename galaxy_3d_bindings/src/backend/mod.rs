/// Backend module - the graphics backend contract and a CPU-only mock

#[allow(clippy::module_inception)]
pub mod backend;
pub mod types;
pub mod mock_backend;

pub use backend::*;
pub use types::*;
pub use mock_backend::{
    MockBackend, MockBuffer, MockImage, MockLayout, MockPool, MockPoolStats, MockSet, MockSlot,
};
