/// Layout cache - one backend layout per distinct layout description

use rustc_hash::FxHashMap;

use crate::backend::{BindingBackend, LayoutDesc};
use crate::bind_debug;
use crate::error::Result;

/// Deduplicates backend layouts by description.
///
/// Two blueprints with the same bindings and visibility resolve to the same
/// layout object, which keeps their sets interchangeable in a pipeline.
pub struct LayoutCache<B: BindingBackend> {
    layouts: FxHashMap<LayoutDesc, B::Layout>,
}

impl<B: BindingBackend> LayoutCache<B> {
    pub fn new() -> Self {
        Self { layouts: FxHashMap::default() }
    }

    /// Cached layout for `desc`, created on first request
    pub fn get_or_create(&mut self, backend: &mut B, desc: &LayoutDesc) -> Result<B::Layout> {
        if let Some(&layout) = self.layouts.get(desc) {
            return Ok(layout);
        }

        let layout = backend.create_layout(desc)?;
        self.layouts.insert(desc.clone(), layout);
        bind_debug!("galaxy3d::LayoutCache", "Created layout with {} entries ({} cached)",
            desc.entries.len(), self.layouts.len());
        Ok(layout)
    }

    pub fn get(&self, desc: &LayoutDesc) -> Option<B::Layout> {
        self.layouts.get(desc).copied()
    }

    pub fn len(&self) -> usize {
        self.layouts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layouts.is_empty()
    }

    /// Destroy every cached layout
    pub fn teardown(&mut self, backend: &mut B) {
        for (_, layout) in self.layouts.drain() {
            backend.destroy_layout(layout);
        }
    }
}

impl<B: BindingBackend> Default for LayoutCache<B> {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[path = "layout_cache_tests.rs"]
mod tests;
