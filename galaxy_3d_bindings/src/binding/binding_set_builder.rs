/// Binding set builder and the immutable blueprint it produces.
///
/// Slots are assigned in call order starting at 0. Every `add_*` call
/// checks the handle against the registry and the binding type against the
/// resource's usage flags, so a blueprint never references a resource that
/// could not be bound the way it says.
///
/// A slot is visible to the blueprint's stages unless it was added with an
/// explicit stage mask (`*_with_stages`). A builder obtained from
/// `GlobalBindingState::begin_build_mut` can also create the host-visible
/// buffer it binds (`add_create_buffer_binding`).
///
/// # Example
///
/// ```ignore
/// let blueprint = state.begin_build()
///     .add_buffer_binding(camera_ubo)?
///     .add_image_binding(albedo, ImageLayout::ShaderReadOnly)?
///     .visibility(ShaderStages::VERTEX_FRAGMENT)?
///     .name("camera")?
///     .blueprint();
/// state.build("camera", &blueprint)?;
/// ```

use crate::backend::{
    BindingBackend, BufferBindingType, BufferDesc, BufferUsage, DescriptorType, ImageBindingType,
    ImageLayout, ImageUsage, LayoutDesc, LayoutEntry, MemoryKind, ShaderStages,
};
use crate::error::Result;
use crate::resource::{BufferHandle, ImageHandle, ResourceRegistry};
use crate::bind_bail;

const SOURCE: &str = "galaxy3d::BindingSetBuilder";

// ============================================================================
// Blueprint
// ============================================================================

/// Resource a slot points at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BindingTarget {
    Buffer(BufferHandle),
    /// Image with the layout the shader expects it in
    Image(ImageHandle, ImageLayout),
}

/// One slot of a blueprint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BindingDesc {
    pub slot: u32,
    pub descriptor_type: DescriptorType,
    pub target: BindingTarget,
    /// Stage mask of this slot, `None` to use the blueprint's visibility
    pub stages: Option<ShaderStages>,
}

/// Immutable description of a binding set.
///
/// References resources by handle only; it owns nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blueprint {
    bindings: Vec<BindingDesc>,
    visibility: ShaderStages,
    name: String,
}

impl Blueprint {
    /// Bindings in slot order
    pub fn bindings(&self) -> &[BindingDesc] {
        &self.bindings
    }

    pub fn binding(&self, slot: u32) -> Option<&BindingDesc> {
        self.bindings.get(slot as usize)
    }

    pub fn visibility(&self) -> ShaderStages {
        self.visibility
    }

    /// Debug name, empty if none was given
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Stages `slot` is visible to
    pub fn slot_stages(&self, slot: u32) -> Option<ShaderStages> {
        self.binding(slot).map(|b| b.stages.unwrap_or(self.visibility))
    }

    /// Layout this blueprint needs: one descriptor per slot, visible to the
    /// slot's own stages or else the blueprint's
    pub fn layout_desc(&self) -> LayoutDesc {
        LayoutDesc {
            entries: self
                .bindings
                .iter()
                .map(|b| LayoutEntry {
                    binding: b.slot,
                    descriptor_type: b.descriptor_type,
                    count: 1,
                    stages: b.stages.unwrap_or(self.visibility),
                })
                .collect(),
        }
    }
}

/// Check that `binding` can still be bound as described.
///
/// Fails with `NotFound` if the resource is gone and `TypeMismatch` if its
/// usage flags do not allow the descriptor type.
pub fn validate_binding<B: BindingBackend>(
    registry: &ResourceRegistry<B>,
    binding: &BindingDesc,
) -> Result<()> {
    match binding.target {
        BindingTarget::Buffer(handle) => {
            let buffer = registry.buffer(handle)?;
            let Some(required) = binding.descriptor_type.required_buffer_usage() else {
                bind_bail!(TypeMismatch, SOURCE,
                    "Slot {}: {} cannot be bound as {:?}", binding.slot, handle, binding.descriptor_type);
            };
            if !buffer.usage().contains(required) {
                bind_bail!(TypeMismatch, SOURCE,
                    "Slot {}: {} has usage {:?}, {:?} requires {:?}",
                    binding.slot, handle, buffer.usage(), binding.descriptor_type, required);
            }
        }
        BindingTarget::Image(handle, _) => {
            let image = registry.image(handle)?;
            let Some(required) = binding.descriptor_type.required_image_usage() else {
                bind_bail!(TypeMismatch, SOURCE,
                    "Slot {}: {} cannot be bound as {:?}", binding.slot, handle, binding.descriptor_type);
            };
            if !image.usage().contains(required) {
                bind_bail!(TypeMismatch, SOURCE,
                    "Slot {}: {} has usage {:?}, {:?} requires {:?}",
                    binding.slot, handle, image.usage(), binding.descriptor_type, required);
            }
        }
    }
    Ok(())
}

// ============================================================================
// Builder
// ============================================================================

/// Registry access of a builder
enum RegistryAccess<'a, B: BindingBackend> {
    Shared(&'a ResourceRegistry<B>),
    /// Allows creating resources while building
    Exclusive {
        registry: &'a mut ResourceRegistry<B>,
        backend: &'a mut B,
    },
}

/// Reusable accumulator of slot bindings
pub struct BindingSetBuilder<'a, B: BindingBackend> {
    access: RegistryAccess<'a, B>,
    bindings: Vec<BindingDesc>,
    visibility: ShaderStages,
    name: String,
}

impl<'a, B: BindingBackend> BindingSetBuilder<'a, B> {
    /// Empty builder validating handles against `registry`
    pub fn new(registry: &'a ResourceRegistry<B>) -> Self {
        Self::with_access(RegistryAccess::Shared(registry))
    }

    /// Builder that may also create the buffers it binds
    pub fn with_backend(registry: &'a mut ResourceRegistry<B>, backend: &'a mut B) -> Self {
        Self::with_access(RegistryAccess::Exclusive { registry, backend })
    }

    fn with_access(access: RegistryAccess<'a, B>) -> Self {
        Self {
            access,
            bindings: Vec::new(),
            visibility: ShaderStages::ALL,
            name: String::new(),
        }
    }

    fn registry(&self) -> &ResourceRegistry<B> {
        match &self.access {
            RegistryAccess::Shared(registry) => &**registry,
            RegistryAccess::Exclusive { registry, .. } => &**registry,
        }
    }

    fn next_slot(&self) -> u32 {
        self.bindings.len() as u32
    }

    fn check_stages(&self, stages: ShaderStages) -> Result<()> {
        if stages.is_empty() {
            bind_bail!(InvalidResource, SOURCE, "Slot {}: stage mask must name at least one stage", self.next_slot());
        }
        Ok(())
    }

    fn push(
        &mut self,
        descriptor_type: DescriptorType,
        target: BindingTarget,
        stages: Option<ShaderStages>,
    ) -> Result<&mut Self> {
        let binding = BindingDesc { slot: self.next_slot(), descriptor_type, target, stages };
        validate_binding(self.registry(), &binding)?;
        self.bindings.push(binding);
        Ok(self)
    }

    /// Bind a buffer at the next slot.
    ///
    /// Uniform-capable buffers become uniform buffers, storage-only buffers
    /// become storage buffers.
    pub fn add_buffer_binding(&mut self, handle: BufferHandle) -> Result<&mut Self> {
        let usage = self.registry().buffer(handle)?.usage();
        let binding_type = if usage.contains(BufferUsage::UNIFORM) {
            BufferBindingType::Uniform
        } else if usage.contains(BufferUsage::STORAGE) {
            BufferBindingType::Storage
        } else {
            bind_bail!(TypeMismatch, SOURCE,
                "Slot {}: {} has neither UNIFORM nor STORAGE usage ({:?})",
                self.next_slot(), handle, usage);
        };
        self.push(binding_type.descriptor_type(), BindingTarget::Buffer(handle), None)
    }

    /// Bind a buffer at the next slot with an explicit binding type
    pub fn add_buffer_binding_as(
        &mut self,
        handle: BufferHandle,
        binding_type: BufferBindingType,
    ) -> Result<&mut Self> {
        self.push(binding_type.descriptor_type(), BindingTarget::Buffer(handle), None)
    }

    /// Bind a buffer at the next slot, visible only to `stages`
    pub fn add_buffer_binding_with_stages(
        &mut self,
        handle: BufferHandle,
        binding_type: BufferBindingType,
        stages: ShaderStages,
    ) -> Result<&mut Self> {
        self.check_stages(stages)?;
        self.push(binding_type.descriptor_type(), BindingTarget::Buffer(handle), Some(stages))
    }

    /// Create a `size`-byte host-visible buffer and bind it at the next slot.
    ///
    /// The buffer belongs to the registry like any other; its contents are
    /// filled later through `GlobalBindingState::write`. Fails with
    /// `InvalidResource` on a builder from `begin_build`, which cannot
    /// create resources.
    pub fn add_create_buffer_binding(
        &mut self,
        size: u64,
        binding_type: BufferBindingType,
        stages: ShaderStages,
    ) -> Result<&mut Self> {
        self.check_stages(stages)?;
        let slot = self.next_slot();
        let RegistryAccess::Exclusive { registry, backend } = &mut self.access else {
            bind_bail!(InvalidResource, SOURCE,
                "Slot {}: this builder cannot create buffers (use begin_build_mut)", slot);
        };

        let desc = BufferDesc { size, usage: binding_type.buffer_usage(), memory: MemoryKind::CpuToGpu };
        let handle = registry.create_buffer(&mut **backend, desc)?;
        self.push(binding_type.descriptor_type(), BindingTarget::Buffer(handle), Some(stages))
    }

    /// Bind an image at the next slot.
    ///
    /// Sampled images become combined image samplers, storage-only images
    /// become storage images.
    pub fn add_image_binding(&mut self, handle: ImageHandle, layout: ImageLayout) -> Result<&mut Self> {
        let usage = self.registry().image(handle)?.usage();
        let binding_type = if usage.contains(ImageUsage::SAMPLED) {
            ImageBindingType::CombinedImageSampler
        } else if usage.contains(ImageUsage::STORAGE) {
            ImageBindingType::StorageImage
        } else {
            bind_bail!(TypeMismatch, SOURCE,
                "Slot {}: {} has neither SAMPLED nor STORAGE usage ({:?})",
                self.next_slot(), handle, usage);
        };
        self.push(binding_type.descriptor_type(), BindingTarget::Image(handle, layout), None)
    }

    /// Bind an image at the next slot with an explicit binding type
    pub fn add_image_binding_as(
        &mut self,
        handle: ImageHandle,
        binding_type: ImageBindingType,
        layout: ImageLayout,
    ) -> Result<&mut Self> {
        self.push(binding_type.descriptor_type(), BindingTarget::Image(handle, layout), None)
    }

    /// Bind an image at the next slot, visible only to `stages`
    pub fn add_image_binding_with_stages(
        &mut self,
        handle: ImageHandle,
        binding_type: ImageBindingType,
        layout: ImageLayout,
        stages: ShaderStages,
    ) -> Result<&mut Self> {
        self.check_stages(stages)?;
        self.push(binding_type.descriptor_type(), BindingTarget::Image(handle, layout), Some(stages))
    }

    /// Shader stages of slots without their own mask (default: all)
    pub fn visibility(&mut self, stages: ShaderStages) -> Result<&mut Self> {
        if stages.is_empty() {
            bind_bail!(InvalidResource, SOURCE, "Binding set visibility must name at least one stage");
        }
        self.visibility = stages;
        Ok(self)
    }

    pub fn name(&mut self, name: &str) -> Result<&mut Self> {
        self.name.clear();
        self.name.push_str(name);
        Ok(self)
    }

    /// Forget every binding and reset visibility and name, keeping allocations
    pub fn clear(&mut self) -> &mut Self {
        self.bindings.clear();
        self.visibility = ShaderStages::ALL;
        self.name.clear();
        self
    }

    /// Snapshot of the current bindings. The builder is left untouched.
    pub fn blueprint(&self) -> Blueprint {
        Blueprint {
            bindings: self.bindings.clone(),
            visibility: self.visibility,
            name: self.name.clone(),
        }
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[path = "binding_set_builder_tests.rs"]
mod tests;
