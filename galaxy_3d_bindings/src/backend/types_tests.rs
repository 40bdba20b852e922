//! Unit tests for shared backend description types

use super::*;

#[test]
fn test_descriptor_type_kinds() {
    assert!(DescriptorType::UniformBufferDynamic.is_buffer());
    assert!(!DescriptorType::CombinedImageSampler.is_buffer());
    assert!(!DescriptorType::StorageImage.is_buffer());
}

#[test]
fn test_required_usage_per_descriptor_type() {
    assert_eq!(DescriptorType::UniformBufferDynamic.required_buffer_usage(), Some(BufferUsage::UNIFORM));
    assert_eq!(DescriptorType::StorageBuffer.required_buffer_usage(), Some(BufferUsage::STORAGE));
    assert_eq!(DescriptorType::SampledImage.required_buffer_usage(), None);

    assert_eq!(DescriptorType::CombinedImageSampler.required_image_usage(), Some(ImageUsage::SAMPLED));
    assert_eq!(DescriptorType::StorageImage.required_image_usage(), Some(ImageUsage::STORAGE));
    assert_eq!(DescriptorType::UniformBuffer.required_image_usage(), None);
}

#[test]
fn test_layout_descriptor_counts_group_by_type() {
    let desc = LayoutDesc {
        entries: vec![
            LayoutEntry { binding: 0, descriptor_type: DescriptorType::UniformBuffer, count: 1, stages: ShaderStages::ALL },
            LayoutEntry { binding: 1, descriptor_type: DescriptorType::CombinedImageSampler, count: 4, stages: ShaderStages::FRAGMENT },
            LayoutEntry { binding: 2, descriptor_type: DescriptorType::UniformBuffer, count: 2, stages: ShaderStages::VERTEX },
        ],
    };

    assert_eq!(
        desc.descriptor_counts(),
        vec![(DescriptorType::UniformBuffer, 3), (DescriptorType::CombinedImageSampler, 4)]
    );
}

#[test]
fn test_pool_size_ratio_never_zero() {
    assert_eq!(PoolSizeRatio::new(DescriptorType::StorageImage, 0.5).descriptor_count(10), 5);
    assert_eq!(PoolSizeRatio::new(DescriptorType::StorageImage, 0.01).descriptor_count(10), 1);
}

#[test]
fn test_resource_description_helpers() {
    assert!(Extent3d::new_2d(0, 16).is_empty());
    assert!(!Extent3d::new_2d(16, 16).is_empty());
    assert!(ImageFormat::D32_SFLOAT.is_depth());
    assert!(!MemoryKind::GpuOnly.is_host_visible());
    assert!(MemoryKind::GpuToCpu.is_host_visible());
}
