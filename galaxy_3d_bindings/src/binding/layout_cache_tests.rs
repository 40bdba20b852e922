use super::*;
use crate::backend::{DescriptorType, LayoutEntry, MockBackend, ShaderStages};

fn desc(types: &[DescriptorType], stages: ShaderStages) -> LayoutDesc {
    LayoutDesc {
        entries: types
            .iter()
            .enumerate()
            .map(|(i, &descriptor_type)| LayoutEntry {
                binding: i as u32,
                descriptor_type,
                count: 1,
                stages,
            })
            .collect(),
    }
}

#[test]
fn test_identical_descriptions_share_layout() {
    let mut backend = MockBackend::new();
    let mut cache = LayoutCache::<MockBackend>::new();
    let a = desc(&[DescriptorType::UniformBuffer, DescriptorType::CombinedImageSampler], ShaderStages::ALL);

    let first = cache.get_or_create(&mut backend, &a).unwrap();
    let second = cache.get_or_create(&mut backend, &a.clone()).unwrap();

    assert_eq!(first, second);
    assert_eq!(cache.len(), 1);
    assert_eq!(backend.live_layout_count(), 1);

    cache.teardown(&mut backend);
}

#[test]
fn test_different_descriptions_get_distinct_layouts() {
    let mut backend = MockBackend::new();
    let mut cache = LayoutCache::<MockBackend>::new();

    let uniform = cache
        .get_or_create(&mut backend, &desc(&[DescriptorType::UniformBuffer], ShaderStages::ALL))
        .unwrap();
    let storage = cache
        .get_or_create(&mut backend, &desc(&[DescriptorType::StorageBuffer], ShaderStages::ALL))
        .unwrap();
    // Same bindings, different visibility
    let vertex_only = cache
        .get_or_create(&mut backend, &desc(&[DescriptorType::UniformBuffer], ShaderStages::VERTEX))
        .unwrap();

    assert_ne!(uniform, storage);
    assert_ne!(uniform, vertex_only);
    assert_eq!(cache.len(), 3);

    cache.teardown(&mut backend);
}

#[test]
fn test_get_does_not_create() {
    let mut backend = MockBackend::new();
    let mut cache = LayoutCache::<MockBackend>::new();
    let a = desc(&[DescriptorType::StorageImage], ShaderStages::COMPUTE);

    assert!(cache.get(&a).is_none());
    let layout = cache.get_or_create(&mut backend, &a).unwrap();
    assert_eq!(cache.get(&a), Some(layout));

    cache.teardown(&mut backend);
}

#[test]
fn test_teardown_destroys_layouts() {
    let mut backend = MockBackend::new();
    let mut cache = LayoutCache::<MockBackend>::new();
    cache.get_or_create(&mut backend, &desc(&[DescriptorType::UniformBuffer], ShaderStages::ALL)).unwrap();
    cache.get_or_create(&mut backend, &desc(&[DescriptorType::StorageBuffer], ShaderStages::ALL)).unwrap();

    cache.teardown(&mut backend);

    assert!(cache.is_empty());
    assert_eq!(backend.live_layout_count(), 0);
}
