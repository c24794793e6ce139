//! Shared Sub-Object Cache Tests
//!
//! Tests for:
//! - SamplerCache: one object per descriptor, reference counting
//! - DescriptorSetLayoutCache / PipelineLayoutCache: set layouts held by
//!   pipeline layouts, cleanup on failure and on release
//! - SamplerYcbcrConversionCache: lookup by external format
//! - Teardown with live references

mod common;

use common::{MockDevice, init_logger, out_of_memory, set_layout};
use state_cache::cache::{
    CacheKind, DescriptorSetLayoutCache, HasCacheStats, PerCacheStats, PipelineLayoutCache, SamplerCache,
    SamplerYcbcrConversionCache,
};
use state_cache::desc::{
    AddressMode, DescriptorSetLayoutDesc, DescriptorType, FormatId, PipelineLayoutDesc, SamplerDesc, SamplerState,
    ShaderStageFlags, YcbcrConversionDesc, YcbcrModelConversion, YcbcrRange,
};
use state_cache::settings::CacheSettings;

fn sampler_desc(address_mode: AddressMode) -> SamplerDesc {
    let state = SamplerState {
        address_mode_u: address_mode,
        ..Default::default()
    };
    SamplerDesc::new(&CacheSettings::default(), &state, false, 0)
}

// ============================================================================
// Sampler Tests
// ============================================================================

#[test]
fn sampler_reference_count_scenario() {
    init_logger();
    let mut device = MockDevice::new();
    let mut cache = SamplerCache::new();
    let desc = sampler_desc(AddressMode::Repeat);

    let a = cache.get_sampler(&mut device, &desc).unwrap();
    let b = cache.get_sampler(&mut device, &desc).unwrap();
    assert!(a.same_object(&b));
    assert_eq!(cache.get(&a), cache.get(&b));
    assert_eq!(cache.ref_count(&a), 2);
    assert_eq!(device.created.samplers, 1);

    cache.release(&mut device, a);
    assert_eq!(cache.ref_count(&b), 1);
    assert_eq!(device.destroyed.samplers, 0);

    cache.release(&mut device, b);
    assert_eq!(device.destroyed.samplers, 1);
    assert!(cache.is_empty());
}

#[test]
fn sampler_serial_keys_immutable_sampler_bindings() {
    let mut device = MockDevice::new();
    let mut cache = SamplerCache::new();

    let a = cache.get_sampler(&mut device, &sampler_desc(AddressMode::Repeat)).unwrap();
    let b = cache.get_sampler(&mut device, &sampler_desc(AddressMode::Repeat)).unwrap();
    let other = cache
        .get_sampler(&mut device, &sampler_desc(AddressMode::MirroredRepeat))
        .unwrap();

    let serial = cache.sampler_serial(&a);
    assert!(serial.is_valid());
    assert_eq!(cache.sampler_serial(&b), serial);
    assert_eq!(cache.helper(&b).sampler_serial(), serial);
    assert_ne!(cache.sampler_serial(&other), serial);

    let mut layout = DescriptorSetLayoutDesc::new();
    layout.update(
        0,
        DescriptorType::CombinedImageSampler,
        1,
        ShaderStageFlags::FRAGMENT,
        Some(cache.sampler_serial(&a)),
    );
    let mut same_layout = DescriptorSetLayoutDesc::new();
    same_layout.update(
        0,
        DescriptorType::CombinedImageSampler,
        1,
        ShaderStageFlags::FRAGMENT,
        Some(cache.sampler_serial(&b)),
    );
    assert_eq!(layout, same_layout);
    assert_eq!(layout.unpack_bindings()[0].immutable_sampler, Some(serial));

    cache.release(&mut device, a);
    cache.release(&mut device, b);
    cache.release(&mut device, other);
    assert_eq!(device.live_objects(), 0);
}

#[test]
fn different_sampler_descriptors_get_different_objects() {
    let mut device = MockDevice::new();
    let mut cache = SamplerCache::new();

    let repeat = cache.get_sampler(&mut device, &sampler_desc(AddressMode::Repeat)).unwrap();
    let clamp = cache
        .get_sampler(&mut device, &sampler_desc(AddressMode::ClampToEdge))
        .unwrap();
    assert!(!repeat.same_object(&clamp));
    assert_ne!(cache.get(&repeat), cache.get(&clamp));

    let third = cache.acquire(&clamp);
    assert_eq!(cache.ref_count(&clamp), 2);

    cache.release(&mut device, repeat);
    cache.release(&mut device, clamp);
    cache.release(&mut device, third);
    assert_eq!(device.live_objects(), 0);
}

#[test]
fn failed_sampler_creation_leaves_no_entry() {
    let mut device = MockDevice::new();
    let mut cache = SamplerCache::new();
    let desc = sampler_desc(AddressMode::Repeat);

    device.fail_next(out_of_memory(CacheKind::Sampler));
    assert!(cache.get_sampler(&mut device, &desc).is_err());
    assert!(cache.is_empty());
    assert_eq!(cache.stats().miss_count(), 1);

    let handle = cache.get_sampler(&mut device, &desc).unwrap();
    assert_eq!(cache.stats().miss_count(), 2);
    cache.release(&mut device, handle);
}

#[test]
fn sampler_destroy_with_live_references_drains() {
    let mut device = MockDevice::new();
    let mut cache = SamplerCache::new();
    let handle = cache.get_sampler(&mut device, &sampler_desc(AddressMode::Repeat)).unwrap();

    cache.destroy(&mut device);
    assert!(cache.is_empty());
    assert_eq!(device.destroyed.samplers, 1);
    drop(handle);
}

// ============================================================================
// Layout Tests
// ============================================================================

#[test]
fn pipeline_layout_holds_its_set_layouts() {
    init_logger();
    let mut device = MockDevice::new();
    let mut set_layouts = DescriptorSetLayoutCache::new();
    let mut layouts = PipelineLayoutCache::new();

    let mut desc = PipelineLayoutDesc::new();
    desc.update_descriptor_set_layout(0, &set_layout(false));
    desc.update_descriptor_set_layout(2, &set_layout(true));

    let handle = layouts.get_pipeline_layout(&mut device, &mut set_layouts, &desc).unwrap();

    // Sets 0..=2 are used; set 1 is an empty layout.
    assert_eq!(layouts.helper(&handle).set_layouts().len(), 3);
    assert_eq!(layouts.get(&handle).set_layouts.len(), 3);
    assert_eq!(set_layouts.len(), 3);
    assert_eq!(device.created.set_layouts, 3);

    let again = layouts.get_pipeline_layout(&mut device, &mut set_layouts, &desc).unwrap();
    assert!(handle.same_object(&again));
    assert_eq!(layouts.ref_count(&handle), 2);
    assert_eq!(layouts.stats().hit_count(), 1);
    assert_eq!(device.created.set_layouts, 3);

    layouts.release(&mut device, &mut set_layouts, again);
    assert_eq!(set_layouts.len(), 3);

    layouts.release(&mut device, &mut set_layouts, handle);
    assert!(layouts.is_empty());
    assert!(set_layouts.is_empty());
    assert_eq!(device.live_objects(), 0);
}

#[test]
fn pipeline_layouts_share_set_layouts() {
    let mut device = MockDevice::new();
    let mut set_layouts = DescriptorSetLayoutCache::new();
    let mut layouts = PipelineLayoutCache::new();

    let mut a = PipelineLayoutDesc::new();
    a.update_descriptor_set_layout(0, &set_layout(true));
    let mut b = a;
    b.update_descriptor_set_layout(1, &set_layout(false));

    let handle_a = layouts.get_pipeline_layout(&mut device, &mut set_layouts, &a).unwrap();
    let handle_b = layouts.get_pipeline_layout(&mut device, &mut set_layouts, &b).unwrap();
    assert_eq!(device.created.set_layouts, 2);
    assert_eq!(set_layouts.stats().hit_count(), 1);

    let shared = &layouts.helper(&handle_a).set_layouts()[0];
    assert_eq!(set_layouts.ref_count(shared), 2);
    assert_eq!(layouts.get(&handle_a).set_layouts[0], layouts.get(&handle_b).set_layouts[0]);

    layouts.release(&mut device, &mut set_layouts, handle_a);
    assert_eq!(device.destroyed.set_layouts, 0);
    layouts.release(&mut device, &mut set_layouts, handle_b);
    assert_eq!(device.destroyed.set_layouts, 2);
}

#[test]
fn failed_pipeline_layout_releases_acquired_set_layouts() {
    let mut device = MockDevice::new();
    let mut set_layouts = DescriptorSetLayoutCache::new();
    let mut layouts = PipelineLayoutCache::new();

    let set_desc = set_layout(true);
    let held = set_layouts.get_descriptor_set_layout(&mut device, &set_desc).unwrap();

    let mut desc = PipelineLayoutDesc::new();
    desc.update_descriptor_set_layout(0, &set_desc);
    desc.update_descriptor_set_layout(1, &set_layout(false));

    // Both set layouts resolve; only the pipeline layout itself fails.
    device.fail_next_of(CacheKind::PipelineLayout, out_of_memory(CacheKind::PipelineLayout));
    assert!(layouts.get_pipeline_layout(&mut device, &mut set_layouts, &desc).is_err());
    assert!(layouts.is_empty());
    assert_eq!(device.created.set_layouts, 2);
    assert_eq!(device.destroyed.set_layouts, 1);
    assert_eq!(set_layouts.len(), 1);
    assert_eq!(set_layouts.ref_count(&held), 1);

    set_layouts.release(&mut device, held);
    assert_eq!(device.live_objects(), 0);
}

#[test]
fn failed_set_layout_releases_earlier_sets() {
    let mut device = MockDevice::new();
    let mut set_layouts = DescriptorSetLayoutCache::new();
    let mut layouts = PipelineLayoutCache::new();

    let first = set_layout(false);
    let held = set_layouts.get_descriptor_set_layout(&mut device, &first).unwrap();

    let mut desc = PipelineLayoutDesc::new();
    desc.update_descriptor_set_layout(0, &first);
    desc.update_descriptor_set_layout(1, &set_layout(true));

    device.fail_next(out_of_memory(CacheKind::DescriptorSetLayout));
    assert!(layouts.get_pipeline_layout(&mut device, &mut set_layouts, &desc).is_err());
    assert_eq!(set_layouts.len(), 1);
    assert_eq!(set_layouts.ref_count(&held), 1);

    set_layouts.release(&mut device, held);
}

#[test]
fn layout_caches_destroy_in_order() {
    let mut device = MockDevice::new();
    let mut set_layouts = DescriptorSetLayoutCache::new();
    let mut layouts = PipelineLayoutCache::new();

    let mut desc = PipelineLayoutDesc::new();
    desc.update_descriptor_set_layout(0, &set_layout(true));
    let handle = layouts.get_pipeline_layout(&mut device, &mut set_layouts, &desc).unwrap();

    layouts.destroy(&mut device, &mut set_layouts);
    set_layouts.destroy(&mut device);
    assert!(layouts.is_empty());
    assert!(set_layouts.is_empty());
    assert_eq!(device.live_objects(), 0);
    drop(handle);
}

// ============================================================================
// Ycbcr Conversion Tests
// ============================================================================

fn ycbcr_desc(external_format: u64) -> YcbcrConversionDesc {
    let mut desc = YcbcrConversionDesc::new(external_format, FormatId::NONE);
    desc.set_conversion(YcbcrModelConversion::Ycbcr709, YcbcrRange::ItuNarrow);
    desc
}

#[test]
fn ycbcr_conversion_is_found_by_external_format() {
    let mut device = MockDevice::new();
    let mut cache = SamplerYcbcrConversionCache::new();

    let handle = cache.get_yuv_conversion(&mut device, &ycbcr_desc(0x1234)).unwrap();
    assert_eq!(
        cache.get_yuv_conversion_from_external_format(0x1234),
        Some(cache.get(&handle))
    );
    assert!(cache.get_yuv_conversion_from_external_format(0x9999).is_none());

    cache.release(&mut device, handle);
    assert!(cache.get_yuv_conversion_from_external_format(0x1234).is_none());
    assert_eq!(device.destroyed.ycbcr_conversions, 1);
}

#[test]
fn ycbcr_conversions_sharing_external_format_stay_reachable() {
    let mut device = MockDevice::new();
    let mut cache = SamplerYcbcrConversionCache::new();

    let mut bt601 = YcbcrConversionDesc::new(0x1234, FormatId::NONE);
    bt601.set_conversion(YcbcrModelConversion::Ycbcr601, YcbcrRange::ItuNarrow);
    let bt709 = ycbcr_desc(0x1234);

    let a = cache.get_yuv_conversion(&mut device, &bt601).unwrap();
    let b = cache.get_yuv_conversion(&mut device, &bt709).unwrap();
    assert!(!a.same_object(&b));
    assert_eq!(cache.get_yuv_conversion_from_external_format(0x1234), Some(cache.get(&a)));

    cache.release(&mut device, a);
    assert_eq!(cache.len(), 1);
    assert_eq!(cache.get_yuv_conversion_from_external_format(0x1234), Some(cache.get(&b)));

    cache.release(&mut device, b);
    assert!(cache.get_yuv_conversion_from_external_format(0x1234).is_none());
    assert_eq!(device.live_objects(), 0);
}

#[test]
fn ycbcr_without_external_format_is_not_indexed() {
    let mut device = MockDevice::new();
    let mut cache = SamplerYcbcrConversionCache::new();

    let handle = cache.get_yuv_conversion(&mut device, &ycbcr_desc(0)).unwrap();
    assert!(cache.get_yuv_conversion_from_external_format(0).is_none());

    let second = cache.get_yuv_conversion(&mut device, &ycbcr_desc(0)).unwrap();
    assert!(handle.same_object(&second));
    assert_eq!(device.created.ycbcr_conversions, 1);

    cache.release(&mut device, handle);
    cache.release(&mut device, second);
}

// ============================================================================
// Stats Tests
// ============================================================================

#[test]
fn shared_caches_report_under_their_own_kinds() {
    let mut device = MockDevice::new();
    let mut samplers = SamplerCache::new();
    let mut conversions = SamplerYcbcrConversionCache::new();

    let sampler = samplers.get_sampler(&mut device, &sampler_desc(AddressMode::Repeat)).unwrap();
    let conversion = conversions.get_yuv_conversion(&mut device, &ycbcr_desc(7)).unwrap();

    let mut per_cache = PerCacheStats::new();
    samplers.accumulate_cache_stats(&mut per_cache);
    conversions.accumulate_cache_stats(&mut per_cache);
    assert_eq!(per_cache.get(CacheKind::Sampler).miss_count(), 1);
    assert_eq!(per_cache.get(CacheKind::SamplerYcbcrConversion).miss_count(), 1);
    assert_eq!(per_cache.total().lookup_count(), 2);

    samplers.release(&mut device, sampler);
    conversions.release(&mut device, conversion);
}
