//! Graphics Pipeline Cache Tests
//!
//! Tests for:
//! - Full lookups: at-most-one creation per descriptor
//! - Transition graph: memoize, follow, never false-match
//! - Transition fan-out bound from CacheSettings
//! - populate() with duplicates, creation failure, release/destroy

mod common;

use common::{MockDevice, MockPipelineLayout, init_logger, out_of_memory};
use state_cache::cache::{CacheKind, GraphicsPipelineCache};
use state_cache::desc::{CullMode, FrontFace, GraphicsPipelineDesc, GraphicsPipelineTransitionBits};
use state_cache::device::GraphicsPipelineCreateInfo;
use state_cache::settings::CacheSettings;

struct Fixture {
    device: MockDevice,
    render_pass: u64,
    layout: MockPipelineLayout,
    base: GraphicsPipelineDesc,
}

impl Fixture {
    fn new() -> Self {
        init_logger();
        Self {
            device: MockDevice::new(),
            render_pass: 1000,
            layout: MockPipelineLayout {
                id: 2000,
                set_layouts: Vec::new(),
            },
            base: GraphicsPipelineDesc::with_defaults(&CacheSettings::default()),
        }
    }
}

/// Runs `$body` with `$info` bound to a create-info over the fixture objects.
macro_rules! with_info {
    ($fixture:ident, $info:ident, $body:expr) => {{
        let $info = GraphicsPipelineCreateInfo::<MockDevice>::new(&$fixture.render_pass, &$fixture.layout);
        $body
    }};
}

// ============================================================================
// Full Lookup Tests
// ============================================================================

#[test]
fn identical_descriptors_create_once() {
    let mut f = Fixture::new();
    let mut cache = GraphicsPipelineCache::default();

    let (a, b) = with_info!(f, info, {
        let a = cache.get_pipeline(&mut f.device, &info, &f.base).unwrap();
        let b = cache.get_pipeline(&mut f.device, &info, &f.base).unwrap();
        (a, b)
    });

    assert_eq!(a, b);
    assert_eq!(f.device.created.pipelines, 1);
    assert_eq!(cache.stats().hit_count(), 1);
    assert_eq!(cache.stats().miss_count(), 1);
    assert_eq!(cache.lookup(&f.base), Some(a));
}

#[test]
fn helpers_have_distinct_serials() {
    let mut f = Fixture::new();
    let mut cache = GraphicsPipelineCache::default();
    let mut culled = f.base;
    culled.set_cull_mode(CullMode::Back);

    let (a, b) = with_info!(f, info, {
        (
            cache.get_pipeline(&mut f.device, &info, &f.base).unwrap(),
            cache.get_pipeline(&mut f.device, &info, &culled).unwrap(),
        )
    });

    let serial_a = cache.helper(a).unwrap().serial();
    let serial_b = cache.helper(b).unwrap().serial();
    assert!(serial_a.is_valid());
    assert_ne!(serial_a, serial_b);
    assert_eq!(cache.desc(b), Some(&culled));
}

// ============================================================================
// Transition Tests
// ============================================================================

#[test]
fn cull_mode_transition_scenario() {
    let mut f = Fixture::new();
    let mut cache = GraphicsPipelineCache::default();
    let from = with_info!(f, info, cache.get_pipeline(&mut f.device, &info, &f.base).unwrap());

    let mut bits = GraphicsPipelineTransitionBits::empty();
    let mut culled = f.base;
    culled.update_cull_mode(&mut bits, CullMode::Back);
    assert_eq!(bits.count(), 1);

    assert!(cache.find_transition(from, bits, &culled).is_none());

    let to = with_info!(
        f,
        info,
        cache
            .get_pipeline_with_transition(&mut f.device, &info, from, bits, &culled)
            .unwrap()
    );
    assert_ne!(from, to);
    assert_eq!(cache.helper(from).unwrap().transitions().len(), 1);

    let found = cache.find_transition(from, bits, &culled).unwrap();
    assert_eq!(found, to);
    let target = cache.desc(found).unwrap();
    for word in bits.words() {
        assert_eq!(target.words()[word], culled.words()[word]);
    }
}

#[test]
fn transition_never_matches_a_different_value() {
    let mut f = Fixture::new();
    let mut cache = GraphicsPipelineCache::default();
    let from = with_info!(f, info, cache.get_pipeline(&mut f.device, &info, &f.base).unwrap());

    let mut back_bits = GraphicsPipelineTransitionBits::empty();
    let mut back = f.base;
    back.update_cull_mode(&mut back_bits, CullMode::Back);
    let _ = with_info!(
        f,
        info,
        cache
            .get_pipeline_with_transition(&mut f.device, &info, from, back_bits, &back)
            .unwrap()
    );

    let mut front_bits = GraphicsPipelineTransitionBits::empty();
    let mut front = f.base;
    front.update_cull_mode(&mut front_bits, CullMode::Front);
    assert_eq!(front_bits, back_bits);
    assert!(cache.find_transition(from, front_bits, &front).is_none());

    let mut face_bits = GraphicsPipelineTransitionBits::empty();
    let mut clockwise = f.base;
    clockwise.update_front_face(&mut face_bits, FrontFace::Clockwise);
    assert!(cache.find_transition(from, face_bits, &clockwise).is_none());
}

#[test]
fn transition_requires_identical_mask() {
    let mut f = Fixture::new();
    let mut cache = GraphicsPipelineCache::default();
    let from = with_info!(f, info, cache.get_pipeline(&mut f.device, &info, &f.base).unwrap());

    let mut bits = GraphicsPipelineTransitionBits::empty();
    let mut culled = f.base;
    culled.update_cull_mode(&mut bits, CullMode::Back);
    let to = with_info!(f, info, cache.get_pipeline(&mut f.device, &info, &culled).unwrap());
    cache.add_transition(from, bits, to);

    let mut wider = bits;
    wider.set_word(0);
    assert!(cache.find_transition(from, wider, &culled).is_none());
    assert_eq!(cache.find_transition(from, bits, &culled), Some(to));
}

#[test]
fn transition_hits_are_not_counted() {
    let mut f = Fixture::new();
    let mut cache = GraphicsPipelineCache::default();
    let from = with_info!(f, info, cache.get_pipeline(&mut f.device, &info, &f.base).unwrap());

    let mut bits = GraphicsPipelineTransitionBits::empty();
    let mut culled = f.base;
    culled.update_cull_mode(&mut bits, CullMode::Back);

    with_info!(f, info, {
        let _ = cache
            .get_pipeline_with_transition(&mut f.device, &info, from, bits, &culled)
            .unwrap();
        let _ = cache
            .get_pipeline_with_transition(&mut f.device, &info, from, bits, &culled)
            .unwrap();
    });

    assert_eq!(cache.stats().miss_count(), 2);
    assert_eq!(cache.stats().hit_count(), 0);
    assert_eq!(f.device.created.pipelines, 2);
}

#[test]
fn bounded_transitions_drop_the_oldest() {
    let mut f = Fixture::new();
    let settings = CacheSettings {
        max_pipeline_transitions: Some(1),
        ..Default::default()
    };
    let mut cache = GraphicsPipelineCache::new(&settings);
    let from = with_info!(f, info, cache.get_pipeline(&mut f.device, &info, &f.base).unwrap());

    let mut back_bits = GraphicsPipelineTransitionBits::empty();
    let mut back = f.base;
    back.update_cull_mode(&mut back_bits, CullMode::Back);

    let mut front_bits = GraphicsPipelineTransitionBits::empty();
    let mut front = f.base;
    front.update_cull_mode(&mut front_bits, CullMode::Front);

    with_info!(f, info, {
        let _ = cache
            .get_pipeline_with_transition(&mut f.device, &info, from, back_bits, &back)
            .unwrap();
        let _ = cache
            .get_pipeline_with_transition(&mut f.device, &info, from, front_bits, &front)
            .unwrap();
    });

    assert_eq!(cache.helper(from).unwrap().transitions().len(), 1);
    assert!(cache.find_transition(from, back_bits, &back).is_none());
    assert!(cache.find_transition(from, front_bits, &front).is_some());
}

#[test]
fn zero_transition_bound_disables_memoization() {
    let mut f = Fixture::new();
    let settings = CacheSettings {
        max_pipeline_transitions: Some(0),
        ..Default::default()
    };
    let mut cache = GraphicsPipelineCache::new(&settings);
    let from = with_info!(f, info, cache.get_pipeline(&mut f.device, &info, &f.base).unwrap());

    let mut bits = GraphicsPipelineTransitionBits::empty();
    let mut culled = f.base;
    culled.update_cull_mode(&mut bits, CullMode::Back);
    let _ = with_info!(
        f,
        info,
        cache
            .get_pipeline_with_transition(&mut f.device, &info, from, bits, &culled)
            .unwrap()
    );

    assert!(cache.helper(from).unwrap().transitions().is_empty());
}

// ============================================================================
// Populate / Failure / Teardown Tests
// ============================================================================

#[test]
fn populate_discards_duplicates() {
    let mut f = Fixture::new();
    let mut cache = GraphicsPipelineCache::default();

    let first = cache.populate(&mut f.device, &f.base, 77);
    let second = cache.populate(&mut f.device, &f.base, 78);
    assert_eq!(first, second);
    assert_eq!(cache.pipeline(first), Some(&77));
    assert_eq!(f.device.destroyed.pipelines, 1);

    let looked_up = with_info!(f, info, cache.get_pipeline(&mut f.device, &info, &f.base).unwrap());
    assert_eq!(looked_up, first);
    assert_eq!(f.device.created.pipelines, 0);
}

#[test]
fn failed_creation_leaves_no_entry() {
    let mut f = Fixture::new();
    let mut cache = GraphicsPipelineCache::default();

    f.device.fail_next(out_of_memory(CacheKind::GraphicsPipeline));
    let result = with_info!(f, info, cache.get_pipeline(&mut f.device, &info, &f.base));
    assert!(result.is_err());
    assert!(cache.is_empty());
    assert!(cache.lookup(&f.base).is_none());
    assert_eq!(cache.stats().miss_count(), 1);
}

#[test]
fn release_hands_back_pipelines_and_invalidates_keys() {
    let mut f = Fixture::new();
    let mut cache = GraphicsPipelineCache::default();
    let key = with_info!(f, info, cache.get_pipeline(&mut f.device, &info, &f.base).unwrap());

    let released = cache.release();
    assert_eq!(released.len(), 1);
    assert!(cache.helper(key).is_none());
    assert!(cache.is_empty());
}

#[test]
fn destroy_returns_pipelines_to_device() {
    let mut f = Fixture::new();
    let mut cache = GraphicsPipelineCache::default();
    let mut culled = f.base;
    culled.set_cull_mode(CullMode::Back);

    with_info!(f, info, {
        let _ = cache.get_pipeline(&mut f.device, &info, &f.base).unwrap();
        let _ = cache.get_pipeline(&mut f.device, &info, &culled).unwrap();
    });

    cache.destroy(&mut f.device);
    assert_eq!(f.device.destroyed.pipelines, 2);
    assert_eq!(f.device.live_objects(), 0);
}
