//! Graphics Pipeline Cache
//!
//! Pipelines live in a slot arena and are addressed through [`PipelineKey`]
//! handles. A full-descriptor hash map finds a pipeline from scratch; the
//! transition graph finds it from a *neighbour* without hashing.
//!
//! The key is the [`GraphicsPipelineDesc`] alone. Shader modules, pipeline
//! layout and specialization constants passed in [`GraphicsPipelineCreateInfo`]
//! are not part of it, so keep one cache per program and pipeline layout
//! combination.
//!
//! # Transitions
//!
//! The driver keeps a working [`GraphicsPipelineDesc`] that it knows matches
//! the pipeline it last bound. Each state update both mutates the descriptor
//! and marks the touched words in a [`GraphicsPipelineTransitionBits`] mask.
//! At draw time:
//!
//! ```text
//!  find_transition(current, bits, desc) ──hit──▶ target key
//!          │ miss
//!          ▼
//!  get_pipeline(desc) ──▶ key ──▶ add_transition(current, bits, key)
//! ```
//!
//! A transition matches when its mask is identical and the recorded target
//! agrees with `desc` on every dirty word. Clean words are not compared, so
//! callers must only change words they flag.

use rustc_hash::FxHashMap;
use slotmap::{SlotMap, new_key_type};
use smallvec::SmallVec;

use super::stats::{CacheKind, CacheStats, CacheStatsAccumulator, HasCacheStats};
use crate::desc::GraphicsPipelineDesc;
use crate::desc::GraphicsPipelineTransitionBits;
use crate::desc::pipeline::graphics_pipeline_transition_match;
use crate::device::{Device, GraphicsPipelineCreateInfo};
use crate::errors::Result;
use crate::serial::{Serial, SerialFactory};
use crate::settings::CacheSettings;

new_key_type! {
    /// Handle to a pipeline owned by a [`GraphicsPipelineCache`].
    pub struct PipelineKey;
}

/// One memoized edge of the transition graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GraphicsPipelineTransition {
    pub bits: GraphicsPipelineTransitionBits,
    pub target: PipelineKey,
}

/// A cached pipeline, its full descriptor and its outgoing transitions.
#[derive(Debug)]
pub struct PipelineHelper<P> {
    desc: GraphicsPipelineDesc,
    pipeline: P,
    serial: Serial,
    transitions: SmallVec<[GraphicsPipelineTransition; 4]>,
}

impl<P> PipelineHelper<P> {
    #[inline]
    #[must_use]
    pub fn desc(&self) -> &GraphicsPipelineDesc {
        &self.desc
    }

    #[inline]
    #[must_use]
    pub fn pipeline(&self) -> &P {
        &self.pipeline
    }

    #[inline]
    #[must_use]
    pub fn serial(&self) -> Serial {
        self.serial
    }

    #[must_use]
    pub fn transitions(&self) -> &[GraphicsPipelineTransition] {
        &self.transitions
    }
}

/// Deduplicates graphics pipelines by full descriptor.
pub struct GraphicsPipelineCache<D: Device> {
    pipelines: SlotMap<PipelineKey, PipelineHelper<D::Pipeline>>,
    lookup: FxHashMap<GraphicsPipelineDesc, PipelineKey>,
    serials: SerialFactory,
    max_transitions: Option<usize>,
    stats: CacheStats,
}

impl<D: Device> Default for GraphicsPipelineCache<D> {
    fn default() -> Self {
        Self::new(&CacheSettings::default())
    }
}

impl<D: Device> GraphicsPipelineCache<D> {
    #[must_use]
    pub fn new(settings: &CacheSettings) -> Self {
        Self {
            pipelines: SlotMap::with_key(),
            lookup: FxHashMap::default(),
            serials: SerialFactory::new(),
            max_transitions: settings.max_pipeline_transitions,
            stats: CacheStats::new(),
        }
    }

    // ── Full Lookup ──────────────────────────────────────────────────────────

    /// Looks `desc` up, creating the pipeline on a miss.
    pub fn get_pipeline(
        &mut self,
        device: &mut D,
        info: &GraphicsPipelineCreateInfo<'_, D>,
        desc: &GraphicsPipelineDesc,
    ) -> Result<PipelineKey> {
        if let Some(&key) = self.lookup.get(desc) {
            self.stats.hit();
            return Ok(key);
        }

        self.stats.miss();
        let pipeline = device.create_graphics_pipeline(info, desc)?;
        let key = self.insert(*desc, pipeline);
        log::debug!("Created graphics pipeline #{} ({} cached)", self.pipelines[key].serial.value(), self.len());
        Ok(key)
    }

    /// Inserts a pipeline that was created elsewhere.
    ///
    /// If `desc` is already cached the new pipeline is handed back to
    /// `device` for destruction and the existing key is returned.
    pub fn populate(&mut self, device: &mut D, desc: &GraphicsPipelineDesc, pipeline: D::Pipeline) -> PipelineKey {
        if let Some(&key) = self.lookup.get(desc) {
            log::debug!("Populated pipeline already cached, discarding duplicate");
            device.destroy_pipeline(pipeline);
            return key;
        }
        self.insert(*desc, pipeline)
    }

    fn insert(&mut self, desc: GraphicsPipelineDesc, pipeline: D::Pipeline) -> PipelineKey {
        let key = self.pipelines.insert(PipelineHelper {
            desc,
            pipeline,
            serial: self.serials.generate(),
            transitions: SmallVec::new(),
        });
        self.lookup.insert(desc, key);
        key
    }

    // ── Transitions ──────────────────────────────────────────────────────────

    /// Target of a memoized transition out of `from` that leads to `desc`.
    #[must_use]
    pub fn find_transition(
        &self,
        from: PipelineKey,
        bits: GraphicsPipelineTransitionBits,
        desc: &GraphicsPipelineDesc,
    ) -> Option<PipelineKey> {
        let helper = self.pipelines.get(from)?;
        let found = helper.transitions.iter().find(|transition| {
            self.pipelines.get(transition.target).is_some_and(|target| {
                graphics_pipeline_transition_match(transition.bits, bits, &target.desc, desc)
            })
        })?;
        log::trace!("Pipeline transition hit: {} dirty words", bits.count());
        Some(found.target)
    }

    /// Memoizes the edge `from --bits--> to`.
    ///
    /// With a transition bound configured, the oldest edge of `from` is
    /// dropped once the bound is reached.
    pub fn add_transition(&mut self, from: PipelineKey, bits: GraphicsPipelineTransitionBits, to: PipelineKey) {
        let max_transitions = self.max_transitions;
        let Some(helper) = self.pipelines.get_mut(from) else {
            return;
        };
        if let Some(max) = max_transitions {
            if max == 0 {
                return;
            }
            if helper.transitions.len() >= max {
                log::trace!("Pipeline transition list full ({max}), dropping oldest");
                helper.transitions.remove(0);
            }
        }
        helper.transitions.push(GraphicsPipelineTransition { bits, target: to });
    }

    /// Follows a transition out of `from` if one is memoized, otherwise does a
    /// full lookup and memoizes the edge.
    pub fn get_pipeline_with_transition(
        &mut self,
        device: &mut D,
        info: &GraphicsPipelineCreateInfo<'_, D>,
        from: PipelineKey,
        bits: GraphicsPipelineTransitionBits,
        desc: &GraphicsPipelineDesc,
    ) -> Result<PipelineKey> {
        if let Some(key) = self.find_transition(from, bits, desc) {
            return Ok(key);
        }
        let key = self.get_pipeline(device, info, desc)?;
        self.add_transition(from, bits, key);
        Ok(key)
    }

    // ── Access ───────────────────────────────────────────────────────────────

    #[inline]
    #[must_use]
    pub fn helper(&self, key: PipelineKey) -> Option<&PipelineHelper<D::Pipeline>> {
        self.pipelines.get(key)
    }

    #[inline]
    pub fn helper_mut(&mut self, key: PipelineKey) -> Option<&mut PipelineHelper<D::Pipeline>> {
        self.pipelines.get_mut(key)
    }

    #[inline]
    #[must_use]
    pub fn pipeline(&self, key: PipelineKey) -> Option<&D::Pipeline> {
        self.pipelines.get(key).map(|helper| &helper.pipeline)
    }

    #[inline]
    #[must_use]
    pub fn desc(&self, key: PipelineKey) -> Option<&GraphicsPipelineDesc> {
        self.pipelines.get(key).map(|helper| &helper.desc)
    }

    #[must_use]
    pub fn lookup(&self, desc: &GraphicsPipelineDesc) -> Option<PipelineKey> {
        self.lookup.get(desc).copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.pipelines.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pipelines.is_empty()
    }

    #[must_use]
    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }

    // ── Teardown ─────────────────────────────────────────────────────────────

    /// Empties the cache and returns every pipeline for deferred destruction.
    ///
    /// All previously issued keys become stale.
    pub fn release(&mut self) -> Vec<D::Pipeline> {
        self.lookup.clear();
        self.pipelines.drain().map(|(_, helper)| helper.pipeline).collect()
    }

    /// Empties the cache, handing every pipeline to `device` right away.
    pub fn destroy(&mut self, device: &mut D) {
        let pipelines = self.release();
        log::debug!("Destroying {} graphics pipelines", pipelines.len());
        for pipeline in pipelines {
            device.destroy_pipeline(pipeline);
        }
    }
}

impl<D: Device> HasCacheStats for GraphicsPipelineCache<D> {
    fn accumulate_cache_stats(&mut self, accumulator: &mut dyn CacheStatsAccumulator) {
        accumulator.accumulate(CacheKind::GraphicsPipeline, &self.stats);
        self.stats.reset();
    }
}
