//! Deduplicating caches for immutable GPU objects.
//!
//! Graphics pipelines, render passes, layouts, samplers and framebuffers are
//! expensive to create and never change once built. This crate keys each of
//! them on a compact, gap-free *packed descriptor* of its configuration and
//! hands out the cached object whenever the same configuration comes back.
//!
//! - [`desc`]: the packed descriptors and their state vocabulary.
//! - [`cache`]: the caches, their statistics and shared-object handles.
//! - [`device`]: the [`Device`] trait the caches create objects through.
//!
//! # Example
//!
//! ```rust,ignore
//! use state_cache::cache::RenderPassCache;
//! use state_cache::desc::{FormatId, RenderPassDesc};
//!
//! let mut desc = RenderPassDesc::new();
//! desc.pack_color_attachment(0, FormatId::R8G8B8A8_UNORM);
//!
//! let mut cache = RenderPassCache::new();
//! let render_pass = cache.get_compatible_render_pass(&mut device, &desc)?;
//! ```

pub mod cache;
pub mod desc;
pub mod device;
pub mod errors;
pub mod packing;
pub mod serial;
pub mod settings;

pub use cache::{
    CacheKind, CacheStats, GraphicsPipelineCache, HasCacheStats, PerCacheStats, PipelineKey, RenderPassCache,
    SharedHandle,
};
pub use desc::{GraphicsPipelineDesc, GraphicsPipelineTransitionBits, RenderPassDesc};
pub use device::Device;
pub use errors::{CacheError, Result};
pub use settings::CacheSettings;
