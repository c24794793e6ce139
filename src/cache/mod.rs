//! Object Caches
//!
//! Each cache maps a packed descriptor to the GPU object it describes and
//! asks a [`Device`](crate::device::Device) to create the object on a miss.
//! They differ in how long objects live:
//!
//! | Cache                           | Lifetime                                  |
//! |---------------------------------|-------------------------------------------|
//! | [`RenderPassCache`]             | until `destroy`                           |
//! | [`GraphicsPipelineCache`]       | until `release` / `destroy`               |
//! | [`FramebufferCache`]            | until `destroy`                           |
//! | [`DescriptorSetLayoutCache`]    | reference counted                         |
//! | [`PipelineLayoutCache`]         | reference counted, holds its set layouts  |
//! | [`SamplerCache`]                | reference counted                         |
//! | [`SamplerYcbcrConversionCache`] | reference counted                         |
//! | [`DescriptorSetCache`]          | caller-managed pool, `clear` before drop  |
//!
//! Every cache counts hits and misses and implements [`HasCacheStats`].

pub mod descriptor_set;
pub mod framebuffer;
pub mod layout;
pub mod pipeline;
pub mod render_pass;
pub mod sampler;
pub mod shared;
pub mod stats;

pub use descriptor_set::{
    DescriptorSetCache, DescriptorSetKey, DriverUniformsDescriptorSetCache, ShaderBuffersDescriptorSetCache,
    TextureDescriptorSetCache, UniformsAndXfbDescriptorSetCache,
};
pub use framebuffer::FramebufferCache;
pub use layout::{
    DescriptorSetLayoutCache, DescriptorSetLayoutHandle, PipelineLayoutCache, PipelineLayoutHandle,
    PipelineLayoutHelper,
};
pub use pipeline::{GraphicsPipelineCache, GraphicsPipelineTransition, PipelineHelper, PipelineKey};
pub use render_pass::{RenderPassCache, RenderPassHelper, RenderPassPerfCounters};
pub use sampler::{
    SamplerCache, SamplerHandle, SamplerHelper, SamplerYcbcrConversionCache, YcbcrConversionHandle,
};
pub use shared::{RefCountedCache, SharedHandle, SharedKey};
pub use stats::{CacheKind, CacheStats, CacheStatsAccumulator, HasCacheStats, PerCacheStats};
