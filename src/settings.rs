//! Cache Settings
//!
//! Driver-level knobs that influence how descriptors are initialised and
//! how the caches behave. Settings are read when a descriptor is built or a
//! cache is constructed; changing them afterwards does not retro-actively
//! rewrite existing keys.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use state_cache::settings::CacheSettings;
//!
//! let settings = CacheSettings {
//!     depth_clamping: true,
//!     max_pipeline_transitions: Some(16),
//!     ..Default::default()
//! };
//! ```

/// Configuration shared by the packed descriptors and the caches.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CacheSettings {
    /// Initial value of the pipeline depth-clamp flag.
    ///
    /// Mirrors whether the device supports (and the driver wants) depth
    /// clamping by default. Default: `false`.
    pub depth_clamping: bool,

    /// Force every sampler's min/mag filter to nearest.
    ///
    /// Debugging aid for isolating filtering artifacts. Default: `false`.
    pub force_nearest_filtering: bool,

    /// Force every sampler's mipmap mode to nearest. Default: `false`.
    pub force_nearest_mip_filtering: bool,

    /// Upper bound applied to a sampler's requested anisotropy.
    ///
    /// Values of `1.0` or below disable anisotropic filtering. Default: `16.0`.
    pub max_sampler_anisotropy: f32,

    /// Maximum number of memoized transitions per cached pipeline.
    ///
    /// `None` keeps every transition. When a bound is set and a pipeline's
    /// transition list is full, the oldest transition is dropped to make
    /// room. Default: `None`.
    pub max_pipeline_transitions: Option<usize>,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            depth_clamping: false,
            force_nearest_filtering: false,
            force_nearest_mip_filtering: false,
            max_sampler_anisotropy: 16.0,
            max_pipeline_transitions: None,
        }
    }
}

impl CacheSettings {
    /// Whether anisotropic filtering may be packed into samplers at all.
    #[inline]
    #[must_use]
    pub fn anisotropy_enabled(&self) -> bool {
        self.max_sampler_anisotropy > 1.0
    }
}
