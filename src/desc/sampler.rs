//! Sampler and format-conversion sampler descriptors.

use bytemuck::{Pod, Zeroable};

use super::state::{
    AddressMode, ChromaLocation, CompareOp, Filter, FormatId, MipmapMode, PackedEnum, YcbcrModelConversion,
    YcbcrRange,
};
use crate::packing::BitField;
use crate::settings::CacheSettings;

/// Max LOD used for non-mipmapped samplers: clamps sampling to the base
/// level while keeping the magnification/minification switch point.
pub const NON_MIPMAPPED_MAX_LOD: f32 = 0.25;

const MAG_FILTER: BitField = BitField::new(0, 1);
const MIN_FILTER: BitField = BitField::new(1, 1);
const MIPMAP_MODE: BitField = BitField::new(2, 1);
const ADDRESS_MODE_U: BitField = BitField::new(3, 3);
const ADDRESS_MODE_V: BitField = BitField::new(6, 3);
const ADDRESS_MODE_W: BitField = BitField::new(9, 3);
const COMPARE_ENABLED: BitField = BitField::new(12, 1);
const COMPARE_OP: BitField = BitField::new(13, 3);

// ─── SamplerState ────────────────────────────────────────────────────────────

/// Sampler parameters as set through the API, before packing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SamplerState {
    pub mag_filter: Filter,
    pub min_filter: Filter,
    /// `None` when the minification filter does not sample mipmaps.
    pub mipmap_mode: Option<MipmapMode>,
    pub address_mode_u: AddressMode,
    pub address_mode_v: AddressMode,
    pub address_mode_w: AddressMode,
    pub lod_bias: f32,
    pub min_lod: f32,
    pub max_lod: f32,
    pub max_anisotropy: f32,
    /// `Some` enables depth comparison.
    pub compare_op: Option<CompareOp>,
}

impl Default for SamplerState {
    fn default() -> Self {
        Self {
            mag_filter: Filter::Linear,
            min_filter: Filter::Nearest,
            mipmap_mode: Some(MipmapMode::Linear),
            address_mode_u: AddressMode::Repeat,
            address_mode_v: AddressMode::Repeat,
            address_mode_w: AddressMode::Repeat,
            lod_bias: 0.0,
            min_lod: -1000.0,
            max_lod: 1000.0,
            max_anisotropy: 1.0,
            compare_op: None,
        }
    }
}

// ─── SamplerDesc ─────────────────────────────────────────────────────────────

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, Pod, Zeroable)]
pub struct SamplerDesc {
    mip_lod_bias: f32,
    max_anisotropy: f32,
    min_lod: f32,
    max_lod: f32,
    /// Non-zero for samplers of externally formatted (Y′CbCr) images.
    external_format: u64,
    packed: u16,
    reserved: [u16; 3],
}

impl_packed_desc!(SamplerDesc, 32);

impl SamplerDesc {
    #[must_use]
    pub fn new(settings: &CacheSettings, state: &SamplerState, stencil_mode: bool, external_format: u64) -> Self {
        let mut desc = Self::zeroed();
        desc.update(settings, state, stencil_mode, external_format);
        desc
    }

    /// Packs `state`, applying the driver-wide overrides in `settings`.
    ///
    /// `stencil_mode` is set when sampling the stencil aspect, which never
    /// uses depth comparison.
    pub fn update(&mut self, settings: &CacheSettings, state: &SamplerState, stencil_mode: bool, external_format: u64) {
        *self = Self::zeroed();

        self.mip_lod_bias = state.lod_bias;
        self.max_anisotropy = if settings.anisotropy_enabled() {
            state.max_anisotropy.clamp(1.0, settings.max_sampler_anisotropy)
        } else {
            1.0
        };
        self.external_format = external_format;

        let (mut mag_filter, mut min_filter) = (state.mag_filter, state.min_filter);
        if settings.force_nearest_filtering {
            mag_filter = Filter::Nearest;
            min_filter = Filter::Nearest;
        }

        let mut mipmap_mode = state.mipmap_mode.unwrap_or(MipmapMode::Nearest);
        if settings.force_nearest_mip_filtering {
            mipmap_mode = MipmapMode::Nearest;
        }

        if state.mipmap_mode.is_some() {
            self.min_lod = state.min_lod;
            self.max_lod = state.max_lod;
        } else {
            self.min_lod = 0.0;
            self.max_lod = NON_MIPMAPPED_MAX_LOD;
        }

        MAG_FILTER.set(&mut self.packed, mag_filter.to_bits());
        MIN_FILTER.set(&mut self.packed, min_filter.to_bits());
        MIPMAP_MODE.set(&mut self.packed, mipmap_mode.to_bits());
        ADDRESS_MODE_U.set(&mut self.packed, state.address_mode_u.to_bits());
        ADDRESS_MODE_V.set(&mut self.packed, state.address_mode_v.to_bits());
        ADDRESS_MODE_W.set(&mut self.packed, state.address_mode_w.to_bits());

        if let Some(compare_op) = state.compare_op.filter(|_| !stencil_mode) {
            COMPARE_ENABLED.set_bool(&mut self.packed, true);
            COMPARE_OP.set(&mut self.packed, compare_op.to_bits());
        }
    }

    pub fn reset(&mut self) {
        *self = Self::zeroed();
    }

    #[must_use]
    pub fn mag_filter(&self) -> Filter {
        Filter::unpack(MAG_FILTER.get(self.packed))
    }

    #[must_use]
    pub fn min_filter(&self) -> Filter {
        Filter::unpack(MIN_FILTER.get(self.packed))
    }

    #[must_use]
    pub fn mipmap_mode(&self) -> MipmapMode {
        MipmapMode::unpack(MIPMAP_MODE.get(self.packed))
    }

    /// `[u, v, w]`.
    #[must_use]
    pub fn address_modes(&self) -> [AddressMode; 3] {
        [
            AddressMode::unpack(ADDRESS_MODE_U.get(self.packed)),
            AddressMode::unpack(ADDRESS_MODE_V.get(self.packed)),
            AddressMode::unpack(ADDRESS_MODE_W.get(self.packed)),
        ]
    }

    #[must_use]
    pub fn compare_op(&self) -> Option<CompareOp> {
        COMPARE_ENABLED
            .get_bool(self.packed)
            .then(|| CompareOp::unpack(COMPARE_OP.get(self.packed)))
    }

    #[must_use]
    pub fn mip_lod_bias(&self) -> f32 {
        self.mip_lod_bias
    }

    #[must_use]
    pub fn max_anisotropy(&self) -> f32 {
        self.max_anisotropy
    }

    /// `(min_lod, max_lod)`.
    #[must_use]
    pub fn lod_range(&self) -> (f32, f32) {
        (self.min_lod, self.max_lod)
    }

    #[must_use]
    pub fn external_format(&self) -> u64 {
        self.external_format
    }
}

// ─── YcbcrConversionDesc ─────────────────────────────────────────────────────

const CONVERSION_MODEL: BitField = BitField::new(0, 3);
const CONVERSION_RANGE: BitField = BitField::new(3, 1);
const X_CHROMA_OFFSET: BitField = BitField::new(4, 1);
const Y_CHROMA_OFFSET: BitField = BitField::new(5, 1);
const CHROMA_FILTER: BitField = BitField::new(6, 1);
const FORCE_EXPLICIT_RECONSTRUCTION: BitField = BitField::new(7, 1);

/// Parameters of a format-conversion sampler.
///
/// Either `external_format` (an opaque platform format) or `format` identifies
/// the source format.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, Pod, Zeroable)]
pub struct YcbcrConversionDesc {
    external_format: u64,
    format: u8,
    conversion: u8,
    reserved: [u8; 6],
}

impl_packed_desc!(YcbcrConversionDesc, 16);

impl YcbcrConversionDesc {
    #[must_use]
    pub fn new(external_format: u64, format: FormatId) -> Self {
        let mut desc = Self::zeroed();
        desc.external_format = external_format;
        desc.format = format.0;
        desc.set_conversion(YcbcrModelConversion::Ycbcr601, YcbcrRange::ItuNarrow);
        desc
    }

    pub fn set_conversion(&mut self, model: YcbcrModelConversion, range: YcbcrRange) {
        CONVERSION_MODEL.set(&mut self.conversion, model.to_bits());
        CONVERSION_RANGE.set(&mut self.conversion, range.to_bits());
    }

    pub fn set_chroma_offsets(&mut self, x_offset: ChromaLocation, y_offset: ChromaLocation) {
        X_CHROMA_OFFSET.set(&mut self.conversion, x_offset.to_bits());
        Y_CHROMA_OFFSET.set(&mut self.conversion, y_offset.to_bits());
    }

    pub fn set_chroma_filter(&mut self, filter: Filter) {
        CHROMA_FILTER.set(&mut self.conversion, filter.to_bits());
    }

    pub fn set_force_explicit_reconstruction(&mut self, force: bool) {
        FORCE_EXPLICIT_RECONSTRUCTION.set_bool(&mut self.conversion, force);
    }

    #[must_use]
    pub fn external_format(&self) -> u64 {
        self.external_format
    }

    #[must_use]
    pub fn format(&self) -> FormatId {
        FormatId(self.format)
    }

    #[must_use]
    pub fn model(&self) -> YcbcrModelConversion {
        YcbcrModelConversion::unpack(CONVERSION_MODEL.get(self.conversion))
    }

    #[must_use]
    pub fn range(&self) -> YcbcrRange {
        YcbcrRange::unpack(CONVERSION_RANGE.get(self.conversion))
    }

    /// `(x, y)` chroma sample locations.
    #[must_use]
    pub fn chroma_offsets(&self) -> (ChromaLocation, ChromaLocation) {
        (
            ChromaLocation::unpack(X_CHROMA_OFFSET.get(self.conversion)),
            ChromaLocation::unpack(Y_CHROMA_OFFSET.get(self.conversion)),
        )
    }

    #[must_use]
    pub fn chroma_filter(&self) -> Filter {
        Filter::unpack(CHROMA_FILTER.get(self.conversion))
    }

    #[must_use]
    pub fn force_explicit_reconstruction(&self) -> bool {
        FORCE_EXPLICIT_RECONSTRUCTION.get_bool(self.conversion)
    }
}
