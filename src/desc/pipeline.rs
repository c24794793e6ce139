//! Graphics pipeline descriptor and transition bits.
//!
//! [`GraphicsPipelineDesc`] is one monolithic, gap-free blob of every piece
//! of fixed-function state baked into a pipeline. Its byte image is treated
//! as a sequence of 4-byte words; every `update_*` mutator records which words
//! it touched in a [`GraphicsPipelineTransitionBits`] mask. The pipeline cache
//! uses that mask to find a previously observed neighbour of a pipeline by
//! comparing only the dirty words.
//!
//! ```text
//!  word:    0 ........ 23 | 24 .. 26 | 27 ... 34 | 35 .. 39 | 40 ...... 53 | 54 .. 59 | 60 61 | 62
//!           vertex input  | rp desc  | raster/MS | depth/st | IA + blend   | viewport | sciss | extent
//! ```
//!
//! `set_*` variants change state without recording a transition; they are
//! meant for building a descriptor from scratch.

use std::mem::{offset_of, size_of};
use std::ops::{BitOr, BitOrAssign};

use bytemuck::{Pod, Zeroable};
use glam::Vec4;

use super::render_pass::RenderPassDesc;
use super::state::{
    BlendFactor, BlendOp, ColorComponentFlags, CompareOp, CullMode, FormatId, FrontFace, LogicOp,
    PackedEnum, PolygonMode, PrimitiveTopology, StencilOp, SurfaceRotation,
};
use super::{MAX_DRAW_BUFFERS, MAX_SAMPLE_MASK_WORDS, MAX_VERTEX_ATTRIBS};
use crate::packing::{BitField, narrow};
use crate::settings::CacheSettings;

// ─── Vertex Input ────────────────────────────────────────────────────────────

const ATTRIB_OFFSET: BitField = BitField::new(0, 15);
const ATTRIB_COMPRESSED: BitField = BitField::new(15, 1);

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, Pod, Zeroable)]
pub struct PackedAttribDesc {
    format: u8,
    divisor: u8,
    offset_and_compressed: u16,
    stride: u16,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, Pod, Zeroable)]
pub struct PackedVertexInputAttributes {
    attribs: [PackedAttribDesc; MAX_VERTEX_ATTRIBS],
}

/// Unpacked view of one vertex attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexAttrib {
    pub format: FormatId,
    pub divisor: u32,
    pub relative_offset: u32,
    pub compressed: bool,
    pub stride: u32,
}

// ─── Rasterization & Multisample ─────────────────────────────────────────────

const SUBPASS: BitField = BitField::new(0, 6);
const DEPTH_CLAMP_ENABLE: BitField = BitField::new(6, 1);
const RASTERIZER_DISCARD_ENABLE: BitField = BitField::new(7, 1);
const POLYGON_MODE: BitField = BitField::new(8, 4);
const CULL_MODE: BitField = BitField::new(12, 4);
const FRONT_FACE: BitField = BitField::new(16, 4);
const DEPTH_BIAS_ENABLE: BitField = BitField::new(20, 1);
const SAMPLE_SHADING_ENABLE: BitField = BitField::new(21, 1);
const ALPHA_TO_COVERAGE_ENABLE: BitField = BitField::new(22, 1);
const ALPHA_TO_ONE_ENABLE: BitField = BitField::new(23, 1);
const RASTERIZATION_SAMPLES: BitField = BitField::new(24, 8);

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, Pod, Zeroable)]
pub struct PackedRasterizationAndMultisampleStateInfo {
    bits: u32,
    min_sample_shading: f32,
    sample_mask: [u32; MAX_SAMPLE_MASK_WORDS],
    depth_bias_clamp: f32,
    depth_bias_constant_factor: f32,
    depth_bias_slope_factor: f32,
    line_width: f32,
}

// ─── Depth / Stencil ─────────────────────────────────────────────────────────

const DEPTH_TEST_ENABLE: BitField = BitField::new(0, 1);
const DEPTH_WRITE_ENABLE: BitField = BitField::new(1, 1);
const DEPTH_BOUNDS_TEST_ENABLE: BitField = BitField::new(2, 1);
const STENCIL_TEST_ENABLE: BitField = BitField::new(3, 1);

const DEPTH_COMPARE_OP: BitField = BitField::new(0, 4);
const SURFACE_ROTATION: BitField = BitField::new(4, 3);

const STENCIL_FAIL_OP: BitField = BitField::new(0, 4);
const STENCIL_PASS_OP: BitField = BitField::new(4, 4);
const STENCIL_DEPTH_FAIL_OP: BitField = BitField::new(8, 4);
const STENCIL_COMPARE_OP: BitField = BitField::new(12, 4);

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, Pod, Zeroable)]
pub struct PackedStencilOpState {
    ops: u16,
    compare_mask: u8,
    write_mask: u8,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, Pod, Zeroable)]
pub struct PackedDepthStencilStateInfo {
    enable: u8,
    front_stencil_reference: u8,
    back_stencil_reference: u8,
    depth_compare_and_surface_rotation: u8,
    min_depth_bounds: f32,
    max_depth_bounds: f32,
    front: PackedStencilOpState,
    back: PackedStencilOpState,
}

/// Unpacked stencil state of one face.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StencilFace {
    pub fail_op: StencilOp,
    pub pass_op: StencilOp,
    pub depth_fail_op: StencilOp,
    pub compare_op: CompareOp,
    pub compare_mask: u8,
    pub write_mask: u8,
    pub reference: u8,
}

// ─── Input Assembly & Color Blend ────────────────────────────────────────────

const SRC_COLOR_BLEND_FACTOR: BitField = BitField::new(0, 5);
const DST_COLOR_BLEND_FACTOR: BitField = BitField::new(5, 5);
const COLOR_BLEND_OP: BitField = BitField::new(10, 6);
const SRC_ALPHA_BLEND_FACTOR: BitField = BitField::new(16, 5);
const DST_ALPHA_BLEND_FACTOR: BitField = BitField::new(21, 5);
const ALPHA_BLEND_OP: BitField = BitField::new(26, 6);

const LOGIC_OP_ENABLE: BitField = BitField::new(0, 1);
const LOGIC_OP: BitField = BitField::new(1, 7);

const TOPOLOGY: BitField = BitField::new(0, 9);
const PATCH_VERTICES: BitField = BitField::new(9, 6);
const PRIMITIVE_RESTART_ENABLE: BitField = BitField::new(15, 1);

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, Pod, Zeroable)]
pub struct PackedInputAssemblyAndColorBlendStateInfo {
    /// One nibble per draw buffer.
    color_write_mask_bits: [u8; MAX_DRAW_BUFFERS / 2],
    attachments: [u32; MAX_DRAW_BUFFERS],
    blend_constants: [f32; 4],
    logic: u8,
    blend_enable_mask: u8,
    primitive: u16,
}

/// Blend factors of one draw buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlendFuncs {
    pub src_color: BlendFactor,
    pub dst_color: BlendFactor,
    pub src_alpha: BlendFactor,
    pub dst_alpha: BlendFactor,
}

// ─── Viewport / Scissor / Extent ─────────────────────────────────────────────

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct Viewport {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub min_depth: f32,
    pub max_depth: f32,
}

/// `x` value reserved to mark the scissor as dynamic state.
pub const DYNAMIC_SCISSOR_SENTINEL: u16 = u16::MAX;

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, Pod, Zeroable)]
pub struct PackedScissor {
    x: u16,
    y: u16,
    width: u16,
    height: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ScissorRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, Pod, Zeroable)]
pub struct PackedExtent {
    width: u16,
    height: u16,
}

// ─── GraphicsPipelineDesc ────────────────────────────────────────────────────

/// Every piece of state baked into a graphics pipeline.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, Pod, Zeroable)]
pub struct GraphicsPipelineDesc {
    vertex_input: PackedVertexInputAttributes,
    render_pass: RenderPassDesc,
    rasterization_multisample: PackedRasterizationAndMultisampleStateInfo,
    depth_stencil: PackedDepthStencilStateInfo,
    input_assembly_and_blend: PackedInputAssemblyAndColorBlendStateInfo,
    viewport: Viewport,
    scissor: PackedScissor,
    drawable_size: PackedExtent,
}

impl_packed_desc!(GraphicsPipelineDesc, 252);

/// Size of one transition word in bytes.
pub const TRANSITION_WORD_SIZE: usize = size_of::<u32>();
/// Number of transition words covering [`GraphicsPipelineDesc`].
pub const GRAPHICS_PIPELINE_DESC_WORDS: usize = size_of::<GraphicsPipelineDesc>() / TRANSITION_WORD_SIZE;

const _: () = assert!(size_of::<GraphicsPipelineDesc>() % TRANSITION_WORD_SIZE == 0);
const _: () = assert!(GRAPHICS_PIPELINE_DESC_WORDS <= u64::BITS as usize);

type Raster = PackedRasterizationAndMultisampleStateInfo;
type DepthStencil = PackedDepthStencilStateInfo;
type Blend = PackedInputAssemblyAndColorBlendStateInfo;

const VERTEX_INPUT: usize = offset_of!(GraphicsPipelineDesc, vertex_input);
const RENDER_PASS: usize = offset_of!(GraphicsPipelineDesc, render_pass);
const RASTER: usize = offset_of!(GraphicsPipelineDesc, rasterization_multisample);
const DEPTH_STENCIL: usize = offset_of!(GraphicsPipelineDesc, depth_stencil);
const BLEND: usize = offset_of!(GraphicsPipelineDesc, input_assembly_and_blend);
const VIEWPORT: usize = offset_of!(GraphicsPipelineDesc, viewport);
const SCISSOR: usize = offset_of!(GraphicsPipelineDesc, scissor);
const DRAWABLE_SIZE: usize = offset_of!(GraphicsPipelineDesc, drawable_size);

const RASTER_BITS: usize = RASTER + offset_of!(Raster, bits);
const DEPTH_STENCIL_ENABLE: usize = DEPTH_STENCIL + offset_of!(DepthStencil, enable);
const STENCIL_FRONT: usize = DEPTH_STENCIL + offset_of!(DepthStencil, front);
const STENCIL_BACK: usize = DEPTH_STENCIL + offset_of!(DepthStencil, back);
const PRIMITIVE: usize = BLEND + offset_of!(Blend, primitive);

// ─── Transition Bits ─────────────────────────────────────────────────────────

/// One bit per 4-byte word of [`GraphicsPipelineDesc`] that changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct GraphicsPipelineTransitionBits(u64);

impl GraphicsPipelineTransitionBits {
    #[inline]
    #[must_use]
    pub const fn empty() -> Self {
        Self(0)
    }

    #[inline]
    #[must_use]
    pub const fn from_bits(bits: u64) -> Self {
        Self(bits)
    }

    #[inline]
    #[must_use]
    pub const fn bits(self) -> u64 {
        self.0
    }

    #[inline]
    pub fn set_word(&mut self, word: usize) {
        assert!(word < GRAPHICS_PIPELINE_DESC_WORDS, "transition word {word} out of range");
        self.0 |= 1 << word;
    }

    /// Marks every word overlapping `byte_len` bytes starting at `byte_offset`.
    pub fn set_range(&mut self, byte_offset: usize, byte_len: usize) {
        debug_assert!(byte_len > 0);
        let first = byte_offset / TRANSITION_WORD_SIZE;
        let last = (byte_offset + byte_len - 1) / TRANSITION_WORD_SIZE;
        for word in first..=last {
            self.set_word(word);
        }
    }

    #[inline]
    #[must_use]
    pub fn is_set(self, word: usize) -> bool {
        word < u64::BITS as usize && self.0 & (1 << word) != 0
    }

    #[inline]
    #[must_use]
    pub fn any(self) -> bool {
        self.0 != 0
    }

    #[inline]
    #[must_use]
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    #[inline]
    #[must_use]
    pub fn count(self) -> u32 {
        self.0.count_ones()
    }

    #[inline]
    pub fn reset(&mut self) {
        self.0 = 0;
    }

    /// Iterates the indices of the set words.
    pub fn words(self) -> impl Iterator<Item = usize> {
        let mut remaining = self.0;
        std::iter::from_fn(move || {
            if remaining == 0 {
                return None;
            }
            let word = remaining.trailing_zeros() as usize;
            remaining &= remaining - 1;
            Some(word)
        })
    }
}

impl BitOr for GraphicsPipelineTransitionBits {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for GraphicsPipelineTransitionBits {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

/// Whether two transitions lead to the same pipeline.
///
/// The masks must be identical, and the descriptors must agree on every word
/// the mask marks dirty. Words outside the mask are not compared.
#[must_use]
pub fn graphics_pipeline_transition_match(
    bits_a: GraphicsPipelineTransitionBits,
    bits_b: GraphicsPipelineTransitionBits,
    desc_a: &GraphicsPipelineDesc,
    desc_b: &GraphicsPipelineDesc,
) -> bool {
    if bits_a != bits_b {
        return false;
    }
    let words_a = desc_a.words();
    let words_b = desc_b.words();
    bits_a.words().all(|word| words_a[word] == words_b[word])
}

// ─── Mutators ────────────────────────────────────────────────────────────────

impl GraphicsPipelineDesc {
    /// The descriptor viewed as transition words.
    #[inline]
    #[must_use]
    pub fn words(&self) -> &[u32; GRAPHICS_PIPELINE_DESC_WORDS] {
        bytemuck::cast_ref(self)
    }

    /// Default pipeline state: no blending, depth writes on, test off.
    pub fn init_defaults(&mut self, settings: &CacheSettings) {
        *self = Self::zeroed();

        for attrib in &mut self.vertex_input.attribs {
            attrib.format = FormatId::R32G32B32A32_FLOAT.0;
        }

        self.render_pass = RenderPassDesc::new();

        let raster = &mut self.rasterization_multisample;
        DEPTH_CLAMP_ENABLE.set_bool(&mut raster.bits, settings.depth_clamping);
        POLYGON_MODE.set(&mut raster.bits, PolygonMode::Fill.to_bits());
        CULL_MODE.set(&mut raster.bits, CullMode::None.to_bits());
        FRONT_FACE.set(&mut raster.bits, FrontFace::CounterClockwise.to_bits());
        RASTERIZATION_SAMPLES.set(&mut raster.bits, 1);
        raster.min_sample_shading = 1.0;
        raster.sample_mask = [u32::MAX; MAX_SAMPLE_MASK_WORDS];
        raster.line_width = 1.0;

        let depth_stencil = &mut self.depth_stencil;
        DEPTH_WRITE_ENABLE.set_bool(&mut depth_stencil.enable, true);
        DEPTH_COMPARE_OP.set(&mut depth_stencil.depth_compare_and_surface_rotation, CompareOp::Less.to_bits());
        SURFACE_ROTATION.set(
            &mut depth_stencil.depth_compare_and_surface_rotation,
            SurfaceRotation::Identity.to_bits(),
        );
        depth_stencil.max_depth_bounds = 1.0;
        for face in [&mut depth_stencil.front, &mut depth_stencil.back] {
            STENCIL_FAIL_OP.set(&mut face.ops, StencilOp::Keep.to_bits());
            STENCIL_PASS_OP.set(&mut face.ops, StencilOp::Keep.to_bits());
            STENCIL_DEPTH_FAIL_OP.set(&mut face.ops, StencilOp::Keep.to_bits());
            STENCIL_COMPARE_OP.set(&mut face.ops, CompareOp::Always.to_bits());
            face.compare_mask = 0xFF;
            face.write_mask = 0xFF;
        }

        let blend = &mut self.input_assembly_and_blend;
        blend.color_write_mask_bits = [0xFF; MAX_DRAW_BUFFERS / 2];
        for attachment in &mut blend.attachments {
            SRC_COLOR_BLEND_FACTOR.set(attachment, BlendFactor::One.to_bits());
            DST_COLOR_BLEND_FACTOR.set(attachment, BlendFactor::Zero.to_bits());
            COLOR_BLEND_OP.set(attachment, BlendOp::Add.to_bits());
            SRC_ALPHA_BLEND_FACTOR.set(attachment, BlendFactor::One.to_bits());
            DST_ALPHA_BLEND_FACTOR.set(attachment, BlendFactor::Zero.to_bits());
            ALPHA_BLEND_OP.set(attachment, BlendOp::Add.to_bits());
        }
        LOGIC_OP.set(&mut blend.logic, LogicOp::Copy.to_bits());
        TOPOLOGY.set(&mut blend.primitive, PrimitiveTopology::TriangleList.to_bits());
        PATCH_VERTICES.set(&mut blend.primitive, 3);

        self.viewport.max_depth = 1.0;
    }

    #[must_use]
    pub fn with_defaults(settings: &CacheSettings) -> Self {
        let mut desc = Self::zeroed();
        desc.init_defaults(settings);
        desc
    }

    // ── Vertex Input ─────────────────────────────────────────────────────────

    pub fn update_vertex_input(
        &mut self,
        transition: &mut GraphicsPipelineTransitionBits,
        attrib_index: usize,
        attrib: VertexAttrib,
    ) {
        assert!(attrib_index < MAX_VERTEX_ATTRIBS, "vertex attribute {attrib_index} out of range");
        let packed = &mut self.vertex_input.attribs[attrib_index];
        packed.format = attrib.format.0;
        packed.divisor = narrow(attrib.divisor);
        ATTRIB_OFFSET.set(&mut packed.offset_and_compressed, attrib.relative_offset);
        ATTRIB_COMPRESSED.set_bool(&mut packed.offset_and_compressed, attrib.compressed);
        packed.stride = narrow(attrib.stride);

        let size = size_of::<PackedAttribDesc>();
        transition.set_range(VERTEX_INPUT + attrib_index * size, size);
    }

    #[must_use]
    pub fn vertex_attrib(&self, attrib_index: usize) -> VertexAttrib {
        let packed = &self.vertex_input.attribs[attrib_index];
        VertexAttrib {
            format: FormatId(packed.format),
            divisor: u32::from(packed.divisor),
            relative_offset: ATTRIB_OFFSET.get(packed.offset_and_compressed),
            compressed: ATTRIB_COMPRESSED.get_bool(packed.offset_and_compressed),
            stride: u32::from(packed.stride),
        }
    }

    // ── Input Assembly ───────────────────────────────────────────────────────

    pub fn set_topology(&mut self, topology: PrimitiveTopology) {
        TOPOLOGY.set(&mut self.input_assembly_and_blend.primitive, topology.to_bits());
    }

    pub fn update_topology(&mut self, transition: &mut GraphicsPipelineTransitionBits, topology: PrimitiveTopology) {
        self.set_topology(topology);
        transition.set_range(PRIMITIVE, size_of::<u16>());
    }

    pub fn update_primitive_restart_enabled(&mut self, transition: &mut GraphicsPipelineTransitionBits, enabled: bool) {
        PRIMITIVE_RESTART_ENABLE.set_bool(&mut self.input_assembly_and_blend.primitive, enabled);
        transition.set_range(PRIMITIVE, size_of::<u16>());
    }

    pub fn update_patch_vertices(&mut self, transition: &mut GraphicsPipelineTransitionBits, patch_vertices: u32) {
        PATCH_VERTICES.set(&mut self.input_assembly_and_blend.primitive, patch_vertices);
        transition.set_range(PRIMITIVE, size_of::<u16>());
    }

    #[must_use]
    pub fn topology(&self) -> PrimitiveTopology {
        PrimitiveTopology::unpack(TOPOLOGY.get(self.input_assembly_and_blend.primitive))
    }

    #[must_use]
    pub fn primitive_restart_enabled(&self) -> bool {
        PRIMITIVE_RESTART_ENABLE.get_bool(self.input_assembly_and_blend.primitive)
    }

    #[must_use]
    pub fn patch_vertices(&self) -> u32 {
        PATCH_VERTICES.get(self.input_assembly_and_blend.primitive)
    }

    // ── Rasterization ────────────────────────────────────────────────────────

    pub fn set_cull_mode(&mut self, cull_mode: CullMode) {
        CULL_MODE.set(&mut self.rasterization_multisample.bits, cull_mode.to_bits());
    }

    pub fn update_cull_mode(&mut self, transition: &mut GraphicsPipelineTransitionBits, cull_mode: CullMode) {
        self.set_cull_mode(cull_mode);
        transition.set_range(RASTER_BITS, size_of::<u32>());
    }

    pub fn update_front_face(&mut self, transition: &mut GraphicsPipelineTransitionBits, front_face: FrontFace) {
        FRONT_FACE.set(&mut self.rasterization_multisample.bits, front_face.to_bits());
        transition.set_range(RASTER_BITS, size_of::<u32>());
    }

    pub fn update_polygon_mode(&mut self, transition: &mut GraphicsPipelineTransitionBits, polygon_mode: PolygonMode) {
        POLYGON_MODE.set(&mut self.rasterization_multisample.bits, polygon_mode.to_bits());
        transition.set_range(RASTER_BITS, size_of::<u32>());
    }

    pub fn update_line_width(&mut self, transition: &mut GraphicsPipelineTransitionBits, line_width: f32) {
        self.rasterization_multisample.line_width = line_width;
        transition.set_range(RASTER + offset_of!(Raster, line_width), size_of::<f32>());
    }

    pub fn update_rasterizer_discard_enabled(&mut self, transition: &mut GraphicsPipelineTransitionBits, enabled: bool) {
        RASTERIZER_DISCARD_ENABLE.set_bool(&mut self.rasterization_multisample.bits, enabled);
        transition.set_range(RASTER_BITS, size_of::<u32>());
    }

    pub fn set_depth_clamp_enabled(&mut self, enabled: bool) {
        DEPTH_CLAMP_ENABLE.set_bool(&mut self.rasterization_multisample.bits, enabled);
    }

    pub fn update_polygon_offset_fill_enabled(&mut self, transition: &mut GraphicsPipelineTransitionBits, enabled: bool) {
        DEPTH_BIAS_ENABLE.set_bool(&mut self.rasterization_multisample.bits, enabled);
        transition.set_range(RASTER_BITS, size_of::<u32>());
    }

    pub fn update_polygon_offset(
        &mut self,
        transition: &mut GraphicsPipelineTransitionBits,
        slope_factor: f32,
        constant_factor: f32,
        clamp: f32,
    ) {
        let raster = &mut self.rasterization_multisample;
        raster.depth_bias_slope_factor = slope_factor;
        raster.depth_bias_constant_factor = constant_factor;
        raster.depth_bias_clamp = clamp;
        transition.set_range(RASTER + offset_of!(Raster, depth_bias_clamp), 3 * size_of::<f32>());
    }

    #[must_use]
    pub fn cull_mode(&self) -> CullMode {
        CullMode::unpack(CULL_MODE.get(self.rasterization_multisample.bits))
    }

    #[must_use]
    pub fn front_face(&self) -> FrontFace {
        FrontFace::unpack(FRONT_FACE.get(self.rasterization_multisample.bits))
    }

    #[must_use]
    pub fn polygon_mode(&self) -> PolygonMode {
        PolygonMode::unpack(POLYGON_MODE.get(self.rasterization_multisample.bits))
    }

    #[must_use]
    pub fn line_width(&self) -> f32 {
        self.rasterization_multisample.line_width
    }

    #[must_use]
    pub fn rasterizer_discard_enabled(&self) -> bool {
        RASTERIZER_DISCARD_ENABLE.get_bool(self.rasterization_multisample.bits)
    }

    #[must_use]
    pub fn depth_clamp_enabled(&self) -> bool {
        DEPTH_CLAMP_ENABLE.get_bool(self.rasterization_multisample.bits)
    }

    #[must_use]
    pub fn polygon_offset_fill_enabled(&self) -> bool {
        DEPTH_BIAS_ENABLE.get_bool(self.rasterization_multisample.bits)
    }

    /// `(slope_factor, constant_factor, clamp)`.
    #[must_use]
    pub fn polygon_offset(&self) -> (f32, f32, f32) {
        let raster = &self.rasterization_multisample;
        (
            raster.depth_bias_slope_factor,
            raster.depth_bias_constant_factor,
            raster.depth_bias_clamp,
        )
    }

    // ── Multisample ──────────────────────────────────────────────────────────

    pub fn set_rasterization_samples(&mut self, samples: u32) {
        RASTERIZATION_SAMPLES.set(&mut self.rasterization_multisample.bits, samples);
    }

    pub fn update_rasterization_samples(&mut self, transition: &mut GraphicsPipelineTransitionBits, samples: u32) {
        self.set_rasterization_samples(samples);
        transition.set_range(RASTER_BITS, size_of::<u32>());
    }

    pub fn update_alpha_to_coverage_enable(&mut self, transition: &mut GraphicsPipelineTransitionBits, enabled: bool) {
        ALPHA_TO_COVERAGE_ENABLE.set_bool(&mut self.rasterization_multisample.bits, enabled);
        transition.set_range(RASTER_BITS, size_of::<u32>());
    }

    pub fn update_alpha_to_one_enable(&mut self, transition: &mut GraphicsPipelineTransitionBits, enabled: bool) {
        ALPHA_TO_ONE_ENABLE.set_bool(&mut self.rasterization_multisample.bits, enabled);
        transition.set_range(RASTER_BITS, size_of::<u32>());
    }

    pub fn update_sample_mask(&mut self, transition: &mut GraphicsPipelineTransitionBits, mask_index: usize, mask: u32) {
        assert!(mask_index < MAX_SAMPLE_MASK_WORDS, "sample mask word {mask_index} out of range");
        self.rasterization_multisample.sample_mask[mask_index] = mask;
        transition.set_range(
            RASTER + offset_of!(Raster, sample_mask) + mask_index * size_of::<u32>(),
            size_of::<u32>(),
        );
    }

    pub fn update_sample_shading(&mut self, transition: &mut GraphicsPipelineTransitionBits, enabled: bool, min_sample_shading: f32) {
        SAMPLE_SHADING_ENABLE.set_bool(&mut self.rasterization_multisample.bits, enabled);
        self.rasterization_multisample.min_sample_shading = if enabled { min_sample_shading } else { 1.0 };
        transition.set_range(RASTER_BITS, size_of::<u32>());
        transition.set_range(RASTER + offset_of!(Raster, min_sample_shading), size_of::<f32>());
    }

    #[must_use]
    pub fn rasterization_samples(&self) -> u32 {
        RASTERIZATION_SAMPLES.get(self.rasterization_multisample.bits)
    }

    #[must_use]
    pub fn alpha_to_coverage_enabled(&self) -> bool {
        ALPHA_TO_COVERAGE_ENABLE.get_bool(self.rasterization_multisample.bits)
    }

    #[must_use]
    pub fn alpha_to_one_enabled(&self) -> bool {
        ALPHA_TO_ONE_ENABLE.get_bool(self.rasterization_multisample.bits)
    }

    #[must_use]
    pub fn sample_mask(&self, mask_index: usize) -> u32 {
        self.rasterization_multisample.sample_mask[mask_index]
    }

    /// `Some(min_sample_shading)` when sample shading is enabled.
    #[must_use]
    pub fn sample_shading(&self) -> Option<f32> {
        SAMPLE_SHADING_ENABLE
            .get_bool(self.rasterization_multisample.bits)
            .then_some(self.rasterization_multisample.min_sample_shading)
    }

    // ── Render Pass ──────────────────────────────────────────────────────────

    pub fn set_render_pass_desc(&mut self, render_pass: &RenderPassDesc) {
        self.render_pass = *render_pass;
    }

    pub fn update_render_pass_desc(&mut self, transition: &mut GraphicsPipelineTransitionBits, render_pass: &RenderPassDesc) {
        self.set_render_pass_desc(render_pass);
        transition.set_range(RENDER_PASS, size_of::<RenderPassDesc>());
    }

    #[inline]
    #[must_use]
    pub fn render_pass_desc(&self) -> &RenderPassDesc {
        &self.render_pass
    }

    // ── Subpass ──────────────────────────────────────────────────────────────

    pub fn set_subpass(&mut self, subpass: u32) {
        SUBPASS.set(&mut self.rasterization_multisample.bits, subpass);
    }

    pub fn reset_subpass(&mut self, transition: &mut GraphicsPipelineTransitionBits) {
        if self.subpass() != 0 {
            self.set_subpass(0);
            transition.set_range(RASTER_BITS, size_of::<u32>());
        }
    }

    pub fn next_subpass(&mut self, transition: &mut GraphicsPipelineTransitionBits) {
        self.set_subpass(self.subpass() + 1);
        transition.set_range(RASTER_BITS, size_of::<u32>());
    }

    #[must_use]
    pub fn subpass(&self) -> u32 {
        SUBPASS.get(self.rasterization_multisample.bits)
    }

    // ── Blend ────────────────────────────────────────────────────────────────

    pub fn update_blend_enabled(&mut self, transition: &mut GraphicsPipelineTransitionBits, enabled_mask: u8) {
        self.input_assembly_and_blend.blend_enable_mask = enabled_mask;
        transition.set_range(BLEND + offset_of!(Blend, blend_enable_mask), size_of::<u8>());
    }

    pub fn update_blend_color(&mut self, transition: &mut GraphicsPipelineTransitionBits, color: Vec4) {
        self.input_assembly_and_blend.blend_constants = color.to_array();
        transition.set_range(BLEND + offset_of!(Blend, blend_constants), 4 * size_of::<f32>());
    }

    /// Sets the blend factors of every draw buffer in `draw_buffers`.
    pub fn update_blend_funcs(&mut self, transition: &mut GraphicsPipelineTransitionBits, draw_buffers: u8, funcs: BlendFuncs) {
        for index in mask_indices(draw_buffers) {
            let attachment = &mut self.input_assembly_and_blend.attachments[index];
            SRC_COLOR_BLEND_FACTOR.set(attachment, funcs.src_color.to_bits());
            DST_COLOR_BLEND_FACTOR.set(attachment, funcs.dst_color.to_bits());
            SRC_ALPHA_BLEND_FACTOR.set(attachment, funcs.src_alpha.to_bits());
            DST_ALPHA_BLEND_FACTOR.set(attachment, funcs.dst_alpha.to_bits());
            transition.set_range(Self::blend_attachment_offset(index), size_of::<u32>());
        }
    }

    /// Sets the blend equations of every draw buffer in `draw_buffers`.
    pub fn update_blend_equations(
        &mut self,
        transition: &mut GraphicsPipelineTransitionBits,
        draw_buffers: u8,
        color_op: BlendOp,
        alpha_op: BlendOp,
    ) {
        for index in mask_indices(draw_buffers) {
            let attachment = &mut self.input_assembly_and_blend.attachments[index];
            COLOR_BLEND_OP.set(attachment, color_op.to_bits());
            ALPHA_BLEND_OP.set(attachment, alpha_op.to_bits());
            transition.set_range(Self::blend_attachment_offset(index), size_of::<u32>());
        }
    }

    fn blend_attachment_offset(index: usize) -> usize {
        BLEND + offset_of!(Blend, attachments) + index * size_of::<u32>()
    }

    pub fn set_color_write_mask(&mut self, draw_buffer: usize, mask: ColorComponentFlags) {
        assert!(draw_buffer < MAX_DRAW_BUFFERS, "draw buffer {draw_buffer} out of range");
        let field = BitField::new(narrow((draw_buffer % 2) * 4), 4);
        field.set(
            &mut self.input_assembly_and_blend.color_write_mask_bits[draw_buffer / 2],
            u32::from(mask.bits()),
        );
    }

    pub fn update_color_write_mask(
        &mut self,
        transition: &mut GraphicsPipelineTransitionBits,
        draw_buffer: usize,
        mask: ColorComponentFlags,
    ) {
        self.set_color_write_mask(draw_buffer, mask);
        transition.set_range(
            BLEND + offset_of!(Blend, color_write_mask_bits) + draw_buffer / 2,
            size_of::<u8>(),
        );
    }

    pub fn update_logic_op(&mut self, transition: &mut GraphicsPipelineTransitionBits, enabled: bool, op: LogicOp) {
        let logic = &mut self.input_assembly_and_blend.logic;
        LOGIC_OP_ENABLE.set_bool(logic, enabled);
        LOGIC_OP.set(logic, op.to_bits());
        transition.set_range(BLEND + offset_of!(Blend, logic), size_of::<u8>());
    }

    #[must_use]
    pub fn blend_enable_mask(&self) -> u8 {
        self.input_assembly_and_blend.blend_enable_mask
    }

    #[must_use]
    pub fn is_blend_enabled(&self, draw_buffer: usize) -> bool {
        self.input_assembly_and_blend.blend_enable_mask & (1 << draw_buffer) != 0
    }

    #[must_use]
    pub fn blend_color(&self) -> Vec4 {
        Vec4::from_array(self.input_assembly_and_blend.blend_constants)
    }

    #[must_use]
    pub fn blend_funcs(&self, draw_buffer: usize) -> BlendFuncs {
        let attachment = self.input_assembly_and_blend.attachments[draw_buffer];
        BlendFuncs {
            src_color: BlendFactor::unpack(SRC_COLOR_BLEND_FACTOR.get(attachment)),
            dst_color: BlendFactor::unpack(DST_COLOR_BLEND_FACTOR.get(attachment)),
            src_alpha: BlendFactor::unpack(SRC_ALPHA_BLEND_FACTOR.get(attachment)),
            dst_alpha: BlendFactor::unpack(DST_ALPHA_BLEND_FACTOR.get(attachment)),
        }
    }

    /// `(color_op, alpha_op)`.
    #[must_use]
    pub fn blend_equations(&self, draw_buffer: usize) -> (BlendOp, BlendOp) {
        let attachment = self.input_assembly_and_blend.attachments[draw_buffer];
        (
            BlendOp::unpack(COLOR_BLEND_OP.get(attachment)),
            BlendOp::unpack(ALPHA_BLEND_OP.get(attachment)),
        )
    }

    #[must_use]
    pub fn color_write_mask(&self, draw_buffer: usize) -> ColorComponentFlags {
        let field = BitField::new(narrow((draw_buffer % 2) * 4), 4);
        let bits = field.get(self.input_assembly_and_blend.color_write_mask_bits[draw_buffer / 2]);
        ColorComponentFlags::from_bits_truncate(narrow(bits))
    }

    /// The logic op, when enabled.
    #[must_use]
    pub fn logic_op(&self) -> Option<LogicOp> {
        let logic = self.input_assembly_and_blend.logic;
        LOGIC_OP_ENABLE
            .get_bool(logic)
            .then(|| LogicOp::unpack(LOGIC_OP.get(logic)))
    }

    // ── Depth / Stencil ──────────────────────────────────────────────────────

    pub fn update_depth_test_enabled(&mut self, transition: &mut GraphicsPipelineTransitionBits, enabled: bool) {
        DEPTH_TEST_ENABLE.set_bool(&mut self.depth_stencil.enable, enabled);
        transition.set_range(DEPTH_STENCIL_ENABLE, size_of::<u8>());
    }

    pub fn update_depth_write_enabled(&mut self, transition: &mut GraphicsPipelineTransitionBits, enabled: bool) {
        DEPTH_WRITE_ENABLE.set_bool(&mut self.depth_stencil.enable, enabled);
        transition.set_range(DEPTH_STENCIL_ENABLE, size_of::<u8>());
    }

    pub fn update_depth_bounds_test_enabled(&mut self, transition: &mut GraphicsPipelineTransitionBits, enabled: bool) {
        DEPTH_BOUNDS_TEST_ENABLE.set_bool(&mut self.depth_stencil.enable, enabled);
        transition.set_range(DEPTH_STENCIL_ENABLE, size_of::<u8>());
    }

    pub fn update_depth_func(&mut self, transition: &mut GraphicsPipelineTransitionBits, compare_op: CompareOp) {
        DEPTH_COMPARE_OP.set(&mut self.depth_stencil.depth_compare_and_surface_rotation, compare_op.to_bits());
        transition.set_range(
            DEPTH_STENCIL + offset_of!(DepthStencil, depth_compare_and_surface_rotation),
            size_of::<u8>(),
        );
    }

    pub fn update_stencil_test_enabled(&mut self, transition: &mut GraphicsPipelineTransitionBits, enabled: bool) {
        STENCIL_TEST_ENABLE.set_bool(&mut self.depth_stencil.enable, enabled);
        transition.set_range(DEPTH_STENCIL_ENABLE, size_of::<u8>());
    }

    pub fn update_stencil_front_funcs(
        &mut self,
        transition: &mut GraphicsPipelineTransitionBits,
        reference: u8,
        compare_op: CompareOp,
        compare_mask: u8,
    ) {
        self.depth_stencil.front_stencil_reference = reference;
        Self::set_stencil_funcs(&mut self.depth_stencil.front, compare_op, compare_mask);
        transition.set_range(
            DEPTH_STENCIL + offset_of!(DepthStencil, front_stencil_reference),
            size_of::<u8>(),
        );
        transition.set_range(STENCIL_FRONT, size_of::<PackedStencilOpState>());
    }

    pub fn update_stencil_back_funcs(
        &mut self,
        transition: &mut GraphicsPipelineTransitionBits,
        reference: u8,
        compare_op: CompareOp,
        compare_mask: u8,
    ) {
        self.depth_stencil.back_stencil_reference = reference;
        Self::set_stencil_funcs(&mut self.depth_stencil.back, compare_op, compare_mask);
        transition.set_range(
            DEPTH_STENCIL + offset_of!(DepthStencil, back_stencil_reference),
            size_of::<u8>(),
        );
        transition.set_range(STENCIL_BACK, size_of::<PackedStencilOpState>());
    }

    fn set_stencil_funcs(face: &mut PackedStencilOpState, compare_op: CompareOp, compare_mask: u8) {
        STENCIL_COMPARE_OP.set(&mut face.ops, compare_op.to_bits());
        face.compare_mask = compare_mask;
    }

    pub fn update_stencil_front_ops(
        &mut self,
        transition: &mut GraphicsPipelineTransitionBits,
        fail_op: StencilOp,
        pass_op: StencilOp,
        depth_fail_op: StencilOp,
    ) {
        Self::set_stencil_ops(&mut self.depth_stencil.front, fail_op, pass_op, depth_fail_op);
        transition.set_range(STENCIL_FRONT + offset_of!(PackedStencilOpState, ops), size_of::<u16>());
    }

    pub fn update_stencil_back_ops(
        &mut self,
        transition: &mut GraphicsPipelineTransitionBits,
        fail_op: StencilOp,
        pass_op: StencilOp,
        depth_fail_op: StencilOp,
    ) {
        Self::set_stencil_ops(&mut self.depth_stencil.back, fail_op, pass_op, depth_fail_op);
        transition.set_range(STENCIL_BACK + offset_of!(PackedStencilOpState, ops), size_of::<u16>());
    }

    fn set_stencil_ops(face: &mut PackedStencilOpState, fail_op: StencilOp, pass_op: StencilOp, depth_fail_op: StencilOp) {
        STENCIL_FAIL_OP.set(&mut face.ops, fail_op.to_bits());
        STENCIL_PASS_OP.set(&mut face.ops, pass_op.to_bits());
        STENCIL_DEPTH_FAIL_OP.set(&mut face.ops, depth_fail_op.to_bits());
    }

    pub fn update_stencil_front_write_mask(&mut self, transition: &mut GraphicsPipelineTransitionBits, write_mask: u8) {
        self.depth_stencil.front.write_mask = write_mask;
        transition.set_range(STENCIL_FRONT + offset_of!(PackedStencilOpState, write_mask), size_of::<u8>());
    }

    pub fn update_stencil_back_write_mask(&mut self, transition: &mut GraphicsPipelineTransitionBits, write_mask: u8) {
        self.depth_stencil.back.write_mask = write_mask;
        transition.set_range(STENCIL_BACK + offset_of!(PackedStencilOpState, write_mask), size_of::<u8>());
    }

    pub fn update_depth_bounds(&mut self, transition: &mut GraphicsPipelineTransitionBits, min_depth_bounds: f32, max_depth_bounds: f32) {
        self.depth_stencil.min_depth_bounds = min_depth_bounds;
        self.depth_stencil.max_depth_bounds = max_depth_bounds;
        transition.set_range(
            DEPTH_STENCIL + offset_of!(DepthStencil, min_depth_bounds),
            2 * size_of::<f32>(),
        );
    }

    #[must_use]
    pub fn depth_test_enabled(&self) -> bool {
        DEPTH_TEST_ENABLE.get_bool(self.depth_stencil.enable)
    }

    #[must_use]
    pub fn depth_write_enabled(&self) -> bool {
        DEPTH_WRITE_ENABLE.get_bool(self.depth_stencil.enable)
    }

    #[must_use]
    pub fn depth_bounds_test_enabled(&self) -> bool {
        DEPTH_BOUNDS_TEST_ENABLE.get_bool(self.depth_stencil.enable)
    }

    #[must_use]
    pub fn depth_compare_op(&self) -> CompareOp {
        CompareOp::unpack(DEPTH_COMPARE_OP.get(self.depth_stencil.depth_compare_and_surface_rotation))
    }

    #[must_use]
    pub fn stencil_test_enabled(&self) -> bool {
        STENCIL_TEST_ENABLE.get_bool(self.depth_stencil.enable)
    }

    #[must_use]
    pub fn stencil_front(&self) -> StencilFace {
        Self::unpack_stencil_face(&self.depth_stencil.front, self.depth_stencil.front_stencil_reference)
    }

    #[must_use]
    pub fn stencil_back(&self) -> StencilFace {
        Self::unpack_stencil_face(&self.depth_stencil.back, self.depth_stencil.back_stencil_reference)
    }

    fn unpack_stencil_face(face: &PackedStencilOpState, reference: u8) -> StencilFace {
        StencilFace {
            fail_op: StencilOp::unpack(STENCIL_FAIL_OP.get(face.ops)),
            pass_op: StencilOp::unpack(STENCIL_PASS_OP.get(face.ops)),
            depth_fail_op: StencilOp::unpack(STENCIL_DEPTH_FAIL_OP.get(face.ops)),
            compare_op: CompareOp::unpack(STENCIL_COMPARE_OP.get(face.ops)),
            compare_mask: face.compare_mask,
            write_mask: face.write_mask,
            reference,
        }
    }

    /// `(min, max)` depth bounds.
    #[must_use]
    pub fn depth_bounds(&self) -> (f32, f32) {
        (self.depth_stencil.min_depth_bounds, self.depth_stencil.max_depth_bounds)
    }

    // ── Surface Rotation ─────────────────────────────────────────────────────

    pub fn update_surface_rotation(&mut self, transition: &mut GraphicsPipelineTransitionBits, rotation: SurfaceRotation) {
        SURFACE_ROTATION.set(&mut self.depth_stencil.depth_compare_and_surface_rotation, rotation.to_bits());
        transition.set_range(
            DEPTH_STENCIL + offset_of!(DepthStencil, depth_compare_and_surface_rotation),
            size_of::<u8>(),
        );
    }

    #[must_use]
    pub fn surface_rotation(&self) -> SurfaceRotation {
        SurfaceRotation::unpack(SURFACE_ROTATION.get(self.depth_stencil.depth_compare_and_surface_rotation))
    }

    // ── Viewport / Scissor ───────────────────────────────────────────────────

    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }

    pub fn update_viewport(&mut self, transition: &mut GraphicsPipelineTransitionBits, viewport: Viewport) {
        self.set_viewport(viewport);
        transition.set_range(VIEWPORT, size_of::<Viewport>());
    }

    pub fn update_depth_range(&mut self, transition: &mut GraphicsPipelineTransitionBits, near: f32, far: f32) {
        self.viewport.min_depth = near;
        self.viewport.max_depth = far;
        transition.set_range(VIEWPORT + offset_of!(Viewport, min_depth), 2 * size_of::<f32>());
    }

    #[inline]
    #[must_use]
    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    /// Marks the scissor as dynamic state. All dynamic-scissor descriptors
    /// compare equal regardless of the rectangle used at draw time.
    pub fn set_dynamic_scissor(&mut self) {
        self.scissor = PackedScissor {
            x: DYNAMIC_SCISSOR_SENTINEL,
            y: 0,
            width: 0,
            height: 0,
        };
    }

    pub fn update_dynamic_scissor(&mut self, transition: &mut GraphicsPipelineTransitionBits) {
        self.set_dynamic_scissor();
        transition.set_range(SCISSOR, size_of::<PackedScissor>());
    }

    /// # Panics
    ///
    /// Panics if a component does not fit 16 bits or `x` collides with the
    /// dynamic-scissor sentinel.
    pub fn set_scissor(&mut self, rect: ScissorRect) {
        let x: u16 = narrow(rect.x);
        assert!(x != DYNAMIC_SCISSOR_SENTINEL, "scissor x {x} is reserved for dynamic scissor");
        self.scissor = PackedScissor {
            x,
            y: narrow(rect.y),
            width: narrow(rect.width),
            height: narrow(rect.height),
        };
    }

    pub fn update_scissor(&mut self, transition: &mut GraphicsPipelineTransitionBits, rect: ScissorRect) {
        self.set_scissor(rect);
        transition.set_range(SCISSOR, size_of::<PackedScissor>());
    }

    #[must_use]
    pub fn is_scissor_dynamic(&self) -> bool {
        self.scissor.x == DYNAMIC_SCISSOR_SENTINEL
    }

    /// The baked scissor, or `None` when it is dynamic state.
    #[must_use]
    pub fn scissor(&self) -> Option<ScissorRect> {
        (!self.is_scissor_dynamic()).then(|| ScissorRect {
            x: u32::from(self.scissor.x),
            y: u32::from(self.scissor.y),
            width: u32::from(self.scissor.width),
            height: u32::from(self.scissor.height),
        })
    }

    // ── Drawable Size ────────────────────────────────────────────────────────

    pub fn update_drawable_size(&mut self, transition: &mut GraphicsPipelineTransitionBits, width: u32, height: u32) {
        self.drawable_size = PackedExtent {
            width: narrow(width),
            height: narrow(height),
        };
        transition.set_range(DRAWABLE_SIZE, size_of::<PackedExtent>());
    }

    /// `(width, height)`.
    #[must_use]
    pub fn drawable_size(&self) -> (u32, u32) {
        (u32::from(self.drawable_size.width), u32::from(self.drawable_size.height))
    }
}

fn mask_indices(mask: u8) -> impl Iterator<Item = usize> {
    (0..MAX_DRAW_BUFFERS).filter(move |&i| mask & (1 << i) != 0)
}
