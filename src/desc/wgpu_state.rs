//! Translation of packed state into `wgpu` descriptors.
//!
//! The packed vocabulary is a superset of what `wgpu` can express (advanced
//! blend equations, fan/adjacency topologies, mirror-clamp addressing, ...).
//! Total mappings are `From` impls; partial ones are `TryFrom` and report
//! [`CacheError::Unsupported`].

use smallvec::SmallVec;

use super::MAX_DRAW_BUFFERS;
use super::pipeline::{GraphicsPipelineDesc, StencilFace};
use super::sampler::SamplerDesc;
use super::state::{
    AddressMode, BlendFactor, BlendOp, ColorComponentFlags, CompareOp, CullMode, Filter, FormatId, FrontFace,
    MipmapMode, PolygonMode, PrimitiveTopology, StencilOp,
};
use crate::errors::{CacheError, Result};

fn unsupported(what: impl std::fmt::Debug) -> CacheError {
    CacheError::Unsupported(format!("{what:?} has no wgpu equivalent"))
}

// ─── Enum Mappings ───────────────────────────────────────────────────────────

impl From<CompareOp> for wgpu::CompareFunction {
    fn from(op: CompareOp) -> Self {
        match op {
            CompareOp::Never => Self::Never,
            CompareOp::Less => Self::Less,
            CompareOp::Equal => Self::Equal,
            CompareOp::LessOrEqual => Self::LessEqual,
            CompareOp::Greater => Self::Greater,
            CompareOp::NotEqual => Self::NotEqual,
            CompareOp::GreaterOrEqual => Self::GreaterEqual,
            CompareOp::Always => Self::Always,
        }
    }
}

impl From<StencilOp> for wgpu::StencilOperation {
    fn from(op: StencilOp) -> Self {
        match op {
            StencilOp::Keep => Self::Keep,
            StencilOp::Zero => Self::Zero,
            StencilOp::Replace => Self::Replace,
            StencilOp::IncrementAndClamp => Self::IncrementClamp,
            StencilOp::DecrementAndClamp => Self::DecrementClamp,
            StencilOp::Invert => Self::Invert,
            StencilOp::IncrementAndWrap => Self::IncrementWrap,
            StencilOp::DecrementAndWrap => Self::DecrementWrap,
        }
    }
}

impl TryFrom<BlendFactor> for wgpu::BlendFactor {
    type Error = CacheError;

    fn try_from(factor: BlendFactor) -> Result<Self> {
        Ok(match factor {
            BlendFactor::Zero => Self::Zero,
            BlendFactor::One => Self::One,
            BlendFactor::SrcColor => Self::Src,
            BlendFactor::OneMinusSrcColor => Self::OneMinusSrc,
            BlendFactor::DstColor => Self::Dst,
            BlendFactor::OneMinusDstColor => Self::OneMinusDst,
            BlendFactor::SrcAlpha => Self::SrcAlpha,
            BlendFactor::OneMinusSrcAlpha => Self::OneMinusSrcAlpha,
            BlendFactor::DstAlpha => Self::DstAlpha,
            BlendFactor::OneMinusDstAlpha => Self::OneMinusDstAlpha,
            BlendFactor::ConstantColor => Self::Constant,
            BlendFactor::OneMinusConstantColor => Self::OneMinusConstant,
            BlendFactor::SrcAlphaSaturate => Self::SrcAlphaSaturated,
            BlendFactor::Src1Color => Self::Src1,
            BlendFactor::OneMinusSrc1Color => Self::OneMinusSrc1,
            BlendFactor::Src1Alpha => Self::Src1Alpha,
            BlendFactor::OneMinusSrc1Alpha => Self::OneMinusSrc1Alpha,
            BlendFactor::ConstantAlpha | BlendFactor::OneMinusConstantAlpha => {
                return Err(unsupported(factor));
            }
        })
    }
}

impl TryFrom<BlendOp> for wgpu::BlendOperation {
    type Error = CacheError;

    fn try_from(op: BlendOp) -> Result<Self> {
        match op {
            BlendOp::Add => Ok(Self::Add),
            BlendOp::Subtract => Ok(Self::Subtract),
            BlendOp::ReverseSubtract => Ok(Self::ReverseSubtract),
            BlendOp::Min => Ok(Self::Min),
            BlendOp::Max => Ok(Self::Max),
            advanced => Err(unsupported(advanced)),
        }
    }
}

impl TryFrom<AddressMode> for wgpu::AddressMode {
    type Error = CacheError;

    fn try_from(mode: AddressMode) -> Result<Self> {
        match mode {
            AddressMode::Repeat => Ok(Self::Repeat),
            AddressMode::MirroredRepeat => Ok(Self::MirrorRepeat),
            AddressMode::ClampToEdge => Ok(Self::ClampToEdge),
            AddressMode::ClampToBorder => Ok(Self::ClampToBorder),
            AddressMode::MirrorClampToEdge => Err(unsupported(mode)),
        }
    }
}

impl From<Filter> for wgpu::FilterMode {
    fn from(filter: Filter) -> Self {
        match filter {
            Filter::Nearest => Self::Nearest,
            Filter::Linear => Self::Linear,
        }
    }
}

impl From<MipmapMode> for wgpu::MipmapFilterMode {
    fn from(mode: MipmapMode) -> Self {
        match mode {
            MipmapMode::Nearest => Self::Nearest,
            MipmapMode::Linear => Self::Linear,
        }
    }
}

impl From<FrontFace> for wgpu::FrontFace {
    fn from(face: FrontFace) -> Self {
        match face {
            FrontFace::CounterClockwise => Self::Ccw,
            FrontFace::Clockwise => Self::Cw,
        }
    }
}

impl From<PolygonMode> for wgpu::PolygonMode {
    fn from(mode: PolygonMode) -> Self {
        match mode {
            PolygonMode::Fill => Self::Fill,
            PolygonMode::Line => Self::Line,
            PolygonMode::Point => Self::Point,
        }
    }
}

impl TryFrom<PrimitiveTopology> for wgpu::PrimitiveTopology {
    type Error = CacheError;

    fn try_from(topology: PrimitiveTopology) -> Result<Self> {
        match topology {
            PrimitiveTopology::PointList => Ok(Self::PointList),
            PrimitiveTopology::LineList => Ok(Self::LineList),
            PrimitiveTopology::LineStrip => Ok(Self::LineStrip),
            PrimitiveTopology::TriangleList => Ok(Self::TriangleList),
            PrimitiveTopology::TriangleStrip => Ok(Self::TriangleStrip),
            other => Err(unsupported(other)),
        }
    }
}

impl From<ColorComponentFlags> for wgpu::ColorWrites {
    fn from(flags: ColorComponentFlags) -> Self {
        let mut writes = Self::empty();
        writes.set(Self::RED, flags.contains(ColorComponentFlags::R));
        writes.set(Self::GREEN, flags.contains(ColorComponentFlags::G));
        writes.set(Self::BLUE, flags.contains(ColorComponentFlags::B));
        writes.set(Self::ALPHA, flags.contains(ColorComponentFlags::A));
        writes
    }
}

/// Face culled by `mode`. Culling both faces is not expressible.
pub fn cull_face(mode: CullMode) -> Result<Option<wgpu::Face>> {
    match mode {
        CullMode::None => Ok(None),
        CullMode::Front => Ok(Some(wgpu::Face::Front)),
        CullMode::Back => Ok(Some(wgpu::Face::Back)),
        CullMode::FrontAndBack => Err(unsupported(mode)),
    }
}

impl TryFrom<FormatId> for wgpu::TextureFormat {
    type Error = CacheError;

    fn try_from(format: FormatId) -> Result<Self> {
        Ok(match format {
            FormatId::D16_UNORM => Self::Depth16Unorm,
            FormatId::X8_D24_UNORM => Self::Depth24Plus,
            FormatId::D32_FLOAT => Self::Depth32Float,
            FormatId::S8_UINT => Self::Stencil8,
            FormatId::D24_UNORM_S8_UINT => Self::Depth24PlusStencil8,
            FormatId::D32_FLOAT_S8_UINT => Self::Depth32FloatStencil8,
            FormatId::R8_UNORM => Self::R8Unorm,
            FormatId::R8G8_UNORM => Self::Rg8Unorm,
            FormatId::R8G8B8A8_UNORM => Self::Rgba8Unorm,
            FormatId::R8G8B8A8_UNORM_SRGB => Self::Rgba8UnormSrgb,
            FormatId::B8G8R8A8_UNORM => Self::Bgra8Unorm,
            FormatId::B8G8R8A8_UNORM_SRGB => Self::Bgra8UnormSrgb,
            FormatId::R10G10B10A2_UNORM => Self::Rgb10a2Unorm,
            FormatId::R11G11B10_FLOAT => Self::Rg11b10Ufloat,
            FormatId::R16G16B16A16_FLOAT => Self::Rgba16Float,
            FormatId::R32_UINT => Self::R32Uint,
            FormatId::R32_FLOAT => Self::R32Float,
            FormatId::R32G32_FLOAT => Self::Rg32Float,
            FormatId::R32G32B32A32_FLOAT => Self::Rgba32Float,
            FormatId::R16G16_FLOAT => Self::Rg16Float,
            FormatId::R8G8B8A8_UINT => Self::Rgba8Uint,
            FormatId::R32G32B32A32_UINT => Self::Rgba32Uint,
            other => return Err(unsupported(other)),
        })
    }
}

impl TryFrom<FormatId> for wgpu::VertexFormat {
    type Error = CacheError;

    fn try_from(format: FormatId) -> Result<Self> {
        Ok(match format {
            FormatId::R8G8_UNORM => Self::Unorm8x2,
            FormatId::R8G8B8A8_UNORM => Self::Unorm8x4,
            FormatId::R8G8B8A8_UINT => Self::Uint8x4,
            FormatId::R16G16_FLOAT => Self::Float16x2,
            FormatId::R16G16B16A16_FLOAT => Self::Float16x4,
            FormatId::R32_UINT => Self::Uint32,
            FormatId::R32_FLOAT => Self::Float32,
            FormatId::R32G32_FLOAT => Self::Float32x2,
            FormatId::R32G32B32_FLOAT => Self::Float32x3,
            FormatId::R32G32B32A32_FLOAT => Self::Float32x4,
            FormatId::R32G32B32A32_UINT => Self::Uint32x4,
            other => return Err(unsupported(other)),
        })
    }
}

// ─── Pipeline State ──────────────────────────────────────────────────────────

fn stencil_face_state(face: &StencilFace) -> wgpu::StencilFaceState {
    wgpu::StencilFaceState {
        compare: face.compare_op.into(),
        fail_op: face.fail_op.into(),
        depth_fail_op: face.depth_fail_op.into(),
        pass_op: face.pass_op.into(),
    }
}

impl GraphicsPipelineDesc {
    pub fn primitive_state(&self) -> Result<wgpu::PrimitiveState> {
        Ok(wgpu::PrimitiveState {
            topology: self.topology().try_into()?,
            front_face: self.front_face().into(),
            cull_mode: cull_face(self.cull_mode())?,
            unclipped_depth: self.depth_clamp_enabled(),
            polygon_mode: self.polygon_mode().into(),
            ..Default::default()
        })
    }

    /// `None` when the render pass has no depth/stencil attachment.
    pub fn depth_stencil_state(&self) -> Result<Option<wgpu::DepthStencilState>> {
        let render_pass = self.render_pass_desc();
        if !render_pass.has_depth_stencil_attachment() {
            return Ok(None);
        }
        let format = render_pass.format(render_pass.depth_stencil_attachment_index()).try_into()?;

        let depth_test = self.depth_test_enabled();
        let depth_compare = if depth_test {
            self.depth_compare_op().into()
        } else {
            wgpu::CompareFunction::Always
        };

        let stencil = if self.stencil_test_enabled() {
            let (front, back) = (self.stencil_front(), self.stencil_back());
            wgpu::StencilState {
                front: stencil_face_state(&front),
                back: stencil_face_state(&back),
                read_mask: u32::from(front.compare_mask),
                write_mask: u32::from(front.write_mask),
            }
        } else {
            wgpu::StencilState::default()
        };

        let bias = if self.polygon_offset_fill_enabled() {
            let (slope_scale, constant, clamp) = self.polygon_offset();
            wgpu::DepthBiasState {
                constant: constant as i32,
                slope_scale,
                clamp,
            }
        } else {
            wgpu::DepthBiasState::default()
        };

        Ok(Some(wgpu::DepthStencilState {
            format,
            depth_write_enabled: Some(depth_test && self.depth_write_enabled()),
            depth_compare: Some(depth_compare),
            stencil,
            bias,
        }))
    }

    #[must_use]
    pub fn multisample_state(&self) -> wgpu::MultisampleState {
        let mask = u64::from(self.sample_mask(0)) | (u64::from(self.sample_mask(1)) << 32);
        wgpu::MultisampleState {
            count: self.rasterization_samples(),
            mask,
            alpha_to_coverage_enabled: self.alpha_to_coverage_enabled(),
        }
    }

    /// One entry per color index in the render pass range; gaps are `None`.
    pub fn color_target_states(&self) -> Result<SmallVec<[Option<wgpu::ColorTargetState>; MAX_DRAW_BUFFERS]>> {
        let render_pass = self.render_pass_desc();
        (0..render_pass.color_attachment_range())
            .map(|color_index| {
                if !render_pass.is_color_attachment_enabled(color_index) {
                    return Ok(None);
                }
                let blend = if self.is_blend_enabled(color_index) {
                    let funcs = self.blend_funcs(color_index);
                    let (color_op, alpha_op) = self.blend_equations(color_index);
                    Some(wgpu::BlendState {
                        color: wgpu::BlendComponent {
                            src_factor: funcs.src_color.try_into()?,
                            dst_factor: funcs.dst_color.try_into()?,
                            operation: color_op.try_into()?,
                        },
                        alpha: wgpu::BlendComponent {
                            src_factor: funcs.src_alpha.try_into()?,
                            dst_factor: funcs.dst_alpha.try_into()?,
                            operation: alpha_op.try_into()?,
                        },
                    })
                } else {
                    None
                };
                Ok(Some(wgpu::ColorTargetState {
                    format: render_pass.format(color_index).try_into()?,
                    blend,
                    write_mask: self.color_write_mask(color_index).into(),
                }))
            })
            .collect()
    }
}

// ─── Sampler ─────────────────────────────────────────────────────────────────

impl SamplerDesc {
    pub fn to_wgpu_descriptor<'a>(&self, label: Option<&'a str>) -> Result<wgpu::SamplerDescriptor<'a>> {
        let [u, v, w] = self.address_modes();
        let address_modes: [wgpu::AddressMode; 3] = [u.try_into()?, v.try_into()?, w.try_into()?];
        let border_color = address_modes
            .contains(&wgpu::AddressMode::ClampToBorder)
            .then_some(wgpu::SamplerBorderColor::TransparentBlack);
        let (min_lod, max_lod) = self.lod_range();

        Ok(wgpu::SamplerDescriptor {
            label,
            address_mode_u: address_modes[0],
            address_mode_v: address_modes[1],
            address_mode_w: address_modes[2],
            mag_filter: self.mag_filter().into(),
            min_filter: self.min_filter().into(),
            mipmap_filter: self.mipmap_mode().into(),
            lod_min_clamp: min_lod.max(0.0),
            lod_max_clamp: max_lod.max(0.0),
            compare: self.compare_op().map(Into::into),
            anisotropy_clamp: self.max_anisotropy().clamp(1.0, f32::from(u16::MAX)) as u16,
            border_color,
        })
    }
}
