//! Packed state vocabulary.
//!
//! Enumerations stored inside descriptor bit fields. Each enum has explicit
//! discriminants that are the packed encoding; [`PackedEnum::unpack`] is the
//! inverse. Decoding a value that no setter could have written is a contract
//! violation and panics.

use bitflags::bitflags;

/// Conversion between an enum and its packed bit encoding.
pub trait PackedEnum: Copy + Sized {
    /// Number of bits the largest discriminant needs.
    const BITS: u32;

    fn to_bits(self) -> u32;

    fn from_bits(bits: u32) -> Option<Self>;

    /// # Panics
    ///
    /// Panics if `bits` is not a valid encoding.
    #[inline]
    #[must_use]
    fn unpack(bits: u32) -> Self {
        Self::from_bits(bits).unwrap_or_else(|| {
            panic!(
                "invalid packed {} value {bits}",
                std::any::type_name::<Self>()
            )
        })
    }
}

macro_rules! packed_enum {
    (
        $(#[$meta:meta])*
        $name:ident : $bits:literal {
            $($(#[$vmeta:meta])* $variant:ident = $value:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[repr(u8)]
        pub enum $name {
            $($(#[$vmeta])* $variant = $value),+
        }

        impl PackedEnum for $name {
            const BITS: u32 = $bits;

            #[inline]
            fn to_bits(self) -> u32 {
                self as u32
            }

            #[inline]
            fn from_bits(bits: u32) -> Option<Self> {
                match bits {
                    $($value => Some(Self::$variant),)+
                    _ => None,
                }
            }
        }
    };
}

// ─── Depth / Stencil ─────────────────────────────────────────────────────────

packed_enum! {
    CompareOp: 3 {
        Never = 0,
        Less = 1,
        Equal = 2,
        LessOrEqual = 3,
        Greater = 4,
        NotEqual = 5,
        GreaterOrEqual = 6,
        Always = 7,
    }
}

packed_enum! {
    StencilOp: 3 {
        Keep = 0,
        Zero = 1,
        Replace = 2,
        IncrementAndClamp = 3,
        DecrementAndClamp = 4,
        Invert = 5,
        IncrementAndWrap = 6,
        DecrementAndWrap = 7,
    }
}

// ─── Rasterization ───────────────────────────────────────────────────────────

packed_enum! {
    CullMode: 2 {
        None = 0,
        Front = 1,
        Back = 2,
        FrontAndBack = 3,
    }
}

packed_enum! {
    FrontFace: 1 {
        CounterClockwise = 0,
        Clockwise = 1,
    }
}

packed_enum! {
    PolygonMode: 2 {
        Fill = 0,
        Line = 1,
        Point = 2,
    }
}

packed_enum! {
    PrimitiveTopology: 4 {
        PointList = 0,
        LineList = 1,
        LineStrip = 2,
        TriangleList = 3,
        TriangleStrip = 4,
        TriangleFan = 5,
        LineListWithAdjacency = 6,
        LineStripWithAdjacency = 7,
        TriangleListWithAdjacency = 8,
        TriangleStripWithAdjacency = 9,
        PatchList = 10,
    }
}

packed_enum! {
    /// Pre-rotation applied to the surface (mobile display orientation).
    SurfaceRotation: 3 {
        Identity = 0,
        Rotated90Degrees = 1,
        Rotated180Degrees = 2,
        Rotated270Degrees = 3,
        FlippedIdentity = 4,
        FlippedRotated90Degrees = 5,
        FlippedRotated180Degrees = 6,
        FlippedRotated270Degrees = 7,
    }
}

// ─── Blending ────────────────────────────────────────────────────────────────

packed_enum! {
    BlendFactor: 5 {
        Zero = 0,
        One = 1,
        SrcColor = 2,
        OneMinusSrcColor = 3,
        DstColor = 4,
        OneMinusDstColor = 5,
        SrcAlpha = 6,
        OneMinusSrcAlpha = 7,
        DstAlpha = 8,
        OneMinusDstAlpha = 9,
        ConstantColor = 10,
        OneMinusConstantColor = 11,
        ConstantAlpha = 12,
        OneMinusConstantAlpha = 13,
        SrcAlphaSaturate = 14,
        Src1Color = 15,
        OneMinusSrc1Color = 16,
        Src1Alpha = 17,
        OneMinusSrc1Alpha = 18,
    }
}

packed_enum! {
    /// Blend equation, including the advanced (KHR_blend_equation_advanced) modes.
    BlendOp: 5 {
        Add = 0,
        Subtract = 1,
        ReverseSubtract = 2,
        Min = 3,
        Max = 4,
        Multiply = 5,
        Screen = 6,
        Overlay = 7,
        Darken = 8,
        Lighten = 9,
        ColorDodge = 10,
        ColorBurn = 11,
        HardLight = 12,
        SoftLight = 13,
        Difference = 14,
        Exclusion = 15,
        HslHue = 16,
        HslSaturation = 17,
        HslColor = 18,
        HslLuminosity = 19,
    }
}

impl BlendOp {
    #[inline]
    #[must_use]
    pub fn is_advanced(self) -> bool {
        (self as u8) >= (Self::Multiply as u8)
    }
}

packed_enum! {
    LogicOp: 4 {
        Clear = 0,
        And = 1,
        AndReverse = 2,
        Copy = 3,
        AndInverted = 4,
        NoOp = 5,
        Xor = 6,
        Or = 7,
        Nor = 8,
        Equivalent = 9,
        Invert = 10,
        OrReverse = 11,
        CopyInverted = 12,
        OrInverted = 13,
        Nand = 14,
        Set = 15,
    }
}

bitflags! {
    /// Per-channel color write mask, one nibble per draw buffer.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ColorComponentFlags: u8 {
        const R = 1 << 0;
        const G = 1 << 1;
        const B = 1 << 2;
        const A = 1 << 3;
    }
}

// ─── Render Pass ─────────────────────────────────────────────────────────────

packed_enum! {
    LoadOp: 2 {
        Load = 0,
        Clear = 1,
        DontCare = 2,
        /// Contents are neither loaded nor cleared and the attachment is not accessed.
        None = 3,
    }
}

packed_enum! {
    StoreOp: 2 {
        Store = 0,
        DontCare = 1,
        /// Contents are left untouched.
        None = 2,
    }
}

packed_enum! {
    /// Image layouts an attachment can start or end a render pass in.
    ImageLayout: 4 {
        Undefined = 0,
        General = 1,
        ColorAttachment = 2,
        DepthStencilAttachment = 3,
        DepthStencilReadOnly = 4,
        DepthReadOnlyStencilAttachment = 5,
        DepthAttachmentStencilReadOnly = 6,
        ShaderReadOnly = 7,
        TransferSrc = 8,
        TransferDst = 9,
        Present = 10,
        SharedPresent = 11,
        ColorAttachmentAndFragmentShaderRead = 12,
        DepthStencilAttachmentAndFragmentShaderRead = 13,
    }
}

packed_enum! {
    SrgbWriteControlMode: 1 {
        Default = 0,
        Linear = 1,
    }
}

// ─── Sampling ────────────────────────────────────────────────────────────────

packed_enum! {
    Filter: 1 {
        Nearest = 0,
        Linear = 1,
    }
}

packed_enum! {
    MipmapMode: 1 {
        Nearest = 0,
        Linear = 1,
    }
}

packed_enum! {
    AddressMode: 3 {
        Repeat = 0,
        MirroredRepeat = 1,
        ClampToEdge = 2,
        ClampToBorder = 3,
        MirrorClampToEdge = 4,
    }
}

packed_enum! {
    /// Color model of a format-conversion (Y′CbCr) sampler.
    YcbcrModelConversion: 3 {
        RgbIdentity = 0,
        YcbcrIdentity = 1,
        Ycbcr709 = 2,
        Ycbcr601 = 3,
        Ycbcr2020 = 4,
    }
}

packed_enum! {
    YcbcrRange: 1 {
        ItuFull = 0,
        ItuNarrow = 1,
    }
}

packed_enum! {
    ChromaLocation: 1 {
        CositedEven = 0,
        Midpoint = 1,
    }
}

// ─── Descriptor Sets ─────────────────────────────────────────────────────────

packed_enum! {
    DescriptorType: 4 {
        Sampler = 0,
        CombinedImageSampler = 1,
        SampledImage = 2,
        StorageImage = 3,
        UniformTexelBuffer = 4,
        StorageTexelBuffer = 5,
        UniformBuffer = 6,
        StorageBuffer = 7,
        UniformBufferDynamic = 8,
        StorageBufferDynamic = 9,
        InputAttachment = 10,
    }
}

packed_enum! {
    ShaderType: 3 {
        Vertex = 0,
        TessControl = 1,
        TessEvaluation = 2,
        Geometry = 3,
        Fragment = 4,
        Compute = 5,
    }
}

impl ShaderType {
    pub const COUNT: usize = 6;

    pub const ALL: [Self; Self::COUNT] = [
        Self::Vertex,
        Self::TessControl,
        Self::TessEvaluation,
        Self::Geometry,
        Self::Fragment,
        Self::Compute,
    ];

    #[inline]
    #[must_use]
    pub fn index(self) -> usize {
        self as usize
    }

    #[inline]
    #[must_use]
    pub fn stage_flag(self) -> ShaderStageFlags {
        ShaderStageFlags::from_bits_truncate(1 << (self as u8))
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ShaderStageFlags: u8 {
        const VERTEX = 1 << 0;
        const TESS_CONTROL = 1 << 1;
        const TESS_EVALUATION = 1 << 2;
        const GEOMETRY = 1 << 3;
        const FRAGMENT = 1 << 4;
        const COMPUTE = 1 << 5;
        const ALL_GRAPHICS = Self::VERTEX.bits()
            | Self::TESS_CONTROL.bits()
            | Self::TESS_EVALUATION.bits()
            | Self::GEOMETRY.bits()
            | Self::FRAGMENT.bits();
    }
}

// ─── Formats ─────────────────────────────────────────────────────────────────

/// Compact format identifier stored in render-pass and vertex-input descriptors.
///
/// Depth/stencil formats occupy `1..=6` so they fit the 3-bit slot the
/// render-pass descriptor shares with its flag bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct FormatId(pub u8);

impl FormatId {
    pub const NONE: Self = Self(0);

    pub const D16_UNORM: Self = Self(1);
    pub const X8_D24_UNORM: Self = Self(2);
    pub const D32_FLOAT: Self = Self(3);
    pub const S8_UINT: Self = Self(4);
    pub const D24_UNORM_S8_UINT: Self = Self(5);
    pub const D32_FLOAT_S8_UINT: Self = Self(6);

    pub const R8_UNORM: Self = Self(8);
    pub const R8G8_UNORM: Self = Self(9);
    pub const R8G8B8A8_UNORM: Self = Self(10);
    pub const R8G8B8A8_UNORM_SRGB: Self = Self(11);
    pub const B8G8R8A8_UNORM: Self = Self(12);
    pub const B8G8R8A8_UNORM_SRGB: Self = Self(13);
    pub const R10G10B10A2_UNORM: Self = Self(14);
    pub const R11G11B10_FLOAT: Self = Self(15);
    pub const R16G16B16A16_FLOAT: Self = Self(16);
    pub const R32_UINT: Self = Self(17);
    pub const R32_FLOAT: Self = Self(18);
    pub const R32G32_FLOAT: Self = Self(19);
    pub const R32G32B32_FLOAT: Self = Self(20);
    pub const R32G32B32A32_FLOAT: Self = Self(21);
    pub const R16G16_FLOAT: Self = Self(22);
    pub const R8G8B8A8_UINT: Self = Self(23);
    pub const R32G32B32A32_UINT: Self = Self(24);

    /// Largest depth/stencil id, the mask of the render-pass depth/stencil slot.
    pub const DEPTH_STENCIL_MASK: u8 = 0x7;

    #[inline]
    #[must_use]
    pub fn is_none(self) -> bool {
        self == Self::NONE
    }

    #[inline]
    #[must_use]
    pub fn is_depth_or_stencil(self) -> bool {
        (Self::D16_UNORM.0..=Self::D32_FLOAT_S8_UINT.0).contains(&self.0)
    }

    #[must_use]
    pub fn has_depth(self) -> bool {
        matches!(
            self,
            Self::D16_UNORM
                | Self::X8_D24_UNORM
                | Self::D32_FLOAT
                | Self::D24_UNORM_S8_UINT
                | Self::D32_FLOAT_S8_UINT
        )
    }

    #[must_use]
    pub fn has_stencil(self) -> bool {
        matches!(
            self,
            Self::S8_UINT | Self::D24_UNORM_S8_UINT | Self::D32_FLOAT_S8_UINT
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unpack_round_trips() {
        for op in [CompareOp::Never, CompareOp::Less, CompareOp::Always] {
            assert_eq!(CompareOp::unpack(op.to_bits()), op);
        }
        assert_eq!(BlendOp::unpack(19), BlendOp::HslLuminosity);
    }

    #[test]
    fn test_from_bits_rejects_unknown_values() {
        assert_eq!(CullMode::from_bits(4), None);
        assert_eq!(AddressMode::from_bits(5), None);
    }

    #[test]
    #[should_panic(expected = "invalid packed")]
    fn test_unpack_invalid_panics() {
        let _ = PolygonMode::unpack(3);
    }

    #[test]
    fn test_enum_bits_cover_discriminants() {
        assert!(PrimitiveTopology::PatchList.to_bits() < (1 << PrimitiveTopology::BITS));
        assert!(BlendFactor::OneMinusSrc1Alpha.to_bits() < (1 << BlendFactor::BITS));
        assert!(ImageLayout::DepthStencilAttachmentAndFragmentShaderRead.to_bits() < (1 << ImageLayout::BITS));
    }

    #[test]
    fn test_depth_stencil_formats_fit_three_bits() {
        assert!(FormatId::D32_FLOAT_S8_UINT.0 <= FormatId::DEPTH_STENCIL_MASK);
        assert!(FormatId::D24_UNORM_S8_UINT.is_depth_or_stencil());
        assert!(!FormatId::R8G8B8A8_UNORM.is_depth_or_stencil());
        assert!(FormatId::S8_UINT.has_stencil() && !FormatId::S8_UINT.has_depth());
    }

    #[test]
    fn test_shader_stage_flags() {
        assert_eq!(ShaderType::Fragment.stage_flag(), ShaderStageFlags::FRAGMENT);
        assert!(ShaderStageFlags::ALL_GRAPHICS.contains(ShaderStageFlags::VERTEX));
        assert!(!ShaderStageFlags::ALL_GRAPHICS.contains(ShaderStageFlags::COMPUTE));
    }
}
