//! Packed Descriptors
//!
//! Fixed-size value types that uniquely describe one configuration of a GPU
//! object. Every descriptor is a `#[repr(C)]` struct deriving
//! [`bytemuck::Pod`], which refuses to compile if the layout contains implicit
//! padding. On top of that each descriptor asserts its exact byte size at
//! compile time, so the raw byte image *is* the logical state:
//!
//! - `hash()` digests the raw bytes (xxh3),
//! - `==` compares the raw bytes,
//! - `std::hash::Hash` forwards the digest so descriptors key `FxHashMap`s.
//!
//! # Layout Overview
//!
//! ```text
//!  GraphicsPipelineDesc (252 bytes, 63 words)
//!  ┌──────────────┬────────────┬────────────┬──────────┬──────────────┬──────────┬─────────┬────────┐
//!  │ vertex input │ render pass│ raster/MS  │ depth/st │ IA + blend   │ viewport │ scissor │ extent │
//!  │   96 bytes   │  12 bytes  │  32 bytes  │ 20 bytes │   56 bytes   │ 24 bytes │ 8 bytes │ 4 bytes│
//!  └──────────────┴────────────┴────────────┴──────────┴──────────────┴──────────┴─────────┴────────┘
//! ```

// ─── Limits ──────────────────────────────────────────────────────────────────

/// Maximum number of color attachments (GL draw buffers).
pub const MAX_DRAW_BUFFERS: usize = 8;
/// Color attachments plus depth/stencil plus depth/stencil resolve.
pub const MAX_FRAMEBUFFER_ATTACHMENTS: usize = MAX_DRAW_BUFFERS + 2;
/// Every attachment slot including the color resolve attachments.
pub const MAX_FRAMEBUFFER_ATTACHMENTS_WITH_RESOLVE: usize = MAX_DRAW_BUFFERS * 2 + 2;
pub const MAX_VERTEX_ATTRIBS: usize = 16;
pub const MAX_SAMPLE_MASK_WORDS: usize = 2;
pub const MAX_ACTIVE_TEXTURES: usize = 64;
pub const MAX_DESCRIPTOR_SET_LAYOUT_BINDINGS: usize = 64;
pub const MAX_DESCRIPTOR_SET_LAYOUTS: usize = 4;
pub const MAX_TRANSFORM_FEEDBACK_BUFFERS: usize = 4;

/// Implements raw-byte hashing and equality for a `Pod` descriptor and checks
/// its size at compile time.
macro_rules! impl_packed_desc {
    ($ty:ty, $size:expr) => {
        const _: () = assert!(::std::mem::size_of::<$ty>() == $size);

        impl $ty {
            /// Raw byte image of the descriptor.
            #[inline]
            #[must_use]
            pub fn as_bytes(&self) -> &[u8] {
                ::bytemuck::bytes_of(self)
            }

            /// Deterministic digest of the raw byte image.
            #[inline]
            #[must_use]
            pub fn hash(&self) -> u64 {
                $crate::packing::hash_bytes(self.as_bytes())
            }
        }

        impl PartialEq for $ty {
            #[inline]
            fn eq(&self, other: &Self) -> bool {
                self.as_bytes() == other.as_bytes()
            }
        }

        impl Eq for $ty {}

        impl ::std::hash::Hash for $ty {
            #[inline]
            fn hash<H: ::std::hash::Hasher>(&self, state: &mut H) {
                state.write_u64(<$ty>::hash(self));
            }
        }
    };
}

pub mod descriptor_set;
pub mod framebuffer;
pub mod layout;
pub mod pipeline;
pub mod render_pass;
pub mod sampler;
pub mod state;
pub mod wgpu_state;

pub use descriptor_set::{
    ImageOrBufferViewSubresourceSerial, ImageSubresourceRange, ShaderBuffersDescriptorDesc,
    TextureDescriptorDesc, UniformsAndXfbDescriptorDesc,
};
pub use framebuffer::FramebufferDesc;
pub use layout::{DescriptorSetLayoutDesc, PackedDescriptorSetBinding, PackedPushConstantRange, PipelineLayoutDesc};
pub use pipeline::{GraphicsPipelineDesc, GraphicsPipelineTransitionBits};
pub use render_pass::{AttachmentOpsArray, PackedAttachmentIndex, PackedAttachmentOpsDesc, RenderPassDesc};
pub use sampler::{SamplerDesc, SamplerState, YcbcrConversionDesc};
pub use state::*;
