//! Identity serials.
//!
//! Two flavours live here:
//!
//! - [`Serial`]: a 64-bit, monotonically issued version number handed to every
//!   cached pipeline and shared sub-object. Serials let the rest of the driver
//!   compare object identity without dereferencing the object.
//! - Typed 32-bit *resource* serials ([`BufferSerial`], [`ImageOrBufferViewSerial`],
//!   [`SamplerSerial`]) that are embedded by value into packed descriptors.
//!   Zero is reserved as the invalid serial so a zero-filled descriptor means
//!   "nothing bound".

use std::sync::atomic::{AtomicU32, Ordering};

use bytemuck::{Pod, Zeroable};

/// Monotonic 64-bit serial.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Serial(u64);

impl Serial {
    pub const INVALID: Self = Self(0);

    #[inline]
    #[must_use]
    pub fn value(self) -> u64 {
        self.0
    }

    #[inline]
    #[must_use]
    pub fn is_valid(self) -> bool {
        self.0 != 0
    }
}

/// Issues [`Serial`]s in increasing order, starting at 1.
#[derive(Debug)]
pub struct SerialFactory {
    next: u64,
}

impl Default for SerialFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl SerialFactory {
    #[must_use]
    pub fn new() -> Self {
        Self { next: 1 }
    }

    pub fn generate(&mut self) -> Serial {
        let serial = Serial(self.next);
        self.next += 1;
        serial
    }
}

macro_rules! resource_serial {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[repr(transparent)]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Pod, Zeroable)]
        pub struct $name(u32);

        impl $name {
            pub const INVALID: Self = Self(0);

            #[inline]
            #[must_use]
            pub const fn from_raw(value: u32) -> Self {
                Self(value)
            }

            #[inline]
            #[must_use]
            pub const fn value(self) -> u32 {
                self.0
            }

            #[inline]
            #[must_use]
            pub const fn is_valid(self) -> bool {
                self.0 != 0
            }
        }
    };
}

resource_serial!(
    /// Identity of a buffer's current storage.
    BufferSerial
);
resource_serial!(
    /// Identity of an image view or buffer view.
    ImageOrBufferViewSerial
);
resource_serial!(
    /// Identity of a sampler object.
    SamplerSerial
);

/// Global resource serial generator.
static NEXT_RESOURCE_SERIAL: AtomicU32 = AtomicU32::new(1);

fn next_resource_serial() -> u32 {
    NEXT_RESOURCE_SERIAL.fetch_add(1, Ordering::Relaxed)
}

/// Hands out process-unique resource serials.
#[derive(Debug, Default, Clone, Copy)]
pub struct ResourceSerialFactory;

impl ResourceSerialFactory {
    #[must_use]
    pub fn generate_buffer_serial(self) -> BufferSerial {
        BufferSerial(next_resource_serial())
    }

    #[must_use]
    pub fn generate_image_or_buffer_view_serial(self) -> ImageOrBufferViewSerial {
        ImageOrBufferViewSerial(next_resource_serial())
    }

    #[must_use]
    pub fn generate_sampler_serial(self) -> SamplerSerial {
        SamplerSerial(next_resource_serial())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serial_factory_is_monotonic() {
        let mut factory = SerialFactory::new();
        let a = factory.generate();
        let b = factory.generate();
        assert!(a.is_valid());
        assert!(b > a);
    }

    #[test]
    fn test_resource_serials_are_unique_and_valid() {
        let factory = ResourceSerialFactory;
        let a = factory.generate_buffer_serial();
        let b = factory.generate_buffer_serial();
        let s = factory.generate_sampler_serial();
        assert!(a.is_valid() && b.is_valid() && s.is_valid());
        assert_ne!(a, b);
        assert_ne!(a.value(), s.value());
    }

    #[test]
    fn test_zeroed_serial_is_invalid() {
        assert_eq!(BufferSerial::zeroed(), BufferSerial::INVALID);
        assert!(!SamplerSerial::default().is_valid());
    }
}
