//! Checked bit packing.
//!
//! Every packed descriptor stores its multi-bit sub-fields inside explicit
//! `u8` / `u16` / `u32` words. A [`BitField`] names one such sub-field by its
//! shift and width; writes through it are *checked*: a value that does not fit
//! the reserved width is a contract violation and panics instead of silently
//! wrapping into the neighbouring field.
//!
//! ```text
//!   u32 word:  [ 31 ........ 16 | 15 .... 12 | 11 .... 8 | 7 ...... 0 ]
//!                                 └─ BitField { shift: 12, width: 4 }
//! ```

use std::fmt::Debug;

use xxhash_rust::xxh3::xxh3_64;

/// Storage word that can host [`BitField`]s.
pub trait PackedWord: Copy {
    const BITS: u32;

    fn to_u32(self) -> u32;

    /// Truncating conversion. Callers only pass values already masked to `BITS`.
    fn from_u32(value: u32) -> Self;
}

macro_rules! impl_packed_word {
    ($($ty:ty),*) => {
        $(
            impl PackedWord for $ty {
                const BITS: u32 = <$ty>::BITS;

                #[inline]
                fn to_u32(self) -> u32 {
                    u32::from(self)
                }

                #[inline]
                fn from_u32(value: u32) -> Self {
                    value as $ty
                }
            }
        )*
    };
}

impl_packed_word!(u8, u16, u32);

/// A sub-field of a packed storage word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BitField {
    pub shift: u32,
    pub width: u32,
}

impl BitField {
    #[must_use]
    pub const fn new(shift: u32, width: u32) -> Self {
        assert!(width > 0 && width <= 32 && shift + width <= 32);
        Self { shift, width }
    }

    /// Largest value the field can hold.
    #[inline]
    #[must_use]
    pub const fn max_value(self) -> u32 {
        if self.width == 32 {
            u32::MAX
        } else {
            (1u32 << self.width) - 1
        }
    }

    #[inline]
    #[must_use]
    pub fn get<W: PackedWord>(self, word: W) -> u32 {
        (word.to_u32() >> self.shift) & self.max_value()
    }

    #[inline]
    #[must_use]
    pub fn get_bool<W: PackedWord>(self, word: W) -> bool {
        self.get(word) != 0
    }

    /// Writes `value` into the field.
    ///
    /// # Panics
    ///
    /// Panics if `value` does not fit in `width` bits or the field does not
    /// fit inside `W`.
    #[inline]
    pub fn set<W: PackedWord>(self, word: &mut W, value: u32) {
        assert!(
            self.shift + self.width <= W::BITS,
            "bit field {self:?} does not fit a {}-bit word",
            W::BITS
        );
        assert!(
            value <= self.max_value(),
            "value {value} does not fit in a {}-bit field",
            self.width
        );
        let mask = self.max_value() << self.shift;
        let packed = (word.to_u32() & !mask) | (value << self.shift);
        *word = W::from_u32(packed);
    }

    #[inline]
    pub fn set_bool<W: PackedWord>(self, word: &mut W, value: bool) {
        self.set(word, u32::from(value));
    }
}

/// Checked narrowing conversion for whole packed fields.
///
/// # Panics
///
/// Panics when `value` does not round-trip through `T`.
#[inline]
#[must_use]
pub fn narrow<T, U>(value: U) -> T
where
    T: TryFrom<U>,
    U: Copy + Debug,
{
    T::try_from(value).unwrap_or_else(|_| {
        panic!(
            "value {value:?} does not fit in {}",
            std::any::type_name::<T>()
        )
    })
}

/// Deterministic digest of a packed byte image.
#[inline]
#[must_use]
pub fn hash_bytes(bytes: &[u8]) -> u64 {
    xxh3_64(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    const LOW: BitField = BitField::new(0, 3);
    const HIGH: BitField = BitField::new(3, 5);

    #[test]
    fn test_set_and_get_are_independent() {
        let mut word = 0u8;
        LOW.set(&mut word, 5);
        HIGH.set(&mut word, 31);
        assert_eq!(LOW.get(word), 5);
        assert_eq!(HIGH.get(word), 31);

        LOW.set(&mut word, 0);
        assert_eq!(HIGH.get(word), 31);
        assert_eq!(word, 31 << 3);
    }

    #[test]
    #[should_panic(expected = "does not fit in a 3-bit field")]
    fn test_overflowing_value_panics() {
        let mut word = 0u8;
        LOW.set(&mut word, 8);
    }

    #[test]
    #[should_panic(expected = "does not fit a 8-bit word")]
    fn test_field_outside_word_panics() {
        let mut word = 0u8;
        BitField::new(6, 4).set(&mut word, 1);
    }

    #[test]
    fn test_full_width_field() {
        let mut word = 0u32;
        BitField::new(0, 32).set(&mut word, u32::MAX);
        assert_eq!(word, u32::MAX);
    }

    #[test]
    fn test_narrow_accepts_fitting_values() {
        let v: u8 = narrow(200u32);
        assert_eq!(v, 200);
    }

    #[test]
    #[should_panic(expected = "does not fit in u16")]
    fn test_narrow_rejects_overflow() {
        let _: u16 = narrow(70_000u32);
    }

    #[test]
    fn test_hash_bytes_is_deterministic() {
        assert_eq!(hash_bytes(&[1, 2, 3]), hash_bytes(&[1, 2, 3]));
        assert_ne!(hash_bytes(&[1, 2, 3]), hash_bytes(&[1, 2, 4]));
    }
}
