//! `Shape`: the (width, signed) pair that describes the bit-layout of every
//! bit-vector value in the core.

use crate::{error::ShapeError, MAX_WIDTH};

/// Width and signed-ness of a bit-vector value.
///
/// `Shape` carries no information about *where* a value comes from, only
/// how many bits it occupies and whether those bits are a two's-complement
/// signed quantity. Every [`crate::bits::BitPattern`] and every value node
/// in `torii-ir` has exactly one `Shape`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Shape {
    width: u32,
    signed: bool,
}

impl Shape {
    /// An unsigned shape of the given width. Width `0` is legal (the empty
    /// bit-vector, used for e.g. an all-const-folded slice).
    pub fn unsigned(width: u32) -> Result<Self, ShapeError> {
        Self::new(width, false)
    }

    /// A signed shape of the given width. Width `0` is rejected: there is
    /// no two's-complement representation of zero bits with a sign.
    pub fn signed(width: u32) -> Result<Self, ShapeError> {
        Self::new(width, true)
    }

    /// Construct a shape without validating its invariants.
    ///
    /// For use by callers (such as a [`crate::bits::BitPattern`]-backed
    /// constant) that already know `width` and `signed` came from a
    /// previously-validated `Shape` or computed width rule. Debug builds
    /// assert the invariants anyway.
    pub fn new_unchecked(width: u32, signed: bool) -> Self {
        debug_assert!(!(signed && width == 0), "signed shape cannot have width 0");
        debug_assert!(width <= MAX_WIDTH, "shape width exceeds the maximum");
        Self { width, signed }
    }

    /// Construct a shape of the given width and signedness, validating both
    /// invariants. [`Self::unsigned`] and [`Self::signed`] are thin
    /// convenience wrappers around this.
    pub fn new(width: u32, signed: bool) -> Result<Self, ShapeError> {
        if signed && width == 0 {
            return Err(ShapeError::ZeroWidthSigned)
        }
        if width > MAX_WIDTH {
            return Err(ShapeError::WidthOverflow { width, max: MAX_WIDTH })
        }
        Ok(Self { width, signed })
    }

    /// Construct a shape wide enough to hold every value in `min..max`
    /// (half-open), choosing the narrower of a signed or unsigned
    /// representation that covers the whole range.
    pub fn from_range(min: i64, max: i64) -> Result<Self, ShapeError> {
        if min >= max {
            return Err(ShapeError::EmptyRange(min, max))
        }
        let inclusive_max = max - 1;
        if min >= 0 {
            let width = bits_for_unsigned(inclusive_max as u64);
            Self::unsigned(width)
        } else {
            let width = bits_for_signed(min, inclusive_max);
            Self::signed(width)
        }
    }

    /// Construct a shape from an enum-like set of named integer constants,
    /// covering every member's value.
    pub fn from_values<I: IntoIterator<Item = i64>>(
        name: &str,
        values: I,
    ) -> Result<Self, ShapeError> {
        let (mut min, mut max, mut any) = (i64::MAX, i64::MIN, false);
        for v in values {
            any = true;
            min = min.min(v);
            max = max.max(v);
        }
        if !any {
            return Err(ShapeError::EmptyEnum(name.into()))
        }
        Self::from_range(min, max + 1)
    }

    /// Bit width.
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Whether the value is interpreted as two's-complement signed.
    pub const fn signed(&self) -> bool {
        self.signed
    }

    /// `width + !signed` — the width this shape would need after being
    /// promoted to signed, used by the mixed-sign binary-operator rule.
    pub const fn signed_promotion_width(&self) -> u32 {
        self.width + (!self.signed) as u32
    }
}

fn bits_for_unsigned(max_value: u64) -> u32 {
    if max_value == 0 {
        1
    } else {
        64 - max_value.leading_zeros()
    }
}

fn bits_for_signed(min: i64, max: i64) -> u32 {
    // One bit for sign, plus enough magnitude bits for both ends of the range.
    let pos_bits = if max >= 0 { bits_for_unsigned(max as u64) + 1 } else { 1 };
    let neg_bits = if min < 0 { bits_for_unsigned((-(min + 1)) as u64) + 1 } else { 1 };
    pos_bits.max(neg_bits)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsigned_zero_width_is_legal() {
        assert_eq!(Shape::unsigned(0).unwrap().width(), 0);
    }

    #[test]
    fn signed_zero_width_is_rejected() {
        assert_eq!(Shape::signed(0), Err(ShapeError::ZeroWidthSigned));
    }

    #[test]
    fn width_overflow_is_rejected() {
        assert!(matches!(
            Shape::unsigned(MAX_WIDTH + 1),
            Err(ShapeError::WidthOverflow { .. })
        ));
    }

    #[test]
    fn range_chooses_minimal_unsigned() {
        let shape = Shape::from_range(0, 16).unwrap();
        assert_eq!(shape, Shape::unsigned(4).unwrap());
    }

    #[test]
    fn range_chooses_minimal_signed() {
        let shape = Shape::from_range(-8, 8).unwrap();
        assert_eq!(shape, Shape::signed(4).unwrap());
    }

    #[test]
    fn enum_values_cover_every_member() {
        let shape = Shape::from_values("Color", [0, 1, 2, 3]).unwrap();
        assert_eq!(shape, Shape::unsigned(2).unwrap());
    }

    #[test]
    fn empty_enum_errors() {
        assert_eq!(
            Shape::from_values("Empty", core::iter::empty()),
            Err(ShapeError::EmptyEnum("Empty".into()))
        );
    }
}
