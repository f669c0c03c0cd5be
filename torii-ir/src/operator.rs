//! Operator tags for [`crate::Value::Unary`] and [`crate::Value::Binary`].
//!
//! Each variant documents its source-level spelling and the shape rule the
//! RTLIL emitter and [`crate::shape_of`] module agree on.

use strum::{AsRefStr, EnumString};

/// A one-operand operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, AsRefStr, EnumString)]
pub enum UnaryOperator {
    /// `~x` — bitwise invert. Width and signedness pass through unchanged.
    #[strum(serialize = "~")]
    Invert,
    /// `-x` — two's-complement negate. Widens by one bit and is always signed.
    #[strum(serialize = "-")]
    Negate,
    /// `x.bool()` — truthiness test. Always unsigned width 1.
    #[strum(serialize = "b")]
    Bool,
    /// `x.any()` — reduction or. Always unsigned width 1.
    #[strum(serialize = "r|")]
    ReduceOr,
    /// `x.all()` — reduction and. Always unsigned width 1.
    #[strum(serialize = "r&")]
    ReduceAnd,
    /// `x.xor()` — reduction xor. Always unsigned width 1.
    #[strum(serialize = "r^")]
    ReduceXor,
    /// `x.as_unsigned()` — transparent width/signedness cast to unsigned.
    #[strum(serialize = "u")]
    UnsignedCast,
    /// `x.as_signed()` — transparent width/signedness cast to signed.
    #[strum(serialize = "s")]
    SignedCast,
}

impl UnaryOperator {
    /// `u`/`s` casts pass the operand through unchanged at the RHS/LHS
    /// compiler level — they exist only to retag the shape.
    pub const fn is_transparent_cast(self) -> bool {
        matches!(self, Self::UnsignedCast | Self::SignedCast)
    }
}

/// A two-operand operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, AsRefStr, EnumString)]
pub enum BinaryOperator {
    /// `a + b`
    #[strum(serialize = "+")]
    Add,
    /// `a - b`
    #[strum(serialize = "-")]
    Sub,
    /// `a * b`
    #[strum(serialize = "*")]
    Mul,
    /// `a // b` — floor division.
    #[strum(serialize = "//")]
    FloorDiv,
    /// `a % b` — floored modulo.
    #[strum(serialize = "%")]
    Mod,
    /// `a ** b` — power; the exponent is treated as unsigned for width purposes.
    #[strum(serialize = "**")]
    Pow,
    /// `a << b` — logical shift left.
    #[strum(serialize = "<<")]
    Shl,
    /// `a >> b` — shift right (arithmetic iff `a` is signed).
    #[strum(serialize = ">>")]
    Shr,
    /// `a & b`
    #[strum(serialize = "&")]
    And,
    /// `a ^ b`
    #[strum(serialize = "^")]
    Xor,
    /// `a | b`
    #[strum(serialize = "|")]
    Or,
    /// `a == b`
    #[strum(serialize = "==")]
    Eq,
    /// `a != b`
    #[strum(serialize = "!=")]
    Ne,
    /// `a < b`
    #[strum(serialize = "<")]
    Lt,
    /// `a <= b`
    #[strum(serialize = "<=")]
    Le,
    /// `a > b`
    #[strum(serialize = ">")]
    Gt,
    /// `a >= b`
    #[strum(serialize = ">=")]
    Ge,
}

impl BinaryOperator {
    /// `true` for the comparison family, which always yields an unsigned,
    /// width-1 result regardless of operand shapes.
    pub const fn is_comparison(self) -> bool {
        matches!(
            self,
            Self::Eq | Self::Ne | Self::Lt | Self::Le | Self::Gt | Self::Ge
        )
    }

    /// `true` for shift and power, whose result signedness is the LHS
    /// signedness rather than the OR of both operands, and whose mixed-sign
    /// operands are never promoted (`$pos`-extended) before emission.
    pub const fn is_shift_or_power(self) -> bool {
        matches!(self, Self::Shl | Self::Shr | Self::Pow)
    }
}
