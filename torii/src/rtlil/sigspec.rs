//! Pure helpers shared by the module compiler: constant formatting, operator
//! to cell-type mapping, and left-hand-side decomposition.

use alloc::{format, string::String, vec::Vec};
use core::ops::Range;

use torii_core::BitPattern;
use torii_hdl::{Signal, UnaryOperator};
use torii_ir::{BinaryOperator, Value, ValueRef};

use crate::error::EmitError;

/// Render a constant as an RTLIL literal: `<width>'<bits>`, MSB-first.
pub fn format_const(pattern: &BitPattern) -> String {
    format!("{}'{}", pattern.width(), pattern.to_binary_string())
}

/// The RTLIL cell type for a unary operator, or `None` for the transparent
/// casts, which never allocate a cell.
pub fn unary_cell_type(op: UnaryOperator) -> Option<&'static str> {
    match op {
        UnaryOperator::Invert => Some("$not"),
        UnaryOperator::Negate => Some("$neg"),
        UnaryOperator::Bool => Some("$reduce_bool"),
        UnaryOperator::ReduceOr => Some("$reduce_or"),
        UnaryOperator::ReduceAnd => Some("$reduce_and"),
        UnaryOperator::ReduceXor => Some("$reduce_xor"),
        UnaryOperator::UnsignedCast | UnaryOperator::SignedCast => None,
    }
}

/// The RTLIL cell type for a binary operator. `shift_arithmetic` selects
/// `$sshr` over `$shr` when the shifted operand is signed.
pub fn binary_cell_type(op: BinaryOperator, shift_arithmetic: bool) -> &'static str {
    match op {
        BinaryOperator::Add => "$add",
        BinaryOperator::Sub => "$sub",
        BinaryOperator::Mul => "$mul",
        BinaryOperator::FloorDiv => "$divfloor",
        BinaryOperator::Mod => "$modfloor",
        BinaryOperator::Pow => "$pow",
        BinaryOperator::Shl => "$shl",
        BinaryOperator::Shr => {
            if shift_arithmetic {
                "$sshr"
            } else {
                "$shr"
            }
        }
        BinaryOperator::And => "$and",
        BinaryOperator::Or => "$or",
        BinaryOperator::Xor => "$xor",
        BinaryOperator::Eq => "$eq",
        BinaryOperator::Ne => "$ne",
        BinaryOperator::Lt => "$lt",
        BinaryOperator::Le => "$le",
        BinaryOperator::Gt => "$gt",
        BinaryOperator::Ge => "$ge",
    }
}

/// One leaf of a decomposed assignment target: the signal driven, the bit
/// range within that signal, and the bit range of the overall right-hand
/// side that feeds it.
pub struct LhsLeaf {
    /// The driven signal.
    pub signal: Signal,
    /// Bit range within `signal`, low bit first.
    pub signal_range: Range<u32>,
    /// Bit range within the original right-hand side that this leaf reads.
    pub rhs_range: Range<u32>,
}

/// Decompose a legal assignment target into per-signal leaves.
///
/// Supports the common lvalue shapes — a bare signal, a transparent cast, a
/// slice of a signal, and a concatenation of any of those — which covers
/// every assignment target this toolkit's DSL builder can construct.
/// A dynamic `Part` as an assignment target is rejected with
/// [`EmitError::UnsupportedDynamicLhs`]: see that variant's docs.
pub fn decompose_lhs(lhs: &ValueRef) -> Result<Vec<LhsLeaf>, EmitError> {
    let mut out = Vec::new();
    let mut cursor = 0u32;
    decompose(lhs, &mut cursor, &mut out)?;
    Ok(out)
}

fn decompose(value: &ValueRef, rhs_cursor: &mut u32, out: &mut Vec<LhsLeaf>) -> Result<(), EmitError> {
    match &**value {
        Value::Signal(signal) => {
            let width = signal.shape().width();
            out.push(LhsLeaf {
                signal: signal.clone(),
                signal_range: 0..width,
                rhs_range: *rhs_cursor..*rhs_cursor + width,
            });
            *rhs_cursor += width;
            Ok(())
        }
        Value::Slice(inner, start, stop) => match &**inner {
            Value::Signal(signal) => {
                let width = stop - start;
                out.push(LhsLeaf {
                    signal: signal.clone(),
                    signal_range: *start..*stop,
                    rhs_range: *rhs_cursor..*rhs_cursor + width,
                });
                *rhs_cursor += width;
                Ok(())
            }
            _ => Err(EmitError::UnsupportedDynamicLhs),
        },
        Value::Cat(parts) => {
            for part in parts {
                decompose(part, rhs_cursor, out)?;
            }
            Ok(())
        }
        Value::Unary(op, inner) if op.is_transparent_cast() => decompose(inner, rhs_cursor, out),
        _ => Err(EmitError::UnsupportedDynamicLhs),
    }
}
