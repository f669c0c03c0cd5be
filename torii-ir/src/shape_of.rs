//! `Shape::of` — the semantic width/signedness rules every [`Value`] node
//! must agree with the RTLIL emitter on.
//!
//! The function is a pure, structural walk: two operator trees built the
//! same way always produce the same shape, and nothing here allocates a
//! wire or otherwise has a side effect. Callers that evaluate the same
//! subtree many times (the emitter does) are expected to memoize by
//! `Rc` pointer identity, not by calling this repeatedly — see the module
//! docs on [`crate::ValueRef`].

use torii_core::{Shape, ShapeError};

use crate::{operator::BinaryOperator, value::Value};

/// Compute the shape of a value tree per the rules in the core value
/// algebra's width section.
pub fn shape_of(value: &Value) -> Result<Shape, ShapeError> {
    match value {
        Value::Const(c) => Ok(c.shape()),
        Value::AnyValue(a) => Ok(a.shape()),
        Value::Signal(s) => Ok(s.shape()),
        Value::ClockSignal(_) | Value::ResetSignal(..) | Value::Initial => Shape::unsigned(1),
        Value::Unary(op, v) => shape_of_unary(*op, shape_of(v)?),
        Value::Binary(op, a, b) => shape_of_binary(*op, shape_of(a)?, shape_of(b)?),
        Value::Mux(_, t, f) => shape_of_symmetric(shape_of(t)?, shape_of(f)?),
        Value::Slice(_, start, stop) => Shape::unsigned(stop.saturating_sub(*start)),
        Value::Part { width, .. } => Shape::unsigned(*width),
        Value::Cat(parts) => {
            let mut total = 0u32;
            for part in parts {
                total = total.saturating_add(shape_of(part)?.width());
            }
            Shape::unsigned(total)
        }
        Value::ArrayProxy { elements, .. } => {
            // Elements of an array proxy are expected to share a shape; if
            // they don't, the widest one wins so no element's bits are lost.
            let mut shape = Shape::unsigned(0)?;
            for element in elements {
                shape = shape_of_symmetric(shape, shape_of(element)?)?;
            }
            Ok(shape)
        }
        Value::Sample { value, .. } => shape_of(value),
    }
}

use crate::operator::UnaryOperator;

fn shape_of_unary(op: UnaryOperator, operand: Shape) -> Result<Shape, ShapeError> {
    match op {
        UnaryOperator::Invert => Ok(operand),
        UnaryOperator::Negate => Shape::signed(operand.width().saturating_add(1)),
        UnaryOperator::Bool | UnaryOperator::ReduceOr | UnaryOperator::ReduceAnd | UnaryOperator::ReduceXor => {
            Shape::unsigned(1)
        }
        UnaryOperator::UnsignedCast => Shape::unsigned(operand.width()),
        UnaryOperator::SignedCast => Shape::signed(operand.width()),
    }
}

/// `w + !signed` promotion width used whenever a binary op mixes signed and
/// unsigned operands.
fn promoted_width(operand: Shape, result_signed: bool) -> u32 {
    if operand.signed() == result_signed {
        operand.width()
    } else {
        operand.width().saturating_add(1)
    }
}

/// Shared shape rule for operators whose result signedness is the OR of
/// both operands and whose width is the max of the (possibly promoted)
/// operand widths, without a carry bit: bitwise `& ^ |` and `Mux`.
fn shape_of_symmetric(a: Shape, b: Shape) -> Result<Shape, ShapeError> {
    let signed = a.signed() || b.signed();
    let width = promoted_width(a, signed).max(promoted_width(b, signed));
    Shape::new(width, signed)
}

fn shape_of_binary(op: BinaryOperator, a: Shape, b: Shape) -> Result<Shape, ShapeError> {
    if op.is_comparison() {
        return Shape::unsigned(1)
    }
    match op {
        BinaryOperator::Add | BinaryOperator::Sub => {
            let signed = a.signed() || b.signed();
            let width = promoted_width(a, signed).max(promoted_width(b, signed)).saturating_add(1);
            Shape::new(width, signed)
        }
        BinaryOperator::Mul => {
            let signed = a.signed() || b.signed();
            Shape::new(a.width().saturating_add(b.width()), signed)
        }
        BinaryOperator::FloorDiv => {
            let signed = a.signed() || b.signed();
            let width = a.width().saturating_add(b.signed() as u32);
            Shape::new(width, signed)
        }
        BinaryOperator::Mod => {
            let signed = a.signed() || b.signed();
            let width = if b.signed() { b.width() } else { a.width().min(b.width().max(1)) };
            Shape::new(width, signed)
        }
        BinaryOperator::Pow => {
            // The exponent's width bounds how many times the base can
            // double; clamp well below the wire-width ceiling so a wide
            // exponent signal can never force an unrepresentable shape.
            let shift = b.width().min(16);
            let width = a.width().saturating_mul(1u32 << shift).min(torii_core::MAX_WIDTH);
            Shape::new(width.max(1), a.signed())
        }
        BinaryOperator::Shl => {
            let max_shift = (1u64 << b.width().min(32)).saturating_sub(1) as u32;
            let width = a.width().saturating_add(max_shift).min(torii_core::MAX_WIDTH);
            Shape::new(width, a.signed())
        }
        BinaryOperator::Shr => Shape::new(a.width(), a.signed()),
        BinaryOperator::And | BinaryOperator::Xor | BinaryOperator::Or => shape_of_symmetric(a, b),
        BinaryOperator::Eq
        | BinaryOperator::Ne
        | BinaryOperator::Lt
        | BinaryOperator::Le
        | BinaryOperator::Gt
        | BinaryOperator::Ge => unreachable!("comparisons handled above"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{signal::Signal, value::Value};

    fn sig(width: u32, signed: bool) -> Signal {
        let shape = if signed { Shape::signed(width) } else { Shape::unsigned(width) }.unwrap();
        Signal::new("s", shape)
    }

    #[test]
    fn slice_width_is_closed_interval_length() {
        let v = Value::Slice(Value::Signal(sig(8, false)).into_ref(), 2, 6);
        assert_eq!(shape_of(&v).unwrap(), Shape::unsigned(4).unwrap());
    }

    #[test]
    fn cat_width_is_additive() {
        let v = Value::Cat(alloc::vec![
            Value::Signal(sig(3, false)).into_ref(),
            Value::Signal(sig(5, false)).into_ref(),
        ]);
        assert_eq!(shape_of(&v).unwrap(), Shape::unsigned(8).unwrap());
    }

    #[test]
    fn unsigned_add_widens_by_one() {
        let v = Value::Binary(
            BinaryOperator::Add,
            Value::Signal(sig(4, false)).into_ref(),
            Value::Signal(sig(4, false)).into_ref(),
        );
        assert_eq!(shape_of(&v).unwrap(), Shape::unsigned(5).unwrap());
    }

    #[test]
    fn mixed_sign_comparison_is_always_width_one_unsigned() {
        let v = Value::Binary(
            BinaryOperator::Lt,
            Value::Signal(sig(4, true)).into_ref(),
            Value::Signal(sig(4, false)).into_ref(),
        );
        assert_eq!(shape_of(&v).unwrap(), Shape::unsigned(1).unwrap());
    }

    #[test]
    fn comparisons_are_width_one() {
        let v = Value::Binary(
            BinaryOperator::Eq,
            Value::Signal(sig(4, false)).into_ref(),
            Value::Signal(sig(4, false)).into_ref(),
        );
        assert_eq!(shape_of(&v).unwrap(), Shape::unsigned(1).unwrap());
    }

    #[test]
    fn mul_adds_widths() {
        let v = Value::Binary(
            BinaryOperator::Mul,
            Value::Signal(sig(4, false)).into_ref(),
            Value::Signal(sig(3, false)).into_ref(),
        );
        assert_eq!(shape_of(&v).unwrap(), Shape::unsigned(7).unwrap());
    }

    #[rstest::rstest]
    #[case::both_unsigned(4, false, 4, false, 5, false)]
    #[case::both_signed(4, true, 4, true, 5, true)]
    #[case::mixed_widens_by_two(4, true, 4, false, 6, true)]
    #[case::narrow_against_wide(2, false, 6, false, 7, false)]
    fn add_width_rule(
        #[case] a_width: u32,
        #[case] a_signed: bool,
        #[case] b_width: u32,
        #[case] b_signed: bool,
        #[case] expected_width: u32,
        #[case] expected_signed: bool,
    ) {
        let v = Value::Binary(
            BinaryOperator::Add,
            Value::Signal(sig(a_width, a_signed)).into_ref(),
            Value::Signal(sig(b_width, b_signed)).into_ref(),
        );
        let shape = shape_of(&v).unwrap();
        assert_eq!(shape.width(), expected_width);
        assert_eq!(shape.signed(), expected_signed);
    }

    #[rstest::rstest]
    #[case::unsigned_unsigned(BinaryOperator::Eq, 4, false, 4, false)]
    #[case::signed_unsigned(BinaryOperator::Lt, 4, true, 6, false)]
    #[case::signed_signed(BinaryOperator::Ge, 3, true, 3, true)]
    fn comparisons_are_always_width_one_unsigned(
        #[case] op: BinaryOperator,
        #[case] a_width: u32,
        #[case] a_signed: bool,
        #[case] b_width: u32,
        #[case] b_signed: bool,
    ) {
        let v = Value::Binary(
            op,
            Value::Signal(sig(a_width, a_signed)).into_ref(),
            Value::Signal(sig(b_width, b_signed)).into_ref(),
        );
        assert_eq!(shape_of(&v).unwrap(), Shape::unsigned(1).unwrap());
    }
}
