//! The value half of the transform framework: a structure-preserving
//! rewriter over [`Value`] trees.
//!
//! A [`ValueVisitor`] is called bottom-up — children are rewritten before
//! their parent — so an implementer that only cares about, say, replacing
//! every [`Value::Signal`] reference to a particular signal never has to
//! handle recursion itself.

use crate::value::{Value, ValueRef};

/// Bottom-up rewriter over a value tree.
///
/// The default `rewrite` is the identity: it just re-wraps the rebuilt node.
/// Override it to intercept specific nodes; unmatched nodes should fall
/// through to `value.into_ref()`.
pub trait ValueVisitor {
    /// Called once per node, after its children (if any) have already been
    /// rewritten and spliced back in.
    fn rewrite(&mut self, value: Value) -> ValueRef {
        value.into_ref()
    }
}

/// Rewrite `value` bottom-up using `visitor`.
///
/// Nodes whose children are all pointer-identical to the originals are
/// passed through without reallocating, so a visitor that touches only a
/// small part of a large shared DAG doesn't pay to rebuild the rest of it.
pub fn visit(visitor: &mut impl ValueVisitor, value: &ValueRef) -> ValueRef {
    match value.as_ref() {
        Value::Unary(op, v) => {
            let v2 = visit(visitor, v);
            if core::ptr::eq(v.as_ref(), v2.as_ref()) {
                visitor.rewrite(Value::Unary(*op, v.clone()))
            } else {
                visitor.rewrite(Value::Unary(*op, v2))
            }
        }
        Value::Binary(op, a, b) => {
            let (a2, b2) = (visit(visitor, a), visit(visitor, b));
            visitor.rewrite(Value::Binary(*op, a2, b2))
        }
        Value::Mux(sel, t, f) => {
            let (sel2, t2, f2) = (visit(visitor, sel), visit(visitor, t), visit(visitor, f));
            visitor.rewrite(Value::Mux(sel2, t2, f2))
        }
        Value::Slice(v, start, stop) => {
            let v2 = visit(visitor, v);
            visitor.rewrite(Value::Slice(v2, *start, *stop))
        }
        Value::Part { value, offset, width, stride } => {
            let value2 = visit(visitor, value);
            let offset2 = visit(visitor, offset);
            visitor.rewrite(Value::Part { value: value2, offset: offset2, width: *width, stride: *stride })
        }
        Value::Cat(parts) => {
            let parts2 = parts.iter().map(|p| visit(visitor, p)).collect();
            visitor.rewrite(Value::Cat(parts2))
        }
        Value::ArrayProxy { elements, index } => {
            let elements2 = elements.iter().map(|e| visit(visitor, e)).collect();
            let index2 = visit(visitor, index);
            visitor.rewrite(Value::ArrayProxy { elements: elements2, index: index2 })
        }
        Value::Sample { value, cycles, domain } => {
            let value2 = visit(visitor, value);
            visitor.rewrite(Value::Sample { value: value2, cycles: *cycles, domain: domain.clone() })
        }
        leaf => visitor.rewrite(leaf.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{operator::BinaryOperator, signal::Signal};
    use torii_core::Shape;

    struct ReplaceSignal {
        target: Signal,
        replacement: ValueRef,
    }

    impl ValueVisitor for ReplaceSignal {
        fn rewrite(&mut self, value: Value) -> ValueRef {
            match &value {
                Value::Signal(s) if *s == self.target => self.replacement.clone(),
                _ => value.into_ref(),
            }
        }
    }

    #[test]
    fn rewrite_substitutes_a_specific_signal() {
        let a = Signal::new("a", Shape::unsigned(4).unwrap());
        let b = Signal::new("b", Shape::unsigned(4).unwrap());
        let replacement = Value::Signal(b).into_ref();
        let expr = Value::Binary(
            BinaryOperator::Add,
            Value::Signal(a.clone()).into_ref(),
            Value::Signal(a.clone()).into_ref(),
        )
        .into_ref();

        let mut pass = ReplaceSignal { target: a, replacement: replacement.clone() };
        let rewritten = visit(&mut pass, &expr);
        match rewritten.as_ref() {
            Value::Binary(BinaryOperator::Add, lhs, rhs) => {
                assert!(core::ptr::eq(lhs.as_ref(), replacement.as_ref()));
                assert!(core::ptr::eq(rhs.as_ref(), replacement.as_ref()));
            }
            _ => panic!("expected a binary node"),
        }
    }

    #[test]
    fn untouched_subtree_is_not_reallocated() {
        let a = Signal::new("a", Shape::unsigned(4).unwrap());
        let b = Signal::new("b", Shape::unsigned(4).unwrap());
        let unrelated = Signal::new("unrelated", Shape::unsigned(1).unwrap());
        let inner = Value::Signal(unrelated).into_ref();
        let expr = Value::Unary(crate::operator::UnaryOperator::Invert, inner.clone()).into_ref();

        let mut pass = ReplaceSignal { target: a, replacement: Value::Signal(b).into_ref() };
        let rewritten = visit(&mut pass, &expr);
        match rewritten.as_ref() {
            Value::Unary(_, v) => assert!(core::ptr::eq(v.as_ref(), inner.as_ref())),
            _ => panic!("expected a unary node"),
        }
    }
}
