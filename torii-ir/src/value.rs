//! The bit-vector value DAG.

use alloc::{collections::BTreeSet, rc::Rc, vec::Vec};

use torii_core::{BitPattern, Shape};

use crate::{
    error::LValueError,
    operator::{BinaryOperator, UnaryOperator},
    signal::Signal,
};

/// A handle to a shared, immutable value node.
///
/// The value tree is really a DAG: the same `ValueRef` may be reachable
/// through many parents. Consumers that must not double-process a shared
/// node (the RTLIL emitter, transform passes) memoize by `Rc` pointer
/// identity — see the `by_ptr` helpers on [`Value`] — never by structural
/// equality, which would collapse distinct-but-equal subtrees that the user
/// intentionally shared or duplicated.
pub type ValueRef = Rc<Value>;

/// A literal bit-vector constant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Const {
    pattern: BitPattern,
    signed: bool,
}

impl Const {
    /// Construct a constant from its bit pattern and signedness.
    pub fn new(pattern: BitPattern, signed: bool) -> Self {
        Self { pattern, signed }
    }

    /// The constant's bits.
    pub fn pattern(&self) -> &BitPattern {
        &self.pattern
    }

    /// The constant's shape.
    pub fn shape(&self) -> Shape {
        Shape::new_unchecked(self.pattern.width(), self.signed)
    }
}

/// Which Yosys formal primitive an [`AnyValue`] lowers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnyKind {
    /// `$anyconst` — an unconstrained value, fixed for the whole trace.
    Const,
    /// `$anyseq` — an unconstrained value, free to change every cycle.
    Seq,
}

/// A symbolic nondeterministic input, used only by formal verification
/// backends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnyValue {
    kind: AnyKind,
    shape: Shape,
}

impl AnyValue {
    /// Construct an any-value of the given kind and shape.
    pub fn new(kind: AnyKind, shape: Shape) -> Self {
        Self { kind, shape }
    }

    /// `$anyconst` or `$anyseq`.
    pub fn kind(&self) -> AnyKind {
        self.kind
    }

    /// The value's shape.
    pub fn shape(&self) -> Shape {
        self.shape
    }
}

/// An immutable bit-vector expression.
///
/// See the module docs on [`ValueRef`] for why this is reference-counted
/// rather than owned, and the crate's `shape_of` module for the width and
/// signedness rules that apply to each variant.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// A literal.
    Const(Const),
    /// A formal-only nondeterministic input.
    AnyValue(AnyValue),
    /// A named storage cell.
    Signal(Signal),
    /// The clock of a named clock domain.
    ClockSignal(alloc::string::String),
    /// The reset of a named clock domain. `allow_reset_less` controls
    /// whether referencing a reset-less domain's reset is legal (`false`
    /// is an error the caller should surface as a `SyntaxError`).
    ResetSignal(alloc::string::String, bool),
    /// A one-operand operator application.
    Unary(UnaryOperator, ValueRef),
    /// A two-operand operator application.
    Binary(BinaryOperator, ValueRef, ValueRef),
    /// `Mux(selector, if_true, if_false)`.
    Mux(ValueRef, ValueRef, ValueRef),
    /// `value[start..stop]`, `0 <= start <= stop <= len(value)`.
    Slice(ValueRef, u32, u32),
    /// `value[offset*stride +: width]`, a dynamic window. Bits read past
    /// the end of `value` are zero.
    Part { value: ValueRef, offset: ValueRef, width: u32, stride: u32 },
    /// LSB-first concatenation: `parts[0]` occupies the low bits.
    Cat(Vec<ValueRef>),
    /// Select one of `elements` by a runtime `index`; an index past the end
    /// clamps to the last element.
    ArrayProxy { elements: Vec<ValueRef>, index: ValueRef },
    /// The value of `value`, `cycles` cycles ago in `domain`. Lowered away
    /// by the sample-lowering IR transform before emission.
    Sample { value: ValueRef, cycles: u32, domain: alloc::string::String },
    /// `1` during the first cycle; formal-only.
    Initial,
}

impl Value {
    /// Wrap in a fresh [`ValueRef`].
    pub fn into_ref(self) -> ValueRef {
        Rc::new(self)
    }

    /// The transitive set of signals read by this value.
    pub fn rhs_signals(self: &ValueRef) -> BTreeSet<Signal> {
        let mut out = BTreeSet::new();
        collect_rhs(self, &mut out);
        out
    }

    /// The set of signals written when this value appears on the left-hand
    /// side of an assignment.
    ///
    /// Only signals and compositions of them through `Slice`/`Cat`/`Part`/
    /// the transparent unary casts satisfy this; anything else is a user
    /// error reported as [`LValueError`].
    pub fn lhs_signals(self: &ValueRef) -> Result<BTreeSet<Signal>, LValueError> {
        let mut out = BTreeSet::new();
        collect_lhs(self, &mut out)?;
        Ok(out)
    }

    /// `true` if this value satisfies the legal-LHS grammar.
    pub fn is_lvalue(self: &ValueRef) -> bool {
        self.lhs_signals().is_ok()
    }
}

fn collect_rhs(value: &Value, out: &mut BTreeSet<Signal>) {
    match value {
        Value::Const(_) | Value::AnyValue(_) | Value::ClockSignal(_) | Value::ResetSignal(..) | Value::Initial => {}
        Value::Signal(s) => {
            out.insert(s.clone());
        }
        Value::Unary(_, v) => collect_rhs(v, out),
        Value::Binary(_, a, b) => {
            collect_rhs(a, out);
            collect_rhs(b, out);
        }
        Value::Mux(sel, t, f) => {
            collect_rhs(sel, out);
            collect_rhs(t, out);
            collect_rhs(f, out);
        }
        Value::Slice(v, ..) => collect_rhs(v, out),
        Value::Part { value, offset, .. } => {
            collect_rhs(value, out);
            collect_rhs(offset, out);
        }
        Value::Cat(parts) => parts.iter().for_each(|p| collect_rhs(p, out)),
        Value::ArrayProxy { elements, index } => {
            elements.iter().for_each(|e| collect_rhs(e, out));
            collect_rhs(index, out);
        }
        Value::Sample { value, .. } => collect_rhs(value, out),
    }
}

fn collect_lhs(value: &Value, out: &mut BTreeSet<Signal>) -> Result<(), LValueError> {
    match value {
        Value::Signal(s) => {
            out.insert(s.clone());
            Ok(())
        }
        Value::Unary(op, v) if op.is_transparent_cast() => collect_lhs(v, out),
        Value::Slice(v, ..) => collect_lhs(v, out),
        Value::Part { value, .. } => collect_lhs(value, out),
        Value::Cat(parts) => parts.iter().try_for_each(|p| collect_lhs(p, out)),
        _ => Err(LValueError),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operator::BinaryOperator;

    fn sig(name: &str, width: u32) -> Signal {
        Signal::new(name, Shape::unsigned(width).unwrap())
    }

    #[test]
    fn rhs_signals_walks_the_whole_tree() {
        let a = sig("a", 4);
        let b = sig("b", 4);
        let expr = Value::Binary(
            BinaryOperator::Add,
            Value::Signal(a.clone()).into_ref(),
            Value::Signal(b.clone()).into_ref(),
        )
        .into_ref();
        let found = expr.rhs_signals();
        assert_eq!(found.len(), 2);
        assert!(found.contains(&a));
        assert!(found.contains(&b));
    }

    #[test]
    fn cat_of_signals_is_a_legal_lvalue() {
        let a = sig("a", 4);
        let b = sig("b", 4);
        let expr = Value::Cat(alloc::vec![Value::Signal(a).into_ref(), Value::Signal(b).into_ref()]).into_ref();
        assert!(expr.is_lvalue());
    }

    #[test]
    fn an_operator_result_is_not_a_legal_lvalue() {
        let a = sig("a", 4);
        let expr = Value::Unary(UnaryOperator::Invert, Value::Signal(a).into_ref()).into_ref();
        assert_eq!(expr.lhs_signals(), Err(LValueError));
    }
}
