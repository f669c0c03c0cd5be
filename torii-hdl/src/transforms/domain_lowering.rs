//! Injects the synchronous-reset mux ahead of emission.
//!
//! A domain with a synchronous (non-async) reset does not get its own
//! RTLIL reset wiring — instead, every signal driven in that domain has its
//! reset condition folded into the driven expression itself:
//! `rhs' = Mux(reset, reset_value(lhs), rhs)`. An async-reset domain is left
//! untouched here; the emitter wires its reset straight into the `$adff`
//! cell's `ARST` pin.

use alloc::{collections::BTreeMap, string::String};

use torii_ir::{Const, Value, ValueRef};

use crate::{
    clock_domain::ClockDomain,
    domain_key::DomainKey,
    statement::Statement,
    visitor::{visit_statements, StatementVisitor},
};

/// Lower every synchronous-reset domain in `statements` against the
/// definitions in `domains`. Domains absent from `domains` (should not
/// happen after [`super::domain_propagation::propagate_domains`] has run)
/// are left untouched.
pub fn lower_domains(statements: Vec<Statement>, domains: &BTreeMap<String, ClockDomain>) -> Vec<Statement> {
    let mut lowering = DomainLowering { domains };
    visit_statements(&mut lowering, statements)
}

struct DomainLowering<'a> {
    domains: &'a BTreeMap<String, ClockDomain>,
}

impl StatementVisitor for DomainLowering<'_> {
    fn rewrite_statement(&mut self, statement: Statement) -> Statement {
        let Statement::Assign { lhs, rhs, domain } = statement else { return statement };
        let Some(name) = domain.name() else {
            return Statement::Assign { lhs, rhs, domain }
        };
        let Some(clock_domain) = self.domains.get(name) else {
            return Statement::Assign { lhs, rhs, domain }
        };
        if clock_domain.is_async_reset() || clock_domain.is_reset_less() {
            return Statement::Assign { lhs, rhs, domain }
        }
        let Some(reset) = clock_domain.reset() else {
            return Statement::Assign { lhs, rhs, domain }
        };
        let reset_expr = reset_value_expr(&lhs);
        let rhs = Value::Mux(Value::Signal(reset.clone()).into_ref(), reset_expr, rhs).into_ref();
        Statement::Assign { lhs, rhs, domain }
    }
}

/// Build the constant expression `lhs` takes on reset, mirroring `lhs`'s
/// own structure (only `Signal`/`Slice`/`Part`/`Cat`/transparent-unary
/// shapes are reachable here since `lhs` is already a validated lvalue).
pub(crate) fn reset_value_expr(lhs: &ValueRef) -> ValueRef {
    match &**lhs {
        Value::Signal(signal) => Value::Const(Const::new(signal.reset_value().clone(), false)).into_ref(),
        Value::Slice(value, start, stop) => Value::Slice(reset_value_expr(value), *start, *stop).into_ref(),
        Value::Part { value, offset, width, stride } => {
            Value::Part { value: reset_value_expr(value), offset: offset.clone(), width: *width, stride: *stride }
                .into_ref()
        }
        Value::Cat(parts) => Value::Cat(parts.iter().map(reset_value_expr).collect()).into_ref(),
        Value::Unary(op, value) if op.is_transparent_cast() => Value::Unary(*op, reset_value_expr(value)).into_ref(),
        _ => lhs.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use torii_core::Shape;
    use torii_ir::Signal;

    #[test]
    fn sync_reset_domain_wraps_the_assign_in_a_mux() {
        let mut domains = BTreeMap::new();
        domains.insert("sync".into(), ClockDomain::new("sync", false, false).unwrap());
        let q = Signal::new("q", Shape::unsigned(4).unwrap());
        let d = Signal::new("d", Shape::unsigned(4).unwrap());
        let statements = alloc::vec![Statement::Assign {
            lhs: Value::Signal(q).into_ref(),
            rhs: Value::Signal(d).into_ref(),
            domain: DomainKey::Sync("sync".into()),
        }];
        let lowered = lower_domains(statements, &domains);
        let Statement::Assign { rhs, .. } = &lowered[0] else { panic!() };
        assert!(matches!(&**rhs, Value::Mux(..)));
    }

    #[test]
    fn async_reset_domain_is_left_untouched() {
        let mut domains = BTreeMap::new();
        domains.insert("sync".into(), ClockDomain::new("sync", false, true).unwrap());
        let q = Signal::new("q", Shape::unsigned(4).unwrap());
        let d = Signal::new("d", Shape::unsigned(4).unwrap());
        let statements = alloc::vec![Statement::Assign {
            lhs: Value::Signal(q).into_ref(),
            rhs: Value::Signal(d).into_ref(),
            domain: DomainKey::Sync("sync".into()),
        }];
        let lowered = lower_domains(statements, &domains);
        let Statement::Assign { rhs, .. } = &lowered[0] else { panic!() };
        assert!(matches!(&**rhs, Value::Signal(_)));
    }
}
