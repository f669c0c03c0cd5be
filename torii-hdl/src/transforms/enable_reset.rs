//! `EnableInserter` and `ResetInserter`: gate every assignment in a domain
//! behind an extra enable or reset condition, at the leaf rather than by
//! wrapping statement structure — so the transform composes with switches
//! and FSM bodies without having to duplicate them per domain.

use torii_ir::{Value, ValueRef};

use crate::{
    domain_key::DomainKey,
    statement::Statement,
    transforms::domain_lowering::reset_value_expr,
    visitor::{visit_statements, StatementVisitor},
};

/// Rewrite every `Assign` tagged with `domain` so its driven value holds
/// when `enable` is low: `rhs' = Mux(enable, rhs, lhs)`.
///
/// `lhs` is reused directly as the "keep the old value" expression — every
/// legal lvalue shape (`Signal`, `Slice`, `Part`, `Cat`, a transparent cast)
/// reads back exactly the value it last held.
pub fn insert_enable(statements: alloc::vec::Vec<Statement>, domain: &DomainKey, enable: ValueRef) -> Vec<Statement> {
    let mut inserter = EnableInserter { domain: domain.clone(), enable };
    visit_statements(&mut inserter, statements)
}

/// Rewrite every `Assign` tagged with `domain` so its driven value is forced
/// to `lhs`'s reset value when `reset` is high:
/// `rhs' = Mux(reset, reset_value(lhs), rhs)`.
///
/// This is the same rewrite [`super::domain_lowering::lower_domains`]
/// applies for a domain's own synchronous reset; `ResetInserter` exists
/// separately so a caller can apply an *additional* reset condition to a
/// specific signal group without touching the domain definition itself.
pub fn insert_reset(statements: alloc::vec::Vec<Statement>, domain: &DomainKey, reset: ValueRef) -> Vec<Statement> {
    let mut inserter = ResetInserter { domain: domain.clone(), reset };
    visit_statements(&mut inserter, statements)
}

use alloc::vec::Vec;

struct EnableInserter {
    domain: DomainKey,
    enable: ValueRef,
}

impl StatementVisitor for EnableInserter {
    fn rewrite_statement(&mut self, statement: Statement) -> Statement {
        let Statement::Assign { lhs, rhs, domain } = statement else { return statement };
        if domain != self.domain {
            return Statement::Assign { lhs, rhs, domain }
        }
        let rhs = Value::Mux(self.enable.clone(), rhs, lhs.clone()).into_ref();
        Statement::Assign { lhs, rhs, domain }
    }
}

struct ResetInserter {
    domain: DomainKey,
    reset: ValueRef,
}

impl StatementVisitor for ResetInserter {
    fn rewrite_statement(&mut self, statement: Statement) -> Statement {
        let Statement::Assign { lhs, rhs, domain } = statement else { return statement };
        if domain != self.domain {
            return Statement::Assign { lhs, rhs, domain }
        }
        let rhs = Value::Mux(self.reset.clone(), reset_value_expr(&lhs), rhs).into_ref();
        Statement::Assign { lhs, rhs, domain }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use torii_core::Shape;
    use torii_ir::Signal;

    #[test]
    fn enable_gates_the_matching_domain_only() {
        let q = Signal::new("q", Shape::unsigned(1).unwrap());
        let d = Signal::new("d", Shape::unsigned(1).unwrap());
        let enable = Value::Signal(Signal::new("en", Shape::unsigned(1).unwrap())).into_ref();
        let statements = alloc::vec![Statement::Assign {
            lhs: Value::Signal(q).into_ref(),
            rhs: Value::Signal(d).into_ref(),
            domain: DomainKey::Sync("sync".into()),
        }];
        let gated = insert_enable(statements, &DomainKey::Sync("sync".into()), enable);
        let Statement::Assign { rhs, .. } = &gated[0] else { panic!() };
        assert!(matches!(&**rhs, Value::Mux(..)));
    }

    #[test]
    fn enable_leaves_other_domains_untouched() {
        let q = Signal::new("q", Shape::unsigned(1).unwrap());
        let d = Signal::new("d", Shape::unsigned(1).unwrap());
        let enable = Value::Signal(Signal::new("en", Shape::unsigned(1).unwrap())).into_ref();
        let statements = alloc::vec![Statement::Assign {
            lhs: Value::Signal(q).into_ref(),
            rhs: Value::Signal(d).into_ref(),
            domain: DomainKey::Comb,
        }];
        let gated = insert_enable(statements, &DomainKey::Sync("sync".into()), enable);
        let Statement::Assign { rhs, .. } = &gated[0] else { panic!() };
        assert!(matches!(&**rhs, Value::Signal(_)));
    }
}
