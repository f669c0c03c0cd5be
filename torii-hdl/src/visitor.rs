//! Bottom-up rewriting of a [`Statement`] tree, mirroring
//! [`torii_ir::ValueVisitor`] at the statement level.

use alloc::vec::Vec;

use torii_ir::ValueRef;

use crate::statement::{Case, Statement};

/// Rewrites a statement tree one node at a time. The default methods are the
/// identity; override only what you need to change.
///
/// Implementors typically delegate `rewrite_value` to [`torii_ir::visit`]
/// with their own [`torii_ir::ValueVisitor`], since most transforms act on
/// the value DAG and only incidentally touch statement shape.
pub trait StatementVisitor {
    /// Rewrite a value appearing in `Assign`'s LHS/RHS or a `Switch`'s test
    /// or a `Property`'s test/enable.
    fn rewrite_value(&mut self, value: ValueRef) -> ValueRef {
        value
    }

    /// Rewrite a fully-reconstructed statement (children already visited).
    fn rewrite_statement(&mut self, statement: Statement) -> Statement {
        statement
    }
}

/// Apply `visitor` to every statement in `statements`, bottom-up: children
/// are rewritten before the statement that contains them.
pub fn visit_statements(visitor: &mut impl StatementVisitor, statements: Vec<Statement>) -> Vec<Statement> {
    statements.into_iter().map(|stmt| visit_statement(visitor, stmt)).collect()
}

fn visit_statement(visitor: &mut impl StatementVisitor, statement: Statement) -> Statement {
    let rebuilt = match statement {
        Statement::Assign { lhs, rhs, domain } => {
            Statement::Assign { lhs: visitor.rewrite_value(lhs), rhs: visitor.rewrite_value(rhs), domain }
        }
        Statement::Switch { test, cases } => {
            let test = visitor.rewrite_value(test);
            let cases = cases
                .into_iter()
                .map(|case| Case { patterns: case.patterns, body: visit_statements(visitor, case.body) })
                .collect();
            Statement::Switch { test, cases }
        }
        Statement::Property { kind, test, enable, name } => Statement::Property {
            kind,
            test: visitor.rewrite_value(test),
            enable: visitor.rewrite_value(enable),
            name,
        },
    };
    visitor.rewrite_statement(rebuilt)
}
