//! Rewrites [`torii_ir::Value::Sample`] into an explicit chain of
//! registers, clocked in the sampled domain, so that nothing downstream of
//! this pass ever has to special-case "value N cycles ago".

use alloc::{collections::BTreeMap, format, rc::Rc, string::String, vec::Vec};

use torii_core::Shape;
use torii_ir::{shape_of, Signal, Value, ValueRef, ValueVisitor};

use crate::{
    domain_key::DomainKey,
    statement::Statement,
    visitor::{visit_statements, StatementVisitor},
};

/// Lowers every `Sample` in `statements`, returning the rewritten tree with
/// the synthesized delay-register assignments appended.
pub fn lower_samples(statements: Vec<Statement>) -> Vec<Statement> {
    let mut lowering = SampleLowering::new();
    let mut out = visit_statements(&mut lowering, statements);
    out.extend(lowering.new_statements);
    out
}

struct SampleLowering {
    cache: BTreeMap<(usize, u32, String), ValueRef>,
    new_statements: Vec<Statement>,
    next_id: u32,
}

impl SampleLowering {
    fn new() -> Self {
        Self { cache: BTreeMap::new(), new_statements: Vec::new(), next_id: 0 }
    }
}

impl ValueVisitor for SampleLowering {
    fn rewrite(&mut self, value: Value) -> ValueRef {
        let Value::Sample { value, cycles, domain } = value else {
            return value.into_ref()
        };
        if cycles == 0 {
            return value
        }
        let key = (Rc::as_ptr(&value) as usize, cycles, domain.clone());
        if let Some(cached) = self.cache.get(&key) {
            return cached.clone()
        }
        let shape = shape_of(&value).unwrap_or_else(|_| Shape::unsigned(1).unwrap());
        let mut current = value;
        for _ in 0..cycles {
            self.next_id += 1;
            let delay = Signal::new(format!("$sample${}", self.next_id), shape);
            self.new_statements.push(Statement::Assign {
                lhs: Value::Signal(delay.clone()).into_ref(),
                rhs: current,
                domain: DomainKey::Sync(domain.clone()),
            });
            current = Value::Signal(delay).into_ref();
        }
        self.cache.insert(key, current.clone());
        current
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use torii_ir::shape_of;

    #[test]
    fn sample_zero_cycles_ago_is_the_value_itself() {
        let sig = Signal::new("x", Shape::unsigned(4).unwrap());
        let sampled = Value::Sample { value: Value::Signal(sig.clone()).into_ref(), cycles: 0, domain: "sync".into() };
        let statements = alloc::vec![Statement::Assign {
            lhs: Value::Signal(Signal::new("y", Shape::unsigned(4).unwrap())).into_ref(),
            rhs: sampled.into_ref(),
            domain: DomainKey::Comb,
        }];
        let lowered = lower_samples(statements);
        assert_eq!(lowered.len(), 1);
        let Statement::Assign { rhs, .. } = &lowered[0] else { panic!() };
        assert!(matches!(&**rhs, Value::Signal(s) if *s == sig));
    }

    #[test]
    fn sample_n_cycles_ago_synthesizes_a_delay_chain() {
        let sig = Signal::new("x", Shape::unsigned(4).unwrap());
        let sampled =
            Value::Sample { value: Value::Signal(sig).into_ref(), cycles: 3, domain: "sync".into() }.into_ref();
        let width = shape_of(&sampled).unwrap().width();
        assert_eq!(width, 4);
        let statements = alloc::vec![Statement::Assign {
            lhs: Value::Signal(Signal::new("y", Shape::unsigned(4).unwrap())).into_ref(),
            rhs: sampled,
            domain: DomainKey::Comb,
        }];
        let lowered = lower_samples(statements);
        // one original assignment plus three synthesized delay registers
        assert_eq!(lowered.len(), 4);
        assert!(lowered[1..].iter().all(|s| matches!(s, Statement::Assign { domain, .. } if domain.is_sync())));
    }
}
