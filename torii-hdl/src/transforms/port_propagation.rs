//! Bubbles undriven signals up through the fragment tree as input ports,
//! and exposes driven signals a parent reads as output ports.

use alloc::{collections::BTreeSet, vec::Vec};

use torii_ir::Signal;

use crate::{
    fragment::{Direction, Fragment},
    statement::{Case, Statement},
};

/// Recompute every fragment's port map bottom-up: a signal read but not
/// locally driven becomes an `In` port; a child's unsatisfied `In` port
/// becomes this fragment's `In` port in turn, unless this fragment drives
/// it itself; a signal a child drives that this fragment (or a sibling)
/// reads becomes that child's `Out` port, or `InOut` if this fragment
/// drives it too.
pub fn propagate_ports(fragment: &mut Fragment) {
    for sub in fragment.subfragments_mut() {
        propagate_ports(&mut sub.fragment);
    }

    let locally_driven: BTreeSet<Signal> = fragment.drivers().values().flatten().cloned().collect();

    let mut needed: BTreeSet<Signal> = BTreeSet::new();
    collect_rhs_signals(fragment.statements(), &mut needed);
    for sub in fragment.subfragments() {
        for (signal, direction) in sub.fragment.ports() {
            if matches!(direction, Direction::In) {
                needed.insert(signal.clone());
            }
        }
    }

    for sub in fragment.subfragments_mut() {
        let child_driven: Vec<Signal> = sub.fragment.drivers().values().flatten().cloned().collect();
        for signal in child_driven {
            if needed.contains(&signal) {
                let direction = if locally_driven.contains(&signal) { Direction::InOut } else { Direction::Out };
                sub.fragment.set_port(signal, direction);
            }
        }
    }

    // A sibling's promoted output satisfies the read within this module's
    // own netlist; it must not also become this fragment's own `In` port.
    let sibling_driven: BTreeSet<Signal> =
        fragment.subfragments().iter().flat_map(|sub| sub.fragment.drivers().values().flatten().cloned()).collect();

    for signal in needed {
        if !locally_driven.contains(&signal) && !sibling_driven.contains(&signal) && !fragment.ports().contains_key(&signal) {
            fragment.set_port(signal, Direction::In);
        }
    }
}

fn collect_rhs_signals(statements: &[Statement], out: &mut BTreeSet<Signal>) {
    for stmt in statements {
        match stmt {
            Statement::Assign { rhs, .. } => out.extend(rhs.rhs_signals()),
            Statement::Switch { test, cases } => {
                out.extend(test.rhs_signals());
                for case in cases {
                    collect_case(case, out);
                }
            }
            Statement::Property { test, enable, .. } => {
                out.extend(test.rhs_signals());
                out.extend(enable.rhs_signals());
            }
        }
    }
}

fn collect_case(case: &Case, out: &mut BTreeSet<Signal>) {
    collect_rhs_signals(&case.body, out);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain_key::DomainKey;
    use torii_core::Shape;
    use torii_ir::Value;

    #[test]
    fn a_signal_read_but_not_driven_becomes_an_input_port() {
        let mut frag = Fragment::new();
        let a = Signal::new("a", Shape::unsigned(4).unwrap());
        let o = Signal::new("o", Shape::unsigned(4).unwrap());
        frag.add_statement(Statement::Assign {
            lhs: Value::Signal(o).into_ref(),
            rhs: Value::Signal(a.clone()).into_ref(),
            domain: DomainKey::Comb,
        });
        propagate_ports(&mut frag);
        assert_eq!(frag.ports().get(&a), Some(&Direction::In));
    }

    #[test]
    fn a_childs_unsatisfied_input_bubbles_up() {
        let mut parent = Fragment::new();
        let mut child = Fragment::new();
        let x = Signal::new("x", Shape::unsigned(1).unwrap());
        child.set_port(x.clone(), Direction::In);
        parent.add_subfragment(child, None);
        propagate_ports(&mut parent);
        assert_eq!(parent.ports().get(&x), Some(&Direction::In));
    }

    #[test]
    fn a_signal_a_child_drives_and_the_parent_reads_becomes_an_output_port() {
        let mut parent = Fragment::new();
        let mut child = Fragment::new();
        let y = Signal::new("y", Shape::unsigned(4).unwrap());
        let o = Signal::new("o", Shape::unsigned(4).unwrap());
        child.add_statement(Statement::Assign {
            lhs: Value::Signal(y.clone()).into_ref(),
            rhs: Value::Signal(Signal::new("x", Shape::unsigned(4).unwrap())).into_ref(),
            domain: DomainKey::Comb,
        });
        parent.add_subfragment(child, None);
        parent.add_statement(Statement::Assign {
            lhs: Value::Signal(o).into_ref(),
            rhs: Value::Signal(y.clone()).into_ref(),
            domain: DomainKey::Comb,
        });
        propagate_ports(&mut parent);
        assert_eq!(parent.subfragments()[0].fragment.ports().get(&y), Some(&Direction::Out));
        assert!(!parent.ports().contains_key(&y));
    }

    #[test]
    fn a_locally_driven_signal_is_not_promoted_to_a_port() {
        let mut parent = Fragment::new();
        let x = Signal::new("x", Shape::unsigned(1).unwrap());
        parent.add_statement(Statement::Assign {
            lhs: Value::Signal(x.clone()).into_ref(),
            rhs: Value::Signal(Signal::new("y", Shape::unsigned(1).unwrap())).into_ref(),
            domain: DomainKey::Comb,
        });
        let mut child = Fragment::new();
        child.set_port(x.clone(), Direction::In);
        parent.add_subfragment(child, None);
        propagate_ports(&mut parent);
        assert!(!parent.ports().contains_key(&x));
    }
}
