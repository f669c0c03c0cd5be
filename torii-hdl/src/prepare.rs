//! Runs the ordered IR passes over a whole fragment tree and validates the
//! result, producing the form the RTLIL emitter expects.

use crate::{
    clock_domain::ClockDomain,
    error::DomainError,
    fragment::{statements_drivers, Fragment},
    transforms::{lower_samples, propagate_domains, propagate_ports},
};

/// Lower samples, resolve and lower clock domains, then propagate ports,
/// validating the result.
///
/// `missing_domain` is invoked for any domain referenced but not defined by
/// an ancestor fragment — return a freshly constructed [`ClockDomain`] to
/// create it implicitly, or an error to make the reference fatal.
#[tracing::instrument(level = "debug", skip_all)]
pub fn prepare(
    fragment: &mut Fragment,
    missing_domain: &mut impl FnMut(&str) -> Result<ClockDomain, DomainError>,
) -> Result<(), DomainError> {
    lower_samples_recursive(fragment);
    tracing::trace!("samples lowered");
    propagate_domains(fragment, missing_domain)?;
    tracing::trace!(domains = fragment.domains().len(), "domains resolved and lowered");
    propagate_ports(fragment);
    tracing::trace!(ports = fragment.ports().len(), "ports propagated");
    fragment.validate()
}

fn lower_samples_recursive(fragment: &mut Fragment) {
    let statements = core::mem::take(fragment.statements_mut());
    fragment.set_statements(lower_samples(statements));
    // `set_statements` deliberately leaves `drivers` untouched; the
    // synthesized delay-register assignments this pass appends need to be
    // recorded there too, or `emit_registers` can never find their domain.
    for (domain, signals) in statements_drivers(fragment.statements()) {
        fragment.drivers_mut().entry(domain).or_default().extend(signals);
    }
    for sub in fragment.subfragments_mut() {
        lower_samples_recursive(&mut sub.fragment);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{domain_key::DomainKey, statement::Statement};
    use torii_core::Shape;
    use torii_ir::{Signal, Value};

    #[test]
    fn prepare_resolves_domains_and_propagates_ports() {
        let mut root = Fragment::new();
        let input = Signal::new("i", Shape::unsigned(4).unwrap());
        let output = Signal::new("o", Shape::unsigned(4).unwrap());
        root.add_statement(Statement::Assign {
            lhs: Value::Signal(output).into_ref(),
            rhs: Value::Signal(input.clone()).into_ref(),
            domain: DomainKey::Sync("sync".into()),
        });
        prepare(&mut root, &mut |name| ClockDomain::new(name, false, false)).unwrap();
        assert!(root.domains().contains_key("sync"));
        assert!(root.ports().contains_key(&input));
    }
}
