//! Resolves every clock domain referenced (by name) in a fragment tree to a
//! [`ClockDomain`] defined by an ancestor, calling back into the caller for
//! any that are missing instead of failing outright — mirroring the source
//! toolchain's "create it lazily unless the platform forbids that" policy.

use alloc::{collections::BTreeMap, string::String, vec::Vec};

use crate::{
    clock_domain::ClockDomain, error::DomainError, fragment::Fragment, transforms::domain_lowering::lower_domains,
};

/// Walk `fragment` and its descendants, collecting every domain name
/// referenced by a statement or a local clock-domain definition that isn't
/// satisfied by an ancestor. `missing` is invoked once per distinct missing
/// name, in first-seen order, and must return the domain to use or an error
/// to abort with.
///
/// Once a fragment's domain scope is fully resolved, its statements are
/// immediately passed through [`lower_domains`] against that scope — domain
/// lowering needs exactly the resolved scope this pass computes, so there is
/// no benefit to a separate tree walk after this one.
pub fn propagate_domains(
    fragment: &mut Fragment,
    missing: &mut impl FnMut(&str) -> Result<ClockDomain, DomainError>,
) -> Result<(), DomainError> {
    propagate(fragment, &mut BTreeMap::new(), missing)
}

fn propagate(
    fragment: &mut Fragment,
    scope: &mut BTreeMap<String, ClockDomain>,
    missing: &mut impl FnMut(&str) -> Result<ClockDomain, DomainError>,
) -> Result<(), DomainError> {
    for (name, domain) in fragment.domains() {
        if scope.contains_key(name) {
            return Err(DomainError::Collision(name.clone()))
        }
        let _ = domain;
    }
    let mut local_scope = scope.clone();
    for (name, domain) in fragment.domains() {
        local_scope.insert(name.clone(), domain.clone());
    }

    let referenced: Vec<String> = fragment
        .domains_in_statements()
        .into_iter()
        .filter_map(|key| key.name().map(alloc::string::ToString::to_string))
        .collect();

    for name in referenced {
        if local_scope.contains_key(&name) {
            continue
        }
        let domain = missing(&name)?;
        fragment.add_domain(domain.clone())?;
        local_scope.insert(name, domain);
    }

    let statements = core::mem::take(fragment.statements_mut());
    fragment.set_statements(lower_domains(statements, &local_scope));

    for sub in fragment.subfragments_mut() {
        propagate(&mut sub.fragment, &mut local_scope, missing)?;
    }
    Ok(())
}
