//! The `elaborate` entry point: chase an [`Elaboratable`] down to a
//! [`Fragment`], prepare it, and emit RTLIL.

use alloc::string::String;

use torii_hdl::{ClockDomain, DomainError, Fragment};

use crate::{
    elaboratable::{Elaboratable, Elaborated},
    error::ElaborationError,
    rtlil::{self, Design},
};

/// Delegation chains longer than this are almost certainly a cycle rather
/// than legitimate nesting.
const MAX_ELABORATION_HOPS: u32 = 64;

/// Chase `root.elaborate(platform)` through any delegation chain down to a
/// concrete [`Fragment`], then run the structural IR passes
/// ([`torii_hdl::prepare`]) that resolve clock domains and propagate ports.
///
/// `missing_domain` supplies a domain implicitly referenced but never
/// declared by an ancestor — see [`torii_hdl::prepare`].
#[tracing::instrument(level = "debug", skip_all, fields(platform = platform.unwrap_or("-")))]
pub fn elaborate(
    root: &dyn Elaboratable,
    platform: Option<&str>,
    missing_domain: &mut impl FnMut(&str) -> Result<ClockDomain, DomainError>,
) -> Result<Fragment, ElaborationError> {
    let mut current: Elaborated = root.elaborate(platform);
    for hop in 0..MAX_ELABORATION_HOPS {
        match current {
            Elaborated::Fragment(mut fragment) => {
                tracing::trace!(hop, "elaboration converged to a fragment");
                torii_hdl::prepare(&mut fragment, missing_domain)?;
                return Ok(fragment)
            }
            Elaborated::Elaboratable(next) => current = next.elaborate(platform),
        }
    }
    tracing::warn!(limit = MAX_ELABORATION_HOPS, "elaboration did not converge");
    Err(ElaborationError::DidNotConverge(MAX_ELABORATION_HOPS))
}

/// Elaborate `root` and emit it as an RTLIL design named `top_name`.
#[tracing::instrument(level = "debug", skip_all, fields(top_name))]
pub fn build(
    root: &dyn Elaboratable,
    platform: Option<&str>,
    top_name: &str,
    missing_domain: &mut impl FnMut(&str) -> Result<ClockDomain, DomainError>,
) -> Result<Design, ElaborationError> {
    let fragment = elaborate(root, platform, missing_domain)?;
    let design = rtlil::emit(&fragment, top_name).map_err(ElaborationError::from)?;
    tracing::debug!(ports = design.top_ports.len(), "RTLIL design emitted");
    Ok(design)
}

/// Convenience over [`build`] for designs with no clock domains beyond
/// `sync`/`comb` resolved with their conventional defaults (synchronous
/// reset, active-high, rising edge).
pub fn build_default(root: &dyn Elaboratable, top_name: &str) -> Result<Design, ElaborationError> {
    build(root, None, top_name, &mut |name: &str| ClockDomain::new(String::from(name), false, false))
}
