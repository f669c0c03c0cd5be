//! Errors surfaced by elaboration and RTLIL emission.

use alloc::string::String;
use thiserror::Error;

use torii_hdl::DomainError;

/// Anything that can go wrong between `elaborate()` being called and a
/// netlist being emitted.
#[derive(Debug, Error)]
pub enum ElaborationError {
    /// `elaborate` kept returning another `Elaboratable` past the hop
    /// limit — almost certainly a cycle (`A` delegates to `B` delegates
    /// back to `A`), since legitimate delegation chains are shallow.
    #[error("elaboration did not converge to a fragment within {0} hops")]
    DidNotConverge(u32),
    /// A clock-domain error surfaced while preparing the fragment tree.
    #[error(transparent)]
    Domain(#[from] DomainError),
    /// The emitter encountered a value it cannot lower.
    #[error(transparent)]
    Emit(#[from] EmitError),
}

/// Errors raised while compiling a prepared fragment tree to RTLIL text.
#[derive(Debug, Error)]
pub enum EmitError {
    /// A `Sample` value reached the emitter unlowered — `prepare` should
    /// have rewritten every one of these before handoff.
    #[error("unlowered Sample value reached the RTLIL emitter")]
    UnloweredSample,
    /// A `ResetSignal` referenced a reset-less domain without
    /// `allow_reset_less`.
    #[error("domain {0:?} has no reset, but its reset was referenced")]
    NoReset(String),
    /// A `ClockSignal`/`ResetSignal` named a domain that isn't in scope.
    #[error("domain {0:?} is not defined in this fragment's scope")]
    UnknownDomain(String),
    /// An assignment's left-hand side used a construct this emitter does
    /// not lower: a dynamic `Part`/`ArrayProxy` as an assignment target.
    /// Supporting this needs a write-side legalization mux-tree symmetric
    /// to the read-side one `compile_rhs` already builds; no construct in
    /// the test corpus exercises it, so it is left unimplemented rather
    /// than shipped untested.
    #[error("dynamic part-select or array-proxy writes are not supported as assignment targets")]
    UnsupportedDynamicLhs,
    /// Two subfragments of the same parent were given the same instance
    /// name.
    #[error("duplicate subfragment name {0:?}")]
    DuplicateSubfragmentName(String),
}
