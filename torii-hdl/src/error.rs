//! Errors raised while building and preparing a fragment tree.

use alloc::string::String;
use thiserror::Error;

/// Where in the user's description an error or warning originated.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SrcLoc {
    /// Source file, as given by the caller (this core never reads a
    /// filesystem itself).
    pub file: String,
    /// 1-based line number.
    pub line: u32,
}

impl SrcLoc {
    /// Construct a location.
    pub fn new(file: impl Into<String>, line: u32) -> Self {
        Self { file: file.into(), line }
    }
}

/// Malformed DSL usage, always fatal to the elaboration that raised it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyntaxError {
    /// `m.next = ...` outside of any FSM state.
    #[error("'next' used outside of an FSM state ({0:?})")]
    NextOutsideFsm(SrcLoc),
    /// A `case` block opened without an enclosing `switch`.
    #[error("case opened outside of a switch ({0:?})")]
    CaseOutsideSwitch(SrcLoc),
    /// A `close_*` call with no matching `open_*` on the builder stack.
    #[error("unbalanced close: no open block to close ({0:?})")]
    UnbalancedClose(SrcLoc),
    /// An `open_*`/`close_*` pair that was never closed before `finish`.
    #[error("unbalanced open: {depth} block(s) still open at finish")]
    UnbalancedOpen {
        /// Number of still-open blocks.
        depth: usize,
    },
    /// A comb-only construct (e.g. a reset assertion) was tagged with the
    /// `comb` domain selector.
    #[error("construct requires a synchronous domain, not 'comb' ({0:?})")]
    CombDomainNotAllowed(SrcLoc),
    /// An assignment whose left-hand side is not a legal LHS value.
    #[error("value is not a legal assignment target ({0:?})")]
    InvalidLhs(SrcLoc),
    /// A case pattern's width did not match its switch's test width.
    #[error("case pattern width {found} does not match switch test width {expected} ({loc:?})")]
    PatternWidthMismatch {
        /// Width the pattern actually had.
        found: u32,
        /// Width the enclosing switch's test has.
        expected: u32,
        /// Where the pattern was written.
        loc: SrcLoc,
    },
    /// A pattern contained a character other than `0`, `1` or `-`.
    #[error("pattern {0:?} contains a character other than '0', '1' or '-' ({1:?})")]
    InvalidPatternChar(String, SrcLoc),
    /// An FSM's reset state was not among its declared states.
    #[error("FSM reset state {0:?} is not one of its declared states ({1:?})")]
    UnknownFsmState(String, SrcLoc),
}

/// Clock-domain errors, always fatal.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    /// A domain was referenced that no ancestor fragment defines and the
    /// missing-domain callback declined to provide.
    #[error("domain {0:?} is not defined and was not created by the missing-domain callback")]
    Undefined(String),
    /// Two sibling fragments tried to define a domain with the same name.
    #[error("domain {0:?} is defined more than once in the same scope")]
    Collision(String),
    /// A signal was driven in more than one domain within one fragment.
    #[error("signal {0:?} is driven in more than one domain")]
    MultiDomainDriver(String),
    /// A signal appears in the driver map but is neither assigned by a
    /// local statement nor a subfragment's output/inout port.
    #[error("signal {0:?} is recorded as driven but has no assignment or subfragment output port")]
    UnresolvedDriver(String),
    /// A reset-less domain's reset signal was referenced without
    /// `allow_reset_less`.
    #[error("domain {0:?} has no reset, but its reset was referenced")]
    NoReset(String),
}

/// A signal was driven in more than one statement where the last-writer-wins
/// rule may not reflect user intent. Never fatal — `prepare` still succeeds,
/// but callers should surface this to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverConflict {
    /// Name of the conflicting signal (for display; identity is tracked
    /// separately by the caller).
    pub signal_name: String,
    /// Locations of every contributing assignment, in source order.
    pub locations: alloc::vec::Vec<SrcLoc>,
}

/// An `Elaboratable` was constructed but never attached to a fragment tree.
/// Never fatal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnusedElaboratable {
    /// Where the elaboratable was constructed, if known.
    pub loc: Option<SrcLoc>,
}

/// Malformed memory port configuration, always fatal.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MemoryError {
    /// A read or write port's data signal width did not match the memory's.
    #[error("port data width {found} does not match memory {memory:?} width {expected}")]
    DataWidthMismatch {
        /// Name of the offending memory.
        memory: String,
        /// Width the port's data actually had.
        found: u32,
        /// The memory's configured width.
        expected: u32,
    },
    /// A write port's granularity did not evenly divide the memory's width.
    #[error("write port granularity {granularity} does not divide memory {memory:?} width {width}")]
    BadGranularity {
        /// Name of the offending memory.
        memory: String,
        /// The requested granularity.
        granularity: u32,
        /// The memory's configured width.
        width: u32,
    },
    /// An `init` list had more entries than the memory has rows.
    #[error("memory {memory:?} has depth {depth} but {len} initial values were given")]
    InitTooLong {
        /// Name of the offending memory.
        memory: String,
        /// The memory's configured depth.
        depth: u32,
        /// Number of initial values given.
        len: usize,
    },
}
