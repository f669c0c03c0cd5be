//! Named `(clock, reset)` pairs that govern synchronous logic.

use alloc::string::String;

use torii_core::Shape;
use torii_ir::Signal;

use crate::error::DomainError;

/// Which edge of the clock a domain's synchronous logic is sensitive to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClockEdge {
    /// Rising edge.
    Pos,
    /// Falling edge.
    Neg,
}

/// A named `(clock, reset)` pair governing every signal driven in it.
#[derive(Debug, Clone)]
pub struct ClockDomain {
    name: String,
    clock: Signal,
    reset: Option<Signal>,
    async_reset: bool,
    clock_edge: ClockEdge,
    local: bool,
}

impl ClockDomain {
    /// Construct a domain named `name` with a clock and, unless
    /// `reset_less`, a reset signal of the same naming convention.
    ///
    /// Returns [`DomainError::NoReset`] if `async_reset` is requested for a
    /// `reset_less` domain — an async reset is meaningless without a reset
    /// signal to be asynchronous about.
    pub fn new(name: impl Into<String>, reset_less: bool, async_reset: bool) -> Result<Self, DomainError> {
        let name = name.into();
        if reset_less && async_reset {
            return Err(DomainError::NoReset(name))
        }
        let clock = Signal::new(alloc::format!("{name}_clk"), Shape::unsigned(1).unwrap());
        let reset =
            (!reset_less).then(|| Signal::new(alloc::format!("{name}_rst"), Shape::unsigned(1).unwrap()));
        Ok(Self { name, clock, reset, async_reset, clock_edge: ClockEdge::Pos, local: false })
    }

    /// Builder-style setter for the clock edge.
    #[must_use]
    pub fn with_clock_edge(mut self, edge: ClockEdge) -> Self {
        self.clock_edge = edge;
        self
    }

    /// Builder-style setter marking the domain local to the fragment that
    /// defines it — it will not propagate to the parent.
    #[must_use]
    pub fn local(mut self) -> Self {
        self.local = true;
        self
    }

    /// The domain's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The domain's clock signal.
    pub fn clock(&self) -> &Signal {
        &self.clock
    }

    /// The domain's reset signal, if it has one.
    pub fn reset(&self) -> Option<&Signal> {
        self.reset.as_ref()
    }

    /// `true` if synchronous logic in this domain resets asynchronously.
    pub fn is_async_reset(&self) -> bool {
        self.async_reset
    }

    /// `true` if the domain has no reset signal at all.
    pub fn is_reset_less(&self) -> bool {
        self.reset.is_none()
    }

    /// Which edge synchronous logic in this domain triggers on.
    pub fn clock_edge(&self) -> ClockEdge {
        self.clock_edge
    }

    /// `true` if this domain does not propagate outward to the parent
    /// fragment that instantiates its owner.
    pub fn is_local(&self) -> bool {
        self.local
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reset_less_async_domain_is_rejected() {
        assert_eq!(ClockDomain::new("sync", true, true), Err(DomainError::NoReset("sync".into())));
    }

    #[test]
    fn reset_less_domain_has_no_reset_signal() {
        let d = ClockDomain::new("sync", true, false).unwrap();
        assert!(d.reset().is_none());
        assert!(d.is_reset_less());
    }

    #[test]
    fn default_domain_has_a_positive_edge_sync_reset() {
        let d = ClockDomain::new("sync", false, false).unwrap();
        assert!(d.reset().is_some());
        assert!(!d.is_async_reset());
        assert_eq!(d.clock_edge(), ClockEdge::Pos);
    }
}
