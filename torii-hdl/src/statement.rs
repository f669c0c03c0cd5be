//! The sequential-logic AST: assignments, priority switches and formal
//! properties.

use alloc::{string::String, vec::Vec};

use torii_ir::ValueRef;

use crate::{domain_key::DomainKey, error::SyntaxError};

/// A single character of a switch case pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternBit {
    /// Must be `0`.
    Zero,
    /// Must be `1`.
    One,
    /// Matches either.
    DontCare,
}

/// A fixed-width bit pattern over `{0, 1, -}`, matched MSB-first against a
/// switch's test value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern(Vec<PatternBit>);

impl Pattern {
    /// Parse a pattern string such as `"1--0"`. `loc` is attached to any
    /// error for diagnostics.
    pub fn parse(s: &str, loc: crate::error::SrcLoc) -> Result<Self, SyntaxError> {
        let mut bits = Vec::with_capacity(s.len());
        for c in s.chars() {
            bits.push(match c {
                '0' => PatternBit::Zero,
                '1' => PatternBit::One,
                '-' => PatternBit::DontCare,
                _ => return Err(SyntaxError::InvalidPatternChar(s.into(), loc)),
            });
        }
        Ok(Self(bits))
    }

    /// Pattern made entirely of don't-cares, the width of `width`. Used for
    /// default/else branches and for the legalization fallthrough case.
    pub fn wildcard(width: u32) -> Self {
        Self(alloc::vec![PatternBit::DontCare; width as usize])
    }

    /// Number of bits in this pattern.
    pub fn width(&self) -> u32 {
        self.0.len() as u32
    }

    /// Render MSB-first, the exact text the emitter writes after `case`.
    pub fn render(&self) -> String {
        self.0
            .iter()
            .map(|b| match b {
                PatternBit::Zero => '0',
                PatternBit::One => '1',
                PatternBit::DontCare => '-',
            })
            .collect()
    }

    /// `true` if `bits` (MSB-first, same width) matches this pattern.
    pub fn matches(&self, bits: &[bool]) -> bool {
        self.0.len() == bits.len()
            && self.0.iter().zip(bits).all(|(pat, &bit)| match pat {
                PatternBit::DontCare => true,
                PatternBit::Zero => !bit,
                PatternBit::One => bit,
            })
    }

    /// `true` if `self` and `other` could both match some common input —
    /// used only for diagnostics, never to merge cases (the earlier case
    /// always wins regardless of overlap).
    pub fn overlaps(&self, other: &Self) -> bool {
        self.0.len() == other.0.len()
            && self.0.iter().zip(&other.0).all(|(a, b)| {
                matches!(a, PatternBit::DontCare) || matches!(b, PatternBit::DontCare) || a == b
            })
    }
}

/// One `switch` arm: a set of alternative patterns (any one matching fires
/// the body) and the statements that run when it does.
#[derive(Debug, Clone, PartialEq)]
pub struct Case {
    /// Alternative patterns; empty means "matches anything" (a `default`).
    pub patterns: Vec<Pattern>,
    /// Statements to run.
    pub body: Vec<Statement>,
}

impl Case {
    /// `true` if this is an unconditional default arm.
    pub fn is_default(&self) -> bool {
        self.patterns.is_empty()
    }
}

/// What kind of formal property a [`Statement::Property`] checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyKind {
    /// Must always hold when `enable` is asserted.
    Assert,
    /// Constrains the solver: assumed to hold whenever `enable` is asserted.
    Assume,
    /// Tracked for coverage; never constrains or fails a proof.
    Cover,
}

/// A node of the sequential-logic AST. Statement lists are ordered; for two
/// assignments to the same signal within one execution path, the later one
/// in source order wins.
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    /// `lhs <= rhs` (or `lhs = rhs` for comb), tagged with the domain that
    /// was selected when it was recorded.
    Assign { lhs: ValueRef, rhs: ValueRef, domain: DomainKey },
    /// A priority-ordered set of cases matched against `test`.
    Switch { test: ValueRef, cases: Vec<Case> },
    /// A formal assertion, assumption or cover point.
    Property { kind: PropertyKind, test: ValueRef, enable: ValueRef, name: Option<String> },
}

/// Walk a statement list and collect every domain referenced by an
/// [`Statement::Assign`], in first-seen order.
pub fn domains_in(statements: &[Statement]) -> Vec<DomainKey> {
    let mut seen = Vec::new();
    fn walk(statements: &[Statement], seen: &mut Vec<DomainKey>) {
        for stmt in statements {
            match stmt {
                Statement::Assign { domain, .. } => {
                    if !seen.contains(domain) {
                        seen.push(domain.clone());
                    }
                }
                Statement::Switch { cases, .. } => {
                    for case in cases {
                        walk(&case.body, seen);
                    }
                }
                Statement::Property { .. } => {}
            }
        }
    }
    walk(statements, &mut seen);
    seen
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SrcLoc;

    #[test]
    fn pattern_parses_and_matches() {
        let p = Pattern::parse("-1-", SrcLoc::default()).unwrap();
        assert!(p.matches(&[false, true, false]));
        assert!(p.matches(&[true, true, true]));
        assert!(!p.matches(&[true, false, true]));
    }

    #[test]
    fn invalid_pattern_char_is_rejected() {
        assert!(Pattern::parse("1x0", SrcLoc::default()).is_err());
    }

    #[test]
    fn overlapping_patterns_are_detected() {
        let a = Pattern::parse("--1", SrcLoc::default()).unwrap();
        let b = Pattern::parse("-1-", SrcLoc::default()).unwrap();
        let c = Pattern::parse("1--", SrcLoc::default()).unwrap();
        assert!(a.overlaps(&b));
        assert!(b.overlaps(&c));
    }
}
