//! Shape-level error variants.

use alloc::string::String;
use thiserror::Error;

/// Errors raised while constructing or combining [`crate::Shape`]s.
///
/// These are always fatal: a malformed shape can never be lowered to a
/// wire, so construction fails before any fragment is built.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ShapeError {
    /// A shape with signed-ness but zero width was requested.
    #[error("signed shape cannot have width 0")]
    ZeroWidthSigned,
    /// A shape width exceeds the configured wire-width ceiling.
    #[error("shape width {width} exceeds the maximum of {max}")]
    WidthOverflow {
        /// The width that was requested.
        width: u32,
        /// The ceiling that was exceeded.
        max: u32,
    },
    /// A range passed to [`crate::Shape::from_range`] was empty or inverted.
    #[error("range {0}..{1} cannot be represented as a shape")]
    EmptyRange(i64, i64),
    /// An enum-like set of named constants was empty.
    #[error("enum {0:?} has no members to derive a shape from")]
    EmptyEnum(String),
}
