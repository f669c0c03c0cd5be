//! Value-algebra error variants.

use thiserror::Error;

/// A [`crate::Value`] was used as an assignment target but does not satisfy
/// the legal-LHS grammar: only [`crate::Signal`]s and compositions of them
/// through `Slice`/`Cat`/`Part`/the transparent unary casts qualify.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("value is not a legal assignment target")]
pub struct LValueError;
