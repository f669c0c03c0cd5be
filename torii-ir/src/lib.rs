//! The Torii value algebra.
//!
//! A [`Value`] is an immutable node in a bit-vector expression DAG: a
//! constant, a named [`Signal`], an arithmetic or logical [`Operator`]
//! application, a slice, a dynamic part-select, a concatenation, an array
//! mux, or one of the handful of formal-only primitives. Construction never
//! normalizes or simplifies a tree — the RTLIL emitter downstream sees
//! exactly what was built here.
#![cfg_attr(not(feature = "std"), no_std)]
#![deny(unsafe_code)]
#![deny(unused_must_use)]

extern crate alloc;

mod error;
mod operator;
mod shape_of;
mod signal;
mod value;
mod visitor;

pub use error::LValueError;
pub use operator::{BinaryOperator, UnaryOperator};
pub use shape_of::shape_of;
pub use signal::{Attrs, Decoder, Signal, SignalId};
pub use torii_core::{BitPattern, Shape, ShapeError};
pub use value::{AnyKind, AnyValue, Const, Value, ValueRef};
pub use visitor::{visit, ValueVisitor};
