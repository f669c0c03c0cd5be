//! Torii: elaborate structural fragment trees and emit RTLIL netlists.
//!
//! A design implements [`Elaboratable`], producing a [`torii_hdl::Fragment`]
//! (possibly after delegating through other `Elaboratable`s). [`elaborate`]
//! chases that chain, runs the structural IR passes ([`torii_hdl::prepare`])
//! that resolve clock domains and propagate ports, and [`rtlil::emit`] turns
//! the result into RTLIL text a synthesis or formal tool can read directly.
#![cfg_attr(not(feature = "std"), no_std)]
#![deny(unsafe_code)]
#![deny(unused_must_use)]

extern crate alloc;

mod elaboratable;
mod error;
pub mod rtlil;
mod top;

pub use elaboratable::{Elaboratable, Elaborated};
pub use error::{ElaborationError, EmitError};
pub use rtlil::Design;
pub use top::{build, build_default, elaborate};

/// The commonly imported surface: `use torii::prelude::*;`.
pub mod prelude {
    pub use crate::{build, build_default, elaborate, Elaboratable, Elaborated};
    pub use torii_hdl::{
        Builder, Case, ClockDomain, ClockEdge, DomainKey, Fragment, MemoryInstance, Pattern, Statement,
    };
    pub use torii_ir::{BinaryOperator, Shape, Signal, UnaryOperator, Value};
}
