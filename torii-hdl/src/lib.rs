//! The Torii structural IR.
//!
//! A [`Fragment`] is a node of the structural netlist: local statements
//! ([`Statement`]), the signals they drive per clock domain, the domains
//! themselves ([`ClockDomain`]), and any child fragments. [`Builder`]
//! constructs a fragment's statement tree without the source toolchain's
//! `with`-block scoping, which Rust has no direct analogue for. The
//! [`transforms`] module runs the ordered passes — sample lowering, domain
//! resolution and lowering, port propagation — that [`prepare::prepare`]
//! chains together before a fragment tree reaches the RTLIL emitter.
#![cfg_attr(not(feature = "std"), no_std)]
#![deny(unsafe_code)]
#![deny(unused_must_use)]

extern crate alloc;

mod builder;
mod clock_domain;
mod domain_key;
mod error;
mod fragment;
mod memory;
mod prepare;
mod statement;
pub mod transforms;
mod visitor;

pub use builder::Builder;
pub use clock_domain::{ClockDomain, ClockEdge};
pub use domain_key::DomainKey;
pub use error::{DomainError, DriverConflict, MemoryError, SrcLoc, SyntaxError, UnusedElaboratable};
pub use fragment::{Attrs, Direction, Fragment, FragmentKind, InstanceParam, SubFragment};
pub use memory::{MemoryInstance, ReadPort, WritePort};
pub use prepare::prepare;
pub use statement::{domains_in, Case, Pattern, PatternBit, PropertyKind, Statement};
pub use torii_ir::{self, shape_of, BinaryOperator, Shape, Signal, UnaryOperator, Value, ValueRef};
pub use visitor::{visit_statements, StatementVisitor};
