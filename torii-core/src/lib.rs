//! Primitive types shared across the Torii HDL core.
//!
//! This crate has no knowledge of values, statements or fragments; it only
//! provides the bit-level vocabulary that the rest of the workspace builds
//! on: [`Shape`], the arbitrary-width constant storage in [`bits`], and the
//! arena-identity newtype generator in [`id`].
#![cfg_attr(not(feature = "std"), no_std)]
#![deny(unsafe_code)]
#![deny(unused_must_use)]

extern crate alloc;

pub mod bits;
pub mod error;
pub mod id;
pub mod shape;

pub use bits::BitPattern;
pub use error::ShapeError;
pub use shape::Shape;

/// Hard ceiling on a single wire's width.
///
/// The original toolchain's choice of exactly 65536 is a pragmatic backstop
/// rather than a load-bearing constant; it is kept here as the default and
/// may be raised by a downstream consumer willing to accept wider wires.
pub const MAX_WIDTH: u32 = 1 << 16;
