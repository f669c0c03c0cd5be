//! RTLIL netlist emission: turn a prepared [`torii_hdl::Fragment`] tree into
//! the text format `yosys` reads with `read_rtlil`.

mod design;
mod module;
mod namer;
mod sigspec;

pub use design::{emit, Design};
