//! The elaboration protocol: anything that can lower itself to a
//! [`Fragment`], possibly by delegating to another `Elaboratable` first.

use alloc::boxed::Box;

use torii_hdl::Fragment;

/// What `elaborate` produced: either a finished fragment, or another
/// elaboratable to chase further.
pub enum Elaborated {
    /// A finished structural fragment.
    Fragment(Fragment),
    /// Delegate to another elaboratable — `prepare` keeps chasing until it
    /// gets a [`Elaborated::Fragment`] or hits its hop limit.
    Elaboratable(Box<dyn Elaboratable>),
}

/// A design that can lower itself to structural IR.
///
/// `platform` names the target platform (`"ice40"`, `"ecp5"`, ...) or is
/// `None` for a platform-independent elaboration; an implementation is free
/// to ignore it entirely, or to return different structure per platform
/// (e.g. a vendor-specific I/O buffer instance instead of generic logic).
pub trait Elaboratable {
    /// Produce this design's structure, or delegate to a sub-design.
    fn elaborate(&self, platform: Option<&str>) -> Elaborated;
}

impl Elaboratable for Fragment {
    fn elaborate(&self, _platform: Option<&str>) -> Elaborated {
        Elaborated::Fragment(self.clone())
    }
}
