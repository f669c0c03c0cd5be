//! Arena-identity newtypes.
//!
//! Signals and fragments are compared by identity throughout the core, not
//! by structural equality. Rather than carry the source toolchain's
//! object-identity-by-reference idiom, every arena-allocated thing is given
//! a small `Copy` index into the arena that owns it.

/// Declare a `Copy` newtype wrapping a `u32` arena index, with the
/// constructor/accessor boilerplate every such id needs.
#[macro_export]
macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
        pub struct $name(u32);

        impl $name {
            /// Wrap a raw arena index. Only the arena that owns this id
            /// space should call this.
            pub const fn from_index(index: u32) -> Self {
                Self(index)
            }

            /// The raw arena index.
            pub const fn index(self) -> usize {
                self.0 as usize
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    define_id!(
        /// Test-only id.
        TestId
    );

    #[test]
    fn ids_are_distinguishable_by_index() {
        let a = TestId::from_index(0);
        let b = TestId::from_index(1);
        assert_ne!(a, b);
        assert_eq!(a.index(), 0);
        assert_eq!(b.index(), 1);
    }
}
