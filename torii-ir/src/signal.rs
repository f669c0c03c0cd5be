//! Named storage cells.

use alloc::{collections::BTreeMap, rc::Rc, string::String, vec::Vec};
use core::{
    hash::{Hash, Hasher},
    sync::atomic::{AtomicU32, Ordering},
};

use torii_core::{define_id, BitPattern, Shape};

define_id!(
    /// Stable identity of a [`Signal`], assigned once at construction and
    /// never reused. Driver sets, port maps and the emitter's wire table are
    /// all keyed on this rather than on [`Signal`] itself, so that ordered
    /// containers stay cheap to hash and compare.
    SignalId
);

static NEXT_SIGNAL_ID: AtomicU32 = AtomicU32::new(0);

fn allocate_signal_id() -> SignalId {
    SignalId::from_index(NEXT_SIGNAL_ID.fetch_add(1, Ordering::Relaxed))
}

/// Free-form attributes attached to a signal, cell or wire; carried through
/// to the RTLIL `attribute \name <const>` lines verbatim.
pub type Attrs = BTreeMap<String, String>;

/// Describes how an enum-like signal's values map back to member names, so
/// the emitter can attach `enum_base_type` / `enum_value_<bits>` attributes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decoder {
    /// Name of the source enum type, used for the `enum_base_type` attribute.
    pub base_type: String,
    /// Ordered `(bit pattern, member name)` pairs.
    pub variants: Vec<(BitPattern, String)>,
}

#[derive(Debug, Clone)]
struct SignalData {
    id: SignalId,
    shape: Shape,
    reset: BitPattern,
    reset_less: bool,
    name: String,
    attrs: Attrs,
    decoder: Option<Decoder>,
}

/// A [`crate::Value`] that is also a legal assignment target.
///
/// Signals are reference-counted handles over shared data; cloning a
/// `Signal` is cheap and yields another handle to the *same* identity.
/// Equality, ordering and hashing are all defined in terms of the
/// once-assigned [`SignalId`], never the signal's shape or name, matching
/// the source toolchain's object-identity semantics.
#[derive(Debug, Clone)]
pub struct Signal(Rc<SignalData>);

impl Signal {
    /// Construct a fresh signal with its own identity.
    pub fn new(name: impl Into<String>, shape: Shape) -> Self {
        let width = shape.width();
        Self(Rc::new(SignalData {
            id: allocate_signal_id(),
            reset: BitPattern::zero(width),
            shape,
            reset_less: false,
            name: name.into(),
            attrs: Attrs::new(),
            decoder: None,
        }))
    }

    /// Builder-style setter for the reset value. Panics if `reset`'s width
    /// does not match the signal's shape — this is a construction-time
    /// programmer error, not a runtime condition.
    #[must_use]
    pub fn with_reset(mut self, reset: BitPattern) -> Self {
        assert_eq!(reset.width(), self.0.shape.width(), "reset value width must match signal shape");
        Rc::make_mut(&mut self.0).reset = reset;
        self
    }

    /// Builder-style setter marking the signal as reset-less: synchronous
    /// logic driving it is never wrapped in a reset mux.
    #[must_use]
    pub fn reset_less(mut self) -> Self {
        Rc::make_mut(&mut self.0).reset_less = true;
        self
    }

    /// Builder-style setter attaching a free-form attribute.
    #[must_use]
    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        Rc::make_mut(&mut self.0).attrs.insert(key.into(), value.into());
        self
    }

    /// Builder-style setter attaching an enum decoder.
    #[must_use]
    pub fn with_decoder(mut self, decoder: Decoder) -> Self {
        Rc::make_mut(&mut self.0).decoder = Some(decoder);
        self
    }

    /// This signal's stable identity.
    pub fn id(&self) -> SignalId {
        self.0.id
    }

    /// Bit-vector shape.
    pub fn shape(&self) -> Shape {
        self.0.shape
    }

    /// Value latched when a synchronous driver's domain resets.
    pub fn reset_value(&self) -> &BitPattern {
        &self.0.reset
    }

    /// Whether a synchronous driver of this signal should skip reset logic.
    pub fn is_reset_less(&self) -> bool {
        self.0.reset_less
    }

    /// The name given at construction. Not necessarily unique — the
    /// emitter's `Namer` resolves collisions.
    pub fn name(&self) -> &str {
        &self.0.name
    }

    /// Free-form attributes.
    pub fn attrs(&self) -> &Attrs {
        &self.0.attrs
    }

    /// Enum decoder, if this signal was derived from an enum-like shape.
    pub fn decoder(&self) -> Option<&Decoder> {
        self.0.decoder.as_ref()
    }
}

impl PartialEq for Signal {
    fn eq(&self, other: &Self) -> bool {
        self.0.id == other.0.id
    }
}
impl Eq for Signal {}

impl PartialOrd for Signal {
    fn partial_cmp(&self, other: &Self) -> Option<core::cmp::Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for Signal {
    fn cmp(&self, other: &Self) -> core::cmp::Ordering {
        self.0.id.cmp(&other.0.id)
    }
}

impl Hash for Signal {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.id.hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn two_signals_with_the_same_name_are_distinct() {
        let a = Signal::new("x", Shape::unsigned(4).unwrap());
        let b = Signal::new("x", Shape::unsigned(4).unwrap());
        assert_ne!(a, b);
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn cloning_preserves_identity() {
        let a = Signal::new("x", Shape::unsigned(4).unwrap());
        let b = a.clone();
        assert_eq!(a, b);
    }

    #[test]
    #[should_panic(expected = "reset value width must match signal shape")]
    fn mismatched_reset_width_panics() {
        let _ = Signal::new("x", Shape::unsigned(4).unwrap()).with_reset(BitPattern::zero(8));
    }
}
