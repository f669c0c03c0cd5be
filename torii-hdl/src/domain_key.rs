//! The `⊥`-or-named-domain key used to tag drivers and assignments.

use alloc::string::String;
use core::fmt;

/// Which domain a driver or assignment belongs to: combinational (written
/// `⊥`) or a named synchronous domain.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DomainKey {
    /// Combinational — driven continuously, no clock involved.
    Comb,
    /// Synchronous, driven on the named domain's active clock edge.
    Sync(String),
}

impl DomainKey {
    /// The domain name, if this key names a synchronous domain.
    pub fn name(&self) -> Option<&str> {
        match self {
            DomainKey::Comb => None,
            DomainKey::Sync(name) => Some(name),
        }
    }

    /// `true` for [`DomainKey::Sync`].
    pub fn is_sync(&self) -> bool {
        matches!(self, DomainKey::Sync(_))
    }
}

impl fmt::Display for DomainKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DomainKey::Comb => f.write_str("comb"),
            DomainKey::Sync(name) => f.write_str(name),
        }
    }
}

impl From<&str> for DomainKey {
    fn from(name: &str) -> Self {
        if name == "comb" {
            DomainKey::Comb
        } else {
            DomainKey::Sync(name.into())
        }
    }
}
