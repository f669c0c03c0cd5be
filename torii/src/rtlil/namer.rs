//! Collision-resolving identifier allocation, scoped to one RTLIL module.

use alloc::{
    collections::BTreeSet,
    format,
    string::{String, ToString},
};

/// Assigns RTLIL identifiers within a single module: `\name` for
/// user-named wires, `$kind$n` for compiler-synthesized wires and cells.
/// Collisions are resolved by appending a numeric suffix, matching the
/// source toolchain's `NameManager`.
#[derive(Debug, Default)]
pub struct Namer {
    used: BTreeSet<String>,
    next_auto: u32,
}

impl Namer {
    /// A fresh namer with no names reserved yet.
    pub fn new() -> Self {
        Self { used: BTreeSet::new(), next_auto: 0 }
    }

    /// Reserve a public name derived from `hint`, prefixed with `\`.
    /// Collisions get `_2`, `_3`, ... appended.
    pub fn public(&mut self, hint: &str) -> String {
        let sanitized = sanitize(hint);
        self.unique(format!("\\{sanitized}"))
    }

    /// Allocate a fresh compiler-private name, `$<kind>$<n>`.
    pub fn auto(&mut self, kind: &str) -> String {
        loop {
            self.next_auto += 1;
            let candidate = format!("${kind}${}", self.next_auto);
            if self.used.insert(candidate.clone()) {
                return candidate
            }
        }
    }

    fn unique(&mut self, base: String) -> String {
        if self.used.insert(base.clone()) {
            return base
        }
        let mut n = 1u32;
        loop {
            n += 1;
            let candidate = format!("{base}_{n}");
            if self.used.insert(candidate.clone()) {
                return candidate
            }
        }
    }
}

/// Strip the leading `\` from a public RTLIL identifier, for display in a
/// host-facing name map. Identifiers without the prefix (already `$`-auto,
/// or already bare) pass through unchanged.
pub fn display_name(rtlil_name: &str) -> String {
    rtlil_name.strip_prefix('\\').unwrap_or(rtlil_name).to_string()
}

fn sanitize(name: &str) -> String {
    if name.is_empty() {
        return "_".to_string()
    }
    name.chars().map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == '$' { c } else { '_' }).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn colliding_public_names_get_numbered() {
        let mut namer = Namer::new();
        assert_eq!(namer.public("q"), "\\q");
        assert_eq!(namer.public("q"), "\\q_2");
        assert_eq!(namer.public("q"), "\\q_3");
    }

    #[test]
    fn auto_names_never_collide_with_public_ones() {
        let mut namer = Namer::new();
        let auto = namer.auto("add");
        assert!(auto.starts_with("$add$"));
        assert_ne!(namer.public(&auto[1..]), auto);
    }

    #[test]
    fn display_name_strips_the_backslash() {
        assert_eq!(display_name("\\counter"), "counter");
        assert_eq!(display_name("$add$3"), "$add$3");
    }
}
