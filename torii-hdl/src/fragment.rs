//! [`Fragment`]: the unit of module emission.

use alloc::{
    collections::{BTreeMap, BTreeSet},
    string::String,
    vec::Vec,
};

use torii_core::BitPattern;
use torii_ir::{Signal, Value, ValueRef};

use crate::{
    clock_domain::ClockDomain,
    domain_key::DomainKey,
    error::{DomainError, SrcLoc},
    memory::MemoryInstance,
    statement::{domains_in, Statement},
};

/// Free-form attributes, as on [`torii_ir::Signal`].
pub type Attrs = BTreeMap<String, String>;

/// Port direction as seen from outside the fragment that declares it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Driven by the parent, read inside.
    In,
    /// Driven inside, read by the parent.
    Out,
    /// Driven and read on both sides (tristate-style).
    InOut,
}

/// A constant cell parameter: an `Instance`'s parameters are a small,
/// heterogeneous bag of these.
#[derive(Debug, Clone, PartialEq)]
pub enum InstanceParam {
    /// A plain integer parameter.
    Int(i64),
    /// A string parameter, emitted double-quoted and escaped.
    Str(String),
    /// A bit-vector parameter, emitted as an RTLIL constant.
    Bits(BitPattern),
}

/// What kind of thing a [`Fragment`] emits to.
#[derive(Debug, Clone, PartialEq)]
pub enum FragmentKind {
    /// Ordinary logic: statements lower to processes and registers.
    Logic,
    /// An opaque cell instantiation (`Instance("sb_io", ...)`): no
    /// statements, just a cell type, parameters and port connections.
    Instance {
        /// RTLIL cell type, e.g. `"$dff"` or a vendor primitive name.
        cell_type: String,
        /// Named parameters.
        parameters: BTreeMap<String, InstanceParam>,
        /// Named port connections and their direction.
        ports: BTreeMap<String, (ValueRef, Direction)>,
    },
    /// A multi-port memory.
    Memory(MemoryInstance),
}

/// A child fragment and the instance name it was given (or `None` for an
/// anonymous one, which the emitter names itself).
#[derive(Debug, Clone, PartialEq)]
pub struct SubFragment {
    /// The nested fragment.
    pub fragment: Fragment,
    /// User-given instance name, if any.
    pub name: Option<String>,
}

/// A node of the structural IR: local statements, the signals they drive,
/// the clock domains they reference, and any child fragments.
#[derive(Debug, Clone, PartialEq)]
pub struct Fragment {
    kind: FragmentKind,
    statements: Vec<Statement>,
    drivers: BTreeMap<DomainKey, BTreeSet<Signal>>,
    domains: BTreeMap<String, ClockDomain>,
    subfragments: Vec<SubFragment>,
    ports: BTreeMap<Signal, Direction>,
    attrs: Attrs,
    flatten: bool,
    src_loc: Option<SrcLoc>,
}

impl Fragment {
    /// A fresh, empty logic fragment.
    pub fn new() -> Self {
        Self {
            kind: FragmentKind::Logic,
            statements: Vec::new(),
            drivers: BTreeMap::new(),
            domains: BTreeMap::new(),
            subfragments: Vec::new(),
            ports: BTreeMap::new(),
            attrs: Attrs::new(),
            flatten: false,
            src_loc: None,
        }
    }

    /// Construct an `Instance` fragment.
    pub fn instance(
        cell_type: impl Into<String>,
        parameters: BTreeMap<String, InstanceParam>,
        ports: BTreeMap<String, (ValueRef, Direction)>,
    ) -> Self {
        Self { kind: FragmentKind::Instance { cell_type: cell_type.into(), parameters, ports }, ..Self::new() }
    }

    /// Construct a `Memory` fragment.
    pub fn memory(memory: MemoryInstance) -> Self {
        Self { kind: FragmentKind::Memory(memory), ..Self::new() }
    }

    /// This fragment's kind.
    pub fn kind(&self) -> &FragmentKind {
        &self.kind
    }

    /// Append a statement to the local statement tree, recording every
    /// signal it drives into the appropriate domain's driver set.
    pub fn add_statement(&mut self, statement: Statement) {
        for domain in statements_drivers(core::slice::from_ref(&statement)) {
            let (domain_key, signals) = domain;
            self.drivers.entry(domain_key).or_default().extend(signals);
        }
        self.statements.push(statement);
    }

    /// The local statement tree.
    pub fn statements(&self) -> &[Statement] {
        &self.statements
    }

    /// Replace the statement tree wholesale — used by IR transforms that
    /// rewrite statements in place while leaving drivers/domains/ports
    /// untouched (callers recompute those separately when needed).
    pub fn set_statements(&mut self, statements: Vec<Statement>) {
        self.statements = statements;
    }

    /// Mutable access to the statement tree, for transforms that need to
    /// `core::mem::take` it and rebuild it via [`Self::set_statements`].
    pub fn statements_mut(&mut self) -> &mut Vec<Statement> {
        &mut self.statements
    }

    /// Every domain referenced anywhere in the local statement tree.
    pub fn domains_in_statements(&self) -> Vec<DomainKey> {
        domains_in(&self.statements)
    }

    /// The driver map: domain key to the set of signals driven in it.
    pub fn drivers(&self) -> &BTreeMap<DomainKey, BTreeSet<Signal>> {
        &self.drivers
    }

    /// Mutable access to the driver map, for transforms that move drivers
    /// between domains (enable/reset insertion does not; domain lowering
    /// does not either — this exists for port propagation bookkeeping).
    pub fn drivers_mut(&mut self) -> &mut BTreeMap<DomainKey, BTreeSet<Signal>> {
        &mut self.drivers
    }

    /// Define a clock domain local to this fragment.
    pub fn add_domain(&mut self, domain: ClockDomain) -> Result<(), DomainError> {
        let name: String = domain.name().into();
        if self.domains.contains_key(&name) {
            return Err(DomainError::Collision(name))
        }
        self.domains.insert(name, domain);
        Ok(())
    }

    /// Domains defined locally in this fragment.
    pub fn domains(&self) -> &BTreeMap<String, ClockDomain> {
        &self.domains
    }

    /// Mutable access to locally-defined domains.
    pub fn domains_mut(&mut self) -> &mut BTreeMap<String, ClockDomain> {
        &mut self.domains
    }

    /// Add a child fragment.
    pub fn add_subfragment(&mut self, fragment: Fragment, name: Option<String>) {
        self.subfragments.push(SubFragment { fragment, name });
    }

    /// Child fragments, in insertion order.
    pub fn subfragments(&self) -> &[SubFragment] {
        &self.subfragments
    }

    /// Mutable access to child fragments, for transforms that recurse.
    pub fn subfragments_mut(&mut self) -> &mut Vec<SubFragment> {
        &mut self.subfragments
    }

    /// Explicitly declare (or override) a signal's port direction.
    pub fn set_port(&mut self, signal: Signal, direction: Direction) {
        self.ports.insert(signal, direction);
    }

    /// The port map.
    pub fn ports(&self) -> &BTreeMap<Signal, Direction> {
        &self.ports
    }

    /// Mutable access to the port map, for the port-propagation transform.
    pub fn ports_mut(&mut self) -> &mut BTreeMap<Signal, Direction> {
        &mut self.ports
    }

    /// Free-form attributes.
    pub fn attrs(&self) -> &Attrs {
        &self.attrs
    }

    /// Mutable access to attributes.
    pub fn attrs_mut(&mut self) -> &mut Attrs {
        &mut self.attrs
    }

    /// Mark this fragment for inlining into its parent rather than emitted
    /// as its own module.
    #[must_use]
    pub fn flattened(mut self) -> Self {
        self.flatten = true;
        self
    }

    /// `true` if this fragment should be inlined into its parent.
    pub fn is_flattened(&self) -> bool {
        self.flatten
    }

    /// Attach a source location, surfaced in error messages and (if
    /// `emit_src` is set) `src` attributes.
    #[must_use]
    pub fn with_src_loc(mut self, loc: SrcLoc) -> Self {
        self.src_loc = Some(loc);
        self
    }

    /// The fragment's source location, if known.
    pub fn src_loc(&self) -> Option<&SrcLoc> {
        self.src_loc.as_ref()
    }

    /// `true` if the fragment has nothing to emit: no ports, statements or
    /// children. The emitter skips these entirely when instantiating them
    /// as a subfragment cell.
    pub fn is_empty(&self) -> bool {
        self.ports.is_empty()
            && self.statements.is_empty()
            && self.subfragments.is_empty()
            && matches!(self.kind, FragmentKind::Logic)
    }

    /// Validate the structural invariants every prepared fragment must
    /// satisfy: every driven signal is assigned or is a subfragment's
    /// output port, and every signal driven here is driven in at most one
    /// domain.
    pub fn validate(&self) -> Result<(), DomainError> {
        let lhs_signals = self.lhs_signals();
        let subfragment_outputs: BTreeSet<Signal> = self
            .subfragments
            .iter()
            .flat_map(|sub| sub.fragment.ports.iter())
            .filter(|(_, dir)| !matches!(dir, Direction::In))
            .map(|(signal, _)| signal.clone())
            .collect();

        let mut seen_elsewhere: BTreeSet<Signal> = BTreeSet::new();
        for (domain, signals) in &self.drivers {
            for signal in signals {
                if !lhs_signals.contains(signal) && !subfragment_outputs.contains(signal) {
                    return Err(DomainError::UnresolvedDriver(signal.name().into()))
                }
                if !seen_elsewhere.insert(signal.clone()) {
                    return Err(DomainError::MultiDomainDriver(signal.name().into()))
                }
                let _ = domain;
            }
        }
        Ok(())
    }

    fn lhs_signals(&self) -> BTreeSet<Signal> {
        fn walk(statements: &[Statement], out: &mut BTreeSet<Signal>) {
            for stmt in statements {
                match stmt {
                    Statement::Assign { lhs, .. } => {
                        if let Ok(signals) = lhs.lhs_signals() {
                            out.extend(signals);
                        }
                    }
                    Statement::Switch { cases, .. } => {
                        for case in cases {
                            walk(&case.body, out);
                        }
                    }
                    Statement::Property { .. } => {}
                }
            }
        }
        let mut out = BTreeSet::new();
        walk(&self.statements, &mut out);
        out
    }
}

impl Default for Fragment {
    fn default() -> Self {
        Self::new()
    }
}

/// Group the signals driven by `statements` per domain, without mutating
/// any fragment — used both by [`Fragment::add_statement`] and by transforms
/// that need to recompute drivers after rewriting a statement list.
pub fn statements_drivers(statements: &[Statement]) -> BTreeMap<DomainKey, BTreeSet<Signal>> {
    fn walk(statements: &[Statement], out: &mut BTreeMap<DomainKey, BTreeSet<Signal>>) {
        for stmt in statements {
            match stmt {
                Statement::Assign { lhs, domain, .. } => {
                    if let Ok(signals) = lhs.lhs_signals() {
                        out.entry(domain.clone()).or_default().extend(signals);
                    }
                }
                Statement::Switch { cases, .. } => {
                    for case in cases {
                        walk(&case.body, out);
                    }
                }
                Statement::Property { .. } => {}
            }
        }
    }
    let mut out = BTreeMap::new();
    walk(statements, &mut out);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use torii_core::Shape;
    use torii_ir::Signal as Sig;

    fn sig(name: &str, width: u32) -> Sig {
        Sig::new(name, Shape::unsigned(width).unwrap())
    }

    #[test]
    fn add_statement_records_drivers() {
        let mut frag = Fragment::new();
        let out = sig("o", 4);
        let input = sig("i", 4);
        frag.add_statement(Statement::Assign {
            lhs: Value::Signal(out.clone()).into_ref(),
            rhs: Value::Signal(input).into_ref(),
            domain: DomainKey::Comb,
        });
        assert!(frag.drivers()[&DomainKey::Comb].contains(&out));
    }

    #[test]
    fn empty_fragment_is_empty() {
        assert!(Fragment::new().is_empty());
    }

    #[test]
    fn fragment_with_a_port_is_not_empty() {
        let mut frag = Fragment::new();
        frag.set_port(sig("x", 1), Direction::In);
        assert!(!frag.is_empty());
    }
}
