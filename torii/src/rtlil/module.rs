//! Compiles one [`Fragment`] into the text of a single RTLIL `module`.

use alloc::{
    collections::{BTreeMap, BTreeSet},
    format,
    rc::Rc,
    string::{String, ToString},
    vec::Vec,
};
use core::fmt::Write as _;

use itertools::Itertools;
use torii_core::{BitPattern, Shape};
use torii_hdl::{
    Case, ClockDomain, ClockEdge, Direction, DomainKey, Fragment, FragmentKind, InstanceParam, MemoryInstance,
    Pattern, PropertyKind, Signal, Statement, UnaryOperator,
};
use torii_ir::{shape_of, AnyKind, BinaryOperator, Value, ValueRef};

use crate::error::EmitError;

use super::{
    namer::Namer,
    sigspec::{binary_cell_type, decompose_lhs, format_const, unary_cell_type},
};

struct Wire {
    name: String,
    width: u32,
    direction: Option<Direction>,
    port_id: Option<u32>,
}

/// Compiles a single fragment's local statements, registers, subfragment
/// instances and memories into RTLIL `module` body text.
///
/// One emitter instance handles exactly one module: a [`Fragment`] with
/// `FragmentKind::Logic` whose `Logic` subfragments have already been
/// compiled into their own modules elsewhere (by `design.rs`, which knows
/// the design-wide module name for each one and passes them in via
/// `subfragment_modules`). `Instance` and `Memory` subfragments are inlined
/// as cells directly into this module, matching how RTLIL represents them.
pub struct ModuleEmitter<'a> {
    namer: Namer,
    wires: BTreeMap<u32, Wire>,
    wire_order: Vec<u32>,
    by_signal: BTreeMap<Signal, u32>,
    next_wire_id: u32,
    cells: Vec<String>,
    rhs_cache: BTreeMap<usize, String>,
    domains: &'a BTreeMap<String, ClockDomain>,
    next_port_id: u32,
}

impl<'a> ModuleEmitter<'a> {
    /// A fresh emitter for a module whose referenced clock domains resolve
    /// via `domains`.
    pub fn new(domains: &'a BTreeMap<String, ClockDomain>) -> Self {
        Self {
            namer: Namer::new(),
            wires: BTreeMap::new(),
            wire_order: Vec::new(),
            by_signal: BTreeMap::new(),
            next_wire_id: 0,
            cells: Vec::new(),
            rhs_cache: BTreeMap::new(),
            domains,
            next_port_id: 1,
        }
    }

    /// Compile `fragment` (whose local statements and ports have already
    /// been prepared) to the body of an RTLIL module named `module_name`.
    /// `subfragment_modules[i]` names the already-compiled module for
    /// `fragment.subfragments()[i]` when that subfragment is `Logic`-kind;
    /// it is ignored for `Instance`/`Memory` subfragments, which this
    /// function inlines as cells itself.
    /// Returns the module's RTLIL text and, for every port signal, the
    /// display name (`\`-prefix stripped) the module ended up assigning it
    /// — the wire name chosen inside `self.namer` may differ from the
    /// signal's own name if another signal or cell already claimed it.
    pub fn compile(
        mut self,
        fragment: &Fragment,
        module_name: &str,
        subfragment_modules: &[Option<String>],
    ) -> Result<(String, BTreeMap<Signal, String>), EmitError> {
        for (signal, direction) in fragment.ports() {
            self.declare_wire(signal);
            self.set_port(signal, *direction);
        }

        let mut process_text = String::new();
        let mut registered: BTreeMap<Signal, String> = BTreeMap::new();
        for domain in fragment.domains_in_statements() {
            let filtered = filter_domain(fragment.statements(), &domain);
            if filtered.is_empty() {
                continue
            }
            let mut next_wires = BTreeMap::new();
            let empty_driven = BTreeSet::new();
            let driven = fragment.drivers().get(&domain).unwrap_or(&empty_driven);
            let body = self.compile_process(&filtered, &domain, driven, &mut next_wires)?;
            if !body.trim().is_empty() {
                let header = self.namer.auto("proc");
                writeln!(process_text, "  process {header}").ok();
                process_text.push_str(&body);
                process_text.push_str("  end\n");
            }
            registered.extend(next_wires);
        }

        self.emit_properties(fragment.statements())?;
        self.emit_registers(fragment, &registered)?;
        self.emit_subfragments(fragment, subfragment_modules)?;
        self.tie_off_undriven(fragment);

        let mut out = String::new();
        writeln!(out, "module {module_name}").ok();
        for id in &self.wire_order {
            let wire = &self.wires[id];
            let mut line = format!("  wire width {}", wire.width);
            if let Some(port_id) = wire.port_id {
                let dir = match wire.direction {
                    Some(Direction::In) => "input",
                    Some(Direction::Out) => "output",
                    Some(Direction::InOut) => "inout",
                    None => "output",
                };
                write!(line, " {dir} {port_id}").ok();
            }
            write!(line, " {}", wire.name).ok();
            out.push_str(&line);
            out.push('\n');
        }
        out.push_str(&process_text);
        for cell in &self.cells {
            out.push_str(cell);
        }
        out.push_str("end\n");

        let port_names = fragment
            .ports()
            .keys()
            .map(|signal| {
                let id = self.by_signal[signal];
                (signal.clone(), super::namer::display_name(&self.wires[&id].name))
            })
            .collect();
        Ok((out, port_names))
    }

    fn alloc_wire(&mut self, name: String, width: u32) -> String {
        let id = self.next_wire_id;
        self.next_wire_id += 1;
        self.wires.insert(id, Wire { name: name.clone(), width, direction: None, port_id: None });
        self.wire_order.push(id);
        name
    }

    fn declare_wire(&mut self, signal: &Signal) -> u32 {
        if let Some(id) = self.by_signal.get(signal) {
            return *id
        }
        let name = self.namer.public(signal.name());
        let id = self.next_wire_id;
        self.next_wire_id += 1;
        self.wires.insert(id, Wire { name, width: signal.shape().width(), direction: None, port_id: None });
        self.wire_order.push(id);
        self.by_signal.insert(signal.clone(), id);
        id
    }

    fn set_port(&mut self, signal: &Signal, direction: Direction) {
        let id = self.declare_wire(signal);
        let port_id = self.next_port_id;
        self.next_port_id += 1;
        let wire = self.wires.get_mut(&id).expect("just declared");
        wire.direction = Some(direction);
        wire.port_id = Some(port_id);
    }

    fn wire_name(&mut self, signal: &Signal) -> String {
        let id = self.declare_wire(signal);
        self.wires[&id].name.clone()
    }

    fn resolve_domain(&self, name: &str) -> Result<&ClockDomain, EmitError> {
        self.domains.get(name).ok_or_else(|| EmitError::UnknownDomain(name.to_string()))
    }

    fn shape(&self, value: &ValueRef) -> Shape {
        shape_of(value).unwrap_or_else(|_| Shape::unsigned(0).expect("width 0 is always legal"))
    }

    /// Compile a value into an RTLIL sigspec, memoizing operator-cell
    /// outputs by `Rc` pointer identity so a shared subtree is computed once.
    fn compile_rhs(&mut self, value: &ValueRef) -> Result<String, EmitError> {
        let key = Rc::as_ptr(value) as usize;
        let cheap = matches!(**value, Value::Signal(_) | Value::Const(_));
        if !cheap {
            if let Some(cached) = self.rhs_cache.get(&key) {
                return Ok(cached.clone())
            }
        }

        let result = self.compile_rhs_uncached(value)?;

        if !cheap {
            self.rhs_cache.insert(key, result.clone());
        }
        Ok(result)
    }

    fn compile_rhs_uncached(&mut self, value: &ValueRef) -> Result<String, EmitError> {
        match &**value {
            Value::Const(c) => Ok(format_const(c.pattern())),
            Value::AnyValue(a) => {
                let kind = match a.kind() {
                    AnyKind::Const => "$anyconst",
                    AnyKind::Seq => "$anyseq",
                };
                let width = a.shape().width();
                let cell_name = self.namer.auto(&kind[1..]);
                let out = self.alloc_wire_named(&kind[1..], width);
                self.cells.push(format!(
                    "  cell {kind} {cell_name}\n    parameter \\WIDTH {width}\n    connect \\Y {out}\n  end\n"
                ));
                Ok(out)
            }
            Value::Signal(s) => Ok(self.wire_name(s)),
            Value::ClockSignal(name) => {
                let domain = self.resolve_domain(name)?.clone();
                Ok(self.wire_name(domain.clock()))
            }
            Value::ResetSignal(name, allow_reset_less) => {
                let domain = self.resolve_domain(name)?.clone();
                match domain.reset() {
                    Some(reset) => Ok(self.wire_name(reset)),
                    None if *allow_reset_less => Ok(format_const(&BitPattern::zero(1))),
                    None => Err(EmitError::NoReset(name.clone())),
                }
            }
            Value::Unary(op, operand) => self.compile_unary(*op, operand, value),
            Value::Binary(op, a, b) => self.compile_binary(*op, a, b, value),
            Value::Mux(sel, t, f) => {
                let sel_spec = self.compile_rhs(sel)?;
                let t_spec = self.compile_rhs(t)?;
                let f_spec = self.compile_rhs(f)?;
                let width = self.shape(value).width();
                let cell_name = self.namer.auto("mux");
                let out = self.alloc_wire_named("mux", width);
                self.cells.push(format!(
                    "  cell $mux {cell_name}\n    parameter \\WIDTH {width}\n    connect \\A {f_spec}\n    connect \\B {t_spec}\n    connect \\S {sel_spec}\n    connect \\Y {out}\n  end\n"
                ));
                Ok(out)
            }
            Value::Slice(inner, start, stop) => {
                let inner_spec = self.compile_rhs(inner)?;
                let inner_width = self.shape(inner).width();
                let wire = self.materialize(&inner_spec, inner_width);
                if *stop <= *start {
                    return Ok(format_const(&BitPattern::zero(0)))
                }
                Ok(format!("{wire} [{}:{}]", stop - 1, start))
            }
            Value::Part { value: inner, offset, width, stride } => self.compile_part(inner, offset, *width, *stride),
            Value::Cat(parts) => {
                let mut pieces = Vec::with_capacity(parts.len());
                for part in parts {
                    pieces.push(self.compile_rhs(part)?);
                }
                pieces.reverse();
                Ok(format!("{{ {} }}", pieces.join(" ")))
            }
            Value::ArrayProxy { elements, index } => self.compile_array_proxy(elements, index, value),
            Value::Sample { .. } => Err(EmitError::UnloweredSample),
            Value::Initial => {
                let cell_name = self.namer.auto("initstate");
                let out = self.alloc_wire_named("initstate", 1);
                self.cells.push(format!("  cell $initstate {cell_name}\n    connect \\Y {out}\n  end\n"));
                Ok(out)
            }
        }
    }

    fn alloc_wire_named(&mut self, hint: &str, width: u32) -> String {
        let name = self.namer.auto(hint);
        self.alloc_wire(name, width)
    }

    fn compile_unary(&mut self, op: UnaryOperator, operand: &ValueRef, whole: &ValueRef) -> Result<String, EmitError> {
        let operand_spec = self.compile_rhs(operand)?;
        let Some(cell_type) = unary_cell_type(op) else {
            return Ok(operand_spec)
        };
        let operand_shape = self.shape(operand);
        let result_shape = self.shape(whole);
        let hint = &cell_type[1..];
        let cell_name = self.namer.auto(hint);
        let out = self.alloc_wire_named(hint, result_shape.width());
        self.cells.push(format!(
            "  cell {cell_type} {cell_name}\n    parameter \\A_SIGNED {}\n    parameter \\A_WIDTH {}\n    parameter \\Y_WIDTH {}\n    connect \\A {operand_spec}\n    connect \\Y {out}\n  end\n",
            operand_shape.signed() as u32,
            operand_shape.width(),
            result_shape.width(),
        ));
        Ok(out)
    }

    /// Insert a `$pos` extension cell ahead of `operand` when its shape
    /// doesn't already match `(target_width, signed)`, so the binary cell
    /// downstream sees two same-signedness operands at a common width.
    fn promote_operand(&mut self, spec: String, shape: Shape, target_width: u32) -> (String, Shape) {
        if shape.signed() && shape.width() == target_width {
            return (spec, shape)
        }
        let cell_name = self.namer.auto("pos");
        let out = self.alloc_wire_named("pos", target_width);
        self.cells.push(format!(
            "  cell $pos {cell_name}\n    parameter \\A_SIGNED {}\n    parameter \\A_WIDTH {}\n    parameter \\Y_WIDTH {}\n    connect \\A {spec}\n    connect \\Y {out}\n  end\n",
            shape.signed() as u32,
            shape.width(),
            target_width,
        ));
        (out, Shape::signed(target_width).unwrap_or(shape))
    }

    fn compile_binary(&mut self, op: BinaryOperator, a: &ValueRef, b: &ValueRef, whole: &ValueRef) -> Result<String, EmitError> {
        let mut a_spec = self.compile_rhs(a)?;
        let mut b_spec = self.compile_rhs(b)?;
        let mut a_shape = self.shape(a);
        let mut b_shape = self.shape(b);
        let result_shape = self.shape(whole);

        if a_shape.signed() != b_shape.signed() && !matches!(op, BinaryOperator::Shl | BinaryOperator::Shr | BinaryOperator::Pow) {
            let target_width = promoted_width(a_shape, true).max(promoted_width(b_shape, true));
            let (spec, shape) = self.promote_operand(a_spec, a_shape, target_width);
            a_spec = spec;
            a_shape = shape;
            let (spec, shape) = self.promote_operand(b_spec, b_shape, target_width);
            b_spec = spec;
            b_shape = shape;
        }

        let cell_type = binary_cell_type(op, a_shape.signed());
        let hint = &cell_type[1..];
        let cell_name = self.namer.auto(hint);
        let out = self.alloc_wire_named(hint, result_shape.width());
        self.cells.push(format!(
            "  cell {cell_type} {cell_name}\n    parameter \\A_SIGNED {}\n    parameter \\B_SIGNED {}\n    parameter \\A_WIDTH {}\n    parameter \\B_WIDTH {}\n    parameter \\Y_WIDTH {}\n    connect \\A {a_spec}\n    connect \\B {b_spec}\n    connect \\Y {out}\n  end\n",
            a_shape.signed() as u32,
            b_shape.signed() as u32,
            a_shape.width(),
            b_shape.width(),
            result_shape.width(),
        ));
        Ok(out)
    }

    /// Legalize a dynamic part-select by enumerating every offset window a
    /// `stride`-bit-wide index can address and switching on it at runtime —
    /// RTLIL has no native dynamic-select cell, so a synthetic process
    /// picks the right fixed-offset slice at elaboration-known granularity.
    fn compile_part(&mut self, inner: &ValueRef, offset: &ValueRef, width: u32, stride: u32) -> Result<String, EmitError> {
        let inner_spec = self.compile_rhs(inner)?;
        let inner_width = self.shape(inner).width();
        let inner_wire = self.materialize(&inner_spec, inner_width);
        let offset_spec = self.compile_rhs(offset)?;
        let windows = inner_width.div_ceil(stride.max(1)).max(1);
        let out = self.alloc_wire_named("legalize", width);

        let mut process = format!("  process {}\n  switch {offset_spec}\n", self.namer.auto("proc"));
        let sel_bits = bits_for(windows);
        for index in 0..windows {
            let lo = index * stride;
            let hi = (lo + width).min(inner_width);
            let window = if hi > lo {
                let slice = format!("{inner_wire} [{}:{}]", hi - 1, lo);
                if hi - lo < width {
                    format!("{{ {}'0 {slice} }}", width - (hi - lo))
                } else {
                    slice
                }
            } else {
                format_const(&BitPattern::zero(width))
            };
            writeln!(process, "    case {sel_bits}'{}", to_binary(index, sel_bits)).ok();
            writeln!(process, "      assign {out} {window}").ok();
        }
        writeln!(process, "    case").ok();
        writeln!(process, "      assign {out} {}", format_const(&BitPattern::zero(width))).ok();
        process.push_str("  end\n");
        self.cells.push(process);
        Ok(out)
    }

    fn compile_array_proxy(&mut self, elements: &[ValueRef], index: &ValueRef, whole: &ValueRef) -> Result<String, EmitError> {
        let width = self.shape(whole).width();
        let index_spec = self.compile_rhs(index)?;
        let mut elem_specs = Vec::with_capacity(elements.len());
        for element in elements {
            elem_specs.push(self.compile_rhs(element)?);
        }
        let out = self.alloc_wire_named("arrayproxy", width);
        let index_bits = bits_for(elements.len().max(1) as u32);

        let mut process = format!("  process {}\n  switch {index_spec}\n", self.namer.auto("proc"));
        for (i, spec) in elem_specs.iter().enumerate() {
            writeln!(process, "    case {index_bits}'{}", to_binary(i as u32, index_bits)).ok();
            writeln!(process, "      assign {out} {spec}").ok();
        }
        let last = elem_specs.last().cloned().unwrap_or_else(|| format_const(&BitPattern::zero(width)));
        writeln!(process, "    case").ok();
        writeln!(process, "      assign {out} {last}").ok();
        process.push_str("  end\n");
        self.cells.push(process);
        Ok(out)
    }

    fn materialize(&mut self, sigspec: &str, width: u32) -> String {
        if is_bare_reference(sigspec) {
            return sigspec.to_string()
        }
        let wire = self.alloc_wire_named("flat", width);
        self.cells.push(format!("  connect {wire} {sigspec}\n"));
        wire
    }

    fn compile_process(
        &mut self,
        statements: &[Statement],
        domain: &DomainKey,
        driven: &BTreeSet<Signal>,
        next_wires: &mut BTreeMap<Signal, String>,
    ) -> Result<String, EmitError> {
        let mut out = String::new();
        // A signal with no statement that reaches it this cycle keeps its
        // current value (sync) or falls back to its reset value (comb).
        // Without this, a comb signal assigned only inside one switch case
        // would infer a latch instead.
        for signal in driven {
            let target = self.assign_target(signal, domain, next_wires);
            let default_rhs =
                if domain.is_sync() { self.wire_name(signal) } else { format_const(signal.reset_value()) };
            writeln!(out, "    assign {target} {default_rhs}").ok();
        }
        self.compile_statement_list(statements, domain, next_wires, &mut out, 2)?;
        Ok(out)
    }

    fn compile_statement_list(
        &mut self,
        statements: &[Statement],
        domain: &DomainKey,
        next_wires: &mut BTreeMap<Signal, String>,
        out: &mut String,
        indent: usize,
    ) -> Result<(), EmitError> {
        // RTLIL evaluates every `assign` in a process before any `switch`,
        // regardless of their textual order, so an assignment written after
        // a switch here would otherwise be overridden by it instead of
        // overriding it. Once a switch has been seen at this nesting level,
        // every later assign is wrapped in its own trivial unconditional
        // switch to force it to evaluate after the preceding one.
        let mut switch_seen = false;
        for statement in statements {
            match statement {
                Statement::Assign { lhs, rhs, domain: stmt_domain } if stmt_domain == domain => {
                    let rhs_spec = self.compile_rhs(rhs)?;
                    let rhs_width = self.shape(rhs).width();
                    let assign_indent = if switch_seen { indent + 4 } else { indent };
                    let mut body = String::new();
                    for leaf in decompose_lhs(lhs)? {
                        let target = self.assign_target(&leaf.signal, domain, next_wires);
                        let slice = if leaf.signal_range.start == 0 && leaf.signal_range.end == leaf.signal.shape().width() {
                            target
                        } else {
                            format!("{target} [{}:{}]", leaf.signal_range.end - 1, leaf.signal_range.start)
                        };
                        let full_rhs = leaf.rhs_range.start == 0 && leaf.rhs_range.end == rhs_width;
                        let rhs_final = if full_rhs {
                            rhs_spec.clone()
                        } else {
                            format!("{rhs_spec} [{}:{}]", leaf.rhs_range.end - 1, leaf.rhs_range.start)
                        };
                        writeln!(body, "{}assign {slice} {rhs_final}", " ".repeat(assign_indent)).ok();
                    }
                    if switch_seen {
                        writeln!(out, "{}switch {{}}", " ".repeat(indent)).ok();
                        writeln!(out, "{}case", " ".repeat(indent + 2)).ok();
                        out.push_str(&body);
                        writeln!(out, "{}end", " ".repeat(indent)).ok();
                    } else {
                        out.push_str(&body);
                    }
                }
                Statement::Assign { .. } => {}
                Statement::Switch { test, cases } => {
                    switch_seen = true;
                    let test_spec = self.compile_rhs(test)?;
                    writeln!(out, "{}switch {test_spec}", " ".repeat(indent)).ok();
                    for case in cases {
                        self.compile_case(case, domain, next_wires, out, indent + 2)?;
                    }
                    writeln!(out, "{}end", " ".repeat(indent)).ok();
                }
                Statement::Property { .. } => {}
            }
        }
        Ok(())
    }

    fn compile_case(
        &mut self,
        case: &Case,
        domain: &DomainKey,
        next_wires: &mut BTreeMap<Signal, String>,
        out: &mut String,
        indent: usize,
    ) -> Result<(), EmitError> {
        if case.is_default() {
            writeln!(out, "{}case", " ".repeat(indent)).ok();
        } else {
            writeln!(out, "{}case {}", " ".repeat(indent), case.patterns.iter().map(render_pattern).join(", ")).ok();
        }
        self.compile_statement_list(&case.body, domain, next_wires, out, indent + 2)?;
        Ok(())
    }

    fn assign_target(&mut self, signal: &Signal, domain: &DomainKey, next_wires: &mut BTreeMap<Signal, String>) -> String {
        if domain.is_sync() {
            if let Some(existing) = next_wires.get(signal) {
                return existing.clone()
            }
            let name = self.alloc_wire_named("next", signal.shape().width());
            next_wires.insert(signal.clone(), name.clone());
            name
        } else {
            self.wire_name(signal)
        }
    }

    fn emit_registers(&mut self, fragment: &Fragment, registered: &BTreeMap<Signal, String>) -> Result<(), EmitError> {
        for (signal, next_name) in registered {
            let domain_name = fragment
                .drivers()
                .iter()
                .find(|(_, signals)| signals.contains(signal))
                .and_then(|(key, _)| key.name().map(ToString::to_string));
            let Some(name) = domain_name else { continue };
            let domain = self.resolve_domain(&name)?.clone();
            let q = self.wire_name(signal);
            let clk = self.wire_name(domain.clock());
            let width = signal.shape().width();
            let polarity = matches!(domain.clock_edge(), ClockEdge::Pos) as u32;
            if domain.is_async_reset() {
                let reset = domain.reset().cloned().expect("async reset domain has a reset signal");
                let arst = self.wire_name(&reset);
                let cell_name = self.namer.auto("adff");
                self.cells.push(format!(
                    "  cell $adff {cell_name}\n    parameter \\WIDTH {width}\n    parameter \\CLK_POLARITY {polarity}\n    parameter \\ARST_POLARITY 1\n    parameter \\ARST_VALUE {}\n    connect \\CLK {clk}\n    connect \\ARST {arst}\n    connect \\D {next_name}\n    connect \\Q {q}\n  end\n",
                    format_const(signal.reset_value()),
                ));
            } else {
                let cell_name = self.namer.auto("dff");
                self.cells.push(format!(
                    "  cell $dff {cell_name}\n    parameter \\WIDTH {width}\n    parameter \\CLK_POLARITY {polarity}\n    connect \\CLK {clk}\n    connect \\D {next_name}\n    connect \\Q {q}\n  end\n",
                ));
            }
        }
        Ok(())
    }

    fn emit_properties(&mut self, statements: &[Statement]) -> Result<(), EmitError> {
        for statement in statements {
            match statement {
                Statement::Property { kind, test, enable, name } => {
                    let test_spec = self.compile_rhs(test)?;
                    let enable_spec = self.compile_rhs(enable)?;
                    let cell_type = match kind {
                        PropertyKind::Assert => "$assert",
                        PropertyKind::Assume => "$assume",
                        PropertyKind::Cover => "$cover",
                    };
                    let cell_name = self.namer.auto(&cell_type[1..]);
                    let mut cell =
                        format!("  cell {cell_type} {cell_name}\n    connect \\A {test_spec}\n    connect \\EN {enable_spec}\n");
                    if let Some(name) = name {
                        writeln!(cell, "    attribute \\src \"{name}\"").ok();
                    }
                    cell.push_str("  end\n");
                    self.cells.push(cell);
                }
                Statement::Switch { cases, .. } => {
                    for case in cases {
                        self.emit_properties(&case.body)?;
                    }
                }
                Statement::Assign { .. } => {}
            }
        }
        Ok(())
    }

    fn emit_subfragments(&mut self, fragment: &Fragment, subfragment_modules: &[Option<String>]) -> Result<(), EmitError> {
        let mut used_names = BTreeSet::new();
        for (index, sub) in fragment.subfragments().iter().enumerate() {
            if sub.fragment.is_empty() {
                continue
            }
            let instance_hint = sub.name.clone().unwrap_or_else(|| format!("u{index}"));
            if !used_names.insert(instance_hint.clone()) {
                return Err(EmitError::DuplicateSubfragmentName(instance_hint))
            }

            match sub.fragment.kind() {
                FragmentKind::Memory(memory) => self.emit_memory(memory)?,
                FragmentKind::Instance { cell_type, parameters, ports } => {
                    self.emit_instance(&instance_hint, cell_type, parameters, ports)?
                }
                FragmentKind::Logic => {
                    let cell_name = self.namer.public(&instance_hint);
                    let module_name = subfragment_modules.get(index).cloned().flatten().unwrap_or_else(|| {
                        // `design.rs` always supplies a name for Logic subfragments; this
                        // fallback only keeps single-module compilation self-contained.
                        format!("\\{instance_hint}")
                    });
                    let mut cell = format!("  cell {module_name} {cell_name}\n");
                    for (signal, _direction) in sub.fragment.ports() {
                        let port_name = format!("\\{}", signal.name());
                        let spec = self.wire_name(signal);
                        writeln!(cell, "    connect {port_name} {spec}").ok();
                    }
                    cell.push_str("  end\n");
                    self.cells.push(cell);
                }
            }
        }
        Ok(())
    }

    fn emit_instance(
        &mut self,
        instance_hint: &str,
        cell_type: &str,
        parameters: &BTreeMap<String, InstanceParam>,
        ports: &BTreeMap<String, (ValueRef, Direction)>,
    ) -> Result<(), EmitError> {
        let cell_name = self.namer.public(instance_hint);
        let mut cell = format!("  cell {cell_type} {cell_name}\n");
        for (param_name, param) in parameters {
            let rendered = match param {
                InstanceParam::Int(n) => n.to_string(),
                InstanceParam::Str(s) => format!("\"{s}\""),
                InstanceParam::Bits(bits) => format_const(bits),
            };
            writeln!(cell, "    parameter \\{param_name} {rendered}").ok();
        }
        for (port_name, (value, _direction)) in ports {
            let spec = self.compile_rhs(value)?;
            writeln!(cell, "    connect \\{port_name} {spec}").ok();
        }
        cell.push_str("  end\n");
        self.cells.push(cell);
        Ok(())
    }

    fn emit_memory(&mut self, memory: &MemoryInstance) -> Result<(), EmitError> {
        let cell_name = self.namer.auto("mem");
        let mut cell = format!(
            "  cell $mem_v2 {cell_name}\n    parameter \\MEMID \"{}\"\n    parameter \\WIDTH {}\n    parameter \\SIZE {}\n    parameter \\ABITS {}\n",
            memory.name(),
            memory.width(),
            memory.depth(),
            bits_for(memory.depth().max(1)),
        );
        writeln!(cell, "    parameter \\RD_PORTS {}", memory.read_ports().len()).ok();
        writeln!(cell, "    parameter \\WR_PORTS {}", memory.write_ports().len()).ok();
        for port in memory.read_ports() {
            let addr = self.compile_rhs(&port.addr)?;
            let data = self.wire_name(&port.data);
            writeln!(cell, "    connect \\RD_ADDR {addr}").ok();
            writeln!(cell, "    connect \\RD_DATA {data}").ok();
        }
        for port in memory.write_ports() {
            let addr = self.compile_rhs(&port.addr)?;
            let data = self.compile_rhs(&port.data)?;
            let en = self.compile_rhs(&port.en)?;
            writeln!(cell, "    connect \\WR_ADDR {addr}").ok();
            writeln!(cell, "    connect \\WR_DATA {data}").ok();
            writeln!(cell, "    connect \\WR_EN {en}").ok();
        }
        cell.push_str("  end\n");
        self.cells.push(cell);
        Ok(())
    }

    /// Tie any declared wire that nothing drives to its reset constant, so
    /// the module never has a dangling input that isn't actually a port.
    fn tie_off_undriven(&mut self, fragment: &Fragment) {
        let driven: BTreeSet<Signal> = fragment.drivers().values().flatten().cloned().collect();
        let subfragment_outputs: BTreeSet<Signal> = fragment
            .subfragments()
            .iter()
            .flat_map(|sub| sub.fragment.ports().iter())
            .filter(|(_, dir)| !matches!(dir, Direction::In))
            .map(|(s, _)| s.clone())
            .collect();
        let by_signal = self.by_signal.clone();
        for (signal, id) in by_signal {
            let is_input_port = self.wires[&id].direction == Some(Direction::In);
            if is_input_port || driven.contains(&signal) || subfragment_outputs.contains(&signal) {
                continue
            }
            let wire = self.wires[&id].name.clone();
            self.cells.push(format!("  connect {wire} {}\n", format_const(signal.reset_value())));
        }
    }
}

fn filter_domain(statements: &[Statement], domain: &DomainKey) -> Vec<Statement> {
    statements
        .iter()
        .filter_map(|stmt| match stmt {
            Statement::Assign { domain: d, .. } if d == domain => Some(stmt.clone()),
            Statement::Switch { test, cases } => {
                let cases: Vec<Case> = cases
                    .iter()
                    .map(|case| Case { patterns: case.patterns.clone(), body: filter_domain(&case.body, domain) })
                    .collect();
                if cases.iter().all(|c| c.body.is_empty()) {
                    None
                } else {
                    Some(Statement::Switch { test: test.clone(), cases })
                }
            }
            _ => None,
        })
        .collect()
}

fn render_pattern(pattern: &Pattern) -> String {
    pattern.render()
}

fn is_bare_reference(spec: &str) -> bool {
    !spec.contains(' ') && !spec.contains('{') && !spec.contains('\'')
}

fn bits_for(count: u32) -> u32 {
    if count <= 1 {
        1
    } else {
        32 - (count - 1).leading_zeros()
    }
}

fn to_binary(value: u32, width: u32) -> String {
    (0..width).rev().map(|bit| if (value >> bit) & 1 == 1 { '1' } else { '0' }).collect()
}

/// Width `shape` promotes to when the result is `target_signed`: unchanged
/// if its own signedness already matches, one bit wider otherwise.
fn promoted_width(shape: Shape, target_signed: bool) -> u32 {
    if shape.signed() == target_signed {
        shape.width()
    } else {
        shape.width().saturating_add(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use torii_hdl::Direction;

    fn sig(name: &str, width: u32) -> Signal {
        Signal::new(name, Shape::unsigned(width).unwrap())
    }

    fn signed_sig(name: &str, width: u32) -> Signal {
        Signal::new(name, Shape::signed(width).unwrap())
    }

    fn compile(fragment: &Fragment) -> String {
        let domains = BTreeMap::new();
        let (text, _ports) = ModuleEmitter::new(&domains).compile(fragment, "\\top", &[]).unwrap();
        text
    }

    #[test]
    fn comb_add_emits_an_add_cell() {
        let a = sig("a", 4);
        let b = sig("b", 4);
        let o = sig("o", 5);
        let mut frag = Fragment::new();
        frag.set_port(a.clone(), Direction::In);
        frag.set_port(b.clone(), Direction::In);
        frag.set_port(o.clone(), Direction::Out);
        frag.add_statement(Statement::Assign {
            lhs: Value::Signal(o).into_ref(),
            rhs: Value::Binary(BinaryOperator::Add, Value::Signal(a).into_ref(), Value::Signal(b).into_ref())
                .into_ref(),
            domain: DomainKey::Comb,
        });
        let text = compile(&frag);
        assert!(text.contains("cell $add"));
        assert!(text.contains("parameter \\Y_WIDTH 5"));
    }

    #[test]
    fn sync_assignment_emits_a_next_wire_and_a_dff() {
        let counter = sig("counter", 4);
        let domain = ClockDomain::new("sync", false, false).unwrap();
        let mut frag = Fragment::new();
        frag.add_domain(domain.clone()).unwrap();
        frag.add_statement(Statement::Assign {
            lhs: Value::Signal(counter.clone()).into_ref(),
            rhs: Value::Binary(
                BinaryOperator::Add,
                Value::Signal(counter).into_ref(),
                Value::Const(torii_ir::Const::new(BitPattern::from_u64(1, 4), false)).into_ref(),
            )
            .into_ref(),
            domain: DomainKey::Sync("sync".into()),
        });
        let mut domains = BTreeMap::new();
        domains.insert("sync".into(), domain);
        let (text, _) = ModuleEmitter::new(&domains).compile(&frag, "\\top", &[]).unwrap();
        assert!(text.contains("cell $dff"));
        assert!(text.contains("cell $add"));
        assert!(text.contains("process $proc$"));
    }

    #[test]
    fn async_reset_domain_emits_an_adff_with_reset_value() {
        let counter = sig("counter", 4).with_reset(BitPattern::from_u64(3, 4));
        let domain = ClockDomain::new("sync", false, true).unwrap();
        let mut frag = Fragment::new();
        frag.add_domain(domain.clone()).unwrap();
        frag.add_statement(Statement::Assign {
            lhs: Value::Signal(counter.clone()).into_ref(),
            rhs: Value::Signal(counter).into_ref(),
            domain: DomainKey::Sync("sync".into()),
        });
        let mut domains = BTreeMap::new();
        domains.insert("sync".into(), domain);
        let (text, _) = ModuleEmitter::new(&domains).compile(&frag, "\\top", &[]).unwrap();
        assert!(text.contains("cell $adff"));
        assert!(text.contains("parameter \\ARST_POLARITY 1"));
        assert!(text.contains("parameter \\ARST_VALUE 4'0011"));
    }

    #[test]
    fn switch_statement_emits_a_priority_switch() {
        let sel = sig("sel", 1);
        let o = sig("o", 2);
        let mut frag = Fragment::new();
        frag.set_port(sel.clone(), Direction::In);
        frag.set_port(o.clone(), Direction::Out);
        frag.add_statement(Statement::Switch {
            test: Value::Signal(sel).into_ref(),
            cases: alloc::vec![
                Case {
                    patterns: alloc::vec![Pattern::wildcard(1)],
                    body: alloc::vec![Statement::Assign {
                        lhs: Value::Signal(o).into_ref(),
                        rhs: Value::Const(torii_ir::Const::new(BitPattern::from_u64(0, 2), false)).into_ref(),
                        domain: DomainKey::Comb,
                    }],
                },
            ],
        });
        let text = compile(&frag);
        assert!(text.contains("switch"));
        assert!(text.contains("case"));
    }

    #[test]
    fn instance_subfragment_is_inlined_as_an_opaque_cell() {
        let clk = sig("clk", 1);
        let mut ports = BTreeMap::new();
        ports.insert("C".to_string(), (Value::Signal(clk.clone()).into_ref(), Direction::In));
        let instance = Fragment::instance("$_DFF_P_", BTreeMap::new(), ports);
        let mut frag = Fragment::new();
        frag.set_port(clk, Direction::In);
        frag.add_subfragment(instance, Some("u_dff".to_string()));
        let text = compile(&frag);
        assert!(text.contains("cell $_DFF_P_ \\u_dff"));
        assert!(!text.contains("module \\u_dff"));
    }

    #[test]
    fn dynamic_part_select_legalizes_into_a_switch() {
        let word = sig("word", 8);
        let idx = sig("idx", 2);
        let o = sig("o", 2);
        let mut frag = Fragment::new();
        frag.set_port(word.clone(), Direction::In);
        frag.set_port(idx.clone(), Direction::In);
        frag.set_port(o.clone(), Direction::Out);
        frag.add_statement(Statement::Assign {
            lhs: Value::Signal(o).into_ref(),
            rhs: Value::Part { value: Value::Signal(word).into_ref(), offset: Value::Signal(idx).into_ref(), width: 2, stride: 2 }
                .into_ref(),
            domain: DomainKey::Comb,
        });
        let text = compile(&frag);
        assert!(text.contains("switch"));
        assert!(text.contains("$legalize$"));
    }

    #[test]
    fn narrowing_add_assignment_truncates_the_carry_bit() {
        let a = sig("a", 4);
        let b = sig("b", 4);
        let o = sig("o", 4);
        let mut frag = Fragment::new();
        frag.set_port(a.clone(), Direction::In);
        frag.set_port(b.clone(), Direction::In);
        frag.set_port(o.clone(), Direction::Out);
        frag.add_statement(Statement::Assign {
            lhs: Value::Signal(o).into_ref(),
            rhs: Value::Binary(BinaryOperator::Add, Value::Signal(a).into_ref(), Value::Signal(b).into_ref())
                .into_ref(),
            domain: DomainKey::Comb,
        });
        let text = compile(&frag);
        assert!(text.contains("parameter \\A_WIDTH 4"));
        assert!(text.contains("parameter \\B_WIDTH 4"));
        assert!(text.contains("parameter \\Y_WIDTH 5"));
        assert!(text.contains("parameter \\A_SIGNED 0"));
        assert!(text.contains("parameter \\B_SIGNED 0"));
        assert!(text.contains("[3:0]"));
    }

    #[test]
    fn mixed_sign_comparison_promotes_both_operands_through_pos_cells() {
        let a = signed_sig("a", 4);
        let b = sig("b", 4);
        let y = sig("y", 1);
        let mut frag = Fragment::new();
        frag.set_port(a.clone(), Direction::In);
        frag.set_port(b.clone(), Direction::In);
        frag.set_port(y.clone(), Direction::Out);
        frag.add_statement(Statement::Assign {
            lhs: Value::Signal(y).into_ref(),
            rhs: Value::Binary(BinaryOperator::Lt, Value::Signal(a).into_ref(), Value::Signal(b).into_ref())
                .into_ref(),
            domain: DomainKey::Comb,
        });
        let text = compile(&frag);
        assert_eq!(text.matches("cell $pos").count(), 2);
        assert_eq!(text.matches("parameter \\Y_WIDTH 5").count(), 2);
        assert!(text.contains("cell $lt"));
        assert!(text.contains("parameter \\A_SIGNED 1"));
        assert!(text.contains("parameter \\B_SIGNED 1"));
        assert!(text.contains("parameter \\A_WIDTH 5"));
        assert!(text.contains("parameter \\B_WIDTH 5"));
    }

    #[test]
    fn a_sampled_value_drives_a_real_delay_register() {
        let x = sig("x", 4);
        let y = sig("y", 4);
        let domain = ClockDomain::new("sync", false, false).unwrap();
        let mut frag = Fragment::new();
        frag.set_port(x.clone(), Direction::In);
        frag.set_port(y.clone(), Direction::Out);
        frag.add_domain(domain).unwrap();
        frag.add_statement(Statement::Assign {
            lhs: Value::Signal(y).into_ref(),
            rhs: Value::Sample { value: Value::Signal(x).into_ref(), cycles: 1, domain: "sync".into() }.into_ref(),
            domain: DomainKey::Comb,
        });
        torii_hdl::prepare(&mut frag, &mut |name| ClockDomain::new(name, false, false)).unwrap();
        let (text, _) = ModuleEmitter::new(frag.domains()).compile(&frag, "\\top", &[]).unwrap();
        assert!(text.contains("cell $dff"));
    }
}
