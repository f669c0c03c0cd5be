//! Top-level RTLIL text assembly: walks a prepared fragment tree bottom-up,
//! naming and compiling one module per `Logic` fragment.

use alloc::{
    collections::BTreeMap,
    string::{String, ToString},
    vec::Vec,
};

use torii_hdl::{Fragment, FragmentKind, Signal};

use crate::error::EmitError;

use super::{module::ModuleEmitter, namer::Namer};

/// The result of emitting a whole design: the concatenated RTLIL text of
/// every module, and a host-facing name for each top-level port signal.
pub struct Design {
    /// RTLIL source text, one `module ... end` block per compiled fragment.
    pub text: String,
    /// Top module's ports, by signal, as their un-escaped display names.
    pub top_ports: BTreeMap<Signal, String>,
}

/// Compile a prepared fragment tree (the output of [`torii_hdl::prepare`])
/// to a complete RTLIL design.
pub fn emit(top: &Fragment, top_name: &str) -> Result<Design, EmitError> {
    let mut namer = Namer::new();
    let mut text = String::new();
    let (_module_name, top_ports) = compile_tree(top, top_name, &mut namer, &mut text)?;
    Ok(Design { text, top_ports })
}

/// Compile `fragment` and every `Logic` descendant it contains, post-order,
/// appending each module's text to `out` and returning the design-wide name
/// assigned to `fragment` itself, along with its port display-name map.
fn compile_tree(
    fragment: &Fragment,
    name_hint: &str,
    namer: &mut Namer,
    out: &mut String,
) -> Result<(String, BTreeMap<Signal, String>), EmitError> {
    let mut subfragment_modules = Vec::with_capacity(fragment.subfragments().len());
    for sub in fragment.subfragments() {
        let name = match sub.fragment.kind() {
            FragmentKind::Logic if !sub.fragment.is_empty() => {
                let hint = sub.name.clone().unwrap_or_else(|| "submodule".to_string());
                let (name, _ports) = compile_tree(&sub.fragment, &hint, namer, out)?;
                Some(name)
            }
            _ => None,
        };
        subfragment_modules.push(name);
    }

    let module_name = namer.public(name_hint);
    let emitter = ModuleEmitter::new(fragment.domains());
    let (body, ports) = emitter.compile(fragment, &module_name, &subfragment_modules)?;
    out.push_str(&body);
    Ok((module_name, ports))
}

#[cfg(test)]
mod tests {
    use super::*;
    use torii_core::Shape;
    use torii_hdl::{Direction, Statement};
    use torii_ir::{Signal, Value};

    fn sig(name: &str, width: u32) -> Signal {
        Signal::new(name, Shape::unsigned(width).unwrap())
    }

    #[test]
    fn a_logic_subfragment_becomes_its_own_module() {
        let i = sig("i", 4);
        let o = sig("o", 4);
        let mut child = Fragment::new();
        child.set_port(i.clone(), Direction::In);
        child.set_port(o.clone(), Direction::Out);
        child.add_statement(Statement::Assign {
            lhs: Value::Signal(o.clone()).into_ref(),
            rhs: Value::Signal(i.clone()).into_ref(),
            domain: torii_hdl::DomainKey::Comb,
        });

        let mut top = Fragment::new();
        top.set_port(i, Direction::In);
        top.set_port(o, Direction::Out);
        top.add_subfragment(child, Some("passthrough".into()));

        let design = emit(&top, "top").unwrap();
        assert!(design.text.contains("module \\top"));
        assert!(design.text.contains("module \\passthrough"));
        assert!(design.text.contains("cell \\passthrough \\passthrough"));
    }

    #[test]
    fn top_ports_reports_display_names_without_the_backslash() {
        let i = sig("clk_in", 1);
        let mut top = Fragment::new();
        top.set_port(i.clone(), Direction::In);
        let design = emit(&top, "top").unwrap();
        assert_eq!(design.top_ports.get(&i).map(String::as_str), Some("clk_in"));
    }

    #[test]
    fn an_empty_logic_subfragment_is_skipped_entirely() {
        let top = {
            let mut frag = Fragment::new();
            frag.add_subfragment(Fragment::new(), None);
            frag
        };
        let design = emit(&top, "top").unwrap();
        assert_eq!(design.text.matches("module ").count(), 1);
    }
}
