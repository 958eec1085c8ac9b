//! Program generation: one GGL module per circuit, root program last.

use std::collections::{BTreeSet, HashMap, HashSet};

use thiserror::Error;

use crate::catalog::Catalog;
use crate::circuit::{Circuit, Component, ComponentKind, Store};
use crate::diag::Diagnostic;
use crate::emit::escape;
use crate::hierarchy;
use crate::naming::NameRegistry;
use crate::resolver::{self, PortHit, Resolution, ResolvedConnection};

const GGL_IMPORT: &str =
    "from ggl import arithmetic, circuit, component, io, logic, memory, plexers, wires";
const CIRCUIT_VAR: &str = "circuit0";

/// How one circuit should be rendered.
#[derive(Debug, Clone, Default)]
pub struct GenerateOptions {
    /// Append the final execute statement. Root program only; imported
    /// modules are built, never run.
    pub emit_run: bool,
    /// Close the module by exporting the built circuit under this symbol.
    pub export: Option<String>,
}

impl GenerateOptions {
    pub fn root() -> Self {
        Self {
            emit_run: true,
            export: None,
        }
    }

    pub fn module(name: impl Into<String>) -> Self {
        Self {
            emit_run: false,
            export: Some(name.into()),
        }
    }
}

/// One rendered circuit plus everything that went wrong while rendering it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedCircuit {
    pub code: String,
    pub diagnostics: Vec<Diagnostic>,
}

/// An importable module produced for one sub-circuit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Module {
    /// The exported symbol, equal to the originating circuit's declared name.
    pub name: String,
    pub code: String,
}

/// The full compile result handed to the runtime bridge: module texts in
/// dependency order, the root program, and every diagnostic from every pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Program {
    pub root: String,
    pub modules: Vec<Module>,
    pub diagnostics: Vec<Diagnostic>,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("circuit \"{0}\" does not exist in the store")]
pub struct UnknownCircuit(pub String);

/// Compile the circuit `root_id` and every circuit reachable from it.
///
/// This is the top-level entry point: it resets the naming registry (names
/// are allocated once across the whole hierarchical output), expands the
/// hierarchy, renders each module dependency-first and the root program
/// last. Diagnostics never abort the pass; the output is best-effort.
pub fn compile(
    store: &Store,
    root_id: &str,
    catalog: &Catalog,
    names: &mut NameRegistry,
) -> Result<Program, UnknownCircuit> {
    let root = store
        .circuit(root_id)
        .ok_or_else(|| UnknownCircuit(root_id.to_owned()))?;
    names.reset();

    let expansion = hierarchy::expand(root, store);
    let mut diagnostics = expansion.diagnostics;
    let mut modules = Vec::new();
    let mut root_code = String::new();

    for id in &expansion.order {
        // Expansion only lists circuits it found in the store.
        let Some(circuit) = store.circuit(id) else {
            continue;
        };
        if id.as_str() == root_id {
            let generated = generate(circuit, store, catalog, names, &GenerateOptions::root());
            diagnostics.extend(generated.diagnostics);
            root_code = generated.code;
        } else {
            let Some(name) = store.module_name(id) else {
                continue;
            };
            let name = name.to_owned();
            let generated = generate(
                circuit,
                store,
                catalog,
                names,
                &GenerateOptions::module(name.clone()),
            );
            diagnostics.extend(generated.diagnostics);
            modules.push(Module {
                name,
                code: generated.code,
            });
        }
    }

    log::debug!(
        "compiled {root_id}: {} module(s), {} diagnostic(s)",
        modules.len(),
        diagnostics.len()
    );
    Ok(Program {
        root: root_code,
        modules,
        diagnostics,
    })
}

/// Render one circuit to program text. Components and wires that failed to
/// resolve are skipped with a diagnostic; everything else is still emitted.
pub fn generate(
    circuit: &Circuit,
    store: &Store,
    catalog: &Catalog,
    names: &mut NameRegistry,
    options: &GenerateOptions,
) -> GeneratedCircuit {
    let resolution = resolver::resolve(circuit, store, catalog);
    let mut diagnostics = resolution.diagnostics.clone();

    let mut sections: Vec<String> = vec![GGL_IMPORT.to_owned()];
    sections.extend(module_imports(circuit, store, options));
    sections.push(String::new());
    sections.push(format!("{CIRCUIT_VAR} = circuit.Circuit(js_logging=True)"));
    sections.push(String::new());

    let mut vars: HashMap<&str, String> = HashMap::new();
    for component in ordered(circuit) {
        // Components without a layout were already diagnosed by the
        // resolver; re-declaring them would just duplicate the report.
        if !resolution.layouts.contains_key(&component.id) {
            continue;
        }
        match catalog.declare(component, store, names) {
            Ok(declaration) => {
                vars.insert(&component.id, declaration.var);
                sections.extend(declaration.lines);
            }
            Err(error) => diagnostics.push(Diagnostic::component(error)),
        }
    }

    sections.push(String::new());
    sections.extend(connection_statements(circuit, &resolution, &vars));

    if options.emit_run {
        sections.push(format!("{CIRCUIT_VAR}.run()"));
    }
    if let Some(name) = &options.export {
        sections.push(String::new());
        sections.push(format!("{name} = circuit.Component({CIRCUIT_VAR})"));
    }

    let mut code = sections.join("\n");
    code.push('\n');
    GeneratedCircuit { code, diagnostics }
}

/// `from X import X` lines for every directly referenced sub-circuit,
/// deduplicated, sorted, self-import excluded.
fn module_imports(circuit: &Circuit, store: &Store, options: &GenerateOptions) -> BTreeSet<String> {
    circuit
        .subcircuit_refs()
        .filter_map(|c| c.props.circuit_id.as_deref())
        .filter_map(|id| store.module_name(id))
        .filter(|name| options.export.as_deref() != Some(name))
        .map(|name| format!("from {name} import {name}"))
        .collect()
}

/// Declaration order: IO inputs, then everything else, then IO outputs, each
/// group in stored order. Cosmetic but deterministic.
fn ordered(circuit: &Circuit) -> impl Iterator<Item = &Component> {
    (0..=2).flat_map(|group| {
        circuit
            .components
            .iter()
            .filter(move |c| c.kind.decl_group() == group)
    })
}

fn connection_statements(
    circuit: &Circuit,
    resolution: &Resolution,
    vars: &HashMap<&str, String>,
) -> Vec<String> {
    let mut seen: HashSet<(String, u32, String, u32)> = HashSet::new();
    let mut lines = Vec::new();

    for connection in &resolution.connections {
        // Connections touching a skipped component are dropped with it.
        let (Some(src_var), Some(dst_var)) = (
            vars.get(connection.source.component.as_str()),
            vars.get(connection.target.component.as_str()),
        ) else {
            continue;
        };
        // Two wires over the same port pair are one logical connection.
        if !seen.insert((
            connection.source.component.clone(),
            connection.source.port.index,
            connection.target.component.clone(),
            connection.target.port.index,
        )) {
            continue;
        }

        let src_expr = port_expr(circuit, resolution, &connection.source, src_var, "output");
        let dst_expr = port_expr(circuit, resolution, &connection.target, dst_var, "input");
        let comment = connection_comment(resolution, connection, src_var, dst_var);
        lines.push(format!(
            "{CIRCUIT_VAR}.connect({src_expr}, {dst_expr}, js_id=\"{}\")    {comment}",
            escape(&connection.wire)
        ));
    }

    lines
}

/// Bare variable when the component has exactly one port of the role;
/// sub-circuit instances are always name-qualified since their ports come
/// from user-defined labels.
fn port_expr(
    circuit: &Circuit,
    resolution: &Resolution,
    hit: &PortHit,
    var: &str,
    accessor: &str,
) -> String {
    let qualified = circuit
        .component(&hit.component)
        .is_some_and(|c| c.kind == ComponentKind::Subcircuit)
        || resolution
            .layouts
            .get(&hit.component)
            .is_some_and(|layout| layout.of_role(hit.port.role).len() > 1);
    if qualified {
        format!("{var}.{accessor}(\"{}\")", escape(&hit.port.name))
    } else {
        var.to_owned()
    }
}

fn connection_comment(
    resolution: &Resolution,
    connection: &ResolvedConnection,
    src_var: &str,
    dst_var: &str,
) -> String {
    let port_count = |hit: &PortHit| {
        resolution
            .layouts
            .get(&hit.component)
            .map_or(0, |layout| layout.of_role(hit.port.role).len())
    };

    let mut comment = format!("# {src_var}");
    let src = &connection.source;
    if port_count(src) > 1 && src.port.index > 0 {
        comment.push_str(&format!(".out[{}]", src.port.index));
    }
    comment.push_str(&format!(" -> {dst_var}"));
    let dst = &connection.target;
    if port_count(dst) > 1 || dst.port.index > 0 {
        comment.push_str(&format!(".in[{}]", dst.port.index));
    }
    comment
}
