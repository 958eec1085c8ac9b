//! Geometric connection resolution.
//!
//! Connectivity is never stored. Every compile re-derives the netlist by
//! matching wire endpoint positions against the port layouts of the placed
//! components, so taps and drag edits stay consistent without incremental
//! bookkeeping.

use std::collections::{BTreeMap, HashMap};

use crate::catalog::{Catalog, Port, PortLayout, PortRole};
use crate::circuit::{Circuit, Store, Wire};
use crate::diag::{CompileError, Diagnostic};
use crate::grid::GridPos;

/// One end of a resolved connection: the component occupying the endpoint
/// position and the matched port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortHit {
    pub component: String,
    pub port: Port,
}

/// The ephemeral product of matching one wire's endpoints to real ports.
/// Recomputed on every compile, never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedConnection {
    pub wire: String,
    pub source: PortHit,
    pub target: PortHit,
}

/// Resolver output for one circuit: the netlist plus everything that failed
/// to resolve. Components whose layout could not be computed are absent from
/// `layouts` and their diagnostics are component-scoped.
#[derive(Debug, Default)]
pub struct Resolution {
    pub connections: Vec<ResolvedConnection>,
    /// Component id -> derived port layout, for every component that has one.
    pub layouts: BTreeMap<String, PortLayout>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Position index over all derived ports of a circuit, one bucket per role.
struct PortIndex {
    by_pos: HashMap<(GridPos, PortRole), Vec<PortHit>>,
}

impl PortIndex {
    fn build(circuit: &Circuit, layouts: &BTreeMap<String, PortLayout>) -> Self {
        let mut by_pos: HashMap<(GridPos, PortRole), Vec<PortHit>> = HashMap::new();
        for component in &circuit.components {
            let Some(layout) = layouts.get(&component.id) else {
                continue;
            };
            for port in layout.ports() {
                by_pos
                    .entry((port.position(component), port.role))
                    .or_default()
                    .push(PortHit {
                        component: component.id.clone(),
                        port: port.clone(),
                    });
            }
        }
        Self { by_pos }
    }

    fn at(&self, pos: GridPos, role: PortRole) -> &[PortHit] {
        self.by_pos
            .get(&(pos, role))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }
}

/// Resolve every wire in `circuit` against the port geometry of its
/// components. Failures are collected per wire or component; resolution
/// always runs to completion.
pub fn resolve(circuit: &Circuit, store: &Store, catalog: &Catalog) -> Resolution {
    let mut resolution = Resolution::default();

    for component in &circuit.components {
        match catalog.port_layout(component, store) {
            Ok(layout) => {
                resolution.layouts.insert(component.id.clone(), layout);
            }
            Err(error) => {
                log::debug!("skipping {}: {error}", component.display());
                resolution.diagnostics.push(Diagnostic::component(error));
            }
        }
    }

    let index = PortIndex::build(circuit, &resolution.layouts);

    for wire in &circuit.wires {
        // Stored roles are normalized at creation; a snapshot that violates
        // that is rejected per wire rather than trusted.
        if wire.start.role != PortRole::Output {
            resolution
                .diagnostics
                .push(Diagnostic::wire(CompileError::RoleMismatch {
                    wire: wire.id.clone(),
                    end: "start",
                    role: wire.start.role,
                }));
            continue;
        }
        if wire.end.role != PortRole::Input {
            resolution
                .diagnostics
                .push(Diagnostic::wire(CompileError::RoleMismatch {
                    wire: wire.id.clone(),
                    end: "end",
                    role: wire.end.role,
                }));
            continue;
        }

        let source = match single_hit(&index, wire, wire.start.pos, PortRole::Output) {
            Ok(hit) => hit,
            Err(diagnostic) => {
                log::warn!("excluding wire: {}", diagnostic.message());
                resolution.diagnostics.push(diagnostic);
                continue;
            }
        };
        let target = match single_hit(&index, wire, wire.end.pos, PortRole::Input) {
            Ok(hit) => hit,
            Err(diagnostic) => {
                log::warn!("excluding wire: {}", diagnostic.message());
                resolution.diagnostics.push(diagnostic);
                continue;
            }
        };

        resolution.connections.push(ResolvedConnection {
            wire: wire.id.clone(),
            source: source.clone(),
            target: target.clone(),
        });
    }

    resolution
}

fn single_hit<'a>(
    index: &'a PortIndex,
    wire: &Wire,
    pos: GridPos,
    role: PortRole,
) -> Result<&'a PortHit, Diagnostic> {
    match index.at(pos, role) {
        [] => Err(Diagnostic::wire(CompileError::NoPortAtPosition {
            wire: wire.id.clone(),
            pos,
            role,
        })),
        [hit] => Ok(hit),
        hits => Err(Diagnostic::wire(CompileError::MultiplePortsAtPosition {
            wire: wire.id.clone(),
            pos,
            role,
            count: hits.len(),
        })),
    }
}

/// Validation-only pass: advisory diagnostics for input ports no resolved
/// connection feeds. Layout and wire errors come back too, so callers get
/// the full picture from one call.
pub fn validate(circuit: &Circuit, store: &Store, catalog: &Catalog) -> Vec<Diagnostic> {
    let resolution = resolve(circuit, store, catalog);
    let mut diagnostics = resolution.diagnostics;

    for component in &circuit.components {
        let Some(layout) = resolution.layouts.get(&component.id) else {
            continue;
        };
        for port in &layout.inputs {
            let fed = resolution
                .connections
                .iter()
                .any(|c| c.target.component == component.id && c.target.port.index == port.index);
            if !fed {
                diagnostics.push(Diagnostic::component(CompileError::UnconnectedInput {
                    component: component.id.clone(),
                    port: port.name.clone(),
                }));
            }
        }
    }

    diagnostics
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::circuit::{Component, ComponentKind, Wire};
    use crate::diag::Severity;
    use crate::grid::pos;

    fn and_circuit() -> Circuit {
        // input(0,0) -> port (1,0); and-gate at (3,1) -> inputs (3,1)/(3,3),
        // output (6,2); output at (8,2) -> port (8,2).
        let mut circuit = Circuit::new("c1", "Main");
        circuit
            .add_component(Component::new("in-a", ComponentKind::Input, pos(0, 0)))
            .unwrap();
        circuit
            .add_component(Component::new("in-b", ComponentKind::Input, pos(0, 3)))
            .unwrap();
        circuit
            .add_component(Component::new("g", ComponentKind::AndGate, pos(3, 1)))
            .unwrap();
        circuit
            .add_component(Component::new("out", ComponentKind::Output, pos(8, 2)))
            .unwrap();
        circuit
    }

    #[test]
    fn wires_resolve_to_ports_by_position() {
        let mut circuit = and_circuit();
        circuit.add_wire(Wire::between("w1", pos(1, 0), pos(3, 1)));
        circuit.add_wire(Wire::between("w2", pos(1, 3), pos(3, 3)));
        circuit.add_wire(Wire::between("w3", pos(6, 2), pos(8, 2)));

        let resolution = resolve(&circuit, &Store::default(), &Catalog::new());
        assert!(resolution.diagnostics.is_empty());
        assert_eq!(resolution.connections.len(), 3);

        let w1 = &resolution.connections[0];
        assert_eq!(w1.source.component, "in-a");
        assert_eq!(w1.target.component, "g");
        assert_eq!(w1.target.port.name, "0");

        let w2 = &resolution.connections[1];
        assert_eq!(w2.target.port.name, "1");

        let w3 = &resolution.connections[2];
        assert_eq!(w3.source.component, "g");
        assert_eq!(w3.target.component, "out");
    }

    #[test]
    fn dangling_endpoint_excludes_only_that_wire() {
        let mut circuit = and_circuit();
        circuit.add_wire(Wire::between("w1", pos(1, 0), pos(3, 1)));
        circuit.add_wire(Wire::between("w2", pos(1, 3), pos(4, 4)));

        let resolution = resolve(&circuit, &Store::default(), &Catalog::new());
        assert_eq!(resolution.connections.len(), 1);
        assert_eq!(resolution.diagnostics.len(), 1);
        let diagnostic = &resolution.diagnostics[0];
        assert_eq!(diagnostic.code(), "no-port-at-position");
        assert!(diagnostic.message().contains("w2"));
        assert!(diagnostic.message().contains("(4, 4)"));
    }

    #[test]
    fn rotated_gate_resolves_at_its_rotated_input_positions() {
        // AND at (3, 1) turned a quarter: inputs land at (7, -1) and (5, -1),
        // the output stays on the pivot at (6, 2).
        let mut circuit = Circuit::new("c1", "Main");
        circuit
            .add_component(Component::new("in-a", ComponentKind::Input, pos(0, -1)))
            .unwrap();
        circuit
            .add_component(Component::new("in-b", ComponentKind::Input, pos(0, 1)))
            .unwrap();
        let mut gate = Component::new("g", ComponentKind::AndGate, pos(3, 1));
        gate.props.rotation = 90;
        circuit.add_component(gate).unwrap();
        circuit
            .add_component(Component::new("out", ComponentKind::Output, pos(9, 2)))
            .unwrap();
        circuit.add_wire(Wire::between("w1", pos(1, -1), pos(7, -1)));
        circuit.add_wire(Wire::between("w2", pos(1, 1), pos(5, -1)));
        circuit.add_wire(Wire::between("w3", pos(6, 2), pos(9, 2)));

        let resolution = resolve(&circuit, &Store::default(), &Catalog::new());
        assert!(resolution.diagnostics.is_empty());
        assert_eq!(resolution.connections.len(), 3);
        assert_eq!(resolution.connections[0].target.port.name, "0");
        assert_eq!(resolution.connections[1].target.port.name, "1");
        assert_eq!(resolution.connections[2].source.component, "g");
    }

    #[test]
    fn overlapping_ports_are_ambiguous() {
        let mut circuit = and_circuit();
        // A second input stacked exactly on in-a's port position.
        circuit
            .add_component(Component::new("in-dup", ComponentKind::Input, pos(0, 0)))
            .unwrap();
        circuit.add_wire(Wire::between("w1", pos(1, 0), pos(3, 1)));

        let resolution = resolve(&circuit, &Store::default(), &Catalog::new());
        assert!(resolution.connections.is_empty());
        assert_eq!(resolution.diagnostics[0].code(), "multiple-ports-at-position");
    }

    #[test]
    fn shared_source_endpoint_resolves_both_wires() {
        // Tap pattern: two wires leaving the same output port.
        let mut circuit = and_circuit();
        circuit
            .add_component(Component::new("out2", ComponentKind::Output, pos(8, 5)))
            .unwrap();
        circuit.add_wire(Wire::between("w1", pos(1, 0), pos(3, 1)));
        circuit.add_wire(Wire::between("w2", pos(1, 0), pos(3, 3)));

        let resolution = resolve(&circuit, &Store::default(), &Catalog::new());
        assert_eq!(resolution.connections.len(), 2);
        assert_eq!(resolution.connections[0].source, resolution.connections[1].source);
    }

    #[test]
    fn denormalized_roles_are_rejected_per_wire() {
        let mut circuit = and_circuit();
        let mut wire = Wire::between("w1", pos(1, 0), pos(3, 1));
        wire.start.role = PortRole::Input;
        circuit.add_wire(wire);

        let resolution = resolve(&circuit, &Store::default(), &Catalog::new());
        assert!(resolution.connections.is_empty());
        assert_eq!(resolution.diagnostics[0].code(), "role-mismatch");
    }

    #[test]
    fn unresolvable_component_surfaces_once_and_wires_to_it_dangle() {
        let mut circuit = and_circuit();
        let mut reference = Component::new("u1", ComponentKind::Subcircuit, pos(12, 0));
        reference.props.circuit_id = Some("ghost".to_owned());
        circuit.add_component(reference).unwrap();
        circuit.add_wire(Wire::between("w1", pos(6, 2), pos(12, 2)));

        let resolution = resolve(&circuit, &Store::default(), &Catalog::new());
        let codes: Vec<_> = resolution.diagnostics.iter().map(Diagnostic::code).collect();
        assert_eq!(
            codes,
            vec!["missing-subcircuit-definition", "no-port-at-position"]
        );
    }

    #[test]
    fn validate_reports_unfed_inputs_as_advice() {
        let mut circuit = and_circuit();
        circuit.add_wire(Wire::between("w1", pos(1, 0), pos(3, 1)));
        circuit.add_wire(Wire::between("w3", pos(6, 2), pos(8, 2)));

        let diagnostics = validate(&circuit, &Store::default(), &Catalog::new());
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].code(), "unconnected-input");
        assert_eq!(diagnostics[0].severity(), Severity::Advice);
        assert!(diagnostics[0].message().contains('g'));
    }

    #[test]
    fn fully_wired_circuit_validates_clean() {
        let mut circuit = and_circuit();
        circuit.add_wire(Wire::between("w1", pos(1, 0), pos(3, 1)));
        circuit.add_wire(Wire::between("w2", pos(1, 3), pos(3, 3)));
        circuit.add_wire(Wire::between("w3", pos(6, 2), pos(8, 2)));
        assert!(validate(&circuit, &Store::default(), &Catalog::new()).is_empty());
    }
}
