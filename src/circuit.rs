use std::collections::BTreeMap;
use std::fmt::Display;

use thiserror::Error;

use crate::catalog::PortRole;
use crate::grid::GridPos;

/// Catalog kind tag for a placed component. The serialized tags match the
/// persistence format produced by the editor layer.
#[derive(serde::Deserialize, serde::Serialize, Copy, Debug, Clone, PartialEq, Eq, Hash)]
pub enum ComponentKind {
    #[serde(rename = "input")]
    Input,
    #[serde(rename = "output")]
    Output,
    #[serde(rename = "constant")]
    Constant,
    #[serde(rename = "clock")]
    Clock,
    #[serde(rename = "and-gate")]
    AndGate,
    #[serde(rename = "or-gate")]
    OrGate,
    #[serde(rename = "xor-gate")]
    XorGate,
    #[serde(rename = "not-gate")]
    NotGate,
    #[serde(rename = "nand-gate")]
    NandGate,
    #[serde(rename = "nor-gate")]
    NorGate,
    #[serde(rename = "xnor-gate")]
    XnorGate,
    #[serde(rename = "splitter")]
    Splitter,
    #[serde(rename = "merger")]
    Merger,
    #[serde(rename = "multiplexer")]
    Multiplexer,
    #[serde(rename = "decoder")]
    Decoder,
    #[serde(rename = "priorityEncoder")]
    PriorityEncoder,
    #[serde(rename = "register")]
    Register,
    #[serde(rename = "rom")]
    Rom,
    #[serde(rename = "adder")]
    Adder,
    #[serde(rename = "subtract")]
    Subtract,
    #[serde(rename = "subcircuit")]
    Subcircuit,
}

impl ComponentKind {
    pub fn tag(self) -> &'static str {
        match self {
            Self::Input => "input",
            Self::Output => "output",
            Self::Constant => "constant",
            Self::Clock => "clock",
            Self::AndGate => "and-gate",
            Self::OrGate => "or-gate",
            Self::XorGate => "xor-gate",
            Self::NotGate => "not-gate",
            Self::NandGate => "nand-gate",
            Self::NorGate => "nor-gate",
            Self::XnorGate => "xnor-gate",
            Self::Splitter => "splitter",
            Self::Merger => "merger",
            Self::Multiplexer => "multiplexer",
            Self::Decoder => "decoder",
            Self::PriorityEncoder => "priorityEncoder",
            Self::Register => "register",
            Self::Rom => "rom",
            Self::Adder => "adder",
            Self::Subtract => "subtract",
            Self::Subcircuit => "subcircuit",
        }
    }

    /// Short prefix used for generated variable names. Gate kinds drop the
    /// decorative "-gate" suffix so `and-gate` instances become `and0`,
    /// `and1`, ...
    pub fn name_hint(self) -> &'static str {
        match self {
            Self::Input => "input",
            Self::Output => "output",
            Self::Constant => "constant",
            Self::Clock => "clk",
            Self::AndGate => "and",
            Self::OrGate => "or",
            Self::XorGate => "xor",
            Self::NotGate => "not",
            Self::NandGate => "nand",
            Self::NorGate => "nor",
            Self::XnorGate => "xnor",
            Self::Splitter => "splitter",
            Self::Merger => "merger",
            Self::Multiplexer => "mux",
            Self::Decoder => "decoder",
            Self::PriorityEncoder => "priorityEncoder",
            Self::Register => "reg",
            Self::Rom => "rom",
            Self::Adder => "adder",
            Self::Subtract => "sub",
            Self::Subcircuit => "component",
        }
    }

    /// Declaration-order group: IO inputs first, outputs last, everything
    /// else in between. Cosmetic, but it keeps generated programs diffable.
    pub(crate) fn decl_group(self) -> u8 {
        match self {
            Self::Input => 0,
            Self::Output => 2,
            _ => 1,
        }
    }
}

impl Display for ComponentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.tag())
    }
}

/// Which edge a multiplexer/decoder selector port enters through.
#[derive(serde::Deserialize, serde::Serialize, Copy, Debug, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SelectorPosition {
    Top,
    #[default]
    Bottom,
}

/// One contiguous bit slice of a splitter or merger.
#[derive(serde::Deserialize, serde::Serialize, Copy, Debug, Clone, PartialEq, Eq)]
pub struct BitRange {
    pub start: u32,
    pub end: u32,
}

impl BitRange {
    pub const fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }
}

/// Kind-specific property bag. All fields are optional in the persistence
/// format; absent fields take the generic defaults here, and each catalog
/// entry documents which of its parameters are elided from generated code
/// when left at their default.
#[derive(serde::Deserialize, serde::Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct Properties {
    pub label: String,
    pub bits: u32,
    pub value: u64,
    pub base: u32,
    pub rotation: u32,
    pub num_inputs: u32,
    pub num_outputs: u32,
    pub inverted_inputs: Vec<u32>,
    pub frequency: u32,
    pub ranges: Vec<BitRange>,
    pub selector_position: SelectorPosition,
    pub address_bits: u32,
    pub data_bits: u32,
    pub data: Vec<u64>,
    /// Referenced circuit id; only meaningful for `subcircuit` components.
    pub circuit_id: Option<String>,
}

impl Default for Properties {
    fn default() -> Self {
        Self {
            label: String::new(),
            bits: 1,
            value: 0,
            base: 10,
            rotation: 0,
            num_inputs: 2,
            num_outputs: 4,
            inverted_inputs: Vec::new(),
            frequency: 1,
            ranges: Vec::new(),
            selector_position: SelectorPosition::default(),
            address_bits: 4,
            data_bits: 8,
            data: Vec::new(),
            circuit_id: None,
        }
    }
}

/// A placed instance of a catalog kind. `pos` is the component's grid
/// origin; port positions are derived from it through the catalog.
#[derive(serde::Deserialize, serde::Serialize, Debug, Clone, PartialEq, Eq)]
pub struct Component {
    pub id: String,
    pub kind: ComponentKind,
    pub pos: GridPos,
    #[serde(default)]
    pub props: Properties,
}

impl Component {
    pub fn new(id: impl Into<String>, kind: ComponentKind, pos: GridPos) -> Self {
        Self {
            id: id.into(),
            kind,
            pos,
            props: Properties::default(),
        }
    }

    pub fn with_props(mut self, props: Properties) -> Self {
        self.props = props;
        self
    }

    pub fn display(&self) -> String {
        format!("{} [{}]", self.kind, self.id)
    }
}

/// One endpoint of a wire: a grid position plus the role the port there is
/// expected to have. Never a component reference; connectivity is re-derived
/// from geometry on every compile.
#[derive(serde::Deserialize, serde::Serialize, Copy, Debug, Clone, PartialEq, Eq)]
pub struct WireEnd {
    pub pos: GridPos,
    pub role: PortRole,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("wire \"{0}\" has no waypoints")]
pub struct EmptyWire(pub String);

/// A user-drawn connection path. Orientation is normalized at creation time:
/// `start` always expects an output port, `end` always expects an input.
#[derive(serde::Deserialize, serde::Serialize, Debug, Clone, PartialEq, Eq)]
pub struct Wire {
    pub id: String,
    pub points: Vec<GridPos>,
    pub start: WireEnd,
    pub end: WireEnd,
}

impl Wire {
    /// Build a wire from an ordered waypoint list, source end first.
    pub fn from_points(id: impl Into<String>, points: Vec<GridPos>) -> Result<Self, EmptyWire> {
        let id = id.into();
        let (Some(&first), Some(&last)) = (points.first(), points.last()) else {
            return Err(EmptyWire(id));
        };
        Ok(Self {
            id,
            points,
            start: WireEnd {
                pos: first,
                role: PortRole::Output,
            },
            end: WireEnd {
                pos: last,
                role: PortRole::Input,
            },
        })
    }

    /// Straight wire between two points, source first.
    pub fn between(id: impl Into<String>, from: GridPos, to: GridPos) -> Self {
        Self::from_points(id, vec![from, to]).expect("two waypoints")
    }

    /// Flip the waypoint order. Used when the user drew the wire starting
    /// from an input port; the endpoint roles stay normalized.
    pub fn reverse(&mut self) {
        self.points.reverse();
        self.start.pos = self.points[0];
        self.end.pos = self.points[self.points.len() - 1];
    }
}

/// Record of a wire tap. Only kept so the editor can re-derive tap semantics
/// on later edits; connection resolution never consults it, because the
/// tapped wire and its branch are just two wires sharing an endpoint.
#[derive(serde::Deserialize, serde::Serialize, Debug, Clone, PartialEq, Eq)]
pub struct Junction {
    pub pos: GridPos,
    pub source_wire_index: usize,
    pub branch_wire_id: String,
}

/// One side of a circuit's derived interface descriptor.
#[derive(serde::Deserialize, serde::Serialize, Debug, Clone, PartialEq, Eq)]
pub struct PortSpec {
    pub id: String,
    pub label: String,
    pub bits: u32,
}

#[derive(serde::Deserialize, serde::Serialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct CircuitInterface {
    pub inputs: Vec<PortSpec>,
    pub outputs: Vec<PortSpec>,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("component id \"{0}\" already exists in this circuit")]
pub struct DuplicateComponentId(pub String);

/// A named graph of components, wires and junctions. Component and wire
/// order is stored order; generation relies on it for deterministic output.
#[derive(serde::Deserialize, serde::Serialize, Debug, Clone, PartialEq, Eq)]
pub struct Circuit {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub components: Vec<Component>,
    #[serde(default)]
    pub wires: Vec<Wire>,
    #[serde(default)]
    pub junctions: Vec<Junction>,
}

impl Circuit {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            id: id.into(),
            label: name.clone(),
            name,
            components: Vec::new(),
            wires: Vec::new(),
            junctions: Vec::new(),
        }
    }

    /// Component ids are unique within a circuit; duplicates are rejected
    /// rather than silently shadowed.
    pub fn add_component(&mut self, component: Component) -> Result<(), DuplicateComponentId> {
        if self.component(&component.id).is_some() {
            return Err(DuplicateComponentId(component.id));
        }
        self.components.push(component);
        Ok(())
    }

    pub fn component(&self, id: &str) -> Option<&Component> {
        self.components.iter().find(|c| c.id == id)
    }

    pub fn component_mut(&mut self, id: &str) -> Option<&mut Component> {
        self.components.iter_mut().find(|c| c.id == id)
    }

    pub fn remove_component(&mut self, id: &str) -> Option<Component> {
        let idx = self.components.iter().position(|c| c.id == id)?;
        Some(self.components.remove(idx))
    }

    pub fn add_wire(&mut self, wire: Wire) {
        self.wires.push(wire);
    }

    pub fn remove_wire(&mut self, id: &str) -> Option<Wire> {
        let idx = self.wires.iter().position(|w| w.id == id)?;
        Some(self.wires.remove(idx))
    }

    pub fn subcircuit_refs(&self) -> impl Iterator<Item = &Component> {
        self.components
            .iter()
            .filter(|c| c.kind == ComponentKind::Subcircuit)
    }

    /// Derive the interface descriptor from the circuit's IO components, in
    /// stored order. This is what a `subcircuit` component referencing this
    /// circuit exposes as its port layout.
    pub fn interface(&self) -> CircuitInterface {
        let mut interface = CircuitInterface::default();
        for c in &self.components {
            let spec = |fallback: &str| PortSpec {
                id: c.id.clone(),
                label: if c.props.label.is_empty() {
                    fallback.to_owned()
                } else {
                    c.props.label.clone()
                },
                bits: c.props.bits,
            };
            match c.kind {
                ComponentKind::Input => interface.inputs.push(spec("IN")),
                ComponentKind::Output => interface.outputs.push(spec("OUT")),
                _ => {}
            }
        }
        interface
    }
}

/// Registry entry for a circuit promoted to a reusable component. The
/// exported module symbol is `name`; `circuit_id` is the backing circuit.
#[derive(serde::Deserialize, serde::Serialize, Debug, Clone, PartialEq, Eq)]
pub struct ComponentDefinition {
    pub name: String,
    pub circuit_id: String,
}

/// Snapshot of the whole circuit store as handed over by the editor or file
/// loader. Read-only during a compile pass. `BTreeMap` keeps iteration
/// deterministic wherever the maps do end up driving output.
#[derive(serde::Deserialize, serde::Serialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct Store {
    pub circuits: BTreeMap<String, Circuit>,
    /// Keyed by the backing circuit id, matching `subcircuit` component
    /// properties.
    pub available_components: BTreeMap<String, ComponentDefinition>,
}

impl Store {
    pub fn circuit(&self, id: &str) -> Option<&Circuit> {
        self.circuits.get(id)
    }

    pub fn add_circuit(&mut self, circuit: Circuit) {
        self.circuits.insert(circuit.id.clone(), circuit);
    }

    pub fn definition(&self, circuit_id: &str) -> Option<&ComponentDefinition> {
        self.available_components.get(circuit_id)
    }

    /// Promote a circuit to a reusable component under the given name.
    pub fn register_component(&mut self, circuit_id: impl Into<String>, name: impl Into<String>) {
        let circuit_id = circuit_id.into();
        self.available_components.insert(
            circuit_id.clone(),
            ComponentDefinition {
                name: name.into(),
                circuit_id,
            },
        );
    }

    /// Module name a sub-circuit reference to `circuit_id` resolves to. The
    /// registered component name wins over the circuit's own name when both
    /// exist and disagree.
    pub fn module_name(&self, circuit_id: &str) -> Option<&str> {
        if let Some(def) = self.definition(circuit_id) {
            return Some(&def.name);
        }
        self.circuit(circuit_id).map(|c| c.name.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::pos;

    #[test]
    fn duplicate_component_ids_are_rejected() {
        let mut circuit = Circuit::new("c1", "Circuit 1");
        circuit
            .add_component(Component::new("a", ComponentKind::Input, pos(0, 0)))
            .expect("first insert");
        let err = circuit
            .add_component(Component::new("a", ComponentKind::Output, pos(4, 0)))
            .expect_err("duplicate id");
        assert_eq!(err, DuplicateComponentId("a".to_owned()));
        assert_eq!(circuit.components.len(), 1);
    }

    #[test]
    fn wire_orientation_is_normalized() {
        let wire = Wire::between("w1", pos(1, 0), pos(3, 1));
        assert_eq!(wire.start.role, PortRole::Output);
        assert_eq!(wire.end.role, PortRole::Input);

        let mut reversed = wire.clone();
        reversed.reverse();
        assert_eq!(reversed.start.pos, pos(3, 1));
        assert_eq!(reversed.start.role, PortRole::Output);
        assert_eq!(reversed.end.role, PortRole::Input);
    }

    #[test]
    fn empty_wire_is_rejected_at_construction() {
        let err = Wire::from_points("w0", Vec::new()).expect_err("no waypoints");
        assert_eq!(err, EmptyWire("w0".to_owned()));
    }

    #[test]
    fn interface_derives_from_io_components_in_order() {
        let mut circuit = Circuit::new("c1", "Half");
        let mut a = Component::new("in-a", ComponentKind::Input, pos(0, 0));
        a.props.label = "A".to_owned();
        let mut b = Component::new("in-b", ComponentKind::Input, pos(0, 2));
        b.props.label = "B".to_owned();
        b.props.bits = 4;
        let s = Component::new("out-s", ComponentKind::Output, pos(8, 1));
        circuit.add_component(a).unwrap();
        circuit.add_component(b).unwrap();
        circuit
            .add_component(Component::new("g", ComponentKind::AndGate, pos(3, 0)))
            .unwrap();
        circuit.add_component(s).unwrap();

        let interface = circuit.interface();
        assert_eq!(interface.inputs.len(), 2);
        assert_eq!(interface.inputs[0].label, "A");
        assert_eq!(interface.inputs[1].bits, 4);
        assert_eq!(interface.outputs.len(), 1);
        // Unlabeled outputs fall back to a placeholder.
        assert_eq!(interface.outputs[0].label, "OUT");
    }

    #[test]
    fn registered_component_name_wins_over_circuit_name() {
        let mut store = Store::default();
        store.add_circuit(Circuit::new("c1", "Scratch"));
        assert_eq!(store.module_name("c1"), Some("Scratch"));
        store.register_component("c1", "Adder4");
        assert_eq!(store.module_name("c1"), Some("Adder4"));
        assert_eq!(store.module_name("missing"), None);
    }

    #[test]
    fn store_snapshot_round_trips_through_json() {
        let mut store = Store::default();
        let mut circuit = Circuit::new("c1", "Main");
        circuit
            .add_component(Component::new("a", ComponentKind::Input, pos(0, 0)))
            .unwrap();
        circuit.add_wire(Wire::between("w1", pos(1, 0), pos(3, 1)));
        store.add_circuit(circuit);
        store.register_component("c1", "Main");

        let json = serde_json::to_string_pretty(&store).expect("serialize");
        let loaded: Store = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(loaded, store);
    }
}
