use std::collections::HashMap;
use std::fmt::Display;

use crate::circuit::{Component, ComponentKind, Properties, Store};
use crate::diag::CompileError;
use crate::emit;
use crate::grid::{GridPos, GridVec};
use crate::naming::NameRegistry;

#[derive(serde::Deserialize, serde::Serialize, Copy, Debug, Clone, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum PortRole {
    Input,
    Output,
}

impl Display for PortRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Input => f.write_str("input"),
            Self::Output => f.write_str("output"),
        }
    }
}

/// A connection point derived from a component's kind and properties. Not a
/// stored entity; recomputed on demand through the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Port {
    pub role: PortRole,
    pub index: u32,
    pub name: String,
    pub offset: GridVec,
}

impl Port {
    pub fn new(role: PortRole, index: u32, name: impl Into<String>, offset: GridVec) -> Self {
        Self {
            role,
            index,
            name: name.into(),
            offset,
        }
    }

    /// Absolute grid position for a port of the given component.
    pub fn position(&self, component: &Component) -> GridPos {
        component.pos + self.offset
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PortLayout {
    pub inputs: Vec<Port>,
    pub outputs: Vec<Port>,
}

impl PortLayout {
    pub fn ports(&self) -> impl Iterator<Item = &Port> {
        self.inputs.iter().chain(self.outputs.iter())
    }

    pub fn of_role(&self, role: PortRole) -> &[Port] {
        match role {
            PortRole::Input => &self.inputs,
            PortRole::Output => &self.outputs,
        }
    }
}

/// Footprint in grid units.
#[derive(Copy, Debug, Clone, PartialEq, Eq)]
pub struct Dimensions {
    pub width: i32,
    pub height: i32,
}

/// A component's generated declaration: the variable name assigned to it and
/// one or more program statements (inputs and constants get a second line
/// setting their value).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declaration {
    pub var: String,
    pub lines: Vec<String>,
}

/// One catalog entry: the polymorphic "port layout + parameter emission"
/// capability, implemented once per component kind and selected through the
/// lookup table built at startup.
pub trait KindEntry {
    /// Default property bag for newly placed components of this kind.
    fn defaults(&self) -> Properties;

    /// Ports with grid-relative offsets, derived from the component's
    /// current properties. Sub-circuit references need the store to look up
    /// the referenced circuit's interface.
    fn port_layout(&self, component: &Component, store: &Store) -> Result<PortLayout, CompileError>;

    fn dimensions(&self, props: &Properties) -> Dimensions;

    /// Emit the component's declaration statement(s), assigning a variable
    /// name through the registry.
    fn declare(
        &self,
        component: &Component,
        store: &Store,
        names: &mut NameRegistry,
    ) -> Result<Declaration, CompileError>;
}

/// Static table of kind descriptors. Built once at process start, shared
/// read-only; not user-editable at runtime.
pub struct Catalog {
    entries: HashMap<ComponentKind, Box<dyn KindEntry>>,
}

impl Catalog {
    pub fn new() -> Self {
        let mut entries: HashMap<ComponentKind, Box<dyn KindEntry>> = HashMap::new();
        entries.insert(ComponentKind::Input, Box::new(emit::InputEntry));
        entries.insert(ComponentKind::Output, Box::new(emit::OutputEntry));
        entries.insert(ComponentKind::Constant, Box::new(emit::ConstantEntry));
        entries.insert(ComponentKind::Clock, Box::new(emit::ClockEntry));
        for (kind, class) in [
            (ComponentKind::AndGate, "And"),
            (ComponentKind::OrGate, "Or"),
            (ComponentKind::XorGate, "Xor"),
            (ComponentKind::NandGate, "Nand"),
            (ComponentKind::NorGate, "Nor"),
            (ComponentKind::XnorGate, "Xnor"),
        ] {
            entries.insert(kind, Box::new(emit::GateEntry::new(class, None)));
        }
        entries.insert(
            ComponentKind::NotGate,
            Box::new(emit::GateEntry::new("Not", Some(1))),
        );
        entries.insert(ComponentKind::Splitter, Box::new(emit::SplitterEntry));
        entries.insert(ComponentKind::Merger, Box::new(emit::MergerEntry));
        entries.insert(ComponentKind::Multiplexer, Box::new(emit::MultiplexerEntry));
        entries.insert(ComponentKind::Decoder, Box::new(emit::DecoderEntry));
        entries.insert(
            ComponentKind::PriorityEncoder,
            Box::new(emit::PriorityEncoderEntry),
        );
        entries.insert(ComponentKind::Register, Box::new(emit::RegisterEntry));
        entries.insert(ComponentKind::Rom, Box::new(emit::RomEntry));
        entries.insert(
            ComponentKind::Adder,
            Box::new(emit::ArithmeticEntry::new("Adder", "sum")),
        );
        entries.insert(
            ComponentKind::Subtract,
            Box::new(emit::ArithmeticEntry::new("Subtract", "s")),
        );
        entries.insert(ComponentKind::Subcircuit, Box::new(emit::SubcircuitEntry));
        Self { entries }
    }

    pub fn entry(&self, kind: ComponentKind) -> Result<&dyn KindEntry, CompileError> {
        self.entries
            .get(&kind)
            .map(|e| e.as_ref())
            .ok_or_else(|| CompileError::MissingCatalogEntry {
                kind: kind.tag().to_owned(),
            })
    }

    pub fn defaults(&self, kind: ComponentKind) -> Result<Properties, CompileError> {
        Ok(self.entry(kind)?.defaults())
    }

    pub fn port_layout(
        &self,
        component: &Component,
        store: &Store,
    ) -> Result<PortLayout, CompileError> {
        self.entry(component.kind)?.port_layout(component, store)
    }

    pub fn dimensions(&self, component: &Component) -> Result<Dimensions, CompileError> {
        Ok(self.entry(component.kind)?.dimensions(&component.props))
    }

    pub fn declare(
        &self,
        component: &Component,
        store: &Store,
        names: &mut NameRegistry,
    ) -> Result<Declaration, CompileError> {
        self.entry(component.kind)?.declare(component, store, names)
    }

    /// Place a component with its kind's default properties.
    pub fn component(
        &self,
        id: impl Into<String>,
        kind: ComponentKind,
        pos: GridPos,
    ) -> Result<Component, CompileError> {
        Ok(Component::new(id, kind, pos).with_props(self.defaults(kind)?))
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::new()
    }
}
