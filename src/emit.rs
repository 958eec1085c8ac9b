//! Per-kind catalog entries: port layouts and declaration emission.
//!
//! Parameter order in every declaration is label first, kind-specific
//! parameters next, then the `js_id` identity tag the runtime bridge uses to
//! route live values back to the visual component. Parameters equal to the
//! kind's documented default are elided.

use crate::catalog::{Declaration, Dimensions, KindEntry, Port, PortLayout, PortRole};
use crate::circuit::{BitRange, Component, Properties, SelectorPosition, Store};
use crate::diag::CompileError;
use crate::grid::{GridVec, vec2};
use crate::naming::NameRegistry;

/// Escape a string for embedding in a double-quoted program literal.
pub(crate) fn escape(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Format an IO value in the literal syntax selected by its display base,
/// zero-padded to the component's bit width.
pub(crate) fn format_value(value: u64, base: u32, bits: u32) -> String {
    match base {
        16 => format!("0x{value:0width$X}", width = bits.div_ceil(4) as usize),
        2 => format!("0b{value:0width$b}", width = bits as usize),
        _ => value.to_string(),
    }
}

/// Ordered parameter list for one declaration.
struct Params {
    parts: Vec<String>,
}

impl Params {
    fn new() -> Self {
        Self { parts: Vec::new() }
    }

    /// Identity parameters come first; an empty label is the default and is
    /// dropped.
    fn label(&mut self, label: &str) {
        if !label.is_empty() {
            self.parts.push(format!("label=\"{}\"", escape(label)));
        }
    }

    fn push(&mut self, name: &str, value: impl std::fmt::Display) {
        self.parts.push(format!("{name}={value}"));
    }

    fn push_if(&mut self, cond: bool, name: &str, value: impl std::fmt::Display) {
        if cond {
            self.push(name, value);
        }
    }

    /// Close the list with the synthetic identity tag, always last.
    fn finish(mut self, js_id: &str) -> String {
        self.parts.push(format!("js_id=\"{}\"", escape(js_id)));
        self.parts.join(", ")
    }
}

fn ranges_literal(ranges: &[BitRange]) -> String {
    let tuples: Vec<String> = ranges
        .iter()
        .map(|r| format!("({},{})", r.start, r.end))
        .collect();
    format!("[{}]", tuples.join(", "))
}

fn list_literal(values: &[u32]) -> String {
    let items: Vec<String> = values.iter().map(u32::to_string).collect();
    format!("[{}]", items.join(", "))
}

fn default_ranges() -> Vec<BitRange> {
    vec![
        BitRange::new(0, 1),
        BitRange::new(2, 3),
        BitRange::new(4, 5),
        BitRange::new(6, 7),
    ]
}

// IO kinds

pub struct InputEntry;

impl KindEntry for InputEntry {
    fn defaults(&self) -> Properties {
        Properties::default()
    }

    fn port_layout(&self, _c: &Component, _store: &Store) -> Result<PortLayout, CompileError> {
        Ok(PortLayout {
            inputs: Vec::new(),
            outputs: vec![Port::new(PortRole::Output, 0, "0", vec2(1, 0))],
        })
    }

    fn dimensions(&self, _props: &Properties) -> Dimensions {
        Dimensions {
            width: 1,
            height: 1,
        }
    }

    fn declare(
        &self,
        c: &Component,
        _store: &Store,
        names: &mut NameRegistry,
    ) -> Result<Declaration, CompileError> {
        let var = names.name_for(&c.id, c.kind.name_hint());
        let p = &c.props;
        let mut params = Params::new();
        params.label(&p.label);
        params.push_if(p.bits != 1, "bits", p.bits);
        Ok(Declaration {
            lines: vec![
                format!("{var} = io.Input({})", params.finish(&c.id)),
                format!("{var}.value = {}", format_value(p.value, p.base, p.bits)),
            ],
            var,
        })
    }
}

pub struct OutputEntry;

impl KindEntry for OutputEntry {
    fn defaults(&self) -> Properties {
        Properties::default()
    }

    fn port_layout(&self, _c: &Component, _store: &Store) -> Result<PortLayout, CompileError> {
        Ok(PortLayout {
            inputs: vec![Port::new(PortRole::Input, 0, "0", vec2(0, 0))],
            outputs: Vec::new(),
        })
    }

    fn dimensions(&self, _props: &Properties) -> Dimensions {
        Dimensions {
            width: 1,
            height: 1,
        }
    }

    fn declare(
        &self,
        c: &Component,
        _store: &Store,
        names: &mut NameRegistry,
    ) -> Result<Declaration, CompileError> {
        let var = names.name_for(&c.id, c.kind.name_hint());
        let p = &c.props;
        let mut params = Params::new();
        params.label(&p.label);
        params.push_if(p.bits != 1, "bits", p.bits);
        Ok(Declaration {
            lines: vec![format!("{var} = io.Output({})", params.finish(&c.id))],
            var,
        })
    }
}

pub struct ConstantEntry;

impl KindEntry for ConstantEntry {
    fn defaults(&self) -> Properties {
        Properties::default()
    }

    fn port_layout(&self, _c: &Component, _store: &Store) -> Result<PortLayout, CompileError> {
        Ok(PortLayout {
            inputs: Vec::new(),
            outputs: vec![Port::new(PortRole::Output, 0, "0", vec2(1, 0))],
        })
    }

    fn dimensions(&self, _props: &Properties) -> Dimensions {
        Dimensions {
            width: 1,
            height: 1,
        }
    }

    fn declare(
        &self,
        c: &Component,
        _store: &Store,
        names: &mut NameRegistry,
    ) -> Result<Declaration, CompileError> {
        let var = names.name_for(&c.id, c.kind.name_hint());
        let p = &c.props;
        let mut params = Params::new();
        params.label(&p.label);
        params.push_if(p.bits != 1, "bits", p.bits);
        Ok(Declaration {
            lines: vec![
                format!("{var} = io.Constant({})", params.finish(&c.id)),
                format!("{var}.value = {}", format_value(p.value, p.base, p.bits)),
            ],
            var,
        })
    }
}

pub struct ClockEntry;

impl KindEntry for ClockEntry {
    fn defaults(&self) -> Properties {
        Properties::default()
    }

    fn port_layout(&self, _c: &Component, _store: &Store) -> Result<PortLayout, CompileError> {
        Ok(PortLayout {
            inputs: Vec::new(),
            outputs: vec![Port::new(PortRole::Output, 0, "0", vec2(1, 0))],
        })
    }

    fn dimensions(&self, _props: &Properties) -> Dimensions {
        Dimensions {
            width: 1,
            height: 1,
        }
    }

    fn declare(
        &self,
        c: &Component,
        _store: &Store,
        names: &mut NameRegistry,
    ) -> Result<Declaration, CompileError> {
        let var = names.name_for(&c.id, c.kind.name_hint());
        let p = &c.props;
        let mut params = Params::new();
        params.label(&p.label);
        params.push("frequency", p.frequency);
        Ok(Declaration {
            lines: vec![format!("{var} = io.Clock({})", params.finish(&c.id))],
            var,
        })
    }
}

// Logic gates

/// Discrete quarter-turn rotation of a port offset around a pivot. Angles
/// outside {90, 180, 270} leave the offset untouched.
fn rotated(offset: GridVec, rotation: u32, pivot: GridVec) -> GridVec {
    let t = vec2(offset.x - pivot.x, offset.y - pivot.y);
    let r = match rotation {
        90 => vec2(-t.y, t.x),
        180 => vec2(-t.x, -t.y),
        270 => vec2(t.y, -t.x),
        _ => t,
    };
    vec2(r.x + pivot.x, r.y + pivot.y)
}

pub struct GateEntry {
    class: &'static str,
    /// `Some(n)` for kinds with a fixed arity (NOT), `None` for the
    /// `num_inputs`-driven kinds.
    fixed_inputs: Option<u32>,
}

impl GateEntry {
    pub fn new(class: &'static str, fixed_inputs: Option<u32>) -> Self {
        Self {
            class,
            fixed_inputs,
        }
    }

    fn arity(&self, props: &Properties) -> u32 {
        self.fixed_inputs.unwrap_or_else(|| props.num_inputs.max(1))
    }
}

impl KindEntry for GateEntry {
    fn defaults(&self) -> Properties {
        Properties {
            num_inputs: self.fixed_inputs.unwrap_or(2),
            ..Properties::default()
        }
    }

    fn port_layout(&self, c: &Component, _store: &Store) -> Result<PortLayout, CompileError> {
        let n = self.arity(&c.props);
        let out_y = if n <= 2 { 1 } else { n as i32 - 1 };
        // The output point is the rotation pivot, so it never moves itself.
        let out = vec2(3, out_y);
        let inputs = (0..n)
            .map(|i| {
                // Inverted inputs sit one unit left to make room for the
                // inversion bubble.
                let x = if c.props.inverted_inputs.contains(&i) {
                    -1
                } else {
                    0
                };
                let offset = rotated(vec2(x, 2 * i as i32), c.props.rotation, out);
                Port::new(PortRole::Input, i, i.to_string(), offset)
            })
            .collect();
        Ok(PortLayout {
            inputs,
            outputs: vec![Port::new(PortRole::Output, 0, "0", out)],
        })
    }

    fn dimensions(&self, props: &Properties) -> Dimensions {
        let n = self.arity(props);
        Dimensions {
            width: 3,
            height: ((n as i32 - 1) * 2).max(2),
        }
    }

    fn declare(
        &self,
        c: &Component,
        _store: &Store,
        names: &mut NameRegistry,
    ) -> Result<Declaration, CompileError> {
        let var = names.name_for(&c.id, c.kind.name_hint());
        let p = &c.props;
        let mut params = Params::new();
        params.label(&p.label);
        params.push_if(p.bits != 1, "bits", p.bits);
        if self.fixed_inputs.is_none() {
            params.push_if(p.num_inputs != 2, "num_inputs", p.num_inputs);
        }
        if !p.inverted_inputs.is_empty() {
            params.push("inverted_inputs", list_literal(&p.inverted_inputs));
        }
        Ok(Declaration {
            lines: vec![format!(
                "{var} = logic.{}({})",
                self.class,
                params.finish(&c.id)
            )],
            var,
        })
    }
}

// Wire-shaping kinds

/// Vertical center of an odd-or-even height, rounding half up like the grid
/// snap does.
fn center(total_height: i32) -> i32 {
    (total_height as f64 / 2.0).round() as i32
}

/// Evenly spaced port rows with one-unit margins top and bottom, snapped to
/// the grid; a single port sits at the vertical center.
fn spread(count: usize, total_height: i32, index: usize) -> i32 {
    if count <= 1 {
        return center(total_height);
    }
    let spacing = (total_height - 2) as f64 / (count - 1) as f64;
    (1.0 + index as f64 * spacing).round() as i32
}

pub struct SplitterEntry;

impl KindEntry for SplitterEntry {
    fn defaults(&self) -> Properties {
        Properties {
            bits: 8,
            ranges: default_ranges(),
            ..Properties::default()
        }
    }

    fn port_layout(&self, c: &Component, _store: &Store) -> Result<PortLayout, CompileError> {
        let count = c.props.ranges.len();
        let height = (count as i32 + 1).max(4);
        let outputs = (0..count)
            .map(|i| {
                Port::new(
                    PortRole::Output,
                    i as u32,
                    i.to_string(),
                    vec2(2, spread(count, height, i)),
                )
            })
            .collect();
        Ok(PortLayout {
            inputs: vec![Port::new(PortRole::Input, 0, "0", vec2(0, center(height)))],
            outputs,
        })
    }

    fn dimensions(&self, props: &Properties) -> Dimensions {
        Dimensions {
            width: 2,
            height: (props.ranges.len() as i32 + 1).max(4),
        }
    }

    fn declare(
        &self,
        c: &Component,
        _store: &Store,
        names: &mut NameRegistry,
    ) -> Result<Declaration, CompileError> {
        let var = names.name_for(&c.id, c.kind.name_hint());
        let p = &c.props;
        let mut params = Params::new();
        params.label(&p.label);
        params.push("bits", p.bits);
        params.push("splits", ranges_literal(&p.ranges));
        Ok(Declaration {
            lines: vec![format!("{var} = wires.Splitter({})", params.finish(&c.id))],
            var,
        })
    }
}

pub struct MergerEntry;

impl KindEntry for MergerEntry {
    fn defaults(&self) -> Properties {
        Properties {
            bits: 8,
            ranges: default_ranges(),
            ..Properties::default()
        }
    }

    fn port_layout(&self, c: &Component, _store: &Store) -> Result<PortLayout, CompileError> {
        let count = c.props.ranges.len();
        let height = (count as i32 + 1).max(4);
        let inputs = (0..count)
            .map(|i| {
                Port::new(
                    PortRole::Input,
                    i as u32,
                    i.to_string(),
                    vec2(0, spread(count, height, i)),
                )
            })
            .collect();
        Ok(PortLayout {
            inputs,
            outputs: vec![Port::new(PortRole::Output, 0, "0", vec2(2, center(height)))],
        })
    }

    fn dimensions(&self, props: &Properties) -> Dimensions {
        Dimensions {
            width: 2,
            height: (props.ranges.len() as i32 + 1).max(4),
        }
    }

    fn declare(
        &self,
        c: &Component,
        _store: &Store,
        names: &mut NameRegistry,
    ) -> Result<Declaration, CompileError> {
        let var = names.name_for(&c.id, c.kind.name_hint());
        let p = &c.props;
        let mut params = Params::new();
        params.label(&p.label);
        params.push("bits", p.bits);
        params.push("merge_inputs", ranges_literal(&p.ranges));
        Ok(Declaration {
            lines: vec![format!("{var} = wires.Merger({})", params.finish(&c.id))],
            var,
        })
    }
}

// Plexers

pub struct MultiplexerEntry;

impl KindEntry for MultiplexerEntry {
    fn defaults(&self) -> Properties {
        Properties {
            num_inputs: 4,
            ..Properties::default()
        }
    }

    fn port_layout(&self, c: &Component, _store: &Store) -> Result<PortLayout, CompileError> {
        let n = c.props.num_inputs.max(2);
        let height = (n as i32 - 1) * 2 + 2;
        let mut inputs: Vec<Port> = (0..n)
            .map(|i| Port::new(PortRole::Input, i, i.to_string(), vec2(0, 1 + 2 * i as i32)))
            .collect();
        let sel_y = match c.props.selector_position {
            SelectorPosition::Top => 0,
            SelectorPosition::Bottom => height,
        };
        inputs.push(Port::new(PortRole::Input, n, "sel", vec2(1, sel_y)));
        Ok(PortLayout {
            inputs,
            outputs: vec![Port::new(PortRole::Output, 0, "0", vec2(2, height / 2))],
        })
    }

    fn dimensions(&self, props: &Properties) -> Dimensions {
        Dimensions {
            width: 2,
            height: (props.num_inputs.max(2) as i32 - 1) * 2 + 2,
        }
    }

    fn declare(
        &self,
        c: &Component,
        _store: &Store,
        names: &mut NameRegistry,
    ) -> Result<Declaration, CompileError> {
        let var = names.name_for(&c.id, c.kind.name_hint());
        let p = &c.props;
        let mut params = Params::new();
        params.label(&p.label);
        params.push("num_inputs", p.num_inputs);
        params.push_if(p.bits != 1, "bits", p.bits);
        Ok(Declaration {
            lines: vec![format!(
                "{var} = plexers.Multiplexer({})",
                params.finish(&c.id)
            )],
            var,
        })
    }
}

pub struct DecoderEntry;

impl KindEntry for DecoderEntry {
    fn defaults(&self) -> Properties {
        Properties {
            label: "DEC".to_owned(),
            ..Properties::default()
        }
    }

    fn port_layout(&self, c: &Component, _store: &Store) -> Result<PortLayout, CompileError> {
        let n = c.props.num_outputs.max(1);
        let height = ((n as i32 - 1) * 2 + 2).max(4);
        let sel_y = match c.props.selector_position {
            SelectorPosition::Top => 0,
            SelectorPosition::Bottom => height,
        };
        let outputs = (0..n)
            .map(|i| Port::new(PortRole::Output, i, i.to_string(), vec2(2, 1 + 2 * i as i32)))
            .collect();
        Ok(PortLayout {
            inputs: vec![Port::new(PortRole::Input, 0, "sel", vec2(1, sel_y))],
            outputs,
        })
    }

    fn dimensions(&self, props: &Properties) -> Dimensions {
        Dimensions {
            width: 2,
            height: ((props.num_outputs.max(1) as i32 - 1) * 2 + 2).max(4),
        }
    }

    fn declare(
        &self,
        c: &Component,
        _store: &Store,
        names: &mut NameRegistry,
    ) -> Result<Declaration, CompileError> {
        let var = names.name_for(&c.id, c.kind.name_hint());
        let p = &c.props;
        let mut params = Params::new();
        params.label(&p.label);
        params.push("num_outputs", p.num_outputs);
        Ok(Declaration {
            lines: vec![format!("{var} = plexers.Decoder({})", params.finish(&c.id))],
            var,
        })
    }
}

pub struct PriorityEncoderEntry;

impl KindEntry for PriorityEncoderEntry {
    fn defaults(&self) -> Properties {
        Properties {
            label: "PE".to_owned(),
            num_inputs: 4,
            ..Properties::default()
        }
    }

    fn port_layout(&self, c: &Component, _store: &Store) -> Result<PortLayout, CompileError> {
        let n = c.props.num_inputs.max(1);
        let height = ((n as i32 - 1) * 2 + 2).max(6);
        let inputs = (0..n)
            .map(|i| Port::new(PortRole::Input, i, i.to_string(), vec2(0, 1 + 2 * i as i32)))
            .collect();
        // Encoded index at a third of the height, the any-flag at two.
        let third = |k: i32| ((height * k) as f64 / 3.0).round() as i32;
        Ok(PortLayout {
            inputs,
            outputs: vec![
                Port::new(PortRole::Output, 0, "inum", vec2(3, third(1))),
                Port::new(PortRole::Output, 1, "any", vec2(3, third(2))),
            ],
        })
    }

    fn dimensions(&self, props: &Properties) -> Dimensions {
        Dimensions {
            width: 3,
            height: ((props.num_inputs.max(1) as i32 - 1) * 2 + 2).max(6),
        }
    }

    fn declare(
        &self,
        c: &Component,
        _store: &Store,
        names: &mut NameRegistry,
    ) -> Result<Declaration, CompileError> {
        let var = names.name_for(&c.id, c.kind.name_hint());
        let p = &c.props;
        let mut params = Params::new();
        params.label(&p.label);
        params.push("num_inputs", p.num_inputs);
        Ok(Declaration {
            lines: vec![format!(
                "{var} = plexers.PriorityEncoder({})",
                params.finish(&c.id)
            )],
            var,
        })
    }
}

// Memory

pub struct RegisterEntry;

impl KindEntry for RegisterEntry {
    fn defaults(&self) -> Properties {
        Properties::default()
    }

    fn port_layout(&self, _c: &Component, _store: &Store) -> Result<PortLayout, CompileError> {
        Ok(PortLayout {
            inputs: vec![
                Port::new(PortRole::Input, 0, "D", vec2(0, 1)),
                Port::new(PortRole::Input, 1, "CLK", vec2(0, 3)),
                Port::new(PortRole::Input, 2, "en", vec2(0, 5)),
            ],
            outputs: vec![Port::new(PortRole::Output, 0, "Q", vec2(4, 3))],
        })
    }

    fn dimensions(&self, _props: &Properties) -> Dimensions {
        Dimensions {
            width: 4,
            height: 6,
        }
    }

    fn declare(
        &self,
        c: &Component,
        _store: &Store,
        names: &mut NameRegistry,
    ) -> Result<Declaration, CompileError> {
        let var = names.name_for(&c.id, c.kind.name_hint());
        let p = &c.props;
        let mut params = Params::new();
        params.label(&p.label);
        params.push("bits", p.bits);
        Ok(Declaration {
            lines: vec![format!("{var} = memory.Register({})", params.finish(&c.id))],
            var,
        })
    }
}

pub struct RomEntry;

impl RomEntry {
    /// Contents as handed to the runtime: one cell per address, missing
    /// cells zero-filled, stored values clamped to the data width.
    fn data_literal(props: &Properties) -> String {
        let cells = 1usize << props.address_bits.min(16);
        let max = if props.data_bits >= 64 {
            u64::MAX
        } else {
            (1u64 << props.data_bits) - 1
        };
        let items: Vec<String> = (0..cells)
            .map(|i| props.data.get(i).map_or(0, |v| (*v).min(max)).to_string())
            .collect();
        format!("[{}]", items.join(", "))
    }
}

impl KindEntry for RomEntry {
    fn defaults(&self) -> Properties {
        Properties {
            label: "ROM".to_owned(),
            ..Properties::default()
        }
    }

    fn port_layout(&self, c: &Component, _store: &Store) -> Result<PortLayout, CompileError> {
        let Dimensions { width, height } = self.dimensions(&c.props);
        Ok(PortLayout {
            inputs: vec![
                Port::new(PortRole::Input, 0, "A", vec2(0, 1)),
                Port::new(PortRole::Input, 1, "sel", vec2(0, 3)),
            ],
            outputs: vec![Port::new(PortRole::Output, 0, "D", vec2(width, height / 2))],
        })
    }

    fn dimensions(&self, props: &Properties) -> Dimensions {
        let width = (props.address_bits.div_ceil(2) as i32).max(4);
        Dimensions {
            width,
            height: (width + 1).max(5),
        }
    }

    fn declare(
        &self,
        c: &Component,
        _store: &Store,
        names: &mut NameRegistry,
    ) -> Result<Declaration, CompileError> {
        let var = names.name_for(&c.id, c.kind.name_hint());
        let p = &c.props;
        let mut params = Params::new();
        params.label(&p.label);
        params.push("address_bits", p.address_bits);
        params.push("data_bits", p.data_bits);
        params.push("data", Self::data_literal(p));
        Ok(Declaration {
            lines: vec![format!("{var} = memory.ROM({})", params.finish(&c.id))],
            var,
        })
    }
}

// Arithmetic

pub struct ArithmeticEntry {
    class: &'static str,
    out_name: &'static str,
}

impl ArithmeticEntry {
    pub fn new(class: &'static str, out_name: &'static str) -> Self {
        Self { class, out_name }
    }
}

impl KindEntry for ArithmeticEntry {
    fn defaults(&self) -> Properties {
        Properties {
            bits: 8,
            ..Properties::default()
        }
    }

    fn port_layout(&self, _c: &Component, _store: &Store) -> Result<PortLayout, CompileError> {
        Ok(PortLayout {
            inputs: vec![
                Port::new(PortRole::Input, 0, "a", vec2(0, 1)),
                Port::new(PortRole::Input, 1, "b", vec2(0, 3)),
                Port::new(PortRole::Input, 2, "cin", vec2(0, 5)),
            ],
            outputs: vec![
                Port::new(PortRole::Output, 0, self.out_name, vec2(4, 2)),
                Port::new(PortRole::Output, 1, "cout", vec2(4, 4)),
            ],
        })
    }

    fn dimensions(&self, _props: &Properties) -> Dimensions {
        Dimensions {
            width: 4,
            height: 6,
        }
    }

    fn declare(
        &self,
        c: &Component,
        _store: &Store,
        names: &mut NameRegistry,
    ) -> Result<Declaration, CompileError> {
        let var = names.name_for(&c.id, c.kind.name_hint());
        let p = &c.props;
        let mut params = Params::new();
        params.label(&p.label);
        params.push("bits", p.bits);
        Ok(Declaration {
            lines: vec![format!(
                "{var} = arithmetic.{}({})",
                self.class,
                params.finish(&c.id)
            )],
            var,
        })
    }
}

// Sub-circuit references

pub struct SubcircuitEntry;

impl SubcircuitEntry {
    fn referenced_circuit_id(c: &Component) -> Result<&str, CompileError> {
        c.props
            .circuit_id
            .as_deref()
            .filter(|id| !id.is_empty())
            .ok_or_else(|| CompileError::MissingSubcircuitDefinition {
                component: c.id.clone(),
                circuit: "<unset>".to_owned(),
            })
    }
}

impl KindEntry for SubcircuitEntry {
    fn defaults(&self) -> Properties {
        Properties {
            label: "Component".to_owned(),
            ..Properties::default()
        }
    }

    fn port_layout(&self, c: &Component, store: &Store) -> Result<PortLayout, CompileError> {
        let circuit_id = Self::referenced_circuit_id(c)?;
        let circuit = store.circuit(circuit_id).ok_or_else(|| {
            CompileError::MissingSubcircuitDefinition {
                component: c.id.clone(),
                circuit: circuit_id.to_owned(),
            }
        })?;
        let interface = circuit.interface();

        let max_ports = interface.inputs.len().max(interface.outputs.len()).max(1);
        let height = (2 * max_ports as i32).max(4);
        let column = |specs: &[crate::circuit::PortSpec], role: PortRole, x: i32| {
            specs
                .iter()
                .enumerate()
                .map(|(i, spec)| {
                    let y = if specs.len() == 1 {
                        height / 2
                    } else {
                        1 + 2 * i as i32
                    };
                    Port::new(role, i as u32, spec.label.clone(), vec2(x, y))
                })
                .collect::<Vec<_>>()
        };

        Ok(PortLayout {
            inputs: column(&interface.inputs, PortRole::Input, 0),
            outputs: column(&interface.outputs, PortRole::Output, 6),
        })
    }

    fn dimensions(&self, _props: &Properties) -> Dimensions {
        // Height depends on the referenced interface; callers that need the
        // exact footprint should measure the port layout.
        Dimensions {
            width: 6,
            height: 4,
        }
    }

    fn declare(
        &self,
        c: &Component,
        store: &Store,
        names: &mut NameRegistry,
    ) -> Result<Declaration, CompileError> {
        let circuit_id = Self::referenced_circuit_id(c)?;
        let name = store.module_name(circuit_id).ok_or_else(|| {
            CompileError::MissingSubcircuitDefinition {
                component: c.id.clone(),
                circuit: circuit_id.to_owned(),
            }
        })?;
        let var = names.instance_name_for(&c.id, &name.to_lowercase());
        Ok(Declaration {
            lines: vec![format!("{var} = {name}()")],
            var,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;
    use crate::circuit::ComponentKind;
    use crate::grid::pos;

    fn declare(c: &Component) -> Declaration {
        let catalog = Catalog::new();
        let store = Store::default();
        let mut names = NameRegistry::new();
        catalog.declare(c, &store, &mut names).expect("declare")
    }

    #[test]
    fn value_literals_follow_base_and_width() {
        assert_eq!(format_value(5, 2, 4), "0b0101");
        assert_eq!(format_value(10, 16, 8), "0x0A");
        assert_eq!(format_value(255, 16, 8), "0xFF");
        assert_eq!(format_value(7, 10, 4), "7");
    }

    #[test]
    fn labels_escape_embedded_quotes() {
        assert_eq!(escape(r#"say "hi""#), r#"say \"hi\""#);
        assert_eq!(escape(r"a\b"), r"a\\b");
    }

    #[test]
    fn gate_declaration_elides_defaults() {
        let gate = Component::new("g-1", ComponentKind::AndGate, pos(0, 0));
        let decl = declare(&gate);
        assert_eq!(decl.var, "and0");
        assert_eq!(decl.lines, vec![r#"and0 = logic.And(js_id="g-1")"#]);
    }

    #[test]
    fn gate_declaration_emits_non_default_parameters() {
        let mut gate = Component::new("g-2", ComponentKind::NorGate, pos(0, 0));
        gate.props.label = "sel".to_owned();
        gate.props.bits = 4;
        gate.props.num_inputs = 3;
        gate.props.inverted_inputs = vec![0, 2];
        let decl = declare(&gate);
        assert_eq!(
            decl.lines,
            vec![
                r#"nor0 = logic.Nor(label="sel", bits=4, num_inputs=3, inverted_inputs=[0, 2], js_id="g-2")"#
            ]
        );
    }

    #[test]
    fn input_declaration_sets_value_on_a_second_line() {
        let mut input = Component::new("in-1", ComponentKind::Input, pos(0, 0));
        input.props.label = "A".to_owned();
        input.props.bits = 4;
        input.props.value = 5;
        input.props.base = 2;
        let decl = declare(&input);
        assert_eq!(
            decl.lines,
            vec![
                r#"input0 = io.Input(label="A", bits=4, js_id="in-1")"#,
                "input0.value = 0b0101",
            ]
        );
    }

    #[test]
    fn clock_uses_clk_hint_and_always_emits_frequency() {
        let clock = Component::new("ck", ComponentKind::Clock, pos(0, 0));
        let decl = declare(&clock);
        assert_eq!(decl.var, "clk0");
        assert_eq!(decl.lines, vec![r#"clk0 = io.Clock(frequency=1, js_id="ck")"#]);
    }

    #[test]
    fn splitter_emits_ranges_as_tuples() {
        let catalog = Catalog::new();
        let mut splitter = catalog
            .component("sp", ComponentKind::Splitter, pos(0, 0))
            .expect("defaults");
        splitter.props.ranges.truncate(2);
        let decl = declare(&splitter);
        assert_eq!(
            decl.lines,
            vec![r#"splitter0 = wires.Splitter(bits=8, splits=[(0,1), (2,3)], js_id="sp")"#]
        );
    }

    #[test]
    fn merger_emits_merge_inputs() {
        let catalog = Catalog::new();
        let merger = catalog
            .component("mg", ComponentKind::Merger, pos(0, 0))
            .expect("defaults");
        let decl = declare(&merger);
        assert!(
            decl.lines[0].starts_with("merger0 = wires.Merger(bits=8, merge_inputs=[(0,1), (2,3)")
        );
    }

    #[test]
    fn arithmetic_kinds_use_their_class_and_hint() {
        let catalog = Catalog::new();
        let adder = catalog
            .component("ad", ComponentKind::Adder, pos(0, 0))
            .expect("defaults");
        assert_eq!(
            declare(&adder).lines,
            vec![r#"adder0 = arithmetic.Adder(bits=8, js_id="ad")"#]
        );
        let sub = catalog
            .component("sb", ComponentKind::Subtract, pos(0, 0))
            .expect("defaults");
        assert_eq!(
            declare(&sub).lines,
            vec![r#"sub0 = arithmetic.Subtract(bits=8, js_id="sb")"#]
        );
    }

    #[test]
    fn subcircuit_declares_an_instance_of_the_module_symbol() {
        let catalog = Catalog::new();
        let mut store = Store::default();
        store.add_circuit(crate::circuit::Circuit::new("c-half", "HalfAdder"));
        store.register_component("c-half", "HalfAdder");

        let mut names = NameRegistry::new();
        let mut reference = Component::new("u1", ComponentKind::Subcircuit, pos(0, 0));
        reference.props.circuit_id = Some("c-half".to_owned());
        let decl = catalog
            .declare(&reference, &store, &mut names)
            .expect("declare");
        assert_eq!(decl.var, "halfadder_1");
        assert_eq!(decl.lines, vec!["halfadder_1 = HalfAdder()"]);

        let mut second = Component::new("u2", ComponentKind::Subcircuit, pos(0, 12));
        second.props.circuit_id = Some("c-half".to_owned());
        let decl = catalog
            .declare(&second, &store, &mut names)
            .expect("declare");
        assert_eq!(decl.var, "halfadder_2");
    }

    #[test]
    fn subcircuit_with_missing_definition_fails_component_scoped() {
        let catalog = Catalog::new();
        let store = Store::default();
        let mut names = NameRegistry::new();
        let mut reference = Component::new("u1", ComponentKind::Subcircuit, pos(0, 0));
        reference.props.circuit_id = Some("ghost".to_owned());
        let err = catalog
            .declare(&reference, &store, &mut names)
            .expect_err("missing definition");
        assert_eq!(err.code(), "missing-subcircuit-definition");
    }

    #[test]
    fn rotated_gate_inputs_pivot_on_the_output() {
        let catalog = Catalog::new();
        let store = Store::default();
        let mut gate = Component::new("g", ComponentKind::AndGate, pos(0, 0));
        gate.props.rotation = 90;
        let layout = catalog.port_layout(&gate, &store).expect("layout");
        // Quarter turn around the output point (3, 1).
        assert_eq!(layout.inputs[0].offset, vec2(4, -2));
        assert_eq!(layout.inputs[1].offset, vec2(2, -2));
        assert_eq!(layout.outputs[0].offset, vec2(3, 1));

        gate.props.rotation = 180;
        let layout = catalog.port_layout(&gate, &store).expect("layout");
        assert_eq!(layout.inputs[0].offset, vec2(6, 2));
        assert_eq!(layout.inputs[1].offset, vec2(6, 0));
        assert_eq!(layout.outputs[0].offset, vec2(3, 1));
    }

    #[test]
    fn multiplexer_selector_follows_its_configured_edge() {
        let catalog = Catalog::new();
        let store = Store::default();
        let mut mux = catalog
            .component("mx", ComponentKind::Multiplexer, pos(0, 0))
            .expect("defaults");
        let layout = catalog.port_layout(&mux, &store).expect("layout");
        let sel = layout.inputs.last().expect("sel");
        assert_eq!(sel.name, "sel");
        assert_eq!(sel.offset, vec2(1, 8));

        mux.props.selector_position = crate::circuit::SelectorPosition::Top;
        let layout = catalog.port_layout(&mux, &store).expect("layout");
        assert_eq!(layout.inputs.last().expect("sel").offset, vec2(1, 0));
    }

    #[test]
    fn decoder_declares_output_count_and_puts_sel_on_the_selector_edge() {
        let catalog = Catalog::new();
        let store = Store::default();
        let decoder = catalog
            .component("dc", ComponentKind::Decoder, pos(0, 0))
            .expect("defaults");
        assert_eq!(
            declare(&decoder).lines,
            vec![r#"decoder0 = plexers.Decoder(label="DEC", num_outputs=4, js_id="dc")"#]
        );
        let layout = catalog.port_layout(&decoder, &store).expect("layout");
        assert_eq!(layout.inputs[0].name, "sel");
        assert_eq!(layout.inputs[0].offset, vec2(1, 8));
        assert_eq!(layout.outputs.len(), 4);
        assert_eq!(layout.outputs[3].offset, vec2(2, 7));
    }

    #[test]
    fn priority_encoder_outputs_sit_at_thirds_of_its_height() {
        let catalog = Catalog::new();
        let store = Store::default();
        let encoder = catalog
            .component("pe", ComponentKind::PriorityEncoder, pos(0, 0))
            .expect("defaults");
        assert_eq!(
            declare(&encoder).lines,
            vec![
                r#"priorityEncoder0 = plexers.PriorityEncoder(label="PE", num_inputs=4, js_id="pe")"#
            ]
        );
        let layout = catalog.port_layout(&encoder, &store).expect("layout");
        assert_eq!(layout.inputs.len(), 4);
        assert_eq!(layout.outputs[0].name, "inum");
        assert_eq!(layout.outputs[0].offset, vec2(3, 3));
        assert_eq!(layout.outputs[1].name, "any");
        assert_eq!(layout.outputs[1].offset, vec2(3, 5));
    }

    #[test]
    fn rom_data_is_padded_to_the_address_space_and_clamped_to_width() {
        let catalog = Catalog::new();
        let store = Store::default();
        let mut rom = catalog
            .component("ro", ComponentKind::Rom, pos(0, 0))
            .expect("defaults");
        rom.props.address_bits = 2;
        rom.props.data_bits = 2;
        rom.props.data = vec![1, 9];
        assert_eq!(
            declare(&rom).lines,
            vec![
                r#"rom0 = memory.ROM(label="ROM", address_bits=2, data_bits=2, data=[1, 3, 0, 0], js_id="ro")"#
            ]
        );
        let layout = catalog.port_layout(&rom, &store).expect("layout");
        assert_eq!(layout.inputs[0].name, "A");
        assert_eq!(layout.inputs[1].name, "sel");
        assert_eq!(layout.outputs[0].offset, vec2(4, 2));
    }

    #[test]
    fn spread_snaps_rows_to_the_grid() {
        assert_eq!(spread(1, 4, 0), 2);
        // Odd heights center on the lower of the two middle rows.
        assert_eq!(spread(1, 5, 0), 3);
        assert_eq!(spread(4, 5, 0), 1);
        assert_eq!(spread(4, 5, 3), 4);
    }
}
