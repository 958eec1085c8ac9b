use std::collections::HashMap;

/// Per-compile-pass allocator of short, unique variable names.
///
/// Owned by the caller of a top-level compile and passed into the code
/// generator explicitly; `reset` must run exactly once per independent
/// compile (not per sub-circuit) so names stay stable and collision-free
/// across the whole hierarchical output.
#[derive(Default, Debug)]
pub struct NameRegistry {
    /// component id -> assigned name, so repeat lookups are idempotent
    /// within a pass.
    assigned: HashMap<String, String>,
    /// kind hint -> next sequential suffix, starting at 0.
    counters: HashMap<String, u32>,
    /// module base name -> next instance suffix, starting at 1.
    instance_counters: HashMap<String, u32>,
}

impl NameRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        self.assigned.clear();
        self.counters.clear();
        self.instance_counters.clear();
    }

    /// Name for an ordinary component: `{hint}{n}` with n counting from 0
    /// per hint (`and0`, `and1`, `input0`, ...).
    pub fn name_for(&mut self, component_id: &str, hint: &str) -> String {
        if let Some(name) = self.assigned.get(component_id) {
            return name.clone();
        }
        let counter = self.counters.entry(hint.to_owned()).or_insert(0);
        let name = format!("{hint}{counter}");
        *counter += 1;
        self.assigned.insert(component_id.to_owned(), name.clone());
        name
    }

    /// Name for a sub-circuit instance: `{base}_{n}` with n counting from 1
    /// per module base name (`adder_1`, `adder_2`, ...).
    pub fn instance_name_for(&mut self, component_id: &str, base: &str) -> String {
        if let Some(name) = self.assigned.get(component_id) {
            return name.clone();
        }
        let counter = self.instance_counters.entry(base.to_owned()).or_insert(0);
        *counter += 1;
        let name = format!("{base}_{counter}");
        self.assigned.insert(component_id.to_owned(), name.clone());
        name
    }
}
