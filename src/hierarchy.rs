//! Hierarchy expansion: which circuits a compile has to emit, and in what
//! order.

use std::collections::HashSet;

use crate::circuit::{Circuit, Store};
use crate::diag::{CompileError, Diagnostic};

/// Dependency-first emission order for a compile rooted at one circuit. The
/// root is always last. Only the closure reachable from the root appears;
/// unreferenced circuits in the store are none of the compiler's business.
#[derive(Debug, Default)]
pub struct Expansion {
    pub order: Vec<String>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Walk `root`'s sub-circuit references depth-first and produce the emission
/// order. A circuit already on the walk path triggers a cycle diagnostic and
/// is not re-entered; a circuit seen on an earlier branch is deduplicated
/// silently.
pub fn expand(root: &Circuit, store: &Store) -> Expansion {
    let mut expansion = Expansion::default();
    let mut visiting = HashSet::new();
    let mut visited = HashSet::new();
    visited.insert(root.id.clone());
    visit(root, store, &mut visiting, &mut visited, &mut expansion);
    expansion
}

fn visit(
    circuit: &Circuit,
    store: &Store,
    visiting: &mut HashSet<String>,
    visited: &mut HashSet<String>,
    expansion: &mut Expansion,
) {
    visiting.insert(circuit.id.clone());

    for reference in circuit.subcircuit_refs() {
        // References with no target and references to circuits missing from
        // the store are reported where they are declared, by the generator.
        let Some(id) = reference.props.circuit_id.as_deref() else {
            continue;
        };
        if visiting.contains(id) {
            log::debug!("cycle through {id} via {}", reference.display());
            expansion
                .diagnostics
                .push(Diagnostic::circuit(CompileError::HierarchyCycle {
                    circuit: id.to_owned(),
                }));
            continue;
        }
        if !visited.insert(id.to_owned()) {
            continue;
        }
        let Some(sub) = store.circuit(id) else {
            continue;
        };
        visit(sub, store, visiting, visited, expansion);
    }

    visiting.remove(&circuit.id);
    // Post-order: dependencies land before their importers, root lands last.
    expansion.order.push(circuit.id.clone());
}
