use thiserror::Error;

use crate::catalog::PortRole;
use crate::grid::GridPos;

/// What part of the circuit a diagnostic is attached to.
#[derive(serde::Serialize, Copy, Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    Wire,
    Component,
    Circuit,
}

#[derive(Copy, Debug, Clone, PartialEq, Eq)]
pub enum Severity {
    /// The offending wire or component was skipped; the rest of the
    /// circuit still compiled.
    Error,
    /// Surfaced to the user but never blocks generation.
    Advice,
}

/// Everything that can go wrong during a compile pass. None of these abort
/// the pass; each is recovered locally and reported as a [`Diagnostic`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CompileError {
    #[error("wire {wire}: no {role} port at {pos}")]
    NoPortAtPosition {
        wire: String,
        pos: GridPos,
        role: PortRole,
    },

    #[error("wire {wire}: {count} {role} ports at {pos}")]
    MultiplePortsAtPosition {
        wire: String,
        pos: GridPos,
        role: PortRole,
        count: usize,
    },

    #[error("wire {wire}: {end} endpoint declares role {role}")]
    RoleMismatch {
        wire: String,
        end: &'static str,
        role: PortRole,
    },

    #[error("component {component}: input \"{port}\" is not connected")]
    UnconnectedInput { component: String, port: String },

    #[error("circuit {circuit} references itself through its sub-circuits")]
    HierarchyCycle { circuit: String },

    #[error("no catalog entry for component kind \"{kind}\"")]
    MissingCatalogEntry { kind: String },

    #[error("component {component}: sub-circuit \"{circuit}\" is not defined")]
    MissingSubcircuitDefinition { component: String, circuit: String },
}

impl CompileError {
    /// Stable machine-readable code for callers that key on error kinds.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NoPortAtPosition { .. } => "no-port-at-position",
            Self::MultiplePortsAtPosition { .. } => "multiple-ports-at-position",
            Self::RoleMismatch { .. } => "role-mismatch",
            Self::UnconnectedInput { .. } => "unconnected-input",
            Self::HierarchyCycle { .. } => "hierarchy-cycle",
            Self::MissingCatalogEntry { .. } => "missing-catalog-entry",
            Self::MissingSubcircuitDefinition { .. } => "missing-subcircuit-definition",
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            Self::UnconnectedInput { .. } => Severity::Advice,
            _ => Severity::Error,
        }
    }
}

/// A single problem found during compilation, surfaced to the editor layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub scope: Scope,
    pub error: CompileError,
}

impl Diagnostic {
    pub fn wire(error: CompileError) -> Self {
        Self {
            scope: Scope::Wire,
            error,
        }
    }

    pub fn component(error: CompileError) -> Self {
        Self {
            scope: Scope::Component,
            error,
        }
    }

    pub fn circuit(error: CompileError) -> Self {
        Self {
            scope: Scope::Circuit,
            error,
        }
    }

    pub fn code(&self) -> &'static str {
        self.error.code()
    }

    pub fn severity(&self) -> Severity {
        self.error.severity()
    }

    pub fn message(&self) -> String {
        self.error.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::pos;

    #[test]
    fn unconnected_input_is_advisory() {
        let d = Diagnostic::component(CompileError::UnconnectedInput {
            component: "c1".to_owned(),
            port: "0".to_owned(),
        });
        assert_eq!(d.severity(), Severity::Advice);
        assert_eq!(d.code(), "unconnected-input");
    }

    #[test]
    fn wire_errors_carry_position_and_role() {
        let d = Diagnostic::wire(CompileError::NoPortAtPosition {
            wire: "w1".to_owned(),
            pos: pos(4, 2),
            role: PortRole::Input,
        });
        assert_eq!(d.severity(), Severity::Error);
        assert!(d.message().contains("(4, 2)"));
    }
}
