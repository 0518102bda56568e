//! Provider errors and diagnostics
//!
//! Every handler failure is terminal for the current operation and is
//! reported to the host as a single error diagnostic.

use serde::Serialize;

/// Errors surfaced by resource and data-source handlers
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// The FreeIPA client could not be built or could not log in
    #[error("Error creating freeipa identity client: {0:#}")]
    Configuration(anyhow::Error),

    /// A remote call failed (not found, auth, transport)
    #[error("Error {action}: {cause:#}")]
    Remote { action: String, cause: anyhow::Error },

    /// Writing a value into declarative state failed
    #[error("{0}")]
    Mapping(String),

    /// Input state does not satisfy its schema
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// No handler is registered under the requested type name
    #[error("Unknown {kind} type: {name}")]
    UnknownType { kind: &'static str, name: String },

    /// An update touched attributes that can only be set on creation
    #[error("Changing {} requires replacing the resource", .0.join(", "))]
    RequiresReplacement(Vec<String>),
}

impl ProviderError {
    /// Wrap a remote failure with the action that was attempted,
    /// e.g. `remote("show freeipa user", err)`
    pub fn remote(action: &str, cause: anyhow::Error) -> Self {
        Self::Remote {
            action: action.to_string(),
            cause,
        }
    }

    /// Convert into the single diagnostic reported to the host
    pub fn to_diagnostic(&self) -> Diagnostic {
        Diagnostic::error(self.to_string())
    }
}

/// Diagnostic severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
}

/// A message returned to the host alongside (or instead of) state
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub summary: String,
}

impl Diagnostic {
    pub fn error(summary: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            summary: summary.into(),
        }
    }
}
