//! Non-fatal warnings attached to an operation.

use std::fmt;
use std::sync::{Mutex, PoisonError};

use serde::Serialize;

/// Class of a warning diagnostic.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    /// A private-network block set both a static service IP and IPAM; the
    /// static address was used.
    IpamOverridden,
    /// Observed ACL rules include entries that were never declared.
    AclDrift,
}

impl fmt::Display for WarningKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::IpamOverridden => "ipam_overridden",
            Self::AclDrift => "acl_drift",
        })
    }
}

/// One warning.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct Diagnostic {
    /// Warning class.
    pub kind: WarningKind,
    /// One-line summary.
    pub summary: String,
    /// Longer explanation.
    pub detail: String,
    /// Attribute path the warning refers to, when known.
    pub attribute: Option<String>,
}

/// Collects warnings raised while an operation runs.
///
/// Each warning is also logged at `WARN` as it is recorded.
#[derive(Debug, Default)]
pub struct Diagnostics {
    entries: Mutex<Vec<Diagnostic>>,
}

impl Diagnostics {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a warning.
    pub fn warn(&self, diagnostic: Diagnostic) {
        tracing::warn!(
            kind = %diagnostic.kind,
            attribute = diagnostic.attribute.as_deref().unwrap_or_default(),
            detail = %diagnostic.detail,
            "{}",
            diagnostic.summary
        );
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(diagnostic);
    }

    /// Returns every warning recorded so far.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Diagnostic> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Returns the warnings of one class.
    #[must_use]
    pub fn of_kind(&self, kind: WarningKind) -> Vec<Diagnostic> {
        self.snapshot()
            .into_iter()
            .filter(|entry| entry.kind == kind)
            .collect()
    }

    /// Drains and returns every warning.
    #[must_use]
    pub fn take(&self) -> Vec<Diagnostic> {
        std::mem::take(&mut *self.entries.lock().unwrap_or_else(PoisonError::into_inner))
    }
}
