//! Recoverable conditions collected during an import or export pass

use std::fmt;

/// Category of a recoverable condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum WarningKind {
    /// Input the exporter cannot represent (skipped, never corrupted)
    UnsupportedInput,
    /// A linked file or external program is not available
    MissingResource,
    /// A document is inconsistent; a placeholder was substituted
    MalformedData,
}

/// A recoverable condition, returned up to the top-level call.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct Warning {
    pub kind: WarningKind,
    pub message: String,
}

impl Warning {
    /// Create a warning and log it at the point where it was raised.
    pub fn new(kind: WarningKind, message: impl Into<String>) -> Self {
        let message = message.into();
        tracing::warn!("{}", message);
        Self { kind, message }
    }

    pub fn unsupported(message: impl Into<String>) -> Self {
        Self::new(WarningKind::UnsupportedInput, message)
    }

    pub fn missing(message: impl Into<String>) -> Self {
        Self::new(WarningKind::MissingResource, message)
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self::new(WarningKind::MalformedData, message)
    }
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self.kind {
            WarningKind::UnsupportedInput => "unsupported",
            WarningKind::MissingResource => "missing",
            WarningKind::MalformedData => "malformed",
        };
        write!(f, "[{}] {}", tag, self.message)
    }
}
