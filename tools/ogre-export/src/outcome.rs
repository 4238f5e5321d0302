//! Result of a top-level import or export call

use ogre_common::Warning;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Status {
    Finished,
    Cancelled,
}

/// Status, every warning raised during the pass, and the produced value.
///
/// A cancelled pass carries its reason as the last warning and no value.
#[derive(Debug, Serialize)]
pub struct Outcome<T> {
    pub status: Status,
    pub warnings: Vec<Warning>,
    pub value: Option<T>,
}

impl<T> Outcome<T> {
    pub fn finished(value: T, warnings: Vec<Warning>) -> Self {
        Self {
            status: Status::Finished,
            warnings,
            value: Some(value),
        }
    }

    pub fn cancelled(reason: Warning, mut warnings: Vec<Warning>) -> Self {
        tracing::info!("Cancelled: {}", reason.message);
        warnings.push(reason);
        Self {
            status: Status::Cancelled,
            warnings,
            value: None,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.status == Status::Cancelled
    }

    /// Finished, but something was skipped or substituted along the way.
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    /// Log a one-line summary plus every warning.
    pub fn report(&self, what: &str) {
        match self.status {
            Status::Finished if self.warnings.is_empty() => tracing::info!("{} finished", what),
            Status::Finished => tracing::info!(
                "{} finished with {} warning(s)",
                what,
                self.warnings.len()
            ),
            Status::Cancelled => tracing::info!("{} cancelled", what),
        }
        for warning in &self.warnings {
            tracing::info!("  {}", warning);
        }
    }
}
