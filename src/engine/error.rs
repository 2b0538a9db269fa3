use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use super::action::Operation;
use crate::services::ServiceError;

/// Which part of the UI an error belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorScope {
    Area,
    Objective,
    TimeFrame,
    Project,
}

/// Errors the engine records as `pending_error`.
///
/// Entity validity is checked by storage, not here: invalid input comes back
/// as an `OperationFailed` carrying the storage error.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EngineError {
    /// Nothing has been created yet. Benign: initialization maps it to an
    /// empty state instead of an error banner.
    #[error("Nothing has been created yet")]
    NotInitializedYet,

    #[error("{operation} failed: {source}")]
    OperationFailed {
        scope: ErrorScope,
        operation: Operation,
        source: ServiceError,
    },

    /// The area is gone but some of its objectives may still be stored.
    #[error("Removing objectives of deleted area {area_id} failed: {source}")]
    CascadeDeleteFailed { area_id: Uuid, source: ServiceError },

    /// A request referenced an entity or time frame the current state lacks.
    #[error("{operation} needs {missing}")]
    MissingContext {
        operation: Operation,
        missing: String,
    },
}

impl EngineError {
    pub fn missing(operation: Operation, missing: impl Into<String>) -> Self {
        Self::MissingContext {
            operation,
            missing: missing.into(),
        }
    }

    pub fn scope(&self) -> ErrorScope {
        match self {
            Self::NotInitializedYet => ErrorScope::Area,
            Self::OperationFailed { scope, .. } => *scope,
            Self::CascadeDeleteFailed { .. } => ErrorScope::Objective,
            Self::MissingContext { operation, .. } => operation.scope(),
        }
    }
}

/// The store's processing loop has shut down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("Store is closed")]
pub struct StoreClosed;
