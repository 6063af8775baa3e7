//! Server-side actions invoked by the web frontend.
//!
//! Actions run on the retry-wrapped [`SafeQuery`](crate::db::SafeQuery)
//! surface and return typed results; [`ActionResponse`] converts them into
//! the `{ success, ... }` envelope the UI consumes.

pub mod savings_goals;

use serde::Serialize;
use thiserror::Error;

use crate::db::error::DbError;

/// Failure of a server action.
#[derive(Debug, Error)]
pub enum ActionError {
    #[error("Unauthorized")]
    Unauthorized,

    #[error("Account not found")]
    AccountNotFound,

    #[error("Insufficient balance")]
    InsufficientBalance { balance: f64, requested: f64 },

    #[error("Invalid amount: {0}")]
    InvalidAmount(f64),

    #[error("Malformed {model} record: `{field}` is not a number")]
    MalformedRecord {
        model: &'static str,
        field: &'static str,
    },

    #[error(transparent)]
    Database(#[from] DbError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// UI-facing result envelope.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ActionResponse<T> {
    Success {
        success: bool,
        #[serde(flatten)]
        data: T,
    },
    Failure {
        success: bool,
        error: String,
    },
}

impl<T: Serialize> ActionResponse<T> {
    /// Wrap an action result, logging failures under `context`.
    pub fn from_result(context: &str, result: Result<T, ActionError>) -> Self {
        match result {
            Ok(data) => ActionResponse::Success {
                success: true,
                data,
            },
            Err(e) => {
                tracing::error!(action = context, error = %e, "Action failed");
                ActionResponse::Failure {
                    success: false,
                    error: e.to_string(),
                }
            }
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ActionResponse::Success { .. })
    }
}
