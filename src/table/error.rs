use serde_json::json;
use thiserror::Error;

/// Failure of a single table request. Every variant is terminal for the request.
#[derive(Debug, Error)]
pub enum TableError {
    /// Malformed or out-of-range client parameter. Nothing has been merged or persisted.
    #[error("invalid value {value:?} for {param}: {reason}")]
    BadParam {
        param: String,
        value: String,
        reason: String,
    },

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("not allowed: {0}")]
    Forbidden(String),

    /// A dataset hook (create/search/filter/order/limit/row) failed.
    #[error(transparent)]
    Source(anyhow::Error),

    #[error("session store failed: {0}")]
    Store(anyhow::Error),
}

impl TableError {
    pub fn bad_param(
        param: impl Into<String>,
        value: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        TableError::BadParam {
            param: param.into(),
            value: value.into(),
            reason: reason.into(),
        }
    }

    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        TableError::NotFound {
            entity,
            id: id.into(),
        }
    }

    /// Error code used on the wire.
    pub fn code(&self) -> &'static str {
        match self {
            TableError::BadParam { .. } => "bad_params",
            TableError::NotFound { .. } => "not_found",
            TableError::Forbidden(_) => "forbidden",
            TableError::Source(_) => "db_query_failed",
            TableError::Store(_) => "session_store_failed",
        }
    }

    pub fn details(&self) -> Option<serde_json::Value> {
        match self {
            TableError::BadParam { param, value, .. } => {
                Some(json!({ "param": param, "value": value }))
            }
            TableError::NotFound { entity, id } => Some(json!({ "entity": entity, "id": id })),
            _ => None,
        }
    }
}

impl From<rusqlite::Error> for TableError {
    fn from(e: rusqlite::Error) -> Self {
        TableError::Source(e.into())
    }
}
