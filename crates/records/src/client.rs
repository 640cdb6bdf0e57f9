use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use thiserror::Error;

use crate::domain::Domain;
use crate::models::RecordModel;

/// Records-system boundary error.
///
/// `SessionExpired` is the one failure the end user can fix (reload / log in again);
/// callers branch on the variant, never on the message text.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum RecordsError {
    #[error("records session expired: {0}")]
    SessionExpired(String),

    #[error("records call failed: {0}")]
    Rpc(String),

    #[error("unexpected record shape for {model}: {message}")]
    Decode { model: RecordModel, message: String },

    #[error("{model} record {id} not found")]
    NotFound { model: RecordModel, id: i64 },
}

impl RecordsError {
    pub fn is_session_expired(&self) -> bool {
        matches!(self, RecordsError::SessionExpired(_))
    }
}

/// One `search_read` call: model, filter, projection, cap and ordering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchQuery {
    pub model: RecordModel,
    pub domain: Domain,
    pub fields: Vec<String>,
    pub limit: Option<usize>,
    /// e.g. `"name asc"` or `"date_order desc"`.
    pub order: Option<String>,
}

impl SearchQuery {
    /// Query over `model` projecting its default fields.
    pub fn new(model: RecordModel, domain: Domain) -> Self {
        Self {
            model,
            domain,
            fields: model.default_fields().iter().map(|f| f.to_string()).collect(),
            limit: None,
            order: None,
        }
    }

    pub fn with_fields(mut self, fields: &[&str]) -> Self {
        self.fields = fields.iter().map(|f| f.to_string()).collect();
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_order(mut self, order: impl Into<String>) -> Self {
        self.order = Some(order.into());
        self
    }
}

/// Generic read/write capability over the business-records system.
///
/// Implementations own transport, authentication and retries; this layer adds
/// none of them.
#[async_trait::async_trait]
pub trait RecordsClient: Send + Sync {
    async fn search_read(&self, query: &SearchQuery) -> Result<Vec<JsonValue>, RecordsError>;

    async fn write(&self, model: RecordModel, ids: &[i64], values: JsonValue) -> Result<bool, RecordsError>;
}

#[async_trait::async_trait]
impl<C> RecordsClient for Arc<C>
where
    C: RecordsClient + ?Sized,
{
    async fn search_read(&self, query: &SearchQuery) -> Result<Vec<JsonValue>, RecordsError> {
        (**self).search_read(query).await
    }

    async fn write(&self, model: RecordModel, ids: &[i64], values: JsonValue) -> Result<bool, RecordsError> {
        (**self).write(model, ids, values).await
    }
}

/// Run a query and decode every row into `T`.
pub async fn search<T, C>(client: &C, query: &SearchQuery) -> Result<Vec<T>, RecordsError>
where
    T: DeserializeOwned,
    C: RecordsClient + ?Sized,
{
    let rows = client.search_read(query).await?;
    tracing::debug!(model = %query.model, rows = rows.len(), "records search_read");
    rows.into_iter()
        .map(|row| {
            serde_json::from_value(row).map_err(|e| RecordsError::Decode {
                model: query.model,
                message: e.to_string(),
            })
        })
        .collect()
}
