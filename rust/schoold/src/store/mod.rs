mod sqlite;

pub use sqlite::SqliteStore;

use crate::model::{Collection, Fields, RecordId};
use crate::normalize::NormalizeError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("storage failure: {0}")]
    Storage(String),
    #[error("{collection} record {id} not found")]
    NotFound { collection: Collection, id: RecordId },
    #[error("validation failed: {0}")]
    Validation(#[from] NormalizeError),
    #[error("could not decode {collection} record: {source}")]
    Decode {
        collection: Collection,
        #[source]
        source: NormalizeError,
    },
}

impl RemoteError {
    /// Stable code surfaced in IPC error envelopes.
    pub fn code(&self) -> &'static str {
        match self {
            RemoteError::Storage(_) => "store_failed",
            RemoteError::NotFound { .. } => "not_found",
            RemoteError::Validation(_) => "bad_params",
            RemoteError::Decode { .. } => "bad_record",
        }
    }
}

impl From<rusqlite::Error> for RemoteError {
    fn from(e: rusqlite::Error) -> Self {
        RemoteError::Storage(e.to_string())
    }
}

impl From<serde_json::Error> for RemoteError {
    fn from(e: serde_json::Error) -> Self {
        RemoteError::Storage(format!("corrupt record payload: {e}"))
    }
}

/// CRUD over named collections of loosely typed records.
///
/// Returned records always carry the store-assigned `Id`. Implementations must
/// be shareable across threads so page loads can fetch collections
/// concurrently.
pub trait RecordStore: Send + Sync {
    fn list(&self, collection: Collection) -> Result<Vec<Fields>, RemoteError>;

    fn get_by_id(&self, collection: Collection, id: RecordId)
        -> Result<Option<Fields>, RemoteError>;

    fn create(&self, collection: Collection, fields: Fields) -> Result<Fields, RemoteError>;

    /// Merge update: supplied fields overwrite, the rest are kept.
    fn update(
        &self,
        collection: Collection,
        id: RecordId,
        fields: Fields,
    ) -> Result<Fields, RemoteError>;

    fn delete(&self, collection: Collection, id: RecordId) -> Result<bool, RemoteError>;
}
