use thiserror::Error;

/// Failures surfaced by document store operations.
///
/// Absent documents are not errors; lookups return `Option`/`Vec` and leave
/// the not-found decision to the caller.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("malformed document id '{0}'")]
    MalformedId(String),

    #[error("collection '{collection}' contains a document without a string id")]
    MalformedDocument { collection: String },

    #[error("document is not a JSON object")]
    NotAnObject,
}
