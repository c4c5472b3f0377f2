use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A catalogued book as stored. Only the generated identifier is guaranteed;
/// the catalog fields are conventional, and any free-form fields a client
/// submitted ride along in `extra`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    /// Store-generated unique identifier, immutable after creation
    pub id: String,
    /// Title of the book
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Author of the book
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    /// Genre of the book
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub genre: Option<String>,
    /// Year the book was published
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_year: Option<i64>,
    /// Free-form fields stored as submitted
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Request model for adding a new book. No field is required; unknown fields
/// are kept as submitted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewBook {
    /// Title of the book
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Author of the book
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    /// Genre of the book
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub genre: Option<String>,
    /// Year the book was published
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_year: Option<i64>,
    /// Free-form fields stored as submitted
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}
