use thiserror::Error;

pub type SchemaResult<T> = Result<T, SchemaError>;

/// Errors raised while loading a tag schema
#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("Invalid schema JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Tag declared twice: {0}")]
    DuplicateTag(String),

    #[error("Tag {parent} lists undeclared child {child}")]
    UnknownChildTag { parent: String, child: String },

    #[error("Root tag {0} is not declared")]
    UnknownRoot(String),
}
