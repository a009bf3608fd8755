//! Error types for the editor

use scl_parser::DocumentError;
use thiserror::Error;

pub type ActionResult<T> = Result<T, ActionError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ActionError {
    /// A value claimed to be an action but matches none of the variants
    #[error("Unrecognized action: {0}")]
    UnrecognizedAction(String),

    #[error("Document error: {0}")]
    Document(#[from] DocumentError),

    #[error("Invalid action: {0}")]
    InvalidAction(String),
}
