use scl_foundation::SchemaError;
use scl_parser::ParseError;
use std::path::PathBuf;
use thiserror::Error;

pub type CommonResult<T> = Result<T, CommonError>;

/// Common error type that can hold any SCL tooling error
#[derive(Error, Debug)]
pub enum CommonError {
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("Schema error: {0}")]
    Schema(#[from] SchemaError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("File not found: {}", .0.display())]
    NotFound(PathBuf),
}
