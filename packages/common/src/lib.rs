//! Shared plumbing for the SCL tools: error type, file discovery and a
//! document visitor.

pub mod error;
pub mod filesystem;
pub mod visitor;

pub use error::*;
pub use filesystem::*;
pub use visitor::*;
