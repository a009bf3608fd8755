use crate::ast::NodeId;
use thiserror::Error;

pub type ParseResult<T> = Result<T, ParseError>;

/// Errors raised while reading an XML document into the arena
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("Malformed XML at {pos}: {message}")]
    Xml { pos: usize, message: String },

    #[error("Unexpected closing tag </{found}> at {pos}: expected </{expected}>")]
    MismatchedTag {
        pos: usize,
        expected: String,
        found: String,
    },

    #[error("Unexpected end of file at {pos}: <{open}> is not closed")]
    UnexpectedEof { pos: usize, open: String },

    #[error("Document has no root element")]
    EmptyDocument,

    #[error("Content after the root element at {pos}")]
    TrailingContent { pos: usize },
}

impl ParseError {
    pub fn xml(pos: usize, message: impl Into<String>) -> Self {
        Self::Xml {
            pos,
            message: message.into(),
        }
    }

    pub fn mismatched_tag(pos: usize, expected: impl Into<String>, found: impl Into<String>) -> Self {
        Self::MismatchedTag {
            pos,
            expected: expected.into(),
            found: found.into(),
        }
    }

    pub fn unexpected_eof(pos: usize, open: impl Into<String>) -> Self {
        Self::UnexpectedEof {
            pos,
            open: open.into(),
        }
    }
}

/// Errors raised by structural mutations of a [`crate::Document`]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DocumentError {
    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),

    #[error("Cannot move or remove the document root")]
    RootImmutable,

    #[error("Inserting {child} under {parent} would create a cycle")]
    CycleDetected { parent: NodeId, child: NodeId },

    #[error("Reference {reference} is not a child of {parent}")]
    ReferenceNotChild { parent: NodeId, reference: NodeId },
}

pub type QueryResult<T> = Result<T, QueryError>;

/// Errors raised while reading a locator string
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    #[error("Unexpected token at {pos}: expected {expected}, found {found}")]
    UnexpectedToken {
        pos: usize,
        expected: String,
        found: String,
    },

    #[error("Unexpected end of locator at {pos}")]
    UnexpectedEnd { pos: usize },

    #[error("Unknown pseudo-class :{name} at {pos}")]
    UnknownPseudoClass { pos: usize, name: String },

    #[error("Lexer error at {pos}")]
    LexerError { pos: usize },
}

impl QueryError {
    pub fn unexpected_token(pos: usize, expected: impl Into<String>, found: impl Into<String>) -> Self {
        Self::UnexpectedToken {
            pos,
            expected: expected.into(),
            found: found.into(),
        }
    }

    pub fn unexpected_end(pos: usize) -> Self {
        Self::UnexpectedEnd { pos }
    }

    pub fn lexer_error(pos: usize) -> Self {
        Self::LexerError { pos }
    }
}
