//! Document model, XML reader/writer and locator queries for SCL files.

pub mod ast;
pub mod error;
pub mod parser;
pub mod query;
pub mod serializer;
pub mod tokenizer;

pub use ast::{Document, Element, NodeId};
pub use error::{DocumentError, ParseError, ParseResult, QueryError, QueryResult};
pub use parser::{parse, Parser};
pub use query::{parse_selector, ComplexSelector, Compound, Filter, SelectorList};
pub use serializer::{serialize, Serializer};
pub use tokenizer::{tokenize, Token};
