use std::io;

use thiserror::Error;

/// Errors raised while reading, parsing or serializing RDF/XML.
#[derive(Debug, Error)]
pub enum RdfError {
    /// Failure opening or reading the underlying source.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Malformed document structure: bad attributes, mismatched tags,
    /// stray text, broken CDATA.
    #[error("syntax error: {0}")]
    Syntax(String),

    /// The input ended while more characters were required.
    #[error("unexpected end of input")]
    UnexpectedEof,

    /// A string that should name a URI does not parse as one.
    #[error("invalid uri: {0}")]
    InvalidUri(String),

    /// A tag or attribute referenced a prefix missing from the namespace map.
    #[error("undefined namespace prefix: {0:?}")]
    UndefinedNamespace(String),

    /// The triple set cannot be linearized back into RDF/XML.
    #[error("serialization error: {0}")]
    Serialize(String),
}

pub type Result<T> = std::result::Result<T, RdfError>;
