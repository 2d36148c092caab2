use std::fmt;
use std::io;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ParseError>;

/// A fatal parse failure: what went wrong plus the line the tokenizer was
/// on, when one is known.
///
/// Document-level failures (e.g. a missing root element) carry no line.
#[derive(Debug, Error)]
pub struct ParseError {
    kind: ErrorKind,
    line: Option<u64>,
}

impl ParseError {
    pub fn new(kind: ErrorKind, line: Option<u64>) -> Self {
        ParseError { kind, line }
    }

    pub fn at(kind: ErrorKind, line: u64) -> Self {
        ParseError {
            kind,
            line: Some(line),
        }
    }

    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    /// Line number reported by the tokenizer (1-based).
    pub fn line(&self) -> Option<u64> {
        self.line
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.line {
            Some(line) => write!(f, "Error on line {}: {}", line, self.kind),
            None => write!(f, "Error: {}", self.kind),
        }
    }
}

impl From<io::Error> for ParseError {
    fn from(e: io::Error) -> Self {
        ParseError::new(ErrorKind::Io(e), None)
    }
}

#[derive(Debug, Error)]
pub enum ErrorKind {
    /// Malformed XML, as reported by the tokenizer.
    #[error("{0}")]
    Syntax(String),

    #[error("An I/O error has occurred: {0}")]
    Io(#[source] io::Error),

    #[error("read() returned too much data: {requested} bytes requested, {returned} returned")]
    OverlongRead { requested: usize, returned: usize },

    #[error("missing \"{0}\" attribute")]
    MissingAttribute(String),

    #[error("missing \"{0}\" child")]
    MissingChild(String),

    #[error("at least one \"{0}\" child is required")]
    EmptyListChild(String),

    #[error("\"{0}\" cannot appear more than once in this context")]
    DuplicateChild(String),

    #[error(
        "\"{name}\" element can only come after \"{last}\" element or be the first in its group"
    )]
    TupleRestartedEarly { name: String, last: String },

    #[error("\"{name}\" element can only come after \"{expected}\" element")]
    TupleOutOfOrder { name: String, expected: String },

    #[error("\"{name}\" element must come after \"{expected}\" element")]
    TupleIncomplete { name: String, expected: String },

    #[error("cannot parse integer")]
    InvalidInteger,

    #[error("\"{0}\" must be \"yes\" or \"no\"")]
    InvalidBool(String),

    #[error("\"{0}\" is not one of the allowed enumeration values")]
    InvalidEnum(String),

    #[error("value must be a single character")]
    NotSingleChar,

    #[error(
        "\"{value}\" is not one of the allowed character values; must be one of \"{allowed}\""
    )]
    InvalidCharEnum { value: char, allowed: String },

    #[error("\"value\" must be between 0 and 127")]
    CharValueOutOfRange,

    #[error("cannot have more than one root element")]
    MultipleRoots,

    #[error("document without a recognized root element")]
    NoRecognizedRoot,

    /// A recoverable warning escalated to fatal by the caller's policy.
    #[error("{0}")]
    EscalatedWarning(WarningKind),
}

/// A recoverable diagnostic. The dispatcher hands every warning to the
/// active [`WarningPolicy`](crate::policy::WarningPolicy); unless the
/// policy escalates it, parsing continues.
#[derive(Debug, Clone)]
pub struct ParseWarning {
    kind: WarningKind,
    line: u64,
}

impl ParseWarning {
    pub fn new(kind: WarningKind, line: u64) -> Self {
        ParseWarning { kind, line }
    }

    pub fn kind(&self) -> &WarningKind {
        &self.kind
    }

    pub fn line(&self) -> u64 {
        self.line
    }

    pub(crate) fn escalate(self) -> ParseError {
        ParseError::at(ErrorKind::EscalatedWarning(self.kind), self.line)
    }
}

impl fmt::Display for ParseWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Warning on line {}: {}", self.line, self.kind)
    }
}

#[derive(Debug, Clone, Error)]
pub enum WarningKind {
    #[error("unexpected element \"{0}\"")]
    UnexpectedElement(String),

    #[error("unexpected attribute \"{0}\"")]
    UnexpectedAttribute(String),

    #[error("duplicate attribute \"{0}\"")]
    DuplicateAttribute(String),

    #[error("unexpected character data")]
    UnexpectedCharacterData,
}

/// Errors raised while compiling a schema, before any parsing happens.
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("reference to undefined type \"{reference}\" in \"{context}\"")]
    UnknownType { reference: String, context: String },

    #[error("\"{reference}\" in \"{context}\" is not usable as an attribute type")]
    NotAnAttributeType { reference: String, context: String },

    #[error("\"{reference}\" in \"{context}\" is not usable as an element type")]
    NotAnElementType { reference: String, context: String },

    #[error("type \"{0}\" is defined more than once")]
    DuplicateType(String),

    #[error("name \"{name}\" appears more than once in \"{context}\"")]
    DuplicateName { name: String, context: String },

    #[error("schema has no root elements")]
    NoRoots,

    #[error("could not construct a perfect hash for {0} names")]
    HashConstruction(usize),
}
