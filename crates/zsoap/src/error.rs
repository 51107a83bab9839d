//! Error types for zsoap

use std::fmt;
use thiserror::Error;

/// Position in source text
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Pos {
    pub offset: usize,
    pub line: u32,
    pub col: u32,
}

impl fmt::Display for Pos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.offset, self.line, self.col)
    }
}

impl Pos {
    pub const fn new(offset: usize, line: u32, col: u32) -> Self {
        Self { offset, line, col }
    }
}

/// Span representing a range in source text
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Span {
    pub start: Pos,
    pub end: Pos,
}

impl Span {
    pub const fn new(start: Pos, end: Pos) -> Self {
        Self { start, end }
    }

    pub const fn empty() -> Self {
        Self {
            start: Pos::new(0, 0, 0),
            end: Pos::new(0, 0, 0),
        }
    }

    pub const fn at(pos: Pos) -> Self {
        Self {
            start: pos,
            end: pos,
        }
    }
}

/// Error kind for detailed categorization
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    // XML input
    InvalidToken,
    UnexpectedEof,
    InvalidUtf8,
    InvalidEntity { entity: String },
    MismatchedTag { expected: String, found: String },
    DuplicateAttribute { name: String },
    MaxDepthExceeded { max: u16 },
    MaxSizeExceeded { max: usize },

    // argument binding
    MissingArgument { field: String },
    AmbiguousArgument { name: String, candidates: Vec<String> },
    UnexpectedArgument { name: String },
    TooManyArguments { expected: usize, found: usize },

    // decoding
    SchemaMismatch { expected: String, found: String },
    MultiRefCycle { id: String },
    InvalidScalar { kind: String, text: String },

    // client
    UnknownOperation { name: String },
    Transport,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidToken => write!(f, "invalid token"),
            Self::UnexpectedEof => write!(f, "unexpected end of input"),
            Self::InvalidUtf8 => write!(f, "invalid utf-8"),
            Self::InvalidEntity { entity } => write!(f, "invalid xml entity: &{entity};"),
            Self::MismatchedTag { expected, found } => {
                write!(f, "mismatched closing tag: expected </{expected}>, found </{found}>")
            }
            Self::DuplicateAttribute { name } => write!(f, "duplicate attribute: {name}"),
            Self::MaxDepthExceeded { max } => write!(f, "max depth exceeded: {max}"),
            Self::MaxSizeExceeded { max } => write!(f, "max size exceeded: {max}"),
            Self::MissingArgument { field } => write!(f, "missing required argument: {field}"),
            Self::AmbiguousArgument { name, candidates } => write!(
                f,
                "ambiguous argument {name}: matches {}",
                candidates.join(", ")
            ),
            Self::UnexpectedArgument { name } => write!(f, "unexpected argument: {name}"),
            Self::TooManyArguments { expected, found } => {
                write!(f, "too many positional arguments: expected at most {expected}, found {found}")
            }
            Self::SchemaMismatch { expected, found } => {
                write!(f, "schema mismatch: expected {expected}, found {found}")
            }
            Self::MultiRefCycle { id } => write!(f, "multiRef cycle through #{id}"),
            Self::InvalidScalar { kind, text } => write!(f, "invalid {kind} value: {text:?}"),
            Self::UnknownOperation { name } => write!(f, "unknown operation: {name}"),
            Self::Transport => write!(f, "transport failure"),
        }
    }
}

/// Main error type for zsoap
#[derive(Error, Clone, Debug, PartialEq)]
pub struct Error {
    kind: ErrorKind,
    span: Span,
    message: String,
}

impl Error {
    pub fn new(kind: ErrorKind, span: Span) -> Self {
        let message = kind.to_string();
        Self {
            kind,
            span,
            message,
        }
    }

    pub fn with_message(kind: ErrorKind, span: Span, message: impl Into<String>) -> Self {
        Self {
            kind,
            span,
            message: message.into(),
        }
    }

    /// Error without a source position (binding, decoding, transport)
    pub fn from_kind(kind: ErrorKind) -> Self {
        Self::new(kind, Span::empty())
    }

    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    pub fn span(&self) -> Span {
        self.span
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Create error at specific position
    pub fn at(kind: ErrorKind, offset: usize, line: u32, col: u32) -> Self {
        Self::new(kind, Span::at(Pos::new(offset, line, col)))
    }

    /// Malformed XML input
    pub fn is_parse_error(&self) -> bool {
        matches!(
            self.kind,
            ErrorKind::InvalidToken
                | ErrorKind::UnexpectedEof
                | ErrorKind::InvalidUtf8
                | ErrorKind::InvalidEntity { .. }
                | ErrorKind::MismatchedTag { .. }
                | ErrorKind::DuplicateAttribute { .. }
                | ErrorKind::MaxDepthExceeded { .. }
                | ErrorKind::MaxSizeExceeded { .. }
        )
    }

    /// Call arguments that cannot be arranged onto the operation's parameters
    pub fn is_binding_error(&self) -> bool {
        matches!(
            self.kind,
            ErrorKind::MissingArgument { .. }
                | ErrorKind::AmbiguousArgument { .. }
                | ErrorKind::UnexpectedArgument { .. }
                | ErrorKind::TooManyArguments { .. }
        )
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.span == Span::empty() {
            write!(f, "{}", self.message)
        } else {
            write!(f, "error at {}: {}", self.span.start, self.message)
        }
    }
}

/// Result type alias for zsoap
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pos_display() {
        let pos = Pos::new(42, 10, 5);
        assert_eq!(pos.to_string(), "42:10:5");
    }

    #[test]
    fn test_error_creation() {
        let err = Error::at(ErrorKind::InvalidToken, 0, 1, 1);
        assert_eq!(err.kind(), &ErrorKind::InvalidToken);
        assert!(err.is_parse_error());
        assert!(!err.is_binding_error());
    }

    #[test]
    fn test_error_display() {
        let err = Error::at(ErrorKind::UnexpectedEof, 10, 2, 5);
        let display = err.to_string();
        assert!(display.contains("error at 10:2:5"));
        assert!(display.contains("unexpected end of input"));
    }

    #[test]
    fn test_binding_error_display_has_no_position() {
        let err = Error::from_kind(ErrorKind::MissingArgument {
            field: "leadKey.keyType".to_string(),
        });
        assert!(err.is_binding_error());
        assert_eq!(err.to_string(), "missing required argument: leadKey.keyType");
    }

    #[test]
    fn test_ambiguous_lists_candidates() {
        let err = Error::from_kind(ErrorKind::AmbiguousArgument {
            name: "id".to_string(),
            candidates: vec!["a.id".to_string(), "b.id".to_string()],
        });
        assert_eq!(err.message(), "ambiguous argument id: matches a.id, b.id");
    }
}
