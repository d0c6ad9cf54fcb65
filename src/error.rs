//! Contains the error-related types for the crate.

mod decimal128;
mod oid;
mod uuid;
mod value_access;

use thiserror::Error;

pub use decimal128::Decimal128ErrorKind;
pub use oid::ObjectIdErrorKind;
pub use uuid::UuidErrorKind;
pub use value_access::ValueAccessErrorKind;

/// The result type for all methods that can return an error in this crate.
pub type Result<T> = std::result::Result<T, Error>;

/// An error that can occur in this crate.
#[derive(Clone, Debug, Error)]
#[non_exhaustive]
pub struct Error {
    /// The kind of error that occurred.
    pub kind: ErrorKind,

    /// An optional message describing the error.
    pub message: Option<String>,

    /// The document key associated with the error, if any.
    pub key: Option<String>,

    /// The array index associated with the error, if any.
    pub index: Option<usize>,

    /// The full key/index breadcrumb path to a decoding error, if any.
    pub path: Vec<PathSegment>,
}

/// One step of the breadcrumb trail recorded by [`ErrorKind::Decoding`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PathSegment {
    /// A document key.
    Key(String),
    /// An array index.
    Index(usize),
}

impl std::fmt::Display for PathSegment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PathSegment::Key(k) => write!(f, ".{k}"),
            PathSegment::Index(i) => write!(f, "[{i}]"),
        }
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "BSON error")?;

        if let Some(key) = self.key.as_deref() {
            write!(f, " at key \"{key}\"")?;
        } else if let Some(index) = self.index {
            write!(f, " at array index {index}")?;
        }

        write!(f, ". Kind: {}", self.kind)?;
        if let Some(ref message) = self.message {
            write!(f, ". Message: {}", message)?;
        }
        if !self.path.is_empty() {
            write!(f, ". Path: $")?;
            for segment in &self.path {
                write!(f, "{segment}")?;
            }
        }

        write!(f, ".")
    }
}

impl std::error::Error for Error {}

/// The types of errors that can occur in this crate.
#[derive(Clone, Debug, Error)]
#[non_exhaustive]
pub enum ErrorKind {
    /// A constructor or setter was given an argument that violates the type's invariants.
    #[error("Invalid argument")]
    #[non_exhaustive]
    InvalidArgument {},

    /// A document grew past the maximum representable BSON document size.
    #[error("Document too large: {size} bytes exceeds the maximum of {max} bytes")]
    #[non_exhaustive]
    DocumentTooLarge {
        /// The size that was attempted.
        size: usize,
        /// The maximum allowed size.
        max: usize,
    },

    /// An invariant internal to this crate was violated. These should not occur in practice;
    /// if one is observed, it indicates a bug in this crate rather than in the caller.
    #[error("Internal error")]
    #[non_exhaustive]
    Internal {},

    /// Extended JSON decoding failed while converting a JSON value into a [`Bson`](crate::Bson).
    #[error("Decoding error")]
    #[non_exhaustive]
    Decoding {},

    /// An error related to the [`Binary`](crate::Binary) type occurred.
    #[error("A Binary-related error occurred")]
    #[non_exhaustive]
    Binary {},

    /// An error related to the [`DateTime`](crate::DateTime) type occurred.
    #[error("A DateTime-related error occurred")]
    #[non_exhaustive]
    DateTime {},

    /// An error related to the [`Decimal128`](crate::Decimal128) type occurred.
    #[error("A Decimal128-related error occurred: {kind}")]
    #[non_exhaustive]
    Decimal128 {
        /// The kind of error that occurred.
        kind: Decimal128ErrorKind,
    },

    /// The end of the BSON input was reached too soon.
    #[error("End of stream")]
    #[non_exhaustive]
    EndOfStream {},

    /// Malformed BSON bytes were encountered.
    #[error("Malformed BSON bytes")]
    #[non_exhaustive]
    MalformedBytes {},

    /// An error related to the [`ObjectId`](crate::oid::ObjectId) type occurred.
    #[error("An ObjectId-related error occurred: {kind}")]
    #[non_exhaustive]
    ObjectId {
        /// The kind of error that occurred.
        kind: ObjectIdErrorKind,
    },

    /// An unsigned integer could not fit into a BSON integer type.
    #[error("Unsigned integer {n} cannot fit into BSON")]
    #[non_exhaustive]
    TooLargeUnsignedInteger {
        /// The too-large unsigned integer.
        n: u64,
    },

    /// Invalid UTF-8 bytes were encountered.
    #[error("Invalid UTF-8")]
    #[non_exhaustive]
    Utf8Encoding {},

    /// An error related to the [`Uuid`](crate::uuid::Uuid) type occurred.
    #[error("A UUID-related error occurred: {kind}")]
    #[non_exhaustive]
    Uuid {
        /// The kind of error that occurred.
        kind: UuidErrorKind,
    },

    /// An error occurred when attempting to access a value in a document.
    #[error("An error occurred when attempting to access a document value: {kind}")]
    #[non_exhaustive]
    ValueAccess {
        /// The kind of error that occurred.
        kind: ValueAccessErrorKind,
    },

    /// An IO error occurred.
    #[error("An IO error occurred")]
    #[non_exhaustive]
    Io {},
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Self {
        Self {
            kind,
            key: None,
            index: None,
            message: None,
            path: Vec::new(),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(value: std::io::Error) -> Self {
        Error::from(ErrorKind::Io {}).with_message(value)
    }
}

impl Error {
    pub(crate) fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub(crate) fn with_index(mut self, index: usize) -> Self {
        self.index = Some(index);
        self
    }

    pub(crate) fn with_message(mut self, message: impl ToString) -> Self {
        self.message = Some(message.to_string());
        self
    }

    /// Prepends a path segment, used as a decoding error unwinds back up through nested
    /// documents and arrays.
    pub(crate) fn with_path_segment(mut self, segment: PathSegment) -> Self {
        self.path.insert(0, segment);
        self
    }

    pub(crate) fn invalid_argument(message: impl ToString) -> Self {
        Self::from(ErrorKind::InvalidArgument {}).with_message(message)
    }

    pub(crate) fn document_too_large(size: usize, max: usize) -> Self {
        Self::from(ErrorKind::DocumentTooLarge { size, max })
    }

    pub(crate) fn internal(message: impl ToString) -> Self {
        Self::from(ErrorKind::Internal {}).with_message(message)
    }

    pub(crate) fn decoding(message: impl ToString) -> Self {
        Self::from(ErrorKind::Decoding {}).with_message(message)
    }

    pub(crate) fn binary(message: impl ToString) -> Self {
        Self::from(ErrorKind::Binary {}).with_message(message)
    }

    pub(crate) fn datetime(message: impl ToString) -> Self {
        Self::from(ErrorKind::DateTime {}).with_message(message)
    }

    pub(crate) fn malformed_bytes(message: impl ToString) -> Self {
        Self::from(ErrorKind::MalformedBytes {}).with_message(message)
    }

    #[cfg(test)]
    pub(crate) fn is_malformed_bytes(&self) -> bool {
        matches!(self.kind, ErrorKind::MalformedBytes { .. })
    }

    pub(crate) fn too_large_integer(n: u64) -> Self {
        Self::from(ErrorKind::TooLargeUnsignedInteger { n })
    }
}
