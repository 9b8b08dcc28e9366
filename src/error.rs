//! Provide the error type shared by every part of the tokenizer.

use std::{borrow::Cow, fmt::Display, io};

use crate::encoding::EncodingError;

/// Errors reported while configuring or driving an [`XmlTokenizer`](crate::XmlTokenizer).
///
/// Configuration errors are returned from construction only.
/// All the others surface from the `next` call that was in progress
/// when the problem was found; the sequence ends afterwards.
#[derive(Debug)]
pub enum XmlTokenizeError {
    /// The path expression is malformed.
    InvalidPath {
        path: String,
        reason: Cow<'static, str>,
    },
    /// A prefix used in the path expression has no binding in the prefix map.
    UnboundPrefix { path: String, prefix: String },
    /// The pull parser cannot report character offsets.
    LocationUnsupported,
    /// The encoding is unusable, or a captured span cannot be decoded.
    Encoding(EncodingError),
    /// The document is not well-formed.
    Parse { position: usize, message: String },
    /// Reading from the source failed.
    Io(io::Error),
}

impl XmlTokenizeError {
    pub(crate) fn parse(position: usize, message: impl Into<String>) -> Self {
        Self::Parse {
            position,
            message: message.into(),
        }
    }

    pub(crate) fn invalid_path(path: &str, reason: impl Into<Cow<'static, str>>) -> Self {
        Self::InvalidPath {
            path: path.to_owned(),
            reason: reason.into(),
        }
    }

    /// Check if this error can only be raised while constructing a tokenizer.
    pub fn is_configuration(&self) -> bool {
        match self {
            Self::InvalidPath { .. } | Self::UnboundPrefix { .. } | Self::LocationUnsupported => {
                true
            }
            Self::Encoding(err) => err.is_configuration(),
            Self::Parse { .. } | Self::Io(_) => false,
        }
    }

    /// Check if this error was caused by malformed XML.
    pub fn is_parse(&self) -> bool {
        matches!(self, Self::Parse { .. })
    }
}

impl Display for XmlTokenizeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidPath { path, reason } => {
                write!(f, "invalid path expression '{path}': {reason}")
            }
            Self::UnboundPrefix { path, prefix } => {
                write!(f, "prefix '{prefix}' in path '{path}' is not bound")
            }
            Self::LocationUnsupported => {
                write!(f, "the pull parser does not report character offsets")
            }
            Self::Encoding(err) => write!(f, "{err}"),
            Self::Parse { position, message } => {
                write!(f, "XML parse error at {position}: {message}")
            }
            Self::Io(err) => write!(f, "I/O error: {err}"),
        }
    }
}

impl std::error::Error for XmlTokenizeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Encoding(err) => Some(err),
            Self::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<EncodingError> for XmlTokenizeError {
    fn from(value: EncodingError) -> Self {
        Self::Encoding(value)
    }
}

impl From<io::Error> for XmlTokenizeError {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_errors_test() {
        assert!(XmlTokenizeError::invalid_path("", "empty").is_configuration());
        assert!(XmlTokenizeError::LocationUnsupported.is_configuration());
        assert!(
            XmlTokenizeError::Encoding(EncodingError::Unknown {
                label: "foo".to_owned()
            })
            .is_configuration()
        );
        let err = XmlTokenizeError::parse(12, "unexpected end of document");
        assert!(err.is_parse());
        assert!(!err.is_configuration());
        assert_eq!(
            err.to_string(),
            "XML parse error at 12: unexpected end of document"
        );
    }
}
