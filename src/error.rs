//! Error types for the hash table engine and the configuration tree.
//!
//! Lookup misses are never errors: they surface as `None`/`false`. The
//! enums here cover construction-time contract violations and
//! configuration loading failures.

use std::path::PathBuf;
use thiserror::Error;

/// Contract violations rejected when a `HashTable` is created.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum HashError {
    #[error("hash table capacity must be non-zero")]
    ZeroCapacity,

    #[error("fixed-length keys must have a non-zero length")]
    ZeroKeyLength,
}

/// Failures while reading, parsing or interpreting a configuration tree.
#[derive(Debug, Error)]
pub enum ConfError {
    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{origin}:{line} {message}")]
    Syntax {
        origin: String,
        line: usize,
        message: String,
    },

    #[error("{}: includes nested too deeply", path.display())]
    IncludeDepth { path: PathBuf },

    #[error("invalid value for {name}: {value:?}")]
    InvalidValue { name: String, value: String },
}

impl ConfError {
    pub(crate) fn syntax(origin: &str, line: usize, message: impl Into<String>) -> Self {
        Self::Syntax {
            origin: origin.to_string(),
            line,
            message: message.into(),
        }
    }

    /// Short static label, useful as a structured logging field.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Io { .. } => "io",
            Self::Syntax { .. } => "syntax",
            Self::IncludeDepth { .. } => "include_depth",
            Self::InvalidValue { .. } => "invalid_value",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn syntax_error_names_origin_and_line() {
        let e = ConfError::syntax("ircd.conf", 12, "missing semicolon (';')");
        assert_eq!(e.to_string(), "ircd.conf:12 missing semicolon (';')");
        assert_eq!(e.kind(), "syntax");
    }

    #[test]
    fn io_error_keeps_source() {
        use std::error::Error as _;
        let e = ConfError::Io {
            path: PathBuf::from("/nonexistent/ircd.conf"),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        };
        assert!(e.to_string().starts_with("/nonexistent/ircd.conf: "));
        assert!(e.source().is_some());
    }
}
