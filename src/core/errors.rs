//! WSS-prefixed error types with structured error codes.

#![allow(missing_docs)]

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Shared `Result` alias for the project.
pub type Result<T> = std::result::Result<T, StatusError>;

/// Top-level error type for the wallet status layer.
#[derive(Debug, Error)]
pub enum StatusError {
    #[error("[WSS-1001] invalid configuration: {details}")]
    InvalidConfig { details: String },

    #[error("[WSS-1002] missing configuration file: {path}")]
    MissingConfig { path: PathBuf },

    #[error("[WSS-1003] configuration parse failure in {context}: {details}")]
    ConfigParse {
        context: &'static str,
        details: String,
    },

    #[error("[WSS-2001] no dialog registered for kind {kind:?}")]
    UnknownDialog { kind: String },

    #[error("[WSS-2101] serialization failure in {context}: {details}")]
    Serialization {
        context: &'static str,
        details: String,
    },

    #[error("[WSS-2102] sample script parse failure at line {line}: {details}")]
    ScriptParse { line: usize, details: String },

    #[error("[WSS-2201] height ingest failure in {source_name}: {details}")]
    Ingest {
        source_name: &'static str,
        details: String,
    },

    #[error("[WSS-3002] IO failure at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("[WSS-3003] channel closed in component {component}")]
    ChannelClosed { component: &'static str },

    #[error("[WSS-3900] runtime failure: {details}")]
    Runtime { details: String },
}

impl StatusError {
    /// Stable machine-parseable error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidConfig { .. } => "WSS-1001",
            Self::MissingConfig { .. } => "WSS-1002",
            Self::ConfigParse { .. } => "WSS-1003",
            Self::UnknownDialog { .. } => "WSS-2001",
            Self::Serialization { .. } => "WSS-2101",
            Self::ScriptParse { .. } => "WSS-2102",
            Self::Ingest { .. } => "WSS-2201",
            Self::Io { .. } => "WSS-3002",
            Self::ChannelClosed { .. } => "WSS-3003",
            Self::Runtime { .. } => "WSS-3900",
        }
    }

    /// Whether retrying might resolve the failure.
    ///
    /// Ingest failures are transient by nature: the next poll tick may succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Io { .. } | Self::ChannelClosed { .. } | Self::Ingest { .. } | Self::Runtime { .. }
        )
    }

    /// Convenience constructor for IO errors with a known path.
    #[must_use]
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }
}

impl From<serde_json::Error> for StatusError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serialization {
            context: "serde_json",
            details: value.to_string(),
        }
    }
}

impl From<toml::de::Error> for StatusError {
    fn from(value: toml::de::Error) -> Self {
        Self::ConfigParse {
            context: "toml",
            details: value.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all_variants() -> Vec<StatusError> {
        vec![
            StatusError::InvalidConfig {
                details: String::new(),
            },
            StatusError::MissingConfig {
                path: PathBuf::new(),
            },
            StatusError::ConfigParse {
                context: "",
                details: String::new(),
            },
            StatusError::UnknownDialog {
                kind: String::new(),
            },
            StatusError::Serialization {
                context: "",
                details: String::new(),
            },
            StatusError::ScriptParse {
                line: 0,
                details: String::new(),
            },
            StatusError::Ingest {
                source_name: "",
                details: String::new(),
            },
            StatusError::Io {
                path: PathBuf::new(),
                source: std::io::Error::other("test"),
            },
            StatusError::ChannelClosed { component: "" },
            StatusError::Runtime {
                details: String::new(),
            },
        ]
    }

    #[test]
    fn error_codes_are_unique() {
        let codes: Vec<&str> = all_variants().iter().map(StatusError::code).collect();
        let unique: std::collections::HashSet<&&str> = codes.iter().collect();
        assert_eq!(
            codes.len(),
            unique.len(),
            "error codes must be unique: {codes:?}"
        );
    }

    #[test]
    fn display_includes_code_prefix() {
        for err in all_variants() {
            let rendered = err.to_string();
            assert!(
                rendered.starts_with(&format!("[{}]", err.code())),
                "display {rendered:?} should start with its code"
            );
        }
    }

    #[test]
    fn ingest_errors_are_retryable_but_config_errors_are_not() {
        let ingest = StatusError::Ingest {
            source_name: "script",
            details: "eof".into(),
        };
        assert!(ingest.is_retryable());
        let cfg = StatusError::InvalidConfig {
            details: "bad".into(),
        };
        assert!(!cfg.is_retryable());
        let unknown = StatusError::UnknownDialog {
            kind: "nope".into(),
        };
        assert!(!unknown.is_retryable());
    }

    #[test]
    fn toml_error_converts_to_config_parse() {
        let err: StatusError = toml::from_str::<toml::Value>("not = [valid")
            .map_err(StatusError::from)
            .expect_err("invalid toml");
        assert_eq!(err.code(), "WSS-1003");
    }
}
