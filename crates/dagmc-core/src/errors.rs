//! Structured error types shared across dagmc crates.

use std::collections::BTreeMap;
use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Structured payload attached to every [`McmcError`] variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    /// Stable machine readable error code.
    pub code: String,
    /// Human readable diagnostic message.
    pub message: String,
    /// Contextual key value pairs (node names, indices, paths, etc.).
    #[serde(default)]
    pub context: BTreeMap<String, String>,
    /// Optional hint that may help the caller resolve the issue.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl ErrorInfo {
    /// Creates a new error payload with the provided code and message.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            context: BTreeMap::new(),
            hint: None,
        }
    }

    /// Adds a context entry to the payload.
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    /// Sets a human readable hint for remediation.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

/// Canonical error type for the dagmc engine.
///
/// Every variant is fatal for the run that produced it. Rejected proposals are
/// never reported through this type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[serde(tag = "family", content = "detail")]
pub enum McmcError {
    /// Invalid configuration or wiring detected while assembling a run.
    #[error("config error: {0}")]
    Config(ErrorInfo),
    /// Dependency graph structure errors (unknown handles, wrong node kinds).
    #[error("graph error: {0}")]
    Graph(ErrorInfo),
    /// Violations of the cache/update/commit protocol.
    #[error("state error: {0}")]
    State(ErrorInfo),
    /// Failures while a dependent or model recomputes its value.
    #[error("evaluation error: {0}")]
    Evaluation(ErrorInfo),
    /// Output stream failures.
    #[error("io error: {0}")]
    Io(ErrorInfo),
    /// Serialization and schema errors.
    #[error("serde error: {0}")]
    Serde(ErrorInfo),
}

impl Display for ErrorInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (code: {})", self.message, self.code)?;
        if !self.context.is_empty() {
            write!(f, " | context: [")?;
            for (idx, (key, value)) in self.context.iter().enumerate() {
                if idx > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{key}={value}")?;
            }
            write!(f, "]")?;
        }
        if let Some(hint) = &self.hint {
            write!(f, " | hint: {hint}")?;
        }
        Ok(())
    }
}

impl McmcError {
    /// Returns a reference to the payload describing the error.
    pub fn info(&self) -> &ErrorInfo {
        match self {
            McmcError::Config(info)
            | McmcError::Graph(info)
            | McmcError::State(info)
            | McmcError::Evaluation(info)
            | McmcError::Io(info)
            | McmcError::Serde(info) => info,
        }
    }

    /// Shorthand for a configuration error.
    pub fn config(code: impl Into<String>, message: impl Into<String>) -> Self {
        McmcError::Config(ErrorInfo::new(code, message))
    }

    /// Wraps an I/O failure, recording what was being written.
    pub fn io(code: impl Into<String>, err: &std::io::Error) -> Self {
        McmcError::Io(
            ErrorInfo::new(code, err.to_string()).with_context("kind", format!("{:?}", err.kind())),
        )
    }
}
