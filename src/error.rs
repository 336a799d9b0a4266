//! Error taxonomy for shape generation
//!
//! Every fatal condition is a [`ShapesError`] variant and maps onto an
//! [`ErrorCode`] used for exit codes and structured log fields. Non-fatal
//! conditions are not errors; they are reported as [`RunWarning`]s on the
//! run report.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

// =============================================================================
// ERROR CODES
// =============================================================================

/// Stable error codes, one per failure family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(i32)]
pub enum ErrorCode {
    /// Invalid or inconsistent configuration
    Configuration = 2,
    /// Target graph exists and the policy is `stop`
    AlreadyExists = 3,
    /// Store, title service or prefix directory call failed
    UpstreamService = 4,
    /// IRI without a separable local name
    InvalidIdentifier = 5,
    /// Title could not be split into body and prefix
    MalformedTitle = 6,
    /// A query result could not be decoded
    MalformedResponse = 7,
}

impl ErrorCode {
    pub fn code(&self) -> i32 {
        *self as i32
    }

    /// Nothing is retried; kept so callers do not have to special-case codes.
    pub fn is_retryable(&self) -> bool {
        false
    }

    pub fn category(&self) -> &'static str {
        match self {
            ErrorCode::Configuration => "client_error",
            ErrorCode::AlreadyExists => "conflict",
            ErrorCode::UpstreamService | ErrorCode::MalformedResponse => "upstream_error",
            ErrorCode::InvalidIdentifier | ErrorCode::MalformedTitle => "naming_error",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}({})", self, self.code())
    }
}

// =============================================================================
// ERRORS
// =============================================================================

#[derive(Debug, Error)]
pub enum ShapesError {
    #[error("invalid configuration: {0}")]
    Configuration(String),

    #[error("graph <{graph}> already exists")]
    AlreadyExists { graph: String },

    #[error("{service} request failed{}: {message}", status_suffix(.status))]
    Upstream {
        service: &'static str,
        status: Option<u16>,
        message: String,
    },

    #[error("invalid identifier <{0}>: no separable local name")]
    InvalidIdentifier(String),

    #[error("cannot derive a name for <{iri}> from title '{title}'")]
    MalformedTitle { iri: String, title: String },

    #[error("malformed response: {0}")]
    MalformedResponse(String),
}

impl ShapesError {
    pub fn code(&self) -> ErrorCode {
        match self {
            ShapesError::Configuration(_) => ErrorCode::Configuration,
            ShapesError::AlreadyExists { .. } => ErrorCode::AlreadyExists,
            ShapesError::Upstream { .. } => ErrorCode::UpstreamService,
            ShapesError::InvalidIdentifier(_) => ErrorCode::InvalidIdentifier,
            ShapesError::MalformedTitle { .. } => ErrorCode::MalformedTitle,
            ShapesError::MalformedResponse(_) => ErrorCode::MalformedResponse,
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        ShapesError::Configuration(message.into())
    }

    pub fn upstream(service: &'static str, message: impl fmt::Display) -> Self {
        ShapesError::Upstream {
            service,
            status: None,
            message: message.to_string(),
        }
    }

    pub fn upstream_status(service: &'static str, status: u16, message: impl Into<String>) -> Self {
        ShapesError::Upstream {
            service,
            status: Some(status),
            message: message.into(),
        }
    }
}

impl From<reqwest::Error> for ShapesError {
    fn from(error: reqwest::Error) -> Self {
        ShapesError::Upstream {
            service: "http",
            status: error.status().map(|s| s.as_u16()),
            message: error.to_string(),
        }
    }
}

fn status_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" ({s})")).unwrap_or_default()
}

pub type Result<T> = std::result::Result<T, ShapesError>;

// =============================================================================
// WARNINGS
// =============================================================================

/// Non-fatal conditions collected during a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RunWarning {
    /// The remote prefix directory failed; the bundled snapshot was used
    PrefixDirectoryUnavailable { reason: String },
    /// A property was seen with both literal and IRI objects
    MixedNodeKind { property: String, inverse: bool },
    /// The previous catalog label did not follow the default grammar
    MalformedLabel { previous: String },
    /// The task description was not found in the metadata graph
    MissingProvenance { task: String },
}

impl fmt::Display for RunWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunWarning::PrefixDirectoryUnavailable { reason } => {
                write!(f, "prefix directory unavailable ({reason}), using bundled snapshot")
            }
            RunWarning::MixedNodeKind { property, inverse } => write!(
                f,
                "<{property}>{} has literal and IRI objects, keeping first-seen node kind",
                if *inverse { " (inverse)" } else { "" }
            ),
            RunWarning::MalformedLabel { previous } => {
                write!(f, "malformed catalog label '{previous}' kept as comment")
            }
            RunWarning::MissingProvenance { task } => {
                write!(f, "no description of task <{task}> found, provenance skipped")
            }
        }
    }
}
