// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Error types for lambda-call-sdk.

use thiserror::Error;

/// Result type using CallError.
pub type Result<T> = std::result::Result<T, CallError>;

/// Errors that can occur while preparing or executing a callable statement.
///
/// One tagged type covers the whole surface; [`CallError::kind`] exposes the
/// discriminant for programmatic matching.
#[derive(Debug, Error)]
pub enum CallError {
    /// Malformed call-statement text.
    #[error("syntax error: {0}")]
    Syntax(String),

    /// Function or environment-variable name rejected by the security policy.
    #[error("not authorized: {0}")]
    Authorization(String),

    /// Missing or invalid identity-strategy or connection configuration.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Parameter index outside `[1, parameter_count]`.
    #[error("parameter index {index} out of range (1..={count})")]
    Range { index: usize, count: usize },

    /// Named parameter with no registered alias.
    #[error("unknown parameter name: {0}")]
    UnknownParameter(String),

    /// Illegal read, or query/update execution-shape mismatch.
    #[error("invalid state: {0}")]
    State(String),

    /// Transport or host fault: the remote call itself could not complete.
    #[error("execution failed: {0}")]
    Execution(String),

    /// Well-formed response with `success: false`.
    #[error("application error: {0}")]
    Application(String),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Error-kind discriminant carried by every [`CallError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallErrorKind {
    Syntax,
    Authorization,
    Configuration,
    Range,
    UnknownParameter,
    State,
    Execution,
    Application,
    Serialization,
}

impl CallError {
    /// The kind discriminant for this error.
    pub fn kind(&self) -> CallErrorKind {
        match self {
            CallError::Syntax(_) => CallErrorKind::Syntax,
            CallError::Authorization(_) => CallErrorKind::Authorization,
            CallError::Configuration(_) => CallErrorKind::Configuration,
            CallError::Range { .. } => CallErrorKind::Range,
            CallError::UnknownParameter(_) => CallErrorKind::UnknownParameter,
            CallError::State(_) => CallErrorKind::State,
            CallError::Execution(_) => CallErrorKind::Execution,
            CallError::Application(_) => CallErrorKind::Application,
            CallError::Serialization(_) => CallErrorKind::Serialization,
        }
    }
}

impl From<serde_json::Error> for CallError {
    fn from(err: serde_json::Error) -> Self {
        CallError::Serialization(err.to_string())
    }
}

impl From<lambda_call_protocol::EnvelopeError> for CallError {
    fn from(err: lambda_call_protocol::EnvelopeError) -> Self {
        use lambda_call_protocol::EnvelopeError;
        match err {
            EnvelopeError::Malformed(e) => CallError::Serialization(e.to_string()),
            EnvelopeError::Failed(message) => CallError::Application(message),
        }
    }
}
