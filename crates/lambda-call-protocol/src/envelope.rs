// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Request and response envelopes for stored-procedure-style invocations.
//!
//! Wire shape of a request:
//!
//! ```json
//! {
//!   "action": "calc",
//!   "parameters": {"param1": "a", "param2": 5},
//!   "environment": {"PRIORITY": "high"},
//!   "context": {"jdbcVersion": "4.2", "requestTime": "..."},
//!   "configuration": {"qualifier": "prod"}
//! }
//! ```
//!
//! And of a response:
//!
//! ```json
//! {
//!   "success": true,
//!   "error": null,
//!   "result": 5,
//!   "outputParameters": {"param3": "x"},
//!   "resultSet": [{"a": 1}, {"a": 2}]
//! }
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Context entry naming the calling-convention version the bridge speaks.
pub const CONTEXT_INTERFACE_VERSION_KEY: &str = "jdbcVersion";

/// Context entry carrying the request assembly timestamp (RFC 3339).
pub const CONTEXT_REQUEST_TIME_KEY: &str = "requestTime";

/// Configuration entry carrying the optional function version qualifier.
pub const CONFIGURATION_QUALIFIER_KEY: &str = "qualifier";

/// Key prefix for positional parameters (`param1`, `param2`, ...).
pub const PARAMETER_KEY_PREFIX: &str = "param";

/// Build the wire key for a 1-based parameter index.
pub fn parameter_key(index: usize) -> String {
    format!("{PARAMETER_KEY_PREFIX}{index}")
}

/// Parse a wire key back into a 1-based parameter index.
///
/// Returns `None` for keys that do not match `param<N>` with `N >= 1`;
/// callers are expected to skip such entries rather than fail.
pub fn parameter_index(key: &str) -> Option<usize> {
    let digits = key.strip_prefix(PARAMETER_KEY_PREFIX)?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    match digits.parse::<usize>() {
        Ok(n) if n >= 1 => Some(n),
        _ => None,
    }
}

/// Errors raised while encoding or decoding envelopes.
#[derive(Debug, Error)]
pub enum EnvelopeError {
    /// The payload was not valid JSON for the expected envelope shape.
    #[error("malformed invocation payload: {0}")]
    Malformed(#[from] serde_json::Error),

    /// A well-formed response with `success: false`; message taken verbatim
    /// from the response's `error` field.
    #[error("{0}")]
    Failed(String),
}

/// The outbound invocation envelope.
///
/// Field order here matches the wire layout. All four object sections are
/// always present, empty objects included.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct InvokeRequest {
    /// Name of the remote function to invoke.
    pub action: String,
    /// Positional parameters keyed `param<N>`.
    pub parameters: Map<String, Value>,
    /// Merged environment variables (statement-level wins over connection-level).
    pub environment: Map<String, Value>,
    /// Caller execution context plus the fixed interface-version and
    /// request-time entries.
    pub context: Map<String, Value>,
    /// Caller configuration parameters plus the optional qualifier.
    pub configuration: Map<String, Value>,
}

impl InvokeRequest {
    /// Create an empty envelope for the given function name.
    pub fn new(action: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            ..Self::default()
        }
    }

    /// Serialize the envelope to its wire bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>, EnvelopeError> {
        Ok(serde_json::to_vec(self)?)
    }
}

/// The inbound invocation envelope.
///
/// Every field is optional on the wire: an empty body decodes to the default
/// value and classifies as an empty result.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct InvokeResponse {
    /// Whether the function reported success. Absent is treated as success;
    /// only an explicit `false` raises an application failure.
    pub success: Option<bool>,
    /// Application error message, meaningful when `success` is `false`.
    pub error: Option<String>,
    /// Scalar or single-value result.
    pub result: Option<Value>,
    /// Output parameter values keyed `param<N>`.
    pub output_parameters: Option<Map<String, Value>>,
    /// Tabular rows, each a column-name → value object.
    pub result_set: Option<Vec<Map<String, Value>>>,
}

impl InvokeResponse {
    /// Decode a response from its wire bytes.
    ///
    /// An empty or whitespace-only body is a valid empty response.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, EnvelopeError> {
        if bytes.iter().all(|b| b.is_ascii_whitespace()) {
            return Ok(Self::default());
        }
        // Some runtimes answer a bare "null" body for void functions.
        let value: Value = serde_json::from_slice(bytes)?;
        if value.is_null() {
            return Ok(Self::default());
        }
        Ok(serde_json::from_value(value)?)
    }
}
