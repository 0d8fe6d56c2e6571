// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Response classification into the four result shapes.
//!
//! A successful response is exactly one of: output parameters, tabular rows,
//! a scalar update count, a single wrapped value, or nothing. The checks run
//! in that order and the first match wins, so a response that carries both
//! `outputParameters` and `resultSet` is treated as an output-parameter
//! response.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::envelope::{EnvelopeError, InvokeResponse, parameter_index};

/// Classified result of a successful invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum DecodedResult {
    /// Output parameter values, keyed by 1-based parameter index.
    Outputs(BTreeMap<usize, Value>),
    /// Tabular rows in wire order.
    Tabular(Vec<Map<String, Value>>),
    /// Numeric result, exposed as an update count.
    Scalar(i64),
    /// Non-numeric single result, exposed as a one-row, one-column table.
    SingleValue(Value),
    /// No result at all (void function or empty body).
    Empty,
}

impl DecodedResult {
    /// Whether this shape is exposed through the tabular cursor.
    pub fn is_tabular(&self) -> bool {
        matches!(self, Self::Tabular(_) | Self::SingleValue(_))
    }
}

/// Classify a response envelope.
///
/// `success: false` raises [`EnvelopeError::Failed`] with the response's
/// error message; everything else resolves to exactly one
/// [`DecodedResult`] variant.
pub fn classify(response: InvokeResponse) -> Result<DecodedResult, EnvelopeError> {
    if response.success == Some(false) {
        let message = response
            .error
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| "remote function reported failure".to_string());
        return Err(EnvelopeError::Failed(message));
    }

    if let Some(outputs) = response.output_parameters {
        // Keys that do not parse as param<N> are ignored, not rejected.
        let values = outputs
            .into_iter()
            .filter_map(|(key, value)| parameter_index(&key).map(|index| (index, value)))
            .collect();
        return Ok(DecodedResult::Outputs(values));
    }

    if let Some(rows) = response.result_set
        && !rows.is_empty()
    {
        return Ok(DecodedResult::Tabular(rows));
    }

    match response.result {
        Some(Value::Number(n)) => {
            let count = n
                .as_i64()
                .unwrap_or_else(|| n.as_f64().unwrap_or_default() as i64);
            Ok(DecodedResult::Scalar(count))
        }
        Some(Value::Null) | None => Ok(DecodedResult::Empty),
        Some(value) => Ok(DecodedResult::SingleValue(value)),
    }
}
