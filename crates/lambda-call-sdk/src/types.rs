// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Shared types for the callable bridge.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Parameter mode per the stored-procedure calling convention.
///
/// Modes only ever upgrade: registering an output on an `In` slot makes it
/// `Out`, binding a value on an `Out` slot makes it `InOut`. There is no
/// downgrade path.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ParameterMode {
    /// Input-only slot (the initial mode of every slot).
    #[default]
    In,
    /// Output-only slot; excluded from the serialized parameters.
    Out,
    /// Slot used in both directions.
    InOut,
}

impl ParameterMode {
    /// Mode after `register_out` on a slot in this mode.
    pub fn registered_out(self) -> Self {
        match self {
            ParameterMode::In | ParameterMode::Out => ParameterMode::Out,
            ParameterMode::InOut => ParameterMode::InOut,
        }
    }

    /// Mode after binding an input value on a slot in this mode.
    pub fn bound_input(self) -> Self {
        match self {
            ParameterMode::In => ParameterMode::In,
            ParameterMode::Out | ParameterMode::InOut => ParameterMode::InOut,
        }
    }

    /// Whether the slot is serialized into the outbound parameters.
    pub fn is_input(self) -> bool {
        matches!(self, ParameterMode::In | ParameterMode::InOut)
    }

    /// Whether the slot is legible after execution.
    pub fn is_output(self) -> bool {
        matches!(self, ParameterMode::Out | ParameterMode::InOut)
    }
}

/// How the remote function is invoked.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvocationType {
    /// Request-response; blocks until the function returns.
    #[default]
    Sync,
    /// Fire-and-forget; returns immediately with an acceptance signal.
    /// Output parameters and results are never populated in this mode.
    Async,
}

impl InvocationType {
    pub fn as_str(&self) -> &str {
        match self {
            InvocationType::Sync => "sync",
            InvocationType::Async => "async",
        }
    }
}

/// Log-capture mode for the invocation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogMode {
    /// No log capture.
    #[default]
    None,
    /// Capture the tail of the function's execution log.
    Tail,
}

impl LogMode {
    pub fn as_str(&self) -> &str {
        match self {
            LogMode::None => "none",
            LogMode::Tail => "tail",
        }
    }
}

/// Runtime kind of a column or registered parameter value.
///
/// There is no declared schema; kinds are inferred from the values actually
/// observed in a response.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ValueKind {
    Text,
    Integer,
    LongInteger,
    Real,
    SinglePrecision,
    Boolean,
    Date,
    Time,
    Timestamp,
    Binary,
    Decimal,
    #[default]
    Other,
}

impl ValueKind {
    /// Classify the runtime kind of a JSON value. Nulls classify as `Other`.
    pub fn of(value: &Value) -> Self {
        match value {
            Value::Bool(_) => ValueKind::Boolean,
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    if i32::try_from(i).is_ok() {
                        ValueKind::Integer
                    } else {
                        ValueKind::LongInteger
                    }
                } else {
                    ValueKind::Real
                }
            }
            Value::String(_) => ValueKind::Text,
            Value::Array(_) => ValueKind::Binary,
            _ => ValueKind::Other,
        }
    }

    /// Conventional display size for values of this kind.
    pub fn display_size(&self) -> usize {
        match self {
            ValueKind::Boolean => 5,
            ValueKind::Integer => 11,
            ValueKind::LongInteger => 20,
            ValueKind::Real | ValueKind::SinglePrecision | ValueKind::Decimal => 25,
            ValueKind::Date => 10,
            ValueKind::Time => 8,
            ValueKind::Timestamp => 29,
            _ => 255,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_mode_upgrades() {
        assert_eq!(ParameterMode::In.registered_out(), ParameterMode::Out);
        assert_eq!(ParameterMode::Out.bound_input(), ParameterMode::InOut);
        // InOut never downgrades.
        assert_eq!(ParameterMode::InOut.registered_out(), ParameterMode::InOut);
        assert_eq!(ParameterMode::InOut.bound_input(), ParameterMode::InOut);
        // Binding on an In slot leaves it In.
        assert_eq!(ParameterMode::In.bound_input(), ParameterMode::In);
    }

    #[test]
    fn test_mode_direction_flags() {
        assert!(ParameterMode::In.is_input());
        assert!(!ParameterMode::In.is_output());
        assert!(!ParameterMode::Out.is_input());
        assert!(ParameterMode::Out.is_output());
        assert!(ParameterMode::InOut.is_input());
        assert!(ParameterMode::InOut.is_output());
    }

    #[test]
    fn test_value_kind_classification() {
        assert_eq!(ValueKind::of(&json!("x")), ValueKind::Text);
        assert_eq!(ValueKind::of(&json!(1)), ValueKind::Integer);
        assert_eq!(ValueKind::of(&json!(i64::MAX)), ValueKind::LongInteger);
        assert_eq!(ValueKind::of(&json!(1.5)), ValueKind::Real);
        assert_eq!(ValueKind::of(&json!(true)), ValueKind::Boolean);
        assert_eq!(ValueKind::of(&json!([1, 2])), ValueKind::Binary);
        assert_eq!(ValueKind::of(&Value::Null), ValueKind::Other);
    }
}
