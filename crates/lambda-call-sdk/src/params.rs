// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Parameter table: slot modes, bound values, aliases, output retrieval.
//!
//! The table owns one slot per placeholder detected at parse time; the count
//! never changes afterward. Indexes are 1-based, per the calling convention.
//!
//! The null-check flag (`was_null`) is shared across all parameters and
//! reflects only the most recent read. This matches the historical contract:
//! callers must check it immediately after each getter, before reading the
//! next parameter.

use std::collections::HashMap;

use base64::{Engine as _, engine::general_purpose};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde_json::{Map, Value};

use lambda_call_protocol::envelope::parameter_key;

use crate::coerce;
use crate::error::{CallError, Result};
use crate::types::{ParameterMode, ValueKind};

/// One positional parameter slot.
#[derive(Debug, Clone, Default)]
pub struct ParameterSlot {
    mode: ParameterMode,
    value: Option<Value>,
    registered: Option<ValueKind>,
    scale: Option<i32>,
    type_name: Option<String>,
}

impl ParameterSlot {
    /// Current parameter mode.
    pub fn mode(&self) -> ParameterMode {
        self.mode
    }

    /// Currently bound value, if any.
    pub fn value(&self) -> Option<&Value> {
        self.value.as_ref()
    }

    /// Kind registered via `register_out`, if any.
    pub fn registered_kind(&self) -> Option<ValueKind> {
        self.registered
    }

    /// Scale registered via `register_out_with_scale`, if any.
    pub fn scale(&self) -> Option<i32> {
        self.scale
    }

    /// User-defined type name registered via `register_out_with_type_name`.
    pub fn type_name(&self) -> Option<&str> {
        self.type_name.as_deref()
    }
}

/// Ordered parameter slots plus named aliases and the shared null-check flag.
#[derive(Debug, Clone)]
pub struct ParameterTable {
    slots: Vec<ParameterSlot>,
    aliases: HashMap<String, usize>,
    last_read_was_null: bool,
}

impl ParameterTable {
    /// Create a table with `count` slots, all in mode `In`.
    pub fn new(count: usize) -> Self {
        Self {
            slots: vec![ParameterSlot::default(); count],
            aliases: HashMap::new(),
            last_read_was_null: false,
        }
    }

    /// Number of slots; immutable after parse.
    pub fn parameter_count(&self) -> usize {
        self.slots.len()
    }

    /// Borrow a slot after validating the 1-based index.
    pub fn slot(&self, index: usize) -> Result<&ParameterSlot> {
        self.check_range(index)?;
        Ok(&self.slots[index - 1])
    }

    fn check_range(&self, index: usize) -> Result<()> {
        if index < 1 || index > self.slots.len() {
            return Err(CallError::Range {
                index,
                count: self.slots.len(),
            });
        }
        Ok(())
    }

    // =========================================================================
    // Aliases
    // =========================================================================

    /// Map a parameter name to a 1-based index.
    pub fn alias(&mut self, name: impl Into<String>, index: usize) -> Result<()> {
        self.check_range(index)?;
        self.aliases.insert(name.into(), index);
        Ok(())
    }

    /// Resolve a parameter name to its index.
    pub fn index_of(&self, name: &str) -> Result<usize> {
        self.aliases
            .get(name)
            .copied()
            .ok_or_else(|| CallError::UnknownParameter(name.to_string()))
    }

    // =========================================================================
    // Registration and binding
    // =========================================================================

    /// Register a slot as an output parameter of the given kind.
    ///
    /// Upgrades `In` to `Out`; a slot already upgraded to `InOut` keeps it.
    pub fn register_out(&mut self, index: usize, kind: ValueKind) -> Result<()> {
        self.check_range(index)?;
        let slot = &mut self.slots[index - 1];
        slot.mode = slot.mode.registered_out();
        slot.registered = Some(kind);
        Ok(())
    }

    /// Register an output parameter with a numeric scale.
    pub fn register_out_with_scale(
        &mut self,
        index: usize,
        kind: ValueKind,
        scale: i32,
    ) -> Result<()> {
        self.register_out(index, kind)?;
        self.slots[index - 1].scale = Some(scale);
        Ok(())
    }

    /// Register an output parameter with a user-defined type name.
    pub fn register_out_with_type_name(
        &mut self,
        index: usize,
        kind: ValueKind,
        type_name: impl Into<String>,
    ) -> Result<()> {
        self.register_out(index, kind)?;
        self.slots[index - 1].type_name = Some(type_name.into());
        Ok(())
    }

    /// Register an output parameter by name.
    pub fn register_out_named(&mut self, name: &str, kind: ValueKind) -> Result<()> {
        let index = self.index_of(name)?;
        self.register_out(index, kind)
    }

    /// Bind a JSON value to a slot. Upgrades `Out` to `InOut`.
    pub fn set_value(&mut self, index: usize, value: Value) -> Result<()> {
        self.check_range(index)?;
        let slot = &mut self.slots[index - 1];
        slot.mode = slot.mode.bound_input();
        slot.value = Some(value);
        Ok(())
    }

    /// Bind a value by name.
    pub fn set_value_named(&mut self, name: &str, value: Value) -> Result<()> {
        let index = self.index_of(name)?;
        self.set_value(index, value)
    }

    pub fn set_string(&mut self, index: usize, value: impl Into<String>) -> Result<()> {
        self.set_value(index, Value::String(value.into()))
    }

    pub fn set_i32(&mut self, index: usize, value: i32) -> Result<()> {
        self.set_value(index, Value::from(value))
    }

    pub fn set_i64(&mut self, index: usize, value: i64) -> Result<()> {
        self.set_value(index, Value::from(value))
    }

    pub fn set_f64(&mut self, index: usize, value: f64) -> Result<()> {
        self.set_value(index, Value::from(value))
    }

    pub fn set_bool(&mut self, index: usize, value: bool) -> Result<()> {
        self.set_value(index, Value::Bool(value))
    }

    /// Bind raw bytes; serialized as base64 text on the wire.
    pub fn set_bytes(&mut self, index: usize, value: &[u8]) -> Result<()> {
        self.set_value(index, Value::String(general_purpose::STANDARD.encode(value)))
    }

    /// Bind an explicit null. The slot counts as bound and is serialized.
    pub fn set_null(&mut self, index: usize) -> Result<()> {
        self.set_value(index, Value::Null)
    }

    pub fn set_string_named(&mut self, name: &str, value: impl Into<String>) -> Result<()> {
        let index = self.index_of(name)?;
        self.set_string(index, value)
    }

    pub fn set_i64_named(&mut self, name: &str, value: i64) -> Result<()> {
        let index = self.index_of(name)?;
        self.set_i64(index, value)
    }

    // =========================================================================
    // Serialization and output write-back
    // =========================================================================

    /// Serialize the bound input slots into the outbound parameters object.
    ///
    /// Only slots with mode `In` or `InOut` and a bound value are included;
    /// output-only slots are omitted.
    pub fn serialize_inputs(&self) -> Map<String, Value> {
        let mut parameters = Map::new();
        for (i, slot) in self.slots.iter().enumerate() {
            if slot.mode.is_input()
                && let Some(value) = &slot.value
            {
                parameters.insert(parameter_key(i + 1), value.clone());
            }
        }
        parameters
    }

    /// Write an output value back into a slot. Out-of-range indexes are
    /// ignored; the decoder has already dropped malformed keys.
    pub fn write_output(&mut self, index: usize, value: Value) {
        if index >= 1 && index <= self.slots.len() {
            self.slots[index - 1].value = Some(value);
        }
    }

    // =========================================================================
    // Output retrieval
    // =========================================================================

    /// Read a slot's raw output value, recording the shared null-check flag.
    ///
    /// Fails with a state error for input-only slots. A registered output
    /// that received no value reads as null.
    pub fn get_value(&mut self, index: usize) -> Result<Value> {
        self.check_range(index)?;
        let slot = &self.slots[index - 1];
        if !slot.mode.is_output() {
            return Err(CallError::State(format!(
                "parameter {index} is not registered as an output parameter"
            )));
        }
        let value = slot.value.clone().unwrap_or(Value::Null);
        self.last_read_was_null = value.is_null();
        Ok(value)
    }

    /// Read an output value by name.
    pub fn get_value_named(&mut self, name: &str) -> Result<Value> {
        let index = self.index_of(name)?;
        self.get_value(index)
    }

    /// Whether the most recent read (across all parameters) was null.
    pub fn was_null(&self) -> bool {
        self.last_read_was_null
    }

    pub fn get_string(&mut self, index: usize) -> Result<Option<String>> {
        let value = self.get_value(index)?;
        Ok(coerce::as_string(&value))
    }

    pub fn get_string_named(&mut self, name: &str) -> Result<Option<String>> {
        let index = self.index_of(name)?;
        self.get_string(index)
    }

    pub fn get_i64(&mut self, index: usize) -> Result<i64> {
        let value = self.get_value(index)?;
        coerce::as_i64(&value).map_err(|m| read_error(index, m))
    }

    pub fn get_i32(&mut self, index: usize) -> Result<i32> {
        let value = self.get_i64(index)?;
        i32::try_from(value).map_err(|_| {
            CallError::State(format!(
                "parameter {index} value {value} does not fit in a 32-bit integer"
            ))
        })
    }

    pub fn get_f64(&mut self, index: usize) -> Result<f64> {
        let value = self.get_value(index)?;
        coerce::as_f64(&value).map_err(|m| read_error(index, m))
    }

    pub fn get_bool(&mut self, index: usize) -> Result<bool> {
        let value = self.get_value(index)?;
        coerce::as_bool(&value).map_err(|m| read_error(index, m))
    }

    /// Read bytes, decoding base64 text or a JSON byte array.
    pub fn get_bytes(&mut self, index: usize) -> Result<Option<Vec<u8>>> {
        let value = self.get_value(index)?;
        coerce::as_bytes(&value).map_err(|m| read_error(index, m))
    }

    pub fn get_date(&mut self, index: usize) -> Result<Option<NaiveDate>> {
        let value = self.get_value(index)?;
        coerce::as_date(&value).map_err(|m| read_error(index, m))
    }

    pub fn get_time(&mut self, index: usize) -> Result<Option<NaiveTime>> {
        let value = self.get_value(index)?;
        coerce::as_time(&value).map_err(|m| read_error(index, m))
    }

    /// Read a timestamp; accepts RFC 3339 or `YYYY-MM-DD HH:MM:SS`.
    pub fn get_timestamp(&mut self, index: usize) -> Result<Option<NaiveDateTime>> {
        let value = self.get_value(index)?;
        coerce::as_timestamp(&value).map_err(|m| read_error(index, m))
    }
}

fn read_error(index: usize, message: String) -> CallError {
    CallError::State(format!("parameter {index}: {message}"))
}
