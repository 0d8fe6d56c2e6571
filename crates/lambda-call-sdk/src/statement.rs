// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Call-statement parsing and the callable statement.
//!
//! A statement is created from a call text such as
//! `{call lambda:my-function(?, ?, ?)}`, owns its parameter table and
//! environment context, and drives invocations through a shared client.

use std::sync::Arc;
use std::sync::LazyLock;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use regex::Regex;
use serde_json::Value;
use tracing::{debug, instrument};

use lambda_call_protocol::{DecodedResult, classify};

use crate::client::{InvocationOutcome, LambdaClient};
use crate::context::EnvironmentContext;
use crate::cursor::TabularCursor;
use crate::error::{CallError, Result};
use crate::params::ParameterTable;
use crate::policy::SecurityPolicy;
use crate::types::{InvocationType, LogMode, ValueKind};

/// Call-text shape: `{call lambda:<name>(<placeholders>)}`.
///
/// The keyword and namespace are case-insensitive; the function name is
/// captured verbatim. Whitespace is free around every token. The argument
/// list accepts only `?` placeholders; literal arguments are a syntax error,
/// since values travel exclusively through bound parameters.
static CALL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*\{\s*call\s+lambda\s*:\s*([A-Za-z0-9_-]+)\s*\((.*)\)\s*\}\s*$")
        .expect("call pattern is valid")
});

/// Parsed shape of a call text: the target function and the placeholder count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCall {
    pub function_name: String,
    pub parameter_count: usize,
}

/// Parse a call text, rejecting anything that is not a well-formed call
/// escape with the `lambda` namespace.
pub fn parse_call(text: &str) -> Result<ParsedCall> {
    let captures = CALL_PATTERN.captures(text).ok_or_else(|| {
        CallError::Syntax(format!(
            "not a callable statement: '{}'",
            text.trim()
        ))
    })?;

    let function_name = captures[1].to_string();
    let arguments = captures[2].trim();

    let parameter_count = if arguments.is_empty() {
        0
    } else {
        let mut count = 0;
        for piece in arguments.split(',') {
            if piece.trim() != "?" {
                return Err(CallError::Syntax(format!(
                    "only '?' placeholders are supported, found '{}'",
                    piece.trim()
                )));
            }
            count += 1;
        }
        count
    };

    Ok(ParsedCall {
        function_name,
        parameter_count,
    })
}

/// A prepared remote call: parameter slots, environment state, and the
/// invocation machinery behind `execute`.
pub struct CallableStatement {
    client: Arc<LambdaClient>,
    policy: Arc<SecurityPolicy>,
    function_name: String,
    params: ParameterTable,
    context: EnvironmentContext,
    invocation_type: InvocationType,
    log_mode: LogMode,
    update_count: i64,
    result: Option<TabularCursor>,
}

impl CallableStatement {
    pub(crate) fn new(
        client: Arc<LambdaClient>,
        policy: Arc<SecurityPolicy>,
        parsed: ParsedCall,
        context: EnvironmentContext,
        invocation_type: InvocationType,
        log_mode: LogMode,
    ) -> Self {
        Self {
            client,
            policy,
            function_name: parsed.function_name,
            params: ParameterTable::new(parsed.parameter_count),
            context,
            invocation_type,
            log_mode,
            update_count: 0,
            result: None,
        }
    }

    /// The function this statement targets.
    pub fn function_name(&self) -> &str {
        &self.function_name
    }

    /// Number of placeholder slots in the call text.
    pub fn parameter_count(&self) -> usize {
        self.params.parameter_count()
    }

    /// Override the invocation type for this statement.
    pub fn set_invocation_type(&mut self, invocation_type: InvocationType) {
        self.invocation_type = invocation_type;
    }

    /// Override the log-capture mode for this statement.
    pub fn set_log_mode(&mut self, log_mode: LogMode) {
        self.log_mode = log_mode;
    }

    /// Override the function version qualifier for this statement.
    pub fn set_qualifier(&mut self, qualifier: Option<String>) {
        self.context.set_qualifier(qualifier);
    }

    // ========================================================================
    // Environment and context
    // ========================================================================

    /// Set a statement-level environment variable; wins over any
    /// connection-level variable of the same name.
    pub fn set_environment_variable(
        &mut self,
        name: impl Into<String>,
        value: impl Into<Value>,
    ) -> Result<()> {
        self.context.set_variable(&self.policy, name, value)
    }

    /// Set several statement-level environment variables.
    pub fn set_environment_variables<I, K, V>(&mut self, vars: I) -> Result<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        self.context.set_variables(&self.policy, vars)
    }

    /// Add a free-form execution-context entry to the envelope.
    pub fn set_context_entry(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.context.set_context_entry(name, value);
    }

    /// Add a configuration parameter to the envelope.
    pub fn set_configuration_param(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.context.set_configuration_param(name, value);
    }

    // ========================================================================
    // Parameter binding
    // ========================================================================

    /// Name a parameter slot for named access.
    pub fn name_parameter(&mut self, name: impl Into<String>, index: usize) -> Result<()> {
        self.params.alias(name, index)
    }

    pub fn register_out(&mut self, index: usize, kind: ValueKind) -> Result<()> {
        self.params.register_out(index, kind)
    }

    pub fn register_out_with_scale(
        &mut self,
        index: usize,
        kind: ValueKind,
        scale: i32,
    ) -> Result<()> {
        self.params.register_out_with_scale(index, kind, scale)
    }

    pub fn register_out_with_type_name(
        &mut self,
        index: usize,
        kind: ValueKind,
        type_name: &str,
    ) -> Result<()> {
        self.params.register_out_with_type_name(index, kind, type_name)
    }

    pub fn register_out_named(&mut self, name: &str, kind: ValueKind) -> Result<()> {
        self.params.register_out_named(name, kind)
    }

    pub fn set_value(&mut self, index: usize, value: Value) -> Result<()> {
        self.params.set_value(index, value)
    }

    pub fn set_string(&mut self, index: usize, value: impl Into<String>) -> Result<()> {
        self.params.set_string(index, value)
    }

    pub fn set_i32(&mut self, index: usize, value: i32) -> Result<()> {
        self.params.set_i32(index, value)
    }

    pub fn set_i64(&mut self, index: usize, value: i64) -> Result<()> {
        self.params.set_i64(index, value)
    }

    pub fn set_f64(&mut self, index: usize, value: f64) -> Result<()> {
        self.params.set_f64(index, value)
    }

    pub fn set_bool(&mut self, index: usize, value: bool) -> Result<()> {
        self.params.set_bool(index, value)
    }

    pub fn set_bytes(&mut self, index: usize, value: &[u8]) -> Result<()> {
        self.params.set_bytes(index, value)
    }

    pub fn set_null(&mut self, index: usize) -> Result<()> {
        self.params.set_null(index)
    }

    // ========================================================================
    // Output retrieval
    // ========================================================================

    pub fn get_value(&mut self, index: usize) -> Result<Value> {
        self.params.get_value(index)
    }

    pub fn get_value_named(&mut self, name: &str) -> Result<Value> {
        self.params.get_value_named(name)
    }

    pub fn get_string(&mut self, index: usize) -> Result<Option<String>> {
        self.params.get_string(index)
    }

    pub fn get_i32(&mut self, index: usize) -> Result<i32> {
        self.params.get_i32(index)
    }

    pub fn get_i64(&mut self, index: usize) -> Result<i64> {
        self.params.get_i64(index)
    }

    pub fn get_f64(&mut self, index: usize) -> Result<f64> {
        self.params.get_f64(index)
    }

    pub fn get_bool(&mut self, index: usize) -> Result<bool> {
        self.params.get_bool(index)
    }

    pub fn get_bytes(&mut self, index: usize) -> Result<Option<Vec<u8>>> {
        self.params.get_bytes(index)
    }

    pub fn get_date(&mut self, index: usize) -> Result<Option<NaiveDate>> {
        self.params.get_date(index)
    }

    pub fn get_time(&mut self, index: usize) -> Result<Option<NaiveTime>> {
        self.params.get_time(index)
    }

    pub fn get_timestamp(&mut self, index: usize) -> Result<Option<NaiveDateTime>> {
        self.params.get_timestamp(index)
    }

    /// Whether the most recent output read on this statement saw a null.
    pub fn was_null(&self) -> bool {
        self.params.was_null()
    }

    /// Direct access to the parameter table for less common operations.
    pub fn parameters_mut(&mut self) -> &mut ParameterTable {
        &mut self.params
    }

    // ========================================================================
    // Execution
    // ========================================================================

    /// Execute the call. Returns `true` when a result set is available.
    ///
    /// Registered output modes survive re-execution; the previous result set
    /// and update count are discarded before the new invocation.
    #[instrument(skip(self), fields(function = %self.function_name))]
    pub fn execute(&mut self) -> Result<bool> {
        self.result = None;
        self.update_count = 0;

        let request = self
            .context
            .build_request(&self.function_name, self.params.serialize_inputs());
        let outcome = self.client.invoke(
            &request,
            self.invocation_type,
            self.log_mode,
            self.context.qualifier(),
        )?;

        let response = match outcome {
            // Fire-and-forget: no outputs, no rows, update count stays zero.
            InvocationOutcome::Accepted => {
                debug!("Asynchronous invocation accepted");
                return Ok(false);
            }
            InvocationOutcome::Completed(response) => response,
        };

        match classify(response)? {
            DecodedResult::Outputs(outputs) => {
                for (index, value) in outputs {
                    self.params.write_output(index, value);
                }
                Ok(false)
            }
            DecodedResult::Tabular(rows) => {
                self.result = Some(TabularCursor::from_rows(rows));
                self.update_count = -1;
                Ok(true)
            }
            DecodedResult::SingleValue(value) => {
                self.result = Some(TabularCursor::single_value(value));
                self.update_count = -1;
                Ok(true)
            }
            DecodedResult::Scalar(count) => {
                self.update_count = count;
                Ok(false)
            }
            DecodedResult::Empty => Ok(false),
        }
    }

    /// Execute a call that must produce a result set.
    pub fn execute_query(&mut self) -> Result<TabularCursor> {
        if !self.execute()? {
            return Err(CallError::State(format!(
                "function '{}' did not produce a result set",
                self.function_name
            )));
        }
        self.result.take().ok_or_else(|| {
            CallError::State("result set already consumed".to_string())
        })
    }

    /// Execute a call that must not produce a result set; returns the
    /// update count.
    pub fn execute_update(&mut self) -> Result<i64> {
        if self.execute()? {
            return Err(CallError::State(format!(
                "function '{}' produced a result set",
                self.function_name
            )));
        }
        Ok(self.update_count)
    }

    /// Update count of the last execution: `-1` when a result set was
    /// produced, otherwise the scalar result or zero.
    pub fn update_count(&self) -> i64 {
        self.update_count
    }

    /// Take the result set of the last execution, if one is available.
    pub fn take_result_set(&mut self) -> Option<TabularCursor> {
        self.result.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CallErrorKind;

    #[test]
    fn test_parse_simple_call() {
        let parsed = parse_call("{call lambda:my-function(?, ?, ?)}").unwrap();
        assert_eq!(parsed.function_name, "my-function");
        assert_eq!(parsed.parameter_count, 3);
    }

    #[test]
    fn test_parse_no_parameters() {
        let parsed = parse_call("{call lambda:ping()}").unwrap();
        assert_eq!(parsed.function_name, "ping");
        assert_eq!(parsed.parameter_count, 0);
    }

    #[test]
    fn test_parse_case_insensitive_keywords() {
        let parsed = parse_call("  { CALL Lambda:Report_v2( ? ) }  ").unwrap();
        assert_eq!(parsed.function_name, "Report_v2");
        assert_eq!(parsed.parameter_count, 1);
    }

    #[test]
    fn test_parse_rejects_other_namespace() {
        let err = parse_call("{call dynamo:scan(?)}").unwrap_err();
        assert_eq!(err.kind(), CallErrorKind::Syntax);
    }

    #[test]
    fn test_parse_rejects_plain_sql() {
        assert_eq!(
            parse_call("SELECT 1").unwrap_err().kind(),
            CallErrorKind::Syntax
        );
        assert_eq!(
            parse_call("{call lambda:broken(?}").unwrap_err().kind(),
            CallErrorKind::Syntax
        );
    }

    #[test]
    fn test_parse_rejects_literal_arguments() {
        let err = parse_call("{call lambda:calc(1, ?)}").unwrap_err();
        assert_eq!(err.kind(), CallErrorKind::Syntax);
    }
}
