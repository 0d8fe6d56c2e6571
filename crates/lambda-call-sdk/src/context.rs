// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Environment and execution-context assembly for the request envelope.
//!
//! Variables exist at two levels: connection-level (shared by every statement
//! on the connection) and statement-level. The merge is deterministic —
//! statement-level entries win on name conflicts. Variable names are checked
//! against the security policy at the moment they are set, never at
//! invocation time.

use chrono::Utc;
use serde_json::{Map, Value};

use lambda_call_protocol::envelope::{
    CONFIGURATION_QUALIFIER_KEY, CONTEXT_INTERFACE_VERSION_KEY, CONTEXT_REQUEST_TIME_KEY,
    InvokeRequest,
};

use crate::error::Result;
use crate::policy::SecurityPolicy;

/// Calling-convention version tag stamped into every request context.
pub const INTERFACE_VERSION: &str = "4.2";

/// Mutable request-envelope state owned by a statement.
#[derive(Debug, Clone, Default)]
pub struct EnvironmentContext {
    connection_vars: Map<String, Value>,
    statement_vars: Map<String, Value>,
    execution_context: Map<String, Value>,
    configuration_params: Map<String, Value>,
    qualifier: Option<String>,
}

impl EnvironmentContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a connection-level environment variable.
    pub fn set_connection_variable(
        &mut self,
        policy: &SecurityPolicy,
        name: impl Into<String>,
        value: impl Into<Value>,
    ) -> Result<()> {
        let name = name.into();
        policy.check_variable(&name)?;
        self.connection_vars.insert(name, value.into());
        Ok(())
    }

    /// Set a statement-level environment variable; overrides any
    /// connection-level variable of the same name.
    pub fn set_variable(
        &mut self,
        policy: &SecurityPolicy,
        name: impl Into<String>,
        value: impl Into<Value>,
    ) -> Result<()> {
        let name = name.into();
        policy.check_variable(&name)?;
        self.statement_vars.insert(name, value.into());
        Ok(())
    }

    /// Set several statement-level variables. Fails on the first policy
    /// violation; earlier entries stay set.
    pub fn set_variables<I, K, V>(&mut self, policy: &SecurityPolicy, vars: I) -> Result<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        for (name, value) in vars {
            self.set_variable(policy, name, value)?;
        }
        Ok(())
    }

    /// Add a free-form execution-context entry.
    pub fn set_context_entry(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.execution_context.insert(name.into(), value.into());
    }

    /// Add a configuration parameter.
    pub fn set_configuration_param(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.configuration_params.insert(name.into(), value.into());
    }

    /// Set the optional function version qualifier.
    pub fn set_qualifier(&mut self, qualifier: Option<String>) {
        self.qualifier = qualifier;
    }

    /// The configured qualifier, if any.
    pub fn qualifier(&self) -> Option<&str> {
        self.qualifier.as_deref()
    }

    /// Assemble the outbound envelope from current state.
    ///
    /// Each call re-merges and re-stamps the request time, so re-execution
    /// always builds a fresh envelope.
    pub fn build_request(&self, action: &str, parameters: Map<String, Value>) -> InvokeRequest {
        let mut environment = self.connection_vars.clone();
        for (name, value) in &self.statement_vars {
            environment.insert(name.clone(), value.clone());
        }

        let mut context = self.execution_context.clone();
        context.insert(
            CONTEXT_INTERFACE_VERSION_KEY.to_string(),
            Value::String(INTERFACE_VERSION.to_string()),
        );
        context.insert(
            CONTEXT_REQUEST_TIME_KEY.to_string(),
            Value::String(Utc::now().to_rfc3339()),
        );

        let mut configuration = self.configuration_params.clone();
        if let Some(qualifier) = &self.qualifier {
            configuration.insert(
                CONFIGURATION_QUALIFIER_KEY.to_string(),
                Value::String(qualifier.clone()),
            );
        }

        InvokeRequest {
            action: action.to_string(),
            parameters,
            environment,
            context,
            configuration,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CallErrorKind;

    #[test]
    fn test_statement_variable_wins_merge() {
        let policy = SecurityPolicy::new();
        let mut context = EnvironmentContext::new();
        context
            .set_connection_variable(&policy, "PRIORITY", "low")
            .unwrap();
        context
            .set_connection_variable(&policy, "REGION", "x")
            .unwrap();
        context.set_variable(&policy, "PRIORITY", "high").unwrap();

        let request = context.build_request("calc", Map::new());
        assert_eq!(request.environment["PRIORITY"], "high");
        assert_eq!(request.environment["REGION"], "x");
    }

    #[test]
    fn test_variable_policy_checked_at_set_time() {
        let policy = SecurityPolicy::new().with_denied_variables(["SECRET"]);
        let mut context = EnvironmentContext::new();
        let err = context.set_variable(&policy, "SECRET", "x").unwrap_err();
        assert_eq!(err.kind(), CallErrorKind::Authorization);

        // Nothing was recorded for the rejected name.
        let request = context.build_request("calc", Map::new());
        assert!(!request.environment.contains_key("SECRET"));
    }

    #[test]
    fn test_fixed_context_entries() {
        let mut context = EnvironmentContext::new();
        context.set_context_entry("caller", "test");
        let request = context.build_request("calc", Map::new());
        assert_eq!(request.context["caller"], "test");
        assert_eq!(request.context["jdbcVersion"], INTERFACE_VERSION);
        assert!(request.context["requestTime"].is_string());
    }

    #[test]
    fn test_configuration_with_qualifier() {
        let mut context = EnvironmentContext::new();
        context.set_configuration_param("mode", "fast");
        context.set_qualifier(Some("prod".to_string()));
        let request = context.build_request("calc", Map::new());
        assert_eq!(request.configuration["mode"], "fast");
        assert_eq!(request.configuration["qualifier"], "prod");
    }

    #[test]
    fn test_qualifier_absent_when_unset() {
        let context = EnvironmentContext::new();
        let request = context.build_request("calc", Map::new());
        assert!(!request.configuration.contains_key("qualifier"));
    }
}
