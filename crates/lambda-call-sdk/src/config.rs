// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Connection-level configuration for the callable bridge.

use std::collections::BTreeMap;
use std::time::Duration;

use url::Url;

use crate::error::{CallError, Result};
use crate::identity::IdentityConfig;
use crate::policy::SecurityPolicy;
use crate::types::{InvocationType, LogMode};

/// Configuration consumed from the owning connection.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Region the invocation client binds to.
    pub region: String,
    /// Endpoint override; defaults to the regional service endpoint.
    pub endpoint: Option<Url>,
    /// Default invocation type for statements on this connection.
    pub invocation_type: InvocationType,
    /// Default log-capture mode.
    pub log_mode: LogMode,
    /// Default function version qualifier.
    pub qualifier: Option<String>,
    /// Request timeout for synchronous invocations.
    pub timeout: Duration,
    /// Comma-separated function allow list.
    pub allowed_functions: Option<String>,
    /// Comma-separated function deny list.
    pub denied_functions: Option<String>,
    /// Comma-separated environment-variable allow list.
    pub allowed_variables: Option<String>,
    /// Comma-separated environment-variable deny list.
    pub denied_variables: Option<String>,
    /// Identity strategy for the outbound client.
    pub identity: IdentityConfig,
    /// Connection-level environment variables, applied to every statement.
    pub connection_variables: BTreeMap<String, String>,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            region: "us-east-1".to_string(),
            endpoint: None,
            invocation_type: InvocationType::Sync,
            log_mode: LogMode::None,
            qualifier: None,
            timeout: Duration::from_secs(60),
            allowed_functions: None,
            denied_functions: None,
            allowed_variables: None,
            denied_variables: None,
            identity: IdentityConfig::Default,
            connection_variables: BTreeMap::new(),
        }
    }
}

impl ConnectionConfig {
    /// Create a configuration for the given region with defaults.
    pub fn new(region: impl Into<String>) -> Self {
        Self {
            region: region.into(),
            ..Self::default()
        }
    }

    /// Create a configuration from environment variables.
    ///
    /// Environment variables:
    /// - `LAMBDA_CALL_REGION`: Region (default: "us-east-1")
    /// - `LAMBDA_CALL_ENDPOINT`: Endpoint override
    /// - `LAMBDA_CALL_INVOCATION_TYPE`: "sync" or "async" (default: "sync")
    /// - `LAMBDA_CALL_LOG_MODE`: "none" or "tail" (default: "none")
    /// - `LAMBDA_CALL_QUALIFIER`: Function version qualifier
    /// - `LAMBDA_CALL_TIMEOUT_MS`: Request timeout in milliseconds (default: 60000)
    /// - `LAMBDA_CALL_ALLOWED_FUNCTIONS` / `LAMBDA_CALL_DENIED_FUNCTIONS`
    /// - `LAMBDA_CALL_ALLOWED_VARIABLES` / `LAMBDA_CALL_DENIED_VARIABLES`
    pub fn from_env() -> Result<Self> {
        let mut config = Self::new(
            std::env::var("LAMBDA_CALL_REGION").unwrap_or_else(|_| "us-east-1".to_string()),
        );

        if let Ok(endpoint) = std::env::var("LAMBDA_CALL_ENDPOINT") {
            let endpoint = endpoint
                .parse()
                .map_err(|e| CallError::Configuration(format!("invalid LAMBDA_CALL_ENDPOINT: {e}")))?;
            config.endpoint = Some(endpoint);
        }

        if let Ok(value) = std::env::var("LAMBDA_CALL_INVOCATION_TYPE") {
            config.invocation_type = match value.to_lowercase().as_str() {
                "sync" => InvocationType::Sync,
                "async" => InvocationType::Async,
                other => {
                    return Err(CallError::Configuration(format!(
                        "invalid LAMBDA_CALL_INVOCATION_TYPE: {other}"
                    )));
                }
            };
        }

        if let Ok(value) = std::env::var("LAMBDA_CALL_LOG_MODE") {
            config.log_mode = match value.to_lowercase().as_str() {
                "none" => LogMode::None,
                "tail" => LogMode::Tail,
                other => {
                    return Err(CallError::Configuration(format!(
                        "invalid LAMBDA_CALL_LOG_MODE: {other}"
                    )));
                }
            };
        }

        if let Ok(value) = std::env::var("LAMBDA_CALL_QUALIFIER") {
            config.qualifier = Some(value);
        }

        if let Ok(value) = std::env::var("LAMBDA_CALL_TIMEOUT_MS") {
            let timeout_ms: u64 = value.parse().map_err(|e| {
                CallError::Configuration(format!("invalid LAMBDA_CALL_TIMEOUT_MS: {e}"))
            })?;
            config.timeout = Duration::from_millis(timeout_ms);
        }

        config.allowed_functions = std::env::var("LAMBDA_CALL_ALLOWED_FUNCTIONS").ok();
        config.denied_functions = std::env::var("LAMBDA_CALL_DENIED_FUNCTIONS").ok();
        config.allowed_variables = std::env::var("LAMBDA_CALL_ALLOWED_VARIABLES").ok();
        config.denied_variables = std::env::var("LAMBDA_CALL_DENIED_VARIABLES").ok();

        Ok(config)
    }

    /// Set the endpoint override.
    pub fn with_endpoint(mut self, endpoint: Url) -> Self {
        self.endpoint = Some(endpoint);
        self
    }

    /// Set the default invocation type.
    pub fn with_invocation_type(mut self, invocation_type: InvocationType) -> Self {
        self.invocation_type = invocation_type;
        self
    }

    /// Set the default log-capture mode.
    pub fn with_log_mode(mut self, log_mode: LogMode) -> Self {
        self.log_mode = log_mode;
        self
    }

    /// Set the default qualifier.
    pub fn with_qualifier(mut self, qualifier: impl Into<String>) -> Self {
        self.qualifier = Some(qualifier.into());
        self
    }

    /// Set the synchronous-invocation timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the identity strategy.
    pub fn with_identity(mut self, identity: IdentityConfig) -> Self {
        self.identity = identity;
        self
    }

    /// Set the function allow list (comma-separated exact names).
    pub fn with_allowed_functions(mut self, list: impl Into<String>) -> Self {
        self.allowed_functions = Some(list.into());
        self
    }

    /// Set the function deny list.
    pub fn with_denied_functions(mut self, list: impl Into<String>) -> Self {
        self.denied_functions = Some(list.into());
        self
    }

    /// Set the variable allow list.
    pub fn with_allowed_variables(mut self, list: impl Into<String>) -> Self {
        self.allowed_variables = Some(list.into());
        self
    }

    /// Set the variable deny list.
    pub fn with_denied_variables(mut self, list: impl Into<String>) -> Self {
        self.denied_variables = Some(list.into());
        self
    }

    /// Add a connection-level environment variable.
    pub fn with_connection_variable(
        mut self,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.connection_variables.insert(name.into(), value.into());
        self
    }

    /// Build the security policy from the configured lists.
    pub fn policy(&self) -> SecurityPolicy {
        SecurityPolicy::from_lists(
            self.allowed_functions.as_deref(),
            self.denied_functions.as_deref(),
            self.allowed_variables.as_deref(),
            self.denied_variables.as_deref(),
        )
    }

    /// The invocation endpoint: the override, or the regional default.
    pub fn endpoint_url(&self) -> Result<Url> {
        match &self.endpoint {
            Some(endpoint) => Ok(endpoint.clone()),
            None => format!("https://lambda.{}.amazonaws.com", self.region)
                .parse()
                .map_err(|e| {
                    CallError::Configuration(format!(
                        "cannot build endpoint for region '{}': {e}",
                        self.region
                    ))
                }),
        }
    }
}
