// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Connection entry point: resolves an identity once, owns the shared
//! client, and hands out callable statements.

use std::sync::Arc;

use tracing::info;

use crate::client::LambdaClient;
use crate::config::ConnectionConfig;
use crate::context::EnvironmentContext;
use crate::error::Result;
use crate::identity::Credentials;
use crate::policy::SecurityPolicy;
use crate::statement::{CallableStatement, parse_call};

/// A logical connection to the function platform.
///
/// The connection is cheap to share; every statement prepared from it uses
/// the same client, frozen identity, and security policy.
pub struct Connection {
    client: Arc<LambdaClient>,
    policy: Arc<SecurityPolicy>,
    config: ConnectionConfig,
}

impl Connection {
    /// Open a connection, resolving the configured identity strategy once.
    ///
    /// `credentials` is the connection's own identity: used directly by the
    /// default strategy and as the signing identity for role assumption.
    pub fn connect(config: ConnectionConfig, credentials: Option<Credentials>) -> Result<Self> {
        let client = LambdaClient::new(&config, credentials)?;
        info!(region = %config.region, "Opened function-call connection");
        Ok(Self::with_client(config, Arc::new(client)))
    }

    /// Build a connection over an existing client (testing, custom wiring).
    pub fn with_client(config: ConnectionConfig, client: Arc<LambdaClient>) -> Self {
        let policy = Arc::new(config.policy());
        Self {
            client,
            policy,
            config,
        }
    }

    /// The security policy in force on this connection.
    pub fn policy(&self) -> &SecurityPolicy {
        &self.policy
    }

    /// Prepare a callable statement from a call text.
    ///
    /// The text is parsed and the target function is checked against the
    /// security policy here, so a denied function never reaches the wire.
    pub fn prepare_call(&self, text: &str) -> Result<CallableStatement> {
        let parsed = parse_call(text)?;
        self.policy.check_function(&parsed.function_name)?;

        let mut context = EnvironmentContext::new();
        for (name, value) in &self.config.connection_variables {
            context.set_connection_variable(&self.policy, name.clone(), value.clone())?;
        }
        context.set_qualifier(self.config.qualifier.clone());

        Ok(CallableStatement::new(
            Arc::clone(&self.client),
            Arc::clone(&self.policy),
            parsed,
            context,
            self.config.invocation_type,
            self.config.log_mode,
        ))
    }
}
