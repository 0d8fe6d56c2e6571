// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Invocation client: transport abstraction, SigV4-signed HTTP transport,
//! and the client factory bound to a resolved identity.
//!
//! The client is stateless apart from its frozen credentials and may be
//! shared across any number of callable statements.

use std::io::Read;
use std::sync::Arc;
use std::time::Duration;

use base64::{Engine as _, engine::general_purpose};
use chrono::Utc;
use serde_json::Value;
use tracing::{debug, instrument, warn};
use url::Url;

use lambda_call_protocol::{InvokeRequest, InvokeResponse};

use crate::config::ConnectionConfig;
use crate::error::{CallError, Result};
use crate::identity::{Credentials, IdentityConfig, TokenExchange, resolve_credentials};
use crate::imds::ImdsService;
use crate::sign::{SigningParams, signed_headers};
use crate::sts::StsTokenExchange;
use crate::types::{InvocationType, LogMode};

/// Maximum accepted response payload (6 MB, the remote platform's cap).
const MAX_RESPONSE_SIZE: u64 = 6 * 1024 * 1024;

/// One outbound invocation, as seen by the transport.
#[derive(Debug, Clone)]
pub struct TransportRequest {
    pub function_name: String,
    pub qualifier: Option<String>,
    pub invocation_type: InvocationType,
    pub log_mode: LogMode,
    pub payload: Vec<u8>,
}

/// Raw transport-level reply, before envelope decoding.
#[derive(Debug, Clone)]
pub struct TransportReply {
    pub status: u16,
    /// Set when the remote function itself faulted (host-reported).
    pub function_error: Option<String>,
    /// Base64 log tail, present when log capture was requested.
    pub log_tail: Option<String>,
    pub payload: Vec<u8>,
}

/// Blocking transport performing exactly one outbound call per invocation.
pub trait InvokeTransport: Send + Sync {
    fn invoke(&self, request: &TransportRequest) -> Result<TransportReply>;
}

/// SigV4-signed HTTP transport against the function platform's REST API.
pub struct HttpInvokeTransport {
    agent: ureq::Agent,
    endpoint: Url,
    region: String,
    credentials: Credentials,
}

impl HttpInvokeTransport {
    pub fn new(endpoint: Url, region: impl Into<String>, credentials: Credentials,
        timeout: Duration,
    ) -> Self {
        Self {
            agent: ureq::AgentBuilder::new().timeout(timeout).build(),
            endpoint,
            region: region.into(),
            credentials,
        }
    }

    fn invocation_url(&self, request: &TransportRequest) -> Result<Url> {
        let path = format!(
            "/2015-03-31/functions/{}/invocations",
            request.function_name
        );
        let mut url = self
            .endpoint
            .join(&path)
            .map_err(|e| CallError::Configuration(format!("invalid invocation URL: {e}")))?;
        if let Some(qualifier) = &request.qualifier {
            url.query_pairs_mut().append_pair("Qualifier", qualifier);
        }
        Ok(url)
    }
}

impl InvokeTransport for HttpInvokeTransport {
    fn invoke(&self, request: &TransportRequest) -> Result<TransportReply> {
        let url = self.invocation_url(request)?;
        let invocation_type = match request.invocation_type {
            InvocationType::Sync => "RequestResponse",
            InvocationType::Async => "Event",
        };
        let log_type = match request.log_mode {
            LogMode::None => "None",
            LogMode::Tail => "Tail",
        };
        let content_type = "application/json";

        let params = SigningParams {
            credentials: &self.credentials,
            region: &self.region,
            service: "lambda",
            now: Utc::now(),
        };
        let extra = [
            ("content-type", content_type),
            ("x-amz-invocation-type", invocation_type),
            ("x-amz-log-type", log_type),
        ];
        let headers = signed_headers("POST", &url, &request.payload, &extra, &params);

        let mut call = self
            .agent
            .post(url.as_str())
            .set("content-type", content_type)
            .set("x-amz-invocation-type", invocation_type)
            .set("x-amz-log-type", log_type);
        for (name, value) in &headers {
            call = call.set(name, value);
        }

        let response = match call.send_bytes(&request.payload) {
            Ok(response) => response,
            // Non-2xx still carries a fault document worth reading.
            Err(ureq::Error::Status(_, response)) => response,
            Err(ureq::Error::Transport(t)) => {
                return Err(CallError::Execution(format!("transport fault: {t}")));
            }
        };

        let status = response.status();
        let function_error = response.header("x-amz-function-error").map(str::to_string);
        let log_tail = response.header("x-amz-log-result").map(str::to_string);

        let mut payload = Vec::new();
        response
            .into_reader()
            .take(MAX_RESPONSE_SIZE)
            .read_to_end(&mut payload)
            .map_err(|e| CallError::Execution(format!("failed to read response: {e}")))?;

        Ok(TransportReply {
            status,
            function_error,
            log_tail,
            payload,
        })
    }
}

/// Outcome of one invocation, before envelope classification.
#[derive(Debug)]
pub enum InvocationOutcome {
    /// Asynchronous invocation accepted by the platform; no response body.
    Accepted,
    /// Synchronous invocation completed with a response envelope.
    Completed(InvokeResponse),
}

/// Invocation client bound to an endpoint and a frozen identity.
pub struct LambdaClient {
    transport: Box<dyn InvokeTransport>,
}

impl LambdaClient {
    /// Build a client from the connection configuration, resolving the
    /// configured identity strategy exactly once.
    ///
    /// `fallback` is the identity of the owning connection, used directly by
    /// the `Default` strategy and as the signing identity for the one-shot
    /// token exchange of `AssumeRole`.
    pub fn new(config: &ConnectionConfig, fallback: Option<Credentials>) -> Result<Self> {
        let exchanger = match &config.identity {
            IdentityConfig::AssumeRole { .. } => {
                let source = fallback.clone().ok_or_else(|| {
                    CallError::Configuration(
                        "assume-role identity strategy requires connection credentials to sign \
                         the token exchange"
                            .to_string(),
                    )
                })?;
                Some(StsTokenExchange::new(config.region.clone(), source)?)
            }
            _ => None,
        };
        let credentials = resolve_credentials(
            &config.identity,
            fallback.as_ref(),
            exchanger.as_ref().map(|e| e as &dyn TokenExchange),
            &ImdsService::new(),
        )?;

        let transport = HttpInvokeTransport::new(
            config.endpoint_url()?,
            config.region.clone(),
            credentials,
            config.timeout,
        );
        Ok(Self {
            transport: Box::new(transport),
        })
    }

    /// Build a client over an arbitrary transport (testing, custom wiring).
    pub fn with_transport(transport: Box<dyn InvokeTransport>) -> Self {
        Self { transport }
    }

    /// Send one invocation and separate transport faults from results.
    #[instrument(skip(self, request), fields(function = %request.action))]
    pub fn invoke(
        &self,
        request: &InvokeRequest,
        invocation_type: InvocationType,
        log_mode: LogMode,
        qualifier: Option<&str>,
    ) -> Result<InvocationOutcome> {
        let payload = request.to_bytes()?;
        debug!(
            invocation_type = invocation_type.as_str(),
            log_mode = log_mode.as_str(),
            "Invoking remote function"
        );

        let reply = self.transport.invoke(&TransportRequest {
            function_name: request.action.clone(),
            qualifier: qualifier.map(str::to_string),
            invocation_type,
            log_mode,
            payload,
        })?;

        if let Some(log_tail) = &reply.log_tail {
            emit_log_tail(&request.action, log_tail);
        }

        if reply.status >= 300 {
            let detail = extract_fault_message(&reply.payload)
                .unwrap_or_else(|| format!("remote call failed with status {}", reply.status));
            return Err(CallError::Execution(detail));
        }

        if let Some(kind) = &reply.function_error {
            let detail = extract_fault_message(&reply.payload)
                .unwrap_or_else(|| format!("remote function fault ({kind})"));
            return Err(CallError::Execution(detail));
        }

        if invocation_type == InvocationType::Async {
            return Ok(InvocationOutcome::Accepted);
        }

        let response = InvokeResponse::from_bytes(&reply.payload)?;
        Ok(InvocationOutcome::Completed(response))
    }
}

/// Best-effort message extraction from a fault payload.
///
/// Extraction failures are swallowed; the caller falls back to a generic
/// description so the original fault classification is never masked.
fn extract_fault_message(payload: &[u8]) -> Option<String> {
    let value: Value = serde_json::from_slice(payload).ok()?;
    for key in ["errorMessage", "Message", "message"] {
        if let Some(message) = value.get(key).and_then(Value::as_str)
            && !message.is_empty()
        {
            return Some(message.to_string());
        }
    }
    None
}

fn emit_log_tail(function: &str, log_tail: &str) {
    match general_purpose::STANDARD.decode(log_tail) {
        Ok(bytes) => {
            let logs = String::from_utf8_lossy(&bytes);
            debug!(%function, "Captured invocation log tail:\n{logs}");
        }
        Err(e) => warn!(%function, "Undecodable invocation log tail: {e}"),
    }
}

/// Shareable client handle.
pub type SharedClient = Arc<LambdaClient>;
