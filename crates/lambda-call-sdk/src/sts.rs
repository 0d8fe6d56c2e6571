// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Role-assumption token exchange over the STS query API.
//!
//! One blocking call per exchange; the caller freezes the returned triple.

use std::time::Duration;

use chrono::Utc;
use tracing::debug;
use url::Url;

use crate::error::{CallError, Result};
use crate::identity::{AssumeRoleRequest, Credentials, TokenExchange};
use crate::sign::{SigningParams, signed_headers};

const STS_API_VERSION: &str = "2011-06-15";

/// Blocking STS client signing with a set of source credentials.
pub struct StsTokenExchange {
    agent: ureq::Agent,
    endpoint: Url,
    region: String,
    source_credentials: Credentials,
}

impl StsTokenExchange {
    /// Create an exchange client for the regional STS endpoint.
    pub fn new(region: impl Into<String>, source_credentials: Credentials) -> Result<Self> {
        let region = region.into();
        let endpoint: Url = format!("https://sts.{region}.amazonaws.com/")
            .parse()
            .map_err(|e| CallError::Configuration(format!("invalid STS endpoint: {e}")))?;
        Ok(Self {
            agent: ureq::AgentBuilder::new()
                .timeout(Duration::from_secs(30))
                .build(),
            endpoint,
            region,
            source_credentials,
        })
    }

    /// Override the endpoint (testing and private deployments).
    pub fn with_endpoint(mut self, endpoint: Url) -> Self {
        self.endpoint = endpoint;
        self
    }
}

impl TokenExchange for StsTokenExchange {
    fn assume_role(&self, request: &AssumeRoleRequest<'_>) -> Result<Credentials> {
        let mut form = vec![
            ("Action", "AssumeRole".to_string()),
            ("Version", STS_API_VERSION.to_string()),
            ("RoleArn", request.role_arn.to_string()),
            ("RoleSessionName", request.session_name.to_string()),
            ("DurationSeconds", request.duration_seconds.to_string()),
        ];
        if let Some(external_id) = request.external_id {
            form.push(("ExternalId", external_id.to_string()));
        }
        let body = form
            .iter()
            .map(|(k, v)| format!("{k}={}", urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&");

        let content_type = "application/x-www-form-urlencoded; charset=utf-8";
        let params = SigningParams {
            credentials: &self.source_credentials,
            region: &self.region,
            service: "sts",
            now: Utc::now(),
        };
        let headers = signed_headers(
            "POST",
            &self.endpoint,
            body.as_bytes(),
            &[("content-type", content_type)],
            &params,
        );

        debug!(role_arn = %request.role_arn, "Performing token exchange");

        let mut call = self
            .agent
            .post(self.endpoint.as_str())
            .set("content-type", content_type);
        for (name, value) in &headers {
            call = call.set(name, value);
        }

        let response = call.send_string(&body).map_err(|e| match e {
            ureq::Error::Status(code, response) => {
                let detail = response
                    .into_string()
                    .ok()
                    .and_then(|xml| extract_fault_message(&xml))
                    .unwrap_or_else(|| format!("status {code}"));
                CallError::Execution(format!("token exchange rejected: {detail}"))
            }
            ureq::Error::Transport(t) => {
                CallError::Execution(format!("token exchange transport fault: {t}"))
            }
        })?;

        let xml = response
            .into_string()
            .map_err(|e| CallError::Execution(format!("token exchange read fault: {e}")))?;
        parse_assume_role_response(&xml)
    }
}

/// Pull the credential triple out of an AssumeRole response document.
pub(crate) fn parse_assume_role_response(xml: &str) -> Result<Credentials> {
    let doc = roxmltree::Document::parse(xml)
        .map_err(|e| CallError::Execution(format!("malformed token exchange response: {e}")))?;

    let credentials = doc
        .descendants()
        .find(|n| n.has_tag_name("Credentials"))
        .ok_or_else(|| {
            CallError::Execution("token exchange response carries no credentials".to_string())
        })?;

    let field = |tag: &str| -> Option<String> {
        credentials
            .children()
            .find(|n| n.has_tag_name(tag))
            .and_then(|n| n.text())
            .map(str::to_string)
    };

    match (
        field("AccessKeyId"),
        field("SecretAccessKey"),
        field("SessionToken"),
    ) {
        (Some(access_key_id), Some(secret_access_key), Some(session_token)) => Ok(Credentials {
            access_key_id,
            secret_access_key,
            session_token: Some(session_token),
        }),
        _ => Err(CallError::Execution(
            "token exchange response carries an incomplete credential triple".to_string(),
        )),
    }
}

/// Best-effort error message from an STS fault document.
fn extract_fault_message(xml: &str) -> Option<String> {
    let doc = roxmltree::Document::parse(xml).ok()?;
    doc.descendants()
        .find(|n| n.has_tag_name("Message"))
        .and_then(|n| n.text())
        .map(str::to_string)
}
