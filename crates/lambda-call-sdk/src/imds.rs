// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Ambient host identity from the instance metadata service (IMDSv2).

use std::time::Duration;

use serde::Deserialize;
use tracing::debug;

use crate::error::{CallError, Result};
use crate::identity::{Credentials, InstanceMetadata};

const DEFAULT_BASE_URL: &str = "http://169.254.169.254";
const TOKEN_TTL_SECONDS: &str = "21600";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RoleCredentials {
    access_key_id: String,
    secret_access_key: String,
    token: String,
}

/// Blocking IMDSv2 lookup: session token, role name, then the credential
/// document for that role.
pub struct ImdsService {
    agent: ureq::Agent,
    base_url: String,
}

impl Default for ImdsService {
    fn default() -> Self {
        Self::new()
    }
}

impl ImdsService {
    pub fn new() -> Self {
        Self {
            agent: ureq::AgentBuilder::new()
                .timeout(Duration::from_secs(5))
                .build(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    /// Override the metadata endpoint (testing).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn get(&self, token: &str, path: &str) -> Result<String> {
        self.agent
            .get(&format!("{}{path}", self.base_url))
            .set("x-aws-ec2-metadata-token", token)
            .call()
            .map_err(|e| CallError::Execution(format!("instance metadata fault: {e}")))?
            .into_string()
            .map_err(|e| CallError::Execution(format!("instance metadata read fault: {e}")))
    }
}

impl InstanceMetadata for ImdsService {
    fn fetch_credentials(&self) -> Result<Credentials> {
        let token = self
            .agent
            .put(&format!("{}/latest/api/token", self.base_url))
            .set("x-aws-ec2-metadata-token-ttl-seconds", TOKEN_TTL_SECONDS)
            .call()
            .map_err(|e| CallError::Execution(format!("instance metadata token fault: {e}")))?
            .into_string()
            .map_err(|e| CallError::Execution(format!("instance metadata read fault: {e}")))?;

        let role = self
            .get(&token, "/latest/meta-data/iam/security-credentials/")?
            .lines()
            .next()
            .unwrap_or_default()
            .trim()
            .to_string();
        if role.is_empty() {
            return Err(CallError::Configuration(
                "no instance profile role is attached to this host".to_string(),
            ));
        }
        debug!(role = %role, "Fetching instance profile credentials");

        let body = self.get(
            &token,
            &format!("/latest/meta-data/iam/security-credentials/{role}"),
        )?;
        let parsed: RoleCredentials = serde_json::from_str(&body)
            .map_err(|e| CallError::Execution(format!("malformed instance credentials: {e}")))?;

        Ok(Credentials {
            access_key_id: parsed.access_key_id,
            secret_access_key: parsed.secret_access_key,
            session_token: Some(parsed.token),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_credentials_document_parsing() {
        let body = r#"{
            "Code": "Success",
            "AccessKeyId": "ASIAIMDS",
            "SecretAccessKey": "imds-secret",
            "Token": "imds-token",
            "Expiration": "2024-05-17T11:30:00Z"
        }"#;
        let parsed: RoleCredentials = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.access_key_id, "ASIAIMDS");
        assert_eq!(parsed.secret_access_key, "imds-secret");
        assert_eq!(parsed.token, "imds-token");
    }
}
