// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Identity strategy resolution for the outbound invocation client.
//!
//! Resolution runs once, at client construction, and the resulting credential
//! triple is frozen for the client's lifetime. In particular the AssumeRole
//! strategy performs exactly one token exchange and never refreshes the
//! temporary credentials; a long-lived client whose session expires will see
//! execution faults on subsequent invocations.

use std::path::PathBuf;

use tracing::debug;

use crate::error::{CallError, Result};

/// A resolved credential triple.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    /// Present for temporary (session) credentials.
    pub session_token: Option<String>,
}

impl Credentials {
    pub fn new(access_key_id: impl Into<String>, secret_access_key: impl Into<String>) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
            session_token: None,
        }
    }

    pub fn with_session_token(mut self, token: impl Into<String>) -> Self {
        self.session_token = Some(token.into());
        self
    }
}

/// Credential strategy selected by the connection configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum IdentityConfig {
    /// Reuse the caller-supplied fallback identity from the owning connection.
    #[default]
    Default,
    /// Explicit long-lived or session credentials.
    Static {
        access_key_id: String,
        secret_access_key: String,
        session_token: Option<String>,
    },
    /// Named profile from the shared credentials file.
    Profile { name: String },
    /// Ambient host identity from the instance metadata service.
    InstanceProfile,
    /// One-shot role assumption through the token-exchange service.
    ///
    /// The exchange happens once at client construction; the returned triple
    /// is frozen and never refreshed.
    AssumeRole {
        role_arn: String,
        external_id: Option<String>,
        session_name: Option<String>,
        duration_seconds: Option<u32>,
    },
}

/// Parameters for a role-assumption token exchange.
#[derive(Debug, Clone)]
pub struct AssumeRoleRequest<'a> {
    pub role_arn: &'a str,
    pub external_id: Option<&'a str>,
    pub session_name: &'a str,
    pub duration_seconds: u32,
}

/// Remote token-exchange service, invoked through a single blocking call.
pub trait TokenExchange {
    fn assume_role(&self, request: &AssumeRoleRequest<'_>) -> Result<Credentials>;
}

/// Instance metadata service supplying the ambient host identity.
pub trait InstanceMetadata {
    fn fetch_credentials(&self) -> Result<Credentials>;
}

/// Default role-session name when none is configured.
pub const DEFAULT_SESSION_NAME: &str = "lambda-call-bridge";

/// Default requested session duration (seconds).
pub const DEFAULT_SESSION_DURATION: u32 = 3600;

/// Resolve the configured strategy to a frozen credential triple.
///
/// All configuration validation happens before any network call: a missing
/// role identifier fails without touching the token-exchange service.
/// `exchanger` is only consulted by the AssumeRole strategy; configuring
/// AssumeRole without one is a configuration error.
pub fn resolve_credentials(
    config: &IdentityConfig,
    fallback: Option<&Credentials>,
    exchanger: Option<&dyn TokenExchange>,
    metadata: &dyn InstanceMetadata,
) -> Result<Credentials> {
    match config {
        IdentityConfig::Default => fallback.cloned().ok_or_else(|| {
            CallError::Configuration(
                "default identity strategy requires connection credentials".to_string(),
            )
        }),

        IdentityConfig::Static {
            access_key_id,
            secret_access_key,
            session_token,
        } => {
            if access_key_id.is_empty() || secret_access_key.is_empty() {
                return Err(CallError::Configuration(
                    "static identity strategy requires both an access key and a secret key"
                        .to_string(),
                ));
            }
            Ok(Credentials {
                access_key_id: access_key_id.clone(),
                secret_access_key: secret_access_key.clone(),
                session_token: session_token.clone(),
            })
        }

        IdentityConfig::Profile { name } => {
            if name.is_empty() {
                return Err(CallError::Configuration(
                    "profile identity strategy requires a profile name".to_string(),
                ));
            }
            load_profile(&shared_credentials_path(), name)
        }

        IdentityConfig::InstanceProfile => metadata.fetch_credentials(),

        IdentityConfig::AssumeRole {
            role_arn,
            external_id,
            session_name,
            duration_seconds,
        } => {
            if role_arn.is_empty() {
                return Err(CallError::Configuration(
                    "assume-role identity strategy requires a role ARN".to_string(),
                ));
            }
            let exchanger = exchanger.ok_or_else(|| {
                CallError::Configuration(
                    "assume-role identity strategy requires a token-exchange service".to_string(),
                )
            })?;
            let request = AssumeRoleRequest {
                role_arn,
                external_id: external_id.as_deref(),
                session_name: session_name.as_deref().unwrap_or(DEFAULT_SESSION_NAME),
                duration_seconds: duration_seconds.unwrap_or(DEFAULT_SESSION_DURATION),
            };
            debug!(role_arn = %request.role_arn, "Assuming role for invocation client");
            exchanger.assume_role(&request)
        }
    }
}

/// Location of the shared credentials file, honoring the conventional
/// override variable.
fn shared_credentials_path() -> PathBuf {
    if let Ok(path) = std::env::var("AWS_SHARED_CREDENTIALS_FILE") {
        return PathBuf::from(path);
    }
    let home = std::env::var("HOME").unwrap_or_default();
    PathBuf::from(home).join(".aws").join("credentials")
}

/// Read one profile section from the shared credentials file.
pub(crate) fn load_profile(path: &std::path::Path, profile: &str) -> Result<Credentials> {
    let contents = std::fs::read_to_string(path).map_err(|e| {
        CallError::Configuration(format!(
            "cannot read credentials file {}: {e}",
            path.display()
        ))
    })?;

    let mut in_section = false;
    let mut access_key_id = None;
    let mut secret_access_key = None;
    let mut session_token = None;

    for line in contents.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
            continue;
        }
        if let Some(section) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
            in_section = section.trim() == profile;
            continue;
        }
        if !in_section {
            continue;
        }
        if let Some((key, value)) = line.split_once('=') {
            let value = value.trim().to_string();
            match key.trim() {
                "aws_access_key_id" => access_key_id = Some(value),
                "aws_secret_access_key" => secret_access_key = Some(value),
                "aws_session_token" => session_token = Some(value),
                _ => {}
            }
        }
    }

    match (access_key_id, secret_access_key) {
        (Some(access_key_id), Some(secret_access_key)) => Ok(Credentials {
            access_key_id,
            secret_access_key,
            session_token,
        }),
        _ => Err(CallError::Configuration(format!(
            "profile '{profile}' not found or incomplete in {}",
            path.display()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CallErrorKind;
    use std::cell::Cell;
    use std::io::Write;

    struct NoExchange;
    impl TokenExchange for NoExchange {
        fn assume_role(&self, _request: &AssumeRoleRequest<'_>) -> Result<Credentials> {
            panic!("token exchange must not be reached");
        }
    }

    struct NoMetadata;
    impl InstanceMetadata for NoMetadata {
        fn fetch_credentials(&self) -> Result<Credentials> {
            panic!("metadata service must not be reached");
        }
    }

    struct CountingExchange {
        calls: Cell<usize>,
    }
    impl TokenExchange for CountingExchange {
        fn assume_role(&self, request: &AssumeRoleRequest<'_>) -> Result<Credentials> {
            self.calls.set(self.calls.get() + 1);
            assert_eq!(request.session_name, DEFAULT_SESSION_NAME);
            assert_eq!(request.duration_seconds, DEFAULT_SESSION_DURATION);
            Ok(Credentials::new("AKIATEMP", "temp-secret").with_session_token("token"))
        }
    }

    #[test]
    fn test_default_requires_fallback() {
        let fallback = Credentials::new("AKIA", "secret");
        let resolved = resolve_credentials(
            &IdentityConfig::Default,
            Some(&fallback),
            None,
            &NoMetadata,
        )
        .unwrap();
        assert_eq!(resolved, fallback);

        let err =
            resolve_credentials(&IdentityConfig::Default, None, None, &NoMetadata).unwrap_err();
        assert_eq!(err.kind(), CallErrorKind::Configuration);
    }

    #[test]
    fn test_static_requires_both_keys() {
        let config = IdentityConfig::Static {
            access_key_id: "AKIA".to_string(),
            secret_access_key: String::new(),
            session_token: None,
        };
        let err = resolve_credentials(&config, None, None, &NoMetadata).unwrap_err();
        assert_eq!(err.kind(), CallErrorKind::Configuration);
    }

    #[test]
    fn test_assume_role_missing_arn_fails_before_network() {
        let config = IdentityConfig::AssumeRole {
            role_arn: String::new(),
            external_id: None,
            session_name: None,
            duration_seconds: None,
        };
        // NoExchange panics if reached; the error must come first.
        let err =
            resolve_credentials(&config, None, Some(&NoExchange), &NoMetadata).unwrap_err();
        assert_eq!(err.kind(), CallErrorKind::Configuration);
    }

    #[test]
    fn test_assume_role_without_exchanger_is_configuration_error() {
        let config = IdentityConfig::AssumeRole {
            role_arn: "arn:aws:iam::123456789012:role/invoke".to_string(),
            external_id: None,
            session_name: None,
            duration_seconds: None,
        };
        let err = resolve_credentials(&config, None, None, &NoMetadata).unwrap_err();
        assert_eq!(err.kind(), CallErrorKind::Configuration);
    }

    #[test]
    fn test_assume_role_single_exchange() {
        let config = IdentityConfig::AssumeRole {
            role_arn: "arn:aws:iam::123456789012:role/invoke".to_string(),
            external_id: None,
            session_name: None,
            duration_seconds: None,
        };
        let exchange = CountingExchange {
            calls: Cell::new(0),
        };
        let resolved =
            resolve_credentials(&config, None, Some(&exchange), &NoMetadata).unwrap();
        assert_eq!(exchange.calls.get(), 1);
        assert_eq!(resolved.session_token.as_deref(), Some("token"));
    }

    #[test]
    fn test_profile_file_parsing() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[default]\naws_access_key_id = AKIA1\naws_secret_access_key = s1\n\n\
             [analytics]\n# comment\naws_access_key_id = AKIA2\n\
             aws_secret_access_key = s2\naws_session_token = tok"
        )
        .unwrap();

        let creds = load_profile(file.path(), "analytics").unwrap();
        assert_eq!(creds.access_key_id, "AKIA2");
        assert_eq!(creds.session_token.as_deref(), Some("tok"));

        let err = load_profile(file.path(), "missing").unwrap_err();
        assert_eq!(err.kind(), CallErrorKind::Configuration);
    }
}
