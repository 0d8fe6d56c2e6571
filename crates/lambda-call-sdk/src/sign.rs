// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! SigV4 request signing for the invocation and token-exchange calls.
//!
//! Produces the `host`, `x-amz-date`, `x-amz-security-token` and
//! `authorization` headers for a blocking HTTP request. All `x-amz-*`
//! headers the caller sends must be passed in as extras so they are covered
//! by the signature.

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use url::Url;

use crate::identity::Credentials;

type HmacSha256 = Hmac<Sha256>;

const ALGORITHM: &str = "AWS4-HMAC-SHA256";

/// Inputs shared by every signed request.
pub(crate) struct SigningParams<'a> {
    pub credentials: &'a Credentials,
    pub region: &'a str,
    pub service: &'a str,
    pub now: DateTime<Utc>,
}

/// Compute the signing headers for one request.
///
/// `extra_headers` are included in the canonical request (and must be sent
/// verbatim); the returned list carries only the headers this function owns.
pub(crate) fn signed_headers(
    method: &str,
    url: &Url,
    payload: &[u8],
    extra_headers: &[(&str, &str)],
    params: &SigningParams<'_>,
) -> Vec<(String, String)> {
    let amz_date = params.now.format("%Y%m%dT%H%M%SZ").to_string();
    let date = params.now.format("%Y%m%d").to_string();
    let host = host_header(url);

    let mut headers: Vec<(String, String)> = vec![
        ("host".to_string(), host.clone()),
        ("x-amz-date".to_string(), amz_date.clone()),
    ];
    if let Some(token) = &params.credentials.session_token {
        headers.push(("x-amz-security-token".to_string(), token.clone()));
    }
    for (name, value) in extra_headers {
        headers.push((name.to_lowercase(), value.trim().to_string()));
    }
    headers.sort();

    let canonical_headers: String = headers
        .iter()
        .map(|(name, value)| format!("{name}:{value}\n"))
        .collect();
    let signed_header_names = headers
        .iter()
        .map(|(name, _)| name.as_str())
        .collect::<Vec<_>>()
        .join(";");

    let canonical_request = format!(
        "{method}\n{path}\n{query}\n{canonical_headers}\n{signed_header_names}\n{payload_hash}",
        path = url.path(),
        query = canonical_query(url),
        payload_hash = hex_sha256(payload),
    );

    let scope = format!("{date}/{region}/{service}/aws4_request",
        region = params.region,
        service = params.service,
    );
    let string_to_sign = format!(
        "{ALGORITHM}\n{amz_date}\n{scope}\n{request_hash}",
        request_hash = hex_sha256(canonical_request.as_bytes()),
    );

    let signature = hex::encode(hmac(
        &signing_key(params, &date),
        string_to_sign.as_bytes(),
    ));

    let authorization = format!(
        "{ALGORITHM} Credential={access_key}/{scope}, SignedHeaders={signed_header_names}, Signature={signature}",
        access_key = params.credentials.access_key_id,
    );

    let mut result = vec![
        ("host".to_string(), host),
        ("x-amz-date".to_string(), amz_date),
    ];
    if let Some(token) = &params.credentials.session_token {
        result.push(("x-amz-security-token".to_string(), token.clone()));
    }
    result.push(("authorization".to_string(), authorization));
    result
}

fn host_header(url: &Url) -> String {
    let host = url.host_str().unwrap_or_default();
    match url.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    }
}

fn canonical_query(url: &Url) -> String {
    let mut pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| {
            (
                urlencoding::encode(&k).into_owned(),
                urlencoding::encode(&v).into_owned(),
            )
        })
        .collect();
    pairs.sort();
    pairs
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&")
}

fn hex_sha256(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

fn hmac(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC accepts any key length");
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}

fn signing_key(params: &SigningParams<'_>, date: &str) -> Vec<u8> {
    let secret = format!("AWS4{}", params.credentials.secret_access_key);
    let k_date = hmac(secret.as_bytes(), date.as_bytes());
    let k_region = hmac(&k_date, params.region.as_bytes());
    let k_service = hmac(&k_region, params.service.as_bytes());
    hmac(&k_service, b"aws4_request")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn params(credentials: &Credentials) -> SigningParams<'_> {
        SigningParams {
            credentials,
            region: "us-east-1",
            service: "lambda",
            now: Utc.with_ymd_and_hms(2024, 5, 17, 10, 30, 0).unwrap(),
        }
    }

    #[test]
    fn test_authorization_header_shape() {
        let credentials = Credentials::new("AKIDEXAMPLE", "secret");
        let url: Url = "https://lambda.us-east-1.amazonaws.com/2015-03-31/functions/calc/invocations"
            .parse()
            .unwrap();
        let headers = signed_headers("POST", &url, b"{}", &[], &params(&credentials));

        let auth = &headers
            .iter()
            .find(|(name, _)| name == "authorization")
            .unwrap()
            .1;
        assert!(auth.starts_with(
            "AWS4-HMAC-SHA256 Credential=AKIDEXAMPLE/20240517/us-east-1/lambda/aws4_request"
        ));
        assert!(auth.contains("SignedHeaders=host;x-amz-date"));
        let signature = auth.rsplit("Signature=").next().unwrap();
        assert_eq!(signature.len(), 64);
        assert!(signature.bytes().all(|b| b.is_ascii_hexdigit()));
    }

    #[test]
    fn test_signing_is_deterministic() {
        let credentials = Credentials::new("AKIDEXAMPLE", "secret");
        let url: Url = "https://lambda.us-east-1.amazonaws.com/x".parse().unwrap();
        let a = signed_headers("POST", &url, b"{}", &[], &params(&credentials));
        let b = signed_headers("POST", &url, b"{}", &[], &params(&credentials));
        assert_eq!(a, b);

        let c = signed_headers("POST", &url, b"{\"k\":1}", &[], &params(&credentials));
        assert_ne!(a, c);
    }

    #[test]
    fn test_session_token_header_present_and_signed() {
        let credentials = Credentials::new("AKID", "secret").with_session_token("tok");
        let url: Url = "https://lambda.us-east-1.amazonaws.com/x".parse().unwrap();
        let headers = signed_headers("POST", &url, b"", &[], &params(&credentials));

        assert!(
            headers
                .iter()
                .any(|(name, value)| name == "x-amz-security-token" && value == "tok")
        );
        let auth = &headers.last().unwrap().1;
        assert!(auth.contains("x-amz-security-token"));
    }

    #[test]
    fn test_extra_headers_are_signed() {
        let credentials = Credentials::new("AKID", "secret");
        let url: Url = "https://lambda.us-east-1.amazonaws.com/x".parse().unwrap();
        let headers = signed_headers(
            "POST",
            &url,
            b"",
            &[("X-Amz-Invocation-Type", "Event")],
            &params(&credentials),
        );
        let auth = &headers.last().unwrap().1;
        assert!(auth.contains("x-amz-invocation-type"));
    }

    #[test]
    fn test_canonical_query_sorted_and_encoded() {
        let url: Url = "https://sts.amazonaws.com/?Version=2011-06-15&Action=AssumeRole"
            .parse()
            .unwrap();
        assert_eq!(canonical_query(&url), "Action=AssumeRole&Version=2011-06-15");

        let url: Url = "https://lambda.us-east-1.amazonaws.com/x?Qualifier=$LATEST"
            .parse()
            .unwrap();
        assert_eq!(canonical_query(&url), "Qualifier=%24LATEST");
    }
}
