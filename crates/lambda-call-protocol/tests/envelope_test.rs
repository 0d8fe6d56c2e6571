// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Request/response envelope tests for lambda-call-protocol.

use serde_json::{Value, json};

use lambda_call_protocol::envelope::{parameter_index, parameter_key};
use lambda_call_protocol::{InvokeRequest, InvokeResponse};

#[test]
fn test_request_wire_shape() {
    let mut request = InvokeRequest::new("calc");
    request
        .parameters
        .insert(parameter_key(1), json!("hello"));
    request.parameters.insert(parameter_key(2), json!(42));
    request
        .environment
        .insert("PRIORITY".to_string(), json!("high"));
    request
        .context
        .insert("jdbcVersion".to_string(), json!("4.2"));
    request
        .configuration
        .insert("qualifier".to_string(), json!("prod"));

    let bytes = request.to_bytes().unwrap();
    let wire: Value = serde_json::from_slice(&bytes).unwrap();

    assert_eq!(wire["action"], "calc");
    assert_eq!(wire["parameters"]["param1"], "hello");
    assert_eq!(wire["parameters"]["param2"], 42);
    assert_eq!(wire["environment"]["PRIORITY"], "high");
    assert_eq!(wire["context"]["jdbcVersion"], "4.2");
    assert_eq!(wire["configuration"]["qualifier"], "prod");
}

#[test]
fn test_empty_sections_still_serialized() {
    let wire: Value =
        serde_json::from_slice(&InvokeRequest::new("noop").to_bytes().unwrap()).unwrap();
    assert!(wire["parameters"].as_object().unwrap().is_empty());
    assert!(wire["environment"].as_object().unwrap().is_empty());
}

#[test]
fn test_parameter_key_round_trip() {
    assert_eq!(parameter_key(1), "param1");
    assert_eq!(parameter_index("param7"), Some(7));
    assert_eq!(parameter_index("param0"), None);
    assert_eq!(parameter_index("paramX"), None);
    assert_eq!(parameter_index("other1"), None);
}

#[test]
fn test_response_full_envelope() {
    let body = r#"{
        "success": true,
        "result": 3,
        "outputParameters": {"param2": "x"},
        "resultSet": [{"id": 1, "name": "a"}]
    }"#;
    let response = InvokeResponse::from_bytes(body.as_bytes()).unwrap();
    assert_eq!(response.success, Some(true));
    assert_eq!(response.result, Some(json!(3)));
    assert_eq!(
        response.output_parameters.unwrap()["param2"],
        json!("x")
    );
    assert_eq!(response.result_set.unwrap().len(), 1);
}

#[test]
fn test_response_empty_body_is_default() {
    for body in [&b""[..], b"   ", b"null"] {
        let response = InvokeResponse::from_bytes(body).unwrap();
        assert_eq!(response.success, None);
        assert!(response.result.is_none());
        assert!(response.result_set.is_none());
    }
}

#[test]
fn test_response_malformed_body() {
    assert!(InvokeResponse::from_bytes(b"{not json").is_err());
}

#[test]
fn test_response_unknown_fields_ignored() {
    let response =
        InvokeResponse::from_bytes(br#"{"success":true,"futureField":123}"#).unwrap();
    assert_eq!(response.success, Some(true));
}
