// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Result-shape classification tests for lambda-call-protocol.

use serde_json::json;

use lambda_call_protocol::{DecodedResult, EnvelopeError, InvokeResponse, classify};

fn decode(body: &str) -> Result<DecodedResult, EnvelopeError> {
    classify(InvokeResponse::from_bytes(body.as_bytes()).unwrap())
}

#[test]
fn test_application_failure() {
    let err = decode(r#"{"success":false,"error":"division by zero"}"#).unwrap_err();
    let EnvelopeError::Failed(message) = err else {
        panic!("expected Failed, got {err:?}");
    };
    assert_eq!(message, "division by zero");
}

#[test]
fn test_absent_success_is_not_failure() {
    // Only an explicit false marks an application failure.
    assert_eq!(decode(r#"{"result":7}"#).unwrap(), DecodedResult::Scalar(7));
}

#[test]
fn test_output_parameters_shape() {
    let result = decode(
        r#"{"success":true,"outputParameters":{"param3":42,"param1":"a"}}"#,
    )
    .unwrap();
    let DecodedResult::Outputs(values) = result else {
        panic!("expected outputs");
    };
    assert_eq!(values[&1], json!("a"));
    assert_eq!(values[&3], json!(42));
}

#[test]
fn test_tabular_preserves_row_and_key_order() {
    let result = decode(
        r#"{"success":true,"resultSet":[
            {"z":1,"a":2},
            {"z":3,"a":4}
        ]}"#,
    )
    .unwrap();
    let DecodedResult::Tabular(rows) = result else {
        panic!("expected rows");
    };
    // First-row key order is authoritative for column layout.
    let keys: Vec<&String> = rows[0].keys().collect();
    assert_eq!(keys, ["z", "a"]);
}

#[test]
fn test_single_value_shapes() {
    assert_eq!(
        decode(r#"{"success":true,"result":"ok"}"#).unwrap(),
        DecodedResult::SingleValue(json!("ok"))
    );
    assert_eq!(
        decode(r#"{"success":true,"result":{"nested":true}}"#).unwrap(),
        DecodedResult::SingleValue(json!({"nested": true}))
    );
    assert_eq!(
        decode(r#"{"success":true,"result":[1,2]}"#).unwrap(),
        DecodedResult::SingleValue(json!([1, 2]))
    );
}

#[test]
fn test_void_function() {
    assert_eq!(decode(r#"{"success":true}"#).unwrap(), DecodedResult::Empty);
}
