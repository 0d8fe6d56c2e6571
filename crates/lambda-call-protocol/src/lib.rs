// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Lambda Call Protocol - JSON invocation envelopes for the callable bridge.
//!
//! This crate defines the wire contract spoken between a callable statement
//! and a remote Lambda function acting as a stored procedure:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                   lambda-call-protocol                      │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Classification: outputs / tabular / scalar / single / none │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Envelopes: InvokeRequest / InvokeResponse (serde_json)     │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! The request envelope carries the function name, positional parameters
//! (`param1`, `param2`, ...), merged environment variables, execution context
//! and configuration. The response envelope carries a success flag, an error
//! message, output parameters and either a result set or a scalar result.
//!
//! Transport is out of scope here; the SDK crate owns HTTP and signing.

pub mod decode;
pub mod envelope;

pub use decode::{DecodedResult, classify};
pub use envelope::{EnvelopeError, InvokeRequest, InvokeResponse};
