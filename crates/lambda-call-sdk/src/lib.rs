// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Lambda Call SDK
//!
//! Callable-statement bridge to remote serverless functions.
//!
//! Call texts in the database escape form `{call lambda:fn(?, ?)}` are
//! parsed into prepared statements, parameters are bound by index or name,
//! and execution maps the call onto a JSON invocation of the named function.
//! Results come back as output parameters, a forward-only result set, or an
//! update count, mirroring how a stored procedure behaves.
//!
//! # Architecture
//!
//! A [`Connection`] resolves its identity strategy exactly once and owns a
//! shared invocation client. Statements prepared from it carry their own
//! parameter table and environment context:
//! - Parsing and the security policy run at prepare time
//! - Binding and environment changes are local, no network traffic
//! - `execute` performs exactly one signed invocation
//!
//! # Example
//!
//! ```no_run
//! use lambda_call_sdk::{Connection, ConnectionConfig, Credentials, ValueKind};
//!
//! # fn example() -> lambda_call_sdk::Result<()> {
//! let config = ConnectionConfig::new("us-east-1").with_qualifier("prod");
//! let credentials = Credentials::new("AKIAEXAMPLE", "secret");
//! let connection = Connection::connect(config, Some(credentials))?;
//!
//! let mut statement = connection.prepare_call("{call lambda:calc(?, ?, ?)}")?;
//! statement.set_i64(1, 20)?;
//! statement.set_i64(2, 22)?;
//! statement.register_out(3, ValueKind::LongInteger)?;
//! statement.execute()?;
//! println!("sum = {}", statement.get_i64(3)?);
//! # Ok(())
//! # }
//! ```

mod client;
mod coerce;
mod config;
mod connection;
mod context;
mod cursor;
mod error;
mod identity;
mod imds;
mod params;
mod policy;
mod sign;
mod statement;
mod sts;
mod types;

pub use client::{
    HttpInvokeTransport, InvocationOutcome, InvokeTransport, LambdaClient, SharedClient,
    TransportReply, TransportRequest,
};
pub use config::ConnectionConfig;
pub use connection::Connection;
pub use context::{EnvironmentContext, INTERFACE_VERSION};
pub use cursor::{SINGLE_VALUE_COLUMN, TabularCursor};
pub use error::{CallError, CallErrorKind, Result};
pub use identity::{
    AssumeRoleRequest, Credentials, IdentityConfig, InstanceMetadata, TokenExchange,
};
pub use imds::ImdsService;
pub use params::{ParameterSlot, ParameterTable};
pub use policy::SecurityPolicy;
pub use statement::{CallableStatement, ParsedCall, parse_call};
pub use sts::StsTokenExchange;
pub use types::{InvocationType, LogMode, ParameterMode, ValueKind};
