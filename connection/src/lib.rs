// Copyright (c) 2024 The Weft Authors

//! Connection support for the weft ledger SDK.
//!
//! An [`Endpoint`] describes how to reach one node: url, TLS trust
//! roots, optional mutual-TLS client material, and transport options.
//! The [`ConnectionPool`] owns the underlying gRPC channels, keyed by
//! endpoint material, opened lazily and shared by reference with every
//! consumer. The traits in [`traits`] are the seams the rest of the SDK
//! talks through; [`grpc`] provides the production implementations and
//! the `test-utils` member provides scriptable ones.

mod endpoint;
mod error;
pub mod grpc;
mod pool;
mod traits;

pub use endpoint::{Endpoint, EndpointId, GrpcOptions};
pub use error::{Error, Result};
pub use pool::ConnectionPool;
pub use traits::{
    AckFuture, BlockStream, DeliverConnection, DeliverMode, DiscoveryConnection,
    EndorserConnection, OrdererConnection,
};
