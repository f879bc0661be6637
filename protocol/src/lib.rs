// Copyright (c) 2024 The Weft Authors

//! Wire schema and gRPC service clients for the weft ledger SDK.
//!
//! The ledger network speaks a fixed protobuf schema; the SDK must
//! serialize and parse these frames bit-exactly. The message structs in
//! this crate are hand-maintained [`prost::Message`] derives whose field
//! tags match the network schema, so no protoc toolchain is required to
//! build the workspace. The service clients in [`service`] are written
//! in the shape tonic codegen emits, one method per consumed RPC.

pub mod common;
pub mod discovery;
pub mod events;
pub mod msp;
pub mod orderer;
pub mod peer;
pub mod service;

pub use prost::Message;
