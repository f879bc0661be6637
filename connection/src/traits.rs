// Copyright (c) 2024 The Weft Authors

//! The seams the SDK talks to nodes through.
//!
//! Production implementations live in [`crate::grpc`]; scriptable ones
//! in the `weft-connection-test-utils` member. Every method takes
//! `&self` so connections can be shared behind `Arc` across concurrent
//! fan-outs.

use crate::{EndpointId, Result};
use async_trait::async_trait;
use futures::{future::BoxFuture, stream::BoxStream};
use weft_protocol::{
    common::Envelope,
    discovery,
    events::DeliverResponse,
    orderer::BroadcastResponse,
    peer::{ProposalResponse, SignedProposal},
};

/// Resolves with the orderer's single ack for one broadcast envelope.
pub type AckFuture = BoxFuture<'static, Result<BroadcastResponse>>;

/// Frames arriving on a deliver stream.
pub type BlockStream = BoxStream<'static, Result<DeliverResponse>>;

/// Which deliver variant to open.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeliverMode {
    /// Full blocks, including read/write sets.
    Full,
    /// Transaction ids and validation codes only; for deployments
    /// without read permission on the ledger.
    Filtered,
}

/// A connection to an endorser: executes and signs proposals.
#[async_trait]
pub trait EndorserConnection: Send + Sync {
    /// Identity of the remote, for diagnostics and collation.
    fn id(&self) -> EndpointId;

    /// Execute the signed proposal and return the endorser's response.
    async fn process_proposal(&self, proposal: SignedProposal) -> Result<ProposalResponse>;
}

/// A connection to an orderer: totally-orders envelopes into blocks.
#[async_trait]
pub trait OrdererConnection: Send + Sync {
    fn id(&self) -> EndpointId;

    /// Open the broadcast stream and send `envelope`.
    ///
    /// The outer future resolves once the envelope has been handed to
    /// the transport (the local phase); the returned [`AckFuture`]
    /// resolves with the orderer's ack (the remote phase). The split
    /// lets callers time the two phases independently.
    async fn broadcast(&self, envelope: Envelope) -> Result<AckFuture>;
}

/// A connection to an event source: streams committed blocks.
#[async_trait]
pub trait DeliverConnection: Send + Sync {
    fn id(&self) -> EndpointId;

    /// Send the signed seek envelope and return the resulting block
    /// stream. The request stream stays open until the returned stream
    /// is dropped.
    async fn deliver(&self, seek: Envelope, mode: DeliverMode) -> Result<BlockStream>;
}

/// A connection to the discovery service.
#[async_trait]
pub trait DiscoveryConnection: Send + Sync {
    fn id(&self) -> EndpointId;

    async fn discover(&self, request: discovery::SignedRequest) -> Result<discovery::Response>;
}
