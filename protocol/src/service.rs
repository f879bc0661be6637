// Copyright (c) 2024 The Weft Authors

//! gRPC clients for the three node roles the SDK consumes, plus the
//! optional discovery service.
//!
//! Hand-maintained in the shape tonic codegen emits: each client wraps
//! a [`tonic::client::Grpc`] over a shared transport channel and names
//! its RPC paths statically. Channels are cheap to clone; so are the
//! clients.

use crate::{common, discovery, events, orderer, peer};
use tonic::{
    client::Grpc,
    codec::{ProstCodec, Streaming},
    codegen::http::uri::PathAndQuery,
    transport::Channel,
    IntoStreamingRequest, Response, Status,
};

fn not_ready(err: tonic::transport::Error) -> Status {
    Status::unknown(format!("Service was not ready: {err}"))
}

/// Client for the endorser role: executes and signs proposals.
#[derive(Clone, Debug)]
pub struct EndorserClient {
    inner: Grpc<Channel>,
}

impl EndorserClient {
    pub fn new(channel: Channel) -> Self {
        Self { inner: Grpc::new(channel) }
    }

    /// Limit the size of decoded response frames.
    pub fn max_decoding_message_size(mut self, limit: usize) -> Self {
        self.inner = self.inner.max_decoding_message_size(limit);
        self
    }

    /// Execute a signed proposal and return the endorser's response.
    pub async fn process_proposal(
        &mut self,
        request: impl tonic::IntoRequest<peer::SignedProposal>,
    ) -> Result<Response<peer::ProposalResponse>, Status> {
        self.inner.ready().await.map_err(not_ready)?;
        let codec: ProstCodec<peer::SignedProposal, peer::ProposalResponse> =
            ProstCodec::default();
        let path = PathAndQuery::from_static("/protos.Endorser/ProcessProposal");
        self.inner.unary(request.into_request(), path, codec).await
    }
}

/// Client for the orderer role: totally-orders envelopes into blocks.
#[derive(Clone, Debug)]
pub struct BroadcastClient {
    inner: Grpc<Channel>,
}

impl BroadcastClient {
    pub fn new(channel: Channel) -> Self {
        Self { inner: Grpc::new(channel) }
    }

    /// Open the broadcast stream. One ack comes back per envelope sent.
    pub async fn broadcast(
        &mut self,
        request: impl IntoStreamingRequest<Message = common::Envelope>,
    ) -> Result<Response<Streaming<orderer::BroadcastResponse>>, Status> {
        self.inner.ready().await.map_err(not_ready)?;
        let codec: ProstCodec<common::Envelope, orderer::BroadcastResponse> =
            ProstCodec::default();
        let path = PathAndQuery::from_static("/orderer.AtomicBroadcast/Broadcast");
        self.inner.streaming(request.into_streaming_request(), path, codec).await
    }
}

/// Client for the event-source role: streams committed blocks.
#[derive(Clone, Debug)]
pub struct DeliverClient {
    inner: Grpc<Channel>,
}

impl DeliverClient {
    pub fn new(channel: Channel) -> Self {
        Self { inner: Grpc::new(channel) }
    }

    pub fn max_decoding_message_size(mut self, limit: usize) -> Self {
        self.inner = self.inner.max_decoding_message_size(limit);
        self
    }

    /// Open a full-block deliver stream. The client sends one signed
    /// seek envelope and then holds the stream open.
    pub async fn deliver(
        &mut self,
        request: impl IntoStreamingRequest<Message = common::Envelope>,
    ) -> Result<Response<Streaming<events::DeliverResponse>>, Status> {
        self.inner.ready().await.map_err(not_ready)?;
        let codec: ProstCodec<common::Envelope, events::DeliverResponse> = ProstCodec::default();
        let path = PathAndQuery::from_static("/protos.Deliver/Deliver");
        self.inner.streaming(request.into_streaming_request(), path, codec).await
    }

    /// Open a filtered deliver stream: txids and validation codes only.
    pub async fn deliver_filtered(
        &mut self,
        request: impl IntoStreamingRequest<Message = common::Envelope>,
    ) -> Result<Response<Streaming<events::DeliverResponse>>, Status> {
        self.inner.ready().await.map_err(not_ready)?;
        let codec: ProstCodec<common::Envelope, events::DeliverResponse> = ProstCodec::default();
        let path = PathAndQuery::from_static("/protos.Deliver/DeliverFiltered");
        self.inner.streaming(request.into_streaming_request(), path, codec).await
    }
}

/// Client for the discovery service.
#[derive(Clone, Debug)]
pub struct DiscoveryClient {
    inner: Grpc<Channel>,
}

impl DiscoveryClient {
    pub fn new(channel: Channel) -> Self {
        Self { inner: Grpc::new(channel) }
    }

    /// Ask a peer about channel membership and endorsement layouts.
    pub async fn discover(
        &mut self,
        request: impl tonic::IntoRequest<discovery::SignedRequest>,
    ) -> Result<Response<discovery::Response>, Status> {
        self.inner.ready().await.map_err(not_ready)?;
        let codec: ProstCodec<discovery::SignedRequest, discovery::Response> =
            ProstCodec::default();
        let path = PathAndQuery::from_static("/discovery.Discovery/Discover");
        self.inner.unary(request.into_request(), path, codec).await
    }
}
