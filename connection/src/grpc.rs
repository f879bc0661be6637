// Copyright (c) 2024 The Weft Authors

//! gRPC-backed implementations of the connection traits.
//!
//! Each connection takes its channel from the pool at construction and
//! clones the protocol client per call; clones share the underlying
//! transport.

use crate::{
    AckFuture, BlockStream, ConnectionPool, DeliverConnection, DeliverMode,
    DiscoveryConnection, Endpoint, EndpointId, EndorserConnection, Error, OrdererConnection,
    Result,
};
use async_trait::async_trait;
use futures::StreamExt;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use weft_protocol::{
    common::Envelope,
    discovery,
    orderer::BroadcastResponse,
    peer::{ProposalResponse, SignedProposal},
    service::{BroadcastClient, DeliverClient, DiscoveryClient, EndorserClient},
};

/// Endorser over gRPC.
#[derive(Clone)]
pub struct GrpcEndorser {
    id: EndpointId,
    client: EndorserClient,
}

impl GrpcEndorser {
    pub fn new(pool: &ConnectionPool, endpoint: &Endpoint) -> Result<Self> {
        let channel = pool.channel(endpoint)?;
        let mut client = EndorserClient::new(channel);
        if let Some(limit) = endpoint.options().max_recv_message_size {
            client = client.max_decoding_message_size(limit);
        }
        Ok(Self { id: endpoint.id(), client })
    }
}

#[async_trait]
impl EndorserConnection for GrpcEndorser {
    fn id(&self) -> EndpointId {
        self.id.clone()
    }

    async fn process_proposal(&self, proposal: SignedProposal) -> Result<ProposalResponse> {
        let mut client = self.client.clone();
        let response = client.process_proposal(proposal).await?;
        Ok(response.into_inner())
    }
}

/// Orderer over gRPC.
#[derive(Clone)]
pub struct GrpcOrderer {
    id: EndpointId,
    client: BroadcastClient,
}

impl GrpcOrderer {
    pub fn new(pool: &ConnectionPool, endpoint: &Endpoint) -> Result<Self> {
        let channel = pool.channel(endpoint)?;
        Ok(Self { id: endpoint.id(), client: BroadcastClient::new(channel) })
    }
}

#[async_trait]
impl OrdererConnection for GrpcOrderer {
    fn id(&self) -> EndpointId {
        self.id.clone()
    }

    async fn broadcast(&self, envelope: Envelope) -> Result<AckFuture> {
        let mut client = self.client.clone();
        let (tx, rx) = mpsc::channel::<Envelope>(1);
        tx.send(envelope).await.map_err(|_| Error::StreamClosed)?;

        // Opening the stream is the local phase; the ack future below
        // is the remote phase.
        let response = client.broadcast(ReceiverStream::new(rx)).await?;
        let mut stream = response.into_inner();

        Ok(Box::pin(async move {
            // Hold the request sender so the stream stays open until
            // the ack arrives.
            let _hold = tx;
            match stream.message().await {
                Ok(Some(ack)) => Ok::<BroadcastResponse, Error>(ack),
                Ok(None) => Err(Error::StreamClosed),
                Err(status) => Err(Error::Grpc(status)),
            }
        }))
    }
}

/// Event source over gRPC.
#[derive(Clone)]
pub struct GrpcDeliverer {
    id: EndpointId,
    client: DeliverClient,
}

impl GrpcDeliverer {
    pub fn new(pool: &ConnectionPool, endpoint: &Endpoint) -> Result<Self> {
        let channel = pool.channel(endpoint)?;
        let mut client = DeliverClient::new(channel);
        if let Some(limit) = endpoint.options().max_recv_message_size {
            client = client.max_decoding_message_size(limit);
        }
        Ok(Self { id: endpoint.id(), client })
    }
}

#[async_trait]
impl DeliverConnection for GrpcDeliverer {
    fn id(&self) -> EndpointId {
        self.id.clone()
    }

    async fn deliver(&self, seek: Envelope, mode: DeliverMode) -> Result<BlockStream> {
        let mut client = self.client.clone();
        let (tx, rx) = mpsc::channel::<Envelope>(1);
        tx.send(seek).await.map_err(|_| Error::StreamClosed)?;

        let response = match mode {
            DeliverMode::Full => client.deliver(ReceiverStream::new(rx)).await?,
            DeliverMode::Filtered => client.deliver_filtered(ReceiverStream::new(rx)).await?,
        };

        let stream = response.into_inner().map(move |frame| {
            // Keep the request sender alive for the life of the stream.
            let _hold = &tx;
            frame.map_err(Error::from)
        });
        Ok(Box::pin(stream))
    }
}

/// Discovery over gRPC.
#[derive(Clone)]
pub struct GrpcDiscovery {
    id: EndpointId,
    client: DiscoveryClient,
}

impl GrpcDiscovery {
    pub fn new(pool: &ConnectionPool, endpoint: &Endpoint) -> Result<Self> {
        let channel = pool.channel(endpoint)?;
        Ok(Self { id: endpoint.id(), client: DiscoveryClient::new(channel) })
    }
}

#[async_trait]
impl DiscoveryConnection for GrpcDiscovery {
    fn id(&self) -> EndpointId {
        self.id.clone()
    }

    async fn discover(&self, request: discovery::SignedRequest) -> Result<discovery::Response> {
        let mut client = self.client.clone();
        let response = client.discover(request).await?;
        Ok(response.into_inner())
    }
}
