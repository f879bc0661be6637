// Copyright (c) 2024 The Weft Authors

//! Mock orderer connection.

use async_trait::async_trait;
use std::{sync::Mutex, time::Duration};
use tonic::Status;
use weft_connection::{AckFuture, EndpointId, Error, OrdererConnection, Result};
use weft_protocol::{common, orderer::BroadcastResponse};

enum Ack {
    Respond { status: common::Status, info: String },
    /// Open the stream but never ack; exercises the remote-phase
    /// timeout.
    Never,
    /// Fail before the envelope is handed to the transport; exercises
    /// the local-phase timeout path.
    RefuseOpen,
}

/// An orderer whose single ack per envelope is scripted.
pub struct MockOrderer {
    id: EndpointId,
    open_delay: Option<Duration>,
    ack_delay: Option<Duration>,
    ack: Ack,
    received: Mutex<Vec<common::Envelope>>,
}

impl MockOrderer {
    pub fn acking(url: &str, status: common::Status) -> Self {
        Self::new(url, Ack::Respond { status, info: String::new() })
    }

    pub fn success(url: &str) -> Self {
        Self::acking(url, common::Status::Success)
    }

    pub fn never_acking(url: &str) -> Self {
        Self::new(url, Ack::Never)
    }

    pub fn refusing_open(url: &str) -> Self {
        Self::new(url, Ack::RefuseOpen)
    }

    fn new(url: &str, ack: Ack) -> Self {
        Self {
            id: EndpointId::from(url),
            open_delay: None,
            ack_delay: None,
            ack,
            received: Mutex::new(Vec::new()),
        }
    }

    /// Delay the local phase (stream open + send).
    pub fn with_open_delay(mut self, delay: Duration) -> Self {
        self.open_delay = Some(delay);
        self
    }

    /// Delay the remote phase (the ack).
    pub fn with_ack_delay(mut self, delay: Duration) -> Self {
        self.ack_delay = Some(delay);
        self
    }

    /// Every envelope this mock has accepted.
    pub fn received(&self) -> Vec<common::Envelope> {
        self.received.lock().unwrap().clone()
    }
}

#[async_trait]
impl OrdererConnection for MockOrderer {
    fn id(&self) -> EndpointId {
        self.id.clone()
    }

    async fn broadcast(&self, envelope: common::Envelope) -> Result<AckFuture> {
        if let Some(delay) = self.open_delay {
            tokio::time::sleep(delay).await;
        }
        if matches!(self.ack, Ack::RefuseOpen) {
            return Err(Error::Grpc(Status::unavailable("mock orderer refusing stream")));
        }
        self.received.lock().unwrap().push(envelope);

        let ack_delay = self.ack_delay;
        let reply = match &self.ack {
            Ack::Respond { status, info } => Some(BroadcastResponse {
                status: *status as i32,
                info: info.clone(),
            }),
            Ack::Never => None,
            Ack::RefuseOpen => unreachable!(),
        };

        Ok(Box::pin(async move {
            if let Some(delay) = ack_delay {
                tokio::time::sleep(delay).await;
            }
            match reply {
                Some(ack) => Ok(ack),
                None => {
                    futures::future::pending::<()>().await;
                    unreachable!()
                }
            }
        }))
    }
}
