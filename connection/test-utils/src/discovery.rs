// Copyright (c) 2024 The Weft Authors

//! Mock discovery connection.

use async_trait::async_trait;
use std::sync::Mutex;
use weft_connection::{DiscoveryConnection, EndpointId, Result};
use weft_protocol::discovery;

/// A discovery service with a canned response.
pub struct MockDiscovery {
    id: EndpointId,
    response: discovery::Response,
    received: Mutex<Vec<discovery::SignedRequest>>,
}

impl MockDiscovery {
    pub fn new(url: &str, response: discovery::Response) -> Self {
        Self {
            id: EndpointId::from(url),
            response,
            received: Mutex::new(Vec::new()),
        }
    }

    pub fn received(&self) -> Vec<discovery::SignedRequest> {
        self.received.lock().unwrap().clone()
    }
}

#[async_trait]
impl DiscoveryConnection for MockDiscovery {
    fn id(&self) -> EndpointId {
        self.id.clone()
    }

    async fn discover(&self, request: discovery::SignedRequest) -> Result<discovery::Response> {
        self.received.lock().unwrap().push(request);
        Ok(self.response.clone())
    }
}
