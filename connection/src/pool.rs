// Copyright (c) 2024 The Weft Authors

//! The connection pool.

use crate::{Endpoint, Result};
use std::{
    collections::HashMap,
    sync::Mutex,
};
use tonic::transport::Channel;
use tracing::debug;

type PoolKey = (String, [u8; 32], [u8; 32]);

/// Owns the gRPC channels, one per distinct `(url, tls material)`.
///
/// Channels are created lazily on first request and handed out as
/// clones; clones share the underlying HTTP/2 connection. Consumers
/// never close a channel themselves — a broken transport is a terminal
/// error on the in-flight call, and the channel re-dials on the next
/// one. Only [`ConnectionPool::close`] releases channels.
#[derive(Default)]
pub struct ConnectionPool {
    channels: Mutex<HashMap<PoolKey, Channel>>,
}

impl ConnectionPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the shared channel for `endpoint`, creating it if this is
    /// the first consumer.
    pub fn channel(&self, endpoint: &Endpoint) -> Result<Channel> {
        let key = endpoint.pool_key();
        let mut channels = self.channels.lock().expect("pool lock");
        if let Some(channel) = channels.get(&key) {
            return Ok(channel.clone());
        }
        debug!(url = endpoint.url(), tls = endpoint.tls_configured(), "opening channel");
        let channel = endpoint.open()?;
        channels.insert(key, channel.clone());
        Ok(channel)
    }

    /// Number of distinct channels currently held.
    pub fn len(&self) -> usize {
        self.channels.lock().expect("pool lock").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Release every channel. In-flight calls keep their clones until
    /// they finish; new calls re-open through the pool.
    pub fn close(&self) {
        let mut channels = self.channels.lock().expect("pool lock");
        debug!(count = channels.len(), "closing connection pool");
        channels.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn pool_dedupes_by_endpoint_material() {
        let pool = ConnectionPool::new();
        let a = Endpoint::new("grpc://peer0:7051");
        let b = Endpoint::new("grpc://peer0:7051");
        let c = Endpoint::new("grpc://peer1:7051");

        pool.channel(&a).unwrap();
        pool.channel(&b).unwrap();
        assert_eq!(pool.len(), 1);

        pool.channel(&c).unwrap();
        assert_eq!(pool.len(), 2);

        // Same url, different trust roots: distinct channel.
        let d = Endpoint::new("grpc://peer0:7051").with_tls_roots(b"roots".to_vec());
        pool.channel(&d).unwrap();
        assert_eq!(pool.len(), 3);
    }

    #[tokio::test]
    async fn close_is_idempotent_and_reopens_lazily() {
        let pool = ConnectionPool::new();
        pool.channel(&Endpoint::new("grpc://peer0:7051")).unwrap();
        pool.close();
        pool.close();
        assert!(pool.is_empty());

        pool.channel(&Endpoint::new("grpc://peer0:7051")).unwrap();
        assert_eq!(pool.len(), 1);
    }
}
