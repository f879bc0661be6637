// Copyright (c) 2024 The Weft Authors

//! Endpoint descriptions.

use crate::{Error, Result};
use sha2::{Digest, Sha256};
use std::{
    fmt::{Display, Formatter, Result as FmtResult},
    time::Duration,
};
use tonic::transport::{Certificate, Channel, ClientTlsConfig, Identity as TlsIdentity};

/// Transport options for one endpoint. Everything is caller-supplied;
/// no environment variables are consulted.
#[derive(Clone, Debug)]
pub struct GrpcOptions {
    /// Budget for establishing the underlying connection.
    pub dial_timeout: Duration,
    /// HTTP/2 keep-alive ping interval; `None` disables pings.
    pub keep_alive_interval: Option<Duration>,
    /// How long to wait for a keep-alive ack before the connection is
    /// considered broken.
    pub keep_alive_timeout: Duration,
    /// Cap on decoded response messages. `None` uses the transport
    /// default.
    pub max_recv_message_size: Option<usize>,
}

impl Default for GrpcOptions {
    fn default() -> Self {
        Self {
            dial_timeout: Duration::from_secs(3),
            keep_alive_interval: Some(Duration::from_secs(120)),
            keep_alive_timeout: Duration::from_secs(20),
            max_recv_message_size: None,
        }
    }
}

/// Identifies an endpoint for diagnostics and collation keys: the
/// normalized url.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EndpointId(String);

impl EndpointId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for EndpointId {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for EndpointId {
    fn from(src: &str) -> Self {
        Self(src.to_owned())
    }
}

/// How to reach one node: url, trust material, transport options.
///
/// Mutual TLS is mandatory whenever trust roots are configured: if the
/// remote requests a client certificate and none is present here, the
/// handshake fails and the call surfaces a terminal transport error.
#[derive(Clone, Debug)]
pub struct Endpoint {
    url: String,
    tls_roots: Option<Vec<u8>>,
    client_cert: Option<Vec<u8>>,
    client_key: Option<Vec<u8>>,
    server_name_override: Option<String>,
    options: GrpcOptions,
}

impl Endpoint {
    /// Describe an endpoint at `url`. Accepted schemes: `grpc://` and
    /// `http://` (plaintext), `grpcs://` and `https://` (TLS).
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            tls_roots: None,
            client_cert: None,
            client_key: None,
            server_name_override: None,
            options: GrpcOptions::default(),
        }
    }

    /// PEM bundle of CA certificates to trust for the server.
    pub fn with_tls_roots(mut self, roots_pem: impl Into<Vec<u8>>) -> Self {
        self.tls_roots = Some(roots_pem.into());
        self
    }

    /// PEM client certificate and key for mutual TLS.
    pub fn with_client_identity(
        mut self,
        cert_pem: impl Into<Vec<u8>>,
        key_pem: impl Into<Vec<u8>>,
    ) -> Self {
        self.client_cert = Some(cert_pem.into());
        self.client_key = Some(key_pem.into());
        self
    }

    /// Expect this server name in the TLS handshake instead of the
    /// url's host, e.g. when dialing through a load balancer.
    pub fn with_server_name_override(mut self, name: impl Into<String>) -> Self {
        self.server_name_override = Some(name.into());
        self
    }

    pub fn with_options(mut self, options: GrpcOptions) -> Self {
        self.options = options;
        self
    }

    pub fn id(&self) -> EndpointId {
        EndpointId(self.url.clone())
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn options(&self) -> &GrpcOptions {
        &self.options
    }

    pub(crate) fn tls_configured(&self) -> bool {
        self.tls_roots.is_some()
    }

    /// Key the pool dedupes on: url plus digests of the TLS material.
    /// Two endpoints with the same url but different trust roots or
    /// client certs must not share a channel.
    pub(crate) fn pool_key(&self) -> (String, [u8; 32], [u8; 32]) {
        let roots_hash = Sha256::digest(self.tls_roots.as_deref().unwrap_or_default()).into();
        let cert_hash = Sha256::digest(self.client_cert.as_deref().unwrap_or_default()).into();
        (self.url.clone(), roots_hash, cert_hash)
    }

    /// The url rewritten to the scheme the transport understands.
    fn transport_url(&self) -> Result<String> {
        let url = &self.url;
        let rewritten = if let Some(rest) = url.strip_prefix("grpcs://") {
            format!("https://{rest}")
        } else if let Some(rest) = url.strip_prefix("grpc://") {
            format!("http://{rest}")
        } else if url.starts_with("http://") || url.starts_with("https://") {
            url.clone()
        } else {
            return Err(Error::InvalidUrl {
                url: url.clone(),
                reason: "expected a grpc://, grpcs://, http:// or https:// url".into(),
            });
        };
        Ok(rewritten)
    }

    /// Build the transport channel. The channel connects lazily: the
    /// dial happens on first use and broken transports re-dial on the
    /// next call.
    pub(crate) fn open(&self) -> Result<Channel> {
        let url = self.transport_url()?;
        let mut builder = tonic::transport::Endpoint::from_shared(url.clone())
            .map_err(|e| Error::InvalidUrl { url, reason: e.to_string() })?
            .connect_timeout(self.options.dial_timeout)
            .keep_alive_timeout(self.options.keep_alive_timeout)
            .keep_alive_while_idle(true);

        if let Some(interval) = self.options.keep_alive_interval {
            builder = builder.http2_keep_alive_interval(interval);
        }

        if let Some(roots) = &self.tls_roots {
            let mut tls = ClientTlsConfig::new().ca_certificate(Certificate::from_pem(roots));
            if let Some(name) = &self.server_name_override {
                tls = tls.domain_name(name.clone());
            }
            if let (Some(cert), Some(key)) = (&self.client_cert, &self.client_key) {
                tls = tls.identity(TlsIdentity::from_pem(cert, key));
            }
            builder = builder.tls_config(tls).map_err(|e| Error::Tls(e.to_string()))?;
        }

        Ok(builder.connect_lazy())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scheme_rewrite() {
        assert_eq!(
            Endpoint::new("grpcs://peer0.org1:7051").transport_url().unwrap(),
            "https://peer0.org1:7051"
        );
        assert_eq!(
            Endpoint::new("grpc://peer0.org1:7051").transport_url().unwrap(),
            "http://peer0.org1:7051"
        );
        assert_matches::assert_matches!(
            Endpoint::new("peer0.org1:7051").transport_url(),
            Err(Error::InvalidUrl { .. })
        );
    }

    #[test]
    fn pool_key_distinguishes_tls_material() {
        let plain = Endpoint::new("grpcs://peer0:7051");
        let with_roots = Endpoint::new("grpcs://peer0:7051").with_tls_roots(b"root-a".to_vec());
        let other_roots = Endpoint::new("grpcs://peer0:7051").with_tls_roots(b"root-b".to_vec());

        assert_ne!(plain.pool_key(), with_roots.pool_key());
        assert_ne!(with_roots.pool_key(), other_roots.pool_key());
        assert_eq!(
            with_roots.pool_key(),
            Endpoint::new("grpcs://peer0:7051").with_tls_roots(b"root-a".to_vec()).pool_key()
        );
    }

    #[tokio::test]
    async fn lazy_open_succeeds_without_a_listener() {
        // connect_lazy defers the dial, so building a channel to a
        // nonexistent host must succeed.
        let endpoint = Endpoint::new("grpc://nonexistent.invalid:7051");
        endpoint.open().unwrap();
    }
}
