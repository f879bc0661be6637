// Copyright (c) 2024 The Weft Authors

//! Connection error types.

use displaydoc::Display;
use thiserror::Error;
use tonic::{Code, Status};

pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by endpoints, the pool, and gRPC-backed connections.
#[derive(Debug, Display, Error)]
pub enum Error {
    /// Invalid endpoint url {url}: {reason}
    InvalidUrl { url: String, reason: String },

    /// TLS configuration rejected: {0}
    Tls(String),

    /// gRPC failure: {0}
    Grpc(Status),

    /// Transport failure: {0}
    Transport(String),

    /// Stream ended before the expected response arrived
    StreamClosed,
}

impl Error {
    /// UNAVAILABLE is the one transport condition worth retrying; the
    /// channel re-dials transparently on the next call.
    pub fn is_unavailable(&self) -> bool {
        match self {
            Self::Grpc(status) => status.code() == Code::Unavailable,
            Self::Transport(_) | Self::StreamClosed => true,
            _ => false,
        }
    }

    /// Whether a caller-driven retry of the same call can succeed.
    pub fn should_retry(&self) -> bool {
        self.is_unavailable()
    }
}

impl From<Status> for Error {
    fn from(src: Status) -> Self {
        Error::Grpc(src)
    }
}

impl From<tonic::transport::Error> for Error {
    fn from(src: tonic::transport::Error) -> Self {
        Error::Transport(src.to_string())
    }
}
