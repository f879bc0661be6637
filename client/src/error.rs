// Copyright (c) 2024 The Weft Authors

//! Submission pipeline error types.
//!
//! The orchestrator recovers nothing on the caller's behalf: it returns
//! the most specific error it has, carrying the peer identity, status
//! and code context a caller needs to retry deterministically. Retries
//! are always the caller's responsibility — transaction-id uniqueness
//! prevents accidental double-submit only at the ledger level.

use crate::endorse::PeerError;
use displaydoc::Display;
use std::time::Duration;
use thiserror::Error;
use weft_connection::EndpointId;
use weft_events::CloseReason;
use weft_protocol::{common::Status, peer::TxValidationCode};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum Error {
    /// Bad arguments: {0}
    BadArgs(String),

    /// Identity failure: {0}
    Identity(#[from] weft_identity::Error),

    /// Transport failure: {0}
    Connection(#[from] weft_connection::Error),

    /// Endorsement policy not satisfied with {valid} valid responses
    EndorsementPolicyFailure {
        /// How many valid responses were collected.
        valid: usize,
        /// What went wrong per peer, including valid-but-insufficient
        /// sets.
        errors: Vec<(EndpointId, PeerError)>,
    },

    /// Endorsers returned divergent results: {peers:?}
    DivergentResults { peers: Vec<EndpointId> },

    /// Broadcast send did not complete within {0:?}
    SystemTimeout(Duration),

    /// Broadcast ack did not arrive within {0:?}
    RequestTimeout(Duration),

    /// Orderer is unavailable: {info}
    OrdererUnavailable { info: String },

    /// Orderer rejected the envelope with {status:?}: {info}
    OrdererRejected { status: Status, info: String },

    /// Transaction committed with validation code {0:?}
    CommitFailure(TxValidationCode),

    /// Commit wait timed out; responded {responded:?}, outstanding {outstanding:?}
    CommitTimeout { responded: Vec<EndpointId>, outstanding: Vec<EndpointId> },

    /// Event stream failure: {0}
    EventStream(CloseReason),

    /// Event service failure: {0}
    Events(weft_events::Error),

    /// Discovery returned an error: {0}
    Discovery(String),
}

impl Error {
    /// Whether retrying the same call can succeed. Commit-stage errors
    /// are never retryable with the same transaction id.
    pub fn should_retry(&self) -> bool {
        match self {
            Self::OrdererUnavailable { .. } => true,
            Self::Connection(e) => e.should_retry(),
            Self::SystemTimeout(_) | Self::RequestTimeout(_) => true,
            _ => false,
        }
    }
}

impl From<weft_events::Error> for Error {
    fn from(src: weft_events::Error) -> Self {
        match src {
            weft_events::Error::CommitFailure(code) => Self::CommitFailure(code),
            weft_events::Error::CommitTimeout { responded, outstanding } => {
                Self::CommitTimeout { responded, outstanding }
            }
            weft_events::Error::StreamTerminated(reason) => Self::EventStream(reason),
            weft_events::Error::BadArgs(message) => Self::BadArgs(message),
            other => Self::Events(other),
        }
    }
}
