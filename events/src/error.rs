// Copyright (c) 2024 The Weft Authors

//! Event service error types.

use crate::CloseReason;
use displaydoc::Display;
use thiserror::Error;
use weft_connection::EndpointId;
use weft_protocol::peer::TxValidationCode;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum Error {
    /// Bad arguments: {0}
    BadArgs(String),

    /// Event service is already started
    AlreadyStarted,

    /// Connection failure: {0}
    Connection(#[from] weft_connection::Error),

    /// Identity failure: {0}
    Identity(#[from] weft_identity::Error),

    /// Malformed block: {0}
    MalformedBlock(String),

    /// Transaction was committed with validation code {0:?}
    CommitFailure(TxValidationCode),

    /// Commit wait timed out; responded {responded:?}, outstanding {outstanding:?}
    CommitTimeout { responded: Vec<EndpointId>, outstanding: Vec<EndpointId> },

    /// Event stream terminated: {0}
    StreamTerminated(CloseReason),
}
