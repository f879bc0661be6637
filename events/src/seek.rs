// Copyright (c) 2024 The Weft Authors

//! Seek envelope construction and start/stop position semantics.

use crate::{Error, Result};
use prost::Message;
use weft_identity::IdentityContext;
use weft_protocol::{
    common::{ChannelHeader, Envelope, Header, HeaderType, Payload, SignatureHeader},
    orderer::{seek_info, SeekInfo, SeekPosition},
};

/// Where a deliver session starts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StartPosition {
    /// The first block on the chain.
    Oldest,
    /// The next block to be produced (the default).
    Newest,
    /// An absolute block number.
    Specified(u64),
}

impl Default for StartPosition {
    fn default() -> Self {
        Self::Newest
    }
}

/// Where a deliver session ends.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EndPosition {
    /// No end: keep streaming as blocks are produced (the default).
    Newest,
    /// An absolute block number, inclusive.
    Specified(u64),
}

impl Default for EndPosition {
    fn default() -> Self {
        Self::Newest
    }
}

impl EndPosition {
    /// The block number that ends the session, if bounded.
    pub fn bound(&self) -> Option<u64> {
        match self {
            Self::Newest => None,
            Self::Specified(number) => Some(*number),
        }
    }
}

/// Check `end >= start`, treating `Newest` as larger than any number
/// and `Oldest` as smaller. Fails before any stream is opened.
pub(crate) fn validate_range(start: StartPosition, end: EndPosition) -> Result<()> {
    match (start, end) {
        (_, EndPosition::Newest) => Ok(()),
        (StartPosition::Newest, EndPosition::Specified(end)) => Err(Error::BadArgs(format!(
            "end block {end} is below the newest start position"
        ))),
        (StartPosition::Oldest, _) => Ok(()),
        (StartPosition::Specified(start), EndPosition::Specified(end)) if end < start => {
            Err(Error::BadArgs(format!("end block {end} is below start block {start}")))
        }
        _ => Ok(()),
    }
}

fn start_position(start: StartPosition) -> SeekPosition {
    match start {
        StartPosition::Oldest => SeekPosition::oldest(),
        StartPosition::Newest => SeekPosition::newest(),
        StartPosition::Specified(number) => SeekPosition::specified(number),
    }
}

fn stop_position(end: EndPosition) -> SeekPosition {
    match end {
        // Unbounded: seek to the largest possible block number and let
        // the server keep the stream open.
        EndPosition::Newest => SeekPosition::specified(u64::MAX),
        EndPosition::Specified(number) => SeekPosition::specified(number),
    }
}

/// Build the signed seek envelope that opens a deliver session.
pub fn seek_envelope(
    ctx: &IdentityContext,
    channel_id: &str,
    start: StartPosition,
    end: EndPosition,
) -> Result<Envelope> {
    let seek = SeekInfo {
        start: Some(start_position(start)),
        stop: Some(stop_position(end)),
        behavior: seek_info::SeekBehavior::BlockUntilReady as i32,
        error_response: seek_info::SeekErrorResponse::Strict as i32,
    };

    let channel_header = ChannelHeader {
        r#type: HeaderType::DeliverSeekInfo as i32,
        version: 0,
        timestamp: Some(std::time::SystemTime::now().into()),
        channel_id: channel_id.to_owned(),
        tx_id: ctx.tx_id().to_owned(),
        epoch: 0,
        extension: Vec::new(),
        tls_cert_hash: Vec::new(),
    };
    let signature_header = SignatureHeader {
        creator: ctx.creator(),
        nonce: ctx.nonce().to_vec(),
    };

    let payload = Payload {
        header: Some(Header {
            channel_header: channel_header.encode_to_vec(),
            signature_header: signature_header.encode_to_vec(),
        }),
        data: seek.encode_to_vec(),
    }
    .encode_to_vec();

    let signature = ctx.sign(&payload)?;
    Ok(Envelope { payload, signature })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_validation() {
        validate_range(StartPosition::Specified(5), EndPosition::Specified(7)).unwrap();
        validate_range(StartPosition::Specified(5), EndPosition::Specified(5)).unwrap();
        validate_range(StartPosition::Oldest, EndPosition::Specified(0)).unwrap();
        validate_range(StartPosition::Newest, EndPosition::Newest).unwrap();

        assert_matches::assert_matches!(
            validate_range(StartPosition::Specified(7), EndPosition::Specified(5)),
            Err(Error::BadArgs(_))
        );
        assert_matches::assert_matches!(
            validate_range(StartPosition::Newest, EndPosition::Specified(5)),
            Err(Error::BadArgs(_))
        );
    }
}
