// Copyright (c) 2024 The Weft Authors

//! Transaction envelope construction and orderer broadcast.

use crate::{CallTimeouts, Error, PeerEndorsement, Result, SignedProposalBundle};
use prost::Message;
use tracing::debug;
use weft_connection::OrdererConnection;
use weft_identity::IdentityContext;
use weft_protocol::{
    common::{Envelope, Payload, Status},
    peer::{ChaincodeActionPayload, ChaincodeEndorsedAction, Transaction, TransactionAction},
};

/// Wrap the endorsed responses into the envelope the orderer consumes.
///
/// The envelope reuses the proposal's header verbatim and is signed by
/// the same identity that signed the proposal.
pub fn build_transaction_envelope(
    ctx: &IdentityContext,
    bundle: &SignedProposalBundle,
    valid: &[PeerEndorsement],
) -> Result<Envelope> {
    if valid.is_empty() {
        return Err(Error::BadArgs("transaction needs at least one endorsement".into()));
    }
    // The coordinator already enforces byte-identical response
    // payloads; a mixed set here is a caller bug.
    if valid.iter().any(|e| e.response_bytes != valid[0].response_bytes) {
        return Err(Error::DivergentResults {
            peers: valid.iter().map(|e| e.peer.clone()).collect(),
        });
    }

    let endorsed = ChaincodeEndorsedAction {
        proposal_response_payload: valid[0].response_bytes.clone(),
        endorsements: valid.iter().map(|e| e.endorsement.clone()).collect(),
    };
    let action_payload = ChaincodeActionPayload {
        chaincode_proposal_payload: bundle.payload_no_transient.clone(),
        action: Some(endorsed),
    };
    let transaction = Transaction {
        actions: vec![TransactionAction {
            header: bundle.header.signature_header.clone(),
            payload: action_payload.encode_to_vec(),
        }],
    };

    let payload = Payload {
        header: Some(bundle.header.clone()),
        data: transaction.encode_to_vec(),
    }
    .encode_to_vec();
    let signature = ctx.sign(&payload)?;

    Ok(Envelope { payload, signature })
}

/// Stream the envelope to the orderer and wait for its single ack.
///
/// Two timeout phases, distinguishable to callers: the send itself
/// failing to complete within budget is [`Error::SystemTimeout`] (a
/// local failure); the ack not arriving after a completed send is
/// [`Error::RequestTimeout`] (a remote failure). A SERVICE_UNAVAILABLE
/// ack is the one retryable rejection.
pub async fn broadcast(
    orderer: &dyn OrdererConnection,
    envelope: Envelope,
    timeouts: &CallTimeouts,
) -> Result<()> {
    let ack_future = tokio::time::timeout(timeouts.request, orderer.broadcast(envelope))
        .await
        .map_err(|_| Error::SystemTimeout(timeouts.request))??;

    let ack = tokio::time::timeout(timeouts.request, ack_future)
        .await
        .map_err(|_| Error::RequestTimeout(timeouts.request))??;

    let status = Status::try_from(ack.status).unwrap_or(Status::Unknown);
    debug!(orderer = %orderer.id(), ?status, info = %ack.info, "broadcast acked");
    match status {
        Status::Success => Ok(()),
        Status::ServiceUnavailable => Err(Error::OrdererUnavailable { info: ack.info }),
        other => Err(Error::OrdererRejected { status: other, info: ack.info }),
    }
}
