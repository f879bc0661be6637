// Copyright (c) 2024 The Weft Authors

//! Endorsement fan-out and collation.

use crate::SignedProposalBundle;
use displaydoc::Display;
use prost::Message;
use std::{sync::Arc, time::Duration};
use tracing::{debug, warn};
use weft_connection::{EndorserConnection, EndpointId};
use weft_protocol::{msp::SerializedIdentity, peer::{Endorsement, ProposalResponse}};

/// One valid endorsement, with everything collation and envelope
/// building need.
#[derive(Clone, Debug)]
pub struct PeerEndorsement {
    pub peer: EndpointId,
    /// MSP id of the endorsing peer, parsed from its endorsement.
    pub msp_id: String,
    pub status: i32,
    /// The chaincode response payload — the application-level result.
    pub payload: Vec<u8>,
    /// The serialized proposal response payload. Must be byte-identical
    /// across every valid endorsement of one proposal.
    pub response_bytes: Vec<u8>,
    pub endorsement: Endorsement,
}

/// Why one peer's dispatch produced no valid endorsement.
#[derive(Debug, Display)]
pub enum PeerError {
    /// Deadline of {0:?} exceeded
    Timeout(Duration),
    /// Transport failure: {0}
    Transport(weft_connection::Error),
    /// Endorser refused with status {status}: {message}
    Refused { status: i32, message: String },
    /// Response payload diverged from other endorsers
    Divergent,
}

impl PeerError {
    pub fn should_retry(&self) -> bool {
        match self {
            Self::Timeout(_) => true,
            Self::Transport(e) => e.should_retry(),
            Self::Refused { .. } | Self::Divergent => false,
        }
    }
}

/// The collated result of one fan-out.
#[derive(Debug, Default)]
pub struct EndorsementOutcome {
    pub valid: Vec<PeerEndorsement>,
    pub errors: Vec<(EndpointId, PeerError)>,
}

impl EndorsementOutcome {
    /// The peers that produced a valid endorsement.
    pub fn valid_peers(&self) -> Vec<EndpointId> {
        self.valid.iter().map(|e| e.peer.clone()).collect()
    }
}

/// Dispatch `bundle` to every target concurrently and collate.
///
/// Each dispatch has its own deadline; a timed-out peer is recorded and
/// never blocks completion once the others have resolved. The policy is
/// evaluated by the caller: no short-circuit happens here, because
/// policies may require every response. Before returning, valid
/// responses are checked for byte-identical response payloads; on
/// divergence every valid response is reclassified as
/// [`PeerError::Divergent`], since the orderer would reject the mixed
/// envelope anyway and this yields the better diagnostic.
pub async fn endorse(
    bundle: &SignedProposalBundle,
    targets: &[Arc<dyn EndorserConnection>],
    per_peer_deadline: Duration,
) -> EndorsementOutcome {
    let proposal = bundle.signed_proposal();

    let dispatches = targets.iter().map(|target| {
        let proposal = proposal.clone();
        let target = target.clone();
        async move {
            let peer = target.id();
            let outcome =
                tokio::time::timeout(per_peer_deadline, target.process_proposal(proposal)).await;
            (peer, outcome)
        }
    });

    let mut outcome = EndorsementOutcome::default();
    for (peer, dispatch) in futures::future::join_all(dispatches).await {
        match dispatch {
            Err(_) => {
                warn!(%peer, ?per_peer_deadline, "endorser timed out");
                outcome.errors.push((peer, PeerError::Timeout(per_peer_deadline)));
            }
            Ok(Err(e)) => {
                warn!(%peer, error = %e, "endorser dispatch failed");
                outcome.errors.push((peer, PeerError::Transport(e)));
            }
            Ok(Ok(response)) => classify(&mut outcome, peer, response),
        }
    }

    check_divergence(&mut outcome);
    debug!(
        tx_id = %bundle.tx_id,
        valid = outcome.valid.len(),
        errors = outcome.errors.len(),
        "endorsement collated"
    );
    outcome
}

/// A response is valid iff its status is in [200, 400) and it carries
/// an endorsement.
fn classify(outcome: &mut EndorsementOutcome, peer: EndpointId, response: ProposalResponse) {
    let status = response.response.as_ref().map(|r| r.status).unwrap_or_default();
    let message = response.response.as_ref().map(|r| r.message.clone()).unwrap_or_default();

    let Some(endorsement) = response.endorsement else {
        outcome.errors.push((peer, PeerError::Refused { status, message }));
        return;
    };
    if !(200..400).contains(&status) {
        outcome.errors.push((peer, PeerError::Refused { status, message }));
        return;
    }

    let msp_id = SerializedIdentity::decode(endorsement.endorser.as_slice())
        .map(|identity| identity.mspid)
        .unwrap_or_default();

    outcome.valid.push(PeerEndorsement {
        peer,
        msp_id,
        status,
        payload: response.response.map(|r| r.payload).unwrap_or_default(),
        response_bytes: response.payload,
        endorsement,
    });
}

fn check_divergence(outcome: &mut EndorsementOutcome) {
    let distinct = outcome
        .valid
        .iter()
        .map(|e| e.response_bytes.as_slice())
        .collect::<std::collections::HashSet<_>>()
        .len();
    if distinct <= 1 {
        return;
    }

    warn!(groups = distinct, "endorsement responses diverged");
    for endorsement in outcome.valid.drain(..) {
        outcome.errors.push((endorsement.peer, PeerError::Divergent));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn endorsement(peer: &str, response_bytes: &[u8]) -> PeerEndorsement {
        PeerEndorsement {
            peer: EndpointId::from(peer),
            msp_id: "Org1MSP".into(),
            status: 200,
            payload: b"ok".to_vec(),
            response_bytes: response_bytes.to_vec(),
            endorsement: Endorsement::default(),
        }
    }

    #[test]
    fn identical_responses_pass_the_divergence_check() {
        let mut outcome = EndorsementOutcome {
            valid: vec![endorsement("p1", b"same"), endorsement("p2", b"same")],
            errors: Vec::new(),
        };
        check_divergence(&mut outcome);
        assert_eq!(outcome.valid.len(), 2);
        assert!(outcome.errors.is_empty());
    }

    #[test]
    fn divergent_responses_are_all_reclassified() {
        let mut outcome = EndorsementOutcome {
            valid: vec![endorsement("p1", b"a"), endorsement("p2", b"b")],
            errors: Vec::new(),
        };
        check_divergence(&mut outcome);
        assert!(outcome.valid.is_empty());
        assert_eq!(outcome.errors.len(), 2);
        assert!(outcome.errors.iter().all(|(_, e)| matches!(e, PeerError::Divergent)));
    }
}
