// Copyright (c) 2024 The Weft Authors

//! Mock endorser connection.

use async_trait::async_trait;
use prost::Message;
use sha2::{Digest, Sha256};
use std::{sync::Mutex, time::Duration};
use tonic::Status;
use weft_connection::{EndorserConnection, EndpointId, Error, Result};
use weft_protocol::{
    msp::SerializedIdentity,
    peer::{
        ChaincodeAction, Endorsement, ProposalResponse, ProposalResponsePayload, Response,
        SignedProposal,
    },
};

enum Reply {
    /// A valid endorsement: status 200 plus an endorsement signature.
    Ok { payload: Vec<u8> },
    /// A chaincode-level failure: the given status, no endorsement.
    Refuse { status: i32, message: String },
    /// A transport-level failure.
    Unavailable,
    /// Never respond; exercises per-peer deadlines.
    Hang,
}

/// An endorser that replies the same way to every proposal.
///
/// Valid replies are deterministic in `(proposal bytes, payload)`, so
/// two mocks configured with the same payload produce byte-identical
/// response payloads — and two with different payloads exercise the
/// divergence check.
pub struct MockEndorser {
    id: EndpointId,
    msp_id: String,
    delay: Option<Duration>,
    reply: Reply,
    received: Mutex<Vec<SignedProposal>>,
}

impl MockEndorser {
    pub fn ok(url: &str, payload: impl Into<Vec<u8>>) -> Self {
        Self::new(url, Reply::Ok { payload: payload.into() })
    }

    pub fn refusing(url: &str, status: i32, message: &str) -> Self {
        Self::new(url, Reply::Refuse { status, message: message.into() })
    }

    pub fn unavailable(url: &str) -> Self {
        Self::new(url, Reply::Unavailable)
    }

    pub fn hanging(url: &str) -> Self {
        Self::new(url, Reply::Hang)
    }

    fn new(url: &str, reply: Reply) -> Self {
        Self {
            id: EndpointId::from(url),
            msp_id: "Org1MSP".to_owned(),
            delay: None,
            reply,
            received: Mutex::new(Vec::new()),
        }
    }

    pub fn with_msp_id(mut self, msp_id: &str) -> Self {
        self.msp_id = msp_id.to_owned();
        self
    }

    /// Respond only after `delay`.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Every proposal this mock has been asked to process.
    pub fn received(&self) -> Vec<SignedProposal> {
        self.received.lock().unwrap().clone()
    }

    fn endorse(&self, proposal: &SignedProposal, payload: &[u8]) -> ProposalResponse {
        let action = ChaincodeAction {
            results: Sha256::digest(&proposal.proposal_bytes).to_vec(),
            events: Vec::new(),
            response: Some(Response {
                status: 200,
                message: String::new(),
                payload: payload.to_vec(),
            }),
            chaincode_id: None,
        };
        let response_payload = ProposalResponsePayload {
            proposal_hash: Sha256::digest(&proposal.proposal_bytes).to_vec(),
            extension: action.encode_to_vec(),
        };
        let endorser = SerializedIdentity {
            mspid: self.msp_id.clone(),
            id_bytes: format!("cert:{}", self.id).into_bytes(),
        };
        ProposalResponse {
            version: 1,
            timestamp: None,
            response: Some(Response {
                status: 200,
                message: String::new(),
                payload: payload.to_vec(),
            }),
            payload: response_payload.encode_to_vec(),
            endorsement: Some(Endorsement {
                endorser: endorser.encode_to_vec(),
                signature: vec![0xee; 8],
            }),
        }
    }
}

#[async_trait]
impl EndorserConnection for MockEndorser {
    fn id(&self) -> EndpointId {
        self.id.clone()
    }

    async fn process_proposal(&self, proposal: SignedProposal) -> Result<ProposalResponse> {
        self.received.lock().unwrap().push(proposal.clone());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match &self.reply {
            Reply::Ok { payload } => Ok(self.endorse(&proposal, payload)),
            Reply::Refuse { status, message } => Ok(ProposalResponse {
                version: 1,
                timestamp: None,
                response: Some(Response {
                    status: *status,
                    message: message.clone(),
                    payload: Vec::new(),
                }),
                payload: Vec::new(),
                endorsement: None,
            }),
            Reply::Unavailable => Err(Error::Grpc(Status::unavailable("mock endorser down"))),
            Reply::Hang => {
                futures::future::pending::<()>().await;
                unreachable!()
            }
        }
    }
}
