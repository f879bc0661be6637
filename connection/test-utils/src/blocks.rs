// Copyright (c) 2024 The Weft Authors

//! Builders for well-formed block frames.
//!
//! The full-block builder assembles the complete envelope nesting
//! (payload → transaction → action payload → endorsed action → response
//! payload → chaincode action) so parsing code is exercised against
//! realistic frames, with the validation filter attached at metadata
//! index 2.

use prost::Message;
use weft_protocol::{
    common::{
        Block, BlockData, BlockHeader, BlockMetadata, ChannelHeader, Envelope, Header,
        HeaderType, Payload, SignatureHeader, Status,
    },
    events::{
        deliver_response, DeliverResponse, FilteredBlock, FilteredChaincodeAction,
        FilteredTransaction, FilteredTransactionActions,
    },
    peer::{
        ChaincodeAction, ChaincodeActionPayload, ChaincodeEndorsedAction, ChaincodeEvent,
        ProposalResponsePayload, Response, Transaction, TransactionAction, TxValidationCode,
    },
};

/// One transaction in a built block.
#[derive(Clone, Debug)]
pub struct TxSpec {
    pub tx_id: String,
    pub code: TxValidationCode,
    pub event: Option<ChaincodeEvent>,
}

impl TxSpec {
    pub fn valid(tx_id: &str) -> Self {
        Self { tx_id: tx_id.to_owned(), code: TxValidationCode::Valid, event: None }
    }

    pub fn with_code(tx_id: &str, code: TxValidationCode) -> Self {
        Self { tx_id: tx_id.to_owned(), code, event: None }
    }

    pub fn with_event(tx_id: &str, event: ChaincodeEvent) -> Self {
        Self { tx_id: tx_id.to_owned(), code: TxValidationCode::Valid, event: Some(event) }
    }
}

/// A status frame, e.g. the terminal SUCCESS after an end block.
pub fn status_frame(status: Status) -> DeliverResponse {
    DeliverResponse { r#type: Some(deliver_response::Type::Status(status as i32)) }
}

/// A full-block frame containing the given transactions.
pub fn full_block(channel_id: &str, number: u64, txs: &[TxSpec]) -> DeliverResponse {
    let mut envelopes = Vec::with_capacity(txs.len());
    let mut filter = Vec::with_capacity(txs.len());

    for tx in txs {
        envelopes.push(tx_envelope(channel_id, tx).encode_to_vec());
        filter.push(tx.code as i32 as u8);
    }

    // Index 2 of the metadata table is the validation filter.
    let mut metadata = vec![Vec::new(), Vec::new(), filter];
    metadata.resize(5, Vec::new());

    let block = Block {
        header: Some(BlockHeader {
            number,
            previous_hash: vec![0xaa; 32],
            data_hash: vec![0xbb; 32],
        }),
        data: Some(BlockData { data: envelopes }),
        metadata: Some(BlockMetadata { metadata }),
    };
    DeliverResponse { r#type: Some(deliver_response::Type::Block(block)) }
}

/// A filtered-block frame containing the given transactions.
pub fn filtered_block(channel_id: &str, number: u64, txs: &[TxSpec]) -> DeliverResponse {
    let filtered = FilteredBlock {
        channel_id: channel_id.to_owned(),
        number,
        filtered_transactions: txs
            .iter()
            .map(|tx| FilteredTransaction {
                txid: tx.tx_id.clone(),
                r#type: HeaderType::EndorserTransaction as i32,
                tx_validation_code: tx.code as i32,
                data: tx.event.as_ref().map(|event| {
                    weft_protocol::events::filtered_transaction::Data::TransactionActions(
                        FilteredTransactionActions {
                            chaincode_actions: vec![FilteredChaincodeAction {
                                chaincode_event: Some(event.clone()),
                            }],
                        },
                    )
                }),
            })
            .collect(),
    };
    DeliverResponse { r#type: Some(deliver_response::Type::FilteredBlock(filtered)) }
}

fn tx_envelope(channel_id: &str, tx: &TxSpec) -> Envelope {
    let channel_header = ChannelHeader {
        r#type: HeaderType::EndorserTransaction as i32,
        version: 0,
        timestamp: None,
        channel_id: channel_id.to_owned(),
        tx_id: tx.tx_id.clone(),
        epoch: 0,
        extension: Vec::new(),
        tls_cert_hash: Vec::new(),
    };
    let signature_header = SignatureHeader { creator: Vec::new(), nonce: Vec::new() };

    let action = ChaincodeAction {
        results: Vec::new(),
        events: tx.event.as_ref().map(|e| e.encode_to_vec()).unwrap_or_default(),
        response: Some(Response { status: 200, message: String::new(), payload: Vec::new() }),
        chaincode_id: None,
    };
    let response_payload = ProposalResponsePayload {
        proposal_hash: Vec::new(),
        extension: action.encode_to_vec(),
    };
    let endorsed = ChaincodeEndorsedAction {
        proposal_response_payload: response_payload.encode_to_vec(),
        endorsements: Vec::new(),
    };
    let action_payload = ChaincodeActionPayload {
        chaincode_proposal_payload: Vec::new(),
        action: Some(endorsed),
    };
    let transaction = Transaction {
        actions: vec![TransactionAction {
            header: signature_header.encode_to_vec(),
            payload: action_payload.encode_to_vec(),
        }],
    };

    let payload = Payload {
        header: Some(Header {
            channel_header: channel_header.encode_to_vec(),
            signature_header: signature_header.encode_to_vec(),
        }),
        data: transaction.encode_to_vec(),
    };
    Envelope { payload: payload.encode_to_vec(), signature: Vec::new() }
}
