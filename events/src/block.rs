// Copyright (c) 2024 The Weft Authors

//! The consumed view of delivered blocks.
//!
//! Wire blocks arrive either full (complete envelopes plus the
//! validation filter in the metadata table) or filtered (txids and
//! validation codes only). Both decode to the same [`BlockEvent`] shape
//! so listeners do not care which mode the stream runs in.

use crate::{Error, Result};
use prost::Message;
use weft_protocol::{
    common::{Block, ChannelHeader, Envelope, Header, HeaderType, Payload},
    events::{filtered_transaction, FilteredBlock},
    peer::{
        ChaincodeAction, ChaincodeActionPayload, ChaincodeEvent, ProposalResponsePayload,
        Transaction, TxValidationCode,
    },
};

/// A chaincode event with its position in the block.
#[derive(Clone, Debug, PartialEq)]
pub struct ChaincodeEventRecord {
    pub chaincode_id: String,
    pub event_name: String,
    /// Empty in filtered mode; the payload does not survive filtering.
    pub payload: Vec<u8>,
}

/// One transaction of a delivered block.
#[derive(Clone, Debug, PartialEq)]
pub struct TransactionEvent {
    pub tx_id: String,
    pub header_type: i32,
    pub code: TxValidationCode,
    pub events: Vec<ChaincodeEventRecord>,
}

impl TransactionEvent {
    pub fn is_valid(&self) -> bool {
        self.code == TxValidationCode::Valid
    }
}

/// A delivered block, decoded to the view listeners consume.
#[derive(Clone, Debug, PartialEq)]
pub struct BlockEvent {
    pub channel_id: String,
    pub number: u64,
    pub transactions: Vec<TransactionEvent>,
    /// Whether this event came from a filtered stream.
    pub filtered: bool,
}

impl BlockEvent {
    /// Find a transaction by id.
    pub fn transaction(&self, tx_id: &str) -> Option<&TransactionEvent> {
        self.transactions.iter().find(|tx| tx.tx_id == tx_id)
    }

    /// Decode a full block: envelopes carry the channel, txids and
    /// chaincode events; the metadata filter carries validation codes.
    pub fn from_full(block: &Block) -> Result<Self> {
        let header = block
            .header
            .as_ref()
            .ok_or_else(|| Error::MalformedBlock("missing block header".into()))?;
        let data = block.data.as_ref().map(|d| d.data.as_slice()).unwrap_or_default();
        let filter = block.transactions_filter();

        let mut channel_id = String::new();
        let mut transactions = Vec::with_capacity(data.len());

        for (index, envelope_bytes) in data.iter().enumerate() {
            let channel_header = decode_channel_header(envelope_bytes)?;
            if channel_id.is_empty() {
                channel_id = channel_header.channel_id.clone();
            }

            let code = filter
                .get(index)
                .map(|byte| {
                    TxValidationCode::try_from(*byte as i32)
                        .unwrap_or(TxValidationCode::InvalidOtherReason)
                })
                .unwrap_or(TxValidationCode::NotValidated);

            let events = if channel_header.r#type == HeaderType::EndorserTransaction as i32 {
                chaincode_events(envelope_bytes)?
            } else {
                Vec::new()
            };

            transactions.push(TransactionEvent {
                tx_id: channel_header.tx_id,
                header_type: channel_header.r#type,
                code,
                events,
            });
        }

        Ok(Self { channel_id, number: header.number, transactions, filtered: false })
    }

    /// Decode a filtered block.
    pub fn from_filtered(block: &FilteredBlock) -> Self {
        let transactions = block
            .filtered_transactions
            .iter()
            .map(|tx| {
                let events = match &tx.data {
                    Some(filtered_transaction::Data::TransactionActions(actions)) => actions
                        .chaincode_actions
                        .iter()
                        .filter_map(|action| action.chaincode_event.as_ref())
                        .map(|event| ChaincodeEventRecord {
                            chaincode_id: event.chaincode_id.clone(),
                            event_name: event.event_name.clone(),
                            payload: event.payload.clone(),
                        })
                        .collect(),
                    None => Vec::new(),
                };
                TransactionEvent {
                    tx_id: tx.txid.clone(),
                    header_type: tx.r#type,
                    code: TxValidationCode::try_from(tx.tx_validation_code)
                        .unwrap_or(TxValidationCode::InvalidOtherReason),
                    events,
                }
            })
            .collect();

        Self {
            channel_id: block.channel_id.clone(),
            number: block.number,
            transactions,
            filtered: true,
        }
    }
}

fn decode_channel_header(envelope_bytes: &[u8]) -> Result<ChannelHeader> {
    let envelope = Envelope::decode(envelope_bytes)
        .map_err(|e| Error::MalformedBlock(format!("envelope: {e}")))?;
    let payload = Payload::decode(envelope.payload.as_slice())
        .map_err(|e| Error::MalformedBlock(format!("payload: {e}")))?;
    let header: Header = payload
        .header
        .ok_or_else(|| Error::MalformedBlock("missing payload header".into()))?;
    ChannelHeader::decode(header.channel_header.as_slice())
        .map_err(|e| Error::MalformedBlock(format!("channel header: {e}")))
}

/// Walk an endorser transaction down to its chaincode events.
fn chaincode_events(envelope_bytes: &[u8]) -> Result<Vec<ChaincodeEventRecord>> {
    let envelope = Envelope::decode(envelope_bytes)
        .map_err(|e| Error::MalformedBlock(format!("envelope: {e}")))?;
    let payload = Payload::decode(envelope.payload.as_slice())
        .map_err(|e| Error::MalformedBlock(format!("payload: {e}")))?;
    let transaction = Transaction::decode(payload.data.as_slice())
        .map_err(|e| Error::MalformedBlock(format!("transaction: {e}")))?;

    let mut events = Vec::new();
    for action in &transaction.actions {
        let action_payload = ChaincodeActionPayload::decode(action.payload.as_slice())
            .map_err(|e| Error::MalformedBlock(format!("action payload: {e}")))?;
        let Some(endorsed) = action_payload.action else { continue };
        let response_payload =
            ProposalResponsePayload::decode(endorsed.proposal_response_payload.as_slice())
                .map_err(|e| Error::MalformedBlock(format!("response payload: {e}")))?;
        let chaincode_action = ChaincodeAction::decode(response_payload.extension.as_slice())
            .map_err(|e| Error::MalformedBlock(format!("chaincode action: {e}")))?;
        if chaincode_action.events.is_empty() {
            continue;
        }
        let event = ChaincodeEvent::decode(chaincode_action.events.as_slice())
            .map_err(|e| Error::MalformedBlock(format!("chaincode event: {e}")))?;
        events.push(ChaincodeEventRecord {
            chaincode_id: event.chaincode_id,
            event_name: event.event_name,
            payload: event.payload,
        });
    }
    Ok(events)
}

#[cfg(test)]
mod tests {
    use super::*;
    use weft_connection_test_utils::blocks::{filtered_block, full_block, TxSpec};
    use weft_protocol::events::deliver_response;

    fn unwrap_full(frame: weft_protocol::events::DeliverResponse) -> Block {
        match frame.r#type {
            Some(deliver_response::Type::Block(block)) => block,
            _ => panic!("expected a full block frame"),
        }
    }

    fn unwrap_filtered(frame: weft_protocol::events::DeliverResponse) -> FilteredBlock {
        match frame.r#type {
            Some(deliver_response::Type::FilteredBlock(block)) => block,
            _ => panic!("expected a filtered block frame"),
        }
    }

    #[test]
    fn full_block_decodes_txids_and_codes() {
        let frame = full_block(
            "trade",
            9,
            &[
                TxSpec::valid("tx-a"),
                TxSpec::with_code("tx-b", TxValidationCode::MvccReadConflict),
            ],
        );
        let event = BlockEvent::from_full(&unwrap_full(frame)).unwrap();

        assert_eq!(event.channel_id, "trade");
        assert_eq!(event.number, 9);
        assert!(!event.filtered);
        assert_eq!(event.transactions.len(), 2);
        assert!(event.transaction("tx-a").unwrap().is_valid());
        assert_eq!(
            event.transaction("tx-b").unwrap().code,
            TxValidationCode::MvccReadConflict
        );
    }

    #[test]
    fn full_block_carries_chaincode_events() {
        let event_proto = ChaincodeEvent {
            chaincode_id: "asset".into(),
            tx_id: "tx-a".into(),
            event_name: "created".into(),
            payload: b"asset-1".to_vec(),
        };
        let frame = full_block("trade", 3, &[TxSpec::with_event("tx-a", event_proto)]);
        let event = BlockEvent::from_full(&unwrap_full(frame)).unwrap();

        let tx = event.transaction("tx-a").unwrap();
        assert_eq!(tx.events.len(), 1);
        assert_eq!(tx.events[0].chaincode_id, "asset");
        assert_eq!(tx.events[0].event_name, "created");
        assert_eq!(tx.events[0].payload, b"asset-1");
    }

    #[test]
    fn filtered_block_decodes_to_the_same_view() {
        let frame = filtered_block(
            "trade",
            9,
            &[TxSpec::with_code("tx-b", TxValidationCode::EndorsementPolicyFailure)],
        );
        let event = BlockEvent::from_filtered(&unwrap_filtered(frame));

        assert!(event.filtered);
        assert_eq!(event.number, 9);
        assert_eq!(
            event.transaction("tx-b").unwrap().code,
            TxValidationCode::EndorsementPolicyFailure
        );
    }

    #[test]
    fn missing_header_is_malformed() {
        let block = Block::default();
        assert_matches::assert_matches!(
            BlockEvent::from_full(&block),
            Err(Error::MalformedBlock(_))
        );
    }
}
