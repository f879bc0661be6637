// Copyright (c) 2024 The Weft Authors

//! Peer deliver schema: full and filtered block streams.
//!
//! Filtered mode is the reduced view for deployments whose clients may
//! not read ledger contents: transaction ids and validation codes
//! survive, read/write sets do not.

use crate::peer::ChaincodeEvent;

/// The reduced view of a committed block.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct FilteredBlock {
    #[prost(string, tag = "1")]
    pub channel_id: ::prost::alloc::string::String,
    #[prost(uint64, tag = "2")]
    pub number: u64,
    #[prost(message, repeated, tag = "3")]
    pub filtered_transactions: ::prost::alloc::vec::Vec<FilteredTransaction>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct FilteredTransaction {
    #[prost(string, tag = "1")]
    pub txid: ::prost::alloc::string::String,
    /// A [`super::common::HeaderType`] value.
    #[prost(enumeration = "super::common::HeaderType", tag = "2")]
    pub r#type: i32,
    #[prost(enumeration = "super::peer::TxValidationCode", tag = "3")]
    pub tx_validation_code: i32,
    #[prost(oneof = "filtered_transaction::Data", tags = "4")]
    pub data: ::core::option::Option<filtered_transaction::Data>,
}

pub mod filtered_transaction {
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Data {
        #[prost(message, tag = "4")]
        TransactionActions(super::FilteredTransactionActions),
    }
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct FilteredTransactionActions {
    #[prost(message, repeated, tag = "1")]
    pub chaincode_actions: ::prost::alloc::vec::Vec<FilteredChaincodeAction>,
}

/// Only the chaincode event survives filtering; its payload is dropped.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct FilteredChaincodeAction {
    #[prost(message, optional, tag = "1")]
    pub chaincode_event: ::core::option::Option<ChaincodeEvent>,
}

/// One frame of a peer deliver stream.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct DeliverResponse {
    #[prost(oneof = "deliver_response::Type", tags = "1, 2, 3")]
    pub r#type: ::core::option::Option<deliver_response::Type>,
}

pub mod deliver_response {
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Type {
        #[prost(enumeration = "super::super::common::Status", tag = "1")]
        Status(i32),
        #[prost(message, tag = "2")]
        Block(super::super::common::Block),
        #[prost(message, tag = "3")]
        FilteredBlock(super::FilteredBlock),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::peer::TxValidationCode;
    use prost::Message;

    #[test]
    fn filtered_block_roundtrip() {
        let block = FilteredBlock {
            channel_id: "trade".into(),
            number: 42,
            filtered_transactions: vec![FilteredTransaction {
                txid: "abc123".into(),
                r#type: crate::common::HeaderType::EndorserTransaction as i32,
                tx_validation_code: TxValidationCode::Valid as i32,
                data: None,
            }],
        };
        let back = FilteredBlock::decode(block.encode_to_vec().as_slice()).unwrap();
        assert_eq!(back, block);
        assert_eq!(back.filtered_transactions[0].tx_validation_code, 0);
    }
}
