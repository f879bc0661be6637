// Copyright (c) 2024 The Weft Authors

//! Channel-scoped framing shared by every service: headers, payloads,
//! envelopes and blocks.

/// Status codes shared by broadcast acks and deliver status frames.
///
/// The values deliberately mirror HTTP status codes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum Status {
    Unknown = 0,
    Success = 200,
    BadRequest = 400,
    Forbidden = 403,
    NotFound = 404,
    RequestEntityTooLarge = 413,
    InternalServerError = 500,
    NotImplemented = 501,
    ServiceUnavailable = 503,
}

/// Discriminator carried in [`ChannelHeader::r#type`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum HeaderType {
    Message = 0,
    Config = 1,
    ConfigUpdate = 2,
    EndorserTransaction = 3,
    OrdererTransaction = 4,
    DeliverSeekInfo = 5,
    ChaincodePackage = 6,
}

/// Index of each entry in [`BlockMetadata::metadata`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum BlockMetadataIndex {
    Signatures = 0,
    LastConfig = 1,
    /// One validation-code byte per transaction in the block, in order.
    TransactionsFilter = 2,
    Orderer = 3,
    CommitHash = 4,
}

/// Header common to all channel-scoped messages.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ChannelHeader {
    /// A [`HeaderType`] value.
    #[prost(int32, tag = "1")]
    pub r#type: i32,
    /// Message protocol version.
    #[prost(int32, tag = "2")]
    pub version: i32,
    /// Local time when the message was created.
    #[prost(message, optional, tag = "3")]
    pub timestamp: ::core::option::Option<::prost_types::Timestamp>,
    /// The channel this message is bound for.
    #[prost(string, tag = "4")]
    pub channel_id: ::prost::alloc::string::String,
    /// End-to-end transaction tracking id, set by the submitter.
    #[prost(string, tag = "5")]
    pub tx_id: ::prost::alloc::string::String,
    /// Epoch this header was generated in. Always 0 on the current chain.
    #[prost(uint64, tag = "6")]
    pub epoch: u64,
    /// Type-dependent extension, e.g. a serialized chaincode header
    /// extension for endorser transactions.
    #[prost(bytes = "vec", tag = "7")]
    pub extension: ::prost::alloc::vec::Vec<u8>,
    /// Hash of the client TLS certificate when mutual TLS is in use.
    #[prost(bytes = "vec", tag = "8")]
    pub tls_cert_hash: ::prost::alloc::vec::Vec<u8>,
}

/// Identifies who created a message and the entropy that makes the
/// creation unique.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SignatureHeader {
    /// Serialized identity of the creator.
    #[prost(bytes = "vec", tag = "1")]
    pub creator: ::prost::alloc::vec::Vec<u8>,
    /// Arbitrary per-message entropy.
    #[prost(bytes = "vec", tag = "2")]
    pub nonce: ::prost::alloc::vec::Vec<u8>,
}

/// Paired channel and signature headers, serialized.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Header {
    #[prost(bytes = "vec", tag = "1")]
    pub channel_header: ::prost::alloc::vec::Vec<u8>,
    #[prost(bytes = "vec", tag = "2")]
    pub signature_header: ::prost::alloc::vec::Vec<u8>,
}

/// The message contents of an [`Envelope`], with its header.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Payload {
    #[prost(message, optional, tag = "1")]
    pub header: ::core::option::Option<Header>,
    /// Type-dependent contents, per the header type.
    #[prost(bytes = "vec", tag = "2")]
    pub data: ::prost::alloc::vec::Vec<u8>,
}

/// A signed payload; the unit both broadcast and deliver consume.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Envelope {
    /// Serialized [`Payload`]. These exact bytes are what was signed.
    #[prost(bytes = "vec", tag = "1")]
    pub payload: ::prost::alloc::vec::Vec<u8>,
    /// Signature over the payload bytes by the creator named in the
    /// payload's signature header.
    #[prost(bytes = "vec", tag = "2")]
    pub signature: ::prost::alloc::vec::Vec<u8>,
}

/// The ordered, hash-linked container the ordering service emits.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Block {
    #[prost(message, optional, tag = "1")]
    pub header: ::core::option::Option<BlockHeader>,
    #[prost(message, optional, tag = "2")]
    pub data: ::core::option::Option<BlockData>,
    #[prost(message, optional, tag = "3")]
    pub metadata: ::core::option::Option<BlockMetadata>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct BlockHeader {
    /// Position of this block in the chain.
    #[prost(uint64, tag = "1")]
    pub number: u64,
    /// Hash of the previous block's header.
    #[prost(bytes = "vec", tag = "2")]
    pub previous_hash: ::prost::alloc::vec::Vec<u8>,
    /// Hash of this block's data.
    #[prost(bytes = "vec", tag = "3")]
    pub data_hash: ::prost::alloc::vec::Vec<u8>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct BlockData {
    /// One serialized [`Envelope`] per transaction.
    #[prost(bytes = "vec", repeated, tag = "1")]
    pub data: ::prost::alloc::vec::Vec<::prost::alloc::vec::Vec<u8>>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct BlockMetadata {
    /// Indexed by [`BlockMetadataIndex`].
    #[prost(bytes = "vec", repeated, tag = "1")]
    pub metadata: ::prost::alloc::vec::Vec<::prost::alloc::vec::Vec<u8>>,
}

impl Block {
    /// Block number, or 0 when the header is absent (malformed frame).
    pub fn number(&self) -> u64 {
        self.header.as_ref().map(|h| h.number).unwrap_or_default()
    }

    /// The per-transaction validation filter, one byte per transaction.
    ///
    /// Empty when the orderer did not attach commit metadata, which is
    /// the case for blocks that have not passed validation yet.
    pub fn transactions_filter(&self) -> &[u8] {
        self.metadata
            .as_ref()
            .and_then(|m| m.metadata.get(BlockMetadataIndex::TransactionsFilter as usize))
            .map(|v| v.as_slice())
            .unwrap_or_default()
    }
}
