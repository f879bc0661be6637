// Copyright (c) 2024 The Weft Authors

//! Ordering-service schema: broadcast acks and deliver seek frames.

/// The single ack an orderer returns per broadcast envelope.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct BroadcastResponse {
    /// A [`super::common::Status`] value.
    #[prost(enumeration = "super::common::Status", tag = "1")]
    pub status: i32,
    /// Human-readable detail, set on rejection.
    #[prost(string, tag = "2")]
    pub info: ::prost::alloc::string::String,
}

#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct SeekNewest {}

#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct SeekOldest {}

#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct SeekSpecified {
    #[prost(uint64, tag = "1")]
    pub number: u64,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SeekPosition {
    #[prost(oneof = "seek_position::Type", tags = "1, 2, 3")]
    pub r#type: ::core::option::Option<seek_position::Type>,
}

pub mod seek_position {
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Type {
        #[prost(message, tag = "1")]
        Newest(super::SeekNewest),
        #[prost(message, tag = "2")]
        Oldest(super::SeekOldest),
        #[prost(message, tag = "3")]
        Specified(super::SeekSpecified),
    }
}

impl SeekPosition {
    pub fn newest() -> Self {
        Self { r#type: Some(seek_position::Type::Newest(SeekNewest {})) }
    }

    pub fn oldest() -> Self {
        Self { r#type: Some(seek_position::Type::Oldest(SeekOldest {})) }
    }

    pub fn specified(number: u64) -> Self {
        Self { r#type: Some(seek_position::Type::Specified(SeekSpecified { number })) }
    }
}

/// The request a deliver client sends: stream blocks from `start` to
/// `stop` inclusive.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SeekInfo {
    #[prost(message, optional, tag = "1")]
    pub start: ::core::option::Option<SeekPosition>,
    #[prost(message, optional, tag = "2")]
    pub stop: ::core::option::Option<SeekPosition>,
    /// A [`seek_info::SeekBehavior`] value.
    #[prost(enumeration = "seek_info::SeekBehavior", tag = "3")]
    pub behavior: i32,
    /// A [`seek_info::SeekErrorResponse`] value.
    #[prost(enumeration = "seek_info::SeekErrorResponse", tag = "4")]
    pub error_response: i32,
}

pub mod seek_info {
    /// What the server does when a sought block does not exist yet.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
    #[repr(i32)]
    pub enum SeekBehavior {
        /// Block until the requested block is produced.
        BlockUntilReady = 0,
        /// Reply NOT_FOUND instead of waiting.
        FailIfNotReady = 1,
    }

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
    #[repr(i32)]
    pub enum SeekErrorResponse {
        Strict = 0,
        BestEffort = 1,
    }
}

/// One frame of an orderer deliver stream.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct DeliverResponse {
    #[prost(oneof = "deliver_response::Type", tags = "1, 2")]
    pub r#type: ::core::option::Option<deliver_response::Type>,
}

pub mod deliver_response {
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Type {
        #[prost(enumeration = "super::super::common::Status", tag = "1")]
        Status(i32),
        #[prost(message, tag = "2")]
        Block(super::super::common::Block),
    }
}
