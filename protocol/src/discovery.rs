// Copyright (c) 2024 The Weft Authors

//! Discovery service schema, at the surface the SDK consumes: channel
//! membership, endorsement-policy layouts, and endpoint hints.

/// A serialized [`Request`] plus the client's signature over it.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SignedRequest {
    #[prost(bytes = "vec", tag = "1")]
    pub payload: ::prost::alloc::vec::Vec<u8>,
    #[prost(bytes = "vec", tag = "2")]
    pub signature: ::prost::alloc::vec::Vec<u8>,
}

/// Who is asking; the service checks channel read permission.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct AuthInfo {
    /// Serialized identity of the client.
    #[prost(bytes = "vec", tag = "1")]
    pub client_identity: ::prost::alloc::vec::Vec<u8>,
    #[prost(bytes = "vec", tag = "2")]
    pub client_tls_cert_hash: ::prost::alloc::vec::Vec<u8>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Request {
    #[prost(message, optional, tag = "1")]
    pub authentication: ::core::option::Option<AuthInfo>,
    #[prost(message, repeated, tag = "2")]
    pub queries: ::prost::alloc::vec::Vec<Query>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Query {
    #[prost(string, tag = "1")]
    pub channel: ::prost::alloc::string::String,
    #[prost(oneof = "query::Query", tags = "2, 3")]
    pub query: ::core::option::Option<query::Query>,
}

pub mod query {
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Query {
        /// Who is on the channel.
        #[prost(message, tag = "2")]
        PeerQuery(super::PeerMembershipQuery),
        /// Who can endorse for the named chaincodes, and in which
        /// combinations.
        #[prost(message, tag = "3")]
        CcQuery(super::ChaincodeQuery),
    }
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct PeerMembershipQuery {}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ChaincodeQuery {
    #[prost(string, repeated, tag = "1")]
    pub chaincode_names: ::prost::alloc::vec::Vec<::prost::alloc::string::String>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Response {
    #[prost(message, repeated, tag = "1")]
    pub results: ::prost::alloc::vec::Vec<QueryResult>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct QueryResult {
    #[prost(oneof = "query_result::Result", tags = "1, 2, 3")]
    pub result: ::core::option::Option<query_result::Result>,
}

pub mod query_result {
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Result {
        #[prost(message, tag = "1")]
        Error(super::Error),
        #[prost(message, tag = "2")]
        Members(super::PeerMembershipResult),
        #[prost(message, tag = "3")]
        CcQueryRes(super::ChaincodeQueryResult),
    }
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Error {
    #[prost(string, tag = "1")]
    pub content: ::prost::alloc::string::String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct PeerMembershipResult {
    #[prost(map = "string, message", tag = "1")]
    pub peers_by_org: ::std::collections::HashMap<::prost::alloc::string::String, Peers>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Peers {
    #[prost(message, repeated, tag = "1")]
    pub peers: ::prost::alloc::vec::Vec<Peer>,
}

/// One channel member, with the endpoint hint the SDK can dial.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Peer {
    #[prost(string, tag = "1")]
    pub msp_id: ::prost::alloc::string::String,
    /// host:port the peer is reachable at.
    #[prost(string, tag = "2")]
    pub endpoint: ::prost::alloc::string::String,
    /// Serialized identity of the peer.
    #[prost(bytes = "vec", tag = "3")]
    pub identity: ::prost::alloc::vec::Vec<u8>,
    #[prost(uint64, tag = "4")]
    pub ledger_height: u64,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ChaincodeQueryResult {
    #[prost(message, repeated, tag = "1")]
    pub content: ::prost::alloc::vec::Vec<EndorsementDescriptor>,
}

/// The endorsement policy of one chaincode, flattened to layouts.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct EndorsementDescriptor {
    #[prost(string, tag = "1")]
    pub chaincode: ::prost::alloc::string::String,
    /// Peers that can endorse, grouped by MSP id.
    #[prost(map = "string, message", tag = "2")]
    pub endorsers_by_groups: ::std::collections::HashMap<::prost::alloc::string::String, Peers>,
    /// Satisfy any one layout to satisfy the policy.
    #[prost(message, repeated, tag = "3")]
    pub layouts: ::prost::alloc::vec::Vec<Layout>,
}

/// One conjunction of the policy: `quantity` distinct endorsers from
/// each named group.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Layout {
    #[prost(map = "string, uint32", tag = "1")]
    pub quantities_by_group: ::std::collections::HashMap<::prost::alloc::string::String, u32>,
}
