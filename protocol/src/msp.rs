// Copyright (c) 2024 The Weft Authors

//! Membership service provider envelope for identities on the wire.

/// The wire form of a signing identity: the id of the membership
/// service provider that can verify it, plus the identity material
/// itself (an X.509 certificate in PEM form).
#[derive(Clone, PartialEq, Eq, Hash, ::prost::Message)]
pub struct SerializedIdentity {
    #[prost(string, tag = "1")]
    pub mspid: ::prost::alloc::string::String,
    #[prost(bytes = "vec", tag = "2")]
    pub id_bytes: ::prost::alloc::vec::Vec<u8>,
}
