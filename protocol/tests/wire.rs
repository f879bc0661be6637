// Copyright (c) 2024 The Weft Authors

//! Wire-compatibility checks: the hand-maintained message structs must
//! put every field on the tag the network schema assigns it. Each test
//! pins the exact encoded bytes, so a tag drift fails loudly instead of
//! producing frames the nodes silently misread.

use prost::Message;
use weft_protocol::{
    common::{ChannelHeader, Envelope},
    msp::SerializedIdentity,
    orderer::{BroadcastResponse, SeekInfo, SeekPosition},
    peer::{Endorsement, ProposalResponse, Response, SignedProposal},
};

#[test]
fn channel_header_tags() {
    let header = ChannelHeader {
        r#type: 3,
        version: 0,
        timestamp: None,
        channel_id: "c".into(),
        tx_id: "t".into(),
        epoch: 0,
        extension: Vec::new(),
        tls_cert_hash: Vec::new(),
    };
    // type on tag 1, channel_id on tag 4, tx_id on tag 5; defaulted
    // fields are omitted.
    assert_eq!(header.encode_to_vec(), vec![0x08, 0x03, 0x22, 0x01, b'c', 0x2a, 0x01, b't']);
}

#[test]
fn envelope_and_signed_proposal_tags() {
    let envelope = Envelope { payload: vec![0xaa], signature: vec![0xbb] };
    assert_eq!(envelope.encode_to_vec(), vec![0x0a, 0x01, 0xaa, 0x12, 0x01, 0xbb]);

    let proposal = SignedProposal { proposal_bytes: vec![0x01], signature: vec![0x02] };
    assert_eq!(proposal.encode_to_vec(), vec![0x0a, 0x01, 0x01, 0x12, 0x01, 0x02]);
}

#[test]
fn serialized_identity_tags() {
    let identity = SerializedIdentity { mspid: "Org1MSP".into(), id_bytes: vec![0x01] };
    let mut expected = vec![0x0a, 0x07];
    expected.extend_from_slice(b"Org1MSP");
    expected.extend_from_slice(&[0x12, 0x01, 0x01]);
    assert_eq!(identity.encode_to_vec(), expected);
}

#[test]
fn seek_info_tags() {
    let info = SeekInfo {
        start: Some(SeekPosition::specified(5)),
        stop: Some(SeekPosition::newest()),
        behavior: 0,
        error_response: 0,
    };
    // start on tag 1 wrapping the oneof's specified arm (tag 3, number
    // on tag 1); stop on tag 2 wrapping the newest arm (tag 1, empty).
    assert_eq!(
        info.encode_to_vec(),
        vec![0x0a, 0x04, 0x1a, 0x02, 0x08, 0x05, 0x12, 0x02, 0x0a, 0x00]
    );
}

#[test]
fn broadcast_response_tags() {
    let ack = BroadcastResponse { status: 200, info: String::new() };
    assert_eq!(ack.encode_to_vec(), vec![0x08, 0xc8, 0x01]);
}

#[test]
fn proposal_response_skips_tag_three() {
    // The schema reserves tag 3; response sits on tag 4, payload on 5,
    // endorsement on 6.
    let response = ProposalResponse {
        version: 1,
        timestamp: None,
        response: Some(Response { status: 200, message: String::new(), payload: Vec::new() }),
        payload: vec![0xcc],
        endorsement: Some(Endorsement { endorser: vec![0xdd], signature: vec![0xee] }),
    };
    assert_eq!(
        response.encode_to_vec(),
        vec![
            0x08, 0x01, // version
            0x22, 0x03, 0x08, 0xc8, 0x01, // response { status: 200 }
            0x2a, 0x01, 0xcc, // payload
            0x32, 0x06, 0x0a, 0x01, 0xdd, 0x12, 0x01, 0xee, // endorsement
        ]
    );
}
