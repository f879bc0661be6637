// Copyright (c) 2024 The Weft Authors

//! Discovery queries: channel membership, endorsement layouts and
//! endpoint hints.

use crate::{Error, PolicyLayout, Result};
use prost::Message;
use std::{collections::HashMap, sync::Arc};
use tracing::debug;
use weft_connection::DiscoveryConnection;
use weft_identity::IdentityContext;
use weft_protocol::discovery::{
    query, query_result, AuthInfo, ChaincodeQuery, PeerMembershipQuery, Query, Request,
    SignedRequest,
};

/// One discovered channel member.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DiscoveredPeer {
    pub msp_id: String,
    /// host:port hint the application can turn into an endpoint.
    pub endpoint: String,
    pub ledger_height: u64,
}

/// What a discovery round trip yields.
#[derive(Clone, Debug, Default)]
pub struct DiscoveryResult {
    /// Peers able to endorse the queried chaincode.
    pub endorsers: Vec<DiscoveredPeer>,
    /// The endorsement policy flattened to layouts: satisfy any one.
    pub layouts: Vec<PolicyLayout>,
    /// Channel membership by MSP id.
    pub endpoints: HashMap<String, Vec<DiscoveredPeer>>,
}

/// Ask `peer` about the channel's membership and the endorsement
/// layouts for `chaincode`.
pub async fn discover(
    connection: &Arc<dyn DiscoveryConnection>,
    ctx: &IdentityContext,
    channel_id: &str,
    chaincode: &str,
) -> Result<DiscoveryResult> {
    let request = Request {
        authentication: Some(AuthInfo {
            client_identity: ctx.creator(),
            client_tls_cert_hash: Vec::new(),
        }),
        queries: vec![
            Query {
                channel: channel_id.to_owned(),
                query: Some(query::Query::PeerQuery(PeerMembershipQuery {})),
            },
            Query {
                channel: channel_id.to_owned(),
                query: Some(query::Query::CcQuery(ChaincodeQuery {
                    chaincode_names: vec![chaincode.to_owned()],
                })),
            },
        ],
    };
    let payload = request.encode_to_vec();
    let signature = ctx.sign(&payload)?;

    let response = connection.discover(SignedRequest { payload, signature }).await?;

    let mut result = DiscoveryResult::default();
    for entry in response.results {
        match entry.result {
            Some(query_result::Result::Error(error)) => {
                return Err(Error::Discovery(error.content));
            }
            Some(query_result::Result::Members(members)) => {
                for (msp_id, peers) in members.peers_by_org {
                    result.endpoints.insert(
                        msp_id,
                        peers.peers.iter().map(discovered).collect(),
                    );
                }
            }
            Some(query_result::Result::CcQueryRes(cc)) => {
                for descriptor in cc.content {
                    for peers in descriptor.endorsers_by_groups.values() {
                        result.endorsers.extend(peers.peers.iter().map(discovered));
                    }
                    result.layouts.extend(descriptor.layouts.iter().map(|layout| {
                        let mut groups: Vec<(String, usize)> = layout
                            .quantities_by_group
                            .iter()
                            .map(|(group, quantity)| (group.clone(), *quantity as usize))
                            .collect();
                        groups.sort();
                        PolicyLayout { groups }
                    }));
                }
            }
            None => {}
        }
    }

    result.endorsers.sort_by(|a, b| a.endpoint.cmp(&b.endpoint));
    result.endorsers.dedup();
    debug!(
        channel = channel_id,
        chaincode,
        endorsers = result.endorsers.len(),
        layouts = result.layouts.len(),
        "discovery complete"
    );
    Ok(result)
}

fn discovered(peer: &weft_protocol::discovery::Peer) -> DiscoveredPeer {
    DiscoveredPeer {
        msp_id: peer.msp_id.clone(),
        endpoint: peer.endpoint.clone(),
        ledger_height: peer.ledger_height,
    }
}
