// Copyright (c) 2024 The Weft Authors

//! Endorsement policy evaluation.

use crate::PeerEndorsement;
use std::collections::HashMap;
use weft_connection::EndpointId;

/// One conjunction of a layout policy: `quantity` distinct endorsers
/// from each named MSP group.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PolicyLayout {
    pub groups: Vec<(String, usize)>,
}

/// Which combinations of endorsements satisfy a submission.
///
/// Evaluated by the orchestrator over the collated valid set; the
/// endorsement coordinator never short-circuits on "enough responses"
/// because a policy may be all-of or an arbitrary threshold.
#[derive(Clone, Debug)]
pub enum EndorsementPolicy {
    /// Every listed peer must endorse.
    AllOf(Vec<EndpointId>),
    /// At least one listed peer must endorse.
    AnyOf(Vec<EndpointId>),
    /// At least `n` distinct peers must endorse.
    Threshold(usize),
    /// Satisfy any one layout: a disjunction of (mspId, quantity)
    /// groups, as discovery reports policies.
    Layouts(Vec<PolicyLayout>),
}

impl EndorsementPolicy {
    /// Whether `valid` satisfies this policy.
    pub fn is_satisfied(&self, valid: &[PeerEndorsement]) -> bool {
        match self {
            Self::AllOf(peers) => {
                !peers.is_empty()
                    && peers.iter().all(|peer| valid.iter().any(|e| e.peer == *peer))
            }
            Self::AnyOf(peers) => peers.iter().any(|peer| valid.iter().any(|e| e.peer == *peer)),
            Self::Threshold(n) => {
                let distinct = valid
                    .iter()
                    .map(|e| &e.peer)
                    .collect::<std::collections::HashSet<_>>()
                    .len();
                distinct >= *n && *n > 0
            }
            Self::Layouts(layouts) => {
                let mut by_msp: HashMap<&str, usize> = HashMap::new();
                for endorsement in valid {
                    *by_msp.entry(endorsement.msp_id.as_str()).or_default() += 1;
                }
                layouts.iter().any(|layout| {
                    layout.groups.iter().all(|(msp_id, quantity)| {
                        by_msp.get(msp_id.as_str()).copied().unwrap_or(0) >= *quantity
                    })
                })
            }
        }
    }
}
