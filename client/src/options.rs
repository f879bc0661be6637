// Copyright (c) 2024 The Weft Authors

//! Caller-supplied options. No global configuration exists; everything
//! arrives through these values.

use crate::EndorsementPolicy;
use std::time::Duration;
use weft_events::CommitStrategy;

/// The three timeout tiers of a submission.
#[derive(Clone, Copy, Debug)]
pub struct CallTimeouts {
    /// Establishing a connection on first use.
    pub dial: Duration,
    /// Each endorser dispatch, and each broadcast phase.
    pub request: Duration,
    /// Waiting for the commit event.
    pub commit: Duration,
}

impl Default for CallTimeouts {
    fn default() -> Self {
        Self {
            dial: Duration::from_secs(3),
            request: Duration::from_secs(30),
            commit: Duration::from_secs(60),
        }
    }
}

/// Options for one `submit` or `evaluate`.
#[derive(Clone, Debug)]
pub struct SubmitOptions {
    /// Which configured endorsers to target, by endpoint id. Empty
    /// means all configured endorsers — or a discovery-driven pick when
    /// the gateway has a discovery connection.
    pub endorsers: Vec<weft_connection::EndpointId>,
    /// Endorsement policy to require. `None` defaults to all targeted
    /// endorsers.
    pub policy: Option<EndorsementPolicy>,
    /// How many peers must confirm the commit.
    pub strategy: CommitStrategy,
    pub timeouts: CallTimeouts,
    /// Transient data passed to the chaincode but kept off the ledger.
    pub transient: std::collections::HashMap<String, Vec<u8>>,
}

impl Default for SubmitOptions {
    fn default() -> Self {
        Self {
            endorsers: Vec::new(),
            policy: None,
            strategy: CommitStrategy::AllOf,
            timeouts: CallTimeouts::default(),
            transient: Default::default(),
        }
    }
}

impl SubmitOptions {
    pub fn with_policy(mut self, policy: EndorsementPolicy) -> Self {
        self.policy = Some(policy);
        self
    }

    pub fn with_strategy(mut self, strategy: CommitStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_timeouts(mut self, timeouts: CallTimeouts) -> Self {
        self.timeouts = timeouts;
        self
    }
}
