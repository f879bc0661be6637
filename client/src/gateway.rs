// Copyright (c) 2024 The Weft Authors

//! The high-level orchestrator for one channel.

use crate::{
    broadcast, build_proposal, build_transaction_envelope, discover, endorse,
    DiscoveryResult, EndorsementPolicy, Error, PeerError, Result, SubmitOptions,
};
use std::{collections::HashSet, sync::Arc};
use tracing::{debug, info};
use weft_connection::{DiscoveryConnection, EndorserConnection, OrdererConnection};
use weft_events::{CommitTracker, EventService};
use weft_identity::{Identity, IdentityContext};

/// Composes the submission pipeline over a fixed set of connections:
/// endorsers, one orderer, and the event services used for commit
/// tracking — all scoped to a single channel.
///
/// Cancellation propagates by dropping the returned future: outstanding
/// endorser dispatches, the broadcast, and the commit wait are all
/// cancelled, and the commit listeners are unregistered.
pub struct Gateway {
    channel_id: String,
    identity: Arc<Identity>,
    endorsers: Vec<Arc<dyn EndorserConnection>>,
    orderer: Arc<dyn OrdererConnection>,
    tracker: CommitTracker,
    discovery: Option<Arc<dyn DiscoveryConnection>>,
}

impl Gateway {
    pub fn new(
        channel_id: impl Into<String>,
        identity: Arc<Identity>,
        endorsers: Vec<Arc<dyn EndorserConnection>>,
        orderer: Arc<dyn OrdererConnection>,
        event_services: Vec<EventService>,
    ) -> Self {
        Self {
            channel_id: channel_id.into(),
            identity,
            endorsers,
            orderer,
            tracker: CommitTracker::new(event_services),
            discovery: None,
        }
    }

    /// Attach a discovery connection, used to auto-pick endorsers when
    /// a submission does not name any.
    pub fn with_discovery(mut self, connection: Arc<dyn DiscoveryConnection>) -> Self {
        self.discovery = Some(connection);
        self
    }

    pub fn channel_id(&self) -> &str {
        &self.channel_id
    }

    /// Submit `function(args...)` on `chaincode` and wait for commit.
    ///
    /// Returns the chaincode response payload from the endorsed result
    /// (byte-identical across all valid endorsements). The commit
    /// tracker is armed before the broadcast, so a commit block racing
    /// the orderer ack is delivered, not lost.
    pub async fn submit(
        &self,
        chaincode: &str,
        function: &str,
        args: &[&[u8]],
        options: SubmitOptions,
    ) -> Result<Vec<u8>> {
        let ctx = IdentityContext::new(self.identity.clone());
        let bundle = build_proposal(
            &ctx,
            &self.channel_id,
            chaincode,
            function,
            args,
            options.transient.clone(),
        )?;
        info!(channel = %self.channel_id, chaincode, function, tx_id = %bundle.tx_id, "submitting");

        let targets = self.select_targets(&ctx, chaincode, &options).await?;
        let outcome = endorse(&bundle, &targets, options.timeouts.request).await;

        let policy = options.policy.clone().unwrap_or_else(|| {
            EndorsementPolicy::AllOf(targets.iter().map(|t| t.id()).collect())
        });
        if !policy.is_satisfied(&outcome.valid) {
            // Divergence empties the valid set; surface it as its own
            // fatal error rather than a generic policy failure.
            if outcome.valid.is_empty()
                && !outcome.errors.is_empty()
                && outcome.errors.iter().all(|(_, e)| matches!(e, PeerError::Divergent))
            {
                return Err(Error::DivergentResults {
                    peers: outcome.errors.into_iter().map(|(peer, _)| peer).collect(),
                });
            }
            return Err(Error::EndorsementPolicyFailure {
                valid: outcome.valid.len(),
                errors: outcome.errors,
            });
        }

        // Arm before broadcasting: the commit block may arrive
        // synchronously with the ack.
        let armed = self.tracker.arm(&ctx, &bundle.tx_id, options.strategy).await?;

        let envelope = build_transaction_envelope(&ctx, &bundle, &outcome.valid)?;
        if let Err(e) = broadcast(self.orderer.as_ref(), envelope, &options.timeouts).await {
            armed.disarm();
            return Err(e);
        }

        armed.wait(options.timeouts.commit).await?;
        debug!(tx_id = %bundle.tx_id, "committed");
        Ok(outcome.valid.into_iter().next().map(|e| e.payload).unwrap_or_default())
    }

    /// Run `function(args...)` on `chaincode` without ordering it:
    /// endorse only, return the first valid response payload.
    pub async fn evaluate(
        &self,
        chaincode: &str,
        function: &str,
        args: &[&[u8]],
        options: SubmitOptions,
    ) -> Result<Vec<u8>> {
        let ctx = IdentityContext::new(self.identity.clone());
        let bundle = build_proposal(
            &ctx,
            &self.channel_id,
            chaincode,
            function,
            args,
            options.transient.clone(),
        )?;
        debug!(channel = %self.channel_id, chaincode, function, tx_id = %bundle.tx_id, "evaluating");

        let targets = self.select_targets(&ctx, chaincode, &options).await?;
        let mut outcome = endorse(&bundle, &targets, options.timeouts.request).await;

        if let Some(first) = outcome.valid.drain(..).next() {
            return Ok(first.payload);
        }
        Err(Error::EndorsementPolicyFailure { valid: 0, errors: outcome.errors })
    }

    /// Query discovery for this channel's membership and the layouts
    /// for `chaincode`.
    pub async fn discover(&self, chaincode: &str) -> Result<DiscoveryResult> {
        let connection = self
            .discovery
            .as_ref()
            .ok_or_else(|| Error::BadArgs("no discovery connection configured".into()))?;
        let ctx = IdentityContext::new(self.identity.clone());
        discover(connection, &ctx, &self.channel_id, chaincode).await
    }

    /// Resolve the endorser set for one call: explicitly named targets,
    /// else a discovery-driven pick, else every configured endorser.
    async fn select_targets(
        &self,
        ctx: &IdentityContext,
        chaincode: &str,
        options: &SubmitOptions,
    ) -> Result<Vec<Arc<dyn EndorserConnection>>> {
        if !options.endorsers.is_empty() {
            let mut targets = Vec::with_capacity(options.endorsers.len());
            for id in &options.endorsers {
                let connection = self
                    .endorsers
                    .iter()
                    .find(|c| c.id() == *id)
                    .ok_or_else(|| Error::BadArgs(format!("unknown endorser {id}")))?;
                targets.push(connection.clone());
            }
            return Ok(targets);
        }

        if let Some(discovery) = &self.discovery {
            let result = discover(discovery, ctx, &self.channel_id, chaincode).await?;
            let hints: HashSet<String> =
                result.endorsers.iter().map(|peer| peer.endpoint.clone()).collect();
            // Endpoint hints are host:port; configured ids carry the
            // scheme, so match on containment.
            let targets: Vec<_> = self
                .endorsers
                .iter()
                .filter(|c| hints.iter().any(|hint| c.id().as_str().contains(hint.as_str())))
                .cloned()
                .collect();
            if !targets.is_empty() {
                debug!(picked = targets.len(), "endorsers picked via discovery");
                return Ok(targets);
            }
        }

        if self.endorsers.is_empty() {
            return Err(Error::BadArgs("no endorsers configured".into()));
        }
        Ok(self.endorsers.clone())
    }
}
