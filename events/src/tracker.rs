// Copyright (c) 2024 The Weft Authors

//! Commit tracking: correlate a transaction id with its validation
//! code across a set of event services.

use crate::{
    Callback, CloseReason, Error, EventMessage, EventService, ListenerId, ListenerOptions,
    Result, StartOptions, State,
};
use std::{sync::Arc, time::Duration};
use tokio::sync::mpsc;
use tracing::debug;
use weft_connection::EndpointId;
use weft_identity::IdentityContext;
use weft_protocol::peer::TxValidationCode;

/// How many peers must confirm the commit.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CommitStrategy {
    /// Every peer must deliver the transaction with code 0. Any
    /// non-zero code fails the wait immediately.
    AllOf,
    /// The first peer delivering code 0 resolves the wait. A non-zero
    /// code is only surfaced once every peer has reported or gone away.
    AnyOf,
    /// Do not wait; assume commit after the broadcast ack. Offered for
    /// fire-and-forget only — the transaction may still be invalidated.
    None,
}

enum PeerEvent {
    Seen(TxValidationCode),
    Terminated(CloseReason),
}

/// Tracks commits over a fixed set of event services, one per peer.
pub struct CommitTracker {
    services: Vec<EventService>,
}

impl CommitTracker {
    pub fn new(services: Vec<EventService>) -> Self {
        Self { services }
    }

    pub fn peers(&self) -> Vec<EndpointId> {
        self.services.iter().map(|s| s.peer()).collect()
    }

    /// Register a transaction listener for `tx_id` on every service,
    /// starting services that are not running. Must be called before
    /// the transaction is broadcast, so a block arriving concurrently
    /// with the ack is seen, not lost.
    pub async fn arm(
        &self,
        ctx: &IdentityContext,
        tx_id: &str,
        strategy: CommitStrategy,
    ) -> Result<ArmedCommit> {
        let (sender, receiver) = mpsc::unbounded_channel();
        let mut registrations = Vec::with_capacity(self.services.len());
        let mut peers = Vec::with_capacity(self.services.len());

        for service in &self.services {
            if service.state() == State::Disconnected {
                service.start(ctx, StartOptions::default()).await?;
            }

            let peer = service.peer();
            peers.push(peer.clone());

            let tx = sender.clone();
            let callback: Callback = Arc::new(move |message| match message {
                EventMessage::Transaction { transaction, .. } => {
                    let _ = tx.send((peer.clone(), PeerEvent::Seen(transaction.code)));
                }
                EventMessage::Closed(reason) => {
                    let _ = tx.send((peer.clone(), PeerEvent::Terminated(reason.clone())));
                }
                _ => {}
            });

            let id = service.register_transaction_listener(
                Some(tx_id.to_owned()),
                callback,
                ListenerOptions { once: true, end_block: None },
            );
            registrations.push((service.clone(), id));
        }

        debug!(tx_id, peers = peers.len(), ?strategy, "commit tracker armed");
        Ok(ArmedCommit {
            tx_id: tx_id.to_owned(),
            strategy,
            peers,
            registrations,
            receiver,
            responded: Vec::new(),
            terminated: Vec::new(),
        })
    }
}

/// An armed commit wait. Listeners are unregistered on every resolution
/// path, including drop without waiting.
pub struct ArmedCommit {
    tx_id: String,
    strategy: CommitStrategy,
    peers: Vec<EndpointId>,
    registrations: Vec<(EventService, ListenerId)>,
    receiver: mpsc::UnboundedReceiver<(EndpointId, PeerEvent)>,
    responded: Vec<(EndpointId, TxValidationCode)>,
    terminated: Vec<EndpointId>,
}

impl ArmedCommit {
    pub fn tx_id(&self) -> &str {
        &self.tx_id
    }

    /// Drop the registrations without waiting, e.g. when the orderer
    /// rejected the envelope and no block can follow.
    pub fn disarm(self) {}

    /// Wait for the strategy to resolve, up to `timeout`.
    pub async fn wait(mut self, timeout: Duration) -> Result<TxValidationCode> {
        if self.strategy == CommitStrategy::None {
            return Ok(TxValidationCode::Valid);
        }

        match tokio::time::timeout(timeout, self.collect()).await {
            Ok(outcome) => outcome,
            Err(_) => {
                let responded: Vec<EndpointId> =
                    self.responded.iter().map(|(peer, _)| peer.clone()).collect();
                let outstanding: Vec<EndpointId> = self
                    .peers
                    .iter()
                    .filter(|peer| !responded.contains(peer))
                    .cloned()
                    .collect();
                Err(Error::CommitTimeout { responded, outstanding })
            }
        }
    }

    async fn collect(&mut self) -> Result<TxValidationCode> {
        let total = self.peers.len();
        if total == 0 {
            return Err(Error::BadArgs("commit tracking needs at least one peer".into()));
        }

        loop {
            let Some((peer, event)) = self.receiver.recv().await else {
                return Err(Error::StreamTerminated(CloseReason::StreamError(
                    "all event services went away".into(),
                )));
            };

            match event {
                PeerEvent::Seen(code) => {
                    debug!(tx_id = %self.tx_id, %peer, ?code, "commit report");
                    self.responded.push((peer, code));
                    match self.strategy {
                        CommitStrategy::AllOf => {
                            if code != TxValidationCode::Valid {
                                return Err(Error::CommitFailure(code));
                            }
                            if self.responded.len() == total {
                                return Ok(TxValidationCode::Valid);
                            }
                        }
                        CommitStrategy::AnyOf => {
                            if code == TxValidationCode::Valid {
                                return Ok(TxValidationCode::Valid);
                            }
                        }
                        CommitStrategy::None => {
                            unreachable!("none strategy resolves before waiting")
                        }
                    }
                }
                PeerEvent::Terminated(reason) => {
                    debug!(tx_id = %self.tx_id, %peer, %reason, "peer event stream terminated");
                    self.terminated.push(peer);
                    if self.strategy == CommitStrategy::AllOf {
                        // This peer can no longer confirm; all-of can
                        // never be satisfied.
                        return Err(Error::StreamTerminated(reason));
                    }
                }
            }

            if self.responded.len() + self.terminated.len() == total {
                // Any-of: everyone has reported or gone away without a
                // single code-0 delivery.
                if let Some((_, code)) =
                    self.responded.iter().find(|(_, code)| *code != TxValidationCode::Valid)
                {
                    return Err(Error::CommitFailure(*code));
                }
                return Err(Error::StreamTerminated(CloseReason::StreamError(
                    "no peer delivered the transaction".into(),
                )));
            }
        }
    }
}

impl Drop for ArmedCommit {
    fn drop(&mut self) {
        for (service, id) in &self.registrations {
            service.unregister(*id);
        }
    }
}
