// Copyright (c) 2024 The Weft Authors

//! Listener registrations and the messages they receive.

use crate::{BlockEvent, ChaincodeEventRecord, TransactionEvent};
use regex::Regex;
use std::{collections::HashMap, fmt, sync::Arc};
use weft_protocol::common::Status;

/// Handle for one registration; pass to `unregister`.
pub type ListenerId = u64;

/// Listener callback. Invoked from the stream reader task, outside the
/// registry lock; it must not block indefinitely — offload heavy work.
pub type Callback = Arc<dyn Fn(&EventMessage) + Send + Sync>;

/// Why a session ended.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CloseReason {
    /// The configured end block was delivered.
    EndBlockReached,
    /// The caller closed the service.
    Requested,
    /// The server closed the stream with a non-success status.
    Status(Status),
    /// The transport reported unavailable; callers may reconnect with
    /// `start_block = last_block_number + 1`.
    ServiceUnavailable,
    /// The stream broke for another reason.
    StreamError(String),
}

impl fmt::Display for CloseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EndBlockReached => write!(f, "end block reached"),
            Self::Requested => write!(f, "closed by caller"),
            Self::Status(status) => write!(f, "server status {status:?}"),
            Self::ServiceUnavailable => write!(f, "service unavailable"),
            Self::StreamError(reason) => write!(f, "stream error: {reason}"),
        }
    }
}

/// What a listener callback receives.
#[derive(Clone, Debug)]
pub enum EventMessage {
    /// A block matched a block listener.
    Block(Arc<BlockEvent>),
    /// A transaction matched a transaction listener.
    Transaction { block: Arc<BlockEvent>, transaction: TransactionEvent },
    /// A chaincode event matched a chaincode listener.
    ChaincodeEvent {
        block: Arc<BlockEvent>,
        tx_id: String,
        event: ChaincodeEventRecord,
    },
    /// Terminal: the session closed. Delivered exactly once per
    /// registered listener.
    Closed(CloseReason),
}

/// Registration options.
#[derive(Clone, Copy, Debug, Default)]
pub struct ListenerOptions {
    /// Unregister after the first dispatched event.
    pub once: bool,
    /// Unregister after the block with this number is dispatched.
    pub end_block: Option<u64>,
}

pub(crate) enum ListenerKind {
    Block,
    /// `None` matches every transaction.
    Transaction { tx_id: Option<String> },
    Chaincode { chaincode_id: String, event_name: Regex },
}

pub(crate) struct Registration {
    pub kind: ListenerKind,
    pub callback: Callback,
    pub options: ListenerOptions,
}

/// The single registration table, tagged by listener kind. Derived
/// views ("are there chaincode listeners") are computed, not stored.
#[derive(Default)]
pub(crate) struct Registry {
    next_id: ListenerId,
    entries: HashMap<ListenerId, Registration>,
}

impl Registry {
    pub fn register(&mut self, registration: Registration) -> ListenerId {
        let id = self.next_id;
        self.next_id += 1;
        self.entries.insert(id, registration);
        id
    }

    pub fn unregister(&mut self, id: ListenerId) -> bool {
        self.entries.remove(&id).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Collect the callbacks to run for `block`, removing listeners
    /// that are spent (`once`, or their own `end_block` reached). The
    /// returned closures are invoked by the caller outside the registry
    /// lock.
    ///
    /// A `once` registration is spent by its first dispatch: even when
    /// several transactions or events in one block match it, only the
    /// first produces a plan entry.
    pub fn dispatch_plan(&mut self, block: &Arc<BlockEvent>) -> Vec<(Callback, EventMessage)> {
        let mut plan = Vec::new();
        let mut spent = Vec::new();

        for (id, registration) in &self.entries {
            let once = registration.options.once;
            let mut matched = false;
            match &registration.kind {
                ListenerKind::Block => {
                    matched = true;
                    plan.push((
                        registration.callback.clone(),
                        EventMessage::Block(block.clone()),
                    ));
                }
                ListenerKind::Transaction { tx_id } => {
                    for tx in &block.transactions {
                        if tx_id.as_deref().is_none_or(|want| want == tx.tx_id) {
                            matched = true;
                            plan.push((
                                registration.callback.clone(),
                                EventMessage::Transaction {
                                    block: block.clone(),
                                    transaction: tx.clone(),
                                },
                            ));
                            if once {
                                break;
                            }
                        }
                    }
                }
                ListenerKind::Chaincode { chaincode_id, event_name } => {
                    'txs: for tx in &block.transactions {
                        for event in &tx.events {
                            if event.chaincode_id == *chaincode_id
                                && event_name.is_match(&event.event_name)
                            {
                                matched = true;
                                plan.push((
                                    registration.callback.clone(),
                                    EventMessage::ChaincodeEvent {
                                        block: block.clone(),
                                        tx_id: tx.tx_id.clone(),
                                        event: event.clone(),
                                    },
                                ));
                                if once {
                                    break 'txs;
                                }
                            }
                        }
                    }
                }
            }

            let end_reached = registration
                .options
                .end_block
                .map(|end| block.number >= end)
                .unwrap_or(false);
            if (once && matched) || end_reached {
                spent.push(*id);
            }
        }

        for id in spent {
            self.entries.remove(&id);
        }
        plan
    }

    /// Drain every registration for terminal notification.
    pub fn drain(&mut self) -> Vec<Callback> {
        self.entries.drain().map(|(_, registration)| registration.callback).collect()
    }
}
