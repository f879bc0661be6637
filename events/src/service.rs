// Copyright (c) 2024 The Weft Authors

//! The block-delivery state machine.

use crate::{
    listener::{ListenerKind, Registration, Registry},
    seek::{self, seek_envelope},
    BlockEvent, Callback, CloseReason, EndPosition, Error, EventMessage, ListenerId,
    ListenerOptions, Result, StartPosition,
};
use futures::StreamExt;
use regex::Regex;
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc, Mutex,
};
use tokio::sync::{watch, Notify};
use tracing::{debug, warn};
use weft_connection::{BlockStream, DeliverConnection, DeliverMode, EndpointId};
use weft_identity::IdentityContext;
use weft_protocol::{common::Status, events::deliver_response};

/// Session lifecycle. One session spans `start … close`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum State {
    Disconnected,
    Connecting,
    Listening,
    Closing,
}

/// Options for one `start`.
#[derive(Clone, Copy, Debug)]
pub struct StartOptions {
    pub start: StartPosition,
    pub end: EndPosition,
    pub mode: DeliverMode,
}

impl Default for StartOptions {
    fn default() -> Self {
        Self {
            start: StartPosition::Newest,
            end: EndPosition::Newest,
            mode: DeliverMode::Filtered,
        }
    }
}

struct Inner {
    channel_id: String,
    connection: Arc<dyn DeliverConnection>,
    state: watch::Sender<State>,
    listeners: Mutex<Registry>,
    last_block: Mutex<Option<u64>>,
    /// Wakes the current session's reader on close. Replaced per
    /// session so a late notification can never reach a newer reader.
    shutdown: Mutex<Option<Arc<Notify>>>,
    /// Bumped per start; a dial that lost a close/restart race detects
    /// the stale epoch and bails instead of hijacking the new session.
    epoch: AtomicU64,
}

impl Inner {
    /// Move to `Closing` if a session is active. Returns false when the
    /// service is already closing or down, making close idempotent.
    fn begin_close(&self) -> bool {
        self.state.send_if_modified(|state| match *state {
            State::Connecting | State::Listening => {
                *state = State::Closing;
                true
            }
            State::Closing | State::Disconnected => false,
        })
    }

    /// Notify every registered listener of the terminal reason exactly
    /// once, clear the table, and come to rest at `Disconnected`.
    fn finish_close(&self, reason: CloseReason) {
        let callbacks = self.listeners.lock().expect("listener lock").drain();
        debug!(
            channel = %self.channel_id,
            peer = %self.connection.id(),
            %reason,
            listeners = callbacks.len(),
            "event service closed"
        );
        let message = EventMessage::Closed(reason);
        for callback in callbacks {
            callback(&message);
        }
        self.state.send_replace(State::Disconnected);
    }
}

/// One deliver session per `(channel, peer)`, multiplexing the
/// in-process listeners registered on it.
///
/// The reader task is the only writer of session state: it records the
/// last block number and dispatches to listeners; registration takes a
/// short lock and callbacks run outside it.
#[derive(Clone)]
pub struct EventService {
    inner: Arc<Inner>,
}

impl EventService {
    pub fn new(channel_id: impl Into<String>, connection: Arc<dyn DeliverConnection>) -> Self {
        let (state, _) = watch::channel(State::Disconnected);
        Self {
            inner: Arc::new(Inner {
                channel_id: channel_id.into(),
                connection,
                state,
                listeners: Mutex::new(Registry::default()),
                last_block: Mutex::new(None),
                shutdown: Mutex::new(None),
                epoch: AtomicU64::new(0),
            }),
        }
    }

    pub fn channel_id(&self) -> &str {
        &self.inner.channel_id
    }

    /// The peer this service streams from.
    pub fn peer(&self) -> EndpointId {
        self.inner.connection.id()
    }

    pub fn state(&self) -> State {
        *self.inner.state.borrow()
    }

    /// Watch state transitions; mainly for tests and shutdown hooks.
    pub fn state_changes(&self) -> watch::Receiver<State> {
        self.inner.state.subscribe()
    }

    /// Highest block number delivered on this service, across sessions.
    pub fn last_block_number(&self) -> Option<u64> {
        *self.inner.last_block.lock().expect("last block lock")
    }

    /// Open the deliver stream and begin dispatching.
    ///
    /// Fails with `BadArgs` before any stream is opened when
    /// `end < start`, and with `AlreadyStarted` when a session is
    /// active.
    pub async fn start(&self, ctx: &IdentityContext, options: StartOptions) -> Result<()> {
        seek::validate_range(options.start, options.end)?;

        let entered = self.inner.state.send_if_modified(|state| {
            if *state == State::Disconnected {
                *state = State::Connecting;
                true
            } else {
                false
            }
        });
        if !entered {
            return Err(Error::AlreadyStarted);
        }
        let epoch = self.inner.epoch.fetch_add(1, Ordering::SeqCst) + 1;

        debug!(
            channel = %self.inner.channel_id,
            peer = %self.inner.connection.id(),
            start = ?options.start,
            end = ?options.end,
            mode = ?options.mode,
            "starting deliver session"
        );

        let seek = match seek_envelope(ctx, &self.inner.channel_id, options.start, options.end) {
            Ok(seek) => seek,
            Err(e) => {
                self.inner.state.send_replace(State::Disconnected);
                return Err(e);
            }
        };

        let stream = match self.inner.connection.deliver(seek, options.mode).await {
            Ok(stream) => stream,
            Err(e) => {
                self.inner.state.send_replace(State::Disconnected);
                return Err(e.into());
            }
        };

        // A close (or close-and-restart) may have raced the dial; only
        // enter Listening from Connecting within our own epoch.
        let listening = self.inner.epoch.load(Ordering::SeqCst) == epoch
            && self.inner.state.send_if_modified(|state| {
                if *state == State::Connecting {
                    *state = State::Listening;
                    true
                } else {
                    false
                }
            });
        if !listening {
            return Err(Error::StreamTerminated(CloseReason::Requested));
        }

        let shutdown = Arc::new(Notify::new());
        *self.inner.shutdown.lock().expect("shutdown lock") = Some(shutdown.clone());
        tokio::spawn(run_session(self.inner.clone(), stream, options.end, shutdown));
        Ok(())
    }

    /// Close the session. Idempotent: the first call notifies every
    /// registered listener of `reason` once and clears the table; later
    /// calls are no-ops.
    pub fn close(&self, reason: CloseReason) {
        if !self.inner.begin_close() {
            return;
        }
        if let Some(shutdown) = self.inner.shutdown.lock().expect("shutdown lock").take() {
            shutdown.notify_one();
        }
        self.inner.finish_close(reason);
    }

    /// Listen for every dispatched block.
    pub fn register_block_listener(
        &self,
        callback: Callback,
        options: ListenerOptions,
    ) -> ListenerId {
        self.register(ListenerKind::Block, callback, options)
    }

    /// Listen for one transaction id, or every transaction when
    /// `tx_id` is `None`.
    pub fn register_transaction_listener(
        &self,
        tx_id: Option<String>,
        callback: Callback,
        options: ListenerOptions,
    ) -> ListenerId {
        self.register(ListenerKind::Transaction { tx_id }, callback, options)
    }

    /// Listen for chaincode events from `chaincode_id` whose name
    /// matches `event_pattern` (a regular expression).
    pub fn register_chaincode_listener(
        &self,
        chaincode_id: impl Into<String>,
        event_pattern: &str,
        callback: Callback,
        options: ListenerOptions,
    ) -> Result<ListenerId> {
        let event_name = Regex::new(event_pattern)
            .map_err(|e| Error::BadArgs(format!("bad event pattern: {e}")))?;
        Ok(self.register(
            ListenerKind::Chaincode { chaincode_id: chaincode_id.into(), event_name },
            callback,
            options,
        ))
    }

    /// Remove a registration. Returns false when the id is unknown
    /// (already spent or never registered).
    pub fn unregister(&self, id: ListenerId) -> bool {
        self.inner.listeners.lock().expect("listener lock").unregister(id)
    }

    /// Number of live registrations.
    pub fn listener_count(&self) -> usize {
        self.inner.listeners.lock().expect("listener lock").len()
    }

    fn register(
        &self,
        kind: ListenerKind,
        callback: Callback,
        options: ListenerOptions,
    ) -> ListenerId {
        self.inner
            .listeners
            .lock()
            .expect("listener lock")
            .register(Registration { kind, callback, options })
    }
}

enum BlockOutcome {
    Continue,
    /// The session's end block was dispatched.
    End,
    Fatal(CloseReason),
}

async fn run_session(
    inner: Arc<Inner>,
    mut stream: BlockStream,
    end: EndPosition,
    shutdown: Arc<Notify>,
) {
    // Next block number this session will accept; established by the
    // first block so any start position works.
    let mut expected: Option<u64> = None;

    let reason = loop {
        let frame = tokio::select! {
            _ = shutdown.notified() => {
                // The closer handles listener notification.
                return;
            }
            frame = stream.next() => frame,
        };

        match frame {
            Some(Ok(response)) => match response.r#type {
                Some(deliver_response::Type::Block(block)) => {
                    let event = match BlockEvent::from_full(&block) {
                        Ok(event) => event,
                        Err(e) => break CloseReason::StreamError(e.to_string()),
                    };
                    match handle_block(&inner, event, &mut expected, end) {
                        BlockOutcome::Continue => {}
                        BlockOutcome::End => break CloseReason::EndBlockReached,
                        BlockOutcome::Fatal(reason) => break reason,
                    }
                }
                Some(deliver_response::Type::FilteredBlock(block)) => {
                    let event = BlockEvent::from_filtered(&block);
                    match handle_block(&inner, event, &mut expected, end) {
                        BlockOutcome::Continue => {}
                        BlockOutcome::End => break CloseReason::EndBlockReached,
                        BlockOutcome::Fatal(reason) => break reason,
                    }
                }
                Some(deliver_response::Type::Status(code)) => {
                    let status = Status::try_from(code).unwrap_or(Status::Unknown);
                    match status {
                        // Success is only meaningful once the end block
                        // has been seen, and that path closes first; an
                        // early success is logged and ignored.
                        Status::Success => {
                            debug!(channel = %inner.channel_id, "ignoring early success status");
                        }
                        Status::ServiceUnavailable => break CloseReason::ServiceUnavailable,
                        other => break CloseReason::Status(other),
                    }
                }
                None => {
                    warn!(channel = %inner.channel_id, "empty deliver frame");
                }
            },
            Some(Err(e)) if e.is_unavailable() => break CloseReason::ServiceUnavailable,
            Some(Err(e)) => break CloseReason::StreamError(e.to_string()),
            None => break CloseReason::StreamError("stream ended".into()),
        }
    };

    if inner.begin_close() {
        inner.finish_close(reason);
    }
}

fn handle_block(
    inner: &Arc<Inner>,
    event: BlockEvent,
    expected: &mut Option<u64>,
    end: EndPosition,
) -> BlockOutcome {
    let number = event.number;

    if let Some(want) = *expected {
        if number < want {
            // Replays of already-dispatched blocks are dropped so no
            // listener ever sees a duplicate.
            warn!(channel = %inner.channel_id, number, want, "dropping replayed block");
            return BlockOutcome::Continue;
        }
        if number > want {
            return BlockOutcome::Fatal(CloseReason::StreamError(format!(
                "block gap: expected {want}, got {number}"
            )));
        }
    }
    *expected = Some(number + 1);
    *inner.last_block.lock().expect("last block lock") = Some(number);

    let event = Arc::new(event);
    let plan = inner.listeners.lock().expect("listener lock").dispatch_plan(&event);
    // Callbacks run outside the registry lock so they may re-enter the
    // service (unregister, register, even close).
    for (callback, message) in plan {
        callback(&message);
    }

    if end.bound() == Some(number) {
        return BlockOutcome::End;
    }
    BlockOutcome::Continue
}
