// Copyright (c) 2024 The Weft Authors

//! Mock event-source connection.

use async_trait::async_trait;
use std::{
    collections::VecDeque,
    sync::Mutex,
    time::Duration,
};
use tokio::sync::mpsc;
use tonic::Status;
use weft_connection::{BlockStream, DeliverConnection, DeliverMode, EndpointId, Error, Result};
use weft_protocol::{common::Envelope, events::DeliverResponse};

/// One scripted element of a deliver session.
pub enum DeliverFrame {
    /// Emit this frame.
    Response(DeliverResponse),
    /// Fail the stream with a gRPC status.
    Fail(Status),
    /// Wait before continuing the script.
    Delay(Duration),
}

impl From<DeliverResponse> for DeliverFrame {
    fn from(src: DeliverResponse) -> Self {
        Self::Response(src)
    }
}

enum Session {
    /// A fixed script.
    Scripted(Vec<DeliverFrame>),
    /// Frames arrive over a channel while the test runs.
    Live(mpsc::UnboundedReceiver<DeliverFrame>),
}

/// An event source whose deliver sessions are scripted.
///
/// Each call to `deliver` consumes the next queued session. By default
/// a session's stream stays open (pending) after its script is
/// exhausted, like a real deliver stream waiting for future blocks;
/// [`MockDeliverer::closing_after_script`] makes it end instead. A
/// [`MockDeliverer::live_session`] is fed by the test while the stream
/// is being consumed, for flows where frame contents (e.g. transaction
/// ids) are only known mid-test.
pub struct MockDeliverer {
    id: EndpointId,
    sessions: Mutex<VecDeque<Session>>,
    hang_after_script: bool,
    seeks: Mutex<Vec<(Envelope, DeliverMode)>>,
}

impl MockDeliverer {
    pub fn new(url: &str) -> Self {
        Self {
            id: EndpointId::from(url),
            sessions: Mutex::new(VecDeque::new()),
            hang_after_script: true,
            seeks: Mutex::new(Vec::new()),
        }
    }

    /// End the stream when a session script runs out, instead of
    /// leaving it open.
    pub fn closing_after_script(mut self) -> Self {
        self.hang_after_script = false;
        self
    }

    /// Queue one session script; the next `deliver` call plays it.
    pub fn push_session(&self, frames: Vec<DeliverFrame>) {
        self.sessions.lock().unwrap().push_back(Session::Scripted(frames));
    }

    pub fn with_session(self, frames: Vec<DeliverFrame>) -> Self {
        self.push_session(frames);
        self
    }

    /// Queue a live session and return its feeder. Frames sent on the
    /// feeder appear on the stream as they are sent.
    pub fn live_session(&self) -> mpsc::UnboundedSender<DeliverFrame> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.sessions.lock().unwrap().push_back(Session::Live(rx));
        tx
    }

    /// The seek envelopes received so far, with the requested mode.
    pub fn seeks(&self) -> Vec<(Envelope, DeliverMode)> {
        self.seeks.lock().unwrap().clone()
    }
}

#[async_trait]
impl DeliverConnection for MockDeliverer {
    fn id(&self) -> EndpointId {
        self.id.clone()
    }

    async fn deliver(&self, seek: Envelope, mode: DeliverMode) -> Result<BlockStream> {
        self.seeks.lock().unwrap().push((seek, mode));

        let session = self
            .sessions
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| Error::Grpc(Status::unavailable("mock deliverer has no session")))?;
        let hang = self.hang_after_script;

        match session {
            Session::Scripted(frames) => {
                let stream =
                    futures::stream::unfold(frames.into_iter(), move |mut frames| async move {
                        loop {
                            match frames.next() {
                                Some(DeliverFrame::Response(frame)) => {
                                    return Some((Ok(frame), frames))
                                }
                                Some(DeliverFrame::Fail(status)) => {
                                    return Some((Err(Error::Grpc(status)), frames))
                                }
                                Some(DeliverFrame::Delay(delay)) => {
                                    tokio::time::sleep(delay).await;
                                    continue;
                                }
                                None => {
                                    if hang {
                                        futures::future::pending::<()>().await;
                                    }
                                    return None;
                                }
                            }
                        }
                    });
                Ok(Box::pin(stream))
            }
            Session::Live(receiver) => {
                let stream = futures::stream::unfold(receiver, move |mut receiver| async move {
                    loop {
                        match receiver.recv().await {
                            Some(DeliverFrame::Response(frame)) => {
                                return Some((Ok(frame), receiver))
                            }
                            Some(DeliverFrame::Fail(status)) => {
                                return Some((Err(Error::Grpc(status)), receiver))
                            }
                            Some(DeliverFrame::Delay(delay)) => {
                                tokio::time::sleep(delay).await;
                                continue;
                            }
                            None => {
                                if hang {
                                    futures::future::pending::<()>().await;
                                }
                                return None;
                            }
                        }
                    }
                });
                Ok(Box::pin(stream))
            }
        }
    }
}
