// Copyright (c) 2024 The Weft Authors

//! Deliver-session behavior against scripted event sources.

use std::{sync::Arc, time::Duration};
use tokio::sync::mpsc;
use weft_connection_test_utils::{
    blocks::{filtered_block, full_block, status_frame, TxSpec},
    DeliverFrame, MockDeliverer,
};
use weft_crypto::{self_signed, KeyAlgorithm, KeyPair};
use weft_events::{
    CloseReason, EndPosition, Error, EventMessage, EventService, ListenerOptions, StartOptions,
    StartPosition, State,
};
use weft_identity::{Identity, IdentityContext};
use weft_protocol::{common::Status, peer::ChaincodeEvent};

fn context() -> IdentityContext {
    let key = Arc::new(KeyPair::generate(KeyAlgorithm::EcdsaP256));
    let cert = self_signed(&key, "CN=tester,O=org1", Duration::from_secs(3600)).unwrap();
    let identity = Arc::new(Identity::new("Org1MSP", cert.to_pem(), key).unwrap());
    IdentityContext::new(identity)
}

/// A block listener that reports block numbers and close reasons.
fn spy() -> (weft_events::Callback, mpsc::UnboundedReceiver<Result<u64, CloseReason>>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let callback: weft_events::Callback = Arc::new(move |message| match message {
        EventMessage::Block(block) => {
            let _ = tx.send(Ok(block.number));
        }
        EventMessage::Closed(reason) => {
            let _ = tx.send(Err(reason.clone()));
        }
        _ => {}
    });
    (callback, rx)
}

async fn recv<T>(rx: &mut mpsc::UnboundedReceiver<T>) -> T {
    tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("timed out waiting for event")
        .expect("event channel closed")
}

async fn wait_disconnected(service: &EventService) {
    let mut state = service.state_changes();
    tokio::time::timeout(Duration::from_secs(5), state.wait_for(|s| *s == State::Disconnected))
        .await
        .expect("service did not disconnect")
        .unwrap();
}

fn bounded(start: u64, end: u64) -> StartOptions {
    StartOptions {
        start: StartPosition::Specified(start),
        end: EndPosition::Specified(end),
        ..StartOptions::default()
    }
}

#[tokio::test]
async fn replay_window_dispatches_in_order_and_closes() {
    let deliverer = Arc::new(MockDeliverer::new("grpc://peer0:7051").with_session(vec![
        filtered_block("trade", 5, &[TxSpec::valid("tx-5")]).into(),
        filtered_block("trade", 6, &[TxSpec::valid("tx-6")]).into(),
        filtered_block("trade", 7, &[TxSpec::valid("tx-7")]).into(),
    ]));
    let service = EventService::new("trade", deliverer.clone());
    let (callback, mut events) = spy();
    service.register_block_listener(callback, ListenerOptions::default());

    assert_eq!(service.state(), State::Disconnected);
    service.start(&context(), bounded(5, 7)).await.unwrap();

    assert_eq!(recv(&mut events).await, Ok(5));
    assert_eq!(recv(&mut events).await, Ok(6));
    assert_eq!(recv(&mut events).await, Ok(7));
    assert_eq!(recv(&mut events).await, Err(CloseReason::EndBlockReached));

    wait_disconnected(&service).await;
    assert_eq!(service.last_block_number(), Some(7));
    assert_eq!(service.listener_count(), 0);
    assert_eq!(deliverer.seeks().len(), 1);
}

#[tokio::test]
async fn single_block_window_dispatches_exactly_once() {
    let deliverer = Arc::new(MockDeliverer::new("grpc://peer0:7051").with_session(vec![
        filtered_block("trade", 5, &[TxSpec::valid("tx-5")]).into(),
    ]));
    let service = EventService::new("trade", deliverer);
    let (callback, mut events) = spy();
    service.register_block_listener(callback, ListenerOptions::default());

    service.start(&context(), bounded(5, 5)).await.unwrap();

    assert_eq!(recv(&mut events).await, Ok(5));
    assert_eq!(recv(&mut events).await, Err(CloseReason::EndBlockReached));
    wait_disconnected(&service).await;
}

#[tokio::test]
async fn inverted_range_is_rejected_before_any_stream_opens() {
    let deliverer = Arc::new(MockDeliverer::new("grpc://peer0:7051"));
    let service = EventService::new("trade", deliverer.clone());

    let err = service.start(&context(), bounded(7, 5)).await.unwrap_err();
    assert_matches::assert_matches!(err, Error::BadArgs(_));
    assert_eq!(service.state(), State::Disconnected);
    assert!(deliverer.seeks().is_empty());
}

#[tokio::test]
async fn second_start_while_listening_is_rejected() {
    let deliverer = Arc::new(
        MockDeliverer::new("grpc://peer0:7051")
            .with_session(vec![DeliverFrame::Delay(Duration::from_secs(60))]),
    );
    let service = EventService::new("trade", deliverer);
    service.start(&context(), StartOptions::default()).await.unwrap();

    let err = service.start(&context(), StartOptions::default()).await.unwrap_err();
    assert_matches::assert_matches!(err, Error::AlreadyStarted);

    service.close(CloseReason::Requested);
}

#[tokio::test]
async fn unregistered_listener_is_never_invoked() {
    let deliverer = Arc::new(MockDeliverer::new("grpc://peer0:7051").with_session(vec![
        filtered_block("trade", 5, &[TxSpec::valid("tx-5")]).into(),
    ]));
    let service = EventService::new("trade", deliverer);

    let (kept_cb, mut kept) = spy();
    let (dropped_cb, mut dropped) = spy();
    service.register_block_listener(kept_cb, ListenerOptions::default());
    let dropped_id = service.register_block_listener(dropped_cb, ListenerOptions::default());
    assert!(service.unregister(dropped_id));
    assert!(!service.unregister(dropped_id));

    service.start(&context(), bounded(5, 5)).await.unwrap();

    assert_eq!(recv(&mut kept).await, Ok(5));
    wait_disconnected(&service).await;
    assert!(dropped.try_recv().is_err());
}

#[tokio::test]
async fn close_is_idempotent_and_notifies_once() {
    let deliverer = Arc::new(
        MockDeliverer::new("grpc://peer0:7051")
            .with_session(vec![DeliverFrame::Delay(Duration::from_secs(60))]),
    );
    let service = EventService::new("trade", deliverer);
    let (callback, mut events) = spy();
    service.register_block_listener(callback, ListenerOptions::default());

    service.start(&context(), StartOptions::default()).await.unwrap();
    service.close(CloseReason::Requested);
    service.close(CloseReason::Requested);

    assert_eq!(recv(&mut events).await, Err(CloseReason::Requested));
    assert_eq!(service.state(), State::Disconnected);
    // Exactly one terminal notification.
    assert!(events.try_recv().is_err());
}

#[tokio::test]
async fn block_gap_is_a_terminal_stream_error() {
    let deliverer = Arc::new(MockDeliverer::new("grpc://peer0:7051").with_session(vec![
        filtered_block("trade", 5, &[TxSpec::valid("tx-5")]).into(),
        filtered_block("trade", 7, &[TxSpec::valid("tx-7")]).into(),
    ]));
    let service = EventService::new("trade", deliverer);
    let (callback, mut events) = spy();
    service.register_block_listener(callback, ListenerOptions::default());

    service
        .start(
            &context(),
            StartOptions { start: StartPosition::Specified(5), ..StartOptions::default() },
        )
        .await
        .unwrap();

    assert_eq!(recv(&mut events).await, Ok(5));
    assert_matches::assert_matches!(recv(&mut events).await, Err(CloseReason::StreamError(_)));
    wait_disconnected(&service).await;
}

#[tokio::test]
async fn replayed_block_is_dropped_not_duplicated() {
    let deliverer = Arc::new(MockDeliverer::new("grpc://peer0:7051").with_session(vec![
        filtered_block("trade", 5, &[TxSpec::valid("tx-5")]).into(),
        filtered_block("trade", 5, &[TxSpec::valid("tx-5")]).into(),
        filtered_block("trade", 6, &[TxSpec::valid("tx-6")]).into(),
    ]));
    let service = EventService::new("trade", deliverer);
    let (callback, mut events) = spy();
    service.register_block_listener(callback, ListenerOptions::default());

    service.start(&context(), bounded(5, 6)).await.unwrap();

    assert_eq!(recv(&mut events).await, Ok(5));
    assert_eq!(recv(&mut events).await, Ok(6));
    assert_eq!(recv(&mut events).await, Err(CloseReason::EndBlockReached));
}

#[tokio::test]
async fn once_listener_fires_a_single_time() {
    let deliverer = Arc::new(MockDeliverer::new("grpc://peer0:7051").with_session(vec![
        filtered_block("trade", 5, &[TxSpec::valid("tx-5")]).into(),
        filtered_block("trade", 6, &[TxSpec::valid("tx-6")]).into(),
    ]));
    let service = EventService::new("trade", deliverer);

    let (once_cb, mut once_rx) = spy();
    let (all_cb, mut all_rx) = spy();
    service.register_block_listener(once_cb, ListenerOptions { once: true, end_block: None });
    service.register_block_listener(all_cb, ListenerOptions::default());

    service.start(&context(), bounded(5, 6)).await.unwrap();

    assert_eq!(recv(&mut all_rx).await, Ok(5));
    assert_eq!(recv(&mut all_rx).await, Ok(6));
    assert_eq!(recv(&mut all_rx).await, Err(CloseReason::EndBlockReached));

    // The once listener saw block 5 and nothing afterwards, not even
    // the close: it was already unregistered.
    assert_eq!(recv(&mut once_rx).await, Ok(5));
    assert!(once_rx.try_recv().is_err());
}

#[tokio::test]
async fn once_transaction_listener_sees_one_match_even_in_a_busy_block() {
    // Block 5 carries two transactions; an ALL-transaction listener
    // registered with once=true must fire for the first match only.
    let deliverer = Arc::new(MockDeliverer::new("grpc://peer0:7051").with_session(vec![
        filtered_block("trade", 5, &[TxSpec::valid("tx-a"), TxSpec::valid("tx-b")]).into(),
    ]));
    let service = EventService::new("trade", deliverer);

    let (once_sender, mut once_rx) = mpsc::unbounded_channel();
    let once_cb: weft_events::Callback = Arc::new(move |message| {
        if let EventMessage::Transaction { transaction, .. } = message {
            let _ = once_sender.send(transaction.tx_id.clone());
        }
    });
    service.register_transaction_listener(
        None,
        once_cb,
        ListenerOptions { once: true, end_block: None },
    );

    let (all_sender, mut all_rx) = mpsc::unbounded_channel();
    let all_cb: weft_events::Callback = Arc::new(move |message| {
        if let EventMessage::Transaction { transaction, .. } = message {
            let _ = all_sender.send(transaction.tx_id.clone());
        }
    });
    service.register_transaction_listener(None, all_cb, ListenerOptions::default());

    service.start(&context(), bounded(5, 5)).await.unwrap();
    wait_disconnected(&service).await;

    // The plain listener saw both transactions of the block.
    assert_eq!(recv(&mut all_rx).await, "tx-a");
    assert_eq!(recv(&mut all_rx).await, "tx-b");

    // The once listener was spent by its first dispatch.
    assert_eq!(recv(&mut once_rx).await, "tx-a");
    assert!(once_rx.try_recv().is_err());
}

#[tokio::test]
async fn once_chaincode_listener_sees_one_match_even_in_a_busy_block() {
    let event_a = ChaincodeEvent {
        chaincode_id: "asset".into(),
        tx_id: "tx-a".into(),
        event_name: "asset_created".into(),
        payload: b"a1".to_vec(),
    };
    let event_b = ChaincodeEvent {
        chaincode_id: "asset".into(),
        tx_id: "tx-b".into(),
        event_name: "asset_updated".into(),
        payload: b"a2".to_vec(),
    };
    let deliverer = Arc::new(MockDeliverer::new("grpc://peer0:7051").with_session(vec![
        full_block(
            "trade",
            5,
            &[
                TxSpec::with_event("tx-a", event_a),
                TxSpec::with_event("tx-b", event_b),
            ],
        )
        .into(),
    ]));
    let service = EventService::new("trade", deliverer);

    let (sender, mut events) = mpsc::unbounded_channel();
    let callback: weft_events::Callback = Arc::new(move |message| {
        if let EventMessage::ChaincodeEvent { event, .. } = message {
            let _ = sender.send(event.event_name.clone());
        }
    });
    // Both events match the pattern; once=true keeps it to the first.
    service
        .register_chaincode_listener(
            "asset",
            "^asset_",
            callback,
            ListenerOptions { once: true, end_block: None },
        )
        .unwrap();

    let opts = StartOptions {
        start: StartPosition::Specified(5),
        end: EndPosition::Specified(5),
        mode: weft_events::DeliverMode::Full,
    };
    service.start(&context(), opts).await.unwrap();
    wait_disconnected(&service).await;

    assert_eq!(recv(&mut events).await, "asset_created");
    assert!(events.try_recv().is_err());
}

#[tokio::test]
async fn transaction_and_chaincode_listeners_filter() {
    let event = ChaincodeEvent {
        chaincode_id: "asset".into(),
        tx_id: "tx-b".into(),
        event_name: "asset_created".into(),
        payload: b"a1".to_vec(),
    };
    let deliverer = Arc::new(MockDeliverer::new("grpc://peer0:7051").with_session(vec![
        full_block(
            "trade",
            5,
            &[TxSpec::valid("tx-a"), TxSpec::with_event("tx-b", event)],
        )
        .into(),
    ]));
    let service = EventService::new("trade", deliverer);

    let (tx_sender, mut tx_rx) = mpsc::unbounded_channel();
    let tx_cb: weft_events::Callback = Arc::new(move |message| {
        if let EventMessage::Transaction { transaction, .. } = message {
            let _ = tx_sender.send(transaction.tx_id.clone());
        }
    });
    service.register_transaction_listener(Some("tx-b".into()), tx_cb, ListenerOptions::default());

    let (cc_sender, mut cc_rx) = mpsc::unbounded_channel();
    let cc_cb: weft_events::Callback = Arc::new(move |message| {
        if let EventMessage::ChaincodeEvent { event, tx_id, .. } = message {
            let _ = cc_sender.send((tx_id.clone(), event.event_name.clone()));
        }
    });
    service
        .register_chaincode_listener("asset", "^asset_", cc_cb, ListenerOptions::default())
        .unwrap();

    let mode_full = StartOptions {
        start: StartPosition::Specified(5),
        end: EndPosition::Specified(5),
        mode: weft_events::DeliverMode::Full,
    };
    service.start(&context(), mode_full).await.unwrap();

    assert_eq!(recv(&mut tx_rx).await, "tx-b");
    assert_eq!(recv(&mut cc_rx).await, ("tx-b".to_string(), "asset_created".to_string()));
}

#[tokio::test]
async fn bad_event_pattern_is_bad_args() {
    let deliverer = Arc::new(MockDeliverer::new("grpc://peer0:7051"));
    let service = EventService::new("trade", deliverer);
    let callback: weft_events::Callback = Arc::new(|_| {});
    assert_matches::assert_matches!(
        service.register_chaincode_listener("asset", "(unclosed", callback, Default::default()),
        Err(Error::BadArgs(_))
    );
}

#[tokio::test]
async fn non_success_status_closes_with_that_status() {
    let deliverer = Arc::new(
        MockDeliverer::new("grpc://peer0:7051")
            .with_session(vec![status_frame(Status::Forbidden).into()]),
    );
    let service = EventService::new("trade", deliverer);
    let (callback, mut events) = spy();
    service.register_block_listener(callback, ListenerOptions::default());

    service.start(&context(), StartOptions::default()).await.unwrap();
    assert_eq!(recv(&mut events).await, Err(CloseReason::Status(Status::Forbidden)));
}

#[tokio::test]
async fn early_success_status_keeps_the_stream_open() {
    let deliverer = Arc::new(MockDeliverer::new("grpc://peer0:7051").with_session(vec![
        status_frame(Status::Success).into(),
        filtered_block("trade", 5, &[TxSpec::valid("tx-5")]).into(),
    ]));
    let service = EventService::new("trade", deliverer);
    let (callback, mut events) = spy();
    service.register_block_listener(callback, ListenerOptions::default());

    service.start(&context(), bounded(5, 5)).await.unwrap();
    assert_eq!(recv(&mut events).await, Ok(5));
}

#[tokio::test]
async fn unavailable_then_resume_from_next_block() {
    let deliverer = Arc::new(MockDeliverer::new("grpc://peer0:7051"));
    deliverer.push_session(vec![
        filtered_block("trade", 5, &[TxSpec::valid("tx-5")]).into(),
        DeliverFrame::Fail(tonic::Status::unavailable("peer restarting")),
    ]);
    deliverer.push_session(vec![
        filtered_block("trade", 6, &[TxSpec::valid("tx-6")]).into(),
    ]);

    let service = EventService::new("trade", deliverer.clone());
    let (callback, mut events) = spy();
    service.register_block_listener(callback, ListenerOptions::default());

    service
        .start(
            &context(),
            StartOptions { start: StartPosition::Specified(5), ..StartOptions::default() },
        )
        .await
        .unwrap();

    assert_eq!(recv(&mut events).await, Ok(5));
    assert_eq!(recv(&mut events).await, Err(CloseReason::ServiceUnavailable));
    wait_disconnected(&service).await;

    // Resume where we left off.
    let resume_from = service.last_block_number().unwrap() + 1;
    assert_eq!(resume_from, 6);

    let (callback, mut events) = spy();
    service.register_block_listener(callback, ListenerOptions::default());
    service
        .start(
            &context(),
            StartOptions {
                start: StartPosition::Specified(resume_from),
                end: EndPosition::Specified(6),
                ..StartOptions::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(recv(&mut events).await, Ok(6));
    assert_eq!(recv(&mut events).await, Err(CloseReason::EndBlockReached));
    assert_eq!(deliverer.seeks().len(), 2);
}
