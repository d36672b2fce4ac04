//! Integration tests for the full gesture-link pipeline.
//!
//! These tests verify end-to-end behavior: hand detection -> finger state ->
//! gate -> complemented command -> WebSocket -> loopback actuator, plus the
//! failure paths where the actuator is missing or misbehaves.

use async_trait::async_trait;
use gesture_link_core::{
    actuator::{AckMode, LoopbackActuator},
    command::{AckPayload, CommandMessage},
    debounce::{DebounceConfig, GatePhase},
    error::{PoseError, TransportError},
    pipeline::{FrameOutcome, Pipeline},
    pose::{HandDetection, Handedness, PoseSource},
    transport::{Transport, TransportConfig, WsTransport},
};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::oneshot;

type Frame = Result<Option<HandDetection>, PoseError>;

fn hand(s: &str) -> Frame {
    Ok(Some(HandDetection::synthetic(
        Handedness::Right,
        s.parse().unwrap(),
    )))
}

fn secs(s: f64) -> Duration {
    Duration::from_secs_f64(s)
}

fn config() -> DebounceConfig {
    DebounceConfig::from_secs(0.5, 0.5).unwrap()
}

fn fast_transport() -> WsTransport {
    WsTransport::new(TransportConfig {
        connect_timeout: Duration::from_secs(2),
        ack_timeout: Duration::from_millis(300),
        close_timeout: Duration::from_millis(100),
    })
}

/// Source that never yields a frame; tests drive `process` directly.
struct Idle;

#[async_trait]
impl PoseSource for Idle {
    async fn next_frame(&mut self) -> Frame {
        std::future::pending().await
    }
}

/// Plays back frames separated by gaps, then signals it has run dry.
struct ScriptedSource {
    frames: VecDeque<(Duration, Frame)>,
    drained: Option<oneshot::Sender<()>>,
    released: Arc<AtomicBool>,
}

#[async_trait]
impl PoseSource for ScriptedSource {
    async fn next_frame(&mut self) -> Frame {
        match self.frames.pop_front() {
            Some((gap, frame)) => {
                tokio::time::sleep(gap).await;
                frame
            }
            None => {
                if let Some(drained) = self.drained.take() {
                    let _ = drained.send(());
                }
                std::future::pending().await
            }
        }
    }

    async fn release(&mut self) {
        self.released.store(true, Ordering::SeqCst);
    }
}

/// Records commands; fails the first `failures` sends with `ConnectFailed`.
#[derive(Default)]
struct FlakyTransport {
    failures: usize,
    calls: AtomicUsize,
    sent: Mutex<Vec<String>>,
}

#[async_trait]
impl Transport for FlakyTransport {
    async fn send(
        &self,
        message: &CommandMessage,
        endpoint: &str,
    ) -> Result<AckPayload, TransportError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        self.sent.lock().unwrap().push(message.as_str().to_string());
        if call < self.failures {
            return Err(TransportError::ConnectFailed {
                endpoint: endpoint.to_string(),
                reason: "connection refused".into(),
            });
        }
        Ok(AckPayload::new(message.as_str()))
    }
}

async fn unused_endpoint() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("ws://{addr}/ws")
}

/// Command reaches the actuator and its echo comes back as the ack.
#[tokio::test]
async fn test_transport_echo_ack() {
    let (actuator, mut received) = LoopbackActuator::bind("127.0.0.1:0", AckMode::Echo)
        .await
        .unwrap();
    let endpoint = actuator.endpoint().unwrap();
    let server = tokio::spawn(actuator.serve());

    let message = CommandMessage::for_gesture("01100".parse().unwrap());
    let ack = fast_transport().send(&message, &endpoint).await.unwrap();

    assert_eq!(ack.as_str(), "10011");
    assert_eq!(received.recv().await.unwrap(), "10011");

    server.abort();
}

/// Each send uses its own connection; two sends, two commands.
#[tokio::test]
async fn test_transport_fresh_connection_per_send() {
    let (actuator, mut received) = LoopbackActuator::bind("127.0.0.1:0", AckMode::Echo)
        .await
        .unwrap();
    let endpoint = actuator.endpoint().unwrap();
    let server = tokio::spawn(actuator.serve());

    let transport = fast_transport();
    for text in ["00000", "11111"] {
        let message = CommandMessage::for_gesture(text.parse().unwrap());
        transport.send(&message, &endpoint).await.unwrap();
    }

    assert_eq!(received.recv().await.unwrap(), "11111");
    assert_eq!(received.recv().await.unwrap(), "00000");

    server.abort();
}

/// Actuator that hangs up instead of acknowledging.
#[tokio::test]
async fn test_transport_close_without_ack() {
    let (actuator, mut received) = LoopbackActuator::bind("127.0.0.1:0", AckMode::Close)
        .await
        .unwrap();
    let endpoint = actuator.endpoint().unwrap();
    let server = tokio::spawn(actuator.serve());

    let message = CommandMessage::for_gesture("10000".parse().unwrap());
    let err = fast_transport().send(&message, &endpoint).await.unwrap_err();

    assert!(matches!(err, TransportError::NoAck { .. }), "got {err:?}");
    assert_eq!(received.recv().await.unwrap(), "01111");

    server.abort();
}

/// Actuator that never answers: the ack timeout turns the hang into `NoAck`.
#[tokio::test]
async fn test_transport_ack_timeout() {
    let (actuator, _received) = LoopbackActuator::bind("127.0.0.1:0", AckMode::Silent)
        .await
        .unwrap();
    let endpoint = actuator.endpoint().unwrap();
    let server = tokio::spawn(actuator.serve());

    let message = CommandMessage::for_gesture("11111".parse().unwrap());
    let started = std::time::Instant::now();
    let err = fast_transport().send(&message, &endpoint).await.unwrap_err();

    assert!(matches!(err, TransportError::NoAck { .. }), "got {err:?}");
    assert!(started.elapsed() < Duration::from_secs(2));

    server.abort();
}

/// A peer that accepts TCP but never completes the handshake.
#[tokio::test]
async fn test_transport_connect_timeout() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let endpoint = format!("ws://{}/ws", listener.local_addr().unwrap());
    let server = tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((stream, _)) = listener.accept().await {
            held.push(stream);
        }
    });

    let transport = WsTransport::new(TransportConfig {
        connect_timeout: Duration::from_millis(300),
        ..TransportConfig::default()
    });
    let message = CommandMessage::for_gesture("00000".parse().unwrap());
    let started = std::time::Instant::now();
    let err = transport.send(&message, &endpoint).await.unwrap_err();

    assert!(
        matches!(
            err,
            TransportError::ConnectFailed { ref reason, .. } if reason.contains("timed out")
        ),
        "got {err:?}"
    );
    assert!(started.elapsed() >= Duration::from_millis(300));
    assert!(started.elapsed() < Duration::from_secs(2));

    server.abort();
}

/// `wss://` goes through a TLS handshake; against a plain-text actuator that
/// handshake fails, but TLS itself is available.
#[tokio::test]
async fn test_transport_wss_attempts_tls() {
    let (actuator, _received) = LoopbackActuator::bind("127.0.0.1:0", AckMode::Echo)
        .await
        .unwrap();
    let endpoint = format!("wss://{}/ws", actuator.local_addr().unwrap());
    let server = tokio::spawn(actuator.serve());

    let message = CommandMessage::for_gesture("00000".parse().unwrap());
    let err = fast_transport().send(&message, &endpoint).await.unwrap_err();

    match err {
        TransportError::ConnectFailed { reason, .. } => {
            assert!(!reason.contains("not compiled"), "TLS unavailable: {reason}");
        }
        other => panic!("expected ConnectFailed, got {other:?}"),
    }

    server.abort();
}

/// Unreachable actuator: every confirmed gesture still gets its own attempt
/// and the loop keeps going.
#[tokio::test]
async fn test_pipeline_survives_unreachable_endpoint() {
    let endpoint = unused_endpoint().await;
    let mut pipeline = Pipeline::new(Idle, fast_transport(), endpoint, config());

    let first = pipeline.process(hand("00000"), secs(0.0)).await;
    assert!(matches!(
        first,
        FrameOutcome::DeliveryFailed {
            error: TransportError::ConnectFailed { .. },
            ..
        }
    ));

    let second = pipeline.process(hand("11000"), secs(0.6)).await;
    assert!(matches!(
        second,
        FrameOutcome::DeliveryFailed {
            error: TransportError::ConnectFailed { .. },
            ..
        }
    ));

    assert_eq!(pipeline.metrics().gestures_confirmed, 2);
    assert_eq!(pipeline.metrics().connect_failures, 2);
    assert_eq!(pipeline.gate().phase(), GatePhase::Cooling);
}

/// A dropped command is not retried; the next confirmed gesture goes out.
#[tokio::test]
async fn test_pipeline_no_retry_after_failure() {
    let transport = FlakyTransport {
        failures: 1,
        ..Default::default()
    };
    let mut pipeline = Pipeline::new(Idle, transport, "ws://10.0.0.2:81/ws", config());

    assert!(pipeline.process(hand("00000"), secs(0.0)).await.is_confirmed());
    assert_eq!(pipeline.process(hand("00000"), secs(0.7)).await, FrameOutcome::Unchanged);
    let outcome = pipeline.process(hand("01100"), secs(1.4)).await;
    assert!(matches!(outcome, FrameOutcome::Delivered { ref ack, .. } if ack.as_str() == "10011"));

    assert_eq!(
        *pipeline.transport().sent.lock().unwrap(),
        vec!["11111".to_string(), "10011".to_string()]
    );
    assert_eq!(pipeline.metrics().commands_delivered, 1);
    assert_eq!(pipeline.metrics().connect_failures, 1);
}

/// Full loop against the loopback actuator.
#[tokio::test]
async fn test_pipeline_end_to_end() {
    let (actuator, mut received) = LoopbackActuator::bind("127.0.0.1:0", AckMode::Echo)
        .await
        .unwrap();
    let endpoint = actuator.endpoint().unwrap();
    let server = tokio::spawn(actuator.serve());

    let mut pipeline = Pipeline::new(Idle, fast_transport(), endpoint, config());

    let outcomes = vec![
        pipeline.process(hand("00000"), secs(0.0)).await,
        pipeline.process(hand("00000"), secs(0.1)).await,
        pipeline.process(hand("11000"), secs(0.6)).await,
    ];

    assert!(outcomes[0].is_confirmed());
    assert_eq!(outcomes[1], FrameOutcome::Cooling);
    assert!(matches!(
        outcomes[2],
        FrameOutcome::Delivered { ref command, .. } if command.as_str() == "00111"
    ));

    assert_eq!(received.recv().await.unwrap(), "11111");
    assert_eq!(received.recv().await.unwrap(), "00111");
    assert_eq!(pipeline.metrics().commands_delivered, 2);

    server.abort();
}

/// The loop runs on its own clock, stops on the shutdown signal and
/// releases the source.
#[tokio::test(start_paused = true)]
async fn test_run_until_shutdown() {
    let (drained_tx, drained_rx) = oneshot::channel();
    let released = Arc::new(AtomicBool::new(false));

    let frames: VecDeque<(Duration, Frame)> = vec![
        (Duration::ZERO, hand("00000")),
        (Duration::from_millis(100), hand("00000")),
        (Duration::from_millis(100), hand("01000")),
        (Duration::from_millis(400), hand("01000")),
        (Duration::from_millis(50), Ok(None)),
        (Duration::from_millis(50), Err(PoseError::Extraction("blurred".into()))),
        (Duration::from_millis(500), hand("01000")),
    ]
    .into();

    let source = ScriptedSource {
        frames,
        drained: Some(drained_tx),
        released: released.clone(),
    };
    let mut pipeline = Pipeline::new(
        source,
        FlakyTransport::default(),
        "ws://10.0.0.2:81/ws",
        config(),
    );
    let status = pipeline.subscribe_status();

    let metrics = pipeline
        .run_until(async {
            let _ = drained_rx.await;
        })
        .await;

    assert!(released.load(Ordering::SeqCst));
    assert_eq!(
        *pipeline.transport().sent.lock().unwrap(),
        vec!["11111".to_string(), "10111".to_string()]
    );
    assert_eq!(metrics.frames, 7);
    assert_eq!(metrics.hands_detected, 5);
    assert_eq!(metrics.extractor_errors, 1);
    assert_eq!(metrics.discarded_cooling, 2);
    assert_eq!(metrics.discarded_unchanged, 1);
    assert_eq!(metrics.gestures_confirmed, 2);
    assert!(metrics.end_time.is_some());
    assert_eq!(status.borrow().to_string(), "Ready");
}
