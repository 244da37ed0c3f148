mod common;

use chunkpay::domain::packet::PacketType;
use chunkpay::{Amount, PaymentConfig, PaymentEngine, PaymentError, SendRequest, TransportError};
use common::{Action, ScriptedTransport, secret};
use std::time::Duration;
use tokio::time::Instant;

fn send_request(amount: u64) -> SendRequest {
    SendRequest {
        source_amount: Amount::from(amount),
        shared_secret: secret(),
        destination_account: "receiver".to_string(),
    }
}

fn gaps(transport: &ScriptedTransport) -> Vec<Duration> {
    transport
        .calls()
        .windows(2)
        .map(|w| w[1].at.duration_since(w[0].at))
        .collect()
}

#[tokio::test(start_paused = true)]
async fn test_temporary_rejections_shrink_and_back_off() {
    let transport = ScriptedTransport::new(|call| match call.index {
        0..=2 => Action::Reject {
            code: "T04",
            ack: None,
        },
        _ => Action::Fulfill {
            claimed_total: call.amount.to_wire(),
        },
    });
    let engine = PaymentEngine::new(Box::new(transport.clone()));

    let receipt = engine.send(send_request(10000)).await.unwrap();
    assert_eq!(receipt.source_amount, Amount::from(10000));

    let calls = transport.calls();
    let amounts: Vec<u64> = calls.iter().take(5).map(|c| c.amount.to_wire()).collect();
    assert_eq!(amounts, vec![1000, 500, 250, 125, 138]);

    let waits = gaps(&transport);
    assert!(waits[0] >= Duration::from_millis(100));
    assert!(waits[1] >= Duration::from_millis(200));
    assert!(waits[2] >= Duration::from_millis(400));
    // Success resets the wait.
    assert!(waits[3] < Duration::from_millis(100));
    // Retried attempts do not consume sequence numbers.
    assert!(calls.iter().take(4).all(|c| c.packet.sequence == 0));
    assert_eq!(calls[4].packet.sequence, 1);
}

#[tokio::test(start_paused = true)]
async fn test_relative_errors_are_retryable() {
    let transport = ScriptedTransport::new(|call| match call.index {
        0 => Action::Reject {
            code: "R00",
            ack: None,
        },
        _ => Action::Fulfill {
            claimed_total: call.amount.to_wire(),
        },
    });
    let engine = PaymentEngine::new(Box::new(transport.clone()));
    engine.send(send_request(400)).await.unwrap();

    let calls = transport.calls();
    let amounts: Vec<u64> = calls.iter().map(|c| c.amount.to_wire()).collect();
    assert_eq!(amounts, vec![400, 200, 200]);
    // The shrunk retry no longer covers the remainder, so it is not the last chunk.
    assert_eq!(calls[0].packet.packet_type, PacketType::LastChunk);
    assert_eq!(calls[1].packet.packet_type, PacketType::Chunk);
    assert_eq!(calls[2].packet.packet_type, PacketType::LastChunk);
}

#[tokio::test(start_paused = true)]
async fn test_wait_resets_after_success() {
    let transport = ScriptedTransport::new(|call| match call.index {
        0 | 1 | 3 => Action::Reject {
            code: "T01",
            ack: None,
        },
        _ => Action::Fulfill {
            claimed_total: 0,
        },
    });
    let engine = PaymentEngine::new(Box::new(transport.clone()));
    engine.send(send_request(10000)).await.unwrap();

    let waits = gaps(&transport);
    assert!(waits[1] >= Duration::from_millis(200));
    // Call 3 follows a success, so its rejection starts again from the minimum.
    assert!(waits[3] >= Duration::from_millis(100));
    assert!(waits[3] < Duration::from_millis(200));
}

#[tokio::test(start_paused = true)]
async fn test_endless_temporary_rejections_never_complete() {
    let transport = ScriptedTransport::new(|_| Action::Reject {
        code: "T04",
        ack: None,
    });
    let engine = PaymentEngine::new(Box::new(transport.clone()));

    let outcome =
        tokio::time::timeout(Duration::from_secs(600), engine.send(send_request(10000))).await;
    assert!(outcome.is_err(), "payment should still be retrying");

    let calls = transport.calls();
    assert!(calls.len() > 10);
    assert_eq!(calls.last().unwrap().amount, Amount::ONE);
}

#[tokio::test(start_paused = true)]
async fn test_retry_ceiling_aborts_payment() {
    let transport = ScriptedTransport::new(|_| Action::Reject {
        code: "T04",
        ack: None,
    });
    let engine = PaymentEngine::new(Box::new(transport.clone()))
        .with_config(PaymentConfig::default().with_max_consecutive_rejections(Some(12)));

    let err = engine.send(send_request(10000)).await.unwrap_err();

    assert!(matches!(
        err.root(),
        PaymentError::RetryLimitExceeded { attempts: 12 }
    ));
    assert_eq!(transport.calls().len(), 12);
    assert_eq!(transport.calls().last().unwrap().amount, Amount::ONE);
    assert_eq!(err.progress().unwrap().num_chunks, 0);
}

#[tokio::test(start_paused = true)]
async fn test_elapsed_time_ceiling_aborts_payment() {
    let transport = ScriptedTransport::new(|_| Action::Reject {
        code: "T04",
        ack: None,
    });
    let engine = PaymentEngine::new(Box::new(transport))
        .with_config(PaymentConfig::default().with_max_duration(Some(Duration::from_secs(5))));

    let started = Instant::now();
    let err = engine.send(send_request(10000)).await.unwrap_err();
    let limit = Duration::from_secs(5);
    let tolerance = Duration::from_millis(10);

    // Backoff waits are cut short at the deadline instead of overshooting it.
    assert!(matches!(
        err.root(),
        PaymentError::DeadlineExceeded { elapsed } if *elapsed >= limit && *elapsed <= limit + tolerance
    ));
    assert!(started.elapsed() <= limit + tolerance);
}

#[tokio::test(start_paused = true)]
async fn test_elapsed_time_ceiling_bounds_unanswered_transfer() {
    let transport = ScriptedTransport::new(|call| match call.index {
        0 => Action::Fulfill {
            claimed_total: 1000,
        },
        _ => Action::Hang,
    });
    let engine = PaymentEngine::new(Box::new(transport.clone()))
        .with_config(PaymentConfig::default().with_max_duration(Some(Duration::from_secs(5))));

    let started = Instant::now();
    let err = engine.send(send_request(10000)).await.unwrap_err();

    assert!(matches!(err.root(), PaymentError::DeadlineExceeded { .. }));
    assert!(started.elapsed() <= Duration::from_secs(5) + Duration::from_millis(10));
    assert_eq!(transport.calls().len(), 2);
    assert_eq!(err.progress().unwrap().num_chunks, 1);
}

#[tokio::test(start_paused = true)]
async fn test_partial_progress_reported_on_abort() {
    let transport = ScriptedTransport::new(|call| match call.index {
        0 | 1 => Action::Fulfill {
            claimed_total: 500 * (call.index as u64 + 1),
        },
        _ => Action::Fail(TransportError::Other("link down".to_string())),
    });
    let engine = PaymentEngine::new(Box::new(transport));

    let err = engine.send(send_request(10000)).await.unwrap_err();

    assert!(matches!(
        err.root(),
        PaymentError::Transport(TransportError::Other(msg)) if msg == "link down"
    ));
    let progress = err.progress().unwrap();
    assert_eq!(progress.num_chunks, 2);
    assert_eq!(progress.source_amount, Amount::from(2100));
    assert_eq!(progress.destination_amount, Amount::from(1000));
}
