use std::sync::atomic::AtomicU32;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use super::async_task::task_with_timeout_and_exponential_backoff;
use crate::BackoffPolicy;
use crate::Error;
use crate::UsageError;

fn policy(max_retries: usize) -> BackoffPolicy {
    BackoffPolicy {
        base_delay_ms: 10,
        max_delay_ms: 100,
        timeout_ms: 1000,
        max_retries,
        jitter: false,
    }
}

#[tokio::test(start_paused = true)]
async fn test_task_with_timeout_and_exponential_backoff_success() {
    let counter = Arc::new(AtomicU32::new(0));
    let failures = Arc::new(AtomicU32::new(0));
    let counter_clone = counter.clone();
    let failures_clone = failures.clone();

    let task = move || {
        let counter = counter_clone.clone();
        async move {
            let current = counter.fetch_add(1, Ordering::SeqCst);
            if current == 0 {
                Err(Error::Fatal("First attempt fails".to_string()))
            } else {
                Ok::<_, crate::Error>(current)
            }
        }
    };

    let token = CancellationToken::new();
    let result = task_with_timeout_and_exponential_backoff("test", task, policy(3), &token, |_| {
        failures_clone.fetch_add(1, Ordering::SeqCst);
    })
    .await;

    assert_eq!(result.unwrap(), 1);
    assert_eq!(counter.load(Ordering::SeqCst), 2); // 1 failure + 1 success
    assert_eq!(failures.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn test_task_with_timeout_and_exponential_backoff_max_retries() {
    let counter = Arc::new(AtomicU32::new(0));
    let counter_clone = counter.clone();

    let task = move || {
        let counter = counter_clone.clone();
        async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Err::<u32, _>(Error::Fatal("Always fails".to_string()))
        }
    };

    let token = CancellationToken::new();
    let result = task_with_timeout_and_exponential_backoff("list", task, policy(3), &token, |_| {}).await;

    match result {
        Err(Error::RetryExhausted {
            operation,
            attempts,
            source,
        }) => {
            assert_eq!(operation, "list");
            assert_eq!(attempts, 3);
            assert!(matches!(*source, Error::Fatal(_)));
        }
        other => panic!("unexpected result: {other:?}"),
    }
    assert_eq!(counter.load(Ordering::SeqCst), 3);
}

#[tokio::test(start_paused = true)]
async fn test_task_with_timeout_and_exponential_backoff_timeout() {
    let counter = Arc::new(AtomicU32::new(0));
    let counter_clone = counter.clone();

    let task = move || {
        let counter = counter_clone.clone();
        async move {
            counter.fetch_add(1, Ordering::SeqCst);
            // Simulate a long-running task that will timeout
            tokio::time::sleep(Duration::from_millis(500)).await;
            Ok::<u32, _>(42)
        }
    };

    let mut short = policy(2);
    short.timeout_ms = 100;

    let token = CancellationToken::new();
    let result = task_with_timeout_and_exponential_backoff("slow", task, short, &token, |e| {
        assert!(matches!(e, Error::Timeout { .. }));
    })
    .await;

    assert!(matches!(result, Err(Error::RetryExhausted { .. })));
    assert_eq!(counter.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn test_unlimited_retries_stop_on_cancellation() {
    let counter = Arc::new(AtomicU32::new(0));
    let counter_clone = counter.clone();

    let task = move || {
        let counter = counter_clone.clone();
        async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Err::<u32, _>(Error::Fatal("down".to_string()))
        }
    };

    let token = CancellationToken::new();
    let canceller = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(250)).await;
        canceller.cancel();
    });

    let result = task_with_timeout_and_exponential_backoff("forever", task, policy(0), &token, |_| {}).await;

    assert!(matches!(result, Err(Error::Usage(UsageError::Stopped))));
    assert!(counter.load(Ordering::SeqCst) > 1);
}
