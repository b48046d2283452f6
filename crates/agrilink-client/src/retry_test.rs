use std::sync::atomic::AtomicU32;

use tokio::time::Instant;

use super::*;

fn status(status: u16) -> NormalizedError {
    NormalizedError {
        status,
        message: format!("status {status}"),
        field_errors: None,
    }
}

fn millis(d: Duration) -> u128 {
    d.as_millis()
}

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

#[test]
fn classification_follows_status_ranges() {
    assert!(ErrorClass::Unstructured.is_retryable());
    assert!(ErrorClass::Status(0).is_retryable());
    assert!(ErrorClass::Status(408).is_retryable());
    assert!(ErrorClass::Status(429).is_retryable());
    assert!(ErrorClass::Status(500).is_retryable());
    assert!(ErrorClass::Status(599).is_retryable());

    assert!(!ErrorClass::Status(400).is_retryable());
    assert!(!ErrorClass::Status(404).is_retryable());
    assert!(!ErrorClass::Status(422).is_retryable());
    assert!(!ErrorClass::Status(302).is_retryable());
    assert!(!ErrorClass::Status(600).is_retryable());
    assert!(!ErrorClass::Terminal.is_retryable());
}

#[test]
fn classification_is_pure() {
    for code in [0, 200, 404, 408, 429, 503] {
        let class = status(code).error_class();
        assert_eq!(class.is_retryable(), class.is_retryable());
        assert_eq!(class, status(code).error_class());
    }
}

#[test]
fn local_api_errors_are_terminal() {
    let malformed = ApiError::MalformedResponse {
        reason: "no id".to_owned(),
    };
    assert_eq!(malformed.error_class(), ErrorClass::Terminal);
    assert_eq!(ApiError::Cancelled.error_class(), ErrorClass::Terminal);
    assert_eq!(
        ApiError::Status(status(503)).error_class(),
        ErrorClass::Status(503)
    );
}

#[test]
fn max_attempts_per_class() {
    let policy = RetryPolicy::default();
    assert_eq!(policy.max_attempts(ErrorClass::Unstructured), 3);
    assert_eq!(policy.max_attempts(ErrorClass::Status(0)), 3);
    assert_eq!(policy.max_attempts(ErrorClass::Status(408)), 3);
    assert_eq!(policy.max_attempts(ErrorClass::Status(429)), 2);
    assert_eq!(policy.max_attempts(ErrorClass::Status(500)), 3);
    assert_eq!(policy.max_attempts(ErrorClass::Status(404)), 0);
    assert_eq!(policy.max_attempts(ErrorClass::Terminal), 0);
}

// ---------------------------------------------------------------------------
// Delay
// ---------------------------------------------------------------------------

#[test]
fn first_rate_limit_delay_is_within_jitter_band() {
    let policy = RetryPolicy::default();
    for _ in 0..200 {
        let delay = millis(policy.delay(0, ErrorClass::Status(429)));
        assert!((5_000..6_250).contains(&delay), "delay {delay}ms");
    }
}

#[test]
fn first_server_error_delay_is_within_jitter_band() {
    let policy = RetryPolicy::default();
    for _ in 0..200 {
        let delay = millis(policy.delay(0, ErrorClass::Status(500)));
        assert!((2_000..2_500).contains(&delay), "delay {delay}ms");
    }
}

#[test]
fn delay_doubles_per_attempt() {
    let policy = RetryPolicy::default();
    let class = ErrorClass::Status(0);
    assert_eq!(millis(policy.delay_with_jitter(0, class, 0.0)), 1_000);
    assert_eq!(millis(policy.delay_with_jitter(1, class, 0.0)), 2_000);
    assert_eq!(millis(policy.delay_with_jitter(2, class, 0.0)), 4_000);
    assert_eq!(
        millis(policy.delay_with_jitter(0, ErrorClass::Status(408), 0.0)),
        3_000
    );
}

#[test]
fn jitter_is_clamped_to_policy_fraction() {
    let policy = RetryPolicy::default();
    let class = ErrorClass::Status(0);
    assert_eq!(millis(policy.delay_with_jitter(0, class, 0.1)), 1_100);
    assert_eq!(millis(policy.delay_with_jitter(0, class, 5.0)), 1_250);
    assert_eq!(millis(policy.delay_with_jitter(0, class, -1.0)), 1_000);
    assert_eq!(millis(policy.delay_with_jitter(0, class, f64::NAN)), 1_000);
}

#[test]
fn delay_never_exceeds_cap() {
    let policy = RetryPolicy::default();
    for attempt in [3, 5, 10, 40, u32::MAX] {
        for class in [ErrorClass::Status(429), ErrorClass::Status(503)] {
            let delay = policy.delay_with_jitter(attempt, class, 0.2499);
            assert!(delay <= Duration::from_secs(30), "{attempt}: {delay:?}");
        }
    }
    assert_eq!(
        policy.delay_with_jitter(10, ErrorClass::Status(500), 0.0),
        Duration::from_secs(30)
    );
}

#[test]
fn zero_jitter_fraction_is_deterministic() {
    let policy = RetryPolicy {
        max_jitter_fraction: 0.0,
        ..RetryPolicy::default()
    };
    assert_eq!(
        policy.delay(1, ErrorClass::Status(502)),
        Duration::from_millis(4_000)
    );
}

#[test]
fn status_message_counts_down() {
    assert_eq!(
        retry_status_message(0, 3, Duration::from_millis(2_100)),
        "Retrying in 3 seconds... (3 attempts remaining)"
    );
    assert_eq!(
        retry_status_message(1, 2, Duration::from_millis(1_000)),
        "Retrying in 1 second... (1 attempt remaining)"
    );
    assert_eq!(
        retry_status_message(2, 2, Duration::from_millis(1_000)),
        "Maximum retry attempts reached"
    );
}

// ---------------------------------------------------------------------------
// Loop
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn succeeds_immediately_on_first_try() {
    let calls = Arc::new(AtomicU32::new(0));
    let c = Arc::clone(&calls);
    let result = run_with_retry(&RetryPolicy::default(), "test", || {
        let c = Arc::clone(&c);
        async move {
            c.fetch_add(1, Ordering::SeqCst);
            Ok::<u32, NormalizedError>(42)
        }
    })
    .await;
    assert_eq!(result.unwrap(), 42);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn non_retryable_error_runs_once_and_is_returned_unchanged() {
    let calls = Arc::new(AtomicU32::new(0));
    let c = Arc::clone(&calls);
    let original = NormalizedError {
        status: 404,
        message: "Listing not found".to_owned(),
        field_errors: None,
    };
    let expected = original.clone();
    let started = Instant::now();
    let result = run_with_retry(&RetryPolicy::default(), "get listing", || {
        let c = Arc::clone(&c);
        let original = original.clone();
        async move {
            c.fetch_add(1, Ordering::SeqCst);
            Err::<(), _>(original)
        }
    })
    .await;
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(result.unwrap_err(), expected);
    assert_eq!(started.elapsed(), Duration::ZERO);
}

#[tokio::test(start_paused = true)]
async fn two_server_errors_then_success_runs_three_times() {
    let calls = Arc::new(AtomicU32::new(0));
    let c = Arc::clone(&calls);
    let started = Instant::now();
    let result = run_with_retry(&RetryPolicy::default(), "create listing", || {
        let c = Arc::clone(&c);
        async move {
            if c.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(status(500))
            } else {
                Ok("created")
            }
        }
    })
    .await;
    assert_eq!(result.unwrap(), "created");
    assert_eq!(calls.load(Ordering::SeqCst), 3);
    // 2 000 ms + 4 000 ms, each with up to 25 % jitter.
    let waited = started.elapsed();
    assert!(waited >= Duration::from_millis(6_000), "{waited:?}");
    assert!(waited < Duration::from_millis(7_500), "{waited:?}");
}

#[tokio::test(start_paused = true)]
async fn persistent_rate_limit_gives_up_after_two_retries() {
    let calls = Arc::new(AtomicU32::new(0));
    let c = Arc::clone(&calls);
    let result = run_with_retry(&RetryPolicy::default(), "list", || {
        let c = Arc::clone(&c);
        async move {
            c.fetch_add(1, Ordering::SeqCst);
            Err::<(), _>(status(429))
        }
    })
    .await;
    assert_eq!(result.unwrap_err().status, 429);
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[tokio::test(start_paused = true)]
async fn error_class_change_uses_the_latest_errors_budget() {
    // 503 then 429: the 429 arrives at retry index 1, below its budget of 2.
    let calls = Arc::new(AtomicU32::new(0));
    let c = Arc::clone(&calls);
    let result = run_with_retry(&RetryPolicy::default(), "list", || {
        let c = Arc::clone(&c);
        async move {
            match c.fetch_add(1, Ordering::SeqCst) {
                0 => Err(status(503)),
                1 => Err(status(429)),
                _ => Ok(()),
            }
        }
    })
    .await;
    assert!(result.is_ok());
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[tokio::test(start_paused = true)]
async fn observer_sees_each_scheduled_retry() {
    let mut seen: Vec<(u32, u32, u16)> = Vec::new();
    let calls = Arc::new(AtomicU32::new(0));
    let c = Arc::clone(&calls);
    let result = run_with_retry_observed(
        &RetryPolicy::default(),
        "update listing",
        None,
        |ctx: &RetryContext<'_, NormalizedError>| {
            assert_eq!(ctx.context, "update listing");
            assert!(ctx.delay >= Duration::from_secs(3));
            seen.push((ctx.attempt, ctx.max_attempts, ctx.last_error.status));
        },
        || {
            let c = Arc::clone(&c);
            async move {
                if c.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(status(408))
                } else {
                    Ok(())
                }
            }
        },
    )
    .await;
    assert!(result.is_ok());
    assert_eq!(seen, [(0, 3, 408), (1, 3, 408)]);
}

#[tokio::test(start_paused = true)]
async fn cancellation_cuts_back_off_short() {
    let token = CancellationToken::new();
    let canceller = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        canceller.cancel();
    });

    let calls = Arc::new(AtomicU32::new(0));
    let c = Arc::clone(&calls);
    let started = Instant::now();
    let result = run_with_retry_observed(
        &RetryPolicy::default(),
        "create listing",
        Some(&token),
        |_: &RetryContext<'_, NormalizedError>| {},
        || {
            let c = Arc::clone(&c);
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(status(502))
            }
        },
    )
    .await;

    assert_eq!(result.unwrap_err().status, 502);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(started.elapsed() < Duration::from_secs(2));
}

#[tokio::test(start_paused = true)]
async fn already_cancelled_token_stops_before_first_retry() {
    let token = CancellationToken::new();
    token.cancel();
    let calls = Arc::new(AtomicU32::new(0));
    let c = Arc::clone(&calls);
    let result = run_with_retry_observed(
        &RetryPolicy::default(),
        "list",
        Some(&token),
        |_: &RetryContext<'_, NormalizedError>| panic!("no retry should be scheduled"),
        || {
            let c = Arc::clone(&c);
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(status(0))
            }
        },
    )
    .await;
    assert!(result.is_err());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn concurrent_loops_do_not_share_state() {
    let policy = RetryPolicy::default();
    let flaky_calls = Arc::new(AtomicU32::new(0));
    let missing_calls = Arc::new(AtomicU32::new(0));

    let fc = Arc::clone(&flaky_calls);
    let flaky = run_with_retry(&policy, "flaky", move || {
        let fc = Arc::clone(&fc);
        async move {
            if fc.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(status(500))
            } else {
                Ok(1)
            }
        }
    });

    let mc = Arc::clone(&missing_calls);
    let missing = run_with_retry(&policy, "missing", move || {
        let mc = Arc::clone(&mc);
        async move {
            mc.fetch_add(1, Ordering::SeqCst);
            Err::<i32, _>(status(404))
        }
    });

    let (flaky, missing) = futures::join!(flaky, missing);
    assert_eq!(flaky.unwrap(), 1);
    assert_eq!(missing.unwrap_err().status, 404);
    assert_eq!(flaky_calls.load(Ordering::SeqCst), 2);
    assert_eq!(missing_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn cancelled_future_resolves_after_cancel() {
    let token = CancellationToken::new();
    let waiter = {
        let token = token.clone();
        tokio::spawn(async move { token.cancelled().await })
    };
    tokio::task::yield_now().await;
    token.cancel();
    waiter.await.unwrap();
    assert!(token.is_cancelled());
}
