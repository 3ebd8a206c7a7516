use callstate_core::{
    CallError, CallOptions, CallStatus, ErrorKind, RecordingNotifier, NETWORK_MESSAGE,
    TIMEOUT_MESSAGE,
};
use callstate_runtime::{CallExecutor, CancellationToken};
use std::sync::{
    atomic::{AtomicU32, Ordering},
    Arc, Mutex,
};
use std::time::Duration;
use tokio::time::{sleep, Instant};

#[tokio::test(start_paused = true)]
async fn network_failure_retries_with_linear_backoff() {
    let attempts = Arc::new(Mutex::new(Vec::<Instant>::new()));
    let log = attempts.clone();
    let executor = CallExecutor::from_fn(
        move |_: Option<()>, _cancel: CancellationToken| {
            log.lock().unwrap().push(Instant::now());
            async { Err::<u32, _>(CallError::from_message("network error")) }
        },
        CallOptions::default().with_retries(2, 100),
    );

    assert_eq!(executor.execute(None).await, None);

    let attempts = attempts.lock().unwrap().clone();
    assert_eq!(attempts.len(), 3);
    let first_gap = attempts[1] - attempts[0];
    let second_gap = attempts[2] - attempts[1];
    assert!(first_gap >= Duration::from_millis(100) && first_gap < Duration::from_millis(150));
    assert!(second_gap >= Duration::from_millis(200) && second_gap < Duration::from_millis(250));

    let state = executor.state();
    assert_eq!(state.status, CallStatus::Failed);
    let failure = state.error.unwrap();
    assert_eq!(failure.kind, ErrorKind::Network);
    assert_eq!(failure.message, NETWORK_MESSAGE);
}

#[tokio::test(start_paused = true)]
async fn persistent_failure_makes_exactly_n_plus_one_attempts() {
    for retries in [0u32, 1, 4] {
        let attempts = Arc::new(AtomicU32::new(0));
        let counter = attempts.clone();
        let executor = CallExecutor::from_fn(
            move |_: Option<()>, _cancel: CancellationToken| {
                counter.fetch_add(1, Ordering::SeqCst);
                async { Err::<(), _>(CallError::failed("boom")) }
            },
            CallOptions::default().with_retries(retries, 5),
        );

        executor.execute(None).await;
        assert_eq!(attempts.load(Ordering::SeqCst), retries + 1);
        assert_eq!(executor.state().status, CallStatus::Failed);
    }
}

#[tokio::test(start_paused = true)]
async fn timeout_fails_before_late_result_and_ignores_it() {
    let executor = CallExecutor::from_fn(
        |_: Option<()>, _cancel: CancellationToken| async {
            sleep(Duration::from_millis(50)).await;
            Ok::<_, CallError>(1u32)
        },
        CallOptions::default().with_timeout_ms(10),
    );

    let started = Instant::now();
    assert_eq!(executor.execute(None).await, None);
    assert!(started.elapsed() < Duration::from_millis(50));

    sleep(Duration::from_millis(100)).await;
    let state = executor.state();
    assert_eq!(state.status, CallStatus::Failed);
    assert!(state.data.is_none());
    assert_eq!(state.error.unwrap().message, TIMEOUT_MESSAGE);
}

#[tokio::test(start_paused = true)]
async fn newer_execute_supersedes_in_flight_attempt() {
    let settled = Arc::new(AtomicU32::new(0));
    let hook_count = settled.clone();
    let executor = CallExecutor::from_fn(
        |params: Option<u64>, _cancel: CancellationToken| async move {
            let delay = params.unwrap_or(0);
            sleep(Duration::from_millis(delay)).await;
            Ok::<_, CallError>(delay)
        },
        CallOptions::default(),
    )
    .on_success(move |_| {
        hook_count.fetch_add(1, Ordering::SeqCst);
    });

    let (slow, fast) = tokio::join!(executor.execute(Some(100)), async {
        sleep(Duration::from_millis(10)).await;
        executor.execute(Some(20)).await
    });

    assert_eq!(slow, None);
    assert_eq!(fast, Some(20));
    assert_eq!(executor.state().data, Some(20));
    assert_eq!(settled.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn superseded_failure_is_silent() {
    let notifier = RecordingNotifier::new();
    let errors = Arc::new(AtomicU32::new(0));
    let error_hook = errors.clone();
    let executor = CallExecutor::from_fn(
        |params: Option<u64>, _cancel: CancellationToken| async move {
            let delay = params.unwrap_or(0);
            sleep(Duration::from_millis(delay)).await;
            if delay >= 100 {
                Err(CallError::failed("stale"))
            } else {
                Ok(delay)
            }
        },
        CallOptions::default(),
    )
    .with_notifier(Arc::new(notifier.clone()))
    .on_error(move |_| {
        error_hook.fetch_add(1, Ordering::SeqCst);
    });

    let (stale, fresh) = tokio::join!(executor.execute(Some(100)), async {
        sleep(Duration::from_millis(10)).await;
        executor.execute(Some(20)).await
    });
    sleep(Duration::from_millis(200)).await;

    assert_eq!(stale, None);
    assert_eq!(fresh, Some(20));
    assert_eq!(errors.load(Ordering::SeqCst), 0);
    assert!(notifier.is_empty());
    let state = executor.state();
    assert_eq!(state.status, CallStatus::Succeeded);
    assert!(state.error.is_none());
}

#[tokio::test(start_paused = true)]
async fn cancelled_failure_is_silent() {
    let notifier = RecordingNotifier::new();
    let errors = Arc::new(AtomicU32::new(0));
    let error_hook = errors.clone();
    let executor = Arc::new(
        CallExecutor::from_fn(
            |_: Option<()>, _cancel: CancellationToken| async {
                sleep(Duration::from_millis(50)).await;
                Err::<u32, _>(CallError::failed("late failure"))
            },
            CallOptions::default(),
        )
        .with_notifier(Arc::new(notifier.clone()))
        .on_error(move |_| {
            error_hook.fetch_add(1, Ordering::SeqCst);
        }),
    );

    let running = executor.clone();
    let handle = tokio::spawn(async move { running.execute(None).await });
    sleep(Duration::from_millis(10)).await;
    executor.cancel();

    assert_eq!(handle.await.unwrap(), None);
    sleep(Duration::from_millis(100)).await;
    assert_eq!(errors.load(Ordering::SeqCst), 0);
    assert!(notifier.is_empty());
    assert!(executor.state().error.is_none());
}

#[tokio::test]
async fn success_after_failure_clears_error() {
    let fail = Arc::new(std::sync::atomic::AtomicBool::new(true));
    let flag = fail.clone();
    let executor = CallExecutor::from_fn(
        move |_: Option<()>, _cancel: CancellationToken| {
            let failing = flag.load(Ordering::SeqCst);
            async move {
                if failing {
                    Err(CallError::failed("not yet"))
                } else {
                    Ok(7)
                }
            }
        },
        CallOptions::default(),
    );

    executor.execute(None).await;
    assert!(executor.state().has_error());

    fail.store(false, Ordering::SeqCst);
    assert_eq!(executor.execute(None).await, Some(7));
    let state = executor.state();
    assert!(state.error.is_none());
    assert_eq!(state.data, Some(7));
    assert_eq!(state.status, CallStatus::Succeeded);
}

#[tokio::test(start_paused = true)]
async fn reset_twice_matches_reset_once() {
    let executor = CallExecutor::from_fn(
        |_: Option<()>, _cancel: CancellationToken| async {
            Err::<u32, _>(CallError::failed("always"))
        },
        CallOptions::default().with_retries(2, 1),
    );

    executor.execute(None).await;
    assert_eq!(executor.retry_count(), 2);

    executor.reset();
    let once = executor.state();
    executor.reset();
    let twice = executor.state();

    assert_eq!(once, twice);
    assert_eq!(twice.status, CallStatus::Idle);
    assert!(twice.data.is_none());
    assert!(twice.error.is_none());
    assert_eq!(executor.retry_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn cancel_during_backoff_stops_retrying() {
    let attempts = Arc::new(AtomicU32::new(0));
    let counter = attempts.clone();
    let executor = Arc::new(CallExecutor::from_fn(
        move |_: Option<()>, _cancel: CancellationToken| {
            counter.fetch_add(1, Ordering::SeqCst);
            async { Err::<(), _>(CallError::network("offline")) }
        },
        CallOptions::default().with_retries(5, 1_000),
    ));

    let running = executor.clone();
    let handle = tokio::spawn(async move { running.execute(None).await });
    sleep(Duration::from_millis(500)).await;
    executor.cancel();

    assert_eq!(handle.await.unwrap(), None);
    sleep(Duration::from_secs(30)).await;
    assert_eq!(attempts.load(Ordering::SeqCst), 1);
    assert_eq!(executor.state().status, CallStatus::Idle);
    assert!(executor.state().error.is_none());
}
