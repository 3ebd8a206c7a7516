use callstate_core::{CallError, CallOptions, CallStatus};
use callstate_runtime::{BatchExecutor, CancellationToken};
use std::time::Duration;
use tokio::time::sleep;

fn three_items() -> BatchExecutor<u32, u32> {
    BatchExecutor::new(&CallOptions::default())
        .with_fn(|_: Option<u32>, _cancel: CancellationToken| async {
            sleep(Duration::from_millis(30)).await;
            Ok::<_, CallError>(1)
        })
        .with_fn(|_: Option<u32>, _cancel: CancellationToken| async {
            Err::<u32, _>(CallError::failed("item rejected"))
        })
        .with_fn(|_: Option<u32>, _cancel: CancellationToken| async {
            sleep(Duration::from_millis(10)).await;
            Ok::<_, CallError>(3)
        })
}

#[tokio::test(start_paused = true)]
async fn failing_slot_does_not_affect_siblings() {
    let batch = three_items();
    let results = batch.execute_all(Vec::new()).await;

    assert_eq!(results, vec![Some(1), None, Some(3)]);
    assert_eq!(batch.all_data(), vec![Some(1), None, Some(3)]);

    let state = batch.state();
    assert_eq!(state[0].status, CallStatus::Succeeded);
    assert_eq!(state[1].status, CallStatus::Failed);
    assert_eq!(state[2].status, CallStatus::Succeeded);
    assert_eq!(
        state[1].error.as_ref().map(|failure| failure.message.as_str()),
        Some("item rejected")
    );
    assert!(batch.has_any_error());
    assert!(!batch.is_any_loading());
}

#[tokio::test]
async fn params_are_routed_by_position() {
    let double = |params: Option<u32>, _cancel: CancellationToken| async move {
        Ok::<_, CallError>(params.map(|n| n * 2).unwrap_or(0))
    };
    let batch = BatchExecutor::new(&CallOptions::default())
        .with_fn(double)
        .with_fn(double)
        .with_fn(double);

    let results = batch.execute_all(vec![Some(1), None]).await;
    assert_eq!(results, vec![Some(2), Some(0), Some(0)]);
}

#[tokio::test(start_paused = true)]
async fn slots_retry_independently() {
    let attempts = std::sync::Arc::new(std::sync::atomic::AtomicU32::new(0));
    let counter = attempts.clone();
    let batch = BatchExecutor::new(&CallOptions::default().with_retries(2, 50))
        .with_fn(move |_: Option<()>, _cancel: CancellationToken| {
            let n = counter.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            async move {
                if n == 0 {
                    Err(CallError::network("flaky"))
                } else {
                    Ok("recovered")
                }
            }
        })
        .with_fn(|_: Option<()>, _cancel: CancellationToken| async { Ok::<_, CallError>("steady") });

    let results = batch.execute_all(Vec::new()).await;
    assert_eq!(results, vec![Some("recovered"), Some("steady")]);
    assert_eq!(attempts.load(std::sync::atomic::Ordering::SeqCst), 2);
    assert!(!batch.has_any_error());
}

#[tokio::test(start_paused = true)]
async fn reset_all_returns_every_slot_to_idle() {
    let batch = three_items();
    batch.execute_all(Vec::new()).await;
    batch.reset_all();
    batch.reset_all();

    assert_eq!(batch.len(), 3);
    assert!(batch.state().iter().all(|slot| slot.is_idle() && slot.data.is_none()));
    assert!(!batch.has_any_error());
}
