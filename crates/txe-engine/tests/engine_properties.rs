//! End-to-end properties of the transaction engine: mutual exclusion,
//! FIFO fairness, capacity bounds, cancellation, and shutdown flows.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use txe_engine::{
    EngineConfig, ProxyStream, RejectReason, ShutdownError, TransactionEngine, TransactionError,
};

/// Consumes a stream to completion, collecting every item.
async fn drain<T: Send + 'static>(mut stream: ProxyStream<T>) -> Vec<Result<T, TransactionError>> {
    let mut items = Vec::new();
    while let Some(item) = stream.recv().await {
        items.push(item);
    }
    items
}

fn is_rejection<T>(item: &Result<T, TransactionError>, reason: RejectReason) -> bool {
    matches!(item, Err(err) if err.reject_reason() == Some(reason))
}

#[tokio::test]
async fn at_most_one_transaction_is_ever_active() {
    let engine: TransactionEngine<usize> = TransactionEngine::new();
    let in_flight = Arc::new(AtomicUsize::new(0));
    let max_seen = Arc::new(AtomicUsize::new(0));

    let mut streams = Vec::new();
    for i in 0..8 {
        let in_flight = Arc::clone(&in_flight);
        let max_seen = Arc::clone(&max_seen);
        let proxy = engine.submit(move |tx| async move {
            let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            max_seen.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(5)).await;
            tx.emit(i);
            in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok(())
        });
        streams.push(proxy.subscribe().unwrap());
    }

    for stream in streams {
        let items = drain(stream).await;
        assert_eq!(items.len(), 1);
    }

    assert_eq!(max_seen.load(Ordering::SeqCst), 1);
    assert!(engine.is_idle());
}

#[tokio::test]
async fn promotion_follows_subscription_order() {
    let engine: TransactionEngine<usize> = TransactionEngine::new();
    let order = Arc::new(Mutex::new(Vec::new()));

    let mut streams = Vec::new();
    for i in 0..5 {
        let order = Arc::clone(&order);
        let proxy = engine.submit(move |tx| async move {
            order.lock().push(i);
            tx.emit(i);
            Ok(())
        });
        streams.push(proxy.subscribe().unwrap());
    }

    for stream in streams {
        drain(stream).await;
    }

    assert_eq!(*order.lock(), vec![0, 1, 2, 3, 4]);
}

#[tokio::test]
async fn admission_is_rejected_once_the_queue_is_full() {
    let engine: TransactionEngine<usize> =
        TransactionEngine::with_config(EngineConfig::with_max_capacity(3));

    // Occupy the active slot with work that never finishes on its own.
    let blocker = engine.submit(|_tx| async move {
        tokio::time::sleep(Duration::from_secs(600)).await;
        Ok(())
    });
    let blocker_stream = blocker.subscribe().unwrap();

    // Fill the queue to the bound.
    let mut queued = Vec::new();
    for _ in 0..3 {
        let proxy = engine.submit(|_tx| async move {
            tokio::time::sleep(Duration::from_secs(600)).await;
            Ok(())
        });
        queued.push(proxy.subscribe().unwrap());
    }
    assert_eq!(engine.pending_len(), 3);

    // One past the bound is rejected with exactly one error.
    let overflow = engine.submit(|tx| async move {
        tx.emit(99);
        Ok(())
    });
    let items = drain(overflow.subscribe().unwrap()).await;
    assert_eq!(items.len(), 1);
    assert!(is_rejection(&items[0], RejectReason::CapacityExceeded));

    // Still bounded, still serving.
    assert_eq!(engine.pending_len(), 3);

    engine.shutdown().unwrap();
    let items = drain(blocker_stream).await;
    assert!(matches!(
        items.as_slice(),
        [Err(TransactionError::PrematureTermination)]
    ));
    for stream in queued {
        let items = drain(stream).await;
        assert_eq!(items.len(), 1);
        assert!(is_rejection(&items[0], RejectReason::HostDestroyed));
    }
}

#[tokio::test]
async fn rejection_does_not_clear_the_active_slot() {
    // Regression: a capacity rejection reaching a terminal state while
    // different work is genuinely running must not release the slot and
    // allow concurrent execution.
    let engine: TransactionEngine<usize> =
        TransactionEngine::with_config(EngineConfig::with_max_capacity(2));

    let active = engine.submit(|tx| async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        tx.emit(7);
        Ok(())
    });
    let active_stream = active.subscribe().unwrap();
    let active_id = active_stream.id();
    assert_eq!(engine.active_id(), Some(active_id));

    let mut queued = Vec::new();
    for _ in 0..2 {
        let proxy = engine.submit(|_tx| async move {
            tokio::time::sleep(Duration::from_secs(600)).await;
            Ok(())
        });
        queued.push(proxy.subscribe().unwrap());
    }

    let overflow = engine.submit(|_tx| async move { Ok(()) });
    let items = drain(overflow.subscribe().unwrap()).await;
    assert!(is_rejection(&items[0], RejectReason::CapacityExceeded));

    // The slot still belongs to the original transaction...
    assert_eq!(engine.active_id(), Some(active_id));

    // ...which completes normally afterward.
    let items = drain(active_stream).await;
    assert!(matches!(items.as_slice(), [Ok(7)]));

    drop(queued);
    assert!(engine.is_idle());
}

#[tokio::test]
async fn transactions_never_interleave() {
    let engine: TransactionEngine<usize> = TransactionEngine::new();
    let log = Arc::new(Mutex::new(Vec::new()));

    let t1 = {
        let log = Arc::clone(&log);
        engine.submit(move |tx| async move {
            log.lock().push(1);
            tx.emit(1);
            tokio::time::sleep(Duration::from_millis(50)).await;
            log.lock().push(2);
            tx.emit(2);
            Ok(())
        })
    };
    let t2 = {
        let log = Arc::clone(&log);
        engine.submit(move |tx| async move {
            log.lock().push(3);
            tx.emit(3);
            tokio::time::sleep(Duration::from_millis(50)).await;
            log.lock().push(4);
            tx.emit(4);
            Ok(())
        })
    };

    let s1 = t1.subscribe().unwrap();
    let s2 = t2.subscribe().unwrap();
    let (r1, r2) = tokio::join!(drain(s1), drain(s2));

    // T2 was pending the whole time T1 held the slot: side effects are
    // strictly 1, 2, 3, 4, never interleaved.
    assert_eq!(*log.lock(), vec![1, 2, 3, 4]);
    assert!(matches!(r1.as_slice(), [Ok(1), Ok(2)]));
    assert!(matches!(r2.as_slice(), [Ok(3), Ok(4)]));
}

#[tokio::test]
async fn shutdown_distinguishes_active_from_pending() {
    let engine: TransactionEngine<usize> = TransactionEngine::new();

    let active = engine.submit(|tx| async move {
        tx.emit(1);
        tokio::time::sleep(Duration::from_secs(600)).await;
        Ok(())
    });
    let active_stream = active.subscribe().unwrap();

    let mut pending_streams = Vec::new();
    for _ in 0..2 {
        let proxy = engine.submit(|tx| async move {
            tx.emit(0);
            Ok(())
        });
        pending_streams.push(proxy.subscribe().unwrap());
    }

    // Let the active transaction emit before tearing down.
    tokio::time::sleep(Duration::from_millis(10)).await;
    engine.shutdown().unwrap();

    let items = drain(active_stream).await;
    assert_eq!(items.len(), 2);
    assert!(matches!(items[0], Ok(1)));
    assert!(matches!(items[1], Err(TransactionError::PrematureTermination)));

    for stream in pending_streams {
        let items = drain(stream).await;
        assert_eq!(items.len(), 1);
        assert!(is_rejection(&items[0], RejectReason::HostDestroyed));
    }

    assert!(engine.is_destroyed());
    assert!(engine.is_idle());
    assert_eq!(engine.shutdown(), Err(ShutdownError::AlreadyDestroyed));
}

#[tokio::test]
async fn cancelling_the_active_transaction_promotes_the_next() {
    let engine: TransactionEngine<usize> = TransactionEngine::new();
    let finished = Arc::new(AtomicBool::new(false));

    let long = {
        let finished = Arc::clone(&finished);
        engine.submit(move |_tx| async move {
            tokio::time::sleep(Duration::from_secs(600)).await;
            finished.store(true, Ordering::SeqCst);
            Ok(())
        })
    };
    let quick = engine.submit(|tx| async move {
        tx.emit(2);
        Ok(())
    });

    let long_stream = long.subscribe().unwrap();
    let quick_stream = quick.subscribe().unwrap();
    assert_eq!(engine.pending_len(), 1);

    // Unsubscribing the active transaction cancels it and releases the
    // slot exactly as a natural termination would.
    drop(long_stream);

    let items = drain(quick_stream).await;
    assert!(matches!(items.as_slice(), [Ok(2)]));
    assert!(!finished.load(Ordering::SeqCst));
    assert!(engine.is_idle());
}

#[tokio::test]
async fn cancelling_a_pending_transaction_removes_it_immediately() {
    let engine: TransactionEngine<usize> = TransactionEngine::new();
    let ran = Arc::new(AtomicBool::new(false));

    let blocker = engine.submit(|_tx| async move {
        tokio::time::sleep(Duration::from_secs(600)).await;
        Ok(())
    });
    let abandoned = {
        let ran = Arc::clone(&ran);
        engine.submit(move |_tx| async move {
            ran.store(true, Ordering::SeqCst);
            Ok(())
        })
    };

    let blocker_stream = blocker.subscribe().unwrap();
    let abandoned_stream = abandoned.subscribe().unwrap();
    assert_eq!(engine.pending_len(), 1);

    drop(abandoned_stream);
    assert_eq!(engine.pending_len(), 0);

    drop(blocker_stream);
    assert!(engine.is_idle());
    assert!(!ran.load(Ordering::SeqCst));
}

#[tokio::test]
async fn work_closure_may_query_the_engine() {
    // The closure body runs at promotion time, before the async block.
    // It must execute outside the engine's critical section so that
    // introspection calls from inside it cannot deadlock.
    let engine: TransactionEngine<usize> = TransactionEngine::new();

    let observer = engine.clone();
    let proxy = engine.submit(move |tx| {
        let depth = observer.pending_len();
        let active = observer.active_id();
        async move {
            assert!(active.is_some());
            tx.emit(depth);
            Ok(())
        }
    });

    let items = drain(proxy.subscribe().unwrap()).await;
    assert!(matches!(items.as_slice(), [Ok(0)]));
    assert!(engine.is_idle());
}

#[tokio::test]
async fn work_closure_may_subscribe_follow_up_work() {
    let engine: TransactionEngine<usize> = TransactionEngine::new();
    let (stream_tx, stream_rx) = tokio::sync::oneshot::channel();

    let inner = engine.clone();
    let proxy = engine.submit(move |tx| {
        // Queue follow-up work from the closure body; it stays pending
        // until this transaction releases the slot.
        let follow_up = inner.submit(|tx| async move {
            tx.emit(2);
            Ok(())
        });
        let stream = follow_up.subscribe().unwrap();
        let _ = stream_tx.send(stream);
        async move {
            tx.emit(1);
            Ok(())
        }
    });

    let items = drain(proxy.subscribe().unwrap()).await;
    assert!(matches!(items.as_slice(), [Ok(1)]));

    let follow_up_stream = stream_rx.await.unwrap();
    let items = drain(follow_up_stream).await;
    assert!(matches!(items.as_slice(), [Ok(2)]));
    assert!(engine.is_idle());
}

#[tokio::test]
async fn json_payload_transactions() {
    let engine: TransactionEngine<serde_json::Value> = TransactionEngine::new();

    let proxy = engine.submit(|tx| async move {
        tx.emit(serde_json::json!({"op": "bind", "seq": 1}));
        tx.emit(serde_json::json!({"op": "layout", "seq": 2}));
        Ok(())
    });

    let items = drain(proxy.subscribe().unwrap()).await;
    assert_eq!(items.len(), 2);
    let first = items[0].as_ref().unwrap();
    assert_eq!(first["op"], "bind");
    let second = items[1].as_ref().unwrap();
    assert_eq!(second["seq"], 2);
}
