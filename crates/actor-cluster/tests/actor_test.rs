use actor_cluster::mock::MockBehavior;
use actor_cluster::{
    Actor, ActorError, ActorState, CancellationToken, Message, ProcessingOutcome,
};
use std::time::Duration;

// --- Test Payloads ---

#[derive(Debug, Clone, PartialEq)]
struct Ping(u32);

#[derive(Debug, Clone, PartialEq)]
struct Pong(u32);

#[derive(Debug, Clone)]
struct Boom;

#[derive(Debug, Clone)]
struct Unknown;

const WAIT: Duration = Duration::from_secs(2);

async fn running(mock: MockBehavior) -> Actor {
    let actor = Actor::new(mock);
    actor.initialize().await.unwrap();
    actor.start().await.unwrap();
    actor
}

// --- Lifecycle ---

#[tokio::test]
async fn test_lifecycle_state_machine() {
    let actor = Actor::new(MockBehavior::new("Worker"));
    assert_eq!(actor.state(), ActorState::Created);

    // 1. Not running yet: sends are rejected
    let err = actor.send(Message::new(Ping(0))).unwrap_err();
    assert!(matches!(err, ActorError::NotRunning { state: ActorState::Created }));

    // 2. Initialize is one-shot
    actor.initialize().await.unwrap();
    assert_eq!(actor.state(), ActorState::Initializing);
    assert!(matches!(
        actor.initialize().await,
        Err(ActorError::AlreadyInitialized)
    ));

    // 3. Start is idempotent
    actor.start().await.unwrap();
    assert_eq!(actor.state(), ActorState::Running);
    actor.start().await.unwrap();
    assert_eq!(actor.state(), ActorState::Running);

    // 4. Pause / resume
    actor.pause().await.unwrap();
    assert_eq!(actor.state(), ActorState::Paused);
    actor.resume().await.unwrap();
    assert_eq!(actor.state(), ActorState::Running);

    // 5. Stop is idempotent and terminal
    actor.stop().await.unwrap();
    assert_eq!(actor.state(), ActorState::Stopped);
    actor.stop().await.unwrap();
    assert!(matches!(
        actor.start().await,
        Err(ActorError::InvalidState { operation: "start", state: ActorState::Stopped })
    ));
}

#[tokio::test]
async fn test_start_requires_initialize() {
    let actor = Actor::new(MockBehavior::new("Worker"));
    assert!(matches!(actor.start().await, Err(ActorError::NotInitialized)));
    assert!(matches!(
        actor.pause().await,
        Err(ActorError::InvalidState { operation: "pause", .. })
    ));
}

#[tokio::test]
async fn test_failed_initialize_faults_actor() {
    let actor = Actor::new(MockBehavior::new("Worker").failing_initialize());
    assert!(matches!(actor.initialize().await, Err(ActorError::Faulted(_))));
    assert_eq!(actor.state(), ActorState::Faulted);

    // Faulted is absorbing
    assert!(actor.start().await.is_err());
    actor.stop().await.unwrap();
    assert_eq!(actor.state(), ActorState::Faulted);
}

// --- Ordering & Isolation ---

#[tokio::test]
async fn test_single_producer_fifo_order() {
    let mock = MockBehavior::new("Worker");
    let log = mock.log();
    let actor = running(mock).await;

    for i in 0..100 {
        actor.send(Message::new(Ping(i))).unwrap();
    }
    assert!(log.wait_for(100, WAIT).await);

    let expected: Vec<Ping> = (0..100).map(Ping).collect();
    assert_eq!(log.payloads::<Ping>(), expected);
}

#[tokio::test]
async fn test_handler_failure_does_not_halt_actor() {
    let mock = MockBehavior::new("Worker")
        .failing_on::<Boom>()
        .panicking_on::<Unknown>();
    let log = mock.log();
    let actor = running(mock).await;
    let mut processed = actor.processed_events().subscribe_channel();

    let failing = Message::new(Boom);
    let panicking = Message::new(Unknown);
    let healthy = Message::new(Ping(1));
    let failing_id = failing.message_id();
    let healthy_id = healthy.message_id();

    actor.send(failing).unwrap();
    actor.send(panicking).unwrap();
    actor.send(healthy).unwrap();
    assert!(log.wait_for(3, WAIT).await);

    let first = processed.recv().await.unwrap();
    assert_eq!(first.message_id, failing_id);
    assert_eq!(first.outcome, ProcessingOutcome::Failed);
    assert!(first.error.is_some());

    let second = processed.recv().await.unwrap();
    assert_eq!(second.outcome, ProcessingOutcome::Failed);
    assert!(second.error.unwrap().contains("panicked"));

    let third = processed.recv().await.unwrap();
    assert_eq!(third.message_id, healthy_id);
    assert_eq!(third.outcome, ProcessingOutcome::Handled);
    assert!(third.error.is_none());

    assert_eq!(actor.state(), ActorState::Running);
    let stats = actor.stats();
    assert_eq!(stats.failed, 2);
    assert_eq!(stats.handled, 1);
}

#[tokio::test]
async fn test_unrecognised_message_reported_as_not_handled() {
    let mock = MockBehavior::new("Worker").ignoring::<Unknown>();
    let actor = running(mock).await;
    let mut processed = actor.processed_events().subscribe_channel();

    actor.send(Message::new(Unknown)).unwrap();
    let event = tokio::time::timeout(WAIT, processed.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(event.outcome, ProcessingOutcome::NotHandled);
    assert_eq!(event.actor_id, actor.id());
}

#[tokio::test]
async fn test_paused_actor_queues_messages() {
    let mock = MockBehavior::new("Worker");
    let log = mock.log();
    let actor = running(mock).await;

    actor.pause().await.unwrap();
    for i in 0..3 {
        actor.send(Message::new(Ping(i))).unwrap();
    }
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(log.is_empty());

    actor.resume().await.unwrap();
    assert!(log.wait_for(3, WAIT).await);
    assert_eq!(log.payloads::<Ping>(), vec![Ping(0), Ping(1), Ping(2)]);
}

// --- Request / Response ---

#[tokio::test]
async fn test_send_request_returns_correlated_reply() {
    let mock = MockBehavior::new("Worker").replying(|p: &Ping| Pong(p.0 * 2));
    let log = mock.log();
    let actor = running(mock).await;

    let pong: Option<Pong> = actor
        .send_request(Message::new(Ping(21)), WAIT)
        .await
        .unwrap();
    assert_eq!(pong, Some(Pong(42)));

    // The reply went to the waiter, not to the handler
    assert_eq!(log.len(), 1);
    assert_eq!(actor.stats().replies_routed, 1);
    assert_eq!(actor.pending_requests(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_send_request_without_responder_times_out() {
    let actor = running(MockBehavior::new("Worker")).await;

    let started = tokio::time::Instant::now();
    let reply: Option<Pong> = actor
        .send_request(Message::new(Ping(1)), Duration::from_millis(50))
        .await
        .unwrap();

    assert!(reply.is_none());
    assert!(started.elapsed() >= Duration::from_millis(50));
    assert_eq!(actor.pending_requests(), 0);
}

/// A reply whose payload has the wrong type is treated as "no response", not as an error.
/// This is documented behavior, kept so callers see a uniform absence result.
#[tokio::test]
async fn test_send_request_type_mismatch_is_absence() {
    let mock = MockBehavior::new("Worker").replying(|p: &Ping| Pong(p.0));
    let actor = running(mock).await;

    let reply: Option<String> = actor
        .send_request(Message::new(Ping(1)), WAIT)
        .await
        .unwrap();
    assert!(reply.is_none());
}

#[tokio::test]
async fn test_send_request_honours_caller_cancellation() {
    let actor = running(MockBehavior::new("Worker")).await;
    let cancel = CancellationToken::new();

    let canceller = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        canceller.cancel();
    });

    let reply: Option<Pong> = tokio::time::timeout(
        WAIT,
        actor.send_request_with_cancel(Message::new(Ping(1)), Duration::from_secs(60), &cancel),
    )
    .await
    .expect("cancellation must unblock the caller")
    .unwrap();
    assert!(reply.is_none());
    assert_eq!(actor.pending_requests(), 0);
}

#[tokio::test]
async fn test_send_request_on_stopped_actor_is_precondition_failure() {
    let actor = running(MockBehavior::new("Worker")).await;
    actor.stop().await.unwrap();

    let result = actor
        .send_request::<Pong>(Message::new(Ping(1)), WAIT)
        .await;
    assert!(matches!(result, Err(ActorError::NotRunning { .. })));
    assert_eq!(actor.pending_requests(), 0);
}

// --- Disposal ---

#[tokio::test]
async fn test_dispose_cancels_outstanding_requests() {
    let actor = running(MockBehavior::new("Worker")).await;
    // Park the loop so no request is ever answered
    actor.pause().await.unwrap();

    let mut callers = Vec::new();
    for i in 0..5 {
        let actor = actor.clone();
        callers.push(tokio::spawn(async move {
            actor
                .send_request::<Pong>(Message::new(Ping(i)), Duration::from_secs(60))
                .await
        }));
    }

    let all_waiting = tokio::time::timeout(WAIT, async {
        while actor.pending_requests() < 5 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await;
    assert!(all_waiting.is_ok());

    actor.dispose().await;

    for caller in callers {
        let result = tokio::time::timeout(WAIT, caller)
            .await
            .expect("caller must not hang")
            .unwrap();
        assert!(matches!(result, Ok(None)));
    }
    assert_eq!(actor.pending_requests(), 0);
}

#[tokio::test]
async fn test_send_after_dispose_reports_closed_channel() {
    let mock = MockBehavior::new("Worker");
    let log = mock.log();
    let actor = running(mock).await;

    actor.dispose().await;
    actor.dispose().await;
    assert!(actor.is_disposed());
    assert!(log.was_stopped());
    assert!(matches!(
        actor.send(Message::new(Ping(1))),
        Err(ActorError::ChannelClosed)
    ));
    assert!(matches!(actor.start().await, Err(ActorError::ChannelClosed)));
}

#[tokio::test]
async fn test_dropping_last_handle_releases_actor() {
    let actor = running(MockBehavior::new("Worker")).await;
    let weak = actor.downgrade();
    assert!(weak.is_alive());
    assert_eq!(weak.id(), actor.id());

    drop(actor);
    assert!(weak.upgrade().is_none());
}

// --- Updates ---

#[tokio::test]
async fn test_update_runs_on_processing_task() {
    let mock = MockBehavior::new("Worker");
    let log = mock.log();
    let actor = running(mock).await;

    actor.update(Duration::from_millis(16)).await.unwrap();
    assert_eq!(log.update_deltas(), vec![Duration::from_millis(16)]);

    actor.pause().await.unwrap();
    assert!(matches!(
        actor.update(Duration::from_millis(16)).await,
        Err(ActorError::NotRunning { state: ActorState::Paused })
    ));
}

#[tokio::test]
async fn test_failing_update_surfaces_handler_error() {
    let actor = running(MockBehavior::new("Worker").failing_updates()).await;
    assert!(matches!(
        actor.update(Duration::from_millis(16)).await,
        Err(ActorError::Handler(_))
    ));
    assert_eq!(actor.state(), ActorState::Running);
}

#[tokio::test]
async fn test_cancelled_update_is_never_applied() {
    // 1. Keep the loop busy so the update waits in the queue
    let mock = MockBehavior::new("Worker").with_delay(Duration::from_millis(100));
    let log = mock.log();
    let actor = running(mock).await;
    actor.send(Message::new(Ping(1))).unwrap();

    let updater = {
        let actor = actor.clone();
        tokio::spawn(async move { actor.update(Duration::from_millis(16)).await })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;

    // 2. Pausing resolves the queued update as cancelled
    actor.pause().await.unwrap();
    let result = tokio::time::timeout(WAIT, updater).await.unwrap().unwrap();
    assert!(matches!(result, Err(ActorError::Cancelled)));

    // 3. After resume only the next update is applied
    actor.resume().await.unwrap();
    assert!(log.wait_for(1, WAIT).await);
    actor.update(Duration::from_millis(32)).await.unwrap();
    assert_eq!(log.update_deltas(), vec![Duration::from_millis(32)]);
}

#[tokio::test]
async fn test_update_with_cancel_gives_up_and_is_skipped() {
    let mock = MockBehavior::new("Worker").with_delay(Duration::from_millis(100));
    let log = mock.log();
    let actor = running(mock).await;
    actor.send(Message::new(Ping(1))).unwrap();

    let cancel = CancellationToken::new();
    let canceller = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        canceller.cancel();
    });

    let result = actor
        .update_with_cancel(Duration::from_millis(16), &cancel)
        .await;
    assert!(matches!(result, Err(ActorError::Cancelled)));

    assert!(log.wait_for(1, WAIT).await);
    actor.update(Duration::from_millis(32)).await.unwrap();
    assert_eq!(log.update_deltas(), vec![Duration::from_millis(32)]);
}

#[tokio::test]
async fn test_dropped_update_future_is_skipped() {
    let mock = MockBehavior::new("Worker").with_delay(Duration::from_millis(100));
    let log = mock.log();
    let actor = running(mock).await;
    actor.send(Message::new(Ping(1))).unwrap();

    let abandoned =
        tokio::time::timeout(Duration::from_millis(20), actor.update(Duration::from_millis(16)))
            .await;
    assert!(abandoned.is_err());

    assert!(log.wait_for(1, WAIT).await);
    actor.update(Duration::from_millis(32)).await.unwrap();
    assert_eq!(log.update_deltas(), vec![Duration::from_millis(32)]);
}

#[tokio::test]
async fn test_panicking_on_stop_still_stops_cleanly() {
    let mock = MockBehavior::new("Worker").panicking_on_stop();
    let log = mock.log();
    let actor = running(mock).await;

    actor.stop().await.unwrap();
    assert_eq!(actor.state(), ActorState::Stopped);
    assert!(log.was_stopped());

    actor.dispose().await;
    assert!(actor.is_disposed());
    assert!(matches!(
        actor.send(Message::new(Ping(1))),
        Err(ActorError::ChannelClosed)
    ));
}
