//! # Actor Runtime
//!
//! This module defines [`Actor`], the runtime half of an actor: it owns the inbound queue,
//! the processing task, the lifecycle state machine and the pending-request table. The
//! behavior half is any [`ActorBehavior`] implementation.
//!
//! ## Lifecycle
//!
//! ```text
//! Created -> Initializing -> Running <-> Paused
//!                               |          |
//!                               +-> Stopping -> Stopped
//!
//! Faulted is absorbing and reachable from any non-terminal state.
//! ```
//!
//! - [`Actor::initialize`] is one-shot and runs the behavior's `on_initialize` hook.
//! - [`Actor::start`] spawns the processing loop; calling it on a running actor is a no-op.
//! - [`Actor::stop`] cancels the loop and waits for it to finish the message in hand.
//! - [`Actor::dispose`] stops the actor, cancels every outstanding request and discards the
//!   queue. Dropping the last `Actor` handle has the same effect on the background task.
//!
//! ## Processing Loop
//!
//! The loop runs on the shared Tokio worker pool and parks while the queue is empty. Each
//! message is either
//!
//! 1. a reply whose `correlation_id` matches a pending request, handed straight to the
//!    waiting caller, or
//! 2. dispatched to [`ActorBehavior::handle`].
//!
//! A handler error or panic is reported through a [`MessageProcessed`] event and the loop
//! moves on to the next message. One bad message never halts the actor.
//!
//! Messages from one producer are handled in send order (the queue is a FIFO
//! `mpsc::unbounded_channel`). There is no ordering across producers.
//!
//! ## Ownership
//!
//! `Actor` is a cheap, cloneable strong handle. The processing task only holds the parts it
//! needs (queue receiver, behavior, shared counters), never the handle itself, so a
//! [`WeakActor`] stops resolving as soon as the last `Actor` clone is dropped.

use crate::behavior::{ActorBehavior, ActorContext, Handled};
use crate::error::{ActorError, BoxError};
use crate::events::{EventHub, MessageProcessed, ProcessingOutcome};
use crate::id::{ActorId, ActorType};
use crate::message::Message;
use crate::pending::PendingRequests;
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, oneshot, watch, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActorState {
    Created,
    Initializing,
    Running,
    Paused,
    Stopping,
    Stopped,
    Faulted,
}

impl ActorState {
    /// `true` while the processing loop exists (running or parked by `pause`).
    pub fn is_live(self) -> bool {
        matches!(self, ActorState::Running | ActorState::Paused)
    }
}

/// Snapshot of an actor's message counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ActorStats {
    pub handled: u64,
    pub not_handled: u64,
    pub failed: u64,
    pub replies_routed: u64,
}

/// Items on an actor's queue. Updates travel through the same queue as messages so they
/// never overlap a handler invocation.
pub(crate) enum Envelope {
    Message(Message),
    Update {
        delta: Duration,
        respond_to: oneshot::Sender<Result<(), ActorError>>,
    },
}

#[derive(Default)]
struct Counters {
    handled: AtomicU64,
    not_handled: AtomicU64,
    failed: AtomicU64,
    replies_routed: AtomicU64,
}

/// State shared between the handle and the processing task.
struct Shared {
    id: ActorId,
    actor_type: ActorType,
    state: watch::Sender<ActorState>,
    pending: Arc<PendingRequests>,
    counters: Counters,
    processed: EventHub<MessageProcessed>,
}

impl Shared {
    fn state(&self) -> ActorState {
        *self.state.borrow()
    }

    fn set_state(&self, next: ActorState) {
        let previous = self.state.send_replace(next);
        if previous != next {
            debug!(actor_id = %self.id, ?previous, ?next, "State changed");
        }
    }
}

/// What the processing task needs; handed back to the handle when the loop exits.
struct LoopParts {
    behavior: Box<dyn ActorBehavior>,
    receiver: mpsc::UnboundedReceiver<Envelope>,
}

struct RunningLoop {
    handle: JoinHandle<LoopParts>,
    cancel: CancellationToken,
}

#[derive(Default)]
struct Lifecycle {
    parts: Option<LoopParts>,
    running: Option<RunningLoop>,
}

struct ActorInner {
    shared: Arc<Shared>,
    mailbox: mpsc::UnboundedSender<Envelope>,
    context: ActorContext,
    lifecycle: Mutex<Lifecycle>,
    disposed: AtomicBool,
    shutdown: CancellationToken,
}

impl Drop for ActorInner {
    fn drop(&mut self) {
        self.shutdown.cancel();
        if let Some(running) = self.lifecycle.get_mut().running.take() {
            running.cancel.cancel();
        }
        self.shared.pending.cancel_all();
        debug!(actor_id = %self.shared.id, "Actor handle released");
    }
}

/// Strong, cloneable handle to an actor.
#[derive(Clone)]
pub struct Actor {
    inner: Arc<ActorInner>,
}

impl Actor {
    /// Creates an actor in the `Created` state. Its type tag comes from the behavior.
    pub fn new<B: ActorBehavior>(behavior: B) -> Self {
        Self::with_id(ActorId::new(), behavior)
    }

    pub fn with_id<B: ActorBehavior>(id: ActorId, behavior: B) -> Self {
        let actor_type = behavior.actor_type();
        let (mailbox, receiver) = mpsc::unbounded_channel();
        let (state, _) = watch::channel(ActorState::Created);
        let shared = Arc::new(Shared {
            id,
            actor_type: actor_type.clone(),
            state,
            pending: Arc::new(PendingRequests::default()),
            counters: Counters::default(),
            processed: EventHub::new(),
        });
        let context = ActorContext::new(id, actor_type, mailbox.clone());
        let lifecycle = Lifecycle {
            parts: Some(LoopParts {
                behavior: Box::new(behavior),
                receiver,
            }),
            running: None,
        };

        Self {
            inner: Arc::new(ActorInner {
                shared,
                mailbox,
                context,
                lifecycle: Mutex::new(lifecycle),
                disposed: AtomicBool::new(false),
                shutdown: CancellationToken::new(),
            }),
        }
    }

    pub fn id(&self) -> ActorId {
        self.inner.shared.id
    }

    pub fn actor_type(&self) -> &ActorType {
        &self.inner.shared.actor_type
    }

    pub fn state(&self) -> ActorState {
        self.inner.shared.state()
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.load(Ordering::Acquire)
    }

    pub fn stats(&self) -> ActorStats {
        let c = &self.inner.shared.counters;
        ActorStats {
            handled: c.handled.load(Ordering::Relaxed),
            not_handled: c.not_handled.load(Ordering::Relaxed),
            failed: c.failed.load(Ordering::Relaxed),
            replies_routed: c.replies_routed.load(Ordering::Relaxed),
        }
    }

    /// Number of `send_request` callers currently waiting for a reply.
    pub fn pending_requests(&self) -> usize {
        self.inner.shared.pending.len()
    }

    /// Hub for per-message "processed" notifications.
    pub fn processed_events(&self) -> &EventHub<MessageProcessed> {
        &self.inner.shared.processed
    }

    pub fn downgrade(&self) -> WeakActor {
        WeakActor {
            id: self.id(),
            inner: Arc::downgrade(&self.inner),
        }
    }

    // --- Lifecycle ---

    /// Runs the behavior's `on_initialize` hook. Fails if the actor was already initialized.
    ///
    /// A failing hook moves the actor to `Faulted`.
    pub async fn initialize(&self) -> Result<(), ActorError> {
        self.ensure_not_disposed()?;
        let mut lifecycle = self.inner.lifecycle.lock().await;
        match self.state() {
            ActorState::Created => {}
            ActorState::Faulted => return Err(ActorError::Faulted("actor is faulted".into())),
            _ => return Err(ActorError::AlreadyInitialized),
        }

        let shared = &self.inner.shared;
        shared.set_state(ActorState::Initializing);
        let Some(parts) = lifecycle.parts.as_mut() else {
            shared.set_state(ActorState::Faulted);
            return Err(ActorError::Faulted("processing parts missing".into()));
        };

        let hook = AssertUnwindSafe(parts.behavior.on_initialize(&self.inner.context))
            .catch_unwind()
            .await;
        match flatten_hook(hook) {
            Ok(()) => {
                info!(actor_id = %shared.id, actor_type = %shared.actor_type, "Initialized");
                Ok(())
            }
            Err(e) => {
                warn!(actor_id = %shared.id, error = %e, "Initialization failed");
                shared.set_state(ActorState::Faulted);
                Err(ActorError::Faulted(e.to_string()))
            }
        }
    }

    /// Spawns the processing loop. A no-op if the loop is already running.
    pub async fn start(&self) -> Result<(), ActorError> {
        self.ensure_not_disposed()?;
        let mut lifecycle = self.inner.lifecycle.lock().await;
        let state = self.state();
        match state {
            ActorState::Running | ActorState::Paused => return Ok(()),
            ActorState::Initializing => {}
            ActorState::Created => return Err(ActorError::NotInitialized),
            _ => {
                return Err(ActorError::InvalidState {
                    operation: "start",
                    state,
                })
            }
        }

        let Some(parts) = lifecycle.parts.take() else {
            return Err(ActorError::InvalidState {
                operation: "start",
                state,
            });
        };

        let shared = self.inner.shared.clone();
        shared.set_state(ActorState::Running);
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(run_loop(
            parts,
            shared.clone(),
            self.inner.context.clone(),
            cancel.clone(),
        ));
        lifecycle.running = Some(RunningLoop { handle, cancel });
        info!(actor_id = %shared.id, actor_type = %shared.actor_type, "Started");
        Ok(())
    }

    /// Parks the processing loop. Messages keep queueing and are handled after `resume`.
    pub async fn pause(&self) -> Result<(), ActorError> {
        self.transition("pause", ActorState::Running, ActorState::Paused)
            .await
    }

    pub async fn resume(&self) -> Result<(), ActorError> {
        self.transition("resume", ActorState::Paused, ActorState::Running)
            .await
    }

    async fn transition(
        &self,
        operation: &'static str,
        from: ActorState,
        to: ActorState,
    ) -> Result<(), ActorError> {
        self.ensure_not_disposed()?;
        let _lifecycle = self.inner.lifecycle.lock().await;
        let state = self.state();
        if state == to {
            return Ok(());
        }
        if state != from {
            return Err(ActorError::InvalidState { operation, state });
        }
        self.inner.shared.set_state(to);
        info!(actor_id = %self.id(), ?to, "{}", operation);
        Ok(())
    }

    /// Cancels the processing loop and waits for it to exit. Idempotent.
    ///
    /// Queued messages stay in the queue until the actor is disposed.
    pub async fn stop(&self) -> Result<(), ActorError> {
        let mut lifecycle = self.inner.lifecycle.lock().await;
        let shared = &self.inner.shared;
        match shared.state() {
            ActorState::Stopped | ActorState::Faulted => return Ok(()),
            ActorState::Created | ActorState::Initializing => {
                shared.set_state(ActorState::Stopped);
                info!(actor_id = %shared.id, "Stopped before start");
                return Ok(());
            }
            ActorState::Running | ActorState::Paused | ActorState::Stopping => {}
        }

        shared.set_state(ActorState::Stopping);
        let Some(running) = lifecycle.running.take() else {
            shared.set_state(ActorState::Stopped);
            return Ok(());
        };

        running.cancel.cancel();
        match running.handle.await {
            Ok(parts) => {
                lifecycle.parts = Some(parts);
                shared.set_state(ActorState::Stopped);
                info!(actor_id = %shared.id, "Stopped");
                Ok(())
            }
            Err(e) => {
                warn!(actor_id = %shared.id, error = %e, "Processing loop terminated abnormally");
                shared.set_state(ActorState::Faulted);
                Err(ActorError::Faulted(e.to_string()))
            }
        }
    }

    /// Stops the actor if needed, resolves every pending request as cancelled and discards
    /// the queue. Later sends fail with [`ActorError::ChannelClosed`].
    pub async fn dispose(&self) {
        if self.inner.disposed.swap(true, Ordering::AcqRel) {
            return;
        }
        let shared = &self.inner.shared;

        if let Err(e) = self.stop().await {
            warn!(actor_id = %shared.id, error = %e, "Stop during dispose failed");
        }
        self.inner.shutdown.cancel();
        let cancelled = shared.pending.cancel_all();

        let mut discarded = 0usize;
        let mut lifecycle = self.inner.lifecycle.lock().await;
        if let Some(parts) = lifecycle.parts.as_mut() {
            parts.receiver.close();
            while let Ok(envelope) = parts.receiver.try_recv() {
                if let Envelope::Update { respond_to, .. } = envelope {
                    let _ = respond_to.send(Err(ActorError::Cancelled));
                }
                discarded += 1;
            }
        }
        info!(
            actor_id = %shared.id,
            cancelled_requests = cancelled,
            discarded_messages = discarded,
            "Disposed"
        );
    }

    // --- Messaging ---

    /// Queues `message` for this actor. Never blocks: the queue is unbounded.
    pub fn send(&self, message: Message) -> Result<(), ActorError> {
        self.ensure_not_disposed()?;
        let state = self.state();
        if !state.is_live() {
            return Err(ActorError::NotRunning { state });
        }
        trace!(actor_id = %self.id(), message_id = %message.message_id(), "Send");
        self.inner
            .mailbox
            .send(Envelope::Message(message))
            .map_err(|_| ActorError::ChannelClosed)
    }

    /// Sends `message` and waits up to `timeout` for a correlated reply.
    ///
    /// Returns `Ok(None)` on timeout, on disposal, or when the reply payload is not an `R`.
    /// A type mismatch is reported as "no response", not as an error.
    /// Nothing is retried; the caller decides.
    pub async fn send_request<R>(
        &self,
        message: Message,
        timeout: Duration,
    ) -> Result<Option<R>, ActorError>
    where
        R: Any + Clone + Send + Sync,
    {
        self.send_request_with_cancel(message, timeout, &CancellationToken::new())
            .await
    }

    /// [`send_request`](Self::send_request) that also gives up when `cancel` fires.
    pub async fn send_request_with_cancel<R>(
        &self,
        message: Message,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> Result<Option<R>, ActorError>
    where
        R: Any + Clone + Send + Sync,
    {
        let request_id = message.message_id();
        let (_guard, reply) = self.inner.shared.pending.register(request_id);
        self.send(message)?;

        let outcome = tokio::select! {
            reply = tokio::time::timeout(timeout, reply) => match reply {
                Ok(Ok(reply)) => Some(reply),
                Ok(Err(_)) => {
                    debug!(actor_id = %self.id(), %request_id, "Request cancelled");
                    None
                }
                Err(_) => {
                    debug!(actor_id = %self.id(), %request_id, ?timeout, "Request timed out");
                    None
                }
            },
            _ = cancel.cancelled() => {
                debug!(actor_id = %self.id(), %request_id, "Request cancelled by caller");
                None
            }
            _ = self.inner.shutdown.cancelled() => None,
        };

        Ok(outcome.and_then(|reply| {
            let payload = reply.payload::<R>().cloned();
            if payload.is_none() {
                debug!(actor_id = %self.id(), %request_id, "Reply payload type mismatch");
            }
            payload
        }))
    }

    /// Runs the behavior's `on_update` hook on the processing task and waits for it.
    ///
    /// Returns [`ActorError::Cancelled`] if the actor stops or pauses before the update
    /// is processed. A cancelled update is skipped, never applied later.
    pub async fn update(&self, delta: Duration) -> Result<(), ActorError> {
        self.update_with_cancel(delta, &CancellationToken::new())
            .await
    }

    /// [`update`](Self::update) that also gives up when `cancel` fires.
    pub async fn update_with_cancel(
        &self,
        delta: Duration,
        cancel: &CancellationToken,
    ) -> Result<(), ActorError> {
        self.ensure_not_disposed()?;
        let state = self.state();
        if state != ActorState::Running {
            return Err(ActorError::NotRunning { state });
        }

        let (respond_to, mut response) = oneshot::channel();
        self.inner
            .mailbox
            .send(Envelope::Update { delta, respond_to })
            .map_err(|_| ActorError::ChannelClosed)?;

        let mut state_rx = self.inner.shared.state.subscribe();
        let reason = tokio::select! {
            result = &mut response => return result.unwrap_or(Err(ActorError::Cancelled)),
            _ = state_rx.wait_for(|s| *s != ActorState::Running) => "actor left running state",
            _ = cancel.cancelled() => "cancelled by caller",
        };

        // A closed receiver marks the queued envelope as abandoned for the loop.
        response.close();
        match response.try_recv() {
            Ok(result) => result,
            Err(_) => {
                debug!(actor_id = %self.id(), reason, "Update abandoned");
                Err(ActorError::Cancelled)
            }
        }
    }

    fn ensure_not_disposed(&self) -> Result<(), ActorError> {
        if self.is_disposed() {
            Err(ActorError::ChannelClosed)
        } else {
            Ok(())
        }
    }
}

impl std::fmt::Debug for Actor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Actor")
            .field("id", &self.id())
            .field("actor_type", self.actor_type())
            .field("state", &self.state())
            .finish()
    }
}

/// Non-owning handle to an actor.
///
/// Resolves only while some [`Actor`] clone is alive *and* the actor has not been disposed.
#[derive(Clone)]
pub struct WeakActor {
    id: ActorId,
    inner: Weak<ActorInner>,
}

impl WeakActor {
    pub fn id(&self) -> ActorId {
        self.id
    }

    pub fn upgrade(&self) -> Option<Actor> {
        let inner = self.inner.upgrade()?;
        let actor = Actor { inner };
        (!actor.is_disposed()).then_some(actor)
    }

    pub fn is_alive(&self) -> bool {
        self.upgrade().is_some()
    }
}

// =============================================================================
// PROCESSING LOOP
// =============================================================================

async fn run_loop(
    mut parts: LoopParts,
    shared: Arc<Shared>,
    ctx: ActorContext,
    cancel: CancellationToken,
) -> LoopParts {
    debug!(actor_id = %shared.id, "Processing loop started");
    let mut state_rx = shared.state.subscribe();

    loop {
        if *state_rx.borrow_and_update() == ActorState::Paused {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                changed = state_rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    continue;
                }
            }
        }

        let envelope = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            changed = state_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                continue;
            }
            envelope = parts.receiver.recv() => match envelope {
                Some(envelope) => envelope,
                None => break,
            },
        };

        match envelope {
            Envelope::Message(message) => {
                process_message(&shared, parts.behavior.as_mut(), &ctx, message).await
            }
            Envelope::Update { delta, respond_to } => {
                if respond_to.is_closed() {
                    trace!(actor_id = %shared.id, "Skipping abandoned update");
                    continue;
                }
                let hook = AssertUnwindSafe(parts.behavior.on_update(delta, &ctx))
                    .catch_unwind()
                    .await;
                let result = flatten_hook(hook).map_err(ActorError::Handler);
                if let Err(e) = &result {
                    warn!(actor_id = %shared.id, error = %e, "Update failed");
                }
                let _ = respond_to.send(result);
            }
        }
    }

    let hook = AssertUnwindSafe(parts.behavior.on_stop(&ctx))
        .catch_unwind()
        .await;
    if let Err(e) = flatten_hook(hook) {
        warn!(actor_id = %shared.id, error = %e, "on_stop failed");
    }
    debug!(actor_id = %shared.id, "Processing loop exited");
    parts
}

async fn process_message(
    shared: &Shared,
    behavior: &mut dyn ActorBehavior,
    ctx: &ActorContext,
    message: Message,
) {
    let message = match shared.pending.complete(message) {
        Ok(()) => {
            shared.counters.replies_routed.fetch_add(1, Ordering::Relaxed);
            trace!(actor_id = %shared.id, "Reply routed to waiter");
            return;
        }
        Err(message) => message,
    };

    let message_id = message.message_id();
    let started = Instant::now();
    let result = AssertUnwindSafe(behavior.handle(message, ctx))
        .catch_unwind()
        .await;
    let elapsed = started.elapsed();

    let (outcome, error) = match flatten_hook(result) {
        Ok(Handled::Yes) => (ProcessingOutcome::Handled, None),
        Ok(Handled::No) => (ProcessingOutcome::NotHandled, None),
        Err(e) => (ProcessingOutcome::Failed, Some(e.to_string())),
    };

    let counter = match outcome {
        ProcessingOutcome::Handled => &shared.counters.handled,
        ProcessingOutcome::NotHandled => &shared.counters.not_handled,
        ProcessingOutcome::Failed => &shared.counters.failed,
    };
    counter.fetch_add(1, Ordering::Relaxed);

    match &error {
        Some(error) => warn!(
            actor_id = %shared.id,
            %message_id,
            elapsed_ms = elapsed.as_millis() as u64,
            %error,
            "Message failed"
        ),
        None => debug!(
            actor_id = %shared.id,
            %message_id,
            ?outcome,
            elapsed_ms = elapsed.as_millis() as u64,
            "Message processed"
        ),
    }

    shared.processed.emit(&MessageProcessed {
        actor_id: shared.id,
        message_id,
        outcome,
        elapsed,
        error,
    });
}

/// Folds a caught panic into the hook's own error type.
fn flatten_hook<T>(
    result: Result<Result<T, BoxError>, Box<dyn Any + Send>>,
) -> Result<T, BoxError> {
    match result {
        Ok(inner) => inner,
        Err(panic) => Err(format!("handler panicked: {}", panic_message(panic.as_ref())).into()),
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
