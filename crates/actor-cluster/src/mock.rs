//! # Mock Behavior & Testing Guide
//!
//! [`MockBehavior`] is a scriptable [`ActorBehavior`] that records every message it
//! receives. It lets tests exercise the runtime (ordering, failure isolation, request
//! correlation, cluster fan-out) without writing a bespoke behavior each time.
//!
//! ## When to use the mock vs a real behavior
//!
//! | Feature | MockBehavior | Real behavior |
//! |---------|--------------|---------------|
//! | **Setup** | One builder chain | A type + trait impl |
//! | **Inspection** | [`MessageLog`] of everything received | Whatever the type exposes |
//! | **Failure injection** | `failing_on`, `panicking_on`, `failing_updates` | Hard |
//! | **Use case** | Testing the runtime and the layers above it | Testing domain logic |
//!
//! ## Example
//!
//! ```rust
//! use actor_cluster::mock::MockBehavior;
//! use actor_cluster::{Actor, Message};
//! use std::time::Duration;
//!
//! #[derive(Debug, Clone)] struct Ping;
//! #[derive(Debug, Clone, PartialEq)] struct Pong(u32);
//!
//! #[tokio::main]
//! async fn main() {
//!     let mock = MockBehavior::new("Worker").replying(|_: &Ping| Pong(7));
//!     let log = mock.log();
//!
//!     let actor = Actor::new(mock);
//!     actor.initialize().await.unwrap();
//!     actor.start().await.unwrap();
//!
//!     let pong: Option<Pong> = actor
//!         .send_request(Message::new(Ping), Duration::from_secs(1))
//!         .await
//!         .unwrap();
//!     assert_eq!(pong, Some(Pong(7)));
//!     assert_eq!(log.len(), 1);
//! }
//! ```
//!
//! ## Failure scenarios
//!
//! Handler failures are the interesting case for an actor runtime: the loop must survive
//! them. Script them with [`MockBehavior::failing_on`] (returns `Err`) or
//! [`MockBehavior::panicking_on`] (panics inside the handler) and assert that later
//! messages still arrive in the [`MessageLog`].

use crate::behavior::{ActorBehavior, ActorContext, Handled};
use crate::error::BoxError;
use crate::id::ActorType;
use crate::message::Message;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::any::Any;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;

type Reply = Box<dyn FnOnce(&ActorContext, &Message) + Send>;
type Responder = Box<dyn Fn(&Message) -> Option<Reply> + Send + Sync>;
type Predicate = Box<dyn Fn(&Message) -> bool + Send + Sync>;

enum Rule {
    Reply(Responder),
    Fail(Predicate),
    Panic(Predicate),
    Ignore(Predicate),
}

/// Shared record of what a [`MockBehavior`] saw. Cheap to clone.
#[derive(Clone, Default)]
pub struct MessageLog {
    inner: Arc<LogInner>,
}

#[derive(Default)]
struct LogInner {
    messages: Mutex<Vec<Message>>,
    updates: Mutex<Vec<Duration>>,
    initialized: AtomicBool,
    stopped: AtomicBool,
    changed: Notify,
    received: AtomicUsize,
}

impl MessageLog {
    pub fn len(&self) -> usize {
        self.inner.received.load(Ordering::SeqCst)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn messages(&self) -> Vec<Message> {
        self.inner.messages.lock().clone()
    }

    /// Payloads of type `T`, in arrival order. Messages of other types are skipped.
    pub fn payloads<T: Any + Clone>(&self) -> Vec<T> {
        self.inner
            .messages
            .lock()
            .iter()
            .filter_map(|m| m.payload::<T>().cloned())
            .collect()
    }

    pub fn update_deltas(&self) -> Vec<Duration> {
        self.inner.updates.lock().clone()
    }

    pub fn update_count(&self) -> usize {
        self.inner.updates.lock().len()
    }

    pub fn was_initialized(&self) -> bool {
        self.inner.initialized.load(Ordering::SeqCst)
    }

    pub fn was_stopped(&self) -> bool {
        self.inner.stopped.load(Ordering::SeqCst)
    }

    /// Waits until at least `count` messages were received. Returns `false` on timeout.
    pub async fn wait_for(&self, count: usize, timeout: Duration) -> bool {
        self.wait_until(timeout, || self.len() >= count).await
    }

    /// Waits until at least `count` updates ran. Returns `false` on timeout.
    pub async fn wait_for_updates(&self, count: usize, timeout: Duration) -> bool {
        self.wait_until(timeout, || self.update_count() >= count).await
    }

    async fn wait_until(&self, timeout: Duration, done: impl Fn() -> bool) -> bool {
        tokio::time::timeout(timeout, async {
            loop {
                let notified = self.inner.changed.notified();
                if done() {
                    return;
                }
                notified.await;
            }
        })
        .await
        .is_ok()
    }

    fn record(&self, message: &Message) {
        self.inner.messages.lock().push(message.clone());
        self.inner.received.fetch_add(1, Ordering::SeqCst);
        self.inner.changed.notify_waiters();
    }

    fn record_update(&self, delta: Duration) {
        self.inner.updates.lock().push(delta);
        self.inner.changed.notify_waiters();
    }
}

/// Scriptable, recording behavior for tests.
pub struct MockBehavior {
    actor_type: ActorType,
    log: MessageLog,
    rules: Vec<Rule>,
    delay: Option<Duration>,
    fail_initialize: bool,
    fail_updates: bool,
    panic_updates: bool,
    panic_on_stop: bool,
}

impl MockBehavior {
    /// A mock that records and handles every message.
    pub fn new(actor_type: impl Into<ActorType>) -> Self {
        Self {
            actor_type: actor_type.into(),
            log: MessageLog::default(),
            rules: Vec::new(),
            delay: None,
            fail_initialize: false,
            fail_updates: false,
            panic_updates: false,
            panic_on_stop: false,
        }
    }

    /// Handle to the record of received messages.
    pub fn log(&self) -> MessageLog {
        self.log.clone()
    }

    /// Answers requests carrying a `Req` payload with `respond(req)`.
    pub fn replying<Req, Resp, F>(mut self, respond: F) -> Self
    where
        Req: Any,
        Resp: Any + Send + Sync,
        F: Fn(&Req) -> Resp + Send + Sync + 'static,
    {
        self.rules.push(Rule::Reply(Box::new(move |message: &Message| {
            let response = respond(message.payload::<Req>()?);
            Some(Box::new(move |ctx: &ActorContext, request: &Message| {
                ctx.reply(request, response);
            }) as Reply)
        })));
        self
    }

    /// Returns an error for messages carrying a `T` payload.
    pub fn failing_on<T: Any>(self) -> Self {
        self.failing_when(|m| m.is::<T>())
    }

    pub fn failing_when<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&Message) -> bool + Send + Sync + 'static,
    {
        self.rules.push(Rule::Fail(Box::new(predicate)));
        self
    }

    /// Panics inside the handler for messages carrying a `T` payload.
    pub fn panicking_on<T: Any>(mut self) -> Self {
        self.rules.push(Rule::Panic(Box::new(|m: &Message| m.is::<T>())));
        self
    }

    /// Reports [`Handled::No`] for messages carrying a `T` payload.
    pub fn ignoring<T: Any>(mut self) -> Self {
        self.rules.push(Rule::Ignore(Box::new(|m: &Message| m.is::<T>())));
        self
    }

    /// Sleeps for `delay` before handling each message.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn failing_initialize(mut self) -> Self {
        self.fail_initialize = true;
        self
    }

    /// Makes every `on_update` call fail (after recording it).
    pub fn failing_updates(mut self) -> Self {
        self.fail_updates = true;
        self
    }

    /// Makes every `on_update` call panic (after recording it).
    pub fn panicking_updates(mut self) -> Self {
        self.panic_updates = true;
        self
    }

    /// Panics inside `on_stop`, after marking the log as stopped.
    pub fn panicking_on_stop(mut self) -> Self {
        self.panic_on_stop = true;
        self
    }
}

#[async_trait]
impl ActorBehavior for MockBehavior {
    fn actor_type(&self) -> ActorType {
        self.actor_type.clone()
    }

    async fn on_initialize(&mut self, _ctx: &ActorContext) -> Result<(), BoxError> {
        if self.fail_initialize {
            return Err("mock initialization failure".into());
        }
        self.log.inner.initialized.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn handle(&mut self, message: Message, ctx: &ActorContext) -> Result<Handled, BoxError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.log.record(&message);

        for rule in &self.rules {
            match rule {
                Rule::Reply(responder) => {
                    if let Some(send) = responder(&message) {
                        send(ctx, &message);
                        return Ok(Handled::Yes);
                    }
                }
                Rule::Fail(predicate) if predicate(&message) => {
                    return Err(format!("mock failure for {}", message.message_id()).into());
                }
                Rule::Panic(predicate) if predicate(&message) => {
                    panic!("mock panic for {}", message.message_id());
                }
                Rule::Ignore(predicate) if predicate(&message) => return Ok(Handled::No),
                _ => {}
            }
        }
        Ok(Handled::Yes)
    }

    async fn on_update(&mut self, delta: Duration, _ctx: &ActorContext) -> Result<(), BoxError> {
        self.log.record_update(delta);
        if self.panic_updates {
            panic!("mock update panic");
        }
        if self.fail_updates {
            return Err("mock update failure".into());
        }
        Ok(())
    }

    async fn on_stop(&mut self, _ctx: &ActorContext) -> Result<(), BoxError> {
        self.log.inner.stopped.store(true, Ordering::SeqCst);
        if self.panic_on_stop {
            panic!("mock stop panic");
        }
        Ok(())
    }
}
