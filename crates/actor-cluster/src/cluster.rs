//! # Cluster
//!
//! A [`Cluster`] is a named group of actors of one [`ActorType`]. Membership is *weak*: the
//! cluster stores [`WeakActor`] handles, so it never keeps a member alive and never
//! disposes one. Owners release actors whenever they like; the cluster notices.
//!
//! ## Dead-reference sweep
//!
//! Dead entries (dropped or disposed actors) are removed lazily by every
//! membership-touching call: `register`, `unregister`, `has_member`, `broadcast`,
//! `send_to_actor` and `update`. Each removal emits a `Left` [`MembershipChanged`] event,
//! exactly as an explicit `unregister` would. Staleness therefore never survives more than
//! one such call, without a timer task per cluster.
//!
//! ## Locking
//!
//! The membership map sits behind a short-lived mutex. Fan-out operations snapshot the live
//! members first and release the lock before messaging anyone.

use crate::actor::{Actor, ActorState, WeakActor};
use crate::error::{ActorError, ClusterError};
use crate::events::{EventHub, MembershipChange, MembershipChanged};
use crate::id::{ActorId, ActorType, ClusterId};
use crate::message::Message;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Outcome of [`Cluster::broadcast`]. Individual send failures are collected here instead
/// of failing the whole broadcast.
#[derive(Debug, Default)]
pub struct BroadcastReport {
    pub delivered: usize,
    pub failures: Vec<(ActorId, ActorError)>,
}

/// Outcome of a successful [`Cluster::update`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ClusterUpdateReport {
    /// Members whose update hook ran.
    pub updated: usize,
    /// Live members that were not running (paused, initializing, stopped).
    pub skipped: usize,
}

pub struct Cluster {
    id: ClusterId,
    name: String,
    actor_type: ActorType,
    running: AtomicBool,
    members: Mutex<HashMap<ActorId, WeakActor>>,
    membership: EventHub<MembershipChanged>,
}

impl Cluster {
    pub(crate) fn new(id: ClusterId, name: String, actor_type: ActorType) -> Self {
        Self {
            id,
            name,
            actor_type,
            running: AtomicBool::new(false),
            members: Mutex::new(HashMap::new()),
            membership: EventHub::new(),
        }
    }

    pub fn id(&self) -> ClusterId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn actor_type(&self) -> &ActorType {
        &self.actor_type
    }

    pub fn is_active(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub fn start(&self) {
        if !self.running.swap(true, Ordering::AcqRel) {
            info!(
                cluster_id = %self.id,
                name = %self.name,
                actor_type = %self.actor_type,
                "Cluster started"
            );
        }
    }

    /// Stops accepting registrations and messages. Members are left untouched.
    pub fn stop(&self) {
        if self.running.swap(false, Ordering::AcqRel) {
            info!(cluster_id = %self.id, name = %self.name, "Cluster stopped");
        }
    }

    /// Hub for "membership changed" notifications.
    pub fn membership_events(&self) -> &EventHub<MembershipChanged> {
        &self.membership
    }

    // --- Membership ---

    /// Adds `actor` as a weak member.
    ///
    /// Returns `Ok(true)` if the actor joined, `Ok(false)` if it was already a live member.
    pub fn register(&self, actor: &Actor) -> Result<bool, ClusterError> {
        self.ensure_running()?;
        if actor.is_disposed() {
            return Err(ClusterError::ActorUnavailable(actor.id()));
        }
        if actor.actor_type() != &self.actor_type {
            return Err(ClusterError::ActorTypeMismatch {
                expected: self.actor_type.clone(),
                actual: actor.actor_type().clone(),
            });
        }
        self.sweep();

        let actor_id = actor.id();
        let joined = {
            let mut members = self.members.lock();
            match members.get(&actor_id) {
                Some(existing) if existing.is_alive() => false,
                _ => {
                    members.insert(actor_id, actor.downgrade());
                    true
                }
            }
        };

        if joined {
            info!(cluster_id = %self.id, %actor_id, "Actor joined");
            self.emit(actor_id, MembershipChange::Joined);
        }
        Ok(joined)
    }

    /// Removes `actor_id`. Returns `true` if it was a member; absent ids are a no-op.
    pub fn unregister(&self, actor_id: ActorId) -> bool {
        self.sweep();
        let removed = self.members.lock().remove(&actor_id).is_some();
        if removed {
            info!(cluster_id = %self.id, %actor_id, "Actor left");
            self.emit(actor_id, MembershipChange::Left);
        }
        removed
    }

    /// `true` only if `actor_id` is registered and still resolves to a live actor.
    pub fn has_member(&self, actor_id: ActorId) -> bool {
        self.lookup(actor_id).is_some()
    }

    /// Removes every dead entry and returns the ids that were dropped.
    pub fn sweep(&self) -> Vec<ActorId> {
        let removed: Vec<ActorId> = {
            let mut members = self.members.lock();
            let dead: Vec<ActorId> = members
                .iter()
                .filter(|(_, weak)| !weak.is_alive())
                .map(|(id, _)| *id)
                .collect();
            for id in &dead {
                members.remove(id);
            }
            dead
        };

        for actor_id in &removed {
            debug!(cluster_id = %self.id, %actor_id, "Swept dead member");
            self.emit(*actor_id, MembershipChange::Left);
        }
        removed
    }

    /// Live members right now. Does not sweep.
    pub fn member_count(&self) -> usize {
        self.members
            .lock()
            .values()
            .filter(|weak| weak.is_alive())
            .count()
    }

    pub fn member_ids(&self) -> Vec<ActorId> {
        self.live_members().iter().map(Actor::id).collect()
    }

    /// Strong handles to the live members. Does not sweep.
    pub fn live_members(&self) -> Vec<Actor> {
        self.members
            .lock()
            .values()
            .filter_map(WeakActor::upgrade)
            .collect()
    }

    // --- Messaging ---

    /// Sends `message` to every live member except `exclude`.
    ///
    /// A failed send to one member does not stop delivery to the others.
    pub fn broadcast(
        &self,
        message: &Message,
        exclude: Option<ActorId>,
    ) -> Result<BroadcastReport, ClusterError> {
        self.ensure_running()?;
        self.sweep();

        let mut report = BroadcastReport::default();
        for actor in self.live_members() {
            if Some(actor.id()) == exclude {
                continue;
            }
            match actor.send(message.clone()) {
                Ok(()) => report.delivered += 1,
                Err(e) => {
                    debug!(
                        cluster_id = %self.id,
                        actor_id = %actor.id(),
                        error = %e,
                        "Broadcast send failed"
                    );
                    report.failures.push((actor.id(), e));
                }
            }
        }

        debug!(
            cluster_id = %self.id,
            message_id = %message.message_id(),
            delivered = report.delivered,
            failed = report.failures.len(),
            "Broadcast"
        );
        Ok(report)
    }

    /// Sends `message` to one member. Fails with [`ClusterError::NotAMember`] if the actor is
    /// unknown or no longer alive.
    pub fn send_to_actor(&self, actor_id: ActorId, message: Message) -> Result<(), ClusterError> {
        self.ensure_running()?;
        let actor = self
            .lookup(actor_id)
            .ok_or(ClusterError::NotAMember(actor_id))?;
        actor
            .send(message)
            .map_err(|source| ClusterError::Send {
                actor: actor_id,
                source,
            })
    }

    /// Runs the update hook of every running member concurrently.
    ///
    /// Every member update runs to completion; failures are gathered and returned together
    /// as [`ClusterError::MemberUpdatesFailed`].
    pub async fn update(&self, delta: Duration) -> Result<ClusterUpdateReport, ClusterError> {
        self.update_with_cancel(delta, &CancellationToken::new())
            .await
    }

    /// [`update`](Self::update) whose member updates give up when `cancel` fires. Members
    /// that had not run their hook yet report [`ActorError::Cancelled`].
    pub async fn update_with_cancel(
        &self,
        delta: Duration,
        cancel: &CancellationToken,
    ) -> Result<ClusterUpdateReport, ClusterError> {
        self.ensure_running()?;
        self.sweep();

        let (active, idle): (Vec<Actor>, Vec<Actor>) = self
            .live_members()
            .into_iter()
            .partition(|actor| actor.state() == ActorState::Running);

        let results = futures::future::join_all(active.iter().map(|actor| async move {
            (actor.id(), actor.update_with_cancel(delta, cancel).await)
        }))
        .await;

        let failures: Vec<(ActorId, ActorError)> = results
            .into_iter()
            .filter_map(|(id, result)| result.err().map(|e| (id, e)))
            .collect();

        if !failures.is_empty() {
            for (actor_id, error) in &failures {
                warn!(cluster_id = %self.id, %actor_id, %error, "Member update failed");
            }
            return Err(ClusterError::MemberUpdatesFailed {
                cluster: self.id,
                failures,
            });
        }

        Ok(ClusterUpdateReport {
            updated: active.len(),
            skipped: idle.len(),
        })
    }

    // --- Internals ---

    /// Sweeps, then resolves `actor_id`.
    fn lookup(&self, actor_id: ActorId) -> Option<Actor> {
        self.sweep();
        let weak = self.members.lock().get(&actor_id).cloned()?;
        match weak.upgrade() {
            Some(actor) => Some(actor),
            None => {
                // Died between the sweep and the lookup.
                if self.members.lock().remove(&actor_id).is_some() {
                    self.emit(actor_id, MembershipChange::Left);
                }
                None
            }
        }
    }

    fn ensure_running(&self) -> Result<(), ClusterError> {
        if self.is_active() {
            Ok(())
        } else {
            Err(ClusterError::NotRunning(self.id))
        }
    }

    fn emit(&self, actor_id: ActorId, change: MembershipChange) {
        self.membership.emit(&MembershipChanged {
            cluster_id: self.id,
            actor_id,
            change,
        });
    }
}

impl std::fmt::Debug for Cluster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cluster")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("actor_type", &self.actor_type)
            .field("active", &self.is_active())
            .finish_non_exhaustive()
    }
}
