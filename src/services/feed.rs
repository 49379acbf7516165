// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Live history feed over the workouts collection.
//!
//! A subscription yields the owner's full record set as a fresh snapshot
//! after every notified change - no incremental diffing. One watch
//! channel exists per user id; the create path calls [`WorkoutFeed::notify`]
//! after a successful write, which re-queries the store and publishes to
//! every active subscriber.

use crate::db::FirestoreDb;
use crate::error::AppError;
use crate::models::Workout;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::watch;

/// One delivery to a subscriber.
#[derive(Debug, Clone)]
pub enum FeedUpdate {
    /// The owner's complete record set, newest first.
    Snapshot(Vec<Workout>),
    /// The feed could not refresh; terminal for this subscription.
    /// Subscribers surface an error state and do not auto-retry.
    Lost(String),
}

/// Publisher of live workout snapshots, one channel per user.
#[derive(Clone)]
pub struct WorkoutFeed {
    db: FirestoreDb,
    channels: Arc<DashMap<String, watch::Sender<FeedUpdate>>>,
}

impl WorkoutFeed {
    pub fn new(db: FirestoreDb) -> Self {
        Self {
            db,
            channels: Arc::new(DashMap::new()),
        }
    }

    /// Open a subscription for one owner's records.
    ///
    /// Reads the initial snapshot before returning, so the first
    /// [`WorkoutSubscription::next_update`] resolves immediately.
    /// Dropping the handle unsubscribes.
    pub async fn subscribe(&self, user_id: &str) -> Result<WorkoutSubscription, AppError> {
        let mut records = self.db.workouts_for_user(user_id).await?;
        sort_newest_first(&mut records);

        let rx = match self.channels.entry(user_id.to_string()) {
            dashmap::mapref::entry::Entry::Occupied(entry) => {
                // Refresh the shared channel so this and existing
                // subscribers agree on the latest snapshot.
                entry.get().send_replace(FeedUpdate::Snapshot(records));
                entry.get().subscribe()
            }
            dashmap::mapref::entry::Entry::Vacant(entry) => {
                let (tx, rx) = watch::channel(FeedUpdate::Snapshot(records));
                entry.insert(tx);
                rx
            }
        };

        tracing::debug!(user_id, "History subscription opened");

        Ok(WorkoutSubscription {
            rx,
            delivered_initial: false,
        })
    }

    /// Publish a fresh snapshot to the owner's subscribers.
    ///
    /// Called by the create path after a successful write. A refresh
    /// failure is published as [`FeedUpdate::Lost`] rather than retried.
    pub async fn notify(&self, user_id: &str) {
        let Some(tx) = self.channels.get(user_id).map(|entry| entry.clone()) else {
            return;
        };

        if tx.receiver_count() == 0 {
            // Every subscriber is gone; reap the channel.
            self.channels
                .remove_if(user_id, |_, tx| tx.receiver_count() == 0);
            return;
        }

        match self.db.workouts_for_user(user_id).await {
            Ok(mut records) => {
                sort_newest_first(&mut records);
                tx.send_replace(FeedUpdate::Snapshot(records));
            }
            Err(e) => {
                tracing::warn!(user_id, error = %e, "History feed refresh failed");
                tx.send_replace(FeedUpdate::Lost(e.to_string()));
            }
        }
    }
}

/// Handle owned by one subscriber. Dropping it closes the subscription.
pub struct WorkoutSubscription {
    rx: watch::Receiver<FeedUpdate>,
    delivered_initial: bool,
}

impl WorkoutSubscription {
    /// Wait for the next update.
    ///
    /// The first call yields the snapshot taken at subscribe time;
    /// later calls yield one update per published change. Returns None
    /// once the feed side is gone.
    pub async fn next_update(&mut self) -> Option<FeedUpdate> {
        if !self.delivered_initial {
            self.delivered_initial = true;
            return Some(self.rx.borrow().clone());
        }

        self.rx.changed().await.ok()?;
        Some(self.rx.borrow_and_update().clone())
    }
}

/// Order a snapshot by creation time, newest first.
///
/// The store query already orders this way; applying it again keeps the
/// ordering invariant local to every published snapshot.
fn sort_newest_first(records: &mut [Workout]) {
    records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
}
