//! Per-entity async mutexes.
//!
//! Lock order is always order before partner. Every path that touches both
//! records acquires them in that order, so two requests can never wait on each
//! other.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

#[derive(Default)]
pub struct LockRegistry {
    locks: DashMap<Uuid, Arc<Mutex<()>>>,
}

pub type EntityGuard = OwnedMutexGuard<()>;

impl LockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn lock(&self, id: Uuid) -> EntityGuard {
        // Clone the Arc out so the map shard is not held across the await.
        let mutex = self.locks.entry(id).or_default().value().clone();
        mutex.lock_owned().await
    }

    /// Drops mutexes nobody is holding or waiting on.
    pub fn prune(&self) {
        self.locks.retain(|_, mutex| Arc::strong_count(mutex) > 1);
    }

    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}

/// The two lock registries the engine serializes on.
#[derive(Default)]
pub struct EntityLocks {
    pub orders: LockRegistry,
    pub partners: LockRegistry,
}
