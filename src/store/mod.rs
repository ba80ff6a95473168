//! Record storage consumed by the engine.
//!
//! The engine only needs "durable record with unique id, read/write by id,
//! query by field". Serialization of compound read-modify-write sequences is
//! the caller's job (see [`crate::engine::locks`]); a repository only has to
//! make single reads and single writes atomic.

pub mod memory;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::models::order::Order;
use crate::models::partner::Partner;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("backend error: {0}")]
    Backend(String),
}

pub trait Record: Clone + Send + Sync + 'static {
    fn id(&self) -> Uuid;
}

impl Record for Order {
    fn id(&self) -> Uuid {
        self.id
    }
}

impl Record for Partner {
    fn id(&self) -> Uuid {
        self.id
    }
}

pub type Predicate<'a, R> = &'a (dyn Fn(&R) -> bool + Send + Sync);

#[async_trait]
pub trait Repository<R: Record>: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<R>, StorageError>;

    /// Returns any one record matching `predicate`.
    async fn find_one(&self, predicate: Predicate<'_, R>) -> Result<Option<R>, StorageError>;

    async fn find_all(&self, predicate: Predicate<'_, R>) -> Result<Vec<R>, StorageError>;

    /// Create-or-update keyed by the record id.
    async fn save(&self, record: R) -> Result<(), StorageError>;

    async fn count(&self) -> Result<usize, StorageError>;
}

pub type OrderRepository = dyn Repository<Order>;
pub type PartnerRepository = dyn Repository<Partner>;
