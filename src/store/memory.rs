use async_trait::async_trait;
use dashmap::DashMap;
use uuid::Uuid;

use crate::store::{Predicate, Record, Repository, StorageError};

/// DashMap-backed repository. Each `save` replaces the whole record.
pub struct MemoryRepository<R> {
    records: DashMap<Uuid, R>,
}

impl<R: Record> MemoryRepository<R> {
    pub fn new() -> Self {
        Self {
            records: DashMap::new(),
        }
    }
}

impl<R: Record> Default for MemoryRepository<R> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<R: Record> Repository<R> for MemoryRepository<R> {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<R>, StorageError> {
        Ok(self.records.get(&id).map(|entry| entry.value().clone()))
    }

    async fn find_one(&self, predicate: Predicate<'_, R>) -> Result<Option<R>, StorageError> {
        Ok(self
            .records
            .iter()
            .find(|entry| predicate(entry.value()))
            .map(|entry| entry.value().clone()))
    }

    async fn find_all(&self, predicate: Predicate<'_, R>) -> Result<Vec<R>, StorageError> {
        Ok(self
            .records
            .iter()
            .filter(|entry| predicate(entry.value()))
            .map(|entry| entry.value().clone())
            .collect())
    }

    async fn save(&self, record: R) -> Result<(), StorageError> {
        self.records.insert(record.id(), record);
        Ok(())
    }

    async fn count(&self) -> Result<usize, StorageError> {
        Ok(self.records.len())
    }
}
