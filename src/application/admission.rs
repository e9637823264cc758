use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use tokio::sync::{Mutex, MutexGuard};

/// Serializes payment admission (duplicate check followed by ledger create).
///
/// Ids are hashed onto a fixed set of shards, so two admissions for the same id
/// always contend on the same mutex. One shard gives a single service-wide
/// critical section.
#[derive(Debug)]
pub struct AdmissionLock {
    shards: Vec<Mutex<()>>,
}

impl AdmissionLock {
    pub fn new(shards: usize) -> Self {
        let shards = shards.max(1);
        Self {
            shards: (0..shards).map(|_| Mutex::new(())).collect(),
        }
    }

    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }

    pub fn shard_for(&self, payment_id: &str) -> usize {
        let mut hasher = DefaultHasher::new();
        payment_id.hash(&mut hasher);
        (hasher.finish() % self.shards.len() as u64) as usize
    }

    /// Waits for exclusive admission rights over `payment_id`'s shard.
    pub async fn lock(&self, payment_id: &str) -> MutexGuard<'_, ()> {
        self.shards[self.shard_for(payment_id)].lock().await
    }
}
