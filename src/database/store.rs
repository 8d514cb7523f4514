use crate::models::FlowerEntry;

/// Persistence for decoded readings, keyed by timestamp
#[allow(async_fn_in_trait)]
pub trait ReadingStore {
    /// Insert an entry, replacing any entry with the same timestamp
    async fn store(&self, entry: &FlowerEntry) -> Result<(), String>;

    /// The most recent `count` entries (all of them for `None`), oldest first
    async fn load(&self, count: Option<i64>) -> Result<Vec<FlowerEntry>, String>;
}

#[cfg(test)]
pub use memory::MemoryStore;
