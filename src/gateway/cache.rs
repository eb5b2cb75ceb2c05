use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;

use super::http::Response;

/// Named cache partitions holding responses keyed by request URL.
///
/// Implementations must tolerate concurrent reads and writes from
/// independent requests.
#[async_trait]
pub trait CacheStorage: Send + Sync {
    async fn match_in(&self, partition: &str, key: &str) -> Option<Response>;
    /// First match across all partitions, in creation order.
    async fn match_any(&self, key: &str) -> Option<Response>;
    /// Stores a response, creating the partition if needed.
    async fn put(&self, partition: &str, key: &str, response: Response);
    async fn keys(&self) -> Vec<String>;
    /// Returns whether the partition existed.
    async fn delete(&self, partition: &str) -> bool;
}

#[derive(Debug, Default)]
pub struct MemoryCacheStorage {
    partitions: RwLock<Vec<(String, HashMap<String, Response>)>>,
}

impl MemoryCacheStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self, partition: &str) -> usize {
        self.partitions
            .read()
            .iter()
            .find(|(name, _)| name == partition)
            .map_or(0, |(_, entries)| entries.len())
    }
}

#[async_trait]
impl CacheStorage for MemoryCacheStorage {
    async fn match_in(&self, partition: &str, key: &str) -> Option<Response> {
        self.partitions
            .read()
            .iter()
            .find(|(name, _)| name == partition)
            .and_then(|(_, entries)| entries.get(key).cloned())
    }

    async fn match_any(&self, key: &str) -> Option<Response> {
        self.partitions
            .read()
            .iter()
            .find_map(|(_, entries)| entries.get(key).cloned())
    }

    async fn put(&self, partition: &str, key: &str, response: Response) {
        let mut partitions = self.partitions.write();
        match partitions.iter_mut().find(|(name, _)| name == partition) {
            Some((_, entries)) => {
                entries.insert(key.to_string(), response);
            }
            None => {
                let entries = HashMap::from([(key.to_string(), response)]);
                partitions.push((partition.to_string(), entries));
            }
        }
    }

    async fn keys(&self) -> Vec<String> {
        self.partitions
            .read()
            .iter()
            .map(|(name, _)| name.clone())
            .collect()
    }

    async fn delete(&self, partition: &str) -> bool {
        let mut partitions = self.partitions.write();
        let before = partitions.len();
        partitions.retain(|(name, _)| name != partition);
        partitions.len() != before
    }
}
