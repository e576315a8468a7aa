use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use log::{debug, info};

/// Name returned by [`SlowVoteSource`] for every ballot
pub const SAMPLE_VOTE_NAME: &str = "Sample vote";

/// Backend that resolves a ballot identifier to its vote name
#[async_trait]
pub trait VoteSource: Send + Sync {
    async fn vote_name(&self, isbn: &str) -> String;
}

/// Stand-in for a slow external registry
#[derive(Debug, Clone)]
pub struct SlowVoteSource {
    delay: Duration,
}

impl SlowVoteSource {
    pub fn new(delay: Duration) -> Self {
        SlowVoteSource { delay }
    }
}

#[async_trait]
impl VoteSource for SlowVoteSource {
    async fn vote_name(&self, isbn: &str) -> String {
        debug!("Looking up vote {} in slow source", isbn);
        tokio::time::sleep(self.delay).await;
        SAMPLE_VOTE_NAME.to_string()
    }
}

/// Memoizes vote name lookups
///
/// Entries never expire. Two concurrent misses on the same key may both hit
/// the source; the later result wins and both are identical.
#[derive(Debug)]
pub struct VoteNameCache<S> {
    source: S,
    names: DashMap<String, String>,
}

impl<S: VoteSource> VoteNameCache<S> {
    pub fn new(source: S) -> Self {
        VoteNameCache {
            source,
            names: DashMap::new(),
        }
    }

    /// Returns the cached name for `isbn`, asking the source on a miss
    pub async fn lookup(&self, isbn: &str) -> String {
        if let Some(name) = self.names.get(isbn) {
            return name.clone();
        }

        let name = self.source.vote_name(isbn).await;
        self.names.insert(isbn.to_string(), name.clone());
        info!("Cached vote name for {}", isbn);
        name
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn clear(&self) {
        self.names.clear();
    }
}
