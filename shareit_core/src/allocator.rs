//! Code allocation for offered files.
//!
//! A code is both the registry key and the TCP port the file is served on.

use rand::Rng;
use std::collections::HashMap;
use std::ops::RangeInclusive;
use std::path::PathBuf;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::config::ShareConfig;
use crate::error::{Result, ShareError};

/// Random draws before falling back to a scan for a free code
const MAX_RANDOM_DRAWS: usize = 32;

/// Registry of offered files, keyed by their generated code.
///
/// Entries live for the lifetime of the allocator.
pub struct CodeAllocator {
    range: RangeInclusive<u16>,
    files: RwLock<HashMap<u16, PathBuf>>,
}

impl CodeAllocator {
    pub fn new(config: &ShareConfig) -> Self {
        Self::with_range(config.port_range())
    }

    pub fn with_range(range: RangeInclusive<u16>) -> Self {
        Self {
            range,
            files: RwLock::new(HashMap::new()),
        }
    }

    pub fn range(&self) -> &RangeInclusive<u16> {
        &self.range
    }

    /// Number of codes the range can hand out
    fn capacity(&self) -> usize {
        if self.range.is_empty() {
            return 0;
        }
        usize::from(*self.range.end()) - usize::from(*self.range.start()) + 1
    }

    /// Register `file_path` and return the code it will be served on.
    ///
    /// The path is not checked here; a missing file only shows up when a
    /// client connects. Fails with [`ShareError::CodesExhausted`] once every
    /// code in the range is taken.
    pub async fn offer(&self, file_path: impl Into<PathBuf>) -> Result<u16> {
        let file_path = file_path.into();
        let mut files = self.files.write().await;

        if files.len() >= self.capacity() {
            let (start, end) = (*self.range.start(), *self.range.end());
            warn!(
                "Cannot offer {}: all codes in {}..={} are taken",
                file_path.display(),
                start,
                end
            );
            return Err(ShareError::CodesExhausted { start, end });
        }

        let mut rng = rand::rng();
        let drawn = (0..MAX_RANDOM_DRAWS)
            .map(|_| rng.random_range(self.range.clone()))
            .find(|candidate| {
                let taken = files.contains_key(candidate);
                if taken {
                    debug!("Code {} already taken, drawing again", candidate);
                }
                !taken
            });

        // Dense registry: walk the range from a random point. The capacity
        // check above guarantees a free code exists.
        let code = match drawn {
            Some(code) => code,
            None => {
                let from = rng.random_range(self.range.clone());
                (from..=*self.range.end())
                    .chain(*self.range.start()..from)
                    .find(|candidate| !files.contains_key(candidate))
                    .ok_or(ShareError::CodesExhausted {
                        start: *self.range.start(),
                        end: *self.range.end(),
                    })?
            }
        };

        info!("Offered {} under code {}", file_path.display(), code);
        files.insert(code, file_path);
        Ok(code)
    }

    pub async fn lookup(&self, code: u16) -> Option<PathBuf> {
        self.files.read().await.get(&code).cloned()
    }

    pub async fn len(&self) -> usize {
        self.files.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.files.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::time::timeout;

    #[tokio::test]
    async fn test_codes_are_distinct() {
        let allocator = CodeAllocator::new(&ShareConfig::default());
        let mut seen = HashSet::new();
        for i in 0..500 {
            let code = allocator.offer(format!("/tmp/file-{}", i)).await.unwrap();
            assert!(seen.insert(code), "code {} handed out twice", code);
            assert!(allocator.range().contains(&code));
        }
        assert_eq!(allocator.len().await, 500);
    }

    #[tokio::test]
    async fn test_small_range_fills_without_collision() {
        let allocator = CodeAllocator::with_range(40000..=40015);
        let mut codes = HashSet::new();
        for i in 0..16 {
            codes.insert(allocator.offer(format!("f{}", i)).await.unwrap());
        }
        assert_eq!(codes, (40000..=40015).collect());
    }

    #[tokio::test]
    async fn test_full_range_fails_instead_of_spinning() {
        let allocator = CodeAllocator::with_range(40000..=40001);
        let first = allocator.offer("a").await.unwrap();
        let second = allocator.offer("b").await.unwrap();
        assert_ne!(first, second);

        let third = timeout(Duration::from_secs(2), allocator.offer("c"))
            .await
            .expect("offer on a full range must return");
        assert!(matches!(
            third,
            Err(ShareError::CodesExhausted { start: 40000, end: 40001 })
        ));

        // Registry is still usable afterwards
        let found = timeout(Duration::from_secs(2), allocator.lookup(first))
            .await
            .unwrap();
        assert_eq!(found, Some(PathBuf::from("a")));
        assert_eq!(allocator.len().await, 2);
    }

    #[tokio::test]
    async fn test_misordered_config_does_not_block_registry() {
        let config = ShareConfig {
            port_range_start: 60000,
            port_range_end: 50000,
            ..ShareConfig::default()
        };
        let allocator = Arc::new(CodeAllocator::new(&config));

        let first = allocator.offer("first").await.unwrap();
        let second = timeout(Duration::from_secs(2), allocator.offer("second"))
            .await
            .unwrap()
            .unwrap();
        assert_ne!(first, second);
        assert_eq!(
            timeout(Duration::from_secs(2), allocator.lookup(first)).await.unwrap(),
            Some(PathBuf::from("first"))
        );
    }

    #[tokio::test]
    async fn test_concurrent_offers_get_distinct_codes() {
        let allocator = Arc::new(CodeAllocator::with_range(50000..=50063));
        let mut handles = Vec::new();
        for i in 0..64 {
            let allocator = allocator.clone();
            handles.push(tokio::spawn(async move {
                allocator.offer(format!("f{}", i)).await
            }));
        }

        let mut codes = HashSet::new();
        for handle in handles {
            assert!(codes.insert(handle.await.unwrap().unwrap()));
        }
        assert_eq!(codes.len(), 64);
    }

    #[tokio::test]
    async fn test_offer_does_not_check_existence() {
        let allocator = CodeAllocator::new(&ShareConfig::default());
        let code = allocator.offer("/definitely/not/here.bin").await.unwrap();
        assert_eq!(
            allocator.lookup(code).await,
            Some(PathBuf::from("/definitely/not/here.bin"))
        );
    }

    #[tokio::test]
    async fn test_lookup_unknown_code() {
        let allocator = CodeAllocator::with_range(50000..=50010);
        assert!(allocator.is_empty().await);
        assert_eq!(allocator.lookup(50001).await, None);
    }
}
