//! Run-wide cache of compiled component fragments.
//!
//! One [`CompilationCache`] lives for a whole build and is shared by every
//! top-level page, possibly across threads. Each path moves through:
//!
//! ```text
//! (absent) ──claim()──► InProgress ──finish()──► Compiled(fragment)
//!                           │
//!                           └──abandon()──► (absent)
//! ```
//!
//! A claim never blocks. A path another page is still compiling is reported
//! as [`Claim::Busy`] and the caller compiles its own uncached copy, so two
//! pages including each other from different threads cannot deadlock.

use super::markdown::FrontMatter;
use crate::utils::html::Node;
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// A fully resolved document ready to be spliced into a referencing tree.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Fragment {
    pub nodes: Vec<Node>,
    /// Front matter of a Markdown source (empty for HTML)
    pub metadata: FrontMatter,
}

#[derive(Debug)]
pub enum Claim {
    Cached(Arc<Fragment>),
    /// Another page is compiling this path right now
    Busy,
    /// Caller owns the entry and must `finish` or `abandon` it
    Claimed,
}

#[derive(Debug)]
enum Entry {
    InProgress,
    Compiled(Arc<Fragment>),
}

#[derive(Debug, Default)]
pub struct CompilationCache {
    entries: Mutex<FxHashMap<PathBuf, Entry>>,
}

impl CompilationCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn claim(&self, path: &Path) -> Claim {
        let mut entries = self.entries.lock();
        match entries.get(path) {
            Some(Entry::Compiled(fragment)) => Claim::Cached(Arc::clone(fragment)),
            Some(Entry::InProgress) => Claim::Busy,
            None => {
                entries.insert(path.to_path_buf(), Entry::InProgress);
                Claim::Claimed
            }
        }
    }

    pub fn finish(&self, path: &Path, fragment: Arc<Fragment>) {
        self.entries
            .lock()
            .insert(path.to_path_buf(), Entry::Compiled(fragment));
    }

    /// Release a claim after a failed compile so a later reference retries.
    pub fn abandon(&self, path: &Path) {
        let mut entries = self.entries.lock();
        if matches!(entries.get(path), Some(Entry::InProgress)) {
            entries.remove(path);
        }
    }

    #[cfg(test)]
    pub fn is_compiled(&self, path: &Path) -> bool {
        matches!(self.entries.lock().get(path), Some(Entry::Compiled(_)))
    }

    /// Number of compiled fragments.
    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .values()
            .filter(|entry| matches!(entry, Entry::Compiled(_)))
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rayon::prelude::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_claim_lifecycle() {
        let cache = CompilationCache::new();
        let path = Path::new("/site/components/nav.html");

        assert!(matches!(cache.claim(path), Claim::Claimed));
        assert!(matches!(cache.claim(path), Claim::Busy));
        assert!(!cache.is_compiled(path));

        let fragment = Arc::new(Fragment {
            nodes: vec![Node::Text("nav".into())],
            ..Default::default()
        });
        cache.finish(path, Arc::clone(&fragment));
        assert!(cache.is_compiled(path));
        assert_eq!(cache.len(), 1);

        match cache.claim(path) {
            Claim::Cached(cached) => assert!(Arc::ptr_eq(&cached, &fragment)),
            other => panic!("expected cached fragment, got {other:?}"),
        }
    }

    #[test]
    fn test_abandon_allows_retry() {
        let cache = CompilationCache::new();
        let path = Path::new("/site/broken.html");
        assert!(matches!(cache.claim(path), Claim::Claimed));
        cache.abandon(path);
        assert_eq!(cache.len(), 0);
        assert!(matches!(cache.claim(path), Claim::Claimed));
    }

    #[test]
    fn test_abandon_keeps_compiled_entries() {
        let cache = CompilationCache::new();
        let path = Path::new("/site/ok.html");
        cache.claim(path);
        cache.finish(path, Arc::default());
        cache.abandon(path);
        assert!(cache.is_compiled(path));
    }

    #[test]
    fn test_concurrent_claims_single_winner() {
        let cache = CompilationCache::new();
        let path = Path::new("/site/shared.html");
        let winners = AtomicUsize::new(0);

        (0..64).into_par_iter().for_each(|_| {
            if matches!(cache.claim(path), Claim::Claimed) {
                winners.fetch_add(1, Ordering::Relaxed);
            }
        });

        assert_eq!(winners.load(Ordering::Relaxed), 1);
    }
}
