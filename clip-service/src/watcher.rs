//! Clipboard change detection for the page agent's poller

use sha2::{Digest, Sha256};

/// Remembers the digest of the last clipboard value handled
#[derive(Debug, Default)]
pub struct ClipboardWatcher {
    last_digest: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Observation {
    /// Nothing recorded yet
    Seeded,
    /// Same value as the recorded one
    Unchanged,
    /// Value differs from the recorded one
    Changed,
}

impl ClipboardWatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compare `text` with the recorded value without recording it
    pub fn compare(&self, text: &str) -> Observation {
        match &self.last_digest {
            None => Observation::Seeded,
            Some(last) if *last == compute_hash(text) => Observation::Unchanged,
            Some(_) => Observation::Changed,
        }
    }

    /// Mark `text` as handled
    pub fn record(&mut self, text: &str) {
        self.last_digest = Some(compute_hash(text));
    }
}

/// Compute SHA-256 hash of content
pub fn compute_hash(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    impl ClipboardWatcher {
        fn seeded_with(text: &str) -> Self {
            let mut watcher = Self::new();
            watcher.record(text);
            watcher
        }

        fn observe(&mut self, text: &str) -> Observation {
            let observation = self.compare(text);
            if observation != Observation::Unchanged {
                self.record(text);
            }
            observation
        }
    }

    #[test]
    fn test_first_value_seeds() {
        let mut watcher = ClipboardWatcher::new();
        assert_eq!(watcher.observe("hello"), Observation::Seeded);
        assert_eq!(watcher.observe("hello"), Observation::Unchanged);
    }

    #[test]
    fn test_unchanged_value() {
        let mut watcher = ClipboardWatcher::seeded_with("hello");
        assert_eq!(watcher.observe("hello"), Observation::Unchanged);
    }

    #[test]
    fn test_changed_value() {
        let mut watcher = ClipboardWatcher::seeded_with("hello");
        assert_eq!(watcher.observe("hello!"), Observation::Changed);
        assert_eq!(watcher.observe("hello!"), Observation::Unchanged);
        assert_eq!(watcher.observe("hello"), Observation::Changed);
    }

    #[test]
    fn test_compare_does_not_record() {
        let mut watcher = ClipboardWatcher::seeded_with("hello");
        assert_eq!(watcher.compare("world"), Observation::Changed);
        assert_eq!(watcher.compare("world"), Observation::Changed);

        watcher.record("world");
        assert_eq!(watcher.compare("world"), Observation::Unchanged);
    }

    #[test]
    fn test_hash_computation() {
        let hash1 = compute_hash("hello world");
        let hash2 = compute_hash("hello world");
        let hash3 = compute_hash("hello world!");

        assert_eq!(hash1, hash2);
        assert_ne!(hash1, hash3);
    }
}
