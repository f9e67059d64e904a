//! Identity-based deduplication.

use std::collections::HashSet;

use sha2::{Digest, Sha256};

use crate::extract::record::IdentityKey;
use crate::types::record::Record;

/// Remembers every identity admitted during a run.
///
/// Keys are stored as SHA-256 digests, so memory per record stays fixed
/// even when the identity is a full post body.
#[derive(Debug, Clone)]
pub struct Deduplicator {
    key: IdentityKey,
    seen: HashSet<[u8; 32]>,
}

impl Deduplicator {
    pub fn new(key: IdentityKey) -> Self {
        Self {
            key,
            seen: HashSet::new(),
        }
    }

    /// Admit a record if its identity has not been seen.
    ///
    /// Records without an identity are never admitted.
    pub fn admit(&mut self, record: &Record) -> bool {
        match self.key.key_of(record) {
            Some(key) => self.seen.insert(digest(&key)),
            None => false,
        }
    }

    /// Whether a record's identity is already known.
    pub fn contains(&self, record: &Record) -> bool {
        self.key
            .key_of(record)
            .is_some_and(|key| self.seen.contains(&digest(&key)))
    }

    pub fn key(&self) -> &IdentityKey {
        &self.key
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

fn digest(key: &str) -> [u8; 32] {
    let mut out = [0u8; 32];
    out.copy_from_slice(&Sha256::digest(key.as_bytes()));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::record::KeyNormalization;
    use crate::types::record::FieldValue;

    fn post(text: &str, likes: i64) -> Record {
        Record::new()
            .with("text", FieldValue::Text(text.to_string()))
            .with("likes", FieldValue::Count(likes))
    }

    #[test]
    fn test_rejects_repeats_even_when_counters_change() {
        let mut dedup = Deduplicator::new(IdentityKey::new("text", KeyNormalization::Text));

        assert!(dedup.admit(&post("first post", 1)));
        assert!(!dedup.admit(&post("first post", 40)));
        assert!(!dedup.admit(&post("  first   post ", 2)));
        assert!(dedup.admit(&post("second post", 0)));
        assert_eq!(dedup.len(), 2);
        assert!(dedup.contains(&post("second post", 99)));
    }

    #[test]
    fn test_never_admits_without_identity() {
        let mut dedup = Deduplicator::new(IdentityKey::new("text", KeyNormalization::Exact));

        assert!(!dedup.admit(&Record::new().with("likes", FieldValue::Count(1))));
        assert!(!dedup.admit(&Record::new().with("text", FieldValue::Absent)));
        assert!(!dedup.admit(&post("", 0)));
        assert!(dedup.is_empty());
    }
}
