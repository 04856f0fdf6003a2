use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;

static SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// Category-prefixed unique id: prefix, millisecond timestamp, and a
/// process-wide incrementing disambiguator. The sequence component keeps ids
/// distinct even when concurrent batch calls land on the same millisecond.
pub fn next_challenge_id(prefix: &str) -> String {
    let seq = SEQUENCE.fetch_add(1, Ordering::Relaxed);
    let millis = Utc::now().timestamp_millis();
    format!("{prefix}-{millis:x}-{seq:06x}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::thread;

    #[test]
    fn test_ids_unique_under_concurrency() {
        let handles: Vec<_> = (0..8)
            .map(|_| thread::spawn(|| (0..250).map(|_| next_challenge_id("hal")).collect::<Vec<_>>()))
            .collect();
        let mut seen = HashSet::new();
        for handle in handles {
            for id in handle.join().unwrap() {
                assert!(seen.insert(id));
            }
        }
        assert_eq!(seen.len(), 2000);
    }

    #[test]
    fn test_id_carries_prefix() {
        assert!(next_challenge_id("saf").starts_with("saf-"));
    }
}
