//! Small shared utilities: timestamps, id generation, string helpers.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Current Unix timestamp in milliseconds.
#[must_use]
pub fn timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}

/// Process-wide monotonic sequence number.
///
/// Distinguishes identifiers allocated within the same millisecond.
#[must_use]
pub fn next_seq() -> u64 {
    static SEQ: AtomicU64 = AtomicU64::new(0);
    SEQ.fetch_add(1, Ordering::Relaxed)
}

/// Generate a unique message id.
#[must_use]
pub fn generate_message_id() -> String {
    format!("msg_{}_{}", timestamp_ms(), next_seq())
}

/// Truncate a string to at most `max` bytes on a char boundary.
#[must_use]
pub fn truncate_str(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_id_uniqueness() {
        let a = generate_message_id();
        let b = generate_message_id();
        assert_ne!(a, b);
    }

    #[test]
    fn test_timestamp_nonzero() {
        assert!(timestamp_ms() > 0);
    }

    #[test]
    fn test_truncate_char_boundary() {
        assert_eq!(truncate_str("hello", 10), "hello");
        assert_eq!(truncate_str("hello", 3), "hel");
        // multi-byte: must not split the codepoint
        assert_eq!(truncate_str("héllo", 2), "h");
    }
}
