//! Time and timestamp utilities

use chrono::{DateTime, Duration, Utc};

/// Current wall-clock time
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// `candidate`, or `floor` if the clock went backwards
pub fn at_or_after(floor: Option<DateTime<Utc>>, candidate: DateTime<Utc>) -> DateTime<Utc> {
    match floor {
        Some(floor) if floor > candidate => floor,
        _ => candidate,
    }
}

/// Convert whole seconds from configuration into a chrono duration
pub fn seconds(secs: u64) -> Duration {
    let max = (i64::MAX / 1000) as u64;
    Duration::seconds(secs.min(max) as i64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_at_or_after_clamps_backwards_clock() {
        let t0 = now();
        let earlier = t0 - Duration::seconds(5);
        assert_eq!(at_or_after(Some(t0), earlier), t0);
        assert_eq!(at_or_after(Some(earlier), t0), t0);
        assert_eq!(at_or_after(None, earlier), earlier);
    }

    #[test]
    fn test_seconds() {
        assert_eq!(seconds(90), Duration::seconds(90));
    }
}
