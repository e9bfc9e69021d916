use chrono::{DateTime, Duration, Local};

const MAX_CADENCE_SECS: u64 = 366 * 24 * 60 * 60;

/// Tracks when a periodic sweep last ran. The first check is always due so a
/// freshly started watcher sweeps immediately.
#[derive(Clone, Debug)]
pub struct Cadence {
    every: Duration,
    last: Option<DateTime<Local>>,
}

impl Cadence {
    pub fn every_secs(secs: u64) -> Self {
        let secs = i64::try_from(secs.clamp(1, MAX_CADENCE_SECS)).unwrap_or(60);
        Self {
            every: Duration::seconds(secs),
            last: None,
        }
    }

    /// Returns `true` and records the run when a sweep is due at `now`.
    pub fn due(&mut self, now: DateTime<Local>) -> bool {
        let due = match self.last {
            None => true,
            Some(last) => now - last >= self.every,
        };
        if due {
            self.last = Some(now);
        }
        due
    }
}

pub fn tick_duration(tick_ms: u64) -> std::time::Duration {
    std::time::Duration::from_millis(tick_ms.max(50))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn first_check_is_due_then_waits_a_full_interval() {
        let start = Local.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let mut cadence = Cadence::every_secs(60);

        assert!(cadence.due(start));
        assert!(!cadence.due(start + Duration::seconds(59)));
        assert!(cadence.due(start + Duration::seconds(60)));
        assert!(!cadence.due(start + Duration::seconds(61)));
    }

    #[test]
    fn tick_has_a_floor() {
        assert_eq!(tick_duration(0), std::time::Duration::from_millis(50));
        assert_eq!(tick_duration(1000), std::time::Duration::from_millis(1000));
    }
}
