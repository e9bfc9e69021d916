use chrono::{DateTime, Utc};

/// Largest id accepted from outside. Matches the integer range a JSON number
/// holds exactly.
pub const MAX_ID: u64 = 9_007_199_254_740_991;

/// Issues strictly increasing ids derived from the creation time in
/// milliseconds, bumping by one when two items land in the same millisecond.
#[derive(Clone, Debug, Default)]
pub struct IdGenerator {
    last: u64,
}

impl IdGenerator {
    pub fn seeded<I>(existing: I) -> Self
    where
        I: IntoIterator<Item = u64>,
    {
        Self {
            last: existing.into_iter().max().unwrap_or(0),
        }
    }

    /// Records an id that entered the collection from elsewhere (import, reload).
    pub fn observe(&mut self, id: u64) {
        self.last = self.last.max(id);
    }

    /// Returns `None` once the id space is used up.
    pub fn next(&mut self, now: DateTime<Utc>) -> Option<u64> {
        let millis = u64::try_from(now.timestamp_millis()).unwrap_or(0);
        let id = millis.max(self.last.checked_add(1)?);
        self.last = id;
        Some(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn same_millisecond_still_yields_distinct_ids() {
        let now = Utc.timestamp_millis_opt(1_700_000_000_000).unwrap();
        let mut ids = IdGenerator::default();
        let first = ids.next(now).unwrap();
        let second = ids.next(now).unwrap();
        assert_eq!(first, 1_700_000_000_000);
        assert_eq!(second, first + 1);
    }

    #[test]
    fn never_reissues_below_observed_ids() {
        let now = Utc.timestamp_millis_opt(1_000).unwrap();
        let mut ids = IdGenerator::seeded([5, 9_000]);
        ids.observe(12_000);
        assert_eq!(ids.next(now), Some(12_001));
    }

    #[test]
    fn exhausted_counter_stops_issuing() {
        let now = Utc.timestamp_millis_opt(1_000).unwrap();
        let mut ids = IdGenerator::seeded([u64::MAX]);
        assert_eq!(ids.next(now), None);
        assert_eq!(ids.next(now), None);
    }
}
