use crate::records::{self, RecordStore, DAILY_STATS_KEY};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Counters for one local calendar day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyStats {
    pub date: NaiveDate,
    #[serde(default)]
    pub total_focus_seconds: u64,
    #[serde(default)]
    pub lap_count: u32,
    #[serde(default)]
    pub reset_count: u32,
    #[serde(default)]
    pub completed_note_count: u32,
}

impl DailyStats {
    pub fn empty(date: NaiveDate) -> Self {
        DailyStats {
            date,
            total_focus_seconds: 0,
            lap_count: 0,
            reset_count: 0,
            completed_note_count: 0,
        }
    }
}

/// Owns today's [`DailyStats`] and writes the full record after every change.
///
/// A record from an earlier day is replaced by a zeroed one the first time
/// it is touched on a new day. There is no midnight timer.
pub struct StatsAggregator {
    stats: DailyStats,
    records: Arc<dyn RecordStore>,
}

impl StatsAggregator {
    pub fn load(records: Arc<dyn RecordStore>, today: NaiveDate) -> Self {
        let stored = match records::load::<DailyStats>(records.as_ref(), DAILY_STATS_KEY) {
            Ok(stats) => stats,
            Err(err) => {
                tracing::warn!(error = %err, "could not load daily stats, starting fresh");
                None
            }
        };
        let mut aggregator = StatsAggregator {
            stats: stored.unwrap_or_else(|| DailyStats::empty(today)),
            records,
        };
        if aggregator.roll_over(today) {
            aggregator.persist();
        }
        aggregator
    }

    pub fn stats(&self) -> &DailyStats {
        &self.stats
    }

    /// Today's counters, zeroing them first if the stored day is stale.
    pub fn current(&mut self, today: NaiveDate) -> &DailyStats {
        if self.roll_over(today) {
            self.persist();
        }
        &self.stats
    }

    pub fn add_focus_second(&mut self, today: NaiveDate) {
        self.mutate(today, |s| s.total_focus_seconds += 1);
    }

    pub fn record_lap(&mut self, today: NaiveDate) {
        self.mutate(today, |s| s.lap_count += 1);
    }

    pub fn record_reset(&mut self, today: NaiveDate) {
        self.mutate(today, |s| s.reset_count += 1);
    }

    pub fn record_completed_note(&mut self, today: NaiveDate) {
        self.mutate(today, |s| s.completed_note_count += 1);
    }

    fn mutate<F>(&mut self, today: NaiveDate, f: F)
    where
        F: FnOnce(&mut DailyStats),
    {
        self.roll_over(today);
        f(&mut self.stats);
        self.persist();
    }

    fn roll_over(&mut self, today: NaiveDate) -> bool {
        if self.stats.date == today {
            return false;
        }
        tracing::info!(from = %self.stats.date, to = %today, "daily stats rolled over");
        self.stats = DailyStats::empty(today);
        true
    }

    fn persist(&self) {
        if let Err(err) = records::save(self.records.as_ref(), DAILY_STATS_KEY, &self.stats) {
            tracing::warn!(error = %err, "could not persist daily stats");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::MemoryRecordStore;
    use pretty_assertions::assert_eq;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, d).unwrap()
    }

    #[test]
    fn stale_record_is_reset_on_load() {
        let store = Arc::new(MemoryRecordStore::new());
        let yesterday = DailyStats {
            total_focus_seconds: 500,
            lap_count: 4,
            ..DailyStats::empty(day(9))
        };
        records::save(store.as_ref(), DAILY_STATS_KEY, &yesterday).unwrap();

        let aggregator = StatsAggregator::load(store.clone(), day(10));
        assert_eq!(aggregator.stats(), &DailyStats::empty(day(10)));
        let persisted: DailyStats = records::load(store.as_ref(), DAILY_STATS_KEY).unwrap().unwrap();
        assert_eq!(persisted, DailyStats::empty(day(10)));
    }

    #[test]
    fn same_day_record_is_kept() {
        let store = Arc::new(MemoryRecordStore::new());
        let today = DailyStats {
            total_focus_seconds: 42,
            reset_count: 1,
            ..DailyStats::empty(day(10))
        };
        records::save(store.as_ref(), DAILY_STATS_KEY, &today).unwrap();
        let aggregator = StatsAggregator::load(store, day(10));
        assert_eq!(aggregator.stats(), &today);
    }

    #[test]
    fn every_change_is_persisted_in_full() {
        let store = Arc::new(MemoryRecordStore::new());
        let mut aggregator = StatsAggregator::load(store.clone(), day(10));
        aggregator.add_focus_second(day(10));
        aggregator.add_focus_second(day(10));
        aggregator.record_lap(day(10));
        aggregator.record_reset(day(10));
        aggregator.record_completed_note(day(10));

        let persisted: DailyStats = records::load(store.as_ref(), DAILY_STATS_KEY).unwrap().unwrap();
        assert_eq!(
            persisted,
            DailyStats {
                date: day(10),
                total_focus_seconds: 2,
                lap_count: 1,
                reset_count: 1,
                completed_note_count: 1,
            }
        );
    }

    #[test]
    fn access_on_a_new_day_starts_from_zero() {
        let store = Arc::new(MemoryRecordStore::new());
        let mut aggregator = StatsAggregator::load(store, day(10));
        aggregator.add_focus_second(day(10));
        aggregator.add_focus_second(day(11));
        assert_eq!(aggregator.stats().date, day(11));
        assert_eq!(aggregator.stats().total_focus_seconds, 1);
        assert_eq!(aggregator.current(day(12)), &DailyStats::empty(day(12)));
    }

    #[test]
    fn wire_names_are_camel_case() {
        let json = serde_json::to_value(DailyStats::empty(day(1))).unwrap();
        assert_eq!(json["date"], "2026-03-01");
        assert_eq!(json["totalFocusSeconds"], 0);
        assert_eq!(json["completedNoteCount"], 0);
    }
}
