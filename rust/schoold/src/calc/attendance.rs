use super::round_off_1_decimal;
use crate::model::{AttendanceRecord, AttendanceStatus, RecordId};
use chrono::{Days, NaiveDate};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DailyCounts {
    pub present: usize,
    pub absent: usize,
    pub tardy: usize,
}

impl DailyCounts {
    fn record(&mut self, status: AttendanceStatus) {
        match status {
            AttendanceStatus::Present => self.present += 1,
            AttendanceStatus::Absent => self.absent += 1,
            AttendanceStatus::Tardy => self.tardy += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.present + self.absent + self.tardy
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DayBucket {
    pub date: NaiveDate,
    #[serde(flatten)]
    pub counts: DailyCounts,
}

/// What marking attendance for a (student, day) pair has to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkAction {
    Create,
    Update { record_id: RecordId },
}

/// One record per (student, day): the one with the greatest id wins.
///
/// The store never reuses ids, so the greatest id is the latest write.
/// Output is ordered by day, then student.
pub fn latest_per_day(records: &[AttendanceRecord]) -> Vec<&AttendanceRecord> {
    let mut latest: BTreeMap<(NaiveDate, RecordId), &AttendanceRecord> = BTreeMap::new();
    for r in records {
        latest
            .entry((r.date, r.student_id))
            .and_modify(|cur| {
                if r.id > cur.id {
                    *cur = r;
                }
            })
            .or_insert(r);
    }
    latest.into_values().collect()
}

pub fn status_counts<'a, I>(records: I) -> DailyCounts
where
    I: IntoIterator<Item = &'a AttendanceRecord>,
{
    let mut counts = DailyCounts::default();
    for r in records {
        counts.record(r.status);
    }
    counts
}

pub fn daily_counts(records: &[AttendanceRecord], date: NaiveDate) -> DailyCounts {
    status_counts(latest_per_day(records).into_iter().filter(|r| r.date == date))
}

/// Share of present marks, in percent rounded to one decimal; 0 when empty.
pub fn present_rate(records: &[AttendanceRecord]) -> f64 {
    rate_of(&status_counts(latest_per_day(records)))
}

pub fn rate_of(counts: &DailyCounts) -> f64 {
    let total = counts.total();
    if total == 0 {
        return 0.0;
    }
    round_off_1_decimal(counts.present as f64 / total as f64 * 100.0)
}

/// Exactly `days` buckets ending at `anchor` inclusive, oldest first.
pub fn trailing_window(records: &[AttendanceRecord], days: usize, anchor: NaiveDate) -> Vec<DayBucket> {
    let mut by_day: HashMap<NaiveDate, DailyCounts> = HashMap::new();
    for r in latest_per_day(records) {
        by_day.entry(r.date).or_default().record(r.status);
    }
    (0..days as u64)
        .rev()
        .filter_map(|back| anchor.checked_sub_days(Days::new(back)))
        .map(|date| DayBucket {
            date,
            counts: by_day.get(&date).copied().unwrap_or_default(),
        })
        .collect()
}

/// Decide create vs. update by (student, day), never by record id.
pub fn resolve_mark(records: &[AttendanceRecord], student_id: RecordId, date: NaiveDate) -> MarkAction {
    records
        .iter()
        .filter(|r| r.student_id == student_id && r.date == date)
        .max_by_key(|r| r.id)
        .map(|r| MarkAction::Update { record_id: r.id })
        .unwrap_or(MarkAction::Create)
}

pub fn student_records(records: &[AttendanceRecord], student_id: RecordId) -> Vec<&AttendanceRecord> {
    records.iter().filter(|r| r.student_id == student_id).collect()
}

/// Present rate for one student.
pub fn student_present_rate(records: &[AttendanceRecord], student_id: RecordId) -> f64 {
    let own: Vec<AttendanceRecord> = student_records(records, student_id)
        .into_iter()
        .cloned()
        .collect();
    present_rate(&own)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").expect("date")
    }

    fn rec(id: RecordId, student_id: RecordId, date: &str, status: AttendanceStatus) -> AttendanceRecord {
        AttendanceRecord {
            id,
            student_id,
            class_id: None,
            date: day(date),
            status,
        }
    }

    use AttendanceStatus::{Absent, Present, Tardy};

    #[test]
    fn daily_counts_match_exact_day_only() {
        let records = [
            rec(1, 1, "2024-03-01", Present),
            rec(2, 2, "2024-03-01", Absent),
            rec(3, 3, "2024-03-01", Tardy),
            rec(4, 1, "2024-03-02", Absent),
        ];
        let counts = daily_counts(&records, day("2024-03-01"));
        assert_eq!(
            counts,
            DailyCounts {
                present: 1,
                absent: 1,
                tardy: 1
            }
        );
        assert_eq!(daily_counts(&records, day("2024-02-29")).total(), 0);
    }

    #[test]
    fn present_rate_rounds_to_one_decimal() {
        let records = [
            rec(1, 1, "2024-03-01", Present),
            rec(2, 2, "2024-03-01", Present),
            rec(3, 3, "2024-03-01", Absent),
        ];
        assert_eq!(present_rate(&records), 66.7);
        assert_eq!(present_rate(&[]), 0.0);
    }

    #[test]
    fn duplicate_day_records_use_latest_not_sum() {
        let records = [
            rec(5, 1, "2024-03-01", Present),
            rec(9, 1, "2024-03-01", Absent),
            rec(7, 1, "2024-03-01", Tardy),
        ];
        let counts = daily_counts(&records, day("2024-03-01"));
        assert_eq!(counts.total(), 1);
        assert_eq!(counts.absent, 1);
        assert_eq!(present_rate(&records), 0.0);
        assert_eq!(
            resolve_mark(&records, 1, day("2024-03-01")),
            MarkAction::Update { record_id: 9 }
        );
    }

    #[test]
    fn trailing_window_has_exact_length_and_order() {
        let records = [
            rec(1, 1, "2024-01-03", Present),
            rec(2, 2, "2024-01-03", Tardy),
            rec(3, 1, "2024-01-07", Absent),
            rec(4, 1, "2023-12-31", Present),
            rec(5, 1, "2024-01-08", Present),
        ];
        let window = trailing_window(&records, 7, day("2024-01-07"));
        let dates: Vec<String> = window.iter().map(|b| b.date.to_string()).collect();
        assert_eq!(
            dates,
            vec![
                "2024-01-01",
                "2024-01-02",
                "2024-01-03",
                "2024-01-04",
                "2024-01-05",
                "2024-01-06",
                "2024-01-07"
            ]
        );
        assert_eq!(window[2].counts.present, 1);
        assert_eq!(window[2].counts.tardy, 1);
        assert_eq!(window[6].counts.absent, 1);
        assert_eq!(window[0].counts, DailyCounts::default());
        assert!(trailing_window(&records, 0, day("2024-01-07")).is_empty());
    }

    #[test]
    fn resolve_mark_creates_when_pair_is_new() {
        let records = [rec(1, 2, "2024-03-01", Present), rec(2, 1, "2024-03-02", Present)];
        assert_eq!(resolve_mark(&records, 1, day("2024-03-01")), MarkAction::Create);
    }

    #[test]
    fn student_rate_ignores_other_students() {
        let records = [
            rec(1, 1, "2024-03-01", Present),
            rec(2, 1, "2024-03-02", Absent),
            rec(3, 2, "2024-03-01", Absent),
        ];
        assert_eq!(student_present_rate(&records, 1), 50.0);
        assert_eq!(student_present_rate(&records, 3), 0.0);
    }

    #[test]
    fn bucket_serializes_flat() {
        let b = DayBucket {
            date: day("2024-01-01"),
            counts: DailyCounts {
                present: 2,
                absent: 0,
                tardy: 1,
            },
        };
        let v = serde_json::to_value(b).expect("serialize");
        assert_eq!(
            v,
            serde_json::json!({ "date": "2024-01-01", "present": 2, "absent": 0, "tardy": 1 })
        );
    }
}
