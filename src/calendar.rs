use std::collections::{BTreeSet, HashMap};

use chrono::{Datelike, NaiveDate, Weekday};
use serde::Serialize;
use tracing::warn;

use crate::limits::MAX_PERIOD_SPAN_DAYS;
use crate::model::*;

/// Display tags for a calendar day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DayTag {
    Weekend,
    Event,
    Special,
    Closed,
    LongWeekend,
}

impl From<PeriodKind> for DayTag {
    fn from(kind: PeriodKind) -> Self {
        match kind {
            PeriodKind::Event => DayTag::Event,
            PeriodKind::Special => DayTag::Special,
            PeriodKind::Closed => DayTag::Closed,
            PeriodKind::LongWeekend => DayTag::LongWeekend,
        }
    }
}

/// Day-level index over the restricted periods. Immutable once built.
#[derive(Debug, Clone, Default)]
pub struct PeriodIndex {
    periods: Vec<RestrictedPeriod>,
    /// Day → indices into `periods` covering it.
    by_day: HashMap<NaiveDate, Vec<usize>>,
    special: Vec<usize>,
}

impl PeriodIndex {
    pub fn new(periods: Vec<RestrictedPeriod>) -> Self {
        let mut index = Self::default();
        for period in periods {
            let span = (period.end - period.start).num_days();
            if span < 0 {
                warn!(name = %period.name, "skipping period that ends before it starts");
                continue;
            }
            if span > MAX_PERIOD_SPAN_DAYS {
                warn!(name = %period.name, span, "skipping period wider than {MAX_PERIOD_SPAN_DAYS} days");
                continue;
            }
            let idx = index.periods.len();
            for day in period.start.iter_days().take(span as usize + 1) {
                index.by_day.entry(day).or_default().push(idx);
            }
            if period.kind == PeriodKind::Special {
                index.special.push(idx);
            }
            index.periods.push(period);
        }
        index
    }

    pub fn periods(&self) -> &[RestrictedPeriod] {
        &self.periods
    }

    /// Named periods covering `date`, in load order.
    pub fn periods_on(&self, date: NaiveDate) -> impl Iterator<Item = &RestrictedPeriod> {
        self.by_day
            .get(&date)
            .into_iter()
            .flatten()
            .map(|&i| &self.periods[i])
    }

    pub fn closed_period_on(&self, date: NaiveDate) -> Option<&RestrictedPeriod> {
        self.periods_on(date).find(|p| p.kind == PeriodKind::Closed)
    }

    pub fn is_closed(&self, date: NaiveDate) -> bool {
        self.closed_period_on(date).is_some()
    }

    /// First booked night of `range` that falls in a closed period.
    pub fn first_closed_night(&self, range: &DateRange) -> Option<(NaiveDate, &RestrictedPeriod)> {
        range
            .nights_iter()
            .find_map(|night| self.closed_period_on(night).map(|p| (night, p)))
    }

    /// `Special` when the stay overlaps any special period.
    ///
    /// Overlap is the open-interval test `range.start < period.end && period.start < range.end`,
    /// so a stay that checks in on a special period's last listed day stays regular.
    pub fn season_tier(&self, range: &DateRange) -> SeasonTier {
        let special = self.special.iter().map(|&i| &self.periods[i]).any(|p| {
            range.start < p.end && p.start < range.end
        });
        if special {
            SeasonTier::Special
        } else {
            SeasonTier::Regular
        }
    }

    pub fn tags(&self, date: NaiveDate) -> BTreeSet<DayTag> {
        let mut tags: BTreeSet<DayTag> = self.periods_on(date).map(|p| p.kind.into()).collect();
        // Friday and Saturday nights are the weekend.
        if matches!(date.weekday(), Weekday::Fri | Weekday::Sat) {
            tags.insert(DayTag::Weekend);
        }
        tags
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn period(start: &str, end: &str, kind: PeriodKind, name: &str) -> RestrictedPeriod {
        RestrictedPeriod {
            start: d(start),
            end: d(end),
            kind,
            name: name.into(),
        }
    }

    fn index() -> PeriodIndex {
        PeriodIndex::new(vec![
            period("2025-10-17", "2025-11-02", PeriodKind::Special, "Diwali"),
            period("2025-06-30", "2025-09-14", PeriodKind::Closed, "Monsoons"),
            period("2026-01-24", "2026-01-26", PeriodKind::LongWeekend, "Republic Day"),
            period("2025-10-25", "2025-10-25", PeriodKind::Event, "Barbeque"),
        ])
    }

    #[test]
    fn diwali_stay_is_special() {
        let idx = index();
        let r = DateRange::new(d("2025-10-20"), d("2025-10-22"));
        assert_eq!(idx.season_tier(&r), SeasonTier::Special);
    }

    #[test]
    fn november_stay_is_regular() {
        let idx = index();
        let r = DateRange::new(d("2025-11-10"), d("2025-11-12"));
        assert_eq!(idx.season_tier(&r), SeasonTier::Regular);
    }

    #[test]
    fn stay_straddling_period_start_is_special() {
        let idx = index();
        let r = DateRange::new(d("2025-10-15"), d("2025-10-18"));
        assert_eq!(idx.season_tier(&r), SeasonTier::Special);
    }

    #[test]
    fn open_overlap_excludes_boundary_days() {
        let idx = index();
        // Checks out the day the period starts.
        let before = DateRange::new(d("2025-10-15"), d("2025-10-17"));
        assert_eq!(idx.season_tier(&before), SeasonTier::Regular);
        // Checks in on the period's last listed day.
        let after = DateRange::new(d("2025-11-02"), d("2025-11-04"));
        assert_eq!(idx.season_tier(&after), SeasonTier::Regular);
    }

    #[test]
    fn closed_days_are_inclusive() {
        let idx = index();
        assert!(idx.is_closed(d("2025-06-30")));
        assert!(idx.is_closed(d("2025-09-14")));
        assert!(!idx.is_closed(d("2025-09-15")));
        assert!(!idx.is_closed(d("2025-06-29")));
    }

    #[test]
    fn first_closed_night_ignores_checkout_day() {
        let idx = index();
        let leaving_on_closure = DateRange::new(d("2025-06-28"), d("2025-06-30"));
        assert!(idx.first_closed_night(&leaving_on_closure).is_none());

        let into_closure = DateRange::new(d("2025-06-28"), d("2025-07-02"));
        let (night, p) = idx.first_closed_night(&into_closure).unwrap();
        assert_eq!(night, d("2025-06-30"));
        assert_eq!(p.name, "Monsoons");
    }

    #[test]
    fn tags_merge_periods_and_weekend() {
        let idx = index();
        // 2025-10-25 is a Saturday inside Diwali with a barbeque.
        let tags = idx.tags(d("2025-10-25"));
        assert!(tags.contains(&DayTag::Weekend));
        assert!(tags.contains(&DayTag::Special));
        assert!(tags.contains(&DayTag::Event));
        assert!(!tags.contains(&DayTag::Closed));

        // 2025-11-10 is a plain Monday.
        assert!(idx.tags(d("2025-11-10")).is_empty());
    }

    #[test]
    fn overlapping_periods_both_listed() {
        let idx = index();
        let names: Vec<_> = idx.periods_on(d("2025-10-25")).map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Diwali", "Barbeque"]);
    }

    #[test]
    fn malformed_periods_skipped() {
        let idx = PeriodIndex::new(vec![
            period("2025-10-10", "2025-10-01", PeriodKind::Closed, "Backwards"),
            period("2020-01-01", "2025-01-01", PeriodKind::Closed, "Too wide"),
        ]);
        assert!(idx.periods().is_empty());
        assert!(!idx.is_closed(d("2025-10-05")));
    }
}
