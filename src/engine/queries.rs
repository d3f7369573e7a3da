use std::collections::BTreeSet;

use chrono::{Datelike, Months, NaiveDate};
use serde::Serialize;

use crate::calendar::DayTag;
use crate::limits::*;
use crate::model::*;

use super::availability::{free_rooms, FilterSet};
use super::conflict::validate_nights;
use super::{Engine, EngineError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CalendarDay {
    pub date: NaiveDate,
    pub vacant: usize,
    pub total: usize,
    pub tags: BTreeSet<DayTag>,
    pub periods: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BlockSummary {
    pub block: String,
    pub free: usize,
    pub total: usize,
}

impl Engine {
    /// Rooms with no confirmed booking on the night of `date`.
    pub fn vacancy_on(&self, date: NaiveDate) -> usize {
        let occupied = self.ledger.occupancy_on(date);
        self.inventory
            .all_rooms()
            .iter()
            .filter(|r| !occupied.contains_key(&r.room_ref()))
            .count()
    }

    /// One entry per day, from the first of `from`'s month, for `months` months.
    pub fn vacancy_calendar(&self, from: NaiveDate, months: u32) -> Result<Vec<CalendarDay>, EngineError> {
        if months > MAX_CALENDAR_MONTHS {
            return Err(EngineError::LimitExceeded("calendar spans too many months"));
        }
        let first = from.with_day(1).unwrap_or(from);
        let end = first
            .checked_add_months(Months::new(months))
            .ok_or(EngineError::LimitExceeded("calendar runs past the supported date range"))?;
        let total = self.inventory.len();
        Ok(DateRange::new(first, end)
            .nights_iter()
            .map(|date| CalendarDay {
                date,
                vacant: self.vacancy_on(date),
                total,
                tags: self.calendar.tags(date),
                periods: self.calendar.periods_on(date).map(|p| p.name.clone()).collect(),
            })
            .collect())
    }

    /// Free and total rooms per block for `range`, blocks in inventory order.
    pub fn block_summary(&self, range: DateRange) -> Result<Vec<BlockSummary>, EngineError> {
        validate_nights(&range)?;
        let free = free_rooms(&self.inventory, &self.ledger, &range, &FilterSet::default());
        Ok(self
            .inventory
            .blocks()
            .into_iter()
            .map(|block| BlockSummary {
                block: block.to_string(),
                free: free.iter().filter(|r| r.block == block).count(),
                total: self.inventory.rooms_in_block(block).count(),
            })
            .collect())
    }

    /// Every booking of `member`, cancelled ones included, oldest first.
    pub fn bookings_for(&self, member: &str) -> Vec<&Booking> {
        self.ledger.iter().filter(|b| b.member_id == member).collect()
    }
}
