use std::collections::BTreeSet;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::model::*;
use crate::rules::{DaysThreshold, RuleClass};

use super::{Engine, EngineError};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CancellationQuote {
    pub charge: Decimal,
    /// `None` when the matching rule forbids modification.
    pub modification_fee: Option<Decimal>,
    pub class: RuleClass,
    pub days_to_start: i64,
    pub threshold: DaysThreshold,
}

/// Table a whole-booking cancellation is charged from.
pub fn rule_class(booking: &Booking, tier: SeasonTier) -> RuleClass {
    if booking.group {
        RuleClass::GroupComplete
    } else if tier == SeasonTier::Special {
        RuleClass::Special
    } else {
        RuleClass::Regular
    }
}

impl Engine {
    /// Fails once `member` already holds the maximum of confirmed bookings starting today or later.
    pub fn check_open_booking_limit(&self, member: &str, today: NaiveDate) -> Result<(), EngineError> {
        let limit = self.rules.max_live_bookings;
        let open: Vec<&Booking> = self
            .ledger
            .open_bookings_for(member)
            .filter(|b| b.range.start >= today)
            .collect();
        if open.len() >= limit {
            return Err(EngineError::TooManyOpenBookings {
                limit,
                open: open.into_iter().cloned().collect(),
            });
        }
        Ok(())
    }

    fn charge_from_table(
        &self,
        class: RuleClass,
        base: Decimal,
        booking: &Booking,
        as_of: NaiveDate,
    ) -> Result<CancellationQuote, EngineError> {
        let days_to_start = (booking.range.start - as_of).num_days();
        let rule = self
            .rules
            .cancellation
            .lookup(class, days_to_start)
            .ok_or(EngineError::NoCancellationRule {
                class,
                days: days_to_start,
            })?;
        Ok(CancellationQuote {
            charge: rule.cancel.apply(base, booking.range.nights()),
            modification_fee: rule.modification.amount(),
            class,
            days_to_start,
            threshold: rule.days,
        })
    }

    /// What cancelling all of `booking` on `as_of` would cost. No side effects.
    pub fn cancellation_charge(&self, booking: &Booking, as_of: NaiveDate) -> Result<CancellationQuote, EngineError> {
        let class = rule_class(booking, self.calendar.season_tier(&booking.range));
        self.charge_from_table(class, booking.total_price, booking, as_of)
    }

    /// What releasing `released` rooms of `booking` would cost, on their pro-rata share of the total.
    pub fn partial_cancellation_charge(
        &self,
        booking: &Booking,
        released: &[RoomRef],
        as_of: NaiveDate,
    ) -> Result<CancellationQuote, EngineError> {
        if released.is_empty() {
            return Err(EngineError::NoRoomsSelected);
        }
        let mut seen = BTreeSet::new();
        for room in released {
            if !booking.rooms.contains(room) {
                return Err(EngineError::UnknownRoom(room.clone()));
            }
            if !seen.insert(room) {
                return Err(EngineError::DuplicateRoom(room.clone()));
            }
        }
        if seen.len() == booking.rooms.len() {
            return self.cancellation_charge(booking, as_of);
        }
        let class = if booking.group {
            RuleClass::GroupPartial
        } else {
            rule_class(booking, self.calendar.season_tier(&booking.range))
        };
        let share = booking.total_price * Decimal::from(seen.len() as u64)
            / Decimal::from(booking.rooms.len() as u64);
        self.charge_from_table(class, share, booking, as_of)
    }

    /// Room and night bounds for group bookings; every room must accept groups.
    pub(super) fn check_group_rules(&self, range: &DateRange, rooms: &[&Room]) -> Result<(), EngineError> {
        let Some(group) = &self.rules.group else {
            return Err(EngineError::GroupPolicy("group bookings are not offered".into()));
        };
        if rooms.len() < group.min_rooms || rooms.len() > group.max_rooms {
            return Err(EngineError::GroupPolicy(format!(
                "{} rooms selected, groups take {} to {}",
                rooms.len(),
                group.min_rooms,
                group.max_rooms
            )));
        }
        let nights = range.nights();
        if nights < group.min_nights || nights > group.max_nights {
            return Err(EngineError::GroupPolicy(format!(
                "{nights} nights requested, groups stay {} to {}",
                group.min_nights, group.max_nights
            )));
        }
        if let Some(room) = rooms.iter().find(|r| !r.group_booking_permitted) {
            return Err(EngineError::GroupPolicy(format!(
                "room {} does not take group bookings",
                room.room_ref()
            )));
        }
        Ok(())
    }
}
