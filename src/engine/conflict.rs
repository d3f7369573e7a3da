use chrono::NaiveDateTime;

use crate::calendar::PeriodIndex;
use crate::model::*;

use super::ledger::Ledger;
use super::EngineError;

pub(crate) fn now() -> NaiveDateTime {
    chrono::Local::now().naive_local()
}

/// At least one night, and no more than the stay limit.
pub(crate) fn validate_nights(range: &DateRange) -> Result<(), EngineError> {
    use crate::limits::MAX_STAY_NIGHTS;
    if range.nights() < 1 {
        return Err(EngineError::InvalidRange {
            start: range.start,
            end: range.end,
        });
    }
    if range.nights() > MAX_STAY_NIGHTS {
        return Err(EngineError::LimitExceeded("stay longer than the maximum nights"));
    }
    Ok(())
}

/// `validate_nights` plus: no booked night falls in a closed period.
pub(crate) fn validate_range(range: &DateRange, calendar: &PeriodIndex) -> Result<(), EngineError> {
    validate_nights(range)?;
    if let Some((date, period)) = calendar.first_closed_night(range) {
        return Err(EngineError::ClosedPeriod {
            date,
            name: period.name.clone(),
        });
    }
    Ok(())
}

pub(crate) fn check_rooms_free<'a>(
    ledger: &Ledger,
    rooms: impl IntoIterator<Item = &'a RoomRef>,
    range: &DateRange,
) -> Result<(), EngineError> {
    for room in rooms {
        if let Some(existing) = ledger.conflict_for(room, range) {
            return Err(EngineError::RoomUnavailable {
                room: room.clone(),
                booking: existing.id,
            });
        }
    }
    Ok(())
}
