use std::collections::HashSet;

use chrono::{NaiveDate, NaiveDateTime, TimeDelta};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use ulid::Ulid;

use crate::limits::*;
use crate::model::*;
use crate::tariff::RateKind;

use super::conflict::{check_rooms_free, now, validate_range};
use super::pricing::{PriceBreakdown, PriceOptions};
use super::{Engine, EngineError};

/// A member's booking request, as submitted by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingRequest {
    #[serde(alias = "memberId")]
    pub member_id: String,
    #[serde(alias = "checkIn")]
    pub check_in: NaiveDate,
    #[serde(alias = "checkOut")]
    pub check_out: NaiveDate,
    pub rooms: Vec<RoomAssignment>,
    #[serde(default)]
    pub occupants: OccupantBreakdown,
    #[serde(default)]
    pub ac: bool,
    #[serde(default)]
    pub group: bool,
    #[serde(default)]
    pub base_rate: Option<RateKind>,
}

impl BookingRequest {
    pub fn range(&self) -> DateRange {
        DateRange::new(self.check_in, self.check_out)
    }
}

/// Returned by `request_booking`; pass `token` to `confirm_booking` before `expires_at`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PendingConfirmation {
    pub token: Ulid,
    pub booking_id: Ulid,
    pub quote: PriceBreakdown,
    pub expires_at: NaiveDateTime,
}

#[derive(Debug, Clone)]
pub(super) struct PendingQuote {
    booking: Booking,
    expires_at: NaiveDateTime,
}

fn check_occupancy(req: &BookingRequest, rooms: &[&Room]) -> Result<(), EngineError> {
    let o = &req.occupants;
    let total = o.total();
    if o.veg + o.nonveg != total {
        return Err(EngineError::OccupancyMismatch {
            field: "veg + nonveg",
            expected: total,
            actual: o.veg + o.nonveg,
        });
    }
    let sums = [
        ("members", o.member_side(), req.rooms.iter().map(|a| a.members).sum::<u32>()),
        ("temps", o.temp_side(), req.rooms.iter().map(|a| a.temps).sum()),
        ("children", o.children_under_10, req.rooms.iter().map(|a| a.children).sum()),
    ];
    for (field, expected, actual) in sums {
        if expected != actual {
            return Err(EngineError::OccupancyMismatch {
                field,
                expected,
                actual,
            });
        }
    }
    for (assignment, room) in req.rooms.iter().zip(rooms) {
        let assigned = assignment.total();
        if !room.fits(assigned) {
            return Err(EngineError::OccupancyOutOfBounds {
                room: room.room_ref(),
                assigned,
                min: room.min_occupants,
                max: room.max_occupants,
            });
        }
    }
    Ok(())
}

impl Engine {
    /// Validate and price a request. Nothing is recorded until the returned token is confirmed.
    pub fn request_booking(&mut self, req: &BookingRequest) -> Result<PendingConfirmation, EngineError> {
        self.request_booking_at(req, now())
    }

    pub fn request_booking_at(
        &mut self,
        req: &BookingRequest,
        now: NaiveDateTime,
    ) -> Result<PendingConfirmation, EngineError> {
        let quote = self.validate_request(req, now.date()).inspect_err(|e| {
            debug!(member = %req.member_id, "booking request rejected: {e}");
            metrics::counter!(
                crate::observability::REQUESTS_REJECTED_TOTAL,
                "reason" => crate::observability::error_label(e)
            )
            .increment(1);
        })?;
        self.purge_expired_quotes(now);

        let booking = Booking {
            id: Ulid::new(),
            member_id: req.member_id.clone(),
            range: req.range(),
            rooms: req.rooms.iter().map(|a| a.room.clone()).collect(),
            occupants: req.occupants,
            ac: req.ac,
            group: req.group,
            total_price: quote.total,
            status: BookingStatus::Confirmed,
            created_at: now,
            cancelled_at: None,
        };
        let token = Ulid::new();
        let booking_id = booking.id;
        let expires_at = now + TimeDelta::seconds(QUOTE_TTL_SECS);
        self.pending.insert(token, PendingQuote { booking, expires_at });
        metrics::counter!(crate::observability::QUOTES_ISSUED_TOTAL).increment(1);
        debug!(%token, member = %req.member_id, total = %quote.total, "quote issued");

        Ok(PendingConfirmation {
            token,
            booking_id,
            quote,
            expires_at,
        })
    }

    fn validate_request(&self, req: &BookingRequest, today: NaiveDate) -> Result<PriceBreakdown, EngineError> {
        let member = req.member_id.trim();
        if member.is_empty() || member.len() > MAX_MEMBER_ID_LEN {
            return Err(EngineError::LimitExceeded("member id must be 1 to 64 characters"));
        }
        let range = req.range();
        validate_range(&range, &self.calendar)?;

        if req.rooms.is_empty() {
            return Err(EngineError::NoRoomsSelected);
        }
        if req.rooms.len() > MAX_ROOMS_PER_BOOKING {
            return Err(EngineError::LimitExceeded("too many rooms in one booking"));
        }
        let mut seen = HashSet::new();
        let mut rooms = Vec::with_capacity(req.rooms.len());
        for assignment in &req.rooms {
            if !seen.insert(&assignment.room) {
                return Err(EngineError::DuplicateRoom(assignment.room.clone()));
            }
            let room = self
                .inventory
                .get(&assignment.room)
                .ok_or_else(|| EngineError::UnknownRoom(assignment.room.clone()))?;
            rooms.push(room);
        }

        check_occupancy(req, &rooms)?;
        if req.group {
            self.check_group_rules(&range, &rooms)?;
        }
        self.check_open_booking_limit(&req.member_id, today)?;
        check_rooms_free(&self.ledger, req.rooms.iter().map(|a| &a.room), &range)?;

        let options = PriceOptions {
            ac: req.ac,
            base_rate: req.base_rate.unwrap_or(RateKind::Double),
        };
        let refs: Vec<RoomRef> = req.rooms.iter().map(|a| a.room.clone()).collect();
        self.price(range, &refs, &req.occupants, &options)
    }

    fn purge_expired_quotes(&mut self, now: NaiveDateTime) {
        let before = self.pending.len();
        self.pending.retain(|_, q| q.expires_at >= now);
        let purged = before - self.pending.len();
        if purged > 0 {
            debug!(purged, "expired quotes dropped");
            metrics::counter!(crate::observability::QUOTES_EXPIRED_TOTAL).increment(purged as u64);
        }
    }

    /// Commit a quoted booking. Availability and the open-booking limit are checked again.
    pub fn confirm_booking(&mut self, token: Ulid) -> Result<Booking, EngineError> {
        self.confirm_booking_at(token, now())
    }

    pub fn confirm_booking_at(&mut self, token: Ulid, now: NaiveDateTime) -> Result<Booking, EngineError> {
        let pending = self.pending.remove(&token).ok_or(EngineError::NotFound(token))?;
        if now > pending.expires_at {
            metrics::counter!(crate::observability::QUOTES_EXPIRED_TOTAL).increment(1);
            return Err(EngineError::QuoteExpired(token));
        }
        let mut booking = pending.booking;
        booking.created_at = now;
        self.check_open_booking_limit(&booking.member_id, now.date())?;
        self.ledger.check_add(&booking)?;

        self.persist_and_apply(Event::BookingConfirmed {
            booking: booking.clone(),
        })?;
        info!(
            id = %booking.id,
            member = %booking.member_id,
            rooms = booking.rooms.len(),
            total = %booking.total_price,
            "booking confirmed"
        );
        metrics::counter!(crate::observability::BOOKINGS_CONFIRMED_TOTAL).increment(1);
        Ok(booking)
    }

    /// Record a booking directly, bypassing the quote flow. The ledger still re-checks it.
    pub fn add_booking(&mut self, booking: Booking) -> Result<(), EngineError> {
        self.ledger.check_add(&booking)?;
        self.persist_and_apply(Event::BookingConfirmed { booking })
    }

    /// Cancel a confirmed booking, returning the charge that applied.
    pub fn cancel_booking(&mut self, id: Ulid) -> Result<super::CancellationQuote, EngineError> {
        self.cancel_booking_at(id, now())
    }

    pub fn cancel_booking_at(
        &mut self,
        id: Ulid,
        now: NaiveDateTime,
    ) -> Result<super::CancellationQuote, EngineError> {
        let booking = self.ledger.check_cancel(id)?.clone();
        let quote = self.cancellation_charge(&booking, now.date())?;
        self.persist_and_apply(Event::BookingCancelled { id, cancelled_at: now })?;
        info!(%id, charge = %quote.charge, class = %quote.class, "booking cancelled");
        metrics::counter!(crate::observability::BOOKINGS_CANCELLED_TOTAL).increment(1);
        Ok(quote)
    }
}
