use std::collections::{BTreeMap, BTreeSet, HashMap};

use chrono::{NaiveDate, NaiveDateTime};
use ulid::Ulid;

use crate::model::*;

use super::conflict::check_rooms_free;
use super::EngineError;

/// Append-only booking store. Cancellation flips status; nothing is removed.
#[derive(Debug, Default)]
pub struct Ledger {
    bookings: Vec<Booking>,
    by_id: HashMap<Ulid, usize>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything `add` checks, without touching the ledger.
    pub(crate) fn check_add(&self, booking: &Booking) -> Result<(), EngineError> {
        if self.by_id.contains_key(&booking.id) {
            return Err(EngineError::DuplicateBooking(booking.id));
        }
        if booking.range.nights() < 1 {
            return Err(EngineError::InvalidRange {
                start: booking.range.start,
                end: booking.range.end,
            });
        }
        if booking.rooms.is_empty() {
            return Err(EngineError::NoRoomsSelected);
        }
        if booking.is_confirmed() {
            check_rooms_free(self, &booking.rooms, &booking.range)?;
        }
        Ok(())
    }

    /// Record a booking. Availability is re-checked here regardless of earlier searches.
    pub fn add(&mut self, booking: Booking) -> Result<(), EngineError> {
        self.check_add(&booking)?;
        self.by_id.insert(booking.id, self.bookings.len());
        self.bookings.push(booking);
        Ok(())
    }

    pub(crate) fn check_cancel(&self, id: Ulid) -> Result<&Booking, EngineError> {
        let booking = self.get(id).ok_or(EngineError::NotFound(id))?;
        if !booking.is_confirmed() {
            return Err(EngineError::AlreadyCancelled(id));
        }
        Ok(booking)
    }

    pub fn cancel(&mut self, id: Ulid, at: NaiveDateTime) -> Result<&Booking, EngineError> {
        self.check_cancel(id)?;
        let idx = self.by_id[&id];
        let booking = &mut self.bookings[idx];
        booking.status = BookingStatus::Cancelled;
        booking.cancelled_at = Some(at);
        Ok(booking)
    }

    /// Apply a journal event.
    pub fn apply(&mut self, event: &Event) -> Result<(), EngineError> {
        match event {
            Event::BookingConfirmed { booking } => self.add(booking.clone()),
            Event::BookingCancelled { id, cancelled_at } => self.cancel(*id, *cancelled_at).map(|_| ()),
        }
    }

    pub fn get(&self, id: Ulid) -> Option<&Booking> {
        self.by_id.get(&id).map(|&i| &self.bookings[i])
    }

    /// All bookings, cancelled ones included, in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Booking> {
        self.bookings.iter()
    }

    pub fn len(&self) -> usize {
        self.bookings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bookings.is_empty()
    }

    /// Confirmed bookings held by `member`, whatever their dates.
    pub fn open_bookings_for<'a>(&'a self, member: &'a str) -> impl Iterator<Item = &'a Booking> {
        self.bookings
            .iter()
            .filter(move |b| b.is_confirmed() && b.member_id == member)
    }

    /// Room → booking for every confirmed booking with `date` among its nights.
    pub fn occupancy_on(&self, date: NaiveDate) -> BTreeMap<RoomRef, Ulid> {
        let mut out = BTreeMap::new();
        for b in self.bookings.iter().filter(|b| b.is_confirmed() && b.range.contains_night(date)) {
            for room in &b.rooms {
                out.insert(room.clone(), b.id);
            }
        }
        out
    }

    pub fn conflict_for(&self, room: &RoomRef, range: &DateRange) -> Option<&Booking> {
        self.bookings.iter().find(|b| b.claims(room, range))
    }

    /// Rooms claimed by any confirmed booking overlapping `range`.
    pub fn occupied_rooms(&self, range: &DateRange) -> BTreeSet<&RoomRef> {
        self.bookings
            .iter()
            .filter(|b| b.is_confirmed() && b.range.overlaps(range))
            .flat_map(|b| b.rooms.iter())
            .collect()
    }
}
