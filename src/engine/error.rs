use chrono::NaiveDate;
use ulid::Ulid;

use crate::model::{Booking, RoomRef, SeasonTier};
use crate::rules::RuleClass;
use crate::tariff::{GuestCategory, RateKind};

#[derive(Debug)]
pub enum EngineError {
    InvalidRange {
        start: NaiveDate,
        end: NaiveDate,
    },
    ClosedPeriod {
        date: NaiveDate,
        name: String,
    },
    /// A requested room is claimed by a confirmed booking for an overlapping night.
    RoomUnavailable {
        room: RoomRef,
        booking: Ulid,
    },
    UnknownRoom(RoomRef),
    DuplicateRoom(RoomRef),
    NoRoomsSelected,
    DuplicateBooking(Ulid),
    NotFound(Ulid),
    AlreadyCancelled(Ulid),
    QuoteExpired(Ulid),
    OccupancyMismatch {
        field: &'static str,
        expected: u32,
        actual: u32,
    },
    OccupancyOutOfBounds {
        room: RoomRef,
        assigned: u32,
        min: u32,
        max: u32,
    },
    /// `open` lists the member's confirmed bookings that count against the limit.
    TooManyOpenBookings {
        limit: usize,
        open: Vec<Booking>,
    },
    GroupPolicy(String),
    MissingRate {
        tier: SeasonTier,
        category: GuestCategory,
        kind: RateKind,
    },
    NoCancellationRule {
        class: RuleClass,
        days: i64,
    },
    LimitExceeded(&'static str),
    WalError(String),
}

impl std::fmt::Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineError::InvalidRange { start, end } => {
                write!(f, "invalid stay {start} to {end}: check-out must follow check-in")
            }
            EngineError::ClosedPeriod { date, name } => {
                write!(f, "the club is closed on {date} ({name})")
            }
            EngineError::RoomUnavailable { room, booking } => {
                write!(f, "room {room} is already booked (booking {booking})")
            }
            EngineError::UnknownRoom(room) => write!(f, "unknown room: {room}"),
            EngineError::DuplicateRoom(room) => write!(f, "room {room} selected twice"),
            EngineError::NoRoomsSelected => write!(f, "no rooms selected"),
            EngineError::DuplicateBooking(id) => write!(f, "booking already exists: {id}"),
            EngineError::NotFound(id) => write!(f, "not found: {id}"),
            EngineError::AlreadyCancelled(id) => write!(f, "booking {id} is already cancelled"),
            EngineError::QuoteExpired(id) => write!(f, "quote {id} has expired, request a new one"),
            EngineError::OccupancyMismatch {
                field,
                expected,
                actual,
            } => write!(f, "{field}: expected {expected}, got {actual}"),
            EngineError::OccupancyOutOfBounds {
                room,
                assigned,
                min,
                max,
            } => write!(f, "room {room} takes {min} to {max} guests, {assigned} assigned"),
            EngineError::TooManyOpenBookings { limit, open } => {
                let stays: Vec<String> = open
                    .iter()
                    .map(|b| format!("{} ({} to {})", b.id, b.range.start, b.range.end))
                    .collect();
                write!(
                    f,
                    "member already holds {} of {limit} open bookings: {}",
                    open.len(),
                    stays.join(", ")
                )
            }
            EngineError::GroupPolicy(msg) => write!(f, "group booking rejected: {msg}"),
            EngineError::MissingRate {
                tier,
                category,
                kind,
            } => write!(f, "no {tier} rate for {category:?} {kind:?}"),
            EngineError::NoCancellationRule { class, days } => {
                write!(f, "no {class} cancellation rule for {days} days before check-in")
            }
            EngineError::LimitExceeded(msg) => write!(f, "limit exceeded: {msg}"),
            EngineError::WalError(e) => write!(f, "journal error: {e}"),
        }
    }
}

impl std::error::Error for EngineError {}
