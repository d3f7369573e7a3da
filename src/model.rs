use std::collections::BTreeSet;

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Stay dates. Half-open `[start, end)`: the checkout day is not a booked night.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    pub fn nights(&self) -> i64 {
        (self.end - self.start).num_days()
    }

    pub fn overlaps(&self, other: &DateRange) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// True if `date` is one of the booked nights.
    pub fn contains_night(&self, date: NaiveDate) -> bool {
        self.start <= date && date < self.end
    }

    /// Every booked night, in order. Empty when `nights() < 1`.
    pub fn nights_iter(self) -> impl Iterator<Item = NaiveDate> {
        let end = self.end;
        self.start.iter_days().take_while(move |d| *d < end)
    }
}

/// Room identity: block plus room number.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RoomRef {
    pub block: String,
    pub id: String,
}

impl RoomRef {
    pub fn new(block: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            block: block.into(),
            id: id.into(),
        }
    }
}

impl std::fmt::Display for RoomRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.block, self.id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Room {
    pub block: String,
    pub id: String,
    pub floor: String,
    pub min_occupants: u32,
    pub max_occupants: u32,
    pub has_ac: bool,
    pub wheelchair_accessible: bool,
    pub pets_permitted: bool,
    pub group_booking_permitted: bool,
}

impl Room {
    pub fn room_ref(&self) -> RoomRef {
        RoomRef::new(self.block.clone(), self.id.clone())
    }

    pub fn is(&self, r: &RoomRef) -> bool {
        self.block == r.block && self.id == r.id
    }

    /// Rooms sold as "single": sleeps one, takes up to two.
    pub fn is_single_shape(&self) -> bool {
        self.min_occupants == 1 && self.max_occupants == 2
    }

    pub fn fits(&self, occupants: u32) -> bool {
        self.min_occupants <= occupants && occupants <= self.max_occupants
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PeriodKind {
    Event,
    Special,
    Closed,
    LongWeekend,
}

/// A named run of days. Unlike stays, both `start` and `end` are included.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestrictedPeriod {
    pub start: NaiveDate,
    pub end: NaiveDate,
    #[serde(rename = "type", alias = "kind")]
    pub kind: PeriodKind,
    #[serde(default)]
    pub name: String,
}

impl RestrictedPeriod {
    pub fn covers(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeasonTier {
    Regular,
    Special,
}

impl std::fmt::Display for SeasonTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SeasonTier::Regular => write!(f, "regular"),
            SeasonTier::Special => write!(f, "special"),
        }
    }
}

/// Head counts for one booking, plus the meal split.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OccupantBreakdown {
    pub member_adults: u32,
    pub seniors: u32,
    pub temp_adults: u32,
    pub children_under_10: u32,
    pub children_10_to_21: u32,
    pub group_guests: u32,
    pub veg: u32,
    pub nonveg: u32,
}

impl OccupantBreakdown {
    pub fn total(&self) -> u32 {
        self.member_adults
            + self.seniors
            + self.temp_adults
            + self.children_under_10
            + self.children_10_to_21
            + self.group_guests
    }

    pub fn adults(&self) -> u32 {
        self.member_adults + self.seniors + self.temp_adults
    }

    /// Heads that must be spread over the "members" column of the room split.
    pub fn member_side(&self) -> u32 {
        self.member_adults + self.seniors + self.children_10_to_21
    }

    pub fn temp_side(&self) -> u32 {
        self.temp_adults + self.group_guests
    }
}

/// How the caller spreads the party over one selected room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomAssignment {
    pub room: RoomRef,
    #[serde(default)]
    pub members: u32,
    #[serde(default)]
    pub temps: u32,
    #[serde(default)]
    pub children: u32,
}

impl RoomAssignment {
    pub fn total(&self) -> u32 {
        self.members + self.temps + self.children
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    Confirmed,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Booking {
    pub id: Ulid,
    pub member_id: String,
    pub range: DateRange,
    pub rooms: BTreeSet<RoomRef>,
    pub occupants: OccupantBreakdown,
    pub ac: bool,
    pub group: bool,
    #[serde(with = "rust_decimal::serde::str")]
    pub total_price: Decimal,
    pub status: BookingStatus,
    pub created_at: NaiveDateTime,
    pub cancelled_at: Option<NaiveDateTime>,
}

impl Booking {
    pub fn is_confirmed(&self) -> bool {
        self.status == BookingStatus::Confirmed
    }

    pub fn claims(&self, room: &RoomRef, range: &DateRange) -> bool {
        self.is_confirmed() && self.range.overlaps(range) && self.rooms.contains(room)
    }
}

/// Ledger journal records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Event {
    BookingConfirmed { booking: Booking },
    BookingCancelled { id: Ulid, cancelled_at: NaiveDateTime },
}

impl Event {
    pub fn booking_id(&self) -> Ulid {
        match self {
            Event::BookingConfirmed { booking } => booking.id,
            Event::BookingCancelled { id, .. } => *id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn sample_booking(range: DateRange, rooms: &[RoomRef]) -> Booking {
        Booking {
            id: Ulid::new(),
            member_id: "123".into(),
            range,
            rooms: rooms.iter().cloned().collect(),
            occupants: OccupantBreakdown::default(),
            ac: false,
            group: false,
            total_price: Decimal::new(1092000, 2),
            status: BookingStatus::Confirmed,
            created_at: d("2025-10-01").and_hms_opt(10, 0, 0).unwrap(),
            cancelled_at: None,
        }
    }

    #[test]
    fn range_nights() {
        let r = DateRange::new(d("2025-10-20"), d("2025-10-22"));
        assert_eq!(r.nights(), 2);
        assert!(r.contains_night(d("2025-10-20")));
        assert!(r.contains_night(d("2025-10-21")));
        assert!(!r.contains_night(d("2025-10-22"))); // checkout day
    }

    #[test]
    fn range_backwards_has_negative_nights() {
        let r = DateRange::new(d("2025-10-22"), d("2025-10-20"));
        assert_eq!(r.nights(), -2);
        assert_eq!(r.nights_iter().count(), 0);
    }

    #[test]
    fn range_overlap_is_half_open() {
        let a = DateRange::new(d("2025-10-20"), d("2025-10-22"));
        let b = DateRange::new(d("2025-10-21"), d("2025-10-25"));
        let c = DateRange::new(d("2025-10-22"), d("2025-10-24"));
        assert!(a.overlaps(&b));
        assert!(!a.overlaps(&c)); // back-to-back stays share the changeover day
    }

    #[test]
    fn nights_iter_lists_each_night() {
        let r = DateRange::new(d("2025-12-30"), d("2026-01-02"));
        let nights: Vec<_> = r.nights_iter().collect();
        assert_eq!(nights, vec![d("2025-12-30"), d("2025-12-31"), d("2026-01-01")]);
    }

    #[test]
    fn single_shape() {
        let mut room = Room {
            block: "A".into(),
            id: "A-1".into(),
            floor: "1st".into(),
            min_occupants: 1,
            max_occupants: 2,
            has_ac: false,
            wheelchair_accessible: true,
            pets_permitted: false,
            group_booking_permitted: true,
        };
        assert!(room.is_single_shape());
        room.max_occupants = 3;
        assert!(!room.is_single_shape());
        assert!(room.fits(3));
        assert!(!room.fits(0));
    }

    #[test]
    fn occupant_totals() {
        let o = OccupantBreakdown {
            member_adults: 2,
            seniors: 1,
            temp_adults: 1,
            children_under_10: 1,
            children_10_to_21: 1,
            group_guests: 0,
            veg: 3,
            nonveg: 3,
        };
        assert_eq!(o.total(), 6);
        assert_eq!(o.adults(), 4);
        assert_eq!(o.member_side(), 4);
        assert_eq!(o.temp_side(), 1);
    }

    #[test]
    fn cancelled_booking_claims_nothing() {
        let room = RoomRef::new("A", "A-1");
        let range = DateRange::new(d("2025-11-10"), d("2025-11-12"));
        let mut b = sample_booking(range, std::slice::from_ref(&room));
        assert!(b.claims(&room, &range));
        b.status = BookingStatus::Cancelled;
        assert!(!b.claims(&room, &range));
    }

    #[test]
    fn period_deserializes_type_field() {
        let p: RestrictedPeriod = serde_json::from_str(
            r#"{"start":"2025-10-17","end":"2025-11-02","type":"special","name":"Diwali"}"#,
        )
        .unwrap();
        assert_eq!(p.kind, PeriodKind::Special);
        assert!(p.covers(d("2025-11-02"))); // inclusive end
    }

    #[test]
    fn event_serialization_roundtrip() {
        let booking = sample_booking(
            DateRange::new(d("2025-11-10"), d("2025-11-12")),
            &[RoomRef::new("A", "A-1"), RoomRef::new("B", "B-2")],
        );
        let event = Event::BookingConfirmed { booking };
        let bytes = bincode::serialize(&event).unwrap();
        let decoded: Event = bincode::deserialize(&bytes).unwrap();
        assert_eq!(event, decoded);
    }
}
