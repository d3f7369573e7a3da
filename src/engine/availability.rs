use serde::{Deserialize, Serialize};

use crate::inventory::Inventory;
use crate::model::*;

use super::conflict::validate_range;
use super::ledger::Ledger;
use super::{Engine, EngineError};

/// Filter identity, independent of any parameter. Declaration order is the relaxation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterKey {
    Wheelchair,
    Pets,
    Ac,
    Single,
    MinOccupants,
    MaxOccupants,
    Group,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomFilter {
    Wheelchair,
    Pets,
    Ac,
    Single,
    /// Keeps rooms whose minimum occupancy is at least `n`.
    MinOccupants(u32),
    /// Keeps rooms whose maximum occupancy is at most `n`.
    MaxOccupants(u32),
    Group,
}

impl RoomFilter {
    pub fn key(&self) -> FilterKey {
        match self {
            RoomFilter::Wheelchair => FilterKey::Wheelchair,
            RoomFilter::Pets => FilterKey::Pets,
            RoomFilter::Ac => FilterKey::Ac,
            RoomFilter::Single => FilterKey::Single,
            RoomFilter::MinOccupants(_) => FilterKey::MinOccupants,
            RoomFilter::MaxOccupants(_) => FilterKey::MaxOccupants,
            RoomFilter::Group => FilterKey::Group,
        }
    }

    pub fn accepts(&self, room: &Room) -> bool {
        match *self {
            RoomFilter::Wheelchair => room.wheelchair_accessible,
            RoomFilter::Pets => room.pets_permitted,
            RoomFilter::Ac => room.has_ac,
            RoomFilter::Single => room.is_single_shape(),
            RoomFilter::MinOccupants(n) => room.min_occupants >= n,
            RoomFilter::MaxOccupants(n) => room.max_occupants <= n,
            RoomFilter::Group => room.group_booking_permitted,
        }
    }
}

/// The caller's filter selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterSet {
    pub wheelchair: bool,
    pub pets: bool,
    pub ac: bool,
    pub single: bool,
    pub min_occupants: Option<u32>,
    pub max_occupants: Option<u32>,
    pub group: bool,
}

impl FilterSet {
    /// Active filters in fixed order.
    pub fn active(&self) -> Vec<RoomFilter> {
        let mut out = Vec::with_capacity(7);
        if self.wheelchair {
            out.push(RoomFilter::Wheelchair);
        }
        if self.pets {
            out.push(RoomFilter::Pets);
        }
        if self.ac {
            out.push(RoomFilter::Ac);
        }
        if self.single {
            out.push(RoomFilter::Single);
        }
        if let Some(n) = self.min_occupants {
            out.push(RoomFilter::MinOccupants(n));
        }
        if let Some(n) = self.max_occupants {
            out.push(RoomFilter::MaxOccupants(n));
        }
        if self.group {
            out.push(RoomFilter::Group);
        }
        out
    }

    pub fn without(&self, key: FilterKey) -> FilterSet {
        let mut f = *self;
        match key {
            FilterKey::Wheelchair => f.wheelchair = false,
            FilterKey::Pets => f.pets = false,
            FilterKey::Ac => f.ac = false,
            FilterKey::Single => f.single = false,
            FilterKey::MinOccupants => f.min_occupants = None,
            FilterKey::MaxOccupants => f.max_occupants = None,
            FilterKey::Group => f.group = false,
        }
        f
    }

    pub fn accepts(&self, room: &Room) -> bool {
        self.active().iter().all(|f| f.accepts(room))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Relaxation {
    pub filter: FilterKey,
    pub rooms: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AvailabilitySearch {
    pub exact: Vec<Room>,
    /// One entry per filter whose removal alone yields rooms, in filter order.
    pub relaxed: Vec<Relaxation>,
    /// Fewer rooms than requested adults. Advisory only.
    pub partial: bool,
}

/// Rooms passing `filters` and unclaimed for `range`, in inventory order.
pub fn free_rooms<'a>(
    inventory: &'a Inventory,
    ledger: &Ledger,
    range: &DateRange,
    filters: &FilterSet,
) -> Vec<&'a Room> {
    let active = filters.active();
    let occupied = ledger.occupied_rooms(range);
    inventory
        .all_rooms()
        .iter()
        .filter(|room| active.iter().all(|f| f.accepts(room)))
        .filter(|room| !occupied.contains(&room.room_ref()))
        .collect()
}

impl Engine {
    pub fn find_available(&self, range: DateRange, filters: &FilterSet) -> Result<Vec<Room>, EngineError> {
        let started = std::time::Instant::now();
        validate_range(&range, &self.calendar)?;
        let rooms: Vec<Room> = free_rooms(&self.inventory, &self.ledger, &range, filters)
            .into_iter()
            .cloned()
            .collect();
        metrics::histogram!(crate::observability::AVAILABILITY_QUERY_DURATION_SECONDS)
            .record(started.elapsed().as_secs_f64());
        Ok(rooms)
    }

    /// Exact search, then, if nothing matched, one relaxed search per active filter.
    pub fn find_available_with_fallback(
        &self,
        range: DateRange,
        filters: &FilterSet,
        requested_adults: u32,
    ) -> Result<AvailabilitySearch, EngineError> {
        let exact = self.find_available(range, filters)?;
        let mut relaxed = Vec::new();
        if exact.is_empty() {
            for filter in filters.active() {
                let key = filter.key();
                let count = free_rooms(&self.inventory, &self.ledger, &range, &filters.without(key)).len();
                if count > 0 {
                    relaxed.push(Relaxation { filter: key, rooms: count });
                }
            }
        }
        // One room-night per adult per night.
        let partial = (exact.len() as i64) < range.nights() * i64::from(requested_adults);
        Ok(AvailabilitySearch {
            exact,
            relaxed,
            partial,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn room(id: &str, min: u32, max: u32) -> Room {
        Room {
            block: "T".into(),
            id: id.into(),
            floor: "G".into(),
            min_occupants: min,
            max_occupants: max,
            has_ac: false,
            wheelchair_accessible: false,
            pets_permitted: false,
            group_booking_permitted: false,
        }
    }

    #[test]
    fn occupancy_filters_follow_bounds() {
        let small = room("S", 1, 2);
        let big = room("B", 2, 4);
        assert!(RoomFilter::Single.accepts(&small));
        assert!(!RoomFilter::Single.accepts(&big));
        assert!(RoomFilter::MinOccupants(2).accepts(&big));
        assert!(!RoomFilter::MinOccupants(2).accepts(&small));
        assert!(RoomFilter::MaxOccupants(2).accepts(&small));
        assert!(!RoomFilter::MaxOccupants(2).accepts(&big));
    }

    #[test]
    fn active_filters_in_fixed_order() {
        let filters = FilterSet {
            group: true,
            max_occupants: Some(3),
            pets: true,
            wheelchair: true,
            ..Default::default()
        };
        let keys: Vec<FilterKey> = filters.active().iter().map(RoomFilter::key).collect();
        assert_eq!(
            keys,
            vec![FilterKey::Wheelchair, FilterKey::Pets, FilterKey::MaxOccupants, FilterKey::Group]
        );
        let relaxed = filters.without(FilterKey::Pets);
        assert!(!relaxed.pets);
        assert!(relaxed.wheelchair);
        assert_eq!(relaxed.active().len(), 3);
    }

    #[test]
    fn empty_filter_set_accepts_everything() {
        assert!(FilterSet::default().accepts(&room("X", 1, 2)));
        assert!(FilterSet::default().active().is_empty());
    }
}
