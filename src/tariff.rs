use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::model::{OccupantBreakdown, SeasonTier};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GuestCategory {
    Member,
    Senior,
    Temp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RateKind {
    Double,
    SingleDouble,
    SingleSingle,
    ExtraAdult,
    ExtraChild,
}

/// Per room-night prices for one guest category. Missing kinds are simply not offered.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateCard {
    pub double: Option<Decimal>,
    pub single_double: Option<Decimal>,
    pub single_single: Option<Decimal>,
    pub extra_adult: Option<Decimal>,
    pub extra_child: Option<Decimal>,
}

impl RateCard {
    pub fn get(&self, kind: RateKind) -> Option<Decimal> {
        match kind {
            RateKind::Double => self.double,
            RateKind::SingleDouble => self.single_double,
            RateKind::SingleSingle => self.single_single,
            RateKind::ExtraAdult => self.extra_adult,
            RateKind::ExtraChild => self.extra_child,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeasonRates {
    pub member: RateCard,
    pub senior: RateCard,
    pub temp: RateCard,
}

impl SeasonRates {
    pub fn card(&self, category: GuestCategory) -> &RateCard {
        match category {
            GuestCategory::Member => &self.member,
            GuestCategory::Senior => &self.senior,
            GuestCategory::Temp => &self.temp,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddOns {
    pub ac_per_night: Decimal,
    /// GST on the AC surcharge as a fraction, e.g. `0.18`.
    pub gst_on_ac: Decimal,
    #[serde(default)]
    pub bbq_per_person: Option<Decimal>,
}

/// Occupant classes billed on top of the base room rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExtraClass {
    #[serde(rename = "seniors")]
    Seniors,
    #[serde(rename = "temp_adults")]
    TempAdults,
    #[serde(rename = "children_10_to_21")]
    Children10To21,
    #[serde(rename = "children_under_10")]
    ChildrenUnder10,
    #[serde(rename = "group_guests")]
    GroupGuests,
}

impl ExtraClass {
    pub const ALL: [ExtraClass; 5] = [
        ExtraClass::Seniors,
        ExtraClass::TempAdults,
        ExtraClass::Children10To21,
        ExtraClass::ChildrenUnder10,
        ExtraClass::GroupGuests,
    ];

    pub fn count(self, occupants: &OccupantBreakdown) -> u32 {
        match self {
            ExtraClass::Seniors => occupants.seniors,
            ExtraClass::TempAdults => occupants.temp_adults,
            ExtraClass::Children10To21 => occupants.children_10_to_21,
            ExtraClass::ChildrenUnder10 => occupants.children_under_10,
            ExtraClass::GroupGuests => occupants.group_guests,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateRef {
    pub category: GuestCategory,
    pub kind: RateKind,
}

impl RateRef {
    pub const fn new(category: GuestCategory, kind: RateKind) -> Self {
        Self { category, kind }
    }
}

/// Which rate funds each extra occupant class. Club policy; override in the tariff file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtraChargePolicy {
    pub seniors: RateRef,
    pub temp_adults: RateRef,
    pub children_10_to_21: RateRef,
    pub children_under_10: RateRef,
    pub group_guests: RateRef,
}

impl Default for ExtraChargePolicy {
    fn default() -> Self {
        use GuestCategory::*;
        use RateKind::*;
        Self {
            seniors: RateRef::new(Senior, ExtraAdult),
            temp_adults: RateRef::new(Temp, ExtraAdult),
            children_10_to_21: RateRef::new(Member, ExtraAdult),
            children_under_10: RateRef::new(Temp, ExtraChild),
            group_guests: RateRef::new(Temp, ExtraChild),
        }
    }
}

impl ExtraChargePolicy {
    pub fn rate_for(&self, class: ExtraClass) -> RateRef {
        match class {
            ExtraClass::Seniors => self.seniors,
            ExtraClass::TempAdults => self.temp_adults,
            ExtraClass::Children10To21 => self.children_10_to_21,
            ExtraClass::ChildrenUnder10 => self.children_under_10,
            ExtraClass::GroupGuests => self.group_guests,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TariffTable {
    pub regular: SeasonRates,
    pub special: SeasonRates,
    pub add_ons: AddOns,
    #[serde(default)]
    pub extra_charges: ExtraChargePolicy,
}

impl TariffTable {
    pub fn from_json(text: &str) -> Result<Self, crate::loader::DataLoadError> {
        serde_json::from_str(text).map_err(|e| crate::loader::DataLoadError::Malformed(e.to_string()))
    }

    pub fn season(&self, tier: SeasonTier) -> &SeasonRates {
        match tier {
            SeasonTier::Regular => &self.regular,
            SeasonTier::Special => &self.special,
        }
    }

    pub fn rate(&self, tier: SeasonTier, rate: RateRef) -> Option<Decimal> {
        self.season(tier).card(rate.category).get(rate.kind)
    }
}
