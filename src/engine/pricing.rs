use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::model::*;
use crate::tariff::{ExtraClass, GuestCategory, RateKind, RateRef, TariffTable};

use super::conflict::validate_nights;
use super::{Engine, EngineError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PriceOptions {
    pub ac: bool,
    /// Member rate charged per room-night.
    pub base_rate: RateKind,
}

impl Default for PriceOptions {
    fn default() -> Self {
        Self {
            ac: false,
            base_rate: RateKind::Double,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtraLine {
    pub class: ExtraClass,
    pub count: u32,
    pub rate: Decimal,
    pub amount: Decimal,
}

/// Itemized quote. Amounts are exact; round only for display.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceBreakdown {
    pub tier: SeasonTier,
    pub nights: i64,
    pub rooms: usize,
    pub room_nights: i64,
    pub base_rate: Decimal,
    pub base: Decimal,
    pub extras: Vec<ExtraLine>,
    pub ac: Decimal,
    pub total: Decimal,
}

impl PriceBreakdown {
    /// Total rounded to exactly two places.
    pub fn display_total(&self) -> Decimal {
        let mut total = self.total.round_dp(2);
        total.rescale(2);
        total
    }
}

fn rate(tariff: &TariffTable, tier: SeasonTier, r: RateRef) -> Result<Decimal, EngineError> {
    tariff.rate(tier, r).ok_or(EngineError::MissingRate {
        tier,
        category: r.category,
        kind: r.kind,
    })
}

/// Price a stay of `nights` nights in `rooms` rooms.
pub fn compute_price(
    tariff: &TariffTable,
    tier: SeasonTier,
    nights: i64,
    rooms: usize,
    occupants: &OccupantBreakdown,
    options: &PriceOptions,
) -> Result<PriceBreakdown, EngineError> {
    let n = Decimal::from(nights);
    let room_count = Decimal::from(rooms as u64);

    let base_rate = rate(tariff, tier, RateRef::new(GuestCategory::Member, options.base_rate))?;
    let base = room_count * base_rate * n;

    let mut extras = Vec::new();
    for class in ExtraClass::ALL {
        let count = class.count(occupants);
        if count == 0 {
            continue;
        }
        let r = rate(tariff, tier, tariff.extra_charges.rate_for(class))?;
        extras.push(ExtraLine {
            class,
            count,
            rate: r,
            amount: Decimal::from(count) * r * n,
        });
    }

    let ac = if options.ac {
        let add_ons = &tariff.add_ons;
        room_count * add_ons.ac_per_night * (Decimal::ONE + add_ons.gst_on_ac) * n
    } else {
        Decimal::ZERO
    };

    let total = base + extras.iter().map(|e| e.amount).sum::<Decimal>() + ac;
    Ok(PriceBreakdown {
        tier,
        nights,
        rooms,
        room_nights: nights * rooms as i64,
        base_rate,
        base,
        extras,
        ac,
        total,
    })
}

impl Engine {
    pub fn price(
        &self,
        range: DateRange,
        rooms: &[RoomRef],
        occupants: &OccupantBreakdown,
        options: &PriceOptions,
    ) -> Result<PriceBreakdown, EngineError> {
        validate_nights(&range)?;
        if rooms.is_empty() {
            return Err(EngineError::NoRoomsSelected);
        }
        for room in rooms {
            if self.inventory.get(room).is_none() {
                return Err(EngineError::UnknownRoom(room.clone()));
            }
        }
        let tier = self.calendar.season_tier(&range);
        compute_price(&self.tariff, tier, range.nights(), rooms.len(), occupants, options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::defaults;
    use rust_decimal_macros::dec;

    #[test]
    fn plain_regular_stay() {
        let p = compute_price(
            &defaults::tariff(),
            SeasonTier::Regular,
            2,
            1,
            &OccupantBreakdown::default(),
            &PriceOptions::default(),
        )
        .unwrap();
        assert_eq!(p.total, dec!(10920));
        assert_eq!(p.room_nights, 2);
        assert!(p.extras.is_empty());
    }

    #[test]
    fn ac_adds_gst() {
        let p = compute_price(
            &defaults::tariff(),
            SeasonTier::Regular,
            2,
            1,
            &OccupantBreakdown::default(),
            &PriceOptions {
                ac: true,
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(p.ac, dec!(2360));
        assert_eq!(p.total, dec!(13280));
    }

    #[test]
    fn extras_use_allocation_table() {
        let occupants = OccupantBreakdown {
            member_adults: 2,
            seniors: 1,
            children_10_to_21: 1,
            children_under_10: 1,
            ..Default::default()
        };
        let p = compute_price(
            &defaults::tariff(),
            SeasonTier::Regular,
            1,
            1,
            &occupants,
            &PriceOptions::default(),
        )
        .unwrap();
        let lines: Vec<(ExtraClass, Decimal)> = p.extras.iter().map(|e| (e.class, e.amount)).collect();
        assert_eq!(
            lines,
            vec![
                (ExtraClass::Seniors, dec!(1953)),
                (ExtraClass::Children10To21, dec!(2170)),
                (ExtraClass::ChildrenUnder10, dec!(1863.5)),
            ]
        );
        assert_eq!(p.total, dec!(5460) + dec!(1953) + dec!(2170) + dec!(1863.5));
    }

    #[test]
    fn special_tier_and_single_rate() {
        let p = compute_price(
            &defaults::tariff(),
            SeasonTier::Special,
            3,
            2,
            &OccupantBreakdown::default(),
            &PriceOptions {
                ac: false,
                base_rate: RateKind::SingleDouble,
            },
        )
        .unwrap();
        assert_eq!(p.base_rate, dec!(5292));
        assert_eq!(p.total, dec!(5292) * dec!(6));
    }

    #[test]
    fn missing_rate_only_fails_when_used() {
        let mut tariff = defaults::tariff();
        tariff.regular.temp.extra_child = None;
        let none_needed = compute_price(
            &tariff,
            SeasonTier::Regular,
            1,
            1,
            &OccupantBreakdown::default(),
            &PriceOptions::default(),
        );
        assert!(none_needed.is_ok());

        let kid = OccupantBreakdown {
            children_under_10: 1,
            ..Default::default()
        };
        let err = compute_price(&tariff, SeasonTier::Regular, 1, 1, &kid, &PriceOptions::default()).unwrap_err();
        assert!(matches!(
            err,
            EngineError::MissingRate {
                category: GuestCategory::Temp,
                kind: RateKind::ExtraChild,
                ..
            }
        ));
    }

    #[test]
    fn display_total_rounds_to_cents() {
        let occupants = OccupantBreakdown {
            seniors: 1,
            ..Default::default()
        };
        let p = compute_price(
            &defaults::tariff(),
            SeasonTier::Special,
            1,
            1,
            &occupants,
            &PriceOptions {
                ac: true,
                ..Default::default()
            },
        )
        .unwrap();
        // 6552 + 2343.6 + 1180
        assert_eq!(p.total, dec!(10075.6));
        assert_eq!(p.display_total().to_string(), "10075.60");
    }
}
