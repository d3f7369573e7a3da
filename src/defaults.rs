//! Built-in data set, used whenever a configured source cannot be loaded.

use crate::inventory::Inventory;
use crate::model::RestrictedPeriod;
use crate::rules::Rules;
use crate::tariff::TariffTable;

const ROOMS: &str = include_str!("../data/rooms.json");
const TARIFF: &str = include_str!("../data/tariff.json");
const RULES: &str = include_str!("../data/rules.json");
const RESTRICTED_PERIODS: &str = include_str!("../data/restricted_periods.json");

pub fn inventory() -> Inventory {
    Inventory::from_json(ROOMS).expect("built-in rooms.json is valid")
}

pub fn tariff() -> TariffTable {
    TariffTable::from_json(TARIFF).expect("built-in tariff.json is valid")
}

pub fn rules() -> Rules {
    Rules::from_json(RULES).expect("built-in rules.json is valid")
}

pub fn restricted_periods() -> Vec<RestrictedPeriod> {
    serde_json::from_str(RESTRICTED_PERIODS).expect("built-in restricted_periods.json is valid")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{PeriodKind, RoomRef};
    use crate::rules::RuleClass;

    #[test]
    fn built_in_data_parses() {
        let inv = inventory();
        assert_eq!(inv.len(), 39);
        assert_eq!(inv.blocks(), vec!["A", "B", "Old C", "New C", "D", "Old E", "New E"]);
        assert!(inv.get(&RoomRef::new("New C", "C-10")).is_some());

        let rules = rules();
        assert_eq!(rules.max_live_bookings, 2);
        for class in [
            RuleClass::Regular,
            RuleClass::Special,
            RuleClass::GroupComplete,
            RuleClass::GroupPartial,
        ] {
            assert!(!rules.cancellation.for_class(class).is_empty(), "{class}");
        }
        assert_eq!(rules.group.as_ref().map(|g| g.min_rooms), Some(10));

        let periods = restricted_periods();
        assert_eq!(periods.len(), 25);
        assert!(periods.iter().any(|p| p.kind == PeriodKind::Closed && p.name == "Monsoons"));

        assert!(tariff().special.temp.extra_child.is_some());
    }
}
