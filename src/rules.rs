use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::loader::DataLoadError;

/// Which cancellation table applies to a booking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleClass {
    Regular,
    Special,
    GroupComplete,
    GroupPartial,
}

impl fmt::Display for RuleClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RuleClass::Regular => "regular",
            RuleClass::Special => "special",
            RuleClass::GroupComplete => "group_complete",
            RuleClass::GroupPartial => "group_partial",
        })
    }
}

/// Days-before-check-in window of a cancellation rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DaysThreshold {
    /// `">N"`
    MoreThan(i64),
    /// `"A-B"`, both ends included.
    Between(i64, i64),
    /// `"<N"`
    LessThan(i64),
}

impl DaysThreshold {
    pub fn parse(text: &str) -> Result<Self, String> {
        let t = text.trim();
        let num = |s: &str| {
            s.trim()
                .parse::<i64>()
                .map_err(|_| format!("bad day count in threshold {text:?}"))
        };
        if let Some(rest) = t.strip_prefix('>') {
            return Ok(DaysThreshold::MoreThan(num(rest)?));
        }
        if let Some(rest) = t.strip_prefix('<') {
            return Ok(DaysThreshold::LessThan(num(rest)?));
        }
        match t.split_once('-') {
            Some((lo, hi)) => {
                let (lo, hi) = (num(lo)?, num(hi)?);
                if lo > hi {
                    return Err(format!("threshold {text:?} runs backwards"));
                }
                Ok(DaysThreshold::Between(lo, hi))
            }
            None => Err(format!("unrecognized threshold {text:?}")),
        }
    }

    pub fn matches(&self, days: i64) -> bool {
        match *self {
            DaysThreshold::MoreThan(n) => days > n,
            DaysThreshold::Between(lo, hi) => lo <= days && days <= hi,
            DaysThreshold::LessThan(n) => days < n,
        }
    }
}

impl fmt::Display for DaysThreshold {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DaysThreshold::MoreThan(n) => write!(f, ">{n}"),
            DaysThreshold::Between(lo, hi) => write!(f, "{lo}-{hi}"),
            DaysThreshold::LessThan(n) => write!(f, "<{n}"),
        }
    }
}

impl Serialize for DaysThreshold {
    fn serialize<S: serde::Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.collect_str(self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelCharge {
    /// Share of the stored total, `0..=1`.
    Fraction(Decimal),
    Fixed(Decimal),
    /// `"P% first N days"`: P percent of the first N nights' share of the total.
    FirstNights { percent: Decimal, nights: i64 },
}

impl CancelCharge {
    /// Charge against `total` for a stay of `stay_nights` nights.
    pub fn apply(&self, total: Decimal, stay_nights: i64) -> Decimal {
        match *self {
            CancelCharge::Fraction(f) => total * f,
            CancelCharge::Fixed(amount) => amount,
            CancelCharge::FirstNights { percent, nights } => {
                if stay_nights <= 0 {
                    return Decimal::ZERO;
                }
                let charged = nights.clamp(0, stay_nights);
                total * percent / Decimal::ONE_HUNDRED * Decimal::from(charged)
                    / Decimal::from(stay_nights)
            }
        }
    }

    fn parse_text(text: &str) -> Result<Self, String> {
        // "100% first 2 days"
        let t = text.trim().to_ascii_lowercase();
        let bad = || format!("unrecognized cancellation charge {text:?}");
        let (pct, rest) = t.split_once('%').ok_or_else(bad)?;
        let percent: Decimal = pct.trim().parse().map_err(|_| bad())?;
        let words: Vec<&str> = rest.split_whitespace().collect();
        match words.as_slice() {
            ["first", n, unit] if unit.starts_with("day") || unit.starts_with("night") => {
                let nights = n.parse().map_err(|_| bad())?;
                Ok(CancelCharge::FirstNights { percent, nights })
            }
            [] => Ok(CancelCharge::Fraction(percent / Decimal::ONE_HUNDRED)),
            _ => Err(bad()),
        }
    }
}

/// Modification fee, or `NotPermitted` for `"no"` / `"cancel"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ModificationFee {
    Fee(Decimal),
    NotPermitted,
}

impl ModificationFee {
    pub fn amount(&self) -> Option<Decimal> {
        match self {
            ModificationFee::Fee(d) => Some(*d),
            ModificationFee::NotPermitted => None,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawAmount {
    Number(Decimal),
    Text(String),
}

#[derive(Debug, Deserialize)]
struct RawCancellationRule {
    days: String,
    cancel: RawAmount,
    #[serde(default, rename = "mod", alias = "modification")]
    modification: Option<RawAmount>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "RawCancellationRule")]
pub struct CancellationRule {
    pub days: DaysThreshold,
    pub cancel: CancelCharge,
    pub modification: ModificationFee,
}

impl TryFrom<RawCancellationRule> for CancellationRule {
    type Error = String;

    fn try_from(raw: RawCancellationRule) -> Result<Self, Self::Error> {
        let days = DaysThreshold::parse(&raw.days)?;
        let cancel = match raw.cancel {
            RawAmount::Number(n) if n < Decimal::ZERO => {
                return Err(format!("negative cancellation charge {n}"));
            }
            RawAmount::Number(n) if n <= Decimal::ONE => CancelCharge::Fraction(n),
            RawAmount::Number(n) => CancelCharge::Fixed(n),
            RawAmount::Text(t) => CancelCharge::parse_text(&t)?,
        };
        let modification = match raw.modification {
            None => ModificationFee::Fee(Decimal::ZERO),
            Some(RawAmount::Number(n)) => ModificationFee::Fee(n),
            Some(RawAmount::Text(t)) => match t.trim().to_ascii_lowercase().as_str() {
                "no" | "cancel" | "none" => ModificationFee::NotPermitted,
                other => ModificationFee::Fee(
                    other
                        .parse()
                        .map_err(|_| format!("unrecognized modification fee {t:?}"))?,
                ),
            },
        };
        Ok(Self {
            days,
            cancel,
            modification,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CancellationTables {
    pub regular: Vec<CancellationRule>,
    pub special: Vec<CancellationRule>,
    pub group_complete: Vec<CancellationRule>,
    pub group_partial: Vec<CancellationRule>,
}

impl CancellationTables {
    pub fn for_class(&self, class: RuleClass) -> &[CancellationRule] {
        match class {
            RuleClass::Regular => &self.regular,
            RuleClass::Special => &self.special,
            RuleClass::GroupComplete => &self.group_complete,
            RuleClass::GroupPartial => &self.group_partial,
        }
    }

    /// First rule of `class` whose window contains `days`, in list order.
    pub fn lookup(&self, class: RuleClass, days: i64) -> Option<&CancellationRule> {
        self.for_class(class).iter().find(|r| r.days.matches(days))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GroupRules {
    pub min_rooms: usize,
    pub max_rooms: usize,
    pub min_nights: i64,
    pub max_nights: i64,
    #[serde(default)]
    pub deposit: Option<Decimal>,
}

/// Club policy. Unknown keys in the source are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Rules {
    pub max_live_bookings: usize,
    #[serde(default)]
    pub cancellation: CancellationTables,
    #[serde(default)]
    pub group: Option<GroupRules>,
}

impl Rules {
    pub fn from_json(text: &str) -> Result<Self, DataLoadError> {
        serde_json::from_str(text).map_err(|e| DataLoadError::Malformed(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn rule(json: &str) -> CancellationRule {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn threshold_forms() {
        assert_eq!(DaysThreshold::parse(">7").unwrap(), DaysThreshold::MoreThan(7));
        assert_eq!(DaysThreshold::parse(" 2-7 ").unwrap(), DaysThreshold::Between(2, 7));
        assert_eq!(DaysThreshold::parse("<2").unwrap(), DaysThreshold::LessThan(2));
        assert!(DaysThreshold::parse("7-2").is_err());
        assert!(DaysThreshold::parse("soon").is_err());
    }

    #[test]
    fn between_is_inclusive() {
        let t = DaysThreshold::Between(2, 7);
        assert!(t.matches(2));
        assert!(t.matches(7));
        assert!(!t.matches(8));
        assert!(!DaysThreshold::MoreThan(7).matches(7));
        assert!(DaysThreshold::LessThan(2).matches(-3));
    }

    #[test]
    fn numeric_charge_split_at_one() {
        assert_eq!(
            rule(r#"{"days": ">7", "cancel": 0.1, "mod": 0}"#).cancel,
            CancelCharge::Fraction(dec!(0.1))
        );
        assert_eq!(
            rule(r#"{"days": "<2", "cancel": 1, "mod": "no"}"#).cancel,
            CancelCharge::Fraction(dec!(1))
        );
        assert_eq!(
            rule(r#"{"days": ">7", "cancel": 20000, "mod": 0}"#).cancel,
            CancelCharge::Fixed(dec!(20000))
        );
    }

    #[test]
    fn text_charge_first_nights() {
        let r = rule(r#"{"days": "<2", "cancel": "100% first 2 days", "mod": "cancel"}"#);
        assert_eq!(
            r.cancel,
            CancelCharge::FirstNights {
                percent: dec!(100),
                nights: 2
            }
        );
        assert_eq!(r.modification, ModificationFee::NotPermitted);
        // 4-night stay: first two nights are half the total.
        assert_eq!(r.cancel.apply(dec!(20000), 4), dec!(10000));
        // Shorter stay than the window charges everything.
        assert_eq!(r.cancel.apply(dec!(5000), 1), dec!(5000));
    }

    #[test]
    fn modification_fee_forms() {
        assert_eq!(
            rule(r#"{"days": "2-7", "cancel": 0.2, "mod": 1000}"#).modification,
            ModificationFee::Fee(dec!(1000))
        );
        assert_eq!(
            rule(r#"{"days": "2-7", "cancel": 0.2}"#).modification,
            ModificationFee::Fee(Decimal::ZERO)
        );
        assert_eq!(
            rule(r#"{"days": "<2", "cancel": 0.5, "mod": "no"}"#).modification.amount(),
            None
        );
    }

    #[test]
    fn bad_rule_rejected() {
        assert!(serde_json::from_str::<CancellationRule>(r#"{"days": "x", "cancel": 0.1}"#).is_err());
        assert!(
            serde_json::from_str::<CancellationRule>(r#"{"days": ">7", "cancel": "half"}"#).is_err()
        );
    }

    #[test]
    fn rules_lookup_first_match_in_order() {
        let rules = Rules::from_json(
            r#"{
              "max_live_bookings": 2,
              "cancellation": {
                "regular": [
                  {"days": ">7", "cancel": 0.1, "mod": 0},
                  {"days": "2-7", "cancel": 0.2, "mod": 1000},
                  {"days": "<2", "cancel": "100% first 2 days", "mod": "cancel"}
                ]
              },
              "group": {"min_rooms": 10, "max_rooms": 19, "min_nights": 2, "max_nights": 5,
                        "deposit": 20000, "guest_list_days": 15},
              "unknown_key": true
            }"#,
        )
        .unwrap();
        assert_eq!(rules.max_live_bookings, 2);
        let r = rules.cancellation.lookup(RuleClass::Regular, 10).unwrap();
        assert_eq!(r.days, DaysThreshold::MoreThan(7));
        let r = rules.cancellation.lookup(RuleClass::Regular, 7).unwrap();
        assert_eq!(r.days, DaysThreshold::Between(2, 7));
        assert!(rules.cancellation.lookup(RuleClass::Special, 10).is_none());
        assert_eq!(rules.group.unwrap().deposit, Some(dec!(20000)));
    }
}
