use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::de::{self, Deserializer, MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

/// All monetary values. Wraps Decimal to prevent accidental f64 usage.
pub type Money = Decimal;

/// Rates expressed as decimals (0.05 = 5%) unless a field says otherwise.
pub type Rate = Decimal;

/// Round to whole cents, half away from zero.
///
/// Applied after every intermediate arithmetic step in the engines, not
/// just at output, so long schedules accumulate cent-exact balances.
pub fn round_cents(value: Decimal) -> Money {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

// ---------------------------------------------------------------------------
// Calendar months
// ---------------------------------------------------------------------------

/// A calendar month, serialized as `YYYY-MM`. The accrual key (`month_due`)
/// and cash key (`month_paid`) of every transaction use this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Month {
    year: i32,
    month: u32,
}

impl Month {
    /// `month` is 1-based; values outside 1..=12 are normalized by
    /// carrying into the year.
    pub fn new(year: i32, month: u32) -> Self {
        Month { year, month: 1 }.plus_months(month as i64 - 1)
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    /// The month containing `date`.
    pub fn from_date(date: NaiveDate) -> Self {
        Month {
            year: date.year(),
            month: date.month(),
        }
    }

    /// First day of this month.
    pub fn first_day(&self) -> NaiveDate {
        // year/month are kept in range by construction
        NaiveDate::from_ymd_opt(self.year, self.month, 1)
            .unwrap_or(NaiveDate::MIN)
    }

    pub fn plus_months(&self, months: i64) -> Self {
        let zero_based = self.year as i64 * 12 + (self.month as i64 - 1) + months;
        Month {
            year: zero_based.div_euclid(12) as i32,
            month: (zero_based.rem_euclid(12) + 1) as u32,
        }
    }

    pub fn next(&self) -> Self {
        self.plus_months(1)
    }

    /// Signed number of months from `self` to `other`.
    pub fn months_until(&self, other: &Month) -> i64 {
        (other.year as i64 * 12 + other.month as i64)
            - (self.year as i64 * 12 + self.month as i64)
    }
}

impl fmt::Display for Month {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for Month {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (y, m) = s
            .split_once('-')
            .ok_or_else(|| format!("Invalid month '{s}', expected YYYY-MM"))?;
        let year: i32 = y
            .parse()
            .map_err(|_| format!("Invalid year in month '{s}'"))?;
        let month: u32 = m
            .parse()
            .map_err(|_| format!("Invalid month number in '{s}'"))?;
        if !(1..=12).contains(&month) {
            return Err(format!("Month number out of range in '{s}'"));
        }
        Ok(Month { year, month })
    }
}

impl Serialize for Month {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Month {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}

/// Inclusive month range used for projection timelines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthRange {
    pub start: Month,
    pub end: Month,
}

impl MonthRange {
    /// Number of months in the range (zero when end precedes start).
    pub fn len(&self) -> i64 {
        (self.start.months_until(&self.end) + 1).max(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Ascending iterator over the months in the range.
    pub fn iter(&self) -> impl Iterator<Item = Month> + '_ {
        let start = self.start;
        (0..self.len()).map(move |i| start.plus_months(i))
    }
}

// ---------------------------------------------------------------------------
// Overrides
// ---------------------------------------------------------------------------

/// Result of an override lookup. `Cleared` and `NotSet` both fall back to
/// the computed value, but a stored zero is a real override, never "unset".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Override {
    NotSet,
    Cleared,
    Value(Money),
}

impl Override {
    /// The override amount if one is in force, else `computed`.
    pub fn or_computed(self, computed: Money) -> Money {
        match self {
            Override::Value(v) => v,
            Override::NotSet | Override::Cleared => computed,
        }
    }

    pub fn is_set(self) -> bool {
        matches!(self, Override::Value(_))
    }
}

/// Sparse per-category-per-month override table. The storage layer hands
/// this over as a `"categoryId-month" -> amount|null` map; a null entry is
/// an explicit clear, an absent entry means "use the computed value".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OverrideTable {
    entries: BTreeMap<(i64, Month), Option<Money>>,
}

impl OverrideTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, category_id: i64, month: Month, amount: Money) {
        self.entries.insert((category_id, month), Some(amount));
    }

    pub fn clear(&mut self, category_id: i64, month: Month) {
        self.entries.insert((category_id, month), None);
    }

    pub fn remove(&mut self, category_id: i64, month: Month) {
        self.entries.remove(&(category_id, month));
    }

    pub fn get(&self, category_id: i64, month: Month) -> Override {
        match self.entries.get(&(category_id, month)) {
            None => Override::NotSet,
            Some(None) => Override::Cleared,
            Some(Some(v)) => Override::Value(*v),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Months that carry a live override value (clears excluded).
    pub fn active_months(&self) -> impl Iterator<Item = Month> + '_ {
        self.entries
            .iter()
            .filter(|(_, v)| v.is_some())
            .map(|((_, month), _)| *month)
    }
}

impl Serialize for OverrideTable {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for ((category_id, month), amount) in &self.entries {
            map.serialize_entry(&format!("{category_id}-{month}"), amount)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for OverrideTable {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct TableVisitor;

        impl<'de> Visitor<'de> for TableVisitor {
            type Value = OverrideTable;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of \"categoryId-YYYY-MM\" keys to amounts or nulls")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut entries = BTreeMap::new();
                while let Some((key, amount)) = access.next_entry::<String, Option<Money>>()? {
                    let (category_id, month) = parse_override_key(&key).map_err(de::Error::custom)?;
                    entries.insert((category_id, month), amount);
                }
                Ok(OverrideTable { entries })
            }
        }

        deserializer.deserialize_map(TableVisitor)
    }
}

/// Split `"categoryId-YYYY-MM"`. The month suffix is fixed-width, which
/// keeps negative category ids (the reserved tax row) unambiguous.
fn parse_override_key(key: &str) -> Result<(i64, Month), String> {
    if key.len() < 9 {
        return Err(format!("Invalid override key '{key}'"));
    }
    let (head, month_str) = key.split_at(key.len() - 7);
    let category_str = head
        .strip_suffix('-')
        .ok_or_else(|| format!("Invalid override key '{key}'"))?;
    let category_id: i64 = category_str
        .parse()
        .map_err(|_| format!("Invalid category id in override key '{key}'"))?;
    let month: Month = month_str.parse()?;
    Ok((category_id, month))
}

// ---------------------------------------------------------------------------
// Computation envelope
// ---------------------------------------------------------------------------

/// Standard computation output envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationOutput<T: Serialize> {
    pub result: T,
    pub methodology: String,
    pub assumptions: serde_json::Value,
    pub warnings: Vec<String>,
    pub metadata: ComputationMetadata,
}

/// Metadata for every computation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationMetadata {
    pub version: String,
    pub computation_time_us: u64,
    pub precision: String,
}

/// Helper to wrap computation results with metadata.
pub fn with_metadata<T: Serialize>(
    methodology: &str,
    assumptions: &impl Serialize,
    warnings: Vec<String>,
    elapsed_us: u64,
    result: T,
) -> ComputationOutput<T> {
    ComputationOutput {
        result,
        methodology: methodology.to_string(),
        assumptions: serde_json::to_value(assumptions).unwrap_or_default(),
        warnings,
        metadata: ComputationMetadata {
            version: env!("CARGO_PKG_VERSION").to_string(),
            computation_time_us: elapsed_us,
            precision: "rust_decimal_128bit".to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    #[test]
    fn test_round_cents_half_away_from_zero() {
        assert_eq!(round_cents(dec!(1.005)), dec!(1.01));
        assert_eq!(round_cents(dec!(-1.005)), dec!(-1.01));
        assert_eq!(round_cents(dec!(2.344)), dec!(2.34));
        assert_eq!(round_cents(dec!(2.345)), dec!(2.35));
    }

    #[test]
    fn test_month_roundtrip() {
        let m: Month = "2024-03".parse().unwrap();
        assert_eq!(m.year(), 2024);
        assert_eq!(m.month(), 3);
        assert_eq!(m.to_string(), "2024-03");
    }

    #[test]
    fn test_month_arithmetic_carries_years() {
        let m = Month::new(2024, 11);
        assert_eq!(m.plus_months(3), Month::new(2025, 2));
        assert_eq!(m.plus_months(-11), Month::new(2023, 12));
        assert_eq!(Month::new(2024, 1).months_until(&Month::new(2025, 1)), 12);
    }

    #[test]
    fn test_month_rejects_bad_strings() {
        assert!("2024-13".parse::<Month>().is_err());
        assert!("2024".parse::<Month>().is_err());
        assert!("march".parse::<Month>().is_err());
    }

    #[test]
    fn test_month_range_iteration() {
        let range = MonthRange {
            start: Month::new(2024, 11),
            end: Month::new(2025, 2),
        };
        assert_eq!(range.len(), 4);
        let months: Vec<String> = range.iter().map(|m| m.to_string()).collect();
        assert_eq!(months, vec!["2024-11", "2024-12", "2025-01", "2025-02"]);
    }

    #[test]
    fn test_override_three_states() {
        let mut table = OverrideTable::new();
        let month = Month::new(2024, 6);

        assert_eq!(table.get(5, month), Override::NotSet);

        table.set(5, month, dec!(0));
        assert_eq!(table.get(5, month), Override::Value(dec!(0)));
        assert_eq!(table.get(5, month).or_computed(dec!(99)), dec!(0));

        table.clear(5, month);
        assert_eq!(table.get(5, month), Override::Cleared);
        assert_eq!(table.get(5, month).or_computed(dec!(99)), dec!(99));
    }

    #[test]
    fn test_override_table_serde_shape() {
        let mut table = OverrideTable::new();
        table.set(-1, Month::new(2024, 6), dec!(150));
        table.clear(7, Month::new(2024, 7));

        let json = serde_json::to_value(&table).unwrap();
        assert_eq!(json["-1-2024-06"], serde_json::json!("150"));
        assert!(json["7-2024-07"].is_null());

        let back: OverrideTable = serde_json::from_value(json).unwrap();
        assert_eq!(back, table);
    }
}
