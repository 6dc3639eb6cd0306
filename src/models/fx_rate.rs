use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One row of the FX calendar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FxRate {
    pub date: NaiveDate,
    /// MXN per USD
    pub usd_mxn: Decimal,
}

/// Date-indexed FX calendar, ordered by date.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FxTable {
    rates: BTreeMap<NaiveDate, Decimal>,
}

impl FxTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a rate, returning the previous one for that date if any.
    pub fn insert(&mut self, date: NaiveDate, usd_mxn: Decimal) -> Option<Decimal> {
        self.rates.insert(date, usd_mxn)
    }

    /// Exact-date lookup; no interpolation.
    pub fn rate_on(&self, date: NaiveDate) -> Option<Decimal> {
        self.rates.get(&date).copied()
    }

    pub fn len(&self) -> usize {
        self.rates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rates.is_empty()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.rates.keys().next().copied()
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.rates.keys().next_back().copied()
    }

    /// True when every calendar day between the first and last date has a row.
    pub fn is_contiguous(&self) -> bool {
        match (self.first_date(), self.last_date()) {
            (Some(first), Some(last)) => (last - first).num_days() + 1 == self.len() as i64,
            _ => true,
        }
    }

    /// Calendar days in `[start, end]` that have no row.
    pub fn missing_dates(&self, start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
        start
            .iter_days()
            .take_while(|d| *d <= end)
            .filter(|d| !self.rates.contains_key(d))
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = FxRate> + '_ {
        self.rates
            .iter()
            .map(|(date, usd_mxn)| FxRate { date: *date, usd_mxn: *usd_mxn })
    }
}

impl FromIterator<FxRate> for FxTable {
    fn from_iter<I: IntoIterator<Item = FxRate>>(iter: I) -> Self {
        Self {
            rates: iter.into_iter().map(|r| (r.date, r.usd_mxn)).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    #[test]
    fn detects_gaps() {
        let mut table = FxTable::new();
        table.insert(day(1), dec!(17.1));
        table.insert(day(2), dec!(17.2));
        assert!(table.is_contiguous());

        table.insert(day(4), dec!(17.4));
        assert!(!table.is_contiguous());
        assert_eq!(table.missing_dates(day(1), day(4)), vec![day(3)]);
    }

    #[test]
    fn iterates_in_date_order() {
        let table: FxTable = vec![
            FxRate { date: day(3), usd_mxn: dec!(18) },
            FxRate { date: day(1), usd_mxn: dec!(17) },
        ]
        .into_iter()
        .collect();
        let dates: Vec<_> = table.iter().map(|r| r.date).collect();
        assert_eq!(dates, vec![day(1), day(3)]);
        assert_eq!(table.first_date(), Some(day(1)));
        assert_eq!(table.last_date(), Some(day(3)));
        assert_eq!(table.rate_on(day(2)), None);
    }
}
