use chrono::{Datelike, Duration, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::errors::GenerationError;

/// Inclusive calendar range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, GenerationError> {
        if end < start {
            return Err(GenerationError::configuration(
                "date_range",
                format!("end {} precedes start {}", end, start),
            ));
        }
        Ok(Self { start, end })
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }

    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }

    /// Monday to Friday days in the range.
    pub fn business_days(&self) -> i64 {
        self.start
            .iter_days()
            .take_while(|d| *d <= self.end)
            .filter(|d| !matches!(d.weekday(), Weekday::Sat | Weekday::Sun))
            .count() as i64
    }

    /// The range of equal length that ends the day before this one starts.
    pub fn previous(&self) -> Self {
        let end = self.start - Duration::days(1);
        Self {
            start: end - Duration::days(self.days() - 1),
            end,
        }
    }

    pub fn month_key(date: NaiveDate) -> String {
        format!("{:04}-{:02}", date.year(), date.month())
    }
}

/// Conjunctive row filter: date range AND brand AND seller.
///
/// Empty brand or seller sets do not restrict anything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KpiFilter {
    pub date_range: Option<DateRange>,
    pub brands: BTreeSet<String>,
    /// Seller names
    pub sellers: BTreeSet<String>,
}

impl KpiFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_range(mut self, range: DateRange) -> Self {
        self.date_range = Some(range);
        self
    }

    pub fn with_brand(mut self, brand: impl Into<String>) -> Self {
        self.brands.insert(brand.into());
        self
    }

    pub fn with_seller(mut self, seller: impl Into<String>) -> Self {
        self.sellers.insert(seller.into());
        self
    }

    pub fn matches_date(&self, date: NaiveDate) -> bool {
        self.date_range.map_or(true, |r| r.contains(date))
    }

    pub fn matches_brand(&self, brand: &str) -> bool {
        self.brands.is_empty() || self.brands.contains(brand)
    }

    pub fn matches_seller(&self, seller_name: &str) -> bool {
        self.sellers.is_empty() || self.sellers.contains(seller_name)
    }

    pub fn matches(&self, date: NaiveDate, brand: &str, seller_name: &str) -> bool {
        self.matches_date(date) && self.matches_brand(brand) && self.matches_seller(seller_name)
    }
}
