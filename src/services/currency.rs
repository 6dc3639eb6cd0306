//! Date-indexed MXN/USD conversion and the money rounding rules shared by the pipeline.

use chrono::NaiveDate;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

use crate::errors::ConversionError;
use crate::models::{Currency, FxTable};

pub const MONEY_DP: u32 = 2;
pub const RATE_DP: u32 = 4;

/// Rounds to cents, half away from zero.
pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(MONEY_DP, RoundingStrategy::MidpointAwayFromZero)
}

/// Truncates to cents.
pub fn round_money_down(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(MONEY_DP, RoundingStrategy::ToZero)
}

pub fn round_rate(rate: Decimal) -> Decimal {
    rate.round_dp_with_strategy(RATE_DP, RoundingStrategy::MidpointAwayFromZero)
}

/// Converts a generated float into a decimal with `dp` places. NaN and infinities yield `None`.
pub fn decimal_from_f64(value: f64, dp: u32) -> Option<Decimal> {
    Decimal::from_f64(value)
        .map(|d| d.round_dp_with_strategy(dp, RoundingStrategy::MidpointAwayFromZero))
}

/// Converts amounts between MXN and USD with the rate of an exact date.
///
/// Rates are MXN per USD: MXN→USD divides, USD→MXN multiplies. Results are not rounded;
/// callers round each row with [`round_money`] before summing.
#[derive(Debug, Clone, Copy)]
pub struct CurrencyConverter<'a> {
    rates: &'a FxTable,
}

impl<'a> CurrencyConverter<'a> {
    pub fn new(rates: &'a FxTable) -> Self {
        Self { rates }
    }

    /// Rate for `date`, no interpolation.
    pub fn rate_for(&self, date: NaiveDate) -> Result<Decimal, ConversionError> {
        let rate = self
            .rates
            .rate_on(date)
            .ok_or(ConversionError::UnknownDate { date })?;
        if rate <= Decimal::ZERO {
            return Err(ConversionError::InvalidRate { date, rate });
        }
        Ok(rate)
    }

    pub fn convert(
        &self,
        amount: Decimal,
        source: Currency,
        target: Currency,
        as_of: NaiveDate,
    ) -> Result<Decimal, ConversionError> {
        if source == target {
            return Ok(amount);
        }
        let rate = self.rate_for(as_of)?;
        let converted = match (source, target) {
            (Currency::MXN, Currency::USD) => amount.checked_div(rate),
            (Currency::USD, Currency::MXN) => amount.checked_mul(rate),
            _ => Some(amount),
        };
        converted.ok_or(ConversionError::InvalidRate { date: as_of, rate })
    }

    /// Converts an MXN amount into `target` and rounds it to cents.
    pub fn from_mxn(
        &self,
        amount_mxn: Decimal,
        target: Currency,
        as_of: NaiveDate,
    ) -> Result<Decimal, ConversionError> {
        self.convert(amount_mxn, Currency::MXN, target, as_of)
            .map(round_money)
    }
}
