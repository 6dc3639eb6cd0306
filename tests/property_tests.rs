//! Property-based tests for the conversion engine, the table codec and the generators.
//!
//! These tests use proptest to verify invariants across a wide range of inputs,
//! helping to catch edge cases that unit tests might miss.

use chrono::{Duration, NaiveDate};
use proptest::prelude::*;
use rand_distr::Normal;
use rust_decimal::Decimal;
use sai_alpha::{
    models::{Currency, FxTable},
    services::{
        currency::round_money,
        transactions::{daily_invoice_count, seasonality_factor},
    },
    tables::{decode_table, encode_table, FieldSpec, TableSchema, Value},
    CurrencyConverter, DateRange, GenerationContext, GeneratorConfig,
};

const PROBE_FIELDS: &[FieldSpec] = &[
    FieldSpec::character("LABEL", 20),
    FieldSpec::numeric("AMOUNT", 12, 2),
    FieldSpec::date("FECHA"),
    FieldSpec::logical("FLAG"),
];

const PROBE: TableSchema = TableSchema { name: "probe", fields: PROBE_FIELDS };

fn day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, 15).unwrap()
}

// Strategies for generating test data
fn rate_strategy() -> impl Strategy<Value = Decimal> {
    (100_000i64..=250_000).prop_map(|r| Decimal::new(r, 4))
}

fn amount_strategy() -> impl Strategy<Value = Decimal> {
    (0i64..100_000_000_000).prop_map(|cents| Decimal::new(cents, 2))
}

fn date_strategy() -> impl Strategy<Value = NaiveDate> {
    (0i64..3650).prop_map(|offset| NaiveDate::from_ymd_opt(2020, 1, 1).unwrap() + Duration::days(offset))
}

fn single_rate_table(rate: Decimal) -> FxTable {
    let mut table = FxTable::new();
    table.insert(day(), rate);
    table
}

// Property: MXN -> USD -> MXN returns the original amount
proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    #[test]
    fn unrounded_round_trip_is_lossless(amount in amount_strategy(), rate in rate_strategy()) {
        let table = single_rate_table(rate);
        let converter = CurrencyConverter::new(&table);
        let usd = converter.convert(amount, Currency::MXN, Currency::USD, day()).unwrap();
        let back = converter.convert(usd, Currency::USD, Currency::MXN, day()).unwrap();
        prop_assert!((back - amount).abs() <= Decimal::new(1, 6), "{} -> {} -> {}", amount, usd, back);
    }

    #[test]
    fn rounded_round_trip_stays_within_half_a_cent_per_step(
        amount in amount_strategy(),
        rate in rate_strategy(),
    ) {
        let table = single_rate_table(rate);
        let converter = CurrencyConverter::new(&table);
        let usd = converter.from_mxn(amount, Currency::USD, day()).unwrap();
        let back = round_money(converter.convert(usd, Currency::USD, Currency::MXN, day()).unwrap());
        let half_cent = Decimal::new(5, 3);
        prop_assert!((back - amount).abs() <= rate * half_cent + half_cent);
    }

    #[test]
    fn identity_conversion_needs_no_rate(amount in amount_strategy(), date in date_strategy()) {
        let table = FxTable::new();
        let converter = CurrencyConverter::new(&table);
        prop_assert_eq!(converter.from_mxn(amount, Currency::MXN, date).unwrap(), amount);
        prop_assert!(converter.from_mxn(amount, Currency::USD, date).is_err());
    }
}

// Property: cells read back as written
proptest! {
    #![proptest_config(ProptestConfig::with_cases(300))]

    #[test]
    fn encoded_cells_decode_to_the_same_values(
        label in "[A-Za-z0-9]{1,20}",
        cents in -9_999_999_999i64..=99_999_999_999,
        date in date_strategy(),
        flag in any::<bool>(),
    ) {
        let row = vec![
            Value::Text(label),
            Value::Number(Decimal::new(cents, 2)),
            Value::Date(date),
            Value::Bool(flag),
        ];
        let bytes = encode_table(&PROBE, &[row.clone()], day()).unwrap();
        prop_assert_eq!(bytes.len(), 32 + 32 * PROBE_FIELDS.len() + 1 + PROBE.record_length() + 1);
        let decoded = decode_table(&PROBE, &bytes).unwrap();
        prop_assert_eq!(decoded, vec![row]);
    }

    #[test]
    fn numbers_wider_than_the_column_are_rejected(cents in 100_000_000_000i64..1_000_000_000_000_000) {
        let row = vec![Value::Null, Value::Number(Decimal::new(cents, 2)), Value::Null, Value::Null];
        prop_assert!(encode_table(&PROBE, &[row], day()).is_err());
    }
}

// Property: date ranges and generator shape
proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn previous_period_abuts_and_matches_length(start in date_strategy(), len in 0i64..400) {
        let range = DateRange::new(start, start + Duration::days(len)).unwrap();
        let previous = range.previous();
        prop_assert_eq!(previous.days(), range.days());
        prop_assert_eq!(previous.end + Duration::days(1), range.start);
    }

    #[test]
    fn daily_invoice_count_respects_the_floor(seed in any::<u64>(), date in date_strategy()) {
        let config = GeneratorConfig::default();
        let noise = Normal::new(0.0, config.daily_noise_sd).unwrap();
        let mut ctx = GenerationContext::new(seed);
        let count = daily_invoice_count(&config, date, &noise, &mut ctx);
        prop_assert!(count >= config.min_daily_invoices);
        prop_assert!(seasonality_factor(&config, date) > 0.0);
    }
}
