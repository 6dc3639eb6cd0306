#![allow(dead_code)]

use std::sync::OnceLock;

use chrono::NaiveDate;
use sai_alpha::{generate_dataset, Dataset, GeneratorConfig};

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

/// A one-year configuration small enough for fast tests.
pub fn small_config() -> GeneratorConfig {
    GeneratorConfig {
        seed: 20230101,
        start_date: date(2023, 1, 1),
        end_date: date(2023, 12, 31),
        product_count: 50,
        client_count: 40,
        seller_count: 6,
        base_daily_invoices: 4.0,
        min_daily_invoices: 2,
        max_lines_per_invoice: 4,
        credit_note_fraction: 0.08,
        order_window_days: 60,
        ..Default::default()
    }
}

/// Dataset generated once per test binary from [`small_config`].
pub fn dataset() -> &'static Dataset {
    static DATASET: OnceLock<Dataset> = OnceLock::new();
    DATASET.get_or_init(|| generate_dataset(&small_config()).expect("generation succeeds"))
}
