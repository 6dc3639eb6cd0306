//! SAI Alpha data pipeline
//!
//! Deterministic generator for a multi-year commercial dataset stored as dBase tables,
//! plus the currency-aware ETL/KPI layer that the sales dashboard reads from.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

pub mod config;
pub mod context;
pub mod errors;
pub mod export;
pub mod models;
pub mod services;
pub mod tables;

pub use config::{AppConfig, GeneratorConfig};
pub use context::GenerationContext;
pub use errors::{ConversionError, GenerationError, ServiceError, TableError};
pub use models::{Currency, Dataset};
pub use services::analytics::{aggregate, DateRange, KpiFilter, KpiReport};
pub use services::currency::CurrencyConverter;
pub use services::generation::generate_dataset;
