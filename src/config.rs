use chrono::{Datelike, NaiveDate};
use config::{Config, ConfigError, Environment, File};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{error, info};
use validator::{Validate, ValidationError, ValidationErrors};

use crate::errors::GenerationError;

/// Default values for configuration
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_ENV: &str = "development";
const DEFAULT_DATA_DIR: &str = "data/dbf";
const CONFIG_DIR: &str = "config";
const DATA_DIR_ENV: &str = "SAI_DBF_DIR";

const DEFAULT_SEED: u64 = 42;
const DEFAULT_PRODUCT_COUNT: u32 = 2000;
const DEFAULT_CLIENT_COUNT: u32 = 650;
const DEFAULT_SELLER_COUNT: u32 = 11;
const DEFAULT_BASE_DAILY_INVOICES: f64 = 22.0;
const DEFAULT_MIN_DAILY_INVOICES: u32 = 6;
const DEFAULT_MAX_LINES_PER_INVOICE: u32 = 6;
const DEFAULT_ORDER_WINDOW_DAYS: u32 = 120;

/// Parameters of one generation run.
///
/// Every field has a documented default; [`GeneratorConfig::check`] rejects invalid
/// ranges with a [`GenerationError::Configuration`] naming the offending parameter.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default, deny_unknown_fields)]
pub struct GeneratorConfig {
    /// Seed for the generation context RNG
    pub seed: u64,

    /// First calendar day of the generated window (inclusive)
    pub start_date: NaiveDate,

    /// Last calendar day of the generated window (inclusive)
    pub end_date: NaiveDate,

    /// Number of catalog products
    #[validate(range(min = 1))]
    pub product_count: u32,

    /// Number of clients
    #[validate(range(min = 1))]
    pub client_count: u32,

    /// Number of sellers, including the catch-all "general sales" seller
    #[validate(range(min = 2, max = 99))]
    pub seller_count: u32,

    /// Baseline invoices per day before seasonality
    #[validate(range(min = 0.01))]
    pub base_daily_invoices: f64,

    /// Floor applied to the daily invoice count
    pub min_daily_invoices: u32,

    /// Upper bound of sale lines per invoice
    #[validate(range(min = 1, max = 50))]
    pub max_lines_per_invoice: u32,

    /// Months (1-12) with elevated sales volume
    #[validate(custom = "validate_peak_months")]
    pub peak_months: Vec<u32>,

    /// Volume multiplier applied in peak months
    #[validate(range(min = 1.0, max = 5.0))]
    pub peak_multiplier: f64,

    /// Standard deviation of the daily volume noise (clamped to two deviations)
    #[validate(range(min = 0.0))]
    pub daily_noise_sd: f64,

    /// Fraction of invoices spawning a credit note
    #[validate(range(min = 0.0, max = 1.0))]
    pub credit_note_fraction: f64,

    /// Fraction of orders left open with pending quantity
    #[validate(range(min = 0.0, max = 1.0))]
    pub open_order_fraction: f64,

    /// Trailing days of the window that carry orders
    #[validate(range(min = 1))]
    pub order_window_days: u32,

    /// Probability that an invoice is billed in USD
    #[validate(range(min = 0.0, max = 1.0))]
    pub usd_share: f64,

    /// Probability that a sale is attributed to the catch-all seller
    #[validate(range(min = 0.0, max = 1.0))]
    pub general_seller_share: f64,

    /// VAT applied on top of invoice subtotals (0.16 = 16%)
    #[validate(custom = "validate_vat_rate")]
    pub vat_rate: Decimal,

    /// Long-run MXN per USD level of the FX walk
    #[validate(range(min = 0.01))]
    pub fx_baseline: f64,

    /// Daily pull of the FX walk towards the baseline
    #[validate(range(min = 0.0, max = 1.0))]
    pub fx_mean_reversion: f64,

    /// Maximum daily FX shock (uniform, symmetric)
    #[validate(range(min = 0.0))]
    pub fx_daily_volatility: f64,

    /// Lowest rate the FX walk may reach
    #[validate(range(min = 0.01))]
    pub fx_floor: f64,

    /// Highest rate the FX walk may reach
    #[validate(range(min = 0.01))]
    pub fx_ceiling: f64,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            seed: DEFAULT_SEED,
            start_date: default_start_date(),
            end_date: default_end_date(),
            product_count: DEFAULT_PRODUCT_COUNT,
            client_count: DEFAULT_CLIENT_COUNT,
            seller_count: DEFAULT_SELLER_COUNT,
            base_daily_invoices: DEFAULT_BASE_DAILY_INVOICES,
            min_daily_invoices: DEFAULT_MIN_DAILY_INVOICES,
            max_lines_per_invoice: DEFAULT_MAX_LINES_PER_INVOICE,
            peak_months: vec![11, 12],
            peak_multiplier: 1.3,
            daily_noise_sd: 2.5,
            credit_note_fraction: 0.04,
            open_order_fraction: 0.2,
            order_window_days: DEFAULT_ORDER_WINDOW_DAYS,
            usd_share: 0.18,
            general_seller_share: 0.25,
            vat_rate: dec!(0.16),
            fx_baseline: 18.2,
            fx_mean_reversion: 0.02,
            fx_daily_volatility: 0.08,
            fx_floor: 16.0,
            fx_ceiling: 20.5,
        }
    }
}

impl GeneratorConfig {
    /// Number of calendar days in the window, both ends included.
    pub fn window_days(&self) -> i64 {
        (self.end_date - self.start_date).num_days() + 1
    }

    /// First day that carries orders.
    pub fn order_window_start(&self) -> NaiveDate {
        let span = i64::from(self.order_window_days) - 1;
        let start = self.end_date - chrono::Duration::days(span);
        start.max(self.start_date)
    }

    fn float_parameters(&self) -> [(&'static str, f64); 12] {
        [
            ("base_daily_invoices", self.base_daily_invoices),
            ("peak_multiplier", self.peak_multiplier),
            ("daily_noise_sd", self.daily_noise_sd),
            ("credit_note_fraction", self.credit_note_fraction),
            ("open_order_fraction", self.open_order_fraction),
            ("usd_share", self.usd_share),
            ("general_seller_share", self.general_seller_share),
            ("fx_baseline", self.fx_baseline),
            ("fx_mean_reversion", self.fx_mean_reversion),
            ("fx_daily_volatility", self.fx_daily_volatility),
            ("fx_floor", self.fx_floor),
            ("fx_ceiling", self.fx_ceiling),
        ]
    }

    pub fn is_peak_month(&self, date: NaiveDate) -> bool {
        self.peak_months.contains(&date.month())
    }

    /// Validates field ranges and cross-field constraints.
    pub fn check(&self) -> Result<(), GenerationError> {
        // Range validation lets NaN through.
        for (parameter, value) in self.float_parameters() {
            if !value.is_finite() {
                return Err(GenerationError::configuration(
                    parameter,
                    format!("must be a finite number (got {})", value),
                ));
            }
        }
        self.validate().map_err(first_configuration_error)?;

        if self.end_date < self.start_date {
            return Err(GenerationError::configuration(
                "end_date",
                format!(
                    "must not precede start_date ({} < {})",
                    self.end_date, self.start_date
                ),
            ));
        }
        if self.fx_floor >= self.fx_ceiling {
            return Err(GenerationError::configuration(
                "fx_floor",
                format!(
                    "must be below fx_ceiling ({} >= {})",
                    self.fx_floor, self.fx_ceiling
                ),
            ));
        }
        if self.fx_baseline < self.fx_floor || self.fx_baseline > self.fx_ceiling {
            return Err(GenerationError::configuration(
                "fx_baseline",
                format!(
                    "must lie within [{}, {}] (got {})",
                    self.fx_floor, self.fx_ceiling, self.fx_baseline
                ),
            ));
        }
        Ok(())
    }
}

fn first_configuration_error(errors: ValidationErrors) -> GenerationError {
    let field_errors = errors.field_errors();
    let mut fields: Vec<_> = field_errors.into_iter().collect();
    fields.sort_by_key(|(field, _)| *field);

    let Some((field, errs)) = fields.into_iter().next() else {
        return GenerationError::configuration("generator", "invalid configuration");
    };
    let reason = errs
        .first()
        .map(describe_validation_error)
        .unwrap_or_else(|| "is invalid".to_string());
    GenerationError::configuration(field, reason)
}

fn describe_validation_error(err: &ValidationError) -> String {
    if let Some(message) = &err.message {
        return message.to_string();
    }
    let bound = |key: &str| err.params.get(key).map(|v| v.to_string());
    let value = bound("value").unwrap_or_else(|| "?".to_string());
    match (bound("min"), bound("max")) {
        (Some(min), Some(max)) => format!("must be within [{}, {}] (got {})", min, max, value),
        (Some(min), None) => format!("must be at least {} (got {})", min, value),
        (None, Some(max)) => format!("must be at most {} (got {})", max, value),
        (None, None) => format!("failed `{}` check (got {})", err.code, value),
    }
}

fn validate_peak_months(months: &Vec<u32>) -> Result<(), ValidationError> {
    if let Some(bad) = months.iter().find(|m| !(1..=12).contains(*m)) {
        let mut err = ValidationError::new("peak_months");
        err.message = Some(format!("must only contain months 1-12 (got {})", bad).into());
        return Err(err);
    }
    Ok(())
}

fn validate_vat_rate(rate: &Decimal) -> Result<(), ValidationError> {
    if rate.is_sign_negative() || *rate > Decimal::ONE {
        let mut err = ValidationError::new("vat_rate");
        err.message = Some(format!("must be between 0 and 1 (got {})", rate).into());
        return Err(err);
    }
    Ok(())
}

fn default_start_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2022, 1, 1).unwrap_or_default()
}

fn default_end_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 12, 31).unwrap_or_default()
}

/// Application configuration: where tables live, how to log, how to generate.
#[derive(Clone, Debug, Deserialize)]
pub struct AppConfig {
    /// Directory holding one table file per entity
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Logging level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Log in JSON format (structured logging)
    #[serde(default)]
    pub log_json: bool,

    /// Generation parameters
    #[serde(default)]
    pub generator: GeneratorConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            log_level: default_log_level(),
            log_json: false,
            generator: GeneratorConfig::default(),
        }
    }
}

impl AppConfig {
    /// Gets log level reference
    pub fn log_level(&self) -> &str {
        &self.log_level
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }
}

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum AppConfigError {
    #[error("Configuration loading failed: {0}")]
    Load(#[from] ConfigError),

    #[error("Configuration validation failed: {0}")]
    Validation(#[from] GenerationError),
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_data_dir() -> PathBuf {
    PathBuf::from(DEFAULT_DATA_DIR)
}

/// Initializes tracing using the provided log level as the default filter
pub fn init_tracing(level: &str, json: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default_directive = format!("sai_alpha={}", level);
    let filter_directive = env::var("RUST_LOG")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(default_directive);

    let builder = fmt()
        .with_env_filter(EnvFilter::new(filter_directive))
        .with_writer(std::io::stderr);
    if json {
        let _ = builder.json().try_init();
    } else {
        let _ = builder.try_init();
    }
}

/// Loads application configuration
///
/// Layers configuration sources in this order:
/// 1. Built-in defaults
/// 2. Default config (config/default.toml)
/// 3. Environment-specific config (config/{env}.toml)
/// 4. Environment variables (SAI__*, e.g. `SAI__GENERATOR__SEED=7`)
/// 5. `SAI_DBF_DIR`, which overrides the data directory
pub fn load_config() -> Result<AppConfig, AppConfigError> {
    // Support both RUN_ENV and APP_ENV for selecting config profile
    let run_env = env::var("RUN_ENV")
        .or_else(|_| env::var("APP_ENV"))
        .unwrap_or_else(|_| DEFAULT_ENV.to_string());
    info!("Loading configuration for environment: {}", run_env);

    if !Path::new(CONFIG_DIR).exists() {
        info!(
            "Config directory '{}' not found; relying on built-in defaults and environment variables",
            CONFIG_DIR
        );
    }

    let config = Config::builder()
        .set_default("data_dir", DEFAULT_DATA_DIR)?
        .set_default("log_level", DEFAULT_LOG_LEVEL)?
        .set_default("log_json", false)?
        .add_source(File::with_name(&format!("{}/default", CONFIG_DIR)).required(false))
        .add_source(File::with_name(&format!("{}/{}", CONFIG_DIR, run_env)).required(false))
        .add_source(Environment::with_prefix("SAI").separator("__"))
        .build()?;

    let mut app_config: AppConfig = config.try_deserialize()?;

    if let Some(dir) = env::var(DATA_DIR_ENV).ok().filter(|v| !v.trim().is_empty()) {
        app_config.data_dir = PathBuf::from(dir);
    }

    app_config.generator.check().map_err(|e| {
        error!("Configuration validation failed: {}", e);
        AppConfigError::Validation(e)
    })?;

    info!(data_dir = %app_config.data_dir.display(), "Configuration loaded successfully");
    Ok(app_config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn parameter_of(err: GenerationError) -> String {
        match err {
            GenerationError::Configuration { parameter, .. } => parameter,
            other => panic!("expected configuration error, got {other:?}"),
        }
    }

    #[test]
    fn defaults_are_valid() {
        assert!(GeneratorConfig::default().check().is_ok());
    }

    #[test]
    fn default_window_spans_four_years() {
        let cfg = GeneratorConfig::default();
        assert_eq!(cfg.window_days(), 365 * 4 + 1);
    }

    #[test]
    fn end_before_start_is_rejected() {
        let cfg = GeneratorConfig {
            start_date: NaiveDate::from_ymd_opt(2024, 1, 10).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2024, 1, 9).unwrap(),
            ..Default::default()
        };
        assert_eq!(parameter_of(cfg.check().unwrap_err()), "end_date");
    }

    #[test]
    fn zero_cardinality_is_rejected() {
        let cfg = GeneratorConfig {
            product_count: 0,
            ..Default::default()
        };
        let err = cfg.check().unwrap_err();
        assert!(err.to_string().contains("product_count"));
        assert_eq!(parameter_of(err), "product_count");
    }

    #[test]
    fn single_seller_is_rejected() {
        let cfg = GeneratorConfig {
            seller_count: 1,
            ..Default::default()
        };
        assert_eq!(parameter_of(cfg.check().unwrap_err()), "seller_count");
    }

    #[test]
    fn invalid_peak_month_is_rejected() {
        let cfg = GeneratorConfig {
            peak_months: vec![12, 13],
            ..Default::default()
        };
        let err = cfg.check().unwrap_err();
        assert!(err.to_string().contains("got 13"));
    }

    #[test]
    fn fractions_outside_unit_interval_are_rejected() {
        let cfg = GeneratorConfig {
            credit_note_fraction: 1.5,
            ..Default::default()
        };
        assert_eq!(parameter_of(cfg.check().unwrap_err()), "credit_note_fraction");
    }

    #[test]
    fn fx_bounds_must_be_ordered() {
        let cfg = GeneratorConfig {
            fx_floor: 21.0,
            ..Default::default()
        };
        assert_eq!(parameter_of(cfg.check().unwrap_err()), "fx_floor");
    }

    #[test]
    fn negative_vat_is_rejected() {
        let cfg = GeneratorConfig {
            vat_rate: dec!(-0.01),
            ..Default::default()
        };
        assert_matches!(
            cfg.check(),
            Err(GenerationError::Configuration { parameter, .. }) if parameter == "vat_rate"
        );
    }

    #[test]
    fn order_window_is_clamped_to_start() {
        let cfg = GeneratorConfig {
            start_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
            order_window_days: 120,
            ..Default::default()
        };
        assert_eq!(cfg.order_window_start(), cfg.start_date);
    }

    #[test]
    fn generator_config_deserializes_partial_toml() {
        let cfg: GeneratorConfig = Config::builder()
            .add_source(config::File::from_str(
                "seed = 7\nproduct_count = 12\nstart_date = \"2023-01-01\"\nend_date = \"2023-03-31\"",
                config::FileFormat::Toml,
            ))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();
        assert_eq!(cfg.seed, 7);
        assert_eq!(cfg.product_count, 12);
        assert_eq!(cfg.client_count, DEFAULT_CLIENT_COUNT);
        assert_eq!(cfg.window_days(), 90);
    }

    #[test]
    fn non_finite_floats_are_rejected_by_name() {
        let cfg = GeneratorConfig { usd_share: f64::NAN, ..Default::default() };
        assert_eq!(parameter_of(cfg.check().unwrap_err()), "usd_share");

        let cfg = GeneratorConfig { fx_daily_volatility: f64::INFINITY, ..Default::default() };
        assert_eq!(parameter_of(cfg.check().unwrap_err()), "fx_daily_volatility");
    }

    #[test]
    fn nan_from_toml_fails_the_check() {
        let cfg: GeneratorConfig = Config::builder()
            .add_source(config::File::from_str("credit_note_fraction = nan", config::FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();
        assert!(cfg.credit_note_fraction.is_nan());
        assert_eq!(parameter_of(cfg.check().unwrap_err()), "credit_note_fraction");
    }
}
