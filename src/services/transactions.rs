//! Time-series drafts: invoices with their lines, credit-note candidates and orders.
//!
//! Drafts carry only what was sampled. Rates, amounts and totals are materialized by the
//! assembler.

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use rand_distr::{Distribution, Normal};
use rust_decimal::Decimal;
use std::f64::consts::PI;
use tracing::{debug, info, instrument};

use super::catalog::{window_days, Catalog};
use crate::config::GeneratorConfig;
use crate::context::GenerationContext;
use crate::errors::GenerationError;
use crate::models::{Currency, Order, OrderStatus, Seller};
use crate::services::currency::{decimal_from_f64, RATE_DP};

pub const SALE_ORIGINS: [&str; 7] = [
    "Web", "Tienda", "WhatsApp", "Teléfono", "Vendedor", "Marketplace", "Recomendación",
];
pub const INVOICE_TYPES: [&str; 4] = ["Contado", "Crédito", "Nota", "Factura"];
pub const ORDER_TYPES: [&str; 4] = ["Pedido", "Remisión", "Cotización", "Backorder"];
pub const CREDIT_REASONS: [&str; 5] = [
    "Devolución", "Descuento comercial", "Error de facturación", "Producto dañado", "Bonificación",
];

const MAX_QUANTITY: u32 = 14;
const MAX_ORDER_QUANTITY: u32 = 20;
const MAX_CREDIT_DELAY_DAYS: i64 = 30;
const MIN_DAILY_ORDERS: u32 = 6;
const CANCELLED_ORDER_SHARE: f64 = 0.05;

/// One sampled product line.
#[derive(Debug, Clone, PartialEq)]
pub struct DraftLine {
    pub product_id: u32,
    pub quantity: u32,
    pub unit_price_mxn: Decimal,
}

/// One sale event before amounts are materialized.
#[derive(Debug, Clone, PartialEq)]
pub struct DraftInvoice {
    pub invoice_id: u64,
    pub date: NaiveDate,
    pub client_id: u32,
    pub seller_id: u32,
    pub currency: Currency,
    pub status: &'static str,
    pub invoice_type: &'static str,
    pub order_type: &'static str,
    pub origin: &'static str,
    pub lines: Vec<DraftLine>,
}

/// A credit note candidate: the amount is `share` of the parent invoice total.
#[derive(Debug, Clone, PartialEq)]
pub struct CreditNoteDraft {
    pub note_id: u64,
    pub invoice_id: u64,
    pub date: NaiveDate,
    pub share: Decimal,
    pub reason: &'static str,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransactionDrafts {
    pub invoices: Vec<DraftInvoice>,
    pub credit_notes: Vec<CreditNoteDraft>,
    pub orders: Vec<Order>,
}

/// Month × weekday × peak multiplier applied to the base daily volume.
pub fn seasonality_factor(config: &GeneratorConfig, date: NaiveDate) -> f64 {
    let month_factor = 1.0 + 0.18 * (2.0 * PI * f64::from(date.month0()) / 12.0).sin();
    let weekday_factor = match date.weekday() {
        Weekday::Mon | Weekday::Tue | Weekday::Wed | Weekday::Thu => 1.1,
        Weekday::Fri => 0.9,
        Weekday::Sat | Weekday::Sun => 0.7,
    };
    let peak = if config.is_peak_month(date) {
        config.peak_multiplier
    } else {
        1.0
    };
    month_factor * weekday_factor * peak
}

/// Invoice count of one day: seasonal baseline plus noise clamped to two deviations,
/// never below the configured floor.
pub fn daily_invoice_count(
    config: &GeneratorConfig,
    date: NaiveDate,
    noise: &Normal<f64>,
    ctx: &mut GenerationContext,
) -> u32 {
    let bound = 2.0 * config.daily_noise_sd;
    let jitter = noise.sample(ctx.rng()).clamp(-bound, bound);
    let expected = config.base_daily_invoices * seasonality_factor(config, date) + jitter;
    (expected.round().max(0.0) as u32).max(config.min_daily_invoices)
}

#[instrument(skip_all, fields(seed = ctx.seed()))]
pub fn generate_transactions(
    config: &GeneratorConfig,
    catalog: &Catalog,
    ctx: &mut GenerationContext,
) -> Result<TransactionDrafts, GenerationError> {
    let (named, general) = split_sellers(&catalog.sellers)?;
    if catalog.products.is_empty() || catalog.clients.is_empty() {
        return Err(GenerationError::integrity(
            "catalog.non_empty",
            "transactions need at least one product and one client",
        ));
    }

    let invoices = generate_invoices(config, catalog, &named, general, ctx)?;
    let credit_notes = generate_credit_notes(config, &invoices, ctx)?;
    let orders = generate_orders(config, catalog, ctx)?;

    info!(
        invoices = invoices.len(),
        lines = invoices.iter().map(|i| i.lines.len()).sum::<usize>(),
        credit_notes = credit_notes.len(),
        orders = orders.len(),
        "Transactions drafted"
    );
    Ok(TransactionDrafts { invoices, credit_notes, orders })
}

fn split_sellers(sellers: &[Seller]) -> Result<(Vec<u32>, u32), GenerationError> {
    let general = sellers
        .iter()
        .find(|s| s.is_general)
        .map(|s| s.seller_id)
        .ok_or_else(|| GenerationError::integrity("seller.general", "no catch-all seller"))?;
    let named: Vec<u32> = sellers
        .iter()
        .filter(|s| !s.is_general)
        .map(|s| s.seller_id)
        .collect();
    if named.is_empty() {
        return Err(GenerationError::integrity("seller.named", "no named sellers"));
    }
    Ok((named, general))
}

fn generate_invoices(
    config: &GeneratorConfig,
    catalog: &Catalog,
    named_sellers: &[u32],
    general_seller: u32,
    ctx: &mut GenerationContext,
) -> Result<Vec<DraftInvoice>, GenerationError> {
    let noise = Normal::new(0.0, config.daily_noise_sd).map_err(|e| {
        GenerationError::configuration("daily_noise_sd", format!("invalid deviation: {}", e))
    })?;

    let mut invoices = Vec::new();
    let mut next_id: u64 = 1;
    for date in window_days(config.start_date, config.end_date) {
        let count = daily_invoice_count(config, date, &noise, ctx);
        for _ in 0..count {
            let client_id = ctx
                .pick(&catalog.clients)
                .map(|c| c.client_id)
                .unwrap_or_default();
            let seller_id = if ctx.chance(config.general_seller_share) {
                general_seller
            } else {
                ctx.pick(named_sellers).copied().unwrap_or(general_seller)
            };
            let currency = if ctx.chance(config.usd_share) {
                Currency::USD
            } else {
                Currency::MXN
            };
            let status = invoice_status(ctx);
            let invoice_type = ctx.label(&INVOICE_TYPES);
            let order_type = ctx.label(&ORDER_TYPES);
            let origin = ctx.label(&SALE_ORIGINS);

            let line_count = ctx.between(1, config.max_lines_per_invoice);
            let mut lines = Vec::with_capacity(line_count as usize);
            for _ in 0..line_count {
                lines.push(draft_line(catalog, ctx)?);
            }

            invoices.push(DraftInvoice {
                invoice_id: next_id,
                date,
                client_id,
                seller_id,
                currency,
                status,
                invoice_type,
                order_type,
                origin,
                lines,
            });
            next_id += 1;
        }
    }
    debug!(count = invoices.len(), "Invoice drafts generated");
    Ok(invoices)
}

fn draft_line(catalog: &Catalog, ctx: &mut GenerationContext) -> Result<DraftLine, GenerationError> {
    let product = ctx
        .pick(&catalog.products)
        .ok_or_else(|| GenerationError::integrity("catalog.non_empty", "no products"))?;
    let quantity = ctx.between(1, MAX_QUANTITY);
    let jitter = decimal_from_f64(ctx.uniform(0.90, 1.15), RATE_DP)
        .ok_or_else(|| GenerationError::integrity("sale.unit_price", "non-finite price jitter"))?;
    Ok(DraftLine {
        product_id: product.product_id,
        quantity,
        unit_price_mxn: super::currency::round_money(product.price_mxn * jitter),
    })
}

fn invoice_status(ctx: &mut GenerationContext) -> &'static str {
    let roll = ctx.uniform(0.0, 1.0);
    if roll < 0.70 {
        "Pagada"
    } else if roll < 0.92 {
        "Pendiente"
    } else {
        "Vencida"
    }
}

/// Credit notes fall 1 to 30 days after their invoice and never past the window end, so
/// invoices on the last day spawn none.
fn generate_credit_notes(
    config: &GeneratorConfig,
    invoices: &[DraftInvoice],
    ctx: &mut GenerationContext,
) -> Result<Vec<CreditNoteDraft>, GenerationError> {
    let mut notes = Vec::new();
    let mut next_id: u64 = 1;
    for invoice in invoices {
        let room = (config.end_date - invoice.date).num_days().min(MAX_CREDIT_DELAY_DAYS);
        if room < 1 || !ctx.chance(config.credit_note_fraction) {
            continue;
        }
        let delay = i64::from(ctx.between(1, room as u32));
        let share = decimal_from_f64(ctx.uniform(0.05, 0.60), RATE_DP)
            .ok_or_else(|| GenerationError::integrity("credit_note.share", "non-finite share"))?;
        notes.push(CreditNoteDraft {
            note_id: next_id,
            invoice_id: invoice.invoice_id,
            date: invoice.date + Duration::days(delay),
            share,
            reason: ctx.label(&CREDIT_REASONS),
        });
        next_id += 1;
    }
    debug!(count = notes.len(), "Credit note drafts generated");
    Ok(notes)
}

fn generate_orders(
    config: &GeneratorConfig,
    catalog: &Catalog,
    ctx: &mut GenerationContext,
) -> Result<Vec<Order>, GenerationError> {
    let per_day = Normal::<f64>::new(10.0, 3.0)
        .map_err(|e| GenerationError::integrity("order.volume", e.to_string()))?;

    let mut orders = Vec::new();
    let mut next_id: u64 = 1;
    for date in window_days(config.order_window_start(), config.end_date) {
        let count = (per_day.sample(ctx.rng()).round().max(0.0) as u32).max(MIN_DAILY_ORDERS);
        for _ in 0..count {
            let product_id = ctx
                .pick(&catalog.products)
                .map(|p| p.product_id)
                .unwrap_or_default();
            let client_id = ctx
                .pick(&catalog.clients)
                .map(|c| c.client_id)
                .unwrap_or_default();
            let seller_id = ctx
                .pick(&catalog.sellers)
                .map(|s| s.seller_id)
                .unwrap_or_default();
            let qty_ordered = ctx.between(1, MAX_ORDER_QUANTITY);
            let (status, qty_pending) = order_fulfilment(config, qty_ordered, ctx);

            orders.push(Order {
                order_id: next_id,
                date,
                client_id,
                seller_id,
                product_id,
                qty_ordered,
                qty_pending,
                status,
                channel: ctx.label(&SALE_ORIGINS).to_string(),
                order_type: ctx.label(&ORDER_TYPES).to_string(),
            });
            next_id += 1;
        }
    }
    debug!(count = orders.len(), "Orders generated");
    Ok(orders)
}

/// Open orders keep pending units (`Pendiente` all of them, `Parcial` some); closed ones
/// keep none.
fn order_fulfilment(
    config: &GeneratorConfig,
    qty_ordered: u32,
    ctx: &mut GenerationContext,
) -> (OrderStatus, u32) {
    if ctx.chance(config.open_order_fraction) {
        if qty_ordered >= 2 && ctx.chance(0.5) {
            (OrderStatus::Parcial, ctx.between(1, qty_ordered - 1))
        } else {
            (OrderStatus::Pendiente, qty_ordered)
        }
    } else if ctx.chance(CANCELLED_ORDER_SHARE) {
        (OrderStatus::Cancelado, 0)
    } else {
        (OrderStatus::Surtido, 0)
    }
}
