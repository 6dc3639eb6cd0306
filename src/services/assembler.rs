//! Turns catalog + drafts into the final table set and checks every cross-table invariant.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::{info, instrument, warn};

use super::catalog::Catalog;
use super::currency::{round_money, round_money_down};
use super::transactions::TransactionDrafts;
use crate::config::GeneratorConfig;
use crate::errors::GenerationError;
use crate::models::{CreditNote, Dataset, FxTable, Invoice, SaleLine};

const MIN_CREDIT_AMOUNT: Decimal = dec!(0.01);

/// Materializes amounts, rates and client recency, then verifies the result.
///
/// Any violation is a generator bug and aborts the run.
#[instrument(skip_all)]
pub fn assemble(
    config: &GeneratorConfig,
    catalog: Catalog,
    drafts: TransactionDrafts,
) -> Result<Dataset, GenerationError> {
    let Catalog {
        products,
        mut clients,
        sellers,
        fx_rates,
    } = catalog;

    let client_idx: HashMap<u32, usize> = clients
        .iter()
        .enumerate()
        .map(|(idx, c)| (c.client_id, idx))
        .collect();
    let seller_idx: HashMap<u32, usize> = sellers
        .iter()
        .enumerate()
        .map(|(idx, s)| (s.seller_id, idx))
        .collect();

    let mut sales = Vec::new();
    let mut invoices = Vec::with_capacity(drafts.invoices.len());
    let mut next_sale_id: u64 = 1;

    for draft in &drafts.invoices {
        let rate = rate_at(&fx_rates, draft.date, || format!("invoice {}", draft.invoice_id))?;
        let client = client_idx
            .get(&draft.client_id)
            .and_then(|i| clients.get(*i))
            .ok_or_else(|| {
                GenerationError::integrity(
                    "invoice.client_fk",
                    format!("invoice {} references client {}", draft.invoice_id, draft.client_id),
                )
            })?;
        let seller = seller_idx
            .get(&draft.seller_id)
            .and_then(|i| sellers.get(*i))
            .ok_or_else(|| {
                GenerationError::integrity(
                    "invoice.seller_fk",
                    format!("invoice {} references seller {}", draft.invoice_id, draft.seller_id),
                )
            })?;

        let mut subtotal = Decimal::ZERO;
        for line in &draft.lines {
            let amount_mxn = round_money(Decimal::from(line.quantity) * line.unit_price_mxn);
            subtotal += amount_mxn;
            sales.push(SaleLine {
                sale_id: next_sale_id,
                invoice_id: draft.invoice_id,
                sale_date: draft.date,
                product_id: line.product_id,
                client_id: draft.client_id,
                seller_id: draft.seller_id,
                origin: draft.origin.to_string(),
                invoice_type: draft.invoice_type.to_string(),
                order_type: draft.order_type.to_string(),
                status: draft.status.to_string(),
                quantity: line.quantity,
                unit_price_mxn: line.unit_price_mxn,
                amount_mxn,
                amount_usd: round_money(amount_mxn / rate),
                currency: draft.currency,
                usd_mxn_rate: rate,
            });
            next_sale_id += 1;
        }

        let total = round_money(subtotal * (Decimal::ONE + config.vat_rate));
        invoices.push(Invoice {
            invoice_id: draft.invoice_id,
            date: draft.date,
            client_id: client.client_id,
            client_name: client.name.clone(),
            seller_id: seller.seller_id,
            seller_name: seller.name.clone(),
            status: draft.status.to_string(),
            invoice_type: draft.invoice_type.to_string(),
            order_type: draft.order_type.to_string(),
            subtotal_mxn: subtotal,
            total_mxn: total,
            amount_usd: round_money(total / rate),
            currency: draft.currency,
            usd_mxn_rate: rate,
        });
    }

    let credit_notes = materialize_credit_notes(&invoices, &drafts)?;

    let mut last_purchase: BTreeMap<u32, NaiveDate> = BTreeMap::new();
    for line in &sales {
        let entry = last_purchase.entry(line.client_id).or_insert(line.sale_date);
        if line.sale_date > *entry {
            *entry = line.sale_date;
        }
    }
    for client in &mut clients {
        if let Some(date) = last_purchase.get(&client.client_id) {
            client.last_purchase_date = *date;
        }
    }

    let dataset = Dataset {
        products,
        clients,
        sellers,
        fx_rates,
        sales,
        invoices,
        credit_notes,
        orders: drafts.orders,
    };
    verify_integrity(&dataset)?;

    info!(
        sales = dataset.sales.len(),
        invoices = dataset.invoices.len(),
        credit_notes = dataset.credit_notes.len(),
        "Dataset assembled"
    );
    Ok(dataset)
}

fn rate_at(
    fx: &FxTable,
    date: NaiveDate,
    context: impl FnOnce() -> String,
) -> Result<Decimal, GenerationError> {
    fx.rate_on(date).ok_or_else(|| GenerationError::MissingRate {
        date,
        context: context(),
    })
}

fn materialize_credit_notes(
    invoices: &[Invoice],
    drafts: &TransactionDrafts,
) -> Result<Vec<CreditNote>, GenerationError> {
    let by_id: HashMap<u64, &Invoice> = invoices.iter().map(|i| (i.invoice_id, i)).collect();
    drafts
        .credit_notes
        .iter()
        .map(|draft| {
            let invoice = by_id.get(&draft.invoice_id).ok_or_else(|| {
                GenerationError::integrity(
                    "credit_note.invoice_fk",
                    format!("note {} references invoice {}", draft.note_id, draft.invoice_id),
                )
            })?;
            let amount = round_money_down(invoice.total_mxn * draft.share)
                .max(MIN_CREDIT_AMOUNT)
                .min(invoice.total_mxn);
            Ok(CreditNote {
                note_id: draft.note_id,
                invoice_id: invoice.invoice_id,
                date: draft.date,
                client_id: invoice.client_id,
                amount_mxn: amount,
                reason: draft.reason.to_string(),
            })
        })
        .collect()
}

/// Checks every cross-table invariant of a dataset.
///
/// Used after assembly and on datasets loaded from disk. The first violation is returned
/// with the invariant name and the offending row.
pub fn verify_integrity(dataset: &Dataset) -> Result<(), GenerationError> {
    check_catalog(dataset)?;
    check_fx(dataset)?;
    check_sales_and_invoices(dataset)?;
    check_credit_notes(dataset)?;
    check_orders(dataset)?;
    Ok(())
}

fn ensure(ok: bool, invariant: &'static str, detail: impl FnOnce() -> String) -> Result<(), GenerationError> {
    if ok {
        Ok(())
    } else {
        let err = GenerationError::integrity(invariant, detail());
        warn!(error = %err, "Integrity check failed");
        Err(err)
    }
}

fn ensure_unique<I: IntoIterator<Item = u64>>(ids: I, invariant: &'static str) -> Result<(), GenerationError> {
    let mut seen = HashSet::new();
    for id in ids {
        ensure(seen.insert(id), invariant, || format!("duplicate id {}", id))?;
    }
    Ok(())
}

fn check_catalog(dataset: &Dataset) -> Result<(), GenerationError> {
    ensure_unique(dataset.products.iter().map(|p| u64::from(p.product_id)), "product.pk")?;
    ensure_unique(dataset.clients.iter().map(|c| u64::from(c.client_id)), "client.pk")?;
    ensure_unique(dataset.sellers.iter().map(|s| u64::from(s.seller_id)), "seller.pk")?;

    for p in &dataset.products {
        ensure(p.cost_mxn <= p.price_mxn, "product.cost_le_price", || {
            format!("product {} cost {} > price {}", p.product_id, p.cost_mxn, p.price_mxn)
        })?;
        ensure(p.min_stock <= p.max_stock, "product.min_le_max_stock", || {
            format!("product {} min {} > max {}", p.product_id, p.min_stock, p.max_stock)
        })?;
    }

    let general = dataset.sellers.iter().filter(|s| s.is_general).count();
    ensure(general == 1, "seller.single_general", || {
        format!("{} catch-all sellers", general)
    })?;

    if let Some(end) = dataset.fx_rates.last_date() {
        for c in &dataset.clients {
            ensure(c.last_purchase_date <= end, "client.last_purchase_in_window", || {
                format!("client {} last purchase {} after {}", c.client_id, c.last_purchase_date, end)
            })?;
        }
    }
    Ok(())
}

fn check_fx(dataset: &Dataset) -> Result<(), GenerationError> {
    let fx = &dataset.fx_rates;
    ensure(fx.is_contiguous(), "fx.no_gaps", || {
        match (fx.first_date(), fx.last_date()) {
            (Some(first), Some(last)) => {
                let missing = fx.missing_dates(first, last);
                format!("{} missing days, first {:?}", missing.len(), missing.first())
            }
            _ => "empty calendar".to_string(),
        }
    })?;
    for rate in fx.iter() {
        ensure(rate.usd_mxn > Decimal::ZERO, "fx.positive", || {
            format!("rate {} on {}", rate.usd_mxn, rate.date)
        })?;
    }
    Ok(())
}

fn check_sales_and_invoices(dataset: &Dataset) -> Result<(), GenerationError> {
    ensure_unique(dataset.sales.iter().map(|s| s.sale_id), "sale.pk")?;
    ensure_unique(dataset.invoices.iter().map(|i| i.invoice_id), "invoice.pk")?;

    let products: HashSet<u32> = dataset.products.iter().map(|p| p.product_id).collect();
    let clients: HashSet<u32> = dataset.clients.iter().map(|c| c.client_id).collect();
    let sellers: HashSet<u32> = dataset.sellers.iter().map(|s| s.seller_id).collect();
    let invoices: HashMap<u64, &Invoice> =
        dataset.invoices.iter().map(|i| (i.invoice_id, i)).collect();

    let mut line_sums: HashMap<u64, Decimal> = HashMap::new();
    for s in &dataset.sales {
        ensure(invoices.contains_key(&s.invoice_id), "sale.invoice_fk", || {
            format!("sale {} references missing invoice {}", s.sale_id, s.invoice_id)
        })?;
        ensure(products.contains(&s.product_id), "sale.product_fk", || {
            format!("sale {} references missing product {}", s.sale_id, s.product_id)
        })?;
        ensure(clients.contains(&s.client_id), "sale.client_fk", || {
            format!("sale {} references missing client {}", s.sale_id, s.client_id)
        })?;
        ensure(sellers.contains(&s.seller_id), "sale.seller_fk", || {
            format!("sale {} references missing seller {}", s.sale_id, s.seller_id)
        })?;
        ensure(
            s.amount_mxn == Decimal::from(s.quantity) * s.unit_price_mxn,
            "sale.amount_eq_qty_x_price",
            || {
                format!(
                    "sale {} amount {} != {} x {}",
                    s.sale_id, s.amount_mxn, s.quantity, s.unit_price_mxn
                )
            },
        )?;
        let day_rate = dataset.fx_rates.rate_on(s.sale_date);
        ensure(day_rate == Some(s.usd_mxn_rate), "sale.rate_matches_calendar", || {
            format!(
                "sale {} rate {} on {} but calendar has {:?}",
                s.sale_id, s.usd_mxn_rate, s.sale_date, day_rate
            )
        })?;
        ensure(
            s.usd_mxn_rate > Decimal::ZERO && s.amount_usd == round_money(s.amount_mxn / s.usd_mxn_rate),
            "sale.usd_eq_mxn_over_rate",
            || format!("sale {} usd {} from mxn {}", s.sale_id, s.amount_usd, s.amount_mxn),
        )?;
        *line_sums.entry(s.invoice_id).or_insert(Decimal::ZERO) += s.amount_mxn;
    }

    for i in &dataset.invoices {
        let lines = line_sums.get(&i.invoice_id).copied();
        ensure(lines.is_some(), "invoice.has_lines", || {
            format!("invoice {} has no sale lines", i.invoice_id)
        })?;
        let sum = lines.unwrap_or_default();
        ensure(i.subtotal_mxn == sum, "invoice.subtotal_eq_line_sum", || {
            format!("invoice {} subtotal {} != line sum {}", i.invoice_id, i.subtotal_mxn, sum)
        })?;
        ensure(i.total_mxn >= i.subtotal_mxn, "invoice.total_ge_subtotal", || {
            format!("invoice {} total {} < subtotal {}", i.invoice_id, i.total_mxn, i.subtotal_mxn)
        })?;
        ensure(clients.contains(&i.client_id), "invoice.client_fk", || {
            format!("invoice {} references missing client {}", i.invoice_id, i.client_id)
        })?;
        ensure(sellers.contains(&i.seller_id), "invoice.seller_fk", || {
            format!("invoice {} references missing seller {}", i.invoice_id, i.seller_id)
        })?;
        ensure(
            dataset.fx_rates.rate_on(i.date) == Some(i.usd_mxn_rate),
            "invoice.rate_matches_calendar",
            || format!("invoice {} rate {} on {}", i.invoice_id, i.usd_mxn_rate, i.date),
        )?;
    }
    Ok(())
}

fn check_credit_notes(dataset: &Dataset) -> Result<(), GenerationError> {
    ensure_unique(dataset.credit_notes.iter().map(|n| n.note_id), "credit_note.pk")?;
    let invoices: HashMap<u64, &Invoice> =
        dataset.invoices.iter().map(|i| (i.invoice_id, i)).collect();

    for n in &dataset.credit_notes {
        let invoice = invoices.get(&n.invoice_id);
        ensure(invoice.is_some(), "credit_note.invoice_fk", || {
            format!("note {} references missing invoice {}", n.note_id, n.invoice_id)
        })?;
        let Some(invoice) = invoice else { continue };
        ensure(n.date >= invoice.date, "credit_note.date_ge_invoice", || {
            format!("note {} dated {} before invoice {} ({})", n.note_id, n.date, invoice.invoice_id, invoice.date)
        })?;
        ensure(
            n.amount_mxn > Decimal::ZERO && n.amount_mxn <= invoice.total_mxn,
            "credit_note.amount_le_invoice_total",
            || {
                format!(
                    "note {} amount {} vs invoice {} total {}",
                    n.note_id, n.amount_mxn, invoice.invoice_id, invoice.total_mxn
                )
            },
        )?;
        ensure(n.client_id == invoice.client_id, "credit_note.client_matches_invoice", || {
            format!("note {} client {} != invoice client {}", n.note_id, n.client_id, invoice.client_id)
        })?;
    }
    Ok(())
}

fn check_orders(dataset: &Dataset) -> Result<(), GenerationError> {
    ensure_unique(dataset.orders.iter().map(|o| o.order_id), "order.pk")?;
    for o in &dataset.orders {
        ensure(o.qty_pending <= o.qty_ordered, "order.pending_le_ordered", || {
            format!("order {} pending {} > ordered {}", o.order_id, o.qty_pending, o.qty_ordered)
        })?;
        ensure(o.status.is_open() == o.is_open(), "order.status_matches_pending", || {
            format!("order {} status {} with {} pending", o.order_id, o.status, o.qty_pending)
        })?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::GenerationContext;
    use crate::services::catalog::build_catalog;
    use crate::services::transactions::generate_transactions;
    use assert_matches::assert_matches;

    fn small_config() -> GeneratorConfig {
        GeneratorConfig {
            seed: 9,
            start_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2024, 2, 29).unwrap(),
            product_count: 25,
            client_count: 15,
            seller_count: 4,
            base_daily_invoices: 4.0,
            min_daily_invoices: 1,
            credit_note_fraction: 0.3,
            order_window_days: 20,
            ..Default::default()
        }
    }

    fn assembled() -> Dataset {
        let config = small_config();
        let mut ctx = GenerationContext::new(config.seed);
        let catalog = build_catalog(&config, &mut ctx).unwrap();
        let drafts = generate_transactions(&config, &catalog, &mut ctx).unwrap();
        assemble(&config, catalog, drafts).unwrap()
    }

    #[test]
    fn assembled_dataset_passes_verification() {
        let dataset = assembled();
        assert!(verify_integrity(&dataset).is_ok());
        assert!(!dataset.credit_notes.is_empty());
    }

    #[test]
    fn invoice_totals_include_vat() {
        let dataset = assembled();
        for invoice in &dataset.invoices {
            assert_eq!(invoice.total_mxn, round_money(invoice.subtotal_mxn * dec!(1.16)));
        }
    }

    #[test]
    fn client_recency_tracks_latest_sale() {
        let dataset = assembled();
        let mut latest: BTreeMap<u32, NaiveDate> = BTreeMap::new();
        for s in &dataset.sales {
            let e = latest.entry(s.client_id).or_insert(s.sale_date);
            *e = (*e).max(s.sale_date);
        }
        for c in &dataset.clients {
            if let Some(d) = latest.get(&c.client_id) {
                assert_eq!(c.last_purchase_date, *d);
            }
        }
    }

    #[test]
    fn tampered_subtotal_is_caught() {
        let mut dataset = assembled();
        dataset.invoices[0].subtotal_mxn += dec!(0.01);
        assert_matches!(
            verify_integrity(&dataset),
            Err(GenerationError::IntegrityViolation { invariant: "invoice.subtotal_eq_line_sum", .. })
        );
    }

    #[test]
    fn oversized_credit_note_is_caught() {
        let mut dataset = assembled();
        let invoice_total = dataset
            .invoices
            .iter()
            .find(|i| i.invoice_id == dataset.credit_notes[0].invoice_id)
            .map(|i| i.total_mxn)
            .unwrap();
        dataset.credit_notes[0].amount_mxn = invoice_total + dec!(1);
        let err = verify_integrity(&dataset).unwrap_err();
        assert!(err.to_string().contains("credit_note.amount_le_invoice_total"));
        assert!(err.to_string().contains(&format!("note {}", dataset.credit_notes[0].note_id)));
    }

    #[test]
    fn orphaned_sale_is_caught() {
        let mut dataset = assembled();
        dataset.sales[0].product_id = 9_999;
        assert_matches!(
            verify_integrity(&dataset),
            Err(GenerationError::IntegrityViolation { invariant: "sale.product_fk", .. })
        );
    }

    #[test]
    fn gap_in_fx_calendar_surfaces_as_missing_rate() {
        let config = small_config();
        let mut ctx = GenerationContext::new(config.seed);
        let mut catalog = build_catalog(&config, &mut ctx).unwrap();
        let drafts = generate_transactions(&config, &catalog, &mut ctx).unwrap();
        let first_sale_day = drafts.invoices[0].date;

        let mut fx = FxTable::new();
        for rate in catalog.fx_rates.iter().filter(|r| r.date != first_sale_day) {
            fx.insert(rate.date, rate.usd_mxn);
        }
        catalog.fx_rates = fx;

        assert_matches!(
            assemble(&config, catalog, drafts),
            Err(GenerationError::MissingRate { date, .. }) if date == first_sale_day
        );
    }
}
