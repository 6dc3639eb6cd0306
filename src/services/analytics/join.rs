//! Equality joins over the loaded tables and per-row currency resolution.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};

use super::filter::KpiFilter;
use crate::models::{Client, CreditNote, Currency, Dataset, Invoice, Product, SaleLine, Seller};
use crate::services::currency::CurrencyConverter;

/// Rows left out of an aggregation, by cause. Nothing is dropped without a count here.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Diagnostics {
    /// `table.column` → rows whose foreign key has no parent
    pub foreign_key_mismatches: BTreeMap<String, u64>,
    /// Rows excluded because their date has no usable FX rate
    pub unknown_date_rows: u64,
    pub unknown_dates: BTreeSet<NaiveDate>,
    /// MXN-view rows kept without a rate; they do not count towards the average FX rate
    pub rows_without_rate: u64,
}

impl Diagnostics {
    pub fn orphan(&mut self, key: &str) {
        *self.foreign_key_mismatches.entry(key.to_string()).or_insert(0) += 1;
    }

    pub fn unknown_date(&mut self, date: NaiveDate) {
        self.unknown_date_rows += 1;
        self.unknown_dates.insert(date);
    }

    pub fn orphaned_rows(&self) -> u64 {
        self.foreign_key_mismatches.values().sum()
    }

    pub fn is_clean(&self) -> bool {
        self.foreign_key_mismatches.is_empty() && self.unknown_date_rows == 0 && self.rows_without_rate == 0
    }
}

/// Primary-key lookups built once per dataset.
pub struct TableIndex<'a> {
    pub products: HashMap<u32, &'a Product>,
    pub clients: HashMap<u32, &'a Client>,
    pub sellers: HashMap<u32, &'a Seller>,
    pub invoices: HashMap<u64, &'a Invoice>,
    /// Brands present on each invoice's lines
    pub invoice_brands: HashMap<u64, BTreeSet<&'a str>>,
    /// First sale date per client over the whole history
    pub first_purchase: HashMap<u32, NaiveDate>,
    pub converter: CurrencyConverter<'a>,
}

impl<'a> TableIndex<'a> {
    pub fn new(dataset: &'a Dataset) -> Self {
        let products: HashMap<u32, &Product> =
            dataset.products.iter().map(|p| (p.product_id, p)).collect();

        let mut invoice_brands: HashMap<u64, BTreeSet<&str>> = HashMap::new();
        let mut first_purchase: HashMap<u32, NaiveDate> = HashMap::new();
        for line in &dataset.sales {
            if let Some(product) = products.get(&line.product_id) {
                invoice_brands
                    .entry(line.invoice_id)
                    .or_default()
                    .insert(product.brand.as_str());
            }
            let first = first_purchase.entry(line.client_id).or_insert(line.sale_date);
            if line.sale_date < *first {
                *first = line.sale_date;
            }
        }

        Self {
            products,
            clients: dataset.clients.iter().map(|c| (c.client_id, c)).collect(),
            sellers: dataset.sellers.iter().map(|s| (s.seller_id, s)).collect(),
            invoices: dataset.invoices.iter().map(|i| (i.invoice_id, i)).collect(),
            invoice_brands,
            first_purchase,
            converter: CurrencyConverter::new(&dataset.fx_rates),
        }
    }
}

/// A sale line joined to its parents, with its amount expressed in the report currency.
#[derive(Debug, Clone)]
pub struct SaleRow<'a> {
    pub line: &'a SaleLine,
    pub product: &'a Product,
    pub client: &'a Client,
    pub seller: &'a Seller,
    /// Converted at the line's own date and rounded to cents
    pub amount: Decimal,
    pub rate: Option<Decimal>,
}

/// Joins, filters and converts sale lines.
pub fn collect_sales<'a>(
    index: &TableIndex<'a>,
    sales: &'a [SaleLine],
    filter: &KpiFilter,
    view: Currency,
    diagnostics: &mut Diagnostics,
) -> Vec<SaleRow<'a>> {
    let mut rows = Vec::new();
    for line in sales {
        let Some(product) = index.products.get(&line.product_id).copied() else {
            diagnostics.orphan("ventas.product_id");
            continue;
        };
        let Some(client) = index.clients.get(&line.client_id).copied() else {
            diagnostics.orphan("ventas.client_id");
            continue;
        };
        let Some(seller) = index.sellers.get(&line.seller_id).copied() else {
            diagnostics.orphan("ventas.seller_id");
            continue;
        };
        if !index.invoices.contains_key(&line.invoice_id) {
            diagnostics.orphan("ventas.invoice_id");
            continue;
        }
        if !filter.matches(line.sale_date, &product.brand, &seller.name) {
            continue;
        }

        let rate = index.converter.rate_for(line.sale_date).ok();
        let amount = match index.converter.from_mxn(line.amount_mxn, view, line.sale_date) {
            Ok(amount) => amount,
            Err(_) => {
                diagnostics.unknown_date(line.sale_date);
                continue;
            }
        };
        if rate.is_none() {
            diagnostics.rows_without_rate += 1;
        }
        rows.push(SaleRow { line, product, client, seller, amount, rate });
    }
    rows
}

/// A credit note that passed the filter, with its amount in the report currency.
#[derive(Debug, Clone)]
pub struct CreditRow<'a> {
    pub note: &'a CreditNote,
    pub invoice: &'a Invoice,
    pub amount: Decimal,
}

/// Credit notes pass on their own date, their invoice's seller, and (when brands are
/// filtered) the invoice carrying at least one line of a filtered brand.
pub fn collect_credit_notes<'a>(
    index: &TableIndex<'a>,
    notes: &'a [CreditNote],
    filter: &KpiFilter,
    view: Currency,
    diagnostics: &mut Diagnostics,
) -> Vec<CreditRow<'a>> {
    let mut rows = Vec::new();
    for note in notes {
        let Some(invoice) = index.invoices.get(&note.invoice_id).copied() else {
            diagnostics.orphan("notas_credito.invoice_id");
            continue;
        };
        if !index.clients.contains_key(&note.client_id) {
            diagnostics.orphan("notas_credito.client_id");
            continue;
        }
        let brand_ok = filter.brands.is_empty()
            || index
                .invoice_brands
                .get(&invoice.invoice_id)
                .map_or(false, |brands| brands.iter().any(|b| filter.brands.contains(*b)));
        if !filter.matches_date(note.date) || !filter.matches_seller(&invoice.seller_name) || !brand_ok {
            continue;
        }
        match index.converter.from_mxn(note.amount_mxn, view, note.date) {
            Ok(amount) => rows.push(CreditRow { note, invoice, amount }),
            Err(_) => diagnostics.unknown_date(note.date),
        }
    }
    rows
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diagnostics_tally_by_column() {
        let mut diag = Diagnostics::default();
        assert!(diag.is_clean());
        diag.orphan("ventas.product_id");
        diag.orphan("ventas.product_id");
        diag.orphan("pedidos.client_id");
        diag.unknown_date(NaiveDate::from_ymd_opt(2030, 1, 1).unwrap());
        assert_eq!(diag.foreign_key_mismatches["ventas.product_id"], 2);
        assert_eq!(diag.orphaned_rows(), 3);
        assert_eq!(diag.unknown_date_rows, 1);
        assert!(!diag.is_clean());
    }
}
