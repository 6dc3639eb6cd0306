//! KPI aggregation over a loaded dataset.
//!
//! Every view is a pure function of (dataset, filter, currency view). Monetary amounts are
//! converted row by row at each row's own date, rounded to cents, then summed.

pub mod filter;
pub mod join;
pub mod operations;
pub mod sales;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{debug, instrument, warn};

pub use filter::{DateRange, KpiFilter};
pub use join::Diagnostics;
pub use operations::{AgingBucket, InventoryStatus, OpenOrders, StockAlert};
pub use sales::{
    Breakdown, ClientMix, ClientRanking, MonthlyPoint, PeriodComparison, ProductRanking,
    SellerRanking, Summary,
};

use join::{collect_credit_notes, collect_sales, SaleRow, TableIndex};
use crate::models::{Currency, Dataset};

/// Everything the dashboard shows for one (filter, currency) selection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KpiReport {
    pub currency: Currency,
    pub filter: KpiFilter,
    /// Filter range, or the span of the in-filter sales when no range is set
    pub period: Option<DateRange>,
    pub summary: Summary,
    pub top_products: Vec<ProductRanking>,
    pub top_clients: Vec<ClientRanking>,
    pub top_sellers: Vec<SellerRanking>,
    pub revenue_by_brand: Vec<Breakdown>,
    pub revenue_by_channel: Vec<Breakdown>,
    pub monthly: Vec<MonthlyPoint>,
    pub peak_month: Option<String>,
    pub comparison: Option<PeriodComparison>,
    pub client_mix: Option<ClientMix>,
    pub open_orders: OpenOrders,
    pub inventory: InventoryStatus,
    pub diagnostics: Diagnostics,
}

/// One in-filter sale line as exported to the presentation layer.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SaleView {
    pub sale_id: u64,
    pub invoice_id: u64,
    pub sale_date: NaiveDate,
    pub sku: String,
    pub product: String,
    pub brand: String,
    pub client: String,
    pub seller: String,
    pub quantity: u32,
    pub amount: Decimal,
    pub currency: Currency,
}

/// Holds the lookup indexes of one loaded dataset so repeated aggregations reuse them.
pub struct KpiAggregator<'a> {
    dataset: &'a Dataset,
    index: TableIndex<'a>,
}

impl<'a> KpiAggregator<'a> {
    pub fn new(dataset: &'a Dataset) -> Self {
        Self {
            dataset,
            index: TableIndex::new(dataset),
        }
    }

    #[instrument(skip(self), fields(currency = %view))]
    pub fn aggregate(&self, filter: &KpiFilter, view: Currency) -> KpiReport {
        let dataset = self.dataset;
        let index = &self.index;
        let mut diagnostics = Diagnostics::default();

        let rows = collect_sales(index, &dataset.sales, filter, view, &mut diagnostics);
        let credits =
            collect_credit_notes(index, &dataset.credit_notes, filter, view, &mut diagnostics);

        let period = filter.date_range.or_else(|| span_of(&rows));
        let summary = sales::summarize(&rows, &credits);
        let total = summary.revenue;

        let monthly = sales::monthly_series(&rows);
        let peak_month = sales::peak_month(&monthly);

        let comparison = period.map(|current| {
            let previous_filter = KpiFilter {
                date_range: Some(current.previous()),
                ..filter.clone()
            };
            let mut scratch = Diagnostics::default();
            let previous_rows =
                collect_sales(index, &dataset.sales, &previous_filter, view, &mut scratch);
            sales::compare_periods(current, &rows, &previous_rows)
        });

        let as_of = filter
            .date_range
            .map(|r| r.end)
            .or_else(|| dataset.fx_rates.last_date())
            .or_else(|| dataset.orders.iter().map(|o| o.date).max());

        let open_orders =
            operations::open_orders(index, &dataset.orders, filter, view, as_of, &mut diagnostics);
        let inventory = operations::inventory_status(
            &dataset.products,
            &rows,
            filter,
            period,
            index,
            view,
            as_of,
        );

        if !diagnostics.is_clean() {
            warn!(
                orphaned = diagnostics.orphaned_rows(),
                unknown_dates = diagnostics.unknown_date_rows,
                without_rate = diagnostics.rows_without_rate,
                "Rows excluded from aggregation"
            );
        }
        debug!(lines = rows.len(), revenue = %total, "Aggregation complete");

        KpiReport {
            currency: view,
            filter: filter.clone(),
            period,
            top_products: sales::top_products(index, &rows, total),
            top_clients: sales::top_clients(index, &rows, total),
            top_sellers: sales::top_sellers(index, &rows, total, period),
            revenue_by_brand: sales::breakdown(&rows, total, |r| r.product.brand.clone()),
            revenue_by_channel: sales::breakdown(&rows, total, |r| r.line.origin.clone()),
            monthly,
            peak_month,
            comparison,
            client_mix: period.map(|p| sales::client_mix(index, &rows, p)),
            open_orders,
            inventory,
            summary,
            diagnostics,
        }
    }

    /// In-filter sale lines with amounts in the requested currency.
    pub fn filtered_sales(&self, filter: &KpiFilter, view: Currency) -> (Vec<SaleView>, Diagnostics) {
        let mut diagnostics = Diagnostics::default();
        let rows = collect_sales(&self.index, &self.dataset.sales, filter, view, &mut diagnostics);
        let views = rows
            .iter()
            .map(|r| SaleView {
                sale_id: r.line.sale_id,
                invoice_id: r.line.invoice_id,
                sale_date: r.line.sale_date,
                sku: r.product.sku.clone(),
                product: r.product.name.clone(),
                brand: r.product.brand.clone(),
                client: r.client.name.clone(),
                seller: r.seller.name.clone(),
                quantity: r.line.quantity,
                amount: r.amount,
                currency: view,
            })
            .collect();
        (views, diagnostics)
    }
}

/// Aggregates `dataset` for one filter and currency view.
pub fn aggregate(dataset: &Dataset, filter: &KpiFilter, view: Currency) -> KpiReport {
    KpiAggregator::new(dataset).aggregate(filter, view)
}

fn span_of(rows: &[SaleRow<'_>]) -> Option<DateRange> {
    let start = rows.iter().map(|r| r.line.sale_date).min()?;
    let end = rows.iter().map(|r| r.line.sale_date).max()?;
    Some(DateRange { start, end })
}
