//! Revenue views over joined sale rows.

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

use super::filter::DateRange;
use super::join::{CreditRow, SaleRow, TableIndex};
use crate::models::Currency;
use crate::services::currency::{round_money, round_rate};

pub const TOP_N: usize = 10;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Summary {
    pub revenue: Decimal,
    pub invoices: usize,
    pub lines: usize,
    pub units: u64,
    pub active_clients: usize,
    /// Revenue per invoice
    pub average_ticket: Decimal,
    /// Mean of the daily rates touched by in-filter rows (each date counted once)
    pub average_fx_rate: Option<Decimal>,
    pub credit_notes: usize,
    pub credit_notes_total: Decimal,
    pub net_revenue: Decimal,
    pub mxn_billed_lines: usize,
    pub usd_billed_lines: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProductRanking {
    pub rank: usize,
    pub product_id: u32,
    pub sku: String,
    pub name: String,
    pub brand: String,
    pub revenue: Decimal,
    pub units: u64,
    pub share_pct: Decimal,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ClientRanking {
    pub rank: usize,
    pub client_id: u32,
    pub name: String,
    pub revenue: Decimal,
    pub invoices: usize,
    pub share_pct: Decimal,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SellerRanking {
    pub rank: usize,
    pub seller_id: u32,
    pub name: String,
    pub revenue: Decimal,
    pub invoices: usize,
    pub units: u64,
    /// Revenue per business day of the period
    pub daily_average: Decimal,
    pub share_pct: Decimal,
}

/// Revenue grouped by a text label (brand, channel).
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Breakdown {
    pub label: String,
    pub revenue: Decimal,
    pub lines: usize,
    pub share_pct: Decimal,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MonthlyPoint {
    /// `YYYY-MM`
    pub month: String,
    pub revenue: Decimal,
    pub invoices: usize,
    /// Growth against the previous calendar month, when that month has revenue
    pub growth_pct: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeriodComparison {
    pub current: DateRange,
    pub previous: DateRange,
    pub current_revenue: Decimal,
    pub previous_revenue: Decimal,
    pub current_invoices: usize,
    pub previous_invoices: usize,
    pub revenue_change_pct: Option<Decimal>,
}

/// Active clients split by whether their first ever purchase falls inside the period.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ClientMix {
    pub new_clients: usize,
    pub recurrent_clients: usize,
    pub new_client_revenue: Decimal,
    pub recurrent_client_revenue: Decimal,
}

pub fn total_revenue(rows: &[SaleRow<'_>]) -> Decimal {
    rows.iter().map(|r| r.amount).sum()
}

fn distinct_invoices(rows: &[SaleRow<'_>]) -> usize {
    rows.iter().map(|r| r.line.invoice_id).collect::<BTreeSet<_>>().len()
}

/// `part / whole` as a percentage with two decimals; zero when `whole` is zero.
pub fn share_pct(part: Decimal, whole: Decimal) -> Decimal {
    if whole.is_zero() {
        Decimal::ZERO
    } else {
        round_money(part / whole * dec!(100))
    }
}

/// Relative change in percent; `None` when the base is not positive.
pub fn growth_pct(current: Decimal, previous: Decimal) -> Option<Decimal> {
    if previous <= Decimal::ZERO {
        None
    } else {
        Some(round_money((current - previous) / previous * dec!(100)))
    }
}

pub fn summarize(rows: &[SaleRow<'_>], credits: &[CreditRow<'_>]) -> Summary {
    let revenue = total_revenue(rows);
    let invoices = distinct_invoices(rows);
    let units = rows.iter().map(|r| u64::from(r.line.quantity)).sum();
    let active_clients = rows.iter().map(|r| r.client.client_id).collect::<BTreeSet<_>>().len();

    let mut daily_rates: BTreeMap<NaiveDate, Decimal> = BTreeMap::new();
    for row in rows {
        if let Some(rate) = row.rate {
            daily_rates.insert(row.line.sale_date, rate);
        }
    }
    let average_fx_rate = if daily_rates.is_empty() {
        None
    } else {
        let sum: Decimal = daily_rates.values().copied().sum();
        Some(round_rate(sum / Decimal::from(daily_rates.len() as u64)))
    };

    let credit_notes_total: Decimal = credits.iter().map(|c| c.amount).sum();
    let average_ticket = if invoices == 0 {
        Decimal::ZERO
    } else {
        round_money(revenue / Decimal::from(invoices as u64))
    };

    Summary {
        revenue,
        invoices,
        lines: rows.len(),
        units,
        active_clients,
        average_ticket,
        average_fx_rate,
        credit_notes: credits.len(),
        credit_notes_total,
        net_revenue: revenue - credit_notes_total,
        mxn_billed_lines: rows.iter().filter(|r| r.line.currency == Currency::MXN).count(),
        usd_billed_lines: rows.iter().filter(|r| r.line.currency == Currency::USD).count(),
    }
}

#[derive(Default)]
struct Tally {
    revenue: Decimal,
    units: u64,
    lines: usize,
    invoices: BTreeSet<u64>,
}

impl Tally {
    fn add(&mut self, row: &SaleRow<'_>) {
        self.revenue += row.amount;
        self.units += u64::from(row.line.quantity);
        self.lines += 1;
        self.invoices.insert(row.line.invoice_id);
    }
}

/// Groups by key and orders by revenue (descending), ties broken by key.
fn ranked<K: Ord + Copy>(
    rows: &[SaleRow<'_>],
    key: impl Fn(&SaleRow<'_>) -> K,
) -> Vec<(K, Tally)> {
    let mut groups: BTreeMap<K, Tally> = BTreeMap::new();
    for row in rows {
        groups.entry(key(row)).or_default().add(row);
    }
    let mut ordered: Vec<(K, Tally)> = groups.into_iter().collect();
    ordered.sort_by(|a, b| b.1.revenue.cmp(&a.1.revenue).then(a.0.cmp(&b.0)));
    ordered
}

pub fn top_products(index: &TableIndex<'_>, rows: &[SaleRow<'_>], total: Decimal) -> Vec<ProductRanking> {
    ranked(rows, |r| r.product.product_id)
        .into_iter()
        .take(TOP_N)
        .filter_map(|(id, tally)| index.products.get(&id).map(|p| (p, tally)))
        .enumerate()
        .map(|(pos, (product, tally))| ProductRanking {
            rank: pos + 1,
            product_id: product.product_id,
            sku: product.sku.clone(),
            name: product.name.clone(),
            brand: product.brand.clone(),
            revenue: tally.revenue,
            units: tally.units,
            share_pct: share_pct(tally.revenue, total),
        })
        .collect()
}

pub fn top_clients(index: &TableIndex<'_>, rows: &[SaleRow<'_>], total: Decimal) -> Vec<ClientRanking> {
    ranked(rows, |r| r.client.client_id)
        .into_iter()
        .take(TOP_N)
        .filter_map(|(id, tally)| index.clients.get(&id).map(|c| (c, tally)))
        .enumerate()
        .map(|(pos, (client, tally))| ClientRanking {
            rank: pos + 1,
            client_id: client.client_id,
            name: client.name.clone(),
            revenue: tally.revenue,
            invoices: tally.invoices.len(),
            share_pct: share_pct(tally.revenue, total),
        })
        .collect()
}

pub fn top_sellers(
    index: &TableIndex<'_>,
    rows: &[SaleRow<'_>],
    total: Decimal,
    period: Option<DateRange>,
) -> Vec<SellerRanking> {
    let business_days = period.map(|p| p.business_days()).unwrap_or(0);
    ranked(rows, |r| r.seller.seller_id)
        .into_iter()
        .take(TOP_N)
        .filter_map(|(id, tally)| index.sellers.get(&id).map(|s| (s, tally)))
        .enumerate()
        .map(|(pos, (seller, tally))| SellerRanking {
            rank: pos + 1,
            seller_id: seller.seller_id,
            name: seller.name.clone(),
            revenue: tally.revenue,
            invoices: tally.invoices.len(),
            units: tally.units,
            daily_average: if business_days > 0 {
                round_money(tally.revenue / Decimal::from(business_days))
            } else {
                Decimal::ZERO
            },
            share_pct: share_pct(tally.revenue, total),
        })
        .collect()
}

pub fn breakdown(
    rows: &[SaleRow<'_>],
    total: Decimal,
    label: impl Fn(&SaleRow<'_>) -> String,
) -> Vec<Breakdown> {
    let mut groups: BTreeMap<String, Tally> = BTreeMap::new();
    for row in rows {
        groups.entry(label(row)).or_default().add(row);
    }
    let mut out: Vec<Breakdown> = groups
        .into_iter()
        .map(|(label, tally)| Breakdown {
            label,
            revenue: tally.revenue,
            lines: tally.lines,
            share_pct: share_pct(tally.revenue, total),
        })
        .collect();
    out.sort_by(|a, b| b.revenue.cmp(&a.revenue).then_with(|| a.label.cmp(&b.label)));
    out
}

pub fn monthly_series(rows: &[SaleRow<'_>]) -> Vec<MonthlyPoint> {
    let mut months: BTreeMap<(i32, u32), Tally> = BTreeMap::new();
    for row in rows {
        let d = row.line.sale_date;
        months.entry((d.year(), d.month())).or_default().add(row);
    }
    months
        .iter()
        .map(|(&(year, month), tally)| {
            let prev_key = if month == 1 { (year - 1, 12) } else { (year, month - 1) };
            let growth = months
                .get(&prev_key)
                .and_then(|prev| growth_pct(tally.revenue, prev.revenue));
            MonthlyPoint {
                month: format!("{:04}-{:02}", year, month),
                revenue: tally.revenue,
                invoices: tally.invoices.len(),
                growth_pct: growth,
            }
        })
        .collect()
}

/// Month with the highest revenue; the earliest wins ties.
pub fn peak_month(series: &[MonthlyPoint]) -> Option<String> {
    series
        .iter()
        .fold(None::<&MonthlyPoint>, |best, point| match best {
            Some(b) if b.revenue >= point.revenue => Some(b),
            _ => Some(point),
        })
        .map(|p| p.month.clone())
}

pub fn compare_periods(
    current: DateRange,
    current_rows: &[SaleRow<'_>],
    previous_rows: &[SaleRow<'_>],
) -> PeriodComparison {
    let current_revenue = total_revenue(current_rows);
    let previous_revenue = total_revenue(previous_rows);
    PeriodComparison {
        current,
        previous: current.previous(),
        current_revenue,
        previous_revenue,
        current_invoices: distinct_invoices(current_rows),
        previous_invoices: distinct_invoices(previous_rows),
        revenue_change_pct: growth_pct(current_revenue, previous_revenue),
    }
}

pub fn client_mix(index: &TableIndex<'_>, rows: &[SaleRow<'_>], period: DateRange) -> ClientMix {
    let mut revenue_by_client: BTreeMap<u32, Decimal> = BTreeMap::new();
    for row in rows {
        *revenue_by_client.entry(row.client.client_id).or_insert(Decimal::ZERO) += row.amount;
    }
    let mut mix = ClientMix::default();
    for (client_id, revenue) in revenue_by_client {
        let is_new = index
            .first_purchase
            .get(&client_id)
            .map_or(false, |first| *first >= period.start);
        if is_new {
            mix.new_clients += 1;
            mix.new_client_revenue += revenue;
        } else {
            mix.recurrent_clients += 1;
            mix.recurrent_client_revenue += revenue;
        }
    }
    mix
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(month: &str, revenue: Decimal) -> MonthlyPoint {
        MonthlyPoint { month: month.into(), revenue, invoices: 1, growth_pct: None }
    }

    #[test]
    fn growth_needs_positive_base() {
        assert_eq!(growth_pct(dec!(110), dec!(100)), Some(dec!(10.00)));
        assert_eq!(growth_pct(dec!(50), dec!(200)), Some(dec!(-75.00)));
        assert_eq!(growth_pct(dec!(50), Decimal::ZERO), None);
    }

    #[test]
    fn share_of_zero_total_is_zero() {
        assert_eq!(share_pct(dec!(5), Decimal::ZERO), Decimal::ZERO);
        assert_eq!(share_pct(dec!(1), dec!(3)), dec!(33.33));
    }

    #[test]
    fn peak_month_prefers_earliest_tie() {
        let series = vec![
            point("2023-01", dec!(10)),
            point("2023-02", dec!(30)),
            point("2023-03", dec!(30)),
        ];
        assert_eq!(peak_month(&series).as_deref(), Some("2023-02"));
        assert_eq!(peak_month(&[]), None);
    }
}
