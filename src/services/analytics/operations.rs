//! Operational views: open orders and stock alerts.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;

use super::filter::{DateRange, KpiFilter};
use super::join::{Diagnostics, SaleRow, TableIndex};
use crate::models::{Currency, Order, Product};

/// Upper bounds (inclusive, in days) of the aging buckets; the last bucket is open-ended.
const AGING_BUCKETS: [(&str, i64); 4] = [("0-7", 7), ("8-14", 14), ("15-30", 30), ("30+", i64::MAX)];

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AgingBucket {
    pub label: &'static str,
    pub orders: usize,
    pub pending_units: u64,
    pub pending_value: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OpenOrders {
    /// Date ages are measured against
    pub as_of: Option<NaiveDate>,
    pub orders: usize,
    pub pending_units: u64,
    /// Pending units at list price, converted at each order's date
    pub pending_value: Decimal,
    pub average_age_days: Option<Decimal>,
    pub aging: Vec<AgingBucket>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StockAlert {
    pub product_id: u32,
    pub sku: String,
    pub name: String,
    pub brand: String,
    pub stock_qty: u32,
    pub min_stock: u32,
    pub max_stock: u32,
    /// Stock divided by the filtered daily sales velocity
    pub days_of_inventory: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InventoryStatus {
    pub products: usize,
    pub low_stock: Vec<StockAlert>,
    pub overstock: Vec<StockAlert>,
    /// Stock at cost, converted at the reference date
    pub inventory_value: Option<Decimal>,
}

fn bucket_of(age: i64) -> usize {
    AGING_BUCKETS
        .iter()
        .position(|(_, upper)| age <= *upper)
        .unwrap_or(AGING_BUCKETS.len() - 1)
}

pub fn open_orders(
    index: &TableIndex<'_>,
    orders: &[Order],
    filter: &KpiFilter,
    view: Currency,
    as_of: Option<NaiveDate>,
    diagnostics: &mut Diagnostics,
) -> OpenOrders {
    let mut buckets: Vec<AgingBucket> = AGING_BUCKETS
        .iter()
        .map(|(label, _)| AgingBucket {
            label: *label,
            orders: 0,
            pending_units: 0,
            pending_value: Decimal::ZERO,
        })
        .collect();
    let mut count = 0usize;
    let mut units = 0u64;
    let mut value = Decimal::ZERO;
    let mut age_total = 0i64;

    for order in orders {
        let Some(product) = index.products.get(&order.product_id).copied() else {
            diagnostics.orphan("pedidos.product_id");
            continue;
        };
        if !index.clients.contains_key(&order.client_id) {
            diagnostics.orphan("pedidos.client_id");
            continue;
        }
        let Some(seller) = index.sellers.get(&order.seller_id).copied() else {
            diagnostics.orphan("pedidos.seller_id");
            continue;
        };
        if !order.is_open() || !filter.matches(order.date, &product.brand, &seller.name) {
            continue;
        }
        let list_value = Decimal::from(order.qty_pending) * product.price_mxn;
        let Ok(pending_value) = index.converter.from_mxn(list_value, view, order.date) else {
            diagnostics.unknown_date(order.date);
            continue;
        };

        let age = as_of.map(|d| order.age_days(d)).unwrap_or(0);
        let bucket = &mut buckets[bucket_of(age)];
        bucket.orders += 1;
        bucket.pending_units += u64::from(order.qty_pending);
        bucket.pending_value += pending_value;

        count += 1;
        units += u64::from(order.qty_pending);
        value += pending_value;
        age_total += age;
    }

    let average_age_days = (count > 0).then(|| {
        (Decimal::from(age_total) / Decimal::from(count as u64)).round_dp(1)
    });

    OpenOrders {
        as_of,
        orders: count,
        pending_units: units,
        pending_value: value,
        average_age_days,
        aging: buckets,
    }
}

/// Stock alerts and the inventory value at cost, converted at `as_of`. The value is left
/// empty when no rate exists for that day.
pub fn inventory_status(
    products: &[Product],
    rows: &[SaleRow<'_>],
    filter: &KpiFilter,
    period: Option<DateRange>,
    index: &TableIndex<'_>,
    view: Currency,
    as_of: Option<NaiveDate>,
) -> InventoryStatus {
    let mut sold: BTreeMap<u32, u64> = BTreeMap::new();
    for row in rows {
        *sold.entry(row.product.product_id).or_insert(0) += u64::from(row.line.quantity);
    }
    let days = period.map(|p| p.days()).unwrap_or(0);

    let alert = |p: &Product| {
        let units = sold.get(&p.product_id).copied().unwrap_or(0);
        let days_of_inventory = (units > 0 && days > 0).then(|| {
            let velocity = Decimal::from(units) / Decimal::from(days);
            (Decimal::from(p.stock_qty) / velocity).round_dp(1)
        });
        StockAlert {
            product_id: p.product_id,
            sku: p.sku.clone(),
            name: p.name.clone(),
            brand: p.brand.clone(),
            stock_qty: p.stock_qty,
            min_stock: p.min_stock,
            max_stock: p.max_stock,
            days_of_inventory,
        }
    };

    let in_scope: Vec<&Product> = products.iter().filter(|p| filter.matches_brand(&p.brand)).collect();
    let stock_cost: Decimal = in_scope
        .iter()
        .map(|p| Decimal::from(p.stock_qty) * p.cost_mxn)
        .sum();
    let inventory_value = match as_of {
        Some(date) => index.converter.from_mxn(stock_cost, view, date).ok(),
        None if view == Currency::MXN => Some(stock_cost),
        None => None,
    };

    InventoryStatus {
        products: in_scope.len(),
        low_stock: in_scope.iter().filter(|p| p.is_low_stock()).map(|p| alert(*p)).collect(),
        overstock: in_scope.iter().filter(|p| p.is_overstock()).map(|p| alert(*p)).collect(),
        inventory_value,
    }
}
