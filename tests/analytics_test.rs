mod common;

use std::collections::{BTreeSet, HashMap};

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sai_alpha::{
    aggregate,
    models::{
        seller::GENERAL_SELLER_NAME, Client, Currency, Dataset, FxTable, Invoice, Product,
        SaleLine, Seller,
    },
    services::{analytics::KpiAggregator, currency::round_money},
    DateRange, KpiFilter,
};

use common::{dataset, date};

const BRAND_X: &str = "BrandX";

/// The generated dataset with every third product relabelled as `BrandX`.
fn with_brand_x() -> Dataset {
    let mut ds = dataset().clone();
    for product in ds.products.iter_mut().filter(|p| p.product_id % 3 == 0) {
        product.brand = BRAND_X.to_string();
    }
    ds
}

fn june_2023() -> DateRange {
    DateRange::new(date(2023, 6, 1), date(2023, 6, 30)).unwrap()
}

#[test]
fn brand_and_month_filter_sums_exactly_the_matching_lines() {
    let ds = with_brand_x();
    let brands: HashMap<u32, &str> =
        ds.products.iter().map(|p| (p.product_id, p.brand.as_str())).collect();
    let matching: Vec<&SaleLine> = ds
        .sales
        .iter()
        .filter(|s| june_2023().contains(s.sale_date) && brands[&s.product_id] == BRAND_X)
        .collect();
    assert!(!matching.is_empty());

    let filter = KpiFilter::new().with_range(june_2023()).with_brand(BRAND_X);
    let report = aggregate(&ds, &filter, Currency::MXN);

    let expected: Decimal = matching.iter().map(|s| s.amount_mxn).sum();
    assert_eq!(report.summary.revenue, expected);
    assert_eq!(report.summary.lines, matching.len());
    assert!(report.top_products.iter().all(|p| p.brand == BRAND_X));
    assert_eq!(report.revenue_by_brand.len(), 1);
    assert_eq!(report.revenue_by_brand[0].label, BRAND_X);
    assert_eq!(report.revenue_by_brand[0].share_pct, dec!(100));
    let months: Vec<&str> = report.monthly.iter().map(|m| m.month.as_str()).collect();
    assert_eq!(months, vec!["2023-06"]);
}

#[test]
fn usd_view_converts_each_line_at_its_own_rate() {
    let ds = with_brand_x();
    let filter = KpiFilter::new().with_range(june_2023()).with_brand(BRAND_X);
    let report = aggregate(&ds, &filter, Currency::USD);

    let brands: HashMap<u32, &str> =
        ds.products.iter().map(|p| (p.product_id, p.brand.as_str())).collect();
    let expected: Decimal = ds
        .sales
        .iter()
        .filter(|s| june_2023().contains(s.sale_date) && brands[&s.product_id] == BRAND_X)
        .map(|s| round_money(s.amount_mxn / ds.fx_rates.rate_on(s.sale_date).unwrap()))
        .sum();
    assert_eq!(report.currency, Currency::USD);
    assert_eq!(report.summary.revenue, expected);
}

/// One product, one client, two sellers and two 1000 MXN lines on days with different rates.
fn two_rate_dataset() -> Dataset {
    let product = Product {
        product_id: 1,
        sku: "SKU-0001".into(),
        name: "Guante nitrilo".into(),
        brand: "Andes".into(),
        category: "Seguridad".into(),
        cost_mxn: dec!(50.00),
        price_mxn: dec!(100.00),
        stock_qty: 40,
        min_stock: 10,
        max_stock: 200,
    };
    let client = Client {
        client_id: 1,
        name: "Ferretería Central".into(),
        origin: "Recomendación".into(),
        recommendation_source: "Ana López".into(),
        region: "Centro".into(),
        contact: "Luis Pérez".into(),
        status: "Activo".into(),
        last_purchase_date: date(2024, 2, 10),
    };
    let sellers = vec![
        Seller {
            seller_id: 1,
            name: "Carmen Ruiz".into(),
            region: "Centro".into(),
            team: "Mostrador".into(),
            is_general: false,
        },
        Seller {
            seller_id: 2,
            name: GENERAL_SELLER_NAME.into(),
            region: "Nacional".into(),
            team: "General".into(),
            is_general: true,
        },
    ];
    let mut fx_rates = FxTable::new();
    fx_rates.insert(date(2024, 1, 10), dec!(17.0000));
    fx_rates.insert(date(2024, 2, 10), dec!(20.0000));

    let days = [(1u64, date(2024, 1, 10), 1u32, dec!(17.0000)), (2, date(2024, 2, 10), 2, dec!(20.0000))];
    let invoices = days
        .iter()
        .map(|&(id, day, seller_id, rate)| Invoice {
            invoice_id: id,
            date: day,
            client_id: 1,
            client_name: client.name.clone(),
            seller_id,
            seller_name: sellers[seller_id as usize - 1].name.clone(),
            status: "Pagada".into(),
            invoice_type: "Contado".into(),
            order_type: "Normal".into(),
            subtotal_mxn: dec!(1000.00),
            total_mxn: dec!(1160.00),
            amount_usd: round_money(dec!(1160.00) / rate),
            currency: Currency::MXN,
            usd_mxn_rate: rate,
        })
        .collect();
    let sales = days
        .iter()
        .map(|&(id, day, seller_id, rate)| SaleLine {
            sale_id: id,
            invoice_id: id,
            sale_date: day,
            product_id: 1,
            client_id: 1,
            seller_id,
            origin: "Mostrador".into(),
            invoice_type: "Contado".into(),
            order_type: "Normal".into(),
            status: "Pagada".into(),
            quantity: 10,
            unit_price_mxn: dec!(100.00),
            amount_mxn: dec!(1000.00),
            amount_usd: round_money(dec!(1000.00) / rate),
            currency: Currency::MXN,
            usd_mxn_rate: rate,
        })
        .collect();

    Dataset {
        products: vec![product],
        clients: vec![client],
        sellers,
        fx_rates,
        sales,
        invoices,
        ..Default::default()
    }
}

#[test]
fn usd_total_differs_from_converting_the_total_at_an_average_rate() {
    let ds = two_rate_dataset();
    let report = aggregate(&ds, &KpiFilter::new(), Currency::USD);

    // 1000 / 17 = 58.82, 1000 / 20 = 50.00
    assert_eq!(report.summary.revenue, dec!(108.82));
    assert_eq!(report.summary.average_fx_rate, Some(dec!(18.5)));
    assert_ne!(report.summary.revenue, round_money(dec!(2000.00) / dec!(18.5)));

    let mxn = aggregate(&ds, &KpiFilter::new(), Currency::MXN);
    assert_eq!(mxn.summary.revenue, dec!(2000.00));
    assert_eq!(mxn.summary.invoices, 2);
    assert_eq!(mxn.summary.units, 20);
}

#[test]
fn seller_filter_keeps_only_that_sellers_lines() {
    let ds = two_rate_dataset();
    let filter = KpiFilter::new().with_seller(GENERAL_SELLER_NAME);
    let report = aggregate(&ds, &filter, Currency::MXN);

    assert_eq!(report.summary.lines, 1);
    assert_eq!(report.summary.revenue, dec!(1000.00));
    assert_eq!(report.top_sellers.len(), 1);
    assert_eq!(report.top_sellers[0].name, GENERAL_SELLER_NAME);
}

#[test]
fn empty_selection_yields_zeroed_report() {
    let ds = two_rate_dataset();
    let range = DateRange::new(date(2030, 1, 1), date(2030, 1, 31)).unwrap();
    let report = aggregate(&ds, &KpiFilter::new().with_range(range), Currency::USD);

    assert_eq!(report.summary.revenue, Decimal::ZERO);
    assert_eq!(report.summary.lines, 0);
    assert_eq!(report.summary.average_ticket, Decimal::ZERO);
    assert!(report.top_products.is_empty());
    assert!(report.monthly.is_empty());
    assert_eq!(report.peak_month, None);
    assert!(report.diagnostics.is_clean());
}

#[test]
fn aggregation_is_idempotent() {
    let ds = dataset();
    let filter = KpiFilter::new().with_range(june_2023());
    let aggregator = KpiAggregator::new(ds);
    let first = aggregator.aggregate(&filter, Currency::USD);
    let second = aggregator.aggregate(&filter, Currency::USD);
    assert_eq!(first, second);
    assert_eq!(first, aggregate(ds, &filter, Currency::USD));
}

#[test]
fn generated_dataset_aggregates_cleanly() {
    let ds = dataset();
    let report = aggregate(ds, &KpiFilter::new(), Currency::MXN);

    assert!(report.diagnostics.is_clean(), "{:?}", report.diagnostics);
    let total: Decimal = ds.sales.iter().map(|s| s.amount_mxn).sum();
    assert_eq!(report.summary.revenue, total);
    assert_eq!(report.summary.invoices, ds.invoices.len());
    assert_eq!(report.summary.credit_notes, ds.credit_notes.len());
    assert_eq!(
        report.summary.net_revenue,
        report.summary.revenue - report.summary.credit_notes_total
    );
    assert_eq!(report.monthly.len(), 12);
    assert!(report.top_products.len() <= 10);
    let monthly_sum: Decimal = report.monthly.iter().map(|m| m.revenue).sum();
    assert_eq!(monthly_sum, total);
}

#[test]
fn aging_buckets_partition_open_orders() {
    let ds = dataset();
    let report = aggregate(ds, &KpiFilter::new(), Currency::MXN);
    let open = &report.open_orders;

    assert_eq!(open.orders, ds.orders.iter().filter(|o| o.is_open()).count());
    assert_eq!(open.aging.iter().map(|b| b.orders).sum::<usize>(), open.orders);
    assert_eq!(open.aging.iter().map(|b| b.pending_units).sum::<u64>(), open.pending_units);
    assert_eq!(open.as_of, Some(date(2023, 12, 31)));
}

#[test]
fn orphaned_sale_lines_are_counted_not_summed() {
    let mut ds = two_rate_dataset();
    let mut orphan = ds.sales[0].clone();
    orphan.sale_id = 99;
    orphan.product_id = 9999;
    ds.sales.push(orphan);

    let report = aggregate(&ds, &KpiFilter::new(), Currency::MXN);
    assert_eq!(report.summary.revenue, dec!(2000.00));
    assert_eq!(report.diagnostics.foreign_key_mismatches.get("ventas.product_id"), Some(&1));
    assert_eq!(report.diagnostics.orphaned_rows(), 1);
}

#[test]
fn unknown_fx_dates_drop_usd_rows_but_keep_mxn_rows() {
    let mut ds = two_rate_dataset();
    ds.fx_rates = [(date(2024, 1, 10), dec!(17.0000))]
        .into_iter()
        .map(|(date, usd_mxn)| sai_alpha::models::FxRate { date, usd_mxn })
        .collect();

    let usd = aggregate(&ds, &KpiFilter::new(), Currency::USD);
    assert_eq!(usd.summary.revenue, dec!(58.82));
    assert_eq!(usd.diagnostics.unknown_date_rows, 1);
    assert_eq!(usd.diagnostics.unknown_dates, BTreeSet::from([date(2024, 2, 10)]));

    let mxn = aggregate(&ds, &KpiFilter::new(), Currency::MXN);
    assert_eq!(mxn.summary.revenue, dec!(2000.00));
    assert_eq!(mxn.diagnostics.rows_without_rate, 1);
    assert_eq!(mxn.summary.average_fx_rate, Some(dec!(17)));
}
