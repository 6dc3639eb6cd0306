use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::Currency;

/// One product line of an invoice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaleLine {
    pub sale_id: u64,
    pub invoice_id: u64,
    pub sale_date: NaiveDate,
    pub product_id: u32,
    pub client_id: u32,
    pub seller_id: u32,
    pub origin: String,
    pub invoice_type: String,
    pub order_type: String,
    pub status: String,
    pub quantity: u32,
    pub unit_price_mxn: Decimal,
    pub amount_mxn: Decimal,
    pub amount_usd: Decimal,
    pub currency: Currency,
    /// MXN per USD on `sale_date`
    pub usd_mxn_rate: Decimal,
}
