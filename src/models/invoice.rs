use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::Currency;

/// Invoice header. Client and seller names are denormalized copies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invoice {
    pub invoice_id: u64,
    pub date: NaiveDate,
    pub client_id: u32,
    pub client_name: String,
    pub seller_id: u32,
    pub seller_name: String,
    pub status: String,
    pub invoice_type: String,
    pub order_type: String,
    pub subtotal_mxn: Decimal,
    pub total_mxn: Decimal,
    pub amount_usd: Decimal,
    pub currency: Currency,
    pub usd_mxn_rate: Decimal,
}
