use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreditNote {
    pub note_id: u64,
    pub invoice_id: u64,
    pub date: NaiveDate,
    pub client_id: u32,
    pub amount_mxn: Decimal,
    pub reason: String,
}
