use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Client {
    pub client_id: u32,
    pub name: String,
    /// How the client first reached us (web, counter, referral...)
    pub origin: String,
    pub recommendation_source: String,
    pub region: String,
    pub contact: String,
    pub status: String,
    pub last_purchase_date: NaiveDate,
}
