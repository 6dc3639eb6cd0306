use serde::{Deserialize, Serialize};

/// Name of the catch-all seller that absorbs unattributed sales.
pub const GENERAL_SELLER_NAME: &str = "VENTAS GENERALES";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Seller {
    pub seller_id: u32,
    pub name: String,
    pub region: String,
    pub team: String,
    pub is_general: bool,
}
