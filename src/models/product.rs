use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub product_id: u32,
    pub sku: String,
    pub name: String,
    pub brand: String,
    pub category: String,
    pub cost_mxn: Decimal,
    pub price_mxn: Decimal,
    pub stock_qty: u32,
    pub min_stock: u32,
    pub max_stock: u32,
}

impl Product {
    pub fn is_low_stock(&self) -> bool {
        self.stock_qty <= self.min_stock
    }

    pub fn is_overstock(&self) -> bool {
        self.stock_qty >= self.max_stock
    }
}
