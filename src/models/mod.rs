pub mod client;
pub mod credit_note;
pub mod fx_rate;
pub mod invoice;
pub mod order;
pub mod product;
pub mod sale_line;
pub mod seller;

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};

pub use client::Client;
pub use credit_note::CreditNote;
pub use fx_rate::{FxRate, FxTable};
pub use invoice::Invoice;
pub use order::{Order, OrderStatus};
pub use product::Product;
pub use sale_line::SaleLine;
pub use seller::Seller;

/// Billing / reporting currency.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    AsRefStr,
)]
#[strum(ascii_case_insensitive)]
pub enum Currency {
    MXN,
    USD,
}

impl Default for Currency {
    fn default() -> Self {
        Self::MXN
    }
}

/// The complete table set produced by one generation run.
///
/// Rows are kept in generation order (ascending ids); nothing in here is mutated by the
/// analytics layer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    pub products: Vec<Product>,
    pub clients: Vec<Client>,
    pub sellers: Vec<Seller>,
    pub fx_rates: FxTable,
    pub sales: Vec<SaleLine>,
    pub invoices: Vec<Invoice>,
    pub credit_notes: Vec<CreditNote>,
    pub orders: Vec<Order>,
}

/// Row count of one table, as reported by `inspect`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableCount {
    pub table: &'static str,
    pub rows: usize,
}

impl Dataset {
    pub fn table_counts(&self) -> Vec<TableCount> {
        vec![
            TableCount { table: "productos", rows: self.products.len() },
            TableCount { table: "clientes", rows: self.clients.len() },
            TableCount { table: "vendedores", rows: self.sellers.len() },
            TableCount { table: "tipo_cambio", rows: self.fx_rates.len() },
            TableCount { table: "ventas", rows: self.sales.len() },
            TableCount { table: "facturas", rows: self.invoices.len() },
            TableCount { table: "notas_credito", rows: self.credit_notes.len() },
            TableCount { table: "pedidos", rows: self.orders.len() },
        ]
    }
}
