use std::fs;
use std::path::Path;
use tracing::{debug, info, instrument};

use super::dbase::decode_table;
use super::schema::{RowView, TableRecord};
use crate::errors::TableError;
use crate::models::{Client, CreditNote, Dataset, FxRate, Invoice, Order, Product, SaleLine, Seller};

/// File names of every table making up a dataset.
pub fn table_files() -> [String; 8] {
    [
        Product::SCHEMA.file_name(),
        Client::SCHEMA.file_name(),
        Seller::SCHEMA.file_name(),
        FxRate::SCHEMA.file_name(),
        SaleLine::SCHEMA.file_name(),
        Invoice::SCHEMA.file_name(),
        CreditNote::SCHEMA.file_name(),
        Order::SCHEMA.file_name(),
    ]
}

/// True when every table file exists and is non-empty.
pub fn dataset_exists(dir: &Path) -> bool {
    table_files().iter().all(|name| {
        fs::metadata(dir.join(name))
            .map(|m| m.is_file() && m.len() > 0)
            .unwrap_or(false)
    })
}

/// Reads `<dir>/<table>.dbf` into typed rows. Either every row decodes or the call fails.
pub fn read_table<R: TableRecord>(dir: &Path) -> Result<Vec<R>, TableError> {
    let schema = R::SCHEMA;
    let path = dir.join(schema.file_name());
    let data = fs::read(&path)?;
    let rows = decode_table(&schema, &data)?;
    let records = rows
        .iter()
        .map(|values| R::from_row(&RowView::new(&schema, values)))
        .collect::<Result<Vec<_>, _>>()?;
    debug!(table = schema.name, rows = records.len(), "Table loaded");
    Ok(records)
}

/// Loads the whole table set held in `dir`.
#[instrument(skip_all, fields(dir = %dir.display()))]
pub fn load_dataset(dir: &Path) -> Result<Dataset, TableError> {
    let fx_rows: Vec<FxRate> = read_table(dir)?;
    let dataset = Dataset {
        products: read_table(dir)?,
        clients: read_table(dir)?,
        sellers: read_table(dir)?,
        fx_rates: fx_rows.into_iter().collect(),
        sales: read_table(dir)?,
        invoices: read_table(dir)?,
        credit_notes: read_table(dir)?,
        orders: read_table(dir)?,
    };
    info!(
        products = dataset.products.len(),
        sales = dataset.sales.len(),
        invoices = dataset.invoices.len(),
        fx_days = dataset.fx_rates.len(),
        "Dataset loaded"
    );
    Ok(dataset)
}
