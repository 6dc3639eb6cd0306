//! CSV export of report views.

use serde::Serialize;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{info, instrument};

use crate::errors::{Result, ServiceError, TableError};
use crate::services::analytics::{KpiReport, SaleView};

/// Writes any list of flat rows as CSV with a header line, empty lists included.
pub fn write_view<W: Write, T: Serialize + Default>(writer: W, rows: &[T]) -> Result<()> {
    let mut csv = csv::Writer::from_writer(writer);
    if rows.is_empty() {
        csv.write_record(&header_of::<T>()?)?;
    }
    for row in rows {
        csv.serialize(row)?;
    }
    csv.flush().map_err(|e| ServiceError::Table(TableError::Io(e)))?;
    Ok(())
}

/// Column names of `T`, taken from the header csv emits for a default row.
fn header_of<T: Serialize + Default>() -> Result<csv::StringRecord> {
    let mut scratch = csv::Writer::from_writer(Vec::new());
    scratch.serialize(T::default())?;
    let bytes = scratch
        .into_inner()
        .map_err(|e| ServiceError::Table(TableError::Io(e.into_error())))?;
    let mut reader = csv::Reader::from_reader(bytes.as_slice());
    Ok(reader.headers()?.clone())
}

fn write_file<T: Serialize + Default>(dir: &Path, name: &str, rows: &[T]) -> Result<PathBuf> {
    let path = dir.join(name);
    let file = fs::File::create(&path).map_err(TableError::Io)?;
    write_view(file, rows)?;
    Ok(path)
}

/// Exports the tabular views of `report` (and the in-filter sales) into `dir`.
#[instrument(skip_all, fields(dir = %dir.display()))]
pub fn export_report(dir: &Path, report: &KpiReport, sales: &[SaleView]) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(dir).map_err(TableError::Io)?;
    let files = vec![
        write_file(dir, "resumen.csv", std::slice::from_ref(&report.summary))?,
        write_file(dir, "top_productos.csv", &report.top_products)?,
        write_file(dir, "top_clientes.csv", &report.top_clients)?,
        write_file(dir, "top_vendedores.csv", &report.top_sellers)?,
        write_file(dir, "ventas_por_marca.csv", &report.revenue_by_brand)?,
        write_file(dir, "ventas_por_canal.csv", &report.revenue_by_channel)?,
        write_file(dir, "serie_mensual.csv", &report.monthly)?,
        write_file(dir, "antiguedad_pedidos.csv", &report.open_orders.aging)?,
        write_file(dir, "stock_bajo.csv", &report.inventory.low_stock)?,
        write_file(dir, "sobrestock.csv", &report.inventory.overstock)?,
        write_file(dir, "ventas.csv", sales)?,
    ];
    info!(files = files.len(), "Report exported");
    Ok(files)
}
