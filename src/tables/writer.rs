use chrono::NaiveDate;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info, instrument, warn};

use super::dbase::encode_table;
use super::schema::TableRecord;
use crate::errors::TableError;
use crate::models::{Dataset, FxRate};

/// A fully encoded table sitting in a temporary file next to its target.
struct StagedTable {
    table: &'static str,
    target: PathBuf,
    file: NamedTempFile,
}

fn stage<R: TableRecord>(dir: &Path, rows: &[R], stamp: NaiveDate) -> Result<StagedTable, TableError> {
    let schema = R::SCHEMA;
    let encoded: Vec<_> = rows.iter().map(R::to_row).collect();
    let bytes = encode_table(&schema, &encoded, stamp)?;

    let mut file = NamedTempFile::new_in(dir)?;
    file.write_all(&bytes)?;
    file.as_file().sync_all()?;

    debug!(table = schema.name, rows = rows.len(), bytes = bytes.len(), "Table staged");
    Ok(StagedTable {
        table: schema.name,
        target: dir.join(schema.file_name()),
        file,
    })
}

/// Renames every staged file over its target. If one rename fails, the targets already
/// replaced get their previous contents back (or are removed when they did not exist).
/// Staged files not yet renamed are deleted on drop.
fn commit(staged: Vec<StagedTable>) -> Result<Vec<PathBuf>, TableError> {
    let mut replaced: Vec<(PathBuf, Option<Vec<u8>>)> = Vec::with_capacity(staged.len());
    for table in staged {
        let previous = fs::read(&table.target).ok();
        if let Err(source) = table.file.persist(&table.target) {
            restore(&replaced);
            return Err(TableError::Persist {
                table: table.table.to_string(),
                source,
            });
        }
        replaced.push((table.target, previous));
    }
    Ok(replaced.into_iter().map(|(path, _)| path).collect())
}

fn restore(replaced: &[(PathBuf, Option<Vec<u8>>)]) {
    for (target, previous) in replaced.iter().rev() {
        let outcome = match previous {
            Some(bytes) => rewrite(target, bytes),
            None => fs::remove_file(target).map_err(TableError::from),
        };
        if let Err(e) = outcome {
            warn!(path = %target.display(), error = %e, "Could not restore table after failed write");
        }
    }
}

fn rewrite(target: &Path, bytes: &[u8]) -> Result<(), TableError> {
    let dir = target.parent().unwrap_or_else(|| Path::new("."));
    let mut file = NamedTempFile::new_in(dir)?;
    file.write_all(bytes)?;
    file.as_file().sync_all()?;
    file.persist(target).map_err(|source| TableError::Persist {
        table: target.display().to_string(),
        source,
    })?;
    Ok(())
}

/// Writes one table file atomically: the bytes land in a temporary file inside `dir`
/// which is then renamed over `<dir>/<table>.dbf`.
pub fn write_table<R: TableRecord>(
    dir: &Path,
    rows: &[R],
    stamp: NaiveDate,
) -> Result<PathBuf, TableError> {
    let staged = stage(dir, rows, stamp)?;
    let mut paths = commit(vec![staged])?;
    paths.pop().ok_or_else(|| TableError::malformed(R::SCHEMA.name, "nothing written"))
}

/// Serializes every table of `dataset` into `dir`, creating it if needed.
///
/// All eight tables are encoded and staged before any existing file is replaced, so an
/// encoding or I/O failure leaves the previous dataset in place.
/// The header date of every file is the last FX calendar day, so the same dataset always
/// yields the same bytes.
#[instrument(skip_all, fields(dir = %dir.display()))]
pub fn write_dataset(dir: &Path, dataset: &Dataset) -> Result<Vec<PathBuf>, TableError> {
    fs::create_dir_all(dir)?;
    let stamp = dataset
        .fx_rates
        .last_date()
        .or_else(|| dataset.sales.iter().map(|s| s.sale_date).max())
        .unwrap_or_default();

    let fx_rows: Vec<FxRate> = dataset.fx_rates.iter().collect();
    let staged = vec![
        stage(dir, &dataset.products, stamp)?,
        stage(dir, &dataset.clients, stamp)?,
        stage(dir, &dataset.sellers, stamp)?,
        stage(dir, &fx_rows, stamp)?,
        stage(dir, &dataset.sales, stamp)?,
        stage(dir, &dataset.invoices, stamp)?,
        stage(dir, &dataset.credit_notes, stamp)?,
        stage(dir, &dataset.orders, stamp)?,
    ];
    let paths = commit(staged)?;

    info!(tables = paths.len(), "Dataset written");
    Ok(paths)
}
