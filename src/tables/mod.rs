//! dBase table files: schemas, codec, and the dataset writer / loader.

pub mod dbase;
pub mod loader;
pub mod records;
pub mod schema;
pub mod writer;

pub use dbase::{decode_table, encode_table};
pub use loader::{dataset_exists, load_dataset, read_table};
pub use schema::{FieldKind, FieldSpec, RowView, TableRecord, TableSchema, Value};
pub use writer::{write_dataset, write_table};
