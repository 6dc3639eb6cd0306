use chrono::NaiveDate;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::fmt;

use crate::errors::TableError;

/// dBase field types used by the dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// `C`: fixed-width text, left aligned
    Character,
    /// `N`: right-aligned decimal text
    Numeric,
    /// `D`: `YYYYMMDD`
    Date,
    /// `L`: `T` / `F`
    Logical,
}

impl FieldKind {
    pub fn code(self) -> u8 {
        match self {
            Self::Character => b'C',
            Self::Numeric => b'N',
            Self::Date => b'D',
            Self::Logical => b'L',
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            b'C' => Some(Self::Character),
            b'N' | b'F' => Some(Self::Numeric),
            b'D' => Some(Self::Date),
            b'L' => Some(Self::Logical),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    /// Column name, at most 10 ASCII characters
    pub name: &'static str,
    pub kind: FieldKind,
    pub length: u8,
    pub decimals: u8,
}

impl FieldSpec {
    pub const fn character(name: &'static str, length: u8) -> Self {
        Self { name, kind: FieldKind::Character, length, decimals: 0 }
    }

    pub const fn numeric(name: &'static str, length: u8, decimals: u8) -> Self {
        Self { name, kind: FieldKind::Numeric, length, decimals }
    }

    pub const fn date(name: &'static str) -> Self {
        Self { name, kind: FieldKind::Date, length: 8, decimals: 0 }
    }

    pub const fn logical(name: &'static str) -> Self {
        Self { name, kind: FieldKind::Logical, length: 1, decimals: 0 }
    }
}

/// Column layout of one table file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableSchema {
    /// File stem, e.g. `ventas` for `ventas.dbf`
    pub name: &'static str,
    pub fields: &'static [FieldSpec],
}

impl TableSchema {
    pub fn file_name(&self) -> String {
        format!("{}.dbf", self.name)
    }

    pub fn position(&self, column: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == column)
    }

    /// Bytes per record, deletion flag included.
    pub fn record_length(&self) -> usize {
        1 + self.fields.iter().map(|f| usize::from(f.length)).sum::<usize>()
    }
}

/// A single decoded cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Text(String),
    Number(Decimal),
    Date(NaiveDate),
    Bool(bool),
    Null,
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Text(s) => write!(f, "{}", s),
            Value::Number(n) => write!(f, "{}", n),
            Value::Date(d) => write!(f, "{}", d),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Null => f.write_str("NULL"),
        }
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<Decimal> for Value {
    fn from(v: Decimal) -> Self {
        Value::Number(v)
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::Number(Decimal::from(v))
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        Value::Number(Decimal::from(v))
    }
}

impl From<NaiveDate> for Value {
    fn from(v: NaiveDate) -> Self {
        Value::Date(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

/// Named, typed access to one decoded row laid out per `schema`.
pub struct RowView<'a> {
    schema: &'a TableSchema,
    values: &'a [Value],
}

impl<'a> RowView<'a> {
    pub fn new(schema: &'a TableSchema, values: &'a [Value]) -> Self {
        Self { schema, values }
    }

    fn get(&self, column: &str) -> Result<&'a Value, TableError> {
        self.schema
            .position(column)
            .and_then(|idx| self.values.get(idx))
            .ok_or_else(|| TableError::schema(self.schema.name, format!("no column {}", column)))
    }

    fn mismatch(&self, column: &str, expected: &str, got: &Value) -> TableError {
        TableError::schema(
            self.schema.name,
            format!("column {} expected {}, found `{}`", column, expected, got),
        )
    }

    pub fn text(&self, column: &str) -> Result<String, TableError> {
        match self.get(column)? {
            Value::Text(s) => Ok(s.clone()),
            Value::Null => Ok(String::new()),
            other => Err(self.mismatch(column, "text", other)),
        }
    }

    pub fn decimal(&self, column: &str) -> Result<Decimal, TableError> {
        match self.get(column)? {
            Value::Number(n) => Ok(*n),
            other => Err(self.mismatch(column, "number", other)),
        }
    }

    pub fn u32(&self, column: &str) -> Result<u32, TableError> {
        let n = self.decimal(column)?;
        if !n.fract().is_zero() {
            return Err(self.mismatch(column, "integer", &Value::Number(n)));
        }
        n.to_u32()
            .ok_or_else(|| self.mismatch(column, "unsigned 32-bit integer", &Value::Number(n)))
    }

    pub fn u64(&self, column: &str) -> Result<u64, TableError> {
        let n = self.decimal(column)?;
        if !n.fract().is_zero() {
            return Err(self.mismatch(column, "integer", &Value::Number(n)));
        }
        n.to_u64()
            .ok_or_else(|| self.mismatch(column, "unsigned 64-bit integer", &Value::Number(n)))
    }

    pub fn date(&self, column: &str) -> Result<NaiveDate, TableError> {
        match self.get(column)? {
            Value::Date(d) => Ok(*d),
            other => Err(self.mismatch(column, "date", other)),
        }
    }

    pub fn bool(&self, column: &str) -> Result<bool, TableError> {
        match self.get(column)? {
            Value::Bool(b) => Ok(*b),
            Value::Null => Ok(false),
            other => Err(self.mismatch(column, "logical", other)),
        }
    }

    /// Parses a text column into any `FromStr` label type.
    pub fn parsed<T: std::str::FromStr>(&self, column: &str) -> Result<T, TableError> {
        let raw = self.text(column)?;
        raw.parse::<T>()
            .map_err(|_| self.mismatch(column, "known label", &Value::Text(raw.clone())))
    }
}

/// A row type stored in its own table file.
pub trait TableRecord: Sized {
    const SCHEMA: TableSchema;

    fn to_row(&self) -> Vec<Value>;

    fn from_row(row: &RowView<'_>) -> Result<Self, TableError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use rust_decimal_macros::dec;

    const FIELDS: &[FieldSpec] = &[
        FieldSpec::numeric("ID", 6, 0),
        FieldSpec::character("NAME", 10),
        FieldSpec::numeric("PRICE", 10, 2),
    ];
    const SCHEMA: TableSchema = TableSchema { name: "demo", fields: FIELDS };

    #[test]
    fn record_length_counts_deletion_flag() {
        assert_eq!(SCHEMA.record_length(), 27);
        assert_eq!(SCHEMA.file_name(), "demo.dbf");
    }

    #[test]
    fn row_view_reads_typed_cells() {
        let values = vec![Value::from(7u32), Value::from("Andes"), Value::from(dec!(12.50))];
        let row = RowView::new(&SCHEMA, &values);
        assert_eq!(row.u32("ID").unwrap(), 7);
        assert_eq!(row.text("NAME").unwrap(), "Andes");
        assert_eq!(row.decimal("PRICE").unwrap(), dec!(12.5));
    }

    #[test]
    fn row_view_rejects_wrong_types() {
        let values = vec![Value::from(dec!(7.5)), Value::Null, Value::from("x")];
        let row = RowView::new(&SCHEMA, &values);
        assert_matches!(row.u32("ID"), Err(TableError::SchemaMismatch { .. }));
        assert_matches!(row.decimal("PRICE"), Err(TableError::SchemaMismatch { .. }));
        assert_matches!(row.text("MISSING"), Err(TableError::SchemaMismatch { .. }));
        assert_eq!(row.text("NAME").unwrap(), "");
    }
}
