//! Minimal dBase III codec.
//!
//! Layout: 32-byte header, one 32-byte descriptor per field, `0x0D` terminator,
//! fixed-width records each led by a deletion flag, then `0x1A`. Text is Latin-1.

use bytes::{Buf, BufMut, BytesMut};
use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use std::str::FromStr;

use super::schema::{FieldKind, FieldSpec, TableSchema, Value};
use crate::errors::TableError;

const VERSION_DBASE3: u8 = 0x03;
const HEADER_LEN: usize = 32;
const DESCRIPTOR_LEN: usize = 32;
const HEADER_TERMINATOR: u8 = 0x0D;
const EOF_MARKER: u8 = 0x1A;
const RECORD_ACTIVE: u8 = b' ';
const RECORD_DELETED: u8 = b'*';
/// Windows ANSI (cp1252) language driver id
const LANGUAGE_DRIVER: u8 = 0x03;
const FIELD_NAME_LEN: usize = 11;

/// Encodes `rows` (cells in schema order) into a complete table file.
///
/// `stamp` becomes the header's last-update date so output depends only on the inputs.
pub fn encode_table(
    schema: &TableSchema,
    rows: &[Vec<Value>],
    stamp: NaiveDate,
) -> Result<BytesMut, TableError> {
    let header_len = HEADER_LEN + DESCRIPTOR_LEN * schema.fields.len() + 1;
    let record_len = schema.record_length();
    let record_count = u32::try_from(rows.len())
        .map_err(|_| TableError::malformed(schema.name, "too many records"))?;
    let header_len_u16 = u16::try_from(header_len)
        .map_err(|_| TableError::malformed(schema.name, "too many fields"))?;
    let record_len_u16 = u16::try_from(record_len)
        .map_err(|_| TableError::malformed(schema.name, "record too wide"))?;

    let mut buf = BytesMut::with_capacity(header_len + record_len * rows.len() + 1);

    buf.put_u8(VERSION_DBASE3);
    buf.put_u8(year_byte(stamp));
    buf.put_u8(stamp.month() as u8);
    buf.put_u8(stamp.day() as u8);
    buf.put_u32_le(record_count);
    buf.put_u16_le(header_len_u16);
    buf.put_u16_le(record_len_u16);
    buf.put_bytes(0, 17);
    buf.put_u8(LANGUAGE_DRIVER);
    buf.put_bytes(0, 2);

    for field in schema.fields {
        put_descriptor(&mut buf, schema, field)?;
    }
    buf.put_u8(HEADER_TERMINATOR);

    for (idx, row) in rows.iter().enumerate() {
        if row.len() != schema.fields.len() {
            return Err(TableError::schema(
                schema.name,
                format!(
                    "row {} has {} cells, schema has {} fields",
                    idx,
                    row.len(),
                    schema.fields.len()
                ),
            ));
        }
        buf.put_u8(RECORD_ACTIVE);
        for (field, value) in schema.fields.iter().zip(row) {
            let cell = encode_cell(schema, field, value)?;
            buf.put_slice(&cell);
        }
    }
    buf.put_u8(EOF_MARKER);
    Ok(buf)
}

/// Decodes a table file into rows laid out per `schema`.
///
/// Fields are matched by name, so extra file columns and column order do not matter; a
/// schema column absent from the file is a schema mismatch. Deleted records are skipped.
pub fn decode_table(schema: &TableSchema, data: &[u8]) -> Result<Vec<Vec<Value>>, TableError> {
    if data.len() < HEADER_LEN + 1 {
        return Err(TableError::malformed(schema.name, "file shorter than header"));
    }
    let mut header = &data[..HEADER_LEN];
    let version = header.get_u8();
    if version & 0x07 != VERSION_DBASE3 {
        return Err(TableError::malformed(
            schema.name,
            format!("unsupported version byte 0x{:02X}", version),
        ));
    }
    header.advance(3);
    let record_count = header.get_u32_le() as usize;
    let header_len = usize::from(header.get_u16_le());
    let record_len = usize::from(header.get_u16_le());

    if header_len < HEADER_LEN + 1 || header_len > data.len() {
        return Err(TableError::malformed(
            schema.name,
            format!("header length {} out of bounds", header_len),
        ));
    }

    let descriptors = read_descriptors(schema, &data[HEADER_LEN..header_len])?;
    let file_record_len = 1 + descriptors.iter().map(|d| d.length).sum::<usize>();
    if file_record_len != record_len {
        return Err(TableError::malformed(
            schema.name,
            format!(
                "record length {} disagrees with field sizes ({})",
                record_len, file_record_len
            ),
        ));
    }

    let layout = schema
        .fields
        .iter()
        .map(|field| {
            let descriptor = descriptors
                .iter()
                .find(|d| d.name.eq_ignore_ascii_case(field.name))
                .ok_or_else(|| {
                    TableError::schema(schema.name, format!("missing column {}", field.name))
                })?;
            if descriptor.kind != field.kind {
                return Err(TableError::schema(
                    schema.name,
                    format!(
                        "column {} has type {:?}, expected {:?}",
                        field.name, descriptor.kind, field.kind
                    ),
                ));
            }
            Ok((field, descriptor.offset, descriptor.length))
        })
        .collect::<Result<Vec<_>, TableError>>()?;

    let body = &data[header_len..];
    let needed = record_count
        .checked_mul(record_len)
        .ok_or_else(|| TableError::malformed(schema.name, "record count overflow"))?;
    if body.len() < needed {
        return Err(TableError::malformed(
            schema.name,
            format!(
                "truncated: {} records of {} bytes need {} bytes, found {}",
                record_count,
                record_len,
                needed,
                body.len()
            ),
        ));
    }

    let mut rows = Vec::with_capacity(record_count);
    for record in body[..needed].chunks_exact(record_len) {
        match record[0] {
            RECORD_DELETED => continue,
            RECORD_ACTIVE => {}
            flag => {
                return Err(TableError::malformed(
                    schema.name,
                    format!("bad deletion flag 0x{:02X}", flag),
                ))
            }
        }
        let row = layout
            .iter()
            .map(|(field, offset, length)| {
                decode_cell(schema, field, &record[*offset..*offset + *length])
            })
            .collect::<Result<Vec<_>, TableError>>()?;
        rows.push(row);
    }
    Ok(rows)
}

struct Descriptor {
    name: String,
    kind: FieldKind,
    /// Offset inside a record, deletion flag included
    offset: usize,
    length: usize,
}

fn read_descriptors(schema: &TableSchema, mut area: &[u8]) -> Result<Vec<Descriptor>, TableError> {
    let mut descriptors = Vec::new();
    let mut offset = 1;
    loop {
        match area.first() {
            Some(&HEADER_TERMINATOR) => break,
            Some(_) if area.len() >= DESCRIPTOR_LEN => {}
            _ => {
                return Err(TableError::malformed(
                    schema.name,
                    "field descriptors not terminated",
                ))
            }
        }
        let raw_name = &area[..FIELD_NAME_LEN];
        let name_end = raw_name.iter().position(|b| *b == 0).unwrap_or(FIELD_NAME_LEN);
        let name = String::from_utf8_lossy(&raw_name[..name_end]).trim().to_string();
        area.advance(FIELD_NAME_LEN);
        let code = area.get_u8();
        area.advance(4);
        let length = usize::from(area.get_u8());
        let _decimals = area.get_u8();
        area.advance(14);

        let kind = FieldKind::from_code(code).ok_or_else(|| {
            TableError::malformed(
                schema.name,
                format!("column {} has unsupported type `{}`", name, code as char),
            )
        })?;
        descriptors.push(Descriptor { name, kind, offset, length });
        offset += length;
    }
    Ok(descriptors)
}

fn put_descriptor(
    buf: &mut BytesMut,
    schema: &TableSchema,
    field: &FieldSpec,
) -> Result<(), TableError> {
    let name = field.name.as_bytes();
    if name.is_empty() || name.len() > FIELD_NAME_LEN - 1 || !field.name.is_ascii() {
        return Err(TableError::schema(
            schema.name,
            format!("invalid column name `{}`", field.name),
        ));
    }
    buf.put_slice(name);
    buf.put_bytes(0, FIELD_NAME_LEN - name.len());
    buf.put_u8(field.kind.code());
    buf.put_bytes(0, 4);
    buf.put_u8(field.length);
    buf.put_u8(field.decimals);
    buf.put_bytes(0, 14);
    Ok(())
}

fn year_byte(date: NaiveDate) -> u8 {
    (date.year() - 1900).clamp(0, 255) as u8
}

fn encode_cell(schema: &TableSchema, field: &FieldSpec, value: &Value) -> Result<Vec<u8>, TableError> {
    let width = usize::from(field.length);
    let overflow = || TableError::Overflow {
        table: schema.name.to_string(),
        column: field.name.to_string(),
        value: value.to_string(),
    };
    let mismatch = || {
        TableError::schema(
            schema.name,
            format!("column {} cannot store `{}`", field.name, value),
        )
    };

    let cell = match (field.kind, value) {
        (_, Value::Null) => vec![b' '; width],
        (FieldKind::Character, Value::Text(text)) => {
            let mut bytes: Vec<u8> = text.chars().take(width).map(latin1_byte).collect();
            bytes.resize(width, b' ');
            bytes
        }
        (FieldKind::Numeric, Value::Number(n)) => {
            let text = format_number(*n, u32::from(field.decimals));
            if text.len() > width {
                return Err(overflow());
            }
            format!("{:>width$}", text, width = width).into_bytes()
        }
        (FieldKind::Date, Value::Date(d)) => d.format("%Y%m%d").to_string().into_bytes(),
        (FieldKind::Logical, Value::Bool(b)) => vec![if *b { b'T' } else { b'F' }],
        _ => return Err(mismatch()),
    };
    Ok(cell)
}

fn decode_cell(schema: &TableSchema, field: &FieldSpec, raw: &[u8]) -> Result<Value, TableError> {
    let bad = |what: &str| {
        TableError::malformed(
            schema.name,
            format!("column {}: {} `{}`", field.name, what, latin1_string(raw).trim()),
        )
    };
    match field.kind {
        FieldKind::Character => {
            let text = latin1_string(raw);
            let trimmed = text.trim_end_matches([' ', '\0']);
            if trimmed.is_empty() {
                Ok(Value::Null)
            } else {
                Ok(Value::Text(trimmed.to_string()))
            }
        }
        FieldKind::Numeric => {
            let text = latin1_string(raw);
            let trimmed = text.trim();
            if trimmed.is_empty() {
                return Ok(Value::Null);
            }
            Decimal::from_str(trimmed)
                .map(Value::Number)
                .map_err(|_| bad("invalid number"))
        }
        FieldKind::Date => {
            let text = latin1_string(raw);
            let trimmed = text.trim();
            if trimmed.is_empty() || trimmed.chars().all(|c| c == '0') {
                return Ok(Value::Null);
            }
            NaiveDate::parse_from_str(trimmed, "%Y%m%d")
                .map(Value::Date)
                .map_err(|_| bad("invalid date"))
        }
        FieldKind::Logical => match raw.first() {
            Some(b'T' | b't' | b'Y' | b'y') => Ok(Value::Bool(true)),
            Some(b'F' | b'f' | b'N' | b'n') => Ok(Value::Bool(false)),
            Some(b' ' | b'?') | None => Ok(Value::Null),
            Some(_) => Err(bad("invalid logical")),
        },
    }
}

/// Fixed-point text with exactly `decimals` digits after the point.
fn format_number(n: Decimal, decimals: u32) -> String {
    let mut rounded = n.round_dp(decimals);
    rounded.rescale(decimals);
    rounded.to_string()
}

fn latin1_byte(c: char) -> u8 {
    u8::try_from(u32::from(c)).unwrap_or(b'?')
}

fn latin1_string(raw: &[u8]) -> String {
    raw.iter().map(|b| char::from(*b)).collect()
}
