//! Byte-level value codec shared by every strategy
//!
//! Each value is framed as a one-byte type marker followed by a fixed-width
//! or length-prefixed payload, little-endian throughout. Every strategy that
//! stores whole values (dictionary tables, run values, general and
//! passthrough streams) frames them through this module so blobs decode
//! identically no matter which strategy produced them.

use crate::compression::traits::{CompressionError, CompressionResult};
use crate::types::Value;

const TAG_INTEGER: u8 = 0;
const TAG_DOUBLE: u8 = 1;
const TAG_BOOLEAN: u8 = 2;
const TAG_TEXT: u8 = 3;
const TAG_BYTES: u8 = 4;

/// Serialized size of a single value, marker included
pub fn encoded_size(value: &Value) -> usize {
    match value {
        Value::Integer(_) => 9,
        Value::Double(_) => 9,
        Value::Boolean(_) => 2,
        Value::Text(s) => 5 + s.len(),
        Value::Bytes(b) => 5 + b.len(),
    }
}

/// Serialized size of a value sequence
pub fn encoded_len(values: &[Value]) -> usize {
    values.iter().map(encoded_size).sum()
}

/// Appends one framed value to the buffer
pub fn write_value(buf: &mut Vec<u8>, value: &Value) {
    match value {
        Value::Integer(i) => {
            buf.push(TAG_INTEGER);
            buf.extend_from_slice(&i.to_le_bytes());
        }
        Value::Double(d) => {
            buf.push(TAG_DOUBLE);
            buf.extend_from_slice(&d.to_le_bytes());
        }
        Value::Boolean(b) => {
            buf.push(TAG_BOOLEAN);
            buf.push(u8::from(*b));
        }
        Value::Text(s) => {
            buf.push(TAG_TEXT);
            buf.extend_from_slice(&(s.len() as u32).to_le_bytes());
            buf.extend_from_slice(s.as_bytes());
        }
        Value::Bytes(b) => {
            buf.push(TAG_BYTES);
            buf.extend_from_slice(&(b.len() as u32).to_le_bytes());
            buf.extend_from_slice(b);
        }
    }
}

/// Appends a framed value sequence to the buffer
pub fn write_values(buf: &mut Vec<u8>, values: &[Value]) {
    for value in values {
        write_value(buf, value);
    }
}

/// Serializes a value sequence into a fresh buffer
pub fn serialize(values: &[Value]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(encoded_len(values));
    write_values(&mut buf, values);
    buf
}

/// Takes `len` bytes from the stream, advancing the offset
pub fn take<'a>(bytes: &'a [u8], offset: &mut usize, len: usize) -> CompressionResult<&'a [u8]> {
    if *offset + len > bytes.len() {
        return Err(CompressionError::CorruptedData(format!(
            "need {} bytes at offset {}, stream holds {}",
            len,
            *offset,
            bytes.len()
        )));
    }
    let slice = &bytes[*offset..*offset + len];
    *offset += len;
    Ok(slice)
}

/// Reads a little-endian u32 from the stream
pub fn read_u32(bytes: &[u8], offset: &mut usize) -> CompressionResult<u32> {
    let raw = take(bytes, offset, 4)?;
    Ok(u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]))
}

/// Reads one framed value from the stream
pub fn read_value(bytes: &[u8], offset: &mut usize) -> CompressionResult<Value> {
    let marker = take(bytes, offset, 1)?[0];
    match marker {
        TAG_INTEGER => {
            let raw = take(bytes, offset, 8)?;
            let mut buf = [0u8; 8];
            buf.copy_from_slice(raw);
            Ok(Value::Integer(i64::from_le_bytes(buf)))
        }
        TAG_DOUBLE => {
            let raw = take(bytes, offset, 8)?;
            let mut buf = [0u8; 8];
            buf.copy_from_slice(raw);
            Ok(Value::Double(f64::from_le_bytes(buf)))
        }
        TAG_BOOLEAN => {
            let raw = take(bytes, offset, 1)?;
            Ok(Value::Boolean(raw[0] != 0))
        }
        TAG_TEXT => {
            let len = read_u32(bytes, offset)? as usize;
            let raw = take(bytes, offset, len)?;
            let s = String::from_utf8(raw.to_vec())
                .map_err(|e| CompressionError::CorruptedData(format!("invalid UTF-8: {}", e)))?;
            Ok(Value::Text(s))
        }
        TAG_BYTES => {
            let len = read_u32(bytes, offset)? as usize;
            let raw = take(bytes, offset, len)?;
            Ok(Value::Bytes(raw.to_vec()))
        }
        _ => Err(CompressionError::CorruptedData(format!(
            "invalid type marker: {}",
            marker
        ))),
    }
}

/// Reads exactly `count` framed values from the stream
pub fn read_values(bytes: &[u8], count: usize) -> CompressionResult<Vec<Value>> {
    let mut offset = 0;
    let mut values = Vec::with_capacity(count);
    for _ in 0..count {
        values.push(read_value(bytes, &mut offset)?);
    }
    if offset != bytes.len() {
        return Err(CompressionError::CorruptedData(format!(
            "{} trailing bytes after {} values",
            bytes.len() - offset,
            count
        )));
    }
    Ok(values)
}
