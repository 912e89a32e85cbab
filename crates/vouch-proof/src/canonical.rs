//! Field canonicalization.
//!
//! `tag ‖ len32(name) ‖ name ‖ payload`, where numeric, boolean and address
//! payloads are fixed width big-endian and string/bytes payloads carry a
//! `u32` length prefix.

use std::collections::HashSet;

use serde_json::Value;

use crate::error::{ProofError, ProofResult};
use crate::types::{CanonicalEncoding, Field, FieldType, FieldValue, RawField};

/// Width of the uint/int payload.
pub const WORD_LEN: usize = 32;

/// Width of the address payload.
pub const ADDRESS_LEN: usize = 20;

/// Encode `field` for position `index`.
///
/// Pure function of `(name, declared_type, value, index)`. The name is
/// encoded so that two fields of equal value cannot trade places unnoticed;
/// the index is recorded and enters the leaf digest.
pub fn canonicalize(field: &Field, index: u32) -> ProofResult<CanonicalEncoding> {
    if field.declared_type != field.value.field_type() {
        return Err(type_mismatch(
            &field.name,
            field.declared_type,
            field.value.field_type().as_str(),
        ));
    }

    let mut bytes = vec![field.declared_type.tag()];
    push_length_prefixed(&mut bytes, &field.name, field.name.as_bytes())?;
    match &field.value {
        FieldValue::Uint(v) => {
            let mut word = [0u8; WORD_LEN];
            word[WORD_LEN - 16..].copy_from_slice(&v.to_be_bytes());
            bytes.extend_from_slice(&word);
        }
        FieldValue::Int(v) => {
            let fill = if *v < 0 { 0xff } else { 0x00 };
            let mut word = [fill; WORD_LEN];
            word[WORD_LEN - 16..].copy_from_slice(&v.to_be_bytes());
            bytes.extend_from_slice(&word);
        }
        FieldValue::Bool(b) => bytes.push(u8::from(*b)),
        FieldValue::Address(a) => bytes.extend_from_slice(a),
        FieldValue::String(s) => push_length_prefixed(&mut bytes, &field.name, s.as_bytes())?,
        FieldValue::Bytes(b) => push_length_prefixed(&mut bytes, &field.name, b)?,
    }

    Ok(CanonicalEncoding { index, bytes })
}

fn push_length_prefixed(out: &mut Vec<u8>, name: &str, payload: &[u8]) -> ProofResult<()> {
    let len = u32::try_from(payload.len()).map_err(|_| ProofError::TypeMismatch {
        field: name.to_string(),
        declared: "length-prefixed value".into(),
        found: format!("{} bytes", payload.len()),
    })?;
    out.extend_from_slice(&len.to_be_bytes());
    out.extend_from_slice(payload);
    Ok(())
}

/// Record-level checks: non-empty, addressable, named, unique names.
pub fn validate_record(fields: &[Field]) -> ProofResult<()> {
    if fields.is_empty() {
        return Err(ProofError::EmptyRecord);
    }
    if u32::try_from(fields.len()).is_err() {
        return Err(ProofError::TooManyFields(fields.len()));
    }

    let mut seen = HashSet::with_capacity(fields.len());
    for (position, field) in fields.iter().enumerate() {
        if field.name.is_empty() {
            return Err(ProofError::EmptyFieldName(position));
        }
        if !seen.insert(field.name.as_str()) {
            return Err(ProofError::DuplicateField(field.name.clone()));
        }
    }
    Ok(())
}

// ----- Loosely-typed input -----

/// Parse a JSON array of `{ name, type, value }` objects into fields,
/// keeping declaration order.
pub fn fields_from_json(value: Value) -> ProofResult<Vec<Field>> {
    let raw: Vec<RawField> = serde_json::from_value(value).map_err(|e| ProofError::TypeMismatch {
        field: "<record>".into(),
        declared: "array of { name, type, value }".into(),
        found: e.to_string(),
    })?;
    raw.into_iter().map(coerce_raw_field).collect()
}

/// Resolve a loosely-typed field into the tagged union.
pub fn coerce_raw_field(raw: RawField) -> ProofResult<Field> {
    let declared: FieldType = raw.declared_type.parse()?;
    let name = raw.name;

    let value = match (declared, &raw.value) {
        (FieldType::Uint, Value::Number(n)) => n.as_u64().map(|v| FieldValue::Uint(v.into())),
        (FieldType::Uint, Value::String(s)) => s.parse::<u128>().ok().map(FieldValue::Uint),
        (FieldType::Int, Value::Number(n)) => n.as_i64().map(|v| FieldValue::Int(v.into())),
        (FieldType::Int, Value::String(s)) => s.parse::<i128>().ok().map(FieldValue::Int),
        (FieldType::Bool, Value::Bool(b)) => Some(FieldValue::Bool(*b)),
        (FieldType::String, Value::String(s)) => Some(FieldValue::String(s.clone())),
        (FieldType::Bytes, Value::String(s)) => decode_hex(s).map(FieldValue::Bytes),
        (FieldType::Address, Value::String(s)) => decode_hex(s)
            .and_then(|b| <[u8; ADDRESS_LEN]>::try_from(b).ok())
            .map(FieldValue::Address),
        _ => None,
    };

    match value {
        Some(value) => Ok(Field {
            name,
            declared_type: declared,
            value,
        }),
        None => Err(type_mismatch(&name, declared, &describe_json(&raw.value))),
    }
}

/// Wire form of a field. Integers that fit a JSON number are emitted as
/// numbers, wider ones as decimal strings.
pub fn to_raw_field(field: &Field) -> RawField {
    let value = match &field.value {
        FieldValue::Uint(v) => match u64::try_from(*v) {
            Ok(small) => Value::from(small),
            Err(_) => Value::String(v.to_string()),
        },
        FieldValue::Int(v) => match i64::try_from(*v) {
            Ok(small) => Value::from(small),
            Err(_) => Value::String(v.to_string()),
        },
        FieldValue::Bool(b) => Value::Bool(*b),
        FieldValue::String(s) => Value::String(s.clone()),
        FieldValue::Bytes(b) => Value::String(format!("0x{}", hex::encode(b))),
        FieldValue::Address(a) => Value::String(format!("0x{}", hex::encode(a))),
    };

    RawField {
        name: field.name.clone(),
        declared_type: field.declared_type.as_str().to_string(),
        value,
    }
}

fn decode_hex(s: &str) -> Option<Vec<u8>> {
    hex::decode(s.strip_prefix("0x").unwrap_or(s)).ok()
}

fn describe_json(value: &Value) -> String {
    match value {
        Value::Null => "null".into(),
        Value::Bool(_) => "bool".into(),
        Value::Number(n) if n.is_f64() => "fractional number".into(),
        Value::Number(n) if n.is_i64() && n.as_i64().is_some_and(|v| v < 0) => {
            "negative number".into()
        }
        Value::Number(_) => "number".into(),
        Value::String(s) => format!("string {:?}", s),
        Value::Array(_) => "array".into(),
        Value::Object(_) => "object".into(),
    }
}

fn type_mismatch(name: &str, declared: FieldType, found: &str) -> ProofError {
    ProofError::TypeMismatch {
        field: name.to_string(),
        declared: declared.to_string(),
        found: found.to_string(),
    }
}
