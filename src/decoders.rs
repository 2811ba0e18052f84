//! Decoders turning raw blobs and property bags into ordered feature records.
//!
//! Decoding is total past the minimum-length check: fields that the blob is too short to
//! cover come back absent (newer bits are appended in later OS builds), and enumeration codes
//! missing from the symbolic table become `Unknown code: N` values.

use crate::bitfield::{BitFieldSpec, FieldKind, FieldSpec};
use crate::error::DecodeError;
use crate::properties::{PropertyKind, PropertySpec};
use crate::transport::{PropertyBag, PropertyValue};
use crate::types::{EnumValue, FeatureRecord, FieldValue};

/// Decode a raw blob against its layout
pub fn decode(raw: &[u8], spec: &BitFieldSpec) -> Result<FeatureRecord, DecodeError> {
    if raw.len() < spec.min_len {
        return Err(DecodeError::TooShort { layout: spec.name, actual: raw.len(), minimum: spec.min_len });
    }

    let mut record = FeatureRecord::with_capacity(spec.fields.len());
    for field in spec.visible_fields() {
        let value = extract_bits(raw, field.offset, field.width).map(|bits| convert(field, bits));
        record.push(field.name, value);
    }
    Ok(record)
}

/// Read `width` bits starting at `offset`, low bit first. `None` when the range runs past the
/// end of `raw`.
pub fn extract_bits(raw: &[u8], offset: u32, width: u32) -> Option<u64> {
    if width == 0 || width > 64 {
        return None;
    }
    let end = offset as usize + width as usize;
    if end > raw.len() * 8 {
        return None;
    }

    let mut value = 0u64;
    for i in 0..width {
        let bit = offset + i;
        let byte = raw[(bit / 8) as usize];
        if (byte >> (bit % 8)) & 1 == 1 {
            value |= 1u64 << i;
        }
    }
    Some(value)
}

fn convert(field: &FieldSpec, bits: u64) -> FieldValue {
    match field.kind {
        FieldKind::Bool => FieldValue::Bool(bits != 0),
        FieldKind::UInt | FieldKind::Reserved => FieldValue::UInt(bits),
        FieldKind::Enum(table) => FieldValue::Enum(
            table.name_of(bits).map_or_else(|| EnumValue::unmapped(bits), |name| EnumValue::known(bits, name)),
        ),
    }
}

/// Decode a CIM property bag. Missing properties, and values of the wrong shape, come back
/// absent; this never fails.
pub fn decode_properties(bag: &PropertyBag, spec: &PropertySpec) -> FeatureRecord {
    let mut record = FeatureRecord::with_capacity(spec.fields.len());
    for field in spec.fields {
        let value = match field.kind {
            PropertyKind::Derived => None,
            kind => bag.get(field.property).and_then(|raw| convert_property(raw, kind)),
        };
        record.push(field.name, value);
    }
    record
}

fn convert_property(raw: &PropertyValue, kind: PropertyKind) -> Option<FieldValue> {
    match (kind, raw) {
        (PropertyKind::Bool, PropertyValue::Bool(b)) => Some(FieldValue::Bool(*b)),
        (PropertyKind::Bool, PropertyValue::UInt(n)) => Some(FieldValue::Bool(*n != 0)),
        (PropertyKind::UInt, PropertyValue::UInt(n)) => Some(FieldValue::UInt(*n)),
        (PropertyKind::UInt, PropertyValue::Text(s)) => s.trim().parse().ok().map(FieldValue::UInt),
        (PropertyKind::Enum(table), PropertyValue::UInt(code)) => Some(FieldValue::Enum(
            table.name_of(*code).map_or_else(|| EnumValue::unmapped(*code), |name| EnumValue::known(*code, name)),
        )),
        (PropertyKind::Text, PropertyValue::Text(s)) => Some(FieldValue::Text(s.clone())),
        (PropertyKind::Text, PropertyValue::UInt(n)) => Some(FieldValue::Text(n.to_string())),
        (PropertyKind::Text, PropertyValue::Bool(b)) => Some(FieldValue::Text(b.to_string())),
        (PropertyKind::Contains { code }, PropertyValue::List(codes)) => Some(FieldValue::Bool(codes.contains(&code))),
        _ => None,
    }
}

#[cfg(test)]
#[path = "decoders_test.rs"]
mod tests;
