//! Test module.
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

//! Tests for the bit-field decoder

use super::*;
use crate::bitfield::EnumTable;
use crate::properties::{PropertyField, PropertySpec};
use crate::transport::{PropertyBag, PropertyValue};
use crate::domains::{self, DomainId, Layout};

static LADDER: EnumTable = EnumTable::new(&[(0, "MitigationUnsupported"), (1, "MitigationDisabled"), (3, "Mitigated")]);

static FIELDS: [FieldSpec; 6] = [
    FieldSpec::flag("Enabled", 0),
    FieldSpec::uint("Width", 1, 6),
    FieldSpec::reserved(7, 1),
    FieldSpec::enumeration("Status", 8, 2, &LADDER),
    FieldSpec::reserved(10, 22),
    FieldSpec::flag("Late", 32),
];

static SPEC: BitFieldSpec = BitFieldSpec { name: "test", min_len: 2, max_len: 5, fields: &FIELDS };

#[test]
fn test_decode_basic_fields() {
    // Enabled=1, Width=0b101010, Status=3, Late=1
    let raw = [0b0101_0101, 0b0000_0011, 0, 0, 1];
    let record = decode(&raw, &SPEC).unwrap();

    assert_eq!(record.flag("Enabled"), Some(true));
    assert_eq!(record.uint("Width"), Some(0b10_1010));
    assert_eq!(record.enum_name("Status"), Some("Mitigated"));
    assert_eq!(record.flag("Late"), Some(true));
}

#[test]
fn test_reserved_fields_not_surfaced() {
    let record = decode(&[0xFF; 5], &SPEC).unwrap();
    assert_eq!(record.names().collect::<Vec<_>>(), vec!["Enabled", "Width", "Status", "Late"]);
    assert!(!record.contains("Reserved"));
}

#[test]
fn test_decode_is_deterministic() {
    let raw = [0x5A, 0x02, 0x00, 0x80, 0x01];
    assert_eq!(decode(&raw, &SPEC).unwrap(), decode(&raw, &SPEC).unwrap());
}

#[test]
fn test_truncated_blob_leaves_trailing_fields_absent() {
    // Truncated at the Flags/Late boundary: Late is absent, no error
    let record = decode(&[0x01, 0x01, 0x00, 0x00], &SPEC).unwrap();
    assert_eq!(record.flag("Enabled"), Some(true));
    assert_eq!(record.enum_name("Status"), Some("MitigationDisabled"));
    assert!(record.contains("Late"));
    assert!(record.is_absent("Late"));
}

#[test]
fn test_too_short_rejected() {
    let err = decode(&[0x01], &SPEC).unwrap_err();
    assert_eq!(err, DecodeError::TooShort { layout: "test", actual: 1, minimum: 2 });
}

#[test]
fn test_unmapped_enum_code_is_synthetic_value() {
    // Status=2 is not in the table
    let record = decode(&[0x00, 0x02], &SPEC).unwrap();
    assert_eq!(record.enum_name("Status"), Some("Unknown code: 2"));
}

#[test]
fn test_every_enum_code_decodes() {
    for code in 0u8..4 {
        let record = decode(&[0x00, code], &SPEC).unwrap();
        assert!(record.get("Status").is_some(), "code {}", code);
    }
}

#[test]
fn test_extract_bits_across_bytes() {
    let raw = [0b1100_0000, 0b0000_0011];
    assert_eq!(extract_bits(&raw, 6, 4), Some(0b1111));
    assert_eq!(extract_bits(&raw, 6, 11), None);
    assert_eq!(extract_bits(&raw, 0, 0), None);
    assert_eq!(extract_bits(&[0xFF; 8], 0, 64), Some(u64::MAX));
}

#[test]
fn test_kva_shadow_word_decodes() {
    let spec = match domains::catalog().get(DomainId::KvaShadow).unwrap().layout {
        Layout::Bits(spec) => spec,
        Layout::Properties(_) => panic!("kva-shadow is bit-packed"),
    };
    // Enabled, RequiredAvailable, InvalidPteBit=45, L1TF mitigation present
    let word: u32 = 1 | (1 << 5) | (45 << 6) | (1 << 13);
    let record = decode(&word.to_le_bytes(), spec).unwrap();

    assert_eq!(record.flag("KvaShadowEnabled"), Some(true));
    assert_eq!(record.flag("KvaShadowRequired"), Some(false));
    assert_eq!(record.flag("KvaShadowRequiredAvailable"), Some(true));
    assert_eq!(record.uint("InvalidPteBit"), Some(45));
    assert_eq!(record.flag("L1DataCacheFlushSupported"), Some(false));
    assert_eq!(record.flag("L1TerminalFaultMitigationPresent"), Some(true));
}

#[test]
fn test_speculation_control_short_blob_drops_flags2() {
    let spec = match domains::catalog().get(DomainId::SpeculationControl).unwrap().layout {
        Layout::Bits(spec) => spec,
        Layout::Properties(_) => panic!("speculation-control is bit-packed"),
    };
    let record = decode(&[0x01, 0x00, 0x00, 0x00], spec).unwrap();
    assert_eq!(record.flag("BpbEnabled"), Some(true));
    assert!(record.is_absent("BhbEnabled"));
    assert!(record.is_absent("GdsStatus"));
}

static VBS: EnumTable = EnumTable::new(&[(0, "NotEnabled"), (1, "EnabledNotRunning"), (2, "Running")]);

static PROPERTY_FIELDS: [PropertyField; 6] = [
    PropertyField::enumeration("VirtualizationBasedSecurityStatus", &VBS),
    PropertyField::flag("VirtualMachineIsolation"),
    PropertyField::member("HvciRunning", "SecurityServicesRunning", 2),
    PropertyField::text("BuildNumber"),
    PropertyField::uint("OperatingSystemSKU"),
    PropertyField::derived("CpuVendor"),
];

static PROPERTIES: PropertySpec = PropertySpec { name: "test", fields: &PROPERTY_FIELDS };

#[test]
fn test_decode_properties() {
    let mut bag = PropertyBag::new();
    bag.insert("virtualizationbasedsecuritystatus", PropertyValue::UInt(2));
    bag.insert("SecurityServicesRunning", PropertyValue::List(vec![1, 2]));
    bag.insert("BuildNumber", PropertyValue::UInt(22631));
    bag.insert("OperatingSystemSKU", PropertyValue::Text(" 48 ".into()));

    let record = decode_properties(&bag, &PROPERTIES);
    assert_eq!(record.len(), 6);
    assert_eq!(record.uint("OperatingSystemSKU"), Some(48));
    assert_eq!(record.enum_name("VirtualizationBasedSecurityStatus"), Some("Running"));
    assert!(record.is_absent("VirtualMachineIsolation"));
    assert_eq!(record.flag("HvciRunning"), Some(true));
    assert_eq!(record.get("BuildNumber"), Some(&FieldValue::Text("22631".into())));
    assert!(record.is_absent("CpuVendor"));
}

#[test]
fn test_wrong_shape_property_is_absent() {
    let mut bag = PropertyBag::new();
    bag.insert("SecurityServicesRunning", PropertyValue::Text("2".into()));
    bag.insert("VirtualizationBasedSecurityStatus", PropertyValue::UInt(9));

    let record = decode_properties(&bag, &PROPERTIES);
    assert!(record.is_absent("HvciRunning"));
    assert_eq!(record.enum_name("VirtualizationBasedSecurityStatus"), Some("Unknown code: 9"));
}
