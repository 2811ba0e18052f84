//! Declarative bit layouts for raw mitigation status blobs.
//!
//! A [`BitFieldSpec`] is a static, ordered list of [`FieldSpec`]s over a little-endian blob
//! (bit 0 is the low bit of byte 0). Reserved ranges are declared so overlap checks cover
//! them, but the decoder never surfaces them.

use std::fmt;

/// Closed symbolic table for an enumeration field
#[derive(Debug, Clone, Copy)]
pub struct EnumTable {
    pub entries: &'static [(u64, &'static str)],
}

impl EnumTable {
    pub const fn new(entries: &'static [(u64, &'static str)]) -> Self {
        Self { entries }
    }

    pub fn name_of(&self, code: u64) -> Option<&'static str> {
        self.entries.iter().find(|(c, _)| *c == code).map(|(_, n)| *n)
    }

    pub fn code_of(&self, name: &str) -> Option<u64> {
        self.entries.iter().find(|(_, n)| *n == name).map(|(c, _)| *c)
    }
}

/// How the extracted bits are interpreted
#[derive(Debug, Clone, Copy)]
pub enum FieldKind {
    Bool,
    UInt,
    Enum(&'static EnumTable),
    Reserved,
}

impl FieldKind {
    pub const fn is_reserved(&self) -> bool {
        matches!(self, Self::Reserved)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub name: &'static str,
    pub offset: u32,
    pub width: u32,
    pub kind: FieldKind,
}

impl FieldSpec {
    pub const fn flag(name: &'static str, offset: u32) -> Self {
        Self { name, offset, width: 1, kind: FieldKind::Bool }
    }

    pub const fn uint(name: &'static str, offset: u32, width: u32) -> Self {
        Self { name, offset, width, kind: FieldKind::UInt }
    }

    pub const fn enumeration(name: &'static str, offset: u32, width: u32, table: &'static EnumTable) -> Self {
        Self { name, offset, width, kind: FieldKind::Enum(table) }
    }

    pub const fn reserved(offset: u32, width: u32) -> Self {
        Self { name: "Reserved", offset, width, kind: FieldKind::Reserved }
    }

    /// One past the last bit this field occupies
    pub const fn end(&self) -> u32 {
        self.offset + self.width
    }
}

/// Layout of one domain's raw blob
#[derive(Debug, Clone, Copy)]
pub struct BitFieldSpec {
    pub name: &'static str,
    /// Bytes covering the oldest known version of the structure
    pub min_len: usize,
    /// Bytes of the newest known version; also the buffer size requested from the transport
    pub max_len: usize,
    pub fields: &'static [FieldSpec],
}

/// Why a layout table is malformed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LayoutViolation {
    ZeroWidth { field: &'static str },
    TooWide { field: &'static str, width: u32 },
    Overlap { first: &'static str, second: &'static str },
    ExceedsBlob { field: &'static str, end: u32, bits: u32 },
    BoolWidth { field: &'static str },
    MinExceedsMax { min_len: usize, max_len: usize },
    DuplicateName { field: &'static str },
}

impl fmt::Display for LayoutViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ZeroWidth { field } => write!(f, "{} has zero width", field),
            Self::TooWide { field, width } => write!(f, "{} is {} bits wide (max 64)", field, width),
            Self::Overlap { first, second } => write!(f, "{} overlaps {}", first, second),
            Self::ExceedsBlob { field, end, bits } => {
                write!(f, "{} ends at bit {} beyond a {}-bit blob", field, end, bits)
            }
            Self::BoolWidth { field } => write!(f, "{} is a bool wider than one bit", field),
            Self::MinExceedsMax { min_len, max_len } => {
                write!(f, "minimum length {} exceeds maximum {}", min_len, max_len)
            }
            Self::DuplicateName { field } => write!(f, "{} is declared twice", field),
        }
    }
}

impl BitFieldSpec {
    /// Fields the decoder surfaces, in declaration order
    pub fn visible_fields(&self) -> impl Iterator<Item = &'static FieldSpec> {
        self.fields.iter().filter(|f| !f.kind.is_reserved())
    }

    pub fn field(&self, name: &str) -> Option<&'static FieldSpec> {
        self.fields.iter().find(|f| f.name == name && !f.kind.is_reserved())
    }

    /// Check that ranges are non-empty, non-overlapping, and fit the blob
    pub fn validate(&self) -> Result<(), LayoutViolation> {
        if self.min_len > self.max_len {
            return Err(LayoutViolation::MinExceedsMax { min_len: self.min_len, max_len: self.max_len });
        }
        let bits = (self.max_len * 8) as u32;

        for (i, field) in self.fields.iter().enumerate() {
            if field.width == 0 {
                return Err(LayoutViolation::ZeroWidth { field: field.name });
            }
            if field.width > 64 {
                return Err(LayoutViolation::TooWide { field: field.name, width: field.width });
            }
            if matches!(field.kind, FieldKind::Bool) && field.width != 1 {
                return Err(LayoutViolation::BoolWidth { field: field.name });
            }
            if field.end() > bits {
                return Err(LayoutViolation::ExceedsBlob { field: field.name, end: field.end(), bits });
            }
            for other in &self.fields[i + 1..] {
                if field.offset < other.end() && other.offset < field.end() {
                    return Err(LayoutViolation::Overlap { first: field.name, second: other.name });
                }
                if !field.kind.is_reserved() && field.name == other.name {
                    return Err(LayoutViolation::DuplicateName { field: field.name });
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    static STATUS: EnumTable = EnumTable::new(&[(0, "Off"), (1, "On")]);

    #[test]
    fn test_valid_layout() {
        static FIELDS: [FieldSpec; 4] = [
            FieldSpec::flag("A", 0),
            FieldSpec::enumeration("B", 1, 2, &STATUS),
            FieldSpec::reserved(3, 5),
            FieldSpec::uint("C", 8, 8),
        ];
        let spec = BitFieldSpec { name: "test", min_len: 1, max_len: 2, fields: &FIELDS };
        assert_eq!(spec.validate(), Ok(()));
        assert_eq!(spec.visible_fields().map(|f| f.name).collect::<Vec<_>>(), vec!["A", "B", "C"]);
    }

    #[test]
    fn test_overlap_rejected() {
        static FIELDS: [FieldSpec; 2] = [FieldSpec::uint("A", 0, 4), FieldSpec::flag("B", 3)];
        let spec = BitFieldSpec { name: "test", min_len: 1, max_len: 1, fields: &FIELDS };
        assert_eq!(spec.validate(), Err(LayoutViolation::Overlap { first: "A", second: "B" }));
    }

    #[test]
    fn test_field_beyond_blob_rejected() {
        static FIELDS: [FieldSpec; 1] = [FieldSpec::flag("A", 8)];
        let spec = BitFieldSpec { name: "test", min_len: 1, max_len: 1, fields: &FIELDS };
        assert!(matches!(spec.validate(), Err(LayoutViolation::ExceedsBlob { .. })));
    }

    #[test]
    fn test_min_exceeds_max_rejected() {
        let spec = BitFieldSpec { name: "test", min_len: 8, max_len: 4, fields: &[] };
        assert!(matches!(spec.validate(), Err(LayoutViolation::MinExceedsMax { .. })));
    }

    #[test]
    fn test_enum_table_lookup() {
        assert_eq!(STATUS.name_of(1), Some("On"));
        assert_eq!(STATUS.name_of(7), None);
        assert_eq!(STATUS.code_of("Off"), Some(0));
    }
}
