//! Declarative field lists for domains read from CIM property bags

use crate::bitfield::EnumTable;

#[derive(Debug, Clone, Copy)]
pub enum PropertyKind {
    Bool,
    UInt,
    Enum(&'static EnumTable),
    Text,
    /// True when `code` appears in an array-valued property
    Contains { code: u64 },
    /// Never read from the bag; filled in by the classifier
    Derived,
}

#[derive(Debug, Clone, Copy)]
pub struct PropertyField {
    /// Name surfaced in the record
    pub name: &'static str,
    /// CIM property the value is read from
    pub property: &'static str,
    pub kind: PropertyKind,
}

impl PropertyField {
    pub const fn flag(name: &'static str) -> Self {
        Self { name, property: name, kind: PropertyKind::Bool }
    }

    pub const fn uint(name: &'static str) -> Self {
        Self { name, property: name, kind: PropertyKind::UInt }
    }

    pub const fn enumeration(name: &'static str, table: &'static EnumTable) -> Self {
        Self { name, property: name, kind: PropertyKind::Enum(table) }
    }

    pub const fn text(name: &'static str) -> Self {
        Self { name, property: name, kind: PropertyKind::Text }
    }

    pub const fn member(name: &'static str, property: &'static str, code: u64) -> Self {
        Self { name, property, kind: PropertyKind::Contains { code } }
    }

    pub const fn derived(name: &'static str) -> Self {
        Self { name, property: "", kind: PropertyKind::Derived }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct PropertySpec {
    pub name: &'static str,
    pub fields: &'static [PropertyField],
}

impl PropertySpec {
    pub fn field(&self, name: &str) -> Option<&'static PropertyField> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Names must be unique across the list
    pub fn has_unique_names(&self) -> bool {
        self.fields
            .iter()
            .enumerate()
            .all(|(i, f)| self.fields[i + 1..].iter().all(|other| other.name != f.name))
    }
}
