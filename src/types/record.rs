//! Decoded field values and the ordered record that holds them

use serde::ser::{Serialize, SerializeMap, Serializer};
use std::borrow::Cow;
use std::fmt;

/// Symbolic value of an enumeration field.
///
/// `code` is `None` when the value was inferred by a classifier rather than read from raw bits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumValue {
    pub code: Option<u64>,
    pub name: Cow<'static, str>,
}

impl EnumValue {
    pub fn known(code: u64, name: &'static str) -> Self {
        Self { code: Some(code), name: Cow::Borrowed(name) }
    }

    /// Value for a code missing from the symbolic table. Future codes are valid, not errors.
    pub fn unmapped(code: u64) -> Self {
        Self { code: Some(code), name: Cow::Owned(format!("Unknown code: {}", code)) }
    }

    pub fn inferred(name: &'static str) -> Self {
        Self { code: None, name: Cow::Borrowed(name) }
    }
}

impl Serialize for EnumValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.name)
    }
}

/// A typed field value
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Bool(bool),
    UInt(u64),
    Enum(EnumValue),
    Text(String),
}

impl FieldValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Self::UInt(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_enum(&self) -> Option<&EnumValue> {
        match self {
            Self::Enum(e) => Some(e),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(true) => f.write_str("True"),
            Self::Bool(false) => f.write_str("False"),
            Self::UInt(n) => write!(f, "{}", n),
            Self::Enum(e) => f.write_str(&e.name),
            Self::Text(s) => f.write_str(s),
        }
    }
}

/// One named slot of a record. `value == None` means the field is absent on this OS build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub name: &'static str,
    pub value: Option<FieldValue>,
    /// Set when a classifier synthesized the value instead of reading it
    pub inferred: bool,
}

/// Ordered mapping `name -> value | absent`.
///
/// Insertion order is the layout declaration order and is preserved through rendering and
/// serialization.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeatureRecord {
    fields: Vec<Field>,
}

impl FeatureRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self { fields: Vec::with_capacity(capacity) }
    }

    /// Append a field. A duplicate name replaces the earlier value in place.
    pub fn push(&mut self, name: &'static str, value: Option<FieldValue>) {
        match self.fields.iter_mut().find(|f| f.name == name) {
            Some(existing) => existing.value = value,
            None => self.fields.push(Field { name, value, inferred: false }),
        }
    }

    /// Overwrite a field with a synthesized value. Unknown names are ignored.
    pub fn infer(&mut self, name: &str, value: FieldValue) -> bool {
        match self.fields.iter_mut().find(|f| f.name == name) {
            Some(field) => {
                field.value = Some(value);
                field.inferred = true;
                true
            }
            None => false,
        }
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.field(name).and_then(|f| f.value.as_ref())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.field(name).is_some()
    }

    pub fn is_absent(&self, name: &str) -> bool {
        self.get(name).is_none()
    }

    pub fn flag(&self, name: &str) -> Option<bool> {
        self.get(name).and_then(FieldValue::as_bool)
    }

    pub fn uint(&self, name: &str) -> Option<u64> {
        self.get(name).and_then(FieldValue::as_u64)
    }

    pub fn enum_name(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(FieldValue::as_enum).map(|e| e.name.as_ref())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Field> {
        self.fields.iter()
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.fields.iter().map(|f| f.name)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Number of fields that carry a value
    pub fn present_count(&self) -> usize {
        self.fields.iter().filter(|f| f.value.is_some()).count()
    }
}

impl Serialize for FeatureRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for field in &self.fields {
            map.serialize_entry(field.name, &field.value)?;
        }
        map.end()
    }
}
