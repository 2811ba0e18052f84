//! Per-domain results and the complete inspection report

use chrono::{DateTime, Utc};
use serde::ser::{Serialize, SerializeStruct, Serializer};

use super::{is_false, FeatureRecord, FieldValue, Secure, SecureAnnotations};
use crate::cpu::CpuContext;
use crate::domains::DomainId;

/// Bumped whenever the JSON report shape changes
pub const SCHEMA_VERSION: &str = "1.0";

/// One decoded, classified mitigation domain
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainReport {
    pub id: DomainId,
    pub title: &'static str,
    pub record: FeatureRecord,
    pub annotations: SecureAnnotations,
}

/// A record field joined with its verdict, in layout order
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct FieldView<'a> {
    pub name: &'static str,
    pub value: Option<&'a FieldValue>,
    pub secure: Secure,
    #[serde(skip_serializing_if = "is_false")]
    pub inferred: bool,
}

impl DomainReport {
    pub fn new(id: DomainId, title: &'static str, record: FeatureRecord, annotations: SecureAnnotations) -> Self {
        Self { id, title, record, annotations }
    }

    pub fn fields(&self) -> impl Iterator<Item = FieldView<'_>> + '_ {
        self.record.iter().map(|field| FieldView {
            name: field.name,
            value: field.value.as_ref(),
            secure: self.annotations.get(field.name).unwrap_or_default(),
            inferred: field.inferred,
        })
    }

    pub fn insecure_count(&self) -> usize {
        self.annotations.count(Secure::False)
    }

    pub fn has_insecure(&self) -> bool {
        self.insecure_count() > 0
    }
}

impl Serialize for DomainReport {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let fields: Vec<FieldView<'_>> = self.fields().collect();
        let mut state = serializer.serialize_struct("DomainReport", 3)?;
        state.serialize_field("id", &self.id)?;
        state.serialize_field("title", self.title)?;
        state.serialize_field("fields", &fields)?;
        state.end()
    }
}

/// A requested domain whose query or decode failed unexpectedly.
/// Domains the OS build does not expose are omitted without an entry.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct FailedDomain {
    pub id: DomainId,
    pub reason: String,
}

/// Everything one run produced, in plan order
#[derive(Debug, Clone, serde::Serialize)]
pub struct InspectionReport {
    pub schema_version: String,
    pub timestamp: DateTime<Utc>,
    pub cpu: CpuContext,
    pub domains: Vec<DomainReport>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failed: Vec<FailedDomain>,
}

impl InspectionReport {
    pub fn new(cpu: CpuContext) -> Self {
        Self {
            schema_version: SCHEMA_VERSION.to_string(),
            timestamp: Utc::now(),
            cpu,
            domains: Vec::new(),
            failed: Vec::new(),
        }
    }

    pub fn domain(&self, id: DomainId) -> Option<&DomainReport> {
        self.domains.iter().find(|d| d.id == id)
    }

    /// True if any surfaced field was classified insecure
    pub fn has_insecure(&self) -> bool {
        self.domains.iter().any(DomainReport::has_insecure)
    }

    pub fn insecure_count(&self) -> usize {
        self.domains.iter().map(DomainReport::insecure_count).sum()
    }
}
