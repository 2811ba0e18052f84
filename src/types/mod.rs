//! Type definitions for mitscan inspection results
//!
//! Decoded fields live in a [`FeatureRecord`], verdicts in [`SecureAnnotations`],
//! and one [`DomainReport`] pairs the two for each mitigation domain that decoded.

// Helper for serde skip_serializing_if
pub(crate) fn is_false(b: &bool) -> bool {
    !*b
}

// Module declarations
mod record;
mod report;
mod secure;

pub use record::{EnumValue, FeatureRecord, Field, FieldValue};
pub use report::{DomainReport, FieldView, InspectionReport, FailedDomain, SCHEMA_VERSION};
pub use secure::{Secure, SecureAnnotations};
