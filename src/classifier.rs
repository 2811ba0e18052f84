//! Secure-state classification shared by every domain.
//!
//! Each domain supplies a [`ClassifyFn`]. The helpers here implement the parts of the policy
//! that repeat across domains: the mitigation status ladder and the "Reported + Status" rule
//! with its ARM-absence synthesis.

use crate::bitfield::EnumTable;
use crate::cpu::CpuContext;
use crate::types::{EnumValue, FeatureRecord, FieldValue, Secure, SecureAnnotations};

/// Classifier signature: decoded record, CPU context, optional dependency record
pub type ClassifyFn = fn(&FeatureRecord, &CpuContext, Option<&FeatureRecord>) -> Classification;

/// Output of one classifier run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Classification {
    /// One verdict per record field
    pub annotations: SecureAnnotations,
    /// Values the OS never reports on this platform, to be written back as inferred
    pub synthesized: Vec<(&'static str, FieldValue)>,
}

impl Classification {
    /// Write synthesized values into the record they were computed from
    pub fn apply_to(&self, record: &mut FeatureRecord) {
        for (name, value) in &self.synthesized {
            record.infer(name, value.clone());
        }
    }
}

/// Builder that starts every record field at `Unknown`, so no field can be left unannotated.
pub struct Annotator<'a> {
    record: &'a FeatureRecord,
    annotations: SecureAnnotations,
    synthesized: Vec<(&'static str, FieldValue)>,
}

impl<'a> Annotator<'a> {
    pub fn new(record: &'a FeatureRecord) -> Self {
        Self { record, annotations: SecureAnnotations::unknown_for(record.names()), synthesized: Vec::new() }
    }

    pub fn record(&self) -> &'a FeatureRecord {
        self.record
    }

    pub fn set(&mut self, name: &str, secure: Secure) {
        self.annotations.set(name, secure);
    }

    /// The flag's own value is its verdict
    pub fn flag(&mut self, name: &str) {
        let secure = Secure::from_option(self.record.flag(name));
        self.set(name, secure);
    }

    /// The flag's own value is its verdict, but only while `gate` is set
    pub fn flag_if(&mut self, name: &str, gate: bool) {
        if gate {
            self.flag(name);
        }
    }

    /// Record a value the classifier inferred for `name`
    pub fn synthesize(&mut self, name: &'static str, value: FieldValue) {
        if self.record.contains(name) {
            self.synthesized.push((name, value));
        }
    }

    pub fn finish(self) -> Classification {
        Classification { annotations: self.annotations, synthesized: self.synthesized }
    }
}

/// Mitigation status ladder. `HardwareImmune` and `Mitigated` rank equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MitigationStatus {
    Unsupported,
    Disabled,
    HardwareImmune,
    Mitigated,
    MitigatedAndLocked,
}

pub static LADDER: EnumTable = EnumTable::new(&[
    (0, "MitigationUnsupported"),
    (1, "MitigationDisabled"),
    (2, "HardwareImmune"),
    (3, "Mitigated"),
]);

pub static LOCKED_LADDER: EnumTable = EnumTable::new(&[
    (0, "MitigationUnsupported"),
    (1, "MitigationDisabled"),
    (2, "HardwareImmune"),
    (3, "Mitigated"),
    (4, "MitigatedAndLocked"),
]);

impl MitigationStatus {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "MitigationUnsupported" => Some(Self::Unsupported),
            "MitigationDisabled" => Some(Self::Disabled),
            "HardwareImmune" => Some(Self::HardwareImmune),
            "Mitigated" => Some(Self::Mitigated),
            "MitigatedAndLocked" => Some(Self::MitigatedAndLocked),
            _ => None,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Unsupported => "MitigationUnsupported",
            Self::Disabled => "MitigationDisabled",
            Self::HardwareImmune => "HardwareImmune",
            Self::Mitigated => "Mitigated",
            Self::MitigatedAndLocked => "MitigatedAndLocked",
        }
    }

    pub const fn rank(self) -> u8 {
        match self {
            Self::Unsupported => 0,
            Self::Disabled => 1,
            Self::HardwareImmune | Self::Mitigated => 2,
            Self::MitigatedAndLocked => 3,
        }
    }

    pub const fn is_secure(self) -> bool {
        self.rank() >= 2
    }
}

/// Verdict for a ladder-valued field. Unmapped codes carry no claim.
pub fn status_verdict(record: &FeatureRecord, status: &str) -> Secure {
    record
        .enum_name(status)
        .and_then(MitigationStatus::from_name)
        .map_or(Secure::Unknown, |s| Secure::from(s.is_secure()))
}

/// Apply the Reported + Status rule.
///
/// Reported: the status decides. Unreported on ARM: the kernel never sets the bit there, so the
/// status is synthesized as `HardwareImmune`. Otherwise no claim.
pub fn reported_status(annotator: &mut Annotator<'_>, cpu: &CpuContext, reported: &str, status: &'static str) {
    let record = annotator.record();
    if record.flag(reported) == Some(true) {
        annotator.set(status, status_verdict(record, status));
    } else if cpu.is_arm() {
        annotator.synthesize(status, FieldValue::Enum(EnumValue::inferred(MitigationStatus::HardwareImmune.name())));
        annotator.set(status, Secure::True);
    }
}
