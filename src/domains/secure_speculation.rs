//! Secure kernel speculation control status.
//!
//! The secure kernel does not report whether KVA shadowing is required, so the verdict on
//! `KvaShadowEnabled` borrows that answer from the kva-shadow domain.

use super::{Domain, DomainId, FieldNote, Layout, RawSource};
use crate::bitfield::{BitFieldSpec, FieldSpec};
use crate::classifier::{Annotator, Classification};
use crate::cpu::{CpuContext, CpuVendor};
use crate::types::{FeatureRecord, Secure};

pub const INFO_CLASS: u32 = 213;

static FIELDS: [FieldSpec; 19] = [
    FieldSpec::flag("KvaShadowSupported", 0),
    FieldSpec::flag("KvaShadowEnabled", 1),
    FieldSpec::flag("KvaShadowUserGlobal", 2),
    FieldSpec::flag("KvaShadowPcid", 3),
    FieldSpec::flag("MbClearEnabled", 4),
    FieldSpec::flag("L1tfMitigated", 5),
    FieldSpec::flag("BpbEnabled", 6),
    FieldSpec::flag("IbrsPresent", 7),
    FieldSpec::flag("EnhancedIbrs", 8),
    FieldSpec::flag("StibpPresent", 9),
    FieldSpec::flag("SsbdSupported", 10),
    FieldSpec::flag("SsbdRequired", 11),
    FieldSpec::flag("BpbKernelToUser", 12),
    FieldSpec::flag("BpbUserToKernel", 13),
    FieldSpec::flag("ReturnSpeculate", 14),
    FieldSpec::flag("BranchConfusionSafe", 15),
    FieldSpec::flag("SsbsEnabledAlways", 16),
    FieldSpec::flag("SsbsEnabledKernel", 17),
    FieldSpec::reserved(18, 14),
];

pub static LAYOUT: BitFieldSpec =
    BitFieldSpec { name: "secure-speculation-control", min_len: 4, max_len: 4, fields: &FIELDS };

static NOTES: [FieldNote; 3] = [
    FieldNote { name: "KvaShadowEnabled", description: "The secure kernel runs with page-table isolation" },
    FieldNote { name: "BranchConfusionSafe", description: "Branch type confusion (Retbleed) is mitigated" },
    FieldNote { name: "SsbsEnabledKernel", description: "Speculative store bypass safe is set for the secure kernel" },
];

pub static DOMAIN: Domain = Domain {
    id: DomainId::SecureSpeculationControl,
    title: "Secure Speculation Control",
    source: RawSource::SystemInformation { info_class: INFO_CLASS },
    layout: Layout::Bits(&LAYOUT),
    classify,
    depends_on: Some(DomainId::KvaShadow),
    notes: &NOTES,
};

/// Whether KVA shadowing is required: taken from the kva-shadow record when it is authoritative,
/// otherwise a per-vendor fallback. `None` when undecidable.
pub fn kva_shadow_required(kva_shadow: Option<&FeatureRecord>, cpu: &CpuContext) -> Option<bool> {
    let reported = kva_shadow
        .filter(|record| record.flag("KvaShadowRequiredAvailable") == Some(true))
        .and_then(|record| record.flag("KvaShadowRequired"));

    reported.or(match cpu.vendor {
        CpuVendor::Amd | CpuVendor::Arm => Some(false),
        CpuVendor::Intel => Some(true),
        CpuVendor::Unknown => None,
    })
}

pub fn classify(record: &FeatureRecord, cpu: &CpuContext, dependency: Option<&FeatureRecord>) -> Classification {
    let mut a = Annotator::new(record);

    let not_required = Secure::from_option(kva_shadow_required(dependency, cpu).map(|required| !required));
    a.set("KvaShadowEnabled", Secure::from_option(record.flag("KvaShadowEnabled")).or(not_required));

    a.set("L1tfMitigated", Secure::from_option(record.flag("L1tfMitigated")).or(Secure::from(!cpu.is_intel())));
    a.set("MbClearEnabled", Secure::from_option(record.flag("MbClearEnabled")).or(Secure::from(!cpu.is_intel())));
    a.flag("BpbEnabled");
    a.flag("BpbKernelToUser");
    a.flag("BpbUserToKernel");

    let ssbd_not_required = Secure::from_option(record.flag("SsbdRequired").map(|r| !r));
    a.set("SsbdRequired", ssbd_not_required);
    if cpu.is_arm() {
        a.set("SsbsEnabledKernel", ssbd_not_required.or(Secure::from_option(record.flag("SsbsEnabledKernel"))));
    }

    if record.flag("BranchConfusionSafe") == Some(true) {
        a.set("BranchConfusionSafe", Secure::True);
    }

    a.finish()
}
