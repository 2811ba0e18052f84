//! Kernel VA shadow (Meltdown) and L1 terminal fault status

use super::{Domain, DomainId, FieldNote, Layout, RawSource};
use crate::bitfield::{BitFieldSpec, FieldSpec};
use crate::classifier::{Annotator, Classification};
use crate::cpu::CpuContext;
use crate::types::{FeatureRecord, Secure};

pub const INFO_CLASS: u32 = 196;

static FIELDS: [FieldSpec; 10] = [
    FieldSpec::flag("KvaShadowEnabled", 0),
    FieldSpec::flag("KvaShadowUserGlobal", 1),
    FieldSpec::flag("KvaShadowPcid", 2),
    FieldSpec::flag("KvaShadowInvpcid", 3),
    FieldSpec::flag("KvaShadowRequired", 4),
    FieldSpec::flag("KvaShadowRequiredAvailable", 5),
    FieldSpec::uint("InvalidPteBit", 6, 6),
    FieldSpec::flag("L1DataCacheFlushSupported", 12),
    FieldSpec::flag("L1TerminalFaultMitigationPresent", 13),
    FieldSpec::reserved(14, 18),
];

pub static LAYOUT: BitFieldSpec = BitFieldSpec { name: "kva-shadow", min_len: 4, max_len: 4, fields: &FIELDS };

static NOTES: [FieldNote; 4] = [
    FieldNote { name: "KvaShadowEnabled", description: "Kernel page-table isolation is active" },
    FieldNote {
        name: "KvaShadowRequired",
        description: "The processor is vulnerable to rogue data cache load (Meltdown)",
    },
    FieldNote { name: "InvalidPteBit", description: "Physical address bit used to invalidate not-present PTEs" },
    FieldNote {
        name: "L1TerminalFaultMitigationPresent",
        description: "Not-present PTEs are inverted against L1 terminal fault",
    },
];

pub static DOMAIN: Domain = Domain {
    id: DomainId::KvaShadow,
    title: "Kernel VA Shadow",
    source: RawSource::SystemInformation { info_class: INFO_CLASS },
    layout: Layout::Bits(&LAYOUT),
    classify,
    depends_on: None,
    notes: &NOTES,
};

/// Verdict on whether KVA shadowing is needed at all. AMD parts are never vulnerable; elsewhere
/// the `Required` bit only means something when `RequiredAvailable` is set.
pub fn required_secure(record: &FeatureRecord, cpu: &CpuContext) -> Secure {
    if cpu.is_amd() {
        return Secure::True;
    }
    match record.flag("KvaShadowRequiredAvailable") {
        Some(true) => Secure::from_option(record.flag("KvaShadowRequired").map(|required| !required)),
        _ => Secure::Unknown,
    }
}

pub fn classify(record: &FeatureRecord, cpu: &CpuContext, _dependency: Option<&FeatureRecord>) -> Classification {
    let mut a = Annotator::new(record);

    let required = required_secure(record, cpu);
    a.set("KvaShadowRequired", required);
    a.set("KvaShadowEnabled", Secure::from_option(record.flag("KvaShadowEnabled")).or(required));

    let not_intel = Secure::from(!cpu.is_intel());
    a.set(
        "L1TerminalFaultMitigationPresent",
        Secure::from_option(record.flag("L1TerminalFaultMitigationPresent")).or(not_intel),
    );
    a.set(
        "L1DataCacheFlushSupported",
        Secure::from_option(record.flag("L1DataCacheFlushSupported")).or(not_intel),
    );

    a.finish()
}
