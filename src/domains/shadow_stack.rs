//! Hardware-enforced shadow stack (CET) status

use super::{Domain, DomainId, FieldNote, Layout, RawSource};
use crate::bitfield::{BitFieldSpec, FieldSpec};
use crate::classifier::{Annotator, Classification};
use crate::cpu::CpuContext;
use crate::types::{FeatureRecord, Secure};

pub const INFO_CLASS: u32 = 221;

static FIELDS: [FieldSpec; 7] = [
    FieldSpec::flag("CetCapable", 0),
    FieldSpec::flag("UserCetAllowed", 1),
    FieldSpec::reserved(2, 6),
    FieldSpec::flag("KernelCetEnabled", 8),
    FieldSpec::flag("KernelCetAuditModeEnabled", 9),
    FieldSpec::reserved(10, 6),
    FieldSpec::reserved(16, 16),
];

pub static LAYOUT: BitFieldSpec = BitFieldSpec { name: "shadow-stack", min_len: 4, max_len: 4, fields: &FIELDS };

static NOTES: [FieldNote; 2] = [
    FieldNote { name: "CetCapable", description: "The processor implements control-flow enforcement" },
    FieldNote {
        name: "KernelCetAuditModeEnabled",
        description: "Kernel shadow stack violations are logged instead of enforced",
    },
];

pub static DOMAIN: Domain = Domain {
    id: DomainId::ShadowStack,
    title: "Shadow Stacks",
    source: RawSource::SystemInformation { info_class: INFO_CLASS },
    layout: Layout::Bits(&LAYOUT),
    classify,
    depends_on: None,
    notes: &NOTES,
};

pub fn classify(record: &FeatureRecord, _cpu: &CpuContext, _dependency: Option<&FeatureRecord>) -> Classification {
    let mut a = Annotator::new(record);
    let capable = record.flag("CetCapable") == Some(true);

    a.flag_if("UserCetAllowed", capable);
    a.flag_if("KernelCetEnabled", capable);
    if record.flag("KernelCetEnabled") == Some(true) && record.flag("KernelCetAuditModeEnabled") == Some(true) {
        a.set("KernelCetAuditModeEnabled", Secure::False);
    }

    a.finish()
}
