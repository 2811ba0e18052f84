//! ARM64 pointer authentication status

use super::{Domain, DomainId, Layout, RawSource};
use crate::bitfield::{BitFieldSpec, FieldSpec};
use crate::classifier::{Annotator, Classification};
use crate::cpu::CpuContext;
use crate::types::FeatureRecord;

pub const INFO_CLASS: u32 = 236;

static FIELDS: [FieldSpec; 11] = [
    FieldSpec::flag("AddressAuthSupported", 0),
    FieldSpec::flag("AddressAuthQarma", 1),
    FieldSpec::flag("GenericAuthSupported", 2),
    FieldSpec::flag("GenericAuthQarma", 3),
    FieldSpec::flag("AddressAuthFaulting", 4),
    FieldSpec::reserved(5, 11),
    FieldSpec::flag("UserPerProcessIpAuthEnabled", 16),
    FieldSpec::flag("UserGlobalIpAuthEnabled", 17),
    FieldSpec::reserved(18, 6),
    FieldSpec::flag("KernelIpAuthEnabled", 24),
    FieldSpec::reserved(25, 7),
];

pub static LAYOUT: BitFieldSpec = BitFieldSpec { name: "pointer-auth", min_len: 4, max_len: 4, fields: &FIELDS };

pub static DOMAIN: Domain = Domain {
    id: DomainId::PointerAuth,
    title: "Pointer Authentication",
    source: RawSource::SystemInformation { info_class: INFO_CLASS },
    layout: Layout::Bits(&LAYOUT),
    classify,
    depends_on: None,
    notes: &[],
};

pub fn classify(record: &FeatureRecord, _cpu: &CpuContext, _dependency: Option<&FeatureRecord>) -> Classification {
    let mut a = Annotator::new(record);
    let supported = record.flag("AddressAuthSupported") == Some(true);

    a.flag_if("UserPerProcessIpAuthEnabled", supported);
    a.flag_if("UserGlobalIpAuthEnabled", supported);
    a.flag_if("KernelIpAuthEnabled", supported);

    a.finish()
}
