//! Speculation control status.
//!
//! The structure grew a second 32-bit flags word in later builds: blobs of four bytes decode
//! with every `Flags2` field absent. Most of the policy lives here.
//!
//! | Mitigation | Fields | Rule |
//! |---|---|---|
//! | Spectre v2 (BTI) | `Bpb*` | enabled is secure, a disable reason is insecure |
//! | Spectre v4 (SSB) | `Ssbd*` | judged only when `SsbdAvailable` |
//! | L1TF (hypervisor) | `HvL1tf*` | judged only when `HvL1tfStatusAvailable` |
//! | MDS | `MdsHardwareProtected`, `MbClear*` | hardware protection assumed off-Intel when unreported |
//! | TAA | `Tsx*`, `TaaHardwareImmune` | Intel only |
//! | MMIO stale data | `*HardwareProtected`, `FbClear*` | Intel only |
//! | BHI | `Bhb*` | enabled, or not Intel |
//! | Retbleed | `BranchConfusion*` | AMD: status as-is; elsewhere ladder, ARM synthesis |
//! | GDS, SRSO, RFDS, DIV0 | `*Reported` + `*Status` | ladder, ARM synthesis |

use super::{Domain, DomainId, FieldNote, Layout, RawSource};
use crate::bitfield::{BitFieldSpec, EnumTable, FieldSpec};
use crate::classifier::{reported_status, status_verdict, Annotator, Classification, LADDER, LOCKED_LADDER};
use crate::cpu::CpuContext;
use crate::types::{FeatureRecord, FieldValue, Secure};

pub const INFO_CLASS: u32 = 201;

pub static TSX_STATUS: EnumTable = EnumTable::new(&[(0, "TsxUnsupported"), (1, "TsxEnabled"), (2, "TsxDisabled")]);

pub static DIVIDE_BY_ZERO_STATUS: EnumTable = EnumTable::new(&[(0, "MitigationDisabled"), (1, "Mitigated")]);

static FIELDS: [FieldSpec; 52] = [
    // Flags
    FieldSpec::flag("BpbEnabled", 0),
    FieldSpec::flag("BpbDisabledSystemPolicy", 1),
    FieldSpec::flag("BpbDisabledNoHardwareSupport", 2),
    FieldSpec::flag("SpecCtrlEnumerated", 3),
    FieldSpec::flag("SpecCmdEnumerated", 4),
    FieldSpec::flag("IbrsPresent", 5),
    FieldSpec::flag("StibpPresent", 6),
    FieldSpec::flag("SmepPresent", 7),
    FieldSpec::flag("SsbdAvailable", 8),
    FieldSpec::flag("SsbdSupported", 9),
    FieldSpec::flag("SsbdSystemWide", 10),
    FieldSpec::flag("SsbdKernel", 11),
    FieldSpec::flag("SsbdRequired", 12),
    FieldSpec::flag("BpbDisabledKernelToUser", 13),
    FieldSpec::flag("RetpolineEnabled", 14),
    FieldSpec::flag("ImportOptimizationEnabled", 15),
    FieldSpec::flag("EnhancedIbrs", 16),
    FieldSpec::flag("HvL1tfStatusAvailable", 17),
    FieldSpec::flag("HvL1tfProcessorNotAffected", 18),
    FieldSpec::flag("HvL1tfMitigationEnabled", 19),
    FieldSpec::flag("HvL1tfMitigationNotEnabledHardware", 20),
    FieldSpec::flag("HvL1tfMitigationNotEnabledLoadOption", 21),
    FieldSpec::flag("HvL1tfMitigationNotEnabledCoreScheduler", 22),
    FieldSpec::flag("EnhancedIbrsReported", 23),
    FieldSpec::flag("MdsHardwareProtected", 24),
    FieldSpec::flag("MbClearEnabled", 25),
    FieldSpec::flag("MbClearReported", 26),
    FieldSpec::enumeration("TsxCtrlStatus", 27, 2, &TSX_STATUS),
    FieldSpec::flag("TsxCtrlReported", 29),
    FieldSpec::flag("TaaHardwareImmune", 30),
    FieldSpec::reserved(31, 1),
    // Flags2
    FieldSpec::flag("SbdrSsdpHardwareProtected", 32),
    FieldSpec::flag("FbsdpHardwareProtected", 33),
    FieldSpec::flag("PsdpHardwareProtected", 34),
    FieldSpec::flag("FbClearEnabled", 35),
    FieldSpec::flag("FbClearReported", 36),
    FieldSpec::flag("BhbEnabled", 37),
    FieldSpec::flag("BhbDisabledSystemPolicy", 38),
    FieldSpec::flag("BhbDisabledNoHardwareSupport", 39),
    FieldSpec::enumeration("BranchConfusionStatus", 40, 2, &LADDER),
    FieldSpec::flag("BranchConfusionReported", 42),
    FieldSpec::flag("RdclHardwareProtectedReported", 43),
    FieldSpec::flag("RdclHardwareProtected", 44),
    FieldSpec::enumeration("GdsStatus", 45, 3, &LOCKED_LADDER),
    FieldSpec::flag("GdsReported", 48),
    FieldSpec::enumeration("SrsoStatus", 49, 2, &LADDER),
    FieldSpec::flag("SrsoReported", 51),
    FieldSpec::flag("DivideByZeroReported", 52),
    FieldSpec::enumeration("DivideByZeroStatus", 53, 1, &DIVIDE_BY_ZERO_STATUS),
    FieldSpec::enumeration("RfdsStatus", 54, 2, &LADDER),
    FieldSpec::flag("RfdsReported", 56),
    FieldSpec::reserved(57, 7),
];

pub static LAYOUT: BitFieldSpec = BitFieldSpec { name: "speculation-control", min_len: 4, max_len: 8, fields: &FIELDS };

static NOTES: [FieldNote; 10] = [
    FieldNote { name: "BpbEnabled", description: "Branch target injection (Spectre v2) mitigation is enabled" },
    FieldNote { name: "SsbdRequired", description: "The processor is vulnerable to speculative store bypass" },
    FieldNote { name: "HvL1tfMitigationEnabled", description: "The hypervisor flushes L1 on VM entry" },
    FieldNote { name: "MbClearEnabled", description: "Microarchitectural buffers are cleared on privilege transitions" },
    FieldNote { name: "TaaHardwareImmune", description: "The processor is not affected by TSX asynchronous abort" },
    FieldNote { name: "FbClearEnabled", description: "Fill buffers are cleared against MMIO stale data" },
    FieldNote { name: "BhbEnabled", description: "Branch history injection mitigation is enabled" },
    FieldNote { name: "GdsStatus", description: "Gather data sampling (Downfall) mitigation state" },
    FieldNote { name: "SrsoStatus", description: "Speculative return stack overflow (Inception) mitigation state" },
    FieldNote { name: "RfdsStatus", description: "Register file data sampling mitigation state" },
];

pub static DOMAIN: Domain = Domain {
    id: DomainId::SpeculationControl,
    title: "Speculation Control",
    source: RawSource::SystemInformation { info_class: INFO_CLASS },
    layout: Layout::Bits(&LAYOUT),
    classify,
    depends_on: None,
    notes: &NOTES,
};

/// A set "disabled because ..." flag is insecure; a clear one proves nothing.
fn disable_reason(a: &mut Annotator<'_>, name: &str) {
    if a.record().flag(name) == Some(true) {
        a.set(name, Secure::False);
    }
}

fn branch_target_injection(a: &mut Annotator<'_>) {
    a.flag("BpbEnabled");
    disable_reason(a, "BpbDisabledSystemPolicy");
    disable_reason(a, "BpbDisabledNoHardwareSupport");
    disable_reason(a, "BpbDisabledKernelToUser");
}

fn speculative_store_bypass(a: &mut Annotator<'_>) {
    let record = a.record();
    if record.flag("SsbdAvailable") != Some(true) {
        return;
    }
    let not_required = Secure::from_option(record.flag("SsbdRequired").map(|r| !r));
    let system_wide = Secure::from_option(record.flag("SsbdSystemWide"));
    let kernel = Secure::from_option(record.flag("SsbdKernel"));

    a.set("SsbdRequired", not_required);
    a.set("SsbdSystemWide", not_required.or(system_wide));
    a.set("SsbdKernel", not_required.or(system_wide).or(kernel));
}

fn hypervisor_l1tf(a: &mut Annotator<'_>, cpu: &CpuContext) {
    let record = a.record();
    if record.flag("HvL1tfStatusAvailable") != Some(true) {
        return;
    }
    let unaffected = Secure::from_option(record.flag("HvL1tfProcessorNotAffected")).or(Secure::from(!cpu.is_intel()));
    a.set("HvL1tfMitigationEnabled", Secure::from_option(record.flag("HvL1tfMitigationEnabled")).or(unaffected));
    if unaffected != Secure::True {
        disable_reason(a, "HvL1tfMitigationNotEnabledHardware");
        disable_reason(a, "HvL1tfMitigationNotEnabledLoadOption");
        disable_reason(a, "HvL1tfMitigationNotEnabledCoreScheduler");
    }
}

/// MDS. The OS never sets the protection bit off-Intel, so it is assumed there when unreported.
fn microarchitectural_data_sampling(a: &mut Annotator<'_>, cpu: &CpuContext) {
    let record = a.record();
    let protected = if record.flag("MbClearReported") == Some(true) {
        record.flag("MdsHardwareProtected")
    } else if !cpu.is_intel() {
        a.synthesize("MdsHardwareProtected", FieldValue::Bool(true));
        Some(true)
    } else {
        None
    };

    let protected = Secure::from_option(protected);
    a.set("MdsHardwareProtected", protected);
    a.set("MbClearEnabled", protected.or(Secure::from_option(record.flag("MbClearEnabled"))));
}

/// TSX asynchronous abort, an Intel-only issue
fn tsx_async_abort(a: &mut Annotator<'_>, cpu: &CpuContext) {
    let record = a.record();
    let immune = Secure::from_option(record.flag("TaaHardwareImmune"));
    let tsx_off = if record.flag("TsxCtrlReported") == Some(true) {
        match record.enum_name("TsxCtrlStatus") {
            Some("TsxUnsupported" | "TsxDisabled") => Secure::True,
            Some("TsxEnabled") => Secure::False,
            _ => Secure::Unknown,
        }
    } else {
        Secure::Unknown
    };
    let not_intel = Secure::from(!cpu.is_intel());

    a.set("TaaHardwareImmune", immune.or(tsx_off).or(not_intel));
    if record.flag("TsxCtrlReported") == Some(true) || !cpu.is_intel() {
        a.set("TsxCtrlStatus", tsx_off.or(immune).or(not_intel));
    }
}

/// MMIO stale data, an Intel-only issue
fn mmio_stale_data(a: &mut Annotator<'_>, cpu: &CpuContext) {
    const PROTECTIONS: [&str; 3] = ["SbdrSsdpHardwareProtected", "FbsdpHardwareProtected", "PsdpHardwareProtected"];
    let record = a.record();

    if record.flag("FbClearReported") == Some(true) {
        let protected = PROTECTIONS
            .iter()
            .map(|name| Secure::from_option(record.flag(name)))
            .fold(Secure::True, Secure::and);
        for name in PROTECTIONS {
            a.flag(name);
        }
        a.set("FbClearEnabled", protected.or(Secure::from_option(record.flag("FbClearEnabled"))));
    } else if !cpu.is_intel() {
        for name in PROTECTIONS {
            a.set(name, Secure::True);
        }
        a.set("FbClearEnabled", Secure::True);
    }
}

/// Branch history injection. No reporting bit exists, so absence of evidence is secure off-Intel.
fn branch_history_injection(a: &mut Annotator<'_>, cpu: &CpuContext) {
    let enabled = Secure::from_option(a.record().flag("BhbEnabled"));
    a.set("BhbEnabled", enabled.or(Secure::from(!cpu.is_intel())));
    disable_reason(a, "BhbDisabledSystemPolicy");
    if cpu.is_intel() {
        disable_reason(a, "BhbDisabledNoHardwareSupport");
    }
}

/// Rogue data cache load follows the plain reported pattern.
// TODO: decide whether KvaShadowEnabled from the kva-shadow domain should upgrade an
// unprotected RdclHardwareProtected verdict; the two currently disagree on Meltdown-affected parts.
fn rogue_data_cache_load(a: &mut Annotator<'_>, cpu: &CpuContext) {
    if a.record().flag("RdclHardwareProtectedReported") == Some(true) {
        a.flag("RdclHardwareProtected");
    } else if cpu.is_arm() {
        a.synthesize("RdclHardwareProtected", FieldValue::Bool(true));
        a.set("RdclHardwareProtected", Secure::True);
    }
}

/// AMD populates the branch type confusion status without setting the reported bit
fn branch_type_confusion(a: &mut Annotator<'_>, cpu: &CpuContext) {
    if cpu.is_amd() {
        let verdict = status_verdict(a.record(), "BranchConfusionStatus");
        a.set("BranchConfusionStatus", verdict);
    } else {
        reported_status(a, cpu, "BranchConfusionReported", "BranchConfusionStatus");
    }
}

pub fn classify(record: &FeatureRecord, cpu: &CpuContext, _dependency: Option<&FeatureRecord>) -> Classification {
    let mut a = Annotator::new(record);

    branch_target_injection(&mut a);
    speculative_store_bypass(&mut a);
    hypervisor_l1tf(&mut a, cpu);
    microarchitectural_data_sampling(&mut a, cpu);
    tsx_async_abort(&mut a, cpu);
    mmio_stale_data(&mut a, cpu);
    branch_history_injection(&mut a, cpu);
    rogue_data_cache_load(&mut a, cpu);

    branch_type_confusion(&mut a, cpu);
    reported_status(&mut a, cpu, "GdsReported", "GdsStatus");
    reported_status(&mut a, cpu, "SrsoReported", "SrsoStatus");
    reported_status(&mut a, cpu, "DivideByZeroReported", "DivideByZeroStatus");
    reported_status(&mut a, cpu, "RfdsReported", "RfdsStatus");

    a.finish()
}
