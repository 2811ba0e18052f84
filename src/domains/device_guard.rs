//! Virtualization-based security and code integrity status, read from `Win32_DeviceGuard`

use super::{Domain, DomainId, FieldNote, Layout, RawSource};
use crate::bitfield::EnumTable;
use crate::classifier::{Annotator, Classification};
use crate::cpu::CpuContext;
use crate::properties::{PropertyField, PropertySpec};
use crate::types::{FeatureRecord, Secure};

pub const NAMESPACE: &str = r"root\Microsoft\Windows\DeviceGuard";
pub const CLASS: &str = "Win32_DeviceGuard";

pub static VBS_STATUS: EnumTable = EnumTable::new(&[(0, "NotEnabled"), (1, "EnabledNotRunning"), (2, "Running")]);

pub static ENFORCEMENT_STATUS: EnumTable = EnumTable::new(&[(0, "Off"), (1, "Audit"), (2, "Enforced")]);

const RUNNING: &str = "SecurityServicesRunning";
const CONFIGURED: &str = "SecurityServicesConfigured";
const AVAILABLE: &str = "AvailableSecurityProperties";

static FIELDS: [PropertyField; 24] = [
    PropertyField::enumeration("VirtualizationBasedSecurityStatus", &VBS_STATUS),
    PropertyField::enumeration("CodeIntegrityPolicyEnforcementStatus", &ENFORCEMENT_STATUS),
    PropertyField::enumeration("UsermodeCodeIntegrityPolicyEnforcementStatus", &ENFORCEMENT_STATUS),
    PropertyField::flag("VirtualMachineIsolation"),
    PropertyField::member("CredentialGuardRunning", RUNNING, 1),
    PropertyField::member("HvciRunning", RUNNING, 2),
    PropertyField::member("SystemGuardRunning", RUNNING, 3),
    PropertyField::member("SmmFirmwareMeasurementRunning", RUNNING, 4),
    PropertyField::member("KernelShadowStacksRunning", RUNNING, 5),
    PropertyField::member("HvptRunning", RUNNING, 7),
    PropertyField::member("CredentialGuardConfigured", CONFIGURED, 1),
    PropertyField::member("HvciConfigured", CONFIGURED, 2),
    PropertyField::member("SystemGuardConfigured", CONFIGURED, 3),
    PropertyField::member("SmmFirmwareMeasurementConfigured", CONFIGURED, 4),
    PropertyField::member("KernelShadowStacksConfigured", CONFIGURED, 5),
    PropertyField::member("HvptConfigured", CONFIGURED, 7),
    PropertyField::member("HypervisorSupportAvailable", AVAILABLE, 1),
    PropertyField::member("SecureBootAvailable", AVAILABLE, 2),
    PropertyField::member("DmaProtectionAvailable", AVAILABLE, 3),
    PropertyField::member("SecureMemoryOverwriteAvailable", AVAILABLE, 4),
    PropertyField::member("NxProtectionsAvailable", AVAILABLE, 5),
    PropertyField::member("SmmMitigationsAvailable", AVAILABLE, 6),
    PropertyField::member("MbecAvailable", AVAILABLE, 7),
    PropertyField::member("ApicVirtualizationAvailable", AVAILABLE, 8),
];

pub static PROPERTIES: PropertySpec = PropertySpec { name: "device-guard", fields: &FIELDS };

static NOTES: [FieldNote; 5] = [
    FieldNote {
        name: "VirtualizationBasedSecurityStatus",
        description: "Whether the hypervisor-isolated secure kernel is running",
    },
    FieldNote {
        name: "CodeIntegrityPolicyEnforcementStatus",
        description: "Kernel-mode code integrity policy enforcement",
    },
    FieldNote { name: "CredentialGuardRunning", description: "LSA secrets are isolated in the secure kernel" },
    FieldNote { name: "HvciRunning", description: "Hypervisor-protected code integrity is enforced" },
    FieldNote { name: "SystemGuardRunning", description: "Firmware is measured through a dynamic root of trust" },
];

pub static DOMAIN: Domain = Domain {
    id: DomainId::DeviceGuard,
    title: "Device Guard",
    source: RawSource::Cim { namespace: NAMESPACE, class: CLASS },
    layout: Layout::Properties(&PROPERTIES),
    classify,
    depends_on: None,
    notes: &NOTES,
};

fn enforcement(a: &mut Annotator<'_>, name: &str) {
    let verdict = match a.record().enum_name(name) {
        Some("Enforced") => Secure::True,
        Some("Off" | "Audit") => Secure::False,
        _ => Secure::Unknown,
    };
    a.set(name, verdict);
}

pub fn classify(record: &FeatureRecord, _cpu: &CpuContext, _dependency: Option<&FeatureRecord>) -> Classification {
    let mut a = Annotator::new(record);

    let vbs = match record.enum_name("VirtualizationBasedSecurityStatus") {
        Some("Running") => Secure::True,
        Some(_) => Secure::False,
        None => Secure::Unknown,
    };
    a.set("VirtualizationBasedSecurityStatus", vbs);

    enforcement(&mut a, "CodeIntegrityPolicyEnforcementStatus");
    enforcement(&mut a, "UsermodeCodeIntegrityPolicyEnforcementStatus");

    a.flag("CredentialGuardRunning");
    a.flag("HvciRunning");
    a.flag("SystemGuardRunning");

    a.finish()
}
