//! End-to-end inspections against captured host snapshots

use mitscan::transport::{PropertyBag, PropertyValue};
use mitscan::{inspect, CpuVendor, DomainId, HostSnapshot, InspectConfig, Secure, Transports};
use std::path::PathBuf;

fn load(name: &str) -> HostSnapshot {
    let path: PathBuf = [env!("CARGO_MANIFEST_DIR"), "tests", "fixtures", "hosts", name].iter().collect();
    HostSnapshot::load(path).unwrap()
}

#[test]
fn test_intel_unpatched_host() {
    let host = load("intel_unpatched.yaml");
    let report = inspect(&Transports::from_snapshot(&host), &InspectConfig::default()).unwrap();

    assert_eq!(report.cpu.vendor, CpuVendor::Intel);
    assert_eq!(report.domains[0].id, DomainId::SystemInfo);

    let system = report.domain(DomainId::SystemInfo).unwrap();
    assert_eq!(system.record.get("BuildNumber").and_then(|v| v.as_text()), Some("19045"));
    assert_eq!(system.record.get("CpuVendor").and_then(|v| v.as_text()), Some("Intel"));
    assert!(system.record.field("CpuVendor").unwrap().inferred);

    let kva = report.domain(DomainId::KvaShadow).unwrap();
    assert_eq!(kva.annotations.get("KvaShadowEnabled"), Some(Secure::False));
    assert_eq!(kva.annotations.get("KvaShadowRequired"), Some(Secure::False));
    assert!(report.has_insecure());

    // Unavailable domains are omitted, not reported as failures
    assert!(report.domain(DomainId::Tpm).is_none());
    assert!(report.domain(DomainId::SpeculationControl).is_none());
    assert!(report.failed.is_empty());
}

#[test]
fn test_amd_hardened_host_is_clean() {
    let host = load("amd_hardened.yaml");
    let report = inspect(&Transports::from_snapshot(&host), &InspectConfig::default()).unwrap();

    assert_eq!(report.cpu.vendor, CpuVendor::Amd);
    assert!(!report.has_insecure(), "{:?}", report.domains);

    let guard = report.domain(DomainId::DeviceGuard).unwrap();
    assert_eq!(guard.annotations.get("VirtualizationBasedSecurityStatus"), Some(Secure::True));
    assert_eq!(guard.record.flag("HvciRunning"), Some(true));
    assert_eq!(guard.annotations.get("UsermodeCodeIntegrityPolicyEnforcementStatus"), Some(Secure::Unknown));

    let kva = report.domain(DomainId::KvaShadow).unwrap();
    assert_eq!(kva.annotations.get("KvaShadowEnabled"), Some(Secure::True));
}

#[test]
fn test_every_field_is_annotated() {
    let host = load("amd_hardened.yaml");
    let report = inspect(&Transports::from_snapshot(&host), &InspectConfig::default()).unwrap();
    for domain in &report.domains {
        assert_eq!(domain.annotations.len(), domain.record.len(), "{}", domain.id);
        for name in domain.record.names() {
            assert!(domain.annotations.get(name).is_some(), "{}.{}", domain.id, name);
        }
    }
}

#[test]
fn test_programmatic_snapshot() {
    let mut processor = PropertyBag::new();
    processor.insert("Manufacturer", PropertyValue::Text("ARM".to_string()));
    processor.insert("Architecture", PropertyValue::UInt(12));

    let mut host = HostSnapshot::empty();
    host.set_class(r"root\cimv2", "Win32_Processor", Ok(processor));
    host.set_system_information(201, Ok(vec![0x00; 8]));

    let config = InspectConfig { domains: vec![DomainId::SpeculationControl], ..Default::default() };
    let report = inspect(&Transports::from_snapshot(&host), &config).unwrap();

    let spec = report.domain(DomainId::SpeculationControl).unwrap();
    let gds = spec.record.field("GdsStatus").unwrap();
    assert!(gds.inferred);
    assert_eq!(spec.annotations.get("GdsStatus"), Some(Secure::True));
}

#[test]
fn test_json_report_is_stable() {
    let host = load("intel_unpatched.yaml");
    let config = InspectConfig::new().with_domains(&[DomainId::KvaShadow]);
    let report = inspect(&Transports::from_snapshot(&host), &config).unwrap();

    let rendered = mitscan::output::format_json(&report, Default::default()).unwrap();
    let json: serde_json::Value = serde_json::from_str(&rendered).unwrap();
    let names: Vec<&str> =
        json["domains"][0]["fields"].as_array().unwrap().iter().filter_map(|f| f["name"].as_str()).collect();
    assert_eq!(
        names,
        vec![
            "KvaShadowEnabled",
            "KvaShadowUserGlobal",
            "KvaShadowPcid",
            "KvaShadowInvpcid",
            "KvaShadowRequired",
            "KvaShadowRequiredAvailable",
            "InvalidPteBit",
            "L1DataCacheFlushSupported",
            "L1TerminalFaultMitigationPresent",
        ]
    );
}
