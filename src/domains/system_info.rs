//! Operating system identification. Informational only; always rendered first.

use super::{Domain, DomainId, Layout, RawSource};
use crate::classifier::{Annotator, Classification};
use crate::cpu::CpuContext;
use crate::properties::{PropertyField, PropertySpec};
use crate::types::{FeatureRecord, FieldValue};

pub const NAMESPACE: &str = r"root\cimv2";
pub const CLASS: &str = "Win32_OperatingSystem";

static FIELDS: [PropertyField; 7] = [
    PropertyField::text("Caption"),
    PropertyField::text("Version"),
    PropertyField::text("BuildNumber"),
    PropertyField::text("OSArchitecture"),
    PropertyField::uint("OperatingSystemSKU"),
    PropertyField::derived("CpuVendor"),
    PropertyField::derived("CpuArchitecture"),
];

pub static PROPERTIES: PropertySpec = PropertySpec { name: "system-info", fields: &FIELDS };

pub static DOMAIN: Domain = Domain {
    id: DomainId::SystemInfo,
    title: "System Information",
    source: RawSource::Cim { namespace: NAMESPACE, class: CLASS },
    layout: Layout::Properties(&PROPERTIES),
    classify,
    depends_on: None,
    notes: &[],
};

pub fn classify(record: &FeatureRecord, cpu: &CpuContext, _dependency: Option<&FeatureRecord>) -> Classification {
    let mut a = Annotator::new(record);
    a.synthesize("CpuVendor", FieldValue::Text(cpu.vendor.name().to_string()));
    a.synthesize("CpuArchitecture", FieldValue::Text(cpu.architecture.name().to_string()));
    a.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpu::CpuVendor;
    use crate::decoders::decode_properties;
    use crate::transport::{PropertyBag, PropertyValue};
    use crate::types::Secure;

    #[test]
    fn test_cpu_fields_synthesized() {
        let mut bag = PropertyBag::new();
        bag.insert("Caption", PropertyValue::Text("Microsoft Windows 11 Pro".into()));
        bag.insert("BuildNumber", PropertyValue::Text("22631".into()));
        bag.insert("OperatingSystemSKU", PropertyValue::UInt(48));

        let mut record = decode_properties(&bag, &PROPERTIES);
        let c = classify(&record, &CpuContext::for_vendor(CpuVendor::Amd), None);
        c.apply_to(&mut record);

        assert_eq!(record.get("CpuVendor"), Some(&FieldValue::Text("AMD".into())));
        assert_eq!(record.get("CpuArchitecture"), Some(&FieldValue::Text("x64".into())));
        assert!(record.field("CpuVendor").unwrap().inferred);
        assert!(record.is_absent("Version"));
        assert_eq!(record.uint("OperatingSystemSKU"), Some(48));
        assert_eq!(c.annotations.count(Secure::Unknown), record.len());
    }
}
