//! Mitigation domain catalog.
//!
//! A [`Domain`] is plain data: where its raw status comes from, how to decode it, and the
//! classifier that judges the decoded record. Each submodule declares one domain.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::bitfield::BitFieldSpec;
use crate::classifier::ClassifyFn;
use crate::decoders;
use crate::error::{DecodeError, DomainError, MitscanError};
use crate::properties::PropertySpec;
use crate::registry::DomainRegistry;
use crate::transport::{PropertyBag, Transports};
use crate::types::FeatureRecord;

pub mod device_guard;
pub mod kva_shadow;
pub mod pointer_auth;
pub mod secure_speculation;
pub mod shadow_stack;
pub mod speculation;
pub mod system_info;
pub mod tpm;

/// Stable, kebab-case identifier of a domain
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum DomainId {
    DeviceGuard,
    KvaShadow,
    PointerAuth,
    SecureSpeculationControl,
    ShadowStack,
    SpeculationControl,
    SystemInfo,
    Tpm,
}

impl DomainId {
    pub const ALL: [DomainId; 8] = [
        Self::DeviceGuard,
        Self::KvaShadow,
        Self::PointerAuth,
        Self::SecureSpeculationControl,
        Self::ShadowStack,
        Self::SpeculationControl,
        Self::SystemInfo,
        Self::Tpm,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::DeviceGuard => "device-guard",
            Self::KvaShadow => "kva-shadow",
            Self::PointerAuth => "pointer-auth",
            Self::SecureSpeculationControl => "secure-speculation-control",
            Self::ShadowStack => "shadow-stack",
            Self::SpeculationControl => "speculation-control",
            Self::SystemInfo => "system-info",
            Self::Tpm => "tpm",
        }
    }
}

impl fmt::Display for DomainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DomainId {
    type Err = MitscanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|id| id.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| MitscanError::unknown_domain(s))
    }
}

/// Where a domain's raw status is read from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawSource {
    SystemInformation { info_class: u32 },
    Cim { namespace: &'static str, class: &'static str },
    TpmCapability { capability: u32, property: u32, count: u32 },
}

impl fmt::Display for RawSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SystemInformation { info_class } => write!(f, "system information class {}", info_class),
            Self::Cim { namespace, class } => write!(f, "CIM {}:{}", namespace, class),
            Self::TpmCapability { capability, property, count } => {
                write!(f, "TPM2 GetCapability({}, {:#x}, {})", capability, property, count)
            }
        }
    }
}

/// How a domain's raw status is decoded
#[derive(Debug, Clone, Copy)]
pub enum Layout {
    Bits(&'static BitFieldSpec),
    Properties(&'static PropertySpec),
}

/// Raw status as returned by a transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawData {
    Bytes(Vec<u8>),
    Properties(PropertyBag),
}

/// Human-readable description of one field
#[derive(Debug, Clone, Copy)]
pub struct FieldNote {
    pub name: &'static str,
    pub description: &'static str,
}

pub struct Domain {
    pub id: DomainId,
    pub title: &'static str,
    pub source: RawSource,
    pub layout: Layout,
    pub classify: ClassifyFn,
    pub depends_on: Option<DomainId>,
    pub notes: &'static [FieldNote],
}

impl fmt::Debug for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Domain")
            .field("id", &self.id)
            .field("source", &self.source)
            .field("depends_on", &self.depends_on)
            .finish_non_exhaustive()
    }
}

impl Domain {
    /// Names of every field the decoder surfaces, in layout order
    pub fn field_names(&self) -> Vec<&'static str> {
        match self.layout {
            Layout::Bits(spec) => spec.visible_fields().map(|f| f.name).collect(),
            Layout::Properties(spec) => spec.fields.iter().map(|f| f.name).collect(),
        }
    }

    pub fn note(&self, field: &str) -> Option<&'static str> {
        self.notes.iter().find(|n| n.name == field).map(|n| n.description)
    }

    /// Retrieve the raw status from the matching transport
    pub fn fetch(&self, transports: &Transports<'_>) -> Result<RawData, DomainError> {
        match self.source {
            RawSource::SystemInformation { info_class } => {
                let size = match self.layout {
                    Layout::Bits(spec) => spec.max_len,
                    Layout::Properties(_) => 0,
                };
                Ok(RawData::Bytes(transports.system.query(info_class, size)?))
            }
            RawSource::Cim { namespace, class } => {
                Ok(RawData::Properties(transports.properties.query_properties(class, namespace)?))
            }
            RawSource::TpmCapability { capability, property, count } => {
                let command = tpm::get_capability_command(capability, property, count);
                let response = transports.tpm.submit(&command)?;
                Ok(RawData::Bytes(tpm::parse_capability_response(&response)?))
            }
        }
    }

    pub fn decode(&self, raw: &RawData) -> Result<FeatureRecord, DomainError> {
        match (self.layout, raw) {
            (Layout::Bits(spec), RawData::Bytes(bytes)) => Ok(decoders::decode(bytes, spec)?),
            (Layout::Properties(spec), RawData::Properties(bag)) => Ok(decoders::decode_properties(bag, spec)),
            (Layout::Bits(spec), RawData::Properties(_)) => {
                Err(DecodeError::malformed(format!("{}: expected raw bytes", spec.name)).into())
            }
            (Layout::Properties(spec), RawData::Bytes(_)) => {
                Err(DecodeError::malformed(format!("{}: expected a property bag", spec.name)).into())
            }
        }
    }
}

static DOMAINS: [&Domain; 8] = [
    &system_info::DOMAIN,
    &device_guard::DOMAIN,
    &kva_shadow::DOMAIN,
    &pointer_auth::DOMAIN,
    &secure_speculation::DOMAIN,
    &shadow_stack::DOMAIN,
    &speculation::DOMAIN,
    &tpm::DOMAIN,
];

static CATALOG: DomainRegistry = DomainRegistry::new(&DOMAINS);

/// Every domain known to the program
pub fn catalog() -> &'static DomainRegistry {
    &CATALOG
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpu::{CpuContext, CpuVendor};
    use crate::types::Secure;

    #[test]
    fn test_every_layout_is_valid() {
        for domain in catalog().iter() {
            match domain.layout {
                Layout::Bits(spec) => assert_eq!(spec.validate(), Ok(()), "{}", domain.id),
                Layout::Properties(spec) => assert!(spec.has_unique_names(), "{}", domain.id),
            }
        }
    }

    #[test]
    fn test_catalog_covers_every_id() {
        for id in DomainId::ALL {
            assert_eq!(catalog().get(id).map(|d| d.id), Some(id));
        }
    }

    #[test]
    fn test_domain_id_parsing() {
        assert_eq!("kva-shadow".parse::<DomainId>().unwrap(), DomainId::KvaShadow);
        assert_eq!(" TPM ".parse::<DomainId>().unwrap(), DomainId::Tpm);
        assert!("meltdown".parse::<DomainId>().is_err());
        assert_eq!(serde_json::to_string(&DomainId::SecureSpeculationControl).unwrap(), "\"secure-speculation-control\"");
    }

    #[test]
    fn test_notes_name_real_fields() {
        for domain in catalog().iter() {
            let names = domain.field_names();
            for note in domain.notes {
                assert!(names.contains(&note.name), "{}: {}", domain.id, note.name);
            }
        }
    }

    /// Every classifier annotates every field, even for an all-absent record
    #[test]
    fn test_classifiers_are_total() {
        let vendors = [CpuVendor::Intel, CpuVendor::Amd, CpuVendor::Arm, CpuVendor::Unknown];
        for domain in catalog().iter() {
            let mut absent = FeatureRecord::new();
            for name in domain.field_names() {
                absent.push(name, None);
            }
            let full = match domain.layout {
                Layout::Bits(spec) => decoders::decode(&vec![0xFF; spec.max_len], spec).unwrap(),
                Layout::Properties(_) => absent.clone(),
            };

            for vendor in vendors {
                let cpu = CpuContext::for_vendor(vendor);
                for record in [&absent, &full] {
                    for dependency in [None, Some(&full)] {
                        let c = (domain.classify)(record, &cpu, dependency);
                        assert_eq!(c.annotations.len(), record.len(), "{}", domain.id);
                        for name in record.names() {
                            let verdict = c.annotations.get(name);
                            assert!(
                                matches!(verdict, Some(Secure::True | Secure::False | Secure::Unknown)),
                                "{}: {}",
                                domain.id,
                                name
                            );
                        }
                    }
                }
            }
        }
    }
}
