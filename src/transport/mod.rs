//! Transport contracts consumed by the inspector.
//!
//! Three raw sources feed the decoders:
//! - **SystemInformation**: numeric information class + buffer size in, raw bytes out
//! - **PropertySource**: CIM class + namespace in, named property bag out
//! - **TpmDevice**: TPM2 command bytes in, response bytes out
//!
//! Every failure carries a platform status code. [`TransportError::is_unavailable`] separates
//! "not on this OS build" from genuine failures using the table in [`codes`].

pub mod codes;
pub mod snapshot;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

pub use codes::StatusKind;
pub use snapshot::HostSnapshot;

/// Failure returned by a transport, identified by its platform status code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("{}", self.symbol())]
pub struct TransportError {
    code: u32,
}

impl TransportError {
    pub const fn new(code: u32) -> Self {
        Self { code }
    }

    pub const fn code(&self) -> u32 {
        self.code
    }

    pub fn kind(&self) -> StatusKind {
        codes::lookup(self.code).map_or(StatusKind::Failed, |(_, kind)| kind)
    }

    pub fn is_unavailable(&self) -> bool {
        self.kind() == StatusKind::Unavailable
    }

    /// Symbolic name of the code, or its hex form when unlisted
    pub fn symbol(&self) -> String {
        codes::lookup(self.code)
            .map_or_else(|| format!("0x{:08X}", self.code), |(name, _)| name.to_string())
    }
}

/// A single CIM property value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Bool(bool),
    UInt(u64),
    Text(String),
    List(Vec<u64>),
}

/// Named properties returned for one CIM class instance.
///
/// Lookups are case-insensitive, matching CIM property naming rules.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PropertyBag(BTreeMap<String, PropertyValue>);

impl PropertyBag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert<S: Into<String>>(&mut self, name: S, value: PropertyValue) {
        self.0.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<&PropertyValue> {
        self.0.get(name).or_else(|| {
            self.0.iter().find(|(k, _)| k.eq_ignore_ascii_case(name)).map(|(_, v)| v)
        })
    }

    pub fn uint(&self, name: &str) -> Option<u64> {
        match self.get(name)? {
            PropertyValue::UInt(n) => Some(*n),
            PropertyValue::Bool(b) => Some(u64::from(*b)),
            PropertyValue::Text(s) => s.trim().parse().ok(),
            PropertyValue::List(_) => None,
        }
    }

    pub fn text(&self, name: &str) -> Option<&str> {
        match self.get(name)? {
            PropertyValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, PropertyValue)> for PropertyBag {
    fn from_iter<I: IntoIterator<Item = (String, PropertyValue)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Privileged system-information query
pub trait SystemInformation: Send + Sync {
    fn query(&self, info_class: u32, buffer_size: usize) -> Result<Vec<u8>, TransportError>;
}

/// CIM/WMI property-bag query
pub trait PropertySource: Send + Sync {
    fn query_properties(&self, class_name: &str, namespace: &str) -> Result<PropertyBag, TransportError>;
}

/// TPM command/response exchange
pub trait TpmDevice: Send + Sync {
    fn submit(&self, command: &[u8]) -> Result<Vec<u8>, TransportError>;
}

/// The set of transports one inspection run reads from
#[derive(Clone, Copy)]
pub struct Transports<'a> {
    pub system: &'a dyn SystemInformation,
    pub properties: &'a dyn PropertySource,
    pub tpm: &'a dyn TpmDevice,
}

impl<'a> Transports<'a> {
    pub fn new(
        system: &'a dyn SystemInformation,
        properties: &'a dyn PropertySource,
        tpm: &'a dyn TpmDevice,
    ) -> Self {
        Self { system, properties, tpm }
    }

    /// Serve every source from one captured snapshot
    pub fn from_snapshot(snapshot: &'a HostSnapshot) -> Self {
        Self { system: snapshot, properties: snapshot, tpm: snapshot }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symbol_for_listed_and_unlisted_codes() {
        assert_eq!(TransportError::new(0xC000_0003).symbol(), "STATUS_INVALID_INFO_CLASS");
        assert_eq!(TransportError::new(0xDEAD_BEEF).symbol(), "0xDEADBEEF");
        assert_eq!(TransportError::new(0xDEAD_BEEF).kind(), StatusKind::Failed);
    }

    #[test]
    fn test_property_lookup_is_case_insensitive() {
        let mut bag = PropertyBag::new();
        bag.insert("VirtualizationBasedSecurityStatus", PropertyValue::UInt(2));
        assert_eq!(bag.uint("virtualizationbasedsecuritystatus"), Some(2));
        assert_eq!(bag.uint("Missing"), None);
    }

    #[test]
    fn test_property_value_untagged_yaml() {
        let bag: PropertyBag = serde_yaml::from_str(
            "Manufacturer: GenuineIntel\nArchitecture: 9\nSecurityServicesRunning: [1, 2]\nVirtualMachineIsolation: false\n",
        )
        .unwrap();
        assert_eq!(bag.text("Manufacturer"), Some("GenuineIntel"));
        assert_eq!(bag.uint("Architecture"), Some(9));
        assert_eq!(bag.get("SecurityServicesRunning"), Some(&PropertyValue::List(vec![1, 2])));
        assert_eq!(bag.get("VirtualMachineIsolation"), Some(&PropertyValue::Bool(false)));
    }
}
