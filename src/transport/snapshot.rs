//! Captured host snapshots.
//!
//! A snapshot is a YAML (or JSON) document holding the raw answers a host gave to each
//! transport. It lets the inspector run anywhere, against any captured machine:
//!
//! ```yaml
//! system_information:
//!   196: { hex: "21000000" }
//!   0xDD: { status: STATUS_INVALID_INFO_CLASS }
//! classes:
//!   - namespace: root\cimv2
//!     class: Win32_Processor
//!     properties: { Manufacturer: GenuineIntel, Architecture: 9 }
//! tpm: { status: TBS_E_TPM_NOT_FOUND }
//! ```
//!
//! Entries that are missing answer like an OS build that lacks them.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;

use super::codes::{self, STATUS_INVALID_INFO_CLASS, TBS_E_TPM_NOT_FOUND, WBEM_E_INVALID_CLASS};
use super::{PropertyBag, PropertySource, SystemInformation, TpmDevice, TransportError};
use crate::error::{MitscanError, Result};

/// A status code written either numerically or by symbolic name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StatusCode {
    Code(u32),
    Symbol(String),
}

impl StatusCode {
    fn resolve(&self) -> Result<u32> {
        match self {
            Self::Code(code) => Ok(*code),
            Self::Symbol(symbol) => parse_number(symbol)
                .or_else(|| codes::code_for_symbol(symbol))
                .ok_or_else(|| MitscanError::configuration(format!("unknown status code: {}", symbol))),
        }
    }
}

/// One captured raw answer: bytes, or the status the call failed with
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Captured {
    Data { hex: String },
    Status { status: StatusCode },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CapturedClass {
    pub namespace: String,
    pub class: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<PropertyBag>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<StatusCode>,
}

/// On-disk layout of a snapshot
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SnapshotFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Information class (decimal or `0x` hex) to captured answer
    #[serde(default)]
    pub system_information: serde_yaml::Mapping,
    #[serde(default)]
    pub classes: Vec<CapturedClass>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tpm: Option<Captured>,
}

type Answer<T> = std::result::Result<T, TransportError>;

struct ClassAnswer {
    namespace: String,
    class: String,
    answer: Answer<PropertyBag>,
}

/// Parsed, validated snapshot implementing all three transports
pub struct HostSnapshot {
    description: Option<String>,
    system_information: BTreeMap<u32, Answer<Vec<u8>>>,
    classes: Vec<ClassAnswer>,
    tpm: Option<Answer<Vec<u8>>>,
}

impl HostSnapshot {
    /// An empty snapshot answers every query as unavailable
    pub fn empty() -> Self {
        Self { description: None, system_information: BTreeMap::new(), classes: Vec::new(), tpm: None }
    }

    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let file: SnapshotFile = serde_yaml::from_str(yaml)
            .map_err(|e| MitscanError::configuration(format!("invalid snapshot: {}", e)))?;
        Self::from_file(file)
    }

    /// Load a snapshot from disk (YAML or JSON)
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(MitscanError::path_not_found(path));
        }
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content).map_err(|e| MitscanError::snapshot(path, e.to_string()))
    }

    pub fn from_file(file: SnapshotFile) -> Result<Self> {
        let mut system_information = BTreeMap::new();
        for (key, value) in file.system_information {
            let class = match &key {
                serde_yaml::Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
                serde_yaml::Value::String(s) => parse_number(s),
                _ => None,
            }
            .ok_or_else(|| MitscanError::configuration(format!("invalid information class: {:?}", key)))?;
            let captured: Captured = serde_yaml::from_value(value).map_err(|e| {
                MitscanError::configuration(format!("information class {}: {}", class, e))
            })?;
            system_information.insert(class, resolve_captured(&captured)?);
        }

        let mut classes = Vec::with_capacity(file.classes.len());
        for entry in file.classes {
            let answer = match (entry.properties, entry.status) {
                (Some(bag), None) => Ok(bag),
                (None, Some(status)) => Err(TransportError::new(status.resolve()?)),
                _ => {
                    return Err(MitscanError::configuration(format!(
                        "class {} needs exactly one of properties or status",
                        entry.class
                    )))
                }
            };
            classes.push(ClassAnswer { namespace: entry.namespace, class: entry.class, answer });
        }

        let tpm = file.tpm.as_ref().map(resolve_captured).transpose()?;

        debug!(
            "Loaded snapshot: {} information classes, {} CIM classes, tpm={}",
            system_information.len(),
            classes.len(),
            tpm.is_some()
        );

        Ok(Self { description: file.description, system_information, classes, tpm })
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Add or replace a raw system-information answer
    pub fn set_system_information(&mut self, info_class: u32, answer: Answer<Vec<u8>>) {
        self.system_information.insert(info_class, answer);
    }

    /// Add or replace a CIM class answer
    pub fn set_class(&mut self, namespace: &str, class: &str, answer: Answer<PropertyBag>) {
        self.classes.retain(|c| !(c.namespace.eq_ignore_ascii_case(namespace) && c.class.eq_ignore_ascii_case(class)));
        self.classes.push(ClassAnswer { namespace: namespace.to_string(), class: class.to_string(), answer });
    }

    pub fn set_tpm(&mut self, answer: Answer<Vec<u8>>) {
        self.tpm = Some(answer);
    }
}

impl SystemInformation for HostSnapshot {
    fn query(&self, info_class: u32, buffer_size: usize) -> Answer<Vec<u8>> {
        match self.system_information.get(&info_class) {
            Some(Ok(bytes)) => Ok(bytes[..bytes.len().min(buffer_size)].to_vec()),
            Some(Err(e)) => Err(*e),
            None => Err(TransportError::new(STATUS_INVALID_INFO_CLASS)),
        }
    }
}

impl PropertySource for HostSnapshot {
    fn query_properties(&self, class_name: &str, namespace: &str) -> Answer<PropertyBag> {
        self.classes
            .iter()
            .find(|c| c.class.eq_ignore_ascii_case(class_name) && c.namespace.eq_ignore_ascii_case(namespace))
            .map_or(Err(TransportError::new(WBEM_E_INVALID_CLASS)), |c| c.answer.clone())
    }
}

impl TpmDevice for HostSnapshot {
    // A snapshot holds one captured response; it answers the capability query it was taken with.
    fn submit(&self, _command: &[u8]) -> Answer<Vec<u8>> {
        self.tpm.clone().unwrap_or(Err(TransportError::new(TBS_E_TPM_NOT_FOUND)))
    }
}

fn resolve_captured(captured: &Captured) -> Result<Answer<Vec<u8>>> {
    match captured {
        Captured::Data { hex } => Ok(Ok(parse_hex(hex)?)),
        Captured::Status { status } => Ok(Err(TransportError::new(status.resolve()?))),
    }
}

/// Parse a hex byte string. Whitespace, underscores, and a leading `0x` are ignored.
pub fn parse_hex(input: &str) -> Result<Vec<u8>> {
    let trimmed = input.trim();
    let body = trimmed.strip_prefix("0x").or_else(|| trimmed.strip_prefix("0X")).unwrap_or(trimmed);
    let cleaned: String = body.chars().filter(|c| !c.is_whitespace() && *c != '_').collect();
    hex::decode(&cleaned).map_err(|e| MitscanError::invalid_hex(format!("{}: {}", input, e)))
}

fn parse_number(s: &str) -> Option<u32> {
    let s = s.trim();
    match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16).ok(),
        None => s.parse().ok(),
    }
}
