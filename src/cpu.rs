//! Processor vendor and architecture resolution.
//!
//! The context is resolved once per run from the `Win32_Processor` property bag and then passed
//! by reference into every classifier. A failed lookup yields `Unknown`, never an error.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::transport::{PropertyBag, PropertySource};

pub const PROCESSOR_NAMESPACE: &str = r"root\cimv2";
pub const PROCESSOR_CLASS: &str = "Win32_Processor";

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum CpuVendor {
    Intel,
    Amd,
    Arm,
    #[default]
    Unknown,
}

impl CpuVendor {
    /// Map a CPUID-style manufacturer string
    pub fn from_manufacturer(manufacturer: &str) -> Self {
        match manufacturer.trim() {
            "GenuineIntel" => Self::Intel,
            "AuthenticAMD" => Self::Amd,
            m if m.eq_ignore_ascii_case("ARM") || m.starts_with("ARM ") => Self::Arm,
            _ => Self::Unknown,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Intel => "Intel",
            Self::Amd => "AMD",
            Self::Arm => "ARM",
            Self::Unknown => "Unknown",
        }
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Architecture {
    X86,
    X64,
    Arm,
    Arm64,
    #[default]
    Unknown,
}

impl Architecture {
    /// Map the `Win32_Processor.Architecture` code
    pub const fn from_cim_code(code: u64) -> Self {
        match code {
            0 => Self::X86,
            5 => Self::Arm,
            9 => Self::X64,
            12 => Self::Arm64,
            _ => Self::Unknown,
        }
    }

    pub const fn is_arm(self) -> bool {
        matches!(self, Self::Arm | Self::Arm64)
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::X86 => "x86",
            Self::X64 => "x64",
            Self::Arm => "ARM",
            Self::Arm64 => "ARM64",
            Self::Unknown => "Unknown",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CpuContext {
    pub vendor: CpuVendor,
    pub architecture: Architecture,
}

impl CpuContext {
    pub const UNKNOWN: Self = Self { vendor: CpuVendor::Unknown, architecture: Architecture::Unknown };

    pub const fn new(vendor: CpuVendor, architecture: Architecture) -> Self {
        Self { vendor, architecture }
    }

    /// Build a context from an explicit architecture. ARM architectures imply an ARM vendor.
    pub const fn with_architecture(vendor: CpuVendor, architecture: Architecture) -> Self {
        let vendor = if architecture.is_arm() { CpuVendor::Arm } else { vendor };
        Self { vendor, architecture }
    }

    /// Build a context for a vendor alone, picking the usual architecture for it
    pub const fn for_vendor(vendor: CpuVendor) -> Self {
        let architecture = match vendor {
            CpuVendor::Intel | CpuVendor::Amd => Architecture::X64,
            CpuVendor::Arm => Architecture::Arm64,
            CpuVendor::Unknown => Architecture::Unknown,
        };
        Self { vendor, architecture }
    }

    pub fn is_intel(&self) -> bool {
        self.vendor == CpuVendor::Intel
    }

    pub fn is_amd(&self) -> bool {
        self.vendor == CpuVendor::Amd
    }

    pub fn is_arm(&self) -> bool {
        self.vendor == CpuVendor::Arm
    }

    /// Derive the context from a `Win32_Processor` property bag.
    /// ARM architectures imply an ARM vendor whatever the manufacturer string says.
    pub fn from_properties(bag: &PropertyBag) -> Self {
        let architecture = bag
            .uint("Architecture")
            .map_or(Architecture::Unknown, Architecture::from_cim_code);
        let vendor = bag.text("Manufacturer").map_or(CpuVendor::Unknown, CpuVendor::from_manufacturer);
        Self::with_architecture(vendor, architecture)
    }

    /// Query the property source. Failures degrade to `Unknown`.
    pub fn resolve(source: &dyn PropertySource) -> Self {
        match source.query_properties(PROCESSOR_CLASS, PROCESSOR_NAMESPACE) {
            Ok(bag) => {
                let ctx = Self::from_properties(&bag);
                debug!(
                    "Resolved CPU context: vendor={} architecture={}",
                    ctx.vendor.name(),
                    ctx.architecture.name()
                );
                ctx
            }
            Err(e) => {
                warn!("Failed to query {}: {}, CPU vendor unknown", PROCESSOR_CLASS, e);
                Self::UNKNOWN
            }
        }
    }
}
