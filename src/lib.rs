//! mitscan - CPU side-channel and platform security mitigation inspector.
//!
//! Raw status is read from three sources (system-information classes, CIM property bags, and a
//! TPM capability query), decoded against declarative layouts into ordered feature records, and
//! classified field by field as secure, insecure, or unknown for the running processor.
//!
//! # Example
//!
//! ```no_run
//! use mitscan::{inspect, HostSnapshot, InspectConfig, Transports};
//!
//! let host = HostSnapshot::load("host.yaml").unwrap();
//! let report = inspect(&Transports::from_snapshot(&host), &InspectConfig::default()).unwrap();
//!
//! for domain in &report.domains {
//!     println!("{}: {} insecure", domain.id, domain.insecure_count());
//! }
//! ```

pub mod bitfield;
pub mod classifier;
pub mod cli;
pub mod config;
pub mod cpu;
pub mod decoders;
pub mod domains;
pub mod error;
pub mod output;
pub mod properties;
pub mod registry;
pub mod transport;
pub mod types;

// Re-export commonly used types at crate root
pub use config::InspectConfig;
pub use cpu::{Architecture, CpuContext, CpuVendor};
pub use domains::{catalog, DomainId};
pub use error::{DecodeError, DomainError, MitscanError, Result};
pub use registry::{DomainRegistry, ExecutionPlan, Inspector};
pub use transport::{HostSnapshot, Transports};
pub use types::{DomainReport, FeatureRecord, FieldValue, InspectionReport, Secure, SecureAnnotations};

use domains::Layout;
use tracing::debug;

/// Inspect the domains selected by `config` against one set of transports
pub fn inspect(transports: &Transports<'_>, config: &InspectConfig) -> Result<InspectionReport> {
    config.validate()?;
    let plan = catalog().plan(&config.domains);
    let inspector = Inspector::new(*transports).parallel(config.parallel_fetch);
    Ok(inspector.run(&plan))
}

/// Decode and classify one raw blob offline.
///
/// `dependency` holds the raw bytes of the domain this one depends on, if any; it is decoded
/// against that domain's layout and handed to the classifier.
pub fn decode_blob(id: DomainId, raw: &[u8], dependency: Option<&[u8]>, cpu: CpuContext) -> Result<DomainReport> {
    let domain = catalog().get(id).ok_or_else(|| MitscanError::unknown_domain(id.as_str()))?;
    let Layout::Bits(spec) = domain.layout else {
        return Err(MitscanError::not_bit_packed(id.as_str()));
    };
    let mut record = decoders::decode(raw, spec).map_err(DomainError::from)?;

    let dependency_record = match (domain.depends_on, dependency) {
        (Some(dep_id), Some(bytes)) => {
            let dep = catalog().get(dep_id).ok_or_else(|| MitscanError::unknown_domain(dep_id.as_str()))?;
            let Layout::Bits(dep_spec) = dep.layout else {
                return Err(MitscanError::not_bit_packed(dep_id.as_str()));
            };
            let mut dep_record = decoders::decode(bytes, dep_spec).map_err(DomainError::from)?;
            (dep.classify)(&dep_record, &cpu, None).apply_to(&mut dep_record);
            Some(dep_record)
        }
        (None, Some(_)) => {
            debug!("{} has no dependency, ignoring dependency bytes", id);
            None
        }
        _ => None,
    };

    let classification = (domain.classify)(&record, &cpu, dependency_record.as_ref());
    classification.apply_to(&mut record);
    Ok(DomainReport::new(domain.id, domain.title, record, classification.annotations))
}
