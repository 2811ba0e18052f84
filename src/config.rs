use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::domains::DomainId;
use crate::error::{MitscanError, Result};

/// Options for one inspection run. Loaded from YAML, then overridden by CLI flags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct InspectConfig {
    /// Domains to inspect; empty means all
    pub domains: Vec<DomainId>,
    /// Render fields that carry no secure/insecure verdict
    pub show_informational: bool,
    /// Render per-field descriptions where known
    pub show_descriptions: bool,
    /// Retrieve raw status for all domains concurrently
    pub parallel_fetch: bool,
}

impl Default for InspectConfig {
    fn default() -> Self {
        Self { domains: Vec::new(), show_informational: true, show_descriptions: false, parallel_fetch: true }
    }
}

impl InspectConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Self =
            serde_yaml::from_str(yaml).map_err(|e| MitscanError::configuration(format!("invalid config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(MitscanError::path_not_found(path));
        }
        Self::from_yaml(&std::fs::read_to_string(path)?)
    }

    /// Reject selections that name a domain twice
    pub fn validate(&self) -> Result<()> {
        for (i, id) in self.domains.iter().enumerate() {
            if self.domains[..i].contains(id) {
                return Err(MitscanError::configuration(format!("domain {} selected twice", id)));
            }
        }
        Ok(())
    }

    /// Replace the domain selection when `domains` is non-empty
    #[must_use]
    pub fn with_domains(mut self, domains: &[DomainId]) -> Self {
        if !domains.is_empty() {
            self.domains = domains.to_vec();
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults() {
        let config = InspectConfig::default();
        assert!(config.domains.is_empty());
        assert!(config.show_informational);
        assert!(config.parallel_fetch);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_yaml() {
        let config = InspectConfig::from_yaml(
            "domains: [kva-shadow, speculation-control]\nshow_informational: false\n",
        )
        .unwrap();
        assert_eq!(config.domains, vec![DomainId::KvaShadow, DomainId::SpeculationControl]);
        assert!(!config.show_informational);
        assert!(config.parallel_fetch);
    }

    #[test]
    fn test_rejects_unknown_keys_and_domains() {
        assert!(InspectConfig::from_yaml("verbose: true\n").is_err());
        assert!(InspectConfig::from_yaml("domains: [meltdown]\n").is_err());
    }

    #[test]
    fn test_duplicate_domain_rejected() {
        let err = InspectConfig::from_yaml("domains: [tpm, tpm]\n").unwrap_err();
        assert!(err.to_string().contains("selected twice"));
    }

    #[test]
    fn test_cli_selection_overrides_file() {
        let config = InspectConfig { domains: vec![DomainId::Tpm], ..Default::default() };
        assert_eq!(config.clone().with_domains(&[]).domains, vec![DomainId::Tpm]);
        assert_eq!(config.with_domains(&[DomainId::ShadowStack]).domains, vec![DomainId::ShadowStack]);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "show_descriptions: true").unwrap();
        let config = InspectConfig::load(file.path()).unwrap();
        assert!(config.show_descriptions);

        assert!(matches!(InspectConfig::load("/nonexistent/mitscan.yaml"), Err(MitscanError::PathNotFound { .. })));
    }
}
