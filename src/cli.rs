use clap::{Parser, Subcommand};

use crate::cpu::{Architecture, CpuVendor};
use crate::domains::DomainId;

#[derive(Parser, Debug)]
#[command(name = "mitscan")]
#[command(about = "Inspect CPU side-channel and platform security mitigation status")]
#[command(version)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Output format (json, terminal)
    #[arg(short, long, global = true, default_value = "terminal")]
    pub format: OutputFormat,

    /// Write output to file
    #[arg(short, long, global = true)]
    pub output: Option<String>,

    /// Verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// YAML configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Inspect every selected domain of a captured host snapshot
    Inspect {
        /// Snapshot file (YAML)
        snapshot: String,

        /// Domain to inspect; repeat for several (default: all)
        #[arg(short, long = "domain", value_enum)]
        domains: Vec<DomainId>,

        /// Exit with an error if any field is insecure
        #[arg(long)]
        fail_on_insecure: bool,
    },

    /// List known domains
    Domains,

    /// Decode and classify a raw hex blob for one bit-packed domain
    Decode {
        /// Domain whose layout applies
        #[arg(value_enum)]
        domain: DomainId,

        /// Raw status bytes as hex (whitespace and 0x prefix allowed)
        hex: String,

        /// Processor vendor used by the classifier
        #[arg(long, value_enum, default_value = "unknown")]
        vendor: CpuVendor,

        /// Processor architecture (default: the usual one for the vendor)
        #[arg(long, value_enum)]
        arch: Option<Architecture>,

        /// Raw hex for the domain this one depends on
        #[arg(long)]
        dependency: Option<String>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output for machine consumption
    Json,
    /// Human-readable terminal output
    Terminal,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_inspect() {
        let args = Args::parse_from([
            "mitscan",
            "inspect",
            "host.yaml",
            "-d",
            "kva-shadow",
            "--domain",
            "tpm",
            "--fail-on-insecure",
            "-f",
            "json",
        ]);
        assert_eq!(args.format, OutputFormat::Json);
        match args.command {
            Command::Inspect { snapshot, domains, fail_on_insecure } => {
                assert_eq!(snapshot, "host.yaml");
                assert_eq!(domains, vec![DomainId::KvaShadow, DomainId::Tpm]);
                assert!(fail_on_insecure);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_decode_defaults() {
        let args = Args::parse_from(["mitscan", "decode", "speculation-control", "01020000"]);
        assert_eq!(args.format, OutputFormat::Terminal);
        match args.command {
            Command::Decode { domain, hex, vendor, arch, dependency } => {
                assert_eq!(domain, DomainId::SpeculationControl);
                assert_eq!(hex, "01020000");
                assert_eq!(vendor, CpuVendor::Unknown);
                assert!(arch.is_none());
                assert!(dependency.is_none());
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_rejects_unknown_domain() {
        assert!(Args::try_parse_from(["mitscan", "decode", "meltdown", "00"]).is_err());
    }
}
