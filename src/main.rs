use anyhow::{Context, Result};
use clap::Parser;
use std::fs;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use mitscan::cli::{self, OutputFormat};
use mitscan::output::{self, RenderOptions};
use mitscan::transport::snapshot::parse_hex;
use mitscan::{catalog, CpuContext, HostSnapshot, InspectConfig, InspectionReport, Transports};

fn load_config(path: Option<&str>) -> Result<InspectConfig> {
    match path {
        Some(path) => InspectConfig::load(path).context(format!("Failed to load config {}", path)),
        None => Ok(InspectConfig::default()),
    }
}

fn render(report: &InspectionReport, format: OutputFormat, options: RenderOptions) -> Result<String> {
    match format {
        OutputFormat::Json => output::format_json(report, options),
        OutputFormat::Terminal => output::format_terminal(report, options),
    }
}

fn main() -> Result<()> {
    let args = cli::Args::parse();

    // RUST_LOG wins, then the verbose flag
    let env_filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if args.verbose {
        EnvFilter::new("mitscan=debug")
    } else {
        EnvFilter::new("mitscan=info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_line_number(true)
        .with_writer(std::io::stderr)
        .init();

    debug!("Logging initialized (verbose={})", args.verbose);

    // Status info never goes to stdout
    eprintln!("mitscan v{}", env!("CARGO_PKG_VERSION"));

    let config = load_config(args.config.as_deref())?;
    let options = RenderOptions { show_failures: args.verbose, ..RenderOptions::from(&config) };
    let mut insecure = false;

    let result = match args.command {
        cli::Command::Inspect { snapshot, domains, fail_on_insecure } => {
            let host = HostSnapshot::load(&snapshot).context(format!("Failed to load snapshot {}", snapshot))?;
            if let Some(description) = host.description() {
                eprintln!("Snapshot: {}", description);
            }
            let config = config.with_domains(&domains);
            let report = mitscan::inspect(&Transports::from_snapshot(&host), &config)?;
            insecure = fail_on_insecure && report.has_insecure();
            render(&report, args.format, options)?
        }
        cli::Command::Domains => match args.format {
            OutputFormat::Json => output::format_domain_list_json(catalog())?,
            OutputFormat::Terminal => output::format_domain_list(catalog()),
        },
        cli::Command::Decode { domain, hex, vendor, arch, dependency } => {
            let raw = parse_hex(&hex)?;
            let dependency = dependency.as_deref().map(parse_hex).transpose()?;
            let cpu = match arch {
                Some(arch) => CpuContext::with_architecture(vendor, arch),
                None => CpuContext::for_vendor(vendor),
            };
            let decoded = mitscan::decode_blob(domain, &raw, dependency.as_deref(), cpu)
                .context(format!("Failed to decode {} for {}", hex, domain))?;
            let mut report = InspectionReport::new(cpu);
            report.domains.push(decoded);
            render(&report, args.format, options)?
        }
    };

    // Output results
    if let Some(output_path) = args.output {
        fs::write(&output_path, &result).context(format!("Failed to write output to {}", output_path))?;
        eprintln!("Results written to: {}", output_path);
    } else {
        print!("{}", result);
    }

    if insecure {
        anyhow::bail!("Insecure mitigation state detected");
    }
    Ok(())
}
