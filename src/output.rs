//! Output formatting for inspection reports.
//!
//! - Terminal: one tree branch per domain, verdicts colored (secure green, insecure red,
//!   unknown dimmed), inferred values marked with `*`
//! - JSON: the full report, pretty-printed, field order preserved
//!
//! Unexpected domain failures are only rendered when [`RenderOptions::show_failures`] is set.

use crate::config::InspectConfig;
use crate::domains;
use crate::registry::DomainRegistry;
use crate::types::{DomainReport, FieldView, InspectionReport, Secure};
use anyhow::Result;
use colored::Colorize;

/// Display options pulled from the run configuration
#[derive(Debug, Clone, Copy)]
pub struct RenderOptions {
    pub show_informational: bool,
    pub show_descriptions: bool,
    /// List domains whose query or decode failed (set by `--verbose`)
    pub show_failures: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self { show_informational: true, show_descriptions: false, show_failures: false }
    }
}

impl From<&InspectConfig> for RenderOptions {
    fn from(config: &InspectConfig) -> Self {
        Self {
            show_informational: config.show_informational,
            show_descriptions: config.show_descriptions,
            show_failures: false,
        }
    }
}

pub fn format_json(report: &InspectionReport, options: RenderOptions) -> Result<String> {
    if options.show_failures || report.failed.is_empty() {
        return Ok(serde_json::to_string_pretty(report)?);
    }
    let mut trimmed = report.clone();
    trimmed.failed.clear();
    Ok(serde_json::to_string_pretty(&trimmed)?)
}

fn verdict(secure: Secure) -> String {
    match secure {
        Secure::True => "secure".bright_green().to_string(),
        Secure::False => "insecure".bright_red().bold().to_string(),
        Secure::Unknown => String::new(),
    }
}

fn field_line(field: &FieldView<'_>, width: usize) -> String {
    let name = format!("{:<width$}", field.name, width = width);
    let value = match field.value {
        Some(value) if field.inferred => format!("{}*", value),
        Some(value) => value.to_string(),
        None => "absent".dimmed().to_string(),
    };
    let name = match field.secure {
        Secure::Unknown => name.dimmed().to_string(),
        _ => name.bright_white().to_string(),
    };
    format!("│     {}  {:<12} {}", name, value, verdict(field.secure)).trim_end().to_string()
}

fn render_domain(output: &mut String, domain: &DomainReport, options: RenderOptions) {
    let insecure = domain.insecure_count();
    let badge = if insecure > 0 { format!(" [{} insecure]", insecure).bright_red().to_string() } else { String::new() };
    output.push_str(&format!("├─ {} ({}){}\n", domain.title.bright_white().bold(), domain.id, badge));

    let fields: Vec<FieldView<'_>> =
        domain.fields().filter(|f| options.show_informational || f.secure.is_known()).collect();
    let width = fields.iter().map(|f| f.name.len()).max().unwrap_or(0);
    let notes = domains::catalog().get(domain.id);

    for field in &fields {
        output.push_str(&field_line(field, width));
        output.push('\n');
        if options.show_descriptions {
            if let Some(note) = notes.and_then(|d| d.note(field.name)) {
                output.push_str(&format!("│       {}\n", note.bright_black()));
            }
        }
    }
    output.push_str("│\n");
}

pub fn format_terminal(report: &InspectionReport, options: RenderOptions) -> Result<String> {
    let mut output = String::new();
    output.push_str(&format!(
        "CPU: {} ({})\n│\n",
        report.cpu.vendor.name().bright_white(),
        report.cpu.architecture.name()
    ));

    for domain in &report.domains {
        render_domain(&mut output, domain, options);
    }

    if options.show_failures {
        for failed in &report.failed {
            let line = format!("├─ {} failed: {}", failed.id, failed.reason);
            output.push_str(&format!("{}\n", line.bright_yellow()));
        }
    }

    let insecure = report.insecure_count();
    let summary = format!("{} domains, {} insecure fields", report.domains.len(), insecure);
    if insecure > 0 {
        output.push_str(&format!("└─ {}\n", summary.bright_red()));
    } else {
        output.push_str(&format!("└─ {}\n", summary.bright_green()));
    }
    Ok(output)
}

/// List every known domain with its source and dependency, in plan order
pub fn format_domain_list(registry: &DomainRegistry) -> String {
    let mut output = String::new();
    let ordered = registry.ordered();
    let width = ordered.iter().map(|d| d.id.as_str().len()).max().unwrap_or(0);
    for domain in ordered {
        let depends = domain
            .depends_on
            .map(|id| format!(" (needs {})", id).bright_black().to_string())
            .unwrap_or_default();
        output.push_str(&format!(
            "{:<width$}  {:<28} {}{}\n",
            domain.id.as_str().bright_white(),
            domain.title,
            domain.source.to_string().dimmed(),
            depends,
            width = width
        ));
    }
    output
}

/// JSON form of [`format_domain_list`]
pub fn format_domain_list_json(registry: &DomainRegistry) -> Result<String> {
    let entries: Vec<serde_json::Value> = registry
        .ordered()
        .into_iter()
        .map(|d| {
            serde_json::json!({
                "id": d.id,
                "title": d.title,
                "source": d.source.to_string(),
                "depends_on": d.depends_on,
                "fields": d.field_names(),
            })
        })
        .collect();
    Ok(serde_json::to_string_pretty(&entries)?)
}
