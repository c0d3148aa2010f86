//! @ai:module:intent Format run reports and inspections (JSON, text)
//! @ai:module:layer infrastructure
//! @ai:module:public_api OutputFormat, format_report, format_inspection, to_json
//! @ai:module:depends_on enricher, operations
//! @ai:module:stateless true

use crate::enricher::{EnrichReport, FileStatus, Inspection};
use crate::operations::Phase;
use colored::Colorize;
use serde::Serialize;

/// @ai:intent Output format options
#[derive(Debug, Clone, Copy, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
    JsonPretty,
}

/// @ai:intent Format any serializable value as JSON
/// @ai:effects pure
pub fn to_json<T: Serialize>(value: &T, pretty: bool) -> String {
    if pretty {
        serde_json::to_string_pretty(value).unwrap_or_default()
    } else {
        serde_json::to_string(value).unwrap_or_default()
    }
}

/// @ai:intent Format a run report as a string
/// @ai:effects pure
pub fn format_report(report: &EnrichReport, format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => to_json(report, false),
        OutputFormat::JsonPretty => to_json(report, true),
        OutputFormat::Text => format_report_text(report),
    }
}

/// @ai:intent Format a run report as human-readable text
/// @ai:effects pure
fn format_report_text(report: &EnrichReport) -> String {
    let mut output = String::new();

    for failure in &report.failures {
        let label = if failure.configuration {
            "CONFIG".red().bold()
        } else {
            "ERROR".red().bold()
        };
        output.push_str(&format!(
            "{} {} - {}\n",
            label,
            failure.path.display().to_string().dimmed(),
            failure.message
        ));
    }

    for path in &report.written {
        output.push_str(&format!("{} {}\n", "wrote".green(), path.display()));
    }

    if !report.operations.is_empty() {
        output.push_str(&format!("\n  {}:\n", "Operations".bold()));
        for (operation, counts) in &report.operations {
            let done = match report.phase {
                Phase::Add => counts.applied,
                Phase::Remove => counts.removed,
            };
            output.push_str(&format!(
                "    {:<14} {} {}, {} not exported, {} not applicable\n",
                operation.cyan(),
                done,
                match report.phase {
                    Phase::Add => "applied",
                    Phase::Remove => "removed",
                },
                counts.not_exported,
                counts.not_applicable
            ));
        }
    }

    output.push('\n');
    output.push_str(&format!(
        "Scanned {} files: {} repositories, {} skipped, {} written\n",
        report.files_scanned, report.files_enriched, report.files_skipped, report.files_written
    ));

    if report.passed() {
        output.push_str(&format!("{} No failures\n", "OK".green().bold()));
    } else {
        output.push_str(&format!(
            "{} files failed\n",
            report.failures.len().to_string().red().bold()
        ));
    }

    output
}

/// @ai:intent Format an inspection as a string
/// @ai:effects pure
pub fn format_inspection(inspection: &Inspection, format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => to_json(inspection, false),
        OutputFormat::JsonPretty => to_json(inspection, true),
        OutputFormat::Text => format_inspection_text(inspection),
    }
}

fn format_inspection_text(inspection: &Inspection) -> String {
    let mut output = String::new();

    output.push_str(&format!(
        "{} ({})\n",
        inspection.path.display().to_string().bold(),
        inspection.repository.as_deref().unwrap_or("no type")
    ));

    let status = match inspection.status {
        FileStatus::Enriched => "repository".green(),
        FileStatus::NotRepository => "not a repository".dimmed(),
        FileStatus::NotExported => "not exported".yellow(),
        FileStatus::NoDomain => "no domain type".yellow(),
    };
    output.push_str(&format!("  Status: {}\n", status));

    if let Some(classification) = &inspection.classification {
        let mut bases = Vec::new();
        if classification.crud {
            bases.push("crud");
        }
        if classification.predicate {
            bases.push("predicate");
        }
        if classification.plain {
            bases.push("plain");
        }
        output.push_str(&format!("  Bases: {}\n", bases.join(", ")));
    }
    if let Some(domain) = &inspection.domain {
        output.push_str(&format!("  Domain: {}\n", domain));
    }
    if let Some(id) = &inspection.id {
        output.push_str(&format!("  Id: {}\n", id));
    }
    if let Some(path) = &inspection.collection_path {
        output.push_str(&format!("  Path: /{}\n", path));
    }
    if let Some(companion) = &inspection.companion {
        output.push_str(&format!("  Companion: {}\n", companion));
    }

    if !inspection.methods.is_empty() {
        output.push_str(&format!("\n  Methods ({}):\n", inspection.methods.len()));
        for method in &inspection.methods {
            let origin = if method.local {
                String::new()
            } else {
                format!(" from {}", method.owner).dimmed().to_string()
            };
            output.push_str(&format!(
                "    {}({}){}\n",
                method.name.cyan(),
                method.parameters.join(", "),
                origin
            ));
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enricher::FileFailure;
    use std::path::PathBuf;

    fn report() -> EnrichReport {
        let mut report = EnrichReport::new(Phase::Add);
        report.files_scanned = 3;
        report.files_enriched = 1;
        report.files_skipped = 1;
        report.files_written = 1;
        report.written.push(PathBuf::from("src/WidgetRepository.java"));
        report.failures.push(FileFailure {
            path: PathBuf::from("src/RawRepository.java"),
            message: "missing type arguments".to_string(),
            configuration: true,
        });
        report
    }

    #[test]
    fn test_text_report_lists_writes_and_failures() {
        colored::control::set_override(false);
        let text = format_report(&report(), OutputFormat::Text);
        assert!(text.contains("CONFIG src/RawRepository.java - missing type arguments"));
        assert!(text.contains("wrote src/WidgetRepository.java"));
        assert!(text.contains("Scanned 3 files: 1 repositories, 1 skipped, 1 written"));
        assert!(text.contains("1 files failed"));
    }

    #[test]
    fn test_json_report_shape() {
        let json: serde_json::Value =
            serde_json::from_str(&format_report(&report(), OutputFormat::Json)).unwrap();
        assert_eq!(json["phase"], "add");
        assert_eq!(json["files_written"], 1);
        assert_eq!(json["failures"][0]["configuration"], true);
    }
}
