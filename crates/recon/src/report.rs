use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use crate::error::EngineError;
use crate::model::{Change, ChangeType, DiffResult};

/// Output format for a diff report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    /// Plain text, suitable for a terminal or a .txt file.
    Console,
    /// Markdown with per-section headings.
    Markdown,
}

/// Render a diff as human-readable text. Verbose mode adds per-property
/// deltas under each modified record.
pub fn render(diff: &DiffResult, format: ReportFormat, verbose: bool) -> String {
    let mut out = String::new();
    match format {
        ReportFormat::Console => {
            let _ = writeln!(out, "Changes for {}", diff.object_type);
            let _ = writeln!(
                out,
                "  {} new, {} modified, {} deleted, {} unchanged",
                diff.num_new(),
                diff.num_modified(),
                diff.num_deleted(),
                diff.num_unchanged()
            );
            for (heading, change_type) in sections() {
                let changes: Vec<&Change> = diff.changes_of(change_type).collect();
                if changes.is_empty() {
                    continue;
                }
                let _ = writeln!(out, "\n{heading}:");
                for change in changes {
                    let _ = writeln!(out, "  {}", change.description);
                    if verbose {
                        for (field, delta) in &change.details {
                            let _ = writeln!(out, "    {field}: {delta}");
                        }
                    }
                }
            }
        }
        ReportFormat::Markdown => {
            let _ = writeln!(out, "# Changes for {}\n", diff.object_type);
            let _ = writeln!(
                out,
                "{} new, {} modified, {} deleted, {} unchanged",
                diff.num_new(),
                diff.num_modified(),
                diff.num_deleted(),
                diff.num_unchanged()
            );
            for (heading, change_type) in sections() {
                let changes: Vec<&Change> = diff.changes_of(change_type).collect();
                if changes.is_empty() {
                    continue;
                }
                let _ = writeln!(out, "\n## {heading}\n");
                for change in changes {
                    let _ = writeln!(out, "- {}", change.description);
                    if verbose {
                        for (field, delta) in &change.details {
                            let _ = writeln!(out, "  - `{field}`: {delta}");
                        }
                    }
                }
            }
        }
    }
    out
}

fn sections() -> [(&'static str, ChangeType); 3] {
    [
        ("New", ChangeType::New),
        ("Modified", ChangeType::Modified),
        ("Only in target", ChangeType::Deleted),
    ]
}

/// Write a rendered report to disk. The format is chosen by extension:
/// `.txt` for plain text, `.md` for Markdown, `.json` for the raw diff.
pub fn export(diff: &DiffResult, path: &Path, verbose: bool) -> Result<(), EngineError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default();
    let content = match ext {
        "txt" => render(diff, ReportFormat::Console, verbose),
        "md" => render(diff, ReportFormat::Markdown, verbose),
        "json" => {
            serde_json::to_string_pretty(diff).map_err(|e| EngineError::Io(e.to_string()))?
        }
        other => return Err(EngineError::UnsupportedFormat(other.to_string())),
    };
    fs::write(path, content).map_err(|e| EngineError::Io(e.to_string()))
}
