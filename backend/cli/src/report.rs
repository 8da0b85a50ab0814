//! Report output: pretty JSON or a colored findings table.

use anyhow::Result;
use clap::ValueEnum;
use streamaudit_core::{ComplianceStatus, Severity, StreamingAnalysisResult};

pub const RESET: &str = "\x1b[0m";
pub const BOLD: &str = "\x1b[1m";
pub const DIM: &str = "\x1b[2m";

pub const RED: &str = "\x1b[31m";
pub const GREEN: &str = "\x1b[32m";
pub const YELLOW: &str = "\x1b[33m";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
}

/// Honours `NO_COLOR` and dumb terminals.
pub fn supports_color() -> bool {
    std::env::var("NO_COLOR").is_err()
        && (std::env::var("COLORTERM").is_ok()
            || std::env::var("TERM").map(|t| t != "dumb").unwrap_or(false))
}

pub fn strip_ansi(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c == '\x1b' {
            for next in chars.by_ref() {
                if next == 'm' {
                    break;
                }
            }
        } else {
            result.push(c);
        }
    }
    result
}

fn visible_width(s: &str) -> usize {
    strip_ansi(s).chars().count()
}

// ---------------------------------------------------------------------------
// Table rendering
// ---------------------------------------------------------------------------

pub struct Column {
    pub header: &'static str,
    pub max_width: Option<usize>,
}

impl Column {
    pub fn new(header: &'static str) -> Self {
        Self { header, max_width: None }
    }

    pub fn wrapped(header: &'static str, max_width: usize) -> Self {
        Self { header, max_width: Some(max_width) }
    }
}

/// Left-aligned table. Cells wider than a column's limit are cut with `…`.
pub fn render_table(columns: &[Column], rows: &[Vec<String>], color: bool) -> String {
    let mut widths: Vec<usize> = columns.iter().map(|c| c.header.len()).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate().take(columns.len()) {
            let w = visible_width(cell);
            let w = columns[i].max_width.map(|max| w.min(max)).unwrap_or(w);
            widths[i] = widths[i].max(w);
        }
    }

    let mut out = String::new();
    let header: Vec<String> = columns
        .iter()
        .zip(&widths)
        .map(|(col, w)| pad_cell(col.header, *w))
        .collect();
    if color {
        out.push_str(&format!("{BOLD}  {}  {RESET}\n", header.join("  ")));
    } else {
        out.push_str(&format!("  {}  \n", header.join("  ")));
    }
    let sep: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    out.push_str(&format!("  {}  \n", sep.join("  ")));

    for row in rows {
        let cells: Vec<String> = widths
            .iter()
            .enumerate()
            .map(|(i, w)| {
                let cell = row.get(i).map(String::as_str).unwrap_or("");
                pad_cell(&truncate_cell(cell, *w), *w)
            })
            .collect();
        out.push_str(&format!("  {}  \n", cells.join("  ")));
    }
    out
}

fn truncate_cell(cell: &str, width: usize) -> String {
    if visible_width(cell) <= width {
        return cell.to_string();
    }
    let plain: String = strip_ansi(cell).chars().take(width.saturating_sub(1)).collect();
    format!("{plain}…")
}

fn pad_cell(s: &str, width: usize) -> String {
    let pad = width.saturating_sub(visible_width(s));
    format!("{s}{}", " ".repeat(pad))
}

// ---------------------------------------------------------------------------
// Findings
// ---------------------------------------------------------------------------

fn status_label(status: ComplianceStatus, color: bool) -> String {
    let (text, tint) = match status {
        ComplianceStatus::Pass => ("PASS", GREEN),
        ComplianceStatus::Fail => ("FAIL", RED),
        ComplianceStatus::NeedsReview => ("REVIEW", YELLOW),
        ComplianceStatus::NotApplicable => ("N/A", DIM),
    };
    if color {
        format!("{tint}{text}{RESET}")
    } else {
        text.to_string()
    }
}

fn severity_label(severity: Severity) -> &'static str {
    match severity {
        Severity::Critical => "critical",
        Severity::Major => "major",
        Severity::Minor => "minor",
    }
}

pub fn render_findings(result: &StreamingAnalysisResult, color: bool) -> String {
    let mut out = String::new();
    let player = match (&result.player_type, &result.player_version) {
        (Some(kind), Some(version)) => format!("{kind} {version}"),
        (Some(kind), None) => kind.clone(),
        _ => "none detected".to_string(),
    };
    out.push_str(&format!("Player: {player}\n"));
    out.push_str(&format!(
        "Manifests: {}  Caption tracks: {}  Audio description: {}\n\n",
        result.manifests.len(),
        result.captions.track_count(),
        if result.audio_description.has_audio_description { "yes" } else { "no" }
    ));

    let columns = [
        Column::new("Clause"),
        Column::new("Status"),
        Column::new("Severity"),
        Column::wrapped("Title", 32),
        Column::wrapped("Description", 72),
    ];
    let rows: Vec<Vec<String>> = result
        .findings
        .iter()
        .map(|f| {
            vec![
                f.clause_id.clone(),
                status_label(f.status, color),
                severity_label(f.severity).to_string(),
                f.clause_title.clone(),
                f.description.clone(),
            ]
        })
        .collect();
    out.push_str(&render_table(&columns, &rows, color));

    let summary = result.summary();
    out.push_str(&format!(
        "\n{} passed, {} failed ({} critical), {} need review, {} not applicable\n",
        summary.passed,
        summary.failed,
        summary.critical_failures,
        summary.needs_review,
        summary.not_applicable
    ));
    out
}

/// Print the result to stdout in the requested format.
pub fn emit(result: &StreamingAnalysisResult, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(result)?),
        OutputFormat::Table => print!("{}", render_findings(result, supports_color())),
    }
    Ok(())
}
