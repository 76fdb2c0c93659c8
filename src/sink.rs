//! Report sink that writes pass results to a terminal or a buffer

use std::io::{self, Write};

use async_trait::async_trait;
use fill_engine::{CodedRecord, DisplayMessage, FieldStatus, FillOutcome, ReportSink};
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::Value;
use tracing::warn;

use crate::cli::output::OutputFormat;

/// Tagged envelope so a consumer of the JSON/YAML stream can tell the two
/// messages of a pass apart.
#[derive(Serialize)]
#[serde(tag = "message", rename_all = "snake_case")]
enum Report<'a> {
    Outcome(&'a FillOutcome),
    Display(&'a DisplayMessage),
}

pub struct PrintSink<W = io::Stdout> {
    format: OutputFormat,
    out: Mutex<W>,
}

impl PrintSink {
    pub fn stdout(format: OutputFormat) -> Self {
        Self::new(io::stdout(), format)
    }
}

impl<W: Write + Send> PrintSink<W> {
    pub fn new(out: W, format: OutputFormat) -> Self {
        Self {
            format,
            out: Mutex::new(out),
        }
    }

    fn emit(&self, report: Report<'_>) {
        let rendered = match self.format {
            OutputFormat::Human => Ok(human(&report)),
            OutputFormat::Json => serde_json::to_string(&report).map_err(|err| err.to_string()),
            OutputFormat::Yaml => serde_yaml::to_string(&report)
                .map(|doc| format!("---\n{}", doc.trim_end()))
                .map_err(|err| err.to_string()),
        };
        match rendered {
            Ok(text) => {
                let mut out = self.out.lock();
                if let Err(err) = writeln!(out, "{text}").and_then(|_| out.flush()) {
                    warn!(error = %err, "failed to write report");
                }
            }
            Err(err) => warn!(error = %err, "failed to render report"),
        }
    }
}

impl PrintSink<Vec<u8>> {
    pub fn buffered(format: OutputFormat) -> Self {
        Self::new(Vec::new(), format)
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.out.lock()).into_owned()
    }
}

#[async_trait]
impl<W: Write + Send> ReportSink for PrintSink<W> {
    async fn outcome(&self, outcome: &FillOutcome) {
        self.emit(Report::Outcome(outcome));
    }

    async fn display(&self, message: &DisplayMessage) {
        self.emit(Report::Display(message));
    }
}

fn human(report: &Report<'_>) -> String {
    match report {
        Report::Outcome(outcome) => human_outcome(outcome),
        Report::Display(message) => human_display(message),
    }
}

fn human_outcome(outcome: &FillOutcome) -> String {
    let mut lines = Vec::new();
    let verdict = match (outcome.success(), outcome.all_fields_resolved()) {
        (true, true) => "filled, every field resolved",
        (true, false) => "filled, some fields unresolved",
        (false, _) => "FAILED",
    };
    lines.push(format!("Pass {}: {}", outcome.pass_id(), verdict));
    for report in outcome.fields() {
        let status = match report.status {
            FieldStatus::Filled => "filled",
            FieldStatus::NotFound => "not found",
            FieldStatus::NotOffered => "not offered",
        };
        lines.push(format!("  {:<40} {:<10} {}", report.field, report.kind, status));
    }
    if let Some(error) = outcome.error() {
        lines.push(format!(
            "  error ({}): {}",
            outcome.error_kind().unwrap_or("unknown"),
            error
        ));
    }
    lines.join("\n")
}

fn human_display(message: &DisplayMessage) -> String {
    let mut lines = vec![message.title.clone()];
    push_records(&mut lines, "Operations", &message.operations);
    push_records(&mut lines, "Diagnoses", &message.diagnoses);
    if let Some(summary) = &message.summary {
        lines.push("Summary:".to_string());
        for (name, value) in summary {
            let value = match value {
                Value::Null => "-".to_string(),
                Value::String(text) => text.clone(),
                other => other.to_string(),
            };
            lines.push(format!("  {}: {}", name, value));
        }
    }
    lines.join("\n")
}

fn push_records(lines: &mut Vec<String>, heading: &str, records: &[CodedRecord]) {
    if records.is_empty() {
        return;
    }
    lines.push(format!("{heading}:"));
    for record in records {
        lines.push(format!("  {} {}", record.code, record.name));
    }
}
