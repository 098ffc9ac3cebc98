use std::io::Write;
use std::sync::Mutex;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value as JsonValue;
use supacheck_core::expect::{display_value, ExpectationFailure};
use supacheck_core::template::render_with;
use supacheck_core::{Display, ResponseRecord, Severity};
use uuid::Uuid;

use crate::command::CommandOutput;
use crate::report::Verdict;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    PlanStarted {
        plan: String,
        run_id: Uuid,
        #[serde(skip_serializing_if = "Option::is_none")]
        title: Option<String>,
    },
    StepStarted {
        step_id: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        title: Option<String>,
    },
    StepSkipped {
        step_id: String,
        reason: String,
    },
    Waiting {
        step_id: String,
        delay_ms: u64,
    },
    CommandStarted {
        step_id: String,
        command: String,
    },
    CommandFinished {
        step_id: String,
        command: String,
        output: CommandOutput,
    },
    RequestSent {
        step_id: String,
        method: String,
        url: String,
    },
    ResponseReceived {
        step_id: String,
        response: ResponseRecord,
        #[serde(skip)]
        display: Display,
    },
    CallFailed {
        step_id: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        status: Option<u16>,
        error: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        body: Option<String>,
    },
    ExpectationsFailed {
        step_id: String,
        failures: Vec<ExpectationFailure>,
    },
    Captured {
        step_id: String,
        name: String,
        value: String,
    },
    StepFailed {
        step_id: String,
        severity: Severity,
        message: String,
    },
    StepPassed {
        step_id: String,
    },
    PlanFinished {
        run_id: Uuid,
        verdict: Verdict,
        exit_code: i32,
    },
}

#[async_trait]
pub trait EventSink: Send + Sync {
    async fn emit(&self, event: Event);
}

pub struct NoOpEventSink;

#[async_trait]
impl EventSink for NoOpEventSink {
    async fn emit(&self, _event: Event) {}
}

/// Human-readable progress, one line per fact, in the order things happen.
pub struct ConsoleSink<W> {
    out: Mutex<W>,
}

impl ConsoleSink<std::io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write + Send> ConsoleSink<W> {
    pub fn new(out: W) -> Self {
        Self { out: Mutex::new(out) }
    }

    pub fn into_inner(self) -> W {
        match self.out.into_inner() {
            Ok(w) => w,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn write_lines(&self, lines: Vec<String>) {
        let mut out = match self.out.lock() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        };
        for line in lines {
            let _ = writeln!(out, "{line}");
        }
        let _ = out.flush();
    }
}

#[async_trait]
impl<W: Write + Send> EventSink for ConsoleSink<W> {
    async fn emit(&self, event: Event) {
        let lines = render_console(&event);
        if !lines.is_empty() {
            self.write_lines(lines);
        }
    }
}

pub fn render_console(event: &Event) -> Vec<String> {
    match event {
        Event::PlanStarted { title, .. } => title.iter().cloned().collect(),
        Event::StepStarted { title, .. } => title
            .iter()
            .map(|t| format!("\n--- {t} ---"))
            .collect(),
        Event::StepSkipped { reason, .. } => vec![reason.clone()],
        Event::Waiting { .. } | Event::RequestSent { .. } | Event::StepPassed { .. } => Vec::new(),
        Event::CommandStarted { command, .. } => vec![format!("Running: {command}")],
        Event::CommandFinished {
            command, output, ..
        } => {
            if output.success {
                let mut lines = vec![output.stdout.trim_end().to_string()];
                if !output.stderr.is_empty() {
                    lines.push(format!("Stderr: {}", output.stderr.trim_end()));
                }
                lines
            } else {
                vec![
                    format!("Error running command: {command}"),
                    format!("Stdout: {}", output.stdout.trim_end()),
                    format!("Stderr: {}", output.stderr.trim_end()),
                ]
            }
        }
        Event::ResponseReceived {
            response, display, ..
        } => render_response(response, display),
        Event::CallFailed {
            status, error, body, ..
        } => {
            let mut lines = match status {
                Some(_) => vec![format!("Call failed: {error}")],
                None => vec![format!("Error: {error}")],
            };
            if let Some(body) = body {
                lines.push(body.clone());
            }
            lines
        }
        Event::ExpectationsFailed { failures, .. } => failures
            .iter()
            .map(|f| format!("  expected {}: {}", f.expectation, f.reason))
            .collect(),
        Event::Captured { name, value, .. } => vec![format!("Using {name}: {value}")],
        Event::StepFailed {
            severity, message, ..
        } => match severity {
            Severity::Failure => vec![message.clone()],
            Severity::Warning => vec![format!("Warning: {message}")],
            Severity::Info => vec![format!("Note: {message}")],
        },
        Event::PlanFinished { verdict, .. } => vec![format!("\n{verdict}")],
    }
}

fn render_response(resp: &ResponseRecord, display: &Display) -> Vec<String> {
    let rows: &[JsonValue] = resp
        .json
        .as_ref()
        .and_then(JsonValue::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[]);
    match display {
        Display::Quiet => Vec::new(),
        Display::Body => vec![
            format!("Status: {}", resp.status),
            format!("Response: {}", resp.body),
        ],
        Display::Count { noun } => vec![format!("Found {} {noun}.", rows.len())],
        Display::Rows { noun, format } => {
            let mut lines = vec![format!("Found {} {noun}.", rows.len())];
            lines.extend(rows.iter().map(|row| format_row(format, row)));
            lines
        }
        Display::Latest { noun, label } => {
            let mut lines = vec![format!("Found {} {noun}.", rows.len())];
            if let Some(first) = rows.first() {
                lines.push(format!("{label}: {first}"));
            }
            lines
        }
    }
}

/// Fills `${field}` from a row; absent fields render as `null`.
fn format_row(format: &str, row: &JsonValue) -> String {
    let rendered = render_with(format, |name| {
        Some(row.get(name).map(display_value).unwrap_or_else(|| "null".to_string()))
    });
    rendered.unwrap_or_else(|_| row.to_string())
}

/// One JSON object per event, for machines.
pub struct JsonLinesSink<W> {
    out: Mutex<W>,
}

impl JsonLinesSink<std::io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write + Send> JsonLinesSink<W> {
    pub fn new(out: W) -> Self {
        Self { out: Mutex::new(out) }
    }

    pub fn into_inner(self) -> W {
        match self.out.into_inner() {
            Ok(w) => w,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

#[async_trait]
impl<W: Write + Send> EventSink for JsonLinesSink<W> {
    async fn emit(&self, event: Event) {
        let line = match serde_json::to_string(&event) {
            Ok(l) => l,
            Err(e) => {
                tracing::warn!(error = %e, "failed to encode event");
                return;
            }
        };
        let mut out = match self.out.lock() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        };
        let _ = writeln!(out, "{line}");
        let _ = out.flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_render_each_log_line() {
        let resp = ResponseRecord::new(
            200,
            r#"[{"created_at":"2026-01-01T00:00:00Z","action":"LOGIN","details":{"ip":"1.2.3.4"}},{"action":"X"}]"#,
        );
        let lines = render_response(
            &resp,
            &Display::Rows {
                noun: "logs".into(),
                format: "- ${created_at} [${action}]: ${details}".into(),
            },
        );
        assert_eq!(
            lines,
            vec![
                "Found 2 logs.".to_string(),
                r#"- 2026-01-01T00:00:00Z [LOGIN]: {"ip":"1.2.3.4"}"#.to_string(),
                "- null [X]: null".to_string(),
            ]
        );
    }

    #[test]
    fn failed_command_prints_both_streams() {
        let event = Event::CommandFinished {
            step_id: "db_push".into(),
            command: "supabase db push".into(),
            output: CommandOutput {
                status_code: Some(1),
                success: false,
                stdout: "partial\n".into(),
                stderr: "not linked\n".into(),
            },
        };
        assert_eq!(
            render_console(&event),
            vec![
                "Error running command: supabase db push".to_string(),
                "Stdout: partial".to_string(),
                "Stderr: not linked".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn json_sink_tags_events() {
        let sink = JsonLinesSink::new(Vec::new());
        sink.emit(Event::Captured {
            step_id: "fetch_tender".into(),
            name: "tender_id".into(),
            value: "t-1".into(),
        })
        .await;
        let out = String::from_utf8(sink.into_inner()).unwrap();
        let v: JsonValue = serde_json::from_str(out.trim()).unwrap();
        assert_eq!(v["type"], "captured");
        assert_eq!(v["value"], "t-1");
    }
}
