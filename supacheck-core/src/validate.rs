use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value as JsonValue;
use serde_json_path::JsonPath;

use crate::error::{ValidationError, Violation};
use crate::plan::{Display, Expectation, HttpRequestSpec, Step, StepAction, VerificationPlan};
use crate::template::placeholders;

static ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_\-]+$").expect("valid"));
static CAPTURE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("valid"));
/// Placeholders that are not captures must name an env-style variable.
static ENV_VAR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z][A-Z0-9_]*$").expect("valid"));

pub trait Validate {
    fn validate(&self) -> Result<(), ValidationError>;
}

impl Validate for VerificationPlan {
    fn validate(&self) -> Result<(), ValidationError> {
        validate_plan(self)
    }
}

pub fn validate_plan(plan: &VerificationPlan) -> Result<(), ValidationError> {
    let mut v = Validator::new();
    v.validate_plan(plan);
    v.finish()
}

struct Validator {
    violations: Vec<Violation>,
    captures: HashSet<String>,
}

impl Validator {
    fn new() -> Self {
        Self {
            violations: Vec::new(),
            captures: HashSet::new(),
        }
    }

    fn finish(self) -> Result<(), ValidationError> {
        if self.violations.is_empty() {
            Ok(())
        } else {
            Err(ValidationError::new(self.violations))
        }
    }

    fn push(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.violations.push(Violation::new(path, message));
    }

    fn validate_plan(&mut self, plan: &VerificationPlan) {
        if plan.name.trim().is_empty() {
            self.push("name", "must not be empty");
        }
        if plan.steps.is_empty() {
            self.push("steps", "must contain at least one step");
        }

        let mut seen = HashSet::new();
        for (i, step) in plan.steps.iter().enumerate() {
            let path = format!("steps[{i}]");
            if !ID_RE.is_match(&step.id) {
                self.push(format!("{path}.id"), "must match [A-Za-z0-9_-]+");
            }
            if !seen.insert(step.id.as_str()) {
                self.push(format!("{path}.id"), format!("duplicate step id {:?}", step.id));
            }
            self.validate_step(step, &path);
        }
    }

    fn validate_step(&mut self, step: &Step, path: &str) {
        if let Some(file) = &step.requires_file {
            self.validate_template(&format!("{path}.requires_file"), file);
        }

        match &step.action {
            StepAction::Command { command, cwd } => {
                if command.trim().is_empty() {
                    self.push(format!("{path}.command"), "must not be empty");
                }
                self.validate_template(&format!("{path}.command"), command);
                if let Some(cwd) = cwd {
                    self.validate_template(&format!("{path}.cwd"), cwd);
                }
            }
            StepAction::Http(http) => self.validate_http(http, path),
        }
    }

    fn validate_http(&mut self, http: &HttpRequestSpec, path: &str) {
        if http.url.trim().is_empty() {
            self.push(format!("{path}.url"), "must not be empty");
        }
        self.validate_template(&format!("{path}.url"), &http.url);
        for (name, value) in &http.headers {
            self.validate_template(&format!("{path}.headers.{name}"), value);
        }
        if let Some(body) = &http.body {
            self.validate_json_templates(&format!("{path}.body"), body);
        }
        if http.timeout_ms == Some(0) {
            self.push(format!("{path}.timeout_ms"), "must be greater than zero");
        }

        for (i, exp) in http.expect.iter().enumerate() {
            self.validate_expectation(&format!("{path}.expect[{i}]"), exp);
        }

        if let Display::Rows { format, .. } = &http.display {
            if let Err(e) = placeholders(format) {
                self.push(format!("{path}.display.format"), e.to_string());
            }
        }

        // Captures become visible to later steps only.
        for (name, pointer) in &http.capture {
            let cpath = format!("{path}.capture.{name}");
            if !CAPTURE_RE.is_match(name) {
                self.push(cpath.clone(), "capture name must match [A-Za-z_][A-Za-z0-9_]*");
            }
            if !is_json_pointer(pointer) {
                self.push(cpath, "must be a JSON pointer (\"\" or starting with '/')");
            }
        }
        self.captures.extend(http.capture.keys().cloned());
    }

    fn validate_expectation(&mut self, path: &str, exp: &Expectation) {
        match exp {
            Expectation::FieldPresent { pointer }
            | Expectation::FieldEquals { pointer, .. }
            | Expectation::NonEmpty {
                pointer: Some(pointer),
            } => {
                if !is_json_pointer(pointer) {
                    self.push(format!("{path}.pointer"), "must be a JSON pointer (\"\" or starting with '/')");
                }
            }
            Expectation::JsonPath { path: jp } => {
                if let Err(e) = JsonPath::parse(jp) {
                    self.push(format!("{path}.path"), format!("invalid JSONPath: {e}"));
                }
            }
            Expectation::Regex { pattern } => {
                if let Err(e) = Regex::new(pattern) {
                    self.push(format!("{path}.pattern"), format!("invalid regex: {e}"));
                }
            }
            Expectation::Status { code } => {
                if !(100..=599).contains(code) {
                    self.push(format!("{path}.code"), "must be a valid HTTP status code");
                }
            }
            Expectation::Success
            | Expectation::BodyContains { .. }
            | Expectation::NonEmpty { pointer: None } => {}
        }
    }

    fn validate_json_templates(&mut self, path: &str, value: &JsonValue) {
        match value {
            JsonValue::String(s) => self.validate_template(path, s),
            JsonValue::Array(items) => {
                for (i, item) in items.iter().enumerate() {
                    self.validate_json_templates(&format!("{path}[{i}]"), item);
                }
            }
            JsonValue::Object(map) => {
                for (k, v) in map {
                    self.validate_json_templates(&format!("{path}.{k}"), v);
                }
            }
            _ => {}
        }
    }

    fn validate_template(&mut self, path: &str, s: &str) {
        let names = match placeholders(s) {
            Ok(n) => n,
            Err(e) => {
                self.push(path, e.to_string());
                return;
            }
        };
        for name in names {
            if self.captures.contains(&name) || ENV_VAR_RE.is_match(&name) {
                continue;
            }
            self.push(
                path,
                format!("${{{name}}} is neither an earlier capture nor an env variable"),
            );
        }
    }
}

fn is_json_pointer(p: &str) -> bool {
    p.is_empty() || p.starts_with('/')
}
