//! Declarative verification plans: an ordered list of steps, each a shell
//! command or an HTTP request with expectations about the response.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::credentials::AuthKey;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationPlan {
    pub name: String,
    /// Printed once before the first step.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub success_message: Option<String>,
    pub steps: Vec<Step>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Fixed wait before the step runs (read-after-write settling).
    #[serde(default, skip_serializing_if = "is_zero")]
    pub delay_ms: u64,
    #[serde(flatten)]
    pub action: StepAction,
    #[serde(default)]
    pub on_failure: OnFailure,
    #[serde(default)]
    pub severity: Severity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_message: Option<String>,
    /// Skip the step when this file does not exist. Supports `${VAR}` placeholders.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requires_file: Option<String>,
}

fn is_zero(v: &u64) -> bool {
    *v == 0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StepAction {
    Command {
        command: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        cwd: Option<String>,
    },
    Http(HttpRequestSpec),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HttpRequestSpec {
    #[serde(default)]
    pub method: HttpMethod,
    pub url: String,
    #[serde(default)]
    pub auth: AuthKey,
    /// Also send the key as an `apikey` header (required by the REST gateway).
    #[serde(default)]
    pub apikey_header: bool,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<JsonValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub expect: Vec<Expectation>,
    /// Variable name -> JSON pointer into the response body.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub capture: BTreeMap<String, String>,
    #[serde(default)]
    pub display: Display,
}

impl HttpRequestSpec {
    pub fn new(method: HttpMethod, url: impl Into<String>, auth: AuthKey) -> Self {
        Self {
            method,
            url: url.into(),
            auth,
            apikey_header: false,
            headers: BTreeMap::new(),
            body: None,
            timeout_ms: None,
            expect: Vec::new(),
            capture: BTreeMap::new(),
            display: Display::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    #[default]
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Expectation {
    /// 2xx status.
    Success,
    Status { code: u16 },
    BodyContains { text: String },
    FieldPresent { pointer: String },
    FieldEquals { pointer: String, value: JsonValue },
    /// Non-empty array, object or string at `pointer` (body root when absent).
    NonEmpty {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pointer: Option<String>,
    },
    /// At least one node matches.
    JsonPath { path: String },
    Regex { pattern: String },
}

/// How a successful HTTP response is summarised on the console.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "style", rename_all = "snake_case")]
pub enum Display {
    /// `Status: <code>` and `Response: <raw body>`.
    #[default]
    Body,
    /// `Found <n> <noun>.`
    Count { noun: String },
    /// `Found <n> <noun>.` followed by one line per row rendered from `format`.
    Rows { noun: String, format: String },
    /// `Found <n> <noun>.` followed by `<label>: <first row>`.
    Latest { noun: String, label: String },
    Quiet,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OnFailure {
    /// Halt the plan and exit the process with status 1.
    Exit,
    /// Halt the plan; the process still exits 0.
    Stop,
    #[default]
    Continue,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warning,
    #[default]
    Failure,
}

impl Step {
    pub fn http(&self) -> Option<&HttpRequestSpec> {
        match &self.action {
            StepAction::Http(h) => Some(h),
            StepAction::Command { .. } => None,
        }
    }
}
