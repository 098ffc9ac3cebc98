use regex::Regex;
use serde::Serialize;
use serde_json::Value as JsonValue;
use serde_json_path::JsonPath;

use crate::plan::Expectation;

/// A decoded HTTP response as seen by expectations and captures.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResponseRecord {
    pub status: u16,
    pub body: String,
    #[serde(skip)]
    pub json: Option<JsonValue>,
}

impl ResponseRecord {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        let body = body.into();
        let json = serde_json::from_str(&body).ok();
        Self { status, body, json }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Resolves an RFC 6901 pointer against the JSON body.
    pub fn pointer(&self, pointer: &str) -> Option<&JsonValue> {
        self.json.as_ref()?.pointer(pointer)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExpectationFailure {
    pub expectation: String,
    pub reason: String,
}

/// Checks every expectation; an empty list means "2xx".
pub fn evaluate_all(expectations: &[Expectation], resp: &ResponseRecord) -> Vec<ExpectationFailure> {
    if expectations.is_empty() {
        return evaluate(&Expectation::Success, resp).into_iter().collect();
    }
    expectations
        .iter()
        .filter_map(|e| evaluate(e, resp))
        .collect()
}

pub fn evaluate(expectation: &Expectation, resp: &ResponseRecord) -> Option<ExpectationFailure> {
    let reason = match expectation {
        Expectation::Success => {
            (!resp.is_success()).then(|| format!("expected a 2xx status, got {}", resp.status))
        }
        Expectation::Status { code } => {
            (resp.status != *code).then(|| format!("expected status {code}, got {}", resp.status))
        }
        Expectation::BodyContains { text } => {
            (!resp.body.contains(text.as_str())).then(|| format!("body does not contain {text:?}"))
        }
        Expectation::FieldPresent { pointer } => resp
            .pointer(pointer)
            .is_none()
            .then(|| format!("no value at {pointer:?}")),
        Expectation::FieldEquals { pointer, value } => match resp.pointer(pointer) {
            None => Some(format!("no value at {pointer:?}")),
            Some(actual) if json_eq(actual, value) => None,
            Some(actual) => Some(format!("{pointer:?} is {actual}, expected {value}")),
        },
        Expectation::NonEmpty { pointer } => {
            let target = match pointer {
                Some(p) => resp.pointer(p),
                None => resp.json.as_ref(),
            };
            let at = pointer.as_deref().unwrap_or("body");
            match target {
                Some(v) if !is_empty_value(v) => None,
                Some(_) => Some(format!("{at} is empty")),
                None => Some(format!("{at} is missing or not JSON")),
            }
        }
        Expectation::JsonPath { path } => match (JsonPath::parse(path), resp.json.as_ref()) {
            (Err(e), _) => Some(format!("invalid JSONPath {path:?}: {e}")),
            (Ok(_), None) => Some("body is not JSON".to_string()),
            (Ok(p), Some(json)) => p
                .query(json)
                .all()
                .is_empty()
                .then(|| format!("JSONPath {path:?} matched nothing")),
        },
        Expectation::Regex { pattern } => match Regex::new(pattern) {
            Ok(re) => (!re.is_match(&resp.body)).then(|| format!("body does not match /{pattern}/")),
            Err(e) => Some(format!("invalid regex {pattern:?}: {e}")),
        },
    };

    reason.map(|reason| ExpectationFailure {
        expectation: describe(expectation),
        reason,
    })
}

pub fn describe(expectation: &Expectation) -> String {
    match expectation {
        Expectation::Success => "success".to_string(),
        Expectation::Status { code } => format!("status == {code}"),
        Expectation::BodyContains { text } => format!("body contains {text:?}"),
        Expectation::FieldPresent { pointer } => format!("field {pointer:?} present"),
        Expectation::FieldEquals { pointer, value } => format!("{pointer:?} == {value}"),
        Expectation::NonEmpty { pointer: Some(p) } => format!("{p:?} non-empty"),
        Expectation::NonEmpty { pointer: None } => "body non-empty".to_string(),
        Expectation::JsonPath { path } => format!("jsonpath {path}"),
        Expectation::Regex { pattern } => format!("regex /{pattern}/"),
    }
}

fn is_empty_value(v: &JsonValue) -> bool {
    match v {
        JsonValue::Null => true,
        JsonValue::Array(a) => a.is_empty(),
        JsonValue::Object(o) => o.is_empty(),
        JsonValue::String(s) => s.is_empty(),
        JsonValue::Bool(_) | JsonValue::Number(_) => false,
    }
}

fn json_eq(a: &JsonValue, b: &JsonValue) -> bool {
    match (a, b) {
        (JsonValue::Number(a), JsonValue::Number(b)) => a.as_f64() == b.as_f64(),
        (JsonValue::Array(a), JsonValue::Array(b)) => {
            a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| json_eq(x, y))
        }
        (JsonValue::Object(a), JsonValue::Object(b)) => {
            a.len() == b.len()
                && a.iter().all(|(k, v)| b.get(k).map(|bv| json_eq(v, bv)).unwrap_or(false))
        }
        _ => a == b,
    }
}

/// Renders a JSON value the way the console shows it: strings bare, everything else compact JSON.
pub fn display_value(v: &JsonValue) -> String {
    match v {
        JsonValue::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_expectations_mean_2xx() {
        assert!(evaluate_all(&[], &ResponseRecord::new(201, "")).is_empty());
        let failures = evaluate_all(&[], &ResponseRecord::new(401, "{}"));
        assert_eq!(failures.len(), 1);
        assert!(failures[0].reason.contains("401"));
    }

    #[test]
    fn body_contains_is_a_substring_check() {
        let resp = ResponseRecord::new(200, r##"{"success":true,"content":"# Draft"}"##);
        let exp = [
            Expectation::BodyContains { text: "success".into() },
            Expectation::BodyContains { text: "content".into() },
        ];
        assert!(evaluate_all(&exp, &resp).is_empty());
        let miss = Expectation::BodyContains { text: "draft_id".into() };
        assert!(evaluate(&miss, &resp).is_some());
    }

    #[test]
    fn non_empty_on_rows() {
        let exp = Expectation::NonEmpty { pointer: None };
        assert!(evaluate(&exp, &ResponseRecord::new(200, r#"[{"id":1}]"#)).is_none());
        assert!(evaluate(&exp, &ResponseRecord::new(200, "[]")).is_some());
        assert!(evaluate(&exp, &ResponseRecord::new(200, "not json")).is_some());
    }

    #[test]
    fn field_present_and_equals() {
        let resp = ResponseRecord::new(200, r#"[{"id":"t-1","version":2}]"#);
        assert!(evaluate(&Expectation::FieldPresent { pointer: "/0/id".into() }, &resp).is_none());
        assert!(evaluate(&Expectation::FieldPresent { pointer: "/1/id".into() }, &resp).is_some());
        let eq = Expectation::FieldEquals {
            pointer: "/0/version".into(),
            value: json!(2.0),
        };
        assert!(evaluate(&eq, &resp).is_none());
    }

    #[test]
    fn jsonpath_and_regex() {
        let resp = ResponseRecord::new(200, r#"{"logged": true}"#);
        assert!(evaluate(&Expectation::JsonPath { path: "$.logged".into() }, &resp).is_none());
        assert!(evaluate(&Expectation::JsonPath { path: "$.missing".into() }, &resp).is_some());
        assert!(evaluate(&Expectation::Regex { pattern: r#""logged":\s*true"#.into() }, &resp).is_none());
    }

    #[test]
    fn status_expectation() {
        let resp = ResponseRecord::new(204, "");
        assert!(evaluate(&Expectation::Status { code: 204 }, &resp).is_none());
        assert!(evaluate(&Expectation::Status { code: 200 }, &resp).is_some());
    }
}
