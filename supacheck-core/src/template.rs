//! `${NAME}` placeholder substitution.
//!
//! A `$` not followed by `{` is kept literally, so PostgREST filters such as
//! `order=created_at.desc` or JSON bodies pass through untouched.

use std::collections::BTreeMap;

use serde_json::Value as JsonValue;

use crate::env::EnvMap;

pub type Vars = BTreeMap<String, String>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TemplateError {
    #[error("unknown variable: ${{{0}}}")]
    Unknown(String),
    #[error("unclosed placeholder (missing '}}')")]
    Unclosed,
    #[error("empty placeholder name")]
    EmptyName,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Literal(String),
    Var(String),
}

pub fn parse_template(input: &str) -> Result<Vec<Segment>, TemplateError> {
    let mut segments = Vec::new();
    let mut buf = String::new();
    let mut rest = input;

    while let Some(pos) = rest.find("${") {
        buf.push_str(&rest[..pos]);
        let after = &rest[pos + 2..];
        let end = after.find('}').ok_or(TemplateError::Unclosed)?;
        let name = after[..end].trim();
        if name.is_empty() {
            return Err(TemplateError::EmptyName);
        }
        if !buf.is_empty() {
            segments.push(Segment::Literal(std::mem::take(&mut buf)));
        }
        segments.push(Segment::Var(name.to_string()));
        rest = &after[end + 1..];
    }
    buf.push_str(rest);
    if !buf.is_empty() {
        segments.push(Segment::Literal(buf));
    }
    Ok(segments)
}

/// Names referenced by `input`, in order of appearance.
pub fn placeholders(input: &str) -> Result<Vec<String>, TemplateError> {
    Ok(parse_template(input)?
        .into_iter()
        .filter_map(|s| match s {
            Segment::Var(name) => Some(name),
            Segment::Literal(_) => None,
        })
        .collect())
}

pub fn render_with<F>(input: &str, mut lookup: F) -> Result<String, TemplateError>
where
    F: FnMut(&str) -> Option<String>,
{
    let mut out = String::with_capacity(input.len());
    for seg in parse_template(input)? {
        match seg {
            Segment::Literal(s) => out.push_str(&s),
            Segment::Var(name) => {
                let v = lookup(&name).ok_or(TemplateError::Unknown(name))?;
                out.push_str(&v);
            }
        }
    }
    Ok(out)
}

pub fn render(input: &str, vars: &Vars) -> Result<String, TemplateError> {
    render_with(input, |name| vars.get(name).cloned())
}

/// Renders every string leaf (object keys are left alone).
pub fn render_json(value: &JsonValue, vars: &Vars) -> Result<JsonValue, TemplateError> {
    match value {
        JsonValue::String(s) => Ok(JsonValue::String(render(s, vars)?)),
        JsonValue::Array(items) => items
            .iter()
            .map(|v| render_json(v, vars))
            .collect::<Result<Vec<_>, _>>()
            .map(JsonValue::Array),
        JsonValue::Object(map) => {
            let mut out = serde_json::Map::new();
            for (k, v) in map {
                out.insert(k.clone(), render_json(v, vars)?);
            }
            Ok(JsonValue::Object(out))
        }
        other => Ok(other.clone()),
    }
}

/// Seeds template variables from an env file.
pub fn vars_from_env(env: &EnvMap) -> Vars {
    env.iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> Vars {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn renders_placeholders() {
        let v = vars(&[("SUPABASE_URL", "https://p.supabase.co")]);
        let out = render("${SUPABASE_URL}/rest/v1/tenders?select=id&limit=1", &v).unwrap();
        assert_eq!(out, "https://p.supabase.co/rest/v1/tenders?select=id&limit=1");
    }

    #[test]
    fn bare_dollar_is_literal() {
        let out = render("cost $5 and ${X}", &vars(&[("X", "y")])).unwrap();
        assert_eq!(out, "cost $5 and y");
    }

    #[test]
    fn unknown_and_unclosed_are_errors() {
        assert_eq!(
            render("${NOPE}", &Vars::new()),
            Err(TemplateError::Unknown("NOPE".to_string()))
        );
        assert_eq!(render("${OPEN", &Vars::new()), Err(TemplateError::Unclosed));
        assert_eq!(render("${ }", &Vars::new()), Err(TemplateError::EmptyName));
    }

    #[test]
    fn renders_json_string_leaves() {
        let body = serde_json::json!({"tender_id": "${tender_id}", "n": 3, "nested": ["${tender_id}"]});
        let out = render_json(&body, &vars(&[("tender_id", "t-1")])).unwrap();
        assert_eq!(out, serde_json::json!({"tender_id": "t-1", "n": 3, "nested": ["t-1"]}));
    }

    #[test]
    fn lists_placeholders_in_order() {
        assert_eq!(
            placeholders("${A}/x/${B}").unwrap(),
            vec!["A".to_string(), "B".to_string()]
        );
    }
}
