use crate::error::ParseError;
use crate::plan::VerificationPlan;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Json,
    Yaml,
    Auto,
}

#[derive(Debug, Clone)]
pub struct ParsedPlan {
    pub plan: VerificationPlan,
    pub format: DocumentFormat,
}

pub fn parse_plan_str(input: &str, format: DocumentFormat) -> Result<ParsedPlan, ParseError> {
    match format {
        DocumentFormat::Json => Ok(ParsedPlan {
            plan: serde_json::from_str::<VerificationPlan>(input)?,
            format,
        }),
        DocumentFormat::Yaml => Ok(ParsedPlan {
            plan: serde_yaml::from_str::<VerificationPlan>(input)?,
            format,
        }),
        DocumentFormat::Auto => parse_plan_auto(input),
    }
}

fn parse_plan_auto(input: &str) -> Result<ParsedPlan, ParseError> {
    if input.trim().is_empty() {
        return Err(ParseError::UnknownFormat);
    }

    // JSON always starts with `{` after trimming; everything else is YAML.
    if input.trim_start().starts_with('{') {
        return match serde_json::from_str::<VerificationPlan>(input) {
            Ok(plan) => Ok(ParsedPlan {
                plan,
                format: DocumentFormat::Json,
            }),
            Err(e) => match serde_yaml::from_str::<VerificationPlan>(input) {
                Ok(plan) => Ok(ParsedPlan {
                    plan,
                    format: DocumentFormat::Yaml,
                }),
                Err(_) => Err(ParseError::Json(e)),
            },
        };
    }

    match serde_yaml::from_str::<VerificationPlan>(input) {
        Ok(plan) => Ok(ParsedPlan {
            plan,
            format: DocumentFormat::Yaml,
        }),
        Err(e) => Err(ParseError::Yaml(e)),
    }
}
