use std::path::Path;

use serde::Serialize;
use supacheck_core::{parse_plan_str, DocumentFormat, ParseError, ParsedPlan, Validate};

use crate::exit_codes;
use crate::output::{print_error, print_result};
use crate::OutputArgs;

#[derive(Serialize)]
struct ValidateResult {
    valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    plan: Option<String>,
    format: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    errors: Vec<String>,
}

/// Reads and parses a plan file, printing the problem and returning the exit code on failure.
pub fn read_plan(path: &Path, output: &OutputArgs) -> Result<ParsedPlan, i32> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        print_error(
            output.format,
            output.quiet,
            &format!("failed to read {}: {e}", path.display()),
        );
        exit_codes::RUNTIME_ERROR
    })?;

    parse_plan_str(&content, DocumentFormat::Auto).map_err(|e| {
        let message = match e {
            ParseError::Json(e) => format!("JSON parse failed: {e}"),
            ParseError::Yaml(e) => format!("YAML parse failed: {e}"),
            ParseError::UnknownFormat => "input is neither valid JSON nor valid YAML".to_string(),
        };
        print_error(output.format, output.quiet, &message);
        exit_codes::VALIDATION_FAILED
    })
}

/// Prints every violation; `Ok` when the plan may run.
pub fn check_plan(parsed: &ParsedPlan, output: &OutputArgs) -> Result<(), i32> {
    let Err(err) = parsed.plan.validate() else {
        return Ok(());
    };
    let errors: Vec<String> = err.violations.iter().map(ToString::to_string).collect();
    if output.is_text() {
        eprintln!("error: validation failed");
        for e in &errors {
            eprintln!("- {e}");
        }
    } else {
        let result = ValidateResult {
            valid: false,
            plan: Some(parsed.plan.name.clone()),
            format: format!("{:?}", parsed.format),
            errors,
        };
        print_result(output.format, output.quiet, &result);
    }
    Err(exit_codes::VALIDATION_FAILED)
}

pub fn validate_cmd(path: &Path, output: &OutputArgs) -> i32 {
    let parsed = match read_plan(path, output) {
        Ok(p) => p,
        Err(code) => return code,
    };
    if let Err(code) = check_plan(&parsed, output) {
        return code;
    }

    if output.is_text() {
        println!(
            "ok: valid plan '{}' with {} steps ({:?})",
            parsed.plan.name,
            parsed.plan.steps.len(),
            parsed.format
        );
    } else {
        let result = ValidateResult {
            valid: true,
            plan: Some(parsed.plan.name.clone()),
            format: format!("{:?}", parsed.format),
            errors: vec![],
        };
        print_result(output.format, output.quiet, &result);
    }
    exit_codes::SUCCESS
}
