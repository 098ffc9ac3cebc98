//! The stock deployment and verification plans.

use std::collections::BTreeMap;

use serde_json::json;

use crate::credentials::AuthKey;
use crate::plan::{
    Display, Expectation, HttpMethod, HttpRequestSpec, OnFailure, Severity, Step, StepAction,
    VerificationPlan,
};

pub const DEPLOY: &str = "deploy";
pub const VERIFY_SYSTEM: &str = "verify-system";
pub const VERIFY_AUDIT: &str = "verify-audit";
pub const VERIFY_WRITE: &str = "verify-write";
pub const VERIFY_AI_DRAFTER: &str = "verify-ai-drafter";
pub const DIAGNOSE: &str = "diagnose";

pub const BUILTIN_PLANS: &[&str] = &[
    DEPLOY,
    VERIFY_SYSTEM,
    VERIFY_AUDIT,
    VERIFY_WRITE,
    VERIFY_AI_DRAFTER,
    DIAGNOSE,
];

/// Knobs the stock plans expose on the command line.
#[derive(Debug, Clone)]
pub struct BuiltinOptions {
    /// Checked from the process working directory but read by the Supabase CLI
    /// from `project_dir`; pass an absolute path when the two differ.
    pub env_file: String,
    pub supabase_bin: String,
    pub project_dir: Option<String>,
    /// Wait between the audit-logger call and the read-back query.
    pub settle_delay_ms: u64,
    pub ai_timeout_ms: u64,
}

impl Default for BuiltinOptions {
    fn default() -> Self {
        Self {
            env_file: ".env".to_string(),
            supabase_bin: "supabase".to_string(),
            project_dir: None,
            settle_delay_ms: 2_000,
            ai_timeout_ms: 30_000,
        }
    }
}

pub fn builtin(name: &str, opts: &BuiltinOptions) -> Option<VerificationPlan> {
    let plan = match name {
        DEPLOY => deploy(opts),
        VERIFY_SYSTEM => verify_system(opts),
        VERIFY_AUDIT => verify_audit(),
        VERIFY_WRITE => verify_write(),
        VERIFY_AI_DRAFTER => verify_ai_drafter(opts),
        DIAGNOSE => diagnose(),
        _ => return None,
    };
    Some(plan)
}

fn step(id: &str, title: &str, action: StepAction) -> Step {
    Step {
        id: id.to_string(),
        title: Some(title.to_string()),
        delay_ms: 0,
        action,
        on_failure: OnFailure::Continue,
        severity: Severity::Failure,
        failure_message: None,
        requires_file: None,
    }
}

fn command(line: String, cwd: Option<String>) -> StepAction {
    StepAction::Command { command: line, cwd }
}

pub fn deploy(opts: &BuiltinOptions) -> VerificationPlan {
    let bin = &opts.supabase_bin;
    let cwd = opts.project_dir.clone();

    let mut push = step(
        "db_push",
        "1. Pushing Database Migrations",
        command(format!("{bin} db push"), cwd.clone()),
    );
    push.on_failure = OnFailure::Exit;
    push.failure_message = Some("Failed to push database migrations.".to_string());

    let mut secrets = step(
        "set_secrets",
        "2. Setting Secrets",
        command(
            format!("{bin} secrets set --env-file {}", shell_quote(&opts.env_file)),
            cwd.clone(),
        ),
    );
    secrets.severity = Severity::Warning;
    secrets.failure_message = Some("Failed to set secrets. Continuing...".to_string());
    secrets.requires_file = Some(opts.env_file.clone());

    let mut functions = step(
        "deploy_functions",
        "3. Deploying Edge Functions",
        command(format!("{bin} functions deploy --no-verify-jwt"), cwd),
    );
    functions.on_failure = OnFailure::Exit;
    functions.failure_message = Some("Failed to deploy functions.".to_string());

    VerificationPlan {
        name: DEPLOY.to_string(),
        title: None,
        success_message: Some("Setup and Deployment Complete.".to_string()),
        steps: vec![push, secrets, functions],
    }
}

/// Quotes `arg` for the platform shell unless it is plainly safe.
fn shell_quote(arg: &str) -> String {
    let plain = !arg.is_empty()
        && arg
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '/' | '.' | '_' | '-' | ':'));
    if plain {
        arg.to_string()
    } else if cfg!(windows) {
        format!("\"{arg}\"")
    } else {
        format!("'{}'", arg.replace('\'', r"'\''"))
    }
}

pub fn verify_system(opts: &BuiltinOptions) -> VerificationPlan {
    let mut invoke = HttpRequestSpec::new(
        HttpMethod::Post,
        "${SUPABASE_URL}/functions/v1/audit-logger",
        AuthKey::Anon,
    );
    invoke.body = Some(json!({
        "action": "TEST_VERIFICATION",
        "details": {"test": "run_v1", "run_id": "${RUN_ID}"},
        "severity": "INFO",
    }));
    let mut invoke = step("audit_logger", "Testing 'audit-logger'", StepAction::Http(invoke));
    // A failed call is reported, but the read-back may still find rows from earlier runs.
    invoke.severity = Severity::Info;

    let mut read = HttpRequestSpec::new(
        HttpMethod::Get,
        "${SUPABASE_URL}/rest/v1/audit_logs?action=eq.TEST_VERIFICATION&select=*&order=created_at.desc&limit=1",
        AuthKey::ServiceOrAnon,
    );
    read.apikey_header = true;
    read.expect = vec![Expectation::NonEmpty { pointer: None }];
    read.display = Display::Latest {
        noun: "test logs".to_string(),
        label: "Latest Log".to_string(),
    };
    let mut read = step(
        "read_back",
        "Verifying DB Insert (via Rest, Service Role)",
        StepAction::Http(read),
    );
    read.delay_ms = opts.settle_delay_ms;
    read.failure_message = Some("Validation log not found in DB.".to_string());

    VerificationPlan {
        name: VERIFY_SYSTEM.to_string(),
        title: Some("Target: ${SUPABASE_URL}".to_string()),
        success_message: Some("System Verified.".to_string()),
        steps: vec![invoke, read],
    }
}

pub fn verify_audit() -> VerificationPlan {
    let mut invoke = HttpRequestSpec::new(
        HttpMethod::Post,
        "${SUPABASE_URL}/functions/v1/audit-logger",
        AuthKey::Anon,
    );
    invoke.body = Some(json!({"action": "DEBUG_TEST", "severity": "INFO"}));
    let mut invoke = step("audit_logger", "Calling 'audit-logger'", StepAction::Http(invoke));
    invoke.failure_message = Some("audit-logger call failed.".to_string());

    VerificationPlan {
        name: VERIFY_AUDIT.to_string(),
        title: Some("Calling ${SUPABASE_URL}/functions/v1/audit-logger".to_string()),
        success_message: Some("audit-logger accepted the entry.".to_string()),
        steps: vec![invoke],
    }
}

pub fn verify_write() -> VerificationPlan {
    let mut insert = HttpRequestSpec::new(
        HttpMethod::Post,
        "${SUPABASE_URL}/rest/v1/audit_logs",
        AuthKey::ServiceRole,
    );
    insert.apikey_header = true;
    insert.headers = BTreeMap::from([("Prefer".to_string(), "return=representation".to_string())]);
    insert.body = Some(json!({
        "action": "MANUAL_TEST",
        "severity": "INFO",
        "details": {"method": "direct_rest"},
    }));
    let mut insert = step("insert_log", "Inserting audit log via REST", StepAction::Http(insert));
    insert.failure_message = Some("Write failed.".to_string());

    VerificationPlan {
        name: VERIFY_WRITE.to_string(),
        title: Some("Verifying DB Write via REST...".to_string()),
        success_message: Some("Manually inserted log.".to_string()),
        steps: vec![insert],
    }
}

pub fn verify_ai_drafter(opts: &BuiltinOptions) -> VerificationPlan {
    let mut fetch = HttpRequestSpec::new(
        HttpMethod::Get,
        "${SUPABASE_URL}/rest/v1/tenders?select=id&limit=1",
        AuthKey::Anon,
    );
    fetch.apikey_header = true;
    fetch.capture.insert("tender_id".to_string(), "/0/id".to_string());
    fetch.display = Display::Quiet;
    let mut fetch = step("fetch_tender", "Fetching a tender context", StepAction::Http(fetch));
    // The drafter refuses unknown tenders, so there is nothing to test without one.
    fetch.on_failure = OnFailure::Stop;
    fetch.severity = Severity::Warning;
    fetch.failure_message = Some("Cannot test AI Drafter without a tender.".to_string());

    let mut draft = HttpRequestSpec::new(
        HttpMethod::Post,
        "${SUPABASE_URL}/functions/v1/ai-drafter",
        AuthKey::Anon,
    );
    draft.apikey_header = true;
    draft.timeout_ms = Some(opts.ai_timeout_ms);
    draft.body = Some(json!({
        "tender_id": "${tender_id}",
        "section_name": "Health and Safety",
        "prompt": "Write a brief safety policy.",
    }));
    draft.expect = vec![
        Expectation::BodyContains {
            text: "success".to_string(),
        },
        Expectation::BodyContains {
            text: "content".to_string(),
        },
    ];
    let mut draft = step("draft", "Calling 'ai-drafter'", StepAction::Http(draft));
    draft.severity = Severity::Warning;
    draft.failure_message = Some("Response structure unexpected.".to_string());

    VerificationPlan {
        name: VERIFY_AI_DRAFTER.to_string(),
        title: Some("Verifying AI Drafter...".to_string()),
        success_message: Some("AI Drafter returned content.".to_string()),
        steps: vec![fetch, draft],
    }
}

pub fn diagnose() -> VerificationPlan {
    let mut list = HttpRequestSpec::new(
        HttpMethod::Get,
        "${SUPABASE_URL}/rest/v1/audit_logs?select=*&order=created_at.desc&limit=5",
        AuthKey::ServiceOrAnon,
    );
    list.apikey_header = true;
    list.display = Display::Rows {
        noun: "logs".to_string(),
        format: "- ${created_at} [${action}]: ${details}".to_string(),
    };
    let mut list = step("recent_logs", "Listing last 5 audit logs", StepAction::Http(list));
    list.failure_message = Some("Could not list audit logs.".to_string());

    VerificationPlan {
        name: DIAGNOSE.to_string(),
        title: Some("Diagnosing DB Schema...".to_string()),
        success_message: Some("Listed recent audit logs.".to_string()),
        steps: vec![list],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validate::validate_plan;

    #[test]
    fn every_builtin_validates() {
        let opts = BuiltinOptions::default();
        for name in BUILTIN_PLANS {
            let plan = builtin(name, &opts).unwrap();
            assert_eq!(plan.name, *name);
            validate_plan(&plan).unwrap_or_else(|e| panic!("{name}: {:?}", e.violations));
        }
        assert!(builtin("nope", &opts).is_none());
    }

    #[test]
    fn deploy_commands_use_configured_binary() {
        let opts = BuiltinOptions {
            supabase_bin: "npx supabase".to_string(),
            env_file: "prod.env".to_string(),
            project_dir: Some("backend".to_string()),
            ..Default::default()
        };
        let plan = deploy(&opts);
        let commands: Vec<_> = plan
            .steps
            .iter()
            .map(|s| match &s.action {
                StepAction::Command { command, cwd } => (command.as_str(), cwd.as_deref()),
                StepAction::Http(_) => panic!("deploy only runs commands"),
            })
            .collect();
        assert_eq!(
            commands,
            vec![
                ("npx supabase db push", Some("backend")),
                ("npx supabase secrets set --env-file prod.env", Some("backend")),
                ("npx supabase functions deploy --no-verify-jwt", Some("backend")),
            ]
        );
        assert_eq!(plan.steps[1].requires_file.as_deref(), Some("prod.env"));
        assert_eq!(plan.steps[0].on_failure, OnFailure::Exit);
        assert_eq!(plan.steps[1].on_failure, OnFailure::Continue);
    }

    #[cfg(not(windows))]
    #[test]
    fn env_file_with_spaces_is_quoted() {
        let opts = BuiltinOptions {
            env_file: "/srv/my project/it's.env".to_string(),
            ..Default::default()
        };
        let plan = deploy(&opts);
        let StepAction::Command { command, .. } = &plan.steps[1].action else {
            panic!("set_secrets runs a command");
        };
        assert_eq!(
            command,
            r"supabase secrets set --env-file '/srv/my project/it'\''s.env'"
        );
        // The existence check sees the unquoted path.
        assert_eq!(plan.steps[1].requires_file.as_deref(), Some("/srv/my project/it's.env"));
    }
}
