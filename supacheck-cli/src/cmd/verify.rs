use std::path::Path;

use supacheck_core::builtin::{self, BuiltinOptions};
use supacheck_core::{Credentials, EnvMap, VerificationPlan};
use supacheck_exec::{
    ConsoleSink, EventSink, JsonLinesSink, NoOpEventSink, PlanRunner, ReqwestHttpClient,
    ShellCommandRunner,
};

use crate::cmd::validate::{check_plan, read_plan};
use crate::exit_codes;
use crate::output::{print_error, print_result, OutputFormat};
use crate::{EnvArgs, OutputArgs};

pub async fn builtin_cmd(
    name: &str,
    opts: &BuiltinOptions,
    env: &EnvArgs,
    output: &OutputArgs,
) -> i32 {
    match builtin::builtin(name, opts) {
        Some(plan) => run_plan(&plan, env, output).await,
        None => {
            print_error(output.format, output.quiet, &format!("unknown built-in plan: {name}"));
            exit_codes::RUNTIME_ERROR
        }
    }
}

pub async fn run_file_cmd(path: &Path, env: &EnvArgs, output: &OutputArgs) -> i32 {
    let parsed = match read_plan(path, output) {
        Ok(p) => p,
        Err(code) => return code,
    };
    if let Err(code) = check_plan(&parsed, output) {
        return code;
    }
    run_plan(&parsed.plan, env, output).await
}

async fn run_plan(plan: &VerificationPlan, env: &EnvArgs, output: &OutputArgs) -> i32 {
    let env_map = EnvMap::load(&env.env_file);
    if plan.steps.iter().any(|s| s.http().is_some()) {
        warn_missing(&Credentials::from_env(&env_map), &env.env_file, output);
    }

    let client = match ReqwestHttpClient::new() {
        Ok(c) => c,
        Err(e) => {
            print_error(output.format, output.quiet, &format!("failed to build HTTP client: {e}"));
            return exit_codes::RUNTIME_ERROR;
        }
    };
    let commands = ShellCommandRunner;
    let sink: Box<dyn EventSink> = match (output.quiet, output.format) {
        (true, _) => Box::new(NoOpEventSink),
        (false, OutputFormat::Text) => Box::new(ConsoleSink::stdout()),
        (false, OutputFormat::Json) => Box::new(JsonLinesSink::stdout()),
    };

    let runner = PlanRunner::new(&client, &commands, sink.as_ref());
    let report = runner.run(plan, &env_map).await;
    tracing::info!(
        plan = %report.plan,
        verdict = %report.verdict,
        exit_code = report.exit_code,
        "plan finished"
    );

    if output.format == OutputFormat::Json {
        print_result(output.format, output.quiet, &report);
    }
    if report.exit_code != 0 {
        exit_codes::FATAL
    } else {
        exit_codes::SUCCESS
    }
}

fn warn_missing(credentials: &Credentials, env_file: &Path, output: &OutputArgs) {
    let missing = credentials.missing();
    if missing.is_empty() {
        return;
    }
    for key in &missing {
        tracing::warn!(key, env_file = %env_file.display(), "credential not set");
    }
    if output.is_text() {
        eprintln!(
            "warning: {} not set in {}",
            missing.join(", "),
            env_file.display()
        );
    }
}
