use clap::Parser;

mod args;
mod cmd;
mod commands;
mod exit_codes;
mod logging;
mod output;

pub use args::*;
use commands::Command;
use supacheck_core::builtin::{self, BuiltinOptions};

#[derive(Debug, Parser)]
#[command(name = "supacheck", version, about = "Deploy and verify a Supabase backend")]
struct Cli {
    #[command(flatten)]
    env: EnvArgs,
    #[command(flatten)]
    output: OutputArgs,
    #[command(subcommand)]
    command: Command,
}

fn main() {
    let cli = Cli::parse();
    logging::init_tracing(&cli.output.log_level, cli.output.format);

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("error: failed to create tokio runtime: {e}");
            std::process::exit(exit_codes::RUNTIME_ERROR);
        }
    };

    let exit_code = rt.block_on(run_command(cli.command, cli.env, cli.output));
    std::process::exit(exit_code);
}

async fn run_command(command: Command, mut env: EnvArgs, output: OutputArgs) -> i32 {
    // Commands may run in --project-dir, so the env file must not depend on the cwd.
    if let Ok(abs) = std::path::absolute(&env.env_file) {
        env.env_file = abs;
    }
    let mut opts = BuiltinOptions {
        env_file: env.env_file.display().to_string(),
        ..Default::default()
    };
    match command {
        Command::Deploy { project_dir, bin } => {
            opts.supabase_bin = bin.supabase_bin;
            opts.project_dir = project_dir.map(|p| p.display().to_string());
            cmd::verify::builtin_cmd(builtin::DEPLOY, &opts, &env, &output).await
        }
        Command::VerifySystem { settle_ms } => {
            opts.settle_delay_ms = settle_ms;
            cmd::verify::builtin_cmd(builtin::VERIFY_SYSTEM, &opts, &env, &output).await
        }
        Command::VerifyAudit => {
            cmd::verify::builtin_cmd(builtin::VERIFY_AUDIT, &opts, &env, &output).await
        }
        Command::VerifyWrite => {
            cmd::verify::builtin_cmd(builtin::VERIFY_WRITE, &opts, &env, &output).await
        }
        Command::VerifyAiDrafter { timeout_ms } => {
            opts.ai_timeout_ms = timeout_ms;
            cmd::verify::builtin_cmd(builtin::VERIFY_AI_DRAFTER, &opts, &env, &output).await
        }
        Command::Diagnose => cmd::verify::builtin_cmd(builtin::DIAGNOSE, &opts, &env, &output).await,
        Command::Run { path } => cmd::verify::run_file_cmd(&path, &env, &output).await,
        Command::Validate { path } => cmd::validate::validate_cmd(&path, &output),
        Command::Show { name } => cmd::show::show_cmd(&name, &opts, &output),
        Command::Doctor { bin } => cmd::doctor::doctor_cmd(&env, &bin, &output),
    }
}
