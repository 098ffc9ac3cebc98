use std::path::{Path, PathBuf};

use serde::Serialize;
use supacheck_core::credentials::{SUPABASE_ANON_KEY, SUPABASE_SERVICE_ROLE_KEY, SUPABASE_URL};
use supacheck_core::{Credentials, EnvMap};

use crate::exit_codes;
use crate::output::print_result;
use crate::{EnvArgs, OutputArgs, SupabaseBinArgs};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum CheckStatus {
    Ok,
    Warning,
    Error,
}

#[derive(Serialize)]
struct Check {
    name: String,
    status: CheckStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
}

impl Check {
    fn new(name: &str, status: CheckStatus, message: impl Into<String>) -> Self {
        Self {
            name: name.to_string(),
            status,
            message: Some(message.into()),
        }
    }
}

#[derive(Serialize)]
struct DoctorResult {
    checks: Vec<Check>,
    all_passed: bool,
}

pub fn doctor_cmd(env: &EnvArgs, bin: &SupabaseBinArgs, output: &OutputArgs) -> i32 {
    let env_map = EnvMap::load(&env.env_file);
    let credentials = Credentials::from_env(&env_map);

    let checks = vec![
        check_env_file(&env.env_file, &env_map),
        check_url(&credentials),
        check_anon_key(&credentials),
        check_service_key(&credentials),
        check_supabase_bin(&bin.supabase_bin),
    ];

    let all_passed = checks.iter().all(|c| c.status != CheckStatus::Error);
    let result = DoctorResult { checks, all_passed };

    if output.is_text() {
        println!("Environment checks:");
        for c in &result.checks {
            let icon = match c.status {
                CheckStatus::Ok => "✓",
                CheckStatus::Warning => "!",
                CheckStatus::Error => "✗",
            };
            print!("  {icon} {}", c.name);
            if let Some(msg) = &c.message {
                print!(" - {msg}");
            }
            println!();
        }
        if result.all_passed {
            println!("\nAll checks passed.");
        } else {
            println!("\nSome checks failed.");
        }
    } else {
        print_result(output.format, output.quiet, &result);
    }

    if all_passed {
        exit_codes::SUCCESS
    } else {
        exit_codes::RUNTIME_ERROR
    }
}

fn check_env_file(path: &Path, env: &EnvMap) -> Check {
    if path.is_file() {
        Check::new(
            "env file",
            CheckStatus::Ok,
            format!("{} ({} keys)", path.display(), env.len()),
        )
    } else {
        Check::new(
            "env file",
            CheckStatus::Error,
            format!("{} not found", path.display()),
        )
    }
}

fn check_url(credentials: &Credentials) -> Check {
    let Some(raw) = credentials.url.as_deref() else {
        return Check::new(SUPABASE_URL, CheckStatus::Error, "not set");
    };
    match url::Url::parse(raw) {
        Ok(u) if matches!(u.scheme(), "http" | "https") => Check::new(SUPABASE_URL, CheckStatus::Ok, raw),
        Ok(u) => Check::new(
            SUPABASE_URL,
            CheckStatus::Error,
            format!("unsupported scheme '{}'", u.scheme()),
        ),
        Err(e) => Check::new(SUPABASE_URL, CheckStatus::Error, format!("invalid URL: {e}")),
    }
}

fn check_anon_key(credentials: &Credentials) -> Check {
    match credentials.anon_key {
        Some(_) => Check::new(SUPABASE_ANON_KEY, CheckStatus::Ok, "set"),
        None => Check::new(SUPABASE_ANON_KEY, CheckStatus::Error, "not set"),
    }
}

fn check_service_key(credentials: &Credentials) -> Check {
    match (&credentials.service_role_key, &credentials.anon_key) {
        (Some(_), _) => Check::new(SUPABASE_SERVICE_ROLE_KEY, CheckStatus::Ok, "set"),
        (None, Some(_)) => Check::new(
            SUPABASE_SERVICE_ROLE_KEY,
            CheckStatus::Warning,
            "not set; read-backs fall back to the anon key",
        ),
        (None, None) => Check::new(SUPABASE_SERVICE_ROLE_KEY, CheckStatus::Warning, "not set"),
    }
}

/// `deploy` needs the CLI; the verify commands do not, so absence is only a warning.
fn check_supabase_bin(bin: &str) -> Check {
    let program = bin.split_whitespace().next().unwrap_or(bin);
    match find_program(program) {
        Some(path) => Check::new("supabase cli", CheckStatus::Ok, path.display().to_string()),
        None => Check::new(
            "supabase cli",
            CheckStatus::Warning,
            format!("'{program}' not found on PATH (needed by deploy)"),
        ),
    }
}

fn find_program(program: &str) -> Option<PathBuf> {
    let direct = Path::new(program);
    if direct.components().count() > 1 {
        return direct.is_file().then(|| direct.to_path_buf());
    }
    let paths = std::env::var_os("PATH")?;
    std::env::split_paths(&paths).find_map(|dir| {
        let candidate = dir.join(program);
        if candidate.is_file() {
            return Some(candidate);
        }
        let exe = candidate.with_extension("exe");
        (cfg!(windows) && exe.is_file()).then_some(exe)
    })
}
