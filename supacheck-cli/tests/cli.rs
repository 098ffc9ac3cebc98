use std::fs;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn supacheck() -> Command {
    Command::cargo_bin("supacheck").unwrap()
}

const GOOD_PLAN: &str = r#"
name: health
steps:
  - id: ping
    kind: http
    method: GET
    url: ${SUPABASE_URL}/rest/v1/
    auth: anon
    expect:
      - type: status
        code: 200
"#;

#[test]
fn validate_accepts_good_plan() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("plan.yaml");
    fs::write(&path, GOOD_PLAN).unwrap();

    supacheck()
        .args(["validate", path.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("ok: valid plan 'health' with 1 steps"));
}

#[test]
fn validate_reports_violations() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("plan.yaml");
    fs::write(
        &path,
        "name: broken\nsteps:\n  - id: a\n    kind: command\n    command: ''\n",
    )
    .unwrap();

    supacheck()
        .args(["validate", path.to_str().unwrap()])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("steps[0].command"));
}

#[test]
fn validate_rejects_unparseable_plan() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("plan.yaml");
    fs::write(&path, "invalid: yaml: content").unwrap();

    supacheck()
        .args(["validate", path.to_str().unwrap()])
        .assert()
        .code(2);
}

#[test]
fn validate_missing_file_is_runtime_error() {
    let dir = TempDir::new().unwrap();
    supacheck()
        .args(["validate", dir.path().join("nope.yaml").to_str().unwrap()])
        .assert()
        .code(4);
}

#[test]
fn show_prints_builtin_as_yaml() {
    supacheck()
        .args(["show", "verify-system"])
        .assert()
        .success()
        .stdout(predicate::str::contains("name: verify-system"))
        .stdout(predicate::str::contains("/functions/v1/audit-logger"));
}

#[test]
fn show_unknown_plan_fails() {
    supacheck()
        .args(["show", "verify-everything"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("verify-ai-drafter"));
}

#[test]
fn verify_without_env_file_reports_and_exits_zero() {
    let dir = TempDir::new().unwrap();
    supacheck()
        .current_dir(dir.path())
        .args(["verify-system", "--settle-ms", "0"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Target: <unset>"))
        .stdout(predicate::str::contains(
            "FAILURE: read_back failed: unknown variable: ${SUPABASE_URL}",
        ))
        .stderr(predicate::str::contains("SUPABASE_URL"));
}

#[test]
fn ai_drafter_without_env_names_the_missing_url() {
    let dir = TempDir::new().unwrap();
    supacheck()
        .current_dir(dir.path())
        .arg("verify-ai-drafter")
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "WARNING: fetch_tender failed: unknown variable: ${SUPABASE_URL}",
        ));
}

#[test]
fn json_format_emits_one_object_per_line() {
    let dir = TempDir::new().unwrap();
    let out = supacheck()
        .current_dir(dir.path())
        .args(["--format", "json", "verify-audit"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let text = String::from_utf8(out).unwrap();
    let lines: Vec<serde_json::Value> = text
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    assert_eq!(lines.first().unwrap()["type"], "plan_started");
    let report = lines.last().unwrap();
    assert_eq!(report["plan"], "verify-audit");
    assert_eq!(report["verdict"]["kind"], "FAILURE");
}

#[cfg(unix)]
#[test]
fn deploy_fatal_step_exits_one() {
    let dir = TempDir::new().unwrap();
    supacheck()
        .current_dir(dir.path())
        .args(["deploy", "--supabase-bin", "false"])
        .assert()
        .code(1)
        .stdout(predicate::str::contains("Error running command: false db push"))
        .stdout(predicate::str::contains("FAILURE: Failed to push database migrations."))
        .stdout(predicate::str::contains("Deploying Edge Functions").not());
}

#[cfg(unix)]
#[test]
fn deploy_runs_all_steps() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("prod.env"), "SUPABASE_URL=http://localhost\n").unwrap();
    supacheck()
        .current_dir(dir.path())
        .args(["--env-file", "prod.env", "deploy", "--supabase-bin", "echo"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Running: echo secrets set --env-file /"))
        .stdout(predicate::str::contains("prod.env"))
        .stdout(predicate::str::contains("SUCCESS: Setup and Deployment Complete."));
}

#[cfg(unix)]
#[test]
fn deploy_resolves_env_file_outside_project_dir() {
    use std::os::unix::fs::PermissionsExt;

    let dir = TempDir::new().unwrap();
    fs::create_dir(dir.path().join("backend")).unwrap();
    fs::write(dir.path().join("deploy.env"), "SUPABASE_URL=http://localhost\n").unwrap();

    // Stands in for the Supabase CLI; `secrets set` fails unless it can see the file.
    let bin = dir.path().join("fake-supabase");
    fs::write(
        &bin,
        "#!/bin/sh\nif [ \"$1\" = secrets ]; then test -f \"$4\" || exit 3; fi\necho \"$@\"\n",
    )
    .unwrap();
    fs::set_permissions(&bin, fs::Permissions::from_mode(0o755)).unwrap();

    supacheck()
        .current_dir(dir.path())
        .args([
            "--env-file",
            "deploy.env",
            "deploy",
            "--project-dir",
            "backend",
            "--supabase-bin",
            bin.to_str().unwrap(),
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Failed to set secrets").not())
        .stdout(predicate::str::contains("SUCCESS: Setup and Deployment Complete."));
}

#[tokio::test(flavor = "multi_thread")]
async fn run_executes_custom_plan() {
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/"))
        .and(header("authorization", "Bearer anon"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let env_file = dir.path().join(".env");
    fs::write(
        &env_file,
        format!("SUPABASE_URL={}\nSUPABASE_ANON_KEY=anon\n", server.uri()),
    )
    .unwrap();
    let plan = dir.path().join("plan.yaml");
    fs::write(&plan, GOOD_PLAN).unwrap();

    supacheck()
        .args([
            "--env-file",
            env_file.to_str().unwrap(),
            "run",
            plan.to_str().unwrap(),
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("SUCCESS: health completed."));
}

#[test]
fn doctor_reports_missing_env_file() {
    let dir = TempDir::new().unwrap();
    supacheck()
        .current_dir(dir.path())
        .arg("doctor")
        .assert()
        .code(4)
        .stdout(predicate::str::contains("✗ env file"));
}

#[cfg(unix)]
#[test]
fn doctor_passes_with_complete_env() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join(".env"),
        "SUPABASE_URL=https://abc.supabase.co\nSUPABASE_ANON_KEY=a\nSUPABASE_SERVICE_ROLE_KEY=s\n",
    )
    .unwrap();
    supacheck()
        .current_dir(dir.path())
        .args(["doctor", "--supabase-bin", "sh"])
        .assert()
        .success()
        .stdout(predicate::str::contains("All checks passed."));
}
