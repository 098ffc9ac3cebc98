use std::path::Path;
use std::time::{Duration, Instant};

use supacheck_core::expect::{display_value, evaluate_all, ExpectationFailure};
use supacheck_core::template::{render, render_with, vars_from_env, Vars};
use supacheck_core::{
    Credentials, EnvMap, Expectation, HttpRequestSpec, OnFailure, ResponseRecord, Step, StepAction,
    VerificationPlan,
};
use uuid::Uuid;

use crate::command::CommandRunner;
use crate::events::{Event, EventSink};
use crate::http::HttpClient;
use crate::probe::{HttpProbe, ProbeError, DEFAULT_MAX_RESPONSE_BYTES};
use crate::report::{RunReport, StepReport, StepStatus, Verdict};

pub const RUN_ID_VAR: &str = "RUN_ID";
pub const FATAL_EXIT_CODE: i32 = 1;

#[derive(Debug, Clone)]
pub struct RunnerConfig {
    pub max_response_bytes: usize,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            max_response_bytes: DEFAULT_MAX_RESPONSE_BYTES,
        }
    }
}

/// Executes a plan's steps strictly in order.
pub struct PlanRunner<'a> {
    pub http: &'a dyn HttpClient,
    pub commands: &'a dyn CommandRunner,
    pub event_sink: &'a dyn EventSink,
    pub config: RunnerConfig,
}

/// What a single step produced, before `on_failure` is applied.
struct Outcome {
    passed: bool,
    /// The call itself failed (unrenderable template, spawn error, transport
    /// error, non-2xx status), as opposed to a check on its result.
    call_failed: bool,
    reason: Option<String>,
    http_status: Option<u16>,
    failures: Vec<ExpectationFailure>,
}

impl Outcome {
    fn passed(http_status: Option<u16>) -> Self {
        Self {
            passed: true,
            call_failed: false,
            reason: None,
            http_status,
            failures: Vec::new(),
        }
    }

    fn failed(reason: impl Into<String>, http_status: Option<u16>) -> Self {
        Self {
            passed: false,
            call_failed: false,
            reason: Some(reason.into()),
            http_status,
            failures: Vec::new(),
        }
    }

    fn call_failed(reason: impl Into<String>, http_status: Option<u16>) -> Self {
        Self {
            call_failed: true,
            ..Self::failed(reason, http_status)
        }
    }

    /// `failure_message` describes a failed check; a failed call keeps its own error.
    fn message(&self, step: &Step) -> String {
        let reason = self.reason.as_deref().unwrap_or("failed");
        match (&step.failure_message, self.call_failed) {
            (Some(message), false) => message.clone(),
            _ => format!("{} failed: {reason}", step.id),
        }
    }
}

impl<'a> PlanRunner<'a> {
    pub fn new(
        http: &'a dyn HttpClient,
        commands: &'a dyn CommandRunner,
        event_sink: &'a dyn EventSink,
    ) -> Self {
        Self {
            http,
            commands,
            event_sink,
            config: RunnerConfig::default(),
        }
    }

    pub fn with_config(mut self, config: RunnerConfig) -> Self {
        self.config = config;
        self
    }

    #[tracing::instrument(skip_all, fields(plan = %plan.name))]
    pub async fn run(&self, plan: &VerificationPlan, env: &EnvMap) -> RunReport {
        let run_id = Uuid::new_v4();
        let credentials = Credentials::from_env(env);
        let mut vars = vars_from_env(env);
        vars.insert(RUN_ID_VAR.to_string(), run_id.to_string());

        let title = plan.title.as_deref().map(|t| render_lenient(t, &vars));
        self.emit(Event::PlanStarted {
            plan: plan.name.clone(),
            run_id,
            title,
        })
        .await;

        let mut steps = Vec::with_capacity(plan.steps.len());
        let mut halted_at = None;
        let mut exit_code = 0;

        for step in &plan.steps {
            let started = Instant::now();
            self.emit(Event::StepStarted {
                step_id: step.id.clone(),
                title: step.title.clone(),
            })
            .await;

            if let Some(reason) = self.skip_reason(step, &vars) {
                tracing::info!(step = %step.id, %reason, "step skipped");
                self.emit(Event::StepSkipped {
                    step_id: step.id.clone(),
                    reason: reason.clone(),
                })
                .await;
                steps.push(StepReport {
                    id: step.id.clone(),
                    status: StepStatus::Skipped,
                    severity: step.severity,
                    message: Some(reason),
                    http_status: None,
                    failures: Vec::new(),
                    duration_ms: 0,
                });
                continue;
            }

            if step.delay_ms > 0 {
                self.emit(Event::Waiting {
                    step_id: step.id.clone(),
                    delay_ms: step.delay_ms,
                })
                .await;
                tokio::time::sleep(Duration::from_millis(step.delay_ms)).await;
            }

            let outcome = match &step.action {
                StepAction::Command { command, cwd } => {
                    self.run_command(step, command, cwd.as_deref(), &vars).await
                }
                StepAction::Http(spec) => self.run_http(step, spec, &mut vars, &credentials).await,
            };

            let message = if outcome.passed {
                self.emit(Event::StepPassed {
                    step_id: step.id.clone(),
                })
                .await;
                None
            } else {
                let message = outcome.message(step);
                tracing::info!(step = %step.id, reason = ?outcome.reason, "step failed");
                self.emit(Event::StepFailed {
                    step_id: step.id.clone(),
                    severity: step.severity,
                    message: message.clone(),
                })
                .await;
                Some(message)
            };

            steps.push(StepReport {
                id: step.id.clone(),
                status: if outcome.passed {
                    StepStatus::Passed
                } else {
                    StepStatus::Failed
                },
                severity: step.severity,
                message,
                http_status: outcome.http_status,
                failures: outcome.failures,
                duration_ms: started.elapsed().as_millis() as u64,
            });

            if !outcome.passed {
                match step.on_failure {
                    OnFailure::Exit => {
                        exit_code = FATAL_EXIT_CODE;
                        halted_at = Some(step.id.clone());
                        break;
                    }
                    OnFailure::Stop => {
                        halted_at = Some(step.id.clone());
                        break;
                    }
                    OnFailure::Continue => {}
                }
            }
        }

        let success_message = plan
            .success_message
            .clone()
            .unwrap_or_else(|| format!("{} completed.", plan.name));
        let verdict = Verdict::from_steps(&steps, &success_message);
        self.emit(Event::PlanFinished {
            run_id,
            verdict: verdict.clone(),
            exit_code,
        })
        .await;

        RunReport {
            plan: plan.name.clone(),
            run_id,
            steps,
            halted_at,
            verdict,
            exit_code,
        }
    }

    async fn emit(&self, event: Event) {
        self.event_sink.emit(event).await;
    }

    fn skip_reason(&self, step: &Step, vars: &Vars) -> Option<String> {
        let file = step.requires_file.as_deref()?;
        let file = render_lenient(file, vars);
        if Path::new(&file).exists() {
            None
        } else {
            Some(format!("{file} file not found. Skipping {}.", step.id))
        }
    }

    async fn run_command(
        &self,
        step: &Step,
        command: &str,
        cwd: Option<&str>,
        vars: &Vars,
    ) -> Outcome {
        let rendered = match render(command, vars) {
            Ok(c) => c,
            Err(e) => return Outcome::call_failed(format!("command template: {e}"), None),
        };
        let cwd = match cwd.map(|c| render(c, vars)).transpose() {
            Ok(c) => c,
            Err(e) => return Outcome::call_failed(format!("cwd template: {e}"), None),
        };

        self.emit(Event::CommandStarted {
            step_id: step.id.clone(),
            command: rendered.clone(),
        })
        .await;

        match self.commands.run(&rendered, cwd.as_deref().map(Path::new)).await {
            Ok(output) => {
                let passed = output.success;
                let code = output.status_code;
                self.emit(Event::CommandFinished {
                    step_id: step.id.clone(),
                    command: rendered,
                    output,
                })
                .await;
                if passed {
                    Outcome::passed(None)
                } else {
                    let code = code.map_or_else(|| "a signal".to_string(), |c| format!("status {c}"));
                    Outcome::failed(format!("command exited with {code}"), None)
                }
            }
            Err(e) => {
                self.emit(Event::CallFailed {
                    step_id: step.id.clone(),
                    status: None,
                    error: e.to_string(),
                    body: None,
                })
                .await;
                Outcome::call_failed(e.to_string(), None)
            }
        }
    }

    async fn run_http(
        &self,
        step: &Step,
        spec: &HttpRequestSpec,
        vars: &mut Vars,
        credentials: &Credentials,
    ) -> Outcome {
        let probe = HttpProbe::new(self.http).with_max_response_bytes(self.config.max_response_bytes);

        if let Ok(url) = render(&spec.url, vars) {
            self.emit(Event::RequestSent {
                step_id: step.id.clone(),
                method: spec.method.as_str().to_string(),
                url,
            })
            .await;
        }

        // An explicit status expectation means non-2xx answers are data, not errors.
        let wants_status = spec
            .expect
            .iter()
            .any(|e| matches!(e, Expectation::Status { .. }));
        let result = if wants_status {
            probe.send_raw(spec, vars, credentials).await
        } else {
            probe.send(spec, vars, credentials).await
        };

        let record = match result {
            Ok(r) => r,
            Err(e) => {
                let body = match &e {
                    ProbeError::Status { body, .. } => Some(body.clone()),
                    _ => None,
                };
                self.emit(Event::CallFailed {
                    step_id: step.id.clone(),
                    status: e.status(),
                    error: e.to_string(),
                    body,
                })
                .await;
                return Outcome::call_failed(e.to_string(), e.status());
            }
        };

        let status = Some(record.status);
        self.emit(Event::ResponseReceived {
            step_id: step.id.clone(),
            response: record.clone(),
            display: spec.display.clone(),
        })
        .await;

        let failures = evaluate_all(&spec.expect, &record);
        if !failures.is_empty() {
            self.emit(Event::ExpectationsFailed {
                step_id: step.id.clone(),
                failures: failures.clone(),
            })
            .await;
            let reason = failures
                .iter()
                .map(|f| f.reason.as_str())
                .collect::<Vec<_>>()
                .join("; ");
            return Outcome {
                passed: false,
                call_failed: false,
                reason: Some(reason),
                http_status: status,
                failures,
            };
        }

        for (name, pointer) in &spec.capture {
            match capture(&record, pointer) {
                Some(value) => {
                    self.emit(Event::Captured {
                        step_id: step.id.clone(),
                        name: name.clone(),
                        value: value.clone(),
                    })
                    .await;
                    vars.insert(name.clone(), value);
                }
                None => {
                    return Outcome::failed(
                        format!("nothing at {pointer:?} to capture as {name}"),
                        status,
                    );
                }
            }
        }

        Outcome::passed(status)
    }
}

fn capture(record: &ResponseRecord, pointer: &str) -> Option<String> {
    match record.pointer(pointer)? {
        serde_json::Value::Null => None,
        v => Some(display_value(v)),
    }
}

fn render_lenient(input: &str, vars: &Vars) -> String {
    render_with(input, |name| Some(vars.get(name).cloned().unwrap_or_else(|| "<unset>".to_string())))
        .unwrap_or_else(|_| input.to_string())
}
