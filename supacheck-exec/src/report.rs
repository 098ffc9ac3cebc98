use serde::Serialize;
use supacheck_core::expect::ExpectationFailure;
use supacheck_core::Severity;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Passed,
    Failed,
    Skipped,
}

#[derive(Debug, Clone, Serialize)]
pub struct StepReport {
    pub id: String,
    pub status: StepStatus,
    pub severity: Severity,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_status: Option<u16>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<ExpectationFailure>,
    pub duration_ms: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum VerdictKind {
    Success,
    Warning,
    Failure,
}

impl VerdictKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            VerdictKind::Success => "SUCCESS",
            VerdictKind::Warning => "WARNING",
            VerdictKind::Failure => "FAILURE",
        }
    }
}

impl std::fmt::Display for VerdictKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Verdict {
    pub kind: VerdictKind,
    pub message: String,
}

impl Verdict {
    /// The worst failed step decides: any `failure` beats any `warning`;
    /// `info` failures never count.
    pub fn from_steps(steps: &[StepReport], success_message: &str) -> Self {
        let worst = steps
            .iter()
            .filter(|s| s.status == StepStatus::Failed && s.severity != Severity::Info)
            .max_by_key(|s| s.severity);

        // max_by_key returns the last maximum; report the first one instead.
        let first_of = |sev: Severity| {
            steps
                .iter()
                .find(|s| s.status == StepStatus::Failed && s.severity == sev)
        };

        match worst.map(|s| s.severity) {
            Some(sev) => {
                let kind = if sev == Severity::Failure {
                    VerdictKind::Failure
                } else {
                    VerdictKind::Warning
                };
                let message = first_of(sev)
                    .and_then(|s| s.message.clone())
                    .unwrap_or_else(|| "a step failed.".to_string());
                Self { kind, message }
            }
            None => Self {
                kind: VerdictKind::Success,
                message: success_message.to_string(),
            },
        }
    }
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub plan: String,
    pub run_id: Uuid,
    pub steps: Vec<StepReport>,
    /// Step that halted the run (`exit` or `stop`), if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub halted_at: Option<String>,
    pub verdict: Verdict,
    pub exit_code: i32,
}

impl RunReport {
    pub fn step(&self, id: &str) -> Option<&StepReport> {
        self.steps.iter().find(|s| s.id == id)
    }

    pub fn ran(&self, id: &str) -> bool {
        self.step(id).is_some_and(|s| s.status != StepStatus::Skipped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step(id: &str, status: StepStatus, severity: Severity, message: &str) -> StepReport {
        StepReport {
            id: id.to_string(),
            status,
            severity,
            message: Some(message.to_string()),
            http_status: None,
            failures: Vec::new(),
            duration_ms: 0,
        }
    }

    #[test]
    fn failure_outranks_warning() {
        let steps = vec![
            step("a", StepStatus::Failed, Severity::Warning, "secrets"),
            step("b", StepStatus::Failed, Severity::Failure, "first"),
            step("c", StepStatus::Failed, Severity::Failure, "second"),
        ];
        let v = Verdict::from_steps(&steps, "ok");
        assert_eq!(v.kind, VerdictKind::Failure);
        assert_eq!(v.message, "first");
        assert_eq!(v.to_string(), "FAILURE: first");
    }

    #[test]
    fn info_failures_do_not_count() {
        let steps = vec![
            step("a", StepStatus::Failed, Severity::Info, "call failed"),
            step("b", StepStatus::Passed, Severity::Failure, ""),
            step("c", StepStatus::Skipped, Severity::Failure, ""),
        ];
        let v = Verdict::from_steps(&steps, "System Verified.");
        assert_eq!(v.to_string(), "SUCCESS: System Verified.");
    }

    #[test]
    fn warning_only() {
        let steps = vec![step("a", StepStatus::Failed, Severity::Warning, "Response structure unexpected.")];
        assert_eq!(Verdict::from_steps(&steps, "ok").kind, VerdictKind::Warning);
    }
}
