#![forbid(unsafe_code)]

//! Runs verification plans: shell commands, HTTP probes, console reporting.

pub mod command;
pub mod events;
pub mod http;
pub mod probe;
pub mod redact;
pub mod report;
pub mod runner;

pub use crate::command::{CommandError, CommandOutput, CommandRunner, ShellCommandRunner};
pub use crate::events::{ConsoleSink, Event, EventSink, JsonLinesSink, NoOpEventSink};
pub use crate::http::{HttpClient, HttpError, HttpRequestParts, HttpResponseParts, ReqwestHttpClient};
pub use crate::probe::{HttpProbe, ProbeError};
pub use crate::report::{RunReport, StepReport, StepStatus, Verdict, VerdictKind};
pub use crate::runner::{PlanRunner, RunnerConfig};
