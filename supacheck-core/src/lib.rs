#![forbid(unsafe_code)]

//! Env loading, credentials, and declarative verification plans.
//!
//! Execution (commands, HTTP, printing) lives in `supacheck-exec`.

pub mod builtin;
pub mod credentials;
pub mod env;
pub mod error;
pub mod expect;
pub mod parser;
pub mod plan;
pub mod template;
pub mod validate;

pub use crate::credentials::{AuthKey, Credentials};
pub use crate::env::EnvMap;
pub use crate::error::{ParseError, ValidationError, Violation};
pub use crate::expect::{evaluate_all, ExpectationFailure, ResponseRecord};
pub use crate::parser::{parse_plan_str, DocumentFormat, ParsedPlan};
pub use crate::plan::{
    Display, Expectation, HttpMethod, HttpRequestSpec, OnFailure, Severity, Step, StepAction,
    VerificationPlan,
};
pub use crate::template::{render, render_json, TemplateError, Vars};
pub use crate::validate::{validate_plan, Validate};
