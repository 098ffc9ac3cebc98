use std::collections::BTreeMap;
use std::time::Duration;

use supacheck_core::template::{render, render_json, TemplateError, Vars};
use supacheck_core::{Credentials, HttpRequestSpec, ResponseRecord};

use crate::http::{HttpClient, HttpError, HttpRequestParts};
use crate::redact::redact_headers;

pub const DEFAULT_MAX_RESPONSE_BYTES: usize = 4_194_304;

#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    #[error(transparent)]
    Template(#[from] TemplateError),
    #[error("invalid URL {url:?}: {message}")]
    InvalidUrl { url: String, message: String },
    #[error("request body could not be encoded: {0}")]
    Body(#[from] serde_json::Error),
    #[error(transparent)]
    Transport(#[from] HttpError),
    /// Non-2xx response. `body` is the raw response text, unchanged.
    #[error("HTTP {status} {reason}")]
    Status {
        status: u16,
        reason: String,
        body: String,
    },
}

impl ProbeError {
    pub fn status(&self) -> Option<u16> {
        match self {
            ProbeError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Builds one authenticated request from an [`HttpRequestSpec`] and sends it.
pub struct HttpProbe<'a> {
    client: &'a dyn HttpClient,
    max_response_bytes: usize,
}

impl<'a> HttpProbe<'a> {
    pub fn new(client: &'a dyn HttpClient) -> Self {
        Self {
            client,
            max_response_bytes: DEFAULT_MAX_RESPONSE_BYTES,
        }
    }

    pub fn with_max_response_bytes(mut self, max: usize) -> Self {
        self.max_response_bytes = max;
        self
    }

    pub fn prepare(
        &self,
        spec: &HttpRequestSpec,
        vars: &Vars,
        credentials: &Credentials,
    ) -> Result<HttpRequestParts, ProbeError> {
        let raw_url = render(&spec.url, vars)?;
        let url = url::Url::parse(&raw_url).map_err(|e| ProbeError::InvalidUrl {
            url: raw_url.clone(),
            message: e.to_string(),
        })?;

        let mut headers = BTreeMap::new();
        match credentials.key_for(spec.auth) {
            Some(key) => {
                headers.insert("Authorization".to_string(), format!("Bearer {}", key.expose()));
                if spec.apikey_header {
                    headers.insert("apikey".to_string(), key.expose().to_string());
                }
            }
            None if spec.auth != supacheck_core::AuthKey::None => {
                tracing::warn!(auth = ?spec.auth, "no key configured; sending request unauthenticated");
            }
            None => {}
        }

        let body = match &spec.body {
            Some(b) => {
                headers.insert("Content-Type".to_string(), "application/json".to_string());
                serde_json::to_vec(&render_json(b, vars)?)?
            }
            None => Vec::new(),
        };

        for (name, value) in &spec.headers {
            headers.insert(name.clone(), render(value, vars)?);
        }

        Ok(HttpRequestParts {
            method: spec.method.as_str().to_string(),
            url,
            headers,
            body,
        })
    }

    /// Sends the request; any non-2xx status is a [`ProbeError::Status`].
    pub async fn send(
        &self,
        spec: &HttpRequestSpec,
        vars: &Vars,
        credentials: &Credentials,
    ) -> Result<ResponseRecord, ProbeError> {
        let record = self.send_raw(spec, vars, credentials).await?;
        if record.is_success() {
            Ok(record)
        } else {
            Err(ProbeError::Status {
                status: record.status,
                reason: canonical_reason(record.status),
                body: record.body,
            })
        }
    }

    /// Sends the request and returns the response whatever its status.
    pub async fn send_raw(
        &self,
        spec: &HttpRequestSpec,
        vars: &Vars,
        credentials: &Credentials,
    ) -> Result<ResponseRecord, ProbeError> {
        let req = self.prepare(spec, vars, credentials)?;
        tracing::debug!(
            method = %req.method,
            url = %req.url,
            headers = ?redact_headers(&req.headers),
            "sending request"
        );

        let timeout = spec.timeout_ms.map(Duration::from_millis);
        let resp = self.client.send(req, timeout, self.max_response_bytes).await?;
        tracing::debug!(status = resp.status, bytes = resp.body.len(), "response received");

        Ok(ResponseRecord::new(
            resp.status,
            String::from_utf8_lossy(&resp.body).into_owned(),
        ))
    }
}

pub fn canonical_reason(status: u16) -> String {
    reqwest::StatusCode::from_u16(status)
        .ok()
        .and_then(|s| s.canonical_reason())
        .unwrap_or("")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use supacheck_core::{AuthKey, EnvMap, HttpMethod};

    struct Unreachable;

    #[async_trait]
    impl HttpClient for Unreachable {
        async fn send(
            &self,
            _req: HttpRequestParts,
            _timeout: Option<Duration>,
            _max: usize,
        ) -> Result<crate::http::HttpResponseParts, HttpError> {
            Err(HttpError::Unreachable("no route".into()))
        }
    }

    fn vars() -> Vars {
        Vars::from([("SUPABASE_URL".to_string(), "https://p.supabase.co".to_string())])
    }

    #[test]
    fn sets_bearer_and_apikey() {
        let creds = Credentials::from_env(&EnvMap::parse_str("SUPABASE_ANON_KEY=anon\nSUPABASE_SERVICE_ROLE_KEY=svc\n"));
        let mut spec = HttpRequestSpec::new(HttpMethod::Get, "${SUPABASE_URL}/rest/v1/x", AuthKey::ServiceOrAnon);
        spec.apikey_header = true;

        let probe = HttpProbe::new(&Unreachable);
        let req = probe.prepare(&spec, &vars(), &creds).unwrap();
        assert_eq!(req.url.as_str(), "https://p.supabase.co/rest/v1/x");
        assert_eq!(req.headers["Authorization"], "Bearer svc");
        assert_eq!(req.headers["apikey"], "svc");
        assert!(req.body.is_empty());
    }

    #[test]
    fn missing_key_omits_auth_headers() {
        let mut spec = HttpRequestSpec::new(HttpMethod::Post, "${SUPABASE_URL}/functions/v1/f", AuthKey::Anon);
        spec.body = Some(serde_json::json!({"a": 1}));

        let probe = HttpProbe::new(&Unreachable);
        let req = probe.prepare(&spec, &vars(), &Credentials::default()).unwrap();
        assert!(!req.headers.contains_key("Authorization"));
        assert_eq!(req.headers["Content-Type"], "application/json");
        assert_eq!(req.body, br#"{"a":1}"#.to_vec());
    }

    #[test]
    fn missing_base_url_is_a_template_error() {
        let spec = HttpRequestSpec::new(HttpMethod::Get, "${SUPABASE_URL}/x", AuthKey::Anon);
        let probe = HttpProbe::new(&Unreachable);
        let err = probe.prepare(&spec, &Vars::new(), &Credentials::default()).unwrap_err();
        assert!(matches!(err, ProbeError::Template(TemplateError::Unknown(ref n)) if n == "SUPABASE_URL"));
    }

    #[tokio::test]
    async fn transport_failure_is_distinct_from_status() {
        let spec = HttpRequestSpec::new(HttpMethod::Get, "${SUPABASE_URL}/x", AuthKey::None);
        let probe = HttpProbe::new(&Unreachable);
        let err = probe.send(&spec, &vars(), &Credentials::default()).await.unwrap_err();
        assert!(matches!(err, ProbeError::Transport(HttpError::Unreachable(_))));
        assert_eq!(err.status(), None);
    }
}
