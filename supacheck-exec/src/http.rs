use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;

#[derive(Debug, Clone)]
pub struct HttpRequestParts {
    pub method: String,
    pub url: url::Url,
    pub headers: BTreeMap<String, String>,
    pub body: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct HttpResponseParts {
    pub status: u16,
    pub headers: BTreeMap<String, String>,
    pub body: Vec<u8>,
}

/// Failures below the HTTP status line: nothing usable came back.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HttpError {
    #[error("request timed out")]
    Timeout,
    #[error("could not reach server: {0}")]
    Unreachable(String),
    #[error("response body exceeds {limit} bytes")]
    BodyTooLarge { limit: usize },
    #[error("request failed: {0}")]
    Request(String),
}

impl From<reqwest::Error> for HttpError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            HttpError::Timeout
        } else if e.is_connect() || e.is_request() {
            HttpError::Unreachable(e.to_string())
        } else {
            HttpError::Request(e.to_string())
        }
    }
}

#[async_trait]
pub trait HttpClient: Send + Sync {
    /// Sends `req`. `timeout: None` waits for as long as the server takes.
    /// Bodies longer than `max_response_bytes` are never buffered in full.
    async fn send(
        &self,
        req: HttpRequestParts,
        timeout: Option<Duration>,
        max_response_bytes: usize,
    ) -> Result<HttpResponseParts, HttpError>;
}

pub struct ReqwestHttpClient {
    client: reqwest::Client,
}

impl ReqwestHttpClient {
    pub fn new() -> Result<Self, HttpError> {
        reqwest::Client::builder()
            .user_agent(concat!("supacheck/", env!("CARGO_PKG_VERSION")))
            .build()
            .map(|client| Self { client })
            .map_err(|e| HttpError::Request(format!("cannot build HTTP client: {e}")))
    }
}

#[async_trait]
impl HttpClient for ReqwestHttpClient {
    async fn send(
        &self,
        req: HttpRequestParts,
        timeout: Option<Duration>,
        max_response_bytes: usize,
    ) -> Result<HttpResponseParts, HttpError> {
        let method = reqwest::Method::from_bytes(req.method.as_bytes())
            .map_err(|_| HttpError::Request(format!("invalid method {:?}", req.method)))?;

        let mut builder = self.client.request(method, req.url);
        if let Some(t) = timeout {
            builder = builder.timeout(t);
        }
        for (name, value) in req.headers {
            builder = builder.header(name, value);
        }
        if !req.body.is_empty() {
            builder = builder.body(req.body);
        }

        let mut resp = builder.send().await?;
        let status = resp.status().as_u16();
        let headers = resp
            .headers()
            .iter()
            .filter_map(|(k, v)| Some((k.to_string(), v.to_str().ok()?.to_string())))
            .collect();

        // A declared length over the cap fails before any of the body is read.
        if resp
            .content_length()
            .is_some_and(|len| len > max_response_bytes as u64)
        {
            return Err(HttpError::BodyTooLarge {
                limit: max_response_bytes,
            });
        }

        let mut body = Vec::new();
        while let Some(chunk) = resp.chunk().await? {
            append_capped(&mut body, &chunk, max_response_bytes)?;
        }

        Ok(HttpResponseParts {
            status,
            headers,
            body,
        })
    }
}

fn append_capped(body: &mut Vec<u8>, chunk: &[u8], limit: usize) -> Result<(), HttpError> {
    if body.len() + chunk.len() > limit {
        return Err(HttpError::BodyTooLarge { limit });
    }
    body.extend_from_slice(chunk);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunks_stop_at_the_limit() {
        let mut body = Vec::new();
        append_capped(&mut body, b"abcd", 6).unwrap();
        append_capped(&mut body, b"ef", 6).unwrap();
        assert_eq!(body, b"abcdef");

        let err = append_capped(&mut body, b"g", 6).unwrap_err();
        assert_eq!(err, HttpError::BodyTooLarge { limit: 6 });
        assert_eq!(body.len(), 6);
    }
}
