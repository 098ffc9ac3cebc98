use std::sync::Arc;

use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use crate::env::EnvMap;

pub const SUPABASE_URL: &str = "SUPABASE_URL";
pub const SUPABASE_ANON_KEY: &str = "SUPABASE_ANON_KEY";
pub const SUPABASE_SERVICE_ROLE_KEY: &str = "SUPABASE_SERVICE_ROLE_KEY";

/// Key material that is not `Debug`/`Display` printable and is zeroized on drop.
#[derive(Clone)]
pub struct SecretValue(Arc<Zeroizing<String>>);

impl SecretValue {
    pub fn new(s: impl Into<String>) -> Self {
        Self(Arc::new(Zeroizing::new(s.into())))
    }

    pub fn expose(&self) -> &str {
        self.0.as_str()
    }
}

impl std::fmt::Debug for SecretValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SecretValue(<redacted>)")
    }
}

/// Which key a request authenticates with.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthKey {
    #[default]
    Anon,
    ServiceRole,
    /// Service role key when configured, anon key otherwise.
    ServiceOrAnon,
    None,
}

#[derive(Debug, Clone, Default)]
pub struct Credentials {
    pub url: Option<String>,
    pub anon_key: Option<SecretValue>,
    pub service_role_key: Option<SecretValue>,
}

impl Credentials {
    pub fn from_env(env: &EnvMap) -> Self {
        let url = env
            .get(SUPABASE_URL)
            .filter(|v| !v.is_empty())
            .map(|v| v.trim_end_matches('/').to_string());
        let secret = |key: &str| env.get(key).filter(|v| !v.is_empty()).map(SecretValue::new);
        Self {
            url,
            anon_key: secret(SUPABASE_ANON_KEY),
            service_role_key: secret(SUPABASE_SERVICE_ROLE_KEY),
        }
    }

    pub fn service_or_anon(&self) -> Option<&SecretValue> {
        self.service_role_key.as_ref().or(self.anon_key.as_ref())
    }

    /// Resolves the token for `auth`. `None` means no key is configured (or none requested).
    pub fn key_for(&self, auth: AuthKey) -> Option<&SecretValue> {
        match auth {
            AuthKey::Anon => self.anon_key.as_ref(),
            AuthKey::ServiceRole => self.service_role_key.as_ref(),
            AuthKey::ServiceOrAnon => self.service_or_anon(),
            AuthKey::None => None,
        }
    }

    /// Names of recognized keys that are absent or empty.
    pub fn missing(&self) -> Vec<&'static str> {
        let mut out = Vec::new();
        if self.url.is_none() {
            out.push(SUPABASE_URL);
        }
        if self.anon_key.is_none() {
            out.push(SUPABASE_ANON_KEY);
        }
        if self.service_role_key.is_none() {
            out.push(SUPABASE_SERVICE_ROLE_KEY);
        }
        out
    }
}
