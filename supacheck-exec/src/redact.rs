use std::collections::BTreeMap;

/// Header names whose values never reach logs or reports.
pub const SENSITIVE_HEADERS: &[&str] = &["authorization", "apikey", "cookie", "set-cookie"];

pub fn redact_headers(headers: &BTreeMap<String, String>) -> BTreeMap<String, String> {
    let mut out = headers.clone();
    for name in SENSITIVE_HEADERS {
        replace_case_insensitive(&mut out, name, "<redacted>");
    }
    out
}

fn replace_case_insensitive(map: &mut BTreeMap<String, String>, header: &str, replacement: &str) {
    let keys = map
        .keys()
        .filter(|k| k.eq_ignore_ascii_case(header))
        .cloned()
        .collect::<Vec<_>>();
    for k in keys {
        map.insert(k, replacement.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redacts_auth_and_apikey_any_case() {
        let mut headers = BTreeMap::new();
        headers.insert("Authorization".to_string(), "Bearer abc".to_string());
        headers.insert("APIKEY".to_string(), "abc".to_string());
        headers.insert("Prefer".to_string(), "return=representation".to_string());

        let out = redact_headers(&headers);
        assert_eq!(out["Authorization"], "<redacted>");
        assert_eq!(out["APIKEY"], "<redacted>");
        assert_eq!(out["Prefer"], "return=representation");
    }
}
