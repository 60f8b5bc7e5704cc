//! Request-handling helpers shared by the API modules.

use axum::http::HeaderMap;

/// Extract a bearer token from the Authorization header.
pub fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get("authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
        .map(|s| s.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_extracts_bearer_token() {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", HeaderValue::from_static("Bearer abc.def.ghi"));
        assert_eq!(extract_bearer_token(&headers).as_deref(), Some("abc.def.ghi"));
    }

    #[test]
    fn test_rejects_other_schemes_and_absence() {
        let mut headers = HeaderMap::new();
        assert!(extract_bearer_token(&headers).is_none());

        headers.insert("authorization", HeaderValue::from_static("Basic dXNlcg=="));
        assert!(extract_bearer_token(&headers).is_none());
    }
}
