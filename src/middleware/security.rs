//! Baseline security response headers.

use http::header::{REFERRER_POLICY, STRICT_TRANSPORT_SECURITY, X_CONTENT_TYPE_OPTIONS, X_FRAME_OPTIONS};
use http::{HeaderMap, HeaderName, HeaderValue};

const HSTS: &str = "max-age=31536000; includeSubDomains";

/// Whether the proxy in front of us saw HTTPS.
pub fn is_https(request_headers: &HeaderMap) -> bool {
    request_headers
        .get("x-forwarded-proto")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|proto| proto.trim().eq_ignore_ascii_case("https"))
}

/// Adds the headers a handler has not already set. HSTS is only sent over
/// HTTPS and never in debug mode.
pub fn apply(response_headers: &mut HeaderMap, https: bool, debug: bool) {
    set_default(response_headers, X_CONTENT_TYPE_OPTIONS, "nosniff");
    set_default(response_headers, X_FRAME_OPTIONS, "DENY");
    set_default(response_headers, REFERRER_POLICY, "same-origin");
    if https && !debug {
        set_default(response_headers, STRICT_TRANSPORT_SECURITY, HSTS);
    }
}

fn set_default(headers: &mut HeaderMap, name: HeaderName, value: &'static str) {
    headers.entry(name).or_insert_with(|| HeaderValue::from_static(value));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn baseline_headers() {
        let mut headers = HeaderMap::new();
        headers.insert(X_FRAME_OPTIONS, HeaderValue::from_static("SAMEORIGIN"));
        apply(&mut headers, false, false);
        assert_eq!(headers[X_CONTENT_TYPE_OPTIONS], "nosniff");
        assert_eq!(headers[X_FRAME_OPTIONS], "SAMEORIGIN");
        assert_eq!(headers[REFERRER_POLICY], "same-origin");
        assert!(!headers.contains_key(STRICT_TRANSPORT_SECURITY));
    }

    #[test]
    fn hsts_only_over_https_outside_debug() {
        let mut request = HeaderMap::new();
        request.insert("x-forwarded-proto", HeaderValue::from_static("HTTPS"));
        assert!(is_https(&request));

        let mut headers = HeaderMap::new();
        apply(&mut headers, true, false);
        assert_eq!(headers[STRICT_TRANSPORT_SECURITY], HSTS);

        let mut headers = HeaderMap::new();
        apply(&mut headers, true, true);
        assert!(!headers.contains_key(STRICT_TRANSPORT_SECURITY));
    }
}
