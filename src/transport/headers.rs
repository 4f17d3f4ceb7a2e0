//! Response header normalization.

use http::header::HeaderValue;
use http::HeaderMap;

/// Trim leading and trailing whitespace from every header value.
///
/// Applied to HTTP/2 responses, whose header values may carry incidental
/// padding that HTTP/1 parsing would have stripped.
pub fn trim_header_values(headers: &mut HeaderMap) {
    for value in headers.values_mut() {
        let bytes = value.as_bytes();
        let trimmed = bytes.trim_ascii();
        if trimmed.len() == bytes.len() {
            continue;
        }
        if let Ok(normalized) = HeaderValue::from_bytes(trimmed) {
            let sensitive = value.is_sensitive();
            *value = normalized;
            value.set_sensitive(sensitive);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trims_padding_and_keeps_inner_whitespace() {
        let mut headers = HeaderMap::new();
        headers.insert("x-ms-session-token", HeaderValue::from_static("  0:1#42  "));
        headers.insert("content-type", HeaderValue::from_static("application/json"));
        headers.append("x-ms-item", HeaderValue::from_static("\ta b\t"));

        trim_header_values(&mut headers);

        assert_eq!(headers["x-ms-session-token"], "0:1#42");
        assert_eq!(headers["content-type"], "application/json");
        assert_eq!(headers["x-ms-item"], "a b");
    }
}
