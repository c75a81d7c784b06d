// Test assertions for finished responses

use lintel_core::HttpResponse;

/// Assert that a response has a specific status code
#[track_caller]
pub fn assert_status(response: &HttpResponse, expected: u16) {
    assert_eq!(
        response.status, expected,
        "Expected status {}, got {}",
        expected, response.status
    );
}

/// Assert that a response has a specific header
#[track_caller]
pub fn assert_header(response: &HttpResponse, key: &str, expected: &str) {
    let actual = response.header(key);
    assert_eq!(
        actual,
        Some(expected),
        "Expected header '{}' to be '{}', got {:?}",
        key,
        expected,
        actual
    );
}

/// Assert the whole response body
#[track_caller]
pub fn assert_body(response: &HttpResponse, expected: &str) {
    assert_eq!(response.text(), expected, "Response bodies do not match");
}

/// Assert that a response body contains a string
#[track_caller]
pub fn assert_body_contains(response: &HttpResponse, expected: &str) {
    let body = response.text();
    assert!(
        body.contains(expected),
        "Expected body to contain '{}', but it didn't. Body: {}",
        expected,
        body
    );
}

/// Assert that a response body contains JSON matching expected value
#[track_caller]
pub fn assert_json<T>(response: &HttpResponse, expected: &T)
where
    T: serde::de::DeserializeOwned + PartialEq + std::fmt::Debug,
{
    let actual: T = match response.json() {
        Ok(actual) => actual,
        Err(err) => panic!("Failed to deserialize response body: {}", err),
    };
    assert_eq!(actual, *expected, "JSON bodies do not match");
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};

    fn response() -> HttpResponse {
        HttpResponse::new(200)
            .with_header("Content-Type".to_string(), "application/json".to_string())
            .with_body(b"{\"status\":\"ok\"}".to_vec())
    }

    #[test]
    fn test_passing_assertions() {
        let response = response();
        assert_status(&response, 200);
        assert_header(&response, "content-type", "application/json");
        assert_body(&response, "{\"status\":\"ok\"}");
        assert_body_contains(&response, "ok");
        assert_json::<Value>(&response, &json!({"status": "ok"}));
    }

    #[test]
    #[should_panic(expected = "Expected status 404, got 200")]
    fn test_status_mismatch() {
        assert_status(&response(), 404);
    }

    #[test]
    #[should_panic(expected = "Expected header 'Location'")]
    fn test_missing_header() {
        assert_header(&response(), "Location", "/");
    }
}
