//! Request-shape assertions evaluated inside responders

use serde_json::Value;

use crate::common::{Error, Result};

use super::message::{ApiRequest, Method};

/// Check that `actual` contains everything in `expected`
///
/// Objects match when every expected key is present and matches; extra keys
/// are allowed. Arrays must have the same length and match element-wise.
/// Numbers compare by value, so `2` matches `2.0`.
pub fn json_subset(expected: &Value, actual: &Value) -> std::result::Result<(), String> {
    subset_at("$", expected, actual)
}

fn subset_at(path: &str, expected: &Value, actual: &Value) -> std::result::Result<(), String> {
    match (expected, actual) {
        (Value::Object(want), Value::Object(have)) => {
            for (key, want_value) in want {
                let child = format!("{}.{}", path, key);
                match have.get(key) {
                    Some(have_value) => subset_at(&child, want_value, have_value)?,
                    None => return Err(format!("{}: missing, expected {}", child, want_value)),
                }
            }
            Ok(())
        }
        (Value::Array(want), Value::Array(have)) => {
            if want.len() != have.len() {
                return Err(format!(
                    "{}: expected {} elements, got {}",
                    path,
                    want.len(),
                    have.len()
                ));
            }
            for (i, (w, h)) in want.iter().zip(have).enumerate() {
                subset_at(&format!("{}[{}]", path, i), w, h)?;
            }
            Ok(())
        }
        (Value::Number(want), Value::Number(have)) if want.as_f64() == have.as_f64() => Ok(()),
        (want, have) if want == have => Ok(()),
        (want, have) => Err(format!("{}: expected {}, got {}", path, want, have)),
    }
}

/// Expectations a responder checks on every request it receives
#[derive(Debug, Clone, Default)]
pub struct RequestExpectation {
    pub method: Option<Method>,
    /// JSON subset the body must contain
    pub body: Option<Value>,
    /// Header name and a substring its value must contain
    pub headers: Vec<(String, String)>,
}

impl RequestExpectation {
    pub fn method(mut self, method: Method) -> Self {
        self.method = Some(method);
        self
    }

    pub fn body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn header(mut self, name: impl Into<String>, contains: impl Into<String>) -> Self {
        self.headers.push((name.into(), contains.into()));
        self
    }

    /// Fail with a contract violation on the first unmet expectation
    pub fn verify(&self, request: &ApiRequest) -> Result<()> {
        let violation = |message: String| {
            Error::mock_contract(request.method.as_str(), &request.url, message)
        };

        if let Some(method) = &self.method {
            if &request.method != method {
                return Err(violation(format!(
                    "expected method {}, got {}",
                    method, request.method
                )));
            }
        }

        if let Some(expected) = &self.body {
            let actual = request
                .json_body()
                .map_err(|e| violation(format!("body is not JSON: {}", e)))?;
            json_subset(expected, &actual).map_err(|m| violation(format!("body {}", m)))?;
        }

        for (name, contains) in &self.headers {
            match request.header_value(name) {
                Some(value) if value.contains(contains.as_str()) => {}
                Some(value) => {
                    return Err(violation(format!(
                        "header {} is '{}', expected it to contain '{}'",
                        name, value, contains
                    )))
                }
                None => {
                    return Err(violation(format!(
                        "header {} missing, expected it to contain '{}'",
                        name, contains
                    )))
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_subset_allows_extra_fields() {
        let expected = json!({ "name": "test", "admins": [{ "email": "a@jwt.com" }] });
        let actual = json!({
            "name": "test",
            "admins": [{ "email": "a@jwt.com", "id": 3 }],
            "stores": []
        });
        assert!(json_subset(&expected, &actual).is_ok());
    }

    #[test]
    fn test_subset_reports_path_of_mismatch() {
        let expected = json!({ "admins": [{ "email": "a@jwt.com" }] });
        let actual = json!({ "admins": [{ "email": "b@jwt.com" }] });
        let err = json_subset(&expected, &actual).unwrap_err();
        assert!(err.starts_with("$.admins[0].email"), "{}", err);
    }

    #[test]
    fn test_subset_requires_equal_array_length() {
        let expected = json!({ "items": [{ "menuId": 1 }] });
        let actual = json!({ "items": [{ "menuId": 1 }, { "menuId": 2 }] });
        assert!(json_subset(&expected, &actual).is_err());
    }

    #[test]
    fn test_subset_distinguishes_string_and_number() {
        assert!(json_subset(&json!({ "storeId": "4" }), &json!({ "storeId": 4 })).is_err());
        assert!(json_subset(&json!({ "franchiseId": 2 }), &json!({ "franchiseId": 2.0 })).is_ok());
    }

    #[test]
    fn test_verify_reports_contract_violation() {
        let request = ApiRequest::new(Method::POST, "http://h/api/auth")
            .json(&json!({ "email": "d@jwt.com" }))
            .unwrap();
        let expectation = RequestExpectation::default().method(Method::PUT);
        let err = expectation.verify(&request).unwrap_err();
        assert!(err.is_contract_violation());
    }

    #[test]
    fn test_verify_header_substring() {
        let request = ApiRequest::new(Method::DELETE, "http://h/api/auth").bearer("abcdef");
        let ok = RequestExpectation::default().header("Authorization", "Bearer abcdef");
        assert!(ok.verify(&request).is_ok());

        let wrong = RequestExpectation::default().header("Authorization", "Bearer zzz");
        assert!(wrong.verify(&request).is_err());
    }
}
