use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::Context;

use super::FetchResult;

/// Deserialize a response body, naming the endpoint in the error.
pub fn parse_body<T: DeserializeOwned>(body: &str, what: &str) -> FetchResult<T> {
    Ok(serde_json::from_str(body).with_context(|| format!("Failed to parse {what} JSON"))?)
}

pub fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize)]
    struct Probe {
        value: i64,
    }

    #[test]
    fn renders_ids_without_quotes() {
        assert_eq!(value_to_string(&json!(1234)), "1234");
        assert_eq!(value_to_string(&json!("EURUSD.x")), "EURUSD.x");
        assert_eq!(value_to_string(&Value::Null), "");
    }

    #[test]
    fn parse_errors_mention_the_endpoint() {
        let probe: Probe = parse_body(r#"{"value": 3}"#, "probe").unwrap();
        assert_eq!(probe.value, 3);

        let err = parse_body::<Probe>("<html>", "history").expect_err("not JSON");
        assert!(err.to_string().contains("Failed to parse history JSON"));
    }
}
