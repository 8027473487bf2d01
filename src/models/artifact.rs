use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::borrow::Cow;

/// An observable attached to an incident (IP address, hash, domain, ...).
///
/// The backend row is kept as-is; only `value` is read, to derive the correlation key.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Artifact(Map<String, Value>);

impl Artifact {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    pub fn with_value(value: impl Into<Value>) -> Self {
        let mut fields = Map::new();
        fields.insert("value".to_string(), value.into());
        Self(fields)
    }

    /// Raw `value` field
    pub fn value(&self) -> Option<&Value> {
        self.0.get("value")
    }

    /// The value to correlate on.
    ///
    /// Strings are used as-is, numbers and booleans as their JSON text. Empty, null,
    /// absent and structured values cannot be correlated.
    pub fn correlation_key(&self) -> Option<Cow<'_, str>> {
        match self.value()? {
            Value::String(s) if !s.is_empty() => Some(Cow::Borrowed(s.as_str())),
            Value::Number(n) => Some(Cow::Owned(n.to_string())),
            Value::Bool(b) => Some(Cow::Owned(b.to_string())),
            _ => None,
        }
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }
}

impl From<Map<String, Value>> for Artifact {
    fn from(fields: Map<String, Value>) -> Self {
        Self(fields)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_correlation_key() {
        assert_eq!(
            Artifact::with_value("1.2.3.4").correlation_key().as_deref(),
            Some("1.2.3.4")
        );
        assert_eq!(Artifact::with_value("").correlation_key(), None);
        assert_eq!(Artifact::default().correlation_key(), None);
        assert_eq!(Artifact::with_value(json!(["a"])).correlation_key(), None);
    }

    #[test]
    fn test_passthrough_fields() {
        let raw = json!({
            "id": 17,
            "type": 1,
            "value": "evil.example",
            "properties": [{"name": "source", "value": "proxy"}]
        });
        let artifact: Artifact = serde_json::from_value(raw.clone()).unwrap();

        assert_eq!(artifact.correlation_key().as_deref(), Some("evil.example"));
        assert_eq!(artifact.get("type"), Some(&json!(1)));
        assert_eq!(serde_json::to_value(&artifact).unwrap(), raw);
    }

    #[test]
    fn test_numeric_and_null_values_round_trip() {
        let number = json!({"id": 1, "value": 8080});
        let artifact: Artifact = serde_json::from_value(number.clone()).unwrap();
        assert_eq!(artifact.correlation_key().as_deref(), Some("8080"));
        assert_eq!(serde_json::to_value(&artifact).unwrap(), number);

        let null = json!({"id": 2, "value": null});
        let artifact: Artifact = serde_json::from_value(null.clone()).unwrap();
        assert_eq!(artifact.value(), Some(&Value::Null));
        assert_eq!(artifact.correlation_key(), None);
        assert_eq!(serde_json::to_value(&artifact).unwrap(), null);

        let missing: Artifact = serde_json::from_value(json!({"id": 3})).unwrap();
        assert_eq!(missing.value(), None);
        assert_eq!(missing.correlation_key(), None);
    }

    #[test]
    fn test_non_object_row_is_rejected() {
        assert!(serde_json::from_value::<Artifact>(json!("1.2.3.4")).is_err());
    }
}
