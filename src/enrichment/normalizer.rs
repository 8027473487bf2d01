use crate::models::IncidentRecord;
use serde_json::Value;

/// Guarantee the descriptive text fields of a full incident record.
///
/// - `description` absent or null becomes `""`
/// - `additional_information` is copied up from `properties.additional_information`,
///   with `""` when that value is null or absent (or `properties` is not an object)
///
/// Never fails. Applying it to its own output changes nothing.
pub fn normalize_record(mut record: IncidentRecord) -> IncidentRecord {
    if matches!(record.get("description"), None | Some(Value::Null)) {
        record.insert("description", Value::String(String::new()));
    }

    let additional_information = record
        .get("properties")
        .and_then(Value::as_object)
        .and_then(|properties| properties.get("additional_information"))
        .filter(|value| !value.is_null())
        .cloned()
        .unwrap_or_else(|| Value::String(String::new()));
    record.insert("additional_information", additional_information);

    record
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> IncidentRecord {
        IncidentRecord::from_value(value).unwrap()
    }

    #[test]
    fn test_fills_missing_fields() {
        let normalized = normalize_record(record(json!({"id": 1})));
        assert_eq!(normalized.description(), Some(""));
        assert_eq!(normalized.additional_information(), Some(&json!("")));
    }

    #[test]
    fn test_null_description_becomes_empty() {
        let normalized = normalize_record(record(json!({"id": 1, "description": null})));
        assert_eq!(normalized.description(), Some(""));
    }

    #[test]
    fn test_keeps_existing_description() {
        let normalized =
            normalize_record(record(json!({"id": 1, "description": "<p>beaconing</p>"})));
        assert_eq!(normalized.description(), Some("<p>beaconing</p>"));
    }

    #[test]
    fn test_additional_information_from_properties() {
        let normalized = normalize_record(record(json!({
            "id": 1,
            "properties": {"additional_information": "analyst notes"}
        })));
        assert_eq!(
            normalized.additional_information(),
            Some(&json!("analyst notes"))
        );

        let null = normalize_record(record(json!({
            "id": 1,
            "properties": {"additional_information": null}
        })));
        assert_eq!(null.additional_information(), Some(&json!("")));

        let not_a_map = normalize_record(record(json!({"id": 1, "properties": "x"})));
        assert_eq!(not_a_map.additional_information(), Some(&json!("")));
    }

    #[test]
    fn test_non_null_values_pass_through_unchanged() {
        let normalized = normalize_record(record(json!({
            "id": 1,
            "properties": {"additional_information": ""}
        })));
        assert_eq!(normalized.additional_information(), Some(&json!("")));

        let structured = normalize_record(record(json!({
            "id": 1,
            "properties": {"additional_information": {"format": "html", "content": "<b>x</b>"}}
        })));
        assert_eq!(
            structured.additional_information(),
            Some(&json!({"format": "html", "content": "<b>x</b>"}))
        );
    }

    #[test]
    fn test_idempotent() {
        let inputs = [
            json!({"id": 1}),
            json!({"id": 2, "description": null, "properties": {"additional_information": "a"}}),
            json!({"id": 3, "description": "d", "additional_information": "stale"}),
        ];

        for input in inputs {
            let once = normalize_record(record(input));
            let twice = normalize_record(once.clone());
            assert_eq!(once, twice);
        }
    }
}
