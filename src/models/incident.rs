use crate::models::Artifact;
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};

/// Externally assigned incident identifier
pub type IncidentId = i64;

/// An incident record as returned by the backend.
///
/// The backend decides which fields a record carries (full and minimal views differ),
/// so the record is kept as a JSON object and read through accessors.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IncidentRecord(Map<String, Value>);

impl IncidentRecord {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    /// Interpret a response payload as a record; anything but an object yields `None`
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(map) => Some(Self(map)),
            _ => None,
        }
    }

    pub fn id(&self) -> Option<IncidentId> {
        self.0.get("id").and_then(Value::as_i64)
    }

    pub fn description(&self) -> Option<&str> {
        self.0.get("description").and_then(Value::as_str)
    }

    pub fn additional_information(&self) -> Option<&Value> {
        self.0.get("additional_information")
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    pub fn insert(&mut self, field: impl Into<String>, value: Value) -> Option<Value> {
        self.0.insert(field.into(), value)
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_fields(self) -> Map<String, Value> {
        self.0
    }
}

impl From<Map<String, Value>> for IncidentRecord {
    fn from(fields: Map<String, Value>) -> Self {
        Self(fields)
    }
}

/// The base incident with its artifacts and the incidents sharing an artifact value.
///
/// Serializes to the record's own fields plus `artifacts` and `related_incidents`,
/// which replace any fields of the same name in the record.
#[derive(Debug, Clone, PartialEq)]
pub struct EnrichedIncident {
    /// Normalized full record
    pub record: IncidentRecord,

    /// Artifacts attached to the base incident, in backend order
    pub artifacts: Vec<Artifact>,

    /// Minimal records of related incidents, ascending by id
    pub related_incidents: Vec<IncidentRecord>,
}

impl EnrichedIncident {
    pub fn id(&self) -> Option<IncidentId> {
        self.record.id()
    }

    pub fn related_ids(&self) -> Vec<IncidentId> {
        self.related_incidents
            .iter()
            .filter_map(IncidentRecord::id)
            .collect()
    }

    /// Flatten into a single JSON object
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

impl Serialize for EnrichedIncident {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let fields = self.record.fields();
        let passthrough = fields
            .iter()
            .filter(|(key, _)| key.as_str() != "artifacts" && key.as_str() != "related_incidents");

        let mut map = serializer.serialize_map(None)?;
        for (key, value) in passthrough {
            map.serialize_entry(key, value)?;
        }
        map.serialize_entry("artifacts", &self.artifacts)?;
        map.serialize_entry("related_incidents", &self.related_incidents)?;
        map.end()
    }
}
