use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Body of `POST /objects` and `PUT /objects/{id}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectPayload {
    pub name: String,
    #[serde(default)]
    pub data: Option<Map<String, Value>>,
}

impl ObjectPayload {
    pub fn new(name: impl Into<String>, data: Value) -> Self {
        Self {
            name: name.into(),
            data: match data {
                Value::Object(map) => Some(map),
                _ => None,
            },
        }
    }
}

/// Body of `PATCH /objects/{id}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ObjectPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Map<String, Value>>,
}

impl ObjectPatch {
    pub fn name(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            data: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.data.is_none()
    }
}

/// An object as returned by the service. Which of the optional fields are
/// present depends on the operation that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiObject {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteConfirmation {
    pub message: String,
}

impl DeleteConfirmation {
    pub fn for_id(id: &str) -> Self {
        Self {
            message: format!("Object with id = {id} has been deleted."),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_api_object_camel_case() {
        let obj: ApiObject = serde_json::from_value(json!({
            "id": "ff8081818",
            "name": "Apple MacBook Pro 19",
            "data": {"CPU model": "Intel Core i9"},
            "createdAt": "2024-05-01T12:00:00.000+00:00",
            "unexpected": true,
        }))
        .unwrap();

        assert_eq!(obj.id, "ff8081818");
        assert_eq!(
            obj.created_at.as_deref(),
            Some("2024-05-01T12:00:00.000+00:00")
        );
        assert!(obj.updated_at.is_none());
        assert_eq!(obj.data.unwrap()["CPU model"], "Intel Core i9");
    }

    #[test]
    fn test_patch_skips_absent_fields() {
        let patch = ObjectPatch::name("Xiaomi MacBook Pro 19");
        assert_eq!(
            serde_json::to_value(&patch).unwrap(),
            json!({"name": "Xiaomi MacBook Pro 19"})
        );
        assert!(ObjectPatch::default().is_empty());
    }

    #[test]
    fn test_payload_keeps_non_object_data_out() {
        let payload = ObjectPayload::new("Plain", json!(42));
        assert!(payload.data.is_none());

        let payload = ObjectPayload::new("Laptop", json!({"year": 2019}));
        assert_eq!(payload.data.unwrap()["year"], 2019);
    }

    #[test]
    fn test_delete_message() {
        assert_eq!(
            DeleteConfirmation::for_id("abc").message,
            "Object with id = abc has been deleted."
        );
    }
}
