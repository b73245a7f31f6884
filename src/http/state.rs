use super::catalog::catalog;
use crate::config::Config;
use crate::errors::ApiError;
use crate::metrics::SharedMetrics;
use crate::model::{ApiObject, ObjectPatch, ObjectPayload};
use chrono::{DateTime, SecondsFormat, TimeDelta, Utc};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Arc<ObjectStore>,
    pub metrics: SharedMetrics,
}

impl AppState {
    pub fn new(config: Arc<Config>, store: Arc<ObjectStore>, metrics: SharedMetrics) -> Self {
        metrics.stub_objects.set(store.len() as i64);
        Self {
            config,
            store,
            metrics,
        }
    }
}

#[derive(Debug, Clone)]
struct StoredObject {
    name: String,
    data: Option<Value>,
    reserved: bool,
}

#[derive(Default)]
struct Objects {
    by_id: HashMap<String, StoredObject>,
    order: Vec<String>,
}

/// In-memory object store backing the stub service.
pub struct ObjectStore {
    objects: parking_lot::RwLock<Objects>,
    clock_skew: TimeDelta,
}

impl ObjectStore {
    /// Empty store with no catalog objects.
    pub fn empty() -> Self {
        Self {
            objects: parking_lot::RwLock::new(Objects::default()),
            clock_skew: TimeDelta::zero(),
        }
    }

    /// Store pre-populated with the reserved catalog.
    pub fn seeded() -> Self {
        let store = Self::empty();
        {
            let mut objects = store.objects.write();
            for (id, name, data) in catalog() {
                objects.order.push(id.to_string());
                objects.by_id.insert(
                    id.to_string(),
                    StoredObject {
                        name: name.to_string(),
                        data: (!data.is_null()).then_some(data),
                        reserved: true,
                    },
                );
            }
        }
        store
    }

    /// Shift every reported timestamp, to emulate a server with a wrong clock.
    pub fn with_clock_skew(mut self, skew: TimeDelta) -> Self {
        self.clock_skew = skew;
        self
    }

    pub fn len(&self) -> usize {
        self.objects.read().order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn now(&self) -> String {
        format_timestamp(Utc::now() + self.clock_skew)
    }

    pub fn list(&self) -> Vec<ApiObject> {
        let objects = self.objects.read();
        objects
            .order
            .iter()
            .filter_map(|id| objects.by_id.get(id).map(|o| to_api(id, o)))
            .collect()
    }

    /// Objects for the given ids in query order; unknown ids are skipped.
    pub fn list_by_ids(&self, ids: &[String]) -> Vec<ApiObject> {
        let objects = self.objects.read();
        ids.iter()
            .filter_map(|id| objects.by_id.get(id).map(|o| to_api(id, o)))
            .collect()
    }

    pub fn get(&self, id: &str) -> Result<ApiObject, ApiError> {
        self.objects
            .read()
            .by_id
            .get(id)
            .map(|o| to_api(id, o))
            .ok_or_else(|| ApiError::NotFound(id.to_string()))
    }

    pub fn create(&self, payload: ObjectPayload) -> ApiObject {
        let id = format!("{:032x}", rand::random::<u128>());
        let data = payload.data.map(Value::Object);
        let created_at = self.now();

        let mut objects = self.objects.write();
        objects.order.push(id.clone());
        objects.by_id.insert(
            id.clone(),
            StoredObject {
                name: payload.name.clone(),
                data: data.clone(),
                reserved: false,
            },
        );

        ApiObject {
            id,
            name: Some(payload.name),
            data,
            created_at: Some(created_at),
            updated_at: None,
        }
    }

    pub fn replace(&self, id: &str, payload: ObjectPayload) -> Result<ApiObject, ApiError> {
        let mut objects = self.objects.write();
        let object = writable(&mut objects, id)?;

        object.name = payload.name;
        object.data = payload.data.map(Value::Object);

        Ok(ApiObject {
            id: id.to_string(),
            name: Some(object.name.clone()),
            data: object.data.clone(),
            created_at: None,
            updated_at: Some(self.now()),
        })
    }

    /// Merge the given fields; the response echoes only what was patched.
    pub fn patch(&self, id: &str, patch: ObjectPatch) -> Result<ApiObject, ApiError> {
        let mut objects = self.objects.write();
        let object = writable(&mut objects, id)?;

        if let Some(name) = &patch.name {
            object.name = name.clone();
        }
        if let Some(data) = &patch.data {
            object.data = Some(Value::Object(data.clone()));
        }

        Ok(ApiObject {
            id: id.to_string(),
            name: patch.name,
            data: patch.data.map(Value::Object),
            created_at: None,
            updated_at: Some(self.now()),
        })
    }

    pub fn delete(&self, id: &str) -> Result<(), ApiError> {
        let mut objects = self.objects.write();
        writable(&mut objects, id)?;

        objects.by_id.remove(id);
        objects.order.retain(|existing| existing != id);
        Ok(())
    }
}

fn writable<'a>(objects: &'a mut Objects, id: &str) -> Result<&'a mut StoredObject, ApiError> {
    match objects.by_id.get_mut(id) {
        Some(object) if object.reserved => Err(ApiError::Reserved(id.to_string())),
        Some(object) => Ok(object),
        None => Err(ApiError::NotFound(id.to_string())),
    }
}

fn to_api(id: &str, object: &StoredObject) -> ApiObject {
    ApiObject {
        id: id.to_string(),
        name: Some(object.name.clone()),
        data: object.data.clone(),
        created_at: None,
        updated_at: None,
    }
}

/// Millisecond precision with an explicit `+00:00` offset, as the public service reports.
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::freshness::is_within_one_minute;
    use serde_json::json;

    fn payload(name: &str) -> ObjectPayload {
        ObjectPayload::new(name, json!({"year": 2019}))
    }

    #[test]
    fn test_seeded_catalog() {
        let store = ObjectStore::seeded();
        assert_eq!(store.len(), 13);
        assert_eq!(store.get("1").unwrap().name.as_deref(), Some("Google Pixel 6 Pro"));
        assert!(store.get("2").unwrap().data.is_none());
    }

    #[test]
    fn test_list_by_ids_follows_query_order() {
        let store = ObjectStore::seeded();
        let ids = vec!["3".to_string(), "missing".to_string(), "1".to_string()];
        let found: Vec<String> = store.list_by_ids(&ids).into_iter().map(|o| o.id).collect();
        assert_eq!(found, vec!["3", "1"]);
    }

    #[test]
    fn test_create_then_read() {
        let store = ObjectStore::empty();
        let created = store.create(payload("Lenovo ThinkPad"));

        assert_eq!(created.id.len(), 32);
        assert!(is_within_one_minute(created.created_at.as_deref().unwrap()).unwrap());

        let fetched = store.get(&created.id).unwrap();
        assert_eq!(fetched.name.as_deref(), Some("Lenovo ThinkPad"));
        assert!(fetched.created_at.is_none());
        assert_eq!(store.list().len(), 1);
    }

    #[test]
    fn test_patch_echoes_only_patched_fields() {
        let store = ObjectStore::empty();
        let created = store.create(payload("Apple MacBook Pro 19"));

        let patched = store
            .patch(&created.id, ObjectPatch::name("Xiaomi MacBook Pro 19"))
            .unwrap();
        assert_eq!(patched.name.as_deref(), Some("Xiaomi MacBook Pro 19"));
        assert!(patched.data.is_none());
        assert!(patched.updated_at.is_some());

        // Data survives the patch
        let fetched = store.get(&created.id).unwrap();
        assert_eq!(fetched.data, Some(json!({"year": 2019})));
    }

    #[test]
    fn test_reserved_objects_are_read_only() {
        let store = ObjectStore::seeded();
        assert!(matches!(
            store.replace("7", payload("x")),
            Err(ApiError::Reserved(_))
        ));
        assert!(matches!(
            store.patch("7", ObjectPatch::name("x")),
            Err(ApiError::Reserved(_))
        ));
        assert!(matches!(store.delete("7"), Err(ApiError::Reserved(_))));
        assert_eq!(store.len(), 13);
    }

    #[test]
    fn test_delete_removes_object() {
        let store = ObjectStore::empty();
        let created = store.create(payload("LG TV PC CONSOLE 4 in 1"));

        store.delete(&created.id).unwrap();
        assert!(store.is_empty());
        assert!(matches!(store.get(&created.id), Err(ApiError::NotFound(_))));
        assert!(matches!(store.delete(&created.id), Err(ApiError::NotFound(_))));
    }

    #[test]
    fn test_clock_skew_shifts_timestamps() {
        let store = ObjectStore::empty().with_clock_skew(TimeDelta::minutes(-5));
        let created = store.create(payload("Stale"));
        assert!(!is_within_one_minute(created.created_at.as_deref().unwrap()).unwrap());
    }
}
