use super::state::AppState;
use crate::errors::ApiError;
use crate::model::{ApiObject, DeleteConfirmation, ObjectPatch, ObjectPayload};
use axum::{
    Json,
    extract::{Path, Query, State, rejection::JsonRejection},
    http::StatusCode,
};
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::info;

/// GET /objects, optionally filtered with repeated `id` query parameters
pub async fn list_objects_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<Vec<(String, String)>>,
) -> Json<Vec<ApiObject>> {
    let ids: Vec<String> = params
        .into_iter()
        .filter(|(key, _)| key == "id")
        .map(|(_, value)| value)
        .collect();

    if ids.is_empty() {
        Json(state.store.list())
    } else {
        Json(state.store.list_by_ids(&ids))
    }
}

/// GET /objects/{id}
pub async fn get_object_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ApiObject>, ApiError> {
    state.store.get(&id).map(Json)
}

/// POST /objects
pub async fn create_object_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ObjectPayload>, JsonRejection>,
) -> Result<Json<ApiObject>, ApiError> {
    let Json(payload) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;

    let created = state.store.create(payload);
    state.metrics.stub_objects.set(state.store.len() as i64);

    info!(id = %created.id, "Object created");
    Ok(Json(created))
}

/// PUT /objects/{id}
pub async fn update_object_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    payload: Result<Json<ObjectPayload>, JsonRejection>,
) -> Result<Json<ApiObject>, ApiError> {
    let Json(payload) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;

    let updated = state.store.replace(&id, payload)?;
    info!(id = %id, "Object replaced");
    Ok(Json(updated))
}

/// PATCH /objects/{id}
pub async fn patch_object_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    patch: Result<Json<ObjectPatch>, JsonRejection>,
) -> Result<Json<ApiObject>, ApiError> {
    let Json(patch) = patch.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    if patch.is_empty() {
        return Err(ApiError::BadRequest(
            "Request body must contain name or data".to_string(),
        ));
    }

    let patched = state.store.patch(&id, patch)?;
    info!(id = %id, "Object patched");
    Ok(Json(patched))
}

/// DELETE /objects/{id}
pub async fn delete_object_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<DeleteConfirmation>, ApiError> {
    state.store.delete(&id)?;
    state.metrics.stub_objects.set(state.store.len() as i64);

    info!(id = %id, "Object deleted");
    Ok(Json(DeleteConfirmation::for_id(&id)))
}

/// GET /healthz - Liveness probe
pub async fn healthz_handler() -> (StatusCode, Json<Value>) {
    (
        StatusCode::OK,
        Json(json!({
            "status": "ok"
        })),
    )
}

/// GET /metrics - Prometheus metrics
pub async fn metrics_handler(State(state): State<Arc<AppState>>) -> String {
    state.metrics.encode()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::http::state::ObjectStore;
    use crate::metrics::Metrics;

    fn create_test_state() -> Arc<AppState> {
        let config = Arc::new(Config::default());
        let store = Arc::new(ObjectStore::seeded());
        let metrics = Arc::new(Metrics::new());
        Arc::new(AppState::new(config, store, metrics))
    }

    fn payload(name: &str) -> ObjectPayload {
        ObjectPayload::new(name, json!({"year": 2019, "price": 1849.99}))
    }

    #[tokio::test]
    async fn test_healthz() {
        let (status, _) = healthz_handler().await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_list_all_and_by_ids() {
        let state = create_test_state();

        let Json(all) = list_objects_handler(State(state.clone()), Query(vec![])).await;
        assert_eq!(all.len(), 13);

        let params = vec![
            ("id".to_string(), "3".to_string()),
            ("id".to_string(), "1".to_string()),
        ];
        let Json(some) = list_objects_handler(State(state), Query(params)).await;
        let ids: Vec<&str> = some.iter().map(|o| o.id.as_str()).collect();
        assert_eq!(ids, vec!["3", "1"]);
    }

    #[tokio::test]
    async fn test_create_update_delete() {
        let state = create_test_state();

        let Json(created) = create_object_handler(State(state.clone()), Ok(Json(payload("a"))))
            .await
            .unwrap();
        assert!(created.created_at.is_some());

        let Json(updated) = update_object_handler(
            State(state.clone()),
            Path(created.id.clone()),
            Ok(Json(payload("b"))),
        )
        .await
        .unwrap();
        assert_eq!(updated.name.as_deref(), Some("b"));
        assert!(updated.updated_at.is_some());

        let Json(confirmation) = delete_object_handler(State(state.clone()), Path(created.id.clone()))
            .await
            .unwrap();
        assert_eq!(
            confirmation.message,
            format!("Object with id = {} has been deleted.", created.id)
        );

        let missing = get_object_handler(State(state), Path(created.id)).await;
        assert!(matches!(missing, Err(ApiError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_empty_patch_is_rejected() {
        let state = create_test_state();

        let Json(created) = create_object_handler(State(state.clone()), Ok(Json(payload("a"))))
            .await
            .unwrap();

        let result = patch_object_handler(
            State(state.clone()),
            Path(created.id.clone()),
            Ok(Json(ObjectPatch::default())),
        )
        .await;
        assert!(matches!(result, Err(ApiError::BadRequest(_))));

        // The object is left untouched
        let Json(fetched) = get_object_handler(State(state), Path(created.id)).await.unwrap();
        assert_eq!(fetched.name.as_deref(), Some("a"));
    }

    #[tokio::test]
    async fn test_metrics() {
        let state = create_test_state();
        let metrics_output = metrics_handler(State(state)).await;

        assert!(metrics_output.contains("build_info"));
        assert!(metrics_output.contains("stub_objects 13"));
    }
}
