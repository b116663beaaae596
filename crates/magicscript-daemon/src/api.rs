//! REST API handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use magicscript_bridge::{BridgeCall, Command, CommandError, DispatchError, HostEvent};
use magicscript_core::{NodeId, PlaneConfig};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::state::AppState;

/// API error response
#[derive(Serialize)]
struct ApiError {
    error: String,
}

impl ApiError {
    fn new(msg: impl Into<String>) -> Self {
        Self { error: msg.into() }
    }
}

fn dispatch_error(e: DispatchError) -> axum::response::Response {
    let status = match e {
        DispatchError::Invalid(_) => StatusCode::BAD_REQUEST,
        DispatchError::Closed | DispatchError::NoReply => StatusCode::SERVICE_UNAVAILABLE,
    };
    (status, Json(ApiError::new(e.to_string()))).into_response()
}

/// Rejected entry of a call batch
#[derive(Serialize)]
struct RejectedCall {
    index: usize,
    error: String,
}

#[derive(Serialize)]
struct BatchResult {
    accepted: usize,
    rejected: Vec<RejectedCall>,
}

/// Queue a batch of bridge calls in order
///
/// Entries that fail to parse or convert are skipped and reported, the
/// rest are still queued.
pub async fn submit_calls(
    State(state): State<Arc<AppState>>,
    Json(calls): Json<Vec<Value>>,
) -> impl IntoResponse {
    let mut result = BatchResult {
        accepted: 0,
        rejected: Vec::new(),
    };

    for (index, entry) in calls.into_iter().enumerate() {
        let submitted = serde_json::from_value::<BridgeCall>(entry)
            .map_err(|e| DispatchError::from(CommandError::Malformed(e.to_string())))
            .and_then(|call| state.dispatcher.submit_call(call));
        match submitted {
            Ok(()) => result.accepted += 1,
            Err(DispatchError::Invalid(e)) => {
                debug!(index, error = %e, "Rejected bridge call");
                result.rejected.push(RejectedCall {
                    index,
                    error: e.to_string(),
                });
            }
            Err(e) => return dispatch_error(e),
        }
    }

    Json(result).into_response()
}

/// Get a node snapshot by id
pub async fn get_node(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    match state.dispatcher.find_node(NodeId::new(id)).await {
        Ok(Some(node)) => Json(node).into_response(),
        Ok(None) => (StatusCode::NOT_FOUND, Json(ApiError::new("Node not found"))).into_response(),
        Err(e) => dispatch_error(e),
    }
}

/// Get the scene summary
pub async fn get_scene(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.dispatcher.scene_snapshot().await {
        Ok(summary) => Json(summary).into_response(),
        Err(e) => dispatch_error(e),
    }
}

/// Plane query body
#[derive(Deserialize)]
pub struct PlanesRequest {
    /// Plane type filter, the configured defaults when absent
    #[serde(default, rename = "planeType")]
    plane_type: Option<Vec<String>>,
}

#[derive(Serialize)]
struct PlanesResponse {
    planes: Vec<magicscript_core::Plane>,
}

/// Query currently tracked planes
pub async fn get_planes(
    State(state): State<Arc<AppState>>,
    Json(req): Json<PlanesRequest>,
) -> impl IntoResponse {
    let config = match req.plane_type {
        Some(names) => PlaneConfig::from_names(names.as_slice()),
        None => PlaneConfig::from_names(state.config.planes.types.as_slice()),
    };

    match state.dispatcher.all_planes(config).await {
        Ok(Ok(planes)) => Json(PlanesResponse { planes }).into_response(),
        Ok(Err(e)) => (StatusCode::CONFLICT, Json(ApiError::new(e.to_string()))).into_response(),
        Err(e) => dispatch_error(e),
    }
}

/// Deliver a host lifecycle transition
pub async fn host_event(
    State(state): State<Arc<AppState>>,
    Path(event): Path<String>,
) -> impl IntoResponse {
    let host_event = match event.as_str() {
        "resume" => HostEvent::Resume,
        "pause" => HostEvent::Pause,
        "destroy" => HostEvent::Destroy,
        other => {
            warn!(event = %other, "Unknown host event");
            return (
                StatusCode::BAD_REQUEST,
                Json(ApiError::new(format!("Unknown host event: {}", other))),
            )
                .into_response();
        }
    };

    info!(event = host_event.name(), "Host event requested");
    match state.dispatcher.submit(Command::Host(host_event)) {
        Ok(()) => StatusCode::ACCEPTED.into_response(),
        Err(e) => dispatch_error(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use axum::body::to_bytes;
    use axum::response::Response;
    use serde_json::{json, Value};

    async fn state() -> Arc<AppState> {
        let mut config = Config::default();
        config.resources.path = "/nonexistent".to_string();
        AppState::new(config).await.unwrap()
    }

    async fn body_json(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn calls(value: Value) -> Json<Vec<Value>> {
        Json(serde_json::from_value(value).unwrap())
    }

    #[tokio::test]
    async fn test_batch_reports_rejected_calls() {
        let state = state().await;

        let response = submit_calls(
            State(state.clone()),
            calls(json!([
                {"method": "createNode", "type": "GroupNode", "nodeId": "g"},
                {"method": "createNode", "type": "WarpNode", "nodeId": "w"},
                {"method": "addChildNodeToContainer", "nodeId": "g"}
            ])),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["accepted"], 2);
        assert_eq!(body["rejected"][0]["index"], 1);

        let response = get_scene(State(state)).await.into_response();
        let body = body_json(response).await;
        assert_eq!(body["roots"], json!(["g"]));
        assert_eq!(body["node_count"], 1);
    }

    #[tokio::test]
    async fn test_batch_skips_malformed_entries() {
        let state = state().await;

        let response = submit_calls(
            State(state.clone()),
            calls(json!([
                {"method": "createNode", "type": "GroupNode", "nodeId": "g"},
                {"nodeId": "no-method"},
                "createNode",
                {"method": "addChildNodeToContainer", "nodeId": "g"}
            ])),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["accepted"], 2);
        assert_eq!(body["rejected"][0]["index"], 1);
        assert_eq!(body["rejected"][1]["index"], 2);
        assert!(body["rejected"][0]["error"]
            .as_str()
            .unwrap()
            .starts_with("Malformed call"));

        let response = get_scene(State(state)).await.into_response();
        let body = body_json(response).await;
        assert_eq!(body["roots"], json!(["g"]));
    }

    #[tokio::test]
    async fn test_missing_node_is_not_found() {
        let state = state().await;
        let response = get_node(State(state), Path("ghost".to_string()))
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_planes_before_detection_conflict() {
        let state = state().await;
        let response = get_planes(State(state), Json(PlanesRequest { plane_type: None }))
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);

        let body = body_json(response).await;
        assert_eq!(
            body["error"],
            "You have to enable planes detection with startDetecting method!"
        );
    }

    #[tokio::test]
    async fn test_host_destroy_stops_dispatcher() {
        let state = state().await;

        let response = host_event(State(state.clone()), Path("wobble".to_string()))
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = host_event(State(state.clone()), Path("destroy".to_string()))
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::ACCEPTED);

        let response = get_scene(State(state)).await.into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
