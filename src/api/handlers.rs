//! API endpoint handlers

use axum::{
    body::Bytes,
    extract::State,
    http::{Method, Uri},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info};

use super::error::ApiError;
use super::response::JsonResponse;
use super::ApiState;
use crate::config::SliderMapping;

/// Path prefix in front of a slider id
pub const SLIDER_PATH_PREFIX: &str = "/api/sliders/";

/// Response for GET /api/sliders
#[derive(Debug, Serialize)]
pub struct SlidersResponse {
    pub sliders: SliderMapping,
}

/// Response for GET /api/sliders/{id}
#[derive(Debug, Serialize, Deserialize)]
pub struct SliderAppsResponse {
    pub apps: Vec<String>,
}

/// Request body for PUT /api/sliders/{id}
#[derive(Debug, Deserialize)]
pub struct UpdateSliderRequest {
    #[serde(default)]
    pub apps: Option<Vec<String>>,
}

/// Outcome of a write
#[derive(Debug, Serialize, Deserialize)]
pub struct GenericResponse {
    pub success: bool,
    pub message: String,
}

/// Response for GET /api/sessions
#[derive(Debug, Serialize)]
pub struct SessionsResponse {
    pub sessions: Vec<String>,
}

/// Response for GET /api/status
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub status: &'static str,
    pub slider_count: usize,
    pub web_url: String,
}

/// GET /api/sliders - Full slider mapping
pub async fn list_sliders(State(state): State<Arc<ApiState>>) -> JsonResponse<SlidersResponse> {
    JsonResponse(SlidersResponse {
        sliders: state.config.slider_mapping(),
    })
}

/// GET|PUT /api/sliders/{id} - Read or replace the apps of one slider
pub async fn slider_by_id(
    State(state): State<Arc<ApiState>>,
    method: Method,
    uri: Uri,
    body: Bytes,
) -> Result<Response, ApiError> {
    let slider_id = parse_slider_id(uri.path())?;

    match method {
        Method::GET => {
            let apps = state
                .config
                .slider_mapping()
                .remove(&slider_id)
                .unwrap_or_default();
            Ok(JsonResponse(SliderAppsResponse { apps }).into_response())
        }
        Method::PUT => {
            let req = decode_update(&body)?;
            let apps = req.apps.unwrap_or_default();

            // Read-modify-write against the current snapshot
            let mut mapping = state.config.slider_mapping();
            mapping.insert(slider_id, apps);

            // Persistence failures are reported in the payload, not the status line
            if let Err(e) = state.config.write_slider_mapping(mapping).await {
                error!("Failed to write config: {:#}", e);
                return Ok(JsonResponse(GenericResponse {
                    success: false,
                    message: "Failed to save configuration".to_string(),
                })
                .into_response());
            }

            info!("Slider {} updated", slider_id);
            Ok(JsonResponse(GenericResponse {
                success: true,
                message: "Slider updated - config will auto-reload".to_string(),
            })
            .into_response())
        }
        _ => Err(ApiError::MethodNotAllowed),
    }
}

/// GET /api/sessions - Keys of the live audio sessions
pub async fn list_sessions(State(state): State<Arc<ApiState>>) -> JsonResponse<SessionsResponse> {
    JsonResponse(SessionsResponse {
        sessions: state.sessions.session_keys(),
    })
}

/// GET /api/status - Health and summary
pub async fn status(State(state): State<Arc<ApiState>>) -> JsonResponse<StatusResponse> {
    JsonResponse(StatusResponse {
        status: "running",
        slider_count: state.config.slider_mapping().len(),
        web_url: state.web_url.clone(),
    })
}

/// Any other method on a fixed route
pub async fn method_not_allowed() -> ApiError {
    ApiError::MethodNotAllowed
}

/// Slider id is everything after the prefix, as a non-negative integer
fn parse_slider_id(path: &str) -> Result<u32, ApiError> {
    path.strip_prefix(SLIDER_PATH_PREFIX)
        .and_then(|raw| raw.parse::<u32>().ok())
        .ok_or(ApiError::BadRequest("Invalid slider ID"))
}

/// Decode the first JSON value of the body; trailing bytes are ignored
fn decode_update(body: &[u8]) -> Result<UpdateSliderRequest, ApiError> {
    serde_json::Deserializer::from_slice(body)
        .into_iter::<UpdateSliderRequest>()
        .next()
        .and_then(|res| res.ok())
        .ok_or(ApiError::BadRequest("Invalid request body"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_slider_id() {
        assert_eq!(parse_slider_id("/api/sliders/0"), Ok(0));
        assert_eq!(parse_slider_id("/api/sliders/42"), Ok(42));
        assert_eq!(parse_slider_id("/api/sliders/+7"), Ok(7));

        for bad in [
            "/api/sliders/",
            "/api/sliders/-1",
            "/api/sliders/abc",
            "/api/sliders/1/2",
            "/api/sliders/1.5",
            "/api/sliders/99999999999",
        ] {
            assert_eq!(
                parse_slider_id(bad),
                Err(ApiError::BadRequest("Invalid slider ID")),
                "{}",
                bad
            );
        }
    }

    #[test]
    fn test_decode_update() {
        let req = decode_update(br#"{"apps":["a.exe","b.exe"]}"#).unwrap();
        assert_eq!(req.apps.unwrap(), vec!["a.exe", "b.exe"]);

        // Missing or null list means "no apps"
        assert!(decode_update(b"{}").unwrap().apps.is_none());
        assert!(decode_update(br#"{"apps":null}"#).unwrap().apps.is_none());

        // Only the first value is read
        assert!(decode_update(br#"{"apps":[]} trailing"#).is_ok());

        assert!(decode_update(b"").is_err());
        assert!(decode_update(b"{not json").is_err());
        assert!(decode_update(br#"{"apps":"chrome.exe"}"#).is_err());
    }
}
