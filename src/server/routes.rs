use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde_json::json;

use crate::camera::{CameraForward, LivenessProbe, ServiceCatalog};
use crate::ptz::splice::splice_configuration_options;
use crate::ptz::{InterceptOutcome, PtzInterceptor};
use crate::soap::build::build_fault;
use crate::soap::parse::parse;

#[derive(Clone)]
pub struct AppState {
    pub forwarder: Arc<dyn CameraForward>,
    pub interceptor: PtzInterceptor,
    pub profile_token: String,
    pub liveness: LivenessProbe,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/onvif/:service", post(handle_onvif_request))
        .route("/health", get(health_check))
        .route("/", get(info_page))
        .with_state(state)
}

const SOAP_CONTENT_TYPE: &str = "application/soap+xml; charset=utf-8";

async fn handle_onvif_request(
    State(state): State<AppState>,
    Path(service): Path<String>,
    headers: HeaderMap,
    body: String,
) -> Response {
    log_content_type_mismatch(&headers);
    tracing::debug!("Request body for service '{service}': {body}");

    let parsed = match parse(&body) {
        Ok(p) => p,
        Err(err) => {
            tracing::error!("failed to parse SOAP envelope: {err}");
            let fault = build_fault("SOAP-ENV:Receiver", &err.fault_reason(), None);
            return (err.status_code(), [("content-type", SOAP_CONTENT_TYPE)], fault).into_response();
        }
    };

    let operation = parsed.operation.clone().unwrap_or_default();
    let normalized_service = ServiceCatalog::normalize_service_name(&service);
    tracing::info!(service = %normalized_service, operation = %operation, "dispatching ONVIF request");

    if normalized_service == "ptz_service" && !operation.is_empty() {
        match state.interceptor.intercept(&operation, &parsed.root).await {
            InterceptOutcome::Response(xml, status) => {
                return (status, [("content-type", SOAP_CONTENT_TYPE)], xml).into_response();
            }
            InterceptOutcome::NotIntercepted => {}
        }
    }

    match state.forwarder.forward(&normalized_service, &body).await {
        Ok((mut response_body, status)) => {
            if normalized_service == "ptz_service" && operation == "GetConfigurationOptions" {
                response_body = splice_configuration_options(&response_body);
            }
            (status, [("content-type", SOAP_CONTENT_TYPE)], response_body).into_response()
        }
        Err(err) => {
            tracing::error!("forward to camera failed: {err}");
            let fault = build_fault("SOAP-ENV:Receiver", &err.fault_reason(), None);
            (err.status_code(), [("content-type", SOAP_CONTENT_TYPE)], fault).into_response()
        }
    }
}

/// ONVIF clients are inconsistent about declaring `Content-Type`; accept the
/// request regardless, but note anything that doesn't look like SOAP.
fn log_content_type_mismatch(headers: &HeaderMap) {
    let content_type = headers
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    if !content_type.starts_with("application/soap+xml") && !content_type.starts_with("text/xml") {
        tracing::debug!("unexpected content-type '{content_type}' on ONVIF request");
    }
}

async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    axum::Json(json!({
        "status": "ok",
        "camera_connected": state.liveness.is_connected(),
        "ptz_wrapper_active": true,
        "profile_token": state.profile_token,
    }))
}

async fn info_page() -> impl IntoResponse {
    Html(
        r#"<!DOCTYPE html>
<html>
<head><title>ONVIF PTZ Proxy</title></head>
<body>
<h1>ONVIF PTZ Compatibility Proxy</h1>
<p>Synthesizes MoveStatus, Stop, and relative Pan/Tilt on top of a ContinuousMove-only camera.</p>
<p>See <code>GET /health</code> for status.</p>
</body>
</html>"#,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::forwarder::tests::FakeForwarder;
    use crate::soap::build::build_simple_response;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    fn test_state(responses: Vec<(String, StatusCode)>) -> AppState {
        let forwarder: Arc<dyn CameraForward> = Arc::new(FakeForwarder::new(responses));
        let interceptor = PtzInterceptor::new(forwarder.clone(), "PROFILE_000".into());
        AppState {
            forwarder,
            interceptor,
            profile_token: "PROFILE_000".into(),
            liveness: LivenessProbe::new(),
        }
    }

    fn soap_request(uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", SOAP_CONTENT_TYPE)
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn health_endpoint_reports_profile_token() {
        let app = create_router(test_state(vec![]));
        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["profile_token"], "PROFILE_000");
    }

    #[tokio::test]
    async fn ptz_get_service_capabilities_is_not_forwarded() {
        let app = create_router(test_state(vec![]));
        let body = r#"<SOAP-ENV:Envelope xmlns:SOAP-ENV="http://www.w3.org/2003/05/soap-envelope"><SOAP-ENV:Body><tptz:GetServiceCapabilities xmlns:tptz="x"/></SOAP-ENV:Body></SOAP-ENV:Envelope>"#;
        let response = app
            .oneshot(soap_request("/onvif/ptz", body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let text = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(text.contains(r#"MoveStatus="true""#));
    }

    #[tokio::test]
    async fn non_ptz_service_is_forwarded_unchanged() {
        let app = create_router(test_state(vec![(build_simple_response("GetDeviceInformation", "tds"), StatusCode::OK)]));
        let body = r#"<SOAP-ENV:Envelope xmlns:SOAP-ENV="http://www.w3.org/2003/05/soap-envelope"><SOAP-ENV:Body><tds:GetDeviceInformation xmlns:tds="x"/></SOAP-ENV:Body></SOAP-ENV:Envelope>"#;
        let response = app
            .oneshot(soap_request("/onvif/device", body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let text = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(text.contains("GetDeviceInformationResponse"));
    }

    #[tokio::test]
    async fn malformed_soap_returns_receiver_fault() {
        let app = create_router(test_state(vec![]));
        let response = app
            .oneshot(soap_request("/onvif/ptz", "<not><xml"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let text = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(text.contains("Malformed SOAP"));
    }

    #[tokio::test]
    async fn get_configuration_options_is_spliced_after_forwarding() {
        let camera_response = r#"<GetConfigurationOptionsResponse xmlns="x"><PTZConfigurationOptions><Spaces/></PTZConfigurationOptions></GetConfigurationOptionsResponse>"#;
        let app = create_router(test_state(vec![(camera_response.to_string(), StatusCode::OK)]));
        let body = r#"<SOAP-ENV:Envelope xmlns:SOAP-ENV="http://www.w3.org/2003/05/soap-envelope"><SOAP-ENV:Body><tptz:GetConfigurationOptions xmlns:tptz="x"/></SOAP-ENV:Body></SOAP-ENV:Envelope>"#;
        let response = app
            .oneshot(soap_request("/onvif/ptz", body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let text = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(text.contains("TranslationSpaceFov"));
    }
}
