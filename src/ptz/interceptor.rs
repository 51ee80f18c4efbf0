use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;
use tracing::{info, warn};

use crate::camera::forwarder::CameraForward;
use crate::error::ProxyError;
use crate::ptz::tracker::StatusTracker;
use crate::soap::build::{build_continuous_move_request, build_fault, build_service_capabilities_response, build_simple_response, build_status_response};
use crate::soap::dom::XmlNode;
use crate::soap::parse::{extract_duration, extract_profile_token, extract_stop_flags, extract_vector};

/// Default duration used for a bare `ContinuousMove` with no client-supplied
/// `Timeout`.
const DEFAULT_MOVE_DURATION_SECS: f64 = 5.0;
/// `AbsoluteMove` has no natural "how long will this take" signal from the
/// request, so the tracker is simply held `MOVING` for a fixed settle
/// window.
const ABSOLUTE_MOVE_SETTLE_SECS: f64 = 3.0;
const RELATIVE_MOVE_VELOCITY: f64 = 0.5;
const RELATIVE_MOVE_MIN_DURATION_SECS: f64 = 0.3;
const RELATIVE_MOVE_MAX_DURATION_SECS: f64 = 5.0;
const RELATIVE_MOVE_DURATION_SCALE: f64 = 10.0;

pub enum InterceptOutcome {
    /// The Interceptor produced a full response itself; the Router emits it
    /// as-is.
    Response(String, StatusCode),
    /// Not a PTZ operation this proxy synthesizes; the Router should forward
    /// the original request unchanged.
    NotIntercepted,
}

/// Per-operation PTZ dispatch. Owns a [`StatusTracker`] and a handle to the
/// [`CameraForward`] it uses both to relay client-originated calls and to
/// issue its own synthesized `ContinuousMove` calls.
#[derive(Clone)]
pub struct PtzInterceptor {
    tracker: StatusTracker,
    forwarder: Arc<dyn CameraForward>,
    profile_token: String,
}

impl PtzInterceptor {
    pub fn new(forwarder: Arc<dyn CameraForward>, profile_token: String) -> Self {
        Self { tracker: StatusTracker::new(), forwarder, profile_token }
    }

    pub fn tracker(&self) -> &StatusTracker {
        &self.tracker
    }

    pub async fn intercept(&self, operation: &str, root: &XmlNode) -> InterceptOutcome {
        let result = match operation {
            "GetServiceCapabilities" => Ok(self.handle_get_service_capabilities()),
            "GetStatus" => Ok(self.handle_get_status().await),
            "ContinuousMove" => self.handle_continuous_move(root).await,
            "RelativeMove" => self.handle_relative_move(root).await,
            "AbsoluteMove" => self.handle_absolute_move(root).await,
            "Stop" => self.handle_stop(root).await,
            _ => return InterceptOutcome::NotIntercepted,
        };

        match result {
            Ok(outcome) => outcome,
            Err(err) => {
                warn!("error intercepting {operation}: {err:#}");
                let proxy_err = ProxyError::from(err);
                InterceptOutcome::Response(
                    build_fault("SOAP-ENV:Receiver", &proxy_err.fault_reason(), None),
                    proxy_err.status_code(),
                )
            }
        }
    }

    fn handle_get_service_capabilities(&self) -> InterceptOutcome {
        info!("intercepting GetServiceCapabilities, reporting MoveStatus support");
        InterceptOutcome::Response(build_service_capabilities_response(), StatusCode::OK)
    }

    async fn handle_get_status(&self) -> InterceptOutcome {
        info!("intercepting GetStatus, returning tracked status");
        let snapshot = self.tracker.snapshot().await;
        InterceptOutcome::Response(build_status_response(&snapshot), StatusCode::OK)
    }

    async fn handle_continuous_move(&self, root: &XmlNode) -> anyhow::Result<InterceptOutcome> {
        let profile_token = extract_profile_token(root).unwrap_or_else(|| self.profile_token.clone());
        let velocity = extract_vector(root, "Velocity");
        let duration = extract_duration(root).unwrap_or(DEFAULT_MOVE_DURATION_SECS);

        let pt = velocity.pan_tilt.map(|pt| (pt.x, pt.y));
        let zoom = velocity.zoom.map(|z| z.x);
        let request = build_continuous_move_request(&profile_token, pt, zoom, extract_duration(root));

        let (body, status) = self.forwarder.forward("ptz_service", &request).await?;

        if velocity.is_zero() {
            self.tracker.force_idle_both().await;
        } else {
            if let Some((x, y)) = pt {
                self.tracker.set_pan_tilt_velocity(x, y, duration).await;
            }
            if let Some(z) = zoom {
                self.tracker.set_zoom_velocity(z, duration).await;
            }
        }

        Ok(InterceptOutcome::Response(body, status))
    }

    async fn handle_relative_move(&self, root: &XmlNode) -> anyhow::Result<InterceptOutcome> {
        let profile_token = extract_profile_token(root).unwrap_or_else(|| self.profile_token.clone());
        let translation = extract_vector(root, "Translation");

        if let Some(pan_tilt) = translation.pan_tilt {
            let tx = pan_tilt.x;
            let ty = pan_tilt.y;
            let vx = signed_velocity(tx);
            let vy = signed_velocity(ty);
            let duration = (tx.abs() * RELATIVE_MOVE_DURATION_SCALE + ty.abs() * RELATIVE_MOVE_DURATION_SCALE)
                .clamp(RELATIVE_MOVE_MIN_DURATION_SECS, RELATIVE_MOVE_MAX_DURATION_SECS);

            info!("translating Pan/Tilt RelativeMove to ContinuousMove: velocity=({vx}, {vy}), duration={duration}s");

            let start_request = build_continuous_move_request(&profile_token, Some((vx, vy)), Some(0.0), None);
            self.forwarder.forward("ptz_service", &start_request).await?;
            self.tracker.set_pan_tilt_velocity(vx, vy, duration).await;

            let forwarder = self.forwarder.clone();
            let tracker = self.tracker.clone();
            let profile_token = profile_token.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_secs_f64(duration)).await;
                let stop_request = build_continuous_move_request(&profile_token, Some((0.0, 0.0)), Some(0.0), None);
                if let Err(err) = forwarder.forward("ptz_service", &stop_request).await {
                    warn!("RelativeMove follow-up stop failed: {err:#}");
                }
                tracker.set_pan_tilt_velocity(0.0, 0.0, 0.0).await;
            });

            return Ok(InterceptOutcome::Response(build_simple_response("RelativeMove", "tptz"), StatusCode::OK));
        }

        if translation.zoom.is_some() {
            info!("Zoom RelativeMove, passing through to camera");
        } else {
            warn!("RelativeMove with no Pan/Tilt or Zoom translation, passing through unchanged");
        }

        Ok(InterceptOutcome::NotIntercepted)
    }

    async fn handle_absolute_move(&self, root: &XmlNode) -> anyhow::Result<InterceptOutcome> {
        let position = extract_vector(root, "Position");
        let pt = position.pan_tilt.map(|pt| (pt.x, pt.y));
        let zoom = position.zoom.map(|z| z.x);

        // AbsoluteMove is not intercepted at the wire level: the client's
        // own request is forwarded unchanged by the Router, we only tap in
        // to update the tracker with the target position.
        self.tracker
            .apply_absolute_move(pt, zoom, ABSOLUTE_MOVE_SETTLE_SECS)
            .await;

        Ok(InterceptOutcome::NotIntercepted)
    }

    async fn handle_stop(&self, root: &XmlNode) -> anyhow::Result<InterceptOutcome> {
        let profile_token = extract_profile_token(root).unwrap_or_else(|| self.profile_token.clone());
        let _flags = extract_stop_flags(root);

        info!("intercepting Stop, translating to ContinuousMove(0,0)");
        let stop_request = build_continuous_move_request(&profile_token, Some((0.0, 0.0)), Some(0.0), None);
        self.forwarder.forward("ptz_service", &stop_request).await?;
        self.tracker.force_idle_both().await;

        Ok(InterceptOutcome::Response(build_simple_response("Stop", "tptz"), StatusCode::OK))
    }
}

fn signed_velocity(translation_component: f64) -> f64 {
    if translation_component > 0.0 {
        RELATIVE_MOVE_VELOCITY
    } else if translation_component < 0.0 {
        -RELATIVE_MOVE_VELOCITY
    } else {
        0.0
    }
}
