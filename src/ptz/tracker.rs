use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::Duration;
use tracing::debug;

/// Coarse grained velocity-to-position integration factor. The camera gives
/// us no real position feedback, so this is a deliberately rough estimate:
/// `position += velocity * scale` once per commanded move, clamped to the
/// unit PTZ space. See the "Position delta scale" design note.
pub const POSITION_VELOCITY_SCALE: f64 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveAxisState {
    Idle,
    Moving,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EstimatedPosition {
    pub pt_x: f64,
    pub pt_y: f64,
    pub zoom: f64,
}

impl EstimatedPosition {
    pub fn clamp(&mut self) {
        self.pt_x = self.pt_x.clamp(-1.0, 1.0);
        self.pt_y = self.pt_y.clamp(-1.0, 1.0);
        self.zoom = self.zoom.clamp(0.0, 1.0);
    }
}

impl Default for EstimatedPosition {
    fn default() -> Self {
        Self { pt_x: 0.0, pt_y: 0.0, zoom: 0.0 }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct StatusSnapshot {
    pub pan_tilt: MoveAxisState,
    pub zoom: MoveAxisState,
    pub position: EstimatedPosition,
    pub utc_time: DateTime<Utc>,
}

struct Inner {
    pan_tilt: MoveAxisState,
    zoom: MoveAxisState,
    position: EstimatedPosition,
    pan_tilt_timer: Option<JoinHandle<()>>,
    zoom_timer: Option<JoinHandle<()>>,
}

impl Default for Inner {
    fn default() -> Self {
        Self {
            pan_tilt: MoveAxisState::Idle,
            zoom: MoveAxisState::Idle,
            position: EstimatedPosition::default(),
            pan_tilt_timer: None,
            zoom_timer: None,
        }
    }
}

/// Per-camera move-status state: two independent axis state machines
/// (`PanTilt`, `Zoom`), each `IDLE`/`MOVING`, plus a coarse estimated
/// position. A move to non-zero velocity starts (or restarts) a cancellable
/// auto-idle timer; a later call on the same axis replaces rather than
/// stacks the timer, matching the camera's own one-command-in-flight
/// behavior.
#[derive(Clone)]
pub struct StatusTracker {
    inner: Arc<Mutex<Inner>>,
}

impl StatusTracker {
    pub fn new() -> Self {
        Self { inner: Arc::new(Mutex::new(Inner::default())) }
    }

    /// Record a pan/tilt velocity command (the `ContinuousMove`/`RelativeMove`
    /// synthesis path). Zero velocity drives the axis to `IDLE` immediately
    /// with no timer and no position change. Non-zero velocity goes
    /// `MOVING`, accumulates an estimated position delta of
    /// `velocity * duration_secs * POSITION_VELOCITY_SCALE`, and arms an
    /// auto-idle timer for `duration_secs`, replacing any timer already
    /// running for this axis.
    pub async fn set_pan_tilt_velocity(&self, x: f64, y: f64, duration_secs: f64) {
        let zero = x == 0.0 && y == 0.0;
        let mut inner = self.inner.lock().await;

        if let Some(handle) = inner.pan_tilt_timer.take() {
            handle.abort();
        }

        if zero {
            inner.pan_tilt = MoveAxisState::Idle;
            return;
        }

        inner.pan_tilt = MoveAxisState::Moving;
        inner.position.pt_x += x * duration_secs * POSITION_VELOCITY_SCALE;
        inner.position.pt_y += y * duration_secs * POSITION_VELOCITY_SCALE;
        inner.position.clamp();

        let tracker = self.clone();
        let duration = Duration::from_secs_f64(duration_secs.max(0.0));
        inner.pan_tilt_timer = Some(tokio::spawn(async move {
            tokio::time::sleep(duration).await;
            tracker.idle_pan_tilt().await;
        }));
    }

    pub async fn set_zoom_velocity(&self, x: f64, duration_secs: f64) {
        let zero = x == 0.0;
        let mut inner = self.inner.lock().await;

        if let Some(handle) = inner.zoom_timer.take() {
            handle.abort();
        }

        if zero {
            inner.zoom = MoveAxisState::Idle;
            return;
        }

        inner.zoom = MoveAxisState::Moving;
        inner.position.zoom += x * duration_secs * POSITION_VELOCITY_SCALE;
        inner.position.clamp();

        let tracker = self.clone();
        let duration = Duration::from_secs_f64(duration_secs.max(0.0));
        inner.zoom_timer = Some(tokio::spawn(async move {
            tokio::time::sleep(duration).await;
            tracker.idle_zoom().await;
        }));
    }

    /// `AbsoluteMove` synthesis: the target position is authoritative, not a
    /// delta, so it is written directly (then clamped) rather than
    /// accumulated. Both axes are marked `MOVING` for a fixed settle window.
    pub async fn apply_absolute_move(&self, pan_tilt: Option<(f64, f64)>, zoom: Option<f64>, duration_secs: f64) {
        let mut inner = self.inner.lock().await;

        if let Some((x, y)) = pan_tilt {
            if let Some(h) = inner.pan_tilt_timer.take() {
                h.abort();
            }
            inner.pan_tilt = MoveAxisState::Moving;
            inner.position.pt_x = x;
            inner.position.pt_y = y;
            let tracker = self.clone();
            let duration = Duration::from_secs_f64(duration_secs.max(0.0));
            inner.pan_tilt_timer = Some(tokio::spawn(async move {
                tokio::time::sleep(duration).await;
                tracker.idle_pan_tilt().await;
            }));
        }

        if let Some(z) = zoom {
            if let Some(h) = inner.zoom_timer.take() {
                h.abort();
            }
            inner.zoom = MoveAxisState::Moving;
            inner.position.zoom = z;
            let tracker = self.clone();
            let duration = Duration::from_secs_f64(duration_secs.max(0.0));
            inner.zoom_timer = Some(tokio::spawn(async move {
                tokio::time::sleep(duration).await;
                tracker.idle_zoom().await;
            }));
        }

        inner.position.clamp();
    }

    async fn idle_pan_tilt(&self) {
        let mut inner = self.inner.lock().await;
        inner.pan_tilt = MoveAxisState::Idle;
        inner.pan_tilt_timer = None;
        debug!("pan/tilt auto-idled");
    }

    async fn idle_zoom(&self) {
        let mut inner = self.inner.lock().await;
        inner.zoom = MoveAxisState::Idle;
        inner.zoom_timer = None;
        debug!("zoom auto-idled");
    }

    /// `Stop` synthesis: the camera has no native stop, so the proxy drives
    /// both axes to `IDLE` immediately regardless of which `StopFlags` the
    /// client actually requested — see the "Stop flag semantics" design
    /// note.
    pub async fn force_idle_both(&self) {
        let mut inner = self.inner.lock().await;
        if let Some(h) = inner.pan_tilt_timer.take() {
            h.abort();
        }
        if let Some(h) = inner.zoom_timer.take() {
            h.abort();
        }
        inner.pan_tilt = MoveAxisState::Idle;
        inner.zoom = MoveAxisState::Idle;
    }

    pub async fn snapshot(&self) -> StatusSnapshot {
        let inner = self.inner.lock().await;
        StatusSnapshot {
            pan_tilt: inner.pan_tilt,
            zoom: inner.zoom,
            position: inner.position,
            utc_time: Utc::now(),
        }
    }

    /// Cancel all outstanding auto-idle timers. Called on process shutdown.
    pub async fn cleanup(&self) {
        let mut inner = self.inner.lock().await;
        if let Some(h) = inner.pan_tilt_timer.take() {
            h.abort();
        }
        if let Some(h) = inner.zoom_timer.take() {
            h.abort();
        }
    }
}

impl Default for StatusTracker {
    fn default() -> Self {
        Self::new()
    }
}
