use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use onvif_ptz_proxy::camera::{CameraForward, HttpCameraForwarder, LivenessProbe, ServiceCatalog};
use onvif_ptz_proxy::config::AppConfig;
use onvif_ptz_proxy::ptz::PtzInterceptor;
use onvif_ptz_proxy::rewrite::AddressRewriter;
use onvif_ptz_proxy::server::{start_server, AppState};

#[tokio::main]
async fn main() -> Result<()> {
    let config = AppConfig::load_from_env().context("Failed to load configuration")?;

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            format!("onvif_ptz_proxy={},tower_http=info", config.log_level.to_lowercase()).into()
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting ONVIF PTZ compatibility proxy");
    tracing::info!(
        camera = %config.camera_base_url(),
        external = %format!("{}:{}", config.proxy_external_host, config.proxy_external_port),
        "Configuration loaded"
    );

    let catalog = ServiceCatalog::new(config.camera_base_url());
    let rewriter = AddressRewriter::new(
        config.proxy_external_host.clone(),
        config.proxy_external_port,
        config.camera_host.clone(),
        config.camera_port,
    );

    let forwarder: Arc<dyn CameraForward> = Arc::new(HttpCameraForwarder::new(
        catalog,
        rewriter,
        config.camera_user.clone(),
        config.camera_pass.clone(),
        Duration::from_secs(config.forward_timeout_secs),
    )?);

    let interceptor = PtzInterceptor::new(forwarder.clone(), config.profile_token.clone());

    let liveness = LivenessProbe::new();
    liveness.spawn(config.camera_host.clone(), config.camera_port);

    let state = AppState {
        forwarder,
        interceptor,
        profile_token: config.profile_token.clone(),
        liveness,
    };

    start_server(config.listen_address(), state).await
}
