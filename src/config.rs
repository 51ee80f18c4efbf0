use anyhow::{Context, Result};
use std::env;

/// Proxy/camera addressing and credentials, assembled once at startup from
/// environment variables and shared read-only for the lifetime of the process.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub camera_host: String,
    pub camera_port: u16,
    pub camera_user: String,
    pub camera_pass: String,

    pub proxy_host: String,
    pub proxy_port: u16,
    pub proxy_external_host: String,
    pub proxy_external_port: u16,

    pub log_level: String,
    pub profile_token: String,
    pub forward_timeout_secs: u64,
}

fn env_or(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

fn env_port(name: &str, default: u16) -> Result<u16> {
    match env::var(name) {
        Ok(raw) => raw
            .parse::<u16>()
            .with_context(|| format!("{name}={raw:?} is not a valid port")),
        Err(_) => Ok(default),
    }
}

impl AppConfig {
    /// Load configuration from the environment, falling back to the
    /// documented defaults for anything unset. Fails fast on a malformed
    /// value rather than silently coercing it.
    pub fn load_from_env() -> Result<Self> {
        let config = Self {
            camera_host: env_or("CAMERA_IP", "127.0.0.1"),
            camera_port: env_port("CAMERA_PORT", 8000).context("invalid CAMERA_PORT")?,
            camera_user: env_or("CAMERA_USER", "admin"),
            camera_pass: env_or("CAMERA_PASS", "admin"),

            proxy_host: env_or("PROXY_HOST", "0.0.0.0"),
            proxy_port: env_port("PROXY_PORT", 8000).context("invalid PROXY_PORT")?,
            proxy_external_host: env_or("PROXY_EXTERNAL_HOST", "127.0.0.1"),
            proxy_external_port: env_port("PROXY_EXTERNAL_PORT", 8000).context("invalid PROXY_EXTERNAL_PORT")?,

            log_level: env_or("LOG_LEVEL", "INFO"),
            profile_token: env_or("PTZ_PROFILE_TOKEN", "PROFILE_000"),
            forward_timeout_secs: env::var("FORWARD_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(10),
        };

        anyhow::ensure!(!config.camera_host.trim().is_empty(), "CAMERA_IP must not be empty");
        anyhow::ensure!(!config.proxy_host.trim().is_empty(), "PROXY_HOST must not be empty");

        Ok(config)
    }

    pub fn listen_address(&self) -> String {
        format!("{}:{}", self.proxy_host, self.proxy_port)
    }

    pub fn camera_base_url(&self) -> String {
        format!("http://{}:{}", self.camera_host, self.camera_port)
    }
}
