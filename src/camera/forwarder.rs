use std::time::Duration;

use async_trait::async_trait;
use axum::http::StatusCode;
use reqwest::Client;
use tracing::{debug, warn};

use crate::camera::catalog::ServiceCatalog;
use crate::camera::digest::{build_authorization_header, DigestChallenge};
use crate::error::ProxyError;
use crate::rewrite::AddressRewriter;

const USER_AGENT: &str = "ONVIF-Proxy/1.0";

/// Outbound HTTP client with Digest auth: maps a service name to the
/// camera's URL, classifies transport failures into [`ProxyError`], and
/// applies outbound/inbound address rewriting around the call.
#[async_trait]
pub trait CameraForward: Send + Sync {
    async fn forward(&self, service: &str, raw_body: &str) -> Result<(String, StatusCode), ProxyError>;
}

#[derive(Clone)]
pub struct HttpCameraForwarder {
    client: Client,
    catalog: ServiceCatalog,
    rewriter: AddressRewriter,
    username: String,
    password: String,
}

impl HttpCameraForwarder {
    pub fn new(
        catalog: ServiceCatalog,
        rewriter: AddressRewriter,
        username: String,
        password: String,
        timeout: Duration,
    ) -> anyhow::Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client, catalog, rewriter, username, password })
    }

    async fn post(&self, url: &str, body: &str, auth_header: Option<String>) -> Result<reqwest::Response, ProxyError> {
        let mut req = self
            .client
            .post(url)
            .header("Content-Type", "application/soap+xml; charset=utf-8")
            .header("User-Agent", USER_AGENT)
            .body(body.to_string());

        if let Some(auth) = auth_header {
            req = req.header("Authorization", auth);
        }

        req.send().await.map_err(|err| {
            if err.is_timeout() {
                ProxyError::Timeout
            } else if err.is_connect() {
                ProxyError::ConnectionError
            } else {
                ProxyError::Internal(err.to_string())
            }
        })
    }
}

#[async_trait]
impl CameraForward for HttpCameraForwarder {
    async fn forward(&self, service: &str, raw_body: &str) -> Result<(String, StatusCode), ProxyError> {
        let normalized = ServiceCatalog::normalize_service_name(service);
        let (url, known) = self.catalog.url_for(&normalized);
        if !known {
            warn!("forwarding to unrecognized ONVIF service '{normalized}', using generic URL pattern");
        }

        let outbound_body = self.rewriter.rewrite_request(raw_body);
        let path = reqwest::Url::parse(&url)
            .map(|u| u.path().to_string())
            .unwrap_or_else(|_| format!("/onvif/{normalized}"));

        debug!(service = %normalized, url = %url, "forwarding SOAP request to camera");

        let first = self.post(&url, &outbound_body, None).await?;

        let response = if first.status() == reqwest::StatusCode::UNAUTHORIZED {
            let challenge = first
                .headers()
                .get("www-authenticate")
                .and_then(|v| v.to_str().ok())
                .and_then(DigestChallenge::parse);

            match challenge {
                Some(challenge) => {
                    let auth = build_authorization_header(&challenge, &self.username, &self.password, "POST", &path);
                    self.post(&url, &outbound_body, Some(auth)).await?
                }
                None => first,
            }
        } else {
            first
        };

        let status = StatusCode::from_u16(response.status().as_u16()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let body = response
            .text()
            .await
            .map_err(|err| ProxyError::Internal(err.to_string()))?;

        let rewritten = self.rewriter.rewrite_response(&body);
        Ok((rewritten, status))
    }
}
