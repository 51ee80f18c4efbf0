use thiserror::Error;

/// Errors surfaced at the HTTP/SOAP boundary. Internal plumbing (config
/// loading, XML tree construction) uses `anyhow::Result`; this is the typed
/// layer the Router converts into a SOAP 1.2 fault and status code.
#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("Malformed SOAP")]
    MalformedSoap,

    #[error("Request timeout")]
    Timeout,

    #[error("Connection error to camera")]
    ConnectionError,

    #[error("{0}")]
    Internal(String),
}

impl ProxyError {
    /// `SOAP-ENV:Reason/Text` for the fault this error produces.
    pub fn fault_reason(&self) -> String {
        self.to_string()
    }

    /// HTTP status accompanying the fault. Every classified failure in this
    /// proxy maps to 500 per the error taxonomy; kept as a method (rather
    /// than a constant) so a future variant can diverge without touching
    /// call sites.
    pub fn status_code(&self) -> axum::http::StatusCode {
        axum::http::StatusCode::INTERNAL_SERVER_ERROR
    }
}

impl From<anyhow::Error> for ProxyError {
    fn from(err: anyhow::Error) -> Self {
        ProxyError::Internal(err.to_string())
    }
}
