/// Static mapping from a normalized ONVIF service name to the camera's URL
/// for that service. Covers the five services every ONVIF device exposes;
/// anything else falls back to the generic `<service>_service` pattern.
#[derive(Debug, Clone)]
pub struct ServiceCatalog {
    base_url: String,
}

const KNOWN_SERVICES: &[&str] = &["device_service", "media_service", "ptz_service", "imaging_service", "events_service"];

impl ServiceCatalog {
    pub fn new(camera_base_url: String) -> Self {
        Self { base_url: camera_base_url }
    }

    /// Normalize a client-supplied service path segment: strip a trailing
    /// `s`, append `_service` if missing, and map known ONVIF shorthand
    /// (`ptz` -> `ptz_service`, `event` -> `events_service`).
    pub fn normalize_service_name(raw: &str) -> String {
        let mut name = raw.to_string();
        if let Some(stripped) = name.strip_suffix('s') {
            if !stripped.ends_with("_service") {
                name = stripped.to_string();
            }
        }
        if name == "event" {
            name = "events".to_string();
        }
        if !name.ends_with("_service") {
            name = format!("{name}_service");
        }
        name
    }

    /// Resolve a normalized service name to its camera URL. Unknown names
    /// still resolve, via the generic pattern, with a caller-visible warning
    /// expected upstream.
    pub fn url_for(&self, normalized_service: &str) -> (String, bool) {
        let known = KNOWN_SERVICES.contains(&normalized_service);
        (format!("{}/onvif/{normalized_service}", self.base_url), known)
    }
}
