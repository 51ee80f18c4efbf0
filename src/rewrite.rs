/// Bidirectional string substitution of host:port pairs between the proxy's
/// externally visible identity and the camera's real address. Deliberately
/// XML-parser-free on this hot path — see the "Rewrite collisions" open
/// question in SPEC_FULL.md: a payload that happens to contain the camera
/// host literal for non-URL reasons will be corrupted. Accepted tradeoff.
#[derive(Debug, Clone)]
pub struct AddressRewriter {
    external_host: String,
    external_port: u16,
    camera_host: String,
    camera_port: u16,
}

impl AddressRewriter {
    pub fn new(external_host: String, external_port: u16, camera_host: String, camera_port: u16) -> Self {
        Self {
            external_host,
            external_port,
            camera_host,
            camera_port,
        }
    }

    /// Outbound: substitute the proxy's identity for the camera's, covering
    /// addresses the client may have learned from a prior rewritten
    /// response and echoed back in a later request.
    pub fn rewrite_request(&self, body: &str) -> String {
        let mut result = body.replace(&self.external_host, &self.camera_host);
        result = result.replace(
            &format!(":{}/", self.external_port),
            &format!(":{}/", self.camera_port),
        );
        result = result.replace(
            &format!(":{}<", self.external_port),
            &format!(":{}<", self.camera_port),
        );
        result
    }

    /// Inbound: the inverse substitution, applied to whatever the camera
    /// sent back.
    pub fn rewrite_response(&self, body: &str) -> String {
        let mut result = body.replace(&self.camera_host, &self.external_host);
        result = result.replace(
            &format!(":{}/", self.camera_port),
            &format!(":{}/", self.external_port),
        );
        result = result.replace(
            &format!(":{}<", self.camera_port),
            &format!(":{}<", self.external_port),
        );
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rewriter() -> AddressRewriter {
        AddressRewriter::new("127.0.0.1".into(), 8000, "192.168.1.10".into(), 8000)
    }

    #[test]
    fn response_rewrite_removes_all_camera_references() {
        let r = rewriter();
        let camera_body = r#"<XAddr>http://192.168.1.10:8000/onvif/device_service</XAddr>"#;
        let rewritten = r.rewrite_response(camera_body);
        assert!(!rewritten.contains("192.168.1.10"));
        assert!(rewritten.contains("http://127.0.0.1:8000/onvif/device_service"));
    }

    #[test]
    fn request_rewrite_leaves_camera_only_payload_unchanged() {
        let r = rewriter();
        let camera_only = r#"<XAddr>http://192.168.1.10:8000/onvif/device_service</XAddr>"#;
        assert_eq!(r.rewrite_request(camera_only), camera_only);
    }

    #[test]
    fn round_trip_through_request_then_response_is_idempotent_on_proxy_only_payload() {
        let r = rewriter();
        let proxy_only = r#"<Address>http://127.0.0.1:8000/onvif/ptz/subscription/1</Address>"#;
        let via_camera = r.rewrite_request(proxy_only);
        let back = r.rewrite_response(&via_camera);
        assert_eq!(back, proxy_only);
    }

    #[test]
    fn port_only_forms_with_angle_bracket_terminator_are_rewritten() {
        let r = rewriter();
        let body = "<Port>8000</Port>"; // no leading colon, should not match
        assert_eq!(r.rewrite_response(body), body);

        let body2 = "tag:8000<end>";
        let rewritten = r.rewrite_response(body2);
        assert!(rewritten.contains(":8000<")); // camera_port == external_port here, no-op by construction
    }
}
