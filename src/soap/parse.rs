use super::dom::{parse_xml_tree, XmlNode};
use crate::error::ProxyError;

/// Velocity/translation/position for one or both PTZ axes, as extracted
/// from a `Velocity`, `Translation`, or `Position` container element.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Vector {
    pub pan_tilt: Option<PanTiltComponent>,
    pub zoom: Option<ZoomComponent>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PanTiltComponent {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZoomComponent {
    pub x: f64,
}

impl Vector {
    pub fn is_zero(&self) -> bool {
        let pt_zero = self.pan_tilt.map(|pt| pt.x == 0.0 && pt.y == 0.0).unwrap_or(true);
        let zoom_zero = self.zoom.map(|z| z.x == 0.0).unwrap_or(true);
        pt_zero && zoom_zero
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StopFlags {
    pub pan_tilt: bool,
    pub zoom: bool,
}

impl Default for StopFlags {
    fn default() -> Self {
        // ONVIF semantics: an absent Stop flag means "stop this axis".
        Self { pan_tilt: true, zoom: true }
    }
}

/// A parsed SOAP request: the operation's local name (the first element
/// child of Body) and the full document tree for parameter extraction.
pub struct SoapRequest {
    pub operation: Option<String>,
    pub root: XmlNode,
}

/// Parse a SOAP 1.1 or 1.2 envelope. The envelope namespace itself is not
/// validated — only the `Body`/first-child structure matters, so that
/// differing client namespace bindings don't affect dispatch.
pub fn parse(envelope_bytes: &str) -> Result<SoapRequest, ProxyError> {
    let root = parse_xml_tree(envelope_bytes).map_err(|_| ProxyError::MalformedSoap)?;

    let body = root.find("Body");
    let operation = body
        .and_then(|b| b.children.first())
        .map(|op| op.local_name.clone());

    Ok(SoapRequest { operation, root })
}

pub fn extract_profile_token(root: &XmlNode) -> Option<String> {
    root.find("ProfileToken").map(|n| n.text_trimmed().to_string())
}

/// Descend into the named container (`Velocity`, `Translation`, or
/// `Position`) and extract its `PanTilt`/`Zoom` children, if present.
pub fn extract_vector(root: &XmlNode, container_name: &str) -> Vector {
    let Some(container) = root.find(container_name) else {
        return Vector::default();
    };

    let pan_tilt = container.child("PanTilt").map(|pt| PanTiltComponent {
        x: pt.attr_f64("x", 0.0),
        y: pt.attr_f64("y", 0.0),
    });

    let zoom = container.child("Zoom").map(|z| ZoomComponent {
        x: z.attr_f64("x", 0.0),
    });

    Vector { pan_tilt, zoom }
}

/// Parse an ISO-8601 duration of the restricted form `PT<seconds>S`
/// (optionally fractional), as ONVIF uses for `Timeout`. Anything else,
/// including an absent element, yields `None`.
pub fn extract_duration(root: &XmlNode) -> Option<f64> {
    let text = root.find("Timeout")?.text_trimmed();
    parse_pt_seconds(text)
}

fn parse_pt_seconds(text: &str) -> Option<f64> {
    let rest = text.strip_prefix("PT")?;
    let seconds = rest.strip_suffix('S')?;
    seconds.parse::<f64>().ok()
}

pub fn extract_stop_flags(root: &XmlNode) -> StopFlags {
    let defaults = StopFlags::default();
    let pan_tilt = root
        .find("PanTilt")
        .map(|n| n.text_trimmed().eq_ignore_ascii_case("true"))
        .unwrap_or(defaults.pan_tilt);
    let zoom = root
        .find("Zoom")
        .map(|n| n.text_trimmed().eq_ignore_ascii_case("true"))
        .unwrap_or(defaults.zoom);
    StopFlags { pan_tilt, zoom }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn envelope(body_inner: &str) -> String {
        format!(
            r#"<SOAP-ENV:Envelope xmlns:SOAP-ENV="http://www.w3.org/2003/05/soap-envelope">
  <SOAP-ENV:Body>{body_inner}</SOAP-ENV:Body>
</SOAP-ENV:Envelope>"#
        )
    }

    #[test]
    fn extracts_operation_name_from_first_body_child() {
        let xml = envelope(r#"<tptz:Stop xmlns:tptz="x"><tptz:ProfileToken>p1</tptz:ProfileToken></tptz:Stop>"#);
        let parsed = parse(&xml).unwrap();
        assert_eq!(parsed.operation.as_deref(), Some("Stop"));
    }

    #[test]
    fn missing_body_yields_none_operation() {
        let xml = r#"<SOAP-ENV:Envelope xmlns:SOAP-ENV="http://www.w3.org/2003/05/soap-envelope"/>"#;
        let parsed = parse(xml).unwrap();
        assert_eq!(parsed.operation, None);
    }

    #[test]
    fn malformed_xml_is_malformed_soap_error() {
        let err = parse("<not><xml").unwrap_err();
        assert!(matches!(err, ProxyError::MalformedSoap));
    }

    #[test]
    fn extracts_velocity_vector_with_defaults() {
        let xml = envelope(
            r#"<tptz:ContinuousMove xmlns:tptz="x"><tptz:Velocity>
                <tt:PanTilt xmlns:tt="y" x="0.3" y="-0.5"/>
                <tt:Zoom xmlns:tt="y" x="0.1"/>
               </tptz:Velocity></tptz:ContinuousMove>"#,
        );
        let parsed = parse(&xml).unwrap();
        let v = extract_vector(&parsed.root, "Velocity");
        assert_eq!(v.pan_tilt, Some(PanTiltComponent { x: 0.3, y: -0.5 }));
        assert_eq!(v.zoom, Some(ZoomComponent { x: 0.1 }));
    }

    #[test]
    fn extract_vector_defaults_missing_attrs_to_zero() {
        let xml = envelope(r#"<x><Velocity><PanTilt/></Velocity></x>"#);
        let parsed = parse(&xml).unwrap();
        let v = extract_vector(&parsed.root, "Velocity");
        assert_eq!(v.pan_tilt, Some(PanTiltComponent { x: 0.0, y: 0.0 }));
        assert_eq!(v.zoom, None);
    }

    #[test]
    fn extract_duration_parses_pt_seconds() {
        let xml = envelope(r#"<x><Timeout>PT2.5S</Timeout></x>"#);
        let parsed = parse(&xml).unwrap();
        assert_eq!(extract_duration(&parsed.root), Some(2.5));
    }

    #[test]
    fn extract_duration_none_when_absent_or_unrecognized() {
        let xml = envelope(r#"<x></x>"#);
        let parsed = parse(&xml).unwrap();
        assert_eq!(extract_duration(&parsed.root), None);

        let xml2 = envelope(r#"<x><Timeout>P1D</Timeout></x>"#);
        let parsed2 = parse(&xml2).unwrap();
        assert_eq!(extract_duration(&parsed2.root), None);
    }

    #[test]
    fn extract_stop_flags_default_true_when_absent() {
        let xml = envelope(r#"<tptz:Stop xmlns:tptz="x"><tptz:ProfileToken>p1</tptz:ProfileToken></tptz:Stop>"#);
        let parsed = parse(&xml).unwrap();
        let flags = extract_stop_flags(&parsed.root);
        assert!(flags.pan_tilt);
        assert!(flags.zoom);
    }

    #[test]
    fn extract_stop_flags_respects_explicit_false() {
        let xml = envelope(r#"<tptz:Stop xmlns:tptz="x"><tptz:PanTilt>false</tptz:PanTilt><tptz:Zoom>true</tptz:Zoom></tptz:Stop>"#);
        let parsed = parse(&xml).unwrap();
        let flags = extract_stop_flags(&parsed.root);
        assert!(!flags.pan_tilt);
        assert!(flags.zoom);
    }

    #[test]
    fn extract_profile_token_finds_anywhere() {
        let xml = envelope(r#"<a><b><tptz:ProfileToken xmlns:tptz="x">PROFILE_000</tptz:ProfileToken></b></a>"#);
        let parsed = parse(&xml).unwrap();
        assert_eq!(extract_profile_token(&parsed.root).as_deref(), Some("PROFILE_000"));
    }
}
