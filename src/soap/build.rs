use crate::ptz::tracker::{MoveAxisState, StatusSnapshot};

const SOAP_ENVELOPE_NS: &str = "http://www.w3.org/2003/05/soap-envelope";
const PTZ_WSDL_NS: &str = "http://www.onvif.org/ver20/ptz/wsdl";
const SCHEMA_NS: &str = "http://www.onvif.org/ver10/schema";

fn envelope(header_namespaces: &str, body: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<SOAP-ENV:Envelope xmlns:SOAP-ENV="{SOAP_ENVELOPE_NS}"{header_namespaces}>
    <SOAP-ENV:Body>
{body}
    </SOAP-ENV:Body>
</SOAP-ENV:Envelope>"#
    )
}

/// An empty `<op>Response/>` — the reply shape for every PTZ operation that
/// succeeds with no payload (`ContinuousMove`, `RelativeMove`,
/// `AbsoluteMove`, `Stop`).
pub fn build_simple_response(op: &str, ns_prefix: &str) -> String {
    let body = format!("        <{ns_prefix}:{op}Response/>");
    envelope(&format!(r#" xmlns:{ns_prefix}="{PTZ_WSDL_NS}""#), &body)
}

/// A SOAP 1.2 fault with `Code/Value = SOAP-ENV:Receiver`.
pub fn build_fault(code: &str, reason: &str, detail: Option<&str>) -> String {
    let detail_elem = detail
        .map(|d| format!("\n            <detail>{}</detail>", escape(d)))
        .unwrap_or_default();

    let body = format!(
        r#"        <SOAP-ENV:Fault>
            <SOAP-ENV:Code>
                <SOAP-ENV:Value>{code}</SOAP-ENV:Value>
            </SOAP-ENV:Code>
            <SOAP-ENV:Reason>
                <SOAP-ENV:Text xml:lang="en">{}</SOAP-ENV:Text>
            </SOAP-ENV:Reason>{detail_elem}
        </SOAP-ENV:Fault>"#,
        escape(reason)
    );

    envelope("", &body)
}

fn axis_state_str(state: MoveAxisState) -> &'static str {
    match state {
        MoveAxisState::Idle => "IDLE",
        MoveAxisState::Moving => "MOVING",
    }
}

/// `GetStatusResponse`: position with `PositionGenericSpace`, then
/// `MoveStatus/PanTilt`, `MoveStatus/Zoom`, then `UTCTime`, in that order.
pub fn build_status_response(snapshot: &StatusSnapshot) -> String {
    let utc_time = snapshot.utc_time.format("%Y-%m-%dT%H:%M:%S%.3f").to_string() + "Z";

    let body = format!(
        r#"        <tptz:GetStatusResponse>
            <tptz:PTZStatus>
                <tt:Position>
                    <tt:PanTilt x="{}" y="{}" space="http://www.onvif.org/ver10/tptz/PanTiltSpaces/PositionGenericSpace"/>
                    <tt:Zoom x="{}" space="http://www.onvif.org/ver10/tptz/ZoomSpaces/PositionGenericSpace"/>
                </tt:Position>
                <tt:MoveStatus>
                    <tt:PanTilt>{}</tt:PanTilt>
                    <tt:Zoom>{}</tt:Zoom>
                </tt:MoveStatus>
                <tt:UTCTime>{}</tt:UTCTime>
            </tptz:PTZStatus>
        </tptz:GetStatusResponse>"#,
        snapshot.position.pt_x,
        snapshot.position.pt_y,
        snapshot.position.zoom,
        axis_state_str(snapshot.pan_tilt),
        axis_state_str(snapshot.zoom),
        utc_time,
    );

    envelope(&format!(r#" xmlns:tptz="{PTZ_WSDL_NS}" xmlns:tt="{SCHEMA_NS}""#), &body)
}

/// `GetServiceCapabilitiesResponse` advertising `MoveStatus="true"` — the
/// capability the camera itself does not have.
pub fn build_service_capabilities_response() -> String {
    let body = r#"        <tptz:GetServiceCapabilitiesResponse>
            <tptz:Capabilities EFlip="false" Reverse="false" GetCompatibleConfigurations="true" MoveStatus="true"/>
        </tptz:GetServiceCapabilitiesResponse>"#;

    envelope(&format!(r#" xmlns:tptz="{PTZ_WSDL_NS}""#), body)
}

/// Build a `ContinuousMove` request the proxy sends to the camera on its
/// own behalf — to start a synthesized move, to issue the zero-velocity
/// follow-up that ends a `RelativeMove`/`Stop` simulation, or to relay a
/// client's own `ContinuousMove` unchanged in shape.
pub fn build_continuous_move_request(
    profile_token: &str,
    pt: Option<(f64, f64)>,
    zoom: Option<f64>,
    timeout_secs: Option<f64>,
) -> String {
    let pan_tilt_elem = pt
        .map(|(x, y)| format!(r#"<tt:PanTilt x="{x}" y="{y}" space="http://www.onvif.org/ver10/tptz/PanTiltSpaces/VelocityGenericSpace"/>"#))
        .unwrap_or_default();
    let zoom_elem = zoom
        .map(|x| format!(r#"<tt:Zoom x="{x}" space="http://www.onvif.org/ver10/tptz/ZoomSpaces/VelocityGenericSpace"/>"#))
        .unwrap_or_default();
    let timeout_elem = timeout_secs
        .map(|secs| format!("<tptz:Timeout>PT{secs}S</tptz:Timeout>"))
        .unwrap_or_default();

    let body = format!(
        r#"        <tptz:ContinuousMove>
            <tptz:ProfileToken>{profile_token}</tptz:ProfileToken>
            <tptz:Velocity>
                {pan_tilt_elem}
                {zoom_elem}
            </tptz:Velocity>{timeout_elem}
        </tptz:ContinuousMove>"#
    );

    envelope(&format!(r#" xmlns:tptz="{PTZ_WSDL_NS}" xmlns:tt="{SCHEMA_NS}""#), &body)
}

fn escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ptz::tracker::EstimatedPosition;
    use chrono::Utc;

    #[test]
    fn simple_response_round_trips_through_parser() {
        let xml = build_simple_response("Stop", "tptz");
        let parsed = crate::soap::parse::parse(&xml).unwrap();
        assert_eq!(parsed.operation.as_deref(), Some("StopResponse"));
    }

    #[test]
    fn fault_carries_receiver_code_and_reason() {
        let xml = build_fault("SOAP-ENV:Receiver", "Request timeout", None);
        assert!(xml.contains("SOAP-ENV:Receiver"));
        assert!(xml.contains("Request timeout"));
    }

    #[test]
    fn status_response_orders_position_then_movestatus_then_time() {
        let snapshot = StatusSnapshot {
            pan_tilt: MoveAxisState::Moving,
            zoom: MoveAxisState::Idle,
            position: EstimatedPosition { pt_x: 0.25, pt_y: -0.5, zoom: 0.1 },
            utc_time: Utc::now(),
        };
        let xml = build_status_response(&snapshot);
        let pos_idx = xml.find("<tt:Position>").unwrap();
        let move_idx = xml.find("<tt:MoveStatus>").unwrap();
        let time_idx = xml.find("<tt:UTCTime>").unwrap();
        assert!(pos_idx < move_idx && move_idx < time_idx);
        assert!(xml.contains(r#"x="0.25""#));
        assert!(xml.contains("MOVING"));
    }

    #[test]
    fn service_capabilities_advertise_move_status() {
        let xml = build_service_capabilities_response();
        assert!(xml.contains(r#"MoveStatus="true""#));
    }

    #[test]
    fn continuous_move_request_carries_velocity_and_timeout() {
        let xml = build_continuous_move_request("PROFILE_000", Some((0.5, -0.5)), Some(0.0), Some(2.5));
        assert!(xml.contains(r#"x="0.5""#));
        assert!(xml.contains(r#"x="-0.5""#) || xml.contains(r#"y="-0.5""#));
        assert!(xml.contains("PT2.5S"));
        assert!(xml.contains("PROFILE_000"));
    }

    #[test]
    fn continuous_move_request_omits_absent_axes() {
        let xml = build_continuous_move_request("PROFILE_000", None, Some(0.2), None);
        assert!(!xml.contains("PanTilt"));
        assert!(xml.contains("Zoom"));
        assert!(!xml.contains("Timeout"));
    }
}
