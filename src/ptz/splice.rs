use quick_xml::events::Event;
use quick_xml::name::QName;
use quick_xml::Reader;
use tracing::warn;

const FOV_URI: &str = "http://www.onvif.org/ver10/tptz/PanTiltSpaces/TranslationSpaceFov";

/// Inject a fake `RelativePanTiltTranslationSpace` advertising a field-of-view
/// translation range into a `GetConfigurationOptionsResponse`, so clients that
/// only know relative-move-by-FOV can still drive this camera class. Never
/// fails the call: any XML trouble just returns the camera's response
/// unchanged, with a warning logged.
pub fn splice_configuration_options(camera_response: &str) -> String {
    match try_splice(camera_response) {
        Ok(spliced) => spliced,
        Err(err) => {
            warn!("capability splicer failed, passing response through unmodified: {err:#}");
            camera_response.to_string()
        }
    }
}

/// Where (and whether) to splice in the synthesized translation space, found
/// by a single namespace-oblivious scan of the raw document. The rest of the
/// document — prefixes, `xmlns:*` declarations, attribute order, whitespace —
/// is never touched; only a single substring is inserted (or, for a
/// self-closing `<Spaces/>`, replaced), so a prefixed real-camera response
/// comes back exactly as it went in everywhere outside that one insertion.
enum SpliceSite {
    /// Already carries a `TranslationSpaceFov` entry; nothing to do.
    AlreadyPresent,
    /// No `Spaces` element found at all; nothing to do.
    NoSpacesElement,
    /// Insert the synthesized element's text at this byte offset (right
    /// after the last existing `RelativePanTiltTranslationSpace`, or right
    /// after `Spaces`'s own opening tag if none exist). `prefix` is the
    /// element-name prefix (if any) the surrounding document uses, reused so
    /// the synthesized element resolves into the same namespace.
    InsertAt { offset: usize, prefix: Option<String> },
    /// `Spaces` is a self-closing empty element with no children at all;
    /// replace the `start..end` span (the whole `<Spaces/>` tag) with an
    /// opened/closed version carrying the synthesized child.
    ReplaceEmptyTag { start: usize, end: usize, prefix: Option<String> },
}

fn try_splice(camera_response: &str) -> anyhow::Result<String> {
    let site = locate_splice_site(camera_response)?;
    Ok(match site {
        SpliceSite::AlreadyPresent | SpliceSite::NoSpacesElement => camera_response.to_string(),
        SpliceSite::InsertAt { offset, prefix } => {
            let mut out = String::with_capacity(camera_response.len() + 256);
            out.push_str(&camera_response[..offset]);
            push_synthetic_space(&mut out, prefix.as_deref());
            out.push_str(&camera_response[offset..]);
            out
        }
        SpliceSite::ReplaceEmptyTag { start, end, prefix } => {
            let raw_tag = &camera_response[start..end];
            let without_self_close = raw_tag
                .strip_suffix("/>")
                .ok_or_else(|| anyhow::anyhow!("expected self-closing tag"))?;
            let qualified = qualified_name_of(prefix.as_deref(), "Spaces");

            let mut out = String::with_capacity(camera_response.len() + 256);
            out.push_str(&camera_response[..start]);
            out.push_str(without_self_close);
            out.push('>');
            push_synthetic_space(&mut out, prefix.as_deref());
            out.push_str("</");
            out.push_str(&qualified);
            out.push('>');
            out.push_str(&camera_response[end..]);
            out
        }
    })
}

fn local_name_str(name: QName<'_>) -> String {
    String::from_utf8_lossy(name.local_name().as_ref()).into_owned()
}

fn prefix_str(name: QName<'_>) -> Option<String> {
    name.prefix().map(|p| String::from_utf8_lossy(p.as_ref()).into_owned())
}

/// Single forward pass over the raw document tracking element nesting by
/// depth (not by matching names — the input is assumed well-formed, as it
/// comes straight from the camera) to find the `Spaces` element, detect an
/// already-present FOV entry, and locate the byte offset to splice at.
fn locate_splice_site(camera_response: &str) -> anyhow::Result<SpliceSite> {
    let mut reader = Reader::from_str(camera_response);
    reader.config_mut().trim_text(false);

    let mut buf = Vec::new();
    let mut depth = 0usize;

    let mut spaces_depth: Option<usize> = None;
    let mut spaces_prefix: Option<String> = None;
    let mut spaces_open_tag_end: Option<usize> = None;

    let mut translation_depth: Option<usize> = None;
    let mut last_translation_end: Option<usize> = None;

    let mut reading_uri = false;
    let mut uri_text = String::new();
    let mut already_present = false;

    loop {
        let pos_before = reader.buffer_position() as usize;
        let event = reader.read_event_into(&mut buf)?;
        let pos_after = reader.buffer_position() as usize;

        match event {
            Event::Start(e) => {
                let name = e.name();
                let local = local_name_str(name);
                depth += 1;

                if local == "Spaces" && spaces_depth.is_none() {
                    spaces_depth = Some(depth);
                    spaces_prefix = prefix_str(name);
                    spaces_open_tag_end = Some(pos_after);
                } else if local == "RelativePanTiltTranslationSpace" && spaces_depth == Some(depth - 1) {
                    translation_depth = Some(depth);
                } else if local == "URI" && translation_depth == Some(depth - 1) {
                    reading_uri = true;
                    uri_text.clear();
                }
            }
            Event::Empty(e) => {
                let name = e.name();
                let local = local_name_str(name);
                // Self-closing elements don't change `depth`; they live one
                // level below whatever the current depth is.
                if local == "Spaces" && spaces_depth.is_none() {
                    return Ok(SpliceSite::ReplaceEmptyTag {
                        start: pos_before,
                        end: pos_after,
                        prefix: prefix_str(name),
                    });
                } else if local == "RelativePanTiltTranslationSpace" && spaces_depth == Some(depth) {
                    last_translation_end = Some(pos_after);
                }
            }
            Event::Text(t) => {
                if reading_uri {
                    uri_text.push_str(&t.unescape().unwrap_or_default());
                }
            }
            Event::End(e) => {
                let local = local_name_str(e.name());

                if local == "URI" && reading_uri && translation_depth == Some(depth - 1) {
                    reading_uri = false;
                    if uri_text.contains("TranslationSpaceFov") {
                        already_present = true;
                    }
                }
                if local == "RelativePanTiltTranslationSpace" && translation_depth == Some(depth) {
                    translation_depth = None;
                    if spaces_depth == Some(depth - 1) {
                        last_translation_end = Some(pos_after);
                    }
                }
                if local == "Spaces" && spaces_depth == Some(depth) {
                    // Finished scanning the Spaces element entirely; no need
                    // to look further for this purpose.
                    depth -= 1;
                    break;
                }

                depth -= 1;
            }
            Event::Eof => break,
            _ => {}
        }

        buf.clear();
    }

    if already_present {
        return Ok(SpliceSite::AlreadyPresent);
    }
    if spaces_depth.is_none() {
        return Ok(SpliceSite::NoSpacesElement);
    }

    let offset = last_translation_end
        .or(spaces_open_tag_end)
        .ok_or_else(|| anyhow::anyhow!("Spaces element had no determinable insertion point"))?;

    Ok(SpliceSite::InsertAt { offset, prefix: spaces_prefix })
}

fn qualified_name_of(prefix: Option<&str>, local: &str) -> String {
    match prefix {
        Some(p) => format!("{p}:{local}"),
        None => local.to_string(),
    }
}

fn push_synthetic_space(out: &mut String, prefix: Option<&str>) {
    let tag = |local: &str| qualified_name_of(prefix, local);
    out.push_str(&format!(
        "<{space}><{uri_tag}>{uri}</{uri_tag}><{xrange}><{min}>-1</{min}><{max}>1</{max}></{xrange}><{yrange}><{min}>-1</{min}><{max}>1</{max}></{yrange}></{space}>",
        space = tag("RelativePanTiltTranslationSpace"),
        uri_tag = tag("URI"),
        uri = FOV_URI,
        xrange = tag("XRange"),
        yrange = tag("YRange"),
        min = tag("Min"),
        max = tag("Max"),
    ));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_response(existing_spaces: &str) -> String {
        format!(
            r#"<GetConfigurationOptionsResponse xmlns="x"><PTZConfigurationOptions><Spaces>{existing_spaces}</Spaces></PTZConfigurationOptions></GetConfigurationOptionsResponse>"#
        )
    }

    #[test]
    fn injects_fov_space_when_absent() {
        let input = sample_response("");
        let spliced = splice_configuration_options(&input);
        assert!(spliced.contains("TranslationSpaceFov"));
        assert!(spliced.contains("RelativePanTiltTranslationSpace"));
    }

    #[test]
    fn is_idempotent() {
        let input = sample_response("");
        let once = splice_configuration_options(&input);
        let twice = splice_configuration_options(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn no_spaces_element_is_left_unchanged() {
        let input = r#"<GetConfigurationOptionsResponse><PTZConfigurationOptions/></GetConfigurationOptionsResponse>"#;
        assert_eq!(splice_configuration_options(input), input);
    }

    #[test]
    fn self_closing_spaces_element_gets_opened_and_spliced() {
        let input = r#"<GetConfigurationOptionsResponse xmlns="x"><PTZConfigurationOptions><Spaces/></PTZConfigurationOptions></GetConfigurationOptionsResponse>"#;
        let spliced = splice_configuration_options(input);
        assert!(spliced.contains("<Spaces><RelativePanTiltTranslationSpace>"));
        assert!(spliced.contains("TranslationSpaceFov"));
    }

    #[test]
    fn preserves_existing_translation_spaces() {
        let existing = r#"<RelativePanTiltTranslationSpace><URI>http://example.com/other</URI></RelativePanTiltTranslationSpace>"#;
        let input = sample_response(existing);
        let spliced = splice_configuration_options(&input);
        assert!(spliced.contains("http://example.com/other"));
        assert!(spliced.contains("TranslationSpaceFov"));
    }

    #[test]
    fn malformed_xml_passes_through_unchanged() {
        let input = "<not><xml";
        assert_eq!(splice_configuration_options(input), input);
    }

    /// The core regression this fix addresses: a real ONVIF response using a
    /// bound prefix and an `xmlns:tt` declaration must come back with every
    /// existing prefix and namespace declaration intact, and the synthesized
    /// element must itself use the same prefix so it resolves into the same
    /// namespace as its siblings.
    #[test]
    fn preserves_prefixes_and_namespace_declarations_on_prefixed_documents() {
        let input = r#"<soap:Envelope xmlns:soap="http://www.w3.org/2003/05/soap-envelope"><soap:Body><tptz:GetConfigurationOptionsResponse xmlns:tptz="http://www.onvif.org/ver20/ptz/wsdl" xmlns:tt="http://www.onvif.org/ver10/schema"><tptz:PTZConfigurationOptions><tt:Spaces><tt:RelativePanTiltTranslationSpace><tt:URI>http://www.onvif.org/ver10/tptz/PanTiltSpaces/TranslationGenericSpace</tt:URI></tt:RelativePanTiltTranslationSpace></tt:Spaces></tptz:PTZConfigurationOptions></tptz:GetConfigurationOptionsResponse></soap:Body></soap:Envelope>"#;

        let spliced = splice_configuration_options(input);

        assert!(spliced.contains(r#"xmlns:tt="http://www.onvif.org/ver10/schema""#));
        assert!(spliced.contains(r#"xmlns:tptz="http://www.onvif.org/ver20/ptz/wsdl""#));
        assert!(spliced.contains(r#"xmlns:soap="http://www.w3.org/2003/05/soap-envelope""#));
        assert!(!spliced.contains(r#" tt=""#));
        assert!(!spliced.contains(r#" tptz=""#));
        assert!(spliced.contains("TranslationGenericSpace"));
        assert!(spliced.contains("<tt:RelativePanTiltTranslationSpace><tt:URI>http://www.onvif.org/ver10/tptz/PanTiltSpaces/TranslationSpaceFov</tt:URI>"));

        // applying twice must not duplicate the FOV entry
        let twice = splice_configuration_options(&spliced);
        assert_eq!(spliced, twice);
    }

    #[test]
    fn synthesized_space_on_unprefixed_spaces_has_no_prefix() {
        let input = sample_response("");
        let spliced = splice_configuration_options(&input);
        assert!(spliced.contains("<RelativePanTiltTranslationSpace><URI>"));
        assert!(!spliced.contains(":RelativePanTiltTranslationSpace"));
    }
}
