use anyhow::{Context, Result};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

/// A minimal, namespace-oblivious XML tree. Every node keeps only its
/// local name (the part after `:`) because ONVIF clients are inconsistent
/// about which prefixes they bind to which namespace — the interceptor
/// matches on local names throughout, per the SOAP Codec's extraction rules.
#[derive(Debug, Clone, Default)]
pub struct XmlNode {
    pub local_name: String,
    pub attrs: Vec<(String, String)>,
    pub children: Vec<XmlNode>,
    pub text: String,
}

impl XmlNode {
    fn from_start(e: &BytesStart) -> Result<Self> {
        let local_name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
        let mut attrs = Vec::new();
        for attr in e.attributes() {
            let attr = attr.context("malformed XML attribute")?;
            let key = String::from_utf8_lossy(attr.key.local_name().as_ref()).into_owned();
            let value = attr
                .decode_and_unescape_value(quick_xml::Decoder::default())
                .unwrap_or_default()
                .into_owned();
            attrs.push((key, value));
        }
        Ok(Self {
            local_name,
            attrs,
            children: Vec::new(),
            text: String::new(),
        })
    }

    /// Attribute value by local name, e.g. `x` or `space`.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn attr_f64(&self, name: &str, default: f64) -> f64 {
        self.attr(name).and_then(|v| v.parse().ok()).unwrap_or(default)
    }

    /// First direct child with the given local name.
    pub fn child(&self, name: &str) -> Option<&XmlNode> {
        self.children.iter().find(|c| c.local_name == name)
    }

    /// First descendant (depth-first, including children of children) with
    /// the given local name. Used for parameters ONVIF clients may nest at
    /// varying depth (e.g. `ProfileToken` directly in the body or wrapped).
    pub fn find(&self, name: &str) -> Option<&XmlNode> {
        if self.local_name == name {
            return Some(self);
        }
        for child in &self.children {
            if let Some(found) = child.find(name) {
                return Some(found);
            }
        }
        None
    }

    pub fn text_trimmed(&self) -> &str {
        self.text.trim()
    }
}

/// Parse a full XML document into a tree of [`XmlNode`]s rooted at the
/// document element (typically `Envelope`).
pub fn parse_xml_tree(xml: &str) -> Result<XmlNode> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<XmlNode> = Vec::new();
    let mut root: Option<XmlNode> = None;
    let mut buf = Vec::new();

    loop {
        match reader
            .read_event_into(&mut buf)
            .context("XML parsing error")?
        {
            Event::Start(e) => {
                stack.push(XmlNode::from_start(&e)?);
            }
            Event::Empty(e) => {
                let node = XmlNode::from_start(&e)?;
                attach(&mut stack, &mut root, node);
            }
            Event::End(_) => {
                let node = stack.pop().context("unbalanced XML: unmatched closing tag")?;
                attach(&mut stack, &mut root, node);
            }
            Event::Text(t) => {
                if let Some(top) = stack.last_mut() {
                    top.text.push_str(&t.unescape().unwrap_or_default());
                }
            }
            Event::CData(t) => {
                if let Some(top) = stack.last_mut() {
                    top.text.push_str(&String::from_utf8_lossy(&t.into_inner()));
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    root.context("empty XML document")
}

fn attach(stack: &mut Vec<XmlNode>, root: &mut Option<XmlNode>, node: XmlNode) {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(node);
    } else {
        *root = Some(node);
    }
}
