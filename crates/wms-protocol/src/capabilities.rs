//! WMS GetCapabilities discovery.

use quick_xml::events::Event;
use quick_xml::Reader;
use serde::{Deserialize, Serialize};
use tracing::debug;
use wms_common::{WmsError, WmsResult};

/// Version sent with capabilities requests. Servers negotiate down to the
/// highest version they support.
pub const CAPABILITIES_VERSION: &str = "1.3.1";

/// A named, displayable layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerInfo {
    pub name: String,
    /// Human-readable title; falls back to the name.
    pub title: String,
}

/// What a capabilities document says about a service.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServiceCapabilities {
    pub title: Option<String>,
    /// Leaf layers in document order.
    pub layers: Vec<LayerInfo>,
}

impl ServiceCapabilities {
    /// Service title, or `fallback` when the document has none.
    pub fn title_or<'a>(&'a self, fallback: &'a str) -> &'a str {
        self.title.as_deref().unwrap_or(fallback)
    }
}

/// Query parameters of a GetCapabilities request.
pub fn capabilities_params() -> Vec<(&'static str, String)> {
    vec![
        ("version", CAPABILITIES_VERSION.to_string()),
        ("request", "GetCapabilities".to_string()),
        ("service", "WMS".to_string()),
    ]
}

#[derive(Default)]
struct LayerFrame {
    name: Option<String>,
    title: Option<String>,
    has_child_layer: bool,
}

/// Parse a capabilities document.
///
/// Only leaf `Layer` elements (no nested `Layer`) with a `Name` are listed;
/// group layers are containers and cannot be requested on their own.
pub fn parse_capabilities(xml: &str) -> WmsResult<ServiceCapabilities> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut buf = Vec::new();
    let mut path: Vec<Vec<u8>> = Vec::new();
    let mut frames: Vec<LayerFrame> = Vec::new();
    let mut caps = ServiceCapabilities::default();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                let name = e.local_name().as_ref().to_vec();
                if name == b"Layer" {
                    if let Some(parent) = frames.last_mut() {
                        parent.has_child_layer = true;
                    }
                    frames.push(LayerFrame::default());
                }
                path.push(name);
            }
            Ok(Event::Text(t)) => {
                let text = t.unescape().map_err(xml_error)?;
                let text = text.trim();
                match path.as_slice() {
                    _ if text.is_empty() => {}
                    [.., parent, leaf] if parent == b"Service" && leaf == b"Title" => {
                        caps.title = Some(text.to_string());
                    }
                    [.., parent, leaf] if parent == b"Layer" && leaf == b"Name" => {
                        if let Some(frame) = frames.last_mut() {
                            frame.name = Some(text.to_string());
                        }
                    }
                    [.., parent, leaf] if parent == b"Layer" && leaf == b"Title" => {
                        if let Some(frame) = frames.last_mut() {
                            frame.title = Some(text.to_string());
                        }
                    }
                    _ => {}
                }
            }
            Ok(Event::End(e)) => {
                if e.local_name().as_ref() == b"Layer" {
                    if let Some(frame) = frames.pop() {
                        if let (false, Some(name)) = (frame.has_child_layer, frame.name) {
                            let title = frame.title.unwrap_or_else(|| name.clone());
                            caps.layers.push(LayerInfo { name, title });
                        }
                    }
                }
                path.pop();
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(WmsError::XmlError(format!(
                    "capabilities parse error at position {}: {}",
                    reader.buffer_position(),
                    e
                )))
            }
            _ => {}
        }
        buf.clear();
    }

    debug!(
        title = caps.title.as_deref().unwrap_or(""),
        layers = caps.layers.len(),
        "Parsed capabilities"
    );
    Ok(caps)
}

pub(crate) fn xml_error(e: impl std::fmt::Display) -> WmsError {
    WmsError::XmlError(e.to_string())
}
