//! DescribeLayer (WMS) and DescribeFeatureType (WFS) discovery.

use quick_xml::events::Event;
use quick_xml::Reader;
use serde::Deserialize;
use wms_common::{WfsColumn, WmsError, WmsResult};

use crate::capabilities::xml_error;

/// Query parameters of a WMS DescribeLayer request for `layer`.
pub fn describe_layer_params(layer: &str) -> Vec<(&'static str, String)> {
    vec![
        ("SERVICE", "WMS".to_string()),
        ("REQUEST", "DescribeLayer".to_string()),
        ("SLD_VERSION", "1.1.0".to_string()),
        ("LAYERS", layer.to_string()),
        ("VERSION", "1.1.1".to_string()),
        ("height", "1".to_string()),
        ("width", "1".to_string()),
    ]
}

/// Query parameters of a WFS DescribeFeatureType request for `layer`.
pub fn describe_feature_type_params(layer: &str) -> Vec<(&'static str, String)> {
    vec![
        ("version", "2.0.0".to_string()),
        ("request", "DescribeFeatureType".to_string()),
        ("service", "WFS".to_string()),
        ("typeName", layer.to_string()),
        ("outputFormat", "application/json".to_string()),
    ]
}

/// The `wfs` attribute of the first `LayerDescription`, if any.
pub fn parse_describe_layer(xml: &str) -> WmsResult<Option<String>> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) | Ok(Event::Empty(e))
                if e.local_name().as_ref() == b"LayerDescription" =>
            {
                for attr in e.attributes() {
                    let attr = attr.map_err(xml_error)?;
                    if attr.key.local_name().as_ref() == b"wfs" {
                        let value = attr.unescape_value().map_err(xml_error)?;
                        if !value.trim().is_empty() {
                            return Ok(Some(value.trim().to_string()));
                        }
                    }
                }
                // Only the first description is consulted
                return Ok(None);
            }
            Ok(Event::Eof) => return Ok(None),
            Err(e) => {
                return Err(WmsError::XmlError(format!(
                    "DescribeLayer parse error at position {}: {}",
                    reader.buffer_position(),
                    e
                )))
            }
            _ => {}
        }
        buf.clear();
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct FeatureTypeResponse {
    #[serde(default)]
    feature_types: Vec<FeatureType>,
}

#[derive(Deserialize)]
struct FeatureType {
    #[serde(default)]
    properties: Vec<WfsColumn>,
}

/// Columns of the first feature type in a JSON DescribeFeatureType response.
pub fn parse_feature_type(json: &str) -> WmsResult<Vec<WfsColumn>> {
    let response: FeatureTypeResponse = serde_json::from_str(json)?;
    response
        .feature_types
        .into_iter()
        .next()
        .map(|ft| ft.properties)
        .ok_or_else(|| WmsError::NoDataFound("DescribeFeatureType returned no feature types".into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_utils::fixtures::{
        DESCRIBE_FEATURE_TYPE_JSON, DESCRIBE_LAYER_NO_WFS_XML, DESCRIBE_LAYER_XML,
    };

    #[test]
    fn test_describe_layer_wfs() {
        assert_eq!(
            parse_describe_layer(DESCRIBE_LAYER_XML).unwrap().as_deref(),
            Some("https://example.org/wfs?")
        );
        assert_eq!(parse_describe_layer(DESCRIBE_LAYER_NO_WFS_XML).unwrap(), None);
        assert_eq!(parse_describe_layer("<Empty/>").unwrap(), None);
    }

    #[test]
    fn test_feature_type_columns() {
        let columns = parse_feature_type(DESCRIBE_FEATURE_TYPE_JSON).unwrap();
        assert_eq!(columns.len(), 3);
        assert_eq!(columns[0].name, "the_geom");
        assert_eq!(columns[0].local_type, "Point");
        assert!(columns[0].is_geometry());
        assert!(columns[2].is_time());
        assert!(columns[1].nillable);
    }

    #[test]
    fn test_feature_type_empty() {
        assert!(matches!(
            parse_feature_type(r#"{"featureTypes": []}"#),
            Err(WmsError::NoDataFound(_))
        ));
        assert!(parse_feature_type("not json").is_err());
    }

    #[test]
    fn test_params() {
        let params = describe_layer_params("mineplant");
        assert!(params.contains(&("LAYERS", "mineplant".to_string())));
        let params = describe_feature_type_params("mineplant");
        assert!(params.contains(&("typeName", "mineplant".to_string())));
        assert!(params.contains(&("outputFormat", "application/json".to_string())));
    }
}
