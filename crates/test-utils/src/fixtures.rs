//! Canned OGC responses and host filter builders.

use serde_json::{json, Value};

/// WMS 1.3.0 capabilities with one group layer holding two named leaf layers.
pub const CAPABILITIES_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<WMS_Capabilities version="1.3.0" xmlns="http://www.opengis.net/wms" xmlns:xlink="http://www.w3.org/1999/xlink">
  <Service>
    <Name>WMS</Name>
    <Title>Active Mines</Title>
    <Abstract>Mineral operations</Abstract>
  </Service>
  <Capability>
    <Request>
      <GetMap><Format>image/png</Format></GetMap>
    </Request>
    <Layer>
      <Title>Root</Title>
      <Layer queryable="1">
        <Name>mineplant</Name>
        <Title>Mine plants</Title>
      </Layer>
      <Layer queryable="1">
        <Name>smelter</Name>
      </Layer>
    </Layer>
  </Capability>
</WMS_Capabilities>"#;

/// Capabilities whose service title is empty.
pub const CAPABILITIES_UNTITLED_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<WMS_Capabilities version="1.3.0" xmlns="http://www.opengis.net/wms">
  <Service><Name>WMS</Name><Title></Title></Service>
  <Capability>
    <Layer><Name>roads</Name><Title>Roads</Title></Layer>
  </Capability>
</WMS_Capabilities>"#;

/// DescribeLayer response naming a separate WFS endpoint.
pub const DESCRIBE_LAYER_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<WMS_DescribeLayerResponse version="1.1.1">
  <LayerDescription name="mineplant" wfs="https://example.org/wfs?" owsURL="https://example.org/wfs?" owsType="WFS">
    <Query typeName="mineplant"/>
  </LayerDescription>
</WMS_DescribeLayerResponse>"#;

/// DescribeLayer response without a WFS attribute.
pub const DESCRIBE_LAYER_NO_WFS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<WMS_DescribeLayerResponse version="1.1.1">
  <LayerDescription name="mineplant"/>
</WMS_DescribeLayerResponse>"#;

/// WFS 2.0.0 DescribeFeatureType in GeoServer's JSON output format.
pub const DESCRIBE_FEATURE_TYPE_JSON: &str = r#"{
  "elementFormDefault": "qualified",
  "targetNamespace": "http://example.org/mines",
  "targetPrefix": "mines",
  "featureTypes": [{
    "typeName": "mineplant",
    "properties": [
      {"name": "the_geom", "maxOccurs": 1, "minOccurs": 0, "nillable": true, "type": "gml:Point", "localType": "Point"},
      {"name": "site_name", "maxOccurs": 1, "minOccurs": 0, "nillable": true, "type": "xsd:string", "localType": "string"},
      {"name": "obs_time", "maxOccurs": 1, "minOccurs": 0, "nillable": true, "type": "xsd:dateTime", "localType": "dateTime"}
    ]
  }]
}"#;

/// GeoServer plain-text GetFeatureInfo output with two features.
pub const FEATURE_INFO_TEXT: &str = "Results for FeatureType 'mineplant':
--------------------------------------------
the_geom = [GEOMETRY (Point) with 1 points]
site_name = Eagle Mine
commodity = 'Nickel'
--------------------------------------------
the_geom = [GEOMETRY (Point) with 1 points]
site_name = Red Dog
commodity = Zinc
--------------------------------------------
";

/// The closed unit square polygon as GeoJSON.
pub fn unit_square() -> Value {
    json!({
        "type": "Polygon",
        "coordinates": [[[0, 0], [1, 0], [1, 1], [0, 1], [0, 0]]]
    })
}

/// A host filter with a single `geo_shape` predicate on `column`.
pub fn geo_shape_filter(column: &str, relation: &str, shape: Value, negate: bool) -> Value {
    json!({
        "meta": {"key": column, "type": "spatial_filter", "negate": negate, "disabled": false},
        "query": {"bool": {"must": [
            {"exists": {"field": column}},
            {"geo_shape": {column: {"shape": shape, "relation": relation}}}
        ]}}
    })
}

/// A host filter with a `geo_distance` predicate around a bare point.
pub fn geo_distance_point_filter(column: &str, point: [f64; 2], distance: &str) -> Value {
    json!({
        "meta": {"key": column, "type": "spatial_filter", "negate": false, "disabled": false},
        "query": {"bool": {"must": [
            {"geo_distance": {"distance": distance, column: point}}
        ]}}
    })
}

/// A phrase filter on an attribute column.
pub fn phrase_filter(column: &str, value: &str) -> Value {
    json!({
        "meta": {"key": column, "type": "phrase", "negate": false, "disabled": false},
        "query": {"match_phrase": {column: value}}
    })
}
