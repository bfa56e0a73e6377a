//! SLD 1.0 serialization of client-side styles.
//!
//! The style travels in the `sld_body` parameter of each tile request, so
//! the output is compact (no indentation).

use std::io::Cursor;

use quick_xml::events::{BytesDecl, BytesText, Event};
use quick_xml::Writer;
use serde_json::Value;
use tracing::debug;
use wms_common::style::{ComparisonOperator, StyleFilter};
use wms_common::{Style, StyleRule, Symbolizer, WmsError, WmsResult};

type XmlResult = quick_xml::Result<()>;
type SldWriter = Writer<Cursor<Vec<u8>>>;

const SLD_NS: &str = "http://www.opengis.net/sld";
const OGC_NS: &str = "http://www.opengis.net/ogc";
const XLINK_NS: &str = "http://www.w3.org/1999/xlink";

/// Serialize `style` as an SLD document targeting `layer`.
pub fn write_sld(layer: &str, style: &Style) -> WmsResult<String> {
    let mut writer = Writer::new(Cursor::new(Vec::new()));
    write_document(&mut writer, layer, style).map_err(xml_error)?;
    String::from_utf8(writer.into_inner().into_inner()).map_err(xml_error)
}

fn xml_error(e: impl std::fmt::Display) -> WmsError {
    WmsError::XmlError(format!("SLD serialization failed: {}", e))
}

fn write_document(w: &mut SldWriter, layer: &str, style: &Style) -> XmlResult {
    w.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    w.create_element("StyledLayerDescriptor")
        .with_attributes([
            ("version", "1.0.0"),
            ("xmlns", SLD_NS),
            ("xmlns:ogc", OGC_NS),
            ("xmlns:xlink", XLINK_NS),
        ])
        .write_inner_content(|w| {
            w.create_element("NamedLayer").write_inner_content(|w| {
                text_element(w, "Name", layer)?;
                w.create_element("UserStyle").write_inner_content(|w| {
                    text_element(w, "Name", &style.name)?;
                    text_element(w, "Title", &style.name)?;
                    w.create_element("FeatureTypeStyle")
                        .write_inner_content(|w| {
                            for rule in &style.rules {
                                write_rule(w, rule)?;
                            }
                            Ok::<(), quick_xml::Error>(())
                        })?;
                    Ok::<(), quick_xml::Error>(())
                })?;
                Ok::<(), quick_xml::Error>(())
            })?;
            Ok::<(), quick_xml::Error>(())
        })?;
    Ok(())
}

fn text_element(w: &mut SldWriter, name: &str, text: &str) -> XmlResult {
    w.create_element(name)
        .write_text_content(BytesText::new(text))?;
    Ok(())
}

fn css_parameter(w: &mut SldWriter, name: &str, value: &str) -> XmlResult {
    w.create_element("CssParameter")
        .with_attribute(("name", name))
        .write_text_content(BytesText::new(value))?;
    Ok(())
}

fn write_rule(w: &mut SldWriter, rule: &StyleRule) -> XmlResult {
    w.create_element("Rule").write_inner_content(|w| {
        text_element(w, "Name", &rule.name)?;
        if let Some(filter) = &rule.filter {
            w.create_element("ogc:Filter")
                .write_inner_content(|w| write_filter(w, filter))?;
        }
        if let Some(scale) = &rule.scale_denominator {
            if let Some(min) = scale.min {
                text_element(w, "MinScaleDenominator", &min.to_string())?;
            }
            if let Some(max) = scale.max {
                text_element(w, "MaxScaleDenominator", &max.to_string())?;
            }
        }
        for symbolizer in &rule.symbolizers {
            write_symbolizer(w, symbolizer)?;
        }
        Ok::<(), quick_xml::Error>(())
    })?;
    Ok(())
}

fn comparison_element(operator: ComparisonOperator) -> &'static str {
    match operator {
        ComparisonOperator::Equal => "ogc:PropertyIsEqualTo",
        ComparisonOperator::NotEqual => "ogc:PropertyIsNotEqualTo",
        ComparisonOperator::Less => "ogc:PropertyIsLessThan",
        ComparisonOperator::LessOrEqual => "ogc:PropertyIsLessThanOrEqualTo",
        ComparisonOperator::Greater => "ogc:PropertyIsGreaterThan",
        ComparisonOperator::GreaterOrEqual => "ogc:PropertyIsGreaterThanOrEqualTo",
        ComparisonOperator::Like => "ogc:PropertyIsLike",
    }
}

fn literal_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn write_filter(w: &mut SldWriter, filter: &StyleFilter) -> XmlResult {
    match filter {
        StyleFilter::Comparison {
            operator,
            property,
            value,
        } => {
            let mut element = w.create_element(comparison_element(*operator));
            if *operator == ComparisonOperator::Like {
                element = element.with_attributes([
                    ("wildCard", "*"),
                    ("singleChar", "."),
                    ("escape", "!"),
                ]);
            }
            element.write_inner_content(|w| {
                text_element(w, "ogc:PropertyName", property)?;
                text_element(w, "ogc:Literal", &literal_text(value))
            })?;
        }
        StyleFilter::And(filters) => {
            w.create_element("ogc:And").write_inner_content(|w| {
                filters.iter().try_for_each(|f| write_filter(w, f))
            })?;
        }
        StyleFilter::Or(filters) => {
            w.create_element("ogc:Or").write_inner_content(|w| {
                filters.iter().try_for_each(|f| write_filter(w, f))
            })?;
        }
        StyleFilter::Not(filter) => {
            w.create_element("ogc:Not")
                .write_inner_content(|w| write_filter(w, filter))?;
        }
    }
    Ok(())
}

fn optional_parameter(w: &mut SldWriter, name: &str, value: Option<f64>) -> XmlResult {
    match value {
        Some(value) => css_parameter(w, name, &value.to_string()),
        None => Ok(()),
    }
}

fn write_stroke(
    w: &mut SldWriter,
    color: &str,
    width: Option<f64>,
    opacity: Option<f64>,
) -> XmlResult {
    w.create_element("Stroke").write_inner_content(|w| {
        css_parameter(w, "stroke", color)?;
        optional_parameter(w, "stroke-width", width)?;
        optional_parameter(w, "stroke-opacity", opacity)
    })?;
    Ok(())
}

fn write_fill(w: &mut SldWriter, color: Option<&str>, opacity: Option<f64>) -> XmlResult {
    if color.is_none() && opacity.is_none() {
        return Ok(());
    }
    w.create_element("Fill").write_inner_content(|w| {
        if let Some(color) = color {
            css_parameter(w, "fill", color)?;
        }
        optional_parameter(w, "fill-opacity", opacity)
    })?;
    Ok(())
}

/// Write a label template, turning `{{column}}` into property references.
/// A label without placeholders names the column directly.
fn write_label(w: &mut SldWriter, label: &str) -> XmlResult {
    w.create_element("Label").write_inner_content(|w| {
        if !label.contains("{{") {
            return text_element(w, "ogc:PropertyName", label);
        }
        let mut rest = label;
        while let Some(start) = rest.find("{{") {
            let Some(len) = rest[start..].find("}}") else {
                break;
            };
            if start > 0 {
                w.write_event(Event::Text(BytesText::new(&rest[..start])))?;
            }
            text_element(w, "ogc:PropertyName", rest[start + 2..start + len].trim())?;
            rest = &rest[start + len + 2..];
        }
        if !rest.is_empty() {
            w.write_event(Event::Text(BytesText::new(rest)))?;
        }
        Ok(())
    })?;
    Ok(())
}

fn write_symbolizer(w: &mut SldWriter, symbolizer: &Symbolizer) -> XmlResult {
    match symbolizer {
        Symbolizer::Fill(fill) => {
            w.create_element("PolygonSymbolizer")
                .write_inner_content(|w| {
                    write_fill(w, fill.color.as_deref(), fill.effective_fill_opacity())?;
                    if let Some(outline) = &fill.outline_color {
                        write_stroke(w, outline, fill.outline_width, fill.outline_opacity)?;
                    }
                    Ok::<(), quick_xml::Error>(())
                })?;
        }
        Symbolizer::Line(line) => {
            w.create_element("LineSymbolizer").write_inner_content(|w| {
                w.create_element("Stroke").write_inner_content(|w| {
                    if let Some(color) = &line.color {
                        css_parameter(w, "stroke", color)?;
                    }
                    optional_parameter(w, "stroke-width", line.width)?;
                    optional_parameter(w, "stroke-opacity", line.opacity)?;
                    if let Some(dashes) = &line.dasharray {
                        let dashes: Vec<String> = dashes.iter().map(f64::to_string).collect();
                        css_parameter(w, "stroke-dasharray", &dashes.join(" "))?;
                    }
                    Ok::<(), quick_xml::Error>(())
                })?;
                Ok::<(), quick_xml::Error>(())
            })?;
        }
        Symbolizer::Mark(mark) => {
            w.create_element("PointSymbolizer").write_inner_content(|w| {
                w.create_element("Graphic").write_inner_content(|w| {
                    w.create_element("Mark").write_inner_content(|w| {
                        if let Some(name) = &mark.well_known_name {
                            text_element(w, "WellKnownName", name)?;
                        }
                        write_fill(w, mark.color.as_deref(), mark.opacity)?;
                        if let Some(stroke) = &mark.stroke_color {
                            write_stroke(w, stroke, mark.stroke_width, mark.stroke_opacity)?;
                        }
                        Ok::<(), quick_xml::Error>(())
                    })?;
                    // SLD sizes marks by diameter
                    match mark.radius {
                        Some(radius) => text_element(w, "Size", &(radius * 2.0).to_string()),
                        None => Ok(()),
                    }
                })?;
                Ok::<(), quick_xml::Error>(())
            })?;
        }
        Symbolizer::Text(text) => {
            w.create_element("TextSymbolizer").write_inner_content(|w| {
                if let Some(label) = &text.label {
                    write_label(w, label)?;
                }
                if text.font.is_some() || text.size.is_some() {
                    w.create_element("Font").write_inner_content(|w| {
                        if let Some(font) = &text.font {
                            css_parameter(w, "font-family", &font.join(","))?;
                        }
                        optional_parameter(w, "font-size", text.size)
                    })?;
                }
                if let Some(halo) = &text.halo_color {
                    w.create_element("Halo").write_inner_content(|w| {
                        if let Some(width) = text.halo_width {
                            text_element(w, "Radius", &width.to_string())?;
                        }
                        write_fill(w, Some(halo.as_str()), text.halo_opacity)
                    })?;
                }
                write_fill(w, text.color.as_deref(), text.opacity)
            })?;
        }
        Symbolizer::Icon(_) | Symbolizer::Raster(_) => {
            debug!("Skipping symbolizer without an SLD rendition");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn style(rules: serde_json::Value) -> Style {
        serde_json::from_value(json!({"name": "mines", "rules": rules})).unwrap()
    }

    #[test]
    fn test_document_skeleton() {
        let sld = write_sld("mineplant", &style(json!([]))).unwrap();
        assert!(sld.starts_with(r#"<?xml version="1.0" encoding="UTF-8"?>"#));
        assert!(sld.contains(r#"<StyledLayerDescriptor version="1.0.0" xmlns="http://www.opengis.net/sld""#));
        assert!(sld.contains("<NamedLayer><Name>mineplant</Name><UserStyle><Name>mines</Name>"));
        assert!(sld.ends_with("</StyledLayerDescriptor>"));
    }

    #[test]
    fn test_fill_rule_with_filter_and_scale() {
        let sld = write_sld(
            "mineplant",
            &style(json!([{
                "name": "open pits",
                "filter": ["==", "status", "open"],
                "scaleDenominator": {"min": 1000, "max": 50000},
                "symbolizers": [{"kind": "Fill", "color": "#ff0000", "opacity": 0.5}]
            }])),
        )
        .unwrap();
        assert!(sld.contains(
            "<ogc:Filter><ogc:PropertyIsEqualTo><ogc:PropertyName>status</ogc:PropertyName>\
             <ogc:Literal>open</ogc:Literal></ogc:PropertyIsEqualTo></ogc:Filter>"
        ));
        assert!(sld.contains("<MinScaleDenominator>1000</MinScaleDenominator>"));
        assert!(sld.contains(
            r##"<PolygonSymbolizer><Fill><CssParameter name="fill">#ff0000</CssParameter><CssParameter name="fill-opacity">0.5</CssParameter></Fill></PolygonSymbolizer>"##
        ));
    }

    #[test]
    fn test_nested_logical_filter() {
        let sld = write_sld(
            "a",
            &style(json!([{
                "name": "r",
                "filter": ["!", ["||",
                    [">", "depth", 10],
                    ["*=", "name", "Mil*"]
                ]],
                "symbolizers": []
            }])),
        )
        .unwrap();
        assert!(sld.contains("<ogc:Not><ogc:Or><ogc:PropertyIsGreaterThan>"));
        assert!(sld.contains("<ogc:Literal>10</ogc:Literal>"));
        assert!(sld.contains(r#"<ogc:PropertyIsLike wildCard="*" singleChar="." escape="!">"#));
    }

    #[test]
    fn test_mark_and_text_symbolizers() {
        let sld = write_sld(
            "a",
            &style(json!([{
                "name": "points",
                "symbolizers": [
                    {"kind": "Mark", "wellKnownName": "circle", "color": "#00ff00", "radius": 4},
                    {"kind": "Text", "label": "site_name", "color": "#000000", "size": 12}
                ]
            }])),
        )
        .unwrap();
        assert!(sld.contains("<WellKnownName>circle</WellKnownName>"));
        assert!(sld.contains("<Size>8</Size>"));
        assert!(sld.contains("<Label><ogc:PropertyName>site_name</ogc:PropertyName></Label>"));
        assert!(sld.contains(r#"<CssParameter name="font-size">12</CssParameter>"#));
    }

    #[test]
    fn test_editor_fill_opacities() {
        let sld = write_sld(
            "a",
            &style(json!([{
                "name": "gold",
                "filter": ["==", "commodity", "Gold"],
                "symbolizers": [{
                    "kind": "Fill", "color": "#ff0000", "opacity": 0.9, "fillOpacity": 0.4,
                    "outlineColor": "#000000", "outlineOpacity": 0.5, "outlineWidth": 2
                }]
            }])),
        )
        .unwrap();
        assert!(sld.contains("<ogc:PropertyName>commodity</ogc:PropertyName><ogc:Literal>Gold</ogc:Literal>"));
        assert!(sld.contains(r#"<CssParameter name="fill-opacity">0.4</CssParameter>"#));
        assert!(sld.contains(
            r##"<Stroke><CssParameter name="stroke">#000000</CssParameter><CssParameter name="stroke-width">2</CssParameter><CssParameter name="stroke-opacity">0.5</CssParameter></Stroke>"##
        ));
    }

    #[test]
    fn test_label_template_and_halo() {
        let sld = write_sld(
            "a",
            &style(json!([{
                "name": "labels",
                "symbolizers": [
                    {"kind": "Text", "label": "Site {{ site_name }}", "color": "#FFFFFF",
                     "haloColor": "#000000", "haloOpacity": 1},
                    {"kind": "Icon", "image": "pin.png"}
                ]
            }])),
        )
        .unwrap();
        assert!(sld.contains("<Label>Site <ogc:PropertyName>site_name</ogc:PropertyName></Label>"));
        assert!(sld.contains(
            r##"<Halo><Fill><CssParameter name="fill">#000000</CssParameter><CssParameter name="fill-opacity">1</CssParameter></Fill></Halo>"##
        ));
        assert!(!sld.contains("<Font>"));
        assert!(!sld.contains("pin.png"));
    }

    #[test]
    fn test_text_is_escaped() {
        let sld = write_sld("a&b", &style(json!([]))).unwrap();
        assert!(sld.contains("<Name>a&amp;b</Name>"));
    }
}
