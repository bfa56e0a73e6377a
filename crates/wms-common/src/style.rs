//! Client-side style model for WMS layers.
//!
//! A style is an ordered list of rules, each with an optional attribute
//! filter, an optional scale range and a list of symbolizers. It is stored
//! in the layer descriptor as the style editor writes it (GeoStyler JSON)
//! and serialized to SLD when tiles are requested. Keys the model does not
//! know are kept in `extra` maps so a saved style reloads unchanged.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{WmsError, WmsResult};

/// A named style made of rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Style {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default)]
    pub rules: Vec<StyleRule>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Style {
    /// Parse a style from JSON.
    pub fn from_json(json: &str) -> WmsResult<Self> {
        let style: Style = serde_json::from_str(json)?;
        style.validate()?;
        Ok(style)
    }

    /// Check colors and numeric ranges of every symbolizer.
    pub fn validate(&self) -> WmsResult<()> {
        for rule in &self.rules {
            if let Some(scale) = &rule.scale_denominator {
                if let (Some(min), Some(max)) = (scale.min, scale.max) {
                    if min > max {
                        return Err(invalid(&rule.name, "scale min exceeds max"));
                    }
                }
            }
            for symbolizer in &rule.symbolizers {
                for color in symbolizer.colors() {
                    if !is_hex_color(color) {
                        return Err(invalid(&rule.name, &format!("bad color '{}'", color)));
                    }
                }
                if symbolizer
                    .opacities()
                    .into_iter()
                    .any(|opacity| !(0.0..=1.0).contains(&opacity))
                {
                    return Err(invalid(&rule.name, "opacity must be within 0..1"));
                }
            }
        }
        Ok(())
    }
}

fn invalid(rule: &str, message: &str) -> WmsError {
    WmsError::InvalidParameter {
        param: format!("style rule '{}'", rule),
        message: message.to_string(),
    }
}

fn is_hex_color(s: &str) -> bool {
    s.len() == 7 && s.starts_with('#') && s[1..].chars().all(|c| c.is_ascii_hexdigit())
}

/// One rule of a style.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StyleRule {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<StyleFilter>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale_denominator: Option<ScaleDenominator>,
    #[serde(default)]
    pub symbolizers: Vec<Symbolizer>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScaleDenominator {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
}

/// Attribute filter selecting the features a rule applies to.
///
/// Stored in the editor's array form: `["==", "status", "open"]` for a
/// comparison, `["&&", f1, f2, ...]` and `["||", f1, f2, ...]` for
/// combinations and `["!", f]` for a negation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Value", into = "Value")]
pub enum StyleFilter {
    Comparison {
        operator: ComparisonOperator,
        property: String,
        value: Value,
    },
    And(Vec<StyleFilter>),
    Or(Vec<StyleFilter>),
    Not(Box<StyleFilter>),
}

impl TryFrom<Value> for StyleFilter {
    type Error = String;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        let items = match value {
            Value::Array(items) => items,
            other => return Err(format!("expected a filter array, found {}", other)),
        };
        let mut items = items.into_iter();
        let symbol = match items.next() {
            Some(Value::String(symbol)) => symbol,
            Some(other) => return Err(format!("filter operator must be a string, found {}", other)),
            None => return Err("empty filter array".to_string()),
        };
        let operands: Vec<Value> = items.collect();

        match symbol.as_str() {
            "&&" | "||" => {
                let filters = operands
                    .into_iter()
                    .map(StyleFilter::try_from)
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(if symbol == "&&" {
                    StyleFilter::And(filters)
                } else {
                    StyleFilter::Or(filters)
                })
            }
            "!" => {
                let [inner]: [Value; 1] = operands
                    .try_into()
                    .map_err(|_| "negation takes exactly one filter".to_string())?;
                Ok(StyleFilter::Not(Box::new(StyleFilter::try_from(inner)?)))
            }
            _ => {
                let operator = ComparisonOperator::from_symbol(&symbol)
                    .ok_or_else(|| format!("unknown filter operator '{}'", symbol))?;
                match <[Value; 2]>::try_from(operands) {
                    Ok([Value::String(property), value]) => Ok(StyleFilter::Comparison {
                        operator,
                        property,
                        value,
                    }),
                    _ => Err(format!(
                        "comparison '{}' takes a property name and a value",
                        symbol
                    )),
                }
            }
        }
    }
}

impl From<StyleFilter> for Value {
    fn from(filter: StyleFilter) -> Self {
        fn combination(symbol: &str, filters: Vec<StyleFilter>) -> Value {
            std::iter::once(Value::from(symbol))
                .chain(filters.into_iter().map(Value::from))
                .collect()
        }

        match filter {
            StyleFilter::Comparison {
                operator,
                property,
                value,
            } => Value::Array(vec![operator.symbol().into(), property.into(), value]),
            StyleFilter::And(filters) => combination("&&", filters),
            StyleFilter::Or(filters) => combination("||", filters),
            StyleFilter::Not(inner) => Value::Array(vec!["!".into(), Value::from(*inner)]),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparisonOperator {
    Equal,
    NotEqual,
    Less,
    LessOrEqual,
    Greater,
    GreaterOrEqual,
    Like,
}

impl ComparisonOperator {
    pub fn symbol(self) -> &'static str {
        match self {
            ComparisonOperator::Equal => "==",
            ComparisonOperator::NotEqual => "!=",
            ComparisonOperator::Less => "<",
            ComparisonOperator::LessOrEqual => "<=",
            ComparisonOperator::Greater => ">",
            ComparisonOperator::GreaterOrEqual => ">=",
            ComparisonOperator::Like => "*=",
        }
    }

    pub fn from_symbol(symbol: &str) -> Option<Self> {
        match symbol {
            "==" => Some(ComparisonOperator::Equal),
            "!=" => Some(ComparisonOperator::NotEqual),
            "<" => Some(ComparisonOperator::Less),
            "<=" => Some(ComparisonOperator::LessOrEqual),
            ">" => Some(ComparisonOperator::Greater),
            ">=" => Some(ComparisonOperator::GreaterOrEqual),
            "*=" => Some(ComparisonOperator::Like),
            _ => None,
        }
    }
}

/// How matching features are drawn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum Symbolizer {
    Fill(FillSymbolizer),
    Line(LineSymbolizer),
    Mark(MarkSymbolizer),
    Text(TextSymbolizer),
    /// Kept as written; not rendered into SLD.
    Icon(Map<String, Value>),
    /// Kept as written; not rendered into SLD.
    Raster(Map<String, Value>),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FillSymbolizer {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opacity: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fill_opacity: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outline_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outline_opacity: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outline_width: Option<f64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl FillSymbolizer {
    /// `fillOpacity` wins over the symbolizer-wide `opacity`.
    pub fn effective_fill_opacity(&self) -> Option<f64> {
        self.fill_opacity.or(self.opacity)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineSymbolizer {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opacity: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dasharray: Option<Vec<f64>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkSymbolizer {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub well_known_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opacity: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub radius: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stroke_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stroke_opacity: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stroke_width: Option<f64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextSymbolizer {
    /// Label template; `{{column}}` is replaced by the feature's value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opacity: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub halo_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub halo_opacity: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub halo_width: Option<f64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Symbolizer {
    fn colors(&self) -> Vec<&str> {
        let colors = match self {
            Symbolizer::Fill(s) => vec![&s.color, &s.outline_color],
            Symbolizer::Line(s) => vec![&s.color],
            Symbolizer::Mark(s) => vec![&s.color, &s.stroke_color],
            Symbolizer::Text(s) => vec![&s.color, &s.halo_color],
            Symbolizer::Icon(_) | Symbolizer::Raster(_) => vec![],
        };
        colors.into_iter().filter_map(|c| c.as_deref()).collect()
    }

    fn opacities(&self) -> Vec<f64> {
        let opacities = match self {
            Symbolizer::Fill(s) => vec![s.opacity, s.fill_opacity, s.outline_opacity],
            Symbolizer::Line(s) => vec![s.opacity],
            Symbolizer::Mark(s) => vec![s.opacity, s.stroke_opacity],
            Symbolizer::Text(s) => vec![s.opacity, s.halo_opacity],
            Symbolizer::Icon(_) | Symbolizer::Raster(_) => vec![],
        };
        opacities.into_iter().flatten().collect()
    }
}
