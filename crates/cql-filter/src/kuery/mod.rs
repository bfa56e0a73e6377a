//! Free-text query expressions and their translation to CQL.
//!
//! The expression tree mirrors the host's query language: function nodes
//! (`is`, `and`, `or`, `not`, `range`, `exists`) over literal and wildcard
//! leaves. [`parse`] builds a tree from query text and [`to_cql`] renders
//! it as a CQL boolean expression.

mod parser;

pub use parser::parse;

use serde_json::Value;
use wms_common::{WmsError, WmsResult};

/// Marker the expression parser puts in place of `*` inside wildcard values.
pub const WILDCARD_SYMBOL: &str = "@kuery-wildcard@";

/// A node of a parsed free-text query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryExpressionNode {
    Function {
        name: String,
        arguments: Vec<QueryExpressionNode>,
    },
    Literal(String),
    Wildcard(String),
}

impl QueryExpressionNode {
    pub fn function(name: &str, arguments: Vec<QueryExpressionNode>) -> Self {
        QueryExpressionNode::Function {
            name: name.to_string(),
            arguments,
        }
    }

    pub fn literal(value: impl Into<String>) -> Self {
        QueryExpressionNode::Literal(value.into())
    }

    pub fn wildcard(value: impl Into<String>) -> Self {
        QueryExpressionNode::Wildcard(value.into())
    }

    /// Decode the host's JSON form of an expression tree, e.g.
    /// `{"type": "function", "function": "is", "arguments": [...]}`.
    pub fn from_value(value: &Value) -> WmsResult<Self> {
        let node_type = value.get("type").and_then(Value::as_str).unwrap_or("");
        match node_type {
            "function" => {
                let name = value
                    .get("function")
                    .and_then(Value::as_str)
                    .ok_or_else(|| unsupported("function node without a name"))?;
                let arguments = value
                    .get("arguments")
                    .and_then(Value::as_array)
                    .map(|args| args.iter().map(Self::from_value).collect())
                    .unwrap_or_else(|| Ok(Vec::new()))?;
                Ok(Self::function(name, arguments))
            }
            "literal" => Ok(Self::literal(scalar_text(value.get("value")))),
            "wildcard" => Ok(Self::wildcard(scalar_text(value.get("value")))),
            other => Err(unsupported(&format!("node type '{}'", other))),
        }
    }
}

fn scalar_text(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
        None => String::new(),
    }
}

fn unsupported(what: &str) -> WmsError {
    WmsError::UnsupportedExpressionNode(what.to_string())
}

/// Translate an expression tree into a CQL boolean expression.
pub fn to_cql(node: &QueryExpressionNode) -> WmsResult<String> {
    match node {
        QueryExpressionNode::Literal(value) => Ok(value.clone()),
        QueryExpressionNode::Wildcard(value) => Ok(format!(
            " LIKE '{}'",
            value.split(WILDCARD_SYMBOL).collect::<Vec<_>>().join("%")
        )),
        QueryExpressionNode::Function { name, arguments } => match name.as_str() {
            "and" => junction(arguments, " AND "),
            "or" => junction(arguments, " OR "),
            "not" => match arguments.as_slice() {
                [inner] => Ok(format!("NOT ({})", to_cql(inner)?)),
                _ => Err(arity("not", 1, arguments.len())),
            },
            "is" => match arguments.as_slice() {
                [field, value] => {
                    // The wildcard branch already emits " LIKE '...'"
                    let operator = match value {
                        QueryExpressionNode::Wildcard(_) => "",
                        _ => "=",
                    };
                    Ok(format!("{}{}{}", to_cql(field)?, operator, quoted(value)?))
                }
                _ => Err(arity("is", 2, arguments.len())),
            },
            "range" => match arguments.as_slice() {
                [field, operator, value] => {
                    let sign = range_sign(operator)?;
                    Ok(format!("{} {} {}", field_name(field)?, sign, quoted(value)?))
                }
                _ => Err(arity("range", 3, arguments.len())),
            },
            "exists" => match arguments.first() {
                Some(field) => Ok(format!("{} IS NOT NULL", field_name(field)?)),
                None => Err(arity("exists", 1, 0)),
            },
            other => Err(unsupported(&format!("function '{}'", other))),
        },
    }
}

fn junction(children: &[QueryExpressionNode], separator: &str) -> WmsResult<String> {
    let parts = children.iter().map(to_cql).collect::<WmsResult<Vec<_>>>()?;
    Ok(format!("({})", parts.join(separator)))
}

fn quoted(value: &QueryExpressionNode) -> WmsResult<String> {
    let text = to_cql(value)?;
    Ok(match value {
        QueryExpressionNode::Literal(_) => format!("'{}'", text),
        _ => text,
    })
}

fn field_name(node: &QueryExpressionNode) -> WmsResult<&str> {
    match node {
        QueryExpressionNode::Literal(name) | QueryExpressionNode::Wildcard(name) => Ok(name),
        QueryExpressionNode::Function { name, .. } => {
            Err(unsupported(&format!("function '{}' used as a field", name)))
        }
    }
}

fn range_sign(operator: &QueryExpressionNode) -> WmsResult<&'static str> {
    let token = match operator {
        QueryExpressionNode::Literal(token) => token.as_str(),
        _ => return Err(unsupported("range operator must be a literal")),
    };
    match token {
        "gt" => Ok(">"),
        "lt" => Ok("<"),
        "gte" => Ok(">="),
        "lte" => Ok("<="),
        other => Err(unsupported(&format!("range operator '{}'", other))),
    }
}

fn arity(function: &str, expected: usize, got: usize) -> WmsError {
    unsupported(&format!(
        "'{}' expects {} argument(s), got {}",
        function, expected, got
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    type Node = QueryExpressionNode;

    fn is(field: &str, value: Node) -> Node {
        Node::function("is", vec![Node::literal(field), value])
    }

    #[test]
    fn test_is_literal() {
        assert_eq!(to_cql(&is("status", Node::literal("open"))).unwrap(), "status='open'");
    }

    #[test]
    fn test_is_wildcard() {
        let node = is("name", Node::wildcard(format!("mil{}", WILDCARD_SYMBOL)));
        assert_eq!(to_cql(&node).unwrap(), "name LIKE 'mil%'");
    }

    #[test]
    fn test_range() {
        let node = Node::function(
            "range",
            vec![Node::literal("age"), Node::literal("gte"), Node::literal("21")],
        );
        assert_eq!(to_cql(&node).unwrap(), "age >= '21'");
    }

    #[test]
    fn test_boolean_nesting() {
        let node = Node::function(
            "or",
            vec![
                is("a", Node::literal("1")),
                Node::function(
                    "and",
                    vec![
                        is("b", Node::literal("2")),
                        Node::function("not", vec![is("c", Node::literal("3"))]),
                    ],
                ),
            ],
        );
        assert_eq!(
            to_cql(&node).unwrap(),
            "(a='1' OR (b='2' AND NOT (c='3')))"
        );
    }

    #[test]
    fn test_empty_junction() {
        assert_eq!(to_cql(&Node::function("and", vec![])).unwrap(), "()");
    }

    #[test]
    fn test_exists() {
        let node = Node::function("exists", vec![Node::literal("site_name")]);
        assert_eq!(to_cql(&node).unwrap(), "site_name IS NOT NULL");
    }

    #[test]
    fn test_unknown_function_rejected() {
        let node = Node::function("nested", vec![Node::literal("a")]);
        assert!(matches!(
            to_cql(&node),
            Err(WmsError::UnsupportedExpressionNode(_))
        ));
    }

    #[test]
    fn test_bad_arity_rejected() {
        let node = Node::function("is", vec![Node::literal("a")]);
        assert!(to_cql(&node).is_err());
        let node = Node::function(
            "range",
            vec![Node::literal("a"), Node::literal("between"), Node::literal("1")],
        );
        assert!(to_cql(&node).is_err());
    }

    #[test]
    fn test_from_value() {
        let value = json!({
            "type": "function",
            "function": "range",
            "arguments": [
                {"type": "literal", "value": "depth"},
                {"type": "literal", "value": "lt"},
                {"type": "literal", "value": 300}
            ]
        });
        let node = Node::from_value(&value).unwrap();
        assert_eq!(to_cql(&node).unwrap(), "depth < '300'");

        let bad = json!({"type": "namedArg", "name": "x"});
        assert!(matches!(
            Node::from_value(&bad),
            Err(WmsError::UnsupportedExpressionNode(_))
        ));
    }
}
