//! Query text to expression tree.
//!
//! ```text
//! query      := or_expr
//! or_expr    := and_expr ("or" and_expr)*
//! and_expr   := not_expr ("and" not_expr)*
//! not_expr   := "not" not_expr | "(" or_expr ")" | field_expr
//! field_expr := field (":" value_expr | range_op term)
//! value_expr := "(" value_or ")" | term
//! ```
//!
//! Keywords are case-insensitive. Unquoted terms containing `*` become
//! wildcards, and a bare `*` value becomes an `exists` check.

use nom::{
    branch::alt,
    bytes::complete::{escaped_transform, is_not, tag, tag_no_case, take_while1},
    character::complete::{char, multispace0, multispace1},
    combinator::{all_consuming, map, opt, peek, value},
    multi::many0,
    sequence::{delimited, pair, preceded, separated_pair, terminated},
    IResult,
};
use wms_common::{WmsError, WmsResult};

use super::{QueryExpressionNode as Node, WILDCARD_SYMBOL};

/// Parse a free-text query. Blank input yields `None`.
pub fn parse(text: &str) -> WmsResult<Option<Node>> {
    if text.trim().is_empty() {
        return Ok(None);
    }
    all_consuming(delimited(multispace0, or_expr, multispace0))(text)
        .map(|(_, node)| Some(node))
        .map_err(|e| WmsError::QueryParse(format!("'{}': {}", text, e)))
}

enum Term {
    Quoted(String),
    Unquoted(String),
}

impl Term {
    fn into_node(self) -> Node {
        match self {
            Term::Quoted(text) => Node::literal(text),
            Term::Unquoted(text) if text.contains('*') => {
                Node::wildcard(text.replace('*', WILDCARD_SYMBOL))
            }
            Term::Unquoted(text) => Node::literal(text),
        }
    }

    fn into_text(self) -> String {
        match self {
            Term::Quoted(text) | Term::Unquoted(text) => text,
        }
    }
}

/// Boolean structure over the values of a single field, e.g. `a:(x or y)`.
enum ValueExpr {
    Or(Vec<ValueExpr>),
    And(Vec<ValueExpr>),
    Not(Box<ValueExpr>),
    Term(Term),
}

impl ValueExpr {
    fn expand(self, field: &str) -> Node {
        match self {
            ValueExpr::Or(items) => Node::function("or", expand_all(items, field)),
            ValueExpr::And(items) => Node::function("and", expand_all(items, field)),
            ValueExpr::Not(inner) => Node::function("not", vec![inner.expand(field)]),
            ValueExpr::Term(Term::Unquoted(text)) if text == "*" => {
                Node::function("exists", vec![Node::literal(field)])
            }
            ValueExpr::Term(term) => {
                Node::function("is", vec![Node::literal(field), term.into_node()])
            }
        }
    }
}

fn expand_all(items: Vec<ValueExpr>, field: &str) -> Vec<Node> {
    items.into_iter().map(|item| item.expand(field)).collect()
}

fn keyword<'a>(word: &'static str) -> impl FnMut(&'a str) -> IResult<&'a str, &'a str> {
    terminated(tag_no_case(word), peek(alt((multispace1, tag("(")))))
}

fn joined<T>(first: T, rest: Vec<T>, wrap: impl FnOnce(Vec<T>) -> T) -> T {
    if rest.is_empty() {
        first
    } else {
        let mut items = Vec::with_capacity(rest.len() + 1);
        items.push(first);
        items.extend(rest);
        wrap(items)
    }
}

fn or_expr(input: &str) -> IResult<&str, Node> {
    let (input, first) = and_expr(input)?;
    let (input, rest) = many0(preceded(
        delimited(multispace0, keyword("or"), multispace0),
        and_expr,
    ))(input)?;
    Ok((input, joined(first, rest, |items| Node::function("or", items))))
}

fn and_expr(input: &str) -> IResult<&str, Node> {
    let (input, first) = not_expr(input)?;
    let (input, rest) = many0(preceded(
        delimited(multispace0, keyword("and"), multispace0),
        not_expr,
    ))(input)?;
    Ok((input, joined(first, rest, |items| Node::function("and", items))))
}

fn not_expr(input: &str) -> IResult<&str, Node> {
    alt((
        map(
            preceded(pair(keyword("not"), multispace0), not_expr),
            |inner| Node::function("not", vec![inner]),
        ),
        delimited(
            pair(char('('), multispace0),
            or_expr,
            pair(multispace0, char(')')),
        ),
        field_expr,
    ))(input)
}

fn field_expr(input: &str) -> IResult<&str, Node> {
    let (input, name) = field(input)?;
    let (input, _) = multispace0(input)?;
    alt((
        map(
            separated_pair(range_op, multispace0, term),
            move |(op, value)| {
                Node::function(
                    "range",
                    vec![
                        Node::literal(name),
                        Node::literal(op),
                        Node::literal(value.into_text()),
                    ],
                )
            },
        ),
        map(
            preceded(pair(char(':'), multispace0), value_expr),
            move |expr| expr.expand(name),
        ),
    ))(input)
}

fn field(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| c.is_alphanumeric() || "_.-@".contains(c))(input)
}

fn range_op(input: &str) -> IResult<&str, &'static str> {
    alt((
        value("lte", tag("<=")),
        value("gte", tag(">=")),
        value("lt", tag("<")),
        value("gt", tag(">")),
    ))(input)
}

fn value_expr(input: &str) -> IResult<&str, ValueExpr> {
    alt((
        delimited(
            pair(char('('), multispace0),
            value_or,
            pair(multispace0, char(')')),
        ),
        map(term, ValueExpr::Term),
    ))(input)
}

fn value_or(input: &str) -> IResult<&str, ValueExpr> {
    let (input, first) = value_and(input)?;
    let (input, rest) = many0(preceded(
        delimited(multispace0, keyword("or"), multispace0),
        value_and,
    ))(input)?;
    Ok((input, joined(first, rest, ValueExpr::Or)))
}

fn value_and(input: &str) -> IResult<&str, ValueExpr> {
    let (input, first) = value_not(input)?;
    let (input, rest) = many0(preceded(
        delimited(multispace0, keyword("and"), multispace0),
        value_not,
    ))(input)?;
    Ok((input, joined(first, rest, ValueExpr::And)))
}

fn value_not(input: &str) -> IResult<&str, ValueExpr> {
    alt((
        map(
            preceded(pair(keyword("not"), multispace0), value_not),
            |inner| ValueExpr::Not(Box::new(inner)),
        ),
        value_expr,
    ))(input)
}

fn term(input: &str) -> IResult<&str, Term> {
    alt((
        map(quoted, Term::Quoted),
        map(
            take_while1(|c: char| !c.is_whitespace() && !"()\"<>".contains(c)),
            |text: &str| Term::Unquoted(text.to_string()),
        ),
    ))(input)
}

fn quoted(input: &str) -> IResult<&str, String> {
    delimited(
        char('"'),
        map(
            opt(escaped_transform(
                is_not("\\\""),
                '\\',
                alt((value("\\", tag("\\")), value("\"", tag("\"")))),
            )),
            Option::unwrap_or_default,
        ),
        char('"'),
    )(input)
}

#[cfg(test)]
mod tests {
    use super::super::to_cql;
    use super::*;

    fn cql(text: &str) -> String {
        let node = parse(text).unwrap().unwrap();
        to_cql(&node).unwrap()
    }

    #[test]
    fn test_blank_query() {
        assert!(parse("").unwrap().is_none());
        assert!(parse("   ").unwrap().is_none());
    }

    #[test]
    fn test_simple_match() {
        assert_eq!(cql("status:open"), "status='open'");
        assert_eq!(cql("status : \"open pit\""), "status='open pit'");
    }

    #[test]
    fn test_escaped_quote() {
        assert_eq!(cql(r#"name:"the \"big\" one""#), r#"name='the "big" one'"#);
    }

    #[test]
    fn test_empty_quoted_value() {
        assert_eq!(cql(r#"name:"""#), "name=''");
    }

    #[test]
    fn test_range() {
        assert_eq!(cql("age >= 21"), "age >= '21'");
        assert_eq!(cql("depth<300"), "depth < '300'");
    }

    #[test]
    fn test_wildcard_and_exists() {
        assert_eq!(cql("name:mil*"), "name LIKE 'mil%'");
        assert_eq!(cql("name:*"), "name IS NOT NULL");
    }

    #[test]
    fn test_boolean_precedence() {
        assert_eq!(
            cql("a:1 or b:2 and not c:3"),
            "(a='1' OR (b='2' AND NOT (c='3')))"
        );
        assert_eq!(cql("(a:1 OR b:2) AND c:3"), "((a='1' OR b='2') AND c='3')");
    }

    #[test]
    fn test_field_value_group() {
        assert_eq!(cql("commodity:(gold or silver)"), "(commodity='gold' OR commodity='silver')");
        assert_eq!(cql("commodity:(not gold)"), "NOT (commodity='gold')");
    }

    #[test]
    fn test_keyword_prefix_is_a_field() {
        assert_eq!(cql("a:1 or orange:2"), "(a='1' OR orange='2')");
        assert_eq!(cql("notes:x"), "notes='x'");
    }

    #[test]
    fn test_parse_errors() {
        for bad in ["a:1 and", "status:", "(a:1", "just words"] {
            assert!(
                matches!(parse(bad), Err(WmsError::QueryParse(_))),
                "expected failure for {:?}",
                bad
            );
        }
    }
}
