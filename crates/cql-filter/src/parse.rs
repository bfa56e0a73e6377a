//! Recovering fragments from a previously emitted `cql_filter` value.
//!
//! This is the inverse of joining fragments with `" AND "`: every balanced
//! top-level parenthesis run becomes one fragment and text between runs is
//! discarded.

use std::sync::OnceLock;

use regex::Regex;

use crate::fragment::CqlFragment;
use crate::SPATIAL_PREDICATES;

fn spatial_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        let names = SPATIAL_PREDICATES.join("|");
        Regex::new(&format!(r"(?i)^({})\s*\(", names)).expect("spatial pattern is valid")
    })
}

/// Split a `cql_filter` value into fragments.
///
/// An unmatched `)` is ignored and an unclosed trailing run is dropped.
pub fn parse_cql(cql_filter: &str) -> Vec<CqlFragment> {
    top_level_runs(cql_filter)
        .into_iter()
        .map(classify)
        .collect()
}

fn top_level_runs(text: &str) -> Vec<&str> {
    let mut runs = Vec::new();
    let mut depth = 0usize;
    let mut start = 0usize;

    for (i, c) in text.char_indices() {
        match c {
            '(' => {
                if depth == 0 {
                    start = i;
                }
                depth += 1;
            }
            ')' if depth > 0 => {
                depth -= 1;
                if depth == 0 {
                    runs.push(&text[start..=i]);
                }
            }
            _ => {}
        }
    }
    runs
}

fn classify(run: &str) -> CqlFragment {
    let inner = strip_outer_parens(run).trim();

    let (body, is_negated) = match strip_not(inner) {
        Some(rest) => (rest, true),
        None => (inner, false),
    };

    match spatial_pattern().find(body) {
        Some(m) => {
            let args = &body[m.end()..];
            let field_key = args.split(',').next().unwrap_or_default().trim();
            CqlFragment {
                cql: run.to_string(),
                is_spatial: true,
                is_negated,
                field_key: field_key.to_string(),
            }
        }
        None => CqlFragment {
            cql: run.to_string(),
            is_spatial: false,
            is_negated,
            field_key: String::new(),
        },
    }
}

/// Remove one pair of parentheses if it encloses the whole text.
fn strip_outer_parens(run: &str) -> &str {
    let Some(inner) = run.strip_prefix('(').and_then(|r| r.strip_suffix(')')) else {
        return run;
    };
    let mut depth = 0i32;
    for c in inner.chars() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth < 0 {
                    // "(a) AND (b)" style: the first ')' closes the opening '('
                    return run;
                }
            }
            _ => {}
        }
    }
    inner
}

/// Strip a leading `NOT` keyword.
///
/// Stricter than matching the first three characters alone: `NOT` must be
/// followed by whitespace or `(`. A bare prefix check would read a
/// fragment on a column such as `NOTES` or `nothing` as a negation and
/// drop its first three letters.
fn strip_not(text: &str) -> Option<&str> {
    let head = text.get(..3)?;
    if !head.eq_ignore_ascii_case("not") {
        return None;
    }
    let rest = &text[3..];
    match rest.chars().next() {
        Some(c) if c.is_whitespace() || c == '(' => Some(rest.trim_start()),
        _ => None,
    }
}
