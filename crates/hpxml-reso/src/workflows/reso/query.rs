//! Single-or-none path queries over an HPXML tree.
//!
//! Paths are `/`-separated element names in the HPXML namespace. The first
//! step may carry a `descendant::` axis, `*` matches any element, and the last
//! step may be `text()` or `@attr` to select a value instead of an element.

use roxmltree::Node;
use std::str::FromStr;
use thiserror::Error;

pub const HPXML_NAMESPACE: &str = "http://hpxmlonline.com/2014/6";

/// Fatal document-shape problems. Never retried.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ShapeError {
    #[error("expected at most one match for `{path}`, found {count}")]
    Ambiguous { path: String, count: usize },
    #[error("required value `{path}` is missing")]
    Missing { path: String },
    #[error("value '{value}' at `{path}` is not a valid {expected}")]
    Unconvertible {
        path: String,
        value: String,
        expected: &'static str,
    },
    #[error("{kind} cannot serve the {role} role")]
    UnexpectedEquipment { kind: String, role: &'static str },
    #[error("primary {role} system reference '{id}' matches {count} units")]
    AmbiguousPrimary {
        role: &'static str,
        id: String,
        count: usize,
    },
    #[error("no building found{}", building_suffix(.id))]
    BuildingNotFound { id: Option<String> },
}

fn building_suffix(id: &Option<String>) -> String {
    match id {
        Some(id) => format!(" with id '{id}'"),
        None => String::new(),
    }
}

/// One query result: an element, or the text of an element or attribute.
#[derive(Debug, Clone, Copy)]
pub enum Match<'a, 'input: 'a> {
    Element(Node<'a, 'input>),
    Text(&'a str),
}

impl<'a, 'input: 'a> Match<'a, 'input> {
    pub fn element(&self) -> Option<Node<'a, 'input>> {
        match self {
            Match::Element(node) => Some(*node),
            Match::Text(_) => None,
        }
    }

    pub fn text(&self) -> Option<&'a str> {
        match self {
            Match::Element(node) => element_text(*node),
            Match::Text(text) => Some(*text),
        }
    }
}

enum Terminal<'p> {
    Element,
    Text,
    Attribute(&'p str),
}

struct PathExpr<'p> {
    descendant: bool,
    steps: Vec<&'p str>,
    terminal: Terminal<'p>,
}

impl<'p> PathExpr<'p> {
    fn parse(expr: &'p str) -> Self {
        let (descendant, rest) = match expr.strip_prefix("descendant::") {
            Some(rest) => (true, rest),
            None => (false, expr),
        };

        let mut steps: Vec<&str> = rest.split('/').filter(|step| !step.is_empty()).collect();
        let terminal = match steps.last().copied() {
            Some("text()") => {
                steps.pop();
                Terminal::Text
            }
            Some(step) if step.starts_with('@') => {
                steps.pop();
                Terminal::Attribute(&step[1..])
            }
            _ => Terminal::Element,
        };

        Self {
            descendant,
            steps,
            terminal,
        }
    }
}

/// True for elements in the HPXML namespace whose local name is `name` (or any name for `*`).
pub fn is_hpxml_element(node: Node<'_, '_>, name: &str) -> bool {
    node.is_element()
        && node.tag_name().namespace() == Some(HPXML_NAMESPACE)
        && (name == "*" || node.tag_name().name() == name)
}

fn element_text<'a>(node: Node<'a, '_>) -> Option<&'a str> {
    node.text().map(str::trim).filter(|text| !text.is_empty())
}

/// Every match of `expr` under `node`, in document order.
pub fn query_many<'a, 'input: 'a>(node: Node<'a, 'input>, expr: &str) -> Vec<Match<'a, 'input>> {
    let path = PathExpr::parse(expr);
    let mut current = vec![node];

    for (index, step) in path.steps.iter().enumerate() {
        let mut next = Vec::new();
        for context in &current {
            if index == 0 && path.descendant {
                next.extend(
                    context
                        .descendants()
                        .skip(1)
                        .filter(|candidate| is_hpxml_element(*candidate, step)),
                );
            } else {
                next.extend(
                    context
                        .children()
                        .filter(|candidate| is_hpxml_element(*candidate, step)),
                );
            }
        }
        current = next;
    }

    match path.terminal {
        Terminal::Element => current.into_iter().map(Match::Element).collect(),
        Terminal::Text => current
            .into_iter()
            .filter_map(element_text)
            .map(Match::Text)
            .collect(),
        Terminal::Attribute(name) => current
            .into_iter()
            .filter_map(|element| element.attribute(name))
            .map(Match::Text)
            .collect(),
    }
}

/// Zero or one match of `expr`; more than one is a [`ShapeError::Ambiguous`].
pub fn query_one<'a, 'input: 'a>(
    node: Node<'a, 'input>,
    expr: &str,
) -> Result<Option<Match<'a, 'input>>, ShapeError> {
    let mut matches = query_many(node, expr);
    match matches.len() {
        0 | 1 => Ok(matches.pop()),
        count => Err(ShapeError::Ambiguous {
            path: expr.to_string(),
            count,
        }),
    }
}

pub fn query_element<'a, 'input: 'a>(
    node: Node<'a, 'input>,
    expr: &str,
) -> Result<Option<Node<'a, 'input>>, ShapeError> {
    Ok(query_one(node, expr)?.and_then(|found| found.element()))
}

pub fn query_text<'a, 'input: 'a>(
    node: Node<'a, 'input>,
    expr: &str,
) -> Result<Option<&'a str>, ShapeError> {
    Ok(query_one(node, expr)?.and_then(|found| found.text()))
}

/// Like [`query_text`], passing a present value through `convert`.
pub fn query_one_with<T, F>(node: Node<'_, '_>, expr: &str, convert: F) -> Result<Option<T>, ShapeError>
where
    F: FnOnce(&str) -> Option<T>,
{
    match query_text(node, expr)? {
        None => Ok(None),
        Some(raw) => convert(raw)
            .map(Some)
            .ok_or_else(|| ShapeError::Unconvertible {
                path: expr.to_string(),
                value: raw.to_string(),
                expected: std::any::type_name::<T>(),
            }),
    }
}

pub fn query_value<T: FromStr>(node: Node<'_, '_>, expr: &str) -> Result<Option<T>, ShapeError> {
    query_one_with(node, expr, |raw| raw.parse::<T>().ok())
}

pub fn require<T>(value: Option<T>, expr: &str) -> Result<T, ShapeError> {
    value.ok_or_else(|| ShapeError::Missing {
        path: expr.to_string(),
    })
}
