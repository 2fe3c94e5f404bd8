//! Node model - the values statements are made of
//!
//! Every statement position holds one of three node kinds:
//! - `Uri`: a resource, written `<http://example.org/a>`
//! - `Blank`: an anonymous node, written `_:b0`
//! - `Literal`: a value with an optional language or datatype,
//!   written `"chat"@fr` or `"42"^^<http://www.w3.org/2001/XMLSchema#integer>`
//!
//! The textual forms follow N-Triples term syntax.

use crate::{Error, Result, ntriples};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Placeholder subject and predicate around a term parsed on its own
const TERM_HOLDER: &str = "urn:sqltriple:term";

/// Language tag or datatype attached to a literal. Never both.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum Qualifier {
    None,
    Language(String),
    Datatype(String),
}

/// A literal value.
///
/// A literal carries at most one qualifier: a language tag or a datatype URI.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Literal {
    value: String,
    qualifier: Qualifier,
}

impl Literal {
    /// Create a literal with no language and no datatype
    pub fn plain(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            qualifier: Qualifier::None,
        }
    }

    /// Create a language-tagged literal
    pub fn with_language(value: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            qualifier: Qualifier::Language(language.into()),
        }
    }

    /// Create a typed literal
    pub fn typed(value: impl Into<String>, datatype: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            qualifier: Qualifier::Datatype(datatype.into()),
        }
    }

    /// Build a literal from optional parts, rejecting language + datatype
    pub fn new(value: impl Into<String>, language: Option<String>, datatype: Option<String>) -> Result<Self> {
        let value = value.into();
        match (language, datatype) {
            (None, None) => Ok(Self::plain(value)),
            (Some(language), None) => Ok(Self::with_language(value, language)),
            (None, Some(datatype)) => Ok(Self::typed(value, datatype)),
            (Some(language), Some(datatype)) => Err(Error::InvalidNode(format!(
                "literal {:?} has both language {:?} and datatype {:?}",
                value, language, datatype
            ))),
        }
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn language(&self) -> Option<&str> {
        match &self.qualifier {
            Qualifier::Language(language) => Some(language),
            _ => None,
        }
    }

    pub fn datatype(&self) -> Option<&str> {
        match &self.qualifier {
            Qualifier::Datatype(datatype) => Some(datatype),
            _ => None,
        }
    }
}

/// A node in any statement position.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Node {
    Uri(String),
    Blank(String),
    Literal(Literal),
}

impl Node {
    pub fn uri(uri: impl Into<String>) -> Self {
        Node::Uri(uri.into())
    }

    pub fn blank(name: impl Into<String>) -> Self {
        Node::Blank(name.into())
    }

    pub fn literal(literal: Literal) -> Self {
        Node::Literal(literal)
    }

    /// Parse a single term in N-Triples syntax
    pub fn parse(text: &str) -> Result<Self> {
        // object position accepts every kind of term
        let document = format!("<{}> <{}> {} .", TERM_HOLDER, TERM_HOLDER, text.trim());
        let mut statements = ntriples::parse_str(&document)?;
        match (statements.pop(), statements.is_empty()) {
            (Some(statement), true) => Ok(statement.object),
            _ => Err(Error::Parse(format!("Not a single term: {}", text))),
        }
    }

    /// Convert to N-Triples term syntax
    pub fn to_term_string(&self) -> String {
        match self {
            Node::Uri(uri) => format!("<{}>", uri),
            Node::Blank(name) => format!("_:{}", name),
            Node::Literal(literal) => {
                let mut out = format!("\"{}\"", escape(&literal.value));
                match &literal.qualifier {
                    Qualifier::None => {}
                    Qualifier::Language(language) => {
                        out.push('@');
                        out.push_str(language);
                    }
                    Qualifier::Datatype(datatype) => {
                        out.push_str("^^<");
                        out.push_str(datatype);
                        out.push('>');
                    }
                }
                out
            }
        }
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_term_string())
    }
}

impl FromStr for Node {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl Serialize for Node {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_term_string())
    }
}

impl<'de> Deserialize<'de> for Node {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Node::parse(&s).map_err(serde::de::Error::custom)
    }
}

/// A node allowed in subject position: a URI or a blank node.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Subject {
    Uri(String),
    Blank(String),
}

impl Subject {
    pub fn uri(uri: impl Into<String>) -> Self {
        Subject::Uri(uri.into())
    }

    pub fn blank(name: impl Into<String>) -> Self {
        Subject::Blank(name.into())
    }
}

impl From<Subject> for Node {
    fn from(subject: Subject) -> Self {
        match subject {
            Subject::Uri(uri) => Node::Uri(uri),
            Subject::Blank(name) => Node::Blank(name),
        }
    }
}

impl TryFrom<Node> for Subject {
    type Error = Error;

    fn try_from(node: Node) -> Result<Self> {
        match node {
            Node::Uri(uri) => Ok(Subject::Uri(uri)),
            Node::Blank(name) => Ok(Subject::Blank(name)),
            Node::Literal(literal) => Err(Error::InvalidNode(format!(
                "literal {} cannot be a subject",
                Node::Literal(literal)
            ))),
        }
    }
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Subject::Uri(uri) => write!(f, "<{}>", uri),
            Subject::Blank(name) => write!(f, "_:{}", name),
        }
    }
}

impl Serialize for Subject {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Subject {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Node::parse(&s)
            .and_then(Subject::try_from)
            .map_err(serde::de::Error::custom)
    }
}

/// A subject-predicate-object statement.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Statement {
    pub subject: Subject,
    /// Predicate URI
    pub predicate: String,
    pub object: Node,
}

impl Statement {
    pub fn new(subject: Subject, predicate: impl Into<String>, object: Node) -> Self {
        Self {
            subject,
            predicate: predicate.into(),
            object,
        }
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} <{}> {} .", self.subject, self.predicate, self.object)
    }
}

/// A statement pattern; `None` positions are wildcards.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Pattern {
    pub subject: Option<Subject>,
    pub predicate: Option<String>,
    pub object: Option<Node>,
}

impl Pattern {
    /// The pattern matching every statement
    pub fn any() -> Self {
        Self::default()
    }

    pub fn with_subject(mut self, subject: Subject) -> Self {
        self.subject = Some(subject);
        self
    }

    pub fn with_predicate(mut self, predicate: impl Into<String>) -> Self {
        self.predicate = Some(predicate.into());
        self
    }

    pub fn with_object(mut self, object: Node) -> Self {
        self.object = Some(object);
        self
    }
}

impl From<&Statement> for Pattern {
    fn from(statement: &Statement) -> Self {
        Self {
            subject: Some(statement.subject.clone()),
            predicate: Some(statement.predicate.clone()),
            object: Some(statement.object.clone()),
        }
    }
}

/// Surrogate id of a persisted node, tagged with the table it lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeId {
    Resource(i64),
    Blank(i64),
    Literal(i64),
}

impl NodeId {
    pub fn id(&self) -> i64 {
        match *self {
            NodeId::Resource(id) | NodeId::Blank(id) | NodeId::Literal(id) => id,
        }
    }
}

fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_terms() {
        assert_eq!(Node::parse("<http://a>").unwrap(), Node::uri("http://a"));
        assert_eq!(Node::parse("_:b1").unwrap(), Node::blank("b1"));
        assert_eq!(
            Node::parse("\"hello\"@en").unwrap(),
            Node::literal(Literal::with_language("hello", "en"))
        );
        assert_eq!(
            Node::parse("\"42\"^^<http://www.w3.org/2001/XMLSchema#integer>").unwrap(),
            Node::literal(Literal::typed("42", "http://www.w3.org/2001/XMLSchema#integer"))
        );
    }

    #[test]
    fn test_term_string_escapes() {
        let node = Node::literal(Literal::plain("say \"hi\"\nbye"));
        let text = node.to_term_string();
        assert_eq!(text, "\"say \\\"hi\\\"\\nbye\"");
        assert_eq!(Node::parse(&text).unwrap(), node);
    }

    #[test]
    fn test_parse_unicode_escapes() {
        assert_eq!(
            Node::parse(r#""caf\u00e9""#).unwrap(),
            Node::literal(Literal::plain("café"))
        );
        assert_eq!(
            Node::parse(r#"<http://example.org/\u00e9>"#).unwrap(),
            Node::uri("http://example.org/é")
        );
    }

    #[test]
    fn test_invalid_terms() {
        assert!(Node::parse("http://a").is_err());
        assert!(Node::parse("<http://a").is_err());
        assert!(Node::parse("\"open").is_err());
        assert!(Node::parse("_:").is_err());
        assert!(Node::parse("<http://a> extra").is_err());
        assert!(Node::parse("<http://a> . <http://b> <http://c> <http://d>").is_err());
        assert!(Node::parse("").is_err());
    }

    #[test]
    fn test_literal_rejects_language_and_datatype() {
        let err = Literal::new("x", Some("en".into()), Some("http://dt".into()));
        assert!(matches!(err, Err(Error::InvalidNode(_))));

        let lit = Literal::new("x", None, Some("http://dt".into())).unwrap();
        assert_eq!(lit.datatype(), Some("http://dt"));
        assert_eq!(lit.language(), None);
    }

    #[test]
    fn test_literal_cannot_be_subject() {
        assert!(Subject::try_from(Node::literal(Literal::plain("x"))).is_err());
        assert_eq!(Subject::try_from(Node::blank("b")).unwrap(), Subject::blank("b"));
    }

    #[test]
    fn test_pattern_from_statement_binds_everything() {
        let st = Statement::new(Subject::uri("http://a"), "http://p", Node::uri("http://b"));
        let pattern = Pattern::from(&st);
        assert_eq!(pattern.subject, Some(Subject::uri("http://a")));
        assert_eq!(pattern.predicate.as_deref(), Some("http://p"));
        assert_eq!(pattern.object, Some(Node::uri("http://b")));
        assert_eq!(Pattern::any(), Pattern::default());
    }

    #[test]
    fn test_statement_serializes_as_terms() {
        let st = Statement::new(
            Subject::blank("x"),
            "http://p",
            Node::literal(Literal::with_language("chat", "fr")),
        );
        let json = serde_json::to_string(&st).unwrap();
        assert_eq!(json, r#"{"subject":"_:x","predicate":"http://p","object":"\"chat\"@fr"}"#);
        let back: Statement = serde_json::from_str(&json).unwrap();
        assert_eq!(back, st);
    }
}
