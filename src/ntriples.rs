//! N-Triples reader
//!
//! Parsing is done by sophia; this module maps its terms onto [`Node`].
//! A literal typed `xsd:string` is stored as a plain literal, and a
//! language-tagged literal keeps only its tag.

use std::io::BufRead;
use sophia::api::prelude::*;
use sophia::api::source::StreamError;
use sophia::api::term::TermKind;
use crate::node::{Literal, Node, Statement, Subject};
use crate::{Error, Result};

const XSD_STRING: &str = "http://www.w3.org/2001/XMLSchema#string";

/// Read and parse statements from any buffered reader
pub fn read_statements<R: BufRead>(reader: R) -> Result<Vec<Statement>> {
    let mut statements = Vec::new();
    sophia::turtle::parser::nt::parse_bufread(reader)
        .try_for_each_triple(|t| -> Result<()> {
            statements.push(statement_from_triple(t)?);
            Ok(())
        })
        .map_err(|e| match e {
            StreamError::SourceError(e) => Error::Parse(format!("failed to parse N-Triples: {}", e)),
            StreamError::SinkError(e) => e,
        })?;
    Ok(statements)
}

/// Parse an N-Triples document held in memory
pub fn parse_str(text: &str) -> Result<Vec<Statement>> {
    read_statements(text.as_bytes())
}

fn statement_from_triple<T: Triple>(triple: T) -> Result<Statement> {
    let subject = Subject::try_from(node_from_term(triple.s())?)?;
    let predicate = match node_from_term(triple.p())? {
        Node::Uri(uri) => uri,
        other => return Err(Error::Parse(format!("predicate must be a <uri>, got {}", other))),
    };
    let object = node_from_term(triple.o())?;
    Ok(Statement::new(subject, predicate, object))
}

fn node_from_term<T: Term>(term: T) -> Result<Node> {
    let node = match term.kind() {
        TermKind::Iri => term.iri().map(|iri| Node::uri(iri.as_str())),
        TermKind::BlankNode => term.bnode_id().map(|id| Node::blank(id.as_str())),
        TermKind::Literal => literal_from_term(&term).map(Node::literal),
        _ => None,
    };
    node.ok_or_else(|| Error::Parse(format!("unsupported term kind {:?}", term.kind())))
}

fn literal_from_term<T: Term>(term: &T) -> Option<Literal> {
    let lexical = term.lexical_form()?;
    let value: &str = &lexical;
    if let Some(tag) = term.language_tag() {
        return Some(Literal::with_language(value, tag.as_str()));
    }
    let datatype = term.datatype()?;
    Some(match datatype.as_str() {
        XSD_STRING => Literal::plain(value),
        other => Literal::typed(value, other),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_term_kinds() {
        let text = concat!(
            "# header\n",
            "<http://a> <http://p> \"chat\"@fr .\n",
            "\n",
            "_:b0 <http://p> _:b1 .\n",
            "<http://a> <http://p> \"1\"^^<http://www.w3.org/2001/XMLSchema#integer> .\n",
            "<http://a> <http://p> <http://b> . # trailing\n",
        );
        let statements = parse_str(text).unwrap();
        assert_eq!(statements.len(), 4);

        assert_eq!(statements[0].subject, Subject::uri("http://a"));
        assert_eq!(statements[0].predicate, "http://p");
        assert_eq!(statements[0].object, Node::literal(Literal::with_language("chat", "fr")));

        assert_eq!(statements[1].subject, Subject::blank("b0"));
        assert_eq!(statements[1].object, Node::blank("b1"));

        assert_eq!(
            statements[2].object,
            Node::literal(Literal::typed("1", "http://www.w3.org/2001/XMLSchema#integer"))
        );
        assert_eq!(statements[3].object, Node::uri("http://b"));
    }

    #[test]
    fn test_escapes_are_decoded() {
        let text = concat!(
            r#"<http://a> <http://p> "caf\u00e9" ."#, "\n",
            r#"<http://a> <http://p> "\U0001F600" ."#, "\n",
            r#"<http://a> <http://p> "a\tb\'c\"d\\" ."#, "\n",
            r#"<http://example.org/\u00e9> <http://p> <http://b> ."#, "\n",
        );
        let statements = parse_str(text).unwrap();
        assert_eq!(statements[0].object, Node::literal(Literal::plain("café")));
        assert_eq!(statements[1].object, Node::literal(Literal::plain("😀")));
        assert_eq!(statements[2].object, Node::literal(Literal::plain("a\tb'c\"d\\")));
        assert_eq!(statements[3].subject, Subject::uri("http://example.org/é"));
    }

    #[test]
    fn test_xsd_string_is_plain() {
        let text = "<http://a> <http://p> \"x\"^^<http://www.w3.org/2001/XMLSchema#string> .\n";
        let statements = parse_str(text).unwrap();
        assert_eq!(statements[0].object, Node::literal(Literal::plain("x")));
    }

    #[test]
    fn test_rejects_malformed_statements() {
        assert!(parse_str("\"x\" <http://p> <http://b> .\n").is_err());
        assert!(parse_str("<http://a> _:p <http://b> .\n").is_err());
        assert!(parse_str("<http://a> <http://p> <http://b>\n").is_err());
        assert!(parse_str("<http://a> <http://p> <http://b> . extra\n").is_err());
    }

    #[test]
    fn test_read_statements() {
        let input = b"<http://a> <http://p> <http://b> .\n_:x <http://p> \"y\" .\n";
        let statements = read_statements(&input[..]).unwrap();
        assert_eq!(statements.len(), 2);
        assert_eq!(statements[1].object, Node::literal(Literal::plain("y")));
    }
}
