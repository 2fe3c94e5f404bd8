//! Find-or-insert of nodes and statements
//!
//! Resolves every component of a statement to its surrogate id, optionally
//! inserting what is missing, and then finds or inserts the triple row.
//! URI lookups go through the identifier cache; blank node, literal and
//! context lookups always hit the database.

use crate::cache::IdentifierCache;
use crate::node::{Literal, Node, NodeId, Statement, Subject};
use crate::shape::{ExactShape, ObjectKind, SubjectKind};
use crate::{Error, Result};
use super::prepared::{PreparedKind, PreparedStatements};
use super::session::Session;

/// A positional parameter for a canonical statement
#[derive(Debug, Clone, Copy)]
enum Param<'p> {
    Text(&'p str),
    Int(i64),
    Null,
}

impl<'p> From<Option<&'p str>> for Param<'p> {
    fn from(value: Option<&'p str>) -> Self {
        value.map_or(Param::Null, Param::Text)
    }
}

impl From<Option<i64>> for Param<'_> {
    fn from(value: Option<i64>) -> Self {
        value.map_or(Param::Null, Param::Int)
    }
}

/// Run a canonical statement and return the integer it yields, if any
fn query_id(
    session: &mut Session,
    prepared: &mut PreparedStatements,
    kind: PreparedKind,
    params: &[Param<'_>],
) -> Result<Option<i64>> {
    let handle = prepared.get(session, kind)?;
    debug_assert_eq!(params.len(), prepared.arity(kind), "{:?}", kind);
    for (i, param) in params.iter().enumerate() {
        match *param {
            Param::Text(text) => session.bind_text(handle, i + 1, text),
            Param::Int(value) => session.bind_int(handle, i + 1, value),
            Param::Null => session.bind_null(handle, i + 1),
        }
    }
    session.unique_result(handle)
}

/// Like [`query_id`] for an `INSERT ... RETURNING id`, which always yields
fn insert_id(
    session: &mut Session,
    prepared: &mut PreparedStatements,
    kind: PreparedKind,
    params: &[Param<'_>],
) -> Result<i64> {
    query_id(session, prepared, kind, params)?
        .ok_or_else(|| Error::CorruptRow(format!("{:?} returned no id", kind)))
}

/// Statement lookup over one store's session, registry and URI cache
pub struct StatementFinder<'a> {
    session: &'a mut Session,
    prepared: &'a mut PreparedStatements,
    resources: &'a mut IdentifierCache<String, i64>,
    inserted_nodes: usize,
}

impl<'a> StatementFinder<'a> {
    pub fn new(
        session: &'a mut Session,
        prepared: &'a mut PreparedStatements,
        resources: &'a mut IdentifierCache<String, i64>,
    ) -> Self {
        Self {
            session,
            prepared,
            resources,
            inserted_nodes: 0,
        }
    }

    /// Components inserted by the last `find`
    pub fn inserted_nodes(&self) -> usize {
        self.inserted_nodes
    }

    // ========== Nodes ==========

    pub fn resource_id(&mut self, uri: &str, create: bool) -> Result<Option<i64>> {
        let session = &mut *self.session;
        let prepared = &mut *self.prepared;
        let cached = self.resources.get_value(uri, |uri: &str| {
            query_id(session, prepared, PreparedKind::GetResourceId, &[Param::Text(uri)])
        })?;

        match cached {
            Some(id) => Ok(Some(id)),
            None if create => {
                self.inserted_nodes += 1;
                let id = insert_id(self.session, self.prepared, PreparedKind::InsertResource, &[Param::Text(uri)])?;
                Ok(Some(id))
            }
            None => Ok(None),
        }
    }

    pub fn blank_id(&mut self, name: &str, create: bool) -> Result<Option<i64>> {
        if let Some(id) = query_id(self.session, self.prepared, PreparedKind::GetBlankId, &[Param::Text(name)])? {
            return Ok(Some(id));
        }
        if !create {
            return Ok(None);
        }
        self.inserted_nodes += 1;
        insert_id(self.session, self.prepared, PreparedKind::InsertBlank, &[Param::Text(name)]).map(Some)
    }

    pub fn literal_id(&mut self, literal: &Literal, create: bool) -> Result<Option<i64>> {
        let datatype = match literal.datatype() {
            Some(uri) => match self.resource_id(uri, create)? {
                Some(id) => Some(id),
                None => return Ok(None),
            },
            None => None,
        };

        let value = Param::Text(literal.value());
        let found = match (literal.language(), datatype) {
            (Some(language), _) => query_id(
                self.session,
                self.prepared,
                PreparedKind::GetLiteralIdWithLanguage,
                &[value, Param::Text(language)],
            )?,
            (None, Some(datatype)) => query_id(
                self.session,
                self.prepared,
                PreparedKind::GetLiteralIdWithDatatype,
                &[value, Param::Int(datatype)],
            )?,
            (None, None) => query_id(self.session, self.prepared, PreparedKind::GetLiteralId, &[value])?,
        };

        if found.is_some() || !create {
            return Ok(found);
        }
        self.inserted_nodes += 1;
        insert_id(
            self.session,
            self.prepared,
            PreparedKind::InsertLiteral,
            &[value, literal.language().into(), datatype.into()],
        )
        .map(Some)
    }

    pub fn context_id(&mut self, uri: &str, create: bool) -> Result<Option<i64>> {
        if let Some(id) = query_id(self.session, self.prepared, PreparedKind::GetContextId, &[Param::Text(uri)])? {
            return Ok(Some(id));
        }
        if !create {
            return Ok(None);
        }
        let id = insert_id(self.session, self.prepared, PreparedKind::InsertContext, &[Param::Text(uri)])?;
        tracing::debug!(context = uri, id, "created context");
        Ok(Some(id))
    }

    /// Resolve any node to its id, inserting it when `create` is set
    pub fn resolve(&mut self, node: &Node, create: bool) -> Result<Option<NodeId>> {
        Ok(match node {
            Node::Uri(uri) => self.resource_id(uri, create)?.map(NodeId::Resource),
            Node::Blank(name) => self.blank_id(name, create)?.map(NodeId::Blank),
            Node::Literal(literal) => self.literal_id(literal, create)?.map(NodeId::Literal),
        })
    }

    fn resolve_subject(&mut self, subject: &Subject, create: bool) -> Result<Option<(SubjectKind, i64)>> {
        Ok(match subject {
            Subject::Uri(uri) => self.resource_id(uri, create)?.map(|id| (SubjectKind::Uri, id)),
            Subject::Blank(name) => self.blank_id(name, create)?.map(|id| (SubjectKind::Blank, id)),
        })
    }

    // ========== Statements ==========

    /// Find the triple row for `statement` in `context`, inserting it (and
    /// any missing component) when `create` is set.
    ///
    /// With `create` unset a missing component or triple yields `None` and
    /// nothing is written.
    pub fn find(&mut self, context: Option<i64>, statement: &Statement, create: bool) -> Result<Option<i64>> {
        self.inserted_nodes = 0;

        let Some((subject_kind, subject)) = self.resolve_subject(&statement.subject, create)? else {
            return Ok(None);
        };
        let Some(predicate) = self.resource_id(&statement.predicate, create)? else {
            return Ok(None);
        };
        let Some(object) = self.resolve(&statement.object, create)? else {
            return Ok(None);
        };

        let object_kind = match object {
            NodeId::Resource(_) => ObjectKind::Uri,
            NodeId::Blank(_) => ObjectKind::Blank,
            NodeId::Literal(_) => ObjectKind::Literal,
        };

        // a triple referencing a node inserted just now cannot exist yet
        if self.inserted_nodes == 0 {
            let shape = ExactShape::new(subject_kind, object_kind, context.is_some());
            let mut params = vec![Param::Int(subject), Param::Int(predicate), Param::Int(object.id())];
            if let Some(context) = context {
                params.push(Param::Int(context));
            }
            if let Some(id) = query_id(self.session, self.prepared, PreparedKind::SelectTriple(shape), &params)? {
                return Ok(Some(id));
            }
        }

        if !create {
            return Ok(None);
        }

        let (s_uri, s_blank) = match subject_kind {
            SubjectKind::Uri => (Some(subject), None),
            SubjectKind::Blank => (None, Some(subject)),
        };
        let (o_uri, o_blank, o_literal) = match object {
            NodeId::Resource(id) => (Some(id), None, None),
            NodeId::Blank(id) => (None, Some(id), None),
            NodeId::Literal(id) => (None, None, Some(id)),
        };
        let id = insert_id(
            self.session,
            self.prepared,
            PreparedKind::InsertTriple,
            &[
                s_uri.into(),
                s_blank.into(),
                Param::Int(predicate),
                o_uri.into(),
                o_blank.into(),
                o_literal.into(),
                context.into(),
            ],
        )?;
        tracing::trace!(id, inserted_nodes = self.inserted_nodes, "inserted triple");
        Ok(Some(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::schema;

    struct Fixture {
        session: Session,
        prepared: PreparedStatements,
        resources: IdentifierCache<String, i64>,
    }

    impl Fixture {
        fn new() -> Self {
            let session = Session::open_in_memory(64).unwrap();
            for stmt in schema::all_schema_statements() {
                session.execute_batch(stmt).unwrap();
            }
            Self {
                session,
                prepared: PreparedStatements::new(),
                resources: IdentifierCache::default(),
            }
        }

        fn finder(&mut self) -> StatementFinder<'_> {
            StatementFinder::new(&mut self.session, &mut self.prepared, &mut self.resources)
        }

        fn count(&self) -> usize {
            self.session.query_count("SELECT COUNT(*) FROM triple").unwrap()
        }
    }

    fn uri_statement() -> Statement {
        Statement::new(Subject::uri("http://a"), "http://p", Node::uri("http://b"))
    }

    #[test]
    fn test_find_creates_components_in_order() {
        let mut fx = Fixture::new();
        let mut finder = fx.finder();
        let id = finder.find(None, &uri_statement(), true).unwrap();
        assert_eq!(id, Some(1));
        assert_eq!(finder.inserted_nodes(), 3);

        assert_eq!(finder.resource_id("http://a", false).unwrap(), Some(1));
        assert_eq!(finder.resource_id("http://p", false).unwrap(), Some(2));
        assert_eq!(finder.resource_id("http://b", false).unwrap(), Some(3));
        assert_eq!(fx.count(), 1);

        let matching = fx
            .session
            .query_count("SELECT COUNT(*) FROM triple WHERE s_uri = 1 AND p_uri = 2 AND o_uri = 3 AND c_uri IS NULL")
            .unwrap();
        assert_eq!(matching, 1);
    }

    #[test]
    fn test_find_is_idempotent() {
        let mut fx = Fixture::new();
        let first = fx.finder().find(None, &uri_statement(), true).unwrap();

        let mut finder = fx.finder();
        let second = finder.find(None, &uri_statement(), true).unwrap();
        assert_eq!(first, second);
        assert_eq!(finder.inserted_nodes(), 0);
        assert_eq!(fx.count(), 1);
    }

    #[test]
    fn test_find_without_create_has_no_side_effects() {
        let mut fx = Fixture::new();
        assert_eq!(fx.finder().find(None, &uri_statement(), false).unwrap(), None);
        assert_eq!(fx.count(), 0);
        assert_eq!(fx.session.query_count("SELECT COUNT(*) FROM resource").unwrap(), 0);
    }

    #[test]
    fn test_literal_identity() {
        let mut fx = Fixture::new();
        let mut finder = fx.finder();
        let statement = Statement::new(
            Subject::uri("http://a"),
            "http://p",
            Node::literal(Literal::with_language("hello", "en")),
        );
        finder.find(None, &statement, true).unwrap();

        let plain = Node::literal(Literal::plain("hello"));
        let typed = Node::literal(Literal::typed("hello", "http://dt"));
        let tagged = Node::literal(Literal::with_language("hello", "en"));
        assert_eq!(finder.resolve(&plain, false).unwrap(), None);
        assert_eq!(finder.resolve(&typed, false).unwrap(), None);
        assert!(matches!(finder.resolve(&tagged, false).unwrap(), Some(NodeId::Literal(_))));

        let plain_id = finder.resolve(&plain, true).unwrap();
        let typed_id = finder.resolve(&typed, true).unwrap();
        assert_ne!(plain_id, typed_id);
        assert_ne!(plain_id, finder.resolve(&tagged, false).unwrap());
        // the datatype became a resource
        assert!(finder.resource_id("http://dt", false).unwrap().is_some());
    }

    #[test]
    fn test_context_distinguishes_triples() {
        let mut fx = Fixture::new();
        let mut finder = fx.finder();
        let ctx = finder.context_id("http://ctx", true).unwrap();
        assert_eq!(finder.context_id("http://ctx", false).unwrap(), ctx);

        let without = finder.find(None, &uri_statement(), true).unwrap();
        let with = finder.find(ctx, &uri_statement(), true).unwrap();
        assert_ne!(without, with);
        assert_eq!(finder.find(ctx, &uri_statement(), false).unwrap(), with);
        assert_eq!(fx.count(), 2);
    }

    #[test]
    fn test_fresh_components_skip_duplicate_check() {
        let mut fx = Fixture::new();
        let shape = ExactShape::new(SubjectKind::Blank, ObjectKind::Literal, false);
        let statement = Statement::new(Subject::blank("b0"), "http://p", Node::literal(Literal::plain("x")));

        fx.finder().find(None, &statement, true).unwrap();
        assert!(!fx.prepared.is_compiled(PreparedKind::SelectTriple(shape)));

        // nothing new the second time, so the duplicate check runs and hits
        let again = fx.finder().find(None, &statement, true).unwrap();
        assert_eq!(again, Some(1));
        assert!(fx.prepared.is_compiled(PreparedKind::SelectTriple(shape)));
        assert_eq!(fx.count(), 1);
    }

    #[test]
    fn test_uri_lookups_are_cached() {
        let mut fx = Fixture::new();
        fx.finder().find(None, &uri_statement(), true).unwrap();
        fx.finder().find(None, &uri_statement(), true).unwrap();
        assert!(fx.resources.contains_key("http://a"));
        assert!(fx.resources.contains_key("http://p"));
        assert!(fx.resources.contains_key("http://b"));
    }
}
