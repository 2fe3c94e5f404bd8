//! Canonical prepared statements
//!
//! A fixed table of the statements the engine runs on every mutation and
//! lookup. Each slot is compiled the first time it is used and then reused,
//! reset, for the lifetime of the store.

use crate::Result;
use crate::shape::{EXACT_SHAPE_COUNT, ExactShape};
use super::session::{HandleId, Session};

/// Which canonical statement to fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PreparedKind {
    GetResourceId,
    InsertResource,
    GetContextId,
    InsertContext,
    GetBlankId,
    InsertBlank,
    GetLiteralId,
    GetLiteralIdWithLanguage,
    GetLiteralIdWithDatatype,
    InsertLiteral,
    /// Exact triple lookup for one of the 12 exact shapes
    SelectTriple(ExactShape),
    InsertTriple,
    CountTriples,
    DeleteTriple,
    ListContexts,
}

const SELECT_TRIPLE_BASE: usize = 10;
pub(crate) const SLOT_COUNT: usize = SELECT_TRIPLE_BASE + EXACT_SHAPE_COUNT + 4;

impl PreparedKind {
    fn slot(self) -> usize {
        match self {
            PreparedKind::GetResourceId => 0,
            PreparedKind::InsertResource => 1,
            PreparedKind::GetContextId => 2,
            PreparedKind::InsertContext => 3,
            PreparedKind::GetBlankId => 4,
            PreparedKind::InsertBlank => 5,
            PreparedKind::GetLiteralId => 6,
            PreparedKind::GetLiteralIdWithLanguage => 7,
            PreparedKind::GetLiteralIdWithDatatype => 8,
            PreparedKind::InsertLiteral => 9,
            PreparedKind::SelectTriple(shape) => SELECT_TRIPLE_BASE + shape.index(),
            PreparedKind::InsertTriple => SELECT_TRIPLE_BASE + EXACT_SHAPE_COUNT,
            PreparedKind::CountTriples => SELECT_TRIPLE_BASE + EXACT_SHAPE_COUNT + 1,
            PreparedKind::DeleteTriple => SELECT_TRIPLE_BASE + EXACT_SHAPE_COUNT + 2,
            PreparedKind::ListContexts => SELECT_TRIPLE_BASE + EXACT_SHAPE_COUNT + 3,
        }
    }
}

/// (sql, parameter count) per slot, in slot order
const STATEMENTS: [(&str, usize); SLOT_COUNT] = [
    // GetResourceId
    ("SELECT id FROM resource WHERE uri = ?", 1),
    // InsertResource
    ("INSERT INTO resource (uri) VALUES (?) RETURNING id", 1),
    // GetContextId
    ("SELECT id FROM context WHERE uri = ?", 1),
    // InsertContext
    ("INSERT INTO context (uri) VALUES (?) RETURNING id", 1),
    // GetBlankId
    ("SELECT id FROM bnode WHERE name = ?", 1),
    // InsertBlank
    ("INSERT INTO bnode (name) VALUES (?) RETURNING id", 1),
    // GetLiteralId
    ("SELECT id FROM literal WHERE val = ? AND language IS NULL AND datatype IS NULL", 1),
    // GetLiteralIdWithLanguage
    ("SELECT id FROM literal WHERE val = ? AND language = ? AND datatype IS NULL", 2),
    // GetLiteralIdWithDatatype
    ("SELECT id FROM literal WHERE val = ? AND language IS NULL AND datatype = ?", 2),
    // InsertLiteral
    ("INSERT INTO literal (val, language, datatype) VALUES (?, ?, ?) RETURNING id", 3),
    // SelectTriple, exact shapes 0..12
    ("SELECT r.id FROM triple r INDEXED BY idx_triple_s_uri WHERE r.s_uri = ? AND r.p_uri = ? AND r.o_uri = ? AND r.c_uri = ?", 4),
    ("SELECT r.id FROM triple r INDEXED BY idx_triple_s_uri WHERE r.s_uri = ? AND r.p_uri = ? AND r.o_uri = ? AND r.c_uri IS NULL", 3),
    ("SELECT r.id FROM triple r INDEXED BY idx_triple_s_uri WHERE r.s_uri = ? AND r.p_uri = ? AND r.o_blank = ? AND r.c_uri = ?", 4),
    ("SELECT r.id FROM triple r INDEXED BY idx_triple_s_uri WHERE r.s_uri = ? AND r.p_uri = ? AND r.o_blank = ? AND r.c_uri IS NULL", 3),
    ("SELECT r.id FROM triple r INDEXED BY idx_triple_s_uri WHERE r.s_uri = ? AND r.p_uri = ? AND r.o_literal = ? AND r.c_uri = ?", 4),
    ("SELECT r.id FROM triple r INDEXED BY idx_triple_s_uri WHERE r.s_uri = ? AND r.p_uri = ? AND r.o_literal = ? AND r.c_uri IS NULL", 3),
    ("SELECT r.id FROM triple r INDEXED BY idx_triple_s_blank WHERE r.s_blank = ? AND r.p_uri = ? AND r.o_uri = ? AND r.c_uri = ?", 4),
    ("SELECT r.id FROM triple r INDEXED BY idx_triple_s_blank WHERE r.s_blank = ? AND r.p_uri = ? AND r.o_uri = ? AND r.c_uri IS NULL", 3),
    ("SELECT r.id FROM triple r INDEXED BY idx_triple_s_blank WHERE r.s_blank = ? AND r.p_uri = ? AND r.o_blank = ? AND r.c_uri = ?", 4),
    ("SELECT r.id FROM triple r INDEXED BY idx_triple_s_blank WHERE r.s_blank = ? AND r.p_uri = ? AND r.o_blank = ? AND r.c_uri IS NULL", 3),
    ("SELECT r.id FROM triple r INDEXED BY idx_triple_s_blank WHERE r.s_blank = ? AND r.p_uri = ? AND r.o_literal = ? AND r.c_uri = ?", 4),
    ("SELECT r.id FROM triple r INDEXED BY idx_triple_s_blank WHERE r.s_blank = ? AND r.p_uri = ? AND r.o_literal = ? AND r.c_uri IS NULL", 3),
    // InsertTriple
    ("INSERT INTO triple (s_uri, s_blank, p_uri, o_uri, o_blank, o_literal, c_uri) VALUES (?, ?, ?, ?, ?, ?, ?) RETURNING id", 7),
    // CountTriples
    ("SELECT COUNT(*) FROM triple", 0),
    // DeleteTriple
    ("DELETE FROM triple WHERE id = ?", 1),
    // ListContexts
    ("SELECT uri FROM context ORDER BY id", 0),
];

#[derive(Debug, Clone, Copy)]
struct Slot {
    sql: &'static str,
    arity: usize,
    handle: Option<HandleId>,
}

/// The lazily compiled canonical statements of one store
#[derive(Debug)]
pub struct PreparedStatements {
    slots: Vec<Slot>,
}

impl PreparedStatements {
    pub fn new() -> Self {
        Self {
            slots: STATEMENTS
                .iter()
                .map(|&(sql, arity)| Slot { sql, arity, handle: None })
                .collect(),
        }
    }

    /// Get a ready-to-bind handle, compiling it on first use
    pub fn get(&mut self, session: &mut Session, kind: PreparedKind) -> Result<HandleId> {
        let slot = &mut self.slots[kind.slot()];
        match slot.handle {
            Some(handle) => {
                session.reset(handle);
                Ok(handle)
            }
            None => {
                tracing::debug!(?kind, sql = slot.sql, "compiling canonical statement");
                let handle = session.prepare(slot.sql)?;
                slot.handle = Some(handle);
                Ok(handle)
            }
        }
    }

    pub fn arity(&self, kind: PreparedKind) -> usize {
        self.slots[kind.slot()].arity
    }

    pub fn is_compiled(&self, kind: PreparedKind) -> bool {
        self.slots[kind.slot()].handle.is_some()
    }

    /// Number of slots compiled so far
    pub fn compiled(&self) -> usize {
        self.slots.iter().filter(|slot| slot.handle.is_some()).count()
    }
}

impl Default for PreparedStatements {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shape::{ObjectKind, SubjectKind};
    use crate::storage::schema;

    fn session() -> Session {
        let session = Session::open_in_memory(64).unwrap();
        for stmt in schema::all_schema_statements() {
            session.execute_batch(stmt).unwrap();
        }
        session
    }

    #[test]
    fn test_select_triple_matches_shape() {
        let prepared = PreparedStatements::new();
        for subject in [SubjectKind::Uri, SubjectKind::Blank] {
            for object in [ObjectKind::Uri, ObjectKind::Blank, ObjectKind::Literal] {
                for has_context in [true, false] {
                    let kind = PreparedKind::SelectTriple(ExactShape::new(subject, object, has_context));
                    let sql = prepared.slots[kind.slot()].sql;

                    let subject_column = match subject {
                        SubjectKind::Uri => "r.s_uri = ?",
                        SubjectKind::Blank => "r.s_blank = ?",
                    };
                    let object_column = match object {
                        ObjectKind::Uri => "r.o_uri = ?",
                        ObjectKind::Blank => "r.o_blank = ?",
                        ObjectKind::Literal => "r.o_literal = ?",
                    };
                    let context_column = if has_context { "r.c_uri = ?" } else { "r.c_uri IS NULL" };

                    assert!(sql.contains(subject_column), "{}", sql);
                    assert!(sql.contains(object_column), "{}", sql);
                    assert!(sql.ends_with(context_column), "{}", sql);
                    assert_eq!(prepared.arity(kind), sql.matches('?').count());
                    assert_eq!(prepared.arity(kind), if has_context { 4 } else { 3 });
                }
            }
        }
    }

    #[test]
    fn test_arity_matches_placeholders() {
        for (sql, arity) in STATEMENTS {
            assert_eq!(sql.matches('?').count(), arity, "{}", sql);
        }
    }

    #[test]
    fn test_every_statement_compiles() {
        let mut session = session();
        let mut prepared = PreparedStatements::new();
        for (sql, _) in STATEMENTS {
            assert!(session.prepare(sql).is_ok(), "{}", sql);
        }
        prepared.get(&mut session, PreparedKind::CountTriples).unwrap();
        assert_eq!(prepared.compiled(), 1);
    }

    #[test]
    fn test_get_is_lazy_and_reuses_handle() {
        let mut session = session();
        let mut prepared = PreparedStatements::new();
        assert_eq!(prepared.compiled(), 0);

        let first = prepared.get(&mut session, PreparedKind::GetResourceId).unwrap();
        session.bind_text(first, 1, "http://a");
        let second = prepared.get(&mut session, PreparedKind::GetResourceId).unwrap();
        assert_eq!(first, second);
        assert_eq!(prepared.compiled(), 1);
        assert_eq!(session.handle_count(), 1);
    }
}
