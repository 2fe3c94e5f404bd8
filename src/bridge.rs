//! Host bridge - the capability surface graph hosts program against

use crate::node::{Node, NodeId, Pattern, Statement};
use crate::storage::{Match, PatternSearchCursor, SqliteStore};
use crate::Result;

/// What a graph host needs from a statement store
pub trait GraphStore {
    type Cursor: Iterator<Item = Result<Match>>;

    /// Get the id of `node`, inserting it if needed
    fn resolve_or_create(&self, node: &Node) -> Result<NodeId>;

    /// Find `statement` in `context`, inserting it when `create` is set
    fn find(&self, context: Option<&str>, statement: &Statement, create: bool) -> Result<Option<i64>>;

    /// Iterate statements matching `pattern`
    fn search(&self, pattern: Pattern, context: Option<&str>) -> Self::Cursor;
}

impl GraphStore for SqliteStore {
    type Cursor = PatternSearchCursor;

    fn resolve_or_create(&self, node: &Node) -> Result<NodeId> {
        SqliteStore::resolve_or_create(self, node)
    }

    fn find(&self, context: Option<&str>, statement: &Statement, create: bool) -> Result<Option<i64>> {
        SqliteStore::find(self, context, statement, create)
    }

    fn search(&self, pattern: Pattern, context: Option<&str>) -> Self::Cursor {
        SqliteStore::search(self, pattern, context)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{Literal, Subject};

    /// Copy every statement of `source` matching `pattern` into `target`
    fn copy_matching<S: GraphStore, T: GraphStore>(source: &S, target: &T, pattern: Pattern) -> Result<usize> {
        let mut copied = 0;
        for found in source.search(pattern, None) {
            let found = found?;
            target.find(found.context.as_deref(), &found.statement, true)?;
            copied += 1;
        }
        Ok(copied)
    }

    #[test]
    fn test_generic_host_code() {
        let source = SqliteStore::open_in_memory().unwrap();
        let target = SqliteStore::open_in_memory().unwrap();

        let knows = Statement::new(Subject::uri("http://alice"), "http://knows", Node::uri("http://bob"));
        let name = Statement::new(
            Subject::uri("http://alice"),
            "http://name",
            Node::literal(Literal::with_language("Alice", "en")),
        );
        GraphStore::find(&source, Some("http://g"), &knows, true).unwrap();
        GraphStore::find(&source, None, &name, true).unwrap();

        let copied = copy_matching(&source, &target, Pattern::any().with_subject(Subject::uri("http://alice"))).unwrap();
        assert_eq!(copied, 2);
        assert!(target.find(Some("http://g"), &knows, false).unwrap().is_some());
        assert!(target.find(None, &name, false).unwrap().is_some());

        let id = GraphStore::resolve_or_create(&target, &Node::uri("http://alice")).unwrap();
        assert_eq!(id, NodeId::Resource(1));
    }
}
