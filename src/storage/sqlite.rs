//! SQLite storage implementation

use std::cell::RefCell;
use std::path::Path;
use std::rc::Rc;
use crate::cache::{DEFAULT_TRIM_THRESHOLD, IdentifierCache};
use crate::node::{Node, NodeId, Pattern, Statement};
use crate::shape::PATTERN_SHAPE_COUNT;
use crate::{Error, Result};
use super::cursor::PatternSearchCursor;
use super::finder::StatementFinder;
use super::pool::{CursorId, StatementPool};
use super::prepared::{PreparedKind, PreparedStatements, SLOT_COUNT};
use super::schema;
use super::session::Session;

/// Default capacity of the connection's compiled statement cache
pub const DEFAULT_STATEMENT_CACHE_CAPACITY: usize = 128;

/// Every canonical statement plus one search statement per pattern shape.
/// A smaller cache evicts compiled statements and recompiles them.
pub const MIN_STATEMENT_CACHE_CAPACITY: usize = SLOT_COUNT + PATTERN_SHAPE_COUNT;

const BATCH_SAVEPOINT: &str = "add_statements";
const MUTATION_SAVEPOINT: &str = "mutation";

/// Options applied when a store is opened
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreOptions {
    /// Delete every existing statement and node on open
    pub new: bool,
    /// Refresh the query planner's index statistics on open
    pub update_index_stats: bool,
    /// Entries kept by the URI cache after a trim
    pub cache_threshold: usize,
    pub statement_cache_capacity: usize,
}

impl StoreOptions {
    pub fn validate(&self) -> Result<()> {
        if self.cache_threshold == 0 {
            return Err(Error::Config("cache_threshold must be positive".to_string()));
        }
        if self.statement_cache_capacity < MIN_STATEMENT_CACHE_CAPACITY {
            return Err(Error::Config(format!(
                "statement_cache_capacity must be at least {}, got {}",
                MIN_STATEMENT_CACHE_CAPACITY, self.statement_cache_capacity
            )));
        }
        Ok(())
    }
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            new: false,
            update_index_stats: false,
            cache_threshold: DEFAULT_TRIM_THRESHOLD,
            statement_cache_capacity: DEFAULT_STATEMENT_CACHE_CAPACITY,
        }
    }
}

/// State shared between a store and its open cursors
pub(crate) struct StoreCore {
    pub(crate) session: Session,
    pub(crate) prepared: PreparedStatements,
    pub(crate) pool: StatementPool,
    pub(crate) resources: IdentifierCache<String, i64>,
    next_cursor_id: CursorId,
}

impl StoreCore {
    fn finder(&mut self) -> StatementFinder<'_> {
        StatementFinder::new(&mut self.session, &mut self.prepared, &mut self.resources)
    }

    /// Resolve `context` and find the statement in it
    fn find(&mut self, context: Option<&str>, statement: &Statement, create: bool) -> Result<Option<i64>> {
        let mut finder = self.finder();
        let context_id = match context {
            Some(uri) => match finder.context_id(uri, create)? {
                Some(id) => Some(id),
                None => return Ok(None),
            },
            None => None,
        };
        finder.find(context_id, statement, create)
    }

    fn scalar(&mut self, kind: PreparedKind) -> Result<i64> {
        let handle = self.prepared.get(&mut self.session, kind)?;
        Ok(self.session.unique_result(handle)?.unwrap_or(0))
    }

    fn delete_row(&mut self, id: i64) -> Result<bool> {
        let handle = self.prepared.get(&mut self.session, PreparedKind::DeleteTriple)?;
        self.session.bind_int(handle, 1, id);
        Ok(self.session.execute(handle)? > 0)
    }

    /// Run `f` under a savepoint, undoing all of its writes if it fails
    fn atomically<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        self.session.savepoint(MUTATION_SAVEPOINT)?;
        match f(self) {
            Ok(value) => {
                self.session.release_savepoint(MUTATION_SAVEPOINT)?;
                Ok(value)
            }
            Err(e) => {
                self.undo(MUTATION_SAVEPOINT)?;
                Err(e)
            }
        }
    }

    fn undo(&mut self, savepoint: &str) -> Result<()> {
        self.session.rollback_to_savepoint(savepoint)?;
        // rolled back ids may be handed out again
        self.resources.clear();
        Ok(())
    }
}

/// Log a failure at the public mutation boundary and tag it with the operation
fn at_boundary<T>(operation: &'static str, result: Result<T>) -> Result<T> {
    result.map_err(|e| {
        tracing::error!(operation, error = %e, "store operation failed");
        Error::store(operation, e)
    })
}

/// SQLite-backed statement store
///
/// The store runs inside one long-lived transaction: nothing is durable
/// until [`commit`](Self::commit) or [`close`](Self::close). Dropping a
/// store without either discards uncommitted work.
pub struct SqliteStore {
    core: Rc<RefCell<StoreCore>>,
}

impl SqliteStore {
    /// Open a database file (creates if doesn't exist)
    pub fn open(path: &Path) -> Result<Self> {
        Self::open_with(path, &StoreOptions::default())
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self> {
        Self::open_in_memory_with(&StoreOptions::default())
    }

    pub fn open_with(path: &Path, options: &StoreOptions) -> Result<Self> {
        options.validate()?;
        let session = Session::open(path, options.statement_cache_capacity)?;
        tracing::info!(path = %path.display(), "opened statement store");
        Self::initialize(session, options)
    }

    pub fn open_in_memory_with(options: &StoreOptions) -> Result<Self> {
        options.validate()?;
        Self::initialize(Session::open_in_memory(options.statement_cache_capacity)?, options)
    }

    /// Provision the schema, apply open options and start the transaction
    fn initialize(session: Session, options: &StoreOptions) -> Result<Self> {
        for stmt in schema::all_schema_statements() {
            session.execute_batch(stmt)?;
        }
        if options.new {
            for stmt in schema::clear_statements() {
                session.execute_batch(&stmt)?;
            }
            tracing::info!("cleared existing statements");
        }
        if options.update_index_stats {
            session.execute_batch("ANALYZE")?;
        }
        session.begin()?;

        let core = StoreCore {
            session,
            prepared: PreparedStatements::new(),
            pool: StatementPool::new(),
            resources: IdentifierCache::new(options.cache_threshold),
            next_cursor_id: 0,
        };
        Ok(Self {
            core: Rc::new(RefCell::new(core)),
        })
    }

    // ========== Node Operations ==========

    /// Get the id of `node`, inserting it if needed
    pub fn resolve_or_create(&self, node: &Node) -> Result<NodeId> {
        self.core
            .borrow_mut()
            .finder()
            .resolve(node, true)?
            .ok_or_else(|| Error::CorruptRow(format!("{} was not created", node)))
    }

    /// Get the id of `node` if it is stored
    pub fn resolve(&self, node: &Node) -> Result<Option<NodeId>> {
        self.core.borrow_mut().finder().resolve(node, false)
    }

    // ========== Statement Operations ==========

    /// Find the id of `statement` in `context` (`None` is the default
    /// graph), inserting it when `create` is set
    pub fn find(&self, context: Option<&str>, statement: &Statement, create: bool) -> Result<Option<i64>> {
        self.core.borrow_mut().find(context, statement, create)
    }

    /// Check whether `statement` is stored in any context
    pub fn contains(&self, statement: &Statement) -> Result<bool> {
        let mut cursor = self.search(Pattern::from(statement), None);
        cursor.next().transpose().map(|found| found.is_some())
    }

    /// Add a statement, returning its id. A failure leaves no node behind.
    pub fn add_statement(&self, context: Option<&str>, statement: &Statement) -> Result<i64> {
        let result = self.core.borrow_mut().atomically(|core| {
            core.find(context, statement, true)?
                .ok_or_else(|| Error::CorruptRow(format!("{} was not inserted", statement)))
        });
        at_boundary("adding a statement", result)
    }

    /// Add every statement or none of them, returning how many were new.
    ///
    /// Commits once on success. On the first failure everything this call
    /// did is rolled back. `statements` may read from this store, e.g. a
    /// cursor over another context.
    pub fn add_statements<I>(&self, context: Option<&str>, statements: I) -> Result<usize>
    where
        I: IntoIterator<Item = Statement>,
    {
        let result = (|| -> Result<usize> {
            let before = {
                let mut core = self.core.borrow_mut();
                let before = core.scalar(PreparedKind::CountTriples)?;
                core.session.savepoint(BATCH_SAVEPOINT)?;
                before
            };
            // borrowed per statement, never while the iterator runs
            for statement in statements {
                let mut core = self.core.borrow_mut();
                if let Err(e) = core.find(context, &statement, true) {
                    core.undo(BATCH_SAVEPOINT)?;
                    return Err(e);
                }
            }
            let mut core = self.core.borrow_mut();
            core.session.release_savepoint(BATCH_SAVEPOINT)?;
            core.session.commit_retaining()?;
            let after = core.scalar(PreparedKind::CountTriples)?;
            Ok((after - before) as usize)
        })();

        if let Ok(added) = result {
            tracing::debug!(added, "added statement batch");
        }
        at_boundary("adding statements", result)
    }

    /// Remove `statement` from `context`. Returns whether it was stored.
    pub fn remove_statement(&self, context: Option<&str>, statement: &Statement) -> Result<bool> {
        let result = self.core.borrow_mut().atomically(|core| {
            match core.find(context, statement, false)? {
                Some(id) => core.delete_row(id),
                None => Ok(false),
            }
        });
        at_boundary("removing a statement", result)
    }

    /// Delete a statement by id. Returns whether a row was deleted.
    pub fn delete(&self, id: i64) -> Result<bool> {
        let result = self.core.borrow_mut().atomically(|core| core.delete_row(id));
        at_boundary("deleting a statement", result)
    }

    /// Iterate the statements matching `pattern`, within `context` if given
    pub fn search(&self, pattern: Pattern, context: Option<&str>) -> PatternSearchCursor {
        let id = {
            let mut core = self.core.borrow_mut();
            core.next_cursor_id += 1;
            core.next_cursor_id
        };
        PatternSearchCursor::new(Rc::clone(&self.core), id, pattern, context.map(String::from))
    }

    /// Iterate every statement, within `context` if given
    pub fn serialise(&self, context: Option<&str>) -> PatternSearchCursor {
        self.search(Pattern::any(), context)
    }

    /// Number of stored statements across all contexts
    pub fn count(&self) -> Result<usize> {
        Ok(self.core.borrow_mut().scalar(PreparedKind::CountTriples)? as usize)
    }

    /// Every context URI, in creation order
    pub fn list_contexts(&self) -> Result<impl Iterator<Item = String>> {
        let mut guard = self.core.borrow_mut();
        let core = &mut *guard;
        let handle = core.prepared.get(&mut core.session, PreparedKind::ListContexts)?;
        core.session.open_cursor(handle)?;

        let mut contexts = Vec::new();
        while let Some(row) = core.session.fetch(handle) {
            if let Some(uri) = row.get_text(0) {
                contexts.push(uri.to_string());
            }
        }
        Ok(contexts.into_iter())
    }

    // ========== Transactions ==========

    pub fn commit(&self) -> Result<()> {
        self.core.borrow().session.commit_retaining()
    }

    /// Discard everything since the last commit
    pub fn rollback(&self) -> Result<()> {
        let mut core = self.core.borrow_mut();
        core.session.rollback_retaining()?;
        // rolled back ids may be handed out again
        core.resources.clear();
        Ok(())
    }

    /// Refresh the query planner's index statistics
    pub fn update_index_stats(&self) -> Result<()> {
        self.core.borrow().session.execute_batch("ANALYZE")
    }

    /// Commit and close the store.
    ///
    /// # Panics
    ///
    /// Panics if a search cursor is still open.
    pub fn close(self) -> Result<()> {
        let core = self.core.borrow();
        assert!(
            core.pool.is_idle(),
            "store closed with {} open cursors",
            core.pool.outstanding_leases()
        );
        core.session.commit()?;
        tracing::info!("closed statement store");
        Ok(())
    }

    /// Get database statistics
    pub fn stats(&self) -> Result<StoreStats> {
        let core = self.core.borrow();
        let count = |table: &str| core.session.query_count(&format!("SELECT COUNT(*) FROM {}", table));
        let pooled: usize = (0..PATTERN_SHAPE_COUNT)
            .map(|shape| core.pool.handles(shape))
            .sum();

        Ok(StoreStats {
            statements: count("triple")?,
            resources: count("resource")?,
            blank_nodes: count("bnode")?,
            literals: count("literal")?,
            contexts: count("context")?,
            cached_identifiers: core.resources.len(),
            compiled_statements: core.prepared.compiled() + pooled,
        })
    }
}

/// Row counts and engine state
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct StoreStats {
    pub statements: usize,
    pub resources: usize,
    pub blank_nodes: usize,
    pub literals: usize,
    pub contexts: usize,
    pub cached_identifiers: usize,
    pub compiled_statements: usize,
}

impl std::fmt::Display for StoreStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Store Statistics:")?;
        writeln!(f, "  Statements: {}", self.statements)?;
        writeln!(f, "  Resources: {}", self.resources)?;
        writeln!(f, "  Blank nodes: {}", self.blank_nodes)?;
        writeln!(f, "  Literals: {}", self.literals)?;
        writeln!(f, "  Contexts: {}", self.contexts)?;
        writeln!(f, "  Cached identifiers: {}", self.cached_identifiers)?;
        writeln!(f, "  Compiled statements: {}", self.compiled_statements)
    }
}
