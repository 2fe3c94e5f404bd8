//! Database session - the narrow contract the statement engine talks to
//!
//! A session owns one SQLite connection and one long-lived transaction.
//! Callers work with *handles*: a handle is a statement compiled from SQL
//! text plus its own bound parameters and its own open row cursor. Two
//! handles never share parameters or row position, even when they were
//! compiled from identical SQL.

use std::collections::VecDeque;
use std::path::Path;
use rusqlite::{Connection, OptionalExtension, params_from_iter};
use rusqlite::types::Value;
use crate::Result;

/// Index of a compiled statement inside a [`Session`]
pub type HandleId = usize;

/// One fetched result row.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    values: Vec<Value>,
}

impl Row {
    pub fn is_null(&self, column: usize) -> bool {
        matches!(self.values.get(column), None | Some(Value::Null))
    }

    pub fn get_text(&self, column: usize) -> Option<&str> {
        match self.values.get(column) {
            Some(Value::Text(text)) => Some(text),
            _ => None,
        }
    }

    pub fn get_i64(&self, column: usize) -> Option<i64> {
        match self.values.get(column) {
            Some(Value::Integer(value)) => Some(*value),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[derive(Debug)]
struct Handle {
    sql: String,
    params: Vec<Value>,
    rows: VecDeque<Row>,
}

/// A connection plus the handles compiled against it
pub struct Session {
    conn: Connection,
    handles: Vec<Handle>,
}

impl Session {
    /// Open a database file (creates if doesn't exist)
    pub fn open(path: &Path, statement_cache_capacity: usize) -> Result<Self> {
        Self::from_connection(Connection::open(path)?, statement_cache_capacity)
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory(statement_cache_capacity: usize) -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?, statement_cache_capacity)
    }

    fn from_connection(conn: Connection, statement_cache_capacity: usize) -> Result<Self> {
        conn.set_prepared_statement_cache_capacity(statement_cache_capacity);
        conn.execute_batch("PRAGMA foreign_keys = ON")?;
        Ok(Self {
            conn,
            handles: Vec::new(),
        })
    }

    // ========== Handles ==========

    /// Compile `sql` and return a fresh handle for it
    pub fn prepare(&mut self, sql: &str) -> Result<HandleId> {
        // compiling validates the SQL and parks the statement in the
        // connection's statement cache for later executions
        self.conn.prepare_cached(sql)?;
        self.handles.push(Handle {
            sql: sql.to_string(),
            params: Vec::new(),
            rows: VecDeque::new(),
        });
        Ok(self.handles.len() - 1)
    }

    /// Clear bound parameters and any open cursor
    pub fn reset(&mut self, handle: HandleId) {
        let handle = &mut self.handles[handle];
        handle.params.clear();
        handle.rows.clear();
    }

    pub fn handle_count(&self) -> usize {
        self.handles.len()
    }

    /// Bind a parameter; `position` is 1-based
    fn bind(&mut self, handle: HandleId, position: usize, value: Value) {
        assert!(position > 0, "parameter positions start at 1");
        let params = &mut self.handles[handle].params;
        if params.len() < position {
            params.resize(position, Value::Null);
        }
        params[position - 1] = value;
    }

    pub fn bind_text(&mut self, handle: HandleId, position: usize, value: &str) {
        self.bind(handle, position, Value::Text(value.to_string()));
    }

    pub fn bind_int(&mut self, handle: HandleId, position: usize, value: i64) {
        self.bind(handle, position, Value::Integer(value));
    }

    pub fn bind_null(&mut self, handle: HandleId, position: usize) {
        self.bind(handle, position, Value::Null);
    }

    // ========== Execution ==========

    /// Execute a statement that returns no rows
    pub fn execute(&mut self, handle: HandleId) -> Result<usize> {
        let handle = &self.handles[handle];
        let mut stmt = self.conn.prepare_cached(&handle.sql)?;
        let changed = stmt.execute(params_from_iter(handle.params.iter()))?;
        Ok(changed)
    }

    /// Fetch the integer in the first column of the first row, if any
    pub fn unique_result(&mut self, handle: HandleId) -> Result<Option<i64>> {
        let handle = &self.handles[handle];
        let mut stmt = self.conn.prepare_cached(&handle.sql)?;
        let value = stmt
            .query_row(params_from_iter(handle.params.iter()), |row| row.get::<_, Option<i64>>(0))
            .optional()?;
        Ok(value.flatten())
    }

    /// Run the query and position a forward-only cursor before its first row.
    ///
    /// One execution's rows are held until fetched, so a query whose result
    /// can grow with the store must carry a `LIMIT` and be re-run per page.
    pub fn open_cursor(&mut self, handle: HandleId) -> Result<()> {
        let state = &self.handles[handle];
        let mut stmt = self.conn.prepare_cached(&state.sql)?;
        let columns = stmt.column_count();
        let mut rows = stmt.query(params_from_iter(state.params.iter()))?;

        let mut fetched = VecDeque::new();
        while let Some(row) = rows.next()? {
            let values = (0..columns)
                .map(|i| row.get::<_, Value>(i))
                .collect::<rusqlite::Result<Vec<_>>>()?;
            fetched.push_back(Row { values });
        }
        drop(rows);
        drop(stmt);

        self.handles[handle].rows = fetched;
        Ok(())
    }

    /// Advance the handle's cursor
    pub fn fetch(&mut self, handle: HandleId) -> Option<Row> {
        self.handles[handle].rows.pop_front()
    }

    // ========== Transactions ==========

    /// Start the session transaction unless one is already running
    pub fn begin(&self) -> Result<()> {
        if self.conn.is_autocommit() {
            self.conn.execute_batch("BEGIN")?;
        }
        Ok(())
    }

    /// Commit and immediately start a new transaction
    pub fn commit_retaining(&self) -> Result<()> {
        if !self.conn.is_autocommit() {
            self.conn.execute_batch("COMMIT")?;
        }
        self.begin()
    }

    /// Roll back and immediately start a new transaction
    pub fn rollback_retaining(&self) -> Result<()> {
        if !self.conn.is_autocommit() {
            self.conn.execute_batch("ROLLBACK")?;
        }
        self.begin()
    }

    /// Commit without starting a new transaction
    pub fn commit(&self) -> Result<()> {
        if !self.conn.is_autocommit() {
            self.conn.execute_batch("COMMIT")?;
        }
        Ok(())
    }

    /// Open a named savepoint inside the session transaction
    pub fn savepoint(&self, name: &str) -> Result<()> {
        self.conn.execute_batch(&format!("SAVEPOINT {}", name))?;
        Ok(())
    }

    /// Keep everything done since the savepoint
    pub fn release_savepoint(&self, name: &str) -> Result<()> {
        self.conn.execute_batch(&format!("RELEASE {}", name))?;
        Ok(())
    }

    /// Undo everything done since the savepoint and drop it
    pub fn rollback_to_savepoint(&self, name: &str) -> Result<()> {
        self.conn
            .execute_batch(&format!("ROLLBACK TO {name}; RELEASE {name}"))?;
        Ok(())
    }

    // ========== Ad-hoc SQL ==========

    /// Run one or more statements that return nothing (schema, pragmas)
    pub fn execute_batch(&self, sql: &str) -> Result<()> {
        self.conn.execute_batch(sql)?;
        Ok(())
    }

    /// Run a `SELECT COUNT(*)`-style query
    pub fn query_count(&self, sql: &str) -> Result<usize> {
        let count: i64 = self.conn.query_row(sql, [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> Session {
        let session = Session::open_in_memory(16).unwrap();
        session
            .execute_batch("CREATE TABLE t (id INTEGER PRIMARY KEY AUTOINCREMENT, name TEXT)")
            .unwrap();
        session
    }

    #[test]
    fn test_unique_result() {
        let mut session = session();
        let insert = session.prepare("INSERT INTO t (name) VALUES (?) RETURNING id").unwrap();
        session.bind_text(insert, 1, "a");
        assert_eq!(session.unique_result(insert).unwrap(), Some(1));

        let select = session.prepare("SELECT id FROM t WHERE name = ?").unwrap();
        session.bind_text(select, 1, "missing");
        assert_eq!(session.unique_result(select).unwrap(), None);
    }

    #[test]
    fn test_handles_keep_separate_cursors() {
        let mut session = session();
        session.execute_batch("INSERT INTO t (name) VALUES ('a'), ('b'), ('c')").unwrap();

        let sql = "SELECT name FROM t WHERE id >= ? ORDER BY id";
        let first = session.prepare(sql).unwrap();
        let second = session.prepare(sql).unwrap();

        session.bind_int(first, 1, 1);
        session.open_cursor(first).unwrap();
        session.bind_int(second, 1, 3);
        session.open_cursor(second).unwrap();

        assert_eq!(session.fetch(first).unwrap().get_text(0), Some("a"));
        assert_eq!(session.fetch(second).unwrap().get_text(0), Some("c"));
        assert_eq!(session.fetch(first).unwrap().get_text(0), Some("b"));
        assert!(session.fetch(second).is_none());
    }

    #[test]
    fn test_row_access() {
        let mut session = session();
        session.execute_batch("INSERT INTO t (name) VALUES (NULL)").unwrap();
        let select = session.prepare("SELECT id, name FROM t").unwrap();
        session.open_cursor(select).unwrap();

        let row = session.fetch(select).unwrap();
        assert_eq!(row.len(), 2);
        assert_eq!(row.get_i64(0), Some(1));
        assert!(row.is_null(1));
        assert_eq!(row.get_text(1), None);
        assert!(row.is_null(5));
    }

    #[test]
    fn test_reset_clears_cursor() {
        let mut session = session();
        session.execute_batch("INSERT INTO t (name) VALUES ('a')").unwrap();
        let select = session.prepare("SELECT name FROM t").unwrap();
        session.open_cursor(select).unwrap();
        session.reset(select);
        assert!(session.fetch(select).is_none());
    }

    #[test]
    fn test_invalid_sql_fails_to_prepare() {
        let mut session = session();
        assert!(session.prepare("SELECT nope FROM missing_table").is_err());
    }

    #[test]
    fn test_rollback_retaining() {
        let mut session = session();
        session.begin().unwrap();
        let insert = session.prepare("INSERT INTO t (name) VALUES (?)").unwrap();
        session.bind_text(insert, 1, "gone");
        session.execute(insert).unwrap();
        session.rollback_retaining().unwrap();
        assert_eq!(session.query_count("SELECT COUNT(*) FROM t").unwrap(), 0);

        session.reset(insert);
        session.bind_text(insert, 1, "kept");
        session.execute(insert).unwrap();
        session.commit_retaining().unwrap();
        assert_eq!(session.query_count("SELECT COUNT(*) FROM t").unwrap(), 1);
    }

    #[test]
    fn test_savepoint_rollback_keeps_earlier_work() {
        let session = session();
        session.begin().unwrap();
        session.execute_batch("INSERT INTO t (name) VALUES ('before')").unwrap();

        session.savepoint("batch").unwrap();
        session.execute_batch("INSERT INTO t (name) VALUES ('inside')").unwrap();
        session.rollback_to_savepoint("batch").unwrap();

        assert_eq!(session.query_count("SELECT COUNT(*) FROM t").unwrap(), 1);
        session.commit().unwrap();
        assert_eq!(session.query_count("SELECT COUNT(*) FROM t WHERE name = 'before'").unwrap(), 1);
    }
}
