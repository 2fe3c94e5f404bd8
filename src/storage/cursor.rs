//! Pattern search cursors
//!
//! A cursor is lazy: nothing touches the database until the first call to
//! `next`. At that point the query is synthesized, a statement handle is
//! leased from the pool under the cursor's own id, bound and executed.
//! The lease is held until the cursor is closed or dropped.
//!
//! Rows arrive one page at a time. When a full page has been consumed the
//! same handle is re-executed for the rows after the last id returned, so
//! memory stays bounded by the page size however large the store is.

use std::cell::RefCell;
use std::rc::Rc;
use serde::Serialize;
use crate::node::{Literal, Node, Pattern, Statement, Subject};
use crate::{Error, Result};
use super::pool::CursorId;
use super::query_builder::{Column, SEARCH_PAGE_SIZE, build_search};
use super::session::{HandleId, Row};
use super::sqlite::StoreCore;

/// One statement produced by a search
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Match {
    /// Triple row id
    pub id: i64,
    pub statement: Statement,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorState {
    Unstarted,
    Positioned,
    Exhausted,
    Finished,
}

/// Forward-only iterator over the statements matching a pattern
pub struct PatternSearchCursor {
    store: Option<Rc<RefCell<StoreCore>>>,
    id: CursorId,
    pattern: Pattern,
    context: Option<String>,
    state: CursorState,
    /// (shape, handle) leased from the pool
    lease: Option<(usize, HandleId)>,
    keyset_position: usize,
    last_id: i64,
    page_rows: usize,
}

impl PatternSearchCursor {
    pub(crate) fn new(store: Rc<RefCell<StoreCore>>, id: CursorId, pattern: Pattern, context: Option<String>) -> Self {
        Self {
            store: Some(store),
            id,
            pattern,
            context,
            state: CursorState::Unstarted,
            lease: None,
            keyset_position: 0,
            last_id: 0,
            page_rows: 0,
        }
    }

    pub fn state(&self) -> CursorState {
        self.state
    }

    pub fn pattern(&self) -> &Pattern {
        &self.pattern
    }

    pub fn context(&self) -> Option<&str> {
        self.context.as_deref()
    }

    /// Release the leased statement and the store. Idempotent.
    pub fn close(&mut self) {
        if let Some(store) = self.store.take() {
            if let Some((shape, handle)) = self.lease.take() {
                let mut core = store.borrow_mut();
                core.session.reset(handle);
                core.pool.release(shape, self.id);
            }
        }
        self.state = CursorState::Finished;
    }

    fn advance(&mut self) -> Result<Option<Match>> {
        let Some(store) = &self.store else {
            return Ok(None);
        };
        let mut guard = store.borrow_mut();
        let core = &mut *guard;

        let handle = match (self.state, self.lease) {
            (CursorState::Unstarted, _) => {
                let query = build_search(&self.pattern, self.context.as_deref());
                let handle = core
                    .pool
                    .acquire(&mut core.session, query.shape, self.id, Some(&query.sql))?;
                self.lease = Some((query.shape, handle));
                self.state = CursorState::Positioned;

                for (i, param) in query.params.iter().enumerate() {
                    core.session.bind_text(handle, i + 1, param);
                }
                self.keyset_position = query.keyset_position();
                core.session.bind_int(handle, self.keyset_position, self.last_id);
                core.session.open_cursor(handle)?;
                handle
            }
            (CursorState::Positioned, Some((_, handle))) => handle,
            _ => return Ok(None),
        };

        let mut row = core.session.fetch(handle);
        if row.is_none() && self.page_rows == SEARCH_PAGE_SIZE {
            core.session.bind_int(handle, self.keyset_position, self.last_id);
            core.session.open_cursor(handle)?;
            self.page_rows = 0;
            row = core.session.fetch(handle);
        }

        match row {
            Some(row) => {
                let found = row_to_match(&row)?;
                self.last_id = found.id;
                self.page_rows += 1;
                Ok(Some(found))
            }
            None => {
                self.state = CursorState::Exhausted;
                Ok(None)
            }
        }
    }
}

impl Iterator for PatternSearchCursor {
    type Item = Result<Match>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.advance() {
            Ok(found) => found.map(Ok),
            Err(e) => {
                self.close();
                Some(Err(e))
            }
        }
    }
}

impl Drop for PatternSearchCursor {
    fn drop(&mut self) {
        self.close();
    }
}

fn required<'r>(row: &'r Row, column: Column, what: &str) -> Result<&'r str> {
    row.get_text(column.index())
        .ok_or_else(|| Error::CorruptRow(format!("statement has no {}", what)))
}

/// Rebuild a statement from one search row: URI, then blank, then literal
fn row_to_match(row: &Row) -> Result<Match> {
    let id = row
        .get_i64(Column::StatementId.index())
        .ok_or_else(|| Error::CorruptRow("missing statement id".to_string()))?;

    let subject = if let Some(uri) = row.get_text(Column::SubjectUri.index()) {
        Subject::uri(uri)
    } else {
        Subject::blank(required(row, Column::SubjectBlank, "subject")?)
    };

    let predicate = required(row, Column::PredicateUri, "predicate")?;

    let object = if let Some(uri) = row.get_text(Column::ObjectUri.index()) {
        Node::uri(uri)
    } else if let Some(name) = row.get_text(Column::ObjectBlank.index()) {
        Node::blank(name)
    } else {
        let value = required(row, Column::ObjectLiteral, "object")?;
        let language = row.get_text(Column::ObjectLanguage.index()).map(String::from);
        let datatype = row.get_text(Column::ObjectDatatype.index()).map(String::from);
        Node::literal(Literal::new(value, language, datatype)?)
    };

    Ok(Match {
        id,
        statement: Statement::new(subject, predicate, object),
        context: row.get_text(Column::Context.index()).map(String::from),
    })
}
