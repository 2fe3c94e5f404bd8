//! Lease pool for pattern search statements
//!
//! Every open cursor needs its own compiled statement: two cursors running
//! the same shape must not share bound parameters or row position. The pool
//! keeps, per pattern shape, a growing list of handles and who holds each.

use crate::Result;
use crate::shape::PATTERN_SHAPE_COUNT;
use super::session::{HandleId, Session};

/// Opaque identity of a lease holder
pub type CursorId = u64;

#[derive(Debug, Clone, Copy)]
struct PoolEntry {
    handle: HandleId,
    owner: Option<CursorId>,
}

#[derive(Debug, Default)]
struct ShapeSlot {
    /// SQL recorded the first time the shape was requested
    sql: Option<String>,
    entries: Vec<PoolEntry>,
}

/// Per-shape pool of leased statement handles
#[derive(Debug)]
pub struct StatementPool {
    slots: Vec<ShapeSlot>,
}

impl StatementPool {
    pub fn new() -> Self {
        Self {
            slots: (0..PATTERN_SHAPE_COUNT).map(|_| ShapeSlot::default()).collect(),
        }
    }

    /// Lease a handle for `shape` to `owner`.
    ///
    /// An entry already leased by `owner` is returned as is. Otherwise the
    /// first free entry is reset and leased, and if there is none a new
    /// handle is compiled from `sql`.
    ///
    /// # Panics
    ///
    /// Panics when a new handle is needed and `sql` is `None`, or when `sql`
    /// differs from the text first recorded for `shape`.
    pub fn acquire(
        &mut self,
        session: &mut Session,
        shape: usize,
        owner: CursorId,
        sql: Option<&str>,
    ) -> Result<HandleId> {
        let slot = &mut self.slots[shape];

        if let (Some(recorded), Some(sql)) = (&slot.sql, sql) {
            assert_eq!(recorded, sql, "shape {} was requested with different SQL", shape);
        }

        let mut free = None;
        for (i, entry) in slot.entries.iter().enumerate() {
            match entry.owner {
                Some(current) if current == owner => return Ok(entry.handle),
                None if free.is_none() => free = Some(i),
                _ => {}
            }
        }

        if let Some(i) = free {
            let entry = &mut slot.entries[i];
            entry.owner = Some(owner);
            session.reset(entry.handle);
            return Ok(entry.handle);
        }

        let sql = sql.unwrap_or_else(|| panic!("no SQL to compile a new handle for shape {}", shape));
        let handle = session.prepare(sql)?;
        if slot.sql.is_none() {
            slot.sql = Some(sql.to_string());
        }
        slot.entries.push(PoolEntry {
            handle,
            owner: Some(owner),
        });
        tracing::debug!(shape, handles = slot.entries.len(), "statement pool grew");
        Ok(handle)
    }

    /// Give back the handle `owner` holds for `shape`.
    ///
    /// # Panics
    ///
    /// Panics if `owner` holds no handle for `shape`.
    pub fn release(&mut self, shape: usize, owner: CursorId) {
        let entry = self.slots[shape]
            .entries
            .iter_mut()
            .find(|entry| entry.owner == Some(owner))
            .unwrap_or_else(|| panic!("cursor {} holds no lease on shape {}", owner, shape));
        entry.owner = None;
    }

    /// Number of handles compiled for `shape`
    pub fn handles(&self, shape: usize) -> usize {
        self.slots[shape].entries.len()
    }

    pub fn outstanding_leases(&self) -> usize {
        self.slots
            .iter()
            .flat_map(|slot| &slot.entries)
            .filter(|entry| entry.owner.is_some())
            .count()
    }

    pub fn is_idle(&self) -> bool {
        self.outstanding_leases() == 0
    }
}

impl Default for StatementPool {
    fn default() -> Self {
        Self::new()
    }
}
