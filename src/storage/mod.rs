//! Storage Layer - SQLite-backed persistence
//!
//! System of record is SQLite with tables:
//! - resource(id, uri)
//! - context(id, uri)
//! - bnode(id, name)
//! - literal(id, val, language, datatype)
//! - triple(id, s_uri, s_blank, p_uri, o_uri, o_blank, o_literal, c_uri)
//!
//! Every node table hands out monotonically increasing ids that are never
//! reused, so ids can be cached for the lifetime of a store.

pub mod schema;
pub mod session;
pub mod prepared;
pub mod query_builder;
pub mod pool;
pub mod finder;
pub mod cursor;
pub mod sqlite;

pub use cursor::{CursorState, Match, PatternSearchCursor};
pub use sqlite::{SqliteStore, StoreOptions, StoreStats};
