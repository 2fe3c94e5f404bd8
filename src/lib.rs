//! # sqltriple - Relational statement store for labeled graphs
//!
//! Maps subject/predicate/object statements, optionally grouped by a
//! context, onto a fixed relational schema in SQLite.
//!
//! sqltriple provides:
//! - A node model (URIs, blank nodes, literals) with N-Triples term syntax
//! - Find-or-insert of statements with exactly-once semantics
//! - Pattern search compiled to one of 72 SQL query shapes
//! - A lease pool so concurrently open cursors never share a statement
//! - A generation-based identifier cache for URI resolution

pub mod node;
pub mod cache;
pub mod shape;
pub mod storage;
pub mod bridge;
pub mod ntriples;
pub mod config;
pub mod ui;

// Re-exports for convenient access
pub use node::{Literal, Node, NodeId, Pattern, Statement, Subject};
pub use cache::IdentifierCache;
pub use bridge::GraphStore;
pub use storage::{Match, PatternSearchCursor, SqliteStore, StoreOptions};

/// Result type alias for sqltriple operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for sqltriple operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Invalid node: {0}")]
    InvalidNode(String),

    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Corrupt row: {0}")]
    CorruptRow(String),

    /// A backend failure reported at the public mutation boundary
    #[error("Store error while {operation}: {source}")]
    Store {
        operation: &'static str,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Wrap an error raised underneath a public store operation
    pub fn store(operation: &'static str, source: Error) -> Self {
        Error::Store {
            operation,
            source: Box::new(source),
        }
    }
}
