//! Database schema definitions
//!
//! Every statement is idempotent (`IF NOT EXISTS`), so provisioning can run
//! on each open.

/// SQL to create the resource table (URIs)
pub const CREATE_RESOURCE_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS resource (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    uri TEXT NOT NULL UNIQUE
)
"#;

/// SQL to create the context table (graph labels)
pub const CREATE_CONTEXT_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS context (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    uri TEXT NOT NULL UNIQUE
)
"#;

/// SQL to create the blank node table
pub const CREATE_BNODE_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS bnode (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE
)
"#;

/// SQL to create the literal table
pub const CREATE_LITERAL_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS literal (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    val TEXT NOT NULL,
    language TEXT DEFAULT NULL,
    datatype INTEGER DEFAULT NULL REFERENCES resource (id),
    CHECK (language IS NULL OR datatype IS NULL)
)
"#;

/// SQL to create the triple table
///
/// Exactly one subject column and exactly one object column is set.
pub const CREATE_TRIPLE_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS triple (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    s_uri INTEGER REFERENCES resource (id),
    s_blank INTEGER REFERENCES bnode (id),
    p_uri INTEGER NOT NULL REFERENCES resource (id),
    o_uri INTEGER REFERENCES resource (id),
    o_blank INTEGER REFERENCES bnode (id),
    o_literal INTEGER REFERENCES literal (id),
    c_uri INTEGER DEFAULT NULL REFERENCES context (id),
    CHECK ((s_uri IS NOT NULL AND s_blank IS NULL) OR
           (s_uri IS NULL AND s_blank IS NOT NULL)),
    CHECK ((o_uri IS NOT NULL AND o_blank IS NULL AND o_literal IS NULL) OR
           (o_uri IS NULL AND o_blank IS NOT NULL AND o_literal IS NULL) OR
           (o_uri IS NULL AND o_blank IS NULL AND o_literal IS NOT NULL))
)
"#;

/// SQL to create indexes
///
/// SQLite treats NULLs as distinct in UNIQUE constraints, so literal and
/// triple uniqueness is enforced with expression indexes instead.
pub const CREATE_INDEXES: &[&str] = &[
    "CREATE UNIQUE INDEX IF NOT EXISTS uq_literal ON literal (val, coalesce(language, ''), coalesce(datatype, 0))",
    "CREATE UNIQUE INDEX IF NOT EXISTS uq_triple ON triple (coalesce(s_uri, 0), coalesce(s_blank, 0), p_uri, coalesce(o_uri, 0), coalesce(o_blank, 0), coalesce(o_literal, 0), coalesce(c_uri, 0))",
    "CREATE INDEX IF NOT EXISTS idx_triple_s_uri ON triple (s_uri)",
    "CREATE INDEX IF NOT EXISTS idx_triple_s_blank ON triple (s_blank)",
    "CREATE INDEX IF NOT EXISTS idx_triple_p_uri ON triple (p_uri)",
    "CREATE INDEX IF NOT EXISTS idx_triple_o_uri ON triple (o_uri)",
    "CREATE INDEX IF NOT EXISTS idx_triple_o_blank ON triple (o_blank)",
    "CREATE INDEX IF NOT EXISTS idx_triple_o_literal ON triple (o_literal)",
    "CREATE INDEX IF NOT EXISTS idx_triple_c_uri ON triple (c_uri)",
];

/// Column-per-kind view of every statement
pub const CREATE_STATEMENTS_VIEW: &str = r#"
CREATE VIEW IF NOT EXISTS statements AS
SELECT r.id AS statement_id,
       rs.uri AS s_uri,
       bs.name AS s_blank,
       rp.uri AS predicate,
       ro.uri AS o_uri,
       bo.name AS o_blank,
       lo.val AS o_literal,
       lo.language AS o_lit_lang,
       ldt.uri AS o_lit_dt,
       c.uri AS context
FROM triple r
JOIN resource rp ON r.p_uri = rp.id
LEFT JOIN resource rs ON r.s_uri = rs.id
LEFT JOIN bnode bs ON r.s_blank = bs.id
LEFT JOIN resource ro ON r.o_uri = ro.id
LEFT JOIN bnode bo ON r.o_blank = bo.id
LEFT JOIN literal lo ON r.o_literal = lo.id
LEFT JOIN resource ldt ON lo.datatype = ldt.id
LEFT JOIN context c ON r.c_uri = c.id
"#;

/// Every statement rendered as N-Triples terms
pub const CREATE_STATEMENTS_N3_VIEW: &str = r#"
CREATE VIEW IF NOT EXISTS statements_n3 AS
SELECT r.id AS statement_id,
       coalesce('<' || rs.uri || '>', '_:' || bs.name) AS subject,
       '<' || rp.uri || '>' AS predicate,
       coalesce('<' || ro.uri || '>', '_:' || bo.name,
                '"' || lo.val || '"' ||
                    coalesce('@' || lo.language, '') ||
                    coalesce('^^<' || ldt.uri || '>', '')) AS object,
       '<' || c.uri || '>' AS context
FROM triple r
JOIN resource rp ON r.p_uri = rp.id
LEFT JOIN resource rs ON r.s_uri = rs.id
LEFT JOIN bnode bs ON r.s_blank = bs.id
LEFT JOIN resource ro ON r.o_uri = ro.id
LEFT JOIN bnode bo ON r.o_blank = bo.id
LEFT JOIN literal lo ON r.o_literal = lo.id
LEFT JOIN resource ldt ON lo.datatype = ldt.id
LEFT JOIN context c ON r.c_uri = c.id
"#;

/// Tables in dependency order (children last)
pub const TABLES: &[&str] = &["resource", "context", "bnode", "literal", "triple"];

/// All schema creation statements
pub fn all_schema_statements() -> Vec<&'static str> {
    let mut stmts = vec![
        CREATE_RESOURCE_TABLE,
        CREATE_CONTEXT_TABLE,
        CREATE_BNODE_TABLE,
        CREATE_LITERAL_TABLE,
        CREATE_TRIPLE_TABLE,
    ];
    stmts.extend(CREATE_INDEXES.iter().copied());
    stmts.push(CREATE_STATEMENTS_VIEW);
    stmts.push(CREATE_STATEMENTS_N3_VIEW);
    stmts
}

/// Statements that delete every row, children first
pub fn clear_statements() -> Vec<String> {
    TABLES
        .iter()
        .rev()
        .map(|table| format!("DELETE FROM {}", table))
        .collect()
}
