//! Pattern search SQL synthesis
//!
//! Turns a search pattern into a `SELECT` over the triple table. Bound
//! components become inner joins with an equality predicate; unbound
//! components that still need their value projected become left joins.
//! Inner joins are always emitted before left joins: SQLite plans joins in
//! the order written, so the selective joins must come first.
//!
//! The projection is always the same ten columns (see [`Column`]); a
//! dimension the query does not join projects `NULL`.
//!
//! Results are read a page at a time in statement id order. Every query
//! ends with `r.id > ?` and a fixed `LIMIT`; the cursor binds the last id
//! it returned and re-executes the same handle for the next page.

use crate::node::{Node, Pattern, Subject};
use crate::shape::PatternShape;

/// Result columns of every pattern search query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(usize)]
pub enum Column {
    StatementId = 0,
    SubjectUri,
    SubjectBlank,
    PredicateUri,
    ObjectUri,
    ObjectBlank,
    ObjectLiteral,
    ObjectLanguage,
    ObjectDatatype,
    Context,
}

pub const COLUMN_COUNT: usize = 10;

/// Rows fetched per execution of a search statement
pub const SEARCH_PAGE_SIZE: usize = 256;

impl Column {
    pub fn index(self) -> usize {
        self as usize
    }
}

/// A synthesized search: which shape it is, its SQL, and its parameters
/// in binding order. The keyset parameter is not part of `params`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    pub shape: usize,
    pub sql: String,
    pub params: Vec<String>,
}

impl SearchQuery {
    /// 1-based position of the "after this statement id" parameter
    pub fn keyset_position(&self) -> usize {
        self.params.len() + 1
    }
}

#[derive(Default)]
struct QueryParts {
    select: [&'static str; COLUMN_COUNT],
    inner_joins: Vec<&'static str>,
    outer_joins: Vec<&'static str>,
    conditions: Vec<&'static str>,
    params: Vec<String>,
}

impl QueryParts {
    fn new() -> Self {
        Self {
            select: [
                "r.id AS statement_id",
                "NULL AS s_uri",
                "NULL AS s_blank",
                "rp.uri AS predicate",
                "NULL AS o_uri",
                "NULL AS o_blank",
                "NULL AS o_literal",
                "NULL AS o_lit_lang",
                "NULL AS o_lit_dt",
                "c.uri AS context",
            ],
            ..Default::default()
        }
    }

    fn project(&mut self, column: Column, expr: &'static str) {
        self.select[column.index()] = expr;
    }

    fn bind(&mut self, condition: &'static str, value: &str) {
        self.conditions.push(condition);
        self.params.push(value.to_string());
    }

    fn render(&self) -> String {
        let mut sql = String::from("SELECT\n");
        sql.push_str(&self.select.join(",\n"));
        sql.push_str("\nFROM triple r\n");
        for join in self.inner_joins.iter().chain(&self.outer_joins) {
            sql.push_str(join);
            sql.push('\n');
        }
        sql.push_str("WHERE\n");
        for condition in &self.conditions {
            sql.push_str(condition);
            sql.push_str(" AND ");
        }
        sql.push_str("r.id > ?\n");
        sql.push_str(&format!("ORDER BY r.id\nLIMIT {}", SEARCH_PAGE_SIZE));
        sql
    }
}

/// Build the query for `pattern`, restricted to `context` when given.
pub fn build_search(pattern: &Pattern, context: Option<&str>) -> SearchQuery {
    let mut parts = QueryParts::new();

    match &pattern.subject {
        Some(Subject::Uri(uri)) => {
            parts.project(Column::SubjectUri, "rs.uri AS s_uri");
            parts.inner_joins.push("JOIN resource rs ON r.s_uri = rs.id");
            parts.bind("rs.uri = ?", uri);
        }
        Some(Subject::Blank(name)) => {
            parts.project(Column::SubjectBlank, "bs.name AS s_blank");
            parts.inner_joins.push("JOIN bnode bs ON r.s_blank = bs.id");
            parts.bind("bs.name = ?", name);
        }
        None => {
            parts.project(Column::SubjectUri, "rs.uri AS s_uri");
            parts.project(Column::SubjectBlank, "bs.name AS s_blank");
            parts.outer_joins.push("LEFT JOIN resource rs ON r.s_uri = rs.id");
            parts.outer_joins.push("LEFT JOIN bnode bs ON r.s_blank = bs.id");
        }
    }

    // the predicate is never null, so it is always an inner join
    parts.inner_joins.push("JOIN resource rp ON r.p_uri = rp.id");
    if let Some(predicate) = &pattern.predicate {
        parts.bind("rp.uri = ?", predicate);
    }

    match &pattern.object {
        Some(Node::Uri(uri)) => {
            parts.project(Column::ObjectUri, "ro.uri AS o_uri");
            parts.inner_joins.push("JOIN resource ro ON r.o_uri = ro.id");
            parts.bind("ro.uri = ?", uri);
        }
        Some(Node::Blank(name)) => {
            parts.project(Column::ObjectBlank, "bo.name AS o_blank");
            parts.inner_joins.push("JOIN bnode bo ON r.o_blank = bo.id");
            parts.bind("bo.name = ?", name);
        }
        Some(Node::Literal(literal)) => {
            parts.project(Column::ObjectLiteral, "lo.val AS o_literal");
            parts.project(Column::ObjectLanguage, "lo.language AS o_lit_lang");
            parts.inner_joins.push("JOIN literal lo ON r.o_literal = lo.id");
            parts.bind("lo.val = ?", literal.value());

            match (literal.language(), literal.datatype()) {
                (Some(language), _) => {
                    parts.bind("lo.language = ?", language);
                    parts.conditions.push("lo.datatype IS NULL");
                }
                (None, Some(datatype)) => {
                    parts.project(Column::ObjectDatatype, "ldt.uri AS o_lit_dt");
                    parts.inner_joins.push("JOIN resource ldt ON lo.datatype = ldt.id");
                    parts.conditions.push("lo.language IS NULL");
                    parts.bind("ldt.uri = ?", datatype);
                }
                (None, None) => {
                    parts.conditions.push("lo.language IS NULL");
                    parts.conditions.push("lo.datatype IS NULL");
                }
            }
        }
        None => {
            parts.project(Column::ObjectUri, "ro.uri AS o_uri");
            parts.project(Column::ObjectBlank, "bo.name AS o_blank");
            parts.project(Column::ObjectLiteral, "lo.val AS o_literal");
            parts.project(Column::ObjectLanguage, "lo.language AS o_lit_lang");
            parts.project(Column::ObjectDatatype, "ldt.uri AS o_lit_dt");
            parts.outer_joins.push("LEFT JOIN resource ro ON r.o_uri = ro.id");
            parts.outer_joins.push("LEFT JOIN bnode bo ON r.o_blank = bo.id");
            parts.outer_joins.push("LEFT JOIN literal lo ON r.o_literal = lo.id");
            parts.outer_joins.push("LEFT JOIN resource ldt ON lo.datatype = ldt.id");
        }
    }

    match context {
        Some(uri) => {
            parts.inner_joins.push("JOIN context c ON r.c_uri = c.id");
            parts.bind("c.uri = ?", uri);
        }
        None => parts.outer_joins.push("LEFT JOIN context c ON r.c_uri = c.id"),
    }

    let shape = PatternShape::of(pattern, context.is_some()).index();
    let sql = parts.render();
    tracing::trace!(shape, %sql, "synthesized search query");

    SearchQuery {
        shape,
        sql,
        params: parts.params,
    }
}
