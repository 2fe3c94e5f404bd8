use tabled::{settings::Style, Table, Tabled};
use crate::storage::StoreStats;

#[derive(Tabled)]
pub struct TableRow {
    #[tabled(rename = "Metric")]
    pub metric: String,
    #[tabled(rename = "Value")]
    pub value: String,
}

pub struct TableBuilder {
    rows: Vec<TableRow>,
}

impl TableBuilder {
    pub fn new() -> Self {
        Self { rows: Vec::new() }
    }

    pub fn add_row(&mut self, label: &str, value: impl ToString) {
        self.rows.push(TableRow {
            metric: label.to_string(),
            value: value.to_string(),
        });
    }

    pub fn build(&self) -> String {
        if self.rows.is_empty() {
            return String::new();
        }
        Table::new(&self.rows).with(Style::rounded()).to_string()
    }
}

impl Default for TableBuilder {
    fn default() -> Self {
        Self::new()
    }
}

pub fn stats_table(stats: &StoreStats) -> String {
    let mut builder = TableBuilder::new();
    builder.add_row("Statements", stats.statements);
    builder.add_row("Resources", stats.resources);
    builder.add_row("Blank nodes", stats.blank_nodes);
    builder.add_row("Literals", stats.literals);
    builder.add_row("Contexts", stats.contexts);
    builder.add_row("Cached identifiers", stats.cached_identifiers);
    builder.add_row("Compiled statements", stats.compiled_statements);
    builder.build()
}
