//! sqltriple CLI - Command-line interface for the relational statement store

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::time::Instant;
use sqltriple::config::{self, StoreConfig};
use sqltriple::ui::{self, Icons};
use sqltriple::{Node, Pattern, SqliteStore, Statement, StoreOptions, Subject, ntriples};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "sqltriple")]
#[command(version)]
#[command(about = "Relational statement store for labeled graphs")]
#[command(long_about = r#"
sqltriple keeps subject/predicate/object statements, optionally grouped
into named contexts, in a SQLite database.

Terms use N-Triples syntax: <http://example.org/a>, _:b0, "chat"@fr,
"42"^^<http://www.w3.org/2001/XMLSchema#integer>.

Example usage:
  sqltriple import data.nt --context http://example.org/graph
  sqltriple match --subject '<http://example.org/a>'
  sqltriple stats
"#)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to the database file
    #[arg(short, long, global = true)]
    database: Option<PathBuf>,

    /// Path to the config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a config file and create the database
    Init {
        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,

        /// Delete every stored statement
        #[arg(long)]
        fresh: bool,
    },

    /// Add one statement
    Add {
        subject: String,
        predicate: String,
        object: String,

        /// Context URI (defaults to the default graph)
        #[arg(short = 'g', long)]
        context: Option<String>,
    },

    /// Import an N-Triples file ("-" reads stdin)
    Import {
        file: PathBuf,

        /// Context URI for every imported statement
        #[arg(short = 'g', long)]
        context: Option<String>,
    },

    /// List statements matching a pattern; omitted positions match anything
    Match {
        #[arg(short, long)]
        subject: Option<String>,

        #[arg(short, long)]
        predicate: Option<String>,

        #[arg(short, long)]
        object: Option<String>,

        /// Only statements in this context
        #[arg(short = 'g', long)]
        context: Option<String>,

        /// Maximum number of results
        #[arg(short, long)]
        limit: Option<usize>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: Format,
    },

    /// Remove one statement
    Remove {
        subject: String,
        predicate: String,
        object: String,

        #[arg(short = 'g', long)]
        context: Option<String>,
    },

    /// Print the number of stored statements
    Count,

    /// List context URIs
    Contexts,

    /// Show statistics about the store
    Stats,
}

fn parse_subject(text: &str) -> anyhow::Result<Subject> {
    let node = Node::parse(text).with_context(|| format!("invalid subject {}", text))?;
    Ok(Subject::try_from(node)?)
}

fn parse_predicate(text: &str) -> anyhow::Result<String> {
    match Node::parse(text).with_context(|| format!("invalid predicate {}", text))? {
        Node::Uri(uri) => Ok(uri),
        other => anyhow::bail!("predicate must be a <uri>, got {}", other),
    }
}

fn parse_object(text: &str) -> anyhow::Result<Node> {
    Node::parse(text).with_context(|| format!("invalid object {}", text))
}

fn parse_statement(subject: &str, predicate: &str, object: &str) -> anyhow::Result<Statement> {
    Ok(Statement::new(
        parse_subject(subject)?,
        parse_predicate(predicate)?,
        parse_object(object)?,
    ))
}

/// Database path: flag, then config, then the default
fn database_path(cli_database: Option<PathBuf>, config: Option<&StoreConfig>) -> PathBuf {
    cli_database
        .or_else(|| config.and_then(|c| c.database.as_ref().map(PathBuf::from)))
        .unwrap_or_else(config::default_database_path)
}

fn open_store(path: &Path, options: &StoreOptions) -> anyhow::Result<SqliteStore> {
    config::ensure_db_dir(path)?;
    SqliteStore::open_with(path, options).with_context(|| format!("failed to open {}", path.display()))
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let config_path = cli.config.clone().unwrap_or_else(config::default_config_path);
    let store_config = config::load_config(Some(config_path.as_path()))?;
    let mut options = match &store_config {
        Some(c) => c.store_options()?,
        None => StoreOptions::default(),
    };
    let database = database_path(cli.database, store_config.as_ref());

    match cli.command {
        Commands::Init { force, fresh } => {
            let new_config = StoreConfig {
                database: Some(database.display().to_string()),
                ..store_config.clone().unwrap_or_default()
            };
            config::write_config(&config_path, &new_config, force)?;
            options.new = fresh;

            let store = open_store(&database, &options)?;
            let count = store.count()?;
            store.close()?;

            ui::header("Initialized statement store");
            ui::status(Icons::FILE, "Config", &config_path.display().to_string());
            ui::status(Icons::DATABASE, "Database", &database.display().to_string());
            ui::summary_row("Statements", &count.to_string());
        }

        Commands::Add { subject, predicate, object, context } => {
            let statement = parse_statement(&subject, &predicate, &object)?;
            let store = open_store(&database, &options)?;
            let before = store.count()?;
            let id = store.add_statement(context.as_deref(), &statement)?;
            let added = store.count()? > before;
            store.close()?;

            if added {
                ui::success(&format!("Added statement #{}", id));
            } else {
                ui::info("Already stored", &format!("#{}", id));
            }
        }

        Commands::Import { file, context } => {
            let started = Instant::now();
            let spinner = ui::Spinner::new(&format!("Reading {}", file.display()));

            let statements = if file.as_os_str() == "-" {
                ntriples::read_statements(std::io::stdin().lock())?
            } else {
                let input = std::fs::File::open(&file)
                    .with_context(|| format!("failed to open {}", file.display()))?;
                ntriples::read_statements(BufReader::new(input))?
            };
            let read = statements.len();

            spinner.set_message(&format!("Storing {} statements", read));
            let store = open_store(&database, &options)?;
            let added = store.add_statements(context.as_deref(), statements)?;
            store.close()?;

            tracing::info!(read, added, file = %file.display(), "import finished");
            spinner.finish_with_summary(started.elapsed(), read, added);
        }

        Commands::Match { subject, predicate, object, context, limit, format } => {
            let mut pattern = Pattern::any();
            if let Some(subject) = subject {
                pattern = pattern.with_subject(parse_subject(&subject)?);
            }
            if let Some(predicate) = predicate {
                pattern = pattern.with_predicate(parse_predicate(&predicate)?);
            }
            if let Some(object) = object {
                pattern = pattern.with_object(parse_object(&object)?);
            }

            let store = open_store(&database, &options)?;
            let cursor = store.search(pattern, context.as_deref());
            let found = cursor
                .take(limit.unwrap_or(usize::MAX))
                .collect::<sqltriple::Result<Vec<_>>>()?;

            match format {
                Format::Json => println!("{}", serde_json::to_string_pretty(&found)?),
                Format::Text => {
                    if found.is_empty() {
                        ui::warn("No statements found.");
                    } else {
                        for m in &found {
                            ui::statement(m);
                        }
                        ui::summary_row("Matches", &found.len().to_string());
                    }
                }
            }
            store.close()?;
        }

        Commands::Remove { subject, predicate, object, context } => {
            let statement = parse_statement(&subject, &predicate, &object)?;
            let store = open_store(&database, &options)?;
            let removed = store.remove_statement(context.as_deref(), &statement)?;
            store.close()?;

            if removed {
                ui::success(&format!("{} Removed {}", Icons::DEL, statement));
            } else {
                ui::warn(&format!("Not stored: {}", statement));
            }
        }

        Commands::Count => {
            let store = open_store(&database, &options)?;
            println!("{}", store.count()?);
            store.close()?;
        }

        Commands::Contexts => {
            let store = open_store(&database, &options)?;
            let mut listed = 0;
            for uri in store.list_contexts()? {
                println!("{}", ui::term(&Node::uri(uri), ui::theme()));
                listed += 1;
            }
            if listed == 0 {
                println!("{}", ui::muted("(no contexts)"));
            }
            store.close()?;
        }

        Commands::Stats => {
            let store = open_store(&database, &options)?;
            let stats = store.stats()?;
            store.close()?;

            ui::section(&format!("{} sqltriple Statistics ({})", Icons::STATS, database.display()));
            println!("{}", ui::stats_table(&stats));
        }
    }

    Ok(())
}
