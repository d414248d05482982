//! sqlspot: find and rewrite the SQL inside a codebase
//!
//! # Usage
//!
//! ```bash
//! # Report table/column usage of every query under src/
//! sqlspot scan src/
//!
//! # Is this string SQL, and what does it touch?
//! sqlspot check "SELECT id, email FROM users"
//!
//! # Rename a literal inside every detected query
//! sqlspot rewrite --from CANCELED --to CANCELLED src/jobs.rs --write
//! ```

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use colored::*;
use serde_json::json;
use tracing_subscriber::EnvFilter;

use sqlspot::prelude::*;

#[derive(Parser)]
#[command(name = "sqlspot")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Find, report and rewrite SQL embedded in source files", long_about = None)]
#[command(after_help = "EXAMPLES:
    sqlspot scan src/ migrations/           # Table/column usage per query
    sqlspot scan . --format json --queries  # Machine-readable, with query text
    sqlspot check \"DELETE FROM sessions\"    # Classify a single string
    sqlspot rewrite --from A --to B f.rs    # Preview a literal rename")]
struct Cli {
    /// Config file (default: ./sqlspot.toml, then the user config dir)
    #[arg(long, global = true, env = "SQLSPOT_CONFIG")]
    config: Option<PathBuf>,

    /// SQL dialect (overrides the config file)
    #[arg(short, long, global = true, value_enum)]
    dialect: Option<CliDialect>,

    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

#[derive(Clone, Copy, ValueEnum)]
enum CliDialect {
    Generic,
    Postgres,
    Mysql,
    Sqlite,
    Mssql,
    Snowflake,
    Bigquery,
    Ansi,
}

impl From<CliDialect> for SqlDialect {
    fn from(val: CliDialect) -> Self {
        match val {
            CliDialect::Generic => SqlDialect::Generic,
            CliDialect::Postgres => SqlDialect::PostgreSql,
            CliDialect::Mysql => SqlDialect::MySql,
            CliDialect::Sqlite => SqlDialect::Sqlite,
            CliDialect::Mssql => SqlDialect::MsSql,
            CliDialect::Snowflake => SqlDialect::Snowflake,
            CliDialect::Bigquery => SqlDialect::BigQuery,
            CliDialect::Ansi => SqlDialect::Ansi,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Scan files and directories for SQL and report column usage
    Scan {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
        #[arg(short, long, value_enum, default_value = "table")]
        format: OutputFormat,
        /// Also print the full text of every query
        #[arg(long)]
        queries: bool,
        /// Do not look up the git commit of scanned paths
        #[arg(long)]
        no_git: bool,
    },
    /// Detect SQL in one string and show its usage
    Check { sql: String },
    /// Replace a string literal inside every detected query
    Rewrite {
        /// Literal value to replace
        #[arg(long)]
        from: String,
        /// Replacement value
        #[arg(long)]
        to: String,
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// Write changes back instead of printing them
        #[arg(long)]
        write: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "sqlspot=debug" } else { "sqlspot=info" };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    let mut config = ScanConfig::load(cli.config.as_deref())?;
    if let Some(dialect) = cli.dialect {
        config.dialect = dialect.into();
    }

    match cli.command {
        Commands::Scan {
            paths,
            format,
            queries,
            no_git,
        } => {
            if no_git {
                config.git_provenance = false;
            }
            scan(config, &paths, format, queries)
        }
        Commands::Check { sql } => {
            check(&sql, config.dialect);
            Ok(())
        }
        Commands::Rewrite {
            from,
            to,
            files,
            write,
        } => rewrite(&files, &from, &to, write, config.dialect),
    }
}

fn scan(config: ScanConfig, paths: &[PathBuf], format: OutputFormat, queries: bool) -> Result<()> {
    let sink = MemorySink::new();
    let result = CodebaseScanner::new(config).scan(paths, &sink);
    let (usage, texts) = sink.into_parts();

    match format {
        OutputFormat::Json => {
            let mut out = json!({ "usage": usage });
            if queries {
                out["queries"] = serde_json::to_value(&texts)?;
            }
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
        OutputFormat::Table => {
            print_usage(&usage);
            if queries {
                println!();
                for row in &texts {
                    println!("{}", row.source_path.as_deref().unwrap_or("-").cyan());
                    println!("  {}", row.query.trim().white());
                }
            }
            println!();
            println!(
                "{} {} queries, {} files, {} candidates skipped",
                "Summary:".dimmed(),
                result.query_count().to_string().green(),
                result.files.len(),
                result.skipped.len().to_string().yellow()
            );
        }
    }
    Ok(())
}

fn print_usage(rows: &[UsageRow]) {
    println!(
        "{:8} {:28} {:24} {}",
        "OP".white().bold(),
        "TABLE".white().bold(),
        "COLUMN".white().bold(),
        "LOCATION".white().bold()
    );
    for row in rows {
        let location = match (&row.source_path, row.line_number) {
            (Some(path), Some(line)) => format!("{}:{}", path, line),
            (Some(path), None) => path.clone(),
            _ => "-".to_string(),
        };
        println!(
            "{:8} {:28} {:24} {}",
            row.operation.to_string().green(),
            row.table,
            row.column.as_deref().unwrap_or("-"),
            location.dimmed()
        );
    }
}

fn check(sql: &str, dialect: SqlDialect) {
    let node = HostNode::plain_text(sql);
    match view_of(&node, dialect) {
        Detection::NotApplicable => {
            println!("{}", "Not SQL".yellow());
        }
        Detection::Failed(failure) => {
            eprintln!("{} {}", "Parse Error:".red().bold(), failure.message());
        }
        Detection::Query(view) => {
            println!("{} {:?}", "Statement:".dimmed(), view.kind());
            println!("{} {}", "SQL:".cyan(), view.statement().to_string().white().bold());
            println!();
            let rows: Vec<_> = view.usage_rows(&Provenance::default()).collect();
            print_usage(&rows);
        }
    }
}

fn rewrite(files: &[PathBuf], from: &str, to: &str, write: bool, dialect: SqlDialect) -> Result<()> {
    let mut literal = ReplaceLiteral::new(from, to);
    for file in files {
        let changed = rewrite_file(file, dialect, &mut literal)?;
        match changed {
            Some(content) if write => {
                fs::write(file, content)
                    .with_context(|| format!("writing {}", file.display()))?;
                println!("{} {}", "Rewrote".green(), file.display());
            }
            Some(content) => {
                println!("{}", format!("--- {}", file.display()).cyan());
                print!("{}", content);
            }
            None => println!("{} {}", "Unchanged".dimmed(), file.display()),
        }
    }
    Ok(())
}
