//! formbase command line client
//!
//! # Usage
//!
//! ```bash
//! # Check the query port is reachable
//! formbase ping
//!
//! # Run a statement
//! formbase query 'SELECT * FROM users LIMIT 5'
//!
//! # Write a form through a schema declared in formbase.toml
//! formbase insert --schema users --form 'aid=u::1&name=Al&age=42'
//!
//! # Show the statement only
//! formbase upsert --spec aid --spec age:int --field aid=u::1 --field age=7 --dry-run
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand, ValueEnum};
use colored::*;
use formbase::prelude::*;
use serde_json::{Map, Value as JsonValue};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "formbase")]
#[command(version)]
#[command(about = "Project form data into documents and run N1QL statements", long_about = None)]
#[command(after_help = "EXAMPLES:
    formbase ping
    formbase query 'SELECT * FROM users WHERE age > 30' --collection users
    formbase insert --schema users --form 'aid=u::1&name=Al&tags=a&tags=b'
    formbase upsert --schema users --field aid=u::1 --field age=43 --dry-run")]
struct Cli {
    /// Config file (default: ./formbase.toml, then the user config dir)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Query service host
    #[arg(long, env = "FORMBASE_HOST", global = true)]
    host: Option<String>,

    /// Query service port
    #[arg(long, env = "FORMBASE_PORT", global = true)]
    port: Option<u16>,

    /// Username
    #[arg(short, long, env = "FORMBASE_USER", global = true)]
    user: Option<String>,

    /// Password
    #[arg(long, env = "FORMBASE_PASSWORD", hide_env_values = true, global = true)]
    password: Option<String>,

    /// Target bucket
    #[arg(short, long, env = "FORMBASE_BUCKET", global = true)]
    bucket: Option<String>,

    /// Use HTTPS
    #[arg(long, global = true)]
    secure: bool,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table", global = true)]
    format: OutputFormat,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Check that the query port accepts connections
    Ping,
    /// Execute a raw statement
    Query {
        /// The statement to execute
        statement: String,

        /// Unwrap each row from this collection key
        #[arg(long)]
        collection: Option<String>,

        /// Print the envelope even when the service reports errors
        #[arg(long)]
        unchecked: bool,
    },
    /// Insert a form as a new document
    Insert(WriteArgs),
    /// Insert or replace a document from a form
    Upsert(WriteArgs),
    /// Show a schema declared in the config file
    Schema {
        /// Schema name
        name: String,
    },
}

#[derive(Args)]
struct WriteArgs {
    /// Schema declared in the config file
    #[arg(short, long, conflicts_with = "spec")]
    schema: Option<String>,

    /// Inline field spec (key[:kind][,omitempty]), repeatable
    #[arg(long)]
    spec: Vec<String>,

    /// URL-encoded form body
    #[arg(long)]
    form: Option<String>,

    /// Form value as key=value, repeatable
    #[arg(long)]
    field: Vec<String>,

    /// Reject values that do not parse as their declared kind
    #[arg(long)]
    strict: bool,

    /// Don't execute, just show the statement
    #[arg(short, long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(&cli).await {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "formbase=debug" } else { "formbase=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: &Cli) -> Result<()> {
    let config = load_config(cli)?;

    match &cli.command {
        Commands::Ping => {
            let db = DocDb::connect(config.connection)?;
            let message = db.ping().await?;
            println!("{} {}", "✓".green(), message);
        }
        Commands::Query {
            statement,
            collection,
            unchecked,
        } => {
            let db = DocDb::connect(config.connection)?;
            if cli.verbose {
                println!("{} {}", "Statement:".dimmed(), statement.yellow());
            }
            let envelope = if *unchecked {
                db.query_unchecked(statement).await?
            } else {
                db.query(statement).await?
            };
            print_envelope(&envelope, collection.as_deref(), &cli.format)?;
        }
        Commands::Insert(args) => write(cli, &config, MutationKind::Insert, args).await?,
        Commands::Upsert(args) => write(cli, &config, MutationKind::Upsert, args).await?,
        Commands::Schema { name } => show_schema(name, &config.schema(name)?),
    }

    Ok(())
}

fn load_config(cli: &Cli) -> Result<FormbaseConfig> {
    let mut config = FormbaseConfig::discover(cli.config.as_deref()).context("Failed to load config")?;
    let connection = &mut config.connection;

    if let Some(host) = &cli.host {
        connection.host = host.clone();
    }
    if let Some(port) = cli.port {
        connection.port = Some(port);
    }
    if let Some(user) = &cli.user {
        connection.username = user.clone();
    }
    if let Some(password) = &cli.password {
        connection.password = password.clone();
    }
    if let Some(bucket) = &cli.bucket {
        connection.bucket = bucket.clone();
    }
    if cli.secure {
        connection.secure = true;
    }

    Ok(config)
}

async fn write(cli: &Cli, config: &FormbaseConfig, kind: MutationKind, args: &WriteArgs) -> Result<()> {
    let schema = match (&args.schema, args.spec.is_empty()) {
        (Some(name), _) => config.schema(name)?,
        (None, false) => Schema::from_specs(&args.spec)?,
        (None, true) => bail!("Either --schema or --spec is required"),
    };

    let mut form = args
        .form
        .as_deref()
        .map(FormValues::from_urlencoded)
        .unwrap_or_default();
    for pair in &args.field {
        let (key, value) = pair
            .split_once('=')
            .with_context(|| format!("--field expects key=value, got '{}'", pair))?;
        form.add(key, value);
    }

    let mode = if args.strict {
        CoercionMode::Strict
    } else {
        CoercionMode::Lenient
    };
    let db = DocDb::connect(config.connection.clone())?.with_coercion(mode);
    let statement = db.render(kind, &form, &schema)?;

    if args.dry_run || cli.verbose {
        println!("{}", "Generated statement:".green().bold());
        println!("{}", statement.white());
    }
    if args.dry_run {
        return Ok(());
    }

    let envelope = db.query(&statement).await?;
    println!(
        "{} {} document(s) written to {}",
        "✓".green(),
        envelope.metrics.result_count.to_string().cyan(),
        config.connection.bucket.cyan()
    );
    print_envelope(&envelope, Some(config.connection.bucket.as_str()), &cli.format)
}

fn print_envelope(envelope: &ResultEnvelope, collection: Option<&str>, format: &OutputFormat) -> Result<()> {
    for error in &envelope.errors {
        eprintln!("{} [{}] {}", "✗".red(), error.code, error.msg.red());
    }

    let rows = match collection {
        Some(name) => envelope.collection_rows(name)?,
        None => envelope.rows()?,
    };
    format_output(&rows, format);

    if !envelope.metrics.elapsed_time.is_empty() {
        println!(
            "{} {} (status: {})",
            "elapsed".dimmed(),
            envelope.metrics.elapsed_time,
            envelope.status
        );
    }
    Ok(())
}

fn format_output(rows: &[Map<String, JsonValue>], format: &OutputFormat) {
    if rows.is_empty() {
        println!("{}", "(no results)".dimmed());
        return;
    }

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(rows).unwrap_or_default());
        }
        OutputFormat::Table => {
            // Columns in first-seen order across all rows
            let mut columns: Vec<&String> = Vec::new();
            for row in rows {
                for key in row.keys() {
                    if !columns.contains(&key) {
                        columns.push(key);
                    }
                }
            }

            let widths: Vec<usize> = columns
                .iter()
                .map(|c| {
                    rows.iter()
                        .map(|row| row.get(*c).map(val_to_string).unwrap_or_default().chars().count())
                        .max()
                        .unwrap_or(0)
                        .max(c.chars().count())
                })
                .collect();

            let header: Vec<String> = columns
                .iter()
                .zip(&widths)
                .map(|(c, w)| format!("{:width$}", c, width = *w))
                .collect();
            println!("{}", header.join(" │ ").white().bold());

            let sep: Vec<String> = widths.iter().map(|w| "─".repeat(*w)).collect();
            println!("{}", sep.join("─┼─").dimmed());

            for row in rows {
                let cells: Vec<String> = columns
                    .iter()
                    .zip(&widths)
                    .map(|(c, w)| {
                        let val = row.get(*c).map(val_to_string).unwrap_or_default();
                        format!("{:width$}", val, width = *w)
                    })
                    .collect();
                println!("{}", cells.join(" │ "));
            }

            println!();
            println!("{} row(s) returned", rows.len().to_string().cyan());
        }
    }
}

fn val_to_string(val: &JsonValue) -> String {
    match val {
        JsonValue::Null => "NULL".to_string(),
        JsonValue::Bool(b) => b.to_string(),
        JsonValue::Number(n) => n.to_string(),
        JsonValue::String(s) => s.clone(),
        _ => val.to_string(),
    }
}

fn show_schema(name: &str, schema: &Schema) {
    println!("{} {}", "Schema".cyan().bold(), name.white().bold());
    println!();
    println!(
        "{:4} {:24} {:10} {}",
        "#".white().bold(),
        "Key".white().bold(),
        "Kind".white().bold(),
        "Omit if empty".white().bold()
    );
    println!("{}", "─".repeat(52).dimmed());

    for (i, field) in schema.iter().enumerate() {
        let omit = if field.omittable { "yes".yellow() } else { "no".dimmed() };
        println!(
            "{:4} {:24} {:10} {}",
            (i + 1).to_string().dimmed(),
            field.key.cyan(),
            field.kind.to_string(),
            omit
        );
    }
}
