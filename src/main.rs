//! book-catalog CLI: manage a local book catalog.

use std::collections::HashMap;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use miette::{IntoDiagnostic, Result, miette};
use uuid::Uuid;

use book_catalog::config::{CatalogConfig, CatalogPaths};
use book_catalog::model::{Book, BookColumn, BookDraft, ColumnKind, ColumnValue};
use book_catalog::service::{BookService, CreateOutcome};

#[derive(Parser)]
#[command(name = "book-catalog", version, about = "Book catalog with cover lookup")]
struct Cli {
    /// Config file (defaults to the XDG config dir).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Database file, overriding the config.
    #[arg(long, global = true)]
    database: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the database and write a default config if none exists.
    Init,

    /// Add a book. Its cover is looked up before the command exits.
    Add {
        #[arg(long)]
        title: String,

        #[arg(long)]
        author: String,

        #[arg(long)]
        year: i32,

        #[arg(long)]
        words: i32,

        /// Genre tag (repeatable).
        #[arg(long = "genre")]
        genres: Vec<String>,
    },

    /// List books, optionally filtered.
    List {
        /// Filter parameter as key=value, e.g. `sort_by=year_published` (repeatable).
        #[arg(long = "param", value_parser = parse_key_val)]
        params: Vec<(String, String)>,

        /// Print JSON instead of a table.
        #[arg(long)]
        json: bool,
    },

    /// Show one book as JSON.
    Show { id: Uuid },

    /// Find a book by exact title and author.
    Find {
        #[arg(long)]
        title: String,

        #[arg(long, default_value = "")]
        author: String,
    },

    /// Delete a book.
    Delete { id: Uuid },

    /// Set a single column of a book.
    Set {
        id: Uuid,
        column: String,
        value: String,
    },

    /// Write a book's cover (or the placeholder) to a file.
    Cover {
        id: Uuid,

        #[arg(long)]
        out: PathBuf,
    },

    /// Attach an image file as a book's cover.
    Attach { id: Uuid, file: PathBuf },
}

fn parse_key_val(raw: &str) -> std::result::Result<(String, String), String> {
    raw.split_once('=')
        .map(|(k, v)| (k.trim().to_string(), v.to_string()))
        .ok_or_else(|| format!("expected key=value, got \"{raw}\""))
}

fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(3)
                .build(),
        )
    }))
    .ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let paths = CatalogPaths::resolve()?;
    let config_file = cli.config.clone().unwrap_or_else(|| paths.config_file());
    let config = CatalogConfig::load_or_default(&config_file)?;
    let database = cli
        .database
        .clone()
        .unwrap_or_else(|| config.database_path(&paths));

    let runtime = tokio::runtime::Runtime::new().into_diagnostic()?;
    let service = BookService::open(&config, &database, runtime.handle().clone())?;

    let outcome = run(cli.command, &service, &config, &config_file);
    runtime.block_on(service.covers().shutdown());
    outcome
}

fn run(
    command: Commands,
    service: &BookService,
    config: &CatalogConfig,
    config_file: &std::path::Path,
) -> Result<()> {
    match command {
        Commands::Init => {
            if !config_file.exists() {
                config.save(config_file)?;
                println!("Wrote config to {}", config_file.display());
            }
            println!("Catalog ready: {} books", service.store().book_count()?);
        }

        Commands::Add {
            title,
            author,
            year,
            words,
            genres,
        } => {
            let draft = BookDraft::new(&title, &author, year, words).with_genres(genres);
            match service.create(&draft)? {
                CreateOutcome::Created { id, .. } => println!("Created {id}"),
                CreateOutcome::Duplicate => println!("Already catalogued, nothing added"),
            }
        }

        Commands::List { params, json } => {
            let params: HashMap<String, String> = params.into_iter().collect();
            let books = service.list(&params)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&books).into_diagnostic()?);
            } else {
                for book in &books {
                    print_row(book);
                }
                println!("{} book(s)", books.len());
            }
        }

        Commands::Show { id } => match service.get_by_id(id)? {
            Some(book) => println!("{}", serde_json::to_string_pretty(&book).into_diagnostic()?),
            None => println!("No book with id {id}"),
        },

        Commands::Find { title, author } => {
            match service.find_by_title_and_author(&title, &author)? {
                Some(book) => print_row(&book),
                None => println!("No book titled \"{title}\" by \"{author}\""),
            }
        }

        Commands::Delete { id } => report_rows("Deleted", id, service.delete(id)?),

        Commands::Set { id, column, value } => {
            let value = match BookColumn::from_name(&column).map(|c| c.kind()) {
                Some(ColumnKind::Integer) => ColumnValue::Integer(
                    value
                        .trim()
                        .parse()
                        .map_err(|_| miette!("column {column} takes an integer, got \"{value}\""))?,
                ),
                _ => ColumnValue::Text(value),
            };
            report_rows("Updated", id, service.update_column(id, &column, value)?);
        }

        Commands::Cover { id, out } => {
            let image = service.image(id);
            std::fs::write(&out, &image.picture).into_diagnostic()?;
            let kind = if image.is_placeholder() { "placeholder" } else { "cover" };
            println!("Wrote {kind} ({} bytes) to {}", image.picture.len(), out.display());
        }

        Commands::Attach { id, file } => {
            let bytes = std::fs::read(&file).into_diagnostic()?;
            report_rows("Attached cover to", id, service.attach_image(id, &bytes)?);
        }
    }
    Ok(())
}

fn print_row(book: &Book) {
    println!(
        "{}  {:<40}  {:<24}  {:>5}  {:>8}",
        book.id, book.work_title, book.primary_author, book.year_published, book.word_count
    );
}

fn report_rows(verb: &str, id: Uuid, rows: usize) {
    if rows == 0 {
        println!("No book with id {id}");
    } else {
        println!("{verb} {id}");
    }
}
