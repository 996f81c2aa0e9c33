//! trenddb CLI - inspect and maintain a research corpus database

use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};
use trenddb::association::Entity;
use trenddb::config::{self, TrenddbConfig};
use trenddb::storage::Record;
use trenddb::ui::{self, Icons};
use trenddb::{
    Article, ArticleId, Attrib, Author, Describe, Field, Place, Resolution, Session, Snippet,
};

#[derive(Parser)]
#[command(name = "trenddb")]
#[command(version = "0.1.0")]
#[command(about = "Research corpus database - articles, authors, places and extracted attributes")]
#[command(long_about = r#"
trenddb stores harvested journal articles with their authors, geocoded
publication places, categorized attributes and text snippets.

Example usage:
  trenddb init
  trenddb stats
  trenddb show article 12 --format json
  trenddb find --pmid 22796459
  trenddb resolve-place --orig "boston ma" --final Boston --lat 42.36 --lon -71.06
"#)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to the database file (overrides TRENDDB_DATABASE and trenddb.toml)
    #[arg(short, long, global = true)]
    database: Option<PathBuf>,

    /// Path to the config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write trenddb.toml and create the database schema
    Init {
        /// Overwrite an existing config file
        #[arg(short, long)]
        force: bool,
    },

    /// Show row counts per table
    Stats,

    /// Show one record
    Show {
        kind: Kind,
        id: i64,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: Format,
    },

    /// Look up an article by PubMed id
    Find {
        #[arg(long)]
        pmid: String,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: Format,
    },

    /// Store a geocoding result for a place query
    ResolvePlace {
        /// Original geocoder query
        #[arg(long)]
        orig: String,

        /// Resolved place name
        #[arg(long = "final")]
        final_name: String,

        #[arg(long, allow_hyphen_values = true)]
        lat: Option<String>,

        #[arg(long, allow_hyphen_values = true)]
        lon: Option<String>,

        /// Number of geocoder matches
        #[arg(long)]
        matches: Option<i64>,
    },

    /// Delete a record and everything it owns
    Delete { kind: Kind, id: i64 },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Kind {
    Place,
    Article,
    Author,
    Attrib,
    Field,
    Snippet,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Format {
    Text,
    Json,
}

fn main() {
    let cli = Cli::parse();

    // Initialize logging; RUST_LOG wins over the defaults
    let default_level = if cli.verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    if let Err(err) = run(cli) {
        ui::error(&format!("{err:#}"));
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let cwd = std::env::current_dir()?;
    let config_path = cli.config.clone().unwrap_or_else(config::default_config_path);
    let loaded = config::load_config(Some(config_path.as_path()))?;
    let database = config::resolve_database_path(
        cli.database.as_deref(),
        std::env::var(config::DATABASE_ENV).ok(),
        loaded.as_ref(),
        &cwd,
    );
    tracing::debug!("Using database {}", database.display());

    match cli.command {
        Commands::Init { force } => init(&config_path, &database, force),

        Commands::Stats => {
            let session = Session::open(&database)?;
            let stats = session.stats()?;
            ui::header("trenddb statistics");
            ui::status(Icons::STATS, "Database", &database.display().to_string());
            println!("{}", ui::stats_table(&stats));
            session.close()?;
            Ok(())
        }

        Commands::Show { kind, id, format } => {
            let session = Session::open(&database)?;
            match kind {
                Kind::Place => show::<Place>(&session, id, format)?,
                Kind::Article => show_article(&session, ArticleId::from(id), format)?,
                Kind::Author => show::<Author>(&session, id, format)?,
                Kind::Attrib => show::<Attrib>(&session, id, format)?,
                Kind::Field => show::<Field>(&session, id, format)?,
                Kind::Snippet => show::<Snippet>(&session, id, format)?,
            }
            session.close()?;
            Ok(())
        }

        Commands::Find { pmid, format } => {
            let session = Session::open(&database)?;
            match session.find_article_by_pmid(&pmid)? {
                Some(article) => {
                    let id = article
                        .id
                        .ok_or_else(|| anyhow::anyhow!("stored article has no id"))?;
                    show_article(&session, id, format)?;
                }
                None => ui::warn(&format!("No article with pmid {pmid}")),
            }
            session.close()?;
            Ok(())
        }

        Commands::ResolvePlace {
            orig,
            final_name,
            lat,
            lon,
            matches,
        } => {
            let mut resolution = Resolution::new(final_name);
            resolution.final_matches = matches;
            resolution.lat = lat.as_deref().map(trenddb::model::parse_coordinate).transpose()?;
            resolution.lon = lon.as_deref().map(trenddb::model::parse_coordinate).transpose()?;

            let session = Session::open(&database)?;
            let place = session.resolve_place(&orig, resolution)?;
            let id = place.id().map(|id| id.to_string()).unwrap_or_default();
            ui::success(&format!("Place #{id}: {}", place.description()));
            session.close()?;
            Ok(())
        }

        Commands::Delete { kind, id } => {
            let session = Session::open(&database)?;
            match kind {
                Kind::Place => delete::<Place>(&session, id)?,
                Kind::Article => delete::<Article>(&session, id)?,
                Kind::Author => delete::<Author>(&session, id)?,
                Kind::Attrib => delete::<Attrib>(&session, id)?,
                Kind::Field => delete::<Field>(&session, id)?,
                Kind::Snippet => delete::<Snippet>(&session, id)?,
            }
            session.close()?;
            Ok(())
        }
    }
}

fn init(config_path: &Path, database: &Path, force: bool) -> anyhow::Result<()> {
    let config = TrenddbConfig {
        database: Some(database.display().to_string()),
    };
    config::write_config(config_path, &config, force)?;

    let session = Session::open(database)?;
    session.close()?;

    ui::success("Initialized trenddb");
    ui::status(Icons::GEAR, "Config", &config_path.display().to_string());
    ui::status(Icons::DATABASE, "Database", &database.display().to_string());
    Ok(())
}

fn show<E: Entity + Serialize>(session: &Session, id: i64, format: Format) -> anyhow::Result<()> {
    let record: E = session.get(E::Id::from(id))?;
    let value = serde_json::to_value(&record)?;
    match format {
        Format::Json => println!("{}", serde_json::to_string_pretty(&value)?),
        Format::Text => {
            ui::section(&format!(" {} #{} ", E::SCHEMA.entity, id));
            println!("{}", ui::record_table(&value));
        }
    }
    Ok(())
}

#[derive(Serialize)]
struct ArticleView {
    article: Article,
    place: Place,
    authors: Vec<Author>,
    attribs: Vec<Attrib>,
    snippets: Vec<Snippet>,
}

fn show_article(session: &Session, id: ArticleId, format: Format) -> anyhow::Result<()> {
    let article: Article = session.get(id)?;
    let view = ArticleView {
        place: session.get(article.place_id)?,
        authors: session.authors_of(id)?,
        attribs: session.attribs_of(id)?,
        snippets: session.snippets_of(id)?,
        article,
    };

    if format == Format::Json {
        println!("{}", serde_json::to_string_pretty(&view)?);
        return Ok(());
    }

    ui::section(&format!(" article #{id} "));
    println!("{}", ui::record_table(&serde_json::to_value(&view.article)?));
    ui::info("Place", view.place.description());

    if !view.authors.is_empty() {
        ui::section(" authors ");
        for author in &view.authors {
            let author_id = author.id().map(|a| a.to_string()).unwrap_or_default();
            ui::record_line("author", author_id, author.description());
        }
    }
    if !view.attribs.is_empty() {
        ui::section(" attribs ");
        for attrib in &view.attribs {
            let attrib_id = attrib.id().map(|a| a.to_string()).unwrap_or_default();
            let category = attrib.category().unwrap_or("-");
            ui::record_line(
                "attrib",
                attrib_id,
                &format!("{} {}", attrib.description(), ui::muted(&format!("[{category}]"))),
            );
        }
    }
    if !view.snippets.is_empty() {
        ui::section(" snippets ");
        for snippet in &view.snippets {
            let snippet_id = snippet.id.map(|s| s.to_string()).unwrap_or_default();
            ui::record_line(
                "snippet",
                snippet_id,
                &format!("{} {}", snippet.name, ui::dim(snippet.preview())),
            );
        }
    }
    ui::summary_row(
        "Links:",
        &format!(
            "{} {} authors, {} attribs, {} snippets",
            Icons::LINK,
            view.authors.len(),
            view.attribs.len(),
            view.snippets.len()
        ),
    );
    Ok(())
}

fn delete<E: Entity>(session: &Session, id: i64) -> anyhow::Result<()> {
    session.delete::<E>(E::Id::from(id))?;
    ui::deleted(E::SCHEMA.entity, id);
    Ok(())
}
