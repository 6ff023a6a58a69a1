//! `libris` command line.

mod cli;
mod error;

use crate::cli::{Args, Command};
use crate::error::{ErrorKind, Result};
use clap::Parser;
use exn::ResultExt;
use libris_book::{Book, BookInput};
use libris_cache::{Database, Repository};
use libris_config::Config;
use libris_library::{Backends, Context, Pipeline, import_records};
use libris_storage::BackendHandle;
use libris_storage::backend::LocalBackend;
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    let config = Config::load(args.config.as_deref());
    let configured = config.as_ref().map(|c| c.log_level.as_str()).unwrap_or("info");
    init_tracing(args.verbose, configured);

    let config = match config {
        Ok(config) => config,
        Err(e) => {
            error!(error = ?e, "could not load configuration");
            return ExitCode::FAILURE;
        },
    };
    debug!(?config, "configuration loaded");
    match run(args.command, config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = ?e, "libris failed");
            ExitCode::FAILURE
        },
    }
}

/// `RUST_LOG` wins over `-v`, which wins over the configured level.
fn init_tracing(verbose: u8, configured: &str) {
    let level = match verbose {
        0 => configured,
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

async fn run(command: Command, config: Config) -> Result<()> {
    let pool_size = u32::try_from(config.workers).unwrap_or(u32::MAX).max(1);
    let db = Database::connect_with_pool_size(&config.database, pool_size).await.or_raise(|| ErrorKind::Database)?;
    let repo = Arc::new(Repository::from(&db));
    let result = match command {
        Command::Refresh => refresh(&config, repo).await,
        Command::Watch => watch(&config, repo).await,
        Command::Search { query, limit, full_text } => search(&repo, &query.join(" "), limit, full_text).await,
        Command::Stats { limit } => stats(&repo, limit).await,
        Command::Import { file } => import(&config, &repo, &file).await,
    };
    db.close().await;
    result
}

fn pipeline(config: &Config, repo: Arc<Repository>) -> Result<Pipeline> {
    let ctx = Context::from_config(config).or_raise(|| ErrorKind::Config)?;
    let backends = Backends {
        import: local("import", &config.import_dir)?,
        library: local("library", &config.library_dir)?,
        quarantine: local("quarantine", &config.quarantine_dir)?,
    };
    Ok(Pipeline::new(ctx, backends, repo.clone(), repo))
}

fn local(name: &'static str, dir: &Path) -> Result<BackendHandle> {
    let root = std::path::absolute(dir).or_raise(|| ErrorKind::Storage(name))?;
    let backend = LocalBackend::new(name, root).or_raise(|| ErrorKind::Storage(name))?;
    Ok(Arc::new(backend))
}

async fn refresh(config: &Config, repo: Arc<Repository>) -> Result<()> {
    match pipeline(config, repo)?.run().await.or_raise(|| ErrorKind::Refresh)? {
        Some(stats) => println!("{stats}"),
        None => info!("another refresh is already running"),
    }
    Ok(())
}

async fn watch(config: &Config, repo: Arc<Repository>) -> Result<()> {
    let pipeline = pipeline(config, repo)?;
    info!(interval_secs = config.refresh_interval_secs, "watching import directory");
    pipeline
        .watch(config.refresh_interval(), async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!(error = %e, "could not listen for interrupts");
            }
        })
        .await;
    info!("stopped watching");
    Ok(())
}

async fn search(repo: &Repository, query: &str, limit: usize, full_text: bool) -> Result<()> {
    let books = match full_text {
        true => repo.full_text(query, limit).await,
        false => repo.search(query, limit).await,
    }
    .or_raise(|| ErrorKind::Query)?;
    for book in &books {
        println!("{}", describe(book));
    }
    debug!(results = books.len(), "search complete");
    Ok(())
}

fn describe(book: &Book) -> String {
    let series = book
        .series
        .as_ref()
        .map(|series| format!(" ({} #{})", series.name, series.index))
        .unwrap_or_default();
    format!("{} - {}{series} [{}] {}", book.author, book.title, book.language, book.path.display())
}

async fn stats(repo: &Repository, limit: usize) -> Result<()> {
    let count = repo.count().await.or_raise(|| ErrorKind::Query)?;
    println!("{count} books");
    for refresh in repo.list_refreshes(limit).await.or_raise(|| ErrorKind::Query)? {
        println!("{} .. {}: {refresh}", refresh.start, refresh.stop);
    }
    Ok(())
}

async fn import(config: &Config, repo: &Repository, file: &Path) -> Result<()> {
    let data = tokio::fs::read(file).await.or_raise(|| ErrorKind::Records(file.to_path_buf()))?;
    let records: Vec<BookInput> = serde_json::from_slice(&data).or_raise(|| ErrorKind::Records(file.to_path_buf()))?;
    let report = import_records(repo, repo, records, config.index.batch_size).await.or_raise(|| ErrorKind::Import)?;
    println!("{} added, {} duplicates", report.added, report.duplicates);
    Ok(())
}
