//! CLI entry point for the wikisource metadata tool.

use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::Parser;
use tracing::{debug, info, warn};
use wikisource_api::{Cache, ClientConfig, NoCache, SqliteCache, WikisourceApi};

mod app_config;
mod cli;

use cli::{Args, Command};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (info)
    let default_level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    debug!(?args, "CLI arguments parsed");

    let file_config = app_config::load_config(args.config.as_deref())?;
    let client_config = file_config.apply(ClientConfig::default());
    let cache = open_cache(&args, &file_config).await?;
    let api = WikisourceApi::with_config(client_config, cache)?;

    match args.command {
        Command::List => list(&api).await,
        Command::Work { lang, title } => work(&api, &lang, &title).await,
        Command::Index { url, existing_only } => index(&api, &url, existing_only).await,
        Command::Subpages { lang, title, limit } => subpages(&api, &lang, &title, limit).await,
    }
}

async fn open_cache(args: &Args, file_config: &app_config::FileConfig) -> Result<Arc<dyn Cache>> {
    let Some(path) = args.cache_db.as_ref().or(file_config.cache_db.as_ref()) else {
        return Ok(Arc::new(NoCache));
    };
    let cache = SqliteCache::new(path)
        .await
        .with_context(|| format!("Failed to open cache database '{}'", path.display()))?;
    match cache.purge_expired().await {
        Ok(purged) => debug!(purged, "Purged expired cache entries"),
        Err(error) => warn!(error = %error, "Unable to purge expired cache entries"),
    }
    Ok(Arc::new(cache))
}

async fn list(api: &WikisourceApi) -> Result<()> {
    let sites = api.fetch_wikisources().await?;
    info!(count = sites.len(), "Fetched directory of Wikisources");
    for site in &sites {
        println!(
            "{}\t{}",
            site.language_code(),
            site.language_name().unwrap_or_default()
        );
    }
    Ok(())
}

async fn work(api: &WikisourceApi, lang: &str, title: &str) -> Result<()> {
    let site = api.fetch_wikisource(lang).await?;
    let metadata = site.edition(title).metadata().await?;
    println!("Title:   {}", metadata.title);
    println!("Year:    {}", metadata.year.as_deref().unwrap_or("-"));
    println!("Authors: {}", metadata.authors.join(", "));
    Ok(())
}

async fn index(api: &WikisourceApi, url: &str, existing_only: bool) -> Result<()> {
    let Some(site) = api.new_wikisource_from_url(url) else {
        bail!("Not a Wikisource URL: '{url}'");
    };
    let index_page = site.index_page_from_url(url).await?;
    let pages = index_page.page_list(existing_only).await?;
    let quality = index_page.quality().await?;
    println!("Title:   {}", index_page.title()?);
    println!("Pages:   {}", pages.len());
    match quality {
        Some(quality) => println!("Quality: {quality}"),
        None => println!("Quality: undetermined"),
    }
    Ok(())
}

async fn subpages(api: &WikisourceApi, lang: &str, title: &str, limit: usize) -> Result<()> {
    let site = api.fetch_wikisource(lang).await?;
    for subpage in site.edition(title).subpages(limit).await? {
        println!("{subpage}");
    }
    Ok(())
}
