//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use wikisource_api::edition::DEFAULT_SUBPAGE_LIMIT;

/// Look up Wikisource editions, works and Index pages.
///
/// Read-only: nothing is ever written back to a wiki.
#[derive(Parser, Debug)]
#[command(name = "wikisource")]
#[command(author, version, about)]
pub struct Args {
    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// SQLite cache database (overrides `cache_db` from the config file)
    #[arg(long, global = true, value_name = "PATH")]
    pub cache_db: Option<PathBuf>,

    /// Config file to read instead of the default location
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Subcommands.
#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Command {
    /// List every Wikisource with its language name
    List,

    /// Show the title, year and authors of an edition
    Work {
        /// Language code of the Wikisource (e.g. en, bn, mul)
        lang: String,
        /// Page title of the edition (subpages are resolved to the top-level page)
        title: String,
    },

    /// Show the title, page count and quality of an Index page
    Index {
        /// Index page URL, e.g. https://en.wikisource.org/wiki/Index:Foo.djvu
        url: String,
        /// Only list pages that exist (uses the API instead of the rendered page list)
        #[arg(long)]
        existing_only: bool,
    },

    /// List the subpages of an edition in reading order
    Subpages {
        /// Language code of the Wikisource
        lang: String,
        /// Page title of the edition
        title: String,
        /// Stop after this many subpages
        #[arg(short, long, default_value_t = DEFAULT_SUBPAGE_LIMIT, value_parser = parse_limit)]
        limit: usize,
    },
}

fn parse_limit(raw: &str) -> Result<usize, String> {
    let limit: usize = raw.parse().map_err(|error| format!("{error}"))?;
    if limit == 0 {
        return Err("must be at least 1".to_string());
    }
    Ok(limit)
}
