//! Wikisource metadata client.
//!
//! Read-only access to bibliographic metadata about the digitized texts on
//! every language edition of Wikisource, cross-referenced with Wikidata.
//! Names and URLs resolve into a hierarchy of handles: a [`Wikisource`]
//! site, a [`Work`], its [`Edition`]s, their [`IndexPage`]s and the scanned
//! pages in each [`PageList`].
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`wikisource`] - Shared client, directory of sites and site handles
//! - [`edition`] - Edition metadata, subpage traversal and Index page discovery
//! - [`work`] - Wikidata works and their editions
//! - [`index_page`] - Index page loading, page lists and quality
//! - [`extract`] - Pure HTML and URL extraction
//! - [`api`] - MediaWiki API, Wikidata API and SPARQL access
//! - [`cache`] - Pass-through cache trait and backends
//!
//! All operations are `async` but issue their requests one at a time. Logging
//! goes through `tracing`; the library never installs a subscriber.

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod api;
pub mod cache;
pub mod config;
pub mod edition;
pub mod error;
pub mod extract;
pub mod index_page;
pub mod wikisource;
pub mod work;

#[cfg(test)]
pub mod test_support;

pub(crate) mod user_agent;

// Re-export commonly used types
pub use cache::{Cache, MemoryCache, NoCache, SqliteCache};
pub use config::{CacheLifetimes, ClientConfig};
pub use edition::{Edition, EditionMetadata};
pub use error::{ErrorKind, WikisourceError};
pub use index_page::{IndexPage, PageList, PageListEntry, PageListField};
pub use wikisource::{Wikisource, WikisourceApi};
pub use work::Work;
