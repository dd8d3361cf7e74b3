//! Error types for Wikisource and Wikidata operations.
//!
//! This module defines structured errors for site resolution, page metadata
//! extraction and Index page loading, following the What/Why/Fix pattern used
//! across the project.

use thiserror::Error;

/// Broad classification of a [`WikisourceError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The requested site, page, entity or URL does not exist or is not recognized.
    NotFound,
    /// An accessor was called in the wrong load state.
    NotLoaded,
    /// A remote service failed or returned something unusable.
    UpstreamFailure,
}

/// Errors that can occur while talking to Wikisource and Wikidata.
#[derive(Debug, Clone, Error)]
pub enum WikisourceError {
    /// No Wikisource exists for the requested language code
    #[error(
        "Wikisource '{code}' does not exist\n  Suggestion: Check the code against the directory of Wikisources"
    )]
    LanguageNotFound {
        /// The requested language code
        code: String,
    },

    /// The requested wiki page does not exist
    #[error(
        "the top-level page for \"{title}\" does not exist (API code: {code})\n  Suggestion: Check the page title and its capitalization"
    )]
    PageNotFound {
        /// The page title as requested
        title: String,
        /// The original MediaWiki API error code
        code: String,
    },

    /// The Wikidata entity does not exist
    #[error("Wikidata entity '{id}' does not exist\n  Suggestion: Check the Q-number")]
    EntityNotFound {
        /// The requested entity ID
        id: String,
    },

    /// The URL is not a recognized Wikisource page URL
    #[error(
        "unable to find a Wikisource page title in '{url}'\n  Suggestion: Use a URL of the form https://xx.wikisource.org/wiki/Title"
    )]
    UnrecognizedUrl {
        /// The rejected URL
        url: String,
    },

    /// No page exists at the given Index page URL
    #[error("unable to load Index page from URL '{url}': the page does not exist")]
    IndexPageNotFound {
        /// The requested URL
        url: String,
    },

    /// The page exists but lives outside the Index namespace
    #[error(
        "page at '{url}' is not an Index page\n  Suggestion: Index page titles start with the wiki's Index namespace prefix"
    )]
    NotAnIndexPage {
        /// The requested URL
        url: String,
    },

    /// An accessor was called before the object was loaded
    #[error("{what} is not loaded\n  Suggestion: Call one of the load methods first")]
    NotLoaded {
        /// The object that needs loading
        what: String,
    },

    /// A loader was called on an object that is already loaded
    #[error("{what} is already loaded\n  Suggestion: Create a new handle to load a different page")]
    AlreadyLoaded {
        /// The object that was already loaded
        what: String,
    },

    /// The MediaWiki or Wikidata API returned an error object
    #[error("API error '{code}': {info}")]
    Api {
        /// The API error code (e.g. `missingtitle`)
        code: String,
        /// Human-readable API diagnostic
        info: String,
    },

    /// The HTTP request itself failed
    #[error(
        "request to '{url}' failed: {reason}\n  Suggestion: Check your network connection and try again"
    )]
    Http {
        /// The requested URL
        url: String,
        /// Why the request failed
        reason: String,
    },

    /// The response could not be decoded
    #[error("unexpected response from {source_name}: {reason}")]
    InvalidResponse {
        /// The service or URL that produced the response
        source_name: String,
        /// What was wrong with it
        reason: String,
    },

    /// A cache backend could not be set up
    #[error("cache backend unavailable: {reason}")]
    Cache {
        /// Why the backend failed
        reason: String,
    },
}

impl WikisourceError {
    /// Creates a `LanguageNotFound` error.
    #[must_use]
    pub fn language_not_found(code: &str) -> Self {
        Self::LanguageNotFound {
            code: code.to_string(),
        }
    }

    /// Creates a `NotLoaded` error.
    #[must_use]
    pub fn not_loaded(what: &str) -> Self {
        Self::NotLoaded {
            what: what.to_string(),
        }
    }

    /// Creates an `Http` error.
    #[must_use]
    pub fn http(url: &str, reason: &str) -> Self {
        Self::Http {
            url: url.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Creates an `InvalidResponse` error.
    #[must_use]
    pub fn invalid_response(source_name: &str, reason: &str) -> Self {
        Self::InvalidResponse {
            source_name: source_name.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Returns the broad category of this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::LanguageNotFound { .. }
            | Self::PageNotFound { .. }
            | Self::EntityNotFound { .. }
            | Self::UnrecognizedUrl { .. }
            | Self::IndexPageNotFound { .. }
            | Self::NotAnIndexPage { .. } => ErrorKind::NotFound,
            Self::NotLoaded { .. } | Self::AlreadyLoaded { .. } => ErrorKind::NotLoaded,
            Self::Api { .. }
            | Self::Http { .. }
            | Self::InvalidResponse { .. }
            | Self::Cache { .. } => ErrorKind::UpstreamFailure,
        }
    }
}
