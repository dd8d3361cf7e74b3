//! The one `reqwest::Client` shared by MediaWiki, Wikidata and SPARQL traffic.

use std::panic::{AssertUnwindSafe, catch_unwind};

use reqwest::{Client, Proxy};
use tracing::warn;

use crate::config::ClientConfig;
use crate::error::WikisourceError;

const CLIENT_CONSTRUCTION: &str = "(client construction)";

const HTTPS_PROXY_VARS: [&str; 4] = ["HTTPS_PROXY", "https_proxy", "ALL_PROXY", "all_proxy"];
const HTTP_PROXY_VARS: [&str; 4] = ["HTTP_PROXY", "http_proxy", "ALL_PROXY", "all_proxy"];

/// Builds the HTTP client from the configured timeouts and User-Agent.
///
/// Some sandboxed environments panic while reading system proxy settings; the
/// client is then rebuilt with proxies taken from the environment only.
///
/// # Errors
///
/// Returns [`WikisourceError::Http`] when the client cannot be built.
pub(crate) fn build_http_client(config: &ClientConfig) -> Result<Client, WikisourceError> {
    let attempt = |env_proxies_only: bool| {
        catch_unwind(AssertUnwindSafe(|| {
            let mut builder = Client::builder()
                .connect_timeout(config.connect_timeout)
                .timeout(config.read_timeout)
                .user_agent(config.user_agent.clone())
                .gzip(true);
            if env_proxies_only {
                builder = builder.no_proxy();
                if let Some(proxy) = env_proxy(&HTTPS_PROXY_VARS).and_then(|p| Proxy::https(p).ok()) {
                    builder = builder.proxy(proxy);
                }
                if let Some(proxy) = env_proxy(&HTTP_PROXY_VARS).and_then(|p| Proxy::http(p).ok()) {
                    builder = builder.proxy(proxy);
                }
            }
            builder.build()
        }))
    };

    let built = attempt(false).or_else(|_| {
        warn!("System proxy lookup panicked; retrying with environment proxies only");
        attempt(true)
    });
    match built {
        Ok(Ok(client)) => Ok(client),
        Ok(Err(error)) => Err(WikisourceError::http(
            CLIENT_CONSTRUCTION,
            &format!("HTTP client construction failed: {error}"),
        )),
        Err(_) => Err(WikisourceError::http(
            CLIENT_CONSTRUCTION,
            "HTTP client construction panicked while initializing networking",
        )),
    }
}

/// First non-blank value among `names`.
fn env_proxy(names: &[&str]) -> Option<String> {
    names.iter().find_map(|name| {
        std::env::var(name)
            .ok()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_build_client_with_defaults() {
        assert!(build_http_client(&ClientConfig::default()).is_ok());
    }

    #[test]
    fn test_build_client_with_custom_timeouts() {
        let config = ClientConfig::default()
            .with_timeouts(Duration::from_secs(2), Duration::from_secs(5));
        assert!(build_http_client(&config).is_ok());
    }

    #[test]
    fn test_env_proxy_ignores_unset_names() {
        assert_eq!(env_proxy(&["WIKISOURCE_TEST_PROXY_THAT_IS_NEVER_SET"]), None);
    }
}
