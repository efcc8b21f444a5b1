// Re-export modules
pub mod catalog;
pub mod config;
pub mod dedupe;
pub mod details;
pub mod driver;
pub mod error;
pub mod export;
pub mod extract;
pub mod filter;
pub mod locale;
pub mod overlay;
pub mod pacing;
pub mod paginate;
pub mod results;
pub mod retry;

// Re-export commonly used types for convenience
pub use config::CrawlerConfig;
pub use error::{CrawlError, DriverError};
pub use results::{CrawlOutcome, ItemReference, ProductRecord};

use crate::driver::webdriver::WebSession;
use crate::driver::PageDriver;
use crate::filter::{RefFilter, RefFilterConfig};
use crate::pacing::Pacer;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Main builder for a catalog crawl.
///
/// Owns the configuration and the cancellation token; `run` connects to
/// the WebDriver server, walks every configured category and hands back
/// the collected outcome.
pub struct Crawl {
    config: CrawlerConfig,
    pacer: Option<Pacer>,
    cancel: CancellationToken,
}

impl Crawl {
    /// Create a crawl over the given configuration
    pub fn new(config: CrawlerConfig) -> Self {
        Self {
            config,
            pacer: None,
            cancel: CancellationToken::new(),
        }
    }

    /// Replace the default pacing behavior
    pub fn with_pacer(mut self, pacer: Pacer) -> Self {
        self.pacer = Some(pacer);
        self
    }

    /// Use an externally owned cancellation token
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Token that stops the crawl at the next safe point once cancelled
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Connect to the WebDriver server and run the crawl to completion.
    ///
    /// Errors are returned only for failures before the crawl proper:
    /// bad configuration or no browser session. Once the crawl is under
    /// way, failures end up in the outcome's `aborted` field instead.
    pub async fn run(mut self) -> error::Result<CrawlOutcome> {
        // Override the WebDriver URL with an environment variable if provided
        if let Ok(webdriver_url) = std::env::var("WEBDRIVER_URL") {
            if !webdriver_url.is_empty() {
                self.config.webdriver_url = webdriver_url;
            }
        }

        let base = Url::parse(&self.config.catalog_url).map_err(|source| CrawlError::BadUrl {
            url: self.config.catalog_url.clone(),
            source,
        })?;
        let filter = RefFilter::new(filter_config_from(&self.config, &base))?;
        let pacer = match self.pacer.take() {
            Some(pacer) => pacer,
            None => Pacer::new(self.config.pacing.clone()),
        };

        let session = WebSession::connect(&self.config).await?;
        let outcome =
            catalog::run(&session, &self.config, &filter, &base, &pacer, &self.cancel).await;

        if let Err(err) = session.quit().await {
            ::log::warn!("Could not close the browser session: {}", err);
        }

        Ok(outcome)
    }
}

/// Reference filter settings derived from the crawl configuration
fn filter_config_from(config: &CrawlerConfig, base: &Url) -> RefFilterConfig {
    let required_domain = if config.same_domain {
        base.domain().map(|d| d.to_string())
    } else {
        None
    };
    RefFilterConfig {
        required_domain,
        include_patterns: config.include_patterns.clone(),
        exclude_patterns: config.exclude_patterns.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_bad_catalog_url_is_rejected() {
        let mut config = CrawlerConfig::default();
        config.catalog_url = "not a url".to_string();

        let err = Crawl::new(config).run().await.unwrap_err();
        assert!(err.to_string().contains("not a url"));
    }

    #[test]
    fn test_filter_scope_follows_the_catalog_domain() {
        let config = CrawlerConfig::default();
        let base = Url::parse(&config.catalog_url).unwrap();

        let filter_config = filter_config_from(&config, &base);
        assert_eq!(
            filter_config.required_domain.as_deref(),
            Some("www.kroger.com")
        );
    }

    #[test]
    fn test_same_domain_off_drops_the_scope() {
        let mut config = CrawlerConfig::default();
        config.same_domain = false;
        let base = Url::parse(&config.catalog_url).unwrap();

        let filter_config = filter_config_from(&config, &base);
        assert!(filter_config.required_domain.is_none());
    }
}
