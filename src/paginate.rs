use crate::config::CrawlerConfig;
use crate::dedupe::DiscoverySet;
use crate::driver::PageDriver;
use crate::error::{DriverError, RetryError};
use crate::extract;
use crate::filter::RefFilter;
use crate::pacing::Pacer;
use crate::results::ItemReference;
use crate::retry::RetryPolicy;
use std::fmt;
use std::time::Duration;
use url::Url;

/// Why a category stopped producing extraction passes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExhaustReason {
    /// The load-more control is gone, the listing is complete
    NoMoreContent,
    /// The load-more control stayed broken through the whole retry budget
    RetriesSpent,
    /// The per-category pass ceiling was reached
    PageCeiling,
    /// Repeated passes stopped surfacing new references
    Stagnant,
}

impl fmt::Display for ExhaustReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            ExhaustReason::NoMoreContent => "no more content",
            ExhaustReason::RetriesSpent => "retries spent on load more",
            ExhaustReason::PageCeiling => "page ceiling reached",
            ExhaustReason::Stagnant => "no new references",
        };
        f.write_str(text)
    }
}

/// Outcome of one load-more interaction
enum LoadMore {
    Clicked,
    Gone,
}

/// Drives one category through search and load-more passes.
///
/// Each call to `next_batch` captures the page, collects the references
/// that are new against the discovery set, and advances the listing by one
/// load-more click. Once the category is exhausted the reason is kept and
/// further calls return None.
pub struct Paginator<'a> {
    config: &'a CrawlerConfig,
    filter: &'a RefFilter,
    pacer: &'a Pacer,
    retry: RetryPolicy,
    base: &'a Url,
    passes: u32,
    stagnant: u32,
    exhausted: Option<ExhaustReason>,
}

impl<'a> Paginator<'a> {
    pub fn new(
        config: &'a CrawlerConfig,
        filter: &'a RefFilter,
        pacer: &'a Pacer,
        base: &'a Url,
    ) -> Self {
        let retry = RetryPolicy::new(
            config.max_retries,
            Duration::from_secs_f64(config.initial_delay_secs.max(0.0)),
            config.backoff_factor,
        );
        Self {
            config,
            filter,
            pacer,
            retry,
            base,
            passes: 0,
            stagnant: 0,
            exhausted: None,
        }
    }

    /// Runs the category search and waits for the first results grid.
    ///
    /// Returns whether the grid showed up. Transient failures come back as
    /// false so the caller can move on to the next category; session-level
    /// failures are returned as errors.
    pub async fn begin<D: PageDriver>(
        &mut self,
        driver: &D,
        term: &str,
    ) -> Result<bool, DriverError> {
        self.passes = 0;
        self.stagnant = 0;
        self.exhausted = None;

        ::log::info!("Searching the catalog for {}", term);
        match self.search(driver, term).await {
            Ok(()) => Ok(true),
            Err(err) if err.is_retryable() => {
                ::log::warn!("Search for {} produced no results grid: {}", term, err);
                Ok(false)
            }
            Err(err) => Err(err),
        }
    }

    async fn search<D: PageDriver>(&self, driver: &D, term: &str) -> Result<(), DriverError> {
        let selectors = &self.config.selectors;

        // The collapsed bar only exists until it has been clicked once
        if driver
            .appears(&selectors.search_bar_closed, self.config.overlay_wait())
            .await?
        {
            if let Err(err) = driver.click(&selectors.search_bar_closed).await {
                ::log::debug!("Could not open the search bar: {}", err);
            }
            self.pacer.ui_step().await;
        }

        driver
            .wait_for_element(&selectors.search_input, self.config.element_wait())
            .await?;
        driver.clear(&selectors.search_input).await?;
        driver
            .type_text(&selectors.search_input, term, self.pacer.keystroke())
            .await?;
        driver.press_enter(&selectors.search_input).await?;

        self.pacer.search_settle().await;
        driver.wait_until_ready(self.config.page_ready()).await?;
        driver
            .wait_for_element(&selectors.grid_cell, self.config.element_wait())
            .await?;
        Ok(())
    }

    /// Runs one extraction pass and advances the listing.
    ///
    /// Returns the references that were new in this pass, or None once the
    /// category is exhausted. The pass that trips an exhaustion condition
    /// still returns its own delta; None starts on the following call.
    pub async fn next_batch<D: PageDriver>(
        &mut self,
        driver: &D,
        seen: &mut DiscoverySet,
    ) -> Result<Option<Vec<ItemReference>>, DriverError> {
        if self.exhausted.is_some() {
            return Ok(None);
        }

        self.passes += 1;

        let html = match driver.page_source().await {
            Ok(html) => html,
            Err(err) if err.is_retryable() => {
                ::log::warn!("Could not capture the results page: {}", err);
                String::new()
            }
            Err(err) => return Err(err),
        };

        let batch: Vec<ItemReference> =
            extract::grid_references(&html, &self.config.selectors.grid_cell, self.base)
                .into_iter()
                .filter(|url| self.filter.accepts(url))
                .map(|url| ItemReference::new(url.as_str()))
                .collect();
        let on_page = batch.len();

        let fresh = seen.add_batch(batch);
        ::log::info!(
            "Pass {}: {} references on the page, {} new",
            self.passes,
            on_page,
            fresh.len()
        );

        if fresh.is_empty() {
            self.stagnant += 1;
        } else {
            self.stagnant = 0;
        }

        if self.config.stagnant_limit > 0 && self.stagnant >= self.config.stagnant_limit {
            self.exhausted = Some(ExhaustReason::Stagnant);
            return Ok(Some(fresh));
        }

        if self.config.max_extractions_per_category > 0
            && self.passes >= self.config.max_extractions_per_category
        {
            self.exhausted = Some(ExhaustReason::PageCeiling);
            return Ok(Some(fresh));
        }

        match self.load_more(driver).await {
            Ok(LoadMore::Clicked) => {}
            Ok(LoadMore::Gone) => self.exhausted = Some(ExhaustReason::NoMoreContent),
            Err(RetryError::Exhausted { attempts, last }) => {
                ::log::warn!("Load more gave up after {} attempts: {}", attempts, last);
                self.exhausted = Some(ExhaustReason::RetriesSpent);
            }
            Err(RetryError::Fatal(err)) => return Err(err),
        }

        Ok(Some(fresh))
    }

    /// Clicks the load-more control under the retry policy, refreshing the
    /// page between attempts
    async fn load_more<D: PageDriver>(&self, driver: &D) -> Result<LoadMore, RetryError> {
        let selector = self.config.selectors.load_more.as_str();
        let element_wait = self.config.element_wait();
        let page_ready = self.config.page_ready();
        let pacer = self.pacer;

        self.retry
            .run_with_recovery(
                "load more",
                move || async move {
                    if !driver.appears(selector, element_wait).await? {
                        return Ok(LoadMore::Gone);
                    }
                    driver.scroll_into_view(selector).await?;
                    pacer.pre_click().await;
                    driver.click(selector).await?;
                    driver.wait_until_ready(page_ready).await?;
                    pacer.load_settle().await;
                    Ok(LoadMore::Clicked)
                },
                move || async move {
                    driver.refresh().await?;
                    driver.wait_until_ready(page_ready).await
                },
            )
            .await
    }

    /// Why the category stopped, once it has
    pub fn reason(&self) -> Option<ExhaustReason> {
        self.exhausted
    }

    /// Extraction passes run since `begin`
    pub fn passes(&self) -> u32 {
        self.passes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::scripted::ScriptedDriver;

    const PAGE_AB: &str = r#"
        <div data-testid="auto-grid-cell"><a href="/p/a/1">A</a></div>
        <div data-testid="auto-grid-cell"><a href="/p/b/2">B</a></div>
    "#;

    const PAGE_ABC: &str = r#"
        <div data-testid="auto-grid-cell"><a href="/p/a/1">A</a></div>
        <div data-testid="auto-grid-cell"><a href="/p/b/2">B</a></div>
        <div data-testid="auto-grid-cell"><a href="/p/c/3">C</a></div>
    "#;

    fn config() -> CrawlerConfig {
        let mut config = CrawlerConfig::default();
        config.max_retries = 1;
        config.initial_delay_secs = 0.0;
        config
    }

    fn base() -> Url {
        Url::parse("https://www.kroger.com/").unwrap()
    }

    fn refs(fresh: &[ItemReference]) -> Vec<&str> {
        fresh.iter().map(|r| r.as_str()).collect()
    }

    fn search_ready(config: &CrawlerConfig) -> ScriptedDriver {
        ScriptedDriver::new()
            .with_present(&config.selectors.search_input)
            .with_present(&config.selectors.grid_cell)
    }

    #[tokio::test]
    async fn test_begin_runs_the_search() {
        let config = config();
        let driver = search_ready(&config).with_present(&config.selectors.search_bar_closed);
        let filter = RefFilter::default();
        let pacer = Pacer::zero();
        let base = base();
        let mut paginator = Paginator::new(&config, &filter, &pacer, &base);

        let started = paginator.begin(&driver, "Bakery").await.unwrap();

        assert!(started);
        let calls = driver.calls();
        assert!(calls
            .iter()
            .any(|c| c.starts_with("click ") && c.contains(&config.selectors.search_bar_closed)));
        assert!(calls.iter().any(|c| c.contains("Bakery")));
        assert!(calls
            .iter()
            .any(|c| c.starts_with("enter ") && c.contains(&config.selectors.search_input)));
    }

    #[tokio::test]
    async fn test_begin_without_results_grid() {
        let config = config();
        let driver = ScriptedDriver::new().with_present(&config.selectors.search_input);
        let filter = RefFilter::default();
        let pacer = Pacer::zero();
        let base = base();
        let mut paginator = Paginator::new(&config, &filter, &pacer, &base);

        let started = paginator.begin(&driver, "Bakery").await.unwrap();

        assert!(!started);
    }

    #[tokio::test]
    async fn test_ceiling_counts_extraction_passes() {
        let mut config = config();
        config.max_extractions_per_category = 2;
        let driver = ScriptedDriver::new()
            .with_present(&config.selectors.load_more)
            .with_source(PAGE_AB)
            .with_source(PAGE_ABC);
        let filter = RefFilter::default();
        let pacer = Pacer::zero();
        let base = base();
        let mut paginator = Paginator::new(&config, &filter, &pacer, &base);
        let mut seen = DiscoverySet::new();

        let first = paginator.next_batch(&driver, &mut seen).await.unwrap().unwrap();
        assert_eq!(
            refs(&first),
            vec!["https://www.kroger.com/p/a/1", "https://www.kroger.com/p/b/2"]
        );

        let second = paginator.next_batch(&driver, &mut seen).await.unwrap().unwrap();
        assert_eq!(refs(&second), vec!["https://www.kroger.com/p/c/3"]);

        let third = paginator.next_batch(&driver, &mut seen).await.unwrap();
        assert!(third.is_none());
        assert_eq!(paginator.reason(), Some(ExhaustReason::PageCeiling));
        assert_eq!(paginator.passes(), 2);

        // The second pass trips the ceiling before another click happens
        assert_eq!(driver.count_calls("click button.LoadMore"), 1);
    }

    #[tokio::test]
    async fn test_vanished_load_more_ends_the_category() {
        let config = config();
        let driver = ScriptedDriver::new().with_source(PAGE_AB);
        let filter = RefFilter::default();
        let pacer = Pacer::zero();
        let base = base();
        let mut paginator = Paginator::new(&config, &filter, &pacer, &base);
        let mut seen = DiscoverySet::new();

        let first = paginator.next_batch(&driver, &mut seen).await.unwrap().unwrap();
        assert_eq!(first.len(), 2);

        let second = paginator.next_batch(&driver, &mut seen).await.unwrap();
        assert!(second.is_none());
        assert_eq!(paginator.reason(), Some(ExhaustReason::NoMoreContent));
    }

    #[tokio::test]
    async fn test_stagnant_passes_end_the_category() {
        let mut config = config();
        config.stagnant_limit = 2;
        let driver = ScriptedDriver::new()
            .with_present(&config.selectors.load_more)
            .with_source(PAGE_AB);
        let filter = RefFilter::default();
        let pacer = Pacer::zero();
        let base = base();
        let mut paginator = Paginator::new(&config, &filter, &pacer, &base);
        let mut seen = DiscoverySet::new();

        assert_eq!(
            paginator.next_batch(&driver, &mut seen).await.unwrap().unwrap().len(),
            2
        );
        assert!(paginator.next_batch(&driver, &mut seen).await.unwrap().unwrap().is_empty());
        assert!(paginator.next_batch(&driver, &mut seen).await.unwrap().unwrap().is_empty());

        assert!(paginator.next_batch(&driver, &mut seen).await.unwrap().is_none());
        assert_eq!(paginator.reason(), Some(ExhaustReason::Stagnant));
    }

    #[tokio::test]
    async fn test_fresh_pass_resets_the_stagnation_count() {
        let mut config = config();
        config.stagnant_limit = 2;
        let driver = ScriptedDriver::new()
            .with_present(&config.selectors.load_more)
            .with_source(PAGE_AB)
            .with_source(PAGE_AB)
            .with_source(PAGE_ABC);
        let filter = RefFilter::default();
        let pacer = Pacer::zero();
        let base = base();
        let mut paginator = Paginator::new(&config, &filter, &pacer, &base);
        let mut seen = DiscoverySet::new();

        assert_eq!(
            paginator.next_batch(&driver, &mut seen).await.unwrap().unwrap().len(),
            2
        );
        assert!(paginator.next_batch(&driver, &mut seen).await.unwrap().unwrap().is_empty());
        assert_eq!(
            paginator.next_batch(&driver, &mut seen).await.unwrap().unwrap().len(),
            1
        );
        assert!(paginator.reason().is_none());
    }

    #[tokio::test]
    async fn test_spent_retries_end_the_category() {
        let config = config();
        let intercepted = || {
            Err(DriverError::ClickIntercepted {
                selector: config.selectors.load_more.clone(),
            })
        };
        let driver = ScriptedDriver::new()
            .with_present(&config.selectors.load_more)
            .with_source(PAGE_AB)
            .with_click_script(&config.selectors.load_more, vec![intercepted(), intercepted()]);
        let filter = RefFilter::default();
        let pacer = Pacer::zero();
        let base = base();
        let mut paginator = Paginator::new(&config, &filter, &pacer, &base);
        let mut seen = DiscoverySet::new();

        let first = paginator.next_batch(&driver, &mut seen).await.unwrap().unwrap();
        assert_eq!(first.len(), 2);

        assert!(paginator.next_batch(&driver, &mut seen).await.unwrap().is_none());
        assert_eq!(paginator.reason(), Some(ExhaustReason::RetriesSpent));

        // The page was refreshed between the two click attempts
        assert_eq!(driver.count_calls("refresh"), 1);
    }

    #[tokio::test]
    async fn test_session_loss_is_fatal() {
        let config = config();
        let driver = ScriptedDriver::new()
            .with_present(&config.selectors.load_more)
            .with_source(PAGE_AB)
            .with_click_script(
                &config.selectors.load_more,
                vec![Err(DriverError::SessionLost("session deleted".to_string()))],
            );
        let filter = RefFilter::default();
        let pacer = Pacer::zero();
        let base = base();
        let mut paginator = Paginator::new(&config, &filter, &pacer, &base);
        let mut seen = DiscoverySet::new();

        assert!(paginator.next_batch(&driver, &mut seen).await.is_err());
    }

    #[tokio::test]
    async fn test_off_domain_references_are_filtered() {
        let config = config();
        let filter = RefFilter::new(crate::filter::RefFilterConfig {
            required_domain: Some("www.kroger.com".to_string()),
            ..Default::default()
        })
        .unwrap();
        let html = r#"
            <div data-testid="auto-grid-cell"><a href="/p/a/1">A</a></div>
            <div data-testid="auto-grid-cell"><a href="https://ads.example.com/x">Ad</a></div>
        "#;
        let driver = ScriptedDriver::new().with_source(html);
        let pacer = Pacer::zero();
        let base = base();
        let mut paginator = Paginator::new(&config, &filter, &pacer, &base);
        let mut seen = DiscoverySet::new();

        let first = paginator.next_batch(&driver, &mut seen).await.unwrap().unwrap();
        assert_eq!(refs(&first), vec!["https://www.kroger.com/p/a/1"]);
    }
}
