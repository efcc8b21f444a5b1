use crate::config::CrawlerConfig;
use crate::dedupe::DiscoverySet;
use crate::details;
use crate::driver::PageDriver;
use crate::error::RetryError;
use crate::extract::RecordSpecs;
use crate::filter::RefFilter;
use crate::locale;
use crate::overlay;
use crate::pacing::Pacer;
use crate::paginate::Paginator;
use crate::results::CrawlOutcome;
use crate::retry::RetryPolicy;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Runs the full crawl: opens the catalog, binds the store, then walks
/// every configured category through search, pagination and detail
/// extraction.
///
/// Always returns an outcome. Failures that end the run early leave their
/// reason in `aborted` next to whatever was collected up to that point.
pub async fn run<D: PageDriver>(
    driver: &D,
    config: &CrawlerConfig,
    filter: &RefFilter,
    base: &Url,
    pacer: &Pacer,
    cancel: &CancellationToken,
) -> CrawlOutcome {
    let mut outcome = CrawlOutcome::default();
    let selectors = &config.selectors;

    if let Err(err) = open_catalog(driver, config, base).await {
        ::log::error!("Could not open the catalog at {}: {}", base, err);
        outcome.aborted = Some(format!("catalog unreachable: {}", err));
        return outcome;
    }
    pacer.page_settle().await;

    overlay::try_dismiss(driver, selectors, pacer, config.overlay_wait()).await;

    if let Some(zip) = &config.store_zip {
        let bound =
            locale::select_store(driver, selectors, pacer, zip, config.element_wait()).await;
        if !bound && config.require_store {
            ::log::error!("Store binding failed and the run requires a bound store");
            outcome.aborted = Some("store binding failed".to_string());
            return outcome;
        }
        if bound {
            // Selecting a store reloads the page, which can resurface
            // the feedback overlay
            overlay::try_dismiss(driver, selectors, pacer, config.overlay_wait()).await;
        }
    }

    let specs = RecordSpecs::from_selectors(selectors);
    let mut seen = DiscoverySet::new();

    'categories: for category in &config.categories {
        if cancel.is_cancelled() {
            outcome.aborted = Some("cancelled".to_string());
            break;
        }

        overlay::try_dismiss(driver, selectors, pacer, config.overlay_wait()).await;

        let mut paginator = Paginator::new(config, filter, pacer, base);
        match paginator.begin(driver, category).await {
            Ok(true) => {}
            Ok(false) => {
                ::log::info!("Skipping category {}", category);
                continue;
            }
            Err(err) => {
                ::log::error!("Search failed for {}: {}", category, err);
                outcome.aborted = Some(format!("search failed for {}: {}", category, err));
                break;
            }
        }

        loop {
            if cancel.is_cancelled() {
                outcome.aborted = Some("cancelled".to_string());
                break 'categories;
            }

            let fresh = match paginator.next_batch(driver, &mut seen).await {
                Ok(Some(fresh)) => fresh,
                Ok(None) => {
                    if let Some(reason) = paginator.reason() {
                        ::log::info!(
                            "Category {} exhausted after {} passes: {}",
                            category,
                            paginator.passes(),
                            reason
                        );
                    }
                    break;
                }
                Err(err) => {
                    ::log::error!("Pagination failed for {}: {}", category, err);
                    outcome.aborted = Some(format!("pagination failed for {}: {}", category, err));
                    break 'categories;
                }
            };

            if config.links_only || fresh.is_empty() {
                continue;
            }

            match details::process_batch(driver, &specs, pacer, &fresh, cancel).await {
                Ok(records) => outcome.records.extend(records),
                Err(err) => {
                    ::log::error!("Detail extraction failed for {}: {}", category, err);
                    outcome.aborted =
                        Some(format!("detail extraction failed for {}: {}", category, err));
                    break 'categories;
                }
            }
        }
    }

    outcome.references = seen.into_ordered();
    ::log::info!(
        "Crawl finished with {} references and {} records",
        outcome.references.len(),
        outcome.records.len()
    );
    outcome
}

/// Opens the catalog landing page under the retry policy
async fn open_catalog<D: PageDriver>(
    driver: &D,
    config: &CrawlerConfig,
    base: &Url,
) -> Result<(), RetryError> {
    let retry = RetryPolicy::new(
        config.max_retries,
        Duration::from_secs_f64(config.initial_delay_secs.max(0.0)),
        config.backoff_factor,
    );
    let url = base.as_str();
    let page_ready = config.page_ready();

    retry
        .run("open catalog", move || async move {
            driver.goto(url).await?;
            driver.wait_until_ready(page_ready).await
        })
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::scripted::ScriptedDriver;
    use crate::error::DriverError;

    const GRID: &str = r#"
        <div data-testid="auto-grid-cell"><a href="/p/a/1">A</a></div>
        <div data-testid="auto-grid-cell"><a href="/p/b/2">B</a></div>
    "#;

    const PRODUCT_A: &str = r#"<h1 data-testid="product-details-name">Product A</h1>"#;
    const PRODUCT_B: &str = r#"<h1 data-testid="product-details-name">Product B</h1>"#;

    fn config() -> CrawlerConfig {
        let mut config = CrawlerConfig::default();
        config.categories = vec!["Bakery".to_string()];
        config.max_retries = 0;
        config.initial_delay_secs = 0.0;
        config
    }

    fn base() -> Url {
        Url::parse("https://www.kroger.com/").unwrap()
    }

    fn search_ready(config: &CrawlerConfig) -> ScriptedDriver {
        ScriptedDriver::new()
            .with_present(&config.selectors.search_input)
            .with_present(&config.selectors.grid_cell)
    }

    #[tokio::test]
    async fn test_links_only_run() {
        let mut config = config();
        config.links_only = true;
        let driver = search_ready(&config).with_source(GRID);
        let filter = RefFilter::default();
        let pacer = Pacer::zero();
        let base = base();

        let outcome = run(
            &driver,
            &config,
            &filter,
            &base,
            &pacer,
            &CancellationToken::new(),
        )
        .await;

        assert!(outcome.aborted.is_none());
        assert_eq!(outcome.references.len(), 2);
        assert!(outcome.records.is_empty());
        assert_eq!(driver.count_calls("open_tab"), 0);
    }

    #[tokio::test]
    async fn test_full_run_extracts_records() {
        let config = config();
        let driver = search_ready(&config)
            .with_source(GRID)
            .with_source(PRODUCT_A)
            .with_source(PRODUCT_B);
        let filter = RefFilter::default();
        let pacer = Pacer::zero();
        let base = base();

        let outcome = run(
            &driver,
            &config,
            &filter,
            &base,
            &pacer,
            &CancellationToken::new(),
        )
        .await;

        assert!(outcome.aborted.is_none());
        assert_eq!(outcome.references.len(), 2);
        assert_eq!(outcome.records.len(), 2);
        assert_eq!(outcome.records[0].title, "Product A");
        assert_eq!(outcome.records[1].title, "Product B");
        assert_eq!(driver.count_calls("open_tab"), 1);
    }

    #[tokio::test]
    async fn test_required_store_binding_aborts_when_unbound() {
        let mut config = config();
        config.store_zip = Some("60601".to_string());
        config.require_store = true;
        let driver = ScriptedDriver::new();
        let filter = RefFilter::default();
        let pacer = Pacer::zero();
        let base = base();

        let outcome = run(
            &driver,
            &config,
            &filter,
            &base,
            &pacer,
            &CancellationToken::new(),
        )
        .await;

        assert_eq!(outcome.aborted.as_deref(), Some("store binding failed"));
        assert!(outcome.references.is_empty());
    }

    #[tokio::test]
    async fn test_optional_store_binding_continues_unbound() {
        let mut config = config();
        config.links_only = true;
        config.store_zip = Some("60601".to_string());
        config.require_store = false;
        let driver = search_ready(&config).with_source(GRID);
        let filter = RefFilter::default();
        let pacer = Pacer::zero();
        let base = base();

        let outcome = run(
            &driver,
            &config,
            &filter,
            &base,
            &pacer,
            &CancellationToken::new(),
        )
        .await;

        assert!(outcome.aborted.is_none());
        assert_eq!(outcome.references.len(), 2);
    }

    #[tokio::test]
    async fn test_cancelled_run_keeps_partial_outcome() {
        let config = config();
        let driver = search_ready(&config).with_source(GRID);
        let filter = RefFilter::default();
        let pacer = Pacer::zero();
        let base = base();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let outcome = run(&driver, &config, &filter, &base, &pacer, &cancel).await;

        assert_eq!(outcome.aborted.as_deref(), Some("cancelled"));
        assert!(outcome.references.is_empty());
        assert_eq!(driver.count_calls("type"), 0);
    }

    #[tokio::test]
    async fn test_unreachable_catalog_aborts() {
        let config = config();
        let driver = ScriptedDriver::new().with_goto_script(
            "https://www.kroger.com/",
            vec![Err(DriverError::Timeout {
                what: "navigation".to_string(),
                waited_ms: 30_000,
            })],
        );
        let filter = RefFilter::default();
        let pacer = Pacer::zero();
        let base = base();

        let outcome = run(
            &driver,
            &config,
            &filter,
            &base,
            &pacer,
            &CancellationToken::new(),
        )
        .await;

        let aborted = outcome.aborted.unwrap();
        assert!(aborted.starts_with("catalog unreachable"));
        assert!(outcome.references.is_empty());
    }

    #[tokio::test]
    async fn test_unsearchable_category_is_skipped() {
        let mut config = config();
        config.links_only = true;
        config.categories = vec!["Bakery".to_string(), "Frozen".to_string()];
        let search_input = config.selectors.search_input.clone();
        let driver = search_ready(&config).with_source(GRID).with_wait_script(
            &search_input,
            vec![
                Err(DriverError::Timeout {
                    what: "search input".to_string(),
                    waited_ms: 10_000,
                }),
                Ok(()),
            ],
        );
        let filter = RefFilter::default();
        let pacer = Pacer::zero();
        let base = base();

        let outcome = run(
            &driver,
            &config,
            &filter,
            &base,
            &pacer,
            &CancellationToken::new(),
        )
        .await;

        // Bakery never got a results grid; Frozen still ran
        assert!(outcome.aborted.is_none());
        assert_eq!(outcome.references.len(), 2);
        assert_eq!(driver.count_calls("type"), 1);
    }
}
