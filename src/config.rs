use crate::error::CrawlError;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::time::Duration;

/// Browser identities drawn from when no user agent is configured
pub const USER_AGENT_POOL: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/123.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:125.0) Gecko/20100101 Firefox/125.0",
];

/// Configuration for the catalog crawler
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlerConfig {
    /// Catalog landing page every run starts from
    #[serde(default = "default_catalog_url")]
    pub catalog_url: String,

    /// URL for the WebDriver instance
    #[serde(default = "default_webdriver_url")]
    pub webdriver_url: String,

    /// Browser identity; drawn from the built-in pool when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,

    /// Run the browser without a visible window
    #[serde(default)]
    pub headless: bool,

    /// Zip code to bind a pickup store for; no binding when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub store_zip: Option<String>,

    /// Treat a failed store binding as fatal for the run
    #[serde(default)]
    pub require_store: bool,

    /// Category search terms, crawled in order
    #[serde(default = "default_categories")]
    pub categories: Vec<String>,

    /// Most extraction passes allowed per category, 0 for no ceiling
    #[serde(default = "default_max_extractions")]
    pub max_extractions_per_category: u32,

    /// Consecutive zero-new passes before a category is called exhausted,
    /// 0 to disable the check
    #[serde(default = "default_stagnant_limit")]
    pub stagnant_limit: u32,

    /// Retries after the first failed attempt of a retried operation
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Backoff delay before the first retry, in seconds
    #[serde(default = "default_initial_delay_secs")]
    pub initial_delay_secs: f64,

    /// Multiplier applied to the backoff delay per further retry
    #[serde(default = "default_backoff_factor")]
    pub backoff_factor: f64,

    /// How long to wait for an expected element, in seconds
    #[serde(default = "default_element_wait_secs")]
    pub element_wait_secs: u64,

    /// How long to wait for a short-lived overlay or control, in seconds
    #[serde(default = "default_overlay_wait_secs")]
    pub overlay_wait_secs: u64,

    /// How long to wait for a page to finish loading, in seconds
    #[serde(default = "default_page_ready_secs")]
    pub page_ready_secs: u64,

    /// Collect links only and skip the detail pass
    #[serde(default)]
    pub links_only: bool,

    /// Where the unique links CSV is written
    #[serde(default = "default_links_path")]
    pub links_path: String,

    /// Where the extracted records CSV is written
    #[serde(default = "default_records_path")]
    pub records_path: String,

    /// Regex patterns references must match (empty matches everything)
    #[serde(default)]
    pub include_patterns: Vec<String>,

    /// Regex patterns that reject references, taking precedence
    #[serde(default)]
    pub exclude_patterns: Vec<String>,

    /// Keep only references on the catalog's own domain
    #[serde(default = "default_same_domain")]
    pub same_domain: bool,

    /// Human-paced delay ranges
    #[serde(default)]
    pub pacing: PacingConfig,

    /// Page element selectors
    #[serde(default)]
    pub selectors: SelectorConfig,
}

/// Delay ranges in seconds for the pacing policy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PacingConfig {
    /// Settle after the first landing-page load
    #[serde(default = "default_page_settle")]
    pub page_settle: (f64, f64),

    /// Settle after submitting a category search
    #[serde(default = "default_search_settle")]
    pub search_settle: (f64, f64),

    /// Pause between scrolling to a control and clicking it
    #[serde(default = "default_pre_click")]
    pub pre_click: (f64, f64),

    /// Settle after a load-more click while new items render
    #[serde(default = "default_load_settle")]
    pub load_settle: (f64, f64),

    /// Pause between detail-page visits
    #[serde(default = "default_between_items")]
    pub between_items: (f64, f64),

    /// Settle on a product page before snapshotting it
    #[serde(default = "default_product_settle")]
    pub product_settle: (f64, f64),

    /// Pause between dialog steps
    #[serde(default = "default_ui_step")]
    pub ui_step: (f64, f64),

    /// Delay between typed characters, in seconds
    #[serde(default = "default_keystroke_secs")]
    pub keystroke_secs: f64,
}

/// Page element selectors, CSS by default with an `xpath=` prefix escape
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectorConfig {
    /// One result tile in the search grid
    #[serde(default = "default_grid_cell")]
    pub grid_cell: String,

    /// The control that appends the next page of results
    #[serde(default = "default_load_more")]
    pub load_more: String,

    /// The collapsed search bar that must be clicked open first
    #[serde(default = "default_search_bar_closed")]
    pub search_bar_closed: String,

    /// The open search input that accepts the category term
    #[serde(default = "default_search_input")]
    pub search_input: String,

    /// Marker identifying the known blocking overlay
    #[serde(default = "default_overlay_marker")]
    pub overlay_marker: String,

    /// The overlay's dismiss control
    #[serde(default = "default_overlay_dismiss")]
    pub overlay_dismiss: String,

    /// Button opening the store selector
    #[serde(default = "default_store_button")]
    pub store_button: String,

    /// Close control of a store dialog left over from a previous visit
    #[serde(default = "default_store_dialog_close")]
    pub store_dialog_close: String,

    /// Pickup fulfillment option inside the store selector
    #[serde(default = "default_pickup_option")]
    pub pickup_option: String,

    /// Zip code input inside the store selector
    #[serde(default = "default_zip_input")]
    pub zip_input: String,

    /// Submit control for the zip code search
    #[serde(default = "default_zip_submit")]
    pub zip_submit: String,

    /// First store candidate offered for the zip code
    #[serde(default = "default_store_select")]
    pub store_select: String,

    /// Product page title
    #[serde(default = "default_product_title")]
    pub product_title: String,

    /// Product page item code
    #[serde(default = "default_product_upc")]
    pub product_upc: String,

    /// Product page in-store location
    #[serde(default = "default_product_location")]
    pub product_location: String,

    /// Breadcrumb links above the product title
    #[serde(default = "default_breadcrumb")]
    pub breadcrumb: String,

    /// Breadcrumb label that names the site root
    #[serde(default = "default_breadcrumb_root")]
    pub breadcrumb_root: String,

    /// Element carrying the plain price in an attribute
    #[serde(default = "default_price_value")]
    pub price_value: String,

    /// Container of a promotional price
    #[serde(default = "default_promo_mark")]
    pub promo_mark: String,

    /// Whole-dollar part of a promotional price
    #[serde(default = "default_promo_dollars")]
    pub promo_dollars: String,

    /// Fractional part of a promotional price
    #[serde(default = "default_promo_cents")]
    pub promo_cents: String,

    /// Primary product image
    #[serde(default = "default_product_image")]
    pub product_image: String,
}

impl CrawlerConfig {
    /// Load configuration from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, CrawlError> {
        let path_text = path.as_ref().display().to_string();
        let mut file = File::open(&path).map_err(|source| CrawlError::ConfigRead {
            path: path_text.clone(),
            source,
        })?;
        let mut contents = String::new();
        file.read_to_string(&mut contents)
            .map_err(|source| CrawlError::ConfigRead {
                path: path_text.clone(),
                source,
            })?;

        let config: Self =
            serde_json::from_str(&contents).map_err(|source| CrawlError::ConfigParse {
                path: path_text,
                source,
            })?;
        Ok(config)
    }

    /// Wait budget for an expected element
    pub fn element_wait(&self) -> Duration {
        Duration::from_secs(self.element_wait_secs)
    }

    /// Wait budget for short-lived overlays and optional controls
    pub fn overlay_wait(&self) -> Duration {
        Duration::from_secs(self.overlay_wait_secs)
    }

    /// Wait budget for a page load to complete
    pub fn page_ready(&self) -> Duration {
        Duration::from_secs(self.page_ready_secs)
    }
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            catalog_url: default_catalog_url(),
            webdriver_url: default_webdriver_url(),
            user_agent: None,
            headless: false,
            store_zip: None,
            require_store: false,
            categories: default_categories(),
            max_extractions_per_category: default_max_extractions(),
            stagnant_limit: default_stagnant_limit(),
            max_retries: default_max_retries(),
            initial_delay_secs: default_initial_delay_secs(),
            backoff_factor: default_backoff_factor(),
            element_wait_secs: default_element_wait_secs(),
            overlay_wait_secs: default_overlay_wait_secs(),
            page_ready_secs: default_page_ready_secs(),
            links_only: false,
            links_path: default_links_path(),
            records_path: default_records_path(),
            include_patterns: Vec::new(),
            exclude_patterns: Vec::new(),
            same_domain: default_same_domain(),
            pacing: PacingConfig::default(),
            selectors: SelectorConfig::default(),
        }
    }
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            page_settle: default_page_settle(),
            search_settle: default_search_settle(),
            pre_click: default_pre_click(),
            load_settle: default_load_settle(),
            between_items: default_between_items(),
            product_settle: default_product_settle(),
            ui_step: default_ui_step(),
            keystroke_secs: default_keystroke_secs(),
        }
    }
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            grid_cell: default_grid_cell(),
            load_more: default_load_more(),
            search_bar_closed: default_search_bar_closed(),
            search_input: default_search_input(),
            overlay_marker: default_overlay_marker(),
            overlay_dismiss: default_overlay_dismiss(),
            store_button: default_store_button(),
            store_dialog_close: default_store_dialog_close(),
            pickup_option: default_pickup_option(),
            zip_input: default_zip_input(),
            zip_submit: default_zip_submit(),
            store_select: default_store_select(),
            product_title: default_product_title(),
            product_upc: default_product_upc(),
            product_location: default_product_location(),
            breadcrumb: default_breadcrumb(),
            breadcrumb_root: default_breadcrumb_root(),
            price_value: default_price_value(),
            promo_mark: default_promo_mark(),
            promo_dollars: default_promo_dollars(),
            promo_cents: default_promo_cents(),
            product_image: default_product_image(),
        }
    }
}

/// Default catalog landing page
fn default_catalog_url() -> String {
    "https://www.kroger.com".to_string()
}

/// Default value for webdriver_url
fn default_webdriver_url() -> String {
    "http://localhost:4444".to_string()
}

/// Default category search terms
fn default_categories() -> Vec<String> {
    [
        "Meat",
        "Seafood",
        "Produce",
        "Deli",
        "Bakery",
        "Dairy & Eggs",
        "Pantry",
        "Beverage",
        "Breakfast",
        "Natural & Organic",
        "Adult Beverage",
        "Frozen",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

/// Default extraction-pass ceiling per category
fn default_max_extractions() -> u32 {
    1000
}

/// Default stagnation limit
fn default_stagnant_limit() -> u32 {
    2
}

/// Default retry budget
fn default_max_retries() -> u32 {
    3
}

/// Default first backoff delay
fn default_initial_delay_secs() -> f64 {
    2.0
}

/// Default backoff multiplier
fn default_backoff_factor() -> f64 {
    2.0
}

/// Default element wait
fn default_element_wait_secs() -> u64 {
    10
}

/// Default overlay wait
fn default_overlay_wait_secs() -> u64 {
    3
}

/// Default page-ready wait
fn default_page_ready_secs() -> u64 {
    30
}

/// Default links output path
fn default_links_path() -> String {
    "product_links.csv".to_string()
}

/// Default records output path
fn default_records_path() -> String {
    "product_details.csv".to_string()
}

/// Default same-domain restriction
fn default_same_domain() -> bool {
    true
}

fn default_page_settle() -> (f64, f64) {
    (5.0, 10.0)
}

fn default_search_settle() -> (f64, f64) {
    (3.0, 7.0)
}

fn default_pre_click() -> (f64, f64) {
    (1.0, 3.0)
}

fn default_load_settle() -> (f64, f64) {
    (2.0, 5.0)
}

fn default_between_items() -> (f64, f64) {
    (1.5, 3.5)
}

fn default_product_settle() -> (f64, f64) {
    (3.0, 3.0)
}

fn default_ui_step() -> (f64, f64) {
    (1.0, 2.0)
}

fn default_keystroke_secs() -> f64 {
    0.2
}

fn default_grid_cell() -> String {
    r#"div[data-testid="auto-grid-cell"]"#.to_string()
}

fn default_load_more() -> String {
    "button.LoadMore__load-more-button".to_string()
}

fn default_search_bar_closed() -> String {
    "#SearchBar-input".to_string()
}

fn default_search_input() -> String {
    "#SearchBar-input-open".to_string()
}

fn default_overlay_marker() -> String {
    "xpath=//div[contains(text(), 'We want to hear from you!')]".to_string()
}

fn default_overlay_dismiss() -> String {
    "xpath=//button[contains(text(), 'No, thanks')]".to_string()
}

fn default_store_button() -> String {
    "#CurrentModality-button-A11Y-FOCUS-ID".to_string()
}

fn default_store_dialog_close() -> String {
    "#ModalitySelector--CloseButton".to_string()
}

fn default_pickup_option() -> String {
    r#"[data-testid="ModalityOption-Button-PICKUP"]"#.to_string()
}

fn default_zip_input() -> String {
    r#"[data-testid="PostalCodeSearchBox-input"]"#.to_string()
}

fn default_zip_submit() -> String {
    r#"xpath=//button[@aria-label="Search"]"#.to_string()
}

fn default_store_select() -> String {
    r#"button[data-testid^="SelectStore-"]"#.to_string()
}

fn default_product_title() -> String {
    r#"h1[data-testid="product-details-name"]"#.to_string()
}

fn default_product_upc() -> String {
    r#"span[data-testid="product-details-upc"]"#.to_string()
}

fn default_product_location() -> String {
    r#"span[data-testid="product-details-location"]"#.to_string()
}

fn default_breadcrumb() -> String {
    "a.kds-Link.kds-Link--inherit.mr-4".to_string()
}

fn default_breadcrumb_root() -> String {
    "Home".to_string()
}

fn default_price_value() -> String {
    r#"[typeof="Price"]"#.to_string()
}

fn default_promo_mark() -> String {
    "mark.kds-Price-promotional".to_string()
}

fn default_promo_dollars() -> String {
    "span.kds-Price-promotional-dropCaps".to_string()
}

fn default_promo_cents() -> String {
    "sup.kds-Price-superscript".to_string()
}

fn default_product_image() -> String {
    ".ProductImages-image".to_string()
}
