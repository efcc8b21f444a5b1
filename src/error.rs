use thiserror::Error;

/// Failures surfaced by the page driver layer.
#[derive(Debug, Clone, Error)]
pub enum DriverError {
    /// A bounded wait elapsed without the target appearing
    #[error("timed out after {waited_ms}ms waiting for {what}")]
    Timeout { what: String, waited_ms: u64 },

    /// The element exists but cannot currently be interacted with
    #[error("element `{selector}` is not interactable")]
    NotInteractable { selector: String },

    /// Another element swallowed the click
    #[error("click on `{selector}` was intercepted")]
    ClickIntercepted { selector: String },

    /// The element went stale between lookup and use
    #[error("stale element reference for `{selector}`")]
    Stale { selector: String },

    /// The browser session is gone and cannot be recovered by retrying
    #[error("browser session lost: {0}")]
    SessionLost(String),

    /// Any other WebDriver command failure
    #[error("driver command failed: {0}")]
    Command(String),

    /// A tab handle that the driver does not know about
    #[error("no tab with handle `{0}`")]
    UnknownTab(String),
}

impl DriverError {
    /// Whether a bounded retry can reasonably clear this failure.
    ///
    /// Timeouts, blocked clicks and stale references come and go with
    /// page re-renders; session and protocol failures do not.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            DriverError::Timeout { .. }
                | DriverError::NotInteractable { .. }
                | DriverError::ClickIntercepted { .. }
                | DriverError::Stale { .. }
        )
    }
}

/// Outcome of a retried operation that never succeeded.
#[derive(Debug, Error)]
pub enum RetryError {
    /// Every attempt failed with a retryable error
    #[error("gave up after {attempts} attempts: {last}")]
    Exhausted { attempts: u32, last: DriverError },

    /// A non-retryable error cut the attempts short
    #[error("unrecoverable driver failure: {0}")]
    Fatal(DriverError),
}

/// Top-level failures that end a run before or outside the crawl loop.
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("could not read config file `{path}`: {source}")]
    ConfigRead {
        path: String,
        source: std::io::Error,
    },

    #[error("could not parse config file `{path}`: {source}")]
    ConfigParse {
        path: String,
        source: serde_json::Error,
    },

    #[error("invalid reference filter pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("invalid catalog URL `{url}`: {source}")]
    BadUrl {
        url: String,
        source: url::ParseError,
    },

    #[error("could not establish a browser session: {0}")]
    Session(String),

    #[error("failed writing `{path}`: {source}")]
    Export {
        path: String,
        source: std::io::Error,
    },
}

/// Crate-wide result alias for top-level operations.
pub type Result<T> = std::result::Result<T, CrawlError>;
