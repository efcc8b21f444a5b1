use crate::config::{CrawlerConfig, USER_AGENT_POOL};
use crate::driver::{PageDriver, SelectorKind, TabHandle, parse_selector};
use crate::error::{CrawlError, DriverError};
use async_trait::async_trait;
use fantoccini::elements::Element;
use fantoccini::error::CmdError;
use fantoccini::key::Key;
use fantoccini::wd::WindowHandle;
use fantoccini::{Client, ClientBuilder, Locator};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// How often document readiness is polled
const READY_POLL: Duration = Duration::from_millis(250);

/// Alternative WebDriver URLs tried when the configured one is unreachable
const FALLBACK_WEBDRIVER_URLS: &[&str] = &[
    "http://localhost:9515", // ChromeDriver default
    "http://127.0.0.1:4444", // Try with IP instead of localhost
];

/// A live WebDriver browsing session.
///
/// Owns the fantoccini client plus the window handles it has opened, so
/// tabs can be addressed by the plain string handles the engine carries.
pub struct WebSession {
    client: Client,
    tabs: Mutex<HashMap<String, WindowHandle>>,
}

impl WebSession {
    /// Establishes a browser session against the configured WebDriver,
    /// falling back to common local ports when it is unreachable.
    pub async fn connect(config: &CrawlerConfig) -> Result<Self, CrawlError> {
        let user_agent = config.user_agent.clone().unwrap_or_else(pick_user_agent);
        let caps = build_capabilities(&user_agent, config.headless);

        let mut urls = vec![config.webdriver_url.as_str()];
        for url in FALLBACK_WEBDRIVER_URLS {
            if *url != config.webdriver_url {
                urls.push(url);
            }
        }

        let mut last_error = None;
        for (i, url) in urls.iter().enumerate() {
            if i > 0 {
                ::log::info!("Trying fallback WebDriver URL: {}", url);
            }
            match ClientBuilder::native()
                .capabilities(caps.clone())
                .connect(url)
                .await
            {
                Ok(client) => {
                    ::log::info!("Connected to WebDriver at {}", url);
                    ::log::debug!("Session identifies as: {}", user_agent);
                    return Ok(Self {
                        client,
                        tabs: Mutex::new(HashMap::new()),
                    });
                }
                Err(e) => {
                    if i == 0 {
                        ::log::error!("Failed to connect to WebDriver at {}: {}", url, e);
                    }
                    last_error = Some(e);
                }
            }
        }

        ::log::error!(
            "Make sure a WebDriver server is running or set the WEBDRIVER_URL environment variable"
        );
        Err(CrawlError::Session(match last_error {
            Some(e) => e.to_string(),
            None => "no WebDriver URL to try".to_string(),
        }))
    }

    async fn find(&self, selector: &str) -> Result<Element, DriverError> {
        self.client
            .find(to_locator(selector))
            .await
            .map_err(|e| classify(selector, e))
    }

    /// Looks an element up and hands it to a script as `arguments[0]`.
    async fn run_on_element(&self, selector: &str, script: &str) -> Result<(), DriverError> {
        let element = self.find(selector).await?;
        let arg = serde_json::to_value(&element)
            .map_err(|e| DriverError::Command(format!("element not scriptable: {e}")))?;
        self.client
            .execute(script, vec![arg])
            .await
            .map_err(|e| classify(selector, e))?;
        Ok(())
    }
}

#[async_trait]
impl PageDriver for WebSession {
    async fn goto(&self, url: &str) -> Result<(), DriverError> {
        self.client.goto(url).await.map_err(|e| classify(url, e))
    }

    async fn refresh(&self) -> Result<(), DriverError> {
        self.client
            .refresh()
            .await
            .map_err(|e| classify("refresh", e))
    }

    async fn wait_until_ready(&self, timeout: Duration) -> Result<(), DriverError> {
        let started = Instant::now();
        loop {
            let state = self
                .client
                .execute("return document.readyState;", vec![])
                .await
                .map_err(|e| classify("document readiness", e))?;
            if state.as_str() == Some("complete") {
                return Ok(());
            }
            if started.elapsed() >= timeout {
                return Err(DriverError::Timeout {
                    what: "document ready".to_string(),
                    waited_ms: started.elapsed().as_millis() as u64,
                });
            }
            tokio::time::sleep(READY_POLL).await;
        }
    }

    async fn wait_for_element(&self, selector: &str, timeout: Duration) -> Result<(), DriverError> {
        match self
            .client
            .wait()
            .at_most(timeout)
            .for_element(to_locator(selector))
            .await
        {
            Ok(_) => Ok(()),
            Err(CmdError::WaitTimeout) => Err(DriverError::Timeout {
                what: format!("element `{selector}`"),
                waited_ms: timeout.as_millis() as u64,
            }),
            Err(e) => Err(classify(selector, e)),
        }
    }

    async fn exists(&self, selector: &str) -> Result<bool, DriverError> {
        let found = self
            .client
            .find_all(to_locator(selector))
            .await
            .map_err(|e| classify(selector, e))?;
        Ok(!found.is_empty())
    }

    async fn click(&self, selector: &str) -> Result<(), DriverError> {
        let element = self.find(selector).await?;
        element.click().await.map_err(|e| classify(selector, e))
    }

    async fn click_js(&self, selector: &str) -> Result<(), DriverError> {
        self.run_on_element(selector, "arguments[0].click();").await
    }

    async fn clear(&self, selector: &str) -> Result<(), DriverError> {
        let element = self.find(selector).await?;
        element.clear().await.map_err(|e| classify(selector, e))
    }

    async fn type_text(
        &self,
        selector: &str,
        text: &str,
        keystroke_delay: Duration,
    ) -> Result<(), DriverError> {
        let element = self.find(selector).await?;
        for ch in text.chars() {
            element
                .send_keys(&ch.to_string())
                .await
                .map_err(|e| classify(selector, e))?;
            if !keystroke_delay.is_zero() {
                tokio::time::sleep(keystroke_delay).await;
            }
        }
        Ok(())
    }

    async fn press_enter(&self, selector: &str) -> Result<(), DriverError> {
        let element = self.find(selector).await?;
        let enter = char::from(Key::Enter).to_string();
        element
            .send_keys(&enter)
            .await
            .map_err(|e| classify(selector, e))
    }

    async fn scroll_into_view(&self, selector: &str) -> Result<(), DriverError> {
        self.run_on_element(selector, "arguments[0].scrollIntoView();")
            .await
    }

    async fn page_source(&self) -> Result<String, DriverError> {
        self.client
            .source()
            .await
            .map_err(|e| classify("page source", e))
    }

    async fn open_tab(&self) -> Result<TabHandle, DriverError> {
        let response = self
            .client
            .new_window(true)
            .await
            .map_err(|e| classify("new tab", e))?;
        let key = String::from(response.handle.clone());
        self.tabs.lock().await.insert(key.clone(), response.handle);
        Ok(TabHandle::new(key))
    }

    async fn switch_tab(&self, tab: &TabHandle) -> Result<(), DriverError> {
        let handle = self.tabs.lock().await.get(tab.as_str()).cloned();
        let handle = handle.ok_or_else(|| DriverError::UnknownTab(tab.as_str().to_string()))?;
        self.client
            .switch_to_window(handle)
            .await
            .map_err(|e| classify("switch tab", e))
    }

    async fn close_current_tab(&self) -> Result<(), DriverError> {
        let current = self
            .client
            .window()
            .await
            .map_err(|e| classify("current tab", e))?;
        self.client
            .close_window()
            .await
            .map_err(|e| classify("close tab", e))?;
        self.tabs.lock().await.remove(&String::from(current));
        Ok(())
    }

    async fn current_tab(&self) -> Result<TabHandle, DriverError> {
        let handle = self
            .client
            .window()
            .await
            .map_err(|e| classify("current tab", e))?;
        let key = String::from(handle.clone());
        self.tabs
            .lock()
            .await
            .entry(key.clone())
            .or_insert(handle);
        Ok(TabHandle::new(key))
    }

    async fn quit(&self) -> Result<(), DriverError> {
        self.client
            .clone()
            .close()
            .await
            .map_err(|e| classify("quit", e))
    }
}

/// Maps a selector string onto the wire locator
fn to_locator(raw: &str) -> Locator<'_> {
    match parse_selector(raw) {
        SelectorKind::Css(css) => Locator::Css(css),
        SelectorKind::XPath(xpath) => Locator::XPath(xpath),
    }
}

/// Draws a browser identity from the built-in pool
fn pick_user_agent() -> String {
    USER_AGENT_POOL[fastrand::usize(..USER_AGENT_POOL.len())].to_string()
}

fn build_capabilities(user_agent: &str, headless: bool) -> serde_json::Map<String, serde_json::Value> {
    let mut args = vec![
        format!("user-agent={user_agent}"),
        "--window-size=1920,1080".to_string(),
        "--no-sandbox".to_string(),
        "--disable-dev-shm-usage".to_string(),
    ];
    if headless {
        args.push("--headless".to_string());
    }

    let mut caps = serde_json::Map::new();
    caps.insert(
        "goog:chromeOptions".to_string(),
        serde_json::json!({ "args": args }),
    );
    caps
}

/// Sorts a command failure into the retryable/fatal classes the crawl
/// engine acts on. Wire-level detail beyond that is kept as text.
fn classify(context: &str, err: CmdError) -> DriverError {
    if matches!(err, CmdError::WaitTimeout) {
        return DriverError::Timeout {
            what: context.to_string(),
            waited_ms: 0,
        };
    }
    if err.is_no_such_element() {
        // The element vanished between render and lookup
        return DriverError::Timeout {
            what: format!("element `{context}`"),
            waited_ms: 0,
        };
    }

    let text = err.to_string();
    let lower = text.to_lowercase();
    if lower.contains("stale element") {
        DriverError::Stale {
            selector: context.to_string(),
        }
    } else if lower.contains("not interactable") {
        DriverError::NotInteractable {
            selector: context.to_string(),
        }
    } else if lower.contains("click intercepted") || lower.contains("is not clickable") {
        DriverError::ClickIntercepted {
            selector: context.to_string(),
        }
    } else if lower.contains("invalid session")
        || lower.contains("unable to find session")
        || lower.contains("session deleted")
    {
        DriverError::SessionLost(text)
    } else {
        DriverError::Command(text)
    }
}
