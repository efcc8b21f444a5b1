use crate::driver::{PageDriver, TabHandle};
use crate::error::DriverError;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

/// In-memory stand-in for a browser session.
///
/// Page sources are served from a queue (the final one keeps repeating),
/// element presence comes from a set, and individual waits, clicks and
/// navigations can be overridden with per-target result scripts. Every
/// operation is recorded for assertions on call order.
#[derive(Default)]
pub struct ScriptedDriver {
    sources: Mutex<VecDeque<String>>,
    present: Mutex<HashSet<String>>,
    wait_scripts: Mutex<HashMap<String, VecDeque<Result<(), DriverError>>>>,
    click_scripts: Mutex<HashMap<String, VecDeque<Result<(), DriverError>>>>,
    goto_scripts: Mutex<HashMap<String, VecDeque<Result<(), DriverError>>>>,
    log: Mutex<Vec<String>>,
    tabs: Mutex<TabState>,
}

struct TabState {
    open: Vec<String>,
    current: String,
    next_id: u32,
}

impl Default for TabState {
    fn default() -> Self {
        Self {
            open: vec!["main".to_string()],
            current: "main".to_string(),
            next_id: 1,
        }
    }
}

impl ScriptedDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a page source snapshot
    pub fn with_source(self, html: &str) -> Self {
        self.sources.lock().unwrap().push_back(html.to_string());
        self
    }

    /// Mark a selector as present in the page
    pub fn with_present(self, selector: &str) -> Self {
        self.present.lock().unwrap().insert(selector.to_string());
        self
    }

    /// Script the outcomes of successive waits on one selector; once the
    /// script runs out, the presence set decides again
    pub fn with_wait_script(self, selector: &str, results: Vec<Result<(), DriverError>>) -> Self {
        self.wait_scripts
            .lock()
            .unwrap()
            .insert(selector.to_string(), results.into());
        self
    }

    /// Script the outcomes of successive clicks on one selector
    pub fn with_click_script(self, selector: &str, results: Vec<Result<(), DriverError>>) -> Self {
        self.click_scripts
            .lock()
            .unwrap()
            .insert(selector.to_string(), results.into());
        self
    }

    /// Script the outcomes of successive navigations to one URL
    pub fn with_goto_script(self, url: &str, results: Vec<Result<(), DriverError>>) -> Self {
        self.goto_scripts
            .lock()
            .unwrap()
            .insert(url.to_string(), results.into());
        self
    }

    /// Everything the engine asked the driver to do, in order
    pub fn calls(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }

    /// How many recorded calls start with the given prefix
    pub fn count_calls(&self, prefix: &str) -> usize {
        self.log
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.starts_with(prefix))
            .count()
    }

    fn record(&self, call: String) {
        self.log.lock().unwrap().push(call);
    }

    fn scripted(
        table: &Mutex<HashMap<String, VecDeque<Result<(), DriverError>>>>,
        key: &str,
    ) -> Option<Result<(), DriverError>> {
        table.lock().unwrap().get_mut(key).and_then(|q| q.pop_front())
    }
}

#[async_trait]
impl PageDriver for ScriptedDriver {
    async fn goto(&self, url: &str) -> Result<(), DriverError> {
        self.record(format!("goto {url}"));
        Self::scripted(&self.goto_scripts, url).unwrap_or(Ok(()))
    }

    async fn refresh(&self) -> Result<(), DriverError> {
        self.record("refresh".to_string());
        Ok(())
    }

    async fn wait_until_ready(&self, _timeout: Duration) -> Result<(), DriverError> {
        self.record("ready".to_string());
        Ok(())
    }

    async fn wait_for_element(&self, selector: &str, _timeout: Duration) -> Result<(), DriverError> {
        self.record(format!("wait {selector}"));
        if let Some(result) = Self::scripted(&self.wait_scripts, selector) {
            return result;
        }
        if self.present.lock().unwrap().contains(selector) {
            Ok(())
        } else {
            Err(DriverError::Timeout {
                what: format!("element `{selector}`"),
                waited_ms: 0,
            })
        }
    }

    async fn exists(&self, selector: &str) -> Result<bool, DriverError> {
        self.record(format!("exists {selector}"));
        Ok(self.present.lock().unwrap().contains(selector))
    }

    async fn click(&self, selector: &str) -> Result<(), DriverError> {
        self.record(format!("click {selector}"));
        Self::scripted(&self.click_scripts, selector).unwrap_or(Ok(()))
    }

    async fn click_js(&self, selector: &str) -> Result<(), DriverError> {
        self.record(format!("click_js {selector}"));
        Self::scripted(&self.click_scripts, selector).unwrap_or(Ok(()))
    }

    async fn clear(&self, selector: &str) -> Result<(), DriverError> {
        self.record(format!("clear {selector}"));
        Ok(())
    }

    async fn type_text(
        &self,
        selector: &str,
        text: &str,
        _keystroke_delay: Duration,
    ) -> Result<(), DriverError> {
        self.record(format!("type {selector} {text}"));
        Ok(())
    }

    async fn press_enter(&self, selector: &str) -> Result<(), DriverError> {
        self.record(format!("enter {selector}"));
        Ok(())
    }

    async fn scroll_into_view(&self, selector: &str) -> Result<(), DriverError> {
        self.record(format!("scroll {selector}"));
        Ok(())
    }

    async fn page_source(&self) -> Result<String, DriverError> {
        self.record("source".to_string());
        let mut sources = self.sources.lock().unwrap();
        if sources.len() > 1 {
            Ok(sources.pop_front().unwrap_or_default())
        } else {
            Ok(sources.front().cloned().unwrap_or_default())
        }
    }

    async fn open_tab(&self) -> Result<TabHandle, DriverError> {
        let mut tabs = self.tabs.lock().unwrap();
        let id = format!("tab-{}", tabs.next_id);
        tabs.next_id += 1;
        tabs.open.push(id.clone());
        drop(tabs);
        self.record(format!("open_tab {id}"));
        Ok(TabHandle::new(id))
    }

    async fn switch_tab(&self, tab: &TabHandle) -> Result<(), DriverError> {
        let mut tabs = self.tabs.lock().unwrap();
        if !tabs.open.iter().any(|t| t == tab.as_str()) {
            return Err(DriverError::UnknownTab(tab.as_str().to_string()));
        }
        tabs.current = tab.as_str().to_string();
        drop(tabs);
        self.record(format!("switch_tab {}", tab.as_str()));
        Ok(())
    }

    async fn close_current_tab(&self) -> Result<(), DriverError> {
        let mut tabs = self.tabs.lock().unwrap();
        let closed = tabs.current.clone();
        tabs.open.retain(|t| t != &closed);
        tabs.current = tabs.open.first().cloned().unwrap_or_default();
        drop(tabs);
        self.record(format!("close_tab {closed}"));
        Ok(())
    }

    async fn current_tab(&self) -> Result<TabHandle, DriverError> {
        Ok(TabHandle::new(self.tabs.lock().unwrap().current.clone()))
    }

    async fn quit(&self) -> Result<(), DriverError> {
        self.record("quit".to_string());
        Ok(())
    }
}
