use crate::driver::{validate_url, ElementHandle, EntryHandle, PageDriver, SessionLauncher};
use crate::error::{DriverError, Result};
use chromiumoxide::browser::{Browser, BrowserConfig as ChromeConfig};
use chromiumoxide::error::CdpError;
use chromiumoxide::{Element, Page};
use futures::StreamExt;
use placescout_core::{
    BrowserConfig, FieldDescriptor, FieldSelector, SelectorDescriptor, SelectorSet,
};
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Interval between DOM checks while waiting for something to render.
const POLL_INTERVAL: Duration = Duration::from_millis(250);

const SCROLL_TO_END: &str = "function() { \
    const before = this.scrollTop; \
    this.scrollTop = this.scrollHeight; \
    return this.scrollTop !== before; \
}";

const CLICK: &str = "function() { this.click(); }";

/// Launches Chromium once and hands out one tab per session.
pub struct ChromiumLauncher {
    settings: BrowserConfig,
    selectors: SelectorSet,
    browser: Mutex<Option<Browser>>,
}

impl ChromiumLauncher {
    /// Create a launcher. The browser process starts on the first [`SessionLauncher::launch`].
    #[must_use]
    pub fn new(settings: BrowserConfig, selectors: SelectorSet) -> Self {
        Self {
            settings,
            selectors,
            browser: Mutex::new(None),
        }
    }

    async fn start_browser(&self) -> Result<Browser> {
        let mut builder = ChromeConfig::builder()
            .no_sandbox()
            .window_size(self.settings.window_width, self.settings.window_height)
            .arg(format!("--user-agent={}", self.settings.user_agent))
            .arg("--lang=en-US");

        if !self.settings.headless {
            builder = builder.with_head();
        }

        if let Some(executable) = &self.settings.chrome_executable {
            builder = builder.chrome_executable(executable);
        }

        let config = builder.build().map_err(DriverError::Launch)?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| DriverError::Launch(e.to_string()))?;

        // Spawn browser handler
        tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    tracing::trace!("browser handler event error: {}", e);
                }
            }
        });

        tracing::info!(
            headless = self.settings.headless,
            "Launched Chromium browser"
        );
        Ok(browser)
    }

    /// Close the shared browser process, if it was started.
    pub async fn shutdown(&self) -> Result<()> {
        let mut guard = self.browser.lock().await;
        if let Some(mut browser) = guard.take() {
            browser
                .close()
                .await
                .map_err(|e| DriverError::Chromium(e.to_string()))?;
            let _ = browser.wait().await;
            tracing::debug!("Chromium browser closed");
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl SessionLauncher for ChromiumLauncher {
    type Driver = ChromiumDriver;

    async fn launch(&self) -> Result<ChromiumDriver> {
        let mut guard = self.browser.lock().await;
        if guard.is_none() {
            *guard = Some(self.start_browser().await?);
        }

        let browser = guard
            .as_ref()
            .ok_or_else(|| DriverError::Launch("browser not running".to_string()))?;

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| DriverError::Launch(e.to_string()))?;

        Ok(ChromiumDriver::new(page, self.selectors.clone()))
    }
}

/// [`PageDriver`] backed by one Chromium tab over the DevTools protocol.
///
/// Region handles index into a registry of live elements. Waiting for a
/// region again replaces its previous element, so older handles to that
/// region go stale.
pub struct ChromiumDriver {
    page: Option<Page>,
    selectors: SelectorSet,
    elements: HashMap<u64, Element>,
    regions: HashMap<SelectorDescriptor, u64>,
    next_id: u64,
}

impl ChromiumDriver {
    /// Wrap an open page.
    #[must_use]
    pub fn new(page: Page, selectors: SelectorSet) -> Self {
        Self {
            page: Some(page),
            selectors,
            elements: HashMap::new(),
            regions: HashMap::new(),
            next_id: 0,
        }
    }

    fn page(&self) -> Result<&Page> {
        self.page
            .as_ref()
            .ok_or_else(|| DriverError::Chromium("session already closed".to_string()))
    }

    fn element(&self, handle: &ElementHandle) -> Result<&Element> {
        self.elements
            .get(&handle.id())
            .ok_or_else(|| DriverError::StaleHandle(format!("element #{}", handle.id())))
    }

    fn register(&mut self, region: SelectorDescriptor, element: Element) -> ElementHandle {
        if let Some(previous) = self.regions.remove(&region) {
            self.elements.remove(&previous);
        }

        let id = self.next_id;
        self.next_id += 1;
        self.elements.insert(id, element);
        self.regions.insert(region, id);
        ElementHandle::new(id)
    }

    /// First element matching any of the fallback selectors, searched page-wide.
    async fn query_page(&self, selectors: &[String]) -> Result<Option<Element>> {
        let page = self.page()?;
        for selector in selectors {
            match page.find_elements(selector.as_str()).await {
                Ok(found) => {
                    if let Some(element) = found.into_iter().next() {
                        return Ok(Some(element));
                    }
                }
                Err(e) => return Err(classify(e, selector)),
            }
        }
        Ok(None)
    }

    /// All elements matching the first fallback selector that matches anything.
    async fn query_within(scope: &Element, selectors: &[String]) -> Result<Vec<Element>> {
        for selector in selectors {
            let found = scope
                .find_elements(selector.as_str())
                .await
                .map_err(|e| classify(e, selector))?;
            if !found.is_empty() {
                return Ok(found);
            }
        }
        Ok(Vec::new())
    }

    /// First non-blank value of a field inside `scope`, trying each fallback selector.
    async fn read_within(
        scope: &Element,
        selector: &FieldSelector,
        field: FieldDescriptor,
    ) -> Result<Option<String>> {
        for css in &selector.selectors {
            let found = scope
                .find_elements(css.as_str())
                .await
                .map_err(|e| classify(e, css))?;

            for element in found {
                let value = match &selector.attribute {
                    Some(attribute) => element.attribute(attribute.as_str()).await,
                    None => element.inner_text().await,
                }
                .map_err(|e| classify(e, field.as_str()))?;

                if let Some(value) = value.filter(|v| !v.trim().is_empty()) {
                    return Ok(Some(value));
                }
            }
        }

        Ok(None)
    }

    /// Whether a matched region has finished rendering. The detail panel
    /// only counts once its name heading carries text.
    async fn region_ready(&self, region: SelectorDescriptor, element: &Element) -> bool {
        if region != SelectorDescriptor::DetailPanel {
            return true;
        }

        let name = self.selectors.field(FieldDescriptor::Name);
        match Self::read_within(element, name, FieldDescriptor::Name).await {
            Ok(value) => value.is_some(),
            Err(e) => {
                tracing::trace!("readiness check for {} failed: {}", region, e);
                false
            }
        }
    }

    async fn entry_count(&self, feed: &ElementHandle) -> Result<usize> {
        let feed = self.element(feed)?;
        Ok(Self::query_within(feed, &self.selectors.result_entry)
            .await?
            .len())
    }

    async fn locate_entry(&self, entry: &EntryHandle) -> Result<Element> {
        let page = self.page()?;
        let mut candidates = Vec::new();
        for selector in &self.selectors.result_entry {
            candidates = page
                .find_elements(selector.as_str())
                .await
                .map_err(|e| classify(e, selector))?;
            if !candidates.is_empty() {
                break;
            }
        }

        if entry.key().starts_with('#') {
            return candidates
                .into_iter()
                .nth(entry.position())
                .ok_or_else(|| DriverError::StaleHandle(format!("entry {}", entry.key())));
        }

        for candidate in candidates {
            let href = candidate
                .attribute("href")
                .await
                .map_err(|e| classify(e, "entry href"))?;
            if href.as_deref() == Some(entry.key()) {
                return Ok(candidate);
            }
        }

        Err(DriverError::StaleHandle(format!("entry {}", entry.key())))
    }
}

#[async_trait::async_trait]
impl PageDriver for ChromiumDriver {
    async fn navigate(&mut self, url: &str) -> Result<()> {
        let url = validate_url(url)?;
        tracing::debug!("Navigating to {}", url);

        self.elements.clear();
        self.regions.clear();

        self.page()?
            .goto(url.as_str())
            .await
            .map_err(|e| DriverError::Navigation(e.to_string()))?;
        Ok(())
    }

    async fn wait_for(
        &mut self,
        region: SelectorDescriptor,
        timeout: Duration,
    ) -> Result<ElementHandle> {
        let selectors = self.selectors.region(region).to_vec();
        let deadline = Instant::now() + timeout;

        loop {
            match self.query_page(&selectors).await {
                Ok(Some(element)) => {
                    if self.region_ready(region, &element).await {
                        return Ok(self.register(region, element));
                    }
                }
                Ok(None) => {}
                // the document may be mid-navigation; keep polling until the deadline
                Err(e) => tracing::trace!("lookup for {} failed: {}", region, e),
            }

            if Instant::now() >= deadline {
                return Err(DriverError::Timeout(region.to_string()));
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    async fn read_field(
        &mut self,
        scope: &ElementHandle,
        field: FieldDescriptor,
    ) -> Result<Option<String>> {
        let scope = self.element(scope)?;
        Self::read_within(scope, self.selectors.field(field), field).await
    }

    async fn list_entries(&mut self, feed: &ElementHandle) -> Result<Vec<EntryHandle>> {
        let feed = self.element(feed)?;
        let elements = Self::query_within(feed, &self.selectors.result_entry).await?;

        let mut entries = Vec::with_capacity(elements.len());
        for (position, element) in elements.iter().enumerate() {
            let href = element
                .attribute("href")
                .await
                .map_err(|e| classify(e, "entry href"))?;
            let label = element
                .attribute("aria-label")
                .await
                .map_err(|e| classify(e, "entry label"))?;

            let key = href.unwrap_or_else(|| format!("#{position}"));
            entries.push(EntryHandle::new(key, position, label));
        }

        Ok(entries)
    }

    async fn scroll_or_page(&mut self, feed: &ElementHandle, settle: Duration) -> Result<bool> {
        let before = self.entry_count(feed).await?;

        let moved = self
            .element(feed)?
            .call_js_fn(SCROLL_TO_END, false)
            .await
            .map_err(|e| classify(e, "results scroll"))?
            .result
            .value
            .as_ref()
            .and_then(serde_json::Value::as_bool)
            .unwrap_or(false);

        tracing::trace!(moved, before, "Scrolled results feed");

        let deadline = Instant::now() + settle;
        loop {
            tokio::time::sleep(POLL_INTERVAL).await;
            if self.entry_count(feed).await? > before {
                return Ok(true);
            }
            if Instant::now() >= deadline {
                return Ok(false);
            }
        }
    }

    async fn click(&mut self, entry: &EntryHandle) -> Result<()> {
        let element = self.locate_entry(entry).await?;
        element
            .call_js_fn(CLICK, false)
            .await
            .map_err(|e| classify(e, entry.key()))?;
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        self.elements.clear();
        self.regions.clear();
        if let Some(page) = self.page.take() {
            page.close()
                .await
                .map_err(|e| DriverError::Chromium(e.to_string()))?;
        }
        Ok(())
    }
}

/// Map a protocol error onto the driver taxonomy.
fn classify(err: CdpError, what: &str) -> DriverError {
    match err {
        CdpError::Timeout => DriverError::Timeout(what.to_string()),
        CdpError::NotFound => DriverError::NotFound(what.to_string()),
        other => {
            let message = other.to_string();
            // DOM node ids are invalidated by re-renders
            if message.contains("node with given id") || message.contains("No node") {
                DriverError::StaleHandle(format!("{what}: {message}"))
            } else {
                DriverError::Chromium(format!("{what}: {message}"))
            }
        }
    }
}
