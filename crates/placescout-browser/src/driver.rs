use crate::error::{DriverError, Result};
use placescout_core::{FieldDescriptor, SelectorDescriptor};
use std::time::Duration;

/// Opaque reference to a page region returned by [`PageDriver::wait_for`].
///
/// Handles are only meaningful to the driver that issued them. A handle may
/// go stale when the page re-renders, in which case operations using it fail
/// with [`DriverError::StaleHandle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ElementHandle(u64);

impl ElementHandle {
    /// Wrap a driver-specific identifier.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Get the driver-specific identifier.
    #[must_use]
    pub fn id(self) -> u64 {
        self.0
    }
}

/// Opaque reference to one entry of the results list.
///
/// `key` identifies the entry across re-renders (its link target when it has
/// one); `label` is the accessible name shown in the list, when present.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EntryHandle {
    key: String,
    position: usize,
    label: Option<String>,
}

impl EntryHandle {
    /// Create an entry handle.
    pub fn new(key: impl Into<String>, position: usize, label: Option<String>) -> Self {
        Self {
            key: key.into(),
            position,
            label,
        }
    }

    /// Stable identity of the entry within one results view.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Zero-based position in the list when it was read.
    #[must_use]
    pub fn position(&self) -> usize {
        self.position
    }

    /// Accessible label of the entry, if any.
    #[must_use]
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }
}

/// One browser session positioned on one logical page.
///
/// Every method takes `&mut self`: a session has exactly one owner and its
/// operations run strictly one after another.
#[async_trait::async_trait]
pub trait PageDriver: Send {
    /// Load a URL in the session.
    async fn navigate(&mut self, url: &str) -> Result<()>;

    /// Wait until a page region is rendered.
    ///
    /// Fails with [`DriverError::Timeout`] when nothing matches within `timeout`.
    async fn wait_for(
        &mut self,
        region: SelectorDescriptor,
        timeout: Duration,
    ) -> Result<ElementHandle>;

    /// Read one field inside a region.
    ///
    /// A field that is not present yields `Ok(None)`.
    async fn read_field(
        &mut self,
        scope: &ElementHandle,
        field: FieldDescriptor,
    ) -> Result<Option<String>>;

    /// List the entries currently rendered in the results feed, in page order.
    async fn list_entries(&mut self, feed: &ElementHandle) -> Result<Vec<EntryHandle>>;

    /// Scroll (or page) the results feed and wait up to `settle` for it to grow.
    ///
    /// Returns whether new entries appeared.
    async fn scroll_or_page(&mut self, feed: &ElementHandle, settle: Duration) -> Result<bool>;

    /// Open the detail view of an entry.
    async fn click(&mut self, entry: &EntryHandle) -> Result<()>;

    /// Release the session.
    async fn close(&mut self) -> Result<()>;
}

/// Factory for independent page sessions.
#[async_trait::async_trait]
pub trait SessionLauncher: Send + Sync {
    /// Driver type produced by this launcher.
    type Driver: PageDriver + 'static;

    /// Open a fresh session.
    async fn launch(&self) -> Result<Self::Driver>;
}

/// Check that a URL is absolute and has a host before handing it to a browser.
pub fn validate_url(url: &str) -> Result<url::Url> {
    let parsed = url::Url::parse(url)
        .map_err(|e| DriverError::Navigation(format!("invalid URL {url}: {e}")))?;

    if parsed.host_str().is_none() {
        return Err(DriverError::Navigation(format!("no host in URL {url}")));
    }

    Ok(parsed)
}
