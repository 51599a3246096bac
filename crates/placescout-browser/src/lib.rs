//! Browser session capability for map-search pages.
//!
//! [`PageDriver`] is the narrow interface the extraction pipeline talks to:
//! navigate, wait for a region, read a field, list and scroll result entries,
//! open an entry. [`ChromiumDriver`] implements it over the Chrome DevTools
//! protocol; tests substitute scripted drivers.

pub mod driver;
pub mod engine;
pub mod error;

pub use driver::{validate_url, ElementHandle, EntryHandle, PageDriver, SessionLauncher};
pub use engine::{ChromiumDriver, ChromiumLauncher};
pub use error::{DriverError, Result};
