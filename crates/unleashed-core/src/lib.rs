//! Probe logic between `unleashed-api` and the HTTP listener.
//!
//! - **[`Scraper`]** — Long-lived orchestrator. [`probe()`](Scraper::probe)
//!   runs one scrape of one target and always yields a renderable
//!   exposition body, even on failure.
//!
//! - **[`SessionManager`]** — Per-target session cache. Logins are
//!   serialized per target; a session is evicted only when the device
//!   answers a document request with its login page.
//!
//! - **[`derive()`]** — Pure mapping from extracted XML records to metric
//!   values, driven by the ordered candidate lists in [`fields`].
//!
//! - **[`AirtimeTracker`]** — Cross-scrape state for the airtime moving
//!   average, behind the [`AirtimeStore`] trait.
//!
//! - **[`ProbeMetrics`]** — Fresh `prometheus` registry per probe, every
//!   series stamped with `master=<target>`.

pub mod airtime;
pub mod credentials;
pub mod derive;
pub mod error;
pub mod fields;
pub mod metrics;
pub mod scrape;
pub mod session;
pub mod signal;

// ── Primary re-exports ──────────────────────────────────────────────
pub use airtime::{AirtimeSample, AirtimeStore, AirtimeTracker, EntityKey};
pub use credentials::Credentials;
pub use derive::{DerivedMetrics, ScrapeRecords, derive};
pub use error::CoreError;
pub use metrics::{CONTENT_TYPE, Module, ProbeMetrics};
pub use scrape::{ProbeRequest, ScrapeOutcome, ScrapePhase, ScrapeSettings, Scraper};
pub use session::{ActiveSession, Authenticator, SessionManager};
pub use signal::{SignalQuality, SignalQualityMode, SignalTally, classify};
