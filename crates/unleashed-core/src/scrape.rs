// ── Scrape orchestrator ──
//
// Drives one probe: ensure session → fetch the three status documents
// concurrently → parse and extract → derive → publish. Every failure is
// folded into a well-formed exposition body carrying `success=0`; the
// only hard error is a metric registry that cannot be built or rendered.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use tracing::{debug, info, warn};
use unleashed_api::{DeviceClient, SessionRecord, StatQuery, TransportConfig, find_all, xml};

use crate::airtime::{AirtimeStore, AirtimeTracker};
use crate::credentials::Credentials;
use crate::derive::{ScrapeRecords, derive};
use crate::error::CoreError;
use crate::metrics::{Module, ProbeMetrics};
use crate::session::SessionManager;
use crate::signal::{SignalQualityMode, SignalTally};

/// Knobs the orchestrator needs from configuration.
#[derive(Debug, Clone)]
pub struct ScrapeSettings {
    /// `https` against real devices, `http` against test doubles.
    pub scheme: String,
    pub login: TransportConfig,
    pub fetch: TransportConfig,
    pub signal_mode: SignalQualityMode,
}

impl Default for ScrapeSettings {
    fn default() -> Self {
        let fetch = TransportConfig::default();
        Self {
            scheme: "https".into(),
            login: fetch.clone().with_timeout(Duration::from_secs(10)),
            fetch,
            signal_mode: SignalQualityMode::default(),
        }
    }
}

/// Validated probe input.
#[derive(Debug, Clone)]
pub struct ProbeRequest {
    pub target: String,
    pub credentials: Credentials,
}

impl ProbeRequest {
    /// Build from the raw `target` query value and `Authorization` header.
    pub fn from_parts(target: Option<&str>, authorization: Option<&str>) -> Result<Self, CoreError> {
        let target = target
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| CoreError::missing("target parameter required"))?;
        let authorization =
            authorization.ok_or_else(|| CoreError::missing("Basic authorization required"))?;
        Ok(Self {
            target: target.to_owned(),
            credentials: Credentials::from_basic_header(authorization)?,
        })
    }
}

/// Probe lifecycle, traced at debug level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum ScrapePhase {
    NoSession,
    Authenticating,
    Fetching,
    Parsing,
    Deriving,
    Done,
    Failed,
}

/// The response to hand back for one probe.
#[derive(Debug, Clone)]
pub struct ScrapeOutcome {
    pub status: u16,
    pub body: String,
    pub success: bool,
}

/// Long-lived orchestrator shared by all probes.
///
/// Owns the cross-probe state: one device client and session per target,
/// the airtime history and the cumulative signal tally.
pub struct Scraper {
    settings: ScrapeSettings,
    clients: DashMap<String, Arc<DeviceClient>>,
    sessions: SessionManager,
    airtime: Arc<dyn AirtimeStore>,
    signal_tally: SignalTally,
}

impl Scraper {
    pub fn new(settings: ScrapeSettings) -> Self {
        Self::with_airtime_store(settings, Arc::new(AirtimeTracker::new()))
    }

    /// Use a custom airtime store, e.g. one shared with another component.
    pub fn with_airtime_store(settings: ScrapeSettings, airtime: Arc<dyn AirtimeStore>) -> Self {
        Self {
            settings,
            clients: DashMap::new(),
            sessions: SessionManager::new(),
            airtime,
            signal_tally: SignalTally::new(),
        }
    }

    pub fn sessions(&self) -> &SessionManager {
        &self.sessions
    }

    /// The device client for `target`, built on first use and kept so its
    /// connection pools survive across probes.
    fn client(&self, target: &str) -> Result<Arc<DeviceClient>, CoreError> {
        if let Some(client) = self.clients.get(target) {
            return Ok(Arc::clone(client.value()));
        }
        let client = Arc::new(DeviceClient::new(
            target,
            &self.settings.scheme,
            &self.settings.login,
            &self.settings.fetch,
        )?);
        Ok(Arc::clone(
            self.clients.entry(target.to_owned()).or_insert(client).value(),
        ))
    }

    /// Run one full scrape of `request.target`.
    pub async fn probe(&self, request: &ProbeRequest) -> Result<ScrapeOutcome, CoreError> {
        let target = request.target.as_str();
        let metrics = ProbeMetrics::new(target, self.settings.signal_mode)?;
        let started = Instant::now();

        let (status, success) = match self.scrape(request, &metrics).await {
            Ok(()) => {
                transition(target, ScrapePhase::Done);
                info!(target = %target, elapsed_secs = started.elapsed().as_secs_f64(), "scrape complete");
                (200, true)
            }
            Err(err) => {
                transition(target, ScrapePhase::Failed);
                warn!(target = %target, error = %err, "scrape failed");
                (err.status_code(), false)
            }
        };

        metrics.set_success(success);
        if success {
            metrics.observe_duration(Module::Total, started.elapsed().as_secs_f64());
        }

        Ok(ScrapeOutcome {
            status,
            body: metrics.render()?,
            success,
        })
    }

    async fn scrape(&self, request: &ProbeRequest, metrics: &ProbeMetrics) -> Result<(), CoreError> {
        let target = request.target.as_str();
        let client = self.client(target)?;

        let login_started = Instant::now();
        let session = self
            .sessions
            .ensure(target, client.as_ref(), &request.credentials)
            .await?;
        for phase in session_phases(session.fresh) {
            transition(target, *phase);
        }
        if session.fresh {
            metrics.observe_duration(Module::Login, login_started.elapsed().as_secs_f64());
        } else {
            debug!(target = %target, "reusing cached session");
        }

        transition(target, ScrapePhase::Fetching);
        let fetch_started = Instant::now();
        let documents = match fetch_all(&client, &session.record).await {
            Ok(documents) => documents,
            Err(err) => {
                if err.is_auth_expired() {
                    warn!(target = %target, "device returned the login page, evicting session");
                    self.sessions.invalidate(target, &session.record).await;
                }
                return Err(err.into());
            }
        };
        let api_secs = fetch_started.elapsed().as_secs_f64();
        metrics.observe_duration(Module::ApiRequests, api_secs);

        transition(target, ScrapePhase::Parsing);
        let processing_started = Instant::now();
        let [inventory_doc, status_doc, clients_doc] = documents;
        let inventory_tree = xml::parse(&inventory_doc)?;
        let status_tree = xml::parse(&status_doc)?;
        let clients_tree = xml::parse(&clients_doc)?;

        let inventory = find_all(&inventory_tree, StatQuery::Inventory.record_element());
        let status = find_all(&status_tree, StatQuery::ApStatus.record_element());
        let clients = find_all(&clients_tree, StatQuery::Clients.record_element());
        debug!(
            target = %target,
            inventory = inventory.len(),
            status = status.len(),
            clients = clients.len(),
            "records extracted"
        );

        transition(target, ScrapePhase::Deriving);
        let derived = derive(
            ScrapeRecords {
                inventory: &inventory,
                status: &status,
                clients: &clients,
            },
            self.airtime.as_ref(),
        );
        let signal = match self.settings.signal_mode {
            SignalQualityMode::Snapshot => derived.signal.clone(),
            SignalQualityMode::Cumulative => self.signal_tally.accumulate(target, &derived.signal),
        };
        metrics.publish(&derived, &signal);

        let processing_secs = processing_started.elapsed().as_secs_f64();
        metrics.observe_duration(Module::Processing, processing_secs);
        let (slowest, secs) = if api_secs >= processing_secs {
            (Module::ApiRequests, api_secs)
        } else {
            (Module::Processing, processing_secs)
        };
        metrics.set_slowest(slowest, secs);

        Ok(())
    }
}

/// Phases a probe passes through before fetching; none when a cached
/// session was reused.
fn session_phases(fresh: bool) -> &'static [ScrapePhase] {
    if fresh {
        &[ScrapePhase::NoSession, ScrapePhase::Authenticating]
    } else {
        &[]
    }
}

/// Issue the three document fetches concurrently; the first failure
/// aborts the rest.
async fn fetch_all(
    client: &DeviceClient,
    session: &SessionRecord,
) -> Result<[String; 3], unleashed_api::Error> {
    let (inventory, status, clients) = tokio::try_join!(
        client.fetch(session, StatQuery::Inventory),
        client.fetch(session, StatQuery::ApStatus),
        client.fetch(session, StatQuery::Clients),
    )?;
    Ok([inventory, status, clients])
}

fn transition(target: &str, phase: ScrapePhase) {
    debug!(target = %target, phase = %phase, "scrape phase");
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    // "admin:s3cret"
    const BASIC: &str = "Basic YWRtaW46czNjcmV0";

    #[test]
    fn request_requires_target() {
        let err = ProbeRequest::from_parts(None, Some(BASIC)).unwrap_err();
        assert_eq!(err.status_code(), 401);

        let err = ProbeRequest::from_parts(Some("  "), Some(BASIC)).unwrap_err();
        assert!(matches!(err, CoreError::MissingInput { .. }));
    }

    #[test]
    fn request_requires_basic_auth() {
        let err = ProbeRequest::from_parts(Some("10.0.0.1"), None).unwrap_err();
        assert!(matches!(err, CoreError::MissingInput { .. }));

        let err = ProbeRequest::from_parts(Some("10.0.0.1"), Some("Bearer abc")).unwrap_err();
        assert!(matches!(err, CoreError::MissingInput { .. }));
    }

    #[test]
    fn request_decodes_credentials() {
        let req = ProbeRequest::from_parts(Some("10.0.0.1"), Some(BASIC)).unwrap();
        assert_eq!(req.target, "10.0.0.1");
        assert_eq!(req.credentials.username, "admin");
    }

    #[test]
    fn phases_render_in_upper_snake_case() {
        assert_eq!(ScrapePhase::NoSession.to_string(), "NO_SESSION");
        assert_eq!(ScrapePhase::Done.to_string(), "DONE");
    }

    #[test]
    fn login_phases_only_for_fresh_sessions() {
        assert_eq!(
            session_phases(true),
            &[ScrapePhase::NoSession, ScrapePhase::Authenticating]
        );
        assert!(session_phases(false).is_empty());
    }

    #[test]
    fn device_client_is_built_once_per_target() {
        let scraper = Scraper::new(ScrapeSettings::default());
        let first = scraper.client("10.0.0.1:8443").unwrap();
        let again = scraper.client("10.0.0.1:8443").unwrap();
        let other = scraper.client("10.0.0.2").unwrap();

        assert!(Arc::ptr_eq(&first, &again));
        assert!(!Arc::ptr_eq(&first, &other));
        assert_eq!(scraper.clients.len(), 2);
    }

    #[test]
    fn malformed_target_is_not_cached() {
        let scraper = Scraper::new(ScrapeSettings::default());
        assert!(scraper.client("bad host").is_err());
        assert!(scraper.clients.is_empty());
    }

    #[tokio::test]
    async fn unreachable_target_fails_login_with_body() {
        let settings = ScrapeSettings {
            scheme: "http".into(),
            login: TransportConfig::default().with_timeout(Duration::from_secs(2)),
            fetch: TransportConfig::default().with_timeout(Duration::from_secs(2)),
            signal_mode: SignalQualityMode::Snapshot,
        };
        let scraper = Scraper::new(settings);
        let request = ProbeRequest::from_parts(Some("127.0.0.1:9"), Some(BASIC)).unwrap();

        let outcome = scraper.probe(&request).await.unwrap();
        assert!(!outcome.success);
        assert_eq!(outcome.status, 401);
        assert!(
            outcome
                .body
                .contains(r#"ruckus_exporter_last_scrape_success{master="127.0.0.1:9"} 0"#)
        );
    }
}
