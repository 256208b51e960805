// ── Per-target session cache ──
//
// One slot per target, guarded by an async mutex. Whoever holds the lock
// either finds a cached record or performs the login, so concurrent
// probes of one target never log in twice. Different targets never
// contend.

use std::future::Future;
use std::sync::Arc;

use dashmap::DashMap;
use secrecy::SecretString;
use tokio::sync::Mutex;
use tracing::{debug, info};
use unleashed_api::{DeviceClient, SessionRecord};

use crate::credentials::Credentials;
use crate::error::CoreError;

/// Anything that can run the device login sequence.
pub trait Authenticator: Sync {
    fn login(
        &self,
        username: &str,
        password: &SecretString,
    ) -> impl Future<Output = Result<SessionRecord, unleashed_api::Error>> + Send;
}

impl Authenticator for DeviceClient {
    fn login(
        &self,
        username: &str,
        password: &SecretString,
    ) -> impl Future<Output = Result<SessionRecord, unleashed_api::Error>> + Send {
        DeviceClient::login(self, username, password)
    }
}

/// A session handed to one probe.
#[derive(Debug, Clone)]
pub struct ActiveSession {
    pub record: SessionRecord,
    /// `true` when this call performed the login.
    pub fresh: bool,
}

type Slot = Arc<Mutex<Option<SessionRecord>>>;

/// Process-wide session records keyed by target.
///
/// Records are not keyed by username: a probe with different credentials
/// for an already-authenticated target reuses the cached session.
#[derive(Debug, Default)]
pub struct SessionManager {
    slots: DashMap<String, Slot>,
}

impl SessionManager {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, target: &str) -> Slot {
        Arc::clone(&self.slots.entry(target.to_owned()).or_default())
    }

    /// Return the cached session for `target`, logging in first if none
    /// exists. Any failure during login, transport errors included, is an
    /// [`CoreError::Auth`] and caches nothing.
    pub async fn ensure<A: Authenticator>(
        &self,
        target: &str,
        authenticator: &A,
        credentials: &Credentials,
    ) -> Result<ActiveSession, CoreError> {
        let slot = self.slot(target);
        let mut guard = slot.lock().await;

        if let Some(record) = guard.as_ref() {
            debug!(target = %target, "reusing cached session");
            return Ok(ActiveSession {
                record: record.clone(),
                fresh: false,
            });
        }

        let record = authenticator
            .login(&credentials.username, &credentials.password)
            .await
            .map_err(login_failure)?;
        info!(target = %target, "logged in");
        *guard = Some(record.clone());

        Ok(ActiveSession {
            record,
            fresh: true,
        })
    }

    /// Drop the cached session for `target`, but only if it is still the
    /// one `stale` was taken from. A record installed by a newer login
    /// survives.
    pub async fn invalidate(&self, target: &str, stale: &SessionRecord) -> bool {
        let Some(slot) = self.slots.get(target).map(|s| Arc::clone(&s)) else {
            return false;
        };
        let mut guard = slot.lock().await;
        let matches = guard
            .as_ref()
            .is_some_and(|r| r.csrf_token == stale.csrf_token && r.created_at == stale.created_at);
        if matches {
            *guard = None;
            info!(target = %target, "session evicted");
        }
        matches
    }

    /// Snapshot of the cached record for `target`, if any.
    pub async fn cached(&self, target: &str) -> Option<SessionRecord> {
        let slot = self.slots.get(target).map(|s| Arc::clone(&s))?;
        let guard = slot.lock().await;
        guard.clone()
    }
}

fn login_failure(err: unleashed_api::Error) -> CoreError {
    let message = match err {
        unleashed_api::Error::Authentication { message } => message,
        other => other.to_string(),
    };
    CoreError::Auth { message }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use unleashed_api::CookieSet;

    use super::*;

    #[derive(Default)]
    struct CountingAuth {
        calls: AtomicUsize,
        fail: bool,
    }

    impl Authenticator for CountingAuth {
        async fn login(
            &self,
            _username: &str,
            _password: &SecretString,
        ) -> Result<SessionRecord, unleashed_api::Error> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            if self.fail {
                return Err(unleashed_api::Error::Authentication {
                    message: "rejected".into(),
                });
            }
            Ok(SessionRecord::new(CookieSet::new(), format!("tok-{n}")))
        }
    }

    fn creds() -> Credentials {
        Credentials::new("admin", "pw")
    }

    #[tokio::test]
    async fn second_call_reuses_session() {
        let manager = SessionManager::new();
        let auth = CountingAuth::default();

        let first = manager.ensure("a", &auth, &creds()).await.unwrap();
        let second = manager.ensure("a", &auth, &creds()).await.unwrap();

        assert!(first.fresh);
        assert!(!second.fresh);
        assert_eq!(second.record.csrf_token, "tok-0");
        assert_eq!(auth.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_probes_log_in_once() {
        let manager = Arc::new(SessionManager::new());
        let auth = Arc::new(CountingAuth::default());

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let manager = Arc::clone(&manager);
                let auth = Arc::clone(&auth);
                tokio::spawn(async move { manager.ensure("a", auth.as_ref(), &creds()).await })
            })
            .collect();

        let mut fresh = 0;
        for handle in handles {
            if handle.await.unwrap().unwrap().fresh {
                fresh += 1;
            }
        }
        assert_eq!(fresh, 1);
        assert_eq!(auth.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn targets_are_independent() {
        let manager = SessionManager::new();
        let auth = CountingAuth::default();

        manager.ensure("a", &auth, &creds()).await.unwrap();
        let other = manager.ensure("b", &auth, &creds()).await.unwrap();

        assert!(other.fresh);
        assert_eq!(auth.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn failed_login_caches_nothing() {
        let manager = SessionManager::new();
        let auth = CountingAuth {
            fail: true,
            ..CountingAuth::default()
        };

        let err = manager.ensure("a", &auth, &creds()).await.unwrap_err();
        assert!(matches!(err, CoreError::Auth { .. }));
        assert!(manager.cached("a").await.is_none());

        manager.ensure("a", &auth, &creds()).await.unwrap_err();
        assert_eq!(auth.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn invalidate_forces_relogin() {
        let manager = SessionManager::new();
        let auth = CountingAuth::default();

        let first = manager.ensure("a", &auth, &creds()).await.unwrap();
        assert!(manager.invalidate("a", &first.record).await);

        let second = manager.ensure("a", &auth, &creds()).await.unwrap();
        assert!(second.fresh);
        assert_eq!(second.record.csrf_token, "tok-1");
    }

    #[tokio::test]
    async fn stale_invalidate_keeps_newer_session() {
        let manager = SessionManager::new();
        let auth = CountingAuth::default();

        let old = manager.ensure("a", &auth, &creds()).await.unwrap();
        manager.invalidate("a", &old.record).await;
        manager.ensure("a", &auth, &creds()).await.unwrap();

        assert!(!manager.invalidate("a", &old.record).await);
        assert_eq!(manager.cached("a").await.unwrap().csrf_token, "tok-1");
    }

    #[tokio::test]
    async fn invalidate_unknown_target_is_noop() {
        let manager = SessionManager::new();
        let record = SessionRecord::new(CookieSet::new(), "x".into());
        assert!(!manager.invalidate("nowhere", &record).await);
    }
}
