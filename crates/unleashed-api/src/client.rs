// Device HTTP client
//
// Wraps three `reqwest::Client`s pointed at one target: a login client
// for the page and token GETs, a redirect-less client for the credential
// form post, and a fetch client for the status documents. Session material is passed in explicitly on every fetch;
// the client itself holds no session state.

use std::sync::LazyLock;

use regex::Regex;
use reqwest::StatusCode;
use reqwest::header::{CONTENT_TYPE, COOKIE};
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, trace};
use url::Url;

use crate::error::Error;
use crate::query::{CMDSTAT_PATH, StatQuery};
use crate::session::{CookieSet, SessionRecord};
use crate::transport::TransportConfig;

const LOGIN_PATH: &str = "/admin/login.jsp";
const CSRF_PATH: &str = "/admin/_csrfTokenVar.jsp";

/// Substring the device's login page carries; seeing it in a status reply
/// means the session was rejected.
const LOGIN_MARKER: &str = "login.jsp";

/// Accepts both the `csrfToken` and `csfrToken` spellings found across firmware.
static CSRF_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)cs[fr]{2}Token\s*=\s*['"]([^'"]*)['"]"#).expect("invalid CSRF pattern")
});

/// Extract the CSRF token from the body of `_csrfTokenVar.jsp`.
pub fn extract_csrf_token(body: &str) -> Option<&str> {
    CSRF_PATTERN
        .captures(body)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// HTTP client for one device's management interface.
pub struct DeviceClient {
    login_http: reqwest::Client,
    form_http: reqwest::Client,
    fetch_http: reqwest::Client,
    base_url: Url,
    login_timeout_secs: u64,
    fetch_timeout_secs: u64,
}

impl DeviceClient {
    /// Create a client for `target` (a hostname or `host:port`).
    ///
    /// `scheme` is normally `https`. The credential post never follows
    /// redirects, whatever `login` says; the other login steps do.
    pub fn new(
        target: &str,
        scheme: &str,
        login: &TransportConfig,
        fetch: &TransportConfig,
    ) -> Result<Self, Error> {
        let base_url = Url::parse(&format!("{scheme}://{target}"))?;
        Ok(Self {
            login_http: login.build_client()?,
            form_http: login.clone().without_redirects().build_client()?,
            fetch_http: fetch.build_client()?,
            base_url,
            login_timeout_secs: login.timeout_secs(),
            fetch_timeout_secs: fetch.timeout_secs(),
        })
    }

    fn url(&self, path: &str) -> Result<Url, Error> {
        Ok(self.base_url.join(path)?)
    }

    // ── Login ────────────────────────────────────────────────────────

    /// Run the three-step form login and return fresh session material.
    ///
    /// 1. `GET /admin/login.jsp` for the initial cookie set.
    /// 2. `POST /admin/login.jsp` with the credentials as a url-encoded
    ///    form, redirects not followed; any status below 400 is accepted
    ///    and returned cookies are merged over the initial set.
    /// 3. `GET /admin/_csrfTokenVar.jsp` and scrape the token out of the body.
    pub async fn login(
        &self,
        username: &str,
        password: &SecretString,
    ) -> Result<SessionRecord, Error> {
        let login_url = self.url(LOGIN_PATH)?;
        debug!("fetching login page at {}", login_url);

        let resp = self
            .login_http
            .get(login_url.clone())
            .send()
            .await
            .map_err(|e| Error::from_reqwest(e, self.login_timeout_secs))?;
        ensure_below_400(resp.status(), LOGIN_PATH)?;
        let mut cookies = CookieSet::from_headers(resp.headers());
        trace!(count = cookies.len(), "initial cookies captured");

        let form = [
            ("username", username),
            ("password", password.expose_secret()),
            ("ok", "Log in"),
            ("action", "login.jsp"),
        ];
        let resp = self
            .form_http
            .post(login_url)
            .header(COOKIE, cookies.header_value())
            .form(&form)
            .send()
            .await
            .map_err(|e| Error::from_reqwest(e, self.login_timeout_secs))?;

        let status = resp.status();
        if status.is_client_error() || status.is_server_error() {
            return Err(Error::Authentication {
                message: format!("login form rejected (HTTP {status})"),
            });
        }
        cookies.merge(&CookieSet::from_headers(resp.headers()));

        let csrf_url = self.url(CSRF_PATH)?;
        debug!("fetching CSRF token at {}", csrf_url);
        let resp = self
            .login_http
            .get(csrf_url)
            .header(COOKIE, cookies.header_value())
            .send()
            .await
            .map_err(|e| Error::from_reqwest(e, self.login_timeout_secs))?;
        ensure_below_400(resp.status(), CSRF_PATH)?;
        let body = resp
            .text()
            .await
            .map_err(|e| Error::from_reqwest(e, self.login_timeout_secs))?;

        let token = extract_csrf_token(&body).ok_or_else(|| Error::Authentication {
            message: "CSRF token missing from token endpoint".into(),
        })?;

        debug!("login successful");
        Ok(SessionRecord::new(cookies, token.to_owned()))
    }

    // ── Status documents ─────────────────────────────────────────────

    /// Fetch one status document as raw XML.
    ///
    /// Returns [`Error::SessionExpired`] when the reply is the login page
    /// rather than data; the caller owns evicting the cached session.
    pub async fn fetch(&self, session: &SessionRecord, query: StatQuery) -> Result<String, Error> {
        let url = self.url(CMDSTAT_PATH)?;
        debug!(document = query.label(), "POST {}", url);

        let resp = self
            .fetch_http
            .post(url)
            .header(COOKIE, session.cookies.header_value())
            .header("X-CSRF-Token", &session.csrf_token)
            .header(CONTENT_TYPE, "text/xml")
            .body(query.body())
            .send()
            .await
            .map_err(|e| Error::from_reqwest(e, self.fetch_timeout_secs))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(Error::Http {
                status: status.as_u16(),
                path: CMDSTAT_PATH.into(),
            });
        }

        let body = resp
            .text()
            .await
            .map_err(|e| Error::from_reqwest(e, self.fetch_timeout_secs))?;

        if body.contains(LOGIN_MARKER) {
            return Err(Error::SessionExpired);
        }

        trace!(document = query.label(), bytes = body.len(), "document received");
        Ok(body)
    }
}

fn ensure_below_400(status: StatusCode, path: &str) -> Result<(), Error> {
    if status.is_client_error() || status.is_server_error() {
        return Err(Error::Http {
            status: status.as_u16(),
            path: path.into(),
        });
    }
    Ok(())
}
