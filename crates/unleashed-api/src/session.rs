// Session material captured by the login sequence.
//
// The device keys its web session on a cookie set plus a CSRF token that
// must accompany every status request. Both are stored verbatim; nothing
// here talks to the network.

use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, SET_COOKIE};

/// Ordered list of `name=value` cookie pairs.
///
/// Insertion order is preserved so the rendered `Cookie` header matches
/// the order the device handed the cookies out in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CookieSet {
    pairs: Vec<(String, String)>,
}

impl CookieSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Collect the leading `name=value` pair of every `Set-Cookie` header.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let mut set = Self::new();
        for value in headers.get_all(SET_COOKIE) {
            if let Ok(raw) = value.to_str() {
                set.insert_raw(raw);
            }
        }
        set
    }

    /// Parse one `Set-Cookie` value, ignoring its attributes.
    pub fn insert_raw(&mut self, raw: &str) {
        let pair = raw.split(';').next().unwrap_or_default().trim();
        if let Some((name, value)) = pair.split_once('=') {
            let name = name.trim();
            if !name.is_empty() {
                self.insert(name, value.trim());
            }
        }
    }

    /// Insert or replace a cookie, keeping the original position on replace.
    pub fn insert(&mut self, name: &str, value: &str) {
        if let Some(slot) = self.pairs.iter_mut().find(|(n, _)| n == name) {
            value.clone_into(&mut slot.1);
        } else {
            self.pairs.push((name.to_owned(), value.to_owned()));
        }
    }

    /// Merge `other` over `self`; same-named cookies take the newer value.
    pub fn merge(&mut self, other: &Self) {
        for (name, value) in &other.pairs {
            self.insert(name, value);
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// Render as a `Cookie` request header value (`a=1; b=2`).
    pub fn header_value(&self) -> String {
        self.pairs
            .iter()
            .map(|(n, v)| format!("{n}={v}"))
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// Authentication material for one target, valid until invalidated.
#[derive(Debug, Clone)]
pub struct SessionRecord {
    pub cookies: CookieSet,
    pub csrf_token: String,
    pub created_at: DateTime<Utc>,
}

impl SessionRecord {
    pub fn new(cookies: CookieSet, csrf_token: String) -> Self {
        Self {
            cookies,
            csrf_token,
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    #[test]
    fn set_cookie_attributes_are_dropped() {
        let mut set = CookieSet::new();
        set.insert_raw("-ejs-session-=abc123; Path=/; Secure; HttpOnly");
        assert_eq!(set.header_value(), "-ejs-session-=abc123");
    }

    #[test]
    fn malformed_pairs_are_ignored() {
        let mut set = CookieSet::new();
        set.insert_raw("no-equals-sign");
        set.insert_raw("=orphan");
        assert!(set.is_empty());
    }

    #[test]
    fn merge_replaces_same_name_in_place() {
        let mut initial = CookieSet::new();
        initial.insert("a", "1");
        initial.insert("b", "2");

        let mut fresh = CookieSet::new();
        fresh.insert("a", "9");
        fresh.insert("c", "3");

        initial.merge(&fresh);
        assert_eq!(initial.header_value(), "a=9; b=2; c=3");
        assert_eq!(initial.get("a"), Some("9"));
        assert_eq!(initial.len(), 3);
    }

    #[test]
    fn collects_every_set_cookie_header() {
        let mut headers = HeaderMap::new();
        headers.append(SET_COOKIE, HeaderValue::from_static("first=1; Path=/"));
        headers.append(SET_COOKIE, HeaderValue::from_static("second=2"));

        let set = CookieSet::from_headers(&headers);
        assert_eq!(set.header_value(), "first=1; second=2");
    }
}
