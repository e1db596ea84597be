//! Cookie jar that survives restarts.
//!
//! The refresh endpoint authenticates with an HTTP-only cookie set at sign-in,
//! not with the bearer credential. Every `Set-Cookie` the jar accepts is also
//! recorded in storage, so a cold-started client can still refresh.

use chrono::{DateTime, Utc};
use reqwest::cookie::{CookieStore, Jar};
use reqwest::header::HeaderValue;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::storage::{Storage, SESSION_COOKIES_KEY};

/// One `Set-Cookie` header and the URL that set it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredCookie {
    pub url: String,
    pub set_cookie: String,
}

impl StoredCookie {
    fn name(&self) -> Option<&str> {
        cookie_name(&self.set_cookie)
    }

    fn host(&self) -> Option<String> {
        Url::parse(&self.url)
            .ok()
            .and_then(|url| url.host_str().map(str::to_string))
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct SessionCookies {
    cookies: Vec<StoredCookie>,
}

pub struct PersistentCookieJar {
    storage: Storage,
    jar: Jar,
}

impl PersistentCookieJar {
    /// Open the jar, replaying previously stored cookies
    pub fn load(storage: Storage) -> Self {
        let jar = Jar::default();
        let stored = read_cookies(&storage);
        for cookie in &stored.cookies {
            match Url::parse(&cookie.url) {
                Ok(url) => jar.add_cookie_str(&cookie.set_cookie, &url),
                Err(e) => warn!(url = %cookie.url, error = %e, "Skipping stored cookie"),
            }
        }
        debug!(restored = stored.cookies.len(), "Loaded session cookies");
        Self { storage, jar }
    }

    /// Cookies currently recorded in storage
    pub fn stored(&self) -> Vec<StoredCookie> {
        read_cookies(&self.storage).cookies
    }

    fn remember(&self, headers: &[String], url: &Url) {
        let mut stored = read_cookies(&self.storage);
        let host = url.host_str().map(str::to_string);

        for header in headers {
            let Some(name) = cookie_name(header) else {
                continue;
            };
            stored
                .cookies
                .retain(|c| !(c.name() == Some(name) && c.host() == host));
            if is_removal(header, Utc::now()) {
                debug!(cookie = name, "Server cleared cookie");
            } else {
                stored.cookies.push(StoredCookie {
                    url: url.to_string(),
                    set_cookie: header.clone(),
                });
            }
        }

        let result = if stored.cookies.is_empty() {
            self.storage.remove(SESSION_COOKIES_KEY).map(|_| ())
        } else {
            self.storage.set_json(SESSION_COOKIES_KEY, &stored)
        };
        if let Err(e) = result {
            warn!(error = %e, "Failed to persist session cookies");
        }
    }
}

impl CookieStore for PersistentCookieJar {
    fn set_cookies(&self, cookie_headers: &mut dyn Iterator<Item = &HeaderValue>, url: &Url) {
        let headers: Vec<HeaderValue> = cookie_headers.cloned().collect();
        self.jar.set_cookies(&mut headers.iter(), url);

        let raw: Vec<String> = headers
            .iter()
            .filter_map(|h| h.to_str().ok().map(str::to_string))
            .collect();
        if !raw.is_empty() {
            self.remember(&raw, url);
        }
    }

    fn cookies(&self, url: &Url) -> Option<HeaderValue> {
        self.jar.cookies(url)
    }
}

fn read_cookies(storage: &Storage) -> SessionCookies {
    match storage.get_json::<SessionCookies>(SESSION_COOKIES_KEY) {
        Ok(Some(cookies)) => cookies,
        Ok(None) => SessionCookies::default(),
        Err(e) => {
            warn!(error = %e, "Ignoring unreadable session cookies");
            SessionCookies::default()
        }
    }
}

fn cookie_name(set_cookie: &str) -> Option<&str> {
    let pair = set_cookie.split(';').next()?;
    let (name, _) = pair.split_once('=')?;
    let name = name.trim();
    (!name.is_empty()).then_some(name)
}

/// An empty value, a non-positive `Max-Age` or a past `Expires` deletes the cookie
fn is_removal(set_cookie: &str, now: DateTime<Utc>) -> bool {
    let mut parts = set_cookie.split(';');
    let value = parts
        .next()
        .and_then(|pair| pair.split_once('='))
        .map(|(_, v)| v.trim())
        .unwrap_or("");
    if value.is_empty() {
        return true;
    }

    parts.any(|attribute| {
        let Some((key, val)) = attribute.split_once('=') else {
            return false;
        };
        let val = val.trim();
        match key.trim().to_ascii_lowercase().as_str() {
            "max-age" => val.parse::<i64>().map(|age| age <= 0).unwrap_or(false),
            "expires" => DateTime::parse_from_rfc2822(val)
                .map(|at| at.with_timezone(&Utc) <= now)
                .unwrap_or(false),
            _ => false,
        }
    })
}
