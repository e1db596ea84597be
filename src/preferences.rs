//! UI preferences stored next to the session records

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::clock::{rfc3339_millis, SharedClock};
use crate::error::StorageError;
use crate::storage::{Storage, COOKIE_CONSENT_KEY, THEME_KEY};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn as_str(self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Theme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "light" => Ok(Theme::Light),
            "dark" => Ok(Theme::Dark),
            other => Err(format!("unknown theme '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CookiePreferences {
    pub analytics: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CookieConsent {
    /// RFC 3339 time the choice was made
    pub timestamp: String,
    pub preferences: CookiePreferences,
}

#[derive(Clone)]
pub struct PreferenceStore {
    storage: Storage,
    clock: SharedClock,
}

impl PreferenceStore {
    pub fn new(storage: Storage, clock: SharedClock) -> Self {
        Self { storage, clock }
    }

    /// Saved theme, `None` when unset or unrecognized
    pub fn theme(&self) -> Option<Theme> {
        let raw = match self.storage.get_raw(THEME_KEY) {
            Ok(raw) => raw?,
            Err(e) => {
                warn!(error = %e, "Failed to read theme");
                return None;
            }
        };
        String::from_utf8_lossy(&raw).parse().ok()
    }

    pub fn set_theme(&self, theme: Theme) -> Result<(), StorageError> {
        self.storage.set_raw(THEME_KEY, theme.as_str().as_bytes())
    }

    /// Flip the theme and return the new one
    pub fn toggle_theme(&self) -> Result<Theme, StorageError> {
        let next = self.theme().unwrap_or_default().toggled();
        self.set_theme(next)?;
        Ok(next)
    }

    /// Recorded consent. A corrupt record reads as no consent.
    pub fn consent(&self) -> Option<CookieConsent> {
        match self.storage.get_json(COOKIE_CONSENT_KEY) {
            Ok(consent) => consent,
            Err(e) => {
                warn!(error = %e, "Ignoring unreadable cookie consent");
                None
            }
        }
    }

    pub fn can_use_analytics(&self) -> bool {
        self.consent()
            .map(|c| c.preferences.analytics)
            .unwrap_or(false)
    }

    pub fn update_consent(
        &self,
        preferences: CookiePreferences,
    ) -> Result<CookieConsent, StorageError> {
        let consent = CookieConsent {
            timestamp: rfc3339_millis(self.clock.now_millis()),
            preferences,
        };
        self.storage.set_json(COOKIE_CONSENT_KEY, &consent)?;
        Ok(consent)
    }

    /// Forget the recorded choice so the user is asked again
    pub fn revoke_consent(&self) -> Result<bool, StorageError> {
        self.storage.remove(COOKIE_CONSENT_KEY)
    }
}
