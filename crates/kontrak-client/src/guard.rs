//! Route guard and the post-login redirect store.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use tracing::debug;

use crate::navigation::Navigator;
use crate::session::SessionStore;

const LOGIN_PATH: &str = "/login";
const ROLE_PATH: &str = "/role";
const HOME_PATH: &str = "/";
const USER_NOT_FOUND_PATH: &str = "/user-not-found";
const VERIFICATION_PREFIX: &str = "/verifikasi/";

/// How long a saved redirect stays valid.
pub const REDIRECT_MAX_AGE_HOURS: i64 = 24;

/// Navigation target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Route {
    /// Path without query string or fragment.
    pub path: String,
    /// Path including query string and fragment.
    pub full_path: String,
}

impl Route {
    #[must_use]
    pub fn parse(full_path: impl Into<String>) -> Self {
        let full_path = full_path.into();
        let end = full_path.find(['?', '#']).unwrap_or(full_path.len());
        Self {
            path: full_path[..end].to_string(),
            full_path,
        }
    }
}

/// Outcome of a guard check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "decision", content = "to", rename_all = "lowercase")]
pub enum GuardDecision {
    Proceed,
    Redirect(String),
}

/// Whether `path` is a document verification link.
#[must_use]
pub fn is_verification_url(path: &str) -> bool {
    path.starts_with(VERIFICATION_PREFIX)
}

#[derive(Debug, Clone)]
struct SavedRedirect {
    url: String,
    saved_at: DateTime<Utc>,
}

/// URL to return to after login.
#[derive(Debug, Clone, Default)]
pub struct RedirectStore {
    slot: Arc<Mutex<Option<SavedRedirect>>>,
}

impl RedirectStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn save(&self, url: impl Into<String>) {
        self.save_at(url, Utc::now());
    }

    pub fn save_at(&self, url: impl Into<String>, saved_at: DateTime<Utc>) {
        let url = url.into();
        debug!(url = %url, "redirect saved");
        *self.slot.lock() = Some(SavedRedirect { url, saved_at });
    }

    /// Saved URL, unless it has expired.
    #[must_use]
    pub fn get(&self) -> Option<String> {
        self.get_at(Utc::now())
    }

    #[must_use]
    pub fn get_at(&self, now: DateTime<Utc>) -> Option<String> {
        let mut slot = self.slot.lock();
        let expired = slot
            .as_ref()
            .is_some_and(|saved| now - saved.saved_at > Duration::hours(REDIRECT_MAX_AGE_HOURS));
        if expired {
            *slot = None;
        }
        slot.as_ref().map(|saved| saved.url.clone())
    }

    pub fn clear(&self) {
        *self.slot.lock() = None;
    }
}

/// Decides whether a navigation may proceed.
#[derive(Debug, Clone)]
pub struct RouteGuard {
    session: SessionStore,
    redirects: RedirectStore,
    navigator: Navigator,
}

impl RouteGuard {
    #[must_use]
    pub const fn new(session: SessionStore, redirects: RedirectStore, navigator: Navigator) -> Self {
        Self {
            session,
            redirects,
            navigator,
        }
    }

    /// Evaluate `route`. Saves verification links for unauthenticated users.
    pub fn check(&self, route: &Route) -> GuardDecision {
        let path = route.path.as_str();

        if self.session.is_authenticated() {
            if path == LOGIN_PATH {
                return GuardDecision::Redirect(HOME_PATH.to_string());
            }
            if !self.session.is_role_assigned()
                && path != ROLE_PATH
                && path != crate::classify::LOGOUT_PATH
            {
                return GuardDecision::Redirect(ROLE_PATH.to_string());
            }
            return GuardDecision::Proceed;
        }

        if !path.starts_with(LOGIN_PATH) && path != USER_NOT_FOUND_PATH {
            if is_verification_url(path) {
                self.redirects.save(route.full_path.clone());
            }
            return GuardDecision::Redirect(LOGIN_PATH.to_string());
        }

        GuardDecision::Proceed
    }

    /// Check `route` and record the resulting navigation.
    pub fn navigate(&self, route: &Route) -> GuardDecision {
        let decision = self.check(route);
        match &decision {
            GuardDecision::Proceed => self.navigator.navigate(route.full_path.clone()),
            GuardDecision::Redirect(to) => {
                debug!(from = %route.full_path, to = %to, "route redirected");
                self.navigator.navigate(to.clone());
            }
        }
        decision
    }
}
