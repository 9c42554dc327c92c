// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-lti-tool project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! CSRF protection for the login redirect
//!
//! The platform-initiated login is defended with a single-use state
//! value. The cookie name is derived from the state value itself and
//! the cookie value is the issuer the login was started for, so the
//! server keeps no state of its own: an attacker who does not control
//! the victim's cookie jar cannot forge a valid state/issuer binding.
//! The cookie is short-lived, `HttpOnly`, `Secure`, and allowed
//! cross-site because the platform posts the launch back from its own
//! origin.
//!
//! Consumption deletes the cookie regardless of the later issuer
//! comparison: a state value is good for exactly one attempt.

use rocket::http::{Cookie, CookieJar, SameSite};
use rocket::time::Duration;

use super::error::AuthError;
use super::secure_token;

/// Prefix of every launch-state cookie name.
pub const STATE_COOKIE_PREFIX: &str = "state-";

/// Lifetime of a launch-state cookie, in seconds.
pub const STATE_COOKIE_MAX_AGE_SECS: i64 = 60;

/// Cookie name for a given state value.
pub fn state_cookie_name(state: &str) -> String {
    format!("{}{}", STATE_COOKIE_PREFIX, state)
}

/// Issues and consumes single-use, issuer-bound login states.
#[derive(Clone, Default)]
pub struct LaunchStateGuard;

impl LaunchStateGuard {
    pub fn new() -> Self {
        Self
    }

    /// Generate a state value and bind it to `expected_issuer` via the
    /// response cookie jar. Returns the state to embed in the
    /// authorization redirect.
    pub fn issue(
        &self,
        cookies: &CookieJar<'_>,
        expected_issuer: &str,
    ) -> Result<String, AuthError> {
        let state = secure_token::random_token()?;
        let cookie = Cookie::build((state_cookie_name(&state), expected_issuer.to_string()))
            .http_only(true)
            .secure(true)
            .same_site(SameSite::None)
            .max_age(Duration::seconds(STATE_COOKIE_MAX_AGE_SECS))
            .path("/")
            .build();
        cookies.add(cookie);
        Ok(state)
    }

    /// Read and delete the cookie bound to `state` in one step,
    /// returning the issuer the login was started for. An absent
    /// cookie means the state is forged, expired or already used.
    ///
    /// The caller must still compare the returned issuer with the
    /// issuer inside the verified launch token and treat a mismatch as
    /// [`AuthError::InvalidState`].
    pub fn consume(&self, cookies: &CookieJar<'_>, state: &str) -> Result<String, AuthError> {
        let name = state_cookie_name(state);
        let issuer = cookies
            .get(&name)
            .map(|cookie| cookie.value().to_string())
            .ok_or(AuthError::InvalidState)?;
        cookies.remove(Cookie::build(name).path("/"));
        Ok(issuer)
    }

    /// Compare the issuer a state was bound to with the issuer claimed
    /// by the validated launch token.
    pub fn verify_issuer(expected_issuer: &str, token_issuer: &str) -> Result<(), AuthError> {
        if expected_issuer == token_issuer {
            Ok(())
        } else {
            Err(AuthError::InvalidState)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cookie_name_is_derived_from_the_state() {
        assert_eq!(state_cookie_name("abc"), "state-abc");
    }

    #[test]
    fn issuer_comparison_rejects_mismatches() {
        LaunchStateGuard::verify_issuer("https://a.example", "https://a.example").unwrap();
        assert!(matches!(
            LaunchStateGuard::verify_issuer("https://a.example", "https://b.example"),
            Err(AuthError::InvalidState)
        ));
    }
}
