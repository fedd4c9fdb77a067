//! Cookie-backed [`CredentialStore`].

use domain::error::Error;
use domain::session::{
    validate_credentials, CredentialStore, Session, ROLE_COOKIE, TOKEN_COOKIE,
};
use std::time::Duration;
use tower_cookies::cookie::SameSite;
use tower_cookies::{Cookie, Cookies};

/// Reads and writes the `token` and `userType` cookies of one request.
///
/// Requires `tower_cookies::CookieManagerLayer` around the router.
#[derive(Clone)]
pub struct CookieCredentialStore {
    cookies: Cookies,
    secure: bool,
}

impl CookieCredentialStore {
    /// `secure` marks written cookies `Secure`; set it in production.
    pub fn new(cookies: Cookies, secure: bool) -> Self {
        Self { cookies, secure }
    }

    fn session_cookie(&self, name: &'static str, value: String, ttl: Duration) -> Cookie<'static> {
        Cookie::build((name, value))
            .path("/")
            .same_site(SameSite::Lax)
            .secure(self.secure)
            .max_age(time::Duration::seconds(
                i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX),
            ))
            .build()
    }

    fn removal_cookie(name: &'static str) -> Cookie<'static> {
        Cookie::build((name, "")).path("/").build()
    }
}

impl CredentialStore for CookieCredentialStore {
    fn get(&self) -> Session {
        let token = self.cookies.get(TOKEN_COOKIE);
        let role = self.cookies.get(ROLE_COOKIE);
        Session::from_raw(
            token.as_ref().map(|c| c.value()),
            role.as_ref().map(|c| c.value()),
        )
    }

    fn set(&self, token: &str, role: &str, ttl: Duration) -> Result<(), Error> {
        match validate_credentials(token, role)? {
            Some((token, role)) => {
                self.cookies
                    .add(self.session_cookie(TOKEN_COOKIE, token, ttl));
                self.cookies
                    .add(self.session_cookie(ROLE_COOKIE, role.as_str().to_string(), ttl));
            }
            None => self.clear(),
        }
        Ok(())
    }

    fn clear(&self) {
        self.cookies.remove(Self::removal_cookie(TOKEN_COOKIE));
        self.cookies.remove(Self::removal_cookie(ROLE_COOKIE));
    }
}
