//! Cookie jar that can be emptied.
//!
//! `reqwest::cookie::Jar` only ever accumulates cookies. Logout swaps in a
//! fresh jar so the session cookie is gone even when the server never
//! answered with an expiring `Set-Cookie`.

use parking_lot::RwLock;
use reqwest::cookie::{CookieStore, Jar};
use reqwest::header::HeaderValue;
use url::Url;

#[derive(Default)]
pub(crate) struct SessionJar {
    inner: RwLock<Jar>,
}

impl SessionJar {
    /// Forget every stored cookie.
    pub(crate) fn clear(&self) {
        *self.inner.write() = Jar::default();
        tracing::debug!("Session cookies cleared");
    }
}

impl CookieStore for SessionJar {
    fn set_cookies(&self, cookie_headers: &mut dyn Iterator<Item = &HeaderValue>, url: &Url) {
        self.inner.read().set_cookies(cookie_headers, url);
    }

    fn cookies(&self, url: &Url) -> Option<HeaderValue> {
        self.inner.read().cookies(url)
    }
}
