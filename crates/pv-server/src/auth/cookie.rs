//! Session cookie transport.

use axum::http::HeaderMap;
use axum::http::header::COOKIE;
use cookie::time::{Duration as CookieDuration, OffsetDateTime};
use cookie::{Cookie, SameSite};

/// How the session cookie is named and flagged.
#[derive(Debug, Clone)]
pub struct CookieSettings {
    pub name: String,
    /// Set the `Secure` attribute.
    pub secure: bool,
    /// `Max-Age` in seconds.
    pub max_age_secs: i64,
}

impl CookieSettings {
    /// HttpOnly, strict same-site cookie carrying `token`.
    pub fn session_cookie(&self, token: &str) -> Cookie<'static> {
        Cookie::build((self.name.clone(), token.to_string()))
            .path("/")
            .http_only(true)
            .secure(self.secure)
            .same_site(SameSite::Strict)
            .max_age(CookieDuration::seconds(self.max_age_secs))
            .build()
    }

    /// Expired, empty cookie that makes the browser drop the session.
    pub fn removal_cookie(&self) -> Cookie<'static> {
        Cookie::build((self.name.clone(), ""))
            .path("/")
            .http_only(true)
            .secure(self.secure)
            .same_site(SameSite::Strict)
            .max_age(CookieDuration::ZERO)
            .expires(OffsetDateTime::UNIX_EPOCH)
            .build()
    }

    /// The session token from the request's `Cookie` headers, if any.
    pub fn extract_credential(&self, headers: &HeaderMap) -> Option<String> {
        headers
            .get_all(COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(Cookie::split_parse)
            .filter_map(Result::ok)
            .find(|c| c.name() == self.name && !c.value().is_empty())
            .map(|c| c.value().to_string())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    fn settings() -> CookieSettings {
        CookieSettings {
            name: "session".into(),
            secure: false,
            max_age_secs: 3600,
        }
    }

    #[test]
    fn session_cookie_flags() {
        let cookie = settings().session_cookie("abc.def.ghi");
        assert_eq!(cookie.name(), "session");
        assert_eq!(cookie.value(), "abc.def.ghi");
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::Strict));
        assert_eq!(cookie.path(), Some("/"));
        assert_eq!(cookie.max_age(), Some(CookieDuration::seconds(3600)));
    }

    #[test]
    fn removal_cookie_is_expired() {
        let cookie = settings().removal_cookie();
        assert_eq!(cookie.value(), "");
        assert_eq!(cookie.max_age(), Some(CookieDuration::ZERO));
    }

    #[test]
    fn extracts_named_cookie() {
        let mut headers = HeaderMap::new();
        let value = HeaderValue::from_static("theme=dark; session=tok123");
        headers.insert(COOKIE, value);

        let credential = settings().extract_credential(&headers);
        assert_eq!(credential.as_deref(), Some("tok123"));
    }

    #[test]
    fn missing_or_empty_cookie_is_none() {
        let mut headers = HeaderMap::new();
        assert!(settings().extract_credential(&headers).is_none());

        headers.insert(COOKIE, HeaderValue::from_static("session="));
        assert!(settings().extract_credential(&headers).is_none());
    }
}
