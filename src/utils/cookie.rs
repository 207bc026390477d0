use crate::config::parse_bool_env;
use axum::http::{header, HeaderMap};
use std::{env, sync::OnceLock};

/// Set by the forum application at login; accepted as a fallback to the
/// `Authorization` header.
pub const ACCESS_TOKEN_COOKIE: &str = "access_token";

#[derive(Debug, Clone)]
struct CookieConfig {
    secure: bool,
    same_site: &'static str,
    domain: Option<String>,
}

impl CookieConfig {
    fn from_env() -> Self {
        let same_site =
            parse_same_site(&env::var("COOKIE_SAMESITE").unwrap_or_else(|_| "Lax".to_string()));
        let domain = env::var("COOKIE_DOMAIN")
            .ok()
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty());

        // Browsers require SameSite=None cookies to also be Secure.
        let secure = same_site == "None" || parse_bool_env("COOKIE_SECURE", false);

        Self {
            secure,
            same_site,
            domain,
        }
    }

    fn finish(&self, mut cookie: String) -> String {
        cookie.push_str("; HttpOnly; SameSite=");
        cookie.push_str(self.same_site);

        if self.secure {
            cookie.push_str("; Secure");
        }

        if let Some(domain) = &self.domain {
            cookie.push_str("; Domain=");
            cookie.push_str(domain);
        }

        cookie
    }
}

fn cookie_config() -> &'static CookieConfig {
    static CONFIG: OnceLock<CookieConfig> = OnceLock::new();
    CONFIG.get_or_init(CookieConfig::from_env)
}

fn parse_same_site(value: &str) -> &'static str {
    match value.trim().to_ascii_lowercase().as_str() {
        "strict" => "Strict",
        "none" => "None",
        _ => "Lax",
    }
}

/// Builds a `Set-Cookie` value. `max_age_seconds = None` yields a session cookie.
pub fn build_cookie(name: &str, value: &str, max_age_seconds: Option<u64>) -> String {
    let mut cookie = format!("{name}={value}; Path=/");
    if let Some(max_age) = max_age_seconds {
        cookie.push_str(&format!("; Max-Age={max_age}"));
    }
    cookie_config().finish(cookie)
}

pub fn build_clear_cookie(name: &str) -> String {
    cookie_config().finish(format!(
        "{name}=; Path=/; Max-Age=0; Expires=Thu, 01 Jan 1970 00:00:00 GMT"
    ))
}

pub fn extract_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .find_map(|cookie_header| {
            cookie_header.split(';').find_map(|cookie| {
                let (key, value) = cookie.trim().split_once('=')?;
                (key.trim() == name).then(|| value.trim().to_string())
            })
        })
}
