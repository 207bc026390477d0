//! One-shot notices carried to the next page in a cookie.

use crate::utils::cookie::{build_clear_cookie, build_cookie, extract_cookie};
use axum::{
    http::{header, HeaderMap},
    response::{AppendHeaders, IntoResponse, Redirect, Response},
};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub const FLASH_COOKIE: &str = "flash_messages";

/// Upper bound on the encoded cookie value. Browsers drop cookies past 4096
/// bytes, so the oldest messages go first once this is reached.
pub const MAX_FLASH_COOKIE_LEN: usize = 2048;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum FlashLevel {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct FlashMessage {
    pub level: FlashLevel,
    pub message: String,
}

/// Pending messages for the current client. Messages queued by earlier
/// requests and not yet read are kept.
#[derive(Debug, Default)]
pub struct FlashMessages {
    messages: Vec<FlashMessage>,
}

impl FlashMessages {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let messages = extract_cookie(headers, FLASH_COOKIE)
            .and_then(|raw| decode(&raw))
            .unwrap_or_default();
        Self { messages }
    }

    pub fn success(mut self, message: impl Into<String>) -> Self {
        self.messages.push(FlashMessage {
            level: FlashLevel::Success,
            message: message.into(),
        });
        self
    }

    pub fn into_messages(self) -> Vec<FlashMessage> {
        self.messages
    }

    /// 303 redirect that stores the queued messages for the next page.
    pub fn redirect(mut self, location: &str) -> Response {
        let cookie = build_cookie(FLASH_COOKIE, &encode_capped(&mut self.messages), None);
        (
            AppendHeaders([(header::SET_COOKIE, cookie)]),
            Redirect::to(location),
        )
            .into_response()
    }
}

/// `Set-Cookie` header value that drops every pending message.
pub fn clear_cookie() -> String {
    build_clear_cookie(FLASH_COOKIE)
}

fn encode(messages: &[FlashMessage]) -> String {
    // Serializing plain strings and enums cannot fail.
    let json = serde_json::to_vec(messages).unwrap_or_default();
    URL_SAFE_NO_PAD.encode(json)
}

/// Encodes `messages`, dropping the oldest until the value fits
/// [`MAX_FLASH_COOKIE_LEN`]. The newest message is always kept.
fn encode_capped(messages: &mut Vec<FlashMessage>) -> String {
    loop {
        let encoded = encode(messages);
        if encoded.len() <= MAX_FLASH_COOKIE_LEN || messages.len() <= 1 {
            return encoded;
        }
        messages.remove(0);
    }
}

fn decode(raw: &str) -> Option<Vec<FlashMessage>> {
    let bytes = URL_SAFE_NO_PAD.decode(raw).ok()?;
    serde_json::from_slice(&bytes).ok()
}
