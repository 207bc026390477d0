use crate::flash::{clear_cookie, FlashMessage, FlashMessages};
use crate::response::ApiResponse;
use axum::{
    http::{header, HeaderMap},
    response::{AppendHeaders, IntoResponse},
};

/// Returns the pending flash messages and forgets them.
#[utoipa::path(
    get,
    path = "/api/v1/messages",
    responses(
        (status = 200, description = "Pending flash messages", body = Vec<FlashMessage>),
    ),
    tag = "messages"
)]
pub async fn consume_messages(headers: HeaderMap) -> impl IntoResponse {
    let messages = FlashMessages::from_headers(&headers).into_messages();
    (
        AppendHeaders([(header::SET_COOKIE, clear_cookie())]),
        ApiResponse::ok(messages),
    )
}
