// src/responses/errors.rs
use crate::errors::ServerError;
use crate::templates::components::error_page;
use astra::{Body, Response, ResponseBuilder};
use serde_json::json;

/// JSON body `{"error": kind, "message": text}` with the mapped status.
pub fn json_error_response(err: &ServerError) -> Response {
    let body = json!({
        "error": err.kind(),
        "message": public_message(err),
    });

    ResponseBuilder::new()
        .status(err.status_code())
        .header("Content-Type", mime::APPLICATION_JSON.as_ref())
        .body(Body::from(body.to_string()))
        .unwrap_or_else(|_| fallback())
}

/// Full HTML error page with the mapped status.
pub fn html_error_response(err: &ServerError) -> Response {
    let page = error_page(err.status_code(), &public_message(err));

    ResponseBuilder::new()
        .status(err.status_code())
        .header("Content-Type", mime::TEXT_HTML_UTF_8.as_ref())
        .body(Body::from(page.into_string()))
        .unwrap_or_else(|_| fallback())
}

/// Server-side failures are logged in full but never echoed to clients.
fn public_message(err: &ServerError) -> String {
    match err {
        ServerError::DbError(_) | ServerError::XlsxError(_) | ServerError::InternalError => {
            "Internal Server Error".to_string()
        }
        other => other.to_string(),
    }
}

fn fallback() -> Response {
    let mut resp = Response::new(Body::from("Internal Server Error"));
    if let Ok(code) = 500u16.try_into() {
        *resp.status_mut() = code;
    }
    resp
}
