//! Maps a [`trc::Error`] onto an HTTP response, the way the teacher's
//! `jmap-proto::error::request::RequestError` turns a typed error into a
//! JSON problem body with the right status code — here driven by
//! [`trc::Kind::http_status`] instead of a per-variant match.

use bytes::Bytes;
use http_body_util::Full;
use hyper::{Response, StatusCode};

pub fn error_response(err: &trc::Error) -> Response<Full<Bytes>> {
    let status = StatusCode::from_u16(err.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let body = serde_json::json!({
        "error": {
            "message": err.message.to_string(),
            "details": err.details,
            "retryable": err.retryable(),
        }
    });
    Response::builder()
        .status(status)
        .header("content-type", "application/json")
        .body(Full::new(Bytes::from(body.to_string())))
        .expect("a JSON error body is always a valid response")
}

pub fn json_response(status: StatusCode, value: &impl serde::Serialize) -> Response<Full<Bytes>> {
    let body = serde_json::to_vec(value).unwrap_or_else(|_| b"{}".to_vec());
    Response::builder()
        .status(status)
        .header("content-type", "application/json")
        .body(Full::new(Bytes::from(body)))
        .expect("a JSON body is always a valid response")
}
