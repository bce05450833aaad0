// Path: crates/hub/src/api/mod.rs
//! Hub HTTP handlers under `/api/v1/hub`.

pub mod node;
pub mod result;
pub mod verifier;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use provenet_types::response::{Envelope, WireCode};
use serde::Serialize;

/// Build an envelope-bodied response with an explicit HTTP status.
pub(crate) fn reply(status: StatusCode, code: WireCode) -> Response {
    (status, Json(Envelope::<serde_json::Value>::from_code(code))).into_response()
}

/// Like [`reply`] with a string payload in `results` (probe rejections).
pub(crate) fn reply_with_results(status: StatusCode, code: WireCode, results: String) -> Response {
    let body = Envelope {
        code: code.code(),
        msg: code.msg().to_string(),
        results: Some(serde_json::Value::String(results)),
    };
    (status, Json(body)).into_response()
}

/// Like [`reply`] with a caller-supplied message.
pub(crate) fn reply_with_msg(status: StatusCode, code: WireCode, msg: &str) -> Response {
    (status, Json(Envelope::<serde_json::Value>::with_msg(code, msg))).into_response()
}

/// 200 response with an arbitrary success body.
pub(crate) fn ok_json<T: Serialize>(body: T) -> Response {
    (StatusCode::OK, Json(body)).into_response()
}
