// Path: crates/node/src/http/mod.rs
//! The node's HTTP surface: v1 at the root, v2 under `/api/v2`.

pub mod v1;
pub mod v2;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use provenet_types::response::{Envelope, WireCode};

/// Envelope-bodied response with an explicit HTTP status.
pub(crate) fn reply(status: StatusCode, code: WireCode) -> Response {
    (status, Json(Envelope::<serde_json::Value>::from_code(code))).into_response()
}

/// Like [`reply`] with a caller-supplied message.
pub(crate) fn reply_with_msg(status: StatusCode, code: WireCode, msg: &str) -> Response {
    (status, Json(Envelope::<serde_json::Value>::with_msg(code, msg))).into_response()
}
