//! Rewrites axum's plain-text extractor rejections into the JSON envelope.

use axum::{
    body::{Body, Bytes},
    http::{HeaderValue, Request, StatusCode, header},
    middleware::Next,
    response::Response,
};
use chrono::Utc;
use tracing::debug;

use crate::core::http::response_envelope::{ApiErrorDetail, ApiResponse};

const MAX_REJECTION_BYTES: usize = 64 * 1024;

async fn take_body(res: Response) -> (axum::http::response::Parts, Bytes) {
    let (parts, body) = res.into_parts();
    let bytes = axum::body::to_bytes(body, MAX_REJECTION_BYTES)
        .await
        .unwrap_or_default();
    (parts, bytes)
}

const BODY_FIELDS: [&str; 9] = [
    "question",
    "dept",
    "year",
    "semester",
    "pdf_url",
    "path",
    "source",
    "text",
    "course_code",
];

/// First backticked body field in the serde message.
fn guess_path_from_serde_msg(msg: &str) -> Option<String> {
    BODY_FIELDS
        .iter()
        .filter_map(|key| msg.find(&format!("`{key}`")).map(|at| (at, *key)))
        .min_by_key(|(at, _)| *at)
        .map(|(_, key)| key.to_string())
}

fn ensure_request_id(parts: &mut axum::http::response::Parts) -> String {
    if let Some(v) = parts
        .headers
        .get("X-Request-Id")
        .and_then(|h| h.to_str().ok())
        .filter(|v| !v.trim().is_empty())
    {
        return v.to_string();
    }
    let nanos = Utc::now()
        .timestamp_nanos_opt()
        .unwrap_or_else(|| Utc::now().timestamp_micros() * 1000);
    let id = format!("req-{nanos}");
    if let Ok(v) = HeaderValue::from_str(&id) {
        parts.headers.insert("X-Request-Id", v);
    }
    id
}

fn is_json(parts: &axum::http::response::Parts) -> bool {
    parts
        .headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("application/json"))
}

/// Only 400/415/422 responses that are not JSON already are rewritten.
pub async fn json_error_mapper(req: Request<Body>, next: Next) -> Response {
    let res = next.run(req).await;
    let status = res.status();

    if !matches!(
        status,
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY | StatusCode::UNSUPPORTED_MEDIA_TYPE
    ) {
        return res;
    }

    let (mut parts, bytes) = take_body(res).await;
    let req_id = ensure_request_id(&mut parts);
    if is_json(&parts) {
        return Response::from_parts(parts, bytes.into());
    }

    let original = String::from_utf8_lossy(&bytes);
    debug!(request_id = %req_id, %status, rejection = %original.trim(), "mapped rejection");

    let detail = ApiErrorDetail::field(
        guess_path_from_serde_msg(&original),
        if original.contains("missing field") {
            Some("Add the missing field to the JSON body.".into())
        } else if original.contains("Content-Type") {
            Some("Send the body with `content-type: application/json`.".into())
        } else if original.contains("expected a string") {
            Some("Use a JSON string here (e.g. \"2024\").".into())
        } else if original.contains("unknown field") {
            Some("Remove the field; local files can only be ingested from the CLI.".into())
        } else {
            None
        },
    );

    let envelope = ApiResponse::<()>::error(
        if status == StatusCode::UNPROCESSABLE_ENTITY {
            "UNPROCESSABLE_ENTITY"
        } else {
            "BAD_REQUEST"
        },
        original.trim(),
        vec![detail],
    );

    let body = match serde_json::to_vec(&envelope) {
        Ok(v) => v,
        Err(_) => bytes.to_vec(),
    };

    parts.headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    parts.headers.remove(header::CONTENT_LENGTH);

    Response::from_parts(parts, body.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guesses_field_from_serde_message() {
        let msg = "Failed to deserialize the JSON body into the target type: missing field `dept` at line 1 column 20";
        assert_eq!(guess_path_from_serde_msg(msg).as_deref(), Some("dept"));
        assert_eq!(guess_path_from_serde_msg("EOF while parsing"), None);

        let unknown = "unknown field `path`, expected one of `pdf_url`, `text`, `source`, `dept`";
        assert_eq!(guess_path_from_serde_msg(unknown).as_deref(), Some("path"));
    }
}
