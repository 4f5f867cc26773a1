use cloudrt_core::{Error, ErrorKind};
use http::StatusCode;
use serde::Deserialize;

/// Error body returned by the RPC API.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub(crate) struct ApiError {
    code: String,
    message: String,
    request_id: String,
}

/// Map a failed response to an [`Error`].
///
/// The error code decides first, the status code second.
pub(crate) fn classify(action: &str, status: StatusCode, body: &[u8]) -> Error {
    let api: ApiError = serde_json::from_slice(body).unwrap_or_default();

    let kind = kind_from_code(&api.code).unwrap_or_else(|| kind_from_status(status));

    let message = if api.code.is_empty() {
        format!(
            "{action} failed with {status}: {}",
            String::from_utf8_lossy(body)
        )
    } else {
        format!(
            "{action} failed with {status}: {}: {} (request id: {})",
            api.code, api.message, api.request_id
        )
    };

    let err = Error::new(kind, message);
    if api.code.is_empty() {
        err
    } else {
        err.with_code(api.code)
    }
}

fn kind_from_code(code: &str) -> Option<ErrorKind> {
    match code {
        "" => None,
        "SignatureDoesNotMatch" | "IncompleteSignature" => Some(ErrorKind::Unauthenticated),
        c if c.starts_with("InvalidAccessKeyId") => Some(ErrorKind::Unauthenticated),
        c if c.starts_with("Forbidden") => Some(ErrorKind::Unauthorized),
        "ServiceUnavailable" => Some(ErrorKind::Transient),
        c if c.starts_with("Throttling") => Some(ErrorKind::Transient),
        _ => None,
    }
}

fn kind_from_status(status: StatusCode) -> ErrorKind {
    match status {
        StatusCode::UNAUTHORIZED => ErrorKind::Unauthenticated,
        StatusCode::FORBIDDEN => ErrorKind::Unauthorized,
        StatusCode::TOO_MANY_REQUESTS => ErrorKind::Transient,
        s if s.is_server_error() => ErrorKind::Transient,
        _ => ErrorKind::Unexpected,
    }
}
