//! Response status checking and body decoding.

use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{ApiError, ApiResult};
use crate::http::HttpResponse;
use crate::record::{Payload, Record, Shape};

/// Check the status, then decode the body according to `shape`.
pub fn parse_response(response: HttpResponse, shape: Shape) -> ApiResult<Payload> {
    check_status(&response)?;
    decode(&response.body, shape)
}

/// Anything other than 200 becomes `ApiError::Server` with the raw body.
pub fn check_status(response: &HttpResponse) -> ApiResult<()> {
    if response.status == 200 {
        return Ok(());
    }
    let body = response.body_text();
    warn!(status = response.status, body = %body, "server rejected request");
    Err(ApiError::Server {
        status: response.status,
        body,
    })
}

/// Decode a raw body. The decoder knows nothing about endpoints; the caller
/// picks the shape. Bytes that are not UTF-8 JSON fail with `Decode`.
pub fn decode(body: &[u8], shape: Shape) -> ApiResult<Payload> {
    if body.is_empty() {
        debug!("empty body response");
        return Ok(Payload::Empty);
    }

    let payload = match shape {
        Shape::Single => Payload::Record(from_json::<Record>(body)?),
        Shape::Collection => Payload::Collection(from_json::<Vec<Record>>(body)?),
        Shape::Names => Payload::Names(from_json::<Vec<String>>(body)?),
    };
    Ok(payload)
}

fn from_json<T: serde::de::DeserializeOwned>(body: &[u8]) -> ApiResult<T> {
    // Parse to a `Value` first so syntax errors and shape errors read differently.
    let value: Value = serde_json::from_slice(body).map_err(|e| ApiError::Decode(format!("invalid JSON: {e}")))?;
    serde_json::from_value(value).map_err(|e| ApiError::Decode(format!("unexpected shape: {e}")))
}
