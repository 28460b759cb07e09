//! Device key lookup against the AIRMX exchange endpoint

use http_body_util::{BodyExt, Empty};
use hyper::Request;
use hyper::body::Bytes;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;

/// Exchange endpoint queried with the device id after pairing.
pub const DEFAULT_EXCHANGE_URL: &str = "http://api.airmx.com/ble/exchange";

#[derive(Debug, thiserror::Error)]
pub enum KeyLookupError {
    #[error("invalid exchange url: {0}")]
    Url(String),
    #[error("request failed: {0}")]
    Http(String),
    #[error("exchange answered with status {0}")]
    Status(u16),
    #[error("exchange answered with an unreadable body: {0}")]
    Body(String),
    #[error("exchange response has no key field")]
    MissingKey,
}

#[derive(serde::Deserialize)]
struct ExchangeResponse {
    key: Option<String>,
}

/// Fetches the device key for a paired purifier.
///
/// Failures here are lookup failures, not pairing failures - the purifier
/// is already configured by the time this runs.
pub async fn lookup_key(base_url: &str, device_id: u32) -> Result<String, KeyLookupError> {
    let uri: hyper::Uri = format!("{base_url}?device={device_id}")
        .parse()
        .map_err(|error| KeyLookupError::Url(format!("{error}")))?;

    let client: Client<_, Empty<Bytes>> = Client::builder(TokioExecutor::new()).build_http();

    let request = Request::get(uri)
        .body(Empty::new())
        .map_err(|error| KeyLookupError::Http(error.to_string()))?;

    let response = client
        .request(request)
        .await
        .map_err(|error| KeyLookupError::Http(error.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        return Err(KeyLookupError::Status(status.as_u16()));
    }

    let body = response
        .into_body()
        .collect()
        .await
        .map_err(|error| KeyLookupError::Body(error.to_string()))?
        .to_bytes();

    let parsed: ExchangeResponse =
        serde_json::from_slice(&body).map_err(|error| KeyLookupError::Body(error.to_string()))?;

    parsed.key.ok_or(KeyLookupError::MissingKey)
}
