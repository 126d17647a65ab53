//! Decoding inbound HTTP requests into store submissions

use std::collections::BTreeMap;
use std::net::SocketAddr;

use axum::http::{HeaderMap, Method, Uri, header};
use reqlog_core::RequestMeta;
use serde_json::Value;
use tracing::debug;

/// Placeholder when no client address can be determined
pub const UNKNOWN_CLIENT: &str = "unknown";

/// Decode a JSON body; empty or invalid bodies yield `None`
pub fn decode_body(bytes: &[u8]) -> Option<Value> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return None;
    }
    match serde_json::from_slice(bytes) {
        Ok(value) => Some(value),
        Err(e) => {
            debug!(error = %e, len = bytes.len(), "Body is not valid JSON, storing as empty");
            None
        }
    }
}

/// Collect the transport metadata for a submission
pub fn request_meta(
    method: &Method,
    uri: &Uri,
    headers: &HeaderMap,
    peer: Option<SocketAddr>,
) -> RequestMeta {
    RequestMeta {
        method: method.as_str().to_string(),
        headers: header_snapshot(headers),
        client_address: client_address(headers, peer),
        request_url: request_url(uri, headers),
    }
}

/// Best-effort originating address
///
/// Proxy headers win over the socket peer: first `x-forwarded-for` entry,
/// then `x-real-ip`.
pub fn client_address(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    let forwarded = header_str(headers, "x-forwarded-for")
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty());
    let real_ip = header_str(headers, "x-real-ip")
        .map(str::trim)
        .filter(|v| !v.is_empty());

    forwarded
        .or(real_ip)
        .map(str::to_string)
        .or_else(|| peer.map(|addr| addr.ip().to_string()))
        .unwrap_or_else(|| UNKNOWN_CLIENT.to_string())
}

/// Reconstruct the URL the request was sent to
pub fn request_url(uri: &Uri, headers: &HeaderMap) -> String {
    if uri.authority().is_some() {
        return uri.to_string();
    }

    let path = uri.path_and_query().map(|pq| pq.as_str()).unwrap_or("/");
    match header_str(headers, header::HOST.as_str()) {
        Some(host) => {
            let scheme = header_str(headers, "x-forwarded-proto").unwrap_or("http");
            format!("{scheme}://{host}{path}")
        }
        None => path.to_string(),
    }
}

/// Snapshot all headers; repeated headers are joined with `", "`
pub fn header_snapshot(headers: &HeaderMap) -> BTreeMap<String, String> {
    headers
        .keys()
        .map(|name| {
            let value = headers
                .get_all(name)
                .iter()
                .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned())
                .collect::<Vec<_>>()
                .join(", ");
            (name.as_str().to_string(), value)
        })
        .collect()
}

pub(crate) fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}
