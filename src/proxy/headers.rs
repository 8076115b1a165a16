//! Header handling for relayed exchanges.

use hyper::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_LENGTH, HOST};

/// Headers scoped to a single connection; they never cross the relay
pub fn is_hop_by_hop(name: &HeaderName) -> bool {
    matches!(
        name.as_str(),
        "connection"
            | "keep-alive"
            | "proxy-connection"
            | "te"
            | "trailer"
            | "transfer-encoding"
            | "upgrade"
    )
}

/// Headers for the outbound request: the client's headers minus connection
/// metadata, then `overrides` replacing any client value, then `host`.
pub fn outbound_headers(
    inbound: &HeaderMap,
    overrides: &HeaderMap,
    host: Option<&HeaderValue>,
) -> HeaderMap {
    let mut headers = HeaderMap::with_capacity(inbound.len() + overrides.len());
    for (name, value) in inbound {
        if is_hop_by_hop(name) || name == HOST || name == CONTENT_LENGTH {
            continue;
        }
        headers.append(name.clone(), value.clone());
    }

    for (name, value) in overrides {
        headers.insert(name.clone(), value.clone());
    }
    if let Some(host) = host {
        headers.insert(HOST, host.clone());
    }
    headers
}

/// Replace semantics: for every name present in `source`, drop whatever
/// `target` holds for it and append all of `source`'s values in order.
/// Names absent from `source` are left untouched.
pub fn replace_headers(target: &mut HeaderMap, source: &HeaderMap) {
    for name in source.keys() {
        if is_hop_by_hop(name) {
            continue;
        }
        target.remove(name);
        for value in source.get_all(name) {
            target.append(name.clone(), value.clone());
        }
    }
}
