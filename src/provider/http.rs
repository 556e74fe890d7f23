use std::time::Duration;

use reqwest::{RequestBuilder, StatusCode};
use tracing::{debug, trace};

use crate::error::{Error, Result};

const MAX_BODY_IN_MESSAGE: usize = 200;

/// Who is being called, for logging and error attribution.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Upstream {
    pub provider: &'static str,
    pub hint: &'static str,
    pub timeout: Duration,
    /// Connection failures point at a user-supplied URL rather than at the provider.
    pub user_supplied_url: bool,
}

/// Send a request with the upstream's per-call timeout and return status and body.
pub(crate) async fn send(request: RequestBuilder, upstream: &Upstream) -> Result<(StatusCode, String)> {
    let resp = request
        .timeout(upstream.timeout)
        .send()
        .await
        .map_err(|e| transport_error(e, upstream))?;

    let status = resp.status();
    let body = resp.text().await.map_err(|e| transport_error(e, upstream))?;

    debug!(provider = upstream.provider, status = %status, body_len = body.len(), "upstream response");
    trace!(provider = upstream.provider, body = %body, "upstream response body");

    Ok((status, body))
}

/// Map a non-success HTTP status to the error taxonomy.
pub(crate) fn check_status(status: StatusCode, body: &str, upstream: &Upstream) -> Result<()> {
    if status.is_success() {
        return Ok(());
    }

    Err(match status.as_u16() {
        401 | 403 => Error::Auth {
            provider: upstream.provider,
            hint: upstream.hint,
        },
        429 => Error::RateLimited {
            provider: upstream.provider,
            hint: upstream.hint,
        },
        s if s >= 500 => Error::Server {
            provider: upstream.provider,
            status: s,
            hint: upstream.hint,
        },
        _ => Error::Provider {
            provider: upstream.provider,
            message: format!("{} returned {}: {}", upstream.provider, status, snippet(body)),
        },
    })
}

pub(crate) fn transport_error(err: reqwest::Error, upstream: &Upstream) -> Error {
    if err.is_timeout() {
        return Error::Timeout {
            provider: upstream.provider,
            secs: upstream.timeout.as_secs(),
            hint: upstream.hint,
        };
    }
    if err.is_connect() && upstream.user_supplied_url {
        return Error::UnreachableHost {
            provider: upstream.provider,
            hint: upstream.hint,
        };
    }
    Error::Provider {
        provider: upstream.provider,
        message: err.to_string(),
    }
}

pub(crate) fn parse_error(upstream: &Upstream, err: serde_json::Error) -> Error {
    Error::Parse(format!("{} JSON: {}", upstream.provider, err))
}

pub(crate) fn snippet(body: &str) -> &str {
    match body.char_indices().nth(MAX_BODY_IN_MESSAGE) {
        Some((idx, _)) => &body[..idx],
        None => body,
    }
}
