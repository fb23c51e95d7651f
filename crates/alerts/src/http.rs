//! HTTP client construction for the weather lookup.

use std::time::Duration;

/// Per-request timeout for outbound calls.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Build a client with the request timeout and an optional forward proxy.
pub fn build_client(proxy: Option<&str>, timeout: Duration) -> Result<reqwest::Client, reqwest::Error> {
    let mut builder = reqwest::Client::builder().timeout(timeout);
    if let Some(url) = proxy {
        builder = builder.proxy(reqwest::Proxy::all(url)?);
    }
    builder.build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_client_with_and_without_proxy() {
        assert!(build_client(None, REQUEST_TIMEOUT).is_ok());
        assert!(build_client(Some("http://127.0.0.1:8080"), REQUEST_TIMEOUT).is_ok());
    }
}
