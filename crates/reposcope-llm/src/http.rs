//! Shared HTTP client construction for consistent timeout and TLS configuration.

use std::time::Duration;

/// Create a shared HTTP client with standard reposcope configuration.
///
/// Config: 30s connect timeout, `request_timeout` per request, rustls TLS,
/// `reposcope/{version}` user-agent, redirect limit 10.
#[must_use]
pub fn client_with_timeout(request_timeout: Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(30))
        .timeout(request_timeout)
        .user_agent(concat!("reposcope/", env!("CARGO_PKG_VERSION")))
        .redirect(reqwest::redirect::Policy::limited(10))
        .build()
        .expect("default HTTP client construction must not fail")
}

/// [`client_with_timeout`] with a 60s request timeout.
#[must_use]
pub fn default_client() -> reqwest::Client {
    client_with_timeout(Duration::from_secs(60))
}
