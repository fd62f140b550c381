use std::future::Future;
use std::time::Duration;

use crate::error::LlmError;

const BASE_BACKOFF_SECS: u64 = 1;
const MAX_BACKOFF_SHIFT: u32 = 6;

/// Parse the `Retry-After` header value as seconds, falling back to exponential backoff.
pub(crate) fn retry_delay(response: &reqwest::Response, attempt: u32) -> Duration {
    if let Some(val) = response.headers().get("retry-after")
        && let Ok(s) = val.to_str()
        && let Ok(secs) = s.parse::<u64>()
    {
        return Duration::from_secs(secs);
    }
    backoff(attempt)
}

fn backoff(attempt: u32) -> Duration {
    Duration::from_secs(BASE_BACKOFF_SECS << attempt.min(MAX_BACKOFF_SHIFT))
}

/// Send an HTTP request, retrying up to `max_retries` times on 429 responses.
///
/// `f` must build and send a fresh request on every call. Returns the first
/// non-429 `Response` for further processing by the caller.
///
/// # Errors
///
/// Returns `LlmError::RateLimited` if all attempts are exhausted, or the underlying
/// `reqwest::Error` wrapped as `LlmError::Http` for transport failures.
pub(crate) async fn send_with_retry<F, Fut>(
    provider_name: &str,
    max_retries: u32,
    mut f: F,
) -> Result<reqwest::Response, LlmError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<reqwest::Response, reqwest::Error>>,
{
    for attempt in 0..=max_retries {
        let response = f().await.map_err(LlmError::Http)?;

        if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            if attempt == max_retries {
                return Err(LlmError::RateLimited);
            }
            let delay = retry_delay(&response, attempt);
            tracing::warn!(
                provider = provider_name,
                attempt = attempt + 1,
                max_retries,
                "rate limited, retrying in {}s",
                delay.as_secs()
            );
            tokio::time::sleep(delay).await;
            continue;
        }

        return Ok(response);
    }

    Err(LlmError::RateLimited)
}

#[cfg(test)]
mod tests {
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn rate_limited() -> ResponseTemplate {
        ResponseTemplate::new(429).insert_header("Retry-After", "0")
    }

    async fn send(
        client: &reqwest::Client,
        url: &str,
        max_retries: u32,
    ) -> Result<reqwest::Response, LlmError> {
        send_with_retry("test", max_retries, || client.get(url).send()).await
    }

    #[tokio::test]
    async fn success_on_first_attempt() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/embed"))
            .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
            .expect(1)
            .mount(&server)
            .await;

        let client = reqwest::Client::new();
        let resp = send(&client, &format!("{}/embed", server.uri()), 3)
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);
    }

    #[tokio::test]
    async fn exhausted_retries_return_rate_limited() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(rate_limited())
            .expect(2)
            .mount(&server)
            .await;

        let client = reqwest::Client::new();
        let result = send(&client, &format!("{}/embed", server.uri()), 1).await;
        assert!(
            matches!(result, Err(LlmError::RateLimited)),
            "expected RateLimited, got: {result:?}"
        );
    }

    #[tokio::test]
    async fn succeeds_after_one_429() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(rate_limited())
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let client = reqwest::Client::new();
        let resp = send(&client, &format!("{}/embed", server.uri()), 2)
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);
    }

    #[tokio::test]
    async fn other_error_statuses_are_returned_unretried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .expect(1)
            .mount(&server)
            .await;

        let client = reqwest::Client::new();
        let resp = send(&client, &format!("{}/embed", server.uri()), 3)
            .await
            .unwrap();
        assert_eq!(resp.status(), 500);
    }

    use proptest::prelude::*;

    proptest! {
        #[test]
        fn backoff_is_monotonic_and_capped(attempt in 0u32..1000) {
            let delay = backoff(attempt);
            prop_assert!(delay.as_secs() >= BASE_BACKOFF_SECS);
            prop_assert!(delay.as_secs() <= BASE_BACKOFF_SECS << MAX_BACKOFF_SHIFT);
            if attempt > 0 {
                prop_assert!(delay >= backoff(attempt - 1));
            }
        }
    }
}
