use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::LlmError;
use crate::provider::EmbeddingProvider;
use crate::retry::send_with_retry;

const DEFAULT_MAX_RETRIES: u32 = 3;

/// Client for any OpenAI-compatible `/embeddings` endpoint.
pub struct OpenAiProvider {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    embedding_model: String,
    max_retries: u32,
}

impl fmt::Debug for OpenAiProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenAiProvider")
            .field("client", &"<reqwest::Client>")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("embedding_model", &self.embedding_model)
            .field("max_retries", &self.max_retries)
            .finish()
    }
}

impl Clone for OpenAiProvider {
    fn clone(&self) -> Self {
        Self {
            client: self.client.clone(),
            api_key: self.api_key.clone(),
            base_url: self.base_url.clone(),
            embedding_model: self.embedding_model.clone(),
            max_retries: self.max_retries,
        }
    }
}

impl OpenAiProvider {
    /// An empty `api_key` sends no `Authorization` header, which is what
    /// self-hosted compatible servers usually expect.
    #[must_use]
    pub fn new(api_key: String, mut base_url: String, embedding_model: String) -> Self {
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self {
            client: crate::http::default_client(),
            api_key,
            base_url,
            embedding_model,
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }

    #[must_use]
    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    #[must_use]
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/embeddings", self.base_url)
    }
}

impl EmbeddingProvider for OpenAiProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, LlmError> {
        let body = EmbeddingRequest {
            input: text,
            model: &self.embedding_model,
        };
        let url = self.endpoint();

        let response = send_with_retry("openai", self.max_retries, || {
            let mut request = self.client.post(&url).json(&body);
            if !self.api_key.is_empty() {
                request = request.bearer_auth(&self.api_key);
            }
            request.send()
        })
        .await?;

        let status = response.status();
        let text = response.text().await.map_err(LlmError::Http)?;

        if !status.is_success() {
            tracing::error!("embedding API error {status}: {text}");
            return Err(LlmError::Status {
                status: status.as_u16(),
            });
        }

        let resp: EmbeddingResponse = serde_json::from_str(&text)?;

        resp.data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or(LlmError::EmptyResponse {
                provider: "openai".into(),
            })
    }

    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        "openai"
    }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    input: &'a str,
    model: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

#[cfg(test)]
mod tests {
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn test_provider(base_url: &str) -> OpenAiProvider {
        OpenAiProvider::new(
            "sk-test-key".into(),
            base_url.into(),
            "text-embedding-3-small".into(),
        )
        .with_max_retries(0)
    }

    #[test]
    fn new_stores_fields() {
        let p = test_provider("https://api.openai.com/v1");
        assert_eq!(p.api_key, "sk-test-key");
        assert_eq!(p.base_url, "https://api.openai.com/v1");
        assert_eq!(p.embedding_model, "text-embedding-3-small");
        assert_eq!(p.max_retries, 0);
    }

    #[test]
    fn base_url_strips_trailing_slashes() {
        let p = test_provider("https://api.openai.com/v1//");
        assert_eq!(p.endpoint(), "https://api.openai.com/v1/embeddings");
    }

    #[test]
    fn debug_redacts_api_key() {
        let p = test_provider("https://api.openai.com/v1");
        let debug = format!("{p:?}");
        assert!(!debug.contains("sk-test-key"));
        assert!(debug.contains("<redacted>"));
        assert!(debug.contains("text-embedding-3-small"));
    }

    #[test]
    fn clone_preserves_fields() {
        let p = test_provider("https://api.openai.com/v1");
        let c = p.clone();
        assert_eq!(c.api_key, p.api_key);
        assert_eq!(c.base_url, p.base_url);
        assert_eq!(c.embedding_model, p.embedding_model);
    }

    #[test]
    fn name_returns_openai() {
        assert_eq!(test_provider("http://x").name(), "openai");
    }

    #[test]
    fn parse_embedding_response() {
        let json = r#"{"data":[{"embedding":[0.1,0.2,0.3]}]}"#;
        let resp: EmbeddingResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.data.len(), 1);
        assert_eq!(resp.data[0].embedding, vec![0.1, 0.2, 0.3]);
    }

    #[tokio::test]
    async fn embed_posts_model_and_input() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/embeddings"))
            .and(header("authorization", "Bearer sk-test-key"))
            .and(body_json(serde_json::json!({
                "input": "hello world",
                "model": "text-embedding-3-small",
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": [{"embedding": [0.5, 0.25]}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let vector = test_provider(&server.uri())
            .embed("hello world")
            .await
            .unwrap();
        assert_eq!(vector, vec![0.5, 0.25]);
    }

    #[tokio::test]
    async fn embed_error_status_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
            .mount(&server)
            .await;

        let err = test_provider(&server.uri()).embed("x").await.unwrap_err();
        assert!(matches!(err, LlmError::Status { status: 503 }), "{err:?}");
    }

    #[tokio::test]
    async fn embed_empty_data_is_empty_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"data": []})))
            .mount(&server)
            .await;

        let err = test_provider(&server.uri()).embed("x").await.unwrap_err();
        assert!(matches!(err, LlmError::EmptyResponse { .. }), "{err:?}");
    }

    #[tokio::test]
    async fn embed_rate_limited_after_retries() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "0"))
            .expect(2)
            .mount(&server)
            .await;

        let err = test_provider(&server.uri())
            .with_max_retries(1)
            .embed("x")
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::RateLimited), "{err:?}");
    }

    #[tokio::test]
    async fn embed_unreachable_endpoint_errors() {
        let p = test_provider("http://127.0.0.1:1");
        assert!(p.embed("test").await.is_err());
    }
}
