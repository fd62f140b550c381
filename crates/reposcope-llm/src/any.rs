#[cfg(feature = "mock")]
use crate::mock::MockProvider;
use crate::ollama::OllamaProvider;
use crate::openai::OpenAiProvider;

use crate::error::LlmError;
use crate::provider::EmbeddingProvider;

/// Generates a match over all `AnyProvider` variants, binding the inner provider
/// and evaluating the given closure for each arm.
macro_rules! delegate_provider {
    ($self:expr, |$p:ident| $expr:expr) => {
        match $self {
            AnyProvider::OpenAi($p) => $expr,
            AnyProvider::Ollama($p) => $expr,
            #[cfg(feature = "mock")]
            AnyProvider::Mock($p) => $expr,
        }
    };
}

/// Runtime-selected embedding backend.
#[derive(Debug, Clone)]
pub enum AnyProvider {
    OpenAi(OpenAiProvider),
    Ollama(OllamaProvider),
    #[cfg(feature = "mock")]
    Mock(MockProvider),
}

impl EmbeddingProvider for AnyProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, LlmError> {
        delegate_provider!(self, |p| p.embed(text).await)
    }

    fn name(&self) -> &str {
        delegate_provider!(self, |p| p.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_delegates_to_inner() {
        let openai = AnyProvider::OpenAi(OpenAiProvider::new(
            String::new(),
            "http://localhost:8080/v1".into(),
            "m".into(),
        ));
        assert_eq!(openai.name(), "openai");

        let ollama = AnyProvider::Ollama(OllamaProvider::new("http://localhost:11434", "m".into()));
        assert_eq!(ollama.name(), "ollama");
    }

    #[cfg(feature = "mock")]
    #[tokio::test]
    async fn embed_delegates_to_mock() {
        let p = AnyProvider::Mock(MockProvider::default().with_vector("q", vec![0.5]));
        assert_eq!(p.embed("q").await.unwrap(), vec![0.5]);
    }
}
