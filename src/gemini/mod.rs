pub mod http_provider;
pub mod image_client;
pub mod text_client;

use crate::{
    config::GeminiConfig,
    error::{ProxyError, Result},
    models::{GenerateContentRequest, GenerateContentResponse},
};
use async_trait::async_trait;
use std::sync::Arc;

pub use http_provider::GeminiHttpProvider;
pub use image_client::ImageClient;
pub use text_client::TextClient;

/// The `generateContent` call every action goes through.
#[async_trait]
pub trait GenerativeProvider: Send + Sync {
    async fn generate_content(
        &self,
        model: &str,
        request: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse>;
}

#[derive(Clone)]
pub struct GeminiClient {
    text_client: TextClient,
    image_client: ImageClient,
}

impl GeminiClient {
    /// Fails when no API key is configured.
    pub fn new(config: &GeminiConfig) -> Result<Self> {
        let api_key = config.api_key.clone().ok_or_else(|| {
            ProxyError::ConfigError(
                "API key not configured. Set GEMINI_API_KEY or API_KEY in the environment."
                    .into(),
            )
        })?;

        let provider = GeminiHttpProvider::new(config.base_url.clone(), api_key);
        Ok(Self::with_provider(Arc::new(provider), config))
    }

    pub fn with_provider(provider: Arc<dyn GenerativeProvider>, config: &GeminiConfig) -> Self {
        Self {
            text_client: TextClient::new(provider.clone(), config.text_model.clone()),
            image_client: ImageClient::new(provider, config.image_model.clone()),
        }
    }

    pub fn text(&self) -> &TextClient {
        &self.text_client
    }

    pub fn image(&self) -> &ImageClient {
        &self.image_client
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::error::UpstreamError;
    use std::sync::Mutex;

    /// Provider double that records every call and replays one reply.
    pub struct RecordingProvider {
        reply: std::result::Result<GenerateContentResponse, UpstreamError>,
        calls: Mutex<Vec<(String, GenerateContentRequest)>>,
    }

    impl RecordingProvider {
        pub fn replying(value: serde_json::Value) -> Arc<Self> {
            Arc::new(Self {
                reply: Ok(serde_json::from_value(value).unwrap()),
                calls: Mutex::new(Vec::new()),
            })
        }

        pub fn failing(error: UpstreamError) -> Arc<Self> {
            Arc::new(Self {
                reply: Err(error),
                calls: Mutex::new(Vec::new()),
            })
        }

        pub fn calls(&self) -> Vec<(String, GenerateContentRequest)> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl GenerativeProvider for RecordingProvider {
        async fn generate_content(
            &self,
            model: &str,
            request: &GenerateContentRequest,
        ) -> Result<GenerateContentResponse> {
            self.calls
                .lock()
                .unwrap()
                .push((model.to_string(), request.clone()));
            match &self.reply {
                Ok(response) => Ok(response.clone()),
                Err(e) => Err(ProxyError::Upstream(e.clone())),
            }
        }
    }
}
