use crate::{
    error::{GoogleApiError, GoogleErrorEnvelope, ProxyError, Result},
    gemini::GenerativeProvider,
    models::{GenerateContentRequest, GenerateContentResponse},
};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};

pub const API_KEY_HEADER: &str = "x-goog-api-key";

/// Gemini REST transport.
#[derive(Clone)]
pub struct GeminiHttpProvider {
    client: Client,
    base_url: String,
    api_key: String,
}

impl GeminiHttpProvider {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self::with_client(Client::new(), base_url, api_key)
    }

    pub fn with_client(
        client: Client,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        }
    }

    pub fn endpoint(&self, model: &str) -> String {
        format!("{}/v1beta/models/{}:generateContent", self.base_url, model)
    }

    fn error_from_body(status: StatusCode, body: &[u8]) -> GoogleApiError {
        match serde_json::from_slice::<GoogleErrorEnvelope>(body) {
            Ok(envelope) => {
                let mut error = envelope.error;
                error.code.get_or_insert(status.as_u16());
                error
            }
            Err(_) => GoogleApiError {
                code: Some(status.as_u16()),
                message: String::from_utf8_lossy(body).trim().to_string(),
                status: status.canonical_reason().map(String::from),
            },
        }
    }
}

#[async_trait]
impl GenerativeProvider for GeminiHttpProvider {
    async fn generate_content(
        &self,
        model: &str,
        request: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse> {
        let url = self.endpoint(model);
        log::debug!("POST {}", url);

        let response = self
            .client
            .post(&url)
            .header(API_KEY_HEADER, &self.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                log::error!("Gemini transport error: {:?}", e);
                ProxyError::upstream(&e)
            })?;

        let status = response.status();
        let body = response.bytes().await.map_err(|e| ProxyError::upstream(&e))?;

        if !status.is_success() {
            let api_error = Self::error_from_body(status, &body);
            log::warn!(
                "Gemini returned {} for model {}: {}",
                status.as_u16(),
                model,
                api_error.message
            );
            return Err(ProxyError::upstream(&api_error));
        }

        serde_json::from_slice(&body).map_err(|e| ProxyError::upstream(&e))
    }
}
