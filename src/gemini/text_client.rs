use crate::{
    error::Result,
    gemini::GenerativeProvider,
    models::{GenerateContentRequest, Part},
};
use std::sync::Arc;

#[derive(Clone)]
pub struct TextClient {
    provider: Arc<dyn GenerativeProvider>,
    model_id: String,
}

impl TextClient {
    pub fn new(provider: Arc<dyn GenerativeProvider>, model_id: String) -> Self {
        Self { provider, model_id }
    }

    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    /// Plain completion, no tools attached. `None` when the model answered
    /// without any text part.
    pub async fn generate(&self, prompt: &str) -> Result<Option<String>> {
        let request = GenerateContentRequest::from_parts(vec![Part::text(prompt)]);

        log::info!("Invoking model: {}", self.model_id);
        log::debug!("Text generation prompt: {} chars", prompt.len());

        let response = self
            .provider
            .generate_content(&self.model_id, &request)
            .await?;

        if let Some(candidate) = response.candidates.first() {
            if let Some(reason) = &candidate.finish_reason {
                log::debug!("Finish reason: {}", reason);
            }
        }

        Ok(response.text())
    }
}
