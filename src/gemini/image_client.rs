use crate::{
    error::{ProxyError, Result},
    gemini::GenerativeProvider,
    models::{png_data_uri, GenerateContentRequest, Part},
};
use std::sync::Arc;

/// Mime type declared for images forwarded to the edit model.
pub const EDIT_INPUT_MIME: &str = "image/png";

#[derive(Clone)]
pub struct ImageClient {
    provider: Arc<dyn GenerativeProvider>,
    model_id: String,
}

impl ImageClient {
    pub fn new(provider: Arc<dyn GenerativeProvider>, model_id: String) -> Self {
        Self { provider, model_id }
    }

    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    /// Returns the first generated image as a PNG data-URI.
    pub async fn generate(&self, prompt: &str, aspect_ratio: &str) -> Result<String> {
        let request = GenerateContentRequest::from_parts(vec![Part::text(prompt)])
            .with_aspect_ratio(aspect_ratio);

        log::info!(
            "Generating image with model: {} ({})",
            self.model_id,
            aspect_ratio
        );
        self.first_image(request).await
    }

    /// `raw_base64` must already be stripped of any data-URI header.
    pub async fn edit(&self, raw_base64: &str, instruction: &str) -> Result<String> {
        let request = GenerateContentRequest::from_parts(vec![
            Part::inline_base64(EDIT_INPUT_MIME, raw_base64),
            Part::text(instruction),
        ]);

        log::info!(
            "Editing image with model: {} ({} base64 chars)",
            self.model_id,
            raw_base64.len()
        );
        self.first_image(request).await
    }

    async fn first_image(&self, request: GenerateContentRequest) -> Result<String> {
        let response = self
            .provider
            .generate_content(&self.model_id, &request)
            .await?;

        match response.first_inline_image() {
            Some(image) => {
                log::debug!(
                    "Received {} base64 chars of image data ({})",
                    image.data.len(),
                    image.mime_type
                );
                Ok(png_data_uri(&image.data))
            }
            None => Err(ProxyError::NoImage),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gemini::testing::RecordingProvider;
    use serde_json::json;

    #[tokio::test]
    async fn test_generate_sends_prompt_and_aspect_ratio() {
        let provider = RecordingProvider::replying(json!({
            "candidates": [{"content": {"parts": [
                {"inlineData": {"mimeType": "image/png", "data": "AAAA"}}
            ]}}]
        }));
        let client = ImageClient::new(provider.clone(), "gemini-2.5-flash-image".into());

        let image = client.generate("a lighthouse", "4:3").await.unwrap();
        assert_eq!(image, "data:image/png;base64,AAAA");

        let calls = provider.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, "gemini-2.5-flash-image");
        assert_eq!(
            serde_json::to_value(&calls[0].1).unwrap()["generationConfig"],
            json!({"imageConfig": {"aspectRatio": "4:3"}})
        );
    }

    #[tokio::test]
    async fn test_edit_without_image_part_is_no_image() {
        let provider = RecordingProvider::replying(json!({
            "candidates": [{"content": {"parts": [{"text": "I can't do that"}]}}]
        }));
        let client = ImageClient::new(provider.clone(), "m".into());

        let err = client.edit("AAAA", "add a hat").await.unwrap_err();
        assert!(matches!(err, ProxyError::NoImage));

        let sent = &provider.calls()[0].1;
        assert_eq!(
            sent.contents[0].parts[0],
            Part::inline_base64("image/png", "AAAA")
        );
        assert_eq!(sent.contents[0].parts[1], Part::text("add a hat"));
        assert!(sent.generation_config.is_none());
    }

    #[tokio::test]
    async fn test_unpadded_image_after_text_is_forwarded_unchanged() {
        let provider = RecordingProvider::replying(json!({
            "candidates": [{"content": {"parts": [
                {"text": "Edited."},
                {"inlineData": {"mimeType": "image/png", "data": "iVBORw0KGgo"}},
                {"inlineData": {"mimeType": "image/png", "data": "%%%"}}
            ]}}]
        }));
        let client = ImageClient::new(provider, "m".into());

        let image = client.edit("AAAA", "crop it").await.unwrap();
        assert_eq!(image, "data:image/png;base64,iVBORw0KGgo");
    }
}
