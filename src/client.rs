//! Typed client for the proxy endpoint.
//!
//! Every call is one JSON POST. A failed call always comes back as a single
//! [`ProxyError`] whose message is fit to show a user; a malformed error
//! body degrades to `Request failed (<status>)`.

use crate::{
    error::{ProxyError, Result},
    models::{
        ActionRequest, Diagnostic, DiagnosticReply, ImageReply, Insights, InsightsReply,
        DEFAULT_ASPECT_RATIO, NO_INSIGHTS_FALLBACK,
    },
    FUNCTION_PATH,
};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::Value;

pub const ACCESS_DENIED_MESSAGE: &str = "Access Denied (403). If you restricted your API key, ensure this domain is added to the allowlist in Google Cloud Console.";
pub const CONNECTIVITY_MESSAGE: &str =
    "Unable to connect to Gemini. Please check your network or API limits.";
pub const INSIGHTS_UNAVAILABLE_MESSAGE: &str =
    "Unable to retrieve insights. Please check your API key quotas or network connection.";

#[derive(Clone)]
pub struct ProxyClient {
    http: Client,
    endpoint: String,
}

impl ProxyClient {
    /// `base_url` is the site origin, e.g. `http://localhost:8888`.
    pub fn new(base_url: &str) -> Self {
        Self::with_client(Client::new(), base_url)
    }

    pub fn with_client(http: Client, base_url: &str) -> Self {
        Self {
            http,
            endpoint: format!("{}{}", base_url.trim_end_matches('/'), FUNCTION_PATH),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub async fn ping(&self) -> Result<Diagnostic> {
        let reply: DiagnosticReply = self.post_action(&ActionRequest::Ping).await?;
        fail_on_reported_error(reply.error)?;
        Ok(Diagnostic {
            ok: reply.ok.unwrap_or(false),
            key_configured: reply.key_configured.unwrap_or(false),
            message: reply.message.unwrap_or_default(),
        })
    }

    /// Returns the generated image as a data-URI.
    pub async fn generate_image(
        &self,
        prompt: &str,
        aspect_ratio: Option<&str>,
    ) -> Result<String> {
        let request = ActionRequest::GenerateImage {
            prompt: prompt.to_string(),
            aspect_ratio: aspect_ratio.unwrap_or(DEFAULT_ASPECT_RATIO).to_string(),
        };
        let reply: ImageReply = self.post_action(&request).await?;
        fail_on_reported_error(reply.error)?;
        reply.image.ok_or(ProxyError::NoImage)
    }

    pub async fn search_insights(&self, query: &str) -> Result<Insights> {
        let request = ActionRequest::Search {
            query: query.to_string(),
        };
        let reply: InsightsReply = self.post_action(&request).await?;
        fail_on_reported_error(reply.error)?;
        Ok(Insights {
            text: reply
                .text
                .unwrap_or_else(|| NO_INSIGHTS_FALLBACK.to_string()),
            sources: reply.sources.unwrap_or_default(),
        })
    }

    /// `Ok(None)` when the proxy answered without an image and without an
    /// error.
    pub async fn edit_image(&self, base64_image: &str, prompt: &str) -> Result<Option<String>> {
        let request = ActionRequest::EditImage {
            base64_image: base64_image.to_string(),
            prompt: prompt.to_string(),
        };
        let result = match self.post_action::<ImageReply>(&request).await {
            Ok(reply) => fail_on_reported_error(reply.error).map(|_| reply.image),
            Err(e) => Err(e),
        };
        if let Err(e) = &result {
            log::error!("Gemini Error: {}", e);
        }
        result
    }

    async fn post_action<T>(&self, request: &ActionRequest) -> Result<T>
    where
        T: DeserializeOwned + Default,
    {
        log::debug!("POST {} ({})", self.endpoint, request.name());

        let response = self
            .http
            .post(&self.endpoint)
            .json(request)
            .send()
            .await
            .map_err(|e| ProxyError::RequestError(e.to_string()))?;

        let status = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .map_err(|e| ProxyError::RequestError(e.to_string()))?;

        unwrap_reply(status, &body)
    }
}

/// Turns a raw proxy reply into `T` or the error it reports.
///
/// Non-2xx: the body's string `error` field, else `Request failed
/// (<status>)`. 2xx with an unreadable body reads as an empty reply.
pub fn unwrap_reply<T>(status: u16, body: &[u8]) -> Result<T>
where
    T: DeserializeOwned + Default,
{
    if !(200..300).contains(&status) {
        let message = serde_json::from_slice::<Value>(body)
            .ok()
            .and_then(|v| v.get("error").and_then(Value::as_str).map(String::from))
            .unwrap_or_else(|| format!("Request failed ({})", status));
        return Err(ProxyError::Remote(message));
    }

    Ok(serde_json::from_slice(body).unwrap_or_default())
}

fn fail_on_reported_error(error: Option<String>) -> Result<()> {
    match error {
        Some(message) => Err(ProxyError::Remote(message)),
        None => Ok(()),
    }
}

/// Message shown when image generation or editing fails.
pub fn describe_image_failure(err: &ProxyError) -> String {
    let message = err.to_string();
    if message.contains("403") {
        ACCESS_DENIED_MESSAGE.to_string()
    } else if message.is_empty() {
        CONNECTIVITY_MESSAGE.to_string()
    } else {
        message
    }
}

/// Message shown in place of insights when a search fails.
pub fn describe_search_failure(err: &ProxyError) -> String {
    log::error!("Search error: {}", err);
    INSIGHTS_UNAVAILABLE_MESSAGE.to_string()
}
