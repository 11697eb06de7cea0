//! The single proxy endpoint as a pure function of `(method, body)`.
//!
//! Evaluation stops at the first failing step: preflight, method, API key,
//! body parsing, action validation, provider call. Every path ends in a
//! [`ProxyResponse`]; provider failures become 502s and are logged.

use crate::{
    config::GeminiConfig,
    error::{ProxyError, Result},
    gemini::GeminiClient,
    logger,
    models::{
        strip_data_uri_header, ActionRequest, ActionResult, Diagnostic, Insights,
        NO_INSIGHTS_FALLBACK,
    },
};
use serde::Serialize;
use serde_json::{json, Value};

/// Headers attached to every response, preflight included.
pub const CORS_HEADERS: [(&str, &str); 2] = [
    ("Access-Control-Allow-Origin", "*"),
    ("Access-Control-Allow-Headers", "Content-Type"),
];

pub fn illustration_prompt(prompt: &str) -> String {
    format!(
        "A vibrant, clean Google-style vector illustration or 3D render of a futuristic \
         technology concept representing: {}. Professional, optimistic, bright colors, \
         minimalist aesthetic.",
        prompt
    )
}

pub fn insight_prompt(query: &str) -> String {
    format!(
        "Provide a concise, professional summary answering the following question. \
         Focus on technical accuracy suitable for a TPM audience. Query: {}",
        query
    )
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProxyResponse {
    pub status: u16,
    /// `None` only for the 204 preflight answer.
    pub body: Option<Value>,
}

impl ProxyResponse {
    pub fn no_content() -> Self {
        Self {
            status: 204,
            body: None,
        }
    }

    pub fn json<T: Serialize>(status: u16, payload: &T) -> Self {
        match serde_json::to_value(payload) {
            Ok(body) => Self {
                status,
                body: Some(body),
            },
            Err(e) => Self::error(&ProxyError::SerializationError(e.to_string())),
        }
    }

    pub fn error(err: &ProxyError) -> Self {
        Self {
            status: err.http_status(),
            body: Some(json!({ "error": err.to_string() })),
        }
    }

    pub fn headers(&self) -> Vec<(&'static str, &'static str)> {
        let mut headers = CORS_HEADERS.to_vec();
        if self.body.is_some() {
            headers.push(("Content-Type", "application/json"));
        }
        headers
    }

    pub fn error_message(&self) -> Option<&str> {
        self.body.as_ref()?.get("error")?.as_str()
    }

    pub fn body_bytes(&self) -> Vec<u8> {
        self.body
            .as_ref()
            .map(|b| b.to_string().into_bytes())
            .unwrap_or_default()
    }
}

enum Backend {
    Ready(GeminiClient),
    Unconfigured(String),
}

pub struct Dispatcher {
    backend: Backend,
}

impl Dispatcher {
    pub fn new(client: GeminiClient) -> Self {
        Self {
            backend: Backend::Ready(client),
        }
    }

    /// Answers every non-ping call with a 500 carrying `reason`.
    pub fn unconfigured(reason: impl Into<String>) -> Self {
        Self {
            backend: Backend::Unconfigured(reason.into()),
        }
    }

    pub fn from_config(config: &GeminiConfig) -> Self {
        match GeminiClient::new(config) {
            Ok(client) => Self::new(client),
            Err(e) => {
                log::warn!("⚠️  Gemini client unavailable: {}", e);
                Self::unconfigured(e.to_string())
            }
        }
    }

    pub fn key_configured(&self) -> bool {
        matches!(self.backend, Backend::Ready(_))
    }

    pub async fn dispatch(&self, method: &str, body: &[u8]) -> ProxyResponse {
        let request_id = logger::new_request_id();
        let response = self.evaluate(&request_id, method, body).await;
        log::info!("[req:{}] {} -> {}", request_id, method, response.status);
        response
    }

    async fn evaluate(&self, request_id: &str, method: &str, body: &[u8]) -> ProxyResponse {
        if method.eq_ignore_ascii_case("OPTIONS") {
            return ProxyResponse::no_content();
        }
        if !method.eq_ignore_ascii_case("POST") {
            return ProxyResponse::error(&ProxyError::MethodNotAllowed);
        }

        let client = match &self.backend {
            Backend::Ready(client) => client,
            Backend::Unconfigured(reason) => {
                if is_ping(body) {
                    let diagnostic = ActionResult::Diagnostic(Diagnostic::for_key(false));
                    return ProxyResponse::json(200, &diagnostic);
                }
                log::error!("[req:{}] {}", request_id, reason);
                return ProxyResponse::error(&ProxyError::ConfigError(reason.clone()));
            }
        };

        let request = match parse_body(body).and_then(|value| ActionRequest::from_body(&value)) {
            Ok(request) => request,
            Err(e) => {
                log::warn!("[req:{}] rejected: {}", request_id, e);
                return ProxyResponse::error(&e);
            }
        };

        log::info!("[req:{}] action {}", request_id, request.name());
        match run_action(client, request).await {
            Ok(result) => ProxyResponse::json(200, &result),
            Err(e) => {
                log::error!("[req:{}] Gemini proxy error: {}", request_id, e);
                ProxyResponse::error(&e)
            }
        }
    }
}

async fn run_action(client: &GeminiClient, request: ActionRequest) -> Result<ActionResult> {
    match request {
        ActionRequest::Ping => Ok(ActionResult::Diagnostic(Diagnostic::for_key(true))),
        ActionRequest::GenerateImage {
            prompt,
            aspect_ratio,
        } => {
            let _timer = logger::timer("generateImage");
            let image = client
                .image()
                .generate(&illustration_prompt(&prompt), &aspect_ratio)
                .await?;
            Ok(ActionResult::Image { image })
        }
        ActionRequest::Search { query } => {
            let _timer = logger::timer("search");
            let text = client.text().generate(&insight_prompt(&query)).await?;
            Ok(ActionResult::Insights(Insights {
                text: text.unwrap_or_else(|| NO_INSIGHTS_FALLBACK.to_string()),
                sources: Vec::new(),
            }))
        }
        ActionRequest::EditImage {
            base64_image,
            prompt,
        } => {
            let _timer = logger::timer("editImage");
            let image = client
                .image()
                .edit(strip_data_uri_header(&base64_image), &prompt)
                .await?;
            Ok(ActionResult::Image { image })
        }
    }
}

/// An empty body reads as `{}`.
fn parse_body(body: &[u8]) -> Result<Value> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(json!({}));
    }
    serde_json::from_slice(body).map_err(|_| ProxyError::validation("Invalid JSON body"))
}

fn is_ping(body: &[u8]) -> bool {
    serde_json::from_slice::<Value>(body)
        .ok()
        .and_then(|v| v.get("action").and_then(Value::as_str).map(|a| a == "ping"))
        .unwrap_or(false)
}
