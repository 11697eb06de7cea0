use crate::error::{ProxyError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const DEFAULT_ASPECT_RATIO: &str = "16:9";
pub const NO_INSIGHTS_FALLBACK: &str = "No insights found.";

/// Action names accepted by the proxy, in the order they are advertised.
pub const KNOWN_ACTIONS: [&str; 4] = ["ping", "generateImage", "search", "editImage"];

/// One proxy call. Serializes to the wire body, e.g.
/// `{"action":"search","query":"..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum ActionRequest {
    Ping,
    GenerateImage {
        prompt: String,
        #[serde(rename = "aspectRatio")]
        aspect_ratio: String,
    },
    Search {
        query: String,
    },
    EditImage {
        #[serde(rename = "base64Image")]
        base64_image: String,
        prompt: String,
    },
}

impl ActionRequest {
    pub fn name(&self) -> &'static str {
        match self {
            ActionRequest::Ping => "ping",
            ActionRequest::GenerateImage { .. } => "generateImage",
            ActionRequest::Search { .. } => "search",
            ActionRequest::EditImage { .. } => "editImage",
        }
    }

    /// Validates a parsed JSON body. Missing, `null` or empty strings count
    /// as absent.
    pub fn from_body(body: &Value) -> Result<Self> {
        let action = match body.get("action") {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) if s.is_empty() => None,
            Some(Value::Bool(false)) => None,
            Some(other) => Some(other),
        };

        let action = action.ok_or_else(|| {
            ProxyError::validation(format!(
                "Missing 'action' in body. Use: {}.",
                advertised_actions()
            ))
        })?;

        match action.as_str() {
            Some("ping") => Ok(ActionRequest::Ping),
            Some("generateImage") => {
                let prompt = required_str(body, "prompt")
                    .ok_or_else(|| ProxyError::validation("Missing 'prompt' for generateImage"))?;
                let aspect_ratio = match body.get("aspectRatio") {
                    None | Some(Value::Null) => DEFAULT_ASPECT_RATIO.to_string(),
                    Some(Value::String(ratio)) => ratio.clone(),
                    Some(other) => other.to_string(),
                };
                Ok(ActionRequest::GenerateImage {
                    prompt: prompt.to_string(),
                    aspect_ratio,
                })
            }
            Some("search") => {
                let query = required_str(body, "query")
                    .ok_or_else(|| ProxyError::validation("Missing 'query' for search"))?;
                Ok(ActionRequest::Search {
                    query: query.to_string(),
                })
            }
            Some("editImage") => {
                match (required_str(body, "base64Image"), required_str(body, "prompt")) {
                    (Some(base64_image), Some(prompt)) => Ok(ActionRequest::EditImage {
                        base64_image: base64_image.to_string(),
                        prompt: prompt.to_string(),
                    }),
                    _ => Err(ProxyError::validation(
                        "Missing 'base64Image' or 'prompt' for editImage",
                    )),
                }
            }
            Some(unknown) => Err(ProxyError::validation(format!(
                "Unknown action: {}",
                unknown
            ))),
            None => Err(ProxyError::validation(format!(
                "Unknown action: {}",
                action
            ))),
        }
    }
}

/// `ping, generateImage, search, or editImage`
fn advertised_actions() -> String {
    match KNOWN_ACTIONS.split_last() {
        Some((last, rest)) => format!("{}, or {}", rest.join(", "), last),
        None => String::new(),
    }
}

fn required_str<'a>(body: &'a Value, key: &str) -> Option<&'a str> {
    body.get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    pub title: String,
    pub uri: String,
}

/// Search reply. `sources` stays empty until grounding is wired in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Insights {
    pub text: String,
    pub sources: Vec<Source>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub ok: bool,
    #[serde(rename = "keyConfigured")]
    pub key_configured: bool,
    pub message: String,
}

impl Diagnostic {
    pub fn for_key(key_configured: bool) -> Self {
        let message = if key_configured {
            "Function and API key are configured."
        } else {
            "Function works but GEMINI_API_KEY / API_KEY is missing."
        };
        Self {
            ok: true,
            key_configured,
            message: message.to_string(),
        }
    }
}

/// Successful dispatcher payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ActionResult {
    Image { image: String },
    Insights(Insights),
    Diagnostic(Diagnostic),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

// Loose reply shapes the client adapter reads; every field may be absent.

#[derive(Debug, Default, Deserialize)]
pub struct ImageReply {
    pub image: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct InsightsReply {
    pub text: Option<String>,
    pub sources: Option<Vec<Source>>,
    pub error: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct DiagnosticReply {
    pub ok: Option<bool>,
    #[serde(rename = "keyConfigured")]
    pub key_configured: Option<bool>,
    pub message: Option<String>,
    pub error: Option<String>,
}
