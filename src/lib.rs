pub mod client;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod gemini;
pub mod logger;
pub mod models;
#[cfg(feature = "server")]
pub mod server;

/// Route the proxy is served on.
pub const FUNCTION_PATH: &str = "/.netlify/functions/gemini";

pub use client::{describe_image_failure, describe_search_failure, ProxyClient};
pub use config::{Config, GeminiConfig};
pub use dispatcher::{Dispatcher, ProxyResponse};
pub use error::{NormalizedFailure, ProxyError, Result, UpstreamError, UpstreamFailure};
pub use gemini::{GeminiClient, GeminiHttpProvider, GenerativeProvider, ImageClient, TextClient};
pub use models::{ActionRequest, ActionResult, Diagnostic, Insights, Source};
