#![cfg(feature = "server")]

use actix_web::{web, App, HttpRequest, HttpResponse, HttpServer};
use async_trait::async_trait;
use gemini_proxy::{
    describe_image_failure,
    models::{ErrorBody, GenerateContentRequest, GenerateContentResponse, Part},
    server, Dispatcher, GeminiClient, GeminiConfig, GenerativeProvider, ProxyClient, ProxyError,
    UpstreamError, FUNCTION_PATH,
};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};

struct StubProvider {
    reply: Result<Value, UpstreamError>,
    calls: Mutex<Vec<GenerateContentRequest>>,
}

impl StubProvider {
    fn replying(reply: Value) -> Arc<Self> {
        Arc::new(Self {
            reply: Ok(reply),
            calls: Mutex::new(Vec::new()),
        })
    }

    fn failing(error: UpstreamError) -> Arc<Self> {
        Arc::new(Self {
            reply: Err(error),
            calls: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> Vec<GenerateContentRequest> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl GenerativeProvider for StubProvider {
    async fn generate_content(
        &self,
        _model: &str,
        request: &GenerateContentRequest,
    ) -> gemini_proxy::Result<GenerateContentResponse> {
        self.calls.lock().unwrap().push(request.clone());
        match &self.reply {
            Ok(value) => Ok(serde_json::from_value(value.clone()).unwrap()),
            Err(e) => Err(ProxyError::Upstream(e.clone())),
        }
    }
}

fn image_reply() -> Value {
    json!({
        "candidates": [{"content": {"parts": [
            {"text": "Here you go"},
            {"inlineData": {"mimeType": "image/png", "data": "iVBORw0K"}}
        ]}}]
    })
}

/// Serves `configure` on an ephemeral port and returns the base URL.
fn spawn_app<F>(configure: F) -> String
where
    F: Fn(&mut web::ServiceConfig) + Send + Clone + 'static,
{
    let server = HttpServer::new(move || App::new().configure(configure.clone()))
        .workers(1)
        .bind(("127.0.0.1", 0))
        .unwrap();
    let addr = server.addrs()[0];
    actix_web::rt::spawn(server.run());
    format!("http://{}", addr)
}

fn spawn_proxy(dispatcher: Dispatcher) -> String {
    let data = web::Data::new(dispatcher);
    spawn_app(move |cfg| {
        cfg.app_data(data.clone());
        server::configure(cfg);
    })
}

fn stub_proxy(provider: Arc<StubProvider>) -> String {
    spawn_proxy(Dispatcher::new(GeminiClient::with_provider(
        provider,
        &GeminiConfig::new(),
    )))
}

#[actix_web::test]
async fn test_generate_and_edit_through_client() {
    let provider = StubProvider::replying(image_reply());
    let client = ProxyClient::new(&stub_proxy(provider.clone()));

    let image = client.generate_image("platform strategy", None).await.unwrap();
    assert_eq!(image, "data:image/png;base64,iVBORw0K");

    let edited = client
        .edit_image("data:image/png;base64,AAAA", "make it night")
        .await
        .unwrap();
    assert_eq!(edited.as_deref(), Some("data:image/png;base64,iVBORw0K"));

    let calls = provider.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(
        calls[1].contents[0].parts[0],
        Part::inline_base64("image/png", "AAAA")
    );
}

#[actix_web::test]
async fn test_search_fallbacks_through_client() {
    let provider = StubProvider::replying(json!({"candidates": [{"content": {"parts": []}}]}));
    let client = ProxyClient::new(&stub_proxy(provider));

    let insights = client.search_insights("okrs").await.unwrap();
    assert_eq!(insights.text, "No insights found.");
    assert!(insights.sources.is_empty());
}

#[actix_web::test]
async fn test_missing_image_surfaces_server_message() {
    let provider = StubProvider::replying(json!({
        "candidates": [{"content": {"parts": [{"text": "blocked by safety"}]}}]
    }));
    let client = ProxyClient::new(&stub_proxy(provider));

    let err = client.generate_image("p", Some("1:1")).await.unwrap_err();
    assert_eq!(err.to_string(), "No image in response");

    let edit_err = client.edit_image("AAAA", "p").await.unwrap_err();
    assert_eq!(edit_err.to_string(), "No image in response");
}

#[actix_web::test]
async fn test_forbidden_provider_maps_to_access_denied() {
    let provider = StubProvider::failing(
        UpstreamError::new("API key not valid for this referer")
            .with_status(403)
            .with_status_message("PERMISSION_DENIED"),
    );
    let client = ProxyClient::new(&stub_proxy(provider));

    let err = client.generate_image("p", None).await.unwrap_err();
    assert!(err.to_string().contains("403"));

    let shown = describe_image_failure(&err);
    assert!(shown.contains("Access Denied"));
    assert!(shown.contains("allowlist"));
}

#[actix_web::test]
async fn test_unconfigured_proxy() {
    let client = ProxyClient::new(&spawn_proxy(Dispatcher::from_config(&GeminiConfig::new())));

    let diagnostic = client.ping().await.unwrap();
    assert!(diagnostic.ok);
    assert!(!diagnostic.key_configured);

    let err = client.search_insights("q").await.unwrap_err();
    assert!(err.to_string().contains("API key not configured"));
}

#[actix_web::test]
async fn test_malformed_error_body_degrades_to_template() {
    let base = spawn_app(|cfg| {
        cfg.route(
            FUNCTION_PATH,
            web::post().to(|| async { HttpResponse::InternalServerError().body("not json") }),
        );
    });
    let client = ProxyClient::new(&base);

    let err = client.generate_image("p", None).await.unwrap_err();
    assert_eq!(err.to_string(), "Request failed (500)");
}

async fn fake_gemini(req: HttpRequest, body: web::Json<Value>) -> HttpResponse {
    let key = req
        .headers()
        .get("x-goog-api-key")
        .and_then(|v| v.to_str().ok());
    if key != Some("good-key") {
        return HttpResponse::Forbidden().json(json!({
            "error": {
                "code": 403,
                "message": "Requests from this referer are blocked.",
                "status": "PERMISSION_DENIED"
            }
        }));
    }
    let wants_image = body.get("generationConfig").is_some();
    if wants_image {
        HttpResponse::Ok().json(image_reply())
    } else {
        HttpResponse::Ok().json(json!({
            "candidates": [{"content": {"parts": [{"text": "Backlogs need owners."}]}}]
        }))
    }
}

fn spawn_gemini() -> String {
    spawn_app(|cfg| {
        cfg.route("/v1beta/models/{call}", web::post().to(fake_gemini));
    })
}

#[actix_web::test]
async fn test_http_provider_against_fake_gemini() {
    let gemini = spawn_gemini();

    let good = GeminiConfig::new().with_api_key("good-key").with_base_url(&gemini);
    let client = ProxyClient::new(&spawn_proxy(Dispatcher::from_config(&good)));

    let image = client.generate_image("roadmap", None).await.unwrap();
    assert_eq!(image, "data:image/png;base64,iVBORw0K");
    let insights = client.search_insights("backlogs").await.unwrap();
    assert_eq!(insights.text, "Backlogs need owners.");

    let bad = GeminiConfig::new().with_api_key("stolen-key").with_base_url(&gemini);
    let proxy = spawn_proxy(Dispatcher::from_config(&bad));

    let raw = reqwest::Client::new()
        .post(format!("{}{}", proxy, FUNCTION_PATH))
        .json(&json!({"action": "search", "query": "q"}))
        .send()
        .await
        .unwrap();
    assert_eq!(raw.status().as_u16(), 502);
    let body: ErrorBody = raw.json().await.unwrap();
    assert_eq!(
        body.error,
        "Requests from this referer are blocked. (HTTP 403) - PERMISSION_DENIED"
    );
}
