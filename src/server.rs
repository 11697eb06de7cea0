use crate::{
    config::Config,
    dispatcher::{Dispatcher, ProxyResponse},
    FUNCTION_PATH,
};
use actix_web::{http::StatusCode, web, App, HttpRequest, HttpResponse, HttpServer};

/// Largest request body accepted; edit requests carry whole images.
pub const MAX_BODY_BYTES: usize = 6 * 1024 * 1024;

pub async fn handle(
    req: HttpRequest,
    body: web::Bytes,
    dispatcher: web::Data<Dispatcher>,
) -> HttpResponse {
    let response = dispatcher.dispatch(req.method().as_str(), &body).await;
    into_http_response(response)
}

fn into_http_response(response: ProxyResponse) -> HttpResponse {
    let status =
        StatusCode::from_u16(response.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

    let mut builder = HttpResponse::build(status);
    for (name, value) in response.headers() {
        builder.insert_header((name, value));
    }

    if response.body.is_some() {
        builder.body(response.body_bytes())
    } else {
        builder.finish()
    }
}

/// Mounts the proxy route for every HTTP method.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::PayloadConfig::new(MAX_BODY_BYTES))
        .route(FUNCTION_PATH, web::route().to(handle));
}

pub async fn run(config: Config) -> std::io::Result<()> {
    let dispatcher = web::Data::new(Dispatcher::from_config(&config.gemini));
    let port = config.port_or_default();

    crate::logger::log_startup_info(
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION"),
        &config.host,
        port,
    );

    HttpServer::new(move || App::new().app_data(dispatcher.clone()).configure(configure))
        .bind((config.host.as_str(), port))?
        .run()
        .await
}
