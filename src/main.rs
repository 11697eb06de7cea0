use gemini_proxy::{logger, server, Config};

#[actix_web::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let dotenv_loaded = dotenv::dotenv().is_ok();

    let config = Config::from_env();
    logger::init_with_config(logger::LoggerConfig::from_config(&config))?;

    if dotenv_loaded {
        log::info!("✅ .env file loaded successfully");
    } else {
        log::warn!("⚠️  No .env file found, using system environment variables");
    }

    logger::log_config_info(&config);

    if !config.gemini.key_configured() {
        log::warn!("⚠️  Every action except ping will answer 500 until an API key is set");
    }

    server::run(config).await?;
    Ok(())
}
