use base64::{
    alphabet,
    engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig},
    Engine as _,
};
use gemini_proxy::{
    describe_image_failure, describe_search_failure, logger, models::strip_data_uri_header,
    ProxyClient,
};
use std::{env, fs};

/// Image payloads are relayed as the provider sent them, padded or not.
const IMAGE_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let dotenv_loaded = dotenv::dotenv().is_ok();
    logger::init()?;

    if dotenv_loaded {
        log::info!("✅ .env file loaded");
    } else {
        log::warn!("⚠️  No .env file found");
    }

    let base_url = env::var("PROXY_URL").unwrap_or_else(|_| "http://127.0.0.1:8888".to_string());
    let client = ProxyClient::new(&base_url);

    let diagnostic = client.ping().await?;
    log::info!(
        "🔌 {} (key configured: {})",
        diagnostic.message,
        diagnostic.key_configured
    );

    match client
        .search_insights("How should a TPM sequence a platform migration?")
        .await
    {
        Ok(insights) => println!("{}", insights.text),
        Err(e) => println!("{}", describe_search_failure(&e)),
    }

    match client
        .generate_image("a team shipping a distributed system", None)
        .await
    {
        Ok(image) => {
            log::info!("🎨 Received image data-URI ({} chars)", image.len());
            let filename = format!("insight_{}.png", chrono::Utc::now().timestamp());
            match IMAGE_ENGINE.decode(strip_data_uri_header(&image)) {
                Ok(bytes) => match fs::write(&filename, bytes) {
                    Ok(_) => log::info!("💾 Image saved to: {}", filename),
                    Err(e) => log::error!("❌ Failed to save image: {}", e),
                },
                Err(e) => log::error!("❌ Failed to decode base64 image: {}", e),
            }
        }
        Err(e) => log::error!("{}", describe_image_failure(&e)),
    }

    Ok(())
}
