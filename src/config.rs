use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub port: u16,
    pub gemini_api_key: String,
    pub gemini_base_url: String,
    pub gemini_model: String,
    pub chat_api_key: Option<String>, // Optional guard for /api/v1 routes
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self {
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number between 1-65535"))?,
            gemini_api_key: std::env::var("GEMINI_API_KEY")
                .map_err(|_| anyhow::anyhow!("GEMINI_API_KEY environment variable required"))
                .and_then(|key| {
                    if key.trim().is_empty() {
                        anyhow::bail!("GEMINI_API_KEY cannot be empty");
                    }
                    Ok(key)
                })?,
            gemini_base_url: std::env::var("GEMINI_BASE_URL")
                .unwrap_or_else(|_| "https://generativelanguage.googleapis.com".to_string())
                .trim_end_matches('/')
                .to_string(),
            gemini_model: std::env::var("GEMINI_MODEL")
                .unwrap_or_else(|_| "gemini-2.5-flash".to_string()),
            chat_api_key: std::env::var("CHAT_API_KEY")
                .ok()
                .filter(|s| !s.trim().is_empty()),
        };

        if !config.gemini_base_url.starts_with("http://")
            && !config.gemini_base_url.starts_with("https://")
        {
            anyhow::bail!("GEMINI_BASE_URL must start with http:// or https://");
        }
        if config.gemini_model.trim().is_empty() {
            anyhow::bail!("GEMINI_MODEL cannot be empty");
        }

        // Log successful configuration load (without sensitive values)
        tracing::info!("Configuration loaded successfully");
        tracing::debug!("Gemini Base URL: {}", config.gemini_base_url);
        tracing::debug!("Gemini Model: {}", config.gemini_model);
        if config.chat_api_key.is_some() {
            tracing::info!("Chat API key guard enabled for /api/v1 routes");
        }
        tracing::debug!("Server Port: {}", config.port);

        Ok(config)
    }
}
