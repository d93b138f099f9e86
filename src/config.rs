use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub port: u16,
    pub models_dir: String,
    pub max_forecast_days: u32,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self {
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "5000".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number between 1-65535"))?,
            models_dir: std::env::var("MODELS_DIR")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| "models".to_string()),
            max_forecast_days: std::env::var("MAX_FORECAST_DAYS")
                .unwrap_or_else(|_| "366".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("MAX_FORECAST_DAYS must be a positive number"))?,
        };

        if config.max_forecast_days == 0 {
            anyhow::bail!("MAX_FORECAST_DAYS must be at least 1");
        }

        // Log successful configuration load
        tracing::info!("Configuration loaded successfully");
        tracing::debug!("Models directory: {}", config.models_dir);
        tracing::debug!("Max forecast days: {}", config.max_forecast_days);
        tracing::debug!("Server Port: {}", config.port);

        Ok(config)
    }
}
