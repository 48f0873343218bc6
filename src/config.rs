#[derive(Clone)]
pub struct AppConfig {
    pub bind_addr: String,
    pub api_url: String,
    pub api_key: String,
    pub s2s_token: String,
    pub brand_id: String,
    pub self_url: String,
    pub ui_url: String,
    pub gateway_timeout_ms: u64,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            bind_addr: std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string()),
            api_url: std::env::var("API_URL")
                .unwrap_or_else(|_| "https://gate.chip-in.asia/api/v1".to_string()),
            api_key: std::env::var("API_KEY").unwrap_or_default(),
            s2s_token: std::env::var("S2S_TOKEN").unwrap_or_default(),
            brand_id: std::env::var("BRAND_ID").unwrap_or_default(),
            self_url: std::env::var("SELF_URL").unwrap_or_else(|_| "http://localhost:3000".to_string()),
            ui_url: std::env::var("UI_URL").unwrap_or_else(|_| "http://localhost:4200".to_string()),
            gateway_timeout_ms: std::env::var("GATEWAY_TIMEOUT_MS")
                .ok()
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(10_000),
        }
    }
}
