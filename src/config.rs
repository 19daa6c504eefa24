/// Runtime configuration, read from the environment.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub base_url: String,
    /// Summarization credential. When absent the server uses its stored key.
    pub api_key: Option<String>,
    pub provider: String,
    pub out_file: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8000".to_string(),
            api_key: None,
            provider: "gemini".to_string(),
            out_file: "dashboard.html".to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            base_url: std::env::var("DATAPULSE_BASE_URL").unwrap_or(defaults.base_url),
            api_key: std::env::var("AI_API_KEY").ok().filter(|k| !k.is_empty()),
            provider: std::env::var("AI_PROVIDER").unwrap_or(defaults.provider),
            out_file: std::env::var("OUT_FILE").unwrap_or(defaults.out_file),
        }
    }
}
