//! Server configuration, loaded from environment variables at startup.

/// Runtime configuration for quill-server.
///
/// Every field has a sensible default so the server works out-of-the-box
/// without any environment variables set.  Without `QUILL_OPENAI_API_KEY`
/// the server falls back to the scripted token source, which is enough to
/// exercise the whole streaming pipeline locally.
#[derive(Debug, Clone)]
pub struct Config {
    /// TCP address to bind (default: `"0.0.0.0:3000"`).
    pub bind_address: String,

    /// SQLite database URL (default: `"sqlite://quill.db"`).
    pub database_url: String,

    /// `tracing` filter string, e.g. `"info"` or `"debug,tower_http=warn"`.
    pub log_level: String,

    /// When `true`, emit log records as newline-delimited JSON.
    pub log_json: bool,

    /// Comma-separated CORS origin allow-list; `None` means wildcard.
    pub cors_allowed_origins: Option<String>,

    /// Serve Swagger UI at `/swagger-ui` (default: enabled).
    pub enable_swagger: bool,

    /// Base URL of the OpenAI-compatible completion endpoint.
    pub openai_base_url: String,

    /// API key for the completion endpoint; absent → scripted source.
    pub openai_api_key: Option<String>,

    /// Frames buffered ahead of a slow SSE consumer per stream.
    pub channel_capacity: usize,

    /// Pacing delay (milliseconds) between scripted fragments.
    pub simulated_delay_ms: u64,
}

impl Config {
    /// Build [`Config`] from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self {
            bind_address: env_or("QUILL_BIND", "0.0.0.0:3000"),
            database_url: env_or("QUILL_DATABASE_URL", "sqlite://quill.db"),
            log_level: env_or("QUILL_LOG", "info"),
            log_json: env_flag("QUILL_LOG_JSON", false),
            cors_allowed_origins: std::env::var("QUILL_CORS_ORIGINS").ok(),
            enable_swagger: env_flag("QUILL_ENABLE_SWAGGER", true),
            openai_base_url: env_or("QUILL_OPENAI_BASE_URL", "https://api.openai.com/v1"),
            openai_api_key: std::env::var("QUILL_OPENAI_API_KEY").ok(),
            channel_capacity: parse_env("QUILL_CHANNEL_CAPACITY", 32),
            simulated_delay_ms: parse_env("QUILL_SIMULATED_DELAY_MS", 120),
        }
    }
}

// ── private helpers ──────────────────────────────────────────────────────────

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_owned())
}

fn env_flag(key: &str, default: bool) -> bool {
    std::env::var(key)
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(default)
}

fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
