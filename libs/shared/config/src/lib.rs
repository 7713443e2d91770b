use std::env;
use tracing::warn;

pub const DEFAULT_MONGO_URI: &str = "mongodb://localhost:27017";
pub const DEFAULT_DATA_SOURCE: &str = "Cluster0";
pub const DEFAULT_DATABASE: &str = "GlenmoreWellnessDB";
pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_VIEW_REFRESH_SECS: u64 = 300;

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Driver connection string. Empty means the HTTP Data API is used.
    pub mongo_uri: String,
    pub data_api_url: String,
    pub data_api_key: String,
    pub data_source: String,
    pub database: String,
    pub jwt_secret: String,
    pub port: u16,
    pub view_refresh_interval_secs: u64,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let data_api_url = env::var("DATA_API_URL")
            .map(|url| url.trim_end_matches('/').to_string())
            .unwrap_or_default();
        let mongo_uri = resolve_mongo_uri(
            env::var("MONGO_URI").or_else(|_| env::var("MONGODB_URI")).ok(),
            &data_api_url,
        );

        let config = Self {
            mongo_uri,
            data_api_url,
            data_api_key: env::var("DATA_API_KEY").unwrap_or_default(),
            data_source: env::var("DATA_SOURCE")
                .unwrap_or_else(|_| {
                    warn!("DATA_SOURCE not set, using default");
                    DEFAULT_DATA_SOURCE.to_string()
                }),
            database: env::var("DATABASE_NAME")
                .unwrap_or_else(|_| {
                    warn!("DATABASE_NAME not set, using default");
                    DEFAULT_DATABASE.to_string()
                }),
            jwt_secret: env::var("JWT_SECRET")
                .unwrap_or_else(|_| {
                    warn!("JWT_SECRET not set, requests will not be authenticated");
                    String::new()
                }),
            port: parse_or_default("PORT", DEFAULT_PORT),
            view_refresh_interval_secs: parse_or_default(
                "VIEW_REFRESH_INTERVAL_SECS",
                DEFAULT_VIEW_REFRESH_SECS,
            ),
        };

        if !config.is_configured() {
            warn!("Application not fully configured - missing environment variables");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        !self.mongo_uri.is_empty()
            || (!self.data_api_url.is_empty() && !self.data_api_key.is_empty())
    }

    pub fn auth_enabled(&self) -> bool {
        !self.jwt_secret.is_empty()
    }
}

/// An explicit URI wins. Without one the local server is assumed, unless a
/// Data API URL says the store is reached over HTTP.
fn resolve_mongo_uri(explicit: Option<String>, data_api_url: &str) -> String {
    match explicit.map(|uri| uri.trim().to_string()) {
        Some(uri) if !uri.is_empty() => uri,
        _ if !data_api_url.is_empty() => String::new(),
        _ => {
            warn!("MONGO_URI not set, using default {}", DEFAULT_MONGO_URI);
            DEFAULT_MONGO_URI.to_string()
        }
    }
}

fn parse_or_default<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr + std::fmt::Display + Copy,
{
    match env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("{} has invalid value '{}', using default {}", key, raw, default);
            default
        }),
        Err(_) => default,
    }
}
